//! # Battle Core
//!
//! Deterministic real-time combat core for a gauge-driven tactical battle.
//!
//! This crate decides *when* every combatant acts and *how* the action
//! plays out on the field:
//! - No rendering
//! - No IO
//! - No damage formulas (those live behind [`action::ActionPipeline`])
//! - No system randomness (one seeded RNG per battle)
//!
//! It produces positions, timers and trigger events; the host draws them
//! and resolves the game rules.
//!
//! ## Crate Structure
//!
//! - [`battle`] - The battle facade and its fixed-step tick
//! - [`scheduler`] - Gauge fill and the enemy decision loop
//! - [`telegraph`] - Delayed-attack warnings
//! - [`movement`] - Skill movement executor
//! - [`spatial`] - Circle, line and cone queries
//! - [`reposition`] - Knockback and pull
//! - [`wander`] - Idle drift around home
//! - [`escape`] - Party escape vote
//! - [`post_battle`] - Walk back to formation after victory
//! - [`data`] - Skill definitions and tag resolution
//! - [`math`] - Vectors, bounds, easing, fixed-point gauge

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod action;
pub mod battle;
pub mod components;
pub mod config;
pub mod data;
pub mod error;
pub mod escape;
pub mod events;
pub mod math;
pub mod movement;
pub mod post_battle;
pub mod reposition;
pub mod resolve;
pub mod roster;
pub mod scheduler;
pub mod spatial;
pub mod telegraph;
pub mod view;
pub mod wander;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::action::{ActionPipeline, ActionRequest, DecisionLayer, HitResult};
    pub use crate::battle::{Battle, BattleState};
    pub use crate::components::{Combatant, CombatantId, CombatantKind, Pose, Team};
    pub use crate::config::{BattleConfig, EscapePolicy};
    pub use crate::data::{
        AoeOrigin, AoeShape, AoeSpec, MovementMode, RetreatSpec, SkillData, SkillKind, SkillTags,
        TagMap, TagSource, TargetScope,
    };
    pub use crate::error::{ActionFault, BattleError, Result};
    pub use crate::events::{BattleEvent, BattleOutcome, TickEvents};
    pub use crate::math::{Bounds, Fixed, Vec2};
    pub use crate::movement::Phase;
    pub use crate::roster::{BattleContext, Roster, RosterFilter};
    pub use crate::view::{CombatantView, Facing};
}
