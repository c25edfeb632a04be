//! Error types for the battle core.
//!
//! Two families live here. [`BattleError`] is returned to the host when it
//! misuses the API (unknown combatant, acting out of turn, bad config).
//! [`ActionFault`] is what external collaborators hand back when an action
//! cannot be carried out; those are contained at the decision-loop boundary
//! and never escape a tick.

use thiserror::Error;

use crate::components::CombatantId;

/// Result type alias using [`BattleError`].
pub type Result<T> = std::result::Result<T, BattleError>;

/// Top-level error type for the battle API.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BattleError {
    /// Invalid combatant reference.
    #[error("Combatant not found: {0}")]
    CombatantNotFound(CombatantId),

    /// Combatant is dead and cannot act or be driven.
    #[error("Combatant {0} is dead")]
    CombatantDead(CombatantId),

    /// Another driver already owns this combatant's position.
    #[error("Combatant {0} is busy with another action")]
    CombatantBusy(CombatantId),

    /// The readiness gauge has not reached its ceiling yet.
    #[error("Combatant {id} is not ready (gauge {gauge}/{max})")]
    GaugeNotFull {
        /// Combatant that tried to act.
        id: CombatantId,
        /// Current gauge value, truncated.
        gauge: i64,
        /// Gauge ceiling.
        max: u32,
    },

    /// No cast is pending for this combatant.
    #[error("Combatant {0} has no pending cast")]
    NoPendingCast(CombatantId),

    /// The battle already reached an outcome.
    #[error("Battle is already over")]
    BattleOver,

    /// Configuration failed validation.
    #[error("Invalid battle config: {0}")]
    InvalidConfig(String),

    /// Data file parsing error.
    #[error("Failed to parse data '{source_name}': {message}")]
    DataParseError {
        /// Name of the data source that failed to parse.
        source_name: String,
        /// Error message.
        message: String,
    },

    /// Invalid battle state.
    #[error("Invalid battle state: {0}")]
    InvalidState(String),
}

/// Fault raised by an external collaborator while dispatching an action.
///
/// Faults are never retried. The scheduler logs them and treats the action
/// as complete so the combatant cannot stall.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionFault {
    /// The pipeline could not produce a target list.
    #[error("target resolution failed: {0}")]
    TargetResolution(String),

    /// Applying the action to a target failed.
    #[error("apply to combatant {target} failed: {reason}")]
    Apply {
        /// Target the action was being applied to.
        target: CombatantId,
        /// Collaborator supplied reason.
        reason: String,
    },

    /// The referenced skill is unknown to the data layer.
    #[error("unknown skill '{0}'")]
    UnknownSkill(String),

    /// Any other collaborator failure.
    #[error("{0}")]
    Other(String),
}
