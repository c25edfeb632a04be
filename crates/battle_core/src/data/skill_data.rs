//! Skill data structures for data-driven skill definitions.

use serde::{Deserialize, Serialize};

use crate::math::Vec2;

/// How a skill physically moves its user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MovementMode {
    /// Cast in place.
    #[default]
    Stay,
    /// Rush to the target, strike, then retreat.
    Dashback,
    /// Rush to the target, strike, and hold the new spot.
    Rush,
    /// Rush to the target, strike, then follow through past it.
    Passthrough,
    /// Dash in a straight line through the target, hitting everything on the way.
    Pierce,
}

impl MovementMode {
    /// Whether the mode approaches the primary target before striking.
    #[must_use]
    pub const fn approaches_target(self) -> bool {
        matches!(self, Self::Dashback | Self::Rush | Self::Passthrough)
    }
}

/// Physical skills play the attack pose; magical skills play the cast pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SkillKind {
    /// Weapon-style attack.
    #[default]
    Physical,
    /// Spell-style attack.
    Magical,
}

/// Which side a skill's area affects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TargetScope {
    /// Combatants on the other team.
    #[default]
    Opponents,
    /// Combatants on the user's team.
    Allies,
}

/// Explicit retreat after a dashback or pierce.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetreatSpec {
    /// Direction in degrees, 0 = +x, counter-clockwise in world space.
    pub angle_degrees: f32,
    /// Distance travelled.
    pub distance: f32,
}

impl RetreatSpec {
    /// Displacement vector described by this retreat.
    #[must_use]
    pub fn offset(&self) -> Vec2 {
        Vec2::from_angle(self.angle_degrees.to_radians()).scale(self.distance)
    }
}

/// Geometric shape of an area of effect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AoeShape {
    /// Disc around the origin.
    Circle {
        /// Radius.
        radius: f32,
    },
    /// Rectangle from the origin toward the primary target.
    Line {
        /// Length along the facing direction.
        length: f32,
        /// Full width.
        width: f32,
    },
    /// Sector facing the primary target.
    Cone {
        /// Radius.
        radius: f32,
        /// Full opening angle in degrees.
        angle_degrees: f32,
    },
}

/// Point an area of effect is anchored at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AoeOrigin {
    /// The skill user.
    #[default]
    Caster,
    /// The primary target.
    Target,
}

/// Area of effect attached to a skill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AoeSpec {
    /// Shape and dimensions.
    pub shape: AoeShape,
    /// Anchor point.
    #[serde(default)]
    pub origin: AoeOrigin,
    /// Whether combatants inside the area are added to the target list.
    #[serde(default)]
    pub apply_to_targets: bool,
}

/// Data-driven skill definition.
///
/// # Example RON
///
/// ```ron
/// SkillData(
///     id: "cleave",
///     name: "skill.cleave.name",
///     movement: Dashback,
///     aoe: Some(AoeSpec(
///         shape: Cone(radius: 96.0, angle_degrees: 90.0),
///         origin: Caster,
///         apply_to_targets: true,
///     )),
///     knockback: 24.0,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillData {
    /// Unique string identifier for this skill.
    pub id: String,

    /// Localization key for the skill's display name.
    #[serde(default)]
    pub name: String,

    /// Physical or magical.
    #[serde(default)]
    pub kind: SkillKind,

    /// Side affected by area expansion and pierce hits.
    #[serde(default)]
    pub scope: TargetScope,

    /// Movement executed when the skill fires.
    #[serde(default)]
    pub movement: MovementMode,

    /// Explicit retreat for dashback/pierce.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retreat: Option<RetreatSpec>,

    /// Area of effect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aoe: Option<AoeSpec>,

    /// Knockback distance applied on hit.
    #[serde(default)]
    pub knockback: f32,

    /// Pull distance applied on hit.
    #[serde(default)]
    pub pull: f32,

    /// Warning time before an enemy fires this skill, in seconds.
    #[serde(default)]
    pub telegraph_seconds: f32,

    /// Cast time handled by the external casting mechanism, in ticks.
    #[serde(default)]
    pub cast_ticks: u32,
}

impl SkillData {
    /// Create a skill with inert defaults.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            kind: SkillKind::Physical,
            scope: TargetScope::Opponents,
            movement: MovementMode::Stay,
            retreat: None,
            aoe: None,
            knockback: 0.0,
            pull: 0.0,
            telegraph_seconds: 0.0,
            cast_ticks: 0,
        }
    }

    /// Builder method to set the movement mode.
    #[must_use]
    pub fn with_movement(mut self, movement: MovementMode) -> Self {
        self.movement = movement;
        self
    }

    /// Builder method to set the skill kind.
    #[must_use]
    pub fn with_kind(mut self, kind: SkillKind) -> Self {
        self.kind = kind;
        self
    }

    /// Builder method to set the target scope.
    #[must_use]
    pub fn with_scope(mut self, scope: TargetScope) -> Self {
        self.scope = scope;
        self
    }

    /// Builder method to set an explicit retreat.
    #[must_use]
    pub fn with_retreat(mut self, angle_degrees: f32, distance: f32) -> Self {
        self.retreat = Some(RetreatSpec {
            angle_degrees,
            distance,
        });
        self
    }

    /// Builder method to attach an area of effect.
    #[must_use]
    pub fn with_aoe(mut self, aoe: AoeSpec) -> Self {
        self.aoe = Some(aoe);
        self
    }

    /// Builder method to set knockback distance.
    #[must_use]
    pub fn with_knockback(mut self, distance: f32) -> Self {
        self.knockback = distance;
        self
    }

    /// Builder method to set pull distance.
    #[must_use]
    pub fn with_pull(mut self, distance: f32) -> Self {
        self.pull = distance;
        self
    }

    /// Builder method to set the telegraph duration.
    #[must_use]
    pub fn with_telegraph(mut self, seconds: f32) -> Self {
        self.telegraph_seconds = seconds;
        self
    }

    /// Builder method to set the cast time.
    #[must_use]
    pub fn with_cast_ticks(mut self, ticks: u32) -> Self {
        self.cast_ticks = ticks;
        self
    }

    /// Whether this skill is telegraphed before firing.
    #[must_use]
    pub fn has_telegraph(&self) -> bool {
        self.telegraph_seconds > 0.0
    }

    /// Area of effect that expands the target list, if any.
    #[must_use]
    pub fn expanding_aoe(&self) -> Option<&AoeSpec> {
        self.aoe.as_ref().filter(|aoe| aoe.apply_to_targets)
    }
}
