//! Battle tuning configuration.
//!
//! Every timing and distance constant the core uses lives in
//! [`BattleConfig`]. The defaults target a 60 Hz tick on an 816x624 field.
//! Configs are plain data and deserialize from RON:
//!
//! ```ron
//! BattleConfig(
//!     tick_rate: 60,
//!     max_gauge: 1000,
//!     bounds: (min: (x: 0.0, y: 0.0), max: (x: 816.0, y: 624.0)),
//!     escape_policy: Threshold(2),
//! )
//! ```
//!
//! Missing fields fall back to their defaults.

use serde::{Deserialize, Serialize};

use crate::error::{BattleError, Result};
use crate::math::{Bounds, Fixed, Vec2};

/// Rule deciding when the party's escape votes trigger a flee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum EscapePolicy {
    /// Escape is not offered.
    #[default]
    Disabled,
    /// Flee once this many distinct party members have voted.
    Threshold(u32),
    /// Flee once every living party member has voted.
    Unanimous,
}

/// Tuning for one battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// Simulation ticks per second.
    pub tick_rate: u32,
    /// Readiness gauge ceiling.
    pub max_gauge: u32,
    /// Battlefield rectangle every position is clamped into.
    pub bounds: Bounds,
    /// Collision radius used when a combatant does not specify one.
    pub default_collision_radius: f32,
    /// Extra space left between attacker and target on approach.
    pub approach_gap: f32,
    /// Progress per tick while rushing toward a target.
    pub rush_speed: f32,
    /// Progress per tick while retreating.
    pub return_speed: f32,
    /// Progress per tick for the passthrough follow-through.
    pub passthrough_speed: f32,
    /// Progress per tick for a pierce dash.
    pub pierce_speed: f32,
    /// Length of the strike pause in ticks.
    pub strike_ticks: u32,
    /// Radius around home used when retreating without a retreat spec.
    pub retreat_scatter: f32,
    /// Minimum distance travelled past the target on passthrough.
    pub passthrough_min_overshoot: f32,
    /// Distance travelled past the target on pierce.
    pub pierce_overshoot: f32,
    /// Shortest idle wander countdown in ticks.
    pub wander_min_ticks: u32,
    /// Longest idle wander countdown in ticks.
    pub wander_max_ticks: u32,
    /// Maximum wander distance from home.
    pub wander_radius: f32,
    /// Ticks a single wander step takes.
    pub wander_duration_ticks: u32,
    /// Ticks the post-victory walk back to formation takes.
    pub return_duration_ticks: u32,
    /// Ticks held in formation before the victory hook fires.
    pub return_pause_ticks: u32,
    /// Escape vote rule.
    pub escape_policy: EscapePolicy,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            max_gauge: 1000,
            bounds: Bounds::new(Vec2::ZERO, Vec2::new(816.0, 624.0)),
            default_collision_radius: 16.0,
            approach_gap: 8.0,
            rush_speed: 0.08,
            return_speed: 0.05,
            passthrough_speed: 0.06,
            pierce_speed: 0.04,
            strike_ticks: 24,
            retreat_scatter: 40.0,
            passthrough_min_overshoot: 80.0,
            pierce_overshoot: 60.0,
            wander_min_ticks: 120,
            wander_max_ticks: 300,
            wander_radius: 24.0,
            wander_duration_ticks: 60,
            return_duration_ticks: 45,
            return_pause_ticks: 30,
            escape_policy: EscapePolicy::Disabled,
        }
    }
}

impl BattleConfig {
    /// Parse a config from RON text and validate it.
    pub fn from_ron_str(source_name: &str, text: &str) -> Result<Self> {
        let config: Self = ron::from_str(text).map_err(|e| BattleError::DataParseError {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Gauge ceiling as fixed-point.
    #[must_use]
    pub fn max_gauge_fixed(&self) -> Fixed {
        Fixed::from_num(self.max_gauge)
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(BattleError::InvalidConfig(msg.to_string()));

        if self.tick_rate == 0 {
            return invalid("tick_rate must be positive");
        }
        if self.max_gauge == 0 {
            return invalid("max_gauge must be positive");
        }
        if !self.bounds.is_valid() {
            return invalid("bounds min must not exceed max");
        }
        for (name, speed) in [
            ("rush_speed", self.rush_speed),
            ("return_speed", self.return_speed),
            ("passthrough_speed", self.passthrough_speed),
            ("pierce_speed", self.pierce_speed),
        ] {
            if !(speed > 0.0 && speed <= 1.0) {
                return Err(BattleError::InvalidConfig(format!(
                    "{name} must be in (0, 1], got {speed}"
                )));
            }
        }
        if self.wander_min_ticks > self.wander_max_ticks {
            return invalid("wander_min_ticks must not exceed wander_max_ticks");
        }
        if self.wander_duration_ticks == 0 || self.return_duration_ticks == 0 {
            return invalid("animation durations must be positive");
        }
        for (name, value) in [
            ("default_collision_radius", self.default_collision_radius),
            ("approach_gap", self.approach_gap),
            ("retreat_scatter", self.retreat_scatter),
            ("passthrough_min_overshoot", self.passthrough_min_overshoot),
            ("pierce_overshoot", self.pierce_overshoot),
            ("wander_radius", self.wander_radius),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(BattleError::InvalidConfig(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if self.escape_policy == EscapePolicy::Threshold(0) {
            return invalid("escape threshold must be at least 1");
        }
        Ok(())
    }
}
