//! Telegraph controller: a countdown that delays an enemy's chosen action
//! so the player gets an advance warning.
//!
//! The target point is a snapshot taken when the warning starts. It does
//! not follow the target around.

use serde::{Deserialize, Serialize};

use crate::action::ActionRequest;
use crate::math::Vec2;

/// Per-enemy telegraph state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TelegraphState {
    active: bool,
    action: Option<ActionRequest>,
    target_point: Vec2,
    timer: i64,
    timer_max: i64,
}

impl TelegraphState {
    /// Arm the telegraph for an action.
    ///
    /// Returns `false` without changing state when the skill's duration is
    /// not positive.
    pub fn start(&mut self, action: ActionRequest, target_point: Vec2, tick_rate: u32) -> bool {
        let duration = action.skill.telegraph_seconds;
        if !(duration > 0.0) {
            return false;
        }
        let ticks = (duration * tick_rate as f32).round().max(1.0) as i64;

        tracing::debug!(
            combatant = action.subject,
            skill = %action.skill.id,
            ticks,
            "Telegraph started"
        );
        self.active = true;
        self.action = Some(action);
        self.target_point = target_point;
        self.timer = ticks;
        self.timer_max = ticks;
        true
    }

    /// Advance one tick.
    ///
    /// Returns `true` exactly once, on the tick the countdown runs out.
    pub fn tick(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.timer = (self.timer - 1).max(0);
        if self.timer == 0 {
            self.active = false;
            return true;
        }
        false
    }

    /// Normalized countdown progress for the rendering layer.
    #[must_use]
    pub fn progress(&self) -> f32 {
        if !self.active || self.timer_max <= 0 {
            return 0.0;
        }
        1.0 - self.timer as f32 / self.timer_max as f32
    }

    /// Whether a warning is currently counting down.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Snapshotted warning location.
    #[must_use]
    pub fn target_point(&self) -> Option<Vec2> {
        self.active.then_some(self.target_point)
    }

    /// Ticks left before the action fires.
    #[must_use]
    pub const fn remaining_ticks(&self) -> i64 {
        self.timer
    }

    /// Hand over the stored action once the countdown has fired.
    pub fn take_action(&mut self) -> Option<ActionRequest> {
        if self.active {
            return None;
        }
        self.action.take()
    }

    /// Drop everything, used on death.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SkillData;

    fn action(seconds: f32) -> ActionRequest {
        ActionRequest::new(1, SkillData::new("smash").with_telegraph(seconds), vec![2])
    }

    #[test]
    fn test_rejects_non_positive_duration() {
        let mut t = TelegraphState::default();
        assert!(!t.start(action(0.0), Vec2::ZERO, 60));
        assert!(!t.start(action(-1.0), Vec2::ZERO, 60));
        assert!(!t.is_active());
    }

    #[test]
    fn test_one_second_at_sixty_ticks() {
        let mut t = TelegraphState::default();
        assert!(t.start(action(1.0), Vec2::new(10.0, 20.0), 60));
        for i in 0..59 {
            assert!(!t.tick(), "fired early on tick {i}");
            assert!(t.is_active());
        }
        assert!(t.tick());
        assert!(!t.is_active());
        assert!(!t.tick());
        assert_eq!(t.remaining_ticks(), 0);
    }

    #[test]
    fn test_progress_ramps() {
        let mut t = TelegraphState::default();
        assert_eq!(t.progress(), 0.0);
        t.start(action(1.0), Vec2::ZERO, 60);
        assert_eq!(t.progress(), 0.0);
        for _ in 0..30 {
            t.tick();
        }
        assert!((t.progress() - 0.5).abs() < 1e-6);
        for _ in 0..30 {
            t.tick();
        }
        assert_eq!(t.progress(), 0.0);
    }

    #[test]
    fn test_action_released_only_after_firing() {
        let mut t = TelegraphState::default();
        t.start(action(0.05), Vec2::new(1.0, 2.0), 60);
        assert_eq!(t.target_point(), Some(Vec2::new(1.0, 2.0)));
        assert!(t.take_action().is_none());
        while !t.tick() {}
        let fired = t.take_action().unwrap();
        assert_eq!(fired.skill.id, "smash");
        assert!(t.take_action().is_none());
    }

    #[test]
    fn test_clear_resets() {
        let mut t = TelegraphState::default();
        t.start(action(2.0), Vec2::ZERO, 60);
        t.clear();
        assert!(!t.is_active());
        assert!(!t.tick());
        assert!(t.take_action().is_none());
    }
}
