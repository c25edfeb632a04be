//! Idle wander: ambient drift of unoccupied enemies around their home.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::components::Pose;
use crate::config::BattleConfig;
use crate::math::{ease_in_out_quad, Vec2};
use crate::roster::Roster;

/// Per-enemy wander state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WanderState {
    armed: bool,
    countdown: u32,
    in_flight: bool,
    start: Vec2,
    target: Vec2,
    elapsed: u32,
}

impl WanderState {
    /// Whether a wander step is animating.
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Normalized progress of the current step.
    #[must_use]
    pub fn progress(&self, config: &BattleConfig) -> f32 {
        if !self.in_flight {
            return 0.0;
        }
        (self.elapsed as f32 / config.wander_duration_ticks.max(1) as f32).min(1.0)
    }

    /// Ticks until the next wander step starts.
    #[must_use]
    pub const fn countdown(&self) -> u32 {
        self.countdown
    }

    /// Stop any in-flight step and re-roll the countdown on the next tick.
    pub fn cancel(&mut self) {
        *self = Self::default();
    }

    /// Advance one tick. Returns the new position while a step animates.
    pub fn advance(
        &mut self,
        position: Vec2,
        home: Vec2,
        config: &BattleConfig,
        rng: &mut ChaCha8Rng,
    ) -> Option<Vec2> {
        if self.in_flight {
            self.elapsed += 1;
            if self.elapsed >= config.wander_duration_ticks {
                self.in_flight = false;
                self.countdown = roll_countdown(config, rng);
                return Some(self.target);
            }
            let t = self.elapsed as f32 / config.wander_duration_ticks as f32;
            return Some(self.start.lerp(self.target, ease_in_out_quad(t)));
        }

        if !self.armed {
            self.armed = true;
            self.countdown = roll_countdown(config, rng);
        }
        self.countdown = self.countdown.saturating_sub(1);
        if self.countdown == 0 {
            self.start = position;
            self.target = config
                .bounds
                .clamp(home + random_offset(config.wander_radius, rng));
            self.elapsed = 0;
            self.in_flight = true;
        }
        None
    }
}

fn roll_countdown(config: &BattleConfig, rng: &mut ChaCha8Rng) -> u32 {
    rng.gen_range(config.wander_min_ticks..=config.wander_max_ticks)
        .max(1)
}

/// Point at a uniform angle and uniform distance (not disk-uniform).
pub(crate) fn random_offset(radius: f32, rng: &mut ChaCha8Rng) -> Vec2 {
    let angle = rng.gen_range(0.0..std::f32::consts::TAU);
    let distance = if radius > 0.0 {
        rng.gen_range(0.0..=radius)
    } else {
        0.0
    };
    Vec2::from_angle(angle).scale(distance)
}

/// Run idle wander for every enemy that nothing else owns.
///
/// Casting or dead enemies are never moved; an in-flight step is cancelled
/// as soon as either condition appears.
pub fn wander_system(roster: &mut Roster, config: &BattleConfig, rng: &mut ChaCha8Rng) {
    for id in roster.sorted_ids() {
        let Some(combatant) = roster.get_mut(id) else {
            continue;
        };
        let suppressed = combatant.dead || combatant.casting;
        let owned_elsewhere = combatant.is_executing();
        let (position, home) = (combatant.position, combatant.home);

        let Some(enemy) = combatant.enemy_data_mut() else {
            continue;
        };
        if suppressed {
            if enemy.wander.is_in_flight() {
                tracing::debug!(combatant = id, "Wander cancelled");
            }
            enemy.wander.cancel();
            continue;
        }
        if owned_elsewhere {
            continue;
        }

        let step = enemy.wander.advance(position, home, config, rng);
        let in_flight = enemy.wander.is_in_flight();
        if let Some(next) = step {
            combatant.set_position(&config.bounds, next);
            combatant.pose = if in_flight { Pose::Walking } else { Pose::Idle };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Combatant;
    use rand::SeedableRng;

    fn fast_config() -> BattleConfig {
        BattleConfig {
            wander_min_ticks: 5,
            wander_max_ticks: 10,
            wander_duration_ticks: 20,
            ..Default::default()
        }
    }

    #[test]
    fn test_wander_stays_near_home() {
        let config = fast_config();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut roster = Roster::new();
        let home = Vec2::new(200.0, 300.0);
        let id = roster.insert(Combatant::enemy(0, home, 16.0));

        let mut moved = false;
        for _ in 0..500 {
            wander_system(&mut roster, &config, &mut rng);
            let c = roster.get(id).unwrap();
            assert!(c.position.distance(home) <= config.wander_radius * 2.0 + 1e-3);
            moved |= c.position != home;
        }
        assert!(moved);
    }

    #[test]
    fn test_wander_step_completes_at_target() {
        let config = fast_config();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut state = WanderState::default();
        let home = Vec2::new(100.0, 100.0);

        let mut pos = home;
        let mut ticks = 0;
        while !state.is_in_flight() {
            assert!(state.advance(pos, home, &config, &mut rng).is_none());
            ticks += 1;
            assert!(ticks <= 10);
        }
        let target = state.target;
        for _ in 0..20 {
            pos = state.advance(pos, home, &config, &mut rng).unwrap();
        }
        assert_eq!(pos, target);
        assert!(!state.is_in_flight());
        assert!(state.countdown() >= 5);
    }

    #[test]
    fn test_casting_or_dead_never_moves() {
        let config = fast_config();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut roster = Roster::new();
        let caster = roster.insert(Combatant::enemy(0, Vec2::new(100.0, 100.0), 16.0));
        let corpse = roster.insert(Combatant::enemy(0, Vec2::new(300.0, 100.0), 16.0));
        roster.get_mut(caster).unwrap().casting = true;
        roster.get_mut(corpse).unwrap().mark_dead();

        for _ in 0..1000 {
            wander_system(&mut roster, &config, &mut rng);
            assert_eq!(roster.get(caster).unwrap().position, Vec2::new(100.0, 100.0));
            assert_eq!(roster.get(corpse).unwrap().position, Vec2::new(300.0, 100.0));
        }
    }

    #[test]
    fn test_players_do_not_wander() {
        let config = fast_config();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut roster = Roster::new();
        let id = roster.insert(Combatant::player(0, Vec2::new(600.0, 300.0), 16.0));
        for _ in 0..200 {
            wander_system(&mut roster, &config, &mut rng);
        }
        assert_eq!(roster.get(id).unwrap().position, Vec2::new(600.0, 300.0));
    }
}
