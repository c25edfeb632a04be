//! Knockback and pull: instantaneous post-hit displacement.
//!
//! These writes complete inside the tick that applies them and leave no
//! state behind. A wander in flight on the target is dropped, and an active
//! executor path is shifted by the applied offset so the next step
//! continues from the displaced position.

use crate::components::{CombatantId, Pose};
use crate::config::BattleConfig;
use crate::math::Vec2;
use crate::roster::Roster;

/// Result of a repositioning attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Displacement {
    /// Target moved from `from` to `to` (after clamping).
    Moved {
        /// Position before the write.
        from: Vec2,
        /// Position after the write.
        to: Vec2,
    },
    /// Nothing happened.
    None,
}

/// Push `target` away from `subject` by `distance`.
pub fn knockback(
    roster: &mut Roster,
    config: &BattleConfig,
    subject: CombatantId,
    target: CombatantId,
    distance: f32,
) -> Displacement {
    if !(distance > 0.0) {
        return Displacement::None;
    }
    let Some((from, dir, _gap)) = geometry(roster, subject, target) else {
        return Displacement::None;
    };
    write(roster, config, target, from + dir.scale(distance))
}

/// Pull `target` toward `subject` by `distance`, stopping short of contact.
///
/// The travel is `min(distance, gap - 2 * collision_radius)` where the
/// collision radius is the target's. Nothing moves when that is not
/// positive.
pub fn pull(
    roster: &mut Roster,
    config: &BattleConfig,
    subject: CombatantId,
    target: CombatantId,
    distance: f32,
) -> Displacement {
    if !(distance > 0.0) {
        return Displacement::None;
    }
    let Some((from, dir, gap)) = geometry(roster, subject, target) else {
        return Displacement::None;
    };
    let radius = roster.get(target).map_or(0.0, |c| c.collision_radius);
    let travel = distance.min(gap - 2.0 * radius);
    if travel <= 0.0 {
        return Displacement::None;
    }
    write(roster, config, target, from - dir.scale(travel))
}

/// Target position, unit direction subject→target, and gap between them.
fn geometry(roster: &Roster, subject: CombatantId, target: CombatantId) -> Option<(Vec2, Vec2, f32)> {
    let s = roster.get(subject)?;
    let t = roster.get(target)?;
    if t.dead {
        return None;
    }
    let delta = t.position - s.position;
    let dir = delta.try_normalize()?;
    Some((t.position, dir, delta.length()))
}

fn write(roster: &mut Roster, config: &BattleConfig, target: CombatantId, to: Vec2) -> Displacement {
    let Some(t) = roster.get_mut(target) else {
        return Displacement::None;
    };
    let from = t.position;
    t.set_position(&config.bounds, to);
    let delta = t.position - from;
    if let Some(state) = t.movement.as_mut() {
        state.translate(delta, &config.bounds);
    }
    let was_wandering = t.enemy_data().is_some_and(|e| e.wander.is_in_flight());
    if let Some(enemy) = t.enemy_data_mut() {
        enemy.wander.cancel();
    }
    if was_wandering && !t.is_executing() {
        t.pose = Pose::Idle;
    }
    if t.is_enemy() {
        t.home = t.position;
    }
    tracing::debug!(combatant = target, ?from, to = ?t.position, "Repositioned");
    Displacement::Moved {
        from,
        to: t.position,
    }
}
