//! Read-only snapshots for the rendering layer.

use serde::{Deserialize, Serialize};

use crate::components::{Combatant, CombatantId, Pose, Team};
use crate::config::BattleConfig;
use crate::math::{Fixed, Vec2};
use crate::movement::{MovementState, Phase};

/// Horizontal facing of a sprite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Facing {
    /// Looking toward -x.
    Left,
    /// Looking toward +x.
    Right,
}

/// Everything a renderer needs to draw one combatant this tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatantView {
    /// Combatant ID.
    pub id: CombatantId,
    /// Side.
    pub team: Team,
    /// Current position.
    pub position: Vec2,
    /// Gauge fill in `[0, 1]`.
    pub gauge_ratio: f32,
    /// Telegraph countdown progress in `[0, 1]`, 0 when inactive.
    pub telegraph_progress: f32,
    /// Telegraph warning point while active.
    pub telegraph_point: Option<Vec2>,
    /// Executor phase.
    pub phase: Phase,
    /// Animation pose.
    pub pose: Pose,
    /// Sprite facing.
    pub facing: Facing,
    /// Draw an afterimage trail.
    pub afterimage: bool,
    /// Casting flag.
    pub casting: bool,
    /// Knocked out.
    pub dead: bool,
}

impl CombatantView {
    /// Snapshot a combatant.
    #[must_use]
    pub fn capture(combatant: &Combatant, config: &BattleConfig) -> Self {
        let movement = combatant.movement.as_ref();
        let telegraph = combatant.enemy_data().map(|e| &e.telegraph);
        let max = config.max_gauge_fixed();
        let gauge_ratio = if max > Fixed::ZERO {
            (combatant.gauge / max).to_num::<f32>().clamp(0.0, 1.0)
        } else {
            0.0
        };

        Self {
            id: combatant.id,
            team: combatant.team(),
            position: combatant.position,
            gauge_ratio,
            telegraph_progress: telegraph.map_or(0.0, |t| t.progress()),
            telegraph_point: telegraph.and_then(|t| t.target_point()),
            phase: movement.map_or(Phase::Idle, MovementState::phase),
            pose: combatant.pose,
            facing: facing(combatant),
            afterimage: movement.is_some_and(MovementState::afterimage_active),
            casting: combatant.casting,
            dead: combatant.dead,
        }
    }
}

fn facing(combatant: &Combatant) -> Facing {
    let travel = combatant
        .movement
        .as_ref()
        .and_then(MovementState::travel_direction)
        .map(|d| d.x)
        .filter(|x| x.abs() > f32::EPSILON);
    match travel {
        Some(x) if x > 0.0 => Facing::Right,
        Some(_) => Facing::Left,
        // Idle combatants face the other side of the field.
        None => match combatant.team() {
            Team::Party => Facing::Left,
            Team::Troop => Facing::Right,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_view() {
        let config = BattleConfig::default();
        let mut player = Combatant::player(1, Vec2::new(600.0, 300.0), 16.0);
        player.gauge = Fixed::from_num(250);
        let view = CombatantView::capture(&player, &config);
        assert!((view.gauge_ratio - 0.25).abs() < 1e-6);
        assert_eq!(view.phase, Phase::Idle);
        assert_eq!(view.facing, Facing::Left);
        assert!(view.telegraph_point.is_none());
        assert!(!view.afterimage);

        let enemy = Combatant::enemy(2, Vec2::new(200.0, 300.0), 16.0);
        assert_eq!(CombatantView::capture(&enemy, &config).facing, Facing::Right);
    }
}
