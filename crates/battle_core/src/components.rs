//! Combatant definitions.
//!
//! Party members and enemies share one [`Combatant`] shape. What differs
//! lives in the [`CombatantKind`] variant: players carry their formation
//! point, enemies carry their wander and telegraph state.

use serde::{Deserialize, Serialize};

use crate::action::ActionRequest;
use crate::math::{fixed_serde, Bounds, Fixed, Vec2};
use crate::movement::MovementState;
use crate::telegraph::TelegraphState;
use crate::wander::WanderState;

/// Unique identifier for combatants.
pub type CombatantId = u64;

/// Side of the battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    /// Player-controlled units.
    Party,
    /// Enemy units.
    Troop,
}

impl Team {
    /// The other side.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Team::Party => Team::Troop,
            Team::Troop => Team::Party,
        }
    }

    /// Horizontal side this team approaches its targets from.
    ///
    /// The party stands to the right of the field and attacks from +x,
    /// enemies attack from -x.
    #[must_use]
    pub const fn approach_side(self) -> f32 {
        match self {
            Team::Party => 1.0,
            Team::Troop => -1.0,
        }
    }
}

/// Animation pose exposed to the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Pose {
    /// Standing.
    #[default]
    Idle,
    /// Moving under its own power.
    Walking,
    /// Physical strike.
    Attacking,
    /// Magical strike or cast in progress.
    Casting,
    /// Post-battle celebration.
    Victory,
    /// Knocked out.
    Dead,
}

/// Player-only data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerUnit {
    /// Formation entry point the unit returns to after victory.
    pub formation: Vec2,
}

/// Enemy-only data.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EnemyUnit {
    /// Delayed-attack warning.
    pub telegraph: TelegraphState,
    /// Ambient drift around home.
    pub wander: WanderState,
}

/// Player or enemy variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CombatantKind {
    /// Party member.
    Player(PlayerUnit),
    /// Troop member.
    Enemy(EnemyUnit),
}

/// A unit on the battlefield.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combatant {
    /// Unique identifier.
    pub id: CombatantId,
    /// Current position. Always inside the battlefield bounds.
    pub position: Vec2,
    /// Point the unit idles around and retreats to.
    pub home: Vec2,
    /// Readiness gauge in `[0, max_gauge]`.
    #[serde(with = "fixed_serde")]
    pub gauge: Fixed,
    /// An external cast is in progress.
    pub casting: bool,
    /// Knocked out.
    pub dead: bool,
    /// Body radius for approach offsets and hit tests.
    pub collision_radius: f32,
    /// Current animation pose.
    pub pose: Pose,
    /// Active skill animation, if any.
    pub movement: Option<MovementState>,
    /// Action waiting for its cast to finish.
    pub pending_cast: Option<ActionRequest>,
    /// Player or enemy data.
    pub kind: CombatantKind,
}

impl Combatant {
    /// Create a party member standing at its formation point.
    #[must_use]
    pub fn player(id: CombatantId, formation: Vec2, collision_radius: f32) -> Self {
        Self::with_kind(
            id,
            formation,
            collision_radius,
            CombatantKind::Player(PlayerUnit { formation }),
        )
    }

    /// Create an enemy at its home point.
    #[must_use]
    pub fn enemy(id: CombatantId, home: Vec2, collision_radius: f32) -> Self {
        Self::with_kind(
            id,
            home,
            collision_radius,
            CombatantKind::Enemy(EnemyUnit::default()),
        )
    }

    fn with_kind(id: CombatantId, at: Vec2, collision_radius: f32, kind: CombatantKind) -> Self {
        Self {
            id,
            position: at,
            home: at,
            gauge: Fixed::ZERO,
            casting: false,
            dead: false,
            collision_radius,
            pose: Pose::Idle,
            movement: None,
            pending_cast: None,
            kind,
        }
    }

    /// Side this combatant fights on.
    #[must_use]
    pub const fn team(&self) -> Team {
        match self.kind {
            CombatantKind::Player(_) => Team::Party,
            CombatantKind::Enemy(_) => Team::Troop,
        }
    }

    /// Whether this combatant is an enemy.
    #[must_use]
    pub const fn is_enemy(&self) -> bool {
        matches!(self.kind, CombatantKind::Enemy(_))
    }

    /// Whether this combatant can still act and be targeted.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        !self.dead
    }

    /// Whether a skill animation currently owns the position.
    #[must_use]
    pub fn is_executing(&self) -> bool {
        self.movement.as_ref().is_some_and(MovementState::is_active)
    }

    /// Enemy data, if this is an enemy.
    #[must_use]
    pub fn enemy_data(&self) -> Option<&EnemyUnit> {
        match &self.kind {
            CombatantKind::Enemy(enemy) => Some(enemy),
            CombatantKind::Player(_) => None,
        }
    }

    /// Mutable enemy data, if this is an enemy.
    pub fn enemy_data_mut(&mut self) -> Option<&mut EnemyUnit> {
        match &mut self.kind {
            CombatantKind::Enemy(enemy) => Some(enemy),
            CombatantKind::Player(_) => None,
        }
    }

    /// Formation entry point, if this is a party member.
    #[must_use]
    pub fn formation(&self) -> Option<Vec2> {
        match &self.kind {
            CombatantKind::Player(player) => Some(player.formation),
            CombatantKind::Enemy(_) => None,
        }
    }

    /// Write a position, clamped to the battlefield.
    pub fn set_position(&mut self, bounds: &Bounds, position: Vec2) {
        self.position = bounds.clamp(position);
    }

    /// Add to the gauge, clamped to `[0, max]`.
    pub fn fill_gauge(&mut self, amount: Fixed, max: Fixed) {
        self.gauge = (self.gauge.saturating_add(amount)).clamp(Fixed::ZERO, max);
    }

    /// Whether the gauge sits at its ceiling.
    #[must_use]
    pub fn gauge_full(&self, max: Fixed) -> bool {
        self.gauge >= max
    }

    /// Reset the gauge after acting.
    pub fn reset_gauge(&mut self) {
        self.gauge = Fixed::ZERO;
    }

    /// Mark as knocked out and drop every piece of transient state.
    pub fn mark_dead(&mut self) {
        self.dead = true;
        self.casting = false;
        self.pending_cast = None;
        self.movement = None;
        self.pose = Pose::Dead;
        if let Some(enemy) = self.enemy_data_mut() {
            enemy.telegraph.clear();
            enemy.wander.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_from_kind() {
        let player = Combatant::player(1, Vec2::new(600.0, 300.0), 16.0);
        let enemy = Combatant::enemy(2, Vec2::new(200.0, 300.0), 16.0);
        assert_eq!(player.team(), Team::Party);
        assert_eq!(enemy.team(), Team::Troop);
        assert_eq!(player.team().opponent(), Team::Troop);
        assert!(enemy.is_enemy());
        assert_eq!(player.formation(), Some(Vec2::new(600.0, 300.0)));
    }

    #[test]
    fn test_gauge_clamps() {
        let mut c = Combatant::enemy(1, Vec2::ZERO, 16.0);
        let max = Fixed::from_num(100);
        c.fill_gauge(Fixed::from_num(250), max);
        assert_eq!(c.gauge, max);
        assert!(c.gauge_full(max));
        c.fill_gauge(Fixed::from_num(-500), max);
        assert_eq!(c.gauge, Fixed::ZERO);
    }

    #[test]
    fn test_set_position_clamps() {
        let bounds = Bounds::new(Vec2::ZERO, Vec2::new(100.0, 100.0));
        let mut c = Combatant::player(1, Vec2::new(50.0, 50.0), 16.0);
        c.set_position(&bounds, Vec2::new(150.0, -3.0));
        assert_eq!(c.position, Vec2::new(100.0, 0.0));
    }

    #[test]
    fn test_mark_dead_clears_transient_state() {
        let mut c = Combatant::enemy(1, Vec2::ZERO, 16.0);
        c.casting = true;
        c.mark_dead();
        assert!(c.dead);
        assert!(!c.casting);
        assert_eq!(c.pose, Pose::Dead);
        assert!(!c.enemy_data().unwrap().telegraph.is_active());
    }
}
