//! Movement executor: turns a chosen action into a timed sequence of
//! position updates, strike pauses and pierce hit checks.
//!
//! The executor is a finite state machine. Each movement mode is a path
//! through the [`next_phase`] table; the strike pause is an ordinary phase
//! rather than a stored continuation.
//!
//! | Mode        | Path                                        |
//! |-------------|---------------------------------------------|
//! | Stay        | Striking → Idle                             |
//! | Dashback    | Rushing → Striking → Returning → Idle       |
//! | Rush        | Rushing → Striking → Idle                   |
//! | Passthrough | Rushing → Striking → Passthrough → Idle     |
//! | Pierce      | Piercing → Striking → Returning → Idle      |

use std::collections::BTreeSet;

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::action::{ActionPipeline, ActionRequest};
use crate::components::{CombatantId, Pose};
use crate::config::BattleConfig;
use crate::data::{MovementMode, SkillKind};
use crate::error::ActionFault;
use crate::events::{BattleEvent, TickEvents};
use crate::math::{ease_out_quad, Bounds, Vec2};
use crate::resolve::apply_to_target;
use crate::roster::Roster;
use crate::spatial::{expand_aoe_targets, in_line, scope_filter};
use crate::wander::random_offset;

/// Executor phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Phase {
    /// Nothing animating.
    #[default]
    Idle,
    /// Eased approach toward the target.
    Rushing,
    /// Attack or cast pose hold.
    Striking,
    /// Eased retreat.
    Returning,
    /// Linear follow-through past the target.
    Passthrough,
    /// Linear dash through the target line.
    Piercing,
}

/// Phase that follows `finished` for a given mode.
#[must_use]
pub const fn next_phase(mode: MovementMode, finished: Phase) -> Phase {
    use MovementMode as M;
    match (mode, finished) {
        (M::Dashback | M::Rush | M::Passthrough, Phase::Rushing) => Phase::Striking,
        (M::Pierce, Phase::Piercing) => Phase::Striking,
        (M::Dashback | M::Pierce, Phase::Striking) => Phase::Returning,
        (M::Passthrough, Phase::Striking) => Phase::Passthrough,
        _ => Phase::Idle,
    }
}

/// Transient per-combatant animation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementState {
    phase: Phase,
    mode: MovementMode,
    action: ActionRequest,
    start: Vec2,
    target: Vec2,
    progress: f32,
    speed: f32,
    strike_ticks: u32,
    approach_dir: Vec2,
    approach_distance: f32,
    adopt_home: bool,
    hit_set: Option<BTreeSet<CombatantId>>,
}

impl MovementState {
    fn new(mode: MovementMode, action: ActionRequest, at: Vec2) -> Self {
        Self {
            phase: Phase::Idle,
            mode,
            action,
            start: at,
            target: at,
            progress: 0.0,
            speed: 0.0,
            strike_ticks: 0,
            approach_dir: Vec2::ZERO,
            approach_distance: 0.0,
            adopt_home: false,
            hit_set: (mode == MovementMode::Pierce).then(BTreeSet::new),
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Mode actually being executed (after any fallback to Stay).
    #[must_use]
    pub const fn mode(&self) -> MovementMode {
        self.mode
    }

    /// Whether the state still owns the combatant's position.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// The action being animated.
    #[must_use]
    pub const fn action(&self) -> &ActionRequest {
        &self.action
    }

    /// Progress of the current translation phase in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> f32 {
        self.progress.min(1.0)
    }

    /// Start point of the current translation.
    #[must_use]
    pub const fn start(&self) -> Vec2 {
        self.start
    }

    /// End point of the current translation.
    #[must_use]
    pub const fn target(&self) -> Vec2 {
        self.target
    }

    /// Opponents already struck by this pierce.
    #[must_use]
    pub fn pierce_hits(&self) -> usize {
        self.hit_set.as_ref().map_or(0, BTreeSet::len)
    }

    /// Direction of travel for facing, if moving.
    #[must_use]
    pub fn travel_direction(&self) -> Option<Vec2> {
        match self.phase {
            Phase::Idle | Phase::Striking => None,
            _ => (self.target - self.start).try_normalize(),
        }
    }

    /// Whether the afterimage trail should be drawn this tick.
    #[must_use]
    pub fn afterimage_active(&self) -> bool {
        self.action.afterimage_trail && matches!(self.phase, Phase::Rushing | Phase::Piercing)
    }

    /// Shift the path by a displacement written from outside the executor,
    /// so the next step continues from the displaced position.
    pub(crate) fn translate(&mut self, delta: Vec2, bounds: &Bounds) {
        self.start = self.start + delta;
        self.target = bounds.clamp(self.target + delta);
    }

    fn begin_move(&mut self, phase: Phase, from: Vec2, to: Vec2, speed: f32) {
        self.phase = phase;
        self.start = from;
        self.target = to;
        self.progress = 0.0;
        self.speed = speed;
    }
}

/// Drives every combatant's [`MovementState`] for one tick.
///
/// Collaborator faults raised along the way are collected rather than
/// handled here; the battle's fault handler consumes them via
/// [`MovementExecutor::into_faults`].
pub struct MovementExecutor<'a> {
    roster: &'a mut Roster,
    config: &'a BattleConfig,
    rng: &'a mut ChaCha8Rng,
    pipeline: &'a mut dyn ActionPipeline,
    tick: u64,
    events: &'a mut TickEvents,
    faults: Vec<(CombatantId, ActionFault)>,
}

impl<'a> MovementExecutor<'a> {
    /// Create an executor over a roster for one tick.
    pub fn new(
        roster: &'a mut Roster,
        config: &'a BattleConfig,
        rng: &'a mut ChaCha8Rng,
        pipeline: &'a mut dyn ActionPipeline,
        tick: u64,
        events: &'a mut TickEvents,
    ) -> Self {
        Self {
            roster,
            config,
            rng,
            pipeline,
            tick,
            events,
            faults: Vec::new(),
        }
    }

    /// Faults collected so far.
    #[must_use]
    pub fn into_faults(self) -> Vec<(CombatantId, ActionFault)> {
        self.faults
    }

    /// Start animating an action. The caller guarantees the subject is
    /// alive and not already executing.
    pub fn perform(&mut self, mut action: ActionRequest) {
        let id = action.subject;
        let Some(subject) = self.roster.get(id) else {
            return;
        };
        if subject.dead {
            return;
        }
        let origin = subject.position;
        let team = subject.team();
        let subject_radius = subject.collision_radius;
        let filter = scope_filter(subject, action.skill.scope);

        action.targets.retain(|t| self.roster.is_alive(*t));
        if action.targets.is_empty() {
            let candidates: Vec<CombatantId> = self
                .roster
                .living(filter)
                .iter()
                .map(|c| c.id)
                .filter(|c| *c != id)
                .collect();
            if let Some(&pick) = candidates.choose(self.rng) {
                tracing::debug!(combatant = id, target = pick, "Falling back to random target");
                action.targets.push(pick);
            }
        }

        let mut mode = action.skill.movement;
        if mode != MovementMode::Pierce {
            action.targets = expand_aoe_targets(self.roster, &action);
        }

        let primary = action
            .primary_target()
            .and_then(|t| self.roster.get(t))
            .map(|t| (t.position, t.collision_radius));
        if primary.is_none() && mode != MovementMode::Stay {
            tracing::debug!(combatant = id, ?mode, "No target resolvable, staying in place");
            mode = MovementMode::Stay;
        }

        // Pierce needs a direction; standing on the target leaves none.
        let pierce_dir = match (mode, primary) {
            (MovementMode::Pierce, Some((pos, _))) => (pos - origin).try_normalize(),
            _ => None,
        };
        if mode == MovementMode::Pierce && pierce_dir.is_none() {
            mode = MovementMode::Stay;
        }

        self.events.push(BattleEvent::ActionStarted {
            subject: id,
            skill: action.skill.id.clone(),
            mode,
            targets: action.targets.clone(),
        });

        if let Some(c) = self.roster.get_mut(id) {
            if let Some(enemy) = c.enemy_data_mut() {
                enemy.wander.cancel();
            }
        }

        let mut state = MovementState::new(mode, action, origin);
        match (mode, primary, pierce_dir) {
            (MovementMode::Pierce, Some((pos, _)), Some(dir)) => {
                let end = self
                    .config
                    .bounds
                    .clamp(pos + dir.scale(self.config.pierce_overshoot));
                state.approach_dir = dir;
                state.approach_distance = origin.distance(end);
                state.begin_move(Phase::Piercing, origin, end, self.config.pierce_speed);
                self.set_pose(id, Pose::Walking);
            }
            (mode, Some((pos, radius)), _) if mode.approaches_target() => {
                let offset = radius + subject_radius + self.config.approach_gap;
                let approach = self
                    .config
                    .bounds
                    .clamp(Vec2::new(pos.x + team.approach_side() * offset, pos.y));
                state.approach_dir = (approach - origin)
                    .try_normalize()
                    .unwrap_or(Vec2::new(-team.approach_side(), 0.0));
                state.approach_distance = origin.distance(approach);
                state.begin_move(Phase::Rushing, origin, approach, self.config.rush_speed);
                self.set_pose(id, Pose::Walking);
            }
            _ => self.enter_phase(id, &mut state, Phase::Striking),
        }

        tracing::debug!(combatant = id, ?mode, phase = ?state.phase, "Action performed");
        self.store(id, state);
    }

    /// Advance every active executor in ID order.
    pub fn advance_all(&mut self) {
        self.advance_all_except(&BTreeSet::new());
    }

    /// Advance every active executor in ID order, skipping `started`.
    ///
    /// Actions begun earlier in the same tick are passed here so their first
    /// step lands on the following tick, as it does for actions begun
    /// between ticks.
    pub fn advance_all_except(&mut self, started: &BTreeSet<CombatantId>) {
        for id in self.roster.sorted_ids() {
            if !started.contains(&id) {
                self.advance(id);
            }
        }
    }

    /// Advance one combatant's executor by a tick.
    pub fn advance(&mut self, id: CombatantId) {
        let Some(c) = self.roster.get_mut(id) else {
            return;
        };
        let Some(mut state) = c.movement.take() else {
            return;
        };
        if c.dead {
            tracing::debug!(combatant = id, phase = ?state.phase, "Owner died, executor forced idle");
            return;
        }

        let finished = match state.phase {
            Phase::Rushing | Phase::Returning => {
                state.progress += state.speed;
                let t = ease_out_quad(state.progress.min(1.0));
                self.move_to(id, state.start.lerp(state.target, t), &state);
                state.progress >= 1.0
            }
            Phase::Passthrough => {
                state.progress += state.speed;
                let t = state.progress.min(1.0);
                self.move_to(id, state.start.lerp(state.target, t), &state);
                state.progress >= 1.0
            }
            Phase::Piercing => {
                let before = self.roster.position_of(id).unwrap_or(state.start);
                state.progress += state.speed;
                let t = state.progress.min(1.0);
                self.move_to(id, state.start.lerp(state.target, t), &state);
                let after = self.roster.position_of(id).unwrap_or(before);
                self.pierce_hits(id, &mut state, before, after);
                state.progress >= 1.0
            }
            Phase::Striking => {
                state.strike_ticks = state.strike_ticks.saturating_sub(1);
                state.strike_ticks == 0
            }
            Phase::Idle => true,
        };

        if finished {
            let next = next_phase(state.mode, state.phase);
            self.enter_phase(id, &mut state, next);
        }
        self.store(id, state);
    }

    fn move_to(&mut self, id: CombatantId, to: Vec2, state: &MovementState) {
        // Snap exactly onto the endpoint once progress completes.
        let to = if state.progress >= 1.0 { state.target } else { to };
        if let Some(c) = self.roster.get_mut(id) {
            c.set_position(&self.config.bounds, to);
        }
    }

    fn pierce_hits(&mut self, id: CombatantId, state: &mut MovementState, from: Vec2, to: Vec2) {
        let Some(subject) = self.roster.get(id) else {
            return;
        };
        let width = subject.collision_radius * 2.0;
        let filter = scope_filter(subject, state.action.skill.scope);
        let struck: Vec<CombatantId> = self
            .roster
            .living(filter)
            .iter()
            .filter(|c| c.id != id && in_line(from, to, width, c.position, c.collision_radius))
            .map(|c| c.id)
            .collect();

        let hit_set = state.hit_set.get_or_insert_with(BTreeSet::new);
        let fresh: Vec<CombatantId> = struck.into_iter().filter(|t| hit_set.insert(*t)).collect();
        for target in fresh {
            self.apply(id, target, state);
        }
    }

    fn apply(&mut self, id: CombatantId, target: CombatantId, state: &MovementState) {
        let outcome = apply_to_target(
            self.roster,
            self.config,
            self.tick,
            self.pipeline,
            id,
            target,
            &state.action.skill,
            self.events,
        );
        if let Err(fault) = outcome {
            self.faults.push((id, fault));
        }
    }

    fn enter_phase(&mut self, id: CombatantId, state: &mut MovementState, phase: Phase) {
        let Some(c) = self.roster.get(id) else {
            state.phase = Phase::Idle;
            return;
        };
        let (position, home) = (c.position, c.home);

        match phase {
            Phase::Striking => {
                state.phase = Phase::Striking;
                state.strike_ticks = self.config.strike_ticks.max(1);
                let pose = match state.action.skill.kind {
                    SkillKind::Physical => Pose::Attacking,
                    SkillKind::Magical => Pose::Casting,
                };
                self.set_pose(id, pose);
                self.events.push(BattleEvent::Strike {
                    subject: id,
                    skill: state.action.skill.id.clone(),
                });
                if state.mode != MovementMode::Pierce {
                    for target in state.action.targets.clone() {
                        self.apply(id, target, state);
                    }
                }
            }
            Phase::Returning => {
                let dest = match state.action.skill.retreat {
                    Some(retreat) => {
                        state.adopt_home = true;
                        position + retreat.offset()
                    }
                    None => home + random_offset(self.config.retreat_scatter, self.rng),
                };
                let dest = self.config.bounds.clamp(dest);
                state.begin_move(Phase::Returning, position, dest, self.config.return_speed);
                self.set_pose(id, Pose::Walking);
            }
            Phase::Passthrough => {
                let overshoot = self
                    .config
                    .passthrough_min_overshoot
                    .max(state.approach_distance / 2.0);
                let dest = self
                    .config
                    .bounds
                    .clamp(position + state.approach_dir.scale(overshoot));
                state.begin_move(
                    Phase::Passthrough,
                    position,
                    dest,
                    self.config.passthrough_speed,
                );
                self.set_pose(id, Pose::Walking);
            }
            Phase::Rushing | Phase::Piercing | Phase::Idle => {
                state.phase = Phase::Idle;
                let adopt = state.adopt_home
                    || matches!(state.mode, MovementMode::Rush | MovementMode::Passthrough);
                if let Some(c) = self.roster.get_mut(id) {
                    if adopt {
                        c.home = c.position;
                    }
                    if !c.dead {
                        c.pose = Pose::Idle;
                    }
                }
                self.events.push(BattleEvent::ActionFinished { subject: id });
                tracing::debug!(combatant = id, "Action finished");
            }
        }
    }

    fn set_pose(&mut self, id: CombatantId, pose: Pose) {
        if let Some(c) = self.roster.get_mut(id) {
            if !c.dead {
                c.pose = pose;
            }
        }
    }

    fn store(&mut self, id: CombatantId, state: MovementState) {
        if let Some(c) = self.roster.get_mut(id) {
            c.movement = (state.is_active() && !c.dead).then_some(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::HitResult;
    use crate::components::Combatant;
    use crate::data::SkillData;
    use crate::roster::BattleContext;
    use rand::SeedableRng;

    #[derive(Default)]
    struct CountingPipeline {
        applied: Vec<CombatantId>,
    }

    impl ActionPipeline for CountingPipeline {
        fn make_targets(
            &mut self,
            _ctx: &BattleContext<'_>,
            _subject: CombatantId,
            _skill: &SkillData,
        ) -> Result<Vec<CombatantId>, ActionFault> {
            Ok(Vec::new())
        }

        fn apply(
            &mut self,
            _ctx: &BattleContext<'_>,
            _subject: CombatantId,
            target: CombatantId,
            _skill: &SkillData,
        ) -> Result<HitResult, ActionFault> {
            self.applied.push(target);
            Ok(HitResult::HIT)
        }
    }

    struct Rig {
        roster: Roster,
        config: BattleConfig,
        rng: ChaCha8Rng,
        pipeline: CountingPipeline,
        events: TickEvents,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                roster: Roster::new(),
                config: BattleConfig::default(),
                rng: ChaCha8Rng::seed_from_u64(11),
                pipeline: CountingPipeline::default(),
                events: TickEvents::default(),
            }
        }

        fn perform(&mut self, action: ActionRequest) {
            let mut exec = MovementExecutor::new(
                &mut self.roster,
                &self.config,
                &mut self.rng,
                &mut self.pipeline,
                0,
                &mut self.events,
            );
            exec.perform(action);
        }

        fn step(&mut self) {
            let mut exec = MovementExecutor::new(
                &mut self.roster,
                &self.config,
                &mut self.rng,
                &mut self.pipeline,
                0,
                &mut self.events,
            );
            exec.advance_all();
        }

        fn run_until_idle(&mut self, id: CombatantId) -> u32 {
            let mut ticks = 0;
            while self.roster.get(id).unwrap().is_executing() {
                self.step();
                ticks += 1;
                assert!(ticks < 1000, "executor never finished");
            }
            ticks
        }

        fn phase(&self, id: CombatantId) -> Phase {
            self.roster
                .get(id)
                .unwrap()
                .movement
                .as_ref()
                .map_or(Phase::Idle, MovementState::phase)
        }
    }

    #[test]
    fn test_transition_table() {
        use MovementMode as M;
        assert_eq!(next_phase(M::Stay, Phase::Striking), Phase::Idle);
        assert_eq!(next_phase(M::Dashback, Phase::Rushing), Phase::Striking);
        assert_eq!(next_phase(M::Dashback, Phase::Striking), Phase::Returning);
        assert_eq!(next_phase(M::Dashback, Phase::Returning), Phase::Idle);
        assert_eq!(next_phase(M::Rush, Phase::Striking), Phase::Idle);
        assert_eq!(next_phase(M::Passthrough, Phase::Striking), Phase::Passthrough);
        assert_eq!(next_phase(M::Passthrough, Phase::Passthrough), Phase::Idle);
        assert_eq!(next_phase(M::Pierce, Phase::Piercing), Phase::Striking);
        assert_eq!(next_phase(M::Pierce, Phase::Striking), Phase::Returning);
    }

    #[test]
    fn test_stay_strikes_then_idles() {
        let mut rig = Rig::new();
        let p = rig.roster.insert(Combatant::player(0, Vec2::new(600.0, 300.0), 16.0));
        let e = rig.roster.insert(Combatant::enemy(0, Vec2::new(200.0, 300.0), 16.0));
        rig.perform(ActionRequest::new(p, SkillData::new("bolt").with_kind(SkillKind::Magical), vec![e]));

        assert_eq!(rig.phase(p), Phase::Striking);
        assert_eq!(rig.roster.get(p).unwrap().pose, Pose::Casting);
        assert_eq!(rig.pipeline.applied, vec![e]);

        let ticks = rig.run_until_idle(p);
        assert_eq!(ticks, rig.config.strike_ticks);
        assert_eq!(rig.roster.get(p).unwrap().position, Vec2::new(600.0, 300.0));
    }

    #[test]
    fn test_action_started_this_tick_steps_from_the_next() {
        let mut rig = Rig::new();
        let p = rig.roster.insert(Combatant::player(0, Vec2::new(600.0, 300.0), 16.0));
        let e = rig.roster.insert(Combatant::enemy(0, Vec2::new(200.0, 300.0), 16.0));
        rig.perform(ActionRequest::new(e, SkillData::new("bite"), vec![p]));

        let mut exec = MovementExecutor::new(
            &mut rig.roster,
            &rig.config,
            &mut rig.rng,
            &mut rig.pipeline,
            0,
            &mut rig.events,
        );
        exec.advance_all_except(&BTreeSet::from([e]));
        let state = rig.roster.get(e).unwrap().movement.as_ref().unwrap();
        assert_eq!(state.strike_ticks, rig.config.strike_ticks);

        assert_eq!(rig.run_until_idle(e), rig.config.strike_ticks);
    }

    #[test]
    fn test_knockback_mid_rush_shifts_remaining_path() {
        let mut rig = Rig::new();
        let p = rig.roster.insert(Combatant::player(0, Vec2::new(600.0, 300.0), 16.0));
        let e = rig.roster.insert(Combatant::enemy(0, Vec2::new(200.0, 300.0), 16.0));
        rig.perform(ActionRequest::new(
            e,
            SkillData::new("bite").with_movement(MovementMode::Rush),
            vec![p],
        ));
        rig.step();
        assert_eq!(rig.phase(e), Phase::Rushing);

        crate::reposition::knockback(&mut rig.roster, &rig.config, p, e, 50.0);
        let state = rig.roster.get(e).unwrap().movement.as_ref().unwrap();
        assert!((state.target().x - 510.0).abs() < 1e-3);

        rig.run_until_idle(e);
        let enemy = rig.roster.get(e).unwrap();
        // Arrival keeps the 50 unit offset instead of snapping back to 560.
        assert!((enemy.position.x - 510.0).abs() < 1e-3);
        assert_eq!(enemy.home, enemy.position);
    }

    #[test]
    fn test_rush_holds_arrival_point() {
        let mut rig = Rig::new();
        let p = rig.roster.insert(Combatant::player(0, Vec2::new(600.0, 300.0), 16.0));
        let e = rig.roster.insert(Combatant::enemy(0, Vec2::new(200.0, 300.0), 16.0));
        rig.perform(ActionRequest::new(
            p,
            SkillData::new("charge").with_movement(MovementMode::Rush),
            vec![e],
        ));
        assert_eq!(rig.phase(p), Phase::Rushing);
        rig.run_until_idle(p);

        let player = rig.roster.get(p).unwrap();
        // Party approaches from +x: 200 + 16 + 16 + 8.
        assert_eq!(player.position, Vec2::new(240.0, 300.0));
        assert_eq!(player.home, player.position);
        assert_eq!(rig.pipeline.applied, vec![e]);
    }

    #[test]
    fn test_enemy_approaches_from_left() {
        let mut rig = Rig::new();
        let p = rig.roster.insert(Combatant::player(0, Vec2::new(600.0, 300.0), 16.0));
        let e = rig.roster.insert(Combatant::enemy(0, Vec2::new(200.0, 300.0), 16.0));
        rig.perform(ActionRequest::new(
            e,
            SkillData::new("bite").with_movement(MovementMode::Rush),
            vec![p],
        ));
        rig.run_until_idle(e);
        assert_eq!(rig.roster.get(e).unwrap().position, Vec2::new(560.0, 300.0));
    }

    #[test]
    fn test_dashback_with_retreat_adopts_home() {
        let mut rig = Rig::new();
        let p = rig.roster.insert(Combatant::player(0, Vec2::new(600.0, 300.0), 16.0));
        let e = rig.roster.insert(Combatant::enemy(0, Vec2::new(200.0, 300.0), 16.0));
        rig.perform(ActionRequest::new(
            p,
            SkillData::new("hit_and_run")
                .with_movement(MovementMode::Dashback)
                .with_retreat(0.0, 100.0),
            vec![e],
        ));
        rig.run_until_idle(p);
        let player = rig.roster.get(p).unwrap();
        assert!((player.position.x - 340.0).abs() < 1e-3);
        assert!((player.position.y - 300.0).abs() < 1e-3);
        assert_eq!(player.home, player.position);
    }

    #[test]
    fn test_dashback_without_retreat_scatters_near_home() {
        for seed in 0..20 {
            let mut rig = Rig::new();
            rig.rng = ChaCha8Rng::seed_from_u64(seed);
            let home = Vec2::new(600.0, 300.0);
            let p = rig.roster.insert(Combatant::player(0, home, 16.0));
            let e = rig.roster.insert(Combatant::enemy(0, Vec2::new(200.0, 300.0), 16.0));
            rig.perform(ActionRequest::new(
                p,
                SkillData::new("slash").with_movement(MovementMode::Dashback),
                vec![e],
            ));
            rig.run_until_idle(p);
            let player = rig.roster.get(p).unwrap();
            assert!(player.position.distance(home) <= rig.config.retreat_scatter + 1e-3);
            assert_eq!(player.home, home);
        }
    }

    #[test]
    fn test_passthrough_overshoots_past_target() {
        let mut rig = Rig::new();
        let p = rig.roster.insert(Combatant::player(0, Vec2::new(600.0, 300.0), 16.0));
        let e = rig.roster.insert(Combatant::enemy(0, Vec2::new(200.0, 300.0), 16.0));
        rig.perform(ActionRequest::new(
            p,
            SkillData::new("dash_cut").with_movement(MovementMode::Passthrough),
            vec![e],
        ));
        rig.run_until_idle(p);
        let player = rig.roster.get(p).unwrap();
        // Approach travel is 360, half of it beats the 80 minimum.
        assert!((player.position.x - 60.0).abs() < 1e-3);
        assert_eq!(player.home, player.position);
    }

    #[test]
    fn test_pierce_hits_each_opponent_once() {
        let mut rig = Rig::new();
        let p = rig.roster.insert(Combatant::player(0, Vec2::new(600.0, 300.0), 16.0));
        let e1 = rig.roster.insert(Combatant::enemy(0, Vec2::new(200.0, 300.0), 16.0));
        let e2 = rig.roster.insert(Combatant::enemy(0, Vec2::new(400.0, 305.0), 16.0));
        let off = rig.roster.insert(Combatant::enemy(0, Vec2::new(400.0, 500.0), 16.0));
        rig.perform(ActionRequest::new(
            p,
            SkillData::new("lance").with_movement(MovementMode::Pierce),
            vec![e1],
        ));
        assert_eq!(rig.phase(p), Phase::Piercing);
        rig.run_until_idle(p);

        let mut applied = rig.pipeline.applied.clone();
        applied.sort_unstable();
        assert_eq!(applied, vec![e1, e2]);
        assert!(!applied.contains(&off));
    }

    #[test]
    fn test_pierce_ignores_allies() {
        let mut rig = Rig::new();
        let p = rig.roster.insert(Combatant::player(0, Vec2::new(600.0, 300.0), 16.0));
        let ally = rig.roster.insert(Combatant::player(0, Vec2::new(400.0, 300.0), 16.0));
        let e = rig.roster.insert(Combatant::enemy(0, Vec2::new(200.0, 300.0), 16.0));
        rig.perform(ActionRequest::new(
            p,
            SkillData::new("lance").with_movement(MovementMode::Pierce),
            vec![e],
        ));
        rig.run_until_idle(p);
        assert_eq!(rig.pipeline.applied, vec![e]);
        assert!(!rig.pipeline.applied.contains(&ally));
    }

    #[test]
    fn test_no_target_falls_back_to_random_opponent() {
        let mut rig = Rig::new();
        let p = rig.roster.insert(Combatant::player(0, Vec2::new(600.0, 300.0), 16.0));
        let e = rig.roster.insert(Combatant::enemy(0, Vec2::new(200.0, 300.0), 16.0));
        rig.perform(ActionRequest::new(
            p,
            SkillData::new("slash").with_movement(MovementMode::Rush),
            Vec::new(),
        ));
        rig.run_until_idle(p);
        assert_eq!(rig.pipeline.applied, vec![e]);
    }

    #[test]
    fn test_no_opponents_falls_back_to_stay() {
        let mut rig = Rig::new();
        let p = rig.roster.insert(Combatant::player(0, Vec2::new(600.0, 300.0), 16.0));
        rig.perform(ActionRequest::new(
            p,
            SkillData::new("slash").with_movement(MovementMode::Dashback),
            Vec::new(),
        ));
        assert_eq!(rig.phase(p), Phase::Striking);
        rig.run_until_idle(p);
        assert_eq!(rig.roster.get(p).unwrap().position, Vec2::new(600.0, 300.0));
        assert!(rig.pipeline.applied.is_empty());
    }

    #[test]
    fn test_death_forces_idle() {
        let mut rig = Rig::new();
        let p = rig.roster.insert(Combatant::player(0, Vec2::new(600.0, 300.0), 16.0));
        let e = rig.roster.insert(Combatant::enemy(0, Vec2::new(200.0, 300.0), 16.0));
        rig.perform(ActionRequest::new(
            p,
            SkillData::new("charge").with_movement(MovementMode::Rush),
            vec![e],
        ));
        rig.step();
        let before = rig.roster.get(p).unwrap().position;
        rig.roster.get_mut(p).unwrap().dead = true;
        rig.step();
        let player = rig.roster.get(p).unwrap();
        assert!(player.movement.is_none());
        assert_eq!(player.position, before);
    }

    #[test]
    fn test_positions_stay_in_bounds() {
        let mut rig = Rig::new();
        let p = rig.roster.insert(Combatant::player(0, Vec2::new(800.0, 10.0), 16.0));
        let e = rig.roster.insert(Combatant::enemy(0, Vec2::new(5.0, 600.0), 16.0));
        rig.perform(ActionRequest::new(
            p,
            SkillData::new("lance").with_movement(MovementMode::Pierce),
            vec![e],
        ));
        for _ in 0..200 {
            rig.step();
            for c in rig.roster.iter() {
                assert!(rig.config.bounds.contains(c.position));
            }
        }
    }

    #[test]
    fn test_afterimage_flag_only_while_rushing() {
        let mut rig = Rig::new();
        let p = rig.roster.insert(Combatant::player(0, Vec2::new(600.0, 300.0), 16.0));
        let e = rig.roster.insert(Combatant::enemy(0, Vec2::new(200.0, 300.0), 16.0));
        rig.perform(
            ActionRequest::new(p, SkillData::new("charge").with_movement(MovementMode::Rush), vec![e])
                .with_afterimage_trail(true),
        );
        let state = rig.roster.get(p).unwrap().movement.clone().unwrap();
        assert!(state.afterimage_active());
        while rig.phase(p) == Phase::Rushing {
            rig.step();
        }
        let state = rig.roster.get(p).unwrap().movement.clone().unwrap();
        assert!(!state.afterimage_active());
    }
}
