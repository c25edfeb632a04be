//! Gauge scheduler and enemy decision loop.
//!
//! Every living combatant's gauge fills at the rate the decision layer
//! reports. A full gauge is the only trigger for an enemy turn; the turn
//! either starts a cast, arms a telegraph, or hands the action straight to
//! the movement executor. Any way the turn ends, the gauge goes back to 0.

use std::collections::BTreeSet;

use rand_chacha::ChaCha8Rng;

use crate::action::{ActionPipeline, ActionRequest, DecisionLayer};
use crate::components::CombatantId;
use crate::config::BattleConfig;
use crate::error::ActionFault;
use crate::events::{BattleEvent, TickEvents};
use crate::movement::MovementExecutor;
use crate::roster::{BattleContext, Roster};

/// Advance every living combatant's gauge.
pub fn gauge_fill_system(
    roster: &mut Roster,
    config: &BattleConfig,
    tick: u64,
    decision: &dyn DecisionLayer,
) {
    let max = config.max_gauge_fixed();
    let rates: Vec<_> = {
        let ctx = BattleContext::new(roster, config, tick);
        roster
            .sorted_ids()
            .into_iter()
            .filter(|id| roster.is_alive(*id))
            .map(|id| (id, decision.gauge_rate(&ctx, id)))
            .collect()
    };
    for (id, rate) in rates {
        if let Some(c) = roster.get_mut(id) {
            c.fill_gauge(rate, max);
        }
    }
}

/// Mutable state the decision loop needs beyond the roster.
pub struct TurnDriver<'a> {
    /// Battle tuning.
    pub config: &'a BattleConfig,
    /// Current tick.
    pub tick: u64,
    /// Battle RNG.
    pub rng: &'a mut ChaCha8Rng,
    /// Enemy AI and gauge rates.
    pub decision: &'a mut dyn DecisionLayer,
    /// Target selection and hit resolution.
    pub pipeline: &'a mut dyn ActionPipeline,
    /// Event sink for this tick.
    pub events: &'a mut TickEvents,
}

impl TurnDriver<'_> {
    /// Run one decision step for every living enemy, ascending ID.
    ///
    /// Faults are contained before returning. Returns the enemies whose
    /// executor started during this pass.
    pub fn run_enemy_turns(&mut self, roster: &mut Roster) -> BTreeSet<CombatantId> {
        let mut started = BTreeSet::new();
        for id in roster.sorted_ids() {
            let Some(c) = roster.get(id) else {
                continue;
            };
            if c.dead || !c.is_enemy() {
                continue;
            }
            let was_executing = c.is_executing();
            if let Err(fault) = self.enemy_turn(roster, id) {
                contain_fault(roster, id, &fault, self.events);
            }
            if !was_executing && roster.get(id).is_some_and(|c| c.is_executing()) {
                started.insert(id);
            }
        }
        started
    }

    fn enemy_turn(&mut self, roster: &mut Roster, id: CombatantId) -> Result<(), ActionFault> {
        let max = self.config.max_gauge_fixed();

        // A running telegraph owns the turn until it fires.
        if let Some(enemy) = roster.get_mut(id).and_then(|c| c.enemy_data_mut()) {
            if enemy.telegraph.is_active() {
                if enemy.telegraph.tick() {
                    if let Some(action) = enemy.telegraph.take_action() {
                        self.events.push(BattleEvent::TelegraphFired {
                            subject: id,
                            skill: action.skill.id.clone(),
                        });
                        self.execute(roster, action)?;
                    }
                    reset_gauge(roster, id);
                }
                return Ok(());
            }
        }

        let Some(c) = roster.get(id) else {
            return Ok(());
        };
        if c.casting || c.is_executing() || !c.gauge_full(max) {
            return Ok(());
        }

        let choice = {
            let ctx = BattleContext::new(roster, self.config, self.tick);
            self.decision.choose_action(&ctx, id)
        };
        let Some(skill) = choice else {
            tracing::debug!(combatant = id, "No usable action, gauge reset");
            reset_gauge(roster, id);
            return Ok(());
        };

        if skill.cast_ticks > 0 {
            self.decision.begin_cast(id, &skill);
            self.events.push(BattleEvent::CastStarted {
                subject: id,
                skill: skill.id.clone(),
            });
            if let Some(c) = roster.get_mut(id) {
                c.casting = true;
                c.pending_cast = Some(ActionRequest::new(id, skill, Vec::new()));
            }
            return Ok(());
        }

        let targets = {
            let ctx = BattleContext::new(roster, self.config, self.tick);
            self.pipeline.make_targets(&ctx, id, &skill)?
        };
        let action = ActionRequest::new(id, skill, targets);

        if action.skill.has_telegraph() {
            let point = action
                .primary_target()
                .and_then(|t| roster.position_of(t))
                .or_else(|| roster.position_of(id))
                .unwrap_or_default();
            let skill_id = action.skill.id.clone();
            let tick_rate = self.config.tick_rate;
            if let Some(enemy) = roster.get_mut(id).and_then(|c| c.enemy_data_mut()) {
                if enemy.telegraph.start(action.clone(), point, tick_rate) {
                    self.events.push(BattleEvent::TelegraphStarted {
                        subject: id,
                        skill: skill_id,
                        point,
                        ticks: enemy.telegraph.remaining_ticks(),
                    });
                    reset_gauge(roster, id);
                    return Ok(());
                }
            }
        }

        reset_gauge(roster, id);
        self.execute(roster, action)
    }

    fn execute(&mut self, roster: &mut Roster, action: ActionRequest) -> Result<(), ActionFault> {
        dispatch(
            roster,
            self.config,
            self.tick,
            self.rng,
            self.pipeline,
            self.events,
            action,
        )
    }
}

/// Hand an action to the movement executor.
///
/// Returns the first fault the subject raised while it started; faults
/// from anyone else are contained directly.
pub fn dispatch(
    roster: &mut Roster,
    config: &BattleConfig,
    tick: u64,
    rng: &mut ChaCha8Rng,
    pipeline: &mut dyn ActionPipeline,
    events: &mut TickEvents,
    action: ActionRequest,
) -> Result<(), ActionFault> {
    let subject = action.subject;
    let faults = {
        let mut exec = MovementExecutor::new(roster, config, rng, pipeline, tick, events);
        exec.perform(action);
        exec.into_faults()
    };
    let mut first = None;
    for (id, fault) in faults {
        if id == subject && first.is_none() {
            first = Some(fault);
        } else {
            contain_fault(roster, id, &fault, events);
        }
    }
    first.map_or(Ok(()), Err)
}

fn reset_gauge(roster: &mut Roster, id: CombatantId) {
    if let Some(c) = roster.get_mut(id) {
        c.reset_gauge();
    }
}

/// The single place collaborator faults end up.
///
/// Logs the fault, reports it, and resets the subject's gauge so the
/// combatant is free to act again.
pub fn contain_fault(
    roster: &mut Roster,
    subject: CombatantId,
    fault: &ActionFault,
    events: &mut TickEvents,
) {
    tracing::warn!(combatant = subject, %fault, "Action fault contained");
    reset_gauge(roster, subject);
    events.push(BattleEvent::Fault {
        subject,
        fault: fault.clone(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::HitResult;
    use crate::components::Combatant;
    use crate::data::SkillData;
    use crate::math::{Fixed, Vec2};
    use rand::SeedableRng;

    struct FixedRate {
        rate: i32,
        skill: Option<SkillData>,
        casts: Vec<CombatantId>,
    }

    impl DecisionLayer for FixedRate {
        fn gauge_rate(&self, _ctx: &BattleContext<'_>, _id: CombatantId) -> Fixed {
            Fixed::from_num(self.rate)
        }

        fn choose_action(&mut self, _ctx: &BattleContext<'_>, _id: CombatantId) -> Option<SkillData> {
            self.skill.clone()
        }

        fn begin_cast(&mut self, id: CombatantId, _skill: &SkillData) {
            self.casts.push(id);
        }
    }

    struct FirstOpponent {
        fail_targets: bool,
    }

    impl ActionPipeline for FirstOpponent {
        fn make_targets(
            &mut self,
            ctx: &BattleContext<'_>,
            subject: CombatantId,
            _skill: &SkillData,
        ) -> Result<Vec<CombatantId>, ActionFault> {
            if self.fail_targets {
                return Err(ActionFault::TargetResolution("no data".into()));
            }
            Ok(ctx.living_opponents(subject).iter().map(|c| c.id).take(1).collect())
        }

        fn apply(
            &mut self,
            _ctx: &BattleContext<'_>,
            _subject: CombatantId,
            _target: CombatantId,
            _skill: &SkillData,
        ) -> Result<HitResult, ActionFault> {
            Ok(HitResult::HIT)
        }
    }

    fn roster() -> (Roster, CombatantId, CombatantId) {
        let mut roster = Roster::new();
        let p = roster.insert(Combatant::player(0, Vec2::new(600.0, 300.0), 16.0));
        let e = roster.insert(Combatant::enemy(0, Vec2::new(200.0, 300.0), 16.0));
        (roster, p, e)
    }

    fn run_turns(
        roster: &mut Roster,
        config: &BattleConfig,
        decision: &mut FixedRate,
        pipeline: &mut FirstOpponent,
    ) -> TickEvents {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut events = TickEvents::default();
        gauge_fill_system(roster, config, 0, &*decision);
        TurnDriver {
            config,
            tick: 0,
            rng: &mut rng,
            decision,
            pipeline,
            events: &mut events,
        }
        .run_enemy_turns(roster);
        events
    }

    #[test]
    fn test_gauge_clamped_to_max() {
        let config = BattleConfig::default();
        let (mut roster, p, _) = roster();
        let decision = FixedRate {
            rate: 700,
            skill: None,
            casts: Vec::new(),
        };
        gauge_fill_system(&mut roster, &config, 0, &decision);
        gauge_fill_system(&mut roster, &config, 1, &decision);
        assert_eq!(roster.get(p).unwrap().gauge, config.max_gauge_fixed());
    }

    #[test]
    fn test_dead_gauge_does_not_fill() {
        let config = BattleConfig::default();
        let (mut roster, p, _) = roster();
        roster.get_mut(p).unwrap().mark_dead();
        let decision = FixedRate {
            rate: 10,
            skill: None,
            casts: Vec::new(),
        };
        gauge_fill_system(&mut roster, &config, 0, &decision);
        assert_eq!(roster.get(p).unwrap().gauge, Fixed::ZERO);
    }

    #[test]
    fn test_full_gauge_executes_and_resets() {
        let config = BattleConfig::default();
        let (mut roster, p, e) = roster();
        let mut decision = FixedRate {
            rate: 1000,
            skill: Some(SkillData::new("claw")),
            casts: Vec::new(),
        };
        let mut pipeline = FirstOpponent { fail_targets: false };
        let events = run_turns(&mut roster, &config, &mut decision, &mut pipeline);

        assert_eq!(roster.get(e).unwrap().gauge, Fixed::ZERO);
        assert!(roster.get(e).unwrap().is_executing());
        assert_eq!(events.hits_on(p), 1);
    }

    #[test]
    fn test_no_action_resets_gauge() {
        let config = BattleConfig::default();
        let (mut roster, _, e) = roster();
        let mut decision = FixedRate {
            rate: 1000,
            skill: None,
            casts: Vec::new(),
        };
        let mut pipeline = FirstOpponent { fail_targets: false };
        run_turns(&mut roster, &config, &mut decision, &mut pipeline);
        assert_eq!(roster.get(e).unwrap().gauge, Fixed::ZERO);
        assert!(!roster.get(e).unwrap().is_executing());
    }

    #[test]
    fn test_cast_time_delegates_and_waits() {
        let config = BattleConfig::default();
        let (mut roster, _, e) = roster();
        let mut decision = FixedRate {
            rate: 1000,
            skill: Some(SkillData::new("meteor").with_cast_ticks(90)),
            casts: Vec::new(),
        };
        let mut pipeline = FirstOpponent { fail_targets: false };
        run_turns(&mut roster, &config, &mut decision, &mut pipeline);
        run_turns(&mut roster, &config, &mut decision, &mut pipeline);

        let enemy = roster.get(e).unwrap();
        assert!(enemy.casting);
        assert!(enemy.pending_cast.is_some());
        assert_eq!(decision.casts, vec![e]);
    }

    #[test]
    fn test_telegraph_delays_execution() {
        let config = BattleConfig::default();
        let (mut roster, p, e) = roster();
        let mut decision = FixedRate {
            rate: 1000,
            skill: Some(SkillData::new("slam").with_telegraph(0.5)),
            casts: Vec::new(),
        };
        let mut pipeline = FirstOpponent { fail_targets: false };

        let events = run_turns(&mut roster, &config, &mut decision, &mut pipeline);
        assert!(events
            .events
            .iter()
            .any(|ev| matches!(ev, BattleEvent::TelegraphStarted { ticks: 30, .. })));
        assert_eq!(roster.get(e).unwrap().gauge, Fixed::ZERO);

        decision.rate = 0;
        for _ in 0..29 {
            let events = run_turns(&mut roster, &config, &mut decision, &mut pipeline);
            assert_eq!(events.hits_on(p), 0);
        }
        let events = run_turns(&mut roster, &config, &mut decision, &mut pipeline);
        assert!(events
            .events
            .iter()
            .any(|ev| matches!(ev, BattleEvent::TelegraphFired { .. })));
        assert_eq!(events.hits_on(p), 1);
    }

    #[test]
    fn test_fault_is_contained_and_resets_gauge() {
        let config = BattleConfig::default();
        let (mut roster, _, e) = roster();
        let mut decision = FixedRate {
            rate: 1000,
            skill: Some(SkillData::new("claw")),
            casts: Vec::new(),
        };
        let mut pipeline = FirstOpponent { fail_targets: true };
        let events = run_turns(&mut roster, &config, &mut decision, &mut pipeline);

        assert_eq!(events.faults().count(), 1);
        assert_eq!(roster.get(e).unwrap().gauge, Fixed::ZERO);
        assert!(!roster.get(e).unwrap().is_executing());
    }
}
