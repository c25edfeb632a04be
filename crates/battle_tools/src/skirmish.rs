//! Headless skirmish runner.
//!
//! Plays a full battle with simple demo collaborators so movement modes,
//! telegraphs and outcomes can be eyeballed from the log without a
//! renderer.

use std::collections::BTreeMap;

use battle_core::action::{ActionPipeline, ActionRequest, DecisionLayer, HitResult};
use battle_core::battle::Battle;
use battle_core::components::{CombatantId, Team};
use battle_core::config::BattleConfig;
use battle_core::data::{MovementMode, SkillData, SkillKind, TargetScope};
use battle_core::error::{ActionFault, BattleError};
use battle_core::events::{BattleEvent, BattleOutcome};
use battle_core::math::{Fixed, Vec2};
use battle_core::roster::{BattleContext, RosterFilter};

/// Knobs for a skirmish run.
#[derive(Debug, Clone, Copy)]
pub struct SkirmishOptions {
    /// Battle RNG seed.
    pub seed: u64,
    /// Tick limit.
    pub ticks: u64,
    /// Party size.
    pub party: usize,
    /// Troop size.
    pub troop: usize,
    /// Gauge gained per tick by everyone.
    pub gauge_rate: i32,
}

impl Default for SkirmishOptions {
    fn default() -> Self {
        Self {
            seed: 1,
            ticks: 3600,
            party: 3,
            troop: 3,
            gauge_rate: 12,
        }
    }
}

/// Summary of a finished (or timed out) skirmish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkirmishReport {
    /// Outcome, if one was reached within the tick limit.
    pub outcome: Option<BattleOutcome>,
    /// Ticks simulated.
    pub ticks: u64,
    /// Actions started.
    pub actions: usize,
    /// Connecting applications.
    pub hits: usize,
    /// Missed applications.
    pub misses: usize,
    /// Combatants knocked out.
    pub defeated: usize,
    /// Contained faults.
    pub faults: usize,
    /// Telegraphs that fired.
    pub telegraphs: usize,
    /// Final state hash.
    pub state_hash: u64,
}

/// Skills used when no skill file is given.
#[must_use]
pub fn default_skills() -> Vec<SkillData> {
    vec![
        SkillData::new("slash").with_movement(MovementMode::Dashback),
        SkillData::new("charge")
            .with_movement(MovementMode::Rush)
            .with_knockback(32.0),
        SkillData::new("dash_cut").with_movement(MovementMode::Passthrough),
        SkillData::new("lance").with_movement(MovementMode::Pierce),
        SkillData::new("bolt")
            .with_kind(SkillKind::Magical)
            .with_telegraph(0.75)
            .with_pull(24.0),
    ]
}

/// Decision layer that cycles through a skill list per combatant.
#[derive(Debug, Clone)]
pub struct RotationDecision {
    skills: Vec<SkillData>,
    cursor: BTreeMap<CombatantId, usize>,
    rate: Fixed,
}

impl RotationDecision {
    /// Create a rotation over `skills` with a flat gauge rate.
    #[must_use]
    pub fn new(skills: Vec<SkillData>, rate: i32) -> Self {
        Self {
            skills,
            cursor: BTreeMap::new(),
            rate: Fixed::from_num(rate),
        }
    }

    /// Next skill in `id`'s rotation.
    pub fn next_skill(&mut self, id: CombatantId) -> Option<SkillData> {
        if self.skills.is_empty() {
            return None;
        }
        let cursor = self.cursor.entry(id).or_default();
        let skill = self.skills[*cursor % self.skills.len()].clone();
        *cursor += 1;
        Some(skill)
    }
}

impl DecisionLayer for RotationDecision {
    fn gauge_rate(&self, _ctx: &BattleContext<'_>, _id: CombatantId) -> Fixed {
        self.rate
    }

    fn choose_action(&mut self, _ctx: &BattleContext<'_>, id: CombatantId) -> Option<SkillData> {
        self.next_skill(id)
    }
}

/// Pipeline with flat hit points and deterministic misses.
#[derive(Debug, Clone)]
pub struct HealthPipeline {
    hp: BTreeMap<CombatantId, i32>,
    max_hp: i32,
    damage: i32,
}

impl HealthPipeline {
    /// Everyone starts at `max_hp`; every hit deals `damage`.
    #[must_use]
    pub fn new(max_hp: i32, damage: i32) -> Self {
        Self {
            hp: BTreeMap::new(),
            max_hp,
            damage,
        }
    }

    /// Remaining hit points.
    #[must_use]
    pub fn hp(&self, id: CombatantId) -> i32 {
        self.hp.get(&id).copied().unwrap_or(self.max_hp)
    }
}

impl ActionPipeline for HealthPipeline {
    fn make_targets(
        &mut self,
        ctx: &BattleContext<'_>,
        subject: CombatantId,
        skill: &SkillData,
    ) -> Result<Vec<CombatantId>, ActionFault> {
        let me = ctx
            .combatant(subject)
            .ok_or_else(|| ActionFault::Other(format!("unknown subject {subject}")))?;
        if skill.scope == TargetScope::Allies {
            return Ok(vec![subject]);
        }
        // Weakest opponent first, lowest ID on ties.
        let target = ctx
            .roster
            .living(RosterFilter::OpponentsOf(me.team()))
            .into_iter()
            .min_by_key(|c| (self.hp(c.id), c.id))
            .map(|c| c.id);
        Ok(target.into_iter().collect())
    }

    fn apply(
        &mut self,
        ctx: &BattleContext<'_>,
        subject: CombatantId,
        target: CombatantId,
        skill: &SkillData,
    ) -> Result<HitResult, ActionFault> {
        if (subject + target + ctx.tick) % 7 == 0 {
            return Ok(HitResult::MISS);
        }
        let damage = match skill.kind {
            SkillKind::Physical => self.damage,
            SkillKind::Magical => self.damage + self.damage / 2,
        };
        let hp = self.hp(target) - damage;
        self.hp.insert(target, hp);
        Ok(HitResult {
            hit: true,
            defeated: hp <= 0,
        })
    }
}

/// Run a skirmish to completion or until the tick limit.
///
/// Party members act as soon as their gauge fills, using the same
/// rotation the enemies use.
///
/// # Errors
///
/// Returns an error if the config is invalid.
pub fn run_skirmish(
    config: BattleConfig,
    skills: Vec<SkillData>,
    options: SkirmishOptions,
) -> Result<SkirmishReport, BattleError> {
    let mut battle = Battle::new(config, options.seed)?;
    let bounds = battle.config().bounds;
    let rows = |n: usize, i: usize| {
        let height = bounds.max.y - bounds.min.y;
        bounds.min.y + height * (i as f32 + 1.0) / (n as f32 + 1.0)
    };
    let party: Vec<CombatantId> = (0..options.party)
        .map(|i| battle.spawn_player(Vec2::new(bounds.max.x - 196.0, rows(options.party, i))))
        .collect();
    for i in 0..options.troop {
        battle.spawn_enemy(Vec2::new(bounds.min.x + 200.0, rows(options.troop, i)));
    }

    let mut decision = RotationDecision::new(skills, options.gauge_rate);
    let mut pipeline = HealthPipeline::new(100, 18);
    let mut report = SkirmishReport {
        outcome: None,
        ticks: 0,
        actions: 0,
        hits: 0,
        misses: 0,
        defeated: 0,
        faults: 0,
        telegraphs: 0,
        state_hash: 0,
    };

    tracing::info!(
        seed = options.seed,
        party = options.party,
        troop = options.troop,
        "Skirmish started"
    );

    while report.ticks < options.ticks && !battle.is_over() {
        let mut events = battle.tick(&mut decision, &mut pipeline);
        report.ticks += 1;

        let max = battle.config().max_gauge_fixed();
        for &id in &party {
            let ready = battle.combatant(id).is_some_and(|c| {
                c.is_alive() && c.team() == Team::Party && !c.is_executing() && c.gauge_full(max)
            });
            if !ready {
                continue;
            }
            let Some(skill) = decision.next_skill(id) else {
                continue;
            };
            match battle.perform_player_action(&mut pipeline, ActionRequest::new(id, skill, Vec::new())) {
                Ok(mut more) => events.append(&mut more),
                Err(e) => tracing::debug!(combatant = id, error = %e, "Player action rejected"),
            }
        }

        for event in &events.events {
            match event {
                BattleEvent::ActionStarted { .. } => report.actions += 1,
                BattleEvent::Hit { hit: true, .. } => report.hits += 1,
                BattleEvent::Hit { hit: false, .. } => report.misses += 1,
                BattleEvent::Defeated { id } => {
                    report.defeated += 1;
                    tracing::info!(tick = battle.tick_count(), combatant = id, "Defeated");
                }
                BattleEvent::Fault { .. } => report.faults += 1,
                BattleEvent::TelegraphFired { .. } => report.telegraphs += 1,
                BattleEvent::BattleEnded { outcome } => report.outcome = Some(*outcome),
                _ => {}
            }
        }
    }

    report.state_hash = battle.state_hash();
    tracing::info!(
        ticks = report.ticks,
        outcome = ?report.outcome,
        hash = report.state_hash,
        "Skirmish finished"
    );
    Ok(report)
}
