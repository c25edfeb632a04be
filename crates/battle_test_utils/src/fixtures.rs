//! Test fixtures and helpers.
//!
//! Pre-built battles and scripted collaborators for consistent testing.
//! [`ScriptedDecision`] and [`RecordingPipeline`] stand in for the data
//! layer and damage pipeline the core never implements itself.

use std::collections::{BTreeMap, VecDeque};

use battle_core::action::{ActionPipeline, DecisionLayer, HitResult};
use battle_core::battle::Battle;
use battle_core::components::CombatantId;
use battle_core::config::BattleConfig;
use battle_core::data::{SkillData, TargetScope};
use battle_core::error::ActionFault;
use battle_core::math::{Fixed, Vec2};
use battle_core::roster::{BattleContext, RosterFilter};
use fixed::types::I32F32;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Party formation used by the fixtures, right side of the field.
pub const PARTY_FORMATION: [Vec2; 3] = [
    Vec2::new(620.0, 200.0),
    Vec2::new(620.0, 300.0),
    Vec2::new(620.0, 400.0),
];

/// Enemy placement used by the fixtures, left side of the field.
pub const TROOP_LAYOUT: [Vec2; 3] = [
    Vec2::new(200.0, 200.0),
    Vec2::new(200.0, 300.0),
    Vec2::new(200.0, 400.0),
];

/// A battle with its combatant IDs.
#[derive(Debug, Clone)]
pub struct BattleFixture {
    /// The battle.
    pub battle: Battle,
    /// Party member IDs in spawn order.
    pub party: Vec<CombatantId>,
    /// Enemy IDs in spawn order.
    pub troop: Vec<CombatantId>,
}

/// Spawn the given party and troop into a fresh battle.
///
/// # Panics
///
/// Panics if the config is invalid.
#[must_use]
pub fn battle_with(config: BattleConfig, seed: u64, party: &[Vec2], troop: &[Vec2]) -> BattleFixture {
    let mut battle = Battle::new(config, seed).expect("fixture config must be valid");
    let party = party.iter().map(|p| battle.spawn_player(*p)).collect();
    let troop = troop.iter().map(|p| battle.spawn_enemy(*p)).collect();
    BattleFixture {
        battle,
        party,
        troop,
    }
}

/// Three against three on the default field.
#[must_use]
pub fn standard_battle(seed: u64) -> BattleFixture {
    battle_with(BattleConfig::default(), seed, &PARTY_FORMATION, &TROOP_LAYOUT)
}

/// One party member against one enemy, same row.
#[must_use]
pub fn duel(seed: u64) -> BattleFixture {
    battle_with(
        BattleConfig::default(),
        seed,
        &PARTY_FORMATION[1..2],
        &TROOP_LAYOUT[1..2],
    )
}

/// Decision layer driven by per-combatant scripts.
///
/// Enemies pop skills from their script first and fall back to the shared
/// default skill. Gauge rates are per combatant with a shared default.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDecision {
    default_rate: Fixed,
    rates: BTreeMap<CombatantId, Fixed>,
    default_skill: Option<SkillData>,
    scripts: BTreeMap<CombatantId, VecDeque<SkillData>>,
    /// Casts handed over via `begin_cast`, in order.
    pub casts: Vec<(CombatantId, String)>,
    /// How many times each enemy was asked for an action.
    pub choices: BTreeMap<CombatantId, u32>,
}

impl ScriptedDecision {
    /// Every combatant fills at `rate` per tick and nobody has a skill.
    #[must_use]
    pub fn new(rate: i32) -> Self {
        Self {
            default_rate: Fixed::from_num(rate),
            ..Default::default()
        }
    }

    /// Builder method for a per-combatant gauge rate.
    #[must_use]
    pub fn with_rate(mut self, id: CombatantId, rate: i32) -> Self {
        self.rates.insert(id, Fixed::from_num(rate));
        self
    }

    /// Builder method for the skill every enemy falls back to.
    #[must_use]
    pub fn with_skill(mut self, skill: SkillData) -> Self {
        self.default_skill = Some(skill);
        self
    }

    /// Builder method for a per-enemy skill queue.
    #[must_use]
    pub fn with_script(mut self, id: CombatantId, skills: Vec<SkillData>) -> Self {
        self.scripts.insert(id, skills.into());
        self
    }
}

impl DecisionLayer for ScriptedDecision {
    fn gauge_rate(&self, _ctx: &BattleContext<'_>, id: CombatantId) -> Fixed {
        self.rates.get(&id).copied().unwrap_or(self.default_rate)
    }

    fn choose_action(&mut self, _ctx: &BattleContext<'_>, id: CombatantId) -> Option<SkillData> {
        *self.choices.entry(id).or_default() += 1;
        self.scripts
            .get_mut(&id)
            .and_then(VecDeque::pop_front)
            .or_else(|| self.default_skill.clone())
    }

    fn begin_cast(&mut self, id: CombatantId, skill: &SkillData) {
        tracing::debug!(combatant = id, skill = %skill.id, "Scripted cast");
        self.casts.push((id, skill.id.clone()));
    }
}

/// One recorded application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    /// Acting combatant.
    pub subject: CombatantId,
    /// Affected combatant.
    pub target: CombatantId,
    /// Skill ID.
    pub skill: String,
    /// Tick it happened on.
    pub tick: u64,
}

/// Action pipeline that records every application.
///
/// Default targeting picks the lowest-ID living opponent (or the subject
/// itself for ally skills). Hits always connect unless configured to miss;
/// a target is defeated after a configurable number of hits.
#[derive(Debug, Clone)]
pub struct RecordingPipeline {
    /// Applications in order.
    pub applied: Vec<Application>,
    hit: bool,
    hits_to_defeat: Option<u32>,
    hits_taken: BTreeMap<CombatantId, u32>,
    fail_targets: bool,
    fail_apply: bool,
}

impl Default for RecordingPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingPipeline {
    /// Every application hits, nobody is defeated.
    #[must_use]
    pub fn new() -> Self {
        Self {
            applied: Vec::new(),
            hit: true,
            hits_to_defeat: None,
            hits_taken: BTreeMap::new(),
            fail_targets: false,
            fail_apply: false,
        }
    }

    /// Builder method making every application miss.
    #[must_use]
    pub fn missing(mut self) -> Self {
        self.hit = false;
        self
    }

    /// Builder method defeating a target on its `n`th hit.
    #[must_use]
    pub fn with_hits_to_defeat(mut self, n: u32) -> Self {
        self.hits_to_defeat = Some(n.max(1));
        self
    }

    /// Builder method making default targeting fail.
    #[must_use]
    pub fn failing_targets(mut self) -> Self {
        self.fail_targets = true;
        self
    }

    /// Builder method making every application fail.
    #[must_use]
    pub fn failing_apply(mut self) -> Self {
        self.fail_apply = true;
        self
    }

    /// Applications that landed on `target`.
    #[must_use]
    pub fn applications_to(&self, target: CombatantId) -> usize {
        self.applied.iter().filter(|a| a.target == target).count()
    }

    /// Applications made by `subject`.
    #[must_use]
    pub fn applications_by(&self, subject: CombatantId) -> usize {
        self.applied.iter().filter(|a| a.subject == subject).count()
    }
}

impl ActionPipeline for RecordingPipeline {
    fn make_targets(
        &mut self,
        ctx: &BattleContext<'_>,
        subject: CombatantId,
        skill: &SkillData,
    ) -> Result<Vec<CombatantId>, ActionFault> {
        if self.fail_targets {
            return Err(ActionFault::TargetResolution(format!(
                "no targets scripted for '{}'",
                skill.id
            )));
        }
        let Some(me) = ctx.combatant(subject) else {
            return Err(ActionFault::Other(format!("unknown subject {subject}")));
        };
        let filter = match skill.scope {
            TargetScope::Opponents => RosterFilter::OpponentsOf(me.team()),
            TargetScope::Allies => return Ok(vec![subject]),
        };
        Ok(ctx
            .roster
            .living(filter)
            .first()
            .map(|c| vec![c.id])
            .unwrap_or_default())
    }

    fn apply(
        &mut self,
        ctx: &BattleContext<'_>,
        subject: CombatantId,
        target: CombatantId,
        skill: &SkillData,
    ) -> Result<HitResult, ActionFault> {
        if self.fail_apply {
            return Err(ActionFault::Apply {
                target,
                reason: "scripted failure".to_string(),
            });
        }
        self.applied.push(Application {
            subject,
            target,
            skill: skill.id.clone(),
            tick: ctx.tick,
        });
        if !self.hit {
            return Ok(HitResult::MISS);
        }
        let taken = self.hits_taken.entry(target).or_default();
        *taken += 1;
        let defeated = self.hits_to_defeat.is_some_and(|n| *taken >= n);
        Ok(HitResult { hit: true, defeated })
    }
}
