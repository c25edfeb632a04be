//! The battle: owns every combatant and drives the fixed-step tick.
//!
//! # Tick order
//!
//! 1. Gauge fill for every living combatant
//! 2. Enemy decision loop (telegraph, cast, execute), ascending ID
//! 3. Idle wander
//! 4. Movement executor advancement, ascending ID
//! 5. Outcome check, or the post-battle return once victory is reached
//!
//! Everything runs on the caller's thread. Waiting is state, never
//! blocking.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::action::{ActionPipeline, ActionRequest, DecisionLayer};
use crate::components::{Combatant, CombatantId, Team};
use crate::config::BattleConfig;
use crate::error::{BattleError, Result};
use crate::escape::{EscapeVote, Tally};
use crate::events::{BattleEvent, BattleOutcome, TickEvents};
use crate::math::Vec2;
use crate::movement::{MovementExecutor, Phase};
use crate::post_battle::PostBattleReturn;
use crate::roster::{BattleContext, Roster};
use crate::scheduler::{contain_fault, dispatch, gauge_fill_system, TurnDriver};
use crate::view::CombatantView;
use crate::wander::wander_system;

/// Lifecycle of a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattleState {
    /// Combat is running.
    Active,
    /// Every enemy fell; survivors are walking back to formation.
    VictoryReturn,
    /// The battle reached an outcome. Ticks are no-ops.
    Finished(BattleOutcome),
}

/// A single real-time battle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Battle {
    config: BattleConfig,
    roster: Roster,
    rng: ChaCha8Rng,
    tick: u64,
    escape: EscapeVote,
    post_battle: Option<PostBattleReturn>,
    state: BattleState,
}

impl Battle {
    /// Create an empty battle.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidConfig`] if the config fails
    /// validation.
    pub fn new(config: BattleConfig, seed: u64) -> Result<Self> {
        config.validate()?;
        tracing::info!(seed, tick_rate = config.tick_rate, "Battle created");
        Ok(Self {
            escape: EscapeVote::new(config.escape_policy),
            config,
            roster: Roster::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            tick: 0,
            post_battle: None,
            state: BattleState::Active,
        })
    }

    /// Active tuning.
    #[must_use]
    pub const fn config(&self) -> &BattleConfig {
        &self.config
    }

    /// All combatants.
    #[must_use]
    pub const fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Look up a combatant.
    #[must_use]
    pub fn combatant(&self, id: CombatantId) -> Option<&Combatant> {
        self.roster.get(id)
    }

    /// Ticks simulated so far.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> BattleState {
        self.state
    }

    /// Final outcome, once reached.
    #[must_use]
    pub const fn outcome(&self) -> Option<BattleOutcome> {
        match self.state {
            BattleState::Finished(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Whether the battle has finished.
    #[must_use]
    pub const fn is_over(&self) -> bool {
        matches!(self.state, BattleState::Finished(_))
    }

    /// Post-battle return driver, while one exists.
    #[must_use]
    pub const fn post_battle(&self) -> Option<&PostBattleReturn> {
        self.post_battle.as_ref()
    }

    /// Read-only context for collaborators.
    #[must_use]
    pub fn context(&self) -> BattleContext<'_> {
        BattleContext::new(&self.roster, &self.config, self.tick)
    }

    /// Add a party member at its formation point.
    pub fn spawn_player(&mut self, formation: Vec2) -> CombatantId {
        let formation = self.config.bounds.clamp(formation);
        self.spawn(Combatant::player(
            0,
            formation,
            self.config.default_collision_radius,
        ))
    }

    /// Add an enemy at its home point.
    pub fn spawn_enemy(&mut self, home: Vec2) -> CombatantId {
        let home = self.config.bounds.clamp(home);
        self.spawn(Combatant::enemy(0, home, self.config.default_collision_radius))
    }

    /// Add a prepared combatant. Its ID is reassigned and its position
    /// clamped.
    pub fn spawn(&mut self, mut combatant: Combatant) -> CombatantId {
        let at = combatant.position;
        combatant.set_position(&self.config.bounds, at);
        combatant.home = self.config.bounds.clamp(combatant.home);
        let team = combatant.team();
        let id = self.roster.insert(combatant);
        tracing::debug!(combatant = id, ?team, "Combatant spawned");
        id
    }

    /// Advance the battle by one tick.
    pub fn tick(
        &mut self,
        decision: &mut dyn DecisionLayer,
        pipeline: &mut dyn ActionPipeline,
    ) -> TickEvents {
        let mut events = TickEvents::default();

        match self.state {
            BattleState::Finished(_) => return events,
            BattleState::Active => self.run_combat(decision, pipeline, &mut events),
            BattleState::VictoryReturn => self.run_victory_return(&mut events),
        }

        self.tick += 1;

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::trace!(tick = self.tick, state_hash = hash, "Battle state hash");
        }

        #[cfg(feature = "debug-validation")]
        self.check_invariants();

        events
    }

    fn run_combat(
        &mut self,
        decision: &mut dyn DecisionLayer,
        pipeline: &mut dyn ActionPipeline,
        events: &mut TickEvents,
    ) {
        // 1. Gauge fill
        gauge_fill_system(&mut self.roster, &self.config, self.tick, &*decision);

        // 2. Enemy decisions
        let started = TurnDriver {
            config: &self.config,
            tick: self.tick,
            rng: &mut self.rng,
            decision,
            pipeline: &mut *pipeline,
            events: &mut *events,
        }
        .run_enemy_turns(&mut self.roster);

        // 3. Idle wander
        wander_system(&mut self.roster, &self.config, &mut self.rng);

        // 4. Movement
        let faults = {
            let mut exec = MovementExecutor::new(
                &mut self.roster,
                &self.config,
                &mut self.rng,
                pipeline,
                self.tick,
                events,
            );
            exec.advance_all_except(&started);
            exec.into_faults()
        };
        for (id, fault) in faults {
            contain_fault(&mut self.roster, id, &fault, events);
        }

        // 5. Outcome
        self.check_outcome(events);
    }

    #[cfg(feature = "debug-validation")]
    fn check_invariants(&self) {
        let max = self.config.max_gauge_fixed();
        for c in self.roster.iter() {
            assert!(
                c.gauge >= crate::math::Fixed::ZERO && c.gauge <= max,
                "combatant {} gauge {} out of range",
                c.id,
                c.gauge
            );
            assert!(
                self.config.bounds.contains(c.position),
                "combatant {} left the field at {:?}",
                c.id,
                c.position
            );
        }
    }

    fn check_outcome(&mut self, events: &mut TickEvents) {
        if self.roster.living_count(Team::Party) == 0 {
            self.finish(BattleOutcome::Defeat, events);
        } else if self.roster.living_count(Team::Troop) == 0 {
            tracing::info!(tick = self.tick, "All enemies defeated");
            self.post_battle = Some(PostBattleReturn::begin(&mut self.roster, &self.config));
            self.state = BattleState::VictoryReturn;
            events.push(BattleEvent::VictoryReturnStarted);
        }
    }

    fn run_victory_return(&mut self, events: &mut TickEvents) {
        let Some(post_battle) = self.post_battle.as_mut() else {
            self.finish(BattleOutcome::Victory, events);
            return;
        };
        if post_battle.advance(&mut self.roster, &self.config, events) {
            self.finish(BattleOutcome::Victory, events);
        }
    }

    fn finish(&mut self, outcome: BattleOutcome, events: &mut TickEvents) {
        if self.is_over() {
            return;
        }
        tracing::info!(tick = self.tick, ?outcome, "Battle ended");
        self.post_battle = None;
        self.state = BattleState::Finished(outcome);
        events.push(BattleEvent::BattleEnded { outcome });
    }

    fn ensure_active(&self) -> Result<()> {
        match self.state {
            BattleState::Active => Ok(()),
            _ => Err(BattleError::BattleOver),
        }
    }

    fn ready_combatant(&self, id: CombatantId) -> Result<&Combatant> {
        let c = self
            .roster
            .get(id)
            .ok_or(BattleError::CombatantNotFound(id))?;
        if c.dead {
            return Err(BattleError::CombatantDead(id));
        }
        Ok(c)
    }

    /// Execute a party member's chosen action.
    ///
    /// An empty target list is filled by the pipeline's default targeting.
    /// Pipeline faults are contained like any other; the gauge is reset
    /// either way.
    ///
    /// # Errors
    ///
    /// Fails when the battle is over, the combatant is unknown, dead, not
    /// a party member, already acting, or its gauge is not full.
    pub fn perform_player_action(
        &mut self,
        pipeline: &mut dyn ActionPipeline,
        action: ActionRequest,
    ) -> Result<TickEvents> {
        self.ensure_active()?;
        let id = action.subject;
        let c = self.ready_combatant(id)?;
        if c.team() != Team::Party {
            return Err(BattleError::InvalidState(format!(
                "combatant {id} is not a party member"
            )));
        }
        if c.is_executing() || c.casting {
            return Err(BattleError::CombatantBusy(id));
        }
        let max = self.config.max_gauge_fixed();
        if !c.gauge_full(max) {
            return Err(BattleError::GaugeNotFull {
                id,
                gauge: c.gauge.to_num::<i64>(),
                max: self.config.max_gauge,
            });
        }

        let mut events = TickEvents::default();
        self.run_action(pipeline, action, &mut events);
        Ok(events)
    }

    /// Complete an external cast and execute its stored action.
    ///
    /// # Errors
    ///
    /// Fails when the battle is over, the combatant is unknown or dead, or
    /// no cast is pending.
    pub fn finish_cast(
        &mut self,
        id: CombatantId,
        pipeline: &mut dyn ActionPipeline,
    ) -> Result<TickEvents> {
        self.ensure_active()?;
        self.ready_combatant(id)?;
        let action = self
            .roster
            .get_mut(id)
            .and_then(|c| {
                c.casting = false;
                c.pending_cast.take()
            })
            .ok_or(BattleError::NoPendingCast(id))?;

        tracing::debug!(combatant = id, skill = %action.skill.id, "Cast finished");
        let mut events = TickEvents::default();
        self.run_action(pipeline, action, &mut events);
        Ok(events)
    }

    fn run_action(
        &mut self,
        pipeline: &mut dyn ActionPipeline,
        mut action: ActionRequest,
        events: &mut TickEvents,
    ) {
        let id = action.subject;
        if let Some(c) = self.roster.get_mut(id) {
            c.reset_gauge();
        }

        if action.targets.is_empty() {
            let ctx = BattleContext::new(&self.roster, &self.config, self.tick);
            match pipeline.make_targets(&ctx, id, &action.skill) {
                Ok(targets) => action.targets = targets,
                Err(fault) => {
                    contain_fault(&mut self.roster, id, &fault, events);
                    return;
                }
            }
        }

        if let Err(fault) = dispatch(
            &mut self.roster,
            &self.config,
            self.tick,
            &mut self.rng,
            pipeline,
            events,
            action,
        ) {
            contain_fault(&mut self.roster, id, &fault, events);
        }
        if matches!(self.state, BattleState::Active) {
            self.check_outcome(events);
        }
    }

    /// Whether the escape command should be offered.
    #[must_use]
    pub fn escape_available(&self) -> bool {
        self.escape.escape_available() && matches!(self.state, BattleState::Active)
    }

    /// Current escape tally.
    #[must_use]
    pub fn escape_tally(&self) -> Tally {
        self.escape.tally(&self.roster)
    }

    /// Register a party member's vote to flee.
    ///
    /// Ends the battle with [`BattleOutcome::Escaped`] once the configured
    /// policy is satisfied.
    ///
    /// # Errors
    ///
    /// Fails when the battle is over, escape is disabled, or the voter is
    /// not a living party member.
    pub fn request_escape(&mut self, voter: CombatantId) -> Result<TickEvents> {
        self.ensure_active()?;
        if !self.escape.escape_available() {
            return Err(BattleError::InvalidState("escape is disabled".to_string()));
        }
        let c = self.ready_combatant(voter)?;
        if c.team() != Team::Party {
            return Err(BattleError::InvalidState(format!(
                "combatant {voter} cannot vote to escape"
            )));
        }

        let mut events = TickEvents::default();
        if self.escape.vote(voter) {
            let tally = self.escape.tally(&self.roster);
            tracing::info!(voter, votes = tally.votes, needed = tally.needed, "Escape vote");
            events.push(BattleEvent::EscapeVote {
                voter,
                votes: tally.votes,
                needed: tally.needed,
            });
        }
        if self.escape.tally(&self.roster).is_met() {
            self.finish(BattleOutcome::Escaped, &mut events);
        }
        Ok(events)
    }

    /// End the battle immediately without victory processing.
    pub fn abort(&mut self) -> TickEvents {
        let mut events = TickEvents::default();
        self.finish(BattleOutcome::Aborted, &mut events);
        events
    }

    /// Render snapshots for every combatant, sorted by ID.
    #[must_use]
    pub fn views(&self) -> Vec<CombatantView> {
        self.roster
            .sorted_ids()
            .into_iter()
            .filter_map(|id| self.roster.get(id))
            .map(|c| CombatantView::capture(c, &self.config))
            .collect()
    }

    /// Calculate a hash of the current battle state.
    ///
    /// Two battles with identical state produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.state.hash(&mut hasher);
        self.rng.get_word_pos().hash(&mut hasher);

        let ids = self.roster.sorted_ids();
        ids.len().hash(&mut hasher);
        for id in ids {
            let Some(c) = self.roster.get(id) else {
                continue;
            };
            id.hash(&mut hasher);
            c.position.x.to_bits().hash(&mut hasher);
            c.position.y.to_bits().hash(&mut hasher);
            c.home.x.to_bits().hash(&mut hasher);
            c.home.y.to_bits().hash(&mut hasher);
            c.gauge.to_bits().hash(&mut hasher);
            c.dead.hash(&mut hasher);
            c.casting.hash(&mut hasher);
            c.pose.hash(&mut hasher);

            let phase = c.movement.as_ref().map_or(Phase::Idle, |m| m.phase());
            phase.hash(&mut hasher);
            if let Some(m) = &c.movement {
                m.progress().to_bits().hash(&mut hasher);
            }
            if let Some(enemy) = c.enemy_data() {
                enemy.telegraph.remaining_ticks().hash(&mut hasher);
                enemy.wander.countdown().hash(&mut hasher);
                enemy.wander.is_in_flight().hash(&mut hasher);
            }
        }

        hasher.finish()
    }

    /// Serialize the battle state for determinism checks.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| BattleError::InvalidState(format!("Failed to serialize battle: {e}")))
    }

    /// Deserialize battle state from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| BattleError::InvalidState(format!("Failed to deserialize battle: {e}")))
    }
}
