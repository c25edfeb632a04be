//! Events produced during a battle tick.
//!
//! These are the trigger signals the host consumes for effects, sounds,
//! damage popups and flow control.

use serde::{Deserialize, Serialize};

use crate::components::CombatantId;
use crate::data::MovementMode;
use crate::error::ActionFault;
use crate::math::Vec2;

/// How a battle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattleOutcome {
    /// Every enemy fell.
    Victory,
    /// Every party member fell.
    Defeat,
    /// The party fled.
    Escaped,
    /// The host aborted the battle.
    Aborted,
}

/// A single battle event.
#[derive(Debug, Clone, PartialEq)]
pub enum BattleEvent {
    /// A skill animation began.
    ActionStarted {
        /// Acting combatant.
        subject: CombatantId,
        /// Skill ID.
        skill: String,
        /// Movement mode being executed.
        mode: MovementMode,
        /// Resolved targets, primary first.
        targets: Vec<CombatantId>,
    },
    /// An enemy started a delayed-attack warning.
    TelegraphStarted {
        /// Warning combatant.
        subject: CombatantId,
        /// Skill ID.
        skill: String,
        /// Snapshotted warning point.
        point: Vec2,
        /// Countdown length.
        ticks: i64,
    },
    /// A warning ran out and its action fired.
    TelegraphFired {
        /// Warning combatant.
        subject: CombatantId,
        /// Skill ID.
        skill: String,
    },
    /// An external cast began.
    CastStarted {
        /// Casting combatant.
        subject: CombatantId,
        /// Skill ID.
        skill: String,
    },
    /// The strike pose began.
    Strike {
        /// Striking combatant.
        subject: CombatantId,
        /// Skill ID.
        skill: String,
    },
    /// The action pipeline resolved an application.
    Hit {
        /// Acting combatant.
        subject: CombatantId,
        /// Affected combatant.
        target: CombatantId,
        /// Whether it connected.
        hit: bool,
    },
    /// Knockback or pull moved a combatant.
    Repositioned {
        /// Moved combatant.
        target: CombatantId,
        /// Previous position.
        from: Vec2,
        /// New position.
        to: Vec2,
    },
    /// A combatant was knocked out.
    Defeated {
        /// Fallen combatant.
        id: CombatantId,
    },
    /// A collaborator fault was contained.
    Fault {
        /// Combatant whose action faulted.
        subject: CombatantId,
        /// The fault.
        fault: ActionFault,
    },
    /// A skill animation returned to idle.
    ActionFinished {
        /// Acting combatant.
        subject: CombatantId,
    },
    /// A party member voted to flee.
    EscapeVote {
        /// Voter.
        voter: CombatantId,
        /// Distinct votes so far.
        votes: u32,
        /// Votes required under the configured policy.
        needed: u32,
    },
    /// Survivors started walking back to formation.
    VictoryReturnStarted,
    /// The return finished; victory processing may run now.
    VictoryProcessing,
    /// The battle reached an outcome.
    BattleEnded {
        /// Final outcome.
        outcome: BattleOutcome,
    },
}

/// Events generated during a single tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickEvents {
    /// Events in the order they happened.
    pub events: Vec<BattleEvent>,
}

impl TickEvents {
    /// Record an event.
    pub fn push(&mut self, event: BattleEvent) {
        self.events.push(event);
    }

    /// Whether nothing happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Contained faults this tick.
    pub fn faults(&self) -> impl Iterator<Item = (&CombatantId, &ActionFault)> {
        self.events.iter().filter_map(|e| match e {
            BattleEvent::Fault { subject, fault } => Some((subject, fault)),
            _ => None,
        })
    }

    /// Applications resolved against `target` this tick.
    #[must_use]
    pub fn hits_on(&self, target: CombatantId) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, BattleEvent::Hit { target: t, .. } if *t == target))
            .count()
    }

    /// Outcome reached this tick, if any.
    #[must_use]
    pub fn outcome(&self) -> Option<BattleOutcome> {
        self.events.iter().find_map(|e| match e {
            BattleEvent::BattleEnded { outcome } => Some(*outcome),
            _ => None,
        })
    }

    /// Move all events out of `other` into `self`.
    pub fn append(&mut self, other: &mut TickEvents) {
        self.events.append(&mut other.events);
    }
}
