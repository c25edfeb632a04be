//! Combatant storage and the read-only battle context.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::components::{Combatant, CombatantId, Team};
use crate::config::BattleConfig;
use crate::math::Vec2;

/// Storage for all combatants in a battle.
///
/// Uses a `HashMap` for O(1) lookup by ID, with deterministic iteration
/// via sorted keys whenever a system walks the roster.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roster {
    combatants: HashMap<CombatantId, Combatant>,
    next_id: CombatantId,
}

impl Roster {
    /// Create an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self {
            combatants: HashMap::new(),
            next_id: 1,
        }
    }

    /// Insert a combatant, assigning it the next ID.
    pub fn insert(&mut self, mut combatant: Combatant) -> CombatantId {
        let id = self.next_id;
        self.next_id += 1;
        combatant.id = id;
        self.combatants.insert(id, combatant);
        id
    }

    /// Get a combatant by ID.
    #[must_use]
    pub fn get(&self, id: CombatantId) -> Option<&Combatant> {
        self.combatants.get(&id)
    }

    /// Get a mutable reference to a combatant by ID.
    pub fn get_mut(&mut self, id: CombatantId) -> Option<&mut Combatant> {
        self.combatants.get_mut(&id)
    }

    /// Number of combatants, dead ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.combatants.len()
    }

    /// Whether the roster is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.combatants.is_empty()
    }

    /// Sorted IDs for deterministic iteration.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<CombatantId> {
        let mut ids: Vec<_> = self.combatants.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Iterate over all combatants (not in deterministic order).
    pub fn iter(&self) -> impl Iterator<Item = &Combatant> {
        self.combatants.values()
    }

    /// Living combatants matching a filter, sorted by ID.
    #[must_use]
    pub fn living(&self, filter: RosterFilter) -> Vec<&Combatant> {
        let mut out: Vec<&Combatant> = self
            .combatants
            .values()
            .filter(|c| c.is_alive() && filter.accepts(c.team()))
            .collect();
        out.sort_unstable_by_key(|c| c.id);
        out
    }

    /// Number of living combatants on a team.
    #[must_use]
    pub fn living_count(&self, team: Team) -> usize {
        self.combatants
            .values()
            .filter(|c| c.is_alive() && c.team() == team)
            .count()
    }

    /// Position of a combatant.
    #[must_use]
    pub fn position_of(&self, id: CombatantId) -> Option<Vec2> {
        self.get(id).map(|c| c.position)
    }

    /// Whether a combatant exists and is alive.
    #[must_use]
    pub fn is_alive(&self, id: CombatantId) -> bool {
        self.get(id).is_some_and(Combatant::is_alive)
    }
}

/// Which combatants a query considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterFilter {
    /// Members of one team.
    Team(Team),
    /// Opponents of the given team.
    OpponentsOf(Team),
    /// Everyone.
    All,
}

impl RosterFilter {
    /// Whether a combatant of `team` passes the filter.
    #[must_use]
    pub fn accepts(self, team: Team) -> bool {
        match self {
            RosterFilter::Team(t) => t == team,
            RosterFilter::OpponentsOf(t) => t.opponent() == team,
            RosterFilter::All => true,
        }
    }
}

/// Read-only view of the battle handed to systems and collaborators.
#[derive(Debug, Clone, Copy)]
pub struct BattleContext<'a> {
    /// All combatants.
    pub roster: &'a Roster,
    /// Active tuning.
    pub config: &'a BattleConfig,
    /// Current tick.
    pub tick: u64,
}

impl<'a> BattleContext<'a> {
    /// Create a context.
    #[must_use]
    pub const fn new(roster: &'a Roster, config: &'a BattleConfig, tick: u64) -> Self {
        Self {
            roster,
            config,
            tick,
        }
    }

    /// Look up a combatant.
    #[must_use]
    pub fn combatant(&self, id: CombatantId) -> Option<&'a Combatant> {
        self.roster.get(id)
    }

    /// Living opponents of a combatant, sorted by ID.
    #[must_use]
    pub fn living_opponents(&self, id: CombatantId) -> Vec<&'a Combatant> {
        match self.roster.get(id) {
            Some(c) => self.roster.living(RosterFilter::OpponentsOf(c.team())),
            None => Vec::new(),
        }
    }
}
