//! Party escape vote.
//!
//! Each living party member may vote once. Whether the votes are enough is
//! decided by the configured [`EscapePolicy`]; there is no built-in rule.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::components::{CombatantId, Team};
use crate::config::EscapePolicy;
use crate::roster::{Roster, RosterFilter};

/// Count of living votes against what the policy requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    /// Distinct living voters.
    pub votes: u32,
    /// Votes required right now.
    pub needed: u32,
}

impl Tally {
    /// Whether the party flees.
    #[must_use]
    pub const fn is_met(&self) -> bool {
        self.needed > 0 && self.votes >= self.needed
    }
}

/// Shared vote counter.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EscapeVote {
    policy: EscapePolicy,
    voters: BTreeSet<CombatantId>,
}

impl EscapeVote {
    /// Create an empty vote under a policy.
    #[must_use]
    pub fn new(policy: EscapePolicy) -> Self {
        Self {
            policy,
            voters: BTreeSet::new(),
        }
    }

    /// Configured policy.
    #[must_use]
    pub const fn policy(&self) -> EscapePolicy {
        self.policy
    }

    /// Whether the escape command should be offered at all.
    #[must_use]
    pub fn escape_available(&self) -> bool {
        self.policy != EscapePolicy::Disabled
    }

    /// Record a vote. Returns `false` if this voter already voted.
    pub fn vote(&mut self, voter: CombatantId) -> bool {
        self.voters.insert(voter)
    }

    /// Count living voters against the policy.
    ///
    /// A threshold larger than the surviving party is capped at the party
    /// size so the vote can still pass.
    #[must_use]
    pub fn tally(&self, roster: &Roster) -> Tally {
        let living: Vec<CombatantId> = roster
            .living(RosterFilter::Team(Team::Party))
            .iter()
            .map(|c| c.id)
            .collect();
        let votes = living.iter().filter(|id| self.voters.contains(*id)).count() as u32;
        let party = living.len() as u32;
        let needed = match self.policy {
            EscapePolicy::Disabled => 0,
            EscapePolicy::Threshold(n) => n.max(1).min(party),
            EscapePolicy::Unanimous => party,
        };
        Tally { votes, needed }
    }
}
