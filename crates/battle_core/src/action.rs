//! Actions and the collaborator contracts used to resolve them.
//!
//! The core never computes damage. It hands each strike to an
//! [`ActionPipeline`] and reacts to the [`HitResult`] it returns: confirmed
//! hits trigger knockback/pull, defeated targets are flagged dead.

use serde::{Deserialize, Serialize};

use crate::components::CombatantId;
use crate::data::SkillData;
use crate::error::ActionFault;
use crate::math::Fixed;
use crate::roster::BattleContext;

/// A chosen action ready to be executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Combatant performing the action.
    pub subject: CombatantId,
    /// Skill being used.
    pub skill: SkillData,
    /// Resolved targets. The first entry is the primary target.
    pub targets: Vec<CombatantId>,
    /// Draw an afterimage trail while rushing. Presentation only.
    #[serde(default)]
    pub afterimage_trail: bool,
}

impl ActionRequest {
    /// Create an action with an explicit target list.
    #[must_use]
    pub fn new(subject: CombatantId, skill: SkillData, targets: Vec<CombatantId>) -> Self {
        Self {
            subject,
            skill,
            targets,
            afterimage_trail: false,
        }
    }

    /// Builder method to request the afterimage trail.
    #[must_use]
    pub fn with_afterimage_trail(mut self, enabled: bool) -> Self {
        self.afterimage_trail = enabled;
        self
    }

    /// First resolved target.
    #[must_use]
    pub fn primary_target(&self) -> Option<CombatantId> {
        self.targets.first().copied()
    }
}

/// Outcome of applying an action to one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HitResult {
    /// The action connected.
    pub hit: bool,
    /// The target was defeated by this application.
    pub defeated: bool,
}

impl HitResult {
    /// A connecting hit that leaves the target standing.
    pub const HIT: Self = Self {
        hit: true,
        defeated: false,
    };

    /// A miss.
    pub const MISS: Self = Self {
        hit: false,
        defeated: false,
    };

    /// Whether the action connected.
    #[must_use]
    pub const fn is_hit(&self) -> bool {
        self.hit
    }
}

/// External action pipeline: target selection and damage/state commit.
pub trait ActionPipeline {
    /// Default target selection for a skill with no explicit targets.
    fn make_targets(
        &mut self,
        ctx: &BattleContext<'_>,
        subject: CombatantId,
        skill: &SkillData,
    ) -> Result<Vec<CombatantId>, ActionFault>;

    /// Commit the action's effect on a single target.
    fn apply(
        &mut self,
        ctx: &BattleContext<'_>,
        subject: CombatantId,
        target: CombatantId,
        skill: &SkillData,
    ) -> Result<HitResult, ActionFault>;
}

/// External decision/data layer for enemy turns and gauge fill rates.
pub trait DecisionLayer {
    /// Gauge gained this tick. Battler stats live outside the core.
    fn gauge_rate(&self, ctx: &BattleContext<'_>, id: CombatantId) -> Fixed;

    /// Pick a skill for an enemy whose gauge is full.
    ///
    /// Returning `None` means nothing is usable; the gauge is reset.
    fn choose_action(&mut self, ctx: &BattleContext<'_>, id: CombatantId) -> Option<SkillData>;

    /// Start the external casting mechanism for a skill with a cast time.
    ///
    /// The host later calls [`crate::battle::Battle::finish_cast`].
    fn begin_cast(&mut self, id: CombatantId, skill: &SkillData) {
        tracing::debug!(combatant = id, skill = %skill.id, "Cast started");
    }
}
