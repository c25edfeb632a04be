//! Hit resolution: hand one application to the action pipeline and react
//! to the result.

use crate::action::{ActionPipeline, HitResult};
use crate::components::CombatantId;
use crate::config::BattleConfig;
use crate::data::SkillData;
use crate::error::ActionFault;
use crate::events::{BattleEvent, TickEvents};
use crate::reposition::{knockback, pull, Displacement};
use crate::roster::{BattleContext, Roster};

/// Apply `skill` from `subject` to `target`.
///
/// A confirmed hit triggers the skill's knockback (or pull, when no
/// knockback is set). A defeated target is flagged dead before returning.
pub fn apply_to_target(
    roster: &mut Roster,
    config: &BattleConfig,
    tick: u64,
    pipeline: &mut dyn ActionPipeline,
    subject: CombatantId,
    target: CombatantId,
    skill: &SkillData,
    events: &mut TickEvents,
) -> Result<HitResult, ActionFault> {
    if !roster.is_alive(target) {
        return Ok(HitResult::MISS);
    }

    let result = {
        let ctx = BattleContext::new(roster, config, tick);
        pipeline.apply(&ctx, subject, target, skill)?
    };
    events.push(BattleEvent::Hit {
        subject,
        target,
        hit: result.is_hit(),
    });

    if result.is_hit() {
        let displacement = if skill.knockback > 0.0 {
            knockback(roster, config, subject, target, skill.knockback)
        } else {
            pull(roster, config, subject, target, skill.pull)
        };
        if let Displacement::Moved { from, to } = displacement {
            events.push(BattleEvent::Repositioned { target, from, to });
        }
    }

    if result.defeated {
        if let Some(t) = roster.get_mut(target) {
            if !t.dead {
                t.mark_dead();
                tracing::info!(combatant = target, by = subject, "Combatant defeated");
                events.push(BattleEvent::Defeated { id: target });
            }
        }
    }

    Ok(result)
}
