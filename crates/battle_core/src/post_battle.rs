//! Post-victory walk back to formation.
//!
//! Built once when the last enemy falls. Survivors ease from wherever they
//! ended up to their formation entry point, hold there for a short pause,
//! then strike the victory pose. Only after that does the battle report
//! [`BattleEvent::VictoryProcessing`].

use serde::{Deserialize, Serialize};

use crate::components::{CombatantId, Pose, Team};
use crate::config::BattleConfig;
use crate::events::{BattleEvent, TickEvents};
use crate::math::{ease_out_quad, Vec2};
use crate::roster::{Roster, RosterFilter};

/// One survivor's walk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnRecord {
    /// Survivor.
    pub id: CombatantId,
    /// Where the walk starts.
    pub start: Vec2,
    /// Formation entry point.
    pub entry: Vec2,
}

/// Stage of the return choreography.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnPhase {
    /// Interpolating toward formation.
    Returning {
        /// Ticks spent so far.
        elapsed: u32,
    },
    /// Standing in formation.
    Pause {
        /// Ticks spent so far.
        elapsed: u32,
    },
    /// Victory pose set and hook fired.
    Done,
}

/// Post-battle return driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostBattleReturn {
    records: Vec<ReturnRecord>,
    phase: ReturnPhase,
}

impl PostBattleReturn {
    /// Capture every living party member and take their positions over.
    ///
    /// Any running skill animation or cast is dropped.
    pub fn begin(roster: &mut Roster, config: &BattleConfig) -> Self {
        let ids: Vec<CombatantId> = roster
            .living(RosterFilter::Team(Team::Party))
            .iter()
            .map(|c| c.id)
            .collect();

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(c) = roster.get_mut(id) else {
                continue;
            };
            c.movement = None;
            c.casting = false;
            c.pending_cast = None;
            let entry = config.bounds.clamp(c.formation().unwrap_or(c.home));
            records.push(ReturnRecord {
                id,
                start: c.position,
                entry,
            });
        }

        tracing::info!(survivors = records.len(), "Post-battle return started");
        Self {
            records,
            phase: ReturnPhase::Returning { elapsed: 0 },
        }
    }

    /// Captured walks.
    #[must_use]
    pub fn records(&self) -> &[ReturnRecord] {
        &self.records
    }

    /// Current stage.
    #[must_use]
    pub const fn phase(&self) -> ReturnPhase {
        self.phase
    }

    /// Whether the victory hook already fired.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.phase == ReturnPhase::Done
    }

    /// Advance one tick. Returns `true` on the tick the hook fires.
    pub fn advance(&mut self, roster: &mut Roster, config: &BattleConfig, events: &mut TickEvents) -> bool {
        match self.phase {
            ReturnPhase::Returning { elapsed } => {
                let duration = config.return_duration_ticks.max(1);
                let elapsed = elapsed + 1;
                let t = (elapsed as f32 / duration as f32).min(1.0);
                for record in &self.records {
                    let Some(c) = roster.get_mut(record.id) else {
                        continue;
                    };
                    if c.dead {
                        continue;
                    }
                    let at = if t >= 1.0 {
                        record.entry
                    } else {
                        record.start.lerp(record.entry, ease_out_quad(t))
                    };
                    c.set_position(&config.bounds, at);
                    c.pose = if t < 1.0 { Pose::Walking } else { Pose::Idle };
                }
                self.phase = if elapsed >= duration {
                    ReturnPhase::Pause { elapsed: 0 }
                } else {
                    ReturnPhase::Returning { elapsed }
                };
                false
            }
            ReturnPhase::Pause { elapsed } => {
                let elapsed = elapsed + 1;
                if elapsed < config.return_pause_ticks {
                    self.phase = ReturnPhase::Pause { elapsed };
                    return false;
                }
                for record in &self.records {
                    if let Some(c) = roster.get_mut(record.id) {
                        if !c.dead {
                            c.pose = Pose::Victory;
                            c.home = c.position;
                        }
                    }
                }
                self.phase = ReturnPhase::Done;
                tracing::info!("Post-battle return complete");
                events.push(BattleEvent::VictoryProcessing);
                true
            }
            ReturnPhase::Done => false,
        }
    }
}
