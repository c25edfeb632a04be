//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a battle produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! Replays and headless checks need the battle to be reproducible from
//! its seed. Sources of non-determinism include:
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Every system walks the roster in sorted ID order.
//!
//! - **System randomness**: retreat scatter, idle wander and fallback
//!   targeting all draw from the battle's own seeded `ChaCha8Rng`.
//!
//! - **Gauge accumulation**: the gauge is fixed-point, so fill rates add up
//!   exactly.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: individual systems (movement, wander, telegraph)
//! 2. **Property tests**: random layouts and seeds still replay exactly
//! 3. **Integration tests**: full battles are reproducible
//! 4. **Parallel tests**: running N battles on threads all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use battle_core::battle::Battle;

use crate::fixtures::{RecordingPipeline, ScriptedDecision};

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic battle).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the battle was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Battle is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// A battle together with the collaborators that drive it.
#[derive(Debug, Clone)]
pub struct Scenario {
    /// The battle.
    pub battle: Battle,
    /// Scripted enemy AI.
    pub decision: ScriptedDecision,
    /// Recording damage pipeline.
    pub pipeline: RecordingPipeline,
}

impl Scenario {
    /// Bundle a battle with its collaborators.
    #[must_use]
    pub fn new(battle: Battle, decision: ScriptedDecision, pipeline: RecordingPipeline) -> Self {
        Self {
            battle,
            decision,
            pipeline,
        }
    }

    /// Advance one tick.
    pub fn step(&mut self) {
        self.battle.tick(&mut self.decision, &mut self.pipeline);
    }

    /// Advance `ticks` ticks, stopping early once the battle is over.
    pub fn run(&mut self, ticks: u64) {
        for _ in 0..ticks {
            if self.battle.is_over() {
                break;
            }
            self.step();
        }
    }
}

/// Run a setup multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to advance the state by one tick
/// * `hash` - Function to compute the state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run a scenario twice and compare final state hashes.
pub fn verify_battle_determinism<F>(setup_fn: F, num_ticks: u64) -> DeterminismResult
where
    F: Fn() -> Scenario,
{
    verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        Scenario::step,
        |s| s.battle.state_hash(),
    )
}

/// Run N scenarios on scoped threads and collect final hashes.
///
/// Catches non-determinism that only shows up under different thread
/// scheduling or memory layout.
pub fn run_parallel_battles<F>(setup_fn: F, num_battles: usize, num_ticks: u64) -> DeterminismResult
where
    F: Fn() -> Scenario + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_battles)
            .map(|_| {
                s.spawn(|| {
                    let mut scenario = setup_fn();
                    for _ in 0..num_ticks {
                        scenario.step();
                    }
                    scenario.battle.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("battle thread panicked"))
            .collect()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        ticks: num_ticks,
    }
}

/// Compare two runs tick-by-tick, finding the first divergence.
///
/// # Returns
///
/// `None` if the runs match, `Some(tick)` if they diverge at that tick.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Scenario,
{
    let mut a = setup_fn();
    let mut b = setup_fn();

    if a.battle.state_hash() != b.battle.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        a.step();
        b.step();

        if a.battle.state_hash() != b.battle.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Verify that a snapshot round-trip preserves the battle exactly, and
/// that the restored battle keeps evolving identically.
pub fn verify_serialization_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Scenario,
{
    let mut scenario = setup_fn();
    scenario.run(num_ticks);

    let Ok(bytes) = scenario.battle.serialize() else {
        return false;
    };
    let Ok(restored) = Battle::deserialize(&bytes) else {
        return false;
    };
    if restored.state_hash() != scenario.battle.state_hash() {
        return false;
    }

    let mut twin = Scenario::new(restored, scenario.decision.clone(), scenario.pipeline.clone());
    scenario.run(num_ticks);
    twin.run(num_ticks);
    twin.battle.state_hash() == scenario.battle.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for battle testing.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing.
pub mod strategies {
    use battle_core::data::{AoeOrigin, AoeShape, AoeSpec, MovementMode, SkillData, SkillKind};
    use battle_core::math::Vec2;
    use proptest::prelude::*;

    /// Generate a point inside the default 816x624 field.
    pub fn arb_field_point() -> impl Strategy<Value = Vec2> {
        (0.0f32..816.0, 0.0f32..624.0).prop_map(|(x, y)| Vec2::new(x, y))
    }

    /// Generate a point that may lie well outside the field.
    pub fn arb_wild_point() -> impl Strategy<Value = Vec2> {
        (-2000.0f32..2000.0, -2000.0f32..2000.0).prop_map(|(x, y)| Vec2::new(x, y))
    }

    /// Generate any movement mode.
    pub fn arb_movement_mode() -> impl Strategy<Value = MovementMode> {
        prop_oneof![
            Just(MovementMode::Stay),
            Just(MovementMode::Dashback),
            Just(MovementMode::Rush),
            Just(MovementMode::Passthrough),
            Just(MovementMode::Pierce),
        ]
    }

    /// Generate an AoE shape with sane dimensions.
    pub fn arb_aoe_shape() -> impl Strategy<Value = AoeShape> {
        prop_oneof![
            (1.0f32..200.0).prop_map(|radius| AoeShape::Circle { radius }),
            (1.0f32..300.0, 1.0f32..80.0).prop_map(|(length, width)| AoeShape::Line { length, width }),
            (1.0f32..200.0, 1.0f32..360.0)
                .prop_map(|(radius, angle_degrees)| AoeShape::Cone { radius, angle_degrees }),
        ]
    }

    /// Generate a skill: movement mode, optional retreat, optional AoE,
    /// knockback or pull.
    pub fn arb_skill() -> impl Strategy<Value = SkillData> {
        (
            arb_movement_mode(),
            proptest::option::of((0.0f32..360.0, 0.0f32..200.0)),
            proptest::option::of(arb_aoe_shape()),
            0.0f32..120.0,
            0.0f32..120.0,
            any::<bool>(),
        )
            .prop_map(|(mode, retreat, aoe, knockback, pull, magical)| {
                let mut skill = SkillData::new("generated")
                    .with_movement(mode)
                    .with_knockback(knockback)
                    .with_pull(pull)
                    .with_kind(if magical {
                        SkillKind::Magical
                    } else {
                        SkillKind::Physical
                    });
                if let Some((angle, distance)) = retreat {
                    skill = skill.with_retreat(angle, distance);
                }
                if let Some(shape) = aoe {
                    skill = skill.with_aoe(AoeSpec {
                        shape,
                        origin: AoeOrigin::Caster,
                        apply_to_targets: true,
                    });
                }
                skill
            })
    }

    /// Generate a small battlefield layout: party and troop positions.
    pub fn arb_layout(max_per_side: usize) -> impl Strategy<Value = (Vec<Vec2>, Vec<Vec2>)> {
        (
            proptest::collection::vec(arb_field_point(), 1..=max_per_side),
            proptest::collection::vec(arb_field_point(), 1..=max_per_side),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{battle_with, standard_battle};
    use battle_core::config::BattleConfig;
    use battle_core::data::{MovementMode, SkillData};
    use proptest::prelude::*;

    fn skirmish(seed: u64) -> Scenario {
        let fixture = standard_battle(seed);
        Scenario::new(
            fixture.battle,
            ScriptedDecision::new(40).with_skill(SkillData::new("claw").with_movement(MovementMode::Dashback)),
            RecordingPipeline::new().with_hits_to_defeat(6),
        )
    }

    #[test]
    fn test_same_seed_same_hash() {
        verify_battle_determinism(|| skirmish(7), 600).assert_deterministic();
    }

    #[test]
    fn test_no_divergence() {
        assert_eq!(find_first_divergence(|| skirmish(3), 400), None);
    }

    #[test]
    fn test_different_seeds_diverge() {
        let mut a = skirmish(1);
        let mut b = skirmish(2);
        a.run(600);
        b.run(600);
        assert_ne!(a.battle.state_hash(), b.battle.state_hash());
    }

    #[test]
    fn test_parallel_battles_match() {
        run_parallel_battles(|| skirmish(11), 4, 300).assert_deterministic();
    }

    #[test]
    fn test_snapshot_resumes_identically() {
        assert!(verify_serialization_determinism(|| skirmish(5), 200));
    }

    proptest! {
        #[test]
        fn prop_random_layouts_are_deterministic(
            (party, troop) in strategies::arb_layout(3),
            skill in strategies::arb_skill(),
            seed in any::<u64>(),
        ) {
            let setup = || {
                let fixture = battle_with(BattleConfig::default(), seed, &party, &troop);
                Scenario::new(
                    fixture.battle,
                    ScriptedDecision::new(60).with_skill(skill.clone()),
                    RecordingPipeline::new().with_hits_to_defeat(4),
                )
            };
            let result = verify_battle_determinism(setup, 300);
            prop_assert!(result.is_deterministic);
        }
    }
}
