//! Property tests for battle invariants.
//!
//! Random layouts, skills and gauge rates must never push a gauge out of
//! range or a combatant off the field.

use battle_core::config::BattleConfig;
use battle_core::math::Fixed;
use battle_test_utils::determinism::strategies::{arb_layout, arb_skill, arb_wild_point};
use battle_test_utils::determinism::Scenario;
use battle_test_utils::fixtures::{battle_with, RecordingPipeline, ScriptedDecision};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn gauges_stay_within_range(
        (party, troop) in arb_layout(3),
        rate in 0i32..4000,
        ticks in 1u64..200,
    ) {
        let fixture = battle_with(BattleConfig::default(), 1, &party, &troop);
        let mut scenario = Scenario::new(
            fixture.battle,
            ScriptedDecision::new(rate),
            RecordingPipeline::new(),
        );
        let max = scenario.battle.config().max_gauge_fixed();
        for _ in 0..ticks {
            scenario.step();
            for c in scenario.battle.roster().iter() {
                prop_assert!(c.gauge >= Fixed::ZERO && c.gauge <= max);
            }
        }
    }

    #[test]
    fn combatants_never_leave_the_field(
        (party, troop) in arb_layout(3),
        skill in arb_skill(),
        seed in any::<u64>(),
    ) {
        let fixture = battle_with(BattleConfig::default(), seed, &party, &troop);
        let mut scenario = Scenario::new(
            fixture.battle,
            ScriptedDecision::new(150).with_skill(skill),
            RecordingPipeline::new().with_hits_to_defeat(4),
        );
        let bounds = scenario.battle.config().bounds;
        for _ in 0..400 {
            if scenario.battle.is_over() {
                break;
            }
            scenario.step();
            for c in scenario.battle.roster().iter() {
                prop_assert!(bounds.contains(c.position), "{} at {:?}", c.id, c.position);
            }
        }
    }

    #[test]
    fn spawns_are_clamped_into_the_field(
        party in proptest::collection::vec(arb_wild_point(), 1..4),
        troop in proptest::collection::vec(arb_wild_point(), 1..4),
    ) {
        let fixture = battle_with(BattleConfig::default(), 1, &party, &troop);
        let bounds = fixture.battle.config().bounds;
        for c in fixture.battle.roster().iter() {
            prop_assert!(bounds.contains(c.position));
            prop_assert!(bounds.contains(c.home));
        }
    }
}
