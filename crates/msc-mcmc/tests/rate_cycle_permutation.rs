use msc_core::RngHandle;
use msc_mcmc::{AdaptiveTuner, DiscreteRateCycle, RateCycleConfig, Tunable};
use proptest::prelude::*;

proptest! {
    #[test]
    fn cycle_permutes_values(
        rates in prop::collection::vec(0i64..8, 3..24),
        k in 3usize..30,
        seed in any::<u64>(),
    ) {
        let op = DiscreteRateCycle::new(&RateCycleConfig { k, optimise: false }, rates.len()).unwrap();
        let mut proposed = rates.clone();
        let proposal = op.propose(&mut proposed, &mut RngHandle::from_seed(seed)).unwrap();

        prop_assert_eq!(proposal.cycle.len(), k.min(rates.len()));
        prop_assert_eq!(proposal.log_hastings_ratio(), 0.0);

        let mut sorted_before = rates.clone();
        let mut sorted_after = proposed.clone();
        sorted_before.sort_unstable();
        sorted_after.sort_unstable();
        prop_assert_eq!(sorted_before, sorted_after);

        for (position, (old, new)) in rates.iter().zip(&proposed).enumerate() {
            if old != new {
                prop_assert!(proposal.cycle.contains(&position));
            }
        }

        proposal.revert(&mut proposed);
        prop_assert_eq!(proposed, rates);
    }
}

#[test]
fn distinct_values_all_move() {
    let op = DiscreteRateCycle::new(
        &RateCycleConfig {
            k: 5,
            optimise: false,
        },
        5,
    )
    .unwrap();
    let mut rates = vec![0, 1, 2, 3, 4];
    op.propose(&mut rates, &mut RngHandle::from_seed(12)).unwrap();
    assert!(rates.iter().enumerate().all(|(i, &v)| v != i as i64));
}

#[test]
fn tuning_grows_cycle_when_everything_is_accepted() {
    let mut op = DiscreteRateCycle::new(&RateCycleConfig::default(), 10).unwrap();
    let mut tuner = AdaptiveTuner::new(0.234).unwrap();
    for _ in 0..5 {
        tuner.record(true);
        tuner.optimize(&mut op, 0.0);
    }
    assert!(op.tunable_value() > 3.0);
    assert!(op.cycle_length() >= 4);
}
