#![forbid(unsafe_code)]

use itertools::Itertools;

use pmc_model::Model;
use pmc_model::StateIndex;
use pmc_number::Value;
use pmc_utilities::Timing;

use crate::BisimulationType;
use crate::Preserved;
use crate::RefinementAlgorithm;
use crate::ReductionError;
use crate::reduce_model;

/// Returns true iff the initial states of both models are strongly bisimilar,
/// meaning that both models have initial states in the same bisimulation
/// classes, with respect to the preserved labels and reward models.
pub fn compare_models<V: Value>(
    left: &Model<V>,
    right: &Model<V>,
    preserved: &Preserved,
    timing: &mut Timing,
) -> Result<bool, ReductionError> {
    let mut time_merge = timing.start("merge models");
    let (merged, offset) = left.merge_disjoint(right);
    time_merge.finish();

    let quotient = reduce_model(
        &merged,
        preserved,
        BisimulationType::Strong,
        RefinementAlgorithm::Sigref,
        timing,
    )?;

    let left_blocks = left
        .initial_states()
        .iter()
        .map(|state_index| quotient.quotient_state(*state_index))
        .sorted()
        .dedup();
    let right_blocks = right
        .initial_states()
        .iter()
        .map(|state_index| quotient.quotient_state(StateIndex::new(**state_index + offset)))
        .sorted()
        .dedup();

    Ok(left_blocks.eq(right_blocks))
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use pmc_model::ModelBuilder;
    use pmc_model::ModelType;
    use pmc_model::random_dtmc;
    use pmc_number::RationalFunction;
    use pmc_utilities::random_test;

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_random_compare_with_quotient() {
        random_test(50, |rng| {
            let model = random_dtmc::<RationalFunction>(rng, 15, 2, 3);
            let preserved = Preserved::all(&model);
            let mut timing = Timing::new();

            let quotient = reduce_model(
                &model,
                &preserved,
                BisimulationType::Strong,
                RefinementAlgorithm::Sigref,
                &mut timing,
            )
            .unwrap();

            assert!(compare_models(&model, &model, &preserved, &mut timing).unwrap());
            assert!(compare_models(&model, quotient.model(), &preserved, &mut timing).unwrap());
        })
    }

    #[test]
    fn test_compare_different_models() {
        // A coin that reaches heads with probability one half, and one that always does.
        let coin = |probability: f64| {
            let mut builder = ModelBuilder::new();
            builder.add_initial_state(StateIndex::new(0));
            builder.add_transition(StateIndex::new(0), StateIndex::new(1), probability);
            builder.add_transition(StateIndex::new(0), StateIndex::new(2), 1.0 - probability);
            builder.add_transition(StateIndex::new(1), StateIndex::new(1), 1.0);
            builder.add_transition(StateIndex::new(2), StateIndex::new(2), 1.0);
            builder.add_label("heads");
            builder.add_state_label(StateIndex::new(1), "heads");
            builder.finish(ModelType::Dtmc).unwrap()
        };

        let preserved = Preserved::with_labels(["heads"]);
        let mut timing = Timing::new();
        assert!(compare_models(&coin(0.5), &coin(0.5), &preserved, &mut timing).unwrap());
        assert!(!compare_models(&coin(0.5), &coin(1.0), &preserved, &mut timing).unwrap());
    }
}
