#![forbid(unsafe_code)]

use std::fmt;

use log::info;

use pmc_io::LargeFormatter;
use pmc_model::Model;
use pmc_model::formula::Property;
use pmc_number::Value;
use pmc_number::ValueCache;
use pmc_utilities::Timing;

use crate::Preserved;
use crate::Quotient;
use crate::ReductionError;
use crate::label_partition;
use crate::quotient_model;
use crate::strong_bisim_sigref;
use crate::strong_bisim_sigref_naive;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum BisimulationType {
    Strong,
    /// Not supported, minimisation fails with [ReductionError::UnsupportedBisimulationType].
    Weak,
}

impl fmt::Display for BisimulationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BisimulationType::Strong => write!(f, "Strong"),
            BisimulationType::Weak => write!(f, "Weak"),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum RefinementAlgorithm {
    /// Only recomputes the signatures of states that can reach a new block.
    #[default]
    Sigref,
    /// Recomputes the signatures of all states in every round.
    SigrefNaive,
}

/// Minimises the given model such that the labels and reward models that the
/// properties refer to are preserved.
pub fn perform_bisimulation<V: Value>(
    model: &Model<V>,
    properties: &[Property],
    bisimulation_type: BisimulationType,
) -> Result<Quotient<V>, ReductionError> {
    let preserved = Preserved::from_properties(model, properties);
    reduce_model(
        model,
        &preserved,
        bisimulation_type,
        RefinementAlgorithm::Sigref,
        &mut Timing::new(),
    )
}

/// Minimises the given model modulo the given bisimulation, preserving the
/// given labels and reward models.
pub fn reduce_model<V: Value>(
    model: &Model<V>,
    preserved: &Preserved,
    bisimulation_type: BisimulationType,
    algorithm: RefinementAlgorithm,
    timing: &mut Timing,
) -> Result<Quotient<V>, ReductionError> {
    if bisimulation_type != BisimulationType::Strong {
        return Err(ReductionError::UnsupportedBisimulationType(bisimulation_type));
    }

    // The interned values only live as long as this minimisation.
    let mut cache = ValueCache::new();

    let mut time_labels = timing.start("label partition");
    let initial_partition = label_partition(model, preserved, &mut cache)?;
    time_labels.finish();

    let result = match algorithm {
        RefinementAlgorithm::Sigref => {
            let partition = strong_bisim_sigref(model, &initial_partition, &mut cache, timing);
            let mut time_quotient = timing.start("quotient");
            let result = quotient_model(model, &partition, preserved);
            time_quotient.finish();
            result
        }
        RefinementAlgorithm::SigrefNaive => {
            let partition = strong_bisim_sigref_naive(model, &initial_partition, &mut cache, timing);
            let mut time_quotient = timing.start("quotient");
            let result = quotient_model(model, &partition, preserved);
            time_quotient.finish();
            result
        }
    }?;

    info!(
        "Minimised {} states and {} transitions to {} states and {} transitions",
        LargeFormatter(model.num_of_states()),
        LargeFormatter(model.num_of_transitions()),
        LargeFormatter(result.model().num_of_states()),
        LargeFormatter(result.model().num_of_transitions())
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_case::test_case;
    use test_log::test;

    use pmc_model::random_dtmc;
    use pmc_model::random_parametric_dtmc;
    use pmc_number::Parameter;
    use pmc_number::RationalFunction;
    use pmc_utilities::random_test;

    #[test]
    fn test_weak_bisimulation_unsupported() {
        random_test(1, |rng| {
            let model = random_dtmc::<f64>(rng, 5, 1, 2);
            let result = perform_bisimulation(&model, &[], BisimulationType::Weak);
            assert!(matches!(
                result,
                Err(ReductionError::UnsupportedBisimulationType(BisimulationType::Weak))
            ));
        })
    }

    #[test_case(RefinementAlgorithm::Sigref ; "sigref")]
    #[test_case(RefinementAlgorithm::SigrefNaive ; "sigref naive")]
    #[cfg_attr(miri, ignore)]
    fn test_random_reduce_idempotent(algorithm: RefinementAlgorithm) {
        random_test(50, |rng| {
            let model = random_dtmc::<RationalFunction>(rng, 20, 2, 3);
            let preserved = Preserved::all(&model);
            let mut timing = Timing::new();

            let quotient = reduce_model(&model, &preserved, BisimulationType::Strong, algorithm, &mut timing).unwrap();
            assert!(quotient.model().num_of_states() <= model.num_of_states());
            quotient.model().validate(0.0).unwrap();

            for state_index in model.iter_states() {
                assert!(*quotient.quotient_state(state_index) < quotient.model().num_of_states());
            }

            for state_index in model.initial_states() {
                assert!(quotient.model().is_initial_state(quotient.quotient_state(*state_index)));
            }

            let again = reduce_model(quotient.model(), &preserved, BisimulationType::Strong, algorithm, &mut timing).unwrap();
            assert_eq!(again.model().num_of_states(), quotient.model().num_of_states());
            assert_eq!(again.model().num_of_transitions(), quotient.model().num_of_transitions());
        })
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_random_reduce_deterministic() {
        random_test(20, |rng| {
            let model = random_parametric_dtmc(rng, 15, 2, 3, &[Parameter::new("p")]);
            let preserved = Preserved::all(&model);

            let first = reduce_model(
                &model,
                &preserved,
                BisimulationType::Strong,
                RefinementAlgorithm::Sigref,
                &mut Timing::new(),
            )
            .unwrap();
            let second = reduce_model(
                &model,
                &preserved,
                BisimulationType::Strong,
                RefinementAlgorithm::SigrefNaive,
                &mut Timing::new(),
            )
            .unwrap();

            assert_eq!(first.state_map(), second.state_map());
            assert_eq!(first.model(), second.model());
        })
    }
}
