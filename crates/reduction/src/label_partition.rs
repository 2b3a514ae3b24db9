#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use log::debug;
use rustc_hash::FxHashMap;

use pmc_model::Model;
use pmc_model::formula::Property;
use pmc_number::Value;
use pmc_number::ValueCache;
use pmc_number::ValueIndex;

use crate::BlockIndex;
use crate::IndexedPartition;
use crate::Partition;
use crate::ReductionError;

/// The labels and reward models that the minimisation must preserve. All
/// other labels and reward models are dropped from the quotient.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Preserved {
    pub labels: BTreeSet<String>,
    pub reward_models: BTreeSet<String>,
}

impl Preserved {
    /// Preserves exactly the given labels.
    pub fn with_labels<'a>(labels: impl IntoIterator<Item = &'a str>) -> Preserved {
        Preserved {
            labels: labels.into_iter().map(str::to_string).collect(),
            reward_models: BTreeSet::new(),
        }
    }

    /// Preserves everything that the given properties refer to. A reward
    /// property without a reward model name refers to every reward model of
    /// the model.
    pub fn from_properties<V: Value>(model: &Model<V>, properties: &[Property]) -> Preserved {
        let mut result = Preserved::default();

        for property in properties {
            result.labels.extend(property.atomic_labels());
            result.reward_models.extend(property.reward_models());

            if let Property::Reward { reward_model: None, .. } = property {
                result
                    .reward_models
                    .extend(model.reward_models().iter().map(|reward_model| reward_model.name().to_string()));
            }
        }

        result
    }

    /// Preserves all labels and reward models of the given model.
    pub fn all<V: Value>(model: &Model<V>) -> Preserved {
        Preserved {
            labels: model.labeling().label_names().map(str::to_string).collect(),
            reward_models: model
                .reward_models()
                .iter()
                .map(|reward_model| reward_model.name().to_string())
                .collect(),
        }
    }
}

/// Returns the partition in which two states are in the same block iff they
/// carry the same preserved labels and have the same preserved state rewards.
/// Every bisimulation of interest refines this partition.
pub fn label_partition<V: Value>(
    model: &Model<V>,
    preserved: &Preserved,
    cache: &mut ValueCache<V>,
) -> Result<IndexedPartition, ReductionError> {
    let labels = preserved
        .labels
        .iter()
        .map(|name| {
            model
                .labeling()
                .states_with_label(name)
                .ok_or_else(|| ReductionError::UnknownLabel(name.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let reward_models = preserved
        .reward_models
        .iter()
        .map(|name| {
            model
                .reward_model(name)
                .ok_or_else(|| ReductionError::UnknownRewardModel(name.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut id: FxHashMap<(Vec<bool>, Vec<ValueIndex>), BlockIndex> = FxHashMap::default();
    let mut partition = IndexedPartition::new(model.num_of_states());

    for state_index in model.iter_states() {
        let key = (
            labels.iter().map(|states| states[*state_index]).collect(),
            reward_models
                .iter()
                .map(|reward_model| cache.insert(reward_model.state_reward(state_index)))
                .collect(),
        );

        let number = BlockIndex::new(id.len());
        partition.set_block(state_index, *id.entry(key).or_insert(number));
    }

    debug!(
        "The preserved labels and rewards induce {} initial blocks",
        partition.num_of_blocks()
    );
    Ok(partition)
}

#[cfg(test)]
mod tests {
    use super::*;

    use pmc_model::RANDOM_REWARD_MODEL;
    use pmc_model::StateIndex;
    use pmc_model::formula::StateFormula;
    use pmc_model::random_dtmc;
    use pmc_utilities::random_test;

    #[test]
    fn test_random_label_partition() {
        random_test(100, |rng| {
            let model = random_dtmc::<f64>(rng, 10, 2, 3);
            let mut cache = ValueCache::new();
            let partition = label_partition(&model, &Preserved::with_labels(["a"]), &mut cache).unwrap();

            for left in model.iter_states() {
                for right in model.iter_states() {
                    assert_eq!(
                        partition.block_number(left) == partition.block_number(right),
                        model.labeling().has_label(left, "a") == model.labeling().has_label(right, "a")
                    );
                }
            }

            // Without anything to preserve there is a single block.
            let partition = label_partition(&model, &Preserved::default(), &mut cache).unwrap();
            assert_eq!(partition.num_of_blocks(), 1);
            assert_eq!(partition.block_number(StateIndex::new(9)), BlockIndex::new(0));
        })
    }

    #[test]
    fn test_preserved_from_properties() {
        random_test(1, |rng| {
            let model = random_dtmc::<f64>(rng, 5, 3, 2);
            let properties = [
                Property::eventually(StateFormula::label("a").and(StateFormula::label("b"))),
                Property::Reward {
                    reward_model: None,
                    target: StateFormula::label("c"),
                },
            ];

            let preserved = Preserved::from_properties(&model, &properties);
            assert_eq!(preserved.labels, BTreeSet::from(["a".to_string(), "b".to_string(), "c".to_string()]));
            assert_eq!(preserved.reward_models, BTreeSet::from([RANDOM_REWARD_MODEL.to_string()]));
        })
    }

    #[test]
    fn test_unknown_preserved_label() {
        random_test(1, |rng| {
            let model = random_dtmc::<f64>(rng, 5, 1, 2);
            let mut cache = ValueCache::new();
            assert!(matches!(
                label_partition(&model, &Preserved::with_labels(["z"]), &mut cache),
                Err(ReductionError::UnknownLabel(_))
            ));
        })
    }
}
