#![forbid(unsafe_code)]

use std::fmt;

use itertools::Itertools;

use pmc_model::Model;
use pmc_model::StateIndex;
use pmc_number::Value;
use pmc_number::ValueCache;
use pmc_number::ValueIndex;

use crate::BlockIndex;
use crate::Partition;

/// The builder used to construct a signature, the pairs are sorted by block.
pub type SignatureBuilder = Vec<(BlockIndex, ValueIndex)>;

/// The strong bisimulation signature of a state: for every block that the
/// state can move to, the total probability of moving into that block. The
/// probabilities are interned in a [ValueCache] so that signatures can be
/// hashed and compared cheaply.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Signature<'a>(&'a [(BlockIndex, ValueIndex)]);

impl<'a> Signature<'a> {
    pub fn new(slice: &'a [(BlockIndex, ValueIndex)]) -> Signature<'a> {
        Signature(slice)
    }

    pub fn as_slice(&self) -> &'a [(BlockIndex, ValueIndex)] {
        self.0
    }
}

impl fmt::Debug for Signature<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs = self
            .0
            .iter()
            .format_with(", ", |(block, value), f| f(&format_args!("{block}: #{value}")));
        write!(f, "{{{pairs}}}")
    }
}

/// Computes the strong bisimulation signature of the given state with respect
/// to the partition.
///
/// The probabilities into the same block are summed in the canonical order of
/// [Value::sum_canonical], such that two states moving into a block with the
/// same multiset of probabilities obtain identical sums.
pub fn strong_bisim_signature<V: Value>(
    state_index: StateIndex,
    model: &Model<V>,
    partition: &impl Partition,
    cache: &mut ValueCache<V>,
    builder: &mut SignatureBuilder,
) {
    builder.clear();

    let mut successors: Vec<(BlockIndex, &V)> = model
        .outgoing_transitions(state_index)
        .map(|transition| (partition.block_number(transition.to), transition.value))
        .collect();
    successors.sort_by_key(|(block, _)| *block);

    for (block, values) in &successors.into_iter().chunk_by(|(block, _)| *block) {
        let total = V::sum_canonical(values.map(|(_, value)| value.clone()).collect());

        // Probabilities that cancel out are not a transition into the block.
        if !total.is_zero() {
            builder.push((block, cache.insert(&total)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pmc_model::ModelBuilder;
    use pmc_model::ModelType;

    use crate::IndexedPartition;

    #[test]
    fn test_strong_bisim_signature() {
        let mut builder = ModelBuilder::<f64>::new();
        builder.add_initial_state(StateIndex::new(0));
        builder.add_transition(StateIndex::new(0), StateIndex::new(1), 0.1);
        builder.add_transition(StateIndex::new(0), StateIndex::new(2), 0.2);
        builder.add_transition(StateIndex::new(0), StateIndex::new(3), 0.7);
        builder.add_transition(StateIndex::new(1), StateIndex::new(3), 0.7);
        builder.add_transition(StateIndex::new(1), StateIndex::new(2), 0.1);
        builder.add_transition(StateIndex::new(1), StateIndex::new(1), 0.2);
        for state in 2..4 {
            builder.add_transition(StateIndex::new(state), StateIndex::new(state), 1.0);
        }
        let model = builder.finish(ModelType::Dtmc).unwrap();

        // Block zero contains 0, 1 and 2, block one contains 3.
        let partition = IndexedPartition::with_partition(
            [0, 0, 0, 1].into_iter().map(BlockIndex::new).collect(),
            2,
        );

        let mut cache = ValueCache::new();
        let mut left = SignatureBuilder::new();
        let mut right = SignatureBuilder::new();
        strong_bisim_signature(StateIndex::new(0), &model, &partition, &mut cache, &mut left);
        strong_bisim_signature(StateIndex::new(1), &model, &partition, &mut cache, &mut right);

        // Both states move into block zero with 0.1 and 0.2 in some order.
        assert_eq!(left, right);
        assert_eq!(left.len(), 2);
        assert_eq!(cache.value(left[1].1), &0.7);
    }
}
