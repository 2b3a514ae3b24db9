#![forbid(unsafe_code)]

use std::fmt;

use pmc_model::StateIndex;

use crate::BlockIndex;
use crate::Partition;

/// Defines a partition based on an explicit indexing of states to their block
/// number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexedPartition {
    partition: Vec<BlockIndex>,

    num_of_blocks: usize,
}

impl IndexedPartition {
    /// Create a new partition where all states are in a single block.
    pub fn new(num_of_states: usize) -> IndexedPartition {
        IndexedPartition {
            partition: vec![BlockIndex::new(0); num_of_states],
            num_of_blocks: 1,
        }
    }

    /// Create a new partition with the given block numbers, which must be dense.
    pub fn with_partition(partition: Vec<BlockIndex>, num_of_blocks: usize) -> IndexedPartition {
        debug_assert!(
            partition.iter().all(|block| *block < num_of_blocks),
            "The block numbers must be smaller than the number of blocks"
        );

        IndexedPartition {
            partition,
            num_of_blocks,
        }
    }

    /// Iterates over the block numbers of all states.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = BlockIndex> + '_ {
        self.partition.iter().copied()
    }

    /// Sets the block number of the given state.
    pub fn set_block(&mut self, state_index: StateIndex, block_number: BlockIndex) {
        // This assumes that the blocks are dense, otherwise it overestimates the number of blocks.
        self.num_of_blocks = self.num_of_blocks.max(block_number.value() + 1);

        self.partition[state_index] = block_number;
    }
}

/// Renumbers the blocks of the given partition in the order of their smallest
/// state, so block zero contains state zero and so on. The result is
/// independent of the numbering that the refinement algorithm happened to use.
pub fn canonical_partition(partition: &impl Partition) -> IndexedPartition {
    let mut renumbering: Vec<Option<BlockIndex>> = vec![None; partition.num_of_blocks()];
    let mut result = Vec::with_capacity(partition.len());
    let mut num_of_blocks = 0;

    for state_index in StateIndex::range(partition.len()) {
        let block = partition.block_number(state_index);
        let number = *renumbering[block].get_or_insert_with(|| {
            num_of_blocks += 1;
            BlockIndex::new(num_of_blocks - 1)
        });

        result.push(number);
    }

    IndexedPartition::with_partition(result, num_of_blocks)
}

impl fmt::Display for IndexedPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ ")?;

        let mut first = true;
        for block_index in BlockIndex::range(self.num_of_blocks) {
            // Print all states with the same block number.
            let mut first_state = true;
            for (state_index, _) in self.iter().enumerate().filter(|(_, block)| *block == block_index) {
                if !first_state {
                    write!(f, ", ")?;
                } else {
                    if !first {
                        write!(f, ", ")?;
                    }

                    write!(f, "{{")?;
                }

                write!(f, "{state_index}")?;
                first_state = false;
            }

            if !first_state {
                write!(f, "}}")?;
                first = false;
            }
        }

        write!(f, " }}")
    }
}

impl Partition for IndexedPartition {
    fn block_number(&self, state_index: StateIndex) -> BlockIndex {
        self.partition[state_index]
    }

    fn num_of_blocks(&self) -> usize {
        self.num_of_blocks
    }

    fn len(&self) -> usize {
        self.partition.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks(numbers: &[usize]) -> Vec<BlockIndex> {
        numbers.iter().map(|number| BlockIndex::new(*number)).collect()
    }

    #[test]
    fn test_canonical_partition() {
        let partition = IndexedPartition::with_partition(blocks(&[2, 0, 2, 1, 0]), 3);
        let canonical = canonical_partition(&partition);

        assert_eq!(canonical.iter().collect::<Vec<_>>(), blocks(&[0, 1, 0, 2, 1]));
        assert_eq!(canonical.num_of_blocks(), 3);
        assert_eq!(canonical.to_string(), "{ {0, 2}, {1, 4}, {3} }");
    }
}
