#![forbid(unsafe_code)]

use std::fmt;

use itertools::Itertools;

use pmc_model::StateIndex;

use crate::BlockIndex;
use crate::IndexedPartition;
use crate::Partition;

/// A partition that explicitly stores the states of every block contiguously,
/// together with a marking of the states whose signature must be recomputed.
#[derive(Debug)]
pub struct BlockPartition {
    states: Vec<StateIndex>,
    blocks: Vec<Block>,

    // These are only used to provide O(1) marking of states.
    /// Stores the block index for each state.
    state_to_block: Vec<BlockIndex>,

    /// Stores the offset of every state in `states`.
    state_offset: Vec<usize>,
}

impl BlockPartition {
    /// Creates a partition with the blocks of the given partition, in which
    /// every state is marked.
    pub fn with_partition(partition: &IndexedPartition) -> BlockPartition {
        debug_assert!(!partition.is_empty(), "Cannot partition the empty set");

        // Counting sort of the states on their block number.
        let mut block_sizes = vec![0usize; partition.num_of_blocks()];
        for block in partition.iter() {
            block_sizes[block] += 1;
        }

        let mut blocks = Vec::with_capacity(partition.num_of_blocks());
        let mut offsets = Vec::with_capacity(partition.num_of_blocks());
        let mut begin = 0;
        for size in block_sizes {
            debug_assert!(size > 0, "The initial partition contains an empty block");
            blocks.push(Block::new(begin, begin + size));
            offsets.push(begin);
            begin += size;
        }

        let mut states = vec![StateIndex::new(0); partition.len()];
        let mut state_offset = vec![0; partition.len()];
        for (state_index, block) in StateIndex::range(partition.len()).zip(partition.iter()) {
            states[offsets[block]] = state_index;
            state_offset[state_index] = offsets[block];
            offsets[block] += 1;
        }

        let result = BlockPartition {
            states,
            blocks,
            state_to_block: partition.iter().collect(),
            state_offset,
        };

        result.assert_consistent();
        result
    }

    /// Partition the marked states of the given block into multiple new blocks
    /// based on the given partitioner; which returns a number for each marked
    /// state. States with the same number belong to the same block, and the
    /// returned numbers should be dense. The unmarked states remain in a block
    /// of their own.
    ///
    /// Returns an iterator over the resulting block indices, where the first
    /// element is the index of the block that was partitioned. After the split
    /// that index refers to the largest of the resulting blocks.
    pub fn partition_marked_with<F>(
        &mut self,
        block_index: BlockIndex,
        builder: &mut BlockPartitionBuilder,
        mut partitioner: F,
    ) -> impl Iterator<Item = BlockIndex> + use<F>
    where
        F: FnMut(StateIndex, &BlockPartition) -> BlockIndex,
    {
        let block = self.blocks[block_index];
        debug_assert!(
            block.has_marked(),
            "Cannot partition marked states of a block without marked states"
        );

        if block.len() == 1 {
            // A single state is trivially partitioned.
            self.blocks[block_index].unmark_all();
            // All the returned iterators must have the same type.
            return (block_index.value()..=block_index.value())
                .chain(0..0)
                .map(BlockIndex::new);
        }

        builder.index_to_block.clear();
        builder.block_sizes.clear();
        builder.old_states.clear();

        builder.index_to_block.resize(block.len_marked(), BlockIndex::new(0));

        // Consider the marked states in ascending order, so that the result is deterministic.
        builder.old_states.extend(block.iter_marked(&self.states));
        builder.old_states.sort_unstable();

        // Determine the number of the new block of every marked state.
        for (index, &state_index) in builder.old_states.iter().enumerate() {
            let number = partitioner(state_index, self);

            builder.index_to_block[index] = number;
            if number.value() + 1 > builder.block_sizes.len() {
                builder.block_sizes.resize(number.value() + 1, 0);
            }

            builder.block_sizes[number] += 1;
        }

        let end_of_blocks = self.blocks.len();
        let new_block_index = if block.has_unmarked() {
            self.blocks.len()
        } else {
            self.blocks.len() - 1
        };

        // Convert block sizes into block offsets.
        let _ = builder.block_sizes.iter_mut().fold(0usize, |current, size| {
            debug_assert!(*size > 0, "Partition is not dense, there are empty blocks");

            let current = if current == 0 {
                if block.has_unmarked() {
                    // The current block keeps the unmarked states.
                    self.blocks[block_index] = Block::new_unmarked(block.begin, block.marked_split);

                    self.blocks
                        .push(Block::new_unmarked(block.marked_split, block.marked_split + *size));
                    block.marked_split
                } else {
                    // The current block becomes the block with number zero.
                    self.blocks[block_index] = Block::new_unmarked(block.begin, block.begin + *size);
                    block.begin
                }
            } else {
                self.blocks.push(Block::new_unmarked(current, current + *size));
                current
            };

            let offset = current + *size;
            *size = current;
            offset
        });
        let block_offsets = &mut builder.block_sizes;

        for (index, number) in builder.index_to_block.iter().enumerate() {
            let state_index = builder.old_states[index];
            self.states[block_offsets[*number]] = state_index;
            self.state_offset[state_index] = block_offsets[*number];
            self.state_to_block[state_index] = if *number == 0 && !block.has_unmarked() {
                block_index
            } else {
                BlockIndex::new(new_block_index + number.value())
            };

            block_offsets[*number] += 1;
        }

        // The largest block keeps the index of the block that was split.
        let max_block_index = (block_index.value()..=block_index.value())
            .chain(end_of_blocks..self.blocks.len())
            .map(BlockIndex::new)
            .max_by_key(|index| self.block(*index).len())
            .expect("The split block is always one of the candidates");
        self.swap_blocks(block_index, max_block_index);

        self.assert_consistent();

        (block_index.value()..=block_index.value())
            .chain(end_of_blocks..self.blocks.len())
            .map(BlockIndex::new)
    }

    /// Swaps the given blocks given by the indices.
    pub fn swap_blocks(&mut self, left_index: BlockIndex, right_index: BlockIndex) {
        if left_index == right_index {
            return;
        }

        self.blocks.swap(left_index.value(), right_index.value());

        for state_index in self.blocks[left_index].iter(&self.states) {
            self.state_to_block[state_index] = left_index;
        }

        for state_index in self.blocks[right_index].iter(&self.states) {
            self.state_to_block[state_index] = right_index;
        }
    }

    /// Marks the given state, such that it is returned by iter_marked.
    pub fn mark_state(&mut self, state_index: StateIndex) {
        let block_index = self.state_to_block[state_index];
        let offset = self.state_offset[state_index];
        let marked_split = self.blocks[block_index].marked_split;

        if offset < marked_split {
            // State was not already marked.
            self.swap_states(offset, marked_split - 1);
            self.blocks[block_index].marked_split -= 1;
        }

        self.blocks[block_index].assert_consistent();
    }

    /// Returns true iff the given state has been marked.
    pub fn is_state_marked(&self, state_index: StateIndex) -> bool {
        let block_index = self.state_to_block[state_index];
        self.state_offset[state_index] >= self.blocks[block_index].marked_split
    }

    /// Return a reference to the given block.
    pub fn block(&self, block_index: BlockIndex) -> &Block {
        &self.blocks[block_index]
    }

    /// Returns an iterator over the states of a given block.
    pub fn iter_block(&self, block_index: BlockIndex) -> BlockIter<'_> {
        self.blocks[block_index].iter(&self.states)
    }

    /// Swaps the states at the given offsets.
    fn swap_states(&mut self, left_offset: usize, right_offset: usize) {
        self.states.swap(left_offset, right_offset);
        self.state_offset[self.states[left_offset]] = left_offset;
        self.state_offset[self.states[right_offset]] = right_offset;
    }

    /// Checks the invariants of the partition, only in debug builds.
    fn assert_consistent(&self) {
        if cfg!(debug_assertions) {
            let mut seen = vec![false; self.states.len()];

            for block in &self.blocks {
                for state_index in block.iter(&self.states) {
                    debug_assert!(
                        !seen[state_index],
                        "Partition {self}, state {state_index} belongs to multiple blocks"
                    );
                    seen[state_index] = true;
                }

                block.assert_consistent();
            }

            debug_assert!(
                !seen.contains(&false),
                "Partition {self} contains states that do not belong to a block"
            );

            for (state, block_index) in self.state_to_block.iter().enumerate() {
                let offset = self.state_offset[state];
                debug_assert_eq!(
                    self.states[offset], state,
                    "Partition {self}, state {state} does not have the correct offset"
                );

                let block = self.blocks[*block_index];
                debug_assert!(
                    block.begin <= offset && offset < block.end,
                    "Partition {self}, state {state} does not belong to block {block_index}"
                );
            }
        }
    }
}

/// Scratch space for [BlockPartition::partition_marked_with], to avoid
/// reallocations between splits.
#[derive(Default)]
pub struct BlockPartitionBuilder {
    /// The number of the new block for every marked state.
    index_to_block: Vec<BlockIndex>,

    /// The size of each new block.
    block_sizes: Vec<usize>,

    /// Stores the marked states to perform the swaps safely.
    old_states: Vec<StateIndex>,
}

impl Partition for BlockPartition {
    fn block_number(&self, state_index: StateIndex) -> BlockIndex {
        self.state_to_block[state_index]
    }

    fn num_of_blocks(&self) -> usize {
        self.blocks.len()
    }

    fn len(&self) -> usize {
        self.states.len()
    }
}

impl fmt::Display for BlockPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let blocks_str = self.blocks.iter().format_with(", ", |block, f| {
            let states = block
                .iter_unmarked(&self.states)
                .map(|state_index| (state_index, false))
                .chain(block.iter_marked(&self.states).map(|state_index| (state_index, true)))
                .format_with(", ", |(state_index, marked), f| {
                    if marked {
                        f(&format_args!("{state_index}*"))
                    } else {
                        f(&format_args!("{state_index}"))
                    }
                });

            f(&format_args!("{{{states}}}"))
        });

        write!(f, "{{{blocks_str}}}")
    }
}

/// A block stores a contiguous range of the states of a partition.
///
/// # Details
///
/// The states `begin..end` belong to the block, of which the states
/// `marked_split..end` are marked. New blocks can then be split off cheaply.
///
/// Invariant: `begin` <= `marked_split` <= `end` && `begin` < `end`.
#[derive(Clone, Copy, Debug)]
pub struct Block {
    begin: usize,
    marked_split: usize,
    end: usize,
}

impl Block {
    /// Creates a new block where every state is marked.
    pub fn new(begin: usize, end: usize) -> Block {
        debug_assert!(begin < end, "The range {begin} to {end} of this block is incorrect");

        Block {
            begin,
            marked_split: begin,
            end,
        }
    }

    /// Creates a new block without marked states.
    pub fn new_unmarked(begin: usize, end: usize) -> Block {
        debug_assert!(begin < end, "The range {begin} to {end} of this block is incorrect");

        Block {
            begin,
            marked_split: end,
            end,
        }
    }

    /// Returns an iterator over the states in this block.
    pub fn iter<'a>(&self, states: &'a [StateIndex]) -> BlockIter<'a> {
        BlockIter {
            states,
            index: self.begin,
            end: self.end,
        }
    }

    /// Returns an iterator over the marked states in this block.
    pub fn iter_marked<'a>(&self, states: &'a [StateIndex]) -> BlockIter<'a> {
        BlockIter {
            states,
            index: self.marked_split,
            end: self.end,
        }
    }

    /// Returns an iterator over the unmarked states in this block.
    pub fn iter_unmarked<'a>(&self, states: &'a [StateIndex]) -> BlockIter<'a> {
        BlockIter {
            states,
            index: self.begin,
            end: self.marked_split,
        }
    }

    /// Returns true iff the block has marked states.
    pub fn has_marked(&self) -> bool {
        self.marked_split < self.end
    }

    /// Returns true iff the block has unmarked states.
    pub fn has_unmarked(&self) -> bool {
        self.begin < self.marked_split
    }

    /// Returns the number of states in the block.
    pub fn len(&self) -> usize {
        self.end - self.begin
    }

    /// Blocks are never empty, but clippy expects this method.
    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    /// Returns the number of marked states in the block.
    pub fn len_marked(&self) -> usize {
        self.end - self.marked_split
    }

    fn unmark_all(&mut self) {
        self.marked_split = self.end;
    }

    fn assert_consistent(self) {
        debug_assert!(self.begin < self.end, "The range of block {self:?} is incorrect");

        debug_assert!(
            self.begin <= self.marked_split && self.marked_split <= self.end,
            "The marked_split lies outside of the block {self:?}"
        );
    }
}

pub struct BlockIter<'a> {
    states: &'a [StateIndex],
    index: usize,
    end: usize,
}

impl Iterator for BlockIter<'_> {
    type Item = StateIndex;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index < self.end {
            let state_index = self.states[self.index];
            self.index += 1;
            Some(state_index)
        } else {
            None
        }
    }
}
