use std::mem::replace;

use bumpalo::Bump;
use log::debug;
use log::info;
use log::trace;
use rustc_hash::FxHashMap;

use pmc_io::LargeFormatter;
use pmc_io::TimeProgress;
use pmc_model::IncomingTransitions;
use pmc_model::Model;
use pmc_model::StateIndex;
use pmc_number::Value;
use pmc_number::ValueCache;
use pmc_utilities::Timing;

use crate::BlockIndex;
use crate::BlockPartition;
use crate::BlockPartitionBuilder;
use crate::IndexedPartition;
use crate::Partition;
use crate::Signature;
use crate::SignatureBuilder;
use crate::strong_bisim_signature;

/// Computes the coarsest strong bisimulation that refines the initial
/// partition, using signature refinement where only the signatures of states
/// with a transition into a newly created block are recomputed.
pub fn strong_bisim_sigref<V: Value>(
    model: &Model<V>,
    initial_partition: &IndexedPartition,
    cache: &mut ValueCache<V>,
    timing: &mut Timing,
) -> BlockPartition {
    let mut timepre = timing.start("preprocess");
    let incoming = IncomingTransitions::new(model);
    timepre.finish();

    let mut time = timing.start("reduction");
    let partition = signature_refinement(&incoming, initial_partition, |state_index, partition, builder| {
        strong_bisim_signature(state_index, model, partition, cache, builder);
    });
    time.finish();

    partition
}

/// Computes the coarsest strong bisimulation that refines the initial
/// partition, recomputing the signatures of all states in every round.
pub fn strong_bisim_sigref_naive<V: Value>(
    model: &Model<V>,
    initial_partition: &IndexedPartition,
    cache: &mut ValueCache<V>,
    timing: &mut Timing,
) -> IndexedPartition {
    let mut time = timing.start("reduction");
    let partition = signature_refinement_naive(model, initial_partition, |state_index, partition, builder| {
        strong_bisim_signature(state_index, model, partition, cache, builder);
    });
    time.finish();

    partition
}

/// General signature refinement algorithm that accepts an arbitrary signature.
///
/// Initially all states are marked and every block is on the worklist. A block
/// from the worklist is split based on the signatures of its marked states,
/// after which the predecessors of all new blocks are marked. The largest
/// resulting block keeps the index of the split block, so its predecessors
/// need not be marked.
fn signature_refinement<F>(
    incoming: &IncomingTransitions,
    initial_partition: &IndexedPartition,
    mut signature: F,
) -> BlockPartition
where
    F: FnMut(StateIndex, &BlockPartition, &mut SignatureBuilder),
{
    // Avoids reallocations when computing the signature.
    let mut builder = SignatureBuilder::default();
    let mut split_builder = BlockPartitionBuilder::default();

    let mut partition = BlockPartition::with_partition(initial_partition);
    let mut worklist: Vec<BlockIndex> = BlockIndex::range(partition.num_of_blocks()).rev().collect();

    let mut iteration = 0usize;
    let mut states = Vec::new();

    let progress = TimeProgress::new(
        |(iteration, blocks): (usize, usize)| {
            debug!("Iteration {iteration}, found {} blocks...", LargeFormatter(blocks));
        },
        5,
    );

    while let Some(block_index) = worklist.pop() {
        debug_assert!(
            partition.block(block_index).has_marked(),
            "Every block in the worklist should have at least one marked state"
        );

        // Signatures are only compared within the block that is split, so the
        // numbering starts from scratch for every block.
        let arena = Bump::new();
        let mut id: FxHashMap<Signature<'_>, BlockIndex> = FxHashMap::default();

        for new_block_index in partition.partition_marked_with(block_index, &mut split_builder, |state_index, partition| {
            signature(state_index, partition, &mut builder);

            let index = if let Some(index) = id.get(&Signature::new(&builder)) {
                *index
            } else {
                let number = BlockIndex::new(id.len());
                id.insert(Signature::new(arena.alloc_slice_copy(&builder)), number);
                number
            };

            trace!("State {state_index} signature {:?} index {index}", Signature::new(&builder));
            index
        }) {
            if block_index != new_block_index {
                // Mark the predecessors of the new block, as their signatures may have changed.
                states.clear();
                states.extend(partition.iter_block(new_block_index));

                for &state_index in &states {
                    for predecessor in incoming.predecessors(state_index) {
                        let other_block = partition.block_number(predecessor);

                        if !partition.block(other_block).has_marked() {
                            worklist.push(other_block);
                        }

                        partition.mark_state(predecessor);
                    }
                }
            }
        }

        trace!("Iteration {iteration} partition {partition}");

        iteration += 1;
        progress.print((iteration, partition.num_of_blocks()));
    }

    info!(
        "Refinement took {} iterations and resulted in {} blocks",
        LargeFormatter(iteration),
        LargeFormatter(partition.num_of_blocks())
    );
    partition
}

/// General signature refinement algorithm that recomputes the signatures of
/// all states until the number of blocks no longer changes.
///
/// Two states are in the same block of the next partition iff they are in
/// the same block of the current partition and have the same signature.
fn signature_refinement_naive<F, V: Value>(
    model: &Model<V>,
    initial_partition: &IndexedPartition,
    mut signature: F,
) -> IndexedPartition
where
    F: FnMut(StateIndex, &IndexedPartition, &mut SignatureBuilder),
{
    // Avoids reallocations when computing the signature.
    let mut builder = SignatureBuilder::default();

    let mut partition = IndexedPartition::new(model.num_of_states());
    let mut next_partition = initial_partition.clone();

    let mut iteration = 0usize;

    let progress = TimeProgress::new(
        |(iteration, blocks): (usize, usize)| {
            debug!("Iteration {iteration}, found {} blocks...", LargeFormatter(blocks));
        },
        5,
    );

    while partition.num_of_blocks() != next_partition.num_of_blocks() || iteration == 0 {
        partition = replace(&mut next_partition, IndexedPartition::new(model.num_of_states()));
        progress.print((iteration, partition.num_of_blocks()));

        let arena = Bump::new();
        let mut id: FxHashMap<(BlockIndex, Signature<'_>), BlockIndex> = FxHashMap::default();

        for state_index in model.iter_states() {
            signature(state_index, &partition, &mut builder);
            trace!("State {state_index} signature {:?}", Signature::new(&builder));

            let block = partition.block_number(state_index);
            let new_id = if let Some(index) = id.get(&(block, Signature::new(&builder))) {
                *index
            } else {
                let number = BlockIndex::new(id.len());
                id.insert((block, Signature::new(arena.alloc_slice_copy(&builder))), number);
                number
            };

            next_partition.set_block(state_index, new_id);
        }

        iteration += 1;

        debug_assert!(
            iteration <= model.num_of_states() + 1,
            "There can never be more splits than number of states"
        );
    }

    trace!("Refinement partition {next_partition}");
    info!(
        "Refinement took {} iterations and resulted in {} blocks",
        LargeFormatter(iteration),
        LargeFormatter(next_partition.num_of_blocks())
    );
    next_partition
}

/// Returns true iff the given partition is the coarsest stable refinement of
/// the initial partition, i.e. all states in a block have the same signature
/// and any two blocks of the same initial block have different signatures.
pub fn is_valid_refinement<F, P, V>(
    model: &Model<V>,
    initial_partition: &impl Partition,
    partition: &P,
    mut compute_signature: F,
) -> bool
where
    F: FnMut(StateIndex, &P, &mut SignatureBuilder),
    P: Partition,
    V: Value,
{
    let mut block_to_signature: Vec<Option<SignatureBuilder>> = vec![None; partition.num_of_blocks()];
    let mut block_to_initial: Vec<Option<BlockIndex>> = vec![None; partition.num_of_blocks()];

    // Avoids reallocations when computing the signature.
    let mut builder = SignatureBuilder::default();

    for state_index in model.iter_states() {
        let block = partition.block_number(state_index);
        let initial_block = initial_partition.block_number(state_index);

        if *block_to_initial[block].get_or_insert(initial_block) != initial_block {
            trace!("Block {block} contains states of different initial blocks");
            return false;
        }

        compute_signature(state_index, partition, &mut builder);
        if let Some(block_signature) = &block_to_signature[block] {
            if builder != *block_signature {
                trace!(
                    "State {state_index} has a different signature {builder:?} than the block {block} which has signature {block_signature:?}"
                );
                return false;
            }
        } else {
            block_to_signature[block] = Some(builder.clone());
        }
    }

    // Check if there are two blocks with the same signature in the same initial block.
    let mut signature_to_block: FxHashMap<(BlockIndex, Signature), BlockIndex> = FxHashMap::default();

    for (block_index, (signature, initial_block)) in block_to_signature.iter().zip(&block_to_initial).enumerate() {
        let (Some(signature), Some(initial_block)) = (signature, initial_block) else {
            trace!("Block {block_index} is empty");
            return false;
        };

        let block_index = BlockIndex::new(block_index);
        let other_block_index = *signature_to_block
            .entry((*initial_block, Signature::new(signature)))
            .or_insert(block_index);

        if other_block_index != block_index {
            trace!("Block {block_index} and {other_block_index} have the same signature {signature:?}");
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use pmc_model::ModelBuilder;
    use pmc_model::ModelType;
    use pmc_model::random_dtmc;
    use pmc_model::random_parametric_dtmc;
    use pmc_number::Parameter;
    use pmc_number::RationalFunction;
    use pmc_utilities::random_test;

    use crate::Preserved;
    use crate::label_partition;
    use crate::quotient_model;

    /// Returns true iff the partitions are equal, runs in O(n^2).
    fn equal_partitions(left: &impl Partition, right: &impl Partition) -> bool {
        StateIndex::range(left.len()).all(|state_index| {
            StateIndex::range(left.len()).all(|other_state_index| {
                (left.block_number(state_index) == left.block_number(other_state_index))
                    == (right.block_number(state_index) == right.block_number(other_state_index))
            })
        })
    }

    /// Runs both refinement algorithms and checks that they agree on a valid refinement. For
    /// floating point values a sum into a union of blocks is not always the sum of the sums into
    /// the blocks, so the partitions can only be compared for exact values.
    fn check_refinement<V: Value>(model: &Model<V>) {
        let mut cache = ValueCache::new();
        let mut timing = Timing::new();

        let preserved = Preserved::all(model);
        let initial_partition = label_partition(model, &preserved, &mut cache).unwrap();
        let result_partition = strong_bisim_sigref(model, &initial_partition, &mut cache, &mut timing);
        let expected_partition = strong_bisim_sigref_naive(model, &initial_partition, &mut cache, &mut timing);

        assert!(equal_partitions(&result_partition, &expected_partition));
        assert!(is_valid_refinement(
            model,
            &initial_partition,
            &expected_partition,
            |state_index, partition, builder| strong_bisim_signature(state_index, model, partition, &mut cache, builder)
        ));
    }

    #[test]
    #[cfg_attr(miri, ignore)] // Miri is too slow
    fn test_random_strong_bisim_sigref() {
        random_test(100, |rng| {
            let model = random_dtmc::<RationalFunction>(rng, 10, 2, 3);
            check_refinement(&model);
        });
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_random_float_strong_bisim_sigref() {
        random_test(100, |rng| {
            let model = random_dtmc::<f64>(rng, 10, 2, 3);
            let mut cache = ValueCache::new();
            let mut timing = Timing::new();

            let preserved = Preserved::all(&model);
            let initial_partition = label_partition(&model, &preserved, &mut cache).unwrap();

            // The quotient only exists when all states in a block have the same signature.
            let partition = strong_bisim_sigref(&model, &initial_partition, &mut cache, &mut timing);
            quotient_model(&model, &partition, &preserved).unwrap();

            let partition = strong_bisim_sigref_naive(&model, &initial_partition, &mut cache, &mut timing);
            quotient_model(&model, &partition, &preserved).unwrap();
        });
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_random_parametric_strong_bisim_sigref() {
        random_test(20, |rng| {
            let model = random_parametric_dtmc(rng, 10, 1, 3, &[Parameter::new("p"), Parameter::new("q")]);
            check_refinement::<RationalFunction>(&model);
        });
    }

    #[test]
    fn test_single_self_loop() {
        let mut builder = ModelBuilder::<f64>::new();
        builder.add_initial_state(StateIndex::new(0));
        builder.add_transition(StateIndex::new(0), StateIndex::new(0), 1.0);
        let model = builder.finish(ModelType::Dtmc).unwrap();

        let mut cache = ValueCache::new();
        let mut timing = Timing::new();
        let initial_partition = IndexedPartition::new(1);

        let partition = strong_bisim_sigref(&model, &initial_partition, &mut cache, &mut timing);
        assert_eq!(partition.num_of_blocks(), 1);

        let partition = strong_bisim_sigref_naive(&model, &initial_partition, &mut cache, &mut timing);
        assert_eq!(partition.num_of_blocks(), 1);
    }

    #[test]
    fn test_chain_is_split() {
        // A chain 0 -> 1 -> 2 -> 3 where only the last state is labelled, every state has a distinct distance.
        let mut builder = ModelBuilder::<f64>::new();
        builder.add_initial_state(StateIndex::new(0));
        for state in 0..3 {
            builder.add_transition(StateIndex::new(state), StateIndex::new(state + 1), 1.0);
        }
        builder.add_transition(StateIndex::new(3), StateIndex::new(3), 1.0);
        builder.add_state_label(StateIndex::new(3), "goal");
        let model = builder.finish(ModelType::Dtmc).unwrap();

        let mut cache = ValueCache::new();
        let mut timing = Timing::new();
        let initial_partition = label_partition(&model, &Preserved::with_labels(["goal"]), &mut cache).unwrap();

        let partition = strong_bisim_sigref(&model, &initial_partition, &mut cache, &mut timing);
        assert_eq!(partition.num_of_blocks(), 4);

        let partition = strong_bisim_sigref_naive(&model, &initial_partition, &mut cache, &mut timing);
        assert_eq!(partition.num_of_blocks(), 4);
    }
}
