//! Property-based tests for the pure fold.
//!
//! These tests use proptest to verify properties hold across
//! many randomly generated inputs.

use futures::stream;
use futures::StreamExt;
use mutator::core::{fold_mutations, reduce_all, Mutation, MutationStreamExt};
use mutator::flow::merge;
use proptest::prelude::*;

#[derive(Clone, PartialEq, Debug)]
struct Counter {
    total: i64,
    steps: u32,
}

#[derive(Clone, Debug)]
enum Op {
    Add(i64),
    Double,
    Reset,
}

impl Op {
    fn mutation(&self) -> Mutation<Counter> {
        match *self {
            Op::Add(n) => Mutation::new(move |c: Counter| Counter {
                total: c.total.wrapping_add(n),
                steps: c.steps + 1,
            }),
            Op::Double => Mutation::new(|c: Counter| Counter {
                total: c.total.wrapping_mul(2),
                steps: c.steps + 1,
            }),
            Op::Reset => Mutation::new(|c: Counter| Counter {
                total: 0,
                steps: c.steps + 1,
            }),
        }
    }
}

prop_compose! {
    fn arbitrary_op()(variant in 0..3u8, n in -1000i64..1000) -> Op {
        match variant {
            0 => Op::Add(n),
            1 => Op::Double,
            _ => Op::Reset,
        }
    }
}

fn seed() -> Counter {
    Counter { total: 0, steps: 0 }
}

proptest! {
    #[test]
    fn fold_is_deterministic(ops in prop::collection::vec(arbitrary_op(), 0..50)) {
        let mutations: Vec<_> = ops.iter().map(Op::mutation).collect();

        let first: Vec<Counter> = fold_mutations(seed(), mutations.clone()).collect();
        let second: Vec<Counter> = fold_mutations(seed(), mutations).collect();

        prop_assert_eq!(first, second);
    }

    #[test]
    fn every_mutation_is_applied_exactly_once(ops in prop::collection::vec(arbitrary_op(), 0..50)) {
        let mutations: Vec<_> = ops.iter().map(Op::mutation).collect();
        let states: Vec<Counter> = fold_mutations(seed(), mutations).collect();

        prop_assert_eq!(states.len(), ops.len());
        for (index, state) in states.iter().enumerate() {
            prop_assert_eq!(state.steps as usize, index + 1);
        }
    }

    #[test]
    fn fold_of_concatenation_resumes_from_prefix(
        prefix in prop::collection::vec(arbitrary_op(), 0..25),
        suffix in prop::collection::vec(arbitrary_op(), 0..25),
    ) {
        let middle = reduce_all(seed(), prefix.iter().map(Op::mutation));
        let resumed = reduce_all(middle, suffix.iter().map(Op::mutation));
        let whole = reduce_all(seed(), prefix.iter().chain(suffix.iter()).map(Op::mutation));

        prop_assert_eq!(resumed, whole);
    }

    #[test]
    fn composed_mutation_equals_sequential_application(
        ops in prop::collection::vec(arbitrary_op(), 1..20),
    ) {
        let composed = ops
            .iter()
            .map(Op::mutation)
            .reduce(Mutation::then)
            .unwrap_or_else(Mutation::identity);

        prop_assert_eq!(
            composed.apply(seed()),
            reduce_all(seed(), ops.iter().map(Op::mutation))
        );
    }

    #[test]
    fn stream_fold_matches_iterator_fold(ops in prop::collection::vec(arbitrary_op(), 0..30)) {
        let mutations: Vec<_> = ops.iter().map(Op::mutation).collect();
        let expected: Vec<Counter> = fold_mutations(seed(), mutations.clone()).collect();

        let folded: Vec<Counter> = futures::executor::block_on(
            stream::iter(mutations).reduce_into(seed()).collect(),
        );

        prop_assert_eq!(folded, expected);
    }

    #[test]
    fn merge_preserves_each_producer_order(
        left in prop::collection::vec(0u32..1000, 0..30),
        right in prop::collection::vec(1000u32..2000, 0..30),
    ) {
        let merged: Vec<u32> = futures::executor::block_on(
            merge(vec![
                stream::iter(left.clone()).boxed(),
                stream::iter(right.clone()).boxed(),
            ])
            .collect(),
        );

        let from_left: Vec<u32> = merged.iter().copied().filter(|n| *n < 1000).collect();
        let from_right: Vec<u32> = merged.iter().copied().filter(|n| *n >= 1000).collect();
        prop_assert_eq!(merged.len(), left.len() + right.len());
        prop_assert_eq!(from_left, left);
        prop_assert_eq!(from_right, right);
    }
}
