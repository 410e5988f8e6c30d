//! End-to-end behavior of running state holders.

mod common;

use futures::stream::{self, StreamExt};
use mutator::flow::{merge, FlowExt};
use mutator::holder::ScopedStateHolder;
use mutator::snails::{
    muted_colors, PaletteStateHolder, ProgressStateHolder, Speed, SpeedSource,
};
use mutator::{
    derived, mutator_of, scoped_state_holder, ActionSource, Mutation, MutationHolder, Scope,
    SharingStarted, State, StateHolder, StateHolderBuilder,
};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, PartialEq, Debug)]
struct Snail {
    progress: u32,
    speed: Speed,
}

fn scripted_speeds(script: Vec<(u64, Speed)>) -> SpeedSource {
    Arc::new(move || {
        stream::iter(script.clone())
            .then(|(delay_ms, speed)| async move {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                speed
            })
            .chain(stream::pending())
            .boxed()
    })
}

async fn wait_until_active<A, S>(holder: &ScopedStateHolder<A, S>)
where
    A: Clone + Send + 'static,
    S: State,
{
    while !holder.is_active() {
        tokio::task::yield_now().await;
    }
}

fn no_speed_changes() -> SpeedSource {
    Arc::new(|| stream::pending().boxed())
}

#[tokio::test(start_paused = true)]
async fn actions_accepted_before_subscribing_are_delivered() {
    common::init_tracing();
    let scope = Scope::new();
    let snail = ProgressStateHolder::with_speeds(&scope, no_speed_changes());

    snail.set_progress(50.0).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(snail.state().value().progress, 0.0);

    let mut states = snail.state().subscribe();
    let state = states.wait_for(|s| s.progress == 50.0).await.unwrap();
    assert_eq!(state.progress, 50.0);
    scope.cancel();
}

#[tokio::test]
async fn merged_producers_apply_every_mutation_exactly_once() {
    common::init_tracing();
    let scope = Scope::new();
    let holder = scoped_state_holder(
        &scope,
        Vec::<u32>::new(),
        SharingStarted::Eagerly,
        |_: ActionSource<()>| {
            let tagged = |offset: u32| {
                stream::iter(0..100u32)
                    .then(move |n| async move {
                        tokio::task::yield_now().await;
                        offset + n
                    })
                    .map(|tag| {
                        Mutation::new(move |mut tags: Vec<u32>| {
                            tags.push(tag);
                            tags
                        })
                    })
                    .boxed()
            };
            merge(vec![tagged(0), tagged(1000)])
        },
    );

    let mut states = holder.state().subscribe();
    let tags = states.wait_for(|tags| tags.len() == 200).await.unwrap();

    let mut sorted = tags.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(sorted.len(), 200);

    let first: Vec<u32> = tags.iter().copied().filter(|t| *t < 1000).collect();
    let second: Vec<u32> = tags.iter().copied().filter(|t| *t >= 1000).collect();
    assert_eq!(first, (0..100).collect::<Vec<_>>());
    assert_eq!(second, (1000..1100).collect::<Vec<_>>());
    scope.cancel();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_accepts_are_each_folded_once() {
    common::init_tracing();
    let scope = Scope::new();
    let holder = StateHolderBuilder::new()
        .initial(Vec::<u32>::new())
        .started(SharingStarted::Eagerly)
        .transform(|actions: ActionSource<Mutation<Vec<u32>>>| actions.subscribe())
        .build(&scope)
        .unwrap();
    let mut states = holder.state().subscribe();
    wait_until_active(&holder).await;

    let producers: Vec<_> = [0u32, 1000]
        .into_iter()
        .map(|offset| {
            let holder = holder.clone();
            tokio::spawn(async move {
                for tag in offset..offset + 100 {
                    holder
                        .accept_mutation(move |mut tags: Vec<u32>| {
                            tags.push(tag);
                            tags
                        })
                        .unwrap();
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();
    for producer in producers {
        producer.await.unwrap();
    }

    let tags = states.wait_for(|tags| tags.len() >= 200).await.unwrap();
    assert_eq!(tags.len(), 200);
    let mut sorted = tags.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(sorted.len(), 200);
    scope.cancel();
}

#[tokio::test]
async fn burst_of_accepts_while_connected_is_folded_in_full() {
    common::init_tracing();
    let scope = Scope::new();
    let holder = StateHolderBuilder::new()
        .initial(0u32)
        .started(SharingStarted::Eagerly)
        .transform(|actions: ActionSource<()>| {
            actions
                .subscribe()
                .map(|()| Mutation::new(|count: u32| count + 1))
        })
        .build(&scope)
        .unwrap();
    let mut states = holder.state().subscribe();
    wait_until_active(&holder).await;

    // Far more than the pending capacity, all before the fold task runs again.
    for _ in 0..200 {
        holder.accept(()).unwrap();
    }

    assert_eq!(states.wait_for(|n| *n == 200).await, Some(200));
    scope.cancel();
}

#[tokio::test]
async fn transform_that_subscribes_lazily_still_receives_actions() {
    common::init_tracing();
    let scope = Scope::new();
    let holder = mutator_of(
        &scope,
        0u32,
        SharingStarted::Eagerly,
        |actions: ActionSource<u32>| {
            stream::iter(vec![()]).flat_map_latest(move |()| {
                actions
                    .subscribe()
                    .map(|n| Mutation::new(move |_: u32| n))
                    .boxed()
            })
        },
    );
    let mut states = holder.state().subscribe();

    holder.accept(7).unwrap();

    let reached = tokio::time::timeout(Duration::from_secs(2), states.wait_for(|n| *n == 7));
    assert_eq!(reached.await, Ok(Some(7)));
    scope.cancel();
}

#[tokio::test]
async fn derived_projection_reads_and_writes_through_parent() {
    common::init_tracing();
    let scope = Scope::new();
    let parent = scoped_state_holder(
        &scope,
        Snail {
            progress: 10,
            speed: Speed::One,
        },
        SharingStarted::Eagerly,
        |actions: ActionSource<Mutation<Snail>>| actions.subscribe(),
    );
    let progress = derived(
        &parent,
        &scope,
        |s: &Snail| s.progress,
        |s: Snail, progress| Snail { progress, ..s },
    );

    assert_eq!(progress.state().value(), 10);

    progress.accept_mutation(|p: u32| p + 5).unwrap();

    let mut parent_states = parent.state().subscribe();
    let snail = parent_states.wait_for(|s| s.progress == 15).await.unwrap();
    assert_eq!(snail.speed, Speed::One);
    scope.cancel();
}

#[tokio::test]
async fn derived_suppresses_consecutive_duplicates() {
    common::init_tracing();
    let scope = Scope::new();
    let parent = scoped_state_holder(
        &scope,
        Snail {
            progress: 10,
            speed: Speed::One,
        },
        SharingStarted::Eagerly,
        |actions: ActionSource<Mutation<Snail>>| actions.subscribe(),
    );
    let progress = derived(
        &parent,
        &scope,
        |s: &Snail| s.progress,
        |s: Snail, progress| Snail { progress, ..s },
    );
    let mut projected = progress.state().subscribe();
    assert_eq!(projected.next().await, Some(10));

    parent
        .accept_mutation(|s: Snail| Snail {
            speed: Speed::Three,
            ..s
        })
        .unwrap();
    parent
        .accept_mutation(|s: Snail| Snail {
            progress: 11,
            ..s
        })
        .unwrap();

    assert_eq!(projected.next().await, Some(11));

    let mut parent_states = parent.state().subscribe();
    let snail = parent_states.wait_for(|s| s.progress == 11).await.unwrap();
    assert_eq!(snail.speed, Speed::Three);
    scope.cancel();
}

#[tokio::test(start_paused = true)]
async fn speed_change_drops_the_old_ticker() {
    common::init_tracing();
    let scope = Scope::new();
    let snail = ProgressStateHolder::with_speeds(
        &scope,
        scripted_speeds(vec![(0, Speed::One), (1600, Speed::Four)]),
    );
    let _observer = snail.state().subscribe();

    // The old ticker's 1600 ms tick and the switch land on the same instant;
    // only the new ticker's immediate tick may count.
    tokio::time::sleep(Duration::from_millis(1700)).await;
    let state = snail.state().value();
    assert_eq!(state.speed, Speed::Four);
    assert_eq!(state.progress, 2.0);

    // Four ticks every 400 ms from the switch.
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(snail.state().value().progress, 3.0);
    scope.cancel();
}

#[tokio::test(start_paused = true)]
async fn second_mode_switch_supersedes_the_first() {
    common::init_tracing();
    let scope = Scope::new();
    let snail = PaletteStateHolder::with_speeds(&scope, no_speed_changes());
    let mut states = snail.state().subscribe();

    snail.set_mode(true).unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    snail.set_mode(false).unwrap();

    let mut switched = false;
    while let Some(state) = states.next().await {
        if !switched {
            switched = !state.is_dark && state.palette_from != muted_colors(false);
            continue;
        }
        assert!(!state.is_dark, "first switch leaked after the second");
        assert_ne!(state.colors, muted_colors(true));
        if state.colors == muted_colors(false) {
            break;
        }
    }

    // Outlast the first animation's scheduled end.
    tokio::time::sleep(Duration::from_millis(6000)).await;
    let state = snail.state().value();
    assert!(!state.is_dark);
    assert_eq!(state.colors, muted_colors(false));
    scope.cancel();
}

#[tokio::test]
async fn cancelling_the_scope_ends_every_holder() {
    common::init_tracing();
    let scope = Scope::new();
    let child = scope.child();
    let snail = ProgressStateHolder::with_speeds(&child, no_speed_changes());
    let mut states = snail.state().subscribe();
    assert!(states.next().await.is_some());

    scope.cancel();

    assert_eq!(states.next().await, None);
    assert!(snail.set_progress(1.0).is_err());
}
