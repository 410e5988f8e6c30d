//! A snail that crawls on a speed-driven ticker.

use super::color::{muted_colors, Color};
use super::speed::{speed_cycle, Speed, SPEED_CHANGE_PERIOD};
use crate::core::Mutation;
use crate::flow::{interval, merge, ActionSource, FlowExt, Scope, StateFlow};
use crate::holder::{HolderConfig, HolderError, ScopedStateHolder, SharingStarted, StateHolder};
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;

/// Factory for the speed source, called each time the pipeline starts.
pub type SpeedSource = Arc<dyn Fn() -> BoxStream<'static, Speed> + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressState {
    /// Position along the track, `0.0..100.0`.
    pub progress: f32,
    pub speed: Speed,
    pub color: Color,
    pub colors: Vec<Color>,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self {
            progress: 0.0,
            speed: Speed::One,
            color: Color::BLUE,
            colors: muted_colors(false).to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressAction {
    SetProgress(f32),
    /// Pick a color from the palette by index. Out-of-range indices are ignored.
    SetColor(usize),
}

impl ProgressAction {
    fn into_mutation(self) -> Mutation<ProgressState> {
        match self {
            Self::SetProgress(progress) => {
                Mutation::new(move |state: ProgressState| ProgressState { progress, ..state })
            }
            Self::SetColor(index) => Mutation::new(move |state: ProgressState| {
                let color = state.colors.get(index).copied().unwrap_or(state.color);
                ProgressState { color, ..state }
            }),
        }
    }
}

/// Advance one step, wrapping at 100.
pub(crate) fn advance(progress: f32) -> f32 {
    (progress + 1.0) % 100.0
}

/// Speed changes and ticks as one stream.
///
/// Every new speed is recorded first, then a fresh ticker starts at the
/// speed's period and the previous ticker is dropped.
pub(crate) fn speed_and_ticks<S, F, G>(
    speeds: BoxStream<'static, Speed>,
    set_speed: F,
    tick: G,
) -> BoxStream<'static, Mutation<S>>
where
    S: crate::core::State,
    F: Fn(Speed) -> Mutation<S> + Send + Unpin + 'static,
    G: Fn() -> Mutation<S> + Clone + Send + Sync + Unpin + 'static,
{
    speeds
        .flat_map_latest(move |speed| {
            let tick = tick.clone();
            stream::once(futures::future::ready(set_speed(speed)))
                .chain(interval(speed.period()).map(move |_| tick()))
                .boxed()
        })
        .boxed()
}

/// Holder for a ticking snail whose color and position the user can set.
#[derive(Clone)]
pub struct ProgressStateHolder {
    holder: ScopedStateHolder<ProgressAction, ProgressState>,
}

impl ProgressStateHolder {
    /// Launch in `scope`, cycling speeds every [`SPEED_CHANGE_PERIOD`].
    pub fn new(scope: &Scope) -> Self {
        Self::with_speeds(scope, Arc::new(|| speed_cycle(SPEED_CHANGE_PERIOD)))
    }

    /// Launch in `scope` with a custom speed source.
    pub fn with_speeds(scope: &Scope, speeds: SpeedSource) -> Self {
        let config = HolderConfig::default().with_started(SharingStarted::while_subscribed());
        let holder = ScopedStateHolder::launch(
            scope,
            ProgressState::default(),
            config,
            move |actions: ActionSource<ProgressAction>| {
                let ticker = speed_and_ticks(
                    speeds(),
                    |speed| {
                        Mutation::new(move |state: ProgressState| ProgressState { speed, ..state })
                    },
                    || {
                        Mutation::new(|state: ProgressState| ProgressState {
                            progress: advance(state.progress),
                            ..state
                        })
                    },
                );
                let user = actions
                    .subscribe()
                    .map(ProgressAction::into_mutation)
                    .boxed();
                merge(vec![ticker, user])
            },
        );
        Self { holder }
    }

    pub fn set_progress(&self, progress: f32) -> Result<(), HolderError> {
        self.accept(ProgressAction::SetProgress(progress))
    }

    pub fn set_snail_color(&self, index: usize) -> Result<(), HolderError> {
        self.accept(ProgressAction::SetColor(index))
    }
}

impl StateHolder<ProgressAction, ProgressState> for ProgressStateHolder {
    fn state(&self) -> &StateFlow<ProgressState> {
        self.holder.state()
    }

    fn accept(&self, action: ProgressAction) -> Result<(), HolderError> {
        self.holder.accept(action)
    }
}
