//! A ticking snail with a light/dark palette that animates between modes.
//!
//! Switching mode starts a palette interpolation. Only one interpolation
//! runs at a time: a newer mode switch drops the running one, and the next
//! animation starts from whatever colors are showing at that moment.

use super::color::{blend_palette, interpolation_fractions, muted_colors, Color};
use super::progress::{advance, speed_and_ticks, SpeedSource};
use super::speed::{speed_cycle, Speed, SPEED_CHANGE_PERIOD};
use crate::core::Mutation;
use crate::flow::{merge, ActionSource, FlowExt, Scope, StateFlow};
use crate::holder::{HolderConfig, HolderError, ScopedStateHolder, SharingStarted, StateHolder};
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct PaletteState {
    pub progress: f32,
    pub speed: Speed,
    pub is_dark: bool,
    pub color_index: usize,
    pub colors: Vec<Color>,
    /// Palette at the moment the current mode switch began.
    pub palette_from: Vec<Color>,
}

impl PaletteState {
    /// The snail's color, or the first palette color if the index is stale.
    pub fn color(&self) -> Color {
        self.colors
            .get(self.color_index)
            .or_else(|| self.colors.first())
            .copied()
            .unwrap_or(Color::BLUE)
    }
}

impl Default for PaletteState {
    fn default() -> Self {
        let colors = muted_colors(false).to_vec();
        Self {
            progress: 0.0,
            speed: Speed::One,
            is_dark: false,
            color_index: 0,
            palette_from: colors.clone(),
            colors,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaletteAction {
    SetProgress(f32),
    SetColor(usize),
    SetMode { is_dark: bool },
}

fn user_mutation(action: PaletteAction) -> Option<Mutation<PaletteState>> {
    match action {
        PaletteAction::SetProgress(progress) => Some(Mutation::new(move |state: PaletteState| {
            PaletteState { progress, ..state }
        })),
        PaletteAction::SetColor(color_index) => Some(Mutation::new(move |state: PaletteState| {
            PaletteState {
                color_index,
                ..state
            }
        })),
        PaletteAction::SetMode { .. } => None,
    }
}

/// Flip the mode, then animate from the palette showing at that moment.
fn mode_switch(is_dark: bool) -> BoxStream<'static, Mutation<PaletteState>> {
    let target = muted_colors(is_dark);
    tracing::debug!(is_dark, "switching palette mode");

    let start = Mutation::new(move |state: PaletteState| PaletteState {
        is_dark,
        palette_from: state.colors.clone(),
        ..state
    });
    let steps = interpolation_fractions().map(move |fraction| {
        Mutation::new(move |state: PaletteState| PaletteState {
            colors: blend_palette(&state.palette_from, target, fraction),
            ..state
        })
    });

    stream::once(futures::future::ready(start))
        .chain(steps)
        .boxed()
}

/// Holder for the palette snail.
#[derive(Clone)]
pub struct PaletteStateHolder {
    holder: ScopedStateHolder<PaletteAction, PaletteState>,
}

impl PaletteStateHolder {
    pub fn new(scope: &Scope) -> Self {
        Self::with_speeds(scope, Arc::new(|| speed_cycle(SPEED_CHANGE_PERIOD)))
    }

    pub fn with_speeds(scope: &Scope, speeds: SpeedSource) -> Self {
        let config = HolderConfig::default().with_started(SharingStarted::while_subscribed());
        let holder = ScopedStateHolder::launch(
            scope,
            PaletteState::default(),
            config,
            move |actions: ActionSource<PaletteAction>| {
                let ticker = speed_and_ticks(
                    speeds(),
                    |speed| {
                        Mutation::new(move |state: PaletteState| PaletteState { speed, ..state })
                    },
                    || {
                        Mutation::new(|state: PaletteState| PaletteState {
                            progress: advance(state.progress),
                            ..state
                        })
                    },
                );
                let user = actions
                    .subscribe()
                    .filter_map(|action| futures::future::ready(user_mutation(action)))
                    .boxed();
                let modes = actions
                    .subscribe()
                    .filter_map(|action| {
                        futures::future::ready(match action {
                            PaletteAction::SetMode { is_dark } => Some(is_dark),
                            _ => None,
                        })
                    })
                    .boxed()
                    .flat_map_latest(mode_switch)
                    .boxed();
                merge(vec![ticker, user, modes])
            },
        );
        Self { holder }
    }

    pub fn set_progress(&self, progress: f32) -> Result<(), HolderError> {
        self.accept(PaletteAction::SetProgress(progress))
    }

    pub fn set_snail_color(&self, index: usize) -> Result<(), HolderError> {
        self.accept(PaletteAction::SetColor(index))
    }

    /// Switch mode, cancelling any palette animation still running.
    pub fn set_mode(&self, is_dark: bool) -> Result<(), HolderError> {
        self.accept(PaletteAction::SetMode { is_dark })
    }
}

impl StateHolder<PaletteAction, PaletteState> for PaletteStateHolder {
    fn state(&self) -> &StateFlow<PaletteState> {
        self.holder.state()
    }

    fn accept(&self, action: PaletteAction) -> Result<(), HolderError> {
        self.holder.accept(action)
    }
}
