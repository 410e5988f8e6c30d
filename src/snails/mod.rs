//! Demo screen holders built on the library.
//!
//! Each snail composes a speed-driven ticker, user intents and, for the
//! palette snail, an exclusive palette animation into one mutation stream.

mod color;
mod palette;
mod progress;
mod speed;

pub use color::{
    blend_palette, interpolation_fractions, muted_colors, Color, INTERPOLATION_STEPS,
    INTERPOLATION_STEP_DELAY,
};
pub use palette::{PaletteAction, PaletteState, PaletteStateHolder};
pub use progress::{ProgressAction, ProgressState, ProgressStateHolder, SpeedSource};
pub use speed::{speed_cycle, Speed, SPEED, SPEED_CHANGE_PERIOD};
