//! ARGB colors, muted palettes and timed palette interpolation.

use futures::stream::{self, BoxStream, StreamExt};
use std::fmt;
use std::time::Duration;

/// Number of interpolation steps after the start; fractions run 0/100..=100/100.
pub const INTERPOLATION_STEPS: u32 = 100;

/// Delay before each interpolation step.
pub const INTERPOLATION_STEP_DELAY: Duration = Duration::from_millis(50);

/// A packed `0xAARRGGBB` color.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(pub u32);

impl Color {
    pub const BLUE: Color = Color(0xFF00_00FF);

    pub const fn from_argb(alpha: u8, red: u8, green: u8, blue: u8) -> Self {
        Self((alpha as u32) << 24 | (red as u32) << 16 | (green as u32) << 8 | blue as u32)
    }

    pub fn argb(&self) -> u32 {
        self.0
    }

    fn channels(&self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    /// Blend channel-wise from `self` toward `end`.
    ///
    /// `fraction` is clamped to `0.0..=1.0`; the endpoints return `self`
    /// and `end` exactly.
    pub fn interpolate(&self, end: Color, fraction: f32) -> Color {
        let fraction = fraction.clamp(0.0, 1.0);
        let start = self.channels();
        let target = end.channels();

        let mut blended = [0u8; 4];
        for (index, channel) in blended.iter_mut().enumerate() {
            let from = f32::from(start[index]);
            let to = f32::from(target[index]);
            *channel = (from + (to - from) * fraction).round() as u8;
        }
        Color(u32::from_be_bytes(blended))
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Color(#{:08X})", self.0)
    }
}

const MUTED_LIGHT: [Color; 5] = [
    Color(0xFFB5_C4D9),
    Color(0xFFC9_B8D6),
    Color(0xFFE3_C1B4),
    Color(0xFFB9_D6C2),
    Color(0xFFE6_D7A9),
];

const MUTED_DARK: [Color; 5] = [
    Color(0xFF3B_4A61),
    Color(0xFF4E_3D5C),
    Color(0xFF66_4636),
    Color(0xFF35_5941),
    Color(0xFF6B_5C2E),
];

/// The muted palette for light or dark mode.
pub fn muted_colors(is_dark: bool) -> &'static [Color] {
    if is_dark {
        &MUTED_DARK
    } else {
        &MUTED_LIGHT
    }
}

/// Blend two palettes pairwise. Extra colors in the longer one are dropped.
pub fn blend_palette(start: &[Color], end: &[Color], fraction: f32) -> Vec<Color> {
    start
        .iter()
        .zip(end)
        .map(|(from, to)| from.interpolate(*to, fraction))
        .collect()
}

/// Interpolation fractions `0.0, 0.01, ..., 1.0`, each after
/// [`INTERPOLATION_STEP_DELAY`].
pub fn interpolation_fractions() -> BoxStream<'static, f32> {
    stream::iter(0..=INTERPOLATION_STEPS)
        .then(|step| async move {
            tokio::time::sleep(INTERPOLATION_STEP_DELAY).await;
            step as f32 / INTERPOLATION_STEPS as f32
        })
        .boxed()
}
