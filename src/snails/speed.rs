//! Snail speeds and the sources that change them.

use crate::flow::interval;
use futures::stream::{BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Base tick period, in milliseconds, at [`Speed::One`].
pub const SPEED: u64 = 1600;

/// How often [`speed_cycle`] moves to the next speed by default.
pub const SPEED_CHANGE_PERIOD: Duration = Duration::from_millis(4000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Speed {
    #[default]
    One,
    Two,
    Three,
    Four,
}

impl Speed {
    pub const ALL: [Speed; 4] = [Speed::One, Speed::Two, Speed::Three, Speed::Four];

    pub fn multiplier(&self) -> u64 {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
            Self::Four => 4,
        }
    }

    pub fn text(&self) -> &'static str {
        match self {
            Self::One => "1x",
            Self::Two => "2x",
            Self::Three => "3x",
            Self::Four => "4x",
        }
    }

    /// Ticker period at this speed: faster speeds tick more often.
    pub fn period(&self) -> Duration {
        Duration::from_millis(SPEED / self.multiplier())
    }
}

impl fmt::Display for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// Cycle through every speed, one step per `period`, starting at
/// [`Speed::One`] immediately.
pub fn speed_cycle(period: Duration) -> BoxStream<'static, Speed> {
    interval(period)
        .map(|tick| Speed::ALL[((tick - 1) % Speed::ALL.len() as u64) as usize])
        .boxed()
}
