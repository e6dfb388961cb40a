use smart_leds::RGB8;

use crate::config::IndicatorConfig;

/// What the status pixel is telling the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorState {
    /// Blue, until the environment sensor is up.
    Initializing,
    /// Dim green, waiting for a command.
    Idle,
    /// Bright green flash while a command is handled.
    Sampling,
}

impl IndicatorState {
    pub fn color(self, levels: &IndicatorConfig) -> RGB8 {
        match self {
            IndicatorState::Initializing => RGB8::new(0, 0, levels.bright),
            IndicatorState::Idle => RGB8::new(0, levels.dim, 0),
            IndicatorState::Sampling => RGB8::new(0, levels.bright, 0),
        }
    }
}
