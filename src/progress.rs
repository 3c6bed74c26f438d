//! Stepped progress bars.
//!
//! A progress value is spread over a fixed number of steps, each holding a
//! level in `0..=max_step_value`. The spread is as even as possible and the
//! leading steps take the remainder:
//!
//! ```text
//! progress 8, 6 steps  ->  [2, 2, 1, 1, 1, 1]
//! progress 5, 6 steps  ->  [1, 1, 1, 1, 1, 0]
//! ```
//!
//! # Failure Modes
//!
//! | Condition | Error |
//! |---|---|
//! | negative progress | [`UiError::InvalidProgress`] |
//! | zero steps | [`UiError::InvalidSteps`] |
//! | progress above `steps * max_step_value` | [`UiError::ProgressExceedsMaximum`] |

use serde::{Deserialize, Serialize};

use crate::error::{Result, UiError};

/// Split `progress` into per-step levels.
///
/// Without `max_step_value` the levels are unbounded.
pub fn transform_progress_to_display_state(
    progress: i64,
    steps: usize,
    max_step_value: Option<u32>,
) -> Result<Vec<u32>> {
    if progress < 0 {
        return Err(UiError::InvalidProgress { progress });
    }
    if steps == 0 {
        return Err(UiError::InvalidSteps);
    }
    if let Some(max_step_value) = max_step_value {
        let maximum = steps as i64 * i64::from(max_step_value);
        if progress > maximum {
            return Err(UiError::ProgressExceedsMaximum {
                progress,
                maximum,
                steps,
                max_step_value,
            });
        }
    }

    let steps_i = steps as i64;
    let lower = progress / steps_i;
    let remainder = (progress % steps_i) as usize;
    let levels = (0..steps)
        .map(|i| {
            let level = if i < remainder { lower + 1 } else { lower };
            u32::try_from(level).unwrap_or(u32::MAX)
        })
        .collect();
    Ok(levels)
}

/// Shape of a stepped bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SteppedProgressBar {
    pub steps: usize,
    pub max_step_value: u32,
}

impl SteppedProgressBar {
    pub fn new(steps: usize, max_step_value: u32) -> Self {
        Self {
            steps,
            max_step_value,
        }
    }

    pub fn maximum(&self) -> i64 {
        self.steps as i64 * i64::from(self.max_step_value)
    }

    pub fn display_state(&self, progress: i64) -> Result<Vec<u32>> {
        transform_progress_to_display_state(progress, self.steps, Some(self.max_step_value))
    }
}

// =============================================================================
// Tests
// =============================================================================
