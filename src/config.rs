//! Runtime configuration.
//!
//! Every field has a default, so a JSON document only needs the values it
//! overrides:
//!
//! ```ignore
//! let config = StageConfig::from_json(r#"{ "game_loop": { "max_fps": 30 } }"#)?;
//! assert_eq!(config.hearts.steps, 6);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::progress::SteppedProgressBar;

/// Fixed-timestep loop settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    pub max_fps: f64,
    /// Update sub-steps allowed per frame before the backlog is dropped.
    pub max_update_steps: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_fps: 60.0,
            max_update_steps: 240,
        }
    }
}

impl LoopConfig {
    /// Length of one update sub-step in milliseconds.
    pub fn step_ms(&self) -> f64 {
        1000.0 / self.max_fps
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartsConfig {
    pub selector: String,
    pub steps: usize,
    pub max_step_value: u32,
    pub update_duration_ms: f64,
}

impl Default for HeartsConfig {
    fn default() -> Self {
        Self {
            selector: ".ff-gamePrint-hearts".to_string(),
            steps: 6,
            max_step_value: 2,
            update_duration_ms: 300.0,
        }
    }
}

impl HeartsConfig {
    pub fn bar(&self) -> SteppedProgressBar {
        SteppedProgressBar::new(self.steps, self.max_step_value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarsConfig {
    pub selector: String,
    pub steps: usize,
    pub max_step_value: u32,
}

impl Default for StarsConfig {
    fn default() -> Self {
        Self {
            selector: ".ff-gamePrint-stars".to_string(),
            steps: 6,
            max_step_value: 5,
        }
    }
}

impl StarsConfig {
    pub fn bar(&self) -> SteppedProgressBar {
        SteppedProgressBar::new(self.steps, self.max_step_value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoneyConfig {
    pub selector: String,
    pub count_duration_ms: f64,
    /// Upper bound on interpolation keyframes per count animation.
    pub max_keyframes: u32,
    pub negative_color: String,
    pub positive_color: String,
}

impl Default for MoneyConfig {
    fn default() -> Self {
        Self {
            selector: ".ff-gamePrint-money".to_string(),
            count_duration_ms: 600.0,
            max_keyframes: 100,
            negative_color: "#D83930".to_string(),
            positive_color: "#fff".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuConfig {
    pub slot_selector: String,
    pub hand_selector: String,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            slot_selector: ".ff-gameMenu-slot".to_string(),
            hand_selector: ".ff-gameMenu-hand".to_string(),
        }
    }
}

/// Complete stage configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    pub game_loop: LoopConfig,
    pub hearts: HeartsConfig,
    pub stars: StarsConfig,
    pub money: MoneyConfig,
    pub menu: MenuConfig,
}

impl StageConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
