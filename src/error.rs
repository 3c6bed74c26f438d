//! Error taxonomy for the rendering runtime.
//!
//! Three families of failure exist:
//!
//! - **Validation** - malformed input detected at construction time
//!   (keyframe offsets, selectors, descriptions, progress arguments).
//! - **Invariant** - observed state the display model cannot represent
//!   (e.g. more health than the hearts bar can show).
//! - **Loud lookups** - missing targets whose absence would render visibly
//!   wrong output (e.g. a menu slot index out of range).
//!
//! Lookup misses that degrade gracefully (empty contexts, unknown textures)
//! are not errors: they are logged where they happen and the operation is
//! skipped.

use thiserror::Error;

use crate::dom::NodeId;

pub type Result<T> = std::result::Result<T, UiError>;

#[derive(Debug, Error)]
pub enum UiError {
    // =========================================================================
    // Validation
    // =========================================================================
    #[error("keyframe offset must be between 0 and 1, got {offset}")]
    KeyframeOffsetOutOfRange { offset: f64 },

    #[error("keyframe offsets must be provided in ascending order, got {offset} after {previous}")]
    KeyframeOffsetOrder { offset: f64, previous: f64 },

    #[error("computed keyframe offset must be between 0 and 1, got {offset}")]
    ComputedOffsetOutOfRange { offset: f64 },

    #[error("state must be provided for stateful animations")]
    MissingAnimationState,

    #[error("invalid selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("update-only description (no tag name) cannot be materialized as a new node")]
    UpdateOnlyDescription,

    #[error("update descriptor cannot change the tag name of an element (got `{tag}`)")]
    TagInUpdate { tag: String },

    #[error("progress must be a non-negative integer, got {progress}")]
    InvalidProgress { progress: i64 },

    #[error("steps amount must be a positive integer")]
    InvalidSteps,

    // =========================================================================
    // Invariant violations
    // =========================================================================
    #[error(
        "progress ({progress}) exceeds maximum allowed ({maximum}) for {steps} steps of max value {max_step_value}"
    )]
    ProgressExceedsMaximum {
        progress: i64,
        maximum: i64,
        steps: usize,
        max_step_value: u32,
    },

    #[error("cannot render {what}: value ({value}) exceeds maximum allowed ({maximum})")]
    DisplayOverflow {
        what: &'static str,
        value: i64,
        maximum: i64,
    },

    // =========================================================================
    // Loud lookups
    // =========================================================================
    #[error("no menu slot found for index {index}, available slots: {available}")]
    MissingMenuSlot { index: usize, available: usize },

    #[error("node {node:?} no longer exists in the document")]
    StaleNode { node: NodeId },

    #[error("node {node:?} is not an element")]
    NotAnElement { node: NodeId },

    #[error("cannot insert {child:?} into {parent:?}: it would create a cycle")]
    HierarchyRequest { parent: NodeId, child: NodeId },

    // =========================================================================
    // Ambient
    // =========================================================================
    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

impl UiError {
    /// True for construction-time validation failures.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::KeyframeOffsetOutOfRange { .. }
                | Self::KeyframeOffsetOrder { .. }
                | Self::ComputedOffsetOutOfRange { .. }
                | Self::MissingAnimationState
                | Self::InvalidSelector { .. }
                | Self::UpdateOnlyDescription
                | Self::TagInUpdate { .. }
                | Self::InvalidProgress { .. }
                | Self::InvalidSteps
        )
    }

    /// True when observed state breaches a display model's declared maximum.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::ProgressExceedsMaximum { .. } | Self::DisplayOverflow { .. }
        )
    }
}
