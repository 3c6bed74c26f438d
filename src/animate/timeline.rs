//! Timeline construction: static keyframes plus computed keyframes.
//!
//! # Invariants
//!
//! 1. Explicit static offsets lie in `[0, 1]` and are non-decreasing in
//!    declaration order. Keyframes without an offset do not take part in the
//!    ordering check.
//! 2. Computed offsets lie in `[0, 1]`. They may be registered in any order;
//!    the timeline keeps them sorted ascending, and callbacks sharing an
//!    offset keep their registration order.
//!
//! # Failure Modes
//!
//! | Condition | Error |
//! |---|---|
//! | static offset outside `[0, 1]` | [`UiError::KeyframeOffsetOutOfRange`] |
//! | static offset below the previous explicit one | [`UiError::KeyframeOffsetOrder`] |
//! | computed offset outside `[0, 1]` | [`UiError::ComputedOffsetOutOfRange`] |

use std::fmt;

use crate::dom::{Document, Keyframe, NodeId};
use crate::error::{Result, UiError};

/// Callback run once, per target, when progress reaches its offset.
pub type ComputeKeyframeFn = Box<dyn FnMut(&mut Document, NodeId) -> Result<()>>;

/// Callbacks registered at one offset.
pub(crate) struct ComputedKeyframes {
    pub(crate) offset: f64,
    pub(crate) callbacks: Vec<ComputeKeyframeFn>,
}

/// A built timeline, ready to be attached.
#[derive(Default)]
pub struct Timeline {
    pub(crate) keyframes: Vec<Keyframe>,
    pub(crate) computed: Vec<ComputedKeyframes>,
}

impl Timeline {
    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    /// Computed offsets that have not fired yet, ascending.
    pub fn computed_offsets(&self) -> Vec<f64> {
        self.computed.iter().map(|group| group.offset).collect()
    }

    pub fn has_pending_computed_keyframes(&self) -> bool {
        !self.computed.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty() && self.computed.is_empty()
    }
}

impl fmt::Debug for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timeline")
            .field("keyframes", &self.keyframes)
            .field("computed_offsets", &self.computed_offsets())
            .finish()
    }
}

/// Builder handed to animation definitions.
#[derive(Debug, Default)]
pub struct TimelineBuilder {
    timeline: Timeline,
    last_offset: Option<f64>,
}

impl TimelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a static keyframe, validating its offset if it has one.
    pub fn add_keyframe(&mut self, keyframe: Keyframe) -> Result<&mut Self> {
        if let Some(offset) = keyframe.offset {
            if !(0.0..=1.0).contains(&offset) {
                return Err(UiError::KeyframeOffsetOutOfRange { offset });
            }
            if let Some(previous) = self.last_offset.filter(|&previous| offset < previous) {
                return Err(UiError::KeyframeOffsetOrder { offset, previous });
            }
            self.last_offset = Some(offset);
        }
        self.timeline.keyframes.push(keyframe);
        Ok(self)
    }

    /// Append a static keyframe at `offset`.
    pub fn add_keyframe_at(&mut self, offset: f64, keyframe: Keyframe) -> Result<&mut Self> {
        self.add_keyframe(keyframe.offset(offset))
    }

    /// Register `callback` to run once progress reaches `offset`.
    pub fn add_computed_keyframe(
        &mut self,
        offset: f64,
        callback: impl FnMut(&mut Document, NodeId) -> Result<()> + 'static,
    ) -> Result<&mut Self> {
        if !(0.0..=1.0).contains(&offset) {
            return Err(UiError::ComputedOffsetOutOfRange { offset });
        }
        let computed = &mut self.timeline.computed;
        let callback: ComputeKeyframeFn = Box::new(callback);
        match computed.iter().position(|group| group.offset >= offset) {
            Some(index) if computed[index].offset == offset => {
                computed[index].callbacks.push(callback);
            }
            Some(index) => computed.insert(
                index,
                ComputedKeyframes {
                    offset,
                    callbacks: vec![callback],
                },
            ),
            None => computed.push(ComputedKeyframes {
                offset,
                callbacks: vec![callback],
            }),
        }
        Ok(self)
    }

    pub fn build(self) -> Timeline {
        self.timeline
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_keyframes_without_offsets_skip_ordering() {
        let mut builder = TimelineBuilder::new();
        builder.add_keyframe(Keyframe::new().easing("linear")).unwrap();
        builder.add_keyframe_at(0.5, Keyframe::new()).unwrap();
        builder.add_keyframe(Keyframe::new()).unwrap();
        builder.add_keyframe_at(0.5, Keyframe::new()).unwrap();
        builder.add_keyframe_at(1.0, Keyframe::new()).unwrap();
        assert_eq!(builder.build().keyframes().len(), 5);
    }

    #[test]
    fn test_descending_offset_rejected() {
        let mut builder = TimelineBuilder::new();
        builder.add_keyframe_at(0.5, Keyframe::new()).unwrap();
        let err = builder.add_keyframe_at(0.2, Keyframe::new()).unwrap_err();
        assert!(matches!(
            err,
            UiError::KeyframeOffsetOrder {
                offset,
                previous
            } if offset == 0.2 && previous == 0.5
        ));
    }

    #[test]
    fn test_zero_offset_still_orders() {
        let mut builder = TimelineBuilder::new();
        builder.add_keyframe_at(0.0, Keyframe::new()).unwrap();
        assert!(builder.add_keyframe_at(0.0, Keyframe::new()).is_ok());
    }

    #[test]
    fn test_offset_range() {
        let mut builder = TimelineBuilder::new();
        assert!(matches!(
            builder.add_keyframe_at(-0.1, Keyframe::new()),
            Err(UiError::KeyframeOffsetOutOfRange { .. })
        ));
        assert!(matches!(
            builder.add_computed_keyframe(1.5, |_, _| Ok(())),
            Err(UiError::ComputedOffsetOutOfRange { .. })
        ));
    }

    #[test]
    fn test_computed_offsets_sorted_and_grouped() {
        let mut builder = TimelineBuilder::new();
        builder.add_computed_keyframe(0.75, |_, _| Ok(())).unwrap();
        builder.add_computed_keyframe(0.25, |_, _| Ok(())).unwrap();
        builder.add_computed_keyframe(0.75, |_, _| Ok(())).unwrap();
        builder.add_computed_keyframe(1.0, |_, _| Ok(())).unwrap();
        let timeline = builder.build();
        assert_eq!(timeline.computed_offsets(), vec![0.25, 0.75, 1.0]);
        assert_eq!(timeline.computed[1].callbacks.len(), 2);
        assert!(timeline.has_pending_computed_keyframes());
    }

    proptest! {
        #[test]
        fn prop_explicit_offsets_accepted_iff_non_decreasing(
            offsets in proptest::collection::vec(0.0f64..=1.0, 1..12)
        ) {
            let mut builder = TimelineBuilder::new();
            let result: Result<()> = offsets
                .iter()
                .try_for_each(|&o| builder.add_keyframe_at(o, Keyframe::new()).map(|_| ()));
            let sorted = offsets.windows(2).all(|w| w[0] <= w[1]);
            prop_assert_eq!(result.is_ok(), sorted);
        }
    }
}
