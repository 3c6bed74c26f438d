//! Keyframe animation scheduling on top of native document animations.
//!
//! Native animations only animate styles. Effects they cannot express (text
//! content, attributes) are registered as *computed keyframes*: callbacks that
//! fire once the native animation's progress reaches their offset.
//!
//! # Pattern
//!
//! ```ignore
//! use bistro_ui::animate::{Animation, AnimationScheduler};
//! use bistro_ui::dom::Keyframe;
//!
//! // Stateless: validated once, here
//! let pulse = Animation::stateless(|t| {
//!     t.add_keyframe(Keyframe::new().set("opacity", "0.5"))?;
//!     t.add_keyframe(Keyframe::new().set("opacity", "1"))?;
//!     Ok(())
//! })?;
//!
//! let controller = scheduler.create_animatable(".ff-gamePrint-money", 300.0, &pulse, None)?;
//! controller.use_commit_styles(true);
//!
//! // Each draw frame
//! scheduler.flush_pending(&mut doc);
//! scheduler.evaluate_computed(&mut doc);
//! doc.advance_animations(delta_ms);
//! ```

pub mod scheduler;
pub mod timeline;

use std::rc::Rc;

use crate::error::{Result, UiError};

pub use scheduler::{AnimatableController, AnimatableId, AnimatableState, AnimationScheduler};
pub use timeline::{ComputeKeyframeFn, Timeline, TimelineBuilder};

type StatelessBuildFn = dyn Fn(&mut TimelineBuilder) -> Result<()>;
type StatefulBuildFn<S> = dyn Fn(&S, &mut TimelineBuilder) -> Result<()>;

/// A reusable animation definition.
///
/// Timelines own their computed-keyframe closures, so every animatable gets a
/// freshly built timeline.
pub enum Animation<S = ()> {
    /// Built without state. The definition is validated when created.
    Stateless(Rc<StatelessBuildFn>),
    /// Built from a snapshot of the state passed at animatable creation.
    Stateful(Rc<StatefulBuildFn<S>>),
}

impl<S> Clone for Animation<S> {
    fn clone(&self) -> Self {
        match self {
            Animation::Stateless(build) => Animation::Stateless(Rc::clone(build)),
            Animation::Stateful(build) => Animation::Stateful(Rc::clone(build)),
        }
    }
}

impl Animation<()> {
    /// Define a stateless animation, failing now if its timeline is invalid.
    pub fn stateless(build: impl Fn(&mut TimelineBuilder) -> Result<()> + 'static) -> Result<Self> {
        let mut probe = TimelineBuilder::new();
        build(&mut probe)?;
        Ok(Animation::Stateless(Rc::new(build)))
    }
}

impl<S: Clone + 'static> Animation<S> {
    pub fn stateful(build: impl Fn(&S, &mut TimelineBuilder) -> Result<()> + 'static) -> Self {
        Animation::Stateful(Rc::new(build))
    }

    pub fn is_stateful(&self) -> bool {
        matches!(self, Animation::Stateful(_))
    }

    /// Build a timeline. Stateful definitions require `state` and receive an
    /// owned snapshot of it.
    pub fn resolve(&self, state: Option<&S>) -> Result<Timeline> {
        let mut builder = TimelineBuilder::new();
        match self {
            Animation::Stateless(build) => build(&mut builder)?,
            Animation::Stateful(build) => {
                let snapshot = state.cloned().ok_or(UiError::MissingAnimationState)?;
                build(&snapshot, &mut builder)?;
            }
        }
        Ok(builder.build())
    }
}

// =============================================================================
// Tests
// =============================================================================
