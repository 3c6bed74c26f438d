//! The stage: everything a render callback may touch.
//!
//! One explicit context object instead of process-wide singletons. Render
//! callbacks receive `&mut Stage`, patch [`Stage::document`] and queue
//! animatables on [`Stage::animations`].
//!
//! # Frame order
//!
//! [`Stage::draw_frame`] runs, in order:
//!
//! 1. render diff (`RenderRegistry::render_all`), which may queue animatables
//! 2. `flush_pending`: attach queued animatables to their targets
//! 3. `evaluate_computed`: fire due computed keyframes, retire finished animatables
//! 4. `advance_animations`: advance native animations by the frame delta
//!
//! Finish handlers run inside step 4, so an animatable that finishes there
//! is retired on the next frame's step 3.

use tracing::trace;

use crate::animate::AnimationScheduler;
use crate::config::StageConfig;
use crate::dom::Document;
use crate::render::{RenderRegistry, RenderReport};
use crate::textures::TextureRegistry;

#[derive(Debug, Default)]
pub struct Stage {
    pub document: Document,
    pub textures: TextureRegistry,
    pub animations: AnimationScheduler,
    pub config: StageConfig,
}

/// Bookkeeping of one [`Stage::draw_frame`].
#[derive(Debug, Default)]
pub struct FrameReport {
    pub render: RenderReport,
    pub attached: usize,
    pub computed_fired: usize,
    pub natives_finished: usize,
}

impl Stage {
    pub fn new(config: StageConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Run one draw frame. `delta_ms` is the time since the previous one.
    pub fn draw_frame(&mut self, registry: &mut RenderRegistry, delta_ms: f64) -> FrameReport {
        let render = registry.render_all(self);
        let attached = self.animations.flush_pending(&mut self.document);
        let computed_fired = self.animations.evaluate_computed(&mut self.document);
        let natives_finished = self.document.advance_animations(delta_ms);
        trace!(
            rendered = render.rendered,
            attached,
            computed_fired,
            natives_finished,
            "frame drawn"
        );
        FrameReport {
            render,
            attached,
            computed_fired,
            natives_finished,
        }
    }

    /// Whether no animation work is queued or running.
    pub fn is_settled(&self) -> bool {
        self.animations.is_idle() && self.document.running_animation_count() == 0
    }
}
