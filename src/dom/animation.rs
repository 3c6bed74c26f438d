//! Native timed animations on document nodes.
//!
//! The document plays each animation on a monotonically advancing clock
//! ([`Document::advance_animations`]). Effects are sampled discretely: at
//! progress `p` a property takes the value of the last keyframe whose computed
//! offset is `<= p` and which declares that property. Before the first such
//! keyframe the underlying inline style shows through.
//!
//! # Lifecycle
//!
//! ```text
//! animate() -> Running --(time >= duration)--> Finished --release--> (gone)
//!                 \                               /
//!                  `------- cancel() -> Cancelled
//! ```
//!
//! A finished animation keeps applying its final keyframe only with
//! [`FillMode::Forwards`]. Cancelled animations never apply. Finish handlers
//! run after every animation has been advanced for the tick, in the order the
//! animations finished.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::dom::{Document, NodeId, normalize_property};
use crate::error::{Result, UiError};

// =============================================================================
// Types
// =============================================================================

/// Handle of a native animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimationId(u64);

/// One keyframe: an optional offset, an optional easing, and style values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Keyframe {
    pub offset: Option<f64>,
    pub easing: Option<String>,
    pub properties: BTreeMap<String, String>,
}

impl Keyframe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(offset: f64) -> Self {
        Self {
            offset: Some(offset),
            ..Self::default()
        }
    }

    pub fn offset(mut self, offset: f64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn easing(mut self, easing: impl Into<String>) -> Self {
        self.easing = Some(easing.into());
        self
    }

    /// Add a style property (camelCase names are normalised).
    pub fn set(mut self, property: &str, value: impl Into<String>) -> Self {
        self.properties
            .insert(normalize_property(property), value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillMode {
    #[default]
    None,
    Forwards,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AnimationOptions {
    pub duration_ms: f64,
    pub fill: FillMode,
}

impl AnimationOptions {
    pub fn new(duration_ms: f64) -> Self {
        Self {
            duration_ms,
            fill: FillMode::None,
        }
    }

    pub fn fill(mut self, fill: FillMode) -> Self {
        self.fill = fill;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Running,
    Finished,
    Cancelled,
}

/// A native animation bound to one target node.
#[derive(Debug, Clone)]
pub struct NativeAnimation {
    id: AnimationId,
    target: NodeId,
    keyframes: Vec<Keyframe>,
    offsets: Vec<f64>,
    options: AnimationOptions,
    current_time: f64,
    state: PlayState,
}

impl NativeAnimation {
    pub fn id(&self) -> AnimationId {
        self.id
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    /// Offsets after filling in the missing ones.
    pub fn computed_offsets(&self) -> &[f64] {
        &self.offsets
    }

    pub fn options(&self) -> AnimationOptions {
        self.options
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn play_state(&self) -> PlayState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state == PlayState::Finished
    }

    /// Overall progress in `[0, 1]`, or `None` once cancelled.
    pub fn progress(&self) -> Option<f64> {
        match self.state {
            PlayState::Cancelled => None,
            PlayState::Finished => Some(1.0),
            PlayState::Running if self.options.duration_ms <= 0.0 => Some(0.0),
            PlayState::Running => Some((self.current_time / self.options.duration_ms).clamp(0.0, 1.0)),
        }
    }

    /// Whether the effect currently applies to the target.
    pub fn is_applying(&self) -> bool {
        match self.state {
            PlayState::Running => true,
            PlayState::Finished => self.options.fill == FillMode::Forwards,
            PlayState::Cancelled => false,
        }
    }

    /// Effect value of `property` at `progress` (already normalised name).
    fn sample(&self, property: &str, progress: f64) -> Option<&str> {
        self.keyframes
            .iter()
            .zip(&self.offsets)
            .filter(|(_, offset)| **offset <= progress)
            .filter_map(|(frame, _)| frame.properties.get(property))
            .last()
            .map(String::as_str)
    }

    /// Every property value the effect applies at its current progress.
    fn current_effect(&self) -> BTreeMap<&str, &str> {
        let mut effect = BTreeMap::new();
        let Some(progress) = self.progress() else {
            return effect;
        };
        for (frame, offset) in self.keyframes.iter().zip(&self.offsets) {
            if *offset > progress {
                break;
            }
            for (name, value) in &frame.properties {
                effect.insert(name.as_str(), value.as_str());
            }
        }
        effect
    }
}

/// Fill in missing keyframe offsets.
///
/// A missing first offset is 0, a missing last offset is 1 (a lone keyframe
/// sits at 1), and runs of missing offsets are spread evenly between their
/// explicit neighbours.
pub fn compute_offsets(keyframes: &[Keyframe]) -> Vec<f64> {
    let len = keyframes.len();
    let mut offsets: Vec<Option<f64>> = keyframes.iter().map(|k| k.offset).collect();
    if len == 0 {
        return Vec::new();
    }
    if len == 1 {
        return vec![offsets[0].unwrap_or(1.0)];
    }
    if offsets[0].is_none() {
        offsets[0] = Some(0.0);
    }
    if offsets[len - 1].is_none() {
        offsets[len - 1] = Some(1.0);
    }

    let mut last_explicit = 0;
    for i in 1..len {
        if let Some(end) = offsets[i] {
            let start = offsets[last_explicit].unwrap_or(0.0);
            let gap = i - last_explicit;
            for (step, j) in (last_explicit + 1..i).enumerate() {
                offsets[j] = Some(start + (end - start) * (step + 1) as f64 / gap as f64);
            }
            last_explicit = i;
        }
    }
    offsets.into_iter().map(|o| o.unwrap_or(1.0)).collect()
}

fn validate_keyframes(keyframes: &[Keyframe]) -> Result<()> {
    let mut previous: Option<f64> = None;
    for frame in keyframes {
        let Some(offset) = frame.offset else { continue };
        if !(0.0..=1.0).contains(&offset) {
            return Err(UiError::KeyframeOffsetOutOfRange { offset });
        }
        if let Some(previous) = previous.filter(|&p| offset < p) {
            return Err(UiError::KeyframeOffsetOrder { offset, previous });
        }
        previous = Some(offset);
    }
    Ok(())
}

/// Callback run once when an animation finishes.
pub type FinishHandler = Box<dyn FnOnce(&mut Document, AnimationId)>;

#[derive(Default)]
pub(crate) struct AnimationStore {
    animations: Vec<NativeAnimation>,
    finish_handlers: Vec<(AnimationId, FinishHandler)>,
    next_id: u64,
}

impl AnimationStore {
    pub(crate) fn len(&self) -> usize {
        self.animations.len()
    }

    fn get(&self, id: AnimationId) -> Option<&NativeAnimation> {
        self.animations.iter().find(|a| a.id == id)
    }

    fn get_mut(&mut self, id: AnimationId) -> Option<&mut NativeAnimation> {
        self.animations.iter_mut().find(|a| a.id == id)
    }
}

// =============================================================================
// Document API
// =============================================================================

impl Document {
    /// Start an animation on `target`.
    pub fn animate(
        &mut self,
        target: NodeId,
        keyframes: Vec<Keyframe>,
        options: AnimationOptions,
    ) -> Result<AnimationId> {
        if !self.is_element(target) {
            return Err(if self.contains(target) {
                UiError::NotAnElement { node: target }
            } else {
                UiError::StaleNode { node: target }
            });
        }
        validate_keyframes(&keyframes)?;

        let store = &mut self.animations;
        let id = AnimationId(store.next_id);
        store.next_id += 1;
        let offsets = compute_offsets(&keyframes);
        trace!(?id, ?target, frames = keyframes.len(), duration = options.duration_ms, "animation started");
        store.animations.push(NativeAnimation {
            id,
            target,
            keyframes,
            offsets,
            options,
            current_time: 0.0,
            state: PlayState::Running,
        });
        Ok(id)
    }

    pub fn animation(&self, id: AnimationId) -> Option<&NativeAnimation> {
        self.animations.get(id)
    }

    /// Ids of animations (in any state) targeting `node`, oldest first.
    pub fn animations_for(&self, node: NodeId) -> Vec<AnimationId> {
        self.animations
            .animations
            .iter()
            .filter(|a| a.target == node)
            .map(|a| a.id)
            .collect()
    }

    /// Number of animations currently running.
    pub fn running_animation_count(&self) -> usize {
        self.animations
            .animations
            .iter()
            .filter(|a| a.state == PlayState::Running)
            .count()
    }

    /// Register a callback for when `id` finishes.
    ///
    /// Runs immediately if the animation has already finished. Dropped if the
    /// animation is cancelled or released first.
    pub fn on_animation_finish(&mut self, id: AnimationId, handler: FinishHandler) {
        match self.animations.get(id).map(NativeAnimation::play_state) {
            Some(PlayState::Finished) => handler(self, id),
            Some(PlayState::Running) => self.animations.finish_handlers.push((id, handler)),
            Some(PlayState::Cancelled) | None => {}
        }
    }

    /// Advance every running animation by `delta_ms`.
    ///
    /// Returns the number of animations that finished during this call.
    pub fn advance_animations(&mut self, delta_ms: f64) -> usize {
        let delta_ms = delta_ms.max(0.0);
        let mut finished = Vec::new();
        let mut orphaned = Vec::new();

        for index in 0..self.animations.animations.len() {
            let (id, target, running) = {
                let a = &self.animations.animations[index];
                (a.id, a.target, a.state == PlayState::Running)
            };
            if !running {
                continue;
            }
            if !self.contains(target) {
                orphaned.push(id);
                continue;
            }
            let animation = &mut self.animations.animations[index];
            animation.current_time += delta_ms;
            if animation.current_time >= animation.options.duration_ms {
                animation.current_time = animation.options.duration_ms.max(0.0);
                animation.state = PlayState::Finished;
                finished.push(id);
            }
        }

        for id in orphaned {
            debug!(?id, "cancelling animation on removed node");
            self.cancel_animation(id);
        }

        for &id in &finished {
            let handlers = self.take_finish_handlers(id);
            for handler in handlers {
                handler(self, id);
            }
        }
        finished.len()
    }

    fn take_finish_handlers(&mut self, id: AnimationId) -> Vec<FinishHandler> {
        let (matching, rest): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.animations.finish_handlers)
                .into_iter()
                .partition(|(handler_id, _)| *handler_id == id);
        self.animations.finish_handlers = rest;
        matching.into_iter().map(|(_, handler)| handler).collect()
    }

    /// Write the animation's current effect into the target's inline style.
    pub fn commit_styles(&mut self, id: AnimationId) -> Result<()> {
        let Some(animation) = self.animations.get(id) else {
            return Ok(());
        };
        let target = animation.target;
        let effect: Vec<(String, String)> = animation
            .current_effect()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        for (property, value) in effect {
            self.set_style(target, &property, &value)?;
        }
        Ok(())
    }

    /// Stop applying the animation's effect. Pending finish handlers are dropped.
    pub fn cancel_animation(&mut self, id: AnimationId) {
        if let Some(animation) = self.animations.get_mut(id) {
            animation.state = PlayState::Cancelled;
        }
        self.animations
            .finish_handlers
            .retain(|(handler_id, _)| *handler_id != id);
    }

    /// Forget a finished or cancelled animation entirely.
    pub fn release_animation(&mut self, id: AnimationId) {
        self.animations.animations.retain(|a| a.id != id);
        self.animations
            .finish_handlers
            .retain(|(handler_id, _)| *handler_id != id);
    }

    /// Effective value of `property`: the inline style overlaid by every
    /// applying animation, newest last.
    pub fn computed_style(&self, node: NodeId, property: &str) -> Option<String> {
        let property = normalize_property(property);
        let mut value = self.style(node, &property).map(str::to_string);
        for animation in &self.animations.animations {
            if animation.target != node || !animation.is_applying() {
                continue;
            }
            let Some(progress) = animation.progress() else {
                continue;
            };
            if let Some(sampled) = animation.sample(&property, progress) {
                value = Some(sampled.to_string());
            }
        }
        value
    }
}

// =============================================================================
// Tests
// =============================================================================
