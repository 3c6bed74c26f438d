//! Animatable lifecycle: pending -> running -> finished -> removed.
//!
//! # Invariants
//!
//! 1. An animatable is attached at most once ([`AnimationScheduler::flush_pending`]).
//! 2. Each computed offset fires at most once per target; a slow frame may
//!    fire several offsets in one call, in ascending order, but never skips one.
//! 3. `on_finish` runs once, after every native animation of the animatable
//!    has finished (after committing styles when requested).
//! 4. A running animatable is removed on the first evaluate tick at which its
//!    native animations are done *and* no computed keyframe is pending. Its
//!    native animations are released at that point.
//!
//! # Failure Modes
//!
//! | Condition | Behaviour |
//! |---|---|
//! | context resolves to no element | warn, drop the animatable |
//! | no keyframes and no computed keyframes | warn, drop the animatable |
//! | invalid selector context | error log, drop the animatable |
//! | computed keyframe callback fails | error log, other callbacks still run |
//! | `use_commit_styles` after attach | error log, ignored |

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, error, trace, warn};

use crate::animate::Animation;
use crate::animate::timeline::Timeline;
use crate::dom::{AnimationId, AnimationOptions, Document, FillMode, NodeId, PlayState};
use crate::element::resolve_targets;
use crate::error::Result;
use crate::types::Context;

/// Identifier of an animatable, unique per scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimatableId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimatableState {
    /// Created, waiting for the next flush.
    Pending,
    /// Native animations attached.
    Running,
    /// Every native animation is done.
    Finished,
    /// Never attached (no targets or nothing to animate).
    Dropped,
}

type FinishCallback = Box<dyn FnOnce(&mut Document)>;

struct Animatable {
    id: AnimatableId,
    context: Context,
    duration_ms: f64,
    timeline: Timeline,
    commit_styles: bool,
    on_finish: Option<FinishCallback>,
    state: AnimatableState,
    /// `(target, native animation)` pairs; the first one drives progress.
    natives: Vec<(NodeId, AnimationId)>,
    finished_natives: Vec<AnimationId>,
}

impl Animatable {
    fn all_natives_finished(&self) -> bool {
        self.natives
            .iter()
            .all(|(_, id)| self.finished_natives.contains(id))
    }
}

// =============================================================================
// Controller
// =============================================================================

/// Handle returned to the creator of an animatable.
#[derive(Clone)]
pub struct AnimatableController {
    inner: Rc<RefCell<Animatable>>,
}

impl AnimatableController {
    pub fn id(&self) -> AnimatableId {
        self.inner.borrow().id
    }

    /// Callback run once every native animation has finished.
    pub fn on_finish(&self, callback: impl FnOnce(&mut Document) + 'static) {
        self.inner.borrow_mut().on_finish = Some(Box::new(callback));
    }

    /// Commit the final styles into the inline style when finished.
    ///
    /// Only effective before the animatable is attached.
    pub fn use_commit_styles(&self, value: bool) {
        let mut animatable = self.inner.borrow_mut();
        if animatable.state != AnimatableState::Pending {
            error!(
                animatable = ?animatable.id,
                value,
                "use_commit_styles cannot be applied on an animation already running"
            );
            return;
        }
        animatable.commit_styles = value;
    }

    /// Drop every computed keyframe that has not fired yet.
    ///
    /// Native animations keep running to their end. Returns how many offsets
    /// were dropped.
    pub fn skip_computed(&self) -> usize {
        let mut animatable = self.inner.borrow_mut();
        let skipped = animatable.timeline.computed.len();
        if skipped > 0 {
            debug!(animatable = ?animatable.id, skipped, "skipping pending computed keyframes");
            animatable.timeline.computed.clear();
        }
        skipped
    }

    pub fn state(&self) -> AnimatableState {
        self.inner.borrow().state
    }

    pub fn is_running(&self) -> bool {
        self.state() == AnimatableState::Running
    }

    pub fn is_finished(&self) -> bool {
        self.state() == AnimatableState::Finished
    }

    pub fn commits_styles(&self) -> bool {
        self.inner.borrow().commit_styles
    }

    pub fn duration_ms(&self) -> f64 {
        self.inner.borrow().duration_ms
    }

    /// Computed offsets still waiting to fire.
    pub fn pending_computed_offsets(&self) -> Vec<f64> {
        self.inner.borrow().timeline.computed_offsets()
    }

    /// Static keyframes of the timeline.
    pub fn keyframes(&self) -> Vec<crate::dom::Keyframe> {
        self.inner.borrow().timeline.keyframes.clone()
    }

    /// Resolved targets (empty until attached).
    pub fn targets(&self) -> Vec<NodeId> {
        self.inner.borrow().natives.iter().map(|(t, _)| *t).collect()
    }

    pub fn native_animations(&self) -> Vec<AnimationId> {
        self.inner.borrow().natives.iter().map(|(_, a)| *a).collect()
    }
}

impl fmt::Debug for AnimatableController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let animatable = self.inner.borrow();
        f.debug_struct("AnimatableController")
            .field("id", &animatable.id)
            .field("context", &animatable.context)
            .field("state", &animatable.state)
            .field("timeline", &animatable.timeline)
            .finish()
    }
}

// =============================================================================
// Scheduler
// =============================================================================

/// Holds pending and running animatables.
#[derive(Default)]
pub struct AnimationScheduler {
    pending: Vec<Rc<RefCell<Animatable>>>,
    running: Vec<Rc<RefCell<Animatable>>>,
    next_id: u64,
}

impl AnimationScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an animatable from `animation`, to be attached on the next flush.
    ///
    /// Stateful animations need `state`; their timeline is built now from a
    /// snapshot of it.
    pub fn create_animatable<S: Clone + 'static>(
        &mut self,
        context: impl Into<Context>,
        duration_ms: f64,
        animation: &Animation<S>,
        state: Option<&S>,
    ) -> Result<AnimatableController> {
        let timeline = animation.resolve(state)?;
        let id = AnimatableId(self.next_id);
        self.next_id += 1;
        let context = context.into();
        trace!(animatable = ?id, context = %context, duration_ms, "animatable created");

        let inner = Rc::new(RefCell::new(Animatable {
            id,
            context,
            duration_ms,
            timeline,
            commit_styles: false,
            on_finish: None,
            state: AnimatableState::Pending,
            natives: Vec::new(),
            finished_natives: Vec::new(),
        }));
        self.pending.push(Rc::clone(&inner));
        Ok(AnimatableController { inner })
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.running.is_empty()
    }

    /// Attach every pending animatable to its resolved targets.
    ///
    /// Returns the number of animatables moved to the running set.
    pub fn flush_pending(&mut self, doc: &mut Document) -> usize {
        let pending = std::mem::take(&mut self.pending);
        let mut attached = 0;
        for cell in pending {
            if attach(doc, &cell) {
                self.running.push(cell);
                attached += 1;
            }
        }
        attached
    }

    /// Fire due computed keyframes and retire finished animatables.
    ///
    /// Returns the number of callback invocations.
    pub fn evaluate_computed(&mut self, doc: &mut Document) -> usize {
        let mut fired = 0;
        let mut retired = Vec::new();

        for cell in &self.running {
            sync_natives(doc, cell);
            fired += fire_due_keyframes(doc, cell);

            let animatable = cell.borrow();
            if animatable.state == AnimatableState::Finished
                && !animatable.timeline.has_pending_computed_keyframes()
            {
                retired.push(animatable.id);
            }
        }

        if !retired.is_empty() {
            self.running.retain(|cell| {
                let animatable = cell.borrow();
                if !retired.contains(&animatable.id) {
                    return true;
                }
                for (_, native) in &animatable.natives {
                    doc.release_animation(*native);
                }
                debug!(animatable = ?animatable.id, "animatable retired");
                false
            });
        }
        fired
    }
}

impl fmt::Debug for AnimationScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationScheduler")
            .field("pending", &self.pending.len())
            .field("running", &self.running.len())
            .finish()
    }
}

// =============================================================================
// Attach
// =============================================================================

fn attach(doc: &mut Document, cell: &Rc<RefCell<Animatable>>) -> bool {
    let (id, context, duration_ms, keyframes, commit, empty) = {
        let a = cell.borrow();
        (
            a.id,
            a.context.clone(),
            a.duration_ms,
            a.timeline.keyframes.clone(),
            a.commit_styles,
            a.timeline.is_empty(),
        )
    };

    if empty {
        warn!(animatable = ?id, "no keyframes or computed keyframes defined for animation");
        cell.borrow_mut().state = AnimatableState::Dropped;
        return false;
    }

    let targets = match resolve_targets(doc, &context) {
        Ok(targets) => targets,
        Err(err) => {
            error!(animatable = ?id, error = %err, "cannot resolve animation context");
            cell.borrow_mut().state = AnimatableState::Dropped;
            return false;
        }
    };
    if targets.is_empty() {
        warn!(animatable = ?id, context = %context, "no context found to attach animation");
        cell.borrow_mut().state = AnimatableState::Dropped;
        return false;
    }

    let fill = if commit { FillMode::Forwards } else { FillMode::None };
    let options = AnimationOptions::new(duration_ms).fill(fill);
    let mut natives = Vec::with_capacity(targets.len());
    for target in targets {
        match doc.animate(target, keyframes.clone(), options) {
            Ok(native) => natives.push((target, native)),
            Err(err) => error!(animatable = ?id, ?target, error = %err, "cannot start native animation"),
        }
    }
    if natives.is_empty() {
        cell.borrow_mut().state = AnimatableState::Dropped;
        return false;
    }

    {
        let mut a = cell.borrow_mut();
        a.natives = natives.clone();
        a.state = AnimatableState::Running;
    }

    for (_, native) in natives {
        let weak = Rc::downgrade(cell);
        doc.on_animation_finish(
            native,
            Box::new(move |doc, native| on_native_finish(doc, &weak, native)),
        );
    }
    trace!(animatable = ?id, "animatable attached");
    true
}

fn on_native_finish(doc: &mut Document, weak: &Weak<RefCell<Animatable>>, native: AnimationId) {
    let Some(cell) = weak.upgrade() else { return };
    let commit = cell.borrow().commit_styles;
    if commit {
        if let Err(err) = doc.commit_styles(native) {
            error!(?native, error = %err, "cannot commit animation styles");
        }
        doc.cancel_animation(native);
    }
    cell.borrow_mut().finished_natives.push(native);
    complete_if_done(doc, &cell);
}

/// Flip to finished once every native is done, running `on_finish` once.
fn complete_if_done(doc: &mut Document, cell: &Rc<RefCell<Animatable>>) {
    let callback = {
        let mut a = cell.borrow_mut();
        if a.state != AnimatableState::Running || !a.all_natives_finished() {
            return;
        }
        a.state = AnimatableState::Finished;
        a.on_finish.take()
    };
    if let Some(callback) = callback {
        callback(doc);
    }
}

/// Account for natives that will never report finishing (target removed).
fn sync_natives(doc: &Document, cell: &Rc<RefCell<Animatable>>) {
    let mut a = cell.borrow_mut();
    if a.state != AnimatableState::Running {
        return;
    }
    let lost: Vec<AnimationId> = a
        .natives
        .iter()
        .map(|(_, native)| *native)
        .filter(|native| !a.finished_natives.contains(native))
        .filter(|native| {
            doc.animation(*native)
                .is_none_or(|n| n.play_state() == PlayState::Cancelled)
        })
        .collect();
    if lost.is_empty() {
        return;
    }
    debug!(animatable = ?a.id, lost = lost.len(), "native animations cancelled before finishing");
    a.finished_natives.extend(lost);
    if a.all_natives_finished() {
        a.state = AnimatableState::Finished;
        a.on_finish = None;
    }
}

fn lifecycle_progress(doc: &Document, animatable: &Animatable) -> Option<f64> {
    if animatable.state == AnimatableState::Finished {
        return Some(1.0);
    }
    let (_, lifecycle) = animatable.natives.first()?;
    if animatable.finished_natives.contains(lifecycle) {
        return Some(1.0);
    }
    doc.animation(*lifecycle)?.progress()
}

fn fire_due_keyframes(doc: &mut Document, cell: &Rc<RefCell<Animatable>>) -> usize {
    let (due, targets, id) = {
        let mut a = cell.borrow_mut();
        if !a.timeline.has_pending_computed_keyframes() {
            return 0;
        }
        let Some(progress) = lifecycle_progress(doc, &a) else {
            return 0;
        };
        let split = a
            .timeline
            .computed
            .iter()
            .position(|group| group.offset > progress)
            .unwrap_or(a.timeline.computed.len());
        let due: Vec<_> = a.timeline.computed.drain(..split).collect();
        let targets: Vec<NodeId> = a.natives.iter().map(|(t, _)| *t).collect();
        (due, targets, a.id)
    };

    let mut fired = 0;
    for mut group in due {
        trace!(animatable = ?id, offset = group.offset, "computed keyframe due");
        for &target in &targets {
            if !doc.contains(target) {
                debug!(animatable = ?id, ?target, "skipping computed keyframe on removed node");
                continue;
            }
            for callback in group.callbacks.iter_mut() {
                fired += 1;
                if let Err(err) = callback(doc, target) {
                    error!(
                        animatable = ?id,
                        offset = group.offset,
                        error = %err,
                        "computed keyframe failed"
                    );
                }
            }
        }
    }
    fired
}

// =============================================================================
// Tests
// =============================================================================
