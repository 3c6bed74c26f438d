//! Render registry - poll-based state diffing.
//!
//! A renderable binds a state accessor to a render callback. On every
//! [`RenderRegistry::render_all`] the current state is read and compared
//! structurally (`PartialEq`) with the last rendered snapshot; the callback
//! only runs when they differ. The first tick always renders.
//!
//! # State accessors
//!
//! Like component props, a [`StateAccessor`] is a static value, a
//! `spark-signals` signal, or a getter closure:
//!
//! ```ignore
//! use bistro_ui::render::{RenderRegistry, RenderOutput, StateAccessor};
//!
//! let state = game.state.clone();
//! registry.create_renderable(
//!     "money",
//!     StateAccessor::getter(move || state.borrow().player.money),
//!     |change, stage| {
//!         // change.new_state / change.old_state (None on first render)
//!         Ok(RenderOutput::Nothing)
//!     },
//! );
//! ```
//!
//! # Failures
//!
//! A failing callback is isolated: the error is logged and reported in the
//! [`RenderReport`], the other renderables still run, and the same failing
//! state is not retried on later ticks. `last_rendered_state` keeps the last
//! state that rendered successfully.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use spark_signals::Signal;
use tracing::{error, trace};

use crate::animate::AnimatableController;
use crate::error::{Result, UiError};
use crate::stage::Stage;

// =============================================================================
// State accessor
// =============================================================================

/// Where a renderable reads its state from.
#[derive(Clone)]
pub enum StateAccessor<T: Clone + PartialEq + 'static> {
    /// Fixed value.
    Static(T),
    /// Reactive signal, read on every tick.
    Signal(Signal<T>),
    /// Getter function (called on every tick).
    Getter(Rc<dyn Fn() -> T>),
}

impl<T: Clone + PartialEq + 'static> StateAccessor<T> {
    pub fn getter(f: impl Fn() -> T + 'static) -> Self {
        StateAccessor::Getter(Rc::new(f))
    }

    /// Read the current state.
    pub fn get(&self) -> T {
        match self {
            StateAccessor::Static(v) => v.clone(),
            StateAccessor::Signal(s) => s.get(),
            StateAccessor::Getter(f) => f(),
        }
    }
}

impl<T: Clone + PartialEq + 'static> From<T> for StateAccessor<T> {
    fn from(value: T) -> Self {
        StateAccessor::Static(value)
    }
}

impl<T: Clone + PartialEq + 'static> From<Signal<T>> for StateAccessor<T> {
    fn from(signal: Signal<T>) -> Self {
        StateAccessor::Signal(signal)
    }
}

// =============================================================================
// Callback types
// =============================================================================

/// Argument of a render callback.
#[derive(Debug)]
pub struct StateChange<'a, T> {
    pub new_state: &'a T,
    /// `None` on the first render.
    pub old_state: Option<&'a T>,
}

impl<T> Clone for StateChange<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for StateChange<'_, T> {}

impl<T> StateChange<'_, T> {
    pub fn is_initial(&self) -> bool {
        self.old_state.is_none()
    }
}

/// What a render callback produced.
#[derive(Debug, Default)]
pub enum RenderOutput {
    #[default]
    Nothing,
    /// Animatables created by the callback. Their lifecycle belongs to the
    /// scheduler, not the registry.
    Animations(Vec<AnimatableController>),
}

impl From<()> for RenderOutput {
    fn from(_: ()) -> Self {
        RenderOutput::Nothing
    }
}

impl From<AnimatableController> for RenderOutput {
    fn from(controller: AnimatableController) -> Self {
        RenderOutput::Animations(vec![controller])
    }
}

impl From<Vec<AnimatableController>> for RenderOutput {
    fn from(controllers: Vec<AnimatableController>) -> Self {
        RenderOutput::Animations(controllers)
    }
}

/// Render callback.
pub type RenderFn<T> = Box<dyn FnMut(StateChange<'_, T>, &mut Stage) -> Result<RenderOutput>>;

// =============================================================================
// Renderable
// =============================================================================

/// Outcome of ticking a single renderable.
enum TickOutcome {
    Unchanged,
    Rendered(RenderOutput),
    /// State equals the one that failed last time.
    SkippedFailed,
    Failed(UiError),
}

trait Tick {
    fn name(&self) -> &str;
    fn tick(&mut self, stage: &mut Stage) -> TickOutcome;
}

struct Renderable<T: Clone + PartialEq + 'static> {
    name: String,
    accessor: StateAccessor<T>,
    last_rendered: Option<T>,
    last_failed: Option<T>,
    render_count: usize,
    callback: RenderFn<T>,
}

impl<T: Clone + PartialEq + 'static> Tick for Renderable<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn tick(&mut self, stage: &mut Stage) -> TickOutcome {
        let current = self.accessor.get();
        if self.last_rendered.as_ref() == Some(&current) {
            return TickOutcome::Unchanged;
        }
        if self.last_failed.as_ref() == Some(&current) {
            return TickOutcome::SkippedFailed;
        }

        let change = StateChange {
            new_state: &current,
            old_state: self.last_rendered.as_ref(),
        };
        match (self.callback)(change, stage) {
            Ok(output) => {
                self.render_count += 1;
                self.last_failed = None;
                self.last_rendered = Some(current);
                TickOutcome::Rendered(output)
            }
            Err(err) => {
                self.last_failed = Some(current);
                TickOutcome::Failed(err)
            }
        }
    }
}

/// Typed handle to a registered renderable.
pub struct RenderableHandle<T: Clone + PartialEq + 'static> {
    inner: Rc<RefCell<Renderable<T>>>,
}

impl<T: Clone + PartialEq + 'static> Clone for RenderableHandle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + PartialEq + 'static> RenderableHandle<T> {
    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    /// Snapshot of the last successfully rendered state.
    pub fn last_rendered_state(&self) -> Option<T> {
        self.inner.borrow().last_rendered.clone()
    }

    pub fn is_rendered(&self) -> bool {
        self.inner.borrow().last_rendered.is_some()
    }

    /// Number of successful callback runs.
    pub fn render_count(&self) -> usize {
        self.inner.borrow().render_count
    }
}

impl<T: Clone + PartialEq + fmt::Debug + 'static> fmt::Debug for RenderableHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.inner.borrow();
        f.debug_struct("RenderableHandle")
            .field("name", &r.name)
            .field("last_rendered", &r.last_rendered)
            .field("render_count", &r.render_count)
            .finish()
    }
}

// =============================================================================
// Registry
// =============================================================================

/// A renderable that failed during a tick.
#[derive(Debug)]
pub struct RenderFailure {
    pub name: String,
    pub error: UiError,
}

/// Summary of one [`RenderRegistry::render_all`] pass.
#[derive(Debug, Default)]
pub struct RenderReport {
    pub rendered: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failures: Vec<RenderFailure>,
    /// Animatables returned by callbacks this tick.
    pub animations: Vec<AnimatableController>,
}

impl RenderReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Ordered set of renderables, ticked in registration order.
#[derive(Default)]
pub struct RenderRegistry {
    renderables: Vec<Rc<RefCell<dyn Tick>>>,
}

impl RenderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a renderable. Names are for diagnostics only.
    pub fn create_renderable<T, F>(
        &mut self,
        name: &str,
        accessor: impl Into<StateAccessor<T>>,
        callback: F,
    ) -> RenderableHandle<T>
    where
        T: Clone + PartialEq + 'static,
        F: FnMut(StateChange<'_, T>, &mut Stage) -> Result<RenderOutput> + 'static,
    {
        let inner = Rc::new(RefCell::new(Renderable {
            name: name.to_string(),
            accessor: accessor.into(),
            last_rendered: None,
            last_failed: None,
            render_count: 0,
            callback: Box::new(callback),
        }));
        self.renderables.push(inner.clone());
        RenderableHandle { inner }
    }

    pub fn len(&self) -> usize {
        self.renderables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renderables.is_empty()
    }

    /// Tick every renderable once, in registration order.
    pub fn render_all(&mut self, stage: &mut Stage) -> RenderReport {
        let mut report = RenderReport::default();
        for renderable in &self.renderables {
            let mut renderable = renderable.borrow_mut();
            match renderable.tick(stage) {
                TickOutcome::Unchanged => report.unchanged += 1,
                TickOutcome::SkippedFailed => report.skipped += 1,
                TickOutcome::Rendered(output) => {
                    trace!(renderable = renderable.name(), "rendered");
                    report.rendered += 1;
                    if let RenderOutput::Animations(animations) = output {
                        report.animations.extend(animations);
                    }
                }
                TickOutcome::Failed(err) => {
                    error!(renderable = renderable.name(), error = %err, "render callback failed");
                    report.failures.push(RenderFailure {
                        name: renderable.name().to_string(),
                        error: err,
                    });
                }
            }
        }
        report
    }
}

impl fmt::Debug for RenderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self
            .renderables
            .iter()
            .map(|r| r.borrow().name().to_string())
            .collect();
        f.debug_struct("RenderRegistry").field("renderables", &names).finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use spark_signals::signal;
    use std::cell::Cell;
    use std::collections::BTreeMap;

    fn counting<T: Clone + PartialEq + 'static>(
        registry: &mut RenderRegistry,
        accessor: impl Into<StateAccessor<T>>,
    ) -> (RenderableHandle<T>, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let handle = registry.create_renderable("counting", accessor, move |_, _| {
            counter.set(counter.get() + 1);
            Ok(RenderOutput::Nothing)
        });
        (handle, calls)
    }

    #[test]
    fn test_first_tick_renders_with_no_old_state() {
        let mut stage = Stage::default();
        let mut registry = RenderRegistry::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        registry.create_renderable("unit", StateAccessor::Static(()), move |change, _| {
            log.borrow_mut().push(change.is_initial());
            Ok(RenderOutput::Nothing)
        });

        registry.render_all(&mut stage);
        registry.render_all(&mut stage);
        assert_eq!(*seen.borrow(), vec![true]);
    }

    #[test]
    fn test_structural_comparison() {
        let mut stage = Stage::default();
        let mut registry = RenderRegistry::new();
        let state = Rc::new(RefCell::new(BTreeMap::from([("a", 1)])));
        let source = Rc::clone(&state);
        let (handle, calls) = counting(
            &mut registry,
            StateAccessor::getter(move || source.borrow().clone()),
        );

        registry.render_all(&mut stage);
        assert_eq!(calls.get(), 1);

        // New value, same structure: no render
        *state.borrow_mut() = BTreeMap::from([("a", 1)]);
        registry.render_all(&mut stage);
        assert_eq!(calls.get(), 1);

        // In-place change: one render
        state.borrow_mut().insert("a", 2);
        registry.render_all(&mut stage);
        registry.render_all(&mut stage);
        assert_eq!(calls.get(), 2);
        assert_eq!(handle.last_rendered_state(), Some(BTreeMap::from([("a", 2)])));
    }

    #[test]
    fn test_old_state_passed_to_callback() {
        let mut stage = Stage::default();
        let mut registry = RenderRegistry::new();
        let value = Rc::new(Cell::new(5));
        let source = Rc::clone(&value);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        registry.create_renderable(
            "hearts",
            StateAccessor::getter(move || source.get()),
            move |change, _| {
                log.borrow_mut().push((change.old_state.copied(), *change.new_state));
                Ok(RenderOutput::Nothing)
            },
        );

        registry.render_all(&mut stage);
        value.set(7);
        registry.render_all(&mut stage);
        assert_eq!(*seen.borrow(), vec![(None, 5), (Some(5), 7)]);
    }

    #[test]
    fn test_signal_accessor() {
        let mut stage = Stage::default();
        let mut registry = RenderRegistry::new();
        let stars = signal(3u32);
        let (handle, calls) = counting(&mut registry, StateAccessor::Signal(stars.clone()));

        registry.render_all(&mut stage);
        stars.set(4);
        registry.render_all(&mut stage);
        registry.render_all(&mut stage);
        assert_eq!(calls.get(), 2);
        assert_eq!(handle.last_rendered_state(), Some(4));
    }

    #[test]
    fn test_failure_isolated_and_not_retried() {
        let mut stage = Stage::default();
        let mut registry = RenderRegistry::new();
        let value = Rc::new(Cell::new(20i64));
        let source = Rc::clone(&value);
        let attempts = Rc::new(Cell::new(0));
        let tries = Rc::clone(&attempts);
        let failing = registry.create_renderable(
            "hearts",
            StateAccessor::getter(move || source.get()),
            move |change, _| {
                tries.set(tries.get() + 1);
                if *change.new_state > 12 {
                    return Err(UiError::DisplayOverflow {
                        what: "hearts",
                        value: *change.new_state,
                        maximum: 12,
                    });
                }
                Ok(RenderOutput::Nothing)
            },
        );
        let (_, healthy_calls) = counting(&mut registry, StateAccessor::Static(1u8));

        let report = registry.render_all(&mut stage);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].name, "hearts");
        assert_eq!(report.rendered, 1);
        assert_eq!(healthy_calls.get(), 1);
        assert!(!failing.is_rendered());

        // Same failing state is not retried
        let report = registry.render_all(&mut stage);
        assert_eq!(report.skipped, 1);
        assert_eq!(attempts.get(), 1);

        // Recovers once the state becomes renderable
        value.set(8);
        let report = registry.render_all(&mut stage);
        assert!(report.is_ok());
        assert_eq!(failing.last_rendered_state(), Some(8));
        assert_eq!(failing.render_count(), 1);
    }

    proptest! {
        #[test]
        fn prop_renders_once_per_distinct_run(values in proptest::collection::vec(0u8..4, 1..40)) {
            let mut stage = Stage::default();
            let mut registry = RenderRegistry::new();
            let current = Rc::new(Cell::new(values[0]));
            let source = Rc::clone(&current);
            let (_, calls) = counting(&mut registry, StateAccessor::getter(move || source.get()));

            for &v in &values {
                current.set(v);
                registry.render_all(&mut stage);
            }
            let runs = 1 + values.windows(2).filter(|w| w[0] != w[1]).count();
            prop_assert_eq!(calls.get(), runs);
        }
    }
}
