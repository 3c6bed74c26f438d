//! Event binder - several listeners behind one native listener per target.
//!
//! Targets are resolved once, when binding. Listeners can be added and
//! removed afterwards without touching the document.
//!
//! Besides native event names, the composite `@hover` event routes
//! `mouseenter`, `mousemove` and `mouseleave` to the same listener set.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;
use tracing::{debug, warn};

use crate::dom::{Document, DomEvent, NativeListenerId, NodeId};
use crate::element::resolve_targets;
use crate::error::Result;
use crate::types::Context;

bitflags! {
    /// Native events standing behind a hover binding.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HoverEvents: u8 {
        const ENTER = 1 << 0;
        const MOVE  = 1 << 1;
        const LEAVE = 1 << 2;
    }
}

impl HoverEvents {
    /// Native event names, in enter/move/leave order.
    pub fn native_names(self) -> Vec<&'static str> {
        let mut names = Vec::with_capacity(3);
        if self.contains(HoverEvents::ENTER) {
            names.push("mouseenter");
        }
        if self.contains(HoverEvents::MOVE) {
            names.push("mousemove");
        }
        if self.contains(HoverEvents::LEAVE) {
            names.push("mouseleave");
        }
        names
    }
}

/// Event a [`Reactive`] listens to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactiveEvent {
    Native(String),
    Hover(HoverEvents),
}

impl ReactiveEvent {
    pub const HOVER: &'static str = "@hover";

    pub fn parse(name: &str) -> Self {
        if name == Self::HOVER {
            ReactiveEvent::Hover(HoverEvents::all())
        } else {
            ReactiveEvent::Native(name.to_string())
        }
    }

    pub fn native_names(&self) -> Vec<String> {
        match self {
            ReactiveEvent::Native(name) => vec![name.clone()],
            ReactiveEvent::Hover(events) => events
                .native_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

impl From<&str> for ReactiveEvent {
    fn from(name: &str) -> Self {
        ReactiveEvent::parse(name)
    }
}

impl From<HoverEvents> for ReactiveEvent {
    fn from(events: HoverEvents) -> Self {
        ReactiveEvent::Hover(events)
    }
}

/// Listener callback.
pub type ReactiveListener = Rc<dyn Fn(&DomEvent)>;

/// Handle of a listener inside one [`Reactive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type ListenerMap = Rc<RefCell<BTreeMap<ListenerId, ReactiveListener>>>;

/// A bound event multiplexer.
pub struct Reactive {
    context: Context,
    targets: Vec<NodeId>,
    event: ReactiveEvent,
    listeners: ListenerMap,
    next_listener_id: u64,
    native: Vec<NativeListenerId>,
}

/// Resolve `context` and install one native listener per target and native
/// event name.
pub fn bind(
    doc: &mut Document,
    context: impl Into<Context>,
    event: impl Into<ReactiveEvent>,
    initial: Option<ReactiveListener>,
) -> Result<Reactive> {
    let context = context.into();
    let event = event.into();
    let targets = resolve_targets(doc, &context)?;
    let listeners: ListenerMap = Rc::default();

    let mut native = Vec::new();
    for &target in &targets {
        for name in event.native_names() {
            let listeners = Rc::clone(&listeners);
            let id = doc.add_event_listener(
                target,
                &name,
                Rc::new(move |ev: &DomEvent| {
                    let snapshot: Vec<ReactiveListener> =
                        listeners.borrow().values().cloned().collect();
                    for listener in snapshot {
                        listener(ev);
                    }
                }),
            )?;
            native.push(id);
        }
    }
    debug!(context = %context, ?event, targets = targets.len(), "reactive bound");

    let mut reactive = Reactive {
        context,
        targets,
        event,
        listeners,
        next_listener_id: 0,
        native,
    };
    if let Some(listener) = initial {
        reactive.add_listener(listener);
    }
    Ok(reactive)
}

impl Reactive {
    pub fn add_listener(&mut self, listener: ReactiveListener) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.borrow_mut().insert(id, listener);
        id
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.borrow_mut().remove(&id).is_some()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn targets(&self) -> &[NodeId] {
        &self.targets
    }

    pub fn event(&self) -> &ReactiveEvent {
        &self.event
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Detach the native listeners from the document.
    pub fn unbind(self, doc: &mut Document) {
        for id in self.native {
            if !doc.remove_event_listener(id) {
                warn!(?id, "native listener already gone");
            }
        }
    }
}

impl fmt::Debug for Reactive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactive")
            .field("context", &self.context)
            .field("event", &self.event)
            .field("targets", &self.targets)
            .field("listeners", &self.listener_count())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
