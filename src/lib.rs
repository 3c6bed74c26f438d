//! # bistro-ui
//!
//! Reactive DOM rendering and keyframe animation runtime for a restaurant
//! simulation game.
//!
//! State reads go through [`StateAccessor`]s, which may wrap
//! [spark-signals](https://github.com/RLabs-Inc/spark-signals) signals.
//!
//! ## Architecture
//!
//! There is no virtual DOM. Renderables poll their state every frame and,
//! when it changed, patch the document in place or hand back animatables:
//!
//! ```text
//! game state → RenderRegistry (diff) → element patches / animatables
//!            → AnimationScheduler (attach, computed keyframes)
//!            → Document native animations → committed styles
//! ```
//!
//! All of it happens inside one explicit [`Stage`], driven once per frame by
//! [`Stage::draw_frame`], usually from a [`GameLoop`] draw step.
//!
//! ## Modules
//!
//! - [`dom`] - In-memory document: nodes, selectors, events, native animations
//! - [`element`] - Element descriptions, fragments and patching
//! - [`render`] - Render registry (poll-based state diffing)
//! - [`animate`] - Animations, timelines and the animatable scheduler
//! - [`react`] - Event binder
//! - [`components`] - Game HUD components
//! - [`game_loop`] - Fixed-timestep loop

pub mod animate;
pub mod components;
pub mod config;
pub mod dom;
pub mod element;
pub mod error;
pub mod game;
pub mod game_loop;
pub mod progress;
pub mod react;
pub mod render;
pub mod stage;
pub mod state;
pub mod textures;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use error::{Result, UiError};

pub use config::{HeartsConfig, LoopConfig, MenuConfig, MoneyConfig, StageConfig, StarsConfig};

pub use dom::{
    AnimationId, AnimationOptions, Document, DomEvent, FillMode, Keyframe, NativeAnimation,
    NativeListenerId, NodeId, PlayState,
};

pub use element::{
    Attrs, Child, ElementDescription, Fragment, append_to_content, apply_update, element,
    materialize, prepend_to_content, set_to_content, update, with_attrs, with_both,
    with_children,
};

pub use render::{
    RenderOutput, RenderRegistry, RenderReport, RenderableHandle, StateAccessor, StateChange,
};

pub use animate::{
    AnimatableController, AnimatableState, Animation, AnimationScheduler, Timeline,
    TimelineBuilder,
};

pub use react::{HoverEvents, Reactive, ReactiveEvent, ReactiveListener, bind};

pub use progress::{SteppedProgressBar, transform_progress_to_display_state};

pub use textures::TextureRegistry;

pub use game_loop::{GameLoop, IterationOutcome};

pub use stage::{FrameReport, Stage};

pub use state::{GameState, HandItem, MenuItem, PlayerState, SharedGameState};

pub use components::{Component, default_components, install};

pub use game::{Game, hud_fragment};
