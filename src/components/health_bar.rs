//! Health bar - the player's hearts.
//!
//! Hearts are a stepped bar (six hearts, two levels each by default). Every
//! change animates every heart: hearts whose level changed flash the
//! highlight texture, the others flash their outline. The final frame is
//! committed to the inline style.

use tracing::trace;

use crate::animate::{AnimatableController, Animation};
use crate::components::{Component, mount_slots};
use crate::dom::Keyframe;
use crate::error::{Result, UiError};
use crate::render::{RenderOutput, RenderRegistry, StateAccessor, StateChange};
use crate::stage::Stage;
use crate::state::SharedGameState;
use crate::textures::TextureRegistry;

pub const HEART_HIGHLIGHTED: &str = "core:hearts:highlighted";
pub const HEART_DEAD: &str = "core:hearts:dead";
pub const HEART_DEAD_OUTLINED: &str = "core:hearts:dead:outlined";
pub const HEART_ACTIVE: &str = "core:hearts:active";
pub const HEART_ACTIVE_OUTLINED: &str = "core:hearts:active:outlined";
pub const HEART_EXTRA: &str = "core:hearts:extra";
pub const HEART_EXTRA_OUTLINED: &str = "core:hearts:extra:outlined";

const HEART_TEXTURES: [(&str, &str); 7] = [
    (HEART_HIGHLIGHTED, "assets/gameGeneral_ico/heart_On.png"),
    (HEART_DEAD, "assets/gameGeneral_ico/heart_dead.png"),
    (HEART_DEAD_OUTLINED, "assets/gameGeneral_ico/heart_dead_On.png"),
    (HEART_ACTIVE, "assets/gameGeneral_ico/heart_active.png"),
    (HEART_ACTIVE_OUTLINED, "assets/gameGeneral_ico/heart_active_On.png"),
    (HEART_EXTRA, "assets/gameGeneral_ico/heart_extra.png"),
    (HEART_EXTRA_OUTLINED, "assets/gameGeneral_ico/heart_extra_On.png"),
];

/// Texture ids for a heart level: (plain, outlined).
fn heart_textures(level: u32) -> (&'static str, &'static str) {
    match level {
        0 => (HEART_DEAD, HEART_DEAD_OUTLINED),
        1 => (HEART_ACTIVE, HEART_ACTIVE_OUTLINED),
        _ => (HEART_EXTRA, HEART_EXTRA_OUTLINED),
    }
}

/// Everything one heart's update animation needs, resolved up front.
#[derive(Debug, Clone, PartialEq)]
pub struct HeartUpdate {
    pub changed: bool,
    pub value_url: String,
    pub outlined_url: String,
    pub highlight_url: String,
}

impl HeartUpdate {
    fn resolve(textures: &TextureRegistry, old_level: u32, new_level: u32) -> Self {
        let (value, outlined) = heart_textures(new_level);
        Self {
            changed: old_level != new_level,
            value_url: textures.css_url(value),
            outlined_url: textures.css_url(outlined),
            highlight_url: textures.css_url(HEART_HIGHLIGHTED),
        }
    }
}

fn heart_update_animation() -> Animation<HeartUpdate> {
    Animation::stateful(|heart: &HeartUpdate, t| {
        // Easing applies from this frame to the next one
        t.add_keyframe(Keyframe::new().easing("linear(0, 1 5%)"))?;
        let flash = if heart.changed {
            &heart.highlight_url
        } else {
            &heart.outlined_url
        };
        t.add_keyframe(Keyframe::new().set("backgroundImage", flash.as_str()))?;
        t.add_keyframe(Keyframe::new().set("backgroundImage", heart.value_url.as_str()))?;
        t.add_keyframe(Keyframe::new().set("backgroundImage", heart.outlined_url.as_str()))?;
        t.add_keyframe(Keyframe::new().set("backgroundImage", heart.value_url.as_str()))?;
        Ok(())
    })
}

fn render_hearts(
    change: StateChange<'_, i64>,
    stage: &mut Stage,
    animation: &Animation<HeartUpdate>,
) -> Result<RenderOutput> {
    let config = stage.config.hearts.clone();
    let bar = config.bar();
    let hearts = *change.new_state;
    if hearts > bar.maximum() {
        return Err(UiError::DisplayOverflow {
            what: "hearts",
            value: hearts,
            maximum: bar.maximum(),
        });
    }

    let new_levels = bar.display_state(hearts)?;
    let old_levels = match change.old_state {
        Some(&old) => bar.display_state(old)?,
        None => vec![0; bar.steps],
    };
    let duration_ms = if change.is_initial() {
        0.0
    } else {
        config.update_duration_ms
    };
    trace!(hearts, ?new_levels, "rendering hearts");

    let mut animations: Vec<AnimatableController> = Vec::with_capacity(bar.steps);
    for (i, (&old_level, &new_level)) in old_levels.iter().zip(&new_levels).enumerate() {
        let heart = HeartUpdate::resolve(&stage.textures, old_level, new_level);
        let controller = stage.animations.create_animatable(
            format!("{} > :nth-child({})", config.selector, i + 1).as_str(),
            duration_ms,
            animation,
            Some(&heart),
        )?;
        controller.use_commit_styles(true);
        animations.push(controller);
    }
    Ok(animations.into())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HealthBarComponent;

impl Component for HealthBarComponent {
    fn name(&self) -> &'static str {
        "health_bar"
    }

    fn load_textures(&self, textures: &mut TextureRegistry) {
        for (id, url) in HEART_TEXTURES {
            textures.add(id, url);
        }
    }

    fn setup(&self, stage: &mut Stage) -> Result<()> {
        let selector = stage.config.hearts.selector.clone();
        let steps = stage.config.hearts.steps;
        mount_slots(stage, &selector, steps)?;
        Ok(())
    }

    fn load_renderables(&self, registry: &mut RenderRegistry, state: &SharedGameState) {
        let state = SharedGameState::clone(state);
        let animation = heart_update_animation();
        registry.create_renderable(
            "health_bar",
            StateAccessor::getter(move || state.borrow().player.hearts),
            move |change, stage| render_hearts(change, stage, &animation),
        );
    }
}
