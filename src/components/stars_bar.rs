//! Stars bar - the restaurant rating.

use crate::components::{Component, mount_slots};
use crate::element::{apply_update, update};
use crate::error::{Result, UiError};
use crate::render::{RenderOutput, RenderRegistry, StateAccessor};
use crate::stage::Stage;
use crate::state::SharedGameState;
use crate::textures::TextureRegistry;

pub const STAR_EMPTY: &str = "core:stars:empty";
pub const STAR_HIGHLIGHTED: &str = "core:stars:highlighted";

const STAR_LEVELS: u32 = 5;
const RAINBOW_FRAMES: u32 = 6;

/// Texture id of a star at `level` (0 is empty).
pub fn star_texture(level: u32) -> String {
    match level {
        0 => STAR_EMPTY.to_string(),
        level => format!("core:stars:level:{level}"),
    }
}

pub fn rainbow_texture(frame: u32) -> String {
    format!("core:stars:rainbow:{frame}")
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StarsBarComponent;

impl Component for StarsBarComponent {
    fn name(&self) -> &'static str {
        "stars_bar"
    }

    fn load_textures(&self, textures: &mut TextureRegistry) {
        textures.add(STAR_EMPTY, "assets/gameGeneral_ico/star0.png");
        textures.add(STAR_HIGHLIGHTED, "assets/gameGeneral_ico/starWhite.png");
        for level in 1..=STAR_LEVELS {
            textures.add(
                &star_texture(level),
                format!("assets/gameGeneral_ico/star{level}_black.png"),
            );
        }
        for frame in 0..RAINBOW_FRAMES {
            textures.add(
                &rainbow_texture(frame),
                format!("assets/gameGeneral_ico/starWhite_Rainbow{frame}.png"),
            );
        }
    }

    fn setup(&self, stage: &mut Stage) -> Result<()> {
        let selector = stage.config.stars.selector.clone();
        let steps = stage.config.stars.steps;
        mount_slots(stage, &selector, steps)?;
        Ok(())
    }

    fn load_renderables(&self, registry: &mut RenderRegistry, state: &SharedGameState) {
        let state = SharedGameState::clone(state);
        registry.create_renderable(
            "stars_bar",
            StateAccessor::getter(move || state.borrow().player.stars),
            |change, stage| {
                let config = &stage.config.stars;
                let bar = config.bar();
                let stars = *change.new_state;
                if stars > bar.maximum() {
                    return Err(UiError::DisplayOverflow {
                        what: "stars",
                        value: stars,
                        maximum: bar.maximum(),
                    });
                }

                let selector = config.selector.clone();
                for (i, level) in bar.display_state(stars)?.into_iter().enumerate() {
                    let url = stage.textures.css_url(&star_texture(level));
                    apply_update(
                        &mut stage.document,
                        &update().style("backgroundImage", url),
                        format!("{selector} > :nth-child({})", i + 1),
                    )?;
                }
                Ok(RenderOutput::Nothing)
            },
        );
    }
}
