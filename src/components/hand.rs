//! Hand - the dishes the player is carrying.

use tracing::warn;

use crate::components::Component;
use crate::element::{apply_update, element, update};
use crate::render::{RenderOutput, RenderRegistry, StateAccessor};
use crate::state::SharedGameState;

#[derive(Debug, Clone, Copy, Default)]
pub struct HandComponent;

impl Component for HandComponent {
    fn name(&self) -> &'static str {
        "hand"
    }

    fn load_renderables(&self, registry: &mut RenderRegistry, state: &SharedGameState) {
        let held = SharedGameState::clone(state);
        let menu = SharedGameState::clone(state);
        registry.create_renderable(
            "hand",
            StateAccessor::getter(move || {
                held.borrow()
                    .player
                    .hand
                    .iter()
                    .map(|item| item.menu_id)
                    .collect::<Vec<_>>()
            }),
            move |change, stage| {
                let icons: Vec<_> = {
                    let state = menu.borrow();
                    change
                        .new_state
                        .iter()
                        .map(|&menu_id| {
                            let url = match state.menu_icon(menu_id) {
                                Some(icon) => stage.textures.css_url(icon),
                                None => {
                                    warn!(menu_id, "hand item refers to a missing menu entry");
                                    "none".to_string()
                                }
                            };
                            element("div").style("backgroundImage", url)
                        })
                        .collect()
                };
                let selector = stage.config.menu.hand_selector.clone();
                apply_update(&mut stage.document, &update().children(icons), selector)?;
                Ok(RenderOutput::Nothing)
            },
        );
    }
}
