//! Menu - the dishes on offer, one per pre-existing slot.

use crate::components::Component;
use crate::element::{apply_update_to, element, update};
use crate::error::{Result, UiError};
use crate::render::{RenderOutput, RenderRegistry, StateAccessor};
use crate::stage::Stage;
use crate::state::{MenuItem, SharedGameState};
use crate::textures::TextureRegistry;

/// Dish name and icon file, in menu order.
const FOOD_ITEMS: [(&str, &str); 20] = [
    ("hamburger", "hamburguer.png"),
    ("fries", "fries.png"),
    ("hot_dog", "hot-dog.png"),
    ("toast", "toast.png"),
    ("doughnut", "doughnut.png"),
    ("egg", "egg.png"),
    ("cheese", "cheese.png"),
    ("fish", "fish.png"),
    ("sandwich", "sandwich.png"),
    ("meat", "meat.png"),
    ("pizza", "pizza.png"),
    ("shrimp", "shrimp.png"),
    ("kebab", "kebab.png"),
    ("croissant", "croissant.png"),
    ("steak", "steak.png"),
    ("cookies", "cookies.png"),
    ("salad", "salad.png"),
    ("sushi", "sushi.png"),
    ("pancakes", "pancakes.png"),
    ("salami", "salami.png"),
];

/// Texture id of a dish icon, e.g. `core:menu:food_item:hot_dog`.
pub fn food_item_texture(name: &str) -> String {
    format!("core:menu:food_item:{name}")
}

/// Names of the dishes with a registered icon.
pub fn food_item_names() -> impl Iterator<Item = &'static str> {
    FOOD_ITEMS.iter().map(|(name, _)| *name)
}

fn render_menu(menu: &[MenuItem], stage: &mut Stage) -> Result<RenderOutput> {
    let slots = stage
        .document
        .query_selector_all(&stage.config.menu.slot_selector)?;

    for (index, item) in menu.iter().enumerate() {
        let slot = *slots.get(index).ok_or(UiError::MissingMenuSlot {
            index,
            available: slots.len(),
        })?;
        let icon = element("div").style("backgroundImage", stage.textures.css_url(&item.icon));
        let patch = update()
            .attr("data-id", index)
            .attr("data-uID", item.uid.as_str())
            .attr("data-name", item.name.as_str())
            .attr("data-desc", item.desc.as_str())
            .attr("data-cost", item.cost)
            .attr("data-price", item.price)
            .child(icon);
        apply_update_to(&mut stage.document, &patch, slot)?;
    }
    Ok(RenderOutput::Nothing)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MenuComponent;

impl Component for MenuComponent {
    fn name(&self) -> &'static str {
        "menu"
    }

    fn load_textures(&self, textures: &mut TextureRegistry) {
        for (name, file) in FOOD_ITEMS {
            textures.add(&food_item_texture(name), format!("assets/food_ico/{file}"));
        }
    }

    fn load_renderables(&self, registry: &mut RenderRegistry, state: &SharedGameState) {
        let state = SharedGameState::clone(state);
        registry.create_renderable(
            "menu",
            StateAccessor::getter(move || state.borrow().menu.clone()),
            |change, stage| render_menu(change.new_state, stage),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::install;
    use crate::dom::NodeId;
    use crate::element::materialize;
    use crate::state::GameState;

    fn menu_hud(slot_count: usize) -> (Stage, RenderRegistry, SharedGameState, Vec<NodeId>) {
        let mut stage = Stage::default();
        let root = stage.document.root();
        let slots = (0..slot_count)
            .map(|_| {
                let slot =
                    materialize(&mut stage.document, &element("div").attr("class", "ff-gameMenu-slot"))
                        .unwrap();
                stage.document.append_child(root, slot).unwrap();
                slot
            })
            .collect();
        let mut registry = RenderRegistry::new();
        let state = GameState::default().shared();
        install(&MenuComponent, &mut stage, &mut registry, &state).unwrap();
        (stage, registry, state, slots)
    }

    fn pizza() -> MenuItem {
        MenuItem::new("m-pizza", "Pizza", &food_item_texture("pizza"))
            .desc("Cheese and tomato")
            .pricing(2.0, 4.5)
    }

    #[test]
    fn test_slots_filled() {
        let (mut stage, mut registry, state, slots) = menu_hud(2);
        state.borrow_mut().menu = vec![pizza()];

        let report = stage.draw_frame(&mut registry, 16.0);
        assert!(report.render.is_ok());

        let doc = &stage.document;
        assert_eq!(doc.attribute(slots[0], "data-id"), Some("0"));
        assert_eq!(doc.attribute(slots[0], "data-uID"), Some("m-pizza"));
        assert_eq!(doc.attribute(slots[0], "data-price"), Some("4.5"));
        let icon = doc.element_children(slots[0])[0];
        assert_eq!(
            doc.style(icon, "background-image"),
            Some("url(assets/food_ico/pizza.png)")
        );
        assert!(doc.element_children(slots[1]).is_empty());
    }

    #[test]
    fn test_rerender_replaces_icon() {
        let (mut stage, mut registry, state, slots) = menu_hud(1);
        state.borrow_mut().menu = vec![pizza()];
        stage.draw_frame(&mut registry, 16.0);
        state.borrow_mut().menu[0].icon = food_item_texture("sushi");
        stage.draw_frame(&mut registry, 16.0);
        assert_eq!(stage.document.element_children(slots[0]).len(), 1);
    }

    #[test]
    fn test_missing_slot_fails_loudly() {
        let (mut stage, mut registry, state, _) = menu_hud(1);
        state.borrow_mut().menu = vec![pizza(), pizza()];

        let report = stage.draw_frame(&mut registry, 16.0);
        assert!(matches!(
            report.render.failures[0].error,
            UiError::MissingMenuSlot {
                index: 1,
                available: 1
            }
        ));
    }

    #[test]
    fn test_food_textures_valid() {
        let mut textures = TextureRegistry::new();
        MenuComponent.load_textures(&mut textures);
        assert_eq!(textures.len(), food_item_names().count());
        assert_eq!(
            textures.get(&food_item_texture("hot_dog")),
            Some("assets/food_ico/hot-dog.png")
        );
    }
}
