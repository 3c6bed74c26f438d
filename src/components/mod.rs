//! Components - self-contained game UI features.
//!
//! A component bundles whatever a feature needs: the textures it draws with,
//! the base markup it mounts (`setup`), and the renderables that keep that
//! markup in sync with the game state. Every capability is optional; a
//! component can be nothing more than a texture pack.
//!
//! Installation order is fixed: textures, then setup, then renderables, so
//! setup and the first render can rely on the textures being registered.

pub mod hand;
pub mod health_bar;
pub mod menu;
pub mod money;
pub mod stars_bar;

use tracing::debug;

use crate::error::Result;
use crate::render::RenderRegistry;
use crate::stage::Stage;
use crate::state::SharedGameState;
use crate::textures::TextureRegistry;

pub use hand::HandComponent;
pub use health_bar::HealthBarComponent;
pub use menu::MenuComponent;
pub use money::MoneyComponent;
pub use stars_bar::StarsBarComponent;

pub trait Component {
    fn name(&self) -> &'static str;

    fn load_textures(&self, _textures: &mut TextureRegistry) {}

    /// Mount the base markup renderables will patch.
    fn setup(&self, _stage: &mut Stage) -> Result<()> {
        Ok(())
    }

    fn load_renderables(&self, _registry: &mut RenderRegistry, _state: &SharedGameState) {}
}

/// Install one component onto `stage` and `registry`.
pub fn install(
    component: &dyn Component,
    stage: &mut Stage,
    registry: &mut RenderRegistry,
    state: &SharedGameState,
) -> Result<()> {
    component.load_textures(&mut stage.textures);
    component.setup(stage)?;
    component.load_renderables(registry, state);
    debug!(component = component.name(), "component installed");
    Ok(())
}

/// The components making up the game HUD.
pub fn default_components() -> Vec<Box<dyn Component>> {
    vec![
        Box::new(HealthBarComponent),
        Box::new(StarsBarComponent),
        Box::new(MoneyComponent),
        Box::new(MenuComponent),
        Box::new(HandComponent),
    ]
}

/// `count` empty `div`s under every element of `selector`.
pub(crate) fn mount_slots(stage: &mut Stage, selector: &str, count: usize) -> Result<usize> {
    use crate::element::{apply_update, element, update};

    let slots = (0..count).map(|_| element("div"));
    apply_update(&mut stage.document, &update().children(slots), selector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::GameState;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Recording(Rc<RefCell<Vec<&'static str>>>);

    impl Component for Recording {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn load_textures(&self, textures: &mut TextureRegistry) {
            textures.add("test:texture", "t.png");
            self.0.borrow_mut().push("textures");
        }

        fn setup(&self, stage: &mut Stage) -> Result<()> {
            assert!(stage.textures.contains("test:texture"));
            self.0.borrow_mut().push("setup");
            Ok(())
        }

        fn load_renderables(&self, _registry: &mut RenderRegistry, _state: &SharedGameState) {
            self.0.borrow_mut().push("renderables");
        }
    }

    struct TexturePack;

    impl Component for TexturePack {
        fn name(&self) -> &'static str {
            "texture_pack"
        }

        fn load_textures(&self, textures: &mut TextureRegistry) {
            textures.add("pack:logo", "logo.png");
        }
    }

    #[test]
    fn test_install_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut stage = Stage::default();
        let mut registry = RenderRegistry::new();
        let state = GameState::default().shared();

        install(&Recording(Rc::clone(&log)), &mut stage, &mut registry, &state).unwrap();
        assert_eq!(*log.borrow(), vec!["textures", "setup", "renderables"]);
    }

    #[test]
    fn test_capabilities_optional() {
        let mut stage = Stage::default();
        let mut registry = RenderRegistry::new();
        let state = GameState::default().shared();

        install(&TexturePack, &mut stage, &mut registry, &state).unwrap();
        assert_eq!(stage.textures.get("pack:logo"), Some("logo.png"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_default_components_register_distinct_textures() {
        let mut textures = TextureRegistry::new();
        for component in default_components() {
            component.load_textures(&mut textures);
        }
        // 7 hearts, 13 stars, 20 dishes
        assert_eq!(textures.len(), 40);
    }
}
