//! Entrypoint wiring: stage, renderables, components and the game loop.
//!
//! ```ignore
//! use bistro_ui::{Game, StageConfig, GameState};
//!
//! let mut game = Game::new(StageConfig::default(), GameState::default().shared());
//! game.mount(&hud_fragment(8))?;
//! game.install_default_components()?;
//!
//! let mut game_loop = game.game_loop();
//! game_loop.start();
//! // host frame callback
//! game_loop.run_iteration(&mut game, now_ms);
//! ```

use tracing::info;

use crate::components::{Component, default_components, install};
use crate::config::StageConfig;
use crate::element::{Fragment, element, set_to_content};
use crate::error::Result;
use crate::game_loop::GameLoop;
use crate::render::RenderRegistry;
use crate::stage::{FrameReport, Stage};
use crate::state::SharedGameState;

#[derive(Debug)]
pub struct Game {
    pub stage: Stage,
    pub registry: RenderRegistry,
    pub state: SharedGameState,
}

impl Game {
    pub fn new(config: StageConfig, state: SharedGameState) -> Self {
        Self {
            stage: Stage::new(config),
            registry: RenderRegistry::new(),
            state,
        }
    }

    /// Replace the document content with `fragment`.
    pub fn mount(&mut self, fragment: &Fragment) -> Result<()> {
        let root = self.stage.document.root();
        set_to_content(&mut self.stage.document, fragment, root)?;
        Ok(())
    }

    pub fn install(&mut self, component: &dyn Component) -> Result<()> {
        install(component, &mut self.stage, &mut self.registry, &self.state)
    }

    pub fn install_default_components(&mut self) -> Result<()> {
        for component in default_components() {
            self.install(component.as_ref())?;
        }
        info!(
            textures = self.stage.textures.len(),
            renderables = self.registry.len(),
            "default components installed"
        );
        Ok(())
    }

    /// Draw one frame. `elapsed_ms` is the time since the previous one.
    pub fn draw(&mut self, elapsed_ms: f64) -> FrameReport {
        self.stage.draw_frame(&mut self.registry, elapsed_ms)
    }

    /// A loop whose only draw step is [`Game::draw`].
    pub fn game_loop(&self) -> GameLoop<Game> {
        let mut game_loop = GameLoop::new(self.stage.config.game_loop);
        game_loop.add_draw_step(|game: &mut Game, elapsed_ms| {
            game.draw(elapsed_ms);
        });
        game_loop
    }
}

/// Default HUD markup: hearts, stars and money bars, `menu_slots` menu slots
/// and the hand.
pub fn hud_fragment(menu_slots: usize) -> Fragment {
    let print = element("div")
        .attr("class", "ff-gamePrint")
        .child(element("div").attr("class", "ff-gamePrint-hearts"))
        .child(element("div").attr("class", "ff-gamePrint-stars"))
        .child(element("div").attr("class", "ff-gamePrint-money"));
    let menu = element("div")
        .attr("class", "ff-gameMenu")
        .children((0..menu_slots).map(|_| element("button").attr("class", "ff-gameMenu-slot")))
        .child(element("div").attr("class", "ff-gameMenu-hand"));
    Fragment::new([print, menu])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::GameState;

    fn game() -> Game {
        let mut game = Game::new(StageConfig::default(), GameState::default().shared());
        game.mount(&hud_fragment(4)).unwrap();
        game.install_default_components().unwrap();
        game
    }

    #[test]
    fn test_default_components_installed() {
        let game = game();
        assert_eq!(game.registry.len(), 5);
        let doc = &game.stage.document;
        let hearts = doc.query_selector(".ff-gamePrint-hearts").unwrap().unwrap();
        assert_eq!(doc.element_children(hearts).len(), 6);
        let money = doc.query_selector(".ff-gamePrint-money").unwrap().unwrap();
        assert_eq!(doc.element_children(money).len(), 2);
    }

    #[test]
    fn test_loop_drives_draw() {
        let mut game = game();
        game.state.borrow_mut().player.money = 12;
        let mut game_loop = game.game_loop();
        game_loop.start();
        game_loop.run_iteration(&mut game, 1000.0);

        let display = game
            .stage
            .document
            .query_selector(".ff-gamePrint-money > :first-child")
            .unwrap()
            .unwrap();
        assert_eq!(game.stage.document.text_content(display), "12");
    }

    #[test]
    fn test_first_frame_renders_cleanly() {
        let mut game = game();
        game.state.borrow_mut().player.hearts = 4;
        let report = game.draw(0.0);
        assert!(report.render.is_ok(), "{:?}", report.render.failures);
        assert_eq!(report.render.rendered, 5);
    }
}
