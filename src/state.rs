//! Game state records read by renderables.
//!
//! The game rules that mutate these live outside the crate. Renderables only
//! read them, through getters over a [`SharedGameState`].

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// Shared handle to the game state.
pub type SharedGameState = Rc<RefCell<GameState>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameState {
    pub player: PlayerState,
    pub menu: Vec<MenuItem>,
}

impl GameState {
    pub fn shared(self) -> SharedGameState {
        Rc::new(RefCell::new(self))
    }

    /// Texture id of the menu entry at `menu_id`.
    pub fn menu_icon(&self, menu_id: usize) -> Option<&str> {
        self.menu.get(menu_id).map(|item| item.icon.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerState {
    pub hearts: i64,
    pub stars: i64,
    /// May go negative.
    pub money: i64,
    pub hand: Vec<HandItem>,
}

/// A dish the player is carrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandItem {
    /// Index into [`GameState::menu`].
    pub menu_id: usize,
}

/// An entry on the restaurant menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub uid: String,
    pub name: String,
    pub desc: String,
    pub cost: f64,
    pub price: f64,
    /// Texture id of the item icon.
    pub icon: String,
}

impl MenuItem {
    pub fn new(uid: &str, name: &str, icon: &str) -> Self {
        Self {
            uid: uid.to_string(),
            name: name.to_string(),
            desc: String::new(),
            cost: 0.0,
            price: 0.0,
            icon: icon.to_string(),
        }
    }

    pub fn desc(mut self, desc: &str) -> Self {
        self.desc = desc.to_string();
        self
    }

    pub fn pricing(mut self, cost: f64, price: f64) -> Self {
        self.cost = cost;
        self.price = price;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_icon_lookup() {
        let state = GameState {
            menu: vec![MenuItem::new("m0", "Pizza", "core:menu:food_item:pizza")],
            ..GameState::default()
        };
        assert_eq!(state.menu_icon(0), Some("core:menu:food_item:pizza"));
        assert_eq!(state.menu_icon(1), None);
    }

    #[test]
    fn test_deserialize_partial() {
        let state: GameState =
            serde_json::from_str(r#"{ "player": { "hearts": 5, "hand": [{ "menu_id": 2 }] } }"#)
                .unwrap();
        assert_eq!(state.player.hearts, 5);
        assert_eq!(state.player.hand, vec![HandItem { menu_id: 2 }]);
        assert!(state.menu.is_empty());
    }
}
