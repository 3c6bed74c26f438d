//! Texture registry - unique ids mapped to asset urls.
//!
//! Ids are colon-separated scopes of `[A-Za-z0-9_]` segments, e.g.
//! `core:hearts:active` or `client:avatar:3`. Misuse (duplicate id, invalid
//! id, removing an unknown id) is logged and ignored.

use std::collections::BTreeMap;

use tracing::{error, warn};

/// Registered textures.
#[derive(Debug, Clone, Default)]
pub struct TextureRegistry {
    textures: BTreeMap<String, String>,
}

impl TextureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `url` under `id`. Returns whether it was added.
    pub fn add(&mut self, id: &str, url: impl Into<String>) -> bool {
        if self.textures.contains_key(id) {
            error!(texture = id, "texture already exists");
            return false;
        }
        if !is_valid_texture_id(id) {
            error!(
                texture = id,
                "invalid texture id, expected colon-separated scopes such as \"core:hearts\""
            );
            return false;
        }
        self.textures.insert(id.to_string(), url.into());
        true
    }

    /// Unregister `id`. Returns whether it existed.
    pub fn remove(&mut self, id: &str) -> bool {
        if self.textures.remove(id).is_none() {
            error!(texture = id, "texture does not exist");
            return false;
        }
        true
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.textures.get(id).map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.textures.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.textures.iter().map(|(id, url)| (id.as_str(), url.as_str()))
    }

    /// CSS `url(...)` value for `id`, or `none` when it is not registered.
    pub fn css_url(&self, id: &str) -> String {
        match self.get(id) {
            Some(url) => format!("url({url})"),
            None => {
                warn!(texture = id, "texture not registered");
                "none".to_string()
            }
        }
    }
}

/// Whether `id` matches `^[A-Za-z0-9_]+(:[A-Za-z0-9_]+)*$`.
pub fn is_valid_texture_id(id: &str) -> bool {
    id.split(':').all(|segment| {
        !segment.is_empty()
            && segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_validation() {
        assert!(is_valid_texture_id("core"));
        assert!(is_valid_texture_id("core:hearts:active"));
        assert!(is_valid_texture_id("core:stars:level:1"));
        assert!(is_valid_texture_id("core:menu:food_item:hot_dog"));

        assert!(!is_valid_texture_id(""));
        assert!(!is_valid_texture_id("core:"));
        assert!(!is_valid_texture_id(":core"));
        assert!(!is_valid_texture_id("core::hearts"));
        assert!(!is_valid_texture_id("core:food-item"));
        assert!(!is_valid_texture_id("core:food item"));
    }

    #[test]
    fn test_add_rejects_duplicates_and_invalid() {
        let mut textures = TextureRegistry::new();
        assert!(textures.add("core:hearts:active", "a.png"));
        assert!(!textures.add("core:hearts:active", "b.png"));
        assert!(!textures.add("core/hearts", "c.png"));
        assert_eq!(textures.len(), 1);
        assert_eq!(textures.get("core:hearts:active"), Some("a.png"));
    }

    #[test]
    fn test_remove() {
        let mut textures = TextureRegistry::new();
        textures.add("core:stars:empty", "star0.png");
        assert!(textures.remove("core:stars:empty"));
        assert!(!textures.remove("core:stars:empty"));
        assert!(textures.is_empty());
    }

    #[test]
    fn test_css_url() {
        let mut textures = TextureRegistry::new();
        textures.add("core:stars:empty", "assets/star0.png");
        assert_eq!(textures.css_url("core:stars:empty"), "url(assets/star0.png)");
        assert_eq!(textures.css_url("core:stars:missing"), "none");
    }
}
