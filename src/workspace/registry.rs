//! Registry mapping tool names to card kinds and renderers.
//!
//! Resolved once at startup; unknown tool names produce no card and
//! unknown kinds degrade to no render rather than a crash.
use std::collections::HashMap;

use serde_json::Value;

use super::card::Card;

type Renderer = Box<dyn Fn(&Value) -> String + Send + Sync>;

struct Entry {
    kind: String,
    renderer: Renderer,
}

pub struct CardRegistry {
    // Keyed by tool name
    entries: HashMap<String, Entry>,
}

impl CardRegistry {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn register<F>(&mut self, tool_name: &str, kind: &str, renderer: F)
    where
        F: Fn(&Value) -> String + Send + Sync + 'static,
    {
        self.entries.insert(
            tool_name.to_string(),
            Entry {
                kind: kind.to_string(),
                renderer: Box::new(renderer),
            },
        );
    }

    /// The card kind for a tool name, or `None` when the tool has no
    /// registered card.
    pub fn kind_for_tool(&self, tool_name: &str) -> Option<&str> {
        self.entries.get(tool_name).map(|e| e.kind.as_str())
    }

    /// Render a card's payload as plain text. Unknown kinds render
    /// nothing.
    pub fn render(&self, card: &Card) -> Option<String> {
        self.entries
            .values()
            .find(|e| e.kind == card.kind)
            .map(|e| (e.renderer)(&card.data))
    }
}

impl Default for CardRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("displayWeather", "weather", |data| {
            format!(
                "{}, {}°F in {}",
                data["weather"].as_str().unwrap_or("Unknown"),
                data["temperature"].as_f64().unwrap_or(0.0),
                data["location"].as_str().unwrap_or("unknown location"),
            )
        });
        registry.register("createNote", "note", |data| {
            data["content"].as_str().unwrap_or("").to_string()
        });
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::card::Position;
    use serde_json::json;

    #[test]
    fn test_default_registry_kinds() {
        let registry = CardRegistry::default();
        assert_eq!(registry.kind_for_tool("displayWeather"), Some("weather"));
        assert_eq!(registry.kind_for_tool("createNote"), Some("note"));
        assert_eq!(registry.kind_for_tool("unknownTool"), None);
    }

    #[test]
    fn test_render_weather_card() {
        let registry = CardRegistry::default();
        let card = Card {
            id: "call_1".to_string(),
            kind: "weather".to_string(),
            position: Position::default(),
            data: json!({"weather": "Sunny", "temperature": 75, "location": "Paris"}),
        };
        assert_eq!(registry.render(&card), Some("Sunny, 75°F in Paris".to_string()));
    }

    #[test]
    fn test_render_note_card() {
        let registry = CardRegistry::default();
        let card = Card {
            id: "call_2".to_string(),
            kind: "note".to_string(),
            position: Position::default(),
            data: json!({"content": "Buy milk", "createdAt": "2025-01-28T00:00:00Z"}),
        };
        assert_eq!(registry.render(&card), Some("Buy milk".to_string()));
    }

    #[test]
    fn test_render_unknown_kind_is_none() {
        let registry = CardRegistry::default();
        let card = Card {
            id: "call_3".to_string(),
            kind: "stock".to_string(),
            position: Position::default(),
            data: json!({}),
        };
        assert_eq!(registry.render(&card), None);
    }
}
