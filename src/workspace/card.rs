//! Positioned card types for the canvas.
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Cards render at a fixed footprint; drag clamping keeps this much
/// of the card inside the canvas.
pub const CARD_SIZE: f64 = 200.0;

/// New cards spawn at a pseudo-random point inside this rectangle,
/// anchored at the canvas origin.
pub const SPAWN_WIDTH: f64 = 300.0;
pub const SPAWN_HEIGHT: f64 = 200.0;

#[derive(Clone, Copy, Default, Serialize, Deserialize, Debug, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A positioned visual representation of a single tool invocation
/// result. The id equals the originating invocation id.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Card {
    pub id: String,
    pub kind: String,
    pub position: Position,
    pub data: Value,
}
