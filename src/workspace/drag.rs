//! The drag controller: a small state machine converting pointer
//! events into clamped card position updates.
use super::card::{CARD_SIZE, Position};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Canvas dimensions captured at the time of a drag update. Not
/// re-enforced on resize.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Clone, Default, Debug, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        card_id: String,
        last: Point,
    },
}

impl DragState {
    pub fn is_dragging(&self) -> bool {
        matches!(self, DragState::Dragging { .. })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PointerEvent {
    Down { card_id: String, at: Point },
    Move { at: Point },
    Up,
    Leave,
}

/// What the canvas should do in response to a transition.
#[derive(Clone, Debug, PartialEq)]
pub enum DragEffect {
    None,
    /// A drag started on this card; it also becomes the selection.
    Select(String),
    /// Move this card by the given delta.
    MoveBy {
        card_id: String,
        dx: f64,
        dy: f64,
    },
}

/// Pure transition from (state, event) to (state, effect).
pub fn transition(state: DragState, event: PointerEvent) -> (DragState, DragEffect) {
    match (state, event) {
        (DragState::Idle, PointerEvent::Down { card_id, at }) => (
            DragState::Dragging {
                card_id: card_id.clone(),
                last: at,
            },
            DragEffect::Select(card_id),
        ),
        // A drag start while already dragging is not reachable
        // through the event model, but guard against it anyway
        (dragging @ DragState::Dragging { .. }, PointerEvent::Down { .. }) => {
            (dragging, DragEffect::None)
        }
        (DragState::Dragging { card_id, last }, PointerEvent::Move { at }) => {
            let effect = DragEffect::MoveBy {
                card_id: card_id.clone(),
                dx: at.x - last.x,
                dy: at.y - last.y,
            };
            (DragState::Dragging { card_id, last: at }, effect)
        }
        (_, PointerEvent::Up) | (_, PointerEvent::Leave) => (DragState::Idle, DragEffect::None),
        (DragState::Idle, PointerEvent::Move { .. }) => (DragState::Idle, DragEffect::None),
    }
}

/// Clamp an absolute card position so the card stays inside the
/// canvas.
pub fn clamp(position: Position, bounds: Bounds) -> Position {
    Position {
        x: position.x.clamp(0.0, (bounds.width - CARD_SIZE).max(0.0)),
        y: position.y.clamp(0.0, (bounds.height - CARD_SIZE).max(0.0)),
    }
}
