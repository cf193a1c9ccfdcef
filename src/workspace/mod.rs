//! The canvas workspace: projects tool invocation results from a
//! chat transcript into draggable, deletable cards.
pub mod card;
pub mod drag;
pub mod projector;
pub mod registry;

pub use card::{CARD_SIZE, Card, Position, SPAWN_HEIGHT, SPAWN_WIDTH};
pub use drag::{Bounds, DragEffect, DragState, Point, PointerEvent};
pub use registry::CardRegistry;

use std::collections::HashSet;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::chat::Transcript;

/// Holds the derived card set along with the canvas interaction
/// state: removed ids, selection, hover, and the drag controller.
pub struct Workspace {
    cards: Vec<Card>,
    removed: HashSet<String>,
    selected: Option<String>,
    hovered: Option<String>,
    drag: DragState,
    bounds: Bounds,
    registry: CardRegistry,
    rng: StdRng,
}

impl Workspace {
    pub fn new(registry: CardRegistry, bounds: Bounds) -> Self {
        Self {
            cards: Vec::new(),
            removed: HashSet::new(),
            selected: None,
            hovered: None,
            drag: DragState::Idle,
            bounds,
            registry,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic placement for tests.
    pub fn with_seed(registry: CardRegistry, bounds: Bounds, seed: u64) -> Self {
        let mut workspace = Self::new(registry, bounds);
        workspace.rng = StdRng::seed_from_u64(seed);
        workspace
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn card(&self, id: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == id)
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    pub fn drag_state(&self) -> &DragState {
        &self.drag
    }

    /// Bounds apply to the next drag update; existing positions are
    /// not re-clamped.
    pub fn set_bounds(&mut self, bounds: Bounds) {
        self.bounds = bounds;
    }

    /// Reconcile the card set against the transcript. New qualifying
    /// invocations spawn cards at pseudo-random positions; existing
    /// cards keep their current, possibly drag-updated positions.
    pub fn sync(&mut self, transcript: &Transcript) {
        let existing: HashSet<String> = self.cards.iter().map(|c| c.id.clone()).collect();
        let new_cards = projector::new_cards(
            transcript,
            &self.removed,
            &existing,
            &self.registry,
            &mut self.rng,
        );
        self.cards.extend(new_cards);
    }

    /// Feed a pointer event through the drag controller and apply
    /// the resulting effect to the card set.
    pub fn handle_pointer(&mut self, event: PointerEvent) {
        let state = std::mem::take(&mut self.drag);
        let (next, effect) = drag::transition(state, event);
        self.drag = next;

        match effect {
            DragEffect::Select(id) => {
                if self.card(&id).is_some() {
                    self.selected = Some(id);
                } else {
                    // Stale id: nothing to drag
                    self.drag = DragState::Idle;
                }
            }
            DragEffect::MoveBy { card_id, dx, dy } => {
                let bounds = self.bounds;
                if let Some(card) = self.cards.iter_mut().find(|c| c.id == card_id) {
                    let moved = Position::new(card.position.x + dx, card.position.y + dy);
                    card.position = drag::clamp(moved, bounds);
                }
            }
            DragEffect::None => {}
        }
    }

    /// Select a card by click. Stale ids are a no-op.
    pub fn click_card(&mut self, id: &str) {
        if self.card(id).is_some() {
            self.selected = Some(id.to_string());
        }
    }

    /// Clicking empty canvas clears the selection.
    pub fn click_canvas(&mut self) {
        if !self.drag.is_dragging() {
            self.selected = None;
        }
    }

    pub fn hover(&mut self, id: Option<&str>) {
        self.hovered = id.map(String::from);
    }

    /// Delete a card: the id goes into the removed set so the
    /// projector never re-creates it, the matching invocation is
    /// stripped from the transcript, and any selection, hover, or
    /// drag referencing the id is cleared. Terminal and idempotent.
    pub fn delete_card(&mut self, id: &str, transcript: &mut Transcript) {
        self.removed.insert(id.to_string());
        self.cards.retain(|c| c.id != id);
        transcript.remove_invocation(id);

        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        if self.hovered.as_deref() == Some(id) {
            self.hovered = None;
        }
        if let DragState::Dragging { card_id, .. } = &self.drag {
            if card_id == id {
                self.drag = DragState::Idle;
            }
        }
    }

    /// Plain text rendering of a card via the registry. Unknown
    /// kinds render nothing.
    pub fn render(&self, card: &Card) -> Option<String> {
        self.registry.render(card)
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new(CardRegistry::default(), Bounds::new(800.0, 600.0))
    }
}
