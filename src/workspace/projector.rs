//! Derives new cards from the transcript's resolved tool
//! invocations.
use std::collections::HashSet;

use rand::Rng;

use super::card::{Card, Position, SPAWN_HEIGHT, SPAWN_WIDTH};
use super::registry::CardRegistry;
use crate::chat::Transcript;

/// Cards for every resolved invocation with a registered tool name
/// whose id is neither already present nor removed. Iterates the
/// transcript in document order so which ids appear is deterministic
/// even though placement is randomized.
pub fn new_cards<R: Rng>(
    transcript: &Transcript,
    removed: &HashSet<String>,
    existing: &HashSet<String>,
    registry: &CardRegistry,
    rng: &mut R,
) -> Vec<Card> {
    let mut cards = Vec::new();
    // Guards against an id appearing twice in the same pass
    let mut seen: HashSet<String> = HashSet::new();

    for invocation in transcript.resolved_invocations() {
        if removed.contains(&invocation.id)
            || existing.contains(&invocation.id)
            || seen.contains(&invocation.id)
        {
            continue;
        }

        let Some(kind) = registry.kind_for_tool(&invocation.tool_name) else {
            // Unknown tool names produce no card
            continue;
        };

        seen.insert(invocation.id.clone());
        cards.push(Card {
            id: invocation.id.clone(),
            kind: kind.to_string(),
            position: Position::new(
                rng.random_range(0.0..SPAWN_WIDTH),
                rng.random_range(0.0..SPAWN_HEIGHT),
            ),
            data: invocation.result().cloned().unwrap_or_default(),
        });
    }

    cards
}
