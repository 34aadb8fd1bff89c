//! Derived facts: the immutable per-refresh snapshot of document statistics.

use serde::{Deserialize, Serialize};

/// Aggregate line counts by category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicStats {
    pub total_lines: usize,
    pub scene_headings: usize,
    pub action_lines: usize,
    pub dialogue_lines: usize,
    pub character_cues: usize,
}

/// Per-character dialogue volume and assigned level (1 = primary).
///
/// Records are derived and wholly replaced on each refresh, never partially
/// mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterRecord {
    pub name: String,
    pub line_count: usize,
    pub level: u8,
}

/// One distinct location, deduplicated by case/whitespace-normalized name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub normalized_name: String,
    pub occurrence_count: usize,
}

/// Immutable snapshot of everything derived from one parsed document.
/// A refresh produces a complete snapshot that atomically replaces the
/// prior one; no partial view of an in-progress recomputation is ever
/// observable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactsSnapshot {
    pub title: String,
    pub basics: BasicStats,
    pub characters: Vec<CharacterRecord>,
    pub locations: Vec<LocationRecord>,
}
