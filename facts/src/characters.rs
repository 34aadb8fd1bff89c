//! Character ranking and leveling from the dialogue token stream.

use std::collections::HashMap;

use callboard_types::{CharacterRecord, DocToken};

use crate::FactsOptions;

/// Sort key for the ranked character sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CharacterSort {
    /// Descending dialogue-line count (the default).
    #[default]
    Lines,
    /// Ascending written name.
    Name,
}

/// Positional level cutoffs over the sorted ranking: the first `primary`
/// entries are level 1, the next `secondary` entries are level 2, everyone
/// else is level 3. Ties at a cutoff are split positionally, so of two
/// characters with equal counts the one encountered first in the token
/// stream takes the higher level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelCutoffs {
    pub primary: usize,
    pub secondary: usize,
}

impl Default for LevelCutoffs {
    fn default() -> Self {
        Self {
            primary: 3,
            secondary: 7,
        }
    }
}

impl LevelCutoffs {
    fn level_for(self, rank: usize) -> u8 {
        if rank < self.primary {
            1
        } else if rank < self.primary + self.secondary {
            2
        } else {
            3
        }
    }
}

/// Accumulate per-character dialogue-line counts (names compared by exact
/// written form), sort, and assign levels. Returns the records together with
/// a degraded flag set when blank names were skipped.
pub(crate) fn rank(tokens: &[DocToken], options: &FactsOptions) -> (Vec<CharacterRecord>, bool) {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut degraded = false;

    for token in tokens {
        let DocToken::Dialogue { character } = token else {
            continue;
        };
        if character.trim().is_empty() {
            degraded = true;
            continue;
        }
        let count = counts.entry(character.as_str()).or_insert(0);
        if *count == 0 {
            order.push(character.as_str());
        }
        *count += 1;
    }

    // First-encounter order is the tie-break, so build in that order and
    // rely on the stable sort to preserve it.
    let mut records: Vec<CharacterRecord> = order
        .into_iter()
        .map(|name| CharacterRecord {
            name: name.to_string(),
            line_count: counts.get(name).copied().unwrap_or(0),
            level: 0,
        })
        .collect();

    match options.sort {
        CharacterSort::Lines => records.sort_by(|a, b| b.line_count.cmp(&a.line_count)),
        CharacterSort::Name => records.sort_by(|a, b| a.name.cmp(&b.name)),
    }

    for (rank, record) in records.iter_mut().enumerate() {
        record.level = options.cutoffs.level_for(rank);
    }

    (records, degraded)
}
