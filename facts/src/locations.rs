//! Location extraction from scene-heading tokens.

use std::collections::HashMap;

use callboard_types::{DocToken, LocationRecord};

/// Scan scene headings, deduplicate by normalized name, count occurrences.
/// Records come back in first-encounter order with the normalized name
/// rendered uppercase. Blank headings are skipped and flagged as degraded.
pub(crate) fn extract(tokens: &[DocToken]) -> (Vec<LocationRecord>, bool) {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut degraded = false;

    for token in tokens {
        let DocToken::SceneHeading { text } = token else {
            continue;
        };
        let key = normalize(text);
        if key.is_empty() {
            degraded = true;
            continue;
        }
        let count = counts.entry(key.clone()).or_insert(0);
        if *count == 0 {
            order.push(key);
        }
        *count += 1;
    }

    let records = order
        .into_iter()
        .map(|key| {
            let occurrence_count = counts.get(&key).copied().unwrap_or(0);
            LocationRecord {
                normalized_name: key.to_uppercase(),
                occurrence_count,
            }
        })
        .collect();

    (records, degraded)
}

/// Trim, collapse internal whitespace, case-fold.
fn normalize(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
