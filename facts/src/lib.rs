//! Derived facts for a parsed screenplay.
//!
//! A pure, deterministic pipeline: identical input always yields a
//! structurally identical, identically ordered [`FactsSnapshot`]. Malformed
//! input never escapes as an error; affected tokens are skipped, affected
//! fields defaulted, and the result is flagged as degraded instead.

mod characters;
mod locations;

pub use characters::{CharacterSort, LevelCutoffs};

use callboard_types::{BasicStats, FactsSnapshot, LineKind, ParsedDocument};

/// Options steering character ranking and leveling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FactsOptions {
    pub sort: CharacterSort,
    pub cutoffs: LevelCutoffs,
}

/// The result of one derivation: a complete snapshot plus a flag marking
/// best-effort output produced from a malformed token stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derivation {
    pub snapshot: FactsSnapshot,
    pub degraded: bool,
}

/// Run the full pipeline: basics, title, ranked characters, locations.
#[must_use]
pub fn derive(doc: &ParsedDocument, options: &FactsOptions) -> Derivation {
    let basics = basics(&doc.lines);
    let title = doc
        .title_page
        .first_text("title")
        .unwrap_or_default()
        .to_string();
    let (characters, characters_degraded) = characters::rank(&doc.tokens, options);
    let (locations, locations_degraded) = locations::extract(&doc.tokens);

    let degraded = characters_degraded || locations_degraded;
    if degraded {
        tracing::warn!("facts derivation degraded: malformed tokens were skipped");
    }

    Derivation {
        snapshot: FactsSnapshot {
            title,
            basics,
            characters,
            locations,
        },
        degraded,
    }
}

fn basics(lines: &[LineKind]) -> BasicStats {
    let mut stats = BasicStats {
        total_lines: lines.len(),
        ..BasicStats::default()
    };
    for kind in lines {
        match kind {
            LineKind::SceneHeading => stats.scene_headings += 1,
            LineKind::Action => stats.action_lines += 1,
            LineKind::Dialogue => stats.dialogue_lines += 1,
            LineKind::Character => stats.character_cues += 1,
            LineKind::Parenthetical
            | LineKind::Transition
            | LineKind::Section
            | LineKind::Synopsis
            | LineKind::Blank
            | LineKind::Other => {}
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use callboard_types::{DocToken, LineKind, ParsedDocument, TitleEntry, TitlePage};

    use super::{FactsOptions, derive};

    fn dialogue(character: &str) -> DocToken {
        DocToken::Dialogue {
            character: character.to_string(),
        }
    }

    fn heading(text: &str) -> DocToken {
        DocToken::SceneHeading {
            text: text.to_string(),
        }
    }

    fn sample() -> ParsedDocument {
        ParsedDocument {
            title_page: TitlePage {
                entries: vec![TitleEntry {
                    key: "title".into(),
                    value: "Brick & Steel".into(),
                }],
            },
            lines: vec![
                LineKind::SceneHeading,
                LineKind::Action,
                LineKind::Character,
                LineKind::Dialogue,
                LineKind::Dialogue,
                LineKind::Blank,
            ],
            tokens: vec![
                heading("INT. KITCHEN"),
                dialogue("STEEL"),
                dialogue("BRICK"),
                dialogue("STEEL"),
                heading("int. kitchen "),
                dialogue("DAN"),
            ],
        }
    }

    #[test]
    fn derivation_is_idempotent_on_unchanged_input() {
        let doc = sample();
        let options = FactsOptions::default();
        let first = derive(&doc, &options);
        let second = derive(&doc, &options);
        assert_eq!(first, second);
    }

    #[test]
    fn basics_count_by_category() {
        let derivation = derive(&sample(), &FactsOptions::default());
        let basics = derivation.snapshot.basics;
        assert_eq!(basics.total_lines, 6);
        assert_eq!(basics.scene_headings, 1);
        assert_eq!(basics.action_lines, 1);
        assert_eq!(basics.dialogue_lines, 2);
        assert_eq!(basics.character_cues, 1);
    }

    #[test]
    fn title_defaults_to_empty_when_missing() {
        let mut doc = sample();
        doc.title_page = TitlePage::default();
        let derivation = derive(&doc, &FactsOptions::default());
        assert_eq!(derivation.snapshot.title, "");
        assert!(!derivation.degraded);
    }

    #[test]
    fn blank_character_names_degrade_without_failing() {
        let mut doc = sample();
        doc.tokens.push(dialogue("   "));
        let derivation = derive(&doc, &FactsOptions::default());
        assert!(derivation.degraded);
        assert_eq!(derivation.snapshot.characters.len(), 3);
    }
}
