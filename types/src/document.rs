//! Output types of the external screenplay tokenizer.
//!
//! The tokenizer itself is a black box; the presentation core only consumes
//! its output: a title page, a per-line classification sequence, and a typed
//! token stream.

use serde::{Deserialize, Serialize};

/// Classification of one source line, used for aggregate statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    SceneHeading,
    Action,
    Character,
    Dialogue,
    Parenthetical,
    Transition,
    Section,
    Synopsis,
    Blank,
    Other,
}

/// One key/value entry from the title page block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleEntry {
    pub key: String,
    pub value: String,
}

/// The title-metadata block, in source order. Keys may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitlePage {
    pub entries: Vec<TitleEntry>,
}

impl TitlePage {
    /// First non-blank value stored under `key` (case-insensitive), if any.
    #[must_use]
    pub fn first_text(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .filter(|entry| entry.key.eq_ignore_ascii_case(key))
            .map(|entry| entry.value.trim())
            .find(|value| !value.is_empty())
    }
}

/// Typed token stream entries the facts pipeline consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocToken {
    /// One spoken line attributed to a character, name in written form.
    Dialogue { character: String },
    /// A scene heading such as `INT. KITCHEN - DAY`.
    SceneHeading { text: String },
    /// Anything else the tokenizer emits; not used for derivation.
    Other,
}

/// Everything the tokenizer hands to the presentation core for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub title_page: TitlePage,
    pub lines: Vec<LineKind>,
    pub tokens: Vec<DocToken>,
}

#[cfg(test)]
mod tests {
    use super::{TitleEntry, TitlePage};

    #[test]
    fn first_text_skips_blank_values_and_ignores_case() {
        let page = TitlePage {
            entries: vec![
                TitleEntry { key: "Title".into(), value: "   ".into() },
                TitleEntry { key: "credit".into(), value: "by".into() },
                TitleEntry { key: "TITLE".into(), value: "  Big Fish  ".into() },
            ],
        };
        assert_eq!(page.first_text("title"), Some("Big Fish"));
        assert_eq!(page.first_text("author"), None);
    }
}
