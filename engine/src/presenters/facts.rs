//! Facts panel: derived screenplay statistics.

use std::any::Any;

use serde_json::Value;

use callboard_facts::FactsOptions;
use callboard_types::{CharacterRecord, FactsSnapshot, ParsedDocument, PropertyPath};

use crate::error::ConfigurationError;
use crate::injector::ModelRegistry;
use crate::presenter::{BindingDecl, Presenter, PresenterCx, SlotId};
use crate::presenters::{CONFIG_MODEL, SCRIPT_MODEL};

const REFRESH: SlotId = SlotId(0);

/// Typed view state for the facts panel. Replaced wholesale on every
/// refresh; never partially mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactsView {
    pub facts: FactsSnapshot,
    pub each_scene_on_new_page: bool,
    pub primary_characters: Vec<CharacterRecord>,
    pub secondary_characters: Vec<CharacterRecord>,
    /// Set when derivation skipped malformed tokens.
    pub degraded: bool,
}

/// Recomputes the facts snapshot whenever the parsed document or the
/// relevant configuration flag changes. Both paths share one slot, so a
/// batch touching several of them still triggers a single derivation.
#[derive(Debug)]
pub struct FactsPresenter {
    parsed_path: PropertyPath,
    new_page_path: PropertyPath,
    options: FactsOptions,
    pub view: FactsView,
}

impl FactsPresenter {
    /// Resolves the injected script and config models once; an unresolved
    /// name aborts construction.
    pub fn new(models: &ModelRegistry, options: FactsOptions) -> Result<Self, ConfigurationError> {
        let script = models.resolve(SCRIPT_MODEL)?;
        let config = models.resolve(CONFIG_MODEL)?;
        Ok(Self {
            parsed_path: script.path("parsed")?,
            new_page_path: config.path("each_scene_on_new_page")?,
            options,
            view: FactsView::default(),
        })
    }

    fn refresh(&mut self, cx: &mut PresenterCx<'_>) {
        // An absent document derives as empty. A present value that does
        // not deserialize is a corrupt document: derive empty, but flag the
        // view as degraded rather than passing it off as a clean snapshot.
        let (doc, corrupt) = match cx.get(&self.parsed_path) {
            None => (ParsedDocument::default(), false),
            Some(value) => match serde_json::from_value(value.clone()) {
                Ok(doc) => (doc, false),
                Err(err) => {
                    tracing::warn!("stored parsed document does not deserialize: {err}");
                    (ParsedDocument::default(), true)
                }
            },
        };
        let derivation = callboard_facts::derive(&doc, &self.options);
        let each_scene_on_new_page = cx
            .get(&self.new_page_path)
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let by_level = |level: u8| -> Vec<CharacterRecord> {
            derivation
                .snapshot
                .characters
                .iter()
                .filter(|record| record.level == level)
                .cloned()
                .collect()
        };
        let primary_characters = by_level(1);
        let secondary_characters = by_level(2);

        self.view = FactsView {
            facts: derivation.snapshot,
            each_scene_on_new_page,
            primary_characters,
            secondary_characters,
            degraded: derivation.degraded || corrupt,
        };
    }
}

impl Presenter for FactsPresenter {
    fn name(&self) -> &'static str {
        "facts"
    }

    fn bindings(&self) -> Vec<BindingDecl> {
        vec![
            BindingDecl::new(self.parsed_path.clone(), REFRESH),
            BindingDecl::new(self.new_page_path.clone(), REFRESH),
        ]
    }

    fn on_activate(&mut self, cx: &mut PresenterCx<'_>) {
        self.refresh(cx);
    }

    fn on_change(&mut self, _slot: SlotId, cx: &mut PresenterCx<'_>) {
        self.refresh(cx);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
