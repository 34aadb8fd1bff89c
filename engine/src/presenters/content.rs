//! Theme content panel: visibility, geometry, and expansion state.

use std::any::Any;

use serde_json::Value;

use callboard_types::PropertyPath;

use crate::error::ConfigurationError;
use crate::injector::ModelRegistry;
use crate::presenter::{BindingDecl, Presenter, PresenterCx, SlotId};
use crate::presenters::THEME_MODEL;

const VISIBILITY: SlotId = SlotId(0);
const SIZE: SlotId = SlotId(1);
const EXPANDED: SlotId = SlotId(2);

/// Typed view state for the content panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentView {
    pub visible: bool,
    pub height: u64,
    pub left: u64,
    pub expanded: bool,
}

/// Tracks the theme model. The size slot is bound to the selected section,
/// width, and height together: a panel's geometry depends on all three, so
/// one batch changing any combination of them recomputes it exactly once.
pub struct ContentPresenter {
    selected_path: PropertyPath,
    width_path: PropertyPath,
    height_path: PropertyPath,
    expanded_path: PropertyPath,
    small_path: PropertyPath,
    content_width_path: PropertyPath,
    pub view: ContentView,
}

impl ContentPresenter {
    pub fn new(models: &ModelRegistry) -> Result<Self, ConfigurationError> {
        let theme = models.resolve(THEME_MODEL)?;
        Ok(Self {
            selected_path: theme.path("sections.selected")?,
            width_path: theme.path("width")?,
            height_path: theme.path("height")?,
            expanded_path: theme.path("expanded")?,
            small_path: theme.path("small")?,
            content_width_path: theme.path("content_width")?,
            view: ContentView::default(),
        })
    }

    fn update_visibility(&mut self, cx: &mut PresenterCx<'_>) {
        self.view.visible = cx
            .get(&self.selected_path)
            .is_some_and(|value| !value.is_null() && value.as_bool() != Some(false));
    }

    fn update_size(&mut self, cx: &mut PresenterCx<'_>) {
        let width = read_u64(cx, &self.width_path);
        let height = read_u64(cx, &self.height_path);
        let content_width = read_u64(cx, &self.content_width_path);
        let small = cx
            .get(&self.small_path)
            .and_then(Value::as_bool)
            .unwrap_or(false);

        self.view.height = height;
        self.view.left = if small {
            0
        } else {
            width.saturating_sub(content_width) / 2
        };
    }

    fn update_expanded(&mut self, cx: &mut PresenterCx<'_>) {
        self.view.expanded = cx
            .get(&self.expanded_path)
            .and_then(Value::as_bool)
            .unwrap_or(false);
        self.update_size(cx);
    }
}

fn read_u64(cx: &PresenterCx<'_>, path: &PropertyPath) -> u64 {
    cx.get(path).and_then(Value::as_u64).unwrap_or(0)
}

impl Presenter for ContentPresenter {
    fn name(&self) -> &'static str {
        "content"
    }

    fn bindings(&self) -> Vec<BindingDecl> {
        vec![
            BindingDecl::new(self.selected_path.clone(), VISIBILITY),
            BindingDecl::new(self.selected_path.clone(), SIZE),
            BindingDecl::new(self.width_path.clone(), SIZE),
            BindingDecl::new(self.height_path.clone(), SIZE),
            BindingDecl::new(self.expanded_path.clone(), EXPANDED),
        ]
    }

    fn on_activate(&mut self, cx: &mut PresenterCx<'_>) {
        self.update_visibility(cx);
        self.update_expanded(cx);
    }

    fn on_change(&mut self, slot: SlotId, cx: &mut PresenterCx<'_>) {
        match slot {
            VISIBILITY => self.update_visibility(cx),
            SIZE => self.update_size(cx),
            EXPANDED => self.update_expanded(cx),
            other => tracing::warn!("content presenter received unknown slot {other:?}"),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
