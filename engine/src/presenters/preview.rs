//! Preview panel: deferred document rendering.

use std::any::Any;
use std::sync::Arc;

use serde_json::Value;

use callboard_types::PropertyPath;

use crate::error::{AsyncJobError, ConfigurationError};
use crate::injector::ModelRegistry;
use crate::presenter::{BindingDecl, Presenter, PresenterCx, SlotId};
use crate::presenters::SCRIPT_MODEL;
use crate::render::{DocumentRenderer, RenderArtifact};
use crate::scheduler::JobPayload;

const RENDER: SlotId = SlotId(0);

/// Typed view state for the preview panel. A failed render is an explicit
/// error state, never a silently retained stale artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviewView {
    pub artifact: Option<RenderArtifact>,
    pub error: Option<String>,
}

/// Schedules a render whenever the script content changes and applies the
/// result only if it is still current: a newer schedule or a deactivation
/// discards an in-flight render's output.
pub struct PreviewPresenter {
    content_path: PropertyPath,
    renderer: Arc<dyn DocumentRenderer>,
    pub view: PreviewView,
}

impl PreviewPresenter {
    pub fn new(
        models: &ModelRegistry,
        renderer: Arc<dyn DocumentRenderer>,
    ) -> Result<Self, ConfigurationError> {
        let script = models.resolve(SCRIPT_MODEL)?;
        Ok(Self {
            content_path: script.path("content")?,
            renderer,
            view: PreviewView::default(),
        })
    }

    fn request_render(&mut self, cx: &mut PresenterCx<'_>) {
        let source = cx
            .get(&self.content_path)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let renderer = Arc::clone(&self.renderer);
        cx.schedule(async move {
            let artifact = renderer.render(source).await?;
            Ok(Box::new(artifact) as JobPayload)
        });
    }
}

impl Presenter for PreviewPresenter {
    fn name(&self) -> &'static str {
        "preview"
    }

    fn bindings(&self) -> Vec<BindingDecl> {
        vec![BindingDecl::new(self.content_path.clone(), RENDER)]
    }

    fn on_activate(&mut self, cx: &mut PresenterCx<'_>) {
        self.request_render(cx);
    }

    fn on_change(&mut self, _slot: SlotId, cx: &mut PresenterCx<'_>) {
        self.request_render(cx);
    }

    fn on_job_complete(
        &mut self,
        result: Result<JobPayload, AsyncJobError>,
        _cx: &mut PresenterCx<'_>,
    ) {
        match result {
            Ok(payload) => match payload.downcast::<RenderArtifact>() {
                Ok(artifact) => {
                    self.view = PreviewView {
                        artifact: Some(*artifact),
                        error: None,
                    };
                }
                Err(_) => {
                    tracing::warn!("preview job returned an unexpected payload type");
                    self.view = PreviewView {
                        artifact: None,
                        error: Some("unexpected render payload".to_string()),
                    };
                }
            },
            Err(err) => {
                tracing::warn!("preview render failed: {err}");
                self.view = PreviewView {
                    artifact: None,
                    error: Some(err.to_string()),
                };
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
