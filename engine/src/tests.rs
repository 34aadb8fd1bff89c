//! Unit tests for the engine crate.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};
use tokio::sync::oneshot;
use tokio::task::yield_now;

use callboard_facts::FactsOptions;
use callboard_types::{DocToken, ParsedDocument, PropertyPath, TitleEntry, TitlePage};

use crate::presenters::{
    CONFIG_MODEL, ContentPresenter, ContentView, FactsPresenter, FactsView, PreviewPresenter,
    PreviewView, SCRIPT_MODEL, THEME_MODEL,
};
use crate::render::{BoxRenderFuture, DocumentRenderer, RenderArtifact};
use crate::{
    BindingDecl, ConfigurationError, LifecycleError, ModelRegistry, Phase, Presenter, PresenterCx,
    SlotId, Stage, StageError,
};

fn path(raw: &str) -> PropertyPath {
    PropertyPath::parse(raw).expect("valid path")
}

fn models() -> ModelRegistry {
    let mut models = ModelRegistry::new();
    models.register(SCRIPT_MODEL, path("script")).expect("register script");
    models.register(CONFIG_MODEL, path("config")).expect("register config");
    models.register(THEME_MODEL, path("theme")).expect("register theme");
    models
}

fn dialogue(character: &str) -> DocToken {
    DocToken::Dialogue {
        character: character.to_string(),
    }
}

fn sample_document() -> ParsedDocument {
    ParsedDocument {
        title_page: TitlePage {
            entries: vec![TitleEntry {
                key: "title".into(),
                value: "Brick & Steel".into(),
            }],
        },
        lines: Vec::new(),
        tokens: vec![
            DocToken::SceneHeading {
                text: "INT. KITCHEN".into(),
            },
            dialogue("STEEL"),
            dialogue("STEEL"),
            dialogue("STEEL"),
            dialogue("BRICK"),
            dialogue("BRICK"),
            dialogue("DAN"),
            dialogue("JAKE"),
        ],
    }
}

/// Let spawned refresh jobs run to completion on the test runtime.
async fn settle() {
    for _ in 0..16 {
        yield_now().await;
    }
}

// ============================================================================
// Probe presenter - records slot invocations for ordering/coalescing tests
// ============================================================================

#[derive(Default)]
struct ProbeLog {
    hits: Vec<(&'static str, SlotId)>,
}

struct Probe {
    name: &'static str,
    decls: Vec<BindingDecl>,
    log: Rc<RefCell<ProbeLog>>,
    /// Optional write performed inside `on_change`, for re-entrancy tests.
    set_on_change: Option<(PropertyPath, Value)>,
}

impl Probe {
    fn new(name: &'static str, decls: Vec<BindingDecl>, log: Rc<RefCell<ProbeLog>>) -> Self {
        Self {
            name,
            decls,
            log,
            set_on_change: None,
        }
    }
}

impl Presenter for Probe {
    fn name(&self) -> &'static str {
        self.name
    }

    fn bindings(&self) -> Vec<BindingDecl> {
        self.decls.clone()
    }

    fn on_activate(&mut self, _cx: &mut PresenterCx<'_>) {}

    fn on_change(&mut self, slot: SlotId, cx: &mut PresenterCx<'_>) {
        self.log.borrow_mut().hits.push((self.name, slot));
        if let Some((target, value)) = self.set_on_change.clone() {
            cx.set(&target, value).expect("re-entrant set");
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Manual renderer - completes only when the test says so
// ============================================================================

#[derive(Default)]
struct ManualRenderer {
    senders: Mutex<Vec<oneshot::Sender<anyhow::Result<RenderArtifact>>>>,
}

impl ManualRenderer {
    fn complete(&self, index: usize, result: anyhow::Result<RenderArtifact>) {
        let sender = self.senders.lock().expect("renderer lock").remove(index);
        sender.send(result).expect("deliver render result");
    }

    fn pending(&self) -> usize {
        self.senders.lock().expect("renderer lock").len()
    }
}

impl DocumentRenderer for ManualRenderer {
    fn render(&self, _source: String) -> BoxRenderFuture {
        let (tx, rx) = oneshot::channel();
        self.senders.lock().expect("renderer lock").push(tx);
        Box::pin(async move {
            match rx.await {
                Ok(result) => result,
                Err(_) => Err(anyhow::anyhow!("render channel dropped")),
            }
        })
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn activate_then_deactivate_closes_all_bindings() {
    let mut stage = Stage::new();
    let log = Rc::new(RefCell::new(ProbeLog::default()));
    let probe = Probe::new(
        "probe",
        vec![
            BindingDecl::new(path("theme.width"), SlotId(0)),
            BindingDecl::new(path("theme.height"), SlotId(0)),
            BindingDecl::new(path("theme.expanded"), SlotId(1)),
        ],
        Rc::clone(&log),
    );
    let id = stage.add_presenter(Box::new(probe));
    assert_eq!(stage.phase_of(id), Some(Phase::Created));
    assert_eq!(stage.live_bindings(id), 0);

    stage.activate(id).expect("activate");
    assert_eq!(stage.phase_of(id), Some(Phase::Activated));
    assert_eq!(stage.live_bindings(id), 3);

    stage.deactivate(id).expect("deactivate");
    assert_eq!(stage.phase_of(id), Some(Phase::Deactivated));
    assert_eq!(stage.live_bindings(id), 0);

    // The cycle repeats without duplicating bindings.
    stage.activate(id).expect("re-activate");
    assert_eq!(stage.live_bindings(id), 3);
    stage.deactivate(id).expect("re-deactivate");
    assert_eq!(stage.live_bindings(id), 0);
}

#[test]
fn double_activate_and_double_deactivate_are_errors() {
    let mut stage = Stage::new();
    let log = Rc::new(RefCell::new(ProbeLog::default()));
    let id = stage.add_presenter(Box::new(Probe::new("probe", Vec::new(), log)));

    stage.activate(id).expect("activate");
    assert!(matches!(
        stage.activate(id),
        Err(StageError::Lifecycle(LifecycleError::AlreadyActive("probe")))
    ));

    stage.deactivate(id).expect("deactivate");
    assert!(matches!(
        stage.deactivate(id),
        Err(LifecycleError::NotActive("probe"))
    ));
}

#[test]
fn deactivated_presenter_receives_no_notifications() {
    let mut stage = Stage::new();
    let log = Rc::new(RefCell::new(ProbeLog::default()));
    let id = stage.add_presenter(Box::new(Probe::new(
        "probe",
        vec![BindingDecl::new(path("theme.width"), SlotId(0))],
        Rc::clone(&log),
    )));
    stage.activate(id).expect("activate");
    stage.deactivate(id).expect("deactivate");

    stage.set(&path("theme.width"), json!(80)).expect("set");
    assert!(log.borrow().hits.is_empty());
}

#[test]
fn failed_activation_rolls_back_bindings() {
    let mut stage = Stage::new();
    let log = Rc::new(RefCell::new(ProbeLog::default()));
    // Duplicate (path, slot) declaration: a setup error.
    let id = stage.add_presenter(Box::new(Probe::new(
        "probe",
        vec![
            BindingDecl::new(path("theme.width"), SlotId(0)),
            BindingDecl::new(path("theme.width"), SlotId(0)),
        ],
        log,
    )));
    assert!(matches!(
        stage.activate(id),
        Err(StageError::Configuration(
            ConfigurationError::DuplicateBinding { .. }
        ))
    ));
    assert_eq!(stage.live_bindings(id), 0);
    assert_eq!(stage.phase_of(id), Some(Phase::Created));
}

#[test]
fn unresolved_dependency_aborts_construction() {
    let models = ModelRegistry::new();
    let err = FactsPresenter::new(&models, FactsOptions::default()).expect_err("missing models");
    assert!(matches!(
        err,
        ConfigurationError::UnresolvedDependency(name) if name == SCRIPT_MODEL
    ));
}

// ============================================================================
// Notification semantics
// ============================================================================

#[test]
fn multi_path_slot_fires_once_per_batch() {
    let mut stage = Stage::new();
    let log = Rc::new(RefCell::new(ProbeLog::default()));
    let id = stage.add_presenter(Box::new(Probe::new(
        "panel",
        vec![
            BindingDecl::new(path("theme.width"), SlotId(0)),
            BindingDecl::new(path("theme.height"), SlotId(0)),
        ],
        Rc::clone(&log),
    )));
    stage.activate(id).expect("activate");

    stage
        .batch(|cx| {
            cx.set(&path("theme.width"), json!(120))?;
            cx.set(&path("theme.height"), json!(40))
        })
        .expect("batch");

    assert_eq!(log.borrow().hits.len(), 1);

    // Separate batches fire separately.
    stage.set(&path("theme.width"), json!(90)).expect("set");
    assert_eq!(log.borrow().hits.len(), 2);
}

#[test]
fn subtree_watch_notifies_prefix_subscribers_only() {
    let mut stage = Stage::new();
    let log = Rc::new(RefCell::new(ProbeLog::default()));
    let id = stage.add_presenter(Box::new(Probe::new(
        "watcher",
        vec![
            BindingDecl::new(path("theme.sections"), SlotId(0)),
            BindingDecl::new(path("theme.sections.selected.extra"), SlotId(1)),
        ],
        Rc::clone(&log),
    )));
    stage.activate(id).expect("activate");

    stage
        .set(&path("theme.sections.selected"), json!("facts"))
        .expect("set");

    // The prefix binding fired; the deeper binding did not.
    let hits = log.borrow().hits.clone();
    assert_eq!(hits, vec![("watcher", SlotId(0))]);
}

#[test]
fn notifications_fire_in_registration_order() {
    let mut stage = Stage::new();
    let log = Rc::new(RefCell::new(ProbeLog::default()));
    let first = stage.add_presenter(Box::new(Probe::new(
        "first",
        vec![BindingDecl::new(path("script.content"), SlotId(0))],
        Rc::clone(&log),
    )));
    let second = stage.add_presenter(Box::new(Probe::new(
        "second",
        vec![BindingDecl::new(path("script.content"), SlotId(0))],
        Rc::clone(&log),
    )));
    stage.activate(first).expect("activate first");
    stage.activate(second).expect("activate second");

    stage
        .set(&path("script.content"), json!("INT. KITCHEN"))
        .expect("set");

    let hits = log.borrow().hits.clone();
    assert_eq!(hits, vec![("first", SlotId(0)), ("second", SlotId(0))]);
}

#[test]
fn reentrant_set_of_observed_path_fires_once_per_batch() {
    let mut stage = Stage::new();
    let log = Rc::new(RefCell::new(ProbeLog::default()));
    let mut probe = Probe::new(
        "echo",
        vec![BindingDecl::new(path("theme.width"), SlotId(0))],
        Rc::clone(&log),
    );
    // The callback writes the path it observes; without the per-batch guard
    // this would recurse forever.
    probe.set_on_change = Some((path("theme.width"), json!(1)));
    let id = stage.add_presenter(Box::new(probe));
    stage.activate(id).expect("activate");

    stage.set(&path("theme.width"), json!(0)).expect("set");
    assert_eq!(log.borrow().hits.len(), 1);

    // The guard is per batch, not permanent.
    stage.set(&path("theme.width"), json!(2)).expect("set");
    assert_eq!(log.borrow().hits.len(), 2);
}

#[test]
fn batch_error_still_flushes_applied_sets() {
    let mut stage = Stage::new();
    let log = Rc::new(RefCell::new(ProbeLog::default()));
    let id = stage.add_presenter(Box::new(Probe::new(
        "probe",
        vec![BindingDecl::new(path("theme.width"), SlotId(0))],
        Rc::clone(&log),
    )));
    stage.activate(id).expect("activate");
    stage.set(&path("script.content"), json!("text")).expect("seed");

    let result = stage.batch(|cx| {
        cx.set(&path("theme.width"), json!(55))?;
        // Traverses through a scalar: rejected, the earlier set stands.
        cx.set(&path("script.content.nested"), json!(1))
    });
    assert!(matches!(
        result,
        Err(ConfigurationError::NotAContainer { .. })
    ));
    assert_eq!(stage.get(&path("theme.width")), Some(&json!(55)));
    assert_eq!(log.borrow().hits.len(), 1);
}

// ============================================================================
// Facts presenter
// ============================================================================

#[test]
fn initial_refresh_populates_the_facts_view() {
    let models = models();
    let mut stage = Stage::new();
    let parsed = serde_json::to_value(sample_document()).expect("serialize document");
    stage.set(&path("script.parsed"), parsed).expect("seed document");
    stage
        .set(&path("config.each_scene_on_new_page"), json!(true))
        .expect("seed config");

    let presenter =
        FactsPresenter::new(&models, FactsOptions::default()).expect("construct presenter");
    let id = stage.add_presenter(Box::new(presenter));
    stage.activate(id).expect("activate");

    // No mutation happened after activation; the view is already populated.
    let view = &stage.presenter::<FactsPresenter>(id).expect("typed access").view;
    assert_eq!(view.facts.title, "Brick & Steel");
    assert!(view.each_scene_on_new_page);
    assert_eq!(view.facts.locations.len(), 1);
    assert_eq!(view.facts.locations[0].normalized_name, "INT. KITCHEN");

    // Defaults: first three ranked characters are primary, the rest secondary.
    let primary: Vec<&str> = view
        .primary_characters
        .iter()
        .map(|record| record.name.as_str())
        .collect();
    assert_eq!(primary, ["STEEL", "BRICK", "DAN"]);
    let secondary: Vec<&str> = view
        .secondary_characters
        .iter()
        .map(|record| record.name.as_str())
        .collect();
    assert_eq!(secondary, ["JAKE"]);
    assert!(!view.degraded);
}

#[test]
fn facts_view_tracks_document_changes_and_flags_degradation() {
    let models = models();
    let mut stage = Stage::new();
    let presenter =
        FactsPresenter::new(&models, FactsOptions::default()).expect("construct presenter");
    let id = stage.add_presenter(Box::new(presenter));
    stage.activate(id).expect("activate");

    // Empty store derives as an empty snapshot.
    let view = stage.presenter::<FactsPresenter>(id).expect("typed access").view.clone();
    assert_eq!(view, FactsView::default());

    let mut doc = sample_document();
    doc.tokens.push(dialogue("  "));
    let parsed = serde_json::to_value(doc).expect("serialize document");
    stage.set(&path("script.parsed"), parsed).expect("set document");

    let view = &stage.presenter::<FactsPresenter>(id).expect("typed access").view;
    assert_eq!(view.facts.title, "Brick & Steel");
    assert!(view.degraded);
}

#[test]
fn corrupt_parsed_document_is_flagged_degraded() {
    let models = models();
    let mut stage = Stage::new();
    let id = stage.add_presenter(Box::new(
        FactsPresenter::new(&models, FactsOptions::default()).expect("construct presenter"),
    ));
    stage.activate(id).expect("activate");

    // A stored value that does not deserialize into a document must not
    // pass itself off as a clean empty snapshot.
    stage
        .set(&path("script.parsed"), json!("not a document"))
        .expect("set corrupt value");
    let view = &stage.presenter::<FactsPresenter>(id).expect("typed access").view;
    assert!(view.degraded);
    assert_eq!(view.facts, FactsView::default().facts);

    // A valid document replacing the corrupt one clears the flag.
    let parsed = serde_json::to_value(sample_document()).expect("serialize document");
    stage.set(&path("script.parsed"), parsed).expect("set document");
    let view = &stage.presenter::<FactsPresenter>(id).expect("typed access").view;
    assert!(!view.degraded);
    assert_eq!(view.facts.title, "Brick & Steel");
}

// ============================================================================
// Content presenter
// ============================================================================

#[test]
fn content_panel_geometry_and_visibility() {
    let models = models();
    let mut stage = Stage::new();
    let presenter = ContentPresenter::new(&models).expect("construct presenter");
    let id = stage.add_presenter(Box::new(presenter));
    stage.activate(id).expect("activate");

    stage
        .batch(|cx| {
            cx.set(&path("theme.width"), json!(100))?;
            cx.set(&path("theme.height"), json!(40))?;
            cx.set(&path("theme.content_width"), json!(60))?;
            cx.set(&path("theme.sections.selected"), json!("facts"))?;
            cx.set(&path("theme.expanded"), json!(true))
        })
        .expect("batch");

    let view: ContentView = stage.presenter::<ContentPresenter>(id).expect("typed access").view;
    assert!(view.visible);
    assert!(view.expanded);
    assert_eq!(view.height, 40);
    assert_eq!(view.left, 20);

    // Small screens pin the panel to the left edge.
    stage.set(&path("theme.small"), json!(true)).expect("set small");
    stage.set(&path("theme.width"), json!(30)).expect("shrink");
    let view: ContentView = stage.presenter::<ContentPresenter>(id).expect("typed access").view;
    assert_eq!(view.left, 0);

    // Deselecting hides the panel.
    stage
        .set(&path("theme.sections.selected"), json!(null))
        .expect("deselect");
    let view: ContentView = stage.presenter::<ContentPresenter>(id).expect("typed access").view;
    assert!(!view.visible);
}

// ============================================================================
// Preview presenter - deferred rendering and stale-result discard
// ============================================================================

fn preview_stage(renderer: &Arc<ManualRenderer>) -> (Stage, crate::PresenterId) {
    let models = models();
    let mut stage = Stage::new();
    let presenter = PreviewPresenter::new(
        &models,
        Arc::clone(renderer) as Arc<dyn DocumentRenderer>,
    )
    .expect("construct presenter");
    let id = stage.add_presenter(Box::new(presenter));
    (stage, id)
}

fn preview_view(stage: &Stage, id: crate::PresenterId) -> PreviewView {
    stage
        .presenter::<PreviewPresenter>(id)
        .expect("typed access")
        .view
        .clone()
}

#[tokio::test]
async fn completed_render_reaches_the_view() {
    let renderer = Arc::new(ManualRenderer::default());
    let (mut stage, id) = preview_stage(&renderer);
    stage.set(&path("script.content"), json!("INT. KITCHEN")).expect("seed");
    stage.activate(id).expect("activate");
    // The spawned job invokes the renderer on its first poll.
    settle().await;
    assert_eq!(renderer.pending(), 1);

    renderer.complete(0, Ok(RenderArtifact(vec![1, 2, 3])));
    settle().await;
    stage.pump_jobs();

    let view = preview_view(&stage, id);
    assert_eq!(view.artifact, Some(RenderArtifact(vec![1, 2, 3])));
    assert_eq!(view.error, None);
}

#[tokio::test]
async fn superseded_render_result_is_discarded() {
    let renderer = Arc::new(ManualRenderer::default());
    let (mut stage, id) = preview_stage(&renderer);
    stage.activate(id).expect("activate");
    settle().await;

    // A content change supersedes the render scheduled on activation.
    stage.set(&path("script.content"), json!("v2")).expect("set");
    settle().await;
    assert_eq!(renderer.pending(), 2);

    // The stale job completes first; its result must never reach the view.
    renderer.complete(0, Ok(RenderArtifact(b"stale".to_vec())));
    settle().await;
    stage.pump_jobs();
    assert_eq!(preview_view(&stage, id), PreviewView::default());

    renderer.complete(0, Ok(RenderArtifact(b"fresh".to_vec())));
    settle().await;
    stage.pump_jobs();
    assert_eq!(
        preview_view(&stage, id).artifact,
        Some(RenderArtifact(b"fresh".to_vec()))
    );
}

#[tokio::test]
async fn deactivation_discards_in_flight_render() {
    let renderer = Arc::new(ManualRenderer::default());
    let (mut stage, id) = preview_stage(&renderer);
    stage.activate(id).expect("activate");
    settle().await;
    assert_eq!(renderer.pending(), 1);

    stage.deactivate(id).expect("deactivate");
    renderer.complete(0, Ok(RenderArtifact(b"late".to_vec())));
    settle().await;
    stage.pump_jobs();

    // The view is unchanged from its deactivation-time value.
    assert_eq!(preview_view(&stage, id), PreviewView::default());
}

#[tokio::test]
async fn render_failure_is_an_explicit_error_state() {
    let renderer = Arc::new(ManualRenderer::default());
    let (mut stage, id) = preview_stage(&renderer);
    stage.activate(id).expect("activate");
    settle().await;

    renderer.complete(0, Ok(RenderArtifact(b"good".to_vec())));
    settle().await;
    stage.pump_jobs();
    assert!(preview_view(&stage, id).artifact.is_some());

    // The next render fails: the stale artifact must not be retained.
    stage.set(&path("script.content"), json!("v2")).expect("set");
    settle().await;
    renderer.complete(0, Err(anyhow::anyhow!("ghostscript exploded")));
    settle().await;
    stage.pump_jobs();

    let view = preview_view(&stage, id);
    assert_eq!(view.artifact, None);
    let error = view.error.expect("error state");
    assert!(error.contains("ghostscript exploded"));
}
