//! The external document renderer boundary.

use std::future::Future;
use std::pin::Pin;

/// Opaque artifact produced by the external renderer (e.g. PDF bytes).
/// The core never inspects it; it only routes it into a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderArtifact(pub Vec<u8>);

pub type BoxRenderFuture = Pin<Box<dyn Future<Output = anyhow::Result<RenderArtifact>> + Send>>;

/// Asynchronous renderer invoked with the current document content.
/// Implementations are black boxes; the core schedules them through the
/// refresh scheduler and discards results that complete stale.
pub trait DocumentRenderer: Send + Sync {
    fn render(&self, source: String) -> BoxRenderFuture;
}
