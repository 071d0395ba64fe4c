//! Resumable bulk actions over chat history surfaces
//!
//! This crate drives bulk deletion of chat history entries through the host
//! page's own UI, inspired by Playwright's automation model: an opaque
//! [`PageSurface`] answers instantaneous queries, a polling [`Locator`] turns
//! them into bounded waits, and an [`Orchestrator`] advances a checkpointed
//! work queue that survives page reloads.

use std::sync::Arc;
use tracing::instrument;

pub mod checkpoint;
pub mod config;
pub mod element;
pub mod errors;
pub mod locator;
pub mod orchestrator;
pub mod runner;
pub mod selector;
pub mod surface;

pub use checkpoint::{CheckpointStore, KeyValueStore, MemoryStore, RunMode, RunState};
pub use config::SweepConfig;
pub use element::{PageElement, PageElementImpl, SerializablePageElement};
pub use errors::SweepError;
pub use locator::Locator;
pub use orchestrator::{
    AutoConfirm, ConfirmGate, LogProgress, Orchestrator, Phase, ProgressSink, RunOutcome,
    RunRequest, RunSummary, RunTurn,
};
pub use runner::ActionRunner;
pub use selector::Selector;
pub use surface::PageSurface;

/// The main entry point: a handle over the live host page
///
/// Wraps the host-page adapter and hands out [`Locator`]s for waiting on
/// elements. Cheap to clone; all clones talk to the same surface.
pub struct Page {
    surface: Arc<dyn PageSurface>,
}

impl Page {
    pub fn new(surface: Arc<dyn PageSurface>) -> Self {
        Self { surface }
    }

    #[instrument(skip(self, selector))]
    pub fn locator(&self, selector: impl Into<Selector>) -> Locator {
        Locator::new(self.surface.clone(), selector.into())
    }

    /// One instantaneous query against the surface, no waiting.
    pub fn query(
        &self,
        selector: &Selector,
        root: Option<&PageElement>,
    ) -> Result<Vec<PageElement>, SweepError> {
        self.surface.query(selector, root)
    }

    /// The container holding the enumerable entities.
    pub fn host_root(&self) -> Result<PageElement, SweepError> {
        self.surface.host_root()
    }

    pub fn find_by_durable_id(&self, id: &str) -> Result<PageElement, SweepError> {
        self.surface.find_by_durable_id(id)
    }

    pub fn is_protected(&self, element: &PageElement) -> bool {
        self.surface.is_protected(element)
    }

    /// Request a page reload; orchestration re-enters on the next load.
    pub fn reload(&self) {
        self.surface.reload()
    }

    /// Idempotently install the user-facing controls.
    pub fn install_controls(&self) -> bool {
        self.surface.install_controls()
    }
}

impl Clone for Page {
    fn clone(&self) -> Self {
        Self {
            surface: self.surface.clone(),
        }
    }
}
