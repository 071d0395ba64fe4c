use crate::element::PageElement;
use crate::errors::SweepError;
use crate::selector::Selector;

/// The host-page collaborator contract.
///
/// Everything the engine knows about the third-party page goes through this
/// trait: enumeration, protection checks, affordance queries and the reload
/// request that drives the resume cycle. Concrete selectors live in
/// [`SweepConfig`](crate::config::SweepConfig); adapters only have to answer
/// instantaneous queries, since all polling and timeout bookkeeping happens
/// in [`Locator`](crate::locator::Locator).
pub trait PageSurface: Send + Sync {
    /// Run one instantaneous query and return every current match.
    ///
    /// Zero matches is not an error. `root` scopes the query to the
    /// descendants of a previously returned element.
    fn query(
        &self,
        selector: &Selector,
        root: Option<&PageElement>,
    ) -> Result<Vec<PageElement>, SweepError>;

    /// The container holding the enumerable entities (e.g. the history
    /// sidebar or the library table).
    ///
    /// Returns [`SweepError::HostUnavailable`] when the container is not in
    /// the page, e.g. the sidebar is collapsed.
    fn host_root(&self) -> Result<PageElement, SweepError>;

    /// Re-locate an entity by its durable id after a reload.
    ///
    /// Returns [`SweepError::StaleReference`] when the id no longer resolves.
    fn find_by_durable_id(&self, id: &str) -> Result<PageElement, SweepError>;

    /// Whether the entity is protected from bulk actions (e.g. pinned).
    fn is_protected(&self, element: &PageElement) -> bool;

    /// Request a page reload.
    ///
    /// The engine persists its resume token before calling this; the
    /// embedding re-enters orchestration through
    /// [`Orchestrator::resume_on_load`](crate::orchestrator::Orchestrator::resume_on_load)
    /// once the page is back.
    fn reload(&self);

    /// Idempotently install the user-facing controls into the page chrome.
    ///
    /// Background observers may call this at any time; returns `true` when
    /// controls were installed by this call and `false` when they were
    /// already present.
    fn install_controls(&self) -> bool;
}
