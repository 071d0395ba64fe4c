use thiserror::Error;

#[derive(Error, Debug)]
pub enum SweepError {
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Trigger control missing: {0}")]
    TriggerMissing(String),

    #[error("Delete entry missing from options menu: {0}")]
    MenuItemMissing(String),

    #[error("Confirmation control missing: {0}")]
    ConfirmMissing(String),

    #[error("Stale reference, entity no longer resolves: {0}")]
    StaleReference(String),

    #[error("Host surface unavailable: {0}")]
    HostUnavailable(String),

    #[error("A bulk run is already in progress")]
    RunInProgress,

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),
}

impl SweepError {
    /// True for error kinds that are confined to a single work item.
    ///
    /// Item-level failures are counted and the run moves on; everything else
    /// is surfaced to the caller before any item is attempted.
    pub fn is_item_failure(&self) -> bool {
        matches!(
            self,
            SweepError::ElementNotFound(_)
                | SweepError::Timeout(_)
                | SweepError::TriggerMissing(_)
                | SweepError::MenuItemMissing(_)
                | SweepError::ConfirmMissing(_)
                | SweepError::StaleReference(_)
        )
    }
}
