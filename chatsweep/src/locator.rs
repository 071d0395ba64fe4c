use tracing::{debug, instrument};

use crate::element::PageElement;
use crate::errors::SweepError;
use crate::selector::Selector;
use crate::surface::PageSurface;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

// Defaults if none are specified on the locator itself
const DEFAULT_LOCATOR_TIMEOUT: Duration = Duration::from_secs(3);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// A high-level API for finding elements on the host page
///
/// The locator polls the surface until a match appears or the timeout
/// elapses. The first check runs immediately, and the poll loop owns its
/// sleep, so no timer outlives a resolved wait.
#[derive(Clone)]
pub struct Locator {
    surface: Arc<dyn PageSurface>,
    selector: Selector,
    timeout: Duration, // Default timeout for this locator instance
    poll_interval: Duration,
    root: Option<PageElement>,
}

impl Locator {
    /// Create a new locator with the given selector
    pub(crate) fn new(surface: Arc<dyn PageSurface>, selector: Selector) -> Self {
        Self {
            surface,
            selector,
            timeout: DEFAULT_LOCATOR_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            root: None,
        }
    }

    /// Set a default timeout for waiting operations on this locator instance.
    /// This timeout is used if no specific timeout is passed to `wait`.
    pub fn set_default_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set how often the surface is re-queried while waiting.
    pub fn poll_every(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the root element for this locator
    pub fn within(mut self, element: PageElement) -> Self {
        self.root = Some(element);
        self
    }

    /// Get all elements currently matching this locator, without waiting.
    pub fn all(&self) -> Result<Vec<PageElement>, SweepError> {
        self.surface.query(&self.selector, self.root.as_ref())
    }

    /// Get the first element currently matching this locator, without waiting.
    pub fn try_first(&self) -> Result<Option<PageElement>, SweepError> {
        Ok(self.all()?.into_iter().next())
    }

    /// Wait for an element matching the locator to appear, up to the specified
    /// timeout. If no timeout is provided, uses the locator's default timeout.
    #[instrument(level = "debug", skip(self, timeout))]
    pub async fn wait(&self, timeout: Option<Duration>) -> Result<PageElement, SweepError> {
        debug!("Waiting for element matching selector: {:?}", self.selector);
        let effective_timeout = timeout.unwrap_or(self.timeout);
        let deadline = Instant::now() + effective_timeout;

        loop {
            // First check happens before any sleep
            if let Some(element) = self.try_first()? {
                return Ok(element);
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(SweepError::Timeout(format!(
                    "Timed out after {effective_timeout:?} waiting for element {:?}",
                    self.selector
                )));
            }

            // Never sleep past the deadline
            let nap = self.poll_interval.min(deadline - now);
            tokio::time::sleep(nap).await;
        }
    }

    /// Get a nested locator, scoped to the current selector's match chain.
    pub fn locator(&self, selector: impl Into<Selector>) -> Locator {
        let mut new_chain = match self.selector.clone() {
            Selector::Chain(existing_chain) => existing_chain,
            s => vec![s],
        };

        // Append the new selector, flattening if it's also a chain
        match selector.into() {
            Selector::Chain(mut next_chain_parts) => {
                new_chain.append(&mut next_chain_parts);
            }
            s => new_chain.push(s),
        }

        Locator {
            surface: self.surface.clone(),
            selector: Selector::Chain(new_chain),
            timeout: self.timeout,
            poll_interval: self.poll_interval,
            root: self.root.clone(),
        }
    }

    pub fn selector_string(&self) -> String {
        format!("{:?}", self.selector)
    }
}
