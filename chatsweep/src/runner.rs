use tracing::{debug, instrument, warn};

use crate::config::SweepConfig;
use crate::element::{PageElement, SerializablePageElement};
use crate::errors::SweepError;
use crate::Page;

/// Executes the per-item deletion protocol: trigger, delete entry, confirm.
///
/// Each step's failure is terminal for the item but never for the run; the
/// orchestrator decides whether the run continues. There is no per-step
/// retry: a surface that did not appear within its timeout is reported as
/// the corresponding missing-affordance error.
pub struct ActionRunner {
    page: Page,
    config: SweepConfig,
}

impl ActionRunner {
    pub fn new(page: Page, config: SweepConfig) -> Self {
        Self { page, config }
    }

    /// Delete one entity through the page's own UI.
    ///
    /// Once started, the sequence runs to completion or to its first failed
    /// step; cancellation is the orchestrator's business and only happens
    /// between items.
    #[instrument(level = "debug", skip(self, item), fields(item = %item.text()))]
    pub async fn delete_item(&self, item: &PageElement) -> Result<(), SweepError> {
        debug!(entity = ?SerializablePageElement::from(item), "starting delete protocol");

        // Hover-only affordances need to be made interactable first.
        item.reveal()?;

        // 1. The options/menu control. Queried once, no wait: an entity whose
        //    trigger is not in the page is skipped, not retried.
        let trigger = self
            .page
            .query(&self.config.trigger, Some(item))?
            .into_iter()
            .next()
            .ok_or_else(|| {
                SweepError::TriggerMissing(format!(
                    "no {:?} under entity {:?}",
                    self.config.trigger,
                    item.text()
                ))
            })?;

        trigger.click()?;
        tokio::time::sleep(self.config.action_delay).await;

        // 2. The delete command inside the options surface.
        let delete_entry = match self
            .page
            .locator(self.config.delete_entry.clone())
            .set_default_timeout(self.config.menu_timeout)
            .poll_every(self.config.poll_interval)
            .wait(None)
            .await
        {
            Ok(entry) => entry,
            Err(SweepError::Timeout(msg)) => {
                self.dismiss_overlays();
                return Err(SweepError::MenuItemMissing(msg));
            }
            Err(e) => return Err(e),
        };

        delete_entry.click()?;
        tokio::time::sleep(self.config.action_delay).await;

        // 3. The confirmation surface.
        let confirm = match self
            .page
            .locator(self.config.confirm.clone())
            .set_default_timeout(self.config.menu_timeout)
            .poll_every(self.config.poll_interval)
            .wait(None)
            .await
        {
            Ok(control) => control,
            Err(SweepError::Timeout(msg)) => {
                self.dismiss_overlays();
                return Err(SweepError::ConfirmMissing(msg));
            }
            Err(e) => return Err(e),
        };

        confirm.click()?;

        // Let the page run its own removal animation before reporting success.
        tokio::time::sleep(self.config.settle_delay).await;
        debug!("entity deleted");
        Ok(())
    }

    /// Best-effort click on the configured backdrop so a half-open menu does
    /// not wedge the page after a failed step.
    fn dismiss_overlays(&self) {
        let Some(selector) = &self.config.dismiss else {
            return;
        };
        match self.page.query(selector, None) {
            Ok(backdrops) => {
                if let Some(backdrop) = backdrops.first() {
                    if let Err(e) = backdrop.click() {
                        warn!(error = %e, "failed to dismiss overlay");
                    }
                }
            }
            Err(e) => warn!(error = %e, "overlay query failed"),
        }
    }
}
