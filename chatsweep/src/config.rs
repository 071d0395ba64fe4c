use std::time::Duration;

use crate::selector::Selector;

/// Tuning knobs and affordance selectors for a sweep.
///
/// The five selectors are the whole of what the engine knows about the host
/// page's markup; swapping them retargets the engine to a different page
/// without touching any logic.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Enumerates candidate entities under the host root.
    pub candidates: Selector,
    /// The per-entity options/menu control, scoped to a candidate.
    pub trigger: Selector,
    /// The delete command inside the opened options surface.
    pub delete_entry: Selector,
    /// The confirm control inside the confirmation surface.
    pub confirm: Selector,
    /// Optional backdrop/overlay used to dismiss a half-open menu after a
    /// failed step.
    pub dismiss: Option<Selector>,

    /// Timeout for the options and confirmation surfaces to appear.
    pub menu_timeout: Duration,
    /// How often waiting locators re-query the surface.
    pub poll_interval: Duration,
    /// Pause between protocol steps, letting the page react to a click.
    pub action_delay: Duration,
    /// Settle time after the confirm click, covering the page's own removal
    /// animation.
    pub settle_delay: Duration,
    /// Pause after a failed item before the next one is attempted.
    pub failure_pause: Duration,

    /// Consecutive item failures tolerated before the run is aborted.
    pub max_consecutive_failures: u32,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            candidates: Selector::Css(".conversation-row".to_string()),
            trigger: Selector::TestId("actions-menu-button".to_string()),
            delete_entry: Selector::Text("Delete".to_string()),
            confirm: Selector::TestId("confirm-button".to_string()),
            dismiss: Some(Selector::Css(".overlay-backdrop".to_string())),
            menu_timeout: Duration::from_secs(2),
            poll_interval: Duration::from_millis(200),
            action_delay: Duration::from_millis(500),
            settle_delay: Duration::from_millis(1200),
            failure_pause: Duration::from_secs(1),
            max_consecutive_failures: 5,
        }
    }
}
