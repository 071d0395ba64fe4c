use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::errors::SweepError;

/// Represents one entity on the host page: a deletable entry, one of its
/// affordances (trigger, menu entry, confirm control), or a container.
///
/// A `PageElement` is a live handle, valid only for the current page
/// generation. Entities that must survive a reload are re-located through
/// their durable id (see [`PageElement::durable_id`]).
#[derive(Debug)]
pub struct PageElement {
    inner: Box<dyn PageElementImpl>,
}

impl PageElement {
    pub fn new(inner: impl PageElementImpl + 'static) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }

    /// Stable identifier usable to re-find this entity after a reload,
    /// e.g. a resource locator. `None` for entities that only exist within
    /// the current page generation.
    pub fn durable_id(&self) -> Option<String> {
        self.inner.durable_id()
    }

    /// Visible text content, primarily for logging and summaries.
    pub fn text(&self) -> String {
        self.inner.text()
    }

    /// Whether the handle still points at a live node in the page.
    pub fn is_attached(&self) -> bool {
        self.inner.is_attached()
    }

    pub fn is_visible(&self) -> bool {
        self.inner.is_visible()
    }

    /// Force a hover-only affordance to become interactable.
    ///
    /// Chat rows typically reveal their action controls on hover; this makes
    /// them visible without a pointer.
    pub fn reveal(&self) -> Result<(), SweepError> {
        self.inner.reveal()
    }

    pub fn click(&self) -> Result<(), SweepError> {
        self.inner.click()
    }
}

impl Clone for PageElement {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone_box(),
        }
    }
}

/// Implementation seam for host-page adapters.
///
/// Adapters wrap whatever node handle their page technology provides and
/// expose the minimal surface the engine needs.
pub trait PageElementImpl: Send + Sync + Debug {
    fn durable_id(&self) -> Option<String>;
    fn text(&self) -> String;
    fn is_attached(&self) -> bool;
    fn is_visible(&self) -> bool;
    fn reveal(&self) -> Result<(), SweepError>;
    fn click(&self) -> Result<(), SweepError>;
    fn clone_box(&self) -> Box<dyn PageElementImpl>;
}

/// Serializable snapshot of a [`PageElement`] for logs and summaries.
///
/// Carries only data; it cannot perform actions. Live interaction always
/// goes through a `PageElement`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializablePageElement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub durable_id: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    pub visible: bool,
}

impl From<&PageElement> for SerializablePageElement {
    fn from(element: &PageElement) -> Self {
        Self {
            durable_id: element.durable_id(),
            text: element.text(),
            visible: element.is_visible(),
        }
    }
}
