use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AdapterError;

/// Opaque handle to an element resolved on a [`Page`].
///
/// Handles are only guaranteed valid until the next navigation; implementations report
/// [`AdapterErrorKind::StaleElement`](crate::AdapterErrorKind::StaleElement) for handles
/// whose element no longer exists.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ElementRef(pub u64);

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct CookieInfo {
    pub name: String,
    pub value: String,
    pub domain: String,
}

impl CookieInfo {
    pub fn new(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
        }
    }
}

/// One browser tab, as seen by locator strategies and order procedures.
#[async_trait]
pub trait Page: Send + Sync {
    async fn goto(&self, url: &str) -> Result<(), AdapterError>;

    async fn current_url(&self) -> Result<String, AdapterError>;

    /// All elements matching a CSS selector, in document order.
    async fn query_all(&self, selector: &str) -> Result<Vec<ElementRef>, AdapterError>;

    /// Descendants of `scope` matching a CSS selector, in document order.
    async fn query_within(
        &self,
        scope: ElementRef,
        selector: &str,
    ) -> Result<Vec<ElementRef>, AdapterError>;

    /// Rendered text of the element with whitespace collapsed.
    async fn text(&self, element: ElementRef) -> Result<String, AdapterError>;

    async fn attribute(
        &self,
        element: ElementRef,
        name: &str,
    ) -> Result<Option<String>, AdapterError>;

    async fn is_visible(&self, element: ElementRef) -> Result<bool, AdapterError>;

    async fn click(&self, element: ElementRef) -> Result<(), AdapterError>;

    /// Replace the value of an input element.
    async fn fill(&self, element: ElementRef, value: &str) -> Result<(), AdapterError>;

    async fn body_text(&self) -> Result<String, AdapterError>;

    async fn cookies(&self) -> Result<Vec<CookieInfo>, AdapterError>;

    async fn local_storage_keys(&self) -> Result<Vec<String>, AdapterError>;
}

pub(crate) fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
