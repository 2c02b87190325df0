//! Browser engine contract
//!
//! The harness reaches the application only through rendered pages. A
//! [`PageDriver`] is one browser page: navigation, locating by selector,
//! visibility, fill, click, and bulk reads of table-like structures.
//! Selectors use Playwright syntax (`css`, `:has-text(...)`).

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::E2eResult;

/// One column of a bulk row read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Column {
    /// Key in the resulting [`Row`]
    pub name: &'static str,
    /// Plain CSS selector relative to the row; `None` reads the row itself
    pub selector: Option<&'static str>,
    /// Attribute to read; `None` reads the trimmed inner text
    pub attribute: Option<&'static str>,
}

impl Column {
    pub const fn text(name: &'static str, selector: &'static str) -> Self {
        Self {
            name,
            selector: Some(selector),
            attribute: None,
        }
    }

    pub const fn attr(name: &'static str, selector: Option<&'static str>, attribute: &'static str) -> Self {
        Self {
            name,
            selector,
            attribute: Some(attribute),
        }
    }
}

/// Column name to value; a missing cell is absent from the map
pub type Row = HashMap<String, String>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitState {
    #[default]
    Visible,
    Hidden,
    Attached,
    Detached,
}

#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate and wait for the DOM to settle
    async fn goto(&self, url: &str) -> E2eResult<()>;

    async fn current_url(&self) -> E2eResult<String>;

    /// Number of elements currently attached for `selector`
    async fn count(&self, selector: &str) -> E2eResult<usize>;

    /// Whether the first match is visible; `false` when nothing matches
    async fn is_visible(&self, selector: &str) -> E2eResult<bool>;

    async fn fill(&self, selector: &str, value: &str) -> E2eResult<()>;

    async fn click(&self, selector: &str) -> E2eResult<()>;

    /// Trimmed inner text of the first match
    async fn text(&self, selector: &str) -> E2eResult<String>;

    async fn input_value(&self, selector: &str) -> E2eResult<String>;

    /// Detach every match from the DOM, returning how many were removed
    async fn remove(&self, selector: &str) -> E2eResult<usize>;

    /// Read every element matching `row_selector` into a [`Row`]
    async fn query_all(&self, row_selector: &str, columns: &[Column]) -> E2eResult<Vec<Row>>;

    /// Presence check, used instead of acting and catching the failure
    async fn is_present(&self, selector: &str) -> E2eResult<bool> {
        Ok(self.count(selector).await? > 0)
    }

    /// Release the page and whatever process backs it
    async fn close(&self) -> E2eResult<()> {
        Ok(())
    }
}
