//! Page snapshots captured at failure or breakpoint time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// DOM snapshot of a page and the URL it was taken from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDebugInfo {
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    pub html: String,

    /// Node the snapshot was captured for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,

    #[serde(default = "Utc::now")]
    pub captured_at: DateTime<Utc>,
}

/// Selector inference input; same shape as a debug capture.
pub type DomContext = PageDebugInfo;

impl PageDebugInfo {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            html: html.into(),
            node_id: None,
            captured_at: Utc::now(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_node(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }
}
