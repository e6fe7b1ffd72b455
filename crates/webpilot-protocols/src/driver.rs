//! Automation capability the engine dispatches nodes to.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::DriverError;
use crate::page::PageDebugInfo;

/// Browser automation driver.
///
/// The engine treats the driver as opaque: it opens pages, acts on elements
/// by selector, and returns DOM snapshots. Every action takes the timeout the
/// node asked for; drivers fail with [`DriverError::Timeout`] past it.
#[async_trait]
pub trait AutomationDriver: Send + Sync {
    /// Returns the driver ID.
    fn id(&self) -> &str;

    /// Open a URL.
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), DriverError>;

    /// Click the element matching a selector.
    async fn click(&self, selector: &str, timeout: Duration) -> Result<(), DriverError>;

    /// Type text into the element matching a selector.
    async fn type_text(
        &self,
        selector: &str,
        text: &str,
        timeout: Duration,
    ) -> Result<(), DriverError>;

    /// Read the text (or an attribute) of the element matching a selector.
    async fn extract(
        &self,
        selector: &str,
        attribute: Option<&str>,
        timeout: Duration,
    ) -> Result<String, DriverError>;

    /// Wait until an element matching the selector exists.
    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), DriverError>;

    /// Evaluate a script in the page.
    async fn evaluate(&self, script: &str, timeout: Duration) -> Result<Value, DriverError>;

    /// URL of the current page, if any.
    async fn current_url(&self) -> Option<String>;

    /// Capture the current page.
    async fn snapshot(&self) -> Result<PageDebugInfo, DriverError>;

    /// Start or stop session recording. Drivers without recording ignore it.
    async fn set_recording(&self, enabled: bool) -> Result<(), DriverError> {
        let _ = enabled;
        Ok(())
    }
}
