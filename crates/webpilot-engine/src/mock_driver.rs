//! Scripted automation driver for tests.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use webpilot_protocols::{AutomationDriver, DriverError, PageDebugInfo};

/// Driver that records actions and fails on demand.
///
/// Selectors listed as missing fail with `ElementNotFound`; any action whose
/// target is registered through [`MockDriver::fail_on`] fails with the given
/// error. An optional per-action delay lets tests observe in-flight dispatches.
pub struct MockDriver {
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    url: Option<String>,
    html: String,
    title: Option<String>,
    missing: HashSet<String>,
    failures: HashMap<String, DriverError>,
    extracts: HashMap<String, String>,
    eval_result: Option<Value>,
    delay: Option<Duration>,
    actions: Vec<String>,
    typed: HashMap<String, String>,
    recording: bool,
}

impl MockDriver {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
        }
    }

    /// HTML returned by `snapshot`.
    pub fn with_html(self, html: impl Into<String>) -> Self {
        self.state.lock().html = html.into();
        self
    }

    pub fn with_title(self, title: impl Into<String>) -> Self {
        self.state.lock().title = Some(title.into());
        self
    }

    /// Selector that no longer resolves.
    pub fn with_missing_selector(self, selector: impl Into<String>) -> Self {
        self.state.lock().missing.insert(selector.into());
        self
    }

    /// Fail any action targeting `target` (selector, URL or script).
    pub fn fail_on(self, target: impl Into<String>, error: DriverError) -> Self {
        self.state.lock().failures.insert(target.into(), error);
        self
    }

    /// Value returned when extracting from `selector`.
    pub fn with_extract(self, selector: impl Into<String>, value: impl Into<String>) -> Self {
        self.state.lock().extracts.insert(selector.into(), value.into());
        self
    }

    pub fn with_eval_result(self, value: Value) -> Self {
        self.state.lock().eval_result = Some(value);
        self
    }

    /// Delay applied to every action.
    pub fn with_delay(self, delay: Duration) -> Self {
        self.state.lock().delay = Some(delay);
        self
    }

    /// Actions performed so far, e.g. `click #go`.
    pub fn actions(&self) -> Vec<String> {
        self.state.lock().actions.clone()
    }

    /// Text typed into a selector.
    pub fn typed(&self, selector: &str) -> Option<String> {
        self.state.lock().typed.get(selector).cloned()
    }

    pub fn is_recording(&self) -> bool {
        self.state.lock().recording
    }

    async fn act(&self, action: &str, target: &str, timeout: Duration) -> Result<(), DriverError> {
        let delay = self.state.lock().delay;
        if let Some(delay) = delay {
            if delay > timeout {
                tokio::time::sleep(timeout).await;
                return Err(DriverError::Timeout {
                    action: format!("{} {}", action, target),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        state.actions.push(format!("{} {}", action, target));
        if let Some(error) = state.failures.get(target) {
            return Err(error.clone());
        }
        if action != "navigate" && action != "evaluate" && state.missing.contains(target) {
            return Err(DriverError::ElementNotFound(target.to_string()));
        }
        Ok(())
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AutomationDriver for MockDriver {
    fn id(&self) -> &str {
        "mock"
    }

    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), DriverError> {
        self.act("navigate", url, timeout).await?;
        self.state.lock().url = Some(url.to_string());
        Ok(())
    }

    async fn click(&self, selector: &str, timeout: Duration) -> Result<(), DriverError> {
        self.act("click", selector, timeout).await
    }

    async fn type_text(
        &self,
        selector: &str,
        text: &str,
        timeout: Duration,
    ) -> Result<(), DriverError> {
        self.act("type", selector, timeout).await?;
        self.state
            .lock()
            .typed
            .insert(selector.to_string(), text.to_string());
        Ok(())
    }

    async fn extract(
        &self,
        selector: &str,
        _attribute: Option<&str>,
        timeout: Duration,
    ) -> Result<String, DriverError> {
        self.act("extract", selector, timeout).await?;
        Ok(self
            .state
            .lock()
            .extracts
            .get(selector)
            .cloned()
            .unwrap_or_default())
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), DriverError> {
        self.act("wait", selector, timeout).await
    }

    async fn evaluate(&self, script: &str, timeout: Duration) -> Result<Value, DriverError> {
        self.act("evaluate", script, timeout).await?;
        Ok(self.state.lock().eval_result.clone().unwrap_or(Value::Null))
    }

    async fn current_url(&self) -> Option<String> {
        self.state.lock().url.clone()
    }

    async fn snapshot(&self) -> Result<PageDebugInfo, DriverError> {
        let state = self.state.lock();
        let url = state.url.clone().ok_or(DriverError::NotConnected)?;
        let mut info = PageDebugInfo::new(url, state.html.clone());
        info.title = state.title.clone();
        Ok(info)
    }

    async fn set_recording(&self, enabled: bool) -> Result<(), DriverError> {
        self.state.lock().recording = enabled;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: Duration = Duration::from_secs(1);

    #[tokio::test]
    async fn test_records_actions() {
        let driver = MockDriver::new();
        driver.navigate("https://example.com", T).await.unwrap();
        driver.click("#go", T).await.unwrap();
        driver.type_text("#q", "rust", T).await.unwrap();
        assert_eq!(
            driver.actions(),
            vec!["navigate https://example.com", "click #go", "type #q"]
        );
        assert_eq!(driver.typed("#q").as_deref(), Some("rust"));
        assert_eq!(driver.current_url().await.as_deref(), Some("https://example.com"));
    }

    #[tokio::test]
    async fn test_missing_selector() {
        let driver = MockDriver::new().with_missing_selector("#old");
        let err = driver.click("#old", T).await.unwrap_err();
        assert_eq!(err, DriverError::ElementNotFound("#old".to_string()));
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let driver = MockDriver::new().fail_on(
            "https://down.example",
            DriverError::NavigationFailed("503".to_string()),
        );
        let err = driver.navigate("https://down.example", T).await.unwrap_err();
        assert!(matches!(err, DriverError::NavigationFailed(_)));
        assert!(driver.current_url().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_beyond_timeout() {
        let driver = MockDriver::new().with_delay(Duration::from_secs(10));
        let err = driver.click("#a", Duration::from_millis(100)).await.unwrap_err();
        assert!(matches!(err, DriverError::Timeout { timeout_ms: 100, .. }));
    }

    #[tokio::test]
    async fn test_snapshot_requires_page() {
        let driver = MockDriver::new().with_html("<button id=\"go\">Go</button>");
        assert_eq!(driver.snapshot().await.unwrap_err(), DriverError::NotConnected);
        driver.navigate("https://example.com", T).await.unwrap();
        let snap = driver.snapshot().await.unwrap();
        assert!(snap.html.contains("id=\"go\""));
    }
}
