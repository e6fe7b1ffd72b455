//! HTTP-backed automation driver.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;
use webpilot_config::DriverConfig;
use webpilot_protocols::{AutomationDriver, DriverError, PageDebugInfo};

use crate::page::Page;

/// Delay between re-fetches while waiting for an element.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Driver that loads pages with plain HTTP requests.
pub struct HttpDriver {
    client: Client,
    page: RwLock<Option<Page>>,
}

impl HttpDriver {
    pub fn new(config: &DriverConfig) -> Result<Self, DriverError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| DriverError::ActionFailed(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            page: RwLock::new(None),
        })
    }

    async fn load(&self, url: &str, timeout: Duration, action: &str) -> Result<Page, DriverError> {
        let url = Url::parse(url).map_err(|e| DriverError::NavigationFailed(format!("Invalid URL '{}': {}", url, e)))?;

        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| request_error(e, action, timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DriverError::NavigationFailed(format!("HTTP {} for {}", status.as_u16(), url)));
        }
        let final_url = response.url().clone();
        let html = response.text().await.map_err(|e| request_error(e, action, timeout))?;
        Ok(Page::new(final_url, html))
    }

    async fn poll_for(&self, selector: &str, url: &str, timeout: Duration, action: &str) -> Result<(), DriverError> {
        loop {
            if self.with_page(|page| page.contains(selector))? {
                return Ok(());
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
            let page = self.load(url, timeout, action).await?;
            *self.page.write() = Some(page);
        }
    }

    fn with_page<T>(&self, f: impl FnOnce(&Page) -> Result<T, DriverError>) -> Result<T, DriverError> {
        let page = self.page.read();
        let page = page.as_ref().ok_or(DriverError::NotConnected)?;
        f(page)
    }
}

fn request_error(e: reqwest::Error, action: &str, timeout: Duration) -> DriverError {
    if e.is_timeout() {
        DriverError::Timeout {
            action: action.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }
    } else {
        DriverError::NavigationFailed(e.to_string())
    }
}

#[async_trait]
impl AutomationDriver for HttpDriver {
    fn id(&self) -> &str {
        "http"
    }

    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), DriverError> {
        let page = self.load(url, timeout, &format!("navigate {}", url)).await?;
        info!(url = %page.url, "Page loaded");
        *self.page.write() = Some(page);
        Ok(())
    }

    async fn click(&self, selector: &str, timeout: Duration) -> Result<(), DriverError> {
        let element = self.with_page(|page| page.element(selector, None))?;
        match element.link {
            Some(link) => {
                let page = self.load(link.as_str(), timeout, &format!("click {}", selector)).await?;
                debug!(selector, url = %page.url, "Followed link");
                *self.page.write() = Some(page);
            }
            None => debug!(selector, tag = %element.tag, "Click has no effect on a static page"),
        }
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str, _timeout: Duration) -> Result<(), DriverError> {
        let element = self.with_page(|page| page.element(selector, None))?;
        if !element.editable {
            return Err(DriverError::ActionFailed(format!(
                "<{}> matched by '{}' does not accept text",
                element.tag, selector
            )));
        }
        let mut page = self.page.write();
        let page = page.as_mut().ok_or(DriverError::NotConnected)?;
        page.typed.insert(selector.to_string(), text.to_string());
        Ok(())
    }

    async fn extract(
        &self,
        selector: &str,
        attribute: Option<&str>,
        _timeout: Duration,
    ) -> Result<String, DriverError> {
        self.with_page(|page| {
            if attribute.is_none_or(|a| a == "value") {
                if let Some(typed) = page.typed.get(selector) {
                    return Ok(typed.clone());
                }
            }
            let element = page.element(selector, attribute)?;
            match attribute {
                Some(name) => element.attribute.ok_or_else(|| {
                    DriverError::ActionFailed(format!("'{}' has no attribute '{}'", selector, name))
                }),
                None => Ok(element.text),
            }
        })
    }

    /// Re-fetches the current page until the selector matches or the
    /// timeout passes.
    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), DriverError> {
        let action = format!("wait {}", selector);
        let url = self.with_page(|page| Ok(page.url.to_string()))?;
        let polled = tokio::time::timeout(timeout, self.poll_for(selector, &url, timeout, &action)).await;
        match polled {
            Ok(result) => result,
            Err(_) => Err(DriverError::Timeout {
                action,
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    async fn evaluate(&self, _script: &str, _timeout: Duration) -> Result<Value, DriverError> {
        Err(DriverError::Unsupported("script evaluation".to_string()))
    }

    async fn current_url(&self) -> Option<String> {
        self.page.read().as_ref().map(|page| page.url.to_string())
    }

    async fn snapshot(&self) -> Result<PageDebugInfo, DriverError> {
        self.with_page(|page| Ok(page.snapshot()))
    }
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
