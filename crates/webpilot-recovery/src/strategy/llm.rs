//! Holistic repair delegated to a language model.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};
use webpilot_protocols::{
    CompletionRequest, ErrorAnalysis, LLMProvider, Message, RecoveryError, Workflow,
};

use super::{selector_changes, FixContext, FixOutcome, FixStrategy};

/// Page HTML sent to the model is cut to this many bytes.
const MAX_DOM_BYTES: usize = 20_000;

const REQUEST_TIMEOUT_SECS: u64 = 120;

const SYSTEM_PROMPT: &str = "You repair browser automation workflows. \
A workflow is a JSON object with `nodes` (id, type, data) and `edges` (id, source, target, sourceHandle). \
Fix the reported errors, typically by correcting CSS selectors or timeouts in node data. \
Keep node ids and edges unless an error requires changing them. \
Reply with the complete corrected workflow as one JSON object and nothing else.";

/// A fenced block: language tag, then body.
static FENCED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```([\w+-]*)[^\n]*\n(.*?)```").expect("valid regex"));

/// Sends the workflow, the analyses and the latest page to an LLM and takes
/// back a rewritten workflow.
pub struct LlmStrategy {
    provider: Arc<dyn LLMProvider>,
    model: Option<String>,
    max_tokens: u32,
}

impl LlmStrategy {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            model: None,
            max_tokens: 8192,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn prompt(
        &self,
        workflow: &Workflow,
        analyses: &[ErrorAnalysis],
        ctx: &FixContext,
    ) -> Result<String, RecoveryError> {
        let mut prompt = format!(
            "Workflow:\n```json\n{}\n```\n\nError analysis:\n```json\n{}\n```\n",
            to_json(workflow)?,
            to_json(analyses)?
        );
        if let Some(message) = &ctx.error_message {
            prompt.push_str(&format!("\nOriginal error: {}\n", message));
        }
        if let Some(page) = ctx.snapshots.last() {
            prompt.push_str(&format!(
                "\nPage at {} when the run failed:\n```html\n{}\n```\n",
                page.url,
                truncate(&page.html, MAX_DOM_BYTES)
            ));
        }
        Ok(prompt)
    }
}

#[async_trait]
impl FixStrategy for LlmStrategy {
    fn name(&self) -> &str {
        "llm"
    }

    async fn attempt(
        &self,
        workflow: &Workflow,
        analyses: &[ErrorAnalysis],
        ctx: &FixContext,
    ) -> Result<FixOutcome, RecoveryError> {
        let prompt = self.prompt(workflow, analyses, ctx)?;
        let model = self
            .model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string());
        let request = CompletionRequest::new(model, vec![Message::user(prompt)])
            .with_system(SYSTEM_PROMPT)
            .with_max_tokens(self.max_tokens)
            .with_temperature(0.0)
            .with_timeout(REQUEST_TIMEOUT_SECS);

        let response = self.provider.complete(request).await.map_err(|e| {
            warn!(provider = self.provider.id(), error = %e, "LLM repair request failed");
            RecoveryError::StrategyUnavailable(format!("LLM provider '{}' failed: {}", self.provider.id(), e))
        })?;

        let candidate: Workflow = serde_json::from_str(extract_json(response.text())).map_err(|e| {
            warn!(error = %e, "LLM reply is not a workflow");
            RecoveryError::StrategyUnavailable(format!("LLM reply is not a workflow: {}", e))
        })?;
        if candidate == *workflow {
            return Err(RecoveryError::StrategyUnavailable(
                "LLM returned the workflow unchanged".to_string(),
            ));
        }

        info!(model = %response.model, tokens = response.usage.total(), "LLM repair proposed");
        let mut outcome = FixOutcome::new(candidate);
        outcome.updates = selector_changes(workflow, &outcome.workflow);
        if !workflow.same_topology(&outcome.workflow) {
            outcome.notes.push("LLM changed the graph topology".to_string());
        }
        Ok(outcome)
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, RecoveryError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| RecoveryError::StrategyUnavailable(format!("cannot encode prompt: {}", e)))
}

/// JSON payload of a model reply.
///
/// A ```json block wins, then an untagged block, then the outermost object.
/// Blocks tagged with another language (echoed HTML) are never taken.
fn extract_json(text: &str) -> &str {
    let blocks: Vec<(&str, &str)> = FENCED
        .captures_iter(text)
        .filter_map(|c| Some((c.get(1)?.as_str(), c.get(2)?.as_str())))
        .collect();
    let body = blocks
        .iter()
        .find(|(lang, _)| lang.eq_ignore_ascii_case("json"))
        .or_else(|| blocks.iter().find(|(lang, _)| lang.is_empty()));
    if let Some(&(_, body)) = body {
        return body.trim();
    }
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text.trim(),
    }
}

fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use webpilot_protocols::{
        node_types, CompletionResponse, Edge, ErrorCategory, Node, ProviderError, Usage,
    };

    /// Replies with a fixed text, or rate-limits when there is none.
    struct FakeProvider {
        reply: Option<String>,
        prompt: Mutex<Option<String>>,
    }

    impl FakeProvider {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                prompt: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl LLMProvider for FakeProvider {
        fn id(&self) -> &str {
            "fake"
        }

        fn default_model(&self) -> &str {
            "fake-1"
        }

        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
            *self.prompt.lock().unwrap() = Some(request.messages[0].content.clone());
            let text = self.reply.clone().ok_or(ProviderError::RateLimited {
                retry_after_seconds: 30,
            })?;
            Ok(CompletionResponse {
                id: "r1".to_string(),
                model: "fake-1".to_string(),
                message: Message::assistant(text),
                usage: Usage::default(),
            })
        }
    }

    fn workflow() -> Workflow {
        Workflow::new(
            vec![
                Node::new("s", node_types::START),
                Node::new("c", node_types::CLICK).with_data("selector", "#old"),
            ],
            vec![Edge::new("e1", "s", "c")],
        )
    }

    fn analyses() -> Vec<ErrorAnalysis> {
        vec![ErrorAnalysis::new(ErrorCategory::Selector, "Element not found: #old").with_node("c")]
    }

    #[test]
    fn test_extract_json() {
        assert_eq!(extract_json("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(extract_json("Here you go: {\"a\":{\"b\":2}} done"), "{\"a\":{\"b\":2}}");
        assert_eq!(extract_json("  nothing  "), "nothing");
        assert_eq!(extract_json("```\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn test_extract_json_skips_other_fences() {
        let reply = "The page had:\n```html\n<button id=\"go\">Go</button>\n```\nFixed:\n```json\n{\"a\":1}\n```";
        assert_eq!(extract_json(reply), "{\"a\":1}");

        let reply = "```html\n<p>{x}</p>\n```\n```\n{\"b\":2}\n```";
        assert_eq!(extract_json(reply), "{\"b\":2}");
    }

    #[tokio::test]
    async fn test_reply_echoing_page_html_first() {
        let mut fixed = workflow();
        fixed.node_mut("c").unwrap().data.insert("selector".into(), "#new".into());
        let reply = format!(
            "The page shows:\n```html\n<b id=\"new\"></b>\n```\nCorrected workflow:\n```json\n{}\n```",
            serde_json::to_string_pretty(&fixed).unwrap()
        );
        let provider = Arc::new(FakeProvider::replying(&reply));
        let outcome = LlmStrategy::new(provider)
            .attempt(&workflow(), &analyses(), &FixContext::new())
            .await
            .unwrap();
        assert_eq!(outcome.workflow.node("c").unwrap().selector(), Some("#new"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "h");
        assert_eq!(truncate("abc", 10), "abc");
    }

    #[tokio::test]
    async fn test_accepts_rewritten_workflow() {
        let mut fixed = workflow();
        fixed.node_mut("c").unwrap().data.insert("selector".into(), "#new".into());
        let reply = format!("```json\n{}\n```", serde_json::to_string(&fixed).unwrap());
        let provider = Arc::new(FakeProvider::replying(&reply));

        let ctx = FixContext::new()
            .with_error_message("Element not found: #old")
            .with_snapshot(webpilot_protocols::PageDebugInfo::new("https://example.com", "<b id=\"new\"></b>"));
        let outcome = LlmStrategy::new(provider.clone())
            .attempt(&workflow(), &analyses(), &ctx)
            .await
            .unwrap();

        assert_eq!(outcome.workflow.node("c").unwrap().selector(), Some("#new"));
        assert_eq!(outcome.updates.len(), 1);
        assert!(outcome.notes.is_empty());

        let prompt = provider.prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains("#old"));
        assert!(prompt.contains("Original error"));
        assert!(prompt.contains("<b id=\"new\"></b>"));
    }

    #[tokio::test]
    async fn test_provider_failure_is_unavailable() {
        let provider = Arc::new(FakeProvider {
            reply: None,
            prompt: Mutex::new(None),
        });
        let err = LlmStrategy::new(provider)
            .attempt(&workflow(), &analyses(), &FixContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RecoveryError::StrategyUnavailable(_)));
    }

    #[tokio::test]
    async fn test_garbage_or_unchanged_reply_is_unavailable() {
        let provider = Arc::new(FakeProvider::replying("I cannot help with that."));
        let err = LlmStrategy::new(provider)
            .attempt(&workflow(), &analyses(), &FixContext::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not a workflow"));

        let same = serde_json::to_string(&workflow()).unwrap();
        let provider = Arc::new(FakeProvider::replying(&same));
        let err = LlmStrategy::new(provider)
            .attempt(&workflow(), &analyses(), &FixContext::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unchanged"));
    }
}
