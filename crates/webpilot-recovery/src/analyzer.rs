//! Error classification.
//!
//! Categories are tried in priority order: selector, missing node, timeout,
//! configuration, other. The first matching pattern decides the category.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;
use webpilot_protocols::{DomContext, ErrorAnalysis, ErrorCategory, Workflow};

use crate::dom::{same_page, DomIndex};

/// Candidates kept in `extracted_selectors`.
const MAX_EXTRACTED: usize = 5;

static SELECTOR_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?im)element not found:\s*(.+?)\s*$",
        r#"(?i)waiting for (?:selector|locator)\s*\(?\s*["'`]([^"'`]+)["'`]"#,
        r#"(?im)no (?:element|node) found for selector:?\s*["'`]?(.+?)["'`]?\s*$"#,
        r#"(?i)failed to find element matching selector\s*["'`](.+?)["'`]"#,
        r#"(?i)(?:unable to locate|cannot find|could not find) element[^"'`\n]*["'`](.+?)["'`]"#,
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

static MISSING_NODE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"references unknown node '([^']+)'",
        r"edge target '([^']+)' is not a node",
        r"Unknown node: (\S+)",
        r"(?i)\bnode '([^']+)' (?:not found|does not exist)",
        r"(?i)\bnode (?:not found|does not exist)\b(?::\s*'?([\w-]+)'?)?",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

static TIMEOUT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)timed? ?out|timeout|maximum duration|deadline exceeded").expect("valid regex")
});

/// `DriverError::Timeout` text: `Timeout after 5000ms: click #go`.
static DRIVER_TIMEOUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)Timeout after \d+ms: (?:click|type|extract|wait) (.+?)\s*$").expect("valid regex")
});

static CONFIG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:missing required|invalid) field '([^']+)'").expect("valid regex")
});

/// Quoted names (node ids, field names) that must not decide a category.
static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"'[^'\n]*'|"[^"\n]*""#).expect("valid regex"));

/// `EngineError::ActionFailure` text names the failing node.
static NODE_FAILED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Node '([^']+)' failed").expect("valid regex"));

/// Trace line of a node or run failure: `<timestamp> node_error <node> <message>`.
static TRACE_ERROR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:node_error|execution_error)\s+(\S+)\s+(.+?)\s*$").expect("valid regex")
});

static ERRORISH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:error|failed|failure|not found|timeout|timed out|exception)\b")
        .expect("valid regex")
});

/// Classify a failure.
///
/// `logs` are scanned for further failures (trace lines or anything that
/// looks like an error); those only contribute when they classify as
/// something more specific than `other`. Results are deduplicated by
/// category, node and failed selector.
pub fn analyze(
    workflow: &Workflow,
    error_message: &str,
    logs: &[String],
    current_node_id: Option<&str>,
) -> Vec<ErrorAnalysis> {
    let current = current_node_id.filter(|id| workflow.contains_node(id));
    let mut analyses = Vec::new();

    if !error_message.trim().is_empty() {
        analyses.extend(classify(workflow, error_message.trim(), current));
    }

    for line in logs {
        let (node, message) = match TRACE_ERROR.captures(line) {
            Some(caps) => {
                let node = caps.get(1).map(|m| m.as_str()).filter(|n| *n != "-");
                (node.map(str::to_string), caps[2].to_string())
            }
            None if ERRORISH.is_match(line) => (None, line.trim().to_string()),
            None => continue,
        };
        let node = node.as_deref().filter(|id| workflow.contains_node(id));
        analyses.extend(
            classify(workflow, &message, node)
                .into_iter()
                .filter(|a| a.category != ErrorCategory::Other),
        );
    }

    if analyses.is_empty() {
        analyses.extend(configuration_scan(workflow, current));
    }

    let mut seen = HashSet::new();
    analyses.retain(|a| seen.insert((a.category, a.node_id.clone(), a.failed_selector.clone())));
    debug!(count = analyses.len(), "Errors analysed");
    analyses
}

/// [`analyze`], then cross-reference selector failures with a page snapshot.
///
/// Selector analyses on the snapshot's page get `extracted_selectors` (ranked
/// replacements) and, when the failed selector really is gone from the page,
/// a `correct_selector`.
pub fn analyze_with_dom(
    workflow: &Workflow,
    error_message: &str,
    logs: &[String],
    current_node_id: Option<&str>,
    dom: &DomContext,
) -> Vec<ErrorAnalysis> {
    let mut analyses = analyze(workflow, error_message, logs, current_node_id);
    let index = DomIndex::from_page(dom);

    for analysis in analyses
        .iter_mut()
        .filter(|a| a.category == ErrorCategory::Selector)
    {
        // A capture taken for the failing node shows the page the browser was
        // really on, which may differ from the last navigate URL.
        if dom.node_id.is_some() && dom.node_id == analysis.node_id {
            analysis.page_url = Some(dom.url.clone());
        }
        if analysis.page_url.as_deref().is_some_and(|url| !same_page(url, &dom.url)) {
            continue;
        }
        if analysis.page_url.is_none() {
            analysis.page_url = Some(dom.url.clone());
        }

        let node = analysis.node_id.as_deref().and_then(|id| workflow.node(id));
        let failed = analysis
            .failed_selector
            .clone()
            .or_else(|| node.and_then(|n| n.selector()).map(str::to_string));
        let candidates: Vec<String> = index
            .candidates(failed.as_deref(), node)
            .into_iter()
            .take(MAX_EXTRACTED)
            .map(|c| c.selector)
            .collect();

        let gone = failed.as_deref().is_none_or(|s| !index.resolve(s).resolves());
        if gone {
            analysis.correct_selector = candidates.first().cloned();
        }
        analysis.extracted_selectors = candidates;
    }
    analyses
}

fn classify(workflow: &Workflow, message: &str, current: Option<&str>) -> Vec<ErrorAnalysis> {
    let failed_node = NODE_FAILED
        .captures(message)
        .map(|c| c[1].to_string())
        .filter(|id| workflow.contains_node(id));
    let node_hint = current.map(str::to_string).or(failed_node);

    if let Some(selector) = first_capture(&SELECTOR_PATTERNS, message) {
        let selector = selector.trim_matches(|c| matches!(c, '"' | '\'' | '`')).to_string();
        let node_id = node_hint.or_else(|| {
            workflow
                .nodes_with_selector(&selector)
                .next()
                .map(|n| n.id.clone())
        });
        let fix = match &node_id {
            Some(id) => format!("Update the selector of node '{}'; '{}' no longer matches the page", id, selector),
            None => format!("Update the selector '{}'; it no longer matches the page", selector),
        };
        let analysis = ErrorAnalysis::new(ErrorCategory::Selector, message)
            .with_failed_selector(selector)
            .with_suggested_fix(fix);
        return vec![with_context(workflow, analysis, node_id)];
    }

    if let Some(caps) = MISSING_NODE_PATTERNS.iter().find_map(|p| p.captures(message)) {
        let missing = caps.get(1).map(|m| m.as_str().to_string());
        let mut analysis = ErrorAnalysis::new(ErrorCategory::MissingNode, message).with_suggested_fix(
            match &missing {
                Some(id) => format!("Add node '{}' or remove the edges that reference it", id),
                None => "Reconnect the edges to existing nodes".to_string(),
            },
        );
        if let Some(id) = missing {
            analysis = analysis.with_node(id);
        }
        return vec![analysis];
    }

    if TIMEOUT_PATTERN.is_match(&QUOTED.replace_all(message, "''")) {
        let mut analysis = ErrorAnalysis::new(ErrorCategory::Timeout, message);
        if let Some(caps) = DRIVER_TIMEOUT.captures(message) {
            analysis = analysis.with_failed_selector(caps[1].to_string());
        }
        let fix = match &node_hint {
            Some(id) => format!("Raise the timeout of node '{}' or wait for the page to settle first", id),
            None => "Raise the node timeout or the maximum run duration".to_string(),
        };
        let analysis = analysis.with_suggested_fix(fix);
        return vec![with_context(workflow, analysis, node_hint)];
    }

    if let Some(caps) = CONFIG_PATTERN.captures(message) {
        let mut fields = vec![caps[1].to_string()];
        if let Some(node) = node_hint.as_deref().and_then(|id| workflow.node(id)) {
            for field in node.missing_required_fields() {
                if !fields.contains(&field) {
                    fields.push(field);
                }
            }
        }
        let analysis = configuration(message, &fields, node_hint.as_deref());
        return vec![with_context(workflow, analysis, node_hint)];
    }

    let scan = configuration_scan(workflow, node_hint.as_deref());
    if !scan.is_empty() {
        return scan;
    }

    let analysis = ErrorAnalysis::new(ErrorCategory::Other, message);
    vec![with_context(workflow, analysis, node_hint)]
}

/// Configuration analyses for nodes missing required data.
///
/// Only `node` is checked when given; otherwise every node is.
fn configuration_scan(workflow: &Workflow, node: Option<&str>) -> Vec<ErrorAnalysis> {
    workflow
        .nodes
        .iter()
        .filter(|n| node.is_none_or(|id| n.id == id))
        .filter_map(|n| {
            let missing = n.missing_required_fields();
            if missing.is_empty() {
                return None;
            }
            let message = format!(
                "Node '{}' ({}) is missing required field(s): {}",
                n.id,
                n.node_type,
                missing.join(", ")
            );
            let analysis = configuration(&message, &missing, Some(&n.id));
            Some(with_context(workflow, analysis, Some(n.id.clone())))
        })
        .collect()
}

fn configuration(message: &str, fields: &[String], node: Option<&str>) -> ErrorAnalysis {
    let quoted: Vec<String> = fields.iter().map(|f| format!("'{}'", f)).collect();
    let fix = match node {
        Some(id) => format!("Fill in {} on node '{}'", quoted.join(", "), id),
        None => format!("Fill in {}", quoted.join(", ")),
    };
    ErrorAnalysis::new(ErrorCategory::Configuration, message)
        .with_missing_fields(fields.to_vec())
        .with_suggested_fix(fix)
}

/// Attach the node and its page URL.
fn with_context(workflow: &Workflow, mut analysis: ErrorAnalysis, node_id: Option<String>) -> ErrorAnalysis {
    if let Some(id) = node_id {
        analysis.page_url = workflow.page_url_for(&id);
        analysis.node_id = Some(id);
    }
    analysis
}

fn first_capture(patterns: &[Regex], message: &str) -> Option<String> {
    patterns.iter().find_map(|p| {
        p.captures(message)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

#[cfg(test)]
#[path = "analyzer_tests.rs"]
mod tests;
