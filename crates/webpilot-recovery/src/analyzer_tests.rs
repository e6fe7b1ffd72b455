use super::*;
use webpilot_protocols::{node_types, Edge, Node, PageDebugInfo, Severity};

const URL: &str = "https://example.com/login";

fn workflow() -> Workflow {
    Workflow::new(
        vec![
            Node::new("s", node_types::START),
            Node::new("nav", node_types::NAVIGATE).with_data("url", URL),
            Node::new("c", node_types::CLICK)
                .with_data("selector", "button#submit")
                .with_data("label", "Go"),
        ],
        vec![Edge::new("e1", "s", "nav"), Edge::new("e2", "nav", "c")],
    )
}

#[test]
fn test_selector_from_engine_failure() {
    let analyses = analyze(&workflow(), "Node 'c' failed: Element not found: button#submit", &[], None);

    assert_eq!(analyses.len(), 1);
    let a = &analyses[0];
    assert_eq!(a.category, ErrorCategory::Selector);
    assert_eq!(a.severity, Severity::High);
    assert_eq!(a.node_id.as_deref(), Some("c"));
    assert_eq!(a.failed_selector.as_deref(), Some("button#submit"));
    assert_eq!(a.page_url.as_deref(), Some(URL));
    assert!(a.suggested_fix.as_deref().unwrap().contains("node 'c'"));
}

#[test]
fn test_selector_node_resolved_by_scanning_configs() {
    let analyses = analyze(
        &workflow(),
        "page.click: Timeout 30000ms exceeded.\n  - waiting for locator('button#submit')",
        &[],
        None,
    );
    assert_eq!(analyses[0].category, ErrorCategory::Selector);
    assert_eq!(analyses[0].node_id.as_deref(), Some("c"));
    assert_eq!(analyses[0].failed_selector.as_deref(), Some("button#submit"));
}

#[test]
fn test_current_node_wins() {
    let analyses = analyze(&workflow(), "Element not found: #other", &[], Some("c"));
    assert_eq!(analyses[0].node_id.as_deref(), Some("c"));

    let analyses = analyze(&workflow(), "Element not found: #other", &[], Some("ghost"));
    assert!(analyses[0].node_id.is_none());
    assert!(analyses[0].page_url.is_none());
}

#[test]
fn test_missing_node() {
    let analyses = analyze(
        &workflow(),
        "Invalid graph: edge 'e9' references unknown node 'ghost'",
        &[],
        None,
    );
    assert_eq!(analyses.len(), 1);
    assert_eq!(analyses[0].category, ErrorCategory::MissingNode);
    assert_eq!(analyses[0].severity, Severity::Critical);
    assert_eq!(analyses[0].node_id.as_deref(), Some("ghost"));

    let analyses = analyze(&workflow(), "Node not found", &[], None);
    assert_eq!(analyses[0].category, ErrorCategory::MissingNode);
    assert!(analyses[0].node_id.is_none());
}

#[test]
fn test_timeout() {
    let analyses = analyze(&workflow(), "Node 'c' failed: Timeout after 5000ms: click #slow", &[], None);
    assert_eq!(analyses[0].category, ErrorCategory::Timeout);
    assert_eq!(analyses[0].severity, Severity::Medium);
    assert_eq!(analyses[0].node_id.as_deref(), Some("c"));
    assert_eq!(analyses[0].failed_selector.as_deref(), Some("#slow"));

    let analyses = analyze(&workflow(), "Execution exceeded maximum duration of 600s", &[], Some("c"));
    assert_eq!(analyses[0].category, ErrorCategory::Timeout);
    assert!(analyses[0].failed_selector.is_none());
}

#[test]
fn test_configuration_from_message() {
    let mut wf = workflow();
    wf.nodes.push(Node::new("t", node_types::TYPE));
    wf.edges.push(Edge::new("e3", "c", "t"));

    let analyses = analyze(&wf, "Node 't' failed: missing required field 'selector'", &[], None);
    assert_eq!(analyses.len(), 1);
    assert_eq!(analyses[0].category, ErrorCategory::Configuration);
    assert_eq!(analyses[0].node_id.as_deref(), Some("t"));
    assert_eq!(analyses[0].missing_fields, vec!["selector", "text"]);
    assert_eq!(analyses[0].page_url.as_deref(), Some(URL));
}

#[test]
fn test_timeout_word_in_node_id_does_not_decide_category() {
    let mut wf = workflow();
    wf.nodes.push(Node::new("login-timeout-check", node_types::NAVIGATE));
    wf.edges.push(Edge::new("e3", "c", "login-timeout-check"));

    let analyses = analyze(&wf, "Node 'login-timeout-check' failed: missing required field 'url'", &[], None);
    assert_eq!(analyses.len(), 1);
    assert_eq!(analyses[0].category, ErrorCategory::Configuration);
    assert_eq!(analyses[0].node_id.as_deref(), Some("login-timeout-check"));
    assert_eq!(analyses[0].missing_fields, vec!["url"]);

    let analyses = analyze(&wf, "Node 'login-timeout-check' failed: Timeout after 5000ms: wait body", &[], None);
    assert_eq!(analyses[0].category, ErrorCategory::Timeout);
}

#[test]
fn test_configuration_from_node_scan() {
    let mut wf = workflow();
    wf.nodes.push(Node::new("n2", node_types::NAVIGATE));
    wf.edges.push(Edge::new("e3", "c", "n2"));

    let analyses = analyze(&wf, "something broke", &[], None);
    assert_eq!(analyses.len(), 1);
    assert_eq!(analyses[0].category, ErrorCategory::Configuration);
    assert_eq!(analyses[0].node_id.as_deref(), Some("n2"));
    assert_eq!(analyses[0].missing_fields, vec!["url"]);
}

#[test]
fn test_other() {
    let analyses = analyze(&workflow(), "The browser crashed", &[], Some("c"));
    assert_eq!(analyses.len(), 1);
    assert_eq!(analyses[0].category, ErrorCategory::Other);
    assert_eq!(analyses[0].node_id.as_deref(), Some("c"));
}

#[test]
fn test_logs_add_and_dedupe() {
    let logs = vec![
        "2026-01-01T00:00:00+00:00 node_start c".to_string(),
        "2026-01-01T00:00:01+00:00 node_error c Element not found: button#submit".to_string(),
        "2026-01-01T00:00:02+00:00 execution_error c Node 'c' failed: Element not found: button#submit".to_string(),
        "warning: request to https://cdn.example failed with timeout".to_string(),
        "just chatter".to_string(),
    ];
    let analyses = analyze(&workflow(), "Element not found: button#submit", &logs, Some("c"));

    let categories: Vec<_> = analyses.iter().map(|a| a.category).collect();
    assert_eq!(categories, vec![ErrorCategory::Selector, ErrorCategory::Timeout]);
    assert!(analyses[1].node_id.is_none());
}

#[test]
fn test_empty_input() {
    assert!(analyze(&workflow(), "  ", &[], None).is_empty());
}

#[test]
fn test_dom_variant_suggests_replacement() {
    let dom = PageDebugInfo::new(URL, r#"<form><button id="go">Go</button></form>"#);
    let analyses = analyze_with_dom(&workflow(), "Element not found: button#submit", &[], Some("c"), &dom);

    assert_eq!(analyses[0].correct_selector.as_deref(), Some("#go"));
    assert_eq!(analyses[0].extracted_selectors, vec!["#go"]);
}

#[test]
fn test_dom_variant_skips_other_pages_and_resolving_selectors() {
    let dom = PageDebugInfo::new("https://example.com/other", r#"<button id="go">Go</button>"#);
    let analyses = analyze_with_dom(&workflow(), "Element not found: button#submit", &[], Some("c"), &dom);
    assert!(analyses[0].correct_selector.is_none());
    assert!(analyses[0].extracted_selectors.is_empty());

    let dom = PageDebugInfo::new(URL, r#"<button id="submit">Go</button>"#);
    let analyses = analyze_with_dom(&workflow(), "Element not found: button#submit", &[], Some("c"), &dom);
    assert!(analyses[0].correct_selector.is_none());
}

#[test]
fn test_dom_variant_uses_capture_of_failing_node_after_navigation() {
    let dom = PageDebugInfo::new("https://example.com/account", r#"<button id="go">Go</button>"#).with_node("c");
    let analyses = analyze_with_dom(&workflow(), "Node 'c' failed: Element not found: button#submit", &[], None, &dom);

    assert_eq!(analyses[0].page_url.as_deref(), Some("https://example.com/account"));
    assert_eq!(analyses[0].correct_selector.as_deref(), Some("#go"));
}
