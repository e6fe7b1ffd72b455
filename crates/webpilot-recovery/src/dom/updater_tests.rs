use super::*;
use webpilot_protocols::{node_types, Edge, ErrorCategory, Node, PageDebugInfo};

const URL: &str = "https://example.com/login";
const PAGE: &str = r#"
<html><body>
  <form id="login"><input name="q"><button id="go">Go</button></form>
  <a id="help" href="/help">Help</a>
</body></html>
"#;

fn dom() -> PageDebugInfo {
    PageDebugInfo::new(URL, PAGE)
}

fn workflow(selector: &str) -> Workflow {
    Workflow::new(
        vec![
            Node::new("s", node_types::START),
            Node::new("nav", node_types::NAVIGATE).with_data("url", URL),
            Node::new("c", node_types::CLICK).with_data("selector", selector),
        ],
        vec![Edge::new("e1", "s", "nav"), Edge::new("e2", "nav", "c")],
    )
}

#[test]
fn test_stale_selector_replaced() {
    let original = workflow("button#submit");
    let result = update_selectors_for_page(&original, URL, &dom());

    assert_eq!(
        result.updates,
        vec![SelectorUpdate {
            node_id: "c".to_string(),
            old_selector: "button#submit".to_string(),
            new_selector: "#go".to_string(),
        }]
    );
    assert_eq!(result.workflow.node("c").unwrap().selector(), Some("#go"));
    assert!(result.workflow.same_topology(&original));
    assert_eq!(result.workflow.nodes.len(), 3);
    assert_eq!(result.workflow.edges.len(), 2);
    assert_eq!(original.node("c").unwrap().selector(), Some("button#submit"));
}

#[test]
fn test_second_pass_is_a_no_op() {
    let first = update_selectors_for_page(&workflow("button#submit"), URL, &dom());
    let second = update_selectors_for_page(&first.workflow, URL, &dom());
    assert!(second.updates.is_empty());
    assert_eq!(second.workflow, first.workflow);
}

#[test]
fn test_resolving_selector_untouched() {
    let result = update_selectors_for_page(&workflow("#help"), URL, &dom());
    assert!(result.updates.is_empty());
    assert_eq!(result.workflow.node("c").unwrap().selector(), Some("#help"));
}

#[test]
fn test_other_pages_untouched() {
    let result = update_selectors_for_page(&workflow("button#submit"), "https://example.com/other", &dom());
    assert!(result.updates.is_empty());
}

#[test]
fn test_unsupported_selector_only_repaired_when_failing() {
    let original = workflow("//button[@id='submit']");
    let result = update_selectors_for_page(&original, URL, &dom());
    assert!(result.updates.is_empty());

    let failure = ErrorAnalysis::new(ErrorCategory::Selector, "Element not found")
        .with_node("c")
        .with_failed_selector("//button[@id='submit']");
    let result = update_page(&original, URL, &dom(), &[failure]);
    assert_eq!(result.updates.len(), 1);
    assert_eq!(result.updates[0].new_selector, "#go");
}

#[test]
fn test_correct_selector_preferred_when_it_resolves() {
    let original = workflow("#submit");
    let failure = ErrorAnalysis::new(ErrorCategory::Selector, "Element not found: #submit")
        .with_node("c")
        .with_correct_selector("#help");
    let result = update_page(&original, URL, &dom(), &[failure]);
    assert_eq!(result.workflow.node("c").unwrap().selector(), Some("#help"));

    let failure = ErrorAnalysis::new(ErrorCategory::Selector, "Element not found: button#submit")
        .with_node("c")
        .with_correct_selector("#nope");
    let result = update_page(&workflow("button#submit"), URL, &dom(), &[failure]);
    assert_eq!(result.workflow.node("c").unwrap().selector(), Some("#go"));
}

#[test]
fn test_failing_node_without_recorded_url() {
    let original = Workflow::new(
        vec![
            Node::new("s", node_types::START),
            Node::new("c", node_types::CLICK).with_data("selector", "button.submit"),
        ],
        vec![Edge::new("e1", "s", "c")],
    );
    assert!(update_selectors_for_page(&original, URL, &dom()).updates.is_empty());

    let failure = ErrorAnalysis::new(ErrorCategory::Selector, "Element not found: button.submit")
        .with_node("c");
    let result = update_page(&original, URL, &dom(), &[failure]);
    assert_eq!(result.workflow.node("c").unwrap().selector(), Some("#go"));
}

#[test]
fn test_same_page() {
    assert!(same_page("https://example.com/login", "https://example.com/login/"));
    assert!(same_page("https://example.com/login#top", "https://EXAMPLE.com/login"));
    assert!(!same_page("https://example.com/login", "https://example.com/logout"));
}
