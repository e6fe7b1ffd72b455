use super::*;
use crate::workflow::{Edge, Node};

fn linear() -> Workflow {
    Workflow::new(
        vec![
            Node::new("start", "start"),
            Node::new("nav", "navigate").with_data("url", "https://example.com"),
            Node::new("click", "click").with_data("selector", "#go"),
        ],
        vec![
            Edge::new("e1", "start", "nav"),
            Edge::new("e2", "nav", "click"),
        ],
    )
}

#[test]
fn test_valid_linear_workflow() {
    assert!(validate_workflow(&linear()).is_ok());
}

#[test]
fn test_missing_start() {
    let mut workflow = linear();
    workflow.nodes.remove(0);
    workflow.edges.remove(0);
    let err = validate_workflow(&workflow).unwrap_err();
    assert!(matches!(err, EngineError::InvalidGraph(ref m) if m.contains("no start")));
}

#[test]
fn test_two_starts() {
    let mut workflow = linear();
    workflow.nodes.push(Node::new("start2", "start"));
    assert!(matches!(
        validate_workflow(&workflow),
        Err(EngineError::InvalidGraph(_))
    ));
}

#[test]
fn test_duplicate_ids() {
    let mut workflow = linear();
    workflow.nodes.push(Node::new("nav", "click"));
    let err = validate_workflow(&workflow).unwrap_err();
    assert!(err.to_string().contains("duplicate node id 'nav'"));
}

#[test]
fn test_dangling_edge() {
    let mut workflow = linear();
    workflow.edges.push(Edge::new("e3", "click", "ghost"));
    let err = validate_workflow(&workflow).unwrap_err();
    assert!(err.to_string().contains("references unknown node 'ghost'"));
}

#[test]
fn test_non_branch_fan_out_rejected() {
    let mut workflow = linear();
    workflow.nodes.push(Node::new("end", "end"));
    workflow.edges.push(Edge::new("e3", "nav", "end"));
    let err = validate_workflow(&workflow).unwrap_err();
    assert!(matches!(err, EngineError::GraphStructure(_)));
}

#[test]
fn test_loop_handles_resolve() {
    let workflow = Workflow::new(
        vec![
            Node::new("start", "start"),
            Node::new("loop", "loop").with_data("count", 3),
            Node::new("body", "click").with_data("selector", "#a"),
            Node::new("after", "end"),
        ],
        vec![
            Edge::new("e1", "start", "loop"),
            Edge::new("e2", "loop", "after").with_handle("exit"),
            Edge::new("e3", "loop", "body"),
        ],
    );
    assert!(validate_workflow(&workflow).is_ok());

    let handles = resolve_handles(&workflow, workflow.node("loop").unwrap()).unwrap();
    assert_eq!(handles.get(handles::BODY).map(String::as_str), Some("body"));
    assert_eq!(handles.get(handles::EXIT).map(String::as_str), Some("after"));
}

#[test]
fn test_unlabeled_loop_edges_fill_body_then_exit() {
    let workflow = Workflow::new(
        vec![
            Node::new("start", "start"),
            Node::new("loop", "loop").with_data("count", 1),
            Node::new("a", "end"),
            Node::new("b", "end"),
        ],
        vec![
            Edge::new("e1", "start", "loop"),
            Edge::new("e2", "loop", "a"),
            Edge::new("e3", "loop", "b"),
        ],
    );
    let handles = resolve_handles(&workflow, workflow.node("loop").unwrap()).unwrap();
    assert_eq!(handles[handles::BODY], "a");
    assert_eq!(handles[handles::EXIT], "b");
}

#[test]
fn test_duplicate_handle_rejected() {
    let workflow = Workflow::new(
        vec![
            Node::new("start", "start"),
            Node::new("cond", "condition").with_data("variable", "x"),
            Node::new("a", "end"),
            Node::new("b", "end"),
        ],
        vec![
            Edge::new("e1", "start", "cond"),
            Edge::new("e2", "cond", "a").with_handle("true"),
            Edge::new("e3", "cond", "b").with_handle("true"),
        ],
    );
    assert!(matches!(
        validate_workflow(&workflow),
        Err(EngineError::GraphStructure(_))
    ));
}

#[test]
fn test_unknown_handle_rejected() {
    let workflow = Workflow::new(
        vec![
            Node::new("start", "start"),
            Node::new("loop", "loop").with_data("count", 1),
            Node::new("a", "end"),
        ],
        vec![
            Edge::new("e1", "start", "loop"),
            Edge::new("e2", "loop", "a").with_handle("sideways"),
        ],
    );
    let err = validate_workflow(&workflow).unwrap_err();
    assert!(err.to_string().contains("sideways"));
}

#[test]
fn test_terminal_node_has_no_handles() {
    let workflow = linear();
    let handles = resolve_handles(&workflow, workflow.node("click").unwrap()).unwrap();
    assert!(handles.is_empty());
}
