//! Page-wide selector repair.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use webpilot_protocols::{DomContext, ErrorAnalysis, Workflow};

use super::index::{DomIndex, Resolution};
use crate::modifier::{NodePatch, WorkflowModifier};

/// One selector rewritten by the updater.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorUpdate {
    pub node_id: String,
    pub old_selector: String,
    pub new_selector: String,
}

/// Repaired workflow plus the audit log of rewritten selectors.
#[derive(Debug, Clone)]
pub struct PageUpdate {
    pub workflow: Workflow,
    pub updates: Vec<SelectorUpdate>,
}

/// Repair every selector on `page_url` that no longer resolves in `dom`.
pub fn update_selectors_for_page(workflow: &Workflow, page_url: &str, dom: &DomContext) -> PageUpdate {
    update_page(workflow, page_url, dom, &[])
}

/// Like [`update_selectors_for_page`], with the analyses of the failure.
///
/// Nodes named by `failures` are repaired even when their recorded page URL
/// is unknown or their selector syntax cannot be evaluated, and an analysis'
/// `correct_selector` wins over inference when it resolves.
pub fn update_page(
    workflow: &Workflow,
    page_url: &str,
    dom: &DomContext,
    failures: &[ErrorAnalysis],
) -> PageUpdate {
    let index = DomIndex::from_page(dom);
    let urls = workflow.page_urls();
    let mut patches = Vec::new();
    let mut updates = Vec::new();

    for node in &workflow.nodes {
        let Some(old) = node.selector() else {
            continue;
        };
        let failing = failures
            .iter()
            .find(|a| a.node_id.as_deref() == Some(node.id.as_str()));
        let on_page = urls.get(&node.id).is_some_and(|url| same_page(url, page_url));
        if !on_page && failing.is_none() {
            continue;
        }

        match index.resolve(old) {
            resolution if resolution.resolves() => continue,
            Resolution::Unsupported if failing.is_none() => {
                debug!(node = %node.id, selector = old, "Selector syntax not evaluable; leaving as is");
                continue;
            }
            _ => {}
        }

        let suggested = failing
            .and_then(|a| a.correct_selector.as_deref())
            .filter(|s| index.resolve(s) == Resolution::Matches(1))
            .map(str::to_string);
        let Some(new) = suggested.or_else(|| index.best_replacement(Some(old), Some(node))) else {
            debug!(node = %node.id, selector = old, "No replacement selector found");
            continue;
        };
        if new == old {
            continue;
        }

        info!(node = %node.id, old = old, new = %new, "Selector updated");
        patches.push(NodePatch::selector(node.id.clone(), new.clone()));
        updates.push(SelectorUpdate {
            node_id: node.id.clone(),
            old_selector: old.to_string(),
            new_selector: new,
        });
    }

    PageUpdate {
        workflow: WorkflowModifier::apply(workflow, &patches).workflow,
        updates,
    }
}

/// Whether two URLs name the same page, ignoring fragments and a trailing slash.
pub fn same_page(a: &str, b: &str) -> bool {
    fn normalize(url: &str) -> &str {
        let url = url.trim();
        let url = url.split('#').next().unwrap_or(url);
        url.trim_end_matches('/')
    }
    normalize(a).eq_ignore_ascii_case(normalize(b))
}

#[cfg(test)]
#[path = "updater_tests.rs"]
mod tests;
