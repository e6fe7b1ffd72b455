//! Selector evaluation and replacement ranking over a parsed snapshot.

use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use webpilot_protocols::{Node, PageDebugInfo};

use super::hints::{normalize_text, tokenize, Hints};

static CSS_IDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?[A-Za-z_][\w-]*$").expect("valid regex"));

/// Attributes written for automation, most preferred first.
const TEST_ID_ATTRS: &[&str] = &["data-testid", "data-test", "data-qa", "data-cy"];

const IGNORED_TAGS: &[&str] = &[
    "html", "head", "body", "script", "style", "meta", "link", "title", "noscript", "template",
    "br",
];

const INTERACTIVE_TAGS: &[&str] = &["a", "button", "input", "select", "textarea", "option", "label"];

/// Longest element text that still counts as a label rather than a container.
const MAX_TEXT_LEN: usize = 80;

/// Whether a selector matches anything in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Number of matching elements.
    Matches(usize),
    /// The selector uses syntax the index cannot evaluate (XPath, engine chains).
    Unsupported,
}

impl Resolution {
    pub fn resolves(self) -> bool {
        matches!(self, Self::Matches(n) if n > 0)
    }
}

/// A replacement selector and the evidence score of its element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub selector: String,
    pub score: i32,
}

/// Parsed page snapshot.
pub struct DomIndex {
    document: Html,
}

impl DomIndex {
    pub fn parse(html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
        }
    }

    pub fn from_page(page: &PageDebugInfo) -> Self {
        Self::parse(&page.html)
    }

    /// Evaluate a selector against the snapshot.
    pub fn resolve(&self, selector: &str) -> Resolution {
        let selector = selector.trim();
        if let Some(text) = selector.strip_prefix("text=") {
            return Resolution::Matches(self.text_matches(text).len());
        }
        let css = selector.strip_prefix("css=").unwrap_or(selector);
        if css.is_empty() || css.starts_with('/') || css.starts_with("xpath=") || css.contains(">>") {
            return Resolution::Unsupported;
        }
        match Selector::parse(css) {
            Ok(parsed) => Resolution::Matches(self.document.select(&parsed).count()),
            Err(_) => Resolution::Unsupported,
        }
    }

    /// Ranked replacements for a failed selector, best first.
    ///
    /// Every returned selector matches exactly one element. Ranking is
    /// deterministic: score, then interactive elements, then deeper elements,
    /// then document order.
    pub fn candidates(&self, failed_selector: Option<&str>, node: Option<&Node>) -> Vec<Candidate> {
        let mut hints = failed_selector.map(Hints::from_selector).unwrap_or_default();
        if let Some(label) = node.and_then(Node::label) {
            hints.add_label(label);
        }
        if hints.is_empty() {
            return Vec::new();
        }

        let elements: Vec<ElementRef<'_>> = self.elements().collect();
        let unique_tag = hints.tag.as_deref().filter(|tag| {
            elements.iter().filter(|el| el.value().name() == *tag).count() == 1
        });

        let mut scored: Vec<(i32, bool, usize, usize, ElementRef<'_>)> = elements
            .iter()
            .enumerate()
            .filter_map(|(order, el)| {
                let evidence = evidence(el, &hints, unique_tag);
                if evidence < 3 {
                    return None;
                }
                let name = el.value().name();
                let mut score = evidence;
                if hints.tag.as_deref() == Some(name) {
                    score += 2;
                }
                let interactive = is_interactive(el);
                if interactive {
                    score += 1;
                }
                Some((score, interactive, depth(el), order, *el))
            })
            .collect();

        scored.sort_by(|a, b| {
            b.0.cmp(&a.0)
                .then(b.1.cmp(&a.1))
                .then(b.2.cmp(&a.2))
                .then(a.3.cmp(&b.3))
        });

        let failed = failed_selector.map(str::trim);
        let mut seen = HashSet::new();
        scored
            .into_iter()
            .filter_map(|(score, _, _, _, el)| {
                let selector = self.stable_selector(el)?;
                if Some(selector.as_str()) == failed || !seen.insert(selector.clone()) {
                    return None;
                }
                Some(Candidate { selector, score })
            })
            .collect()
    }

    /// Best replacement for a failed selector.
    pub fn best_replacement(&self, failed_selector: Option<&str>, node: Option<&Node>) -> Option<String> {
        self.candidates(failed_selector, node)
            .into_iter()
            .next()
            .map(|c| c.selector)
    }

    /// Most robust selector that uniquely matches `el`.
    ///
    /// Preference: test ids, `name`, `aria-label`, `id`, a minimal structural
    /// path, then exact text.
    fn stable_selector(&self, el: ElementRef<'_>) -> Option<String> {
        let element = el.value();
        let tag = element.name();

        for attr in TEST_ID_ATTRS {
            if let Some(value) = element.attr(attr).filter(|v| !v.trim().is_empty()) {
                let selector = format!("[{}=\"{}\"]", attr, escape(value));
                if self.matches_only(&selector, el) {
                    return Some(selector);
                }
            }
        }

        if let Some(name) = element.attr("name").filter(|v| !v.trim().is_empty()) {
            let selector = format!("{}[name=\"{}\"]", tag, escape(name));
            if self.matches_only(&selector, el) {
                return Some(selector);
            }
        }

        if let Some(label) = element.attr("aria-label").filter(|v| !v.trim().is_empty()) {
            for selector in [
                format!("[aria-label=\"{}\"]", escape(label)),
                format!("{}[aria-label=\"{}\"]", tag, escape(label)),
            ] {
                if self.matches_only(&selector, el) {
                    return Some(selector);
                }
            }
        }

        if let Some(id) = element.id().filter(|v| !v.trim().is_empty()) {
            let selector = id_selector(id);
            if self.matches_only(&selector, el) {
                return Some(selector);
            }
        }

        if let Some(path) = self.structural_path(el) {
            return Some(path);
        }

        let text = element_text(&el);
        if !text.is_empty() && text.len() <= MAX_TEXT_LEN {
            let matches = self.text_matches(&format!("\"{}\"", text));
            if matches.len() == 1 && matches[0] == el {
                return Some(format!("text=\"{}\"", text));
            }
        }
        None
    }

    /// Shortest `parent > child:nth-of-type(n)` chain that is unique,
    /// anchored at the nearest ancestor with an id.
    fn structural_path(&self, el: ElementRef<'_>) -> Option<String> {
        let mut segments: Vec<String> = Vec::new();
        let mut current = Some(el);

        while let Some(element) = current {
            let name = element.value().name();
            if name == "html" {
                break;
            }

            let anchor = element
                .value()
                .id()
                .filter(|id| element != el && CSS_IDENT.is_match(id));
            let segment = match anchor {
                Some(id) => format!("#{}", id),
                None => positional_segment(&element),
            };
            segments.insert(0, segment);

            let selector = segments.join(" > ");
            if self.matches_only(&selector, el) {
                return Some(selector);
            }
            if anchor.is_some() {
                break;
            }
            current = element.parent().and_then(ElementRef::wrap);
        }
        None
    }

    fn matches_only(&self, selector: &str, el: ElementRef<'_>) -> bool {
        let Ok(parsed) = Selector::parse(selector) else {
            return false;
        };
        let mut matches = self.document.select(&parsed);
        matches.next() == Some(el) && matches.next().is_none()
    }

    /// Innermost elements whose text matches a `text=` selector body.
    ///
    /// A quoted body matches the whole text exactly; an unquoted one is a
    /// case-insensitive substring match.
    fn text_matches(&self, body: &str) -> Vec<ElementRef<'_>> {
        let body = body.trim();
        let exact = body
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .or_else(|| body.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')));
        let matcher = |el: &ElementRef<'_>| -> bool {
            let text = element_text(el);
            match exact {
                Some(expected) => text == normalize_text(expected),
                None => text.to_lowercase().contains(&normalize_text(body).to_lowercase()),
            }
        };
        if exact.is_none() && body.is_empty() {
            return Vec::new();
        }

        self.elements()
            .filter(|el| matcher(el))
            .filter(|el| !el.children().filter_map(ElementRef::wrap).any(|child| matcher(&child)))
            .collect()
    }

    fn elements(&self) -> impl Iterator<Item = ElementRef<'_>> + '_ {
        self.document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| !IGNORED_TAGS.contains(&el.value().name()))
    }
}

/// How strongly an element matches the hints, before tag bonuses.
fn evidence(el: &ElementRef<'_>, hints: &Hints, unique_tag: Option<&str>) -> i32 {
    let element = el.value();
    let mut score = 0;

    if let Some(id) = element.id() {
        if hints.ids.iter().any(|h| h == id) {
            score += 10;
        } else {
            score += 3 * overlap(&tokenize(id), hints).min(2);
        }
    }

    let classes: Vec<&str> = element.classes().collect();
    score += 3 * hints.classes.iter().filter(|c| classes.contains(&c.as_str())).count() as i32;
    let class_tokens: BTreeSet<String> = classes.iter().flat_map(|c| tokenize(c)).collect();
    score += overlap(&class_tokens, hints).min(3);

    for (name, value) in &hints.attrs {
        match element.attr(name) {
            Some(actual) if actual == value => score += 6,
            Some(actual) => score += 2 * overlap(&tokenize(actual), hints).min(1),
            None => {}
        }
    }

    let stable_values: BTreeSet<String> = TEST_ID_ATTRS
        .iter()
        .chain(["name", "aria-label", "placeholder", "title", "alt", "value"].iter())
        .filter_map(|attr| element.attr(attr))
        .flat_map(tokenize)
        .collect();
    score += 3 * overlap(&stable_values, hints).min(2);

    let text = element_text(el);
    if !text.is_empty() && text.len() <= MAX_TEXT_LEN {
        let lower = text.to_lowercase();
        if hints.texts.iter().any(|t| *t == lower) {
            score += 8;
        } else if hints.texts.iter().any(|t| lower.contains(t.as_str())) {
            score += 4;
        }
        score += 2 * overlap(&tokenize(&text), hints).min(2);
    }

    if unique_tag == Some(element.name()) {
        score += 3;
    }
    score
}

fn overlap(tokens: &BTreeSet<String>, hints: &Hints) -> i32 {
    tokens.intersection(&hints.tokens).count() as i32
}

fn is_interactive(el: &ElementRef<'_>) -> bool {
    let element = el.value();
    INTERACTIVE_TAGS.contains(&element.name())
        || matches!(element.attr("role"), Some("button" | "link" | "tab" | "menuitem"))
}

fn depth(el: &ElementRef<'_>) -> usize {
    el.ancestors().count()
}

fn element_text(el: &ElementRef<'_>) -> String {
    normalize_text(&el.text().collect::<String>())
}

fn positional_segment(el: &ElementRef<'_>) -> String {
    let name = el.value().name();
    let same_tag = |sibling: &ElementRef<'_>| sibling.value().name() == name;
    let before = el
        .prev_siblings()
        .filter_map(ElementRef::wrap)
        .filter(same_tag)
        .count();
    let after = el
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .filter(same_tag)
        .count();
    if before + after == 0 {
        name.to_string()
    } else {
        format!("{}:nth-of-type({})", name, before + 1)
    }
}

fn id_selector(id: &str) -> String {
    if CSS_IDENT.is_match(id) {
        format!("#{}", id)
    } else {
        format!("[id=\"{}\"]", escape(id))
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
#[path = "index_tests.rs"]
mod tests;
