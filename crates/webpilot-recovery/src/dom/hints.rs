//! Clues about the intended element, pulled out of a broken selector.
//!
//! Understands CSS, Playwright text engines (`text=`, `:has-text()`) and the
//! common XPath predicates (`@attr=`, `contains(text(), ...)`).

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""[^"]*"|'[^']*'"#).expect("valid regex"));
static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]|\([^)]*\)").expect("valid regex"));
static CSS_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#([A-Za-z_][\w-]*)").expect("valid regex"));
static CSS_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.([A-Za-z_][\w-]*)").expect("valid regex"));
static CSS_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\[\s*([\w:-]+)\s*[~|^$*]?=\s*(?:"([^"]*)"|'([^']*)'|([^\]\s]+))\s*\]"#)
        .expect("valid regex")
});
static XPATH_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@([\w:-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex")
});
static XPATH_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/([A-Za-z][\w-]*)").expect("valid regex"));
static LEADING_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9-]*)").expect("valid regex"));
static TEXT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"^text\s*=\s*"([^"]+)"\s*$"#,
        r#"^text\s*=\s*'([^']+)'\s*$"#,
        r#"^text\s*=\s*([^"'].*?)\s*$"#,
        r#":(?:has-text|text|contains)\(\s*["']([^"']+)["']\s*\)"#,
        r#"contains\(\s*(?:text\(\)|\.)\s*,\s*["']([^"']+)["']\s*\)"#,
        r#"(?:text\(\)|normalize-space\(\s*(?:text\(\)|\.)?\s*\))\s*=\s*["']([^"']+)["']"#,
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

/// Words too generic to identify an element.
const STOP_WORDS: &[&str] = &[
    "btn", "button", "the", "and", "for", "click", "type", "into", "div", "span", "input",
    "link", "data", "testid", "test", "class", "name", "text", "has", "contains", "xpath", "css",
    "on", "to", "of", "a", "an", "in",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Hints {
    pub ids: Vec<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<(String, String)>,
    pub tag: Option<String>,
    /// Lowercased, whitespace-normalised text the element should carry.
    pub texts: Vec<String>,
    pub tokens: BTreeSet<String>,
}

impl Hints {
    pub fn from_selector(selector: &str) -> Self {
        let selector = selector.trim();
        let mut hints = Self::default();

        for pattern in TEXT_PATTERNS.iter() {
            if let Some(text) = pattern.captures(selector).and_then(|c| c.get(1)) {
                hints.add_text(text.as_str());
            }
        }

        let xpath = selector.starts_with('/')
            || selector.starts_with("xpath=")
            || selector.starts_with("(/");
        if xpath {
            for caps in XPATH_ATTR.captures_iter(selector) {
                let value = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
                hints.add_attr(&caps[1], value);
            }
            let path = BRACKETED.replace_all(selector, "");
            hints.tag = XPATH_TAG
                .captures_iter(&path)
                .last()
                .map(|c| c[1].to_ascii_lowercase());
        } else if !selector.starts_with("text=") {
            for caps in CSS_ATTR.captures_iter(selector) {
                let value = caps
                    .get(2)
                    .or_else(|| caps.get(3))
                    .or_else(|| caps.get(4))
                    .map_or("", |m| m.as_str());
                hints.add_attr(&caps[1], value);
            }

            let unquoted = QUOTED.replace_all(selector, "");
            let bare = BRACKETED.replace_all(&unquoted, "");
            for caps in CSS_ID.captures_iter(&bare) {
                hints.add_id(&caps[1]);
            }
            for caps in CSS_CLASS.captures_iter(&bare) {
                hints.add_class(&caps[1]);
            }

            let last = bare
                .split(|c: char| c.is_whitespace() || matches!(c, '>' | '+' | '~'))
                .filter(|part| !part.is_empty())
                .last()
                .unwrap_or("");
            hints.tag = LEADING_TAG
                .captures(last)
                .map(|c| c[1].to_ascii_lowercase());
        }

        hints
    }

    /// Add the words of a node label.
    pub fn add_label(&mut self, label: &str) {
        self.tokens.extend(tokenize(label));
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
            && self.classes.is_empty()
            && self.attrs.is_empty()
            && self.tag.is_none()
            && self.texts.is_empty()
            && self.tokens.is_empty()
    }

    fn add_id(&mut self, id: &str) {
        self.tokens.extend(tokenize(id));
        self.ids.push(id.to_string());
    }

    fn add_class(&mut self, class: &str) {
        self.tokens.extend(tokenize(class));
        self.classes.push(class.to_string());
    }

    fn add_attr(&mut self, name: &str, value: &str) {
        match name {
            "id" => self.add_id(value),
            "class" => value.split_whitespace().for_each(|c| self.add_class(c)),
            _ => {
                self.tokens.extend(tokenize(value));
                self.attrs.push((name.to_string(), value.to_string()));
            }
        }
    }

    fn add_text(&mut self, text: &str) {
        let text = normalize_text(text).to_lowercase();
        if text.is_empty() || self.texts.contains(&text) {
            return;
        }
        self.tokens.extend(tokenize(&text));
        self.texts.push(text);
    }
}

/// Collapse runs of whitespace and trim.
pub(crate) fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase identifying words, splitting on punctuation and camelCase.
pub(crate) fn tokenize(value: &str) -> BTreeSet<String> {
    let mut spaced = String::with_capacity(value.len() + 8);
    let mut prev_lower = false;
    for c in value.chars() {
        if c.is_uppercase() && prev_lower {
            spaced.push(' ');
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        spaced.push(if c.is_alphanumeric() { c } else { ' ' });
    }

    spaced
        .split_whitespace()
        .map(str::to_lowercase)
        .filter(|w| w.len() >= 2 && !STOP_WORDS.contains(&w.as_str()))
        .collect()
}
