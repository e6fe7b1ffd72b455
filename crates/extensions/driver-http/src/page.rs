//! The loaded document and selector lookups against it.

use std::collections::HashMap;

use scraper::{ElementRef, Html, Selector};
use url::Url;
use webpilot_protocols::{DriverError, PageDebugInfo};

/// Tags that accept typed text.
const EDITABLE_TAGS: &[&str] = &["input", "textarea"];

pub(crate) struct Page {
    pub url: Url,
    pub html: String,
    pub title: Option<String>,
    /// Values typed into fields, keyed by the selector used.
    pub typed: HashMap<String, String>,
}

/// What an action needs to know about the matched element.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ElementInfo {
    pub tag: String,
    pub text: String,
    pub attribute: Option<String>,
    pub link: Option<Url>,
    pub editable: bool,
}

impl Page {
    pub fn new(url: Url, html: String) -> Self {
        let title = parse_selector("title").ok().and_then(|sel| {
            Html::parse_document(&html)
                .select(&sel)
                .next()
                .map(|el| normalize(&el.text().collect::<String>()))
                .filter(|t| !t.is_empty())
        });
        Self {
            url,
            html,
            title,
            typed: HashMap::new(),
        }
    }

    /// Whether the selector matches anything.
    pub fn contains(&self, selector: &str) -> Result<bool, DriverError> {
        let css = parse_selector(selector)?;
        Ok(Html::parse_document(&self.html).select(&css).next().is_some())
    }

    /// First element matching the selector.
    pub fn element(&self, selector: &str, attribute: Option<&str>) -> Result<ElementInfo, DriverError> {
        let css = parse_selector(selector)?;
        let document = Html::parse_document(&self.html);
        let el = document
            .select(&css)
            .next()
            .ok_or_else(|| DriverError::ElementNotFound(selector.to_string()))?;
        Ok(self.describe(el, attribute))
    }

    fn describe(&self, el: ElementRef<'_>, attribute: Option<&str>) -> ElementInfo {
        let element = el.value();
        let tag = element.name().to_string();
        let link = (tag == "a")
            .then(|| element.attr("href"))
            .flatten()
            .and_then(|href| self.url.join(href).ok())
            .filter(|url| matches!(url.scheme(), "http" | "https"));
        ElementInfo {
            editable: EDITABLE_TAGS.contains(&tag.as_str()) || element.attr("contenteditable").is_some(),
            text: normalize(&el.text().collect::<String>()),
            attribute: attribute.and_then(|name| element.attr(name)).map(str::to_string),
            link,
            tag,
        }
    }

    pub fn snapshot(&self) -> PageDebugInfo {
        let info = PageDebugInfo::new(self.url.as_str(), self.html.clone());
        match &self.title {
            Some(title) => info.with_title(title.clone()),
            None => info,
        }
    }
}

/// Parse a CSS selector, accepting an optional `css=` prefix.
fn parse_selector(selector: &str) -> Result<Selector, DriverError> {
    let css = selector.trim();
    let css = css.strip_prefix("css=").unwrap_or(css);
    Selector::parse(css).map_err(|_| DriverError::Unsupported(format!("selector '{}'", selector)))
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(html: &str) -> Page {
        Page::new(Url::parse("https://example.com/app/").unwrap(), html.to_string())
    }

    #[test]
    fn test_title_and_snapshot() {
        let page = page("<html><head><title> Sign  in </title></head><body></body></html>");
        assert_eq!(page.title.as_deref(), Some("Sign in"));
        let snapshot = page.snapshot();
        assert_eq!(snapshot.url, "https://example.com/app/");
        assert_eq!(snapshot.title.as_deref(), Some("Sign in"));
    }

    #[test]
    fn test_element_info() {
        let page = page(r#"<a href="../help" class="x">Get
            help</a><input name="q"><div>plain</div>"#);

        let link = page.element("a.x", Some("class")).unwrap();
        assert_eq!(link.text, "Get help");
        assert_eq!(link.attribute.as_deref(), Some("x"));
        assert_eq!(link.link.unwrap().as_str(), "https://example.com/help");
        assert!(!link.editable);

        assert!(page.element("input[name=q]", None).unwrap().editable);
        assert!(page.element("css=div", None).unwrap().link.is_none());
    }

    #[test]
    fn test_lookup_errors() {
        let page = page("<p>hi</p>");
        assert!(matches!(page.element("#gone", None), Err(DriverError::ElementNotFound(s)) if s == "#gone"));
        assert!(matches!(page.contains("//p"), Err(DriverError::Unsupported(_))));
        assert!(page.contains("p").unwrap());
        assert!(!page.contains("span").unwrap());
    }

    #[test]
    fn test_non_http_links_are_not_followed() {
        let page = page(r#"<a href="mailto:a@b.c">mail</a>"#);
        assert!(page.element("a", None).unwrap().link.is_none());
    }
}
