//! Error analysis produced by the analyzer and consumed by fix strategies.

use serde::{Deserialize, Serialize};

/// Failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Selector,
    MissingNode,
    Configuration,
    Timeout,
    Other,
}

impl ErrorCategory {
    pub fn default_severity(self) -> Severity {
        match self {
            Self::Selector | Self::Configuration => Severity::High,
            Self::MissingNode => Severity::Critical,
            Self::Timeout | Self::Other => Severity::Medium,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Selector => "selector",
            Self::MissingNode => "missing_node",
            Self::Configuration => "configuration",
            Self::Timeout => "timeout",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// One classified failure with the hints fixers need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorAnalysis {
    pub category: ErrorCategory,
    pub severity: Severity,
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extracted_selectors: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_selector: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_selector: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_url: Option<String>,

    /// Required fields found missing (configuration errors).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_fields: Vec<String>,
}

impl ErrorAnalysis {
    /// Create an analysis with the category's default severity.
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            severity: category.default_severity(),
            message: message.into(),
            node_id: None,
            suggested_fix: None,
            extracted_selectors: Vec::new(),
            correct_selector: None,
            failed_selector: None,
            page_url: None,
            missing_fields: Vec::new(),
        }
    }

    pub fn with_node(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    pub fn with_suggested_fix(mut self, fix: impl Into<String>) -> Self {
        self.suggested_fix = Some(fix.into());
        self
    }

    pub fn with_failed_selector(mut self, selector: impl Into<String>) -> Self {
        self.failed_selector = Some(selector.into());
        self
    }

    pub fn with_correct_selector(mut self, selector: impl Into<String>) -> Self {
        self.correct_selector = Some(selector.into());
        self
    }

    pub fn with_page_url(mut self, url: impl Into<String>) -> Self {
        self.page_url = Some(url.into());
        self
    }

    pub fn with_extracted_selectors(mut self, selectors: Vec<String>) -> Self {
        self.extracted_selectors = selectors;
        self
    }

    pub fn with_missing_fields(mut self, fields: Vec<String>) -> Self {
        self.missing_fields = fields;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_severity() {
        assert_eq!(ErrorCategory::Selector.default_severity(), Severity::High);
        assert_eq!(ErrorCategory::MissingNode.default_severity(), Severity::Critical);
        assert_eq!(ErrorCategory::Timeout.default_severity(), Severity::Medium);
        assert!(Severity::Critical > Severity::High);
    }

    #[test]
    fn test_serialization_uses_camel_case() {
        let analysis = ErrorAnalysis::new(ErrorCategory::Selector, "Element not found: #a")
            .with_node("n1")
            .with_failed_selector("#a")
            .with_correct_selector("#b");
        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(json["category"], "selector");
        assert_eq!(json["severity"], "high");
        assert_eq!(json["nodeId"], "n1");
        assert_eq!(json["failedSelector"], "#a");
        assert_eq!(json["correctSelector"], "#b");
        assert!(json.get("extractedSelectors").is_none());
    }

    #[test]
    fn test_deserialize_minimal() {
        let analysis: ErrorAnalysis = serde_json::from_value(json!({
            "category": "missing_node",
            "severity": "critical",
            "message": "Node not found: x"
        }))
        .unwrap();
        assert_eq!(analysis.category, ErrorCategory::MissingNode);
        assert!(analysis.node_id.is_none());
    }
}
