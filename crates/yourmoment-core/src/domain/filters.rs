//! Discovery filter set consumed by the discovery worker's `list_articles` call.

use serde::{Deserialize, Serialize};

/// Filters narrowing which upstream articles a discovery pass considers.
///
/// Stored as a JSON `TEXT` column on `monitoring_processes` (`filters_json`)
/// and parsed into this struct on read; a JSON blob fits here since the
/// field set is a small, process-owned nested object rather than a
/// top-level config section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessFilters {
    /// Upstream "tab"/section names to restrict discovery to, if non-empty.
    #[serde(default)]
    pub tabs: Vec<String>,
    /// Upstream category to restrict discovery to.
    #[serde(default)]
    pub category: Option<String>,
    /// Keywords an article's title or content must match.
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl ProcessFilters {
    /// Parse filters from their stored JSON representation.
    ///
    /// An empty string is treated as "no filters" rather than an error, so
    /// rows created before this column existed still load cleanly.
    pub fn from_json(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Self::default();
        }
        serde_json::from_str(raw).unwrap_or_default()
    }

    /// Serialize filters for storage.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let filters = ProcessFilters {
            tabs: vec!["front-page".to_string()],
            category: Some("tech".to_string()),
            keywords: vec!["rust".to_string(), "async".to_string()],
        };
        let json = filters.to_json();
        let parsed = ProcessFilters::from_json(&json);
        assert_eq!(filters, parsed);
    }

    #[test]
    fn empty_string_is_default() {
        assert_eq!(ProcessFilters::from_json(""), ProcessFilters::default());
    }

    #[test]
    fn malformed_json_falls_back_to_default() {
        assert_eq!(ProcessFilters::from_json("not json"), ProcessFilters::default());
    }
}
