//! Wire-level entity structs.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of query run against the search API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchKind {
    /// No query has run yet.
    #[default]
    Undefined,
    /// Lightweight autocomplete query; never paginated.
    Suggest,
    /// Full search query; may be paginated.
    Search,
}

impl SearchKind {
    /// Endpoint path segment serving this kind of query.
    pub fn endpoint(self) -> &'static str {
        match self {
            SearchKind::Suggest => "suggest",
            // Undefined never reaches the wire; callers normalize to Search.
            SearchKind::Undefined | SearchKind::Search => "search",
        }
    }
}

impl fmt::Display for SearchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchKind::Undefined => write!(f, "undefined"),
            SearchKind::Suggest => write!(f, "suggest"),
            SearchKind::Search => write!(f, "search"),
        }
    }
}

/// Identifier of one record category ("document type") in the result set.
///
/// The caller supplies the ordered list of keys that defines which
/// categories are displayed and in what order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionKey(String);

impl SectionKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SectionKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for SectionKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One opaque result record.
///
/// The server guarantees a string `id`; every other field passes through
/// untouched for the presentation layer to interpret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(pub serde_json::Map<String, serde_json::Value>);

impl Record {
    /// The record's document id, when present and a string.
    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(|v| v.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }
}

/// Per-section paging metadata reported by the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectionInfo {
    #[serde(default)]
    pub current_page: u64,
    #[serde(default)]
    pub num_pages: u64,
    #[serde(default)]
    pub per_page: u64,
    #[serde(default)]
    pub total_result_count: u64,
}

/// Parsed response payload for suggest and search queries.
///
/// `record` is the only required field: a map from section-key string to an
/// array of records. Paging metadata arrives either as explicit per-section
/// `hasMore` flags or as per-section `info` page counters; the explicit flag
/// wins when both are present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchPayload {
    pub record: BTreeMap<String, Vec<Record>>,
    #[serde(default)]
    pub info: BTreeMap<String, SectionInfo>,
    #[serde(default, rename = "hasMore", alias = "has_more")]
    pub has_more: BTreeMap<String, bool>,
}

impl SearchPayload {
    /// Whether `section` has another page, per the response metadata.
    pub fn has_more_for(&self, section: &str) -> bool {
        if let Some(flag) = self.has_more.get(section) {
            return *flag;
        }
        self.info
            .get(section)
            .is_some_and(|info| info.num_pages > info.current_page)
    }

    /// The page this payload represents for `section`, when reported.
    pub fn page_for(&self, section: &str) -> Option<u64> {
        self.info.get(section).map(|info| info.current_page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: serde_json::Value) -> SearchPayload {
        serde_json::from_value(value).expect("payload should decode")
    }

    #[test]
    fn payload_decodes_records_and_ids() {
        let payload = decode(json!({
            "record": {
                "article": [{"id": "1", "title": "Intro"}],
                "page": [{"id": "2"}]
            }
        }));
        assert_eq!(payload.record["article"].len(), 1);
        assert_eq!(payload.record["article"][0].id(), Some("1"));
        assert_eq!(
            payload.record["article"][0].get("title"),
            Some(&json!("Intro"))
        );
    }

    #[test]
    fn payload_without_record_field_is_rejected() {
        let result = serde_json::from_value::<SearchPayload>(json!({"info": {}}));
        assert!(result.is_err());
    }

    #[test]
    fn explicit_has_more_flag_wins_over_info() {
        let payload = decode(json!({
            "record": {"article": []},
            "info": {"article": {"current_page": 1, "num_pages": 5}},
            "hasMore": {"article": false}
        }));
        assert!(!payload.has_more_for("article"));
    }

    #[test]
    fn has_more_falls_back_to_page_counters() {
        let payload = decode(json!({
            "record": {"article": [], "page": []},
            "info": {
                "article": {"current_page": 1, "num_pages": 3},
                "page": {"current_page": 3, "num_pages": 3}
            }
        }));
        assert!(payload.has_more_for("article"));
        assert!(!payload.has_more_for("page"));
        assert!(!payload.has_more_for("unknown"));
    }

    #[test]
    fn search_kind_endpoints() {
        assert_eq!(SearchKind::Suggest.endpoint(), "suggest");
        assert_eq!(SearchKind::Search.endpoint(), "search");
        assert_eq!(SearchKind::Undefined.endpoint(), "search");
    }
}
