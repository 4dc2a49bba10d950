//! Structural request identity.

use crate::client::params::ParamMap;
use crate::model::types::SearchKind;

/// Cache and dedup key derived from a request's semantic parameters.
///
/// Two fingerprints compare equal when the requests they describe are
/// interchangeable: same query text, kind, page window, and parameter map.
/// Parameter insertion order does not participate; the map is ordered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestFingerprint {
    pub query: String,
    pub kind: SearchKind,
    pub page: u64,
    pub per_page: u64,
    pub params: ParamMap,
}

impl RequestFingerprint {
    pub fn new(
        query: impl Into<String>,
        kind: SearchKind,
        page: u64,
        per_page: u64,
        params: ParamMap,
    ) -> Self {
        Self {
            query: query.into(),
            kind,
            page,
            per_page,
            params,
        }
    }
}
