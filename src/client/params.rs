//! Caller-supplied request parameters and their query-string encoding.
//!
//! Parameters are flat: strings, numbers, booleans, or arrays of those.
//! Nested containers cannot be query-encoded; the [`ParamValue`] enum keeps
//! objects out by construction and [`append_query_pairs`] rejects arrays
//! inside arrays.

use std::collections::BTreeMap;

use url::Url;

use crate::client::QueryError;

/// A single request parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamValue {
    Str(String),
    Num(serde_json::Number),
    Bool(bool),
    List(Vec<ParamValue>),
}

/// Parameter map attached to a query. Ordered so that request identity is
/// insensitive to insertion order.
pub type ParamMap = BTreeMap<String, ParamValue>;

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Str(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Num(value.into())
    }
}

impl From<u64> for ParamValue {
    fn from(value: u64) -> Self {
        ParamValue::Num(value.into())
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl ParamValue {
    /// Convert a JSON value supplied by the caller. Objects, nulls, and
    /// non-finite numbers have no query-string representation.
    pub fn from_json(key: &str, value: &serde_json::Value) -> Result<Self, QueryError> {
        use serde_json::Value;
        let invalid = |reason: &str| QueryError::InvalidParameter {
            key: key.to_string(),
            reason: reason.to_string(),
        };
        match value {
            Value::String(s) => Ok(ParamValue::Str(s.clone())),
            Value::Number(n) => Ok(ParamValue::Num(n.clone())),
            Value::Bool(b) => Ok(ParamValue::Bool(*b)),
            Value::Array(items) => {
                let mut list = Vec::with_capacity(items.len());
                for item in items {
                    let converted = Self::from_json(key, item)?;
                    if matches!(converted, ParamValue::List(_)) {
                        return Err(invalid("arrays may not nest"));
                    }
                    list.push(converted);
                }
                Ok(ParamValue::List(list))
            }
            Value::Null => Err(invalid("null has no query-string form")),
            Value::Object(_) => Err(invalid("nested objects cannot be query-encoded")),
        }
    }

    fn scalar_text(&self) -> Option<String> {
        match self {
            ParamValue::Str(s) => Some(s.clone()),
            ParamValue::Num(n) => Some(n.to_string()),
            ParamValue::Bool(b) => Some(if *b { "true" } else { "false" }.to_string()),
            ParamValue::List(_) => None,
        }
    }
}

/// Append `params` to `url` as percent-encoded query pairs.
///
/// Scalars encode as `key=value`; arrays repeat the key once per element.
pub fn append_query_pairs(url: &mut Url, params: &ParamMap) -> Result<(), QueryError> {
    let mut pairs = url.query_pairs_mut();
    for (key, value) in params {
        match value {
            ParamValue::List(items) => {
                for item in items {
                    let text =
                        item.scalar_text()
                            .ok_or_else(|| QueryError::InvalidParameter {
                                key: key.clone(),
                                reason: "arrays may only hold strings, numbers, and booleans"
                                    .to_string(),
                            })?;
                    pairs.append_pair(key, &text);
                }
            }
            ParamValue::Str(s) => {
                pairs.append_pair(key, s);
            }
            ParamValue::Num(n) => {
                pairs.append_pair(key, &n.to_string());
            }
            ParamValue::Bool(b) => {
                pairs.append_pair(key, if *b { "true" } else { "false" });
            }
        }
    }
    Ok(())
}
