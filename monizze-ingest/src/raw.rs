//! Raw history pages.
//!
//! The history endpoint answers with:
//!
//! ```text
//! {
//!   "data": { "<voucher>": [ { "id": .., "date": .., "amount": .., "detail": .. }, .. ], .. },
//!   "next_cursor": "<opaque>" | 123 | null
//! }
//! ```
//!
//! An empty history may come back as `"data": []`. Anything else is schema
//! drift and is reported instead of guessed around.

use monizze_core::{Error, Result};
use serde_json::{Map, Value};

/// One entry exactly as the platform returned it, tagged with its voucher bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEntry {
    pub voucher: String,
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawPage {
    pub entries: Vec<RawEntry>,
    pub next_cursor: Option<String>,
}

impl RawPage {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decode a response body.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| Error::Protocol(format!("response is not JSON: {e}")))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut root) = value else {
            return Err(Error::Protocol("response is not a JSON object".into()));
        };

        let entries = match root.remove("data") {
            Some(Value::Object(buckets)) => flatten_buckets(buckets)?,
            Some(Value::Array(items)) if items.is_empty() => Vec::new(),
            Some(other) => {
                return Err(Error::Protocol(format!(
                    "`data` should be an object of voucher buckets, got {}",
                    kind(&other)
                )));
            }
            None => return Err(Error::Protocol("response has no `data` field".into())),
        };

        let next_cursor = match root.remove("next_cursor") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(other) => {
                return Err(Error::Protocol(format!(
                    "`next_cursor` should be a string, number or null, got {}",
                    kind(&other)
                )));
            }
        };

        Ok(RawPage {
            entries,
            next_cursor,
        })
    }
}

fn flatten_buckets(buckets: Map<String, Value>) -> Result<Vec<RawEntry>> {
    let mut entries = Vec::new();
    for (voucher, bucket) in buckets {
        let items = match bucket {
            Value::Array(items) => items,
            other => {
                return Err(Error::Protocol(format!(
                    "voucher bucket `{voucher}` should be a list, got {}",
                    kind(&other)
                )));
            }
        };
        for item in items {
            let fields = match item {
                Value::Object(fields) => fields,
                other => {
                    return Err(Error::Protocol(format!(
                        "entry in voucher bucket `{voucher}` should be an object, got {}",
                        kind(&other)
                    )));
                }
            };
            entries.push(RawEntry {
                voucher: voucher.clone(),
                fields,
            });
        }
    }
    Ok(entries)
}

pub(crate) fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_with_two_buckets() {
        let page = RawPage::from_value(json!({
            "data": {
                "eco": [{"id": "E1", "date": "2024-02-01", "amount": "-10.00", "detail": "Bio shop"}],
                "meal": [
                    {"id": "M1", "date": "2024-02-02", "amount": "8.00", "detail": "Monthly credit"},
                    {"id": "M2", "date": "2024-02-03", "amount": "-6.40", "detail": "Bakery"}
                ]
            },
            "next_cursor": "abc"
        }))
        .unwrap();

        assert_eq!(page.entries.len(), 3);
        assert_eq!(page.next_cursor.as_deref(), Some("abc"));
        assert_eq!(page.entries.iter().filter(|e| e.voucher == "meal").count(), 2);
    }

    #[test]
    fn test_empty_list_data_and_numeric_cursor() {
        let page = RawPage::from_value(json!({"data": [], "next_cursor": 40})).unwrap();
        assert!(page.is_empty());
        assert_eq!(page.next_cursor.as_deref(), Some("40"));

        let page = RawPage::from_value(json!({"data": {}})).unwrap();
        assert!(page.is_empty());
        assert_eq!(page.next_cursor, None);
    }

    #[test]
    fn test_schema_drift_is_protocol_error() {
        let bad = [
            json!({"items": []}),
            json!({"data": "nope"}),
            json!({"data": [1, 2]}),
            json!({"data": {"meal": {"id": 1}}}),
            json!({"data": {"meal": ["T1"]}}),
            json!({"data": {}, "next_cursor": true}),
            json!([1, 2, 3]),
        ];
        for body in bad {
            let err = RawPage::from_value(body.clone()).unwrap_err();
            assert!(matches!(err, Error::Protocol(_)), "{body} gave {err:?}");
        }

        let err = RawPage::from_slice(b"<html>login</html>").unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }
}
