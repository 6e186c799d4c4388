use serde_json::Value;
use thiserror::Error;

/// Errors raised while reading decoded chain payloads.
///
/// Every variant here is an invariant violation: either the upstream stream
/// is corrupted or it comes from a protocol version this engine does not
/// understand. Callers abort the current block on any of these.
#[derive(Debug, Error)]
pub enum ChainDataError {
    #[error("required field `{0}` is missing")]
    MissingField(String),
    #[error("field `{field}` is not a {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },
    #[error("unrecognized operation status `{0}`")]
    UnknownStatus(String),
}

/// Borrowed view over a decoded JSON payload with required/optional typed
/// field access.
///
/// A missing required field is fatal; a missing optional field is a typed
/// absence the caller defaults. Numeric chain fields arrive either as JSON
/// numbers or as decimal strings, so both encodings are accepted.
#[derive(Debug, Clone, Copy)]
pub struct RawObject<'a>(&'a Value);

impl<'a> RawObject<'a> {
    pub fn new(value: &'a Value) -> Self {
        Self(value)
    }

    pub fn value(&self) -> &'a Value {
        self.0
    }

    pub fn required(&self, key: &str) -> Result<RawObject<'a>, ChainDataError> {
        self.0
            .get(key)
            .map(RawObject)
            .ok_or_else(|| ChainDataError::MissingField(key.to_string()))
    }

    pub fn optional(&self, key: &str) -> Option<RawObject<'a>> {
        self.0.get(key).filter(|v| !v.is_null()).map(RawObject)
    }

    pub fn required_str(&self, key: &str) -> Result<&'a str, ChainDataError> {
        self.required(key)?.0.as_str().ok_or(ChainDataError::WrongType {
            field: key.to_string(),
            expected: "string",
        })
    }

    pub fn optional_str(&self, key: &str) -> Option<&'a str> {
        self.optional(key).and_then(|v| v.0.as_str())
    }

    pub fn required_i64(&self, key: &str) -> Result<i64, ChainDataError> {
        as_i64(self.required(key)?.0).ok_or(ChainDataError::WrongType {
            field: key.to_string(),
            expected: "integer",
        })
    }

    pub fn optional_i64(&self, key: &str) -> Option<i64> {
        self.optional(key).and_then(|v| as_i64(v.0))
    }

    pub fn required_array(
        &self,
        key: &str,
    ) -> Result<impl Iterator<Item = RawObject<'a>>, ChainDataError> {
        self.required(key)?
            .0
            .as_array()
            .map(|a| a.iter().map(RawObject))
            .ok_or(ChainDataError::WrongType {
                field: key.to_string(),
                expected: "array",
            })
    }

    pub fn optional_array(&self, key: &str) -> Option<impl Iterator<Item = RawObject<'a>>> {
        self.optional(key)
            .and_then(|v| v.0.as_array())
            .map(|a| a.iter().map(RawObject))
    }
}

/// Chain payloads encode 64-bit quantities as decimal strings; smaller ones
/// as plain numbers.
fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn required_fields_resolve() {
        let payload = json!({"source": "tz1abc", "amount": "450", "counter": 7});
        let raw = RawObject::new(&payload);
        assert_eq!(raw.required_str("source").unwrap(), "tz1abc");
        assert_eq!(raw.required_i64("amount").unwrap(), 450);
        assert_eq!(raw.required_i64("counter").unwrap(), 7);
    }

    #[test]
    fn missing_required_field_is_fatal() {
        let payload = json!({});
        let raw = RawObject::new(&payload);
        let err = raw.required_str("source").unwrap_err();
        assert!(matches!(err, ChainDataError::MissingField(f) if f == "source"));
    }

    #[test]
    fn optional_absence_is_none() {
        let payload = json!({"destination": null});
        let raw = RawObject::new(&payload);
        assert!(raw.optional_str("destination").is_none());
        assert!(raw.optional_i64("consumed_gas").is_none());
    }

    #[test]
    fn nested_required_traversal() {
        let payload = json!({"metadata": {"operation_result": {"status": "applied"}}});
        let raw = RawObject::new(&payload);
        let result = raw.required("metadata").unwrap().required("operation_result").unwrap();
        assert_eq!(result.required_str("status").unwrap(), "applied");
    }

    #[test]
    fn arrays_iterate_in_order() {
        let payload = json!({"originated_contracts": ["KT1a", "KT1b"]});
        let raw = RawObject::new(&payload);
        let addrs: Vec<_> = raw
            .required_array("originated_contracts")
            .unwrap()
            .filter_map(|v| v.value().as_str())
            .collect();
        assert_eq!(addrs, vec!["KT1a", "KT1b"]);
    }
}
