//! Open event payload with non-panicking field access.

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The open key/value payload carried in an envelope's `data` field.
///
/// Payloads are produced by the command side and may be partially populated.
/// The accessors here never panic and never error: a missing or mistyped
/// field yields the zero value for its kind (`""`, `0`, `None`), so a
/// degraded payload degrades the projection instead of blocking it.
/// Completeness validation belongs to the command side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventData(Map<String, Value>);

impl EventData {
    /// Creates an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a payload from a serializable value.
    ///
    /// Non-object values produce an empty payload.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        match serde_json::to_value(value)? {
            Value::Object(map) => Ok(Self(map)),
            _ => Ok(Self::default()),
        }
    }

    /// Inserts a field, replacing any existing value under the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Returns the raw value for a key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns true when the payload has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of top-level fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// String field, `""` when absent or not a string.
    pub fn str_or_default(&self, key: &str) -> String {
        match self.0.get(key) {
            Some(Value::String(s)) => s.clone(),
            _ => String::new(),
        }
    }

    /// Decimal field, `0` when absent or unparseable.
    ///
    /// Accepts decimal strings (`"100.00"`) and JSON numbers.
    pub fn decimal_or_default(&self, key: &str) -> Decimal {
        match self.0.get(key) {
            Some(Value::String(s)) => s.parse().unwrap_or(Decimal::ZERO),
            Some(Value::Number(n)) => n
                .to_string()
                .parse()
                .unwrap_or(Decimal::ZERO),
            _ => Decimal::ZERO,
        }
    }

    /// Integer field, `0` when absent or not an integer.
    pub fn i64_or_default(&self, key: &str) -> i64 {
        match self.0.get(key) {
            Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
            _ => 0,
        }
    }

    /// Boolean field, `false` when absent or not a boolean.
    pub fn bool_or_default(&self, key: &str) -> bool {
        matches!(self.0.get(key), Some(Value::Bool(true)))
    }

    /// Nested object field, `None` when absent or not an object.
    pub fn map(&self, key: &str) -> Option<&Map<String, Value>> {
        self.0.get(key).and_then(Value::as_object)
    }

    /// Array field, `None` when absent or not an array.
    pub fn list(&self, key: &str) -> Option<&Vec<Value>> {
        self.0.get(key).and_then(Value::as_array)
    }

    /// RFC 3339 timestamp field, `None` when absent or unparseable.
    pub fn datetime(&self, key: &str) -> Option<chrono::DateTime<chrono::Utc>> {
        match self.0.get(key) {
            Some(Value::String(s)) => chrono::DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&chrono::Utc)),
            _ => None,
        }
    }

    /// Decodes the whole payload into a typed struct.
    ///
    /// This is the one place handlers deserialize event payloads: each event
    /// name has a small schema struct with serde defaults, decoded once per
    /// invocation instead of field-by-field extraction inside the handler.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.0.clone()))
    }

    /// Returns the underlying map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for EventData {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for EventData {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> EventData {
        let mut data = EventData::new();
        data.insert("name", json!("Acme"));
        data.insert("total", json!("100.00"));
        data.insert("count", json!(3));
        data.insert("active", json!(true));
        data.insert("address", json!({"city": "Lima"}));
        data.insert("tags", json!(["a", "b"]));
        data.insert("when", json!("2024-05-01T12:00:00Z"));
        data
    }

    #[test]
    fn string_access_with_default() {
        let data = sample();
        assert_eq!(data.str_or_default("name"), "Acme");
        assert_eq!(data.str_or_default("missing"), "");
        assert_eq!(data.str_or_default("count"), "");
    }

    #[test]
    fn decimal_access_with_default() {
        let data = sample();
        assert_eq!(data.decimal_or_default("total"), Decimal::new(10000, 2));
        assert_eq!(data.decimal_or_default("count"), Decimal::from(3));
        assert_eq!(data.decimal_or_default("missing"), Decimal::ZERO);
        assert_eq!(data.decimal_or_default("name"), Decimal::ZERO);
    }

    #[test]
    fn integer_and_bool_access() {
        let data = sample();
        assert_eq!(data.i64_or_default("count"), 3);
        assert_eq!(data.i64_or_default("missing"), 0);
        assert!(data.bool_or_default("active"));
        assert!(!data.bool_or_default("missing"));
    }

    #[test]
    fn map_and_list_access() {
        let data = sample();
        assert_eq!(
            data.map("address").and_then(|m| m.get("city")),
            Some(&json!("Lima"))
        );
        assert!(data.map("missing").is_none());
        assert!(data.map("name").is_none());
        assert_eq!(data.list("tags").map(Vec::len), Some(2));
        assert!(data.list("missing").is_none());
    }

    #[test]
    fn datetime_access() {
        let data = sample();
        let when = data.datetime("when").unwrap();
        assert_eq!(when.to_rfc3339(), "2024-05-01T12:00:00+00:00");
        assert!(data.datetime("name").is_none());
        assert!(data.datetime("missing").is_none());
    }

    #[test]
    fn typed_decode_with_defaults() {
        #[derive(Debug, serde::Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Payload {
            name: String,
            #[serde(default)]
            nickname: String,
        }

        let data = sample();
        let payload: Payload = data.decode().unwrap();
        assert_eq!(payload.name, "Acme");
        assert_eq!(payload.nickname, "");
    }

    #[test]
    fn serde_transparency() {
        let data = sample();
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json.get("name"), Some(&json!("Acme")));
        let back: EventData = serde_json::from_value(json).unwrap();
        assert_eq!(back, data);
    }
}
