//! Serializers turn log events into persisted payloads.
//!
//! A serializer may run an ordered chain of [`Filter`]s over the structured
//! representation before encoding it. Every filter runs, in registration
//! order, and the output of the last one is what gets encoded.

use crate::error::SerializeError;
use crate::types::LogEvent;
use chrono::Utc;
use serde_json::Value;

/// Converts a log event into a wire-ready string.
pub trait Serializer: Send + Sync {
    /// Type tag stored alongside every record this serializer produces.
    fn type_tag(&self) -> &str;

    /// Serializes one event.
    fn serialize(&self, event: &dyn LogEvent) -> Result<String, SerializeError>;
}

/// A mutating step over the in-progress structured representation.
///
/// Filters must not fail for well-formed input; they may inject derived
/// values such as a capture timestamp.
pub trait Filter: Send + Sync {
    /// Returns the (possibly mutated) representation.
    fn apply(&self, value: Value) -> Value;
}

impl<F> Filter for F
where
    F: Fn(Value) -> Value + Send + Sync,
{
    fn apply(&self, value: Value) -> Value {
        self(value)
    }
}

/// JSON serializer with a filter chain.
#[derive(Default)]
pub struct JsonSerializer {
    filters: Vec<Box<dyn Filter>>,
}

impl JsonSerializer {
    /// Type tag written into every record.
    pub const TYPE_TAG: &'static str = "logline.json";

    /// Creates a serializer with no filters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a filter to the chain.
    pub fn register_filter(&mut self, filter: impl Filter + 'static) {
        self.filters.push(Box::new(filter));
    }

    /// Builder-style variant of [`register_filter`](Self::register_filter).
    pub fn with_filter(mut self, filter: impl Filter + 'static) -> Self {
        self.register_filter(filter);
        self
    }

    /// Number of registered filters.
    pub fn filter_count(&self) -> usize {
        self.filters.len()
    }
}

impl Serializer for JsonSerializer {
    fn type_tag(&self) -> &str {
        Self::TYPE_TAG
    }

    fn serialize(&self, event: &dyn LogEvent) -> Result<String, SerializeError> {
        let value = event.to_value()?;
        let value = self
            .filters
            .iter()
            .fold(value, |value, filter| filter.apply(value));
        Ok(serde_json::to_string(&value)?)
    }
}

/// Injects the capture time (Unix milliseconds) into object payloads.
///
/// Non-object values pass through untouched.
#[derive(Debug, Clone)]
pub struct TimestampFilter {
    field: String,
}

impl TimestampFilter {
    /// Default field name.
    pub const DEFAULT_FIELD: &'static str = "captured_at";

    /// Creates a filter writing to the given field.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }
}

impl Default for TimestampFilter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_FIELD)
    }
}

impl Filter for TimestampFilter {
    fn apply(&self, mut value: Value) -> Value {
        if let Value::Object(map) = &mut value {
            map.insert(
                self.field.clone(),
                Value::from(Utc::now().timestamp_millis()),
            );
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypedLog;
    use serde::Serialize;

    #[derive(Serialize)]
    struct ClickLog {
        id: u32,
        name: String,
    }

    impl TypedLog for ClickLog {
        const LOG_TYPE: &'static str = "click";
    }

    fn click() -> ClickLog {
        ClickLog {
            id: 1,
            name: "jack".to_string(),
        }
    }

    #[test]
    fn serializes_without_filters() {
        let serializer = JsonSerializer::new();
        let payload = serializer.serialize(&click()).unwrap();
        assert_eq!(payload, r#"{"id":1,"name":"jack"}"#);
        assert_eq!(serializer.type_tag(), JsonSerializer::TYPE_TAG);
    }

    #[test]
    fn filters_run_in_registration_order() {
        let serializer = JsonSerializer::new()
            .with_filter(|mut v: Value| {
                v["step"] = Value::from("first");
                v
            })
            .with_filter(|mut v: Value| {
                let prev = v["step"].as_str().unwrap_or_default().to_string();
                v["step"] = Value::from(format!("{prev},second"));
                v
            });

        let payload = serializer.serialize(&click()).unwrap();
        let value: Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["step"], "first,second");
        assert_eq!(serializer.filter_count(), 2);
    }

    #[test]
    fn last_filter_output_is_final_payload() {
        let serializer = JsonSerializer::new()
            .with_filter(|v: Value| v)
            .with_filter(|_: Value| Value::from("replaced"));

        let payload = serializer.serialize(&click()).unwrap();
        assert_eq!(payload, r#""replaced""#);
    }

    #[test]
    fn timestamp_filter_injects_field() {
        let serializer = JsonSerializer::new().with_filter(TimestampFilter::default());
        let payload = serializer.serialize(&click()).unwrap();
        let value: Value = serde_json::from_str(&payload).unwrap();
        assert!(value[TimestampFilter::DEFAULT_FIELD].as_i64().unwrap() > 0);
        assert_eq!(value["name"], "jack");
    }

    #[test]
    fn timestamp_filter_skips_non_objects() {
        let filter = TimestampFilter::new("ts");
        assert_eq!(filter.apply(Value::from(3)), Value::from(3));
    }
}
