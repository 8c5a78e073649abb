//! Core types for the logline pipeline.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::OnceLock;

/// Stable type tag of a log event.
///
/// Destinations are mapped to log types through this tag, never through
/// runtime type information.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogType(pub String);

impl LogType {
    /// Creates a log type from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Returns the log type as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LogType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for LogType {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for LogType {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identity of a configured delivery backend.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DestinationId(pub String);

impl DestinationId {
    /// Creates a destination ID from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Returns the destination ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DestinationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for DestinationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DestinationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// An application-defined log event.
///
/// Most applications implement [`TypedLog`] instead and get this trait
/// through the blanket impl.
pub trait LogEvent: Send + Sync {
    /// The stable type tag used for destination lookup.
    fn log_type(&self) -> LogType;

    /// Structured representation handed to serializers and filters.
    fn to_value(&self) -> serde_json::Result<Value>;
}

/// A serializable log event with a compile-time type tag.
///
/// ```
/// use logline::TypedLog;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct ClickLog {
///     id: u32,
///     name: String,
/// }
///
/// impl TypedLog for ClickLog {
///     const LOG_TYPE: &'static str = "click";
/// }
/// ```
pub trait TypedLog: Serialize + Send + Sync {
    /// The stable type tag for this event type.
    const LOG_TYPE: &'static str;
}

impl<T: TypedLog> LogEvent for T {
    fn log_type(&self) -> LogType {
        LogType::from(T::LOG_TYPE)
    }

    fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

/// Process-wide record id counter, seeded lazily from the wall clock.
static NEXT_RECORD_ID: OnceLock<AtomicI64> = OnceLock::new();

fn record_id_counter() -> &'static AtomicI64 {
    NEXT_RECORD_ID.get_or_init(|| AtomicI64::new(Utc::now().timestamp_micros()))
}

/// Identity of a serialized record.
///
/// Primary key in durable stores and the deletion key after delivery.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl RecordId {
    /// Allocates the next process-unique record id.
    ///
    /// Ids are monotonic within a process and seeded from the current time in
    /// microseconds. Durable stores raise the floor with
    /// [`advance_past`](Self::advance_past).
    pub fn next() -> Self {
        Self(record_id_counter().fetch_add(1, Ordering::Relaxed))
    }

    /// Moves the allocator past `id`, so every later [`next`](Self::next)
    /// returns a larger id.
    ///
    /// Durable stores call this with their largest held id when opened. A
    /// wall clock that went backwards since the records were written would
    /// otherwise hand out ids that are already taken.
    pub fn advance_past(id: RecordId) {
        record_id_counter().fetch_max(id.0.saturating_add(1), Ordering::Relaxed);
    }

    /// Returns the raw id.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A serialized copy of one log event destined for one destination.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedRecord {
    /// Unique record id.
    pub id: RecordId,
    /// Type tag of the originating event.
    pub log_type: LogType,
    /// Type tag of the serializer that produced the payload.
    pub serializer_type: String,
    /// Destination this copy is delivered to.
    pub destination: DestinationId,
    /// Serialized event.
    pub payload: String,
    /// Creation time in Unix milliseconds.
    pub created_at_ms: i64,
}

impl SerializedRecord {
    /// Creates a record with a freshly allocated id.
    pub fn new(
        log_type: LogType,
        serializer_type: impl Into<String>,
        destination: DestinationId,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            id: RecordId::next(),
            log_type,
            serializer_type: serializer_type.into(),
            destination,
            payload: payload.into(),
            created_at_ms: Utc::now().timestamp_millis(),
        }
    }
}

/// Result of handing one batch to a sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// The batch was accepted by the backend.
    Delivered,
    /// The backend refused the batch permanently.
    Rejected,
    /// Transient failure, retry on a later cycle.
    Deferred,
}

impl DeliveryOutcome {
    /// Whether the delivered batch is removed from the store.
    pub fn removes_records(&self) -> bool {
        matches!(self, Self::Delivered | Self::Rejected)
    }
}

impl std::fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Delivered => "delivered",
            Self::Rejected => "rejected",
            Self::Deferred => "deferred",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of one destination group within a delivery cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleOutcome {
    /// The destination the group was delivered to.
    pub destination: DestinationId,
    /// What the sender reported.
    pub outcome: DeliveryOutcome,
    /// Number of records in the group.
    pub record_count: usize,
}
