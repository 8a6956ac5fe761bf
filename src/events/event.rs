//! # The immutable event value.
//!
//! An [`Event`] is built once at publish time via [`Event::builder`] and never
//! mutated afterward. The dispatcher hands read-only references to every
//! observer invocation, so the value carries cheaply cloneable fields
//! (`Arc<str>` text, `Arc`-wrapped payload).
//!
//! ## Identity
//! Every event gets a v4 UUID at build time; equality and hashing use the id
//! only.
//!
//! ## Example
//! ```
//! use eventvisor::{Event, EventKind, Severity};
//!
//! let event = Event::builder(EventKind::PriceAlert, "pricing", "BTC over threshold")
//!     .metadata("symbol", "BTC-USD")
//!     .metadata("price", 104_250.0)
//!     .correlation_id("alert-7")
//!     .build()
//!     .unwrap();
//!
//! // Severity defaults from the kind unless set explicitly.
//! assert_eq!(event.severity(), Severity::High);
//! assert_eq!(event.metadata("symbol").and_then(|v| v.as_str()), Some("BTC-USD"));
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use uuid::Uuid;

use crate::error::EventError;
use crate::events::types::{EventKind, Severity};

/// A typed metadata entry.
///
/// Metadata is a string-keyed map; values keep their type so consumers can
/// read them back without parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    /// Text value.
    Str(Arc<str>),
    /// Integer value.
    Int(i64),
    /// Floating-point value.
    Float(f64),
    /// Boolean value.
    Bool(bool),
}

impl MetaValue {
    /// Returns the text value, if this entry is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer value, if this entry is one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            MetaValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the float value, if this entry is one.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            MetaValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the boolean value, if this entry is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetaValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<&str> for MetaValue {
    fn from(v: &str) -> Self {
        MetaValue::Str(Arc::from(v))
    }
}

impl From<String> for MetaValue {
    fn from(v: String) -> Self {
        MetaValue::Str(Arc::from(v.as_str()))
    }
}

impl From<i64> for MetaValue {
    fn from(v: i64) -> Self {
        MetaValue::Int(v)
    }
}

impl From<f64> for MetaValue {
    fn from(v: f64) -> Self {
        MetaValue::Float(v)
    }
}

impl From<bool> for MetaValue {
    fn from(v: bool) -> Self {
        MetaValue::Bool(v)
    }
}

/// Immutable system event.
///
/// Construct with [`Event::builder`]; all fields are read-only afterwards.
/// Cloning is cheap for the text fields and payload (shared `Arc`s); the
/// metadata map is copied.
#[derive(Clone)]
pub struct Event {
    id: Uuid,
    kind: EventKind,
    severity: Severity,
    source: Arc<str>,
    message: Arc<str>,
    at: SystemTime,
    metadata: HashMap<String, MetaValue>,
    payload: Option<Arc<dyn Any + Send + Sync>>,
    correlation_id: Option<Arc<str>>,
}

impl Event {
    /// Starts building an event of the given kind.
    ///
    /// `source` names the origin (service, module) and `message` describes
    /// the occurrence; both must be non-empty at [`build`](EventBuilder::build).
    pub fn builder(
        kind: EventKind,
        source: impl Into<Arc<str>>,
        message: impl Into<Arc<str>>,
    ) -> EventBuilder {
        EventBuilder {
            kind,
            severity: None,
            source: source.into(),
            message: message.into(),
            metadata: HashMap::new(),
            payload: None,
            correlation_id: None,
        }
    }

    /// Unique event id, generated at build time.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Event category.
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Event severity (explicit or defaulted from the kind).
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Free-text origin of the event.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Human-readable description.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Wall-clock creation time.
    pub fn at(&self) -> SystemTime {
        self.at
    }

    /// Looks up a metadata entry by key.
    pub fn metadata(&self, key: &str) -> Option<&MetaValue> {
        self.metadata.get(key)
    }

    /// Number of metadata entries.
    pub fn metadata_len(&self) -> usize {
        self.metadata.len()
    }

    /// Attempts to view the payload as a concrete type.
    ///
    /// Returns `None` when there is no payload or the type does not match.
    pub fn payload_as<T: Any>(&self) -> Option<&T> {
        self.payload.as_ref().and_then(|p| p.downcast_ref::<T>())
    }

    /// Correlation id linking this event to a larger flow, if any.
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    /// True when severity is `Critical` (delivered synchronously).
    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }

    /// True when severity is `Critical` or `High`.
    pub fn is_high_priority(&self) -> bool {
        self.severity.is_high_priority()
    }

    /// True when an opaque payload is attached.
    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }

    /// True when a correlation id is attached.
    pub fn has_correlation_id(&self) -> bool {
        self.correlation_id.is_some()
    }
}

/// Equality is by id only: two events with the same id are the same event.
impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Event {}

impl std::hash::Hash for Event {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("severity", &self.severity)
            .field("source", &self.source)
            .field("message", &self.message)
            .field("metadata_len", &self.metadata.len())
            .field("has_payload", &self.payload.is_some())
            .field("correlation_id", &self.correlation_id)
            .finish()
    }
}

/// Builder returned by [`Event::builder`].
pub struct EventBuilder {
    kind: EventKind,
    severity: Option<Severity>,
    source: Arc<str>,
    message: Arc<str>,
    metadata: HashMap<String, MetaValue>,
    payload: Option<Arc<dyn Any + Send + Sync>>,
    correlation_id: Option<Arc<str>>,
}

impl EventBuilder {
    /// Overrides the severity defaulted from the event kind.
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Adds one metadata entry.
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Attaches an opaque payload, retrievable via
    /// [`Event::payload_as`].
    pub fn payload<T: Any + Send + Sync>(mut self, payload: T) -> Self {
        self.payload = Some(Arc::new(payload));
        self
    }

    /// Attaches a correlation id.
    pub fn correlation_id(mut self, id: impl Into<Arc<str>>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Finalizes the event: assigns id and timestamp, defaults the severity
    /// from the kind when unset, and validates text fields.
    pub fn build(self) -> Result<Event, EventError> {
        if self.source.trim().is_empty() {
            return Err(EventError::Empty { field: "source" });
        }
        if self.message.trim().is_empty() {
            return Err(EventError::Empty { field: "message" });
        }

        let kind = self.kind;
        let severity = self.severity.unwrap_or_else(|| kind.default_severity());

        Ok(Event {
            id: Uuid::new_v4(),
            kind,
            severity,
            source: self.source,
            message: self.message,
            at: SystemTime::now(),
            metadata: self.metadata,
            payload: self.payload,
            correlation_id: self.correlation_id,
        })
    }
}
