//! # Logging observer.
//!
//! [`LogObserver`] records every event through `tracing` at a level mapped
//! from the event's severity, with an extra detail block for critical events.
//!
//! ## Output levels
//! | Severity | Level |
//! |----------|-------|
//! | Critical | error |
//! | High     | warn  |
//! | Medium / Low | info |
//! | Info     | debug |

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::error::ObserverError;
use crate::events::{Event, EventKind, Severity};
use crate::observers::Observer;

/// Observer that logs all events.
///
/// Interested in every kind; high priority so log lines appear before most
/// other observers act on a critical event.
pub struct LogObserver {
    id: String,
    log_payload_types: bool,
}

impl LogObserver {
    /// Creates a logging observer that omits payload details.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            log_payload_types: false,
        }
    }

    /// Also log whether a payload is attached to critical events.
    pub fn with_payload_types(mut self) -> Self {
        self.log_payload_types = true;
        self
    }

    fn log_critical_details(&self, event: &Event) {
        error!(
            event_id = %event.id(),
            kind = event.kind().display_name(),
            source = event.source(),
            message = event.message(),
            correlation_id = event.correlation_id().unwrap_or("-"),
            metadata_len = event.metadata_len(),
            "critical event details"
        );
        if self.log_payload_types && event.has_payload() {
            error!(event_id = %event.id(), "critical event carries an opaque payload");
        }
    }
}

#[async_trait]
impl Observer for LogObserver {
    async fn on_event(&self, event: &Event) -> Result<(), ObserverError> {
        let kind = event.kind().display_name();
        let id = event.id();
        match event.severity() {
            Severity::Critical => {
                error!(target: "event_log", event_id = %id, kind, source = event.source(), message = event.message(), "critical event");
                self.log_critical_details(event);
            }
            Severity::High => {
                warn!(target: "event_log", event_id = %id, kind, source = event.source(), message = event.message(), "high severity event");
            }
            Severity::Medium | Severity::Low => {
                info!(target: "event_log", event_id = %id, kind, source = event.source(), message = event.message(), "event");
            }
            Severity::Info => {
                debug!(target: "event_log", event_id = %id, kind, source = event.source(), message = event.message(), "event");
            }
        }
        Ok(())
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn priority(&self) -> u8 {
        9
    }

    fn interested_in(&self, _kind: EventKind) -> bool {
        true
    }

    fn max_processing_time(&self) -> Duration {
        Duration::from_secs(1)
    }

    fn on_registered(&self) {
        info!(observer = %self.id, "log observer registered");
    }

    fn on_unregistered(&self) {
        info!(observer = %self.id, "log observer unregistered");
    }
}
