//! # Security observer.
//!
//! [`SecurityObserver`] watches security-relevant event kinds and applies two
//! detection heuristics to login traffic, keyed by `user:ip`:
//!
//! - **brute force**: a streak of failed logins reaching the alert threshold;
//! - **rate limit**: total attempts within the last hour exceeding the cap.
//!
//! Alerts go to the `security_log` tracing target. Expected login metadata:
//! `user_id` (text), `ip_address` (text, optional), `success` (bool; missing
//! counts as a failure).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::error::ObserverError;
use crate::events::{Event, EventKind, MetaValue};
use crate::observers::Observer;

const RATE_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Per-identity login attempt history.
struct LoginTracker {
    attempts: Vec<Instant>,
    failed_streak: u32,
}

impl LoginTracker {
    fn new() -> Self {
        Self {
            attempts: Vec::new(),
            failed_streak: 0,
        }
    }

    fn record(&mut self, now: Instant, success: bool) {
        self.attempts.retain(|t| now.duration_since(*t) < RATE_WINDOW);
        self.attempts.push(now);
        if success {
            self.failed_streak = 0;
        } else {
            self.failed_streak += 1;
        }
    }

    fn attempts_in_window(&self) -> u32 {
        self.attempts.len() as u32
    }
}

/// Observer that monitors security-relevant events.
///
/// Highest priority so security handling runs first on critical events.
pub struct SecurityObserver {
    id: String,
    max_attempts_per_hour: u32,
    alert_threshold: u32,
    trackers: Mutex<HashMap<String, LoginTracker>>,
}

impl SecurityObserver {
    /// Creates an observer with explicit thresholds.
    pub fn new(id: impl Into<String>, max_attempts_per_hour: u32, alert_threshold: u32) -> Self {
        Self {
            id: id.into(),
            max_attempts_per_hour,
            alert_threshold,
            trackers: Mutex::new(HashMap::new()),
        }
    }

    /// Creates an observer with the default thresholds:
    /// 10 attempts per hour, alert after 3 consecutive failures.
    pub fn with_defaults(id: impl Into<String>) -> Self {
        Self::new(id, 10, 3)
    }

    fn handle_login(&self, event: &Event) {
        let Some(user) = event.metadata("user_id").and_then(MetaValue::as_str) else {
            warn!(event_id = %event.id(), "login event missing user_id metadata");
            return;
        };
        let ip = event
            .metadata("ip_address")
            .and_then(MetaValue::as_str)
            .unwrap_or("unknown");
        let success = event
            .metadata("success")
            .and_then(MetaValue::as_bool)
            .unwrap_or(false);

        let key = format!("{user}:{ip}");
        let (streak, in_window) = {
            let mut trackers = self.trackers.lock().expect("tracker mutex poisoned");
            let tracker = trackers.entry(key).or_insert_with(LoginTracker::new);
            tracker.record(Instant::now(), success);
            (tracker.failed_streak, tracker.attempts_in_window())
        };

        if success {
            info!(target: "security_log", user, ip, event_id = %event.id(), "successful login");
        } else {
            warn!(target: "security_log", user, ip, event_id = %event.id(), "failed login attempt");
            if streak >= self.alert_threshold {
                error!(
                    target: "security_log",
                    alert = "brute_force_detected",
                    user,
                    ip,
                    failed_attempts = streak,
                    event_id = %event.id(),
                    "potential brute force attack"
                );
            }
        }

        if in_window > self.max_attempts_per_hour {
            error!(
                target: "security_log",
                alert = "rate_limit_exceeded",
                user,
                ip,
                attempts_last_hour = in_window,
                event_id = %event.id(),
                "login rate limit exceeded"
            );
        }
    }

    fn handle_system_error(&self, event: &Event) {
        let message = event.message().to_ascii_lowercase();
        let security_related = ["authentication", "authorization", "access denied", "permission"]
            .iter()
            .any(|needle| message.contains(needle));
        if security_related {
            error!(
                target: "security_log",
                alert = "security_system_error",
                event_id = %event.id(),
                message = event.message(),
                "security-related system error"
            );
        }
    }

    fn handle_config_change(&self, event: &Event) {
        let change_type = event
            .metadata("change_type")
            .and_then(MetaValue::as_str)
            .unwrap_or("unknown");
        let changed_by = event
            .metadata("changed_by")
            .and_then(MetaValue::as_str)
            .unwrap_or("unknown");
        info!(
            target: "security_log",
            change_type,
            changed_by,
            event_id = %event.id(),
            "configuration change audit"
        );
    }

    #[cfg(test)]
    fn failed_streak(&self, user: &str, ip: &str) -> u32 {
        let trackers = self.trackers.lock().unwrap();
        trackers
            .get(&format!("{user}:{ip}"))
            .map(|t| t.failed_streak)
            .unwrap_or(0)
    }
}

#[async_trait]
impl Observer for SecurityObserver {
    async fn on_event(&self, event: &Event) -> Result<(), ObserverError> {
        match event.kind() {
            EventKind::UserLogin => self.handle_login(event),
            EventKind::UserLogout => {
                let user = event
                    .metadata("user_id")
                    .and_then(MetaValue::as_str)
                    .unwrap_or("unknown");
                info!(target: "security_log", user, event_id = %event.id(), "user logout");
            }
            EventKind::SecurityAlert => {
                error!(
                    target: "security_log",
                    event_id = %event.id(),
                    source = event.source(),
                    message = event.message(),
                    critical = event.is_critical(),
                    "security alert"
                );
            }
            EventKind::SystemError => self.handle_system_error(event),
            EventKind::ConfigurationChanged => self.handle_config_change(event),
            other => debug!(event_id = %event.id(), kind = ?other, "ignoring non-security event"),
        }
        Ok(())
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn priority(&self) -> u8 {
        10
    }

    fn interested_in(&self, kind: EventKind) -> bool {
        matches!(
            kind,
            EventKind::UserLogin
                | EventKind::UserLogout
                | EventKind::SecurityAlert
                | EventKind::SystemError
                | EventKind::ConfigurationChanged
        )
    }

    fn max_processing_time(&self) -> Duration {
        Duration::from_secs(2)
    }

    fn on_registered(&self) {
        info!(
            observer = %self.id,
            max_attempts_per_hour = self.max_attempts_per_hour,
            alert_threshold = self.alert_threshold,
            "security observer registered"
        );
    }

    fn on_unregistered(&self) {
        info!(observer = %self.id, "security observer unregistered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login_event(user: &str, success: bool) -> Event {
        Event::builder(EventKind::UserLogin, "auth", "login attempt")
            .metadata("user_id", user)
            .metadata("ip_address", "10.0.0.1")
            .metadata("success", success)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn failed_logins_accumulate_into_a_streak() {
        let observer = SecurityObserver::with_defaults("security");
        for _ in 0..3 {
            observer.on_event(&login_event("mallory", false)).await.unwrap();
        }
        assert_eq!(observer.failed_streak("mallory", "10.0.0.1"), 3);
    }

    #[tokio::test]
    async fn successful_login_resets_the_streak() {
        let observer = SecurityObserver::with_defaults("security");
        observer.on_event(&login_event("alice", false)).await.unwrap();
        observer.on_event(&login_event("alice", false)).await.unwrap();
        observer.on_event(&login_event("alice", true)).await.unwrap();
        assert_eq!(observer.failed_streak("alice", "10.0.0.1"), 0);
    }

    #[tokio::test]
    async fn login_without_user_id_is_ignored() {
        let observer = SecurityObserver::with_defaults("security");
        let event = Event::builder(EventKind::UserLogin, "auth", "malformed login")
            .build()
            .unwrap();
        assert!(observer.on_event(&event).await.is_ok());
        assert_eq!(observer.failed_streak("unknown", "unknown"), 0);
    }

    #[test]
    fn interest_covers_security_kinds_only() {
        let observer = SecurityObserver::with_defaults("security");
        assert!(observer.interested_in(EventKind::UserLogin));
        assert!(observer.interested_in(EventKind::SecurityAlert));
        assert!(!observer.interested_in(EventKind::MarketDataUpdate));
        assert!(!observer.interested_in(EventKind::BackupCompleted));
    }
}
