//! Event classification: category catalog and ordered severity.

/// Classification of system events.
///
/// Each kind carries a default [`Severity`] used when the builder is not
/// given an explicit one.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Process came up.
    SystemStartup,
    /// Process is going down.
    SystemShutdown,
    /// A user authenticated (successfully or not; see metadata).
    UserLogin,
    /// A user session ended.
    UserLogout,
    /// A trade completed.
    TradeExecuted,
    /// A trade was rejected or errored.
    TradeFailed,
    /// Market data tick.
    MarketDataUpdate,
    /// A configured price threshold was crossed.
    PriceAlert,
    /// Unrecoverable or unexpected runtime error.
    SystemError,
    /// Resource usage or latency crossed a warning threshold.
    PerformanceWarning,
    /// Security-relevant incident.
    SecurityAlert,
    /// Runtime configuration was changed.
    ConfigurationChanged,
    /// A backup finished.
    BackupCompleted,
    /// Maintenance window was scheduled.
    MaintenanceScheduled,
}

impl EventKind {
    /// Every kind, in declaration order. Handy for interest sets and tests.
    pub const ALL: [EventKind; 14] = [
        EventKind::SystemStartup,
        EventKind::SystemShutdown,
        EventKind::UserLogin,
        EventKind::UserLogout,
        EventKind::TradeExecuted,
        EventKind::TradeFailed,
        EventKind::MarketDataUpdate,
        EventKind::PriceAlert,
        EventKind::SystemError,
        EventKind::PerformanceWarning,
        EventKind::SecurityAlert,
        EventKind::ConfigurationChanged,
        EventKind::BackupCompleted,
        EventKind::MaintenanceScheduled,
    ];

    /// Human-readable name for logs and display.
    pub fn display_name(&self) -> &'static str {
        match self {
            EventKind::SystemStartup => "System Startup",
            EventKind::SystemShutdown => "System Shutdown",
            EventKind::UserLogin => "User Login",
            EventKind::UserLogout => "User Logout",
            EventKind::TradeExecuted => "Trade Executed",
            EventKind::TradeFailed => "Trade Failed",
            EventKind::MarketDataUpdate => "Market Data Update",
            EventKind::PriceAlert => "Price Alert",
            EventKind::SystemError => "System Error",
            EventKind::PerformanceWarning => "Performance Warning",
            EventKind::SecurityAlert => "Security Alert",
            EventKind::ConfigurationChanged => "Configuration Changed",
            EventKind::BackupCompleted => "Backup Completed",
            EventKind::MaintenanceScheduled => "Maintenance Scheduled",
        }
    }

    /// Severity assigned when the publisher does not specify one.
    pub fn default_severity(&self) -> Severity {
        match self {
            EventKind::SystemStartup
            | EventKind::SystemShutdown
            | EventKind::TradeFailed
            | EventKind::SystemError
            | EventKind::SecurityAlert => Severity::Critical,
            EventKind::TradeExecuted | EventKind::PriceAlert | EventKind::PerformanceWarning => {
                Severity::High
            }
            EventKind::UserLogin
            | EventKind::UserLogout
            | EventKind::ConfigurationChanged
            | EventKind::MaintenanceScheduled => Severity::Medium,
            EventKind::BackupCompleted => Severity::Low,
            EventKind::MarketDataUpdate => Severity::Info,
        }
    }
}

/// Ordered event importance; `Critical` is the highest.
///
/// The derived order follows declaration order, so
/// `Severity::Critical > Severity::High > ... > Severity::Info`.
///
/// # Example
/// ```
/// use eventvisor::Severity;
///
/// assert!(Severity::Critical > Severity::High);
/// assert!(Severity::Low > Severity::Info);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    /// Informational noise.
    Info,
    /// Low importance.
    Low,
    /// Routine importance.
    Medium,
    /// Elevated importance.
    High,
    /// Highest importance; delivered synchronously.
    Critical,
}

impl Severity {
    /// Human-readable name for logs and display.
    pub fn display_name(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
            Severity::Info => "Info",
        }
    }

    /// True for `Critical` and `High`.
    pub fn is_high_priority(&self) -> bool {
        *self >= Severity::High
    }
}
