pub mod collectors;

/// Reasons a request is turned away before reaching the accounting loop
pub mod reject_reasons {
    pub const MISSING_ID: &str = "missing_id";
    pub const INVALID_ID: &str = "invalid_id";
    pub const QUEUE_FULL: &str = "queue_full";
    pub const QUEUE_CLOSED: &str = "queue_closed";
}

/// Outcomes of a callback delivery
pub mod notify_outcomes {
    pub const DELIVERED: &str = "delivered";
    pub const FAILED: &str = "failed";
    /// Every delivery slot was busy, so the notification was never sent
    pub const DROPPED: &str = "dropped";
}

use collectors::{OutcomeLabel, ReasonLabel};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

/// Centralized metrics registry
pub struct MetricsRegistry {
    pub registry: Registry,
    pub records_accepted_total: Counter,
    pub requests_rejected_total: Family<ReasonLabel, Counter>,
    pub records_duplicate_total: Counter,
    pub identifiers_new_total: Counter,
    pub windows_rotated_total: Counter,
    /// Unique identifiers in the window currently open
    pub window_unique_current: Gauge,
    /// Unique identifiers counted by the most recently closed window
    pub window_unique_last: Gauge,
    pub notifications_total: Family<OutcomeLabel, Counter>,
    pub window_log_write_errors_total: Counter,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let records_accepted_total = Counter::default();
        registry.register(
            "uniqd_records_accepted",
            "Records handed to the ingest queue",
            records_accepted_total.clone(),
        );

        let requests_rejected_total = Family::<ReasonLabel, Counter>::default();
        registry.register(
            "uniqd_requests_rejected",
            "Requests refused before reaching the accounting loop",
            requests_rejected_total.clone(),
        );

        let records_duplicate_total = Counter::default();
        registry.register(
            "uniqd_records_duplicate",
            "Records whose identifier was already seen in the current window",
            records_duplicate_total.clone(),
        );

        let identifiers_new_total = Counter::default();
        registry.register(
            "uniqd_identifiers_new",
            "Identifiers admitted as new to their window",
            identifiers_new_total.clone(),
        );

        let windows_rotated_total = Counter::default();
        registry.register(
            "uniqd_windows_rotated",
            "Window rotations performed by the ticker",
            windows_rotated_total.clone(),
        );

        let window_unique_current = Gauge::default();
        registry.register(
            "uniqd_window_unique_current",
            "Unique identifiers in the open window",
            window_unique_current.clone(),
        );

        let window_unique_last = Gauge::default();
        registry.register(
            "uniqd_window_unique_last",
            "Unique identifiers counted by the last closed window",
            window_unique_last.clone(),
        );

        let notifications_total = Family::<OutcomeLabel, Counter>::default();
        registry.register(
            "uniqd_notifications",
            "Callback deliveries by outcome",
            notifications_total.clone(),
        );

        let window_log_write_errors_total = Counter::default();
        registry.register(
            "uniqd_window_log_write_errors",
            "Failed writes to the window log file",
            window_log_write_errors_total.clone(),
        );

        Self {
            registry,
            records_accepted_total,
            requests_rejected_total,
            records_duplicate_total,
            identifiers_new_total,
            windows_rotated_total,
            window_unique_current,
            window_unique_last,
            notifications_total,
            window_log_write_errors_total,
        }
    }

    pub fn record_rejected(&self, reason: &str) {
        self.requests_rejected_total
            .get_or_create(&ReasonLabel {
                reason: reason.to_string(),
            })
            .inc();
    }

    pub fn rejected_count(&self, reason: &str) -> u64 {
        self.requests_rejected_total
            .get_or_create(&ReasonLabel {
                reason: reason.to_string(),
            })
            .get()
    }

    pub fn record_notification(&self, outcome: &str) {
        self.notifications_total
            .get_or_create(&OutcomeLabel {
                outcome: outcome.to_string(),
            })
            .inc();
    }

    pub fn notification_count(&self, outcome: &str) -> u64 {
        self.notifications_total
            .get_or_create(&OutcomeLabel {
                outcome: outcome.to_string(),
            })
            .get()
    }

    /// Render the registry in Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buffer = String::new();
        prometheus_client::encoding::text::encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}
