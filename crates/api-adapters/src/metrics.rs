//! Prometheus metrics for the board API.

use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ErrorLabels {
    /// `validation` for 4xx responses, `store` for 5xx.
    pub kind: String,
}

pub struct Metrics {
    registry: Registry,
    pub ideas_created: Counter,
    pub ideas_moved: Counter,
    pub ideas_deleted: Counter,
    pub messages_posted: Counter,
    pub http_errors: Family<ErrorLabels, Counter>,
    pub realtime_subscribers: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix("idea_board");
        let ideas_created = Counter::default();
        let ideas_moved = Counter::default();
        let ideas_deleted = Counter::default();
        let messages_posted = Counter::default();
        let http_errors = Family::<ErrorLabels, Counter>::default();
        let realtime_subscribers = Gauge::default();

        registry.register("ideas_created", "Ideas created", ideas_created.clone());
        registry.register("ideas_moved", "Category updates applied", ideas_moved.clone());
        registry.register("ideas_deleted", "Idea deletions", ideas_deleted.clone());
        registry.register("messages_posted", "Thread messages posted", messages_posted.clone());
        registry.register("http_errors", "Failed API responses", http_errors.clone());
        registry.register(
            "realtime_subscribers",
            "Open realtime channels",
            realtime_subscribers.clone(),
        );

        Self {
            registry,
            ideas_created,
            ideas_moved,
            ideas_deleted,
            messages_posted,
            http_errors,
            realtime_subscribers,
        }
    }

    pub fn record_error(&self, kind: &str) {
        self.http_errors
            .get_or_create(&ErrorLabels {
                kind: kind.to_string(),
            })
            .inc();
    }

    /// OpenMetrics text exposition.
    pub fn render(&self) -> Result<String, std::fmt::Error> {
        let mut buffer = String::new();
        encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_counters_and_error_family() {
        let metrics = Metrics::new();
        metrics.ideas_created.inc();
        metrics.record_error("validation");
        metrics.record_error("validation");

        let text = metrics.render().unwrap();
        assert!(text.contains("idea_board_ideas_created_total 1"));
        assert!(text.contains("idea_board_http_errors_total{kind=\"validation\"} 2"));
        assert!(text.ends_with("# EOF\n"));
    }
}
