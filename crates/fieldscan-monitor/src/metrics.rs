//! Prometheus-style metrics endpoint.

use std::fmt::Write;

use axum::{http::StatusCode, response::IntoResponse};

use fieldscan_workqueue::{EntryStatus, PoolStats, QueueStats};

/// Metric type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    /// Counter (monotonically increasing).
    Counter,
    /// Gauge (can go up and down).
    Gauge,
}

impl MetricType {
    fn as_str(self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
        }
    }
}

/// Prometheus text exposition builder.
#[derive(Debug, Default)]
pub struct PrometheusText {
    output: String,
}

impl PrometheusText {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an unlabelled sample.
    pub fn metric(&mut self, name: &str, help: &str, metric_type: MetricType, value: f64) -> &mut Self {
        self.header(name, help, metric_type);
        let _ = writeln!(self.output, "{} {}", name, value);
        self
    }

    /// Add one sample per `(label value, value)` pair under a single label key.
    pub fn labelled<'a>(
        &mut self,
        name: &str,
        help: &str,
        metric_type: MetricType,
        label: &str,
        samples: impl IntoIterator<Item = (&'a str, f64)>,
    ) -> &mut Self {
        self.header(name, help, metric_type);
        for (label_value, value) in samples {
            let _ = writeln!(self.output, "{}{{{}=\"{}\"}} {}", name, label, label_value, value);
        }
        self
    }

    fn header(&mut self, name: &str, help: &str, metric_type: MetricType) {
        let _ = writeln!(self.output, "# HELP {} {}", name, help);
        let _ = writeln!(self.output, "# TYPE {} {}", name, metric_type.as_str());
    }

    pub fn finish(self) -> String {
        self.output
    }

    /// Axum response with the Prometheus content type.
    pub fn response(self) -> impl IntoResponse {
        (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            self.finish(),
        )
    }
}

/// Render queue and worker pool statistics.
pub fn render_pipeline_metrics(queue: &QueueStats, pool: &PoolStats) -> PrometheusText {
    let mut text = PrometheusText::new();

    text.labelled(
        "fieldscan_queue_entries",
        "Queue entries by status",
        MetricType::Gauge,
        "status",
        EntryStatus::ALL
            .into_iter()
            .map(|s| (s.as_str(), queue.count(s) as f64)),
    )
    .metric(
        "fieldscan_queue_exhausted_entries",
        "Failed entries that used up their retry budget",
        MetricType::Gauge,
        queue.exhausted as f64,
    )
    .metric(
        "fieldscan_queue_avg_processing_ms",
        "Mean time from enqueue to completion",
        MetricType::Gauge,
        queue.avg_processing_ms.unwrap_or(0.0),
    )
    .metric(
        "fieldscan_worker_entries_completed_total",
        "Entries completed by this process",
        MetricType::Counter,
        pool.entries_completed as f64,
    )
    .metric(
        "fieldscan_worker_entries_failed_total",
        "Entries failed by this process",
        MetricType::Counter,
        pool.entries_failed as f64,
    )
    .metric(
        "fieldscan_worker_poll_errors_total",
        "Store errors hit by worker poll loops",
        MetricType::Counter,
        pool.poll_errors as f64,
    )
    .metric(
        "fieldscan_worker_active",
        "Workers currently analyzing an entry",
        MetricType::Gauge,
        pool.active_workers as f64,
    )
    .metric(
        "fieldscan_worker_avg_entry_ms",
        "Mean analysis cycle duration in this process",
        MetricType::Gauge,
        pool.average_entry_duration.as_millis() as f64,
    );

    text
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
