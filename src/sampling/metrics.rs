//! Metric sinks for per-step energy estimates.

use std::sync::Mutex;

use log::info;

use super::traits::MetricsSink;

/// Writes every metric as an `info!` record under target `afqmc::metrics`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMetrics;

impl MetricsSink for LogMetrics {
    fn record(&self, name: &str, value: f64, step: usize) {
        info!(target: "afqmc::metrics", "{} step={} value={:.10}", name, step, value);
    }
}

/// Keeps every recorded metric in memory.
#[derive(Debug, Default)]
pub struct RecordingMetrics {
    records: Mutex<Vec<(String, f64, usize)>>,
}

impl RecordingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// (value, step) pairs recorded under `name`, in emission order.
    pub fn series(&self, name: &str) -> Vec<(f64, usize)> {
        match self.records.lock() {
            Ok(records) => records
                .iter()
                .filter(|(n, _, _)| n == name)
                .map(|&(_, value, step)| (value, step))
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

impl MetricsSink for RecordingMetrics {
    fn record(&self, name: &str, value: f64, step: usize) {
        if let Ok(mut records) = self.records.lock() {
            records.push((name.to_string(), value, step));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_metrics_filters_by_name() {
        let sink = RecordingMetrics::new();
        sink.record("cE", -1.0, 0);
        sink.record("qE", -1.1, 0);
        sink.record("cE", -1.2, 1);
        assert_eq!(sink.series("cE"), vec![(-1.0, 0), (-1.2, 1)]);
        assert_eq!(sink.series("qE").len(), 1);
        LogMetrics.record("cE", -1.0, 0);
    }
}
