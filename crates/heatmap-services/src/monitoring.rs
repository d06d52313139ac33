//! Prometheus metrics for one pipeline invocation, trimmed from the
//! teacher's HTTP/DB-server `MetricsCollector` down to the counters and
//! histograms a batch pipeline actually emits: per-stage duration, per-source
//! ingest counts, mention resolution counts, and the terminal run status.

use prometheus::{CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

#[derive(Clone)]
pub struct MetricsCollector {
    registry: Arc<Registry>,

    stage_duration_seconds: HistogramVec,
    source_items_total: CounterVec,
    source_errors_total: CounterVec,
    mentions_total: CounterVec,
    entities_scored_total: prometheus::Counter,
    run_status: GaugeVec,
}

impl MetricsCollector {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Arc::new(Registry::new());

        let stage_duration_seconds = HistogramVec::new(
            HistogramOpts::new("stage_duration_seconds", "Duration of a pipeline stage")
                .namespace("heatmap")
                .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0, 120.0, 600.0]),
            &["stage"],
        )?;

        let source_items_total = CounterVec::new(
            Opts::new("source_items_total", "SourceItems ingested per source").namespace("heatmap"),
            &["source"],
        )?;

        let source_errors_total = CounterVec::new(
            Opts::new("source_errors_total", "Ingest failures per source").namespace("heatmap"),
            &["source"],
        )?;

        let mentions_total = CounterVec::new(
            Opts::new("mentions_total", "Mentions produced, by outcome").namespace("heatmap"),
            &["outcome"],
        )?;

        let entities_scored_total =
            prometheus::Counter::with_opts(Opts::new("entities_scored_total", "Entities with a daily metrics row written").namespace("heatmap"))?;

        let run_status = GaugeVec::new(
            Opts::new("run_status", "1 on the gauge matching the run's terminal status").namespace("heatmap"),
            &["status"],
        )?;

        registry.register(Box::new(stage_duration_seconds.clone()))?;
        registry.register(Box::new(source_items_total.clone()))?;
        registry.register(Box::new(source_errors_total.clone()))?;
        registry.register(Box::new(mentions_total.clone()))?;
        registry.register(Box::new(entities_scored_total.clone()))?;
        registry.register(Box::new(run_status.clone()))?;

        Ok(Self {
            registry,
            stage_duration_seconds,
            source_items_total,
            source_errors_total,
            mentions_total,
            entities_scored_total,
            run_status,
        })
    }

    pub fn record_stage_duration(&self, stage: &str, duration_secs: f64) {
        self.stage_duration_seconds.with_label_values(&[stage]).observe(duration_secs);
    }

    pub fn record_source_items(&self, source: &str, count: u64) {
        self.source_items_total.with_label_values(&[source]).inc_by(count as f64);
    }

    pub fn record_source_error(&self, source: &str) {
        self.source_errors_total.with_label_values(&[source]).inc();
    }

    pub fn record_mentions(&self, outcome: &str, count: u64) {
        self.mentions_total.with_label_values(&[outcome]).inc_by(count as f64);
    }

    pub fn record_entities_scored(&self, count: u64) {
        self.entities_scored_total.inc_by(count as f64);
    }

    pub fn record_run_status(&self, status: &str) {
        for s in ["SUCCESS", "PARTIAL", "FAILED"] {
            self.run_status.with_label_values(&[s]).set(if s == status { 1.0 } else { 0.0 });
        }
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_registered_metrics() {
        let collector = MetricsCollector::new().unwrap();
        collector.record_stage_duration("ingest", 1.5);
        collector.record_source_items("REDDIT", 10);
        collector.record_run_status("SUCCESS");

        let rendered = collector.render().unwrap();
        assert!(rendered.contains("heatmap_stage_duration_seconds"));
        assert!(rendered.contains("heatmap_source_items_total"));
        assert!(rendered.contains("heatmap_run_status"));
    }
}
