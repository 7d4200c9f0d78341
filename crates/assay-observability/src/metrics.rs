//! Metrics collection with Prometheus
//!
//! This module provides Prometheus metrics for Assay:
//! - Backend request counts and latency by backend and outcome
//! - Fallback activations
//! - Token usage by backend
//! - Tool executions
//! - Stream lifecycle (started, completed, failed)
//! - Grounding confidence and flagged answers

use prometheus::{
    Counter, CounterVec, Histogram, HistogramOpts, HistogramVec, Opts, Registry,
};
use std::sync::Arc;

/// Metrics collector for Assay
#[derive(Clone)]
pub struct Metrics {
    /// Prometheus registry
    registry: Arc<Registry>,

    // Backend metrics
    /// Backend calls by backend and outcome (success/failure)
    pub backend_requests_total: CounterVec,
    /// Backend call duration
    pub backend_request_duration_seconds: HistogramVec,
    /// Fallback activations
    pub fallback_triggered: CounterVec,

    // Token metrics
    pub tokens_input: CounterVec,
    pub tokens_output: CounterVec,

    // Tool metrics
    /// Tool executions by tool and outcome
    pub tool_calls_total: CounterVec,

    // Streaming metrics
    pub streams_started: Counter,
    /// Streams finished by outcome (completed/failed)
    pub streams_finished: CounterVec,
    /// Chunks sent per stream
    pub stream_chunks: Histogram,

    // Grounding metrics
    pub grounding_confidence: Histogram,
    /// Answers flagged as containing hallucinations
    pub grounding_flagged: Counter,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let backend_requests_total = CounterVec::new(
            Opts::new(
                "assay_backend_requests_total",
                "Total number of completion backend calls",
            ),
            &["backend", "outcome"],
        )?;

        let backend_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "assay_backend_request_duration_seconds",
                "Completion backend call duration in seconds",
            )
            .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
            &["backend"],
        )?;

        let fallback_triggered = CounterVec::new(
            Opts::new(
                "assay_fallback_triggered_total",
                "Number of times the fallback backend was used",
            ),
            &["from_backend", "to_backend", "reason"],
        )?;

        let tokens_input = CounterVec::new(
            Opts::new("assay_tokens_input_total", "Input tokens consumed"),
            &["backend"],
        )?;

        let tokens_output = CounterVec::new(
            Opts::new("assay_tokens_output_total", "Output tokens generated"),
            &["backend"],
        )?;

        let tool_calls_total = CounterVec::new(
            Opts::new("assay_tool_calls_total", "Tool calls executed"),
            &["tool", "outcome"],
        )?;

        let streams_started = Counter::with_opts(Opts::new(
            "assay_streams_started_total",
            "Event streams opened",
        ))?;

        let streams_finished = CounterVec::new(
            Opts::new("assay_streams_finished_total", "Event streams closed"),
            &["outcome"],
        )?;

        let stream_chunks = Histogram::with_opts(
            HistogramOpts::new("assay_stream_chunks", "Chunk events sent per stream")
                .buckets(vec![1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0, 200.0]),
        )?;

        let grounding_confidence = Histogram::with_opts(
            HistogramOpts::new(
                "assay_grounding_confidence",
                "Composite groundedness confidence (0-100)",
            )
            .buckets(vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0]),
        )?;

        let grounding_flagged = Counter::with_opts(Opts::new(
            "assay_grounding_flagged_total",
            "Answers flagged as containing hallucinations",
        ))?;

        registry.register(Box::new(backend_requests_total.clone()))?;
        registry.register(Box::new(backend_request_duration_seconds.clone()))?;
        registry.register(Box::new(fallback_triggered.clone()))?;
        registry.register(Box::new(tokens_input.clone()))?;
        registry.register(Box::new(tokens_output.clone()))?;
        registry.register(Box::new(tool_calls_total.clone()))?;
        registry.register(Box::new(streams_started.clone()))?;
        registry.register(Box::new(streams_finished.clone()))?;
        registry.register(Box::new(stream_chunks.clone()))?;
        registry.register(Box::new(grounding_confidence.clone()))?;
        registry.register(Box::new(grounding_flagged.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            backend_requests_total,
            backend_request_duration_seconds,
            fallback_triggered,
            tokens_input,
            tokens_output,
            tool_calls_total,
            streams_started,
            streams_finished,
            stream_chunks,
            grounding_confidence,
            grounding_flagged,
        })
    }

    /// Get the Prometheus registry for exporting metrics
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record one backend call
    pub fn record_backend_call(&self, backend: &str, success: bool, duration_secs: f64) {
        let outcome = if success { "success" } else { "failure" };
        self.backend_requests_total
            .with_label_values(&[backend, outcome])
            .inc();
        self.backend_request_duration_seconds
            .with_label_values(&[backend])
            .observe(duration_secs);
    }

    /// Record token usage
    pub fn record_tokens(&self, backend: &str, input_tokens: u32, output_tokens: u32) {
        self.tokens_input
            .with_label_values(&[backend])
            .inc_by(input_tokens as f64);
        self.tokens_output
            .with_label_values(&[backend])
            .inc_by(output_tokens as f64);
    }

    /// Record fallback trigger
    pub fn record_fallback(&self, from_backend: &str, to_backend: &str, reason: &str) {
        self.fallback_triggered
            .with_label_values(&[from_backend, to_backend, reason])
            .inc();
    }

    /// Record a tool execution
    pub fn record_tool_call(&self, tool: &str, success: bool) {
        let outcome = if success { "success" } else { "error" };
        self.tool_calls_total
            .with_label_values(&[tool, outcome])
            .inc();
    }

    pub fn record_stream_started(&self) {
        self.streams_started.inc();
    }

    /// Record stream end; `chunks` is the number of chunk events sent
    pub fn record_stream_finished(&self, completed: bool, chunks: usize) {
        let outcome = if completed { "completed" } else { "failed" };
        self.streams_finished.with_label_values(&[outcome]).inc();
        self.stream_chunks.observe(chunks as f64);
    }

    /// Record a groundedness report
    pub fn record_grounding(&self, confidence: u8, has_hallucination: bool) {
        self.grounding_confidence.observe(f64::from(confidence));
        if has_hallucination {
            self.grounding_flagged.inc();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter_value(metrics: &Metrics, name: &str) -> f64 {
        let gathered = metrics.registry().gather();
        let family = gathered
            .iter()
            .find(|m| m.name() == name)
            .unwrap_or_else(|| panic!("{} metric not found", name));
        family.metric[0].counter.as_ref().unwrap().value.unwrap()
    }

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        metrics.record_stream_started();
        assert!(!metrics.registry().gather().is_empty());
    }

    #[test]
    fn test_record_backend_call() {
        let metrics = Metrics::new().unwrap();
        metrics.record_backend_call("anthropic", false, 0.4);
        assert_eq!(counter_value(&metrics, "assay_backend_requests_total"), 1.0);
    }

    #[test]
    fn test_record_tokens() {
        let metrics = Metrics::new().unwrap();
        metrics.record_tokens("openai", 100, 50);
        assert_eq!(counter_value(&metrics, "assay_tokens_input_total"), 100.0);
        assert_eq!(counter_value(&metrics, "assay_tokens_output_total"), 50.0);
    }

    #[test]
    fn test_record_fallback() {
        let metrics = Metrics::new().unwrap();
        metrics.record_fallback("anthropic", "openai", "provider_error");
        assert_eq!(counter_value(&metrics, "assay_fallback_triggered_total"), 1.0);
    }

    #[test]
    fn test_record_grounding_flagged_only_when_hallucinating() {
        let metrics = Metrics::new().unwrap();
        metrics.record_grounding(90, false);
        metrics.record_grounding(40, true);
        assert_eq!(counter_value(&metrics, "assay_grounding_flagged_total"), 1.0);
    }

    #[test]
    fn test_record_stream_finished() {
        let metrics = Metrics::new().unwrap();
        metrics.record_stream_finished(true, 3);
        assert_eq!(counter_value(&metrics, "assay_streams_finished_total"), 1.0);
    }
}
