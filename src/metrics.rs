//! Prometheus metrics
//!
//! Agent ids are never used as labels; they are unbounded.

use lazy_static::lazy_static;
use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};

lazy_static! {
    /// Global metrics registry
    pub static ref METRICS_REGISTRY: Registry = Registry::new();

    // ============================================================================
    // Request Metrics
    // ============================================================================

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "kb_http_request_duration_seconds",
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        &["method", "endpoint", "status"]
    ).unwrap();

    /// Total HTTP requests
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("kb_http_requests_total", "Total HTTP requests"),
        &["method", "endpoint", "status"]
    ).unwrap();

    // ============================================================================
    // Knowledge Operation Metrics
    // ============================================================================

    /// Store operations by kind (list, delete, clear, ingest) and outcome
    pub static ref KNOWLEDGE_OPS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("kb_knowledge_ops_total", "Total knowledge store operations"),
        &["op", "outcome"]
    ).unwrap();

    /// Store operation duration
    pub static ref KNOWLEDGE_OP_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "kb_knowledge_op_duration_seconds",
            "Knowledge store operation duration"
        )
        .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        &["op"]
    ).unwrap();

    /// Chunks created by ingestion
    pub static ref CHUNKS_INGESTED_TOTAL: IntCounter = IntCounter::new(
        "kb_chunks_ingested_total",
        "Total chunks created by ingestion"
    ).unwrap();

    /// Chunks removed by delete or clear
    pub static ref CHUNKS_DELETED_TOTAL: IntCounter = IntCounter::new(
        "kb_chunks_deleted_total",
        "Total chunks removed by delete or clear"
    ).unwrap();

    /// Agents currently owning at least one chunk (refreshed on scrape)
    pub static ref KNOWLEDGE_AGENTS: IntGauge = IntGauge::new(
        "kb_knowledge_agents",
        "Number of agents with stored knowledge"
    ).unwrap();

    // ============================================================================
    // Event Metrics
    // ============================================================================

    /// Connected knowledge event subscribers
    pub static ref EVENT_SUBSCRIBERS: IntGauge = IntGauge::new(
        "kb_event_subscribers",
        "Current number of knowledge event stream subscribers"
    ).unwrap();
}

/// Register all metrics with the global registry.
///
/// Safe to call more than once; already-registered collectors are skipped.
pub fn register_metrics() -> Result<(), prometheus::Error> {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(HTTP_REQUEST_DURATION.clone()),
        Box::new(HTTP_REQUESTS_TOTAL.clone()),
        Box::new(KNOWLEDGE_OPS_TOTAL.clone()),
        Box::new(KNOWLEDGE_OP_DURATION.clone()),
        Box::new(CHUNKS_INGESTED_TOTAL.clone()),
        Box::new(CHUNKS_DELETED_TOTAL.clone()),
        Box::new(KNOWLEDGE_AGENTS.clone()),
        Box::new(EVENT_SUBSCRIBERS.clone()),
    ];

    for collector in collectors {
        match METRICS_REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(e),
        }
    }

    Ok(())
}

/// Record the outcome of one knowledge operation
pub fn record_op(op: &str, success: bool) {
    let outcome = if success { "success" } else { "error" };
    KNOWLEDGE_OPS_TOTAL.with_label_values(&[op, outcome]).inc();
}

/// Helper to time operations with histogram (RAII pattern)
/// Usage: let _timer = Timer::new(KNOWLEDGE_OP_DURATION.with_label_values(&["list"]));
pub struct Timer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl Timer {
    /// Create timer that records duration to histogram on drop
    pub fn new(histogram: Histogram) -> Self {
        Self {
            histogram,
            start: std::time::Instant::now(),
        }
    }

    /// Timer for one knowledge operation kind
    pub fn for_op(op: &str) -> Self {
        Self::new(KNOWLEDGE_OP_DURATION.with_label_values(&[op]))
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}
