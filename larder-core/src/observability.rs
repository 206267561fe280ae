/*!
Observability for the store: tracing subscriber setup and, behind the
`metrics` feature, Prometheus instrumentation of store commits and decoding.

The `record_*` hooks exist in every build so call sites need no feature
gates; without `metrics` they do nothing.
*/

#[cfg(feature = "metrics")]
use prometheus::{core::Collector, Counter, Encoder, Histogram, HistogramOpts, Registry, TextEncoder};
#[cfg(feature = "metrics")]
use std::sync::OnceLock;
#[cfg(feature = "metrics")]
use std::time::Instant;
use tracing::subscriber::set_global_default;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry as TracingRegistry};

use crate::{PersistError, Result};

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "larder_core=info,larder=info";

#[cfg(feature = "metrics")]
static METRICS: OnceLock<Option<StoreMetrics>> = OnceLock::new();

/// Store metrics
#[cfg(feature = "metrics")]
#[derive(Debug)]
pub struct StoreMetrics {
    pub commits_total: Counter,
    pub commit_errors_total: Counter,
    pub commit_latency_seconds: Histogram,
    pub store_size_bytes: Histogram,
    pub unknown_aspects_total: Counter,
    pub decode_failures_total: Counter,

    registry: Registry,
}

#[cfg(feature = "metrics")]
impl StoreMetrics {
    fn new() -> Result<Self> {
        let registry = Registry::new();

        let commits_total = Counter::new("larder_commits_total", "Store file rewrites attempted")
            .map_err(|e| metric_error("commits_total", e))?;
        let commit_errors_total =
            Counter::new("larder_commit_errors_total", "Store file rewrites that failed")
                .map_err(|e| metric_error("commit_errors_total", e))?;
        let commit_latency_seconds = Histogram::with_opts(HistogramOpts::new(
            "larder_commit_latency_seconds",
            "Duration of store file rewrites in seconds",
        ))
        .map_err(|e| metric_error("commit_latency_seconds", e))?;
        let size_buckets = prometheus::exponential_buckets(1024.0, 4.0, 8)
            .map_err(|e| metric_error("store_size_bytes", e))?;
        let store_size_bytes = Histogram::with_opts(
            HistogramOpts::new("larder_store_size_bytes", "Size of the written store file in bytes")
                .buckets(size_buckets),
        )
        .map_err(|e| metric_error("store_size_bytes", e))?;
        let unknown_aspects_total = Counter::new(
            "larder_unknown_aspects_total",
            "Request aspects purged because their type was not recognized",
        )
        .map_err(|e| metric_error("unknown_aspects_total", e))?;
        let decode_failures_total = Counter::new(
            "larder_decode_failures_total",
            "Documents that could not be decoded",
        )
        .map_err(|e| metric_error("decode_failures_total", e))?;

        register(&registry, "commits_total", &commits_total)?;
        register(&registry, "commit_errors_total", &commit_errors_total)?;
        register(&registry, "commit_latency_seconds", &commit_latency_seconds)?;
        register(&registry, "store_size_bytes", &store_size_bytes)?;
        register(&registry, "unknown_aspects_total", &unknown_aspects_total)?;
        register(&registry, "decode_failures_total", &decode_failures_total)?;

        Ok(Self {
            commits_total,
            commit_errors_total,
            commit_latency_seconds,
            store_size_bytes,
            unknown_aspects_total,
            decode_failures_total,
            registry,
        })
    }

    /// Global metrics, initialized on first use
    ///
    /// `None` if the metrics could not be created; the failure is logged once.
    pub fn global() -> Option<&'static StoreMetrics> {
        METRICS
            .get_or_init(|| match Self::new() {
                Ok(metrics) => Some(metrics),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to initialize store metrics");
                    None
                }
            })
            .as_ref()
    }

    /// Gather metrics in Prometheus text format
    pub fn gather_metrics(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| PersistError::storage(format!("Failed to encode metrics: {e}")))?;

        String::from_utf8(buffer)
            .map_err(|e| PersistError::storage(format!("Failed to convert metrics to string: {e}")))
    }
}

#[cfg(feature = "metrics")]
fn metric_error(name: &str, e: prometheus::Error) -> PersistError {
    PersistError::storage(format!("Failed to create {name} metric: {e}"))
}

#[cfg(feature = "metrics")]
fn register<C: Collector + Clone + 'static>(registry: &Registry, name: &str, collector: &C) -> Result<()> {
    registry
        .register(Box::new(collector.clone()))
        .map_err(|e| PersistError::storage(format!("Failed to register {name}: {e}")))
}

/// Timer for one store file rewrite
#[cfg(feature = "metrics")]
pub struct MetricsTimer {
    start: Instant,
}

#[cfg(feature = "metrics")]
impl MetricsTimer {
    pub fn start_commit() -> Self {
        if let Some(metrics) = StoreMetrics::global() {
            metrics.commits_total.inc();
        }
        Self {
            start: Instant::now(),
        }
    }

    /// Record latency, plus the written size or an error when `size` is `None`
    pub fn finish(self, size: Option<usize>) {
        let Some(metrics) = StoreMetrics::global() else {
            return;
        };
        metrics
            .commit_latency_seconds
            .observe(self.start.elapsed().as_secs_f64());
        match size {
            Some(size) => metrics.store_size_bytes.observe(size as f64),
            None => metrics.commit_errors_total.inc(),
        }
    }
}

/// Count an aspect that decoded to the unknown sentinel
#[cfg(feature = "metrics")]
pub fn record_unknown_aspect() {
    if let Some(metrics) = StoreMetrics::global() {
        metrics.unknown_aspects_total.inc();
    }
}

#[cfg(not(feature = "metrics"))]
pub fn record_unknown_aspect() {}

/// Count a document that failed to decode
#[cfg(feature = "metrics")]
pub fn record_decode_failure() {
    if let Some(metrics) = StoreMetrics::global() {
        metrics.decode_failures_total.inc();
    }
}

#[cfg(not(feature = "metrics"))]
pub fn record_decode_failure() {}

/// Install the global tracing subscriber
///
/// `RUST_LOG` overrides [`DEFAULT_LOG_FILTER`]. With `json` set, events are
/// written as JSON lines, otherwise in the human-readable format.
///
/// # Errors
/// Fails if a global subscriber is already installed.
pub fn init_observability(json: bool) -> Result<()> {
    init_with_filter(json, DEFAULT_LOG_FILTER)
}

/// Like [`init_observability`], with the filter used when `RUST_LOG` is unset
pub fn init_with_filter(json: bool, default_filter: &str) -> Result<()> {
    #[cfg(feature = "metrics")]
    StoreMetrics::global();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .map_err(|e| PersistError::validation(format!("Invalid log filter: {e}")))?;

    let json_layer = json.then(|| {
        fmt::layer()
            .json()
            .with_target(false)
            .with_current_span(false)
    });
    let text_layer = (!json).then(|| fmt::layer().with_target(false));

    let subscriber = TracingRegistry::default()
        .with(filter)
        .with(json_layer)
        .with(text_layer);

    set_global_default(subscriber).map_err(|e| {
        PersistError::storage(format!("Failed to set global tracing subscriber: {e}"))
    })?;

    tracing::debug!("Observability initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hooks_are_callable() {
        record_unknown_aspect();
        record_decode_failure();
    }

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_LOG_FILTER).is_ok());
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn test_metrics_gathering() {
        let metrics = StoreMetrics::global().unwrap();

        let timer = MetricsTimer::start_commit();
        timer.finish(Some(2048));
        MetricsTimer::start_commit().finish(None);
        record_unknown_aspect();

        let text = metrics.gather_metrics().unwrap();
        assert!(text.contains("larder_commits_total"));
        assert!(text.contains("larder_unknown_aspects_total"));
        assert!(metrics.commit_errors_total.get() >= 1.0);
    }
}
