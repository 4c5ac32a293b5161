//! Prometheus metrics for the Packhorse gateway.
//!
//! Two counter families cover the whole gateway: how many requests were
//! handled and how many payload bytes moved, partitioned by request type,
//! actor class, and (for bytes) direction. Counters are monotonic and safe
//! for concurrent increments; failed copies still account the bytes that
//! made it through.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;
use std::sync::Arc;

/// Request counter labels.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RequestLabels {
    /// Request type (`get-info-refs`, `post-git-upload-pack`,
    /// `post-git-receive-pack`, `upload`).
    pub request_type: String,
    /// Actor class (`anonymous`, `logged`, `ci-token`).
    pub agent: String,
}

/// Byte counter labels.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ByteLabels {
    /// Request type, as in [`RequestLabels`].
    pub request_type: String,
    /// Actor class, as in [`RequestLabels`].
    pub agent: String,
    /// Transfer direction (`in` towards the subprocess or storage, `out`
    /// towards the client).
    pub direction: String,
}

/// Global metrics state.
pub static METRICS: Lazy<GatewayMetrics> = Lazy::new(GatewayMetrics::new);

/// Metrics state container.
#[derive(Clone)]
pub struct GatewayMetrics {
    /// Prometheus registry.
    pub registry: Arc<RwLock<Registry>>,
    /// Requests handled by the gateway.
    pub requests_total: Family<RequestLabels, Counter>,
    /// Payload bytes moved by the gateway.
    pub bytes_total: Family<ByteLabels, Counter>,
}

impl Default for GatewayMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl GatewayMetrics {
    /// Create a new metrics state with all counters registered.
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let requests_total = Family::<RequestLabels, Counter>::default();
        registry.register(
            "packhorse_http_requests",
            "Requests processed by the gateway, by request type and actor class",
            requests_total.clone(),
        );

        let bytes_total = Family::<ByteLabels, Counter>::default();
        registry.register(
            "packhorse_http_bytes",
            "Payload bytes moved by the gateway, by request type, actor class and direction",
            bytes_total.clone(),
        );

        Self {
            registry: Arc::new(RwLock::new(registry)),
            requests_total,
            bytes_total,
        }
    }

    /// Record one handled request.
    pub fn count_request(&self, request_type: &str, agent: &str) {
        let labels = RequestLabels {
            request_type: request_type.to_string(),
            agent: agent.to_string(),
        };
        self.requests_total.get_or_create(&labels).inc();
    }

    /// Record payload bytes moved in one direction. A copy that failed
    /// partway still reports the bytes it managed to move.
    pub fn add_bytes(&self, request_type: &str, agent: &str, direction: &str, count: u64) {
        let labels = ByteLabels {
            request_type: request_type.to_string(),
            agent: agent.to_string(),
            direction: direction.to_string(),
        };
        self.bytes_total.get_or_create(&labels).inc_by(count);
    }

    /// Encode metrics for Prometheus scraping.
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        let registry = self.registry.read();
        prometheus_client::encoding::text::encode(&mut buffer, &registry)
            .expect("Failed to encode metrics");
        buffer
    }
}
