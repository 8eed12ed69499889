use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "exambank_listing_cache_hit_total",
            Unit::Count,
            "Total number of listing pages served from the cache."
        );
        describe_counter!(
            "exambank_listing_cache_miss_total",
            Unit::Count,
            "Total number of listing lookups that had to recompute."
        );
        describe_counter!(
            "exambank_listing_cache_fail_open_total",
            Unit::Count,
            "Total number of cache operations that failed and were bypassed, by operation."
        );
        describe_counter!(
            "exambank_listing_lock_contended_total",
            Unit::Count,
            "Total number of recomputation locks already held by another caller."
        );
        describe_counter!(
            "exambank_listing_invalidated_keys_total",
            Unit::Count,
            "Total number of listing keys evicted by question mutations."
        );
        describe_histogram!(
            "exambank_listing_compute_ms",
            Unit::Milliseconds,
            "Backing-store listing latency on cache miss in milliseconds."
        );
    });
}
