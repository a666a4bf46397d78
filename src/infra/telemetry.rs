use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::cache::{
    METRIC_CLEAR, METRIC_EVICT, METRIC_EXPIRED, METRIC_HIT, METRIC_MISS, METRIC_STORE,
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
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
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
        describe_counter!(METRIC_HIT, Unit::Count, "Page cache lookups served from a stored page.");
        describe_counter!(METRIC_MISS, Unit::Count, "Page cache lookups that had to render.");
        describe_counter!(METRIC_STORE, Unit::Count, "Rendered pages written to the page cache.");
        describe_counter!(
            METRIC_EXPIRED,
            Unit::Count,
            "Stored pages dropped on lookup because their TTL had lapsed."
        );
        describe_counter!(
            METRIC_EVICT,
            Unit::Count,
            "Stored pages evicted to stay within the configured capacity."
        );
        describe_counter!(METRIC_CLEAR, Unit::Count, "Explicit page cache clears.");
    });
}
