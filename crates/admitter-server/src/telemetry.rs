//! Tracing subscriber setup

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LogFormat;
use crate::error::ServerError;

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "info,admitter=debug,admitter_server=debug,tower=warn,hyper=warn";

/// Install the global tracing subscriber
pub fn init_tracing(format: LogFormat) -> Result<(), ServerError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // Option<Layer> implements Layer, so exactly one formatter is active
    let (json_layer, plain_layer) = match format {
        LogFormat::Json => (
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_target(true),
            ),
            None,
        ),
        LogFormat::Plain => (None, Some(tracing_subscriber::fmt::layer().with_target(true))),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(plain_layer)
        .try_init()
        .map_err(|e| ServerError::Telemetry(e.to_string()))
}
