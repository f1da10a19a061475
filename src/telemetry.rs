use anyhow::{anyhow, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use crate::config::ObservabilityConfig;

/// Initialize structured logging.
///
/// `RUST_LOG` wins over the configured level. Logs go to stderr so the
/// effect stream printed by the CLI stays machine readable.
pub fn init_telemetry(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| anyhow!("Invalid log level '{}': {}", config.log_level, e))?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.json_logs {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
    result.map_err(|e| anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::debug!("Shipping label telemetry initialized");
    Ok(())
}

/// Generate an identifier linking every log line of one label creation session
pub fn generate_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// Create a span with common shipping label workflow attributes
pub fn create_workflow_span(
    operation: &str,
    order_id: Option<&str>,
    session_id: &str,
) -> tracing::Span {
    tracing::info_span!(
        "shipping_label_workflow",
        operation = operation,
        order.id = order_id,
        session.id = session_id,
    )
}
