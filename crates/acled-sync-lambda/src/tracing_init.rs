//! Tracing initialization for the sync Lambda.
//!
//! Configures JSON-formatted tracing output suitable for CloudWatch Logs.
//! Every event is written as one JSON object per line with its fields
//! flattened to the top level, so CloudWatch Logs Insights can filter on
//! `stage`, `kind`, `feature_count` and the other run fields directly.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Directives used when `RUST_LOG` is unset or unparseable.
///
/// The job's own events are logged at `info`. The HTTP stack underneath
/// reqwest is held at `warn`, otherwise a single run emits hundreds of
/// connection-pool and TLS lines at `debug` whenever someone raises the
/// global level.
pub const DEFAULT_DIRECTIVES: &str = "info,hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn";

/// Initialize tracing with JSON formatting for CloudWatch Logs.
///
/// This should be called once at the start of the Lambda `main` function,
/// before calling `lambda_runtime::run()`. The subscriber is process-global
/// and survives warm invocations, so handlers must not call it again.
///
/// The log level can be controlled via the `RUST_LOG` environment variable
/// (for example `RUST_LOG=acled_sync_lib=debug` to see the outgoing request
/// URLs). Falls back to [`DEFAULT_DIRECTIVES`] if not set.
///
/// Span context is left out of each line: the job runs on a blocking worker
/// without spans, and the Lambda request id is logged as a field instead.
///
/// # Example
///
/// ```no_run
/// use acled_sync_lambda::init_tracing;
///
/// #[tokio::main]
/// async fn main() -> Result<(), lambda_runtime::Error> {
///     init_tracing();
///     // lambda_runtime::run(service_fn(handler)).await
///     Ok(())
/// }
/// ```
pub fn init_tracing() {
    let fmt_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_level(true)
        .with_current_span(false)
        .with_span_list(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(env_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .with(fmt_layer)
        .init();
}

/// Build the level filter from a `RUST_LOG` value.
///
/// A blank or invalid value is ignored rather than silencing the job.
fn env_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|value| !value.trim().is_empty())
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVES))
}
