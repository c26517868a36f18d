use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset or unparsable
pub const DEFAULT_FILTER: &str = "info,wxdecode=debug";

/// Initialize structured logging
/// - JSON logs, one event per line
/// - RUST_LOG respected; default to "info,wxdecode=debug"
///
/// Calling it again after a subscriber is installed is a no-op.
pub fn init(service_name: &str) {
    let installed = tracing_subscriber::registry()
        .with(env_filter(std::env::var("RUST_LOG").ok()))
        .with(tracing_subscriber::fmt::layer().json())
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(service = %service_name, "Observability initialized");
    }
}

fn env_filter(directives: Option<String>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}
