use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Env;

/// init_tracing
///
/// Installs the global subscriber shared by both binaries.
///
/// `RUST_LOG` wins when set; otherwise the crate logs at debug and the HTTP
/// layers at info. Local runs get the pretty formatter, production emits JSON
/// lines for the log aggregator.
pub fn init_tracing(env: Env) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "quartile_api=debug,tower_http=info,axum=info".into());

    match env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }
}
