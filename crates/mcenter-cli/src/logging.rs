//! Log setup for the binary.
//!
//! `RUST_LOG` wins when set; otherwise the level follows `MCENTER_ENV`
//! (`production` -> info, anything else -> debug).

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init(json: bool) {
    let environment = environment();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level(&environment)));

    let result = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .try_init()
    };

    // an embedding host may already have installed a subscriber
    if result.is_err() {
        tracing::debug!("global tracing subscriber already set, keeping it");
    }
    tracing::debug!(environment = %environment, json, "logging initialized");
}

fn environment() -> String {
    std::env::var("MCENTER_ENV").unwrap_or_else(|_| "development".to_string())
}

fn default_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}
