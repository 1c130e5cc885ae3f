//! Daily Brief — Binary Entrypoint
//! Boots the Axum HTTP server, wiring the dual-stream pipeline, shared
//! state, and middleware.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use daily_brief::config::PipelineConfig;
use daily_brief::metrics::Metrics;
use daily_brief::{build_app_state, create_router};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - BRIEF_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("BRIEF_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("daily_brief=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments. Secrets
    // (MEDIASTACK_API_KEY, OPENAI_API_KEY, REDDIT_*) come from here or the
    // deployment environment.
    let _ = dotenvy::dotenv();

    // Initialize dev tracing early (no-op in production).
    enable_dev_tracing();

    let cfg = PipelineConfig::load_default().expect("Failed to load pipeline config");
    tracing::info!(
        serve_mode = ?cfg.serve_mode,
        ttl_hours = cfg.cache_ttl_hours,
        model = %cfg.completion_model,
        "pipeline config loaded"
    );

    let metrics = Metrics::init(daily_brief::cache::ttl_ms(cfg.cache_ttl_hours));

    let state = build_app_state(&cfg);
    let router = create_router(state).merge(metrics.router());

    Ok(router.into())
}
