//! chapter-feed binary entrypoint.
//! Runs the follows-feed update once: fetch, detect, merge, persist.
//!
//! Exit codes: 0 success, 1 failure, 2 authentication failure.

use chapter_feed::{app, config::Settings};
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs by default; `LOG_FORMAT=json` for structured output.
/// Filter from `RUST_LOG`, default `chapter_feed=info,warn`.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chapter_feed=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    init_tracing();

    let settings = match Settings::load() {
        Ok(s) => s,
        Err(e) => {
            error!("configuration error: {e:#}");
            return ExitCode::from(1);
        }
    };

    match app::run_once(&settings).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            if app::is_auth_error(&e) {
                ExitCode::from(2)
            } else {
                ExitCode::from(1)
            }
        }
    }
}
