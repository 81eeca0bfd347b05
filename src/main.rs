mod api;
mod app;
mod config;
mod debounce;
mod fetch;
mod fixtures;
mod highlight;
mod logging;
mod model;
mod runtime;
mod suggest;
mod tracking;
mod ui;
mod weather;

use anyhow::{Context, Result};
use std::sync::mpsc;
use std::sync::Arc;

use api::{Backend, HttpBackend};
use app::{App, ThemeMode};
use config::{parse_args, Config};
use fetch::{spawn_detail_fetcher, spawn_suggestion_fetcher, FetchSettings};
use fixtures::FixtureBackend;
use logging::init as init_logging;
use runtime::{init_terminal, restore_terminal, run_app, Channels, Tracking};
use tracing::{debug, info, warn};

fn main() -> Result<()> {
    let config = parse_args()?;
    let _log_guard = init_logging(&config);
    info!("cirrostrats-tui starting");
    debug!("config path: {}", config.config_path.display());

    let fixtures = config.test_data.then(|| Arc::new(FixtureBackend::default()));
    let backend: Arc<dyn Backend> = match &fixtures {
        Some(fixtures) => {
            info!("test-data mode, no network calls");
            fixtures.clone()
        }
        None => Arc::new(build_http_backend(&config)?),
    };

    let (suggest_tx, suggest_worker_rx) = mpsc::channel();
    let (suggest_worker_tx, suggest_rx) = mpsc::channel();
    spawn_suggestion_fetcher(
        Arc::clone(&backend),
        config.user_email.clone(),
        suggest_worker_rx,
        suggest_worker_tx,
    );

    let (detail_tx, detail_worker_rx) = mpsc::channel();
    let (detail_worker_tx, detail_rx) = mpsc::channel();
    spawn_detail_fetcher(
        Arc::clone(&backend),
        FetchSettings {
            live_weather: config.live_weather,
            nas_enabled: config.nas_enabled,
            store_live_weather: config.store_live_weather,
        },
        detail_worker_rx,
        detail_worker_tx,
    );

    let source_label = if config.test_data {
        "fixtures".to_string()
    } else {
        short_source(&config.api_url)
    };
    let app = App::new(
        ThemeMode::from_str(&config.theme),
        config.config_path.clone(),
        config.debounce,
        config.user_email.clone(),
        source_label,
    );

    let mut terminal = init_terminal()?;
    let res = run_app(
        &mut terminal,
        app,
        Channels {
            suggest_tx,
            suggest_rx,
            detail_tx,
            detail_rx,
        },
        Tracking {
            backend,
            enabled: config.track_searches,
        },
    );
    restore_terminal(&mut terminal)?;

    if let Err(err) = res {
        warn!("runtime error: {err}");
        eprintln!("{err}");
    }

    if let Some(fixtures) = fixtures {
        info!(
            "fixture session: {} searches tracked, {} live weather updates stored",
            fixtures.tracked().len(),
            fixtures.stored().len()
        );
    }
    info!("cirrostrats-tui exited");
    Ok(())
}

fn build_http_backend(config: &Config) -> Result<HttpBackend> {
    HttpBackend::new(
        &config.api_url,
        config.timeout,
        config.insecure,
        config.legacy_weather_endpoint,
    )
    .with_context(|| format!("Failed to set up API client for {}", config.api_url))
}

fn short_source(url: &str) -> String {
    let trimmed = url
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    trimmed
        .split('/')
        .next()
        .filter(|host| !host.is_empty())
        .unwrap_or("--")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::short_source;

    #[test]
    fn short_source_keeps_host() {
        assert_eq!(short_source("https://api.cirrostrats.us/api/"), "api.cirrostrats.us");
        assert_eq!(short_source("http://localhost:8000"), "localhost:8000");
        assert_eq!(short_source(""), "--");
    }
}
