// src/telemetry.rs
//! Tracing subscriber setup and the Prometheus recorder (serve mode only).

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "jobhunter=info,warn";

/// Install the global subscriber. `RUST_LOG` wins over the default filter;
/// JSON lines when `json` or `JOBHUNTER_LOG_JSON=1`. Safe to call twice.
pub fn init_tracing(json: bool) {
    let json = json
        || std::env::var("JOBHUNTER_LOG_JSON")
            .ok()
            .is_some_and(|v| v == "1");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_current_span(false))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Register descriptions once; a no-op without a recorder.
pub fn describe_metrics() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("discover_postings_total", "Postings fetched from sources");
        describe_counter!("discover_duplicates_total", "Postings skipped as already known");
        describe_counter!("discover_admitted_total", "Records created in the store");
        describe_counter!("discover_discarded_total", "Scored postings below min_score");
        describe_counter!("scoring_failures_total", "Postings dropped on scoring errors");
        describe_counter!("source_errors_total", "Source fetches failed after retry");
        describe_counter!("source_malformed_total", "Raw items skipped as malformed");
        describe_counter!("sync_errors_total", "Record store writes that failed");
        describe_counter!("poll_actions_total", "Actions run for observed status transitions");
        describe_counter!("generation_failures_total", "Artifact generation failures");
        describe_gauge!("discover_last_run_ts", "Unix time of the last finished discovery run");
        describe_gauge!("poll_last_run_ts", "Unix time of the last finished poll");
        describe_histogram!("source_parse_ms", "Feed parse time in milliseconds");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder. Fails if another recorder is installed.
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("installing prometheus recorder")?;
        describe_metrics();
        Ok(Self { handle })
    }

    /// `/metrics` in the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
