//! jobhunter: daily discovery run, status polling and HTTP triggers.
//!
//! See `README.md` for configuration.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use jobhunter::api::{self, ApiState};
use jobhunter::telemetry::{self, Metrics};
use jobhunter::{watcher, App, Settings};

#[derive(Parser)]
#[command(name = "jobhunter", version, about = "Job discovery, scoring and application pipeline")]
struct Cli {
    /// Log as JSON lines (also JOBHUNTER_LOG_JSON=1).
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// One discovery run: fetch, dedupe, score, admit.
    Discover {
        /// Use the in-memory store and local output directory.
        #[arg(long)]
        dry_run: bool,
    },
    /// One status poll.
    Poll {
        #[arg(long)]
        dry_run: bool,
    },
    /// Poll forever on `poll_interval_secs`.
    Watch,
    /// Serve HTTP triggers for an external scheduler.
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: SocketAddr,
    },
}

fn print_json<T: serde::Serialize>(v: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(v).context("serializing report")?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    telemetry::init_tracing(cli.log_json);

    let settings = Settings::load().context("loading settings")?;

    match cli.command {
        Command::Discover { dry_run } => {
            let app = App::from_settings(settings, dry_run)?;
            let report = app.discover().await.context("discovery run aborted")?;
            print_json(&report)?;
        }
        Command::Poll { dry_run } => {
            let app = App::from_settings(settings, dry_run)?;
            let report = app.poll().await.context("poll aborted")?;
            print_json(&report)?;
        }
        Command::Watch => {
            let app = App::from_settings(settings, false)?;
            let every = app.settings.poll_interval();
            let state_path = app.settings.state_path.clone();
            tracing::info!(every_secs = every.as_secs(), "watching status changes");
            tokio::select! {
                _ = watcher::watch(app.watcher(), state_path, every) => {}
                _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
            }
        }
        Command::Serve { addr } => {
            let metrics = Metrics::init()?;
            let app = App::from_settings(settings, false)?;
            let router = api::router(ApiState::new(app)).merge(metrics.router());
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("binding {addr}"))?;
            tracing::info!(%addr, "serving HTTP triggers");
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = tokio::signal::ctrl_c().await;
                })
                .await
                .context("http server")?;
        }
    }
    Ok(())
}
