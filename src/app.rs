// src/app.rs
//! Wiring: builds the store, oracle, storage and sources from settings.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::config::profile::MasterProfile;
use crate::config::Settings;
use crate::error::PipelineError;
use crate::generate::{ArtifactGenerator, Generator};
use crate::ingest::providers::build_adapters;
use crate::ingest::FetchPolicy;
use crate::llm::{build_oracle, DynOracle};
use crate::model::WatchlistEntry;
use crate::pipeline::{Discovery, DiscoveryReport, SourceFactory};
use crate::scoring::Scorer;
use crate::storage::drive::DriveStorage;
use crate::storage::{DocumentStorage, LocalDirStorage};
use crate::store::notion::NotionStore;
use crate::store::{MemoryStore, RecordStore};
use crate::watcher::{run_poll, PollReport, StatusWatcher};

/// Everything a discovery run or a poll needs. Cheap to clone.
#[derive(Clone)]
pub struct App {
    pub settings: Arc<Settings>,
    pub store: Arc<dyn RecordStore>,
    pub oracle: DynOracle,
    pub storage: Arc<dyn DocumentStorage>,
    pub profile: Arc<MasterProfile>,
    pub sources: SourceFactory,
}

impl App {
    /// Production wiring. Notion is required unless `dry_run`, which uses the
    /// in-memory store. Without Drive, artifacts go to the local output directory.
    pub fn from_settings(settings: Settings, dry_run: bool) -> Result<Self> {
        if !dry_run && !settings.notion.is_configured() {
            bail!("Notion is not configured (NOTION_API_KEY, NOTION_JOBS_DB_ID); use --dry-run to run without it");
        }
        let profile = Arc::new(MasterProfile::load_or_default(&settings.profile_path));
        let oracle = build_oracle(&settings);

        let store: Arc<dyn RecordStore> = if dry_run {
            Arc::new(MemoryStore::new())
        } else {
            Arc::new(NotionStore::new(settings.notion.clone(), settings.min_score))
        };

        let storage: Arc<dyn DocumentStorage> = if !dry_run && settings.drive.is_configured() {
            Arc::new(DriveStorage::new(settings.drive.clone()))
        } else {
            Arc::new(LocalDirStorage::new(settings.output_dir.clone()))
        };

        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .connect_timeout(Duration::from_secs(10))
            .timeout(settings.source_timeout())
            .build()
            .context("building HTTP client")?;
        let source_settings = settings.clone();
        let sources: SourceFactory =
            Arc::new(move |watchlist: &[WatchlistEntry]| build_adapters(&source_settings, &client, watchlist));

        tracing::info!(
            store = store.store_name(),
            storage = storage.storage_name(),
            oracle = oracle.provider_name(),
            "pipeline wired"
        );

        Ok(Self {
            settings: Arc::new(settings),
            store,
            oracle,
            storage,
            profile,
            sources,
        })
    }

    pub fn fetch_policy(&self) -> FetchPolicy {
        FetchPolicy {
            timeout: self.settings.source_timeout(),
            max_postings: self.settings.max_postings_per_source,
        }
    }

    pub fn discovery(&self) -> Discovery {
        let scorer = Scorer::new(
            self.oracle.clone(),
            self.profile.clone(),
            self.settings.oracle.max_tokens,
        );
        Discovery::new(
            self.store.clone(),
            Arc::new(scorer),
            self.sources.clone(),
            self.fetch_policy(),
            self.settings.strong_match_threshold,
            self.settings.fallback_criteria(),
        )
    }

    pub fn generator(&self) -> Arc<dyn ArtifactGenerator> {
        Arc::new(Generator::new(
            self.oracle.clone(),
            self.storage.clone(),
            self.profile.clone(),
            self.settings.oracle.max_tokens,
        ))
    }

    pub fn watcher(&self) -> StatusWatcher {
        StatusWatcher::new(self.store.clone(), self.generator())
    }

    pub async fn discover(&self) -> Result<DiscoveryReport, PipelineError> {
        self.discovery().run().await
    }

    pub async fn poll(&self) -> Result<PollReport, PipelineError> {
        run_poll(&self.watcher(), &self.settings.state_path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NotionSettings;

    #[tokio::test]
    async fn unconfigured_notion_needs_dry_run() {
        let err = App::from_settings(Settings::default(), false).err().expect("must refuse");
        assert!(err.to_string().contains("Notion is not configured"));

        let app = App::from_settings(Settings::default(), true).unwrap();
        assert_eq!(app.store.store_name(), "memory");
    }

    #[tokio::test]
    async fn configured_notion_is_the_store() {
        let settings = Settings {
            notion: NotionSettings {
                api_key: "secret_test".into(),
                jobs_db: "jobs-db".into(),
                ..Default::default()
            },
            ..Settings::default()
        };
        let app = App::from_settings(settings, false).unwrap();
        assert_eq!(app.store.store_name(), "notion");
    }
}
