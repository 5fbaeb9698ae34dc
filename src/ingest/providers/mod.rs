pub mod career_page;
pub mod rss_feed;

use std::sync::Arc;

use crate::config::{Settings, SourceKind};
use crate::ingest::types::SourceAdapter;
use crate::model::WatchlistEntry;

/// Board adapters from settings plus one careers-page adapter per daily watchlist entry.
pub fn build_adapters(
    settings: &Settings,
    client: &reqwest::Client,
    watchlist: &[WatchlistEntry],
) -> Vec<Arc<dyn SourceAdapter>> {
    let mut out: Vec<Arc<dyn SourceAdapter>> = Vec::new();
    for src in settings.sources.iter().filter(|s| s.enabled) {
        match src.kind {
            SourceKind::Rss => out.push(Arc::new(rss_feed::RssFeedAdapter::from_config(
                src.clone(),
                client.clone(),
            ))),
        }
    }
    for entry in watchlist.iter().filter(|w| w.check_daily) {
        // Half the source timeout for detail pages leaves room for the listing.
        out.push(Arc::new(
            career_page::CareerPageAdapter::new(entry.clone(), client.clone())
                .with_detail_budget(settings.source_timeout() / 2),
        ));
    }
    out
}
