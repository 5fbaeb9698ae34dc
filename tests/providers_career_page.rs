use jobhunter::config::Settings;
use jobhunter::ingest::providers::career_page::CareerPageAdapter;
use jobhunter::ingest::types::SourceAdapter;
use jobhunter::model::{Priority, WatchlistEntry};

const CAREERS_HTML: &str = include_str!("fixtures/careers_page.html");
const DETAIL_HTML: &str = include_str!("fixtures/careers_detail.html");

fn entry() -> WatchlistEntry {
    WatchlistEntry {
        company: "Acme Capital".into(),
        url: "https://acme.test/careers".into(),
        priority: Priority::High,
        check_daily: true,
        last_checked: None,
    }
}

#[tokio::test]
async fn job_links_matching_keywords_are_extracted() {
    let adapter = CareerPageAdapter::from_fixture(entry(), CAREERS_HTML);
    let mut criteria = Settings::default().fallback_criteria();
    criteria.keywords = vec!["Quant".into()];

    let batch = adapter.fetch(&criteria).await.expect("careers parse ok");
    let titles: Vec<&str> = batch.postings.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Quantitative Analyst", "Senior Quant Developer"]);
    assert_eq!(batch.skipped, 1, "a two-letter link text is not a title");

    let first = &batch.postings[0];
    assert_eq!(first.url, "https://acme.test/jobs/quant-analyst-123");
    assert_eq!(first.company, "Acme Capital");
    assert_eq!(first.location, "Paris");
    assert_eq!(first.description, "Front office quant team");
    assert_eq!(first.source, "Careers: Acme Capital");
    assert_eq!(batch.postings[1].url, "https://boards.greenhouse.io/acme/jobs/456");
}

#[tokio::test]
async fn empty_keywords_keep_every_job_link() {
    let adapter = CareerPageAdapter::from_fixture(entry(), CAREERS_HTML);
    let mut criteria = Settings::default().fallback_criteria();
    criteria.keywords.clear();

    let batch = adapter.fetch(&criteria).await.unwrap();
    assert_eq!(batch.postings.len(), 4);
    assert!(batch.postings.iter().any(|p| p.title == "Office Manager"));
}

#[tokio::test]
async fn detail_page_supplies_the_description() {
    let adapter = CareerPageAdapter::from_fixture(entry(), CAREERS_HTML)
        .with_detail_page("https://acme.test/jobs/quant-analyst-123", DETAIL_HTML);
    let mut criteria = Settings::default().fallback_criteria();
    criteria.keywords = vec!["Quant".into()];

    let batch = adapter.fetch(&criteria).await.unwrap();
    let first = &batch.postings[0];
    assert!(
        first
            .description
            .starts_with("About the role Join the front office quant team to build & validate"),
        "got: {}",
        first.description
    );
    assert!(first.description.contains("Stochastic calculus"));
    assert!(!first.description.contains("Back to open positions"));

    // No detail page for the second posting: listing fields survive.
    let second = &batch.postings[1];
    assert_eq!(second.title, "Senior Quant Developer");
    assert!(second.description.is_empty());
}

#[tokio::test]
async fn unusable_detail_page_keeps_listing_fields() {
    let adapter = CareerPageAdapter::from_fixture(entry(), CAREERS_HTML)
        .with_detail_page("https://acme.test/jobs/quant-analyst-123", "<main>Apply now</main>");
    let mut criteria = Settings::default().fallback_criteria();
    criteria.keywords = vec!["Quant".into()];

    let batch = adapter.fetch(&criteria).await.unwrap();
    assert_eq!(batch.postings.len(), 2);
    assert_eq!(batch.postings[0].description, "Front office quant team");
}

#[test]
fn adapter_reports_its_watchlist_company() {
    let adapter = CareerPageAdapter::from_fixture(entry(), "");
    assert_eq!(adapter.watch_company(), Some("Acme Capital"));
    assert_eq!(adapter.name(), "Careers: Acme Capital");
}
