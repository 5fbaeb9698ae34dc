use chrono::NaiveDate;
use jobhunter::config::Settings;
use jobhunter::ingest::providers::rss_feed::RssFeedAdapter;
use jobhunter::ingest::types::SourceAdapter;

const BOARD_XML: &str = include_str!("fixtures/board_rss.xml");

#[tokio::test]
async fn board_fixture_parses_into_postings() {
    let adapter = RssFeedAdapter::from_fixture("Board", BOARD_XML);
    let batch = adapter
        .fetch(&Settings::default().fallback_criteria())
        .await
        .expect("board parse ok");

    assert_eq!(batch.postings.len(), 3, "three items carry a link");
    assert_eq!(batch.skipped, 1, "the item without a link is skipped");

    let first = &batch.postings[0];
    assert_eq!(first.title, "Quantitative Analyst");
    assert_eq!(first.company, "Acme Bank");
    assert_eq!(first.location, "Paris");
    assert_eq!(first.description, "Build & validate pricing models.");
    assert_eq!(first.source, "Board");
    assert_eq!(first.posted_date, NaiveDate::from_ymd_opt(2025, 10, 14));

    let second = &batch.postings[1];
    assert_eq!(second.title, "Risk - Credit Analyst");
    assert_eq!(second.company, "Foo SA");
    assert_eq!(second.posted_date, NaiveDate::from_ymd_opt(2025, 10, 13));

    let third = &batch.postings[2];
    assert_eq!(third.company, "Bar Fintech");
    assert!(third.location.is_empty());
    assert!(third.posted_date.is_none());
}

#[tokio::test]
async fn broken_xml_is_a_parse_error() {
    let adapter = RssFeedAdapter::from_fixture("Board", "<rss><channel><item>");
    let err = adapter
        .fetch(&Settings::default().fallback_criteria())
        .await
        .unwrap_err();
    assert!(!err.is_transient(), "markup errors are not retried");
}
