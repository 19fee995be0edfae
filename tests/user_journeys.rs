//! Behavior-driven tests for end-to-end acquisition journeys
//!
//! These tests verify WHAT a caller gets back when real HTTP sources
//! misbehave, using local servers in place of the upstream sites.

use scorewire_core::{
    DatasetCache, DatasetRegistry, DatasetService, DatasetSpec, FetchConfig, Fetcher, JitterRange,
    JsonArraySource, ManualClock, Orchestrator, ReqwestHttpClient, ResolvePolicy, RetryConfig,
    SelectionStrategy, ServedOrigin, UtcDateTime,
};
use std::sync::Arc;
use std::time::Duration;

fn fetcher(clock: Arc<ManualClock>, attempts: u32) -> Arc<Fetcher> {
    Arc::new(Fetcher::new(
        Arc::new(ReqwestHttpClient::new()),
        clock,
        FetchConfig::default()
            .with_timeout(Duration::from_secs(5))
            .with_retry(RetryConfig::exponential(attempts).with_jitter(JitterRange::disabled())),
    ))
}

// =============================================================================
// User Journey: Standings with a Backup Source
// =============================================================================

#[tokio::test]
async fn user_gets_standings_from_backup_when_primary_site_is_down() {
    // Given: A primary site returning 500 and a healthy backup
    let mut primary = mockito::Server::new_async().await;
    let mut backup = mockito::Server::new_async().await;
    let primary_mock = primary
        .mock("GET", "/tabla")
        .with_status(500)
        .expect(2)
        .create_async()
        .await;
    let _backup_mock = backup
        .mock("GET", "/tabla")
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"updated":"2024-03-02T12:00:00Z","rows":[{"team":"Boca","points":30},{"team":"River","points":28}]}"#,
        )
        .create_async()
        .await;

    let clock = Arc::new(ManualClock::new(
        UtcDateTime::parse("2024-03-02T12:30:00Z").expect("valid timestamp"),
    ));
    let fetcher = fetcher(clock.clone(), 2);
    let registry = DatasetRegistry::builder()
        .register(
            DatasetSpec::new("tabla")
                .with_source(
                    JsonArraySource::new("primary", format!("{}/tabla", primary.url()), fetcher.clone())
                        .with_records_at("/rows")
                        .with_captured_at("/updated"),
                )
                .with_source(
                    JsonArraySource::new("backup", format!("{}/tabla", backup.url()), fetcher)
                        .with_records_at("/rows")
                        .with_captured_at("/updated"),
                ),
        )
        .build()
        .expect("valid registry");
    let service = DatasetService::new(
        registry,
        Orchestrator::new(clock.clone()),
        DatasetCache::with_clock(Duration::from_secs(1800), clock.clone()),
    );

    // When: The user requests the standings
    let served = service.acquire("tabla").await.expect("backup serves");

    // Then: Rows come from the backup, annotated fresh, with the primary failure explained
    assert_eq!(served.origin, ServedOrigin::Live);
    assert_eq!(served.data.source_name, "backup");
    assert_eq!(served.data.records.len(), 2);
    assert_eq!(served.data.records[0]["team"], "Boca");
    let freshness = served.data.freshness.expect("capture time parsed");
    assert!(freshness.is_fresh);
    assert_eq!(served.failures.len(), 1);
    assert_eq!(served.failures[0].source, "primary");
    primary_mock.assert_async().await;

    // And: The primary was retried once after a two second backoff
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(2)]);
}

#[tokio::test]
async fn user_gets_the_more_complete_table_when_both_sites_answer() {
    // Given: Two healthy sites, one publishing a truncated table
    let mut short = mockito::Server::new_async().await;
    let mut full = mockito::Server::new_async().await;
    let _short = short
        .mock("GET", "/tabla")
        .with_body(r#"[{"team":"Boca"}]"#)
        .create_async()
        .await;
    let _full = full
        .mock("GET", "/tabla")
        .with_body(r#"[{"team":"Boca"},{"team":"River"},{"team":"Racing"}]"#)
        .create_async()
        .await;

    let clock = Arc::new(ManualClock::default());
    let fetcher = fetcher(clock.clone(), 1);
    let registry = DatasetRegistry::builder()
        .register(
            DatasetSpec::new("tabla")
                .with_source(JsonArraySource::new("short", format!("{}/tabla", short.url()), fetcher.clone()))
                .with_source(JsonArraySource::new("full", format!("{}/tabla", full.url()), fetcher))
                .with_policy(ResolvePolicy::new(SelectionStrategy::MostComplete).with_fan_out(true)),
        )
        .build()
        .expect("valid registry");
    let service = DatasetService::new(registry, Orchestrator::new(clock.clone()), DatasetCache::default());

    // When: The user requests the standings
    let served = service.acquire("tabla").await.expect("both answer");

    // Then: The full table wins and no failures are reported
    assert_eq!(served.data.source_name, "full");
    assert_eq!(served.data.len(), 3);
    assert!(served.failures.is_empty());
    assert!(served.data.freshness.is_none());
}

#[tokio::test]
async fn user_gets_a_parse_failure_explained_when_site_changes_its_layout() {
    // Given: A site whose JSON no longer has the expected record array
    let mut site = mockito::Server::new_async().await;
    let _mock = site
        .mock("GET", "/noticias")
        .with_body(r#"{"articles":{"count":0}}"#)
        .create_async()
        .await;

    let clock = Arc::new(ManualClock::default());
    let registry = DatasetRegistry::builder()
        .register(DatasetSpec::new("noticias").with_source(
            JsonArraySource::new("ole", format!("{}/noticias", site.url()), fetcher(clock.clone(), 1))
                .with_records_at("/articles/items"),
        ))
        .build()
        .expect("valid registry");
    let service = DatasetService::new(registry, Orchestrator::new(clock.clone()), DatasetCache::default());

    // When: The user requests the news
    let error = service.acquire("noticias").await.expect_err("nothing to serve");

    // Then: The failure names the source and the parse problem
    let scorewire_core::ServiceError::Unavailable { source, .. } = error else {
        panic!("expected unavailable");
    };
    assert_eq!(source.failures[0].source, "ole");
    assert_eq!(source.failures[0].code, "source.parse");
}
