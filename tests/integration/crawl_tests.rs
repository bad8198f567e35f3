//! Scheduler behavior: round-robin paging, idempotence, resumption and stops

use crate::common::{
    client, fast_client_config, listing_document, mount_listing, mount_search_page, read_json,
    search_body, search_response, searched_pages, session_store, SEARCH,
};
use rent_ripple::api::{ListingId, PlaceId};
use rent_ripple::crawler::{
    CrawlOutcome, CrawlScheduler, ListingFetcher, ListingOutcome, StopFlag, StopSignal,
};
use rent_ripple::state::{CrawlTarget, TargetState};
use rent_ripple::storage::CorpusStore;
use rent_ripple::CrawlError;
use serde_json::json;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Stop signal that reads as raised from its (n+1)-th poll onward
struct StopAfterPolls {
    remaining: AtomicUsize,
}

impl StopAfterPolls {
    fn new(polls: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(polls),
        }
    }
}

impl StopSignal for StopAfterPolls {
    fn is_set(&self) -> bool {
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_err()
    }

    fn set(&self) -> io::Result<()> {
        self.remaining.store(0, Ordering::SeqCst);
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        Ok(())
    }
}

fn build_fetcher(server: &MockServer, dir: &Path) -> ListingFetcher {
    let client = client(&fast_client_config(&server.uri()), session_store(dir));
    ListingFetcher::new(client, true)
}

fn build_scheduler(
    server: &MockServer,
    dir: &Path,
    stop: Arc<dyn StopSignal>,
) -> (CrawlScheduler, CorpusStore) {
    let corpus = CorpusStore::new(dir.join("jsons"));
    let scheduler = CrawlScheduler::new(build_fetcher(server, dir), corpus.clone(), stop, 30);
    (scheduler, corpus)
}

#[tokio::test]
async fn test_single_city_end_to_end() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_search_page(&server, "X", 1, &[101, 102]).await;
    mount_search_page(&server, "X", 2, &[]).await;
    mount_listing(&server, 101, 1).await;
    mount_listing(&server, 102, 1).await;

    let stop = StopFlag::new();
    let (scheduler, corpus) = build_scheduler(&server, dir.path(), Arc::new(stop.clone()));

    let report = scheduler
        .run(vec![CrawlTarget::new("lyon", PlaceId::new("X"))])
        .await
        .unwrap();

    let lyon = corpus.city("lyon");
    assert_eq!(read_json(&lyon.listing_path("101")), listing_document(101));
    assert_eq!(read_json(&lyon.listing_path("102")), listing_document(102));
    assert_eq!(read_json(&lyon.page_path(1)), search_response(&[101, 102]));
    assert!(!lyon.has_page(2));

    assert_eq!(report.outcome, CrawlOutcome::Completed);
    assert_eq!(report.pages_written, 1);
    assert_eq!(report.listings_saved, 2);
    assert_eq!(report.targets.len(), 1);
    assert_eq!(report.targets[0].state(), TargetState::Retired);
    assert_eq!(report.targets[0].next_page(), 2);

    assert_eq!(searched_pages(&server).await, vec![("X".to_string(), 1), ("X".to_string(), 2)]);

    // Completion raises the stop signal for observers
    assert!(stop.is_set());
}

#[tokio::test]
async fn test_search_then_details_request_order() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_search_page(&server, "X", 1, &[101]).await;
    mount_search_page(&server, "X", 2, &[]).await;
    mount_listing(&server, 101, 1).await;

    let (scheduler, _corpus) = build_scheduler(&server, dir.path(), Arc::new(StopFlag::new()));
    scheduler
        .run(vec![CrawlTarget::new("lyon", PlaceId::new("X"))])
        .await
        .unwrap();

    let paths: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect();
    assert_eq!(paths, vec![SEARCH, "/cdp-bff/v1/classified/101", SEARCH]);
}

#[tokio::test]
async fn test_resume_skips_recorded_pages() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let (scheduler, corpus) = build_scheduler(&server, dir.path(), Arc::new(StopFlag::new()));
    let lyon = corpus.city("lyon");
    lyon.write_page(1, &search_response(&[1])).unwrap();
    lyon.write_page(2, &search_response(&[2])).unwrap();

    for page in [1, 2] {
        Mock::given(method("POST"))
            .and(path(SEARCH))
            .and(body_json(search_body("X", page)))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_response(&[])))
            .expect(0)
            .mount(&server)
            .await;
    }
    mount_search_page(&server, "X", 3, &[301]).await;
    mount_search_page(&server, "X", 4, &[]).await;
    mount_listing(&server, 301, 1).await;

    let target = CrawlTarget::resume(&lyon, PlaceId::new("X")).unwrap();
    assert_eq!(target.next_page(), 3);

    let report = scheduler.run(vec![target]).await.unwrap();

    assert_eq!(searched_pages(&server).await, vec![("X".to_string(), 3), ("X".to_string(), 4)]);
    assert!(lyon.has_page(3));
    assert!(!lyon.has_page(4));
    assert_eq!(report.targets[0].next_page(), 4);
}

#[tokio::test]
async fn test_stored_listings_are_not_refetched() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_search_page(&server, "X", 1, &[101, 102]).await;
    mount_search_page(&server, "X", 2, &[]).await;
    mount_listing(&server, 101, 0).await;
    mount_listing(&server, 102, 1).await;

    let (scheduler, corpus) = build_scheduler(&server, dir.path(), Arc::new(StopFlag::new()));
    let lyon = corpus.city("lyon");
    lyon.write_listing("101", &json!({"id": 101, "stale": true})).unwrap();

    let report = scheduler
        .run(vec![CrawlTarget::new("lyon", PlaceId::new("X"))])
        .await
        .unwrap();

    assert_eq!(report.listings_already_stored, 1);
    assert_eq!(report.listings_saved, 1);
    // The earlier file is left untouched
    assert_eq!(read_json(&lyon.listing_path("101")), json!({"id": 101, "stale": true}));
}

#[tokio::test]
async fn test_detail_fetch_is_idempotent() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(&server, 101, 1).await;

    let fetcher = build_fetcher(&server, dir.path());
    let lyon = CorpusStore::new(dir.path().join("jsons")).city("lyon");
    let id = ListingId::parse("101").unwrap();

    assert_eq!(
        fetcher.fetch_listing_detail(&lyon, &id).await.unwrap(),
        ListingOutcome::Saved
    );
    assert_eq!(
        fetcher.fetch_listing_detail(&lyon, &id).await.unwrap(),
        ListingOutcome::AlreadyStored
    );
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_removed_listing_is_skipped() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_search_page(&server, "X", 1, &[101, 102]).await;
    mount_search_page(&server, "X", 2, &[]).await;
    Mock::given(method("GET"))
        .and(path("/cdp-bff/v1/classified/101"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    mount_listing(&server, 102, 1).await;

    let (scheduler, corpus) = build_scheduler(&server, dir.path(), Arc::new(StopFlag::new()));
    let report = scheduler
        .run(vec![CrawlTarget::new("lyon", PlaceId::new("X"))])
        .await
        .unwrap();

    let lyon = corpus.city("lyon");
    assert!(!lyon.has_listing("101"));
    assert!(lyon.has_listing("102"));
    assert!(lyon.has_page(1));
    assert_eq!(report.listings_removed, 1);
}

#[tokio::test]
async fn test_empty_first_page_retires_city() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_search_page(&server, "X", 1, &[]).await;

    let (scheduler, corpus) = build_scheduler(&server, dir.path(), Arc::new(StopFlag::new()));
    let report = scheduler
        .run(vec![CrawlTarget::new("lyon", PlaceId::new("X"))])
        .await
        .unwrap();

    assert_eq!(report.outcome, CrawlOutcome::Completed);
    assert_eq!(report.targets[0].state(), TargetState::Retired);
    assert_eq!(corpus.city("lyon").count_pages().unwrap(), 0);
}

#[tokio::test]
async fn test_round_robin_across_cities() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_search_page(&server, "A", 1, &[11]).await;
    mount_search_page(&server, "A", 2, &[12]).await;
    mount_search_page(&server, "A", 3, &[]).await;
    mount_search_page(&server, "B", 1, &[21]).await;
    mount_search_page(&server, "B", 2, &[]).await;
    for id in [11, 12, 21] {
        mount_listing(&server, id, 1).await;
    }

    let (scheduler, corpus) = build_scheduler(&server, dir.path(), Arc::new(StopFlag::new()));
    let report = scheduler
        .run(vec![
            CrawlTarget::new("lyon", PlaceId::new("A")),
            CrawlTarget::new("paris", PlaceId::new("B")),
        ])
        .await
        .unwrap();

    let order: Vec<(String, u64)> = searched_pages(&server).await;
    assert_eq!(
        order,
        vec![
            ("A".to_string(), 1),
            ("B".to_string(), 1),
            ("A".to_string(), 2),
            ("B".to_string(), 2),
            ("A".to_string(), 3),
        ]
    );
    assert_eq!(report.rounds, 3);
    assert_eq!(report.pages_written, 3);
    assert!(corpus.city("lyon").has_listing("12"));
    assert!(corpus.city("paris").has_listing("21"));
    assert!(report.targets.iter().all(|t| t.state() == TargetState::Retired));
}

#[tokio::test]
async fn test_stop_before_round_writes_nothing() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_response(&[1])))
        .expect(0)
        .mount(&server)
        .await;

    let stop = StopFlag::new();
    stop.set().unwrap();
    let (scheduler, corpus) = build_scheduler(&server, dir.path(), Arc::new(stop));

    let report = scheduler
        .run(vec![CrawlTarget::new("lyon", PlaceId::new("X"))])
        .await
        .unwrap();

    assert_eq!(report.outcome, CrawlOutcome::Stopped);
    assert_eq!(report.rounds, 0);
    assert_eq!(report.targets[0].state(), TargetState::Aborted);
    assert_eq!(report.targets[0].next_page(), 1);
    assert_eq!(corpus.city("lyon").count_pages().unwrap(), 0);
    assert_eq!(corpus.city("lyon").count_listings().unwrap(), 0);
}

#[tokio::test]
async fn test_stop_mid_page_leaves_page_unrecorded() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_search_page(&server, "X", 1, &[101, 102, 103]).await;
    mount_listing(&server, 101, 1).await;
    mount_listing(&server, 102, 0).await;
    mount_listing(&server, 103, 0).await;

    // Round check and the first listing check pass, the second one stops
    let stop = Arc::new(StopAfterPolls::new(2));
    let (scheduler, corpus) = build_scheduler(&server, dir.path(), stop);

    let report = scheduler
        .run(vec![CrawlTarget::new("lyon", PlaceId::new("X"))])
        .await
        .unwrap();

    let lyon = corpus.city("lyon");
    assert_eq!(report.outcome, CrawlOutcome::Stopped);
    assert_eq!(report.targets[0].state(), TargetState::Aborted);
    assert_eq!(report.targets[0].next_page(), 1);
    assert!(lyon.has_listing("101"));
    assert!(!lyon.has_listing("102"));
    assert!(!lyon.has_page(1));

    // A later run resumes at the same page and reuses the stored listing
    let target = CrawlTarget::resume(&lyon, PlaceId::new("X")).unwrap();
    assert_eq!(target.next_page(), 1);
}

#[tokio::test]
async fn test_session_loss_aborts_every_city() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_search_page(&server, "A", 1, &[11]).await;
    mount_listing(&server, 11, 1).await;
    Mock::given(method("POST"))
        .and(path(SEARCH))
        .and(body_json(search_body("B", 1)))
        .respond_with(ResponseTemplate::new(403))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SEARCH))
        .and(body_json(search_body("A", 2)))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_response(&[])))
        .expect(0)
        .mount(&server)
        .await;

    let (scheduler, corpus) = build_scheduler(&server, dir.path(), Arc::new(StopFlag::new()));
    let err = scheduler
        .run(vec![
            CrawlTarget::new("lyon", PlaceId::new("A")),
            CrawlTarget::new("paris", PlaceId::new("B")),
        ])
        .await
        .unwrap_err();

    assert!(matches!(err, CrawlError::SessionExpired { attempts: 3, .. }));
    assert!(err.is_session_failure());

    // Work finished before the failure remains a valid checkpoint
    assert!(corpus.city("lyon").has_page(1));
    assert!(corpus.city("lyon").has_listing("11"));
    assert_eq!(corpus.city("paris").count_pages().unwrap(), 0);
}

#[tokio::test]
async fn test_server_error_on_detail_is_fatal_and_page_unrecorded() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_search_page(&server, "X", 1, &[101, 102]).await;
    mount_listing(&server, 101, 1).await;
    Mock::given(method("GET"))
        .and(path("/cdp-bff/v1/classified/102"))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&server)
        .await;

    let (scheduler, corpus) = build_scheduler(&server, dir.path(), Arc::new(StopFlag::new()));
    let err = scheduler
        .run(vec![CrawlTarget::new("lyon", PlaceId::new("X"))])
        .await
        .unwrap_err();

    assert!(matches!(err, CrawlError::HttpStatus { status: 502, .. }));
    assert!(!err.is_session_failure());

    let lyon = corpus.city("lyon");
    assert!(lyon.has_listing("101"));
    assert!(!lyon.has_page(1));
}

#[tokio::test]
async fn test_unusable_listing_id_does_not_block_page() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let page_one = json!({"classifieds": [{"id": "../etc"}, {"id": 101}]});
    Mock::given(method("POST"))
        .and(path(SEARCH))
        .and(body_json(search_body("X", 1)))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_one.clone()))
        .expect(1)
        .mount(&server)
        .await;
    mount_search_page(&server, "X", 2, &[]).await;
    mount_listing(&server, 101, 1).await;

    let (scheduler, corpus) = build_scheduler(&server, dir.path(), Arc::new(StopFlag::new()));
    let report = scheduler
        .run(vec![CrawlTarget::new("lyon", PlaceId::new("X"))])
        .await
        .unwrap();

    let lyon = corpus.city("lyon");
    assert_eq!(report.outcome, CrawlOutcome::Completed);
    assert_eq!(report.listings_saved, 1);
    assert!(lyon.has_listing("101"));
    assert_eq!(read_json(&lyon.page_path(1)), page_one);
    assert_eq!(lyon.count_listings().unwrap(), 1);
}
