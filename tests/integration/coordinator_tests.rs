//! Wiring from configuration: place resolution, resume points and the stop lifecycle

use crate::common::{
    fast_client_config, mount_listing, mount_search_page, search_response, searched_pages,
    write_cookie_file,
};
use rent_ripple::api::AutocompleteRequest;
use rent_ripple::config::{CityEntry, Config, CrawlConfig, OutputConfig, SessionConfig};
use rent_ripple::crawler::{Coordinator, CrawlOutcome, StopFlag, StopSignal};
use rent_ripple::state::TargetState;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const AUTOCOMPLETE: &str = "/search-mfe-bff/autocomplete";

fn city(name: &str, place_id: Option<&str>) -> CityEntry {
    CityEntry {
        name: name.to_string(),
        place_id: place_id.map(str::to_string),
    }
}

fn test_config(server: &MockServer, dir: &Path, cities: Vec<CityEntry>) -> Config {
    Config {
        session: SessionConfig {
            cookie_file: write_cookie_file(dir),
            refresh_command: vec!["true".to_string()],
            refresh_timeout_secs: 5,
        },
        client: fast_client_config(&server.uri()),
        crawl: CrawlConfig {
            stop_sentinel: dir.join("stop_scraping.flag"),
            ..CrawlConfig::default()
        },
        output: OutputConfig {
            data_dir: dir.join("jsons"),
        },
        cities,
    }
}

async fn mount_autocomplete(server: &MockServer, text: &str, candidates: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path(AUTOCOMPLETE))
        .and(body_json(AutocompleteRequest::new(text, 5)))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidates))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_run_resolves_and_crawls() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_autocomplete(
        &server,
        "Lyon",
        json!([{"id": "AD08FR28808", "labels": ["Lyon (69)"]}]),
    )
    .await;
    mount_search_page(&server, "AD08FR28808", 1, &[101]).await;
    mount_search_page(&server, "AD08FR28808", 2, &[]).await;
    mount_listing(&server, 101, 1).await;
    mount_search_page(&server, "AD08FR1", 1, &[]).await;

    let config = test_config(
        &server,
        dir.path(),
        vec![city("Lyon", None), city("Saint Étienne", Some("AD08FR1"))],
    );

    // A leftover request from an earlier run must not stop this one
    let stop = StopFlag::new();
    stop.set().unwrap();

    let coordinator = Coordinator::with_stop_signal(config, Arc::new(stop.clone())).unwrap();
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.outcome, CrawlOutcome::Completed);
    assert_eq!(report.targets.len(), 2);
    assert_eq!(report.targets[0].city_slug(), "lyon");
    assert_eq!(report.targets[1].city_slug(), "saint_étienne");
    assert!(report.targets.iter().all(|t| t.state() == TargetState::Retired));

    let lyon = coordinator.corpus().city("lyon");
    assert!(lyon.has_page(1));
    assert!(lyon.has_listing("101"));

    assert!(stop.is_set());
}

#[tokio::test]
async fn test_unresolved_city_is_skipped() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_autocomplete(&server, "Atlantis", json!([])).await;
    mount_autocomplete(&server, "Nantes", json!([{"id": "AD08FR2"}])).await;

    let config = test_config(
        &server,
        dir.path(),
        vec![city("Atlantis", None), city("Nantes", None)],
    );
    let coordinator = Coordinator::with_stop_signal(config, Arc::new(StopFlag::new())).unwrap();
    let targets = coordinator.resolve_targets().await.unwrap();

    assert_eq!(targets.len(), 1);
    // Without a label the configured name names the directory
    assert_eq!(targets[0].city_slug(), "nantes");
    assert_eq!(targets[0].place_id().as_str(), "AD08FR2");
}

#[tokio::test]
async fn test_targets_resume_from_disk() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let config = test_config(
        &server,
        dir.path(),
        vec![city("Lyon", Some("P1")), city("Paris", Some("P2"))],
    );
    let coordinator = Coordinator::with_stop_signal(config, Arc::new(StopFlag::new())).unwrap();

    let lyon = coordinator.corpus().city("lyon");
    for page in 1..=3 {
        lyon.write_page(page, &search_response(&[u64::from(page)])).unwrap();
    }

    let targets = coordinator.resolve_targets().await.unwrap();
    assert_eq!(targets[0].next_page(), 4);
    assert_eq!(targets[1].next_page(), 1);

    // Known place ids never hit autocomplete
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_directory_is_crawled_once() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_autocomplete(&server, "lyon", json!([{"id": "P9", "labels": ["Lyon"]}])).await;
    mount_search_page(&server, "P1", 1, &[]).await;

    let config = test_config(
        &server,
        dir.path(),
        vec![city("Lyon", Some("P1")), city("lyon", None)],
    );
    let coordinator = Coordinator::with_stop_signal(config, Arc::new(StopFlag::new())).unwrap();
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.targets.len(), 1);
    assert_eq!(report.targets[0].place_id().as_str(), "P1");
    assert_eq!(searched_pages(&server).await, vec![("P1".to_string(), 1)]);
}
