//! Data service integration tests.
//!
//! Starts an axum fixture server and exercises the cache/network fallback
//! against a record store in a temp directory.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};
use tempfile::TempDir;

use platecache::{ApiClient, DataError, DataService, RecordStore, Restaurant, FILTER_ALL};

fn fixture_json() -> Value {
    json!([
        {
            "id": 1,
            "name": "Mission Chinese Food",
            "neighborhood": "Manhattan",
            "cuisine_type": "Asian",
            "photograph": "1",
            "latlng": { "lat": 40.713829, "lng": -73.989667 },
            "favorites": true,
            "is_favorite": "true"
        },
        {
            "id": 2,
            "name": "Emily",
            "neighborhood": "Brooklyn",
            "cuisine_type": "Pizza",
            "favorites": false,
            "is_favorite": "false"
        },
        {
            "id": 3,
            "name": "Kang Ho Dong Baekjeong",
            "neighborhood": "Manhattan",
            "cuisine_type": "Asian"
        },
        {
            "id": 4,
            "name": "Katz's Delicatessen",
            "neighborhood": "Manhattan",
            "cuisine_type": "Deli",
            "is_favorite": "true"
        },
        {
            "id": 5,
            "name": "Roberta's Pizza",
            "neighborhood": "Brooklyn",
            "cuisine_type": "Pizza"
        }
    ])
}

fn fixture_records() -> Vec<Restaurant> {
    serde_json::from_value(fixture_json()).expect("fixture should parse")
}

struct Hits(AtomicUsize);

async fn restaurants(State(hits): State<Arc<Hits>>) -> Json<Value> {
    hits.0.fetch_add(1, Ordering::SeqCst);
    Json(fixture_json())
}

/// Bind to port 0 and return the base URL plus the request counter.
async fn start_server() -> (String, Arc<Hits>) {
    let hits = Arc::new(Hits(AtomicUsize::new(0)));
    let app = Router::new()
        .route("/restaurants", get(restaurants))
        .with_state(hits.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), hits)
}

fn service_with_store(base: &str, dir: &TempDir) -> DataService {
    let api = ApiClient::new(base).unwrap();
    let store = RecordStore::open(dir.path()).unwrap();
    DataService::new(api, Some(store))
}

/// Service over a pre-seeded store pointed at a dead endpoint; queries must
/// never reach the network.
fn seeded_service() -> (DataService, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = RecordStore::open(dir.path()).unwrap();
    store.put_all(&fixture_records()).unwrap();
    let api = ApiClient::new("http://127.0.0.1:9").unwrap();
    (DataService::new(api, Some(store)), dir)
}

fn ids(records: &[Restaurant]) -> Vec<i64> {
    records.iter().map(|r| r.id).collect()
}

#[tokio::test]
async fn non_empty_store_is_served_without_a_network_call() {
    let (base, hits) = start_server().await;
    let dir = TempDir::new().unwrap();
    RecordStore::open(dir.path())
        .unwrap()
        .put_all(&fixture_records())
        .unwrap();

    let service = service_with_store(&base, &dir);
    let all = service.fetch_all().await.unwrap();
    assert_eq!(all.len(), 5);
    assert_eq!(hits.0.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_store_fetches_once_and_populates_the_store() {
    let (base, hits) = start_server().await;
    let dir = TempDir::new().unwrap();
    let service = service_with_store(&base, &dir);

    let all = service.fetch_all().await.unwrap();
    assert_eq!(all.len(), 5);
    assert_eq!(hits.0.load(Ordering::SeqCst), 1);

    // The write-back is fire-and-forget; give it a moment to land.
    let store = RecordStore::open(dir.path()).unwrap();
    let mut cached = Vec::new();
    for _ in 0..50 {
        cached = store.get_all().unwrap();
        if !cached.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(cached.len(), 5);

    // Subsequent queries come from the store.
    service.fetch_all().await.unwrap();
    assert_eq!(hits.0.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn network_failure_with_empty_store_is_an_error() {
    // Nothing listens here.
    let dir = TempDir::new().unwrap();
    let service = service_with_store("http://127.0.0.1:9", &dir);
    assert!(matches!(
        service.fetch_all().await,
        Err(DataError::Network(_))
    ));
}

#[tokio::test]
async fn no_store_means_network_every_time() {
    let (base, hits) = start_server().await;
    let api = ApiClient::new(&base).unwrap();
    let service = DataService::new(api, None);

    assert!(service.fetch_cached().await.is_empty());
    service.fetch_all().await.unwrap();
    service.fetch_all().await.unwrap();
    assert_eq!(hits.0.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn by_cuisine_filters_in_original_order() {
    let (service, _dir) = seeded_service();
    let pizza = service.by_cuisine("Pizza").await.unwrap();
    assert_eq!(ids(&pizza), vec![2, 5]);
}

#[tokio::test]
async fn by_neighborhood_filters() {
    let (service, _dir) = seeded_service();
    let brooklyn = service.by_neighborhood("Brooklyn").await.unwrap();
    assert_eq!(ids(&brooklyn), vec![2, 5]);
}

#[tokio::test]
async fn by_favorites_reads_the_boolean_flag() {
    let (service, _dir) = seeded_service();

    // Only id 1 carries favorites == true; id 4 is only string-flagged.
    let favorites = service.by_favorites(true).await.unwrap();
    assert_eq!(ids(&favorites), vec![1]);

    // Records without the flag match neither value.
    let non_favorites = service.by_favorites(false).await.unwrap();
    assert_eq!(ids(&non_favorites), vec![2]);
}

#[tokio::test]
async fn combined_filter_with_all_sentinels_is_identity() {
    let (service, _dir) = seeded_service();
    let all = service.filtered(FILTER_ALL, FILTER_ALL, false).await.unwrap();
    assert_eq!(ids(&all), vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn combined_filter_applies_conjunctively() {
    let (service, _dir) = seeded_service();

    let manhattan_asian = service.filtered("Asian", "Manhattan", false).await.unwrap();
    assert_eq!(ids(&manhattan_asian), vec![1, 3]);

    // The favorite predicate reads the string flag: ids 1 and 4 are "true".
    let favorites = service.filtered(FILTER_ALL, FILTER_ALL, true).await.unwrap();
    assert_eq!(ids(&favorites), vec![1, 4]);

    let narrowed = service.filtered("Asian", "Manhattan", true).await.unwrap();
    assert_eq!(ids(&narrowed), vec![1]);
}

#[tokio::test]
async fn distinct_lists_preserve_first_occurrence_order() {
    let (service, _dir) = seeded_service();

    let neighborhoods = service.distinct_neighborhoods().await.unwrap();
    assert_eq!(neighborhoods, vec!["Manhattan", "Brooklyn"]);

    let cuisines = service.distinct_cuisines().await.unwrap();
    assert_eq!(cuisines, vec!["Asian", "Pizza", "Deli"]);
}

#[tokio::test]
async fn by_id_resolves_or_reports_not_found() {
    let (service, _dir) = seeded_service();

    let katz = service.by_id(4).await.unwrap();
    assert_eq!(katz.name, "Katz's Delicatessen");

    assert!(matches!(
        service.by_id(99).await,
        Err(DataError::NotFound(99))
    ));
}
