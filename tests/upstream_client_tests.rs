//! Apify and Google Places clients against a local mock server

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use scrapeflow::domain::error::ScrapeError;
use scrapeflow::domain::model::{PlaceReview, ScrapeTarget, ScrapedProfile};
use scrapeflow::domain::platform::Platform;
use scrapeflow::domain::traits::{PlaceDirectory, ReviewSource};
use scrapeflow::infrastructure::config::{ActorConfig, ApifyConfig, GooglePlacesConfig};
use scrapeflow::infrastructure::network::apify::ApifyScraper;
use scrapeflow::infrastructure::network::http::create_client;
use scrapeflow::infrastructure::network::places::GooglePlacesClient;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
struct RecordedRun {
    actor: String,
    token: Option<String>,
    input: Value,
}

#[derive(Clone, Default)]
struct Mock {
    runs: Arc<Mutex<Vec<RecordedRun>>>,
}

async fn run_actor(
    State(mock): State<Mock>,
    Path(actor): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    Json(input): Json<Value>,
) -> (StatusCode, Json<Value>) {
    mock.runs.lock().unwrap().push(RecordedRun {
        actor: actor.clone(),
        token: query.get("token").cloned(),
        input,
    });

    match actor.as_str() {
        "broken~actor" => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": { "message": "invalid input" } })),
        ),
        "odd~actor" => (StatusCode::OK, Json(json!({ "items": [] }))),
        "Xb8osYTtOjlsgI6k9" => (
            StatusCode::OK,
            Json(json!([
                {
                    "name": "Anna",
                    "stars": 4,
                    "text": null,
                    "publishedAtDate": "2024-01-02T03:04:05.000Z",
                    "reviewerPhotoUrl": "https://lh3.example/anna.jpg",
                    "publishAt": "vor 2 Wochen"
                },
                { "stars": 5, "text": "Top" }
            ])),
        ),
        _ => (
            StatusCode::OK,
            Json(json!([
                {
                    "url": "https://www.my-hammer.de/auftragnehmer/dach-weber/bewertungen?page=1",
                    "companyName": "Dach Weber",
                    "averageRating": "4,7",
                    "reviewCount": "1.204 Bewertungen",
                    "reviews": [
                        { "authorName": "K. Braun", "ratingStars": 5, "body": "Alles bestens" }
                    ]
                },
                {
                    "reviews": [
                        { "author": "T. Vogel", "stars": "4 Sterne", "text": "Gut" }
                    ]
                }
            ])),
        ),
    }
}

#[derive(serde::Deserialize)]
struct DetailsQuery {
    place_id: String,
    key: String,
    fields: String,
}

async fn place_details(Query(query): Query<DetailsQuery>) -> Json<Value> {
    assert!(!query.fields.contains("reviews"));
    if query.key != "places-key" {
        return Json(json!({ "status": "REQUEST_DENIED", "error_message": "The provided API key is invalid." }));
    }
    if query.place_id == "missing" {
        return Json(json!({ "status": "NOT_FOUND" }));
    }
    Json(json!({
        "status": "OK",
        "result": {
            "name": "Bäckerei Horn",
            "rating": 4.4,
            "user_ratings_total": 87,
            "types": ["bakery", "food"]
        }
    }))
}

async fn start_mock() -> (SocketAddr, Mock) {
    let mock = Mock::default();
    let app = Router::new()
        .route("/acts/:actor/run-sync-get-dataset-items", post(run_actor))
        .route("/place/details/json", get(place_details))
        .with_state(mock.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, mock)
}

fn apify_config(addr: SocketAddr) -> ApifyConfig {
    ApifyConfig {
        api_key: Some("test-token".to_string()),
        base_url: format!("http://{}", addr),
        ..Default::default()
    }
}

fn target(platform: Platform, resource: &str) -> ScrapeTarget {
    ScrapeTarget {
        platform,
        resource: resource.to_string(),
        page: 1,
    }
}

#[tokio::test]
async fn test_profile_run_is_normalized() {
    let (addr, mock) = start_mock().await;
    let scraper = ApifyScraper::new(create_client(5).unwrap(), apify_config(addr));
    let resource = "https://www.my-hammer.de/auftragnehmer/dach-weber/bewertungen?page=1";

    let value = scraper
        .fetch(&target(Platform::MyHammer, resource))
        .await
        .unwrap();
    let profile: ScrapedProfile = serde_json::from_value(value).unwrap();

    assert_eq!(profile.name.as_deref(), Some("Dach Weber"));
    assert_eq!(profile.average_score, Some(4.7));
    assert_eq!(profile.total_reviews, Some(1204));
    assert_eq!(profile.reviews.len(), 2);
    assert_eq!(profile.reviews[1].author.as_deref(), Some("T. Vogel"));
    assert_eq!(profile.reviews[1].rating, Some(4.0));

    let runs = mock.runs.lock().unwrap().clone();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].actor, "pBEnk9UMhriLoEj7d");
    assert_eq!(runs[0].token.as_deref(), Some("test-token"));
    assert_eq!(runs[0].input["startUrls"][0]["url"], resource);
    assert_eq!(runs[0].input["maxResultsPerCrawl"], 10);
}

#[tokio::test]
async fn test_google_reviews_run_is_normalized() {
    let (addr, mock) = start_mock().await;
    let scraper = ApifyScraper::new(create_client(5).unwrap(), apify_config(addr));

    let value = scraper
        .fetch(&target(Platform::GoogleReviews, "ChIJabc"))
        .await
        .unwrap();
    let reviews: Vec<PlaceReview> = serde_json::from_value(value).unwrap();

    assert_eq!(reviews.len(), 2);
    assert_eq!(reviews[0].author_name, "Anna");
    assert_eq!(reviews[0].rating, 4);
    assert_eq!(reviews[0].text, "");
    assert_eq!(reviews[0].time, 1_704_164_645);
    assert_eq!(reviews[0].relative_time_description, "vor 2 Wochen");
    assert_eq!(reviews[1].author_name, "Anonymous");
    assert_eq!(reviews[1].time, 0);

    let runs = mock.runs.lock().unwrap().clone();
    assert_eq!(runs[0].input["placeIds"], json!(["ChIJabc"]));
    assert_eq!(runs[0].input["language"], "de");
    assert_eq!(runs[0].input["reviewsSort"], "newest");
}

#[tokio::test]
async fn test_configured_actor_and_page_function() {
    let (addr, mock) = start_mock().await;
    let dir = tempfile::tempdir().unwrap();
    let page_function = dir.path().join("page_function.js");
    std::fs::write(&page_function, "async function pageFunction(context) { return []; }").unwrap();

    let mut config = apify_config(addr);
    config.actors.insert(
        "immobilienscout24".to_string(),
        ActorConfig {
            actor_id: Some("apify/web-scraper".to_string()),
            page_function: Some(page_function.display().to_string()),
        },
    );
    let scraper = ApifyScraper::new(create_client(5).unwrap(), config);

    scraper
        .fetch(&target(Platform::ImmobilienScout24, "https://www.immobilienscout24.de/anbieter/x"))
        .await
        .unwrap();

    let runs = mock.runs.lock().unwrap().clone();
    assert_eq!(runs[0].actor, "apify~web-scraper");
    assert!(runs[0].input["pageFunction"]
        .as_str()
        .unwrap()
        .starts_with("async function pageFunction"));
}

#[tokio::test]
async fn test_actor_failures_are_upstream_errors() {
    let (addr, _mock) = start_mock().await;

    for actor in ["broken/actor", "odd/actor"] {
        let mut config = apify_config(addr);
        config.actors.insert(
            "trustpilot".to_string(),
            ActorConfig {
                actor_id: Some(actor.to_string()),
                page_function: None,
            },
        );
        let scraper = ApifyScraper::new(create_client(5).unwrap(), config);

        let err = scraper
            .fetch(&target(Platform::Trustpilot, "https://de.trustpilot.com/review/x.de?page=1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Upstream(_)), "{:?}", err);
        assert!(err.to_string().contains(actor));
    }
}

#[tokio::test]
async fn test_missing_api_key_is_a_config_error() {
    let (addr, mock) = start_mock().await;
    let mut config = apify_config(addr);
    config.api_key = None;
    let scraper = ApifyScraper::new(create_client(5).unwrap(), config);

    let err = scraper
        .fetch(&target(Platform::Jameda, "https://www.jameda.de/dr-x"))
        .await
        .unwrap_err();
    assert!(matches!(err, ScrapeError::Config(_)));
    assert!(mock.runs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_place_details() {
    let (addr, _mock) = start_mock().await;
    let places = |key: &str| {
        GooglePlacesClient::new(
            create_client(5).unwrap(),
            GooglePlacesConfig {
                api_key: Some(key.to_string()),
                base_url: format!("http://{}/place", addr),
            },
        )
    };

    let details = places("places-key").details("ChIJhorn").await.unwrap();
    assert_eq!(details.place_id, "ChIJhorn");
    assert_eq!(details.name, "Bäckerei Horn");
    assert_eq!(details.user_ratings_total, Some(87));
    assert_eq!(details.types, vec!["bakery", "food"]);

    let err = places("places-key").details("missing").await.unwrap_err();
    assert!(matches!(err, ScrapeError::Places(_)));
    assert!(err.is_client_error());

    let err = places("wrong").details("ChIJhorn").await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Google Places API error: The provided API key is invalid."
    );
}

#[tokio::test]
async fn test_connection_errors_do_not_expose_api_keys() {
    // nothing listens on port 1
    let scraper = ApifyScraper::new(
        create_client(5).unwrap(),
        ApifyConfig {
            api_key: Some("apify-secret-token".to_string()),
            base_url: "http://127.0.0.1:1".to_string(),
            ..Default::default()
        },
    );
    let err = scraper
        .fetch(&target(Platform::Jameda, "https://www.jameda.de/dr-x"))
        .await
        .unwrap_err();
    assert!(matches!(err, ScrapeError::Http(_)), "{:?}", err);
    assert!(!err.to_string().contains("apify-secret-token"), "{}", err);
    assert!(!format!("{:?}", err).contains("apify-secret-token"));

    let places = GooglePlacesClient::new(
        create_client(5).unwrap(),
        GooglePlacesConfig {
            api_key: Some("places-secret-key".to_string()),
            base_url: "http://127.0.0.1:1/place".to_string(),
        },
    );
    let err = places.details("ChIJhorn").await.unwrap_err();
    assert!(matches!(err, ScrapeError::Http(_)), "{:?}", err);
    assert!(!err.to_string().contains("places-secret-key"), "{}", err);
    assert!(!format!("{:?}", err).contains("places-secret-key"));
}
