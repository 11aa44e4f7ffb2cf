//! Integration tests for name-to-coordinates lookup using wiremock.

use weatherlog_core::{Geocoder, Place};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn geocoder(server: &MockServer) -> Geocoder {
    Geocoder::new(format!("{}/v1/search", server.uri())).unwrap()
}

#[tokio::test]
async fn test_first_result_is_returned() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .and(query_param("name", "Lyon"))
        .and(query_param("count", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [{
                "id": 2996944,
                "name": "Lyon",
                "latitude": 45.75,
                "longitude": 4.85,
                "country": "France"
            }],
            "generationtime_ms": 0.5
        })))
        .expect(1)
        .mount(&server)
        .await;

    let place = geocoder(&server).lookup("Lyon").await.unwrap();

    assert_eq!(
        place,
        Some(Place {
            name: "Lyon".into(),
            latitude: 45.75,
            longitude: 4.85,
            country: Some("France".into()),
        })
    );
}

#[tokio::test]
async fn test_unknown_name_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "generationtime_ms": 0.2 })),
        )
        .mount(&server)
        .await;

    let place = geocoder(&server).lookup("Nowhereville").await.unwrap();
    assert!(place.is_none());
}

#[tokio::test]
async fn test_server_error_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let err = geocoder(&server).lookup("Lyon").await.unwrap_err();
    assert!(err.to_string().contains("502"));
}
