//! IP geolocation against a mock HTTP server.

use std::time::Duration;

use weather_core::{Coordinates, GeolocationError, GeolocationSource, IpGeolocation};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

fn source_for(server: &MockServer, timeout: Duration) -> IpGeolocation {
    IpGeolocation::new(&format!("{}/json", server.uri()), timeout).expect("client")
}

#[tokio::test]
async fn successful_lookup_yields_coordinates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "success",
            "city": "Hanoi",
            "lat": 21.0292,
            "lon": 105.8526
        })))
        .mount(&server)
        .await;

    let source = source_for(&server, Duration::from_secs(5));
    let position = source.current_position().await.unwrap();
    assert_eq!(position, Coordinates::new(21.0292, 105.8526));
}

#[tokio::test]
async fn failed_lookup_is_position_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "fail",
            "message": "private range"
        })))
        .mount(&server)
        .await;

    let source = source_for(&server, Duration::from_secs(5));
    let err = source.current_position().await.unwrap_err();
    assert_eq!(err, GeolocationError::PositionUnavailable);
}

#[tokio::test]
async fn forbidden_is_permission_denied() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let source = source_for(&server, Duration::from_secs(5));
    let err = source.current_position().await.unwrap_err();
    assert_eq!(err, GeolocationError::PermissionDenied);
    assert_eq!(err.message(), "Permission denied");
}

#[tokio::test]
async fn slow_lookup_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(2))
                .set_body_json(serde_json::json!({ "status": "success", "lat": 1.0, "lon": 2.0 })),
        )
        .mount(&server)
        .await;

    let source = source_for(&server, Duration::from_millis(100));
    let err = source.current_position().await.unwrap_err();
    assert_eq!(err, GeolocationError::Timeout);
}

#[tokio::test]
async fn rate_limited_is_other_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let source = source_for(&server, Duration::from_secs(5));
    let err = source.current_position().await.unwrap_err();
    assert_eq!(err, GeolocationError::Other(429));
    assert_eq!(err.message(), "Unable to retrieve your location");
}
