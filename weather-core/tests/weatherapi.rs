//! WeatherAPI.com backend against a mock HTTP server.

use weather_core::{
    WeatherError, WeatherProvider,
    provider::weatherapi::{FORECAST_DAYS, WeatherApiProvider},
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

fn location() -> serde_json::Value {
    serde_json::json!({
        "name": "Ha Noi",
        "region": "",
        "country": "Vietnam",
        "lat": 21.03,
        "lon": 105.85,
        "localtime_epoch": 1_700_000_100
    })
}

fn current_body() -> serde_json::Value {
    serde_json::json!({
        "location": location(),
        "current": {
            "last_updated_epoch": 1_700_000_000,
            "temp_c": 30.0,
            "feelslike_c": 34.0,
            "humidity": 66,
            "wind_kph": 36.0,
            "condition": { "text": "Partly cloudy", "icon": "//cdn.weatherapi.com/116.png", "code": 1003 }
        }
    })
}

fn forecast_body() -> serde_json::Value {
    let day = |epoch: i64, temp: f64, text: &str| {
        serde_json::json!({
            "date": "2023-11-14",
            "date_epoch": epoch,
            "day": {
                "maxtemp_c": temp + 4.0,
                "mintemp_c": temp - 4.0,
                "avgtemp_c": temp,
                "avghumidity": 71.6,
                "maxwind_kph": 18.0,
                "condition": { "text": text, "icon": "//cdn.weatherapi.com/113.png", "code": 1000 }
            }
        })
    };

    serde_json::json!({
        "location": location(),
        "forecast": {
            "forecastday": [
                day(1_699_920_000, 25.0, "Sunny"),
                day(1_700_006_400, 23.0, "Patchy rain possible"),
            ]
        }
    })
}

fn provider(server: &MockServer) -> WeatherApiProvider {
    WeatherApiProvider::with_base_url("TEST_KEY".into(), &server.uri())
}

#[tokio::test]
async fn current_by_city_converts_wind_to_mps() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/current.json"))
        .and(query_param("key", "TEST_KEY"))
        .and(query_param("q", "Ha Noi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
        .mount(&server)
        .await;

    let snapshot = provider(&server).fetch_current_by_city("Ha Noi").await.unwrap();

    assert_eq!(snapshot.location_name, "Ha Noi");
    assert_eq!(snapshot.country.as_deref(), Some("Vietnam"));
    assert_eq!(snapshot.condition, "Partly cloudy");
    assert!((snapshot.wind_speed_mps - 10.0).abs() < 1e-9);
    assert_eq!(snapshot.observation_time.timestamp(), 1_700_000_000);
}

#[tokio::test]
async fn current_by_coords_uses_lat_lon_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/current.json"))
        .and(query_param("q", "21.03,105.85"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
        .expect(1)
        .mount(&server)
        .await;

    let snapshot = provider(&server).fetch_current_by_coords(21.03, 105.85).await.unwrap();
    assert_eq!(snapshot.location_name, "Ha Noi");
}

#[tokio::test]
async fn forecast_returns_one_entry_per_day() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forecast.json"))
        .and(query_param("q", "Ha Noi"))
        .and(query_param("days", FORECAST_DAYS.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
        .mount(&server)
        .await;

    let forecast = provider(&server).fetch_forecast("Ha Noi").await.unwrap();

    assert_eq!(forecast.location_name, "Ha Noi");
    assert_eq!(forecast.len(), 2);
    assert_eq!(forecast.entries[0].condition, "Sunny");
    assert_eq!(forecast.entries[1].temperature_c, 23.0);
    assert_eq!(forecast.entries[0].humidity_pct, 72);
    assert_eq!(forecast.daily().len(), 2);
}

#[tokio::test]
async fn no_matching_location_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/current.json"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": { "code": 1006, "message": "No matching location found." }
        })))
        .mount(&server)
        .await;

    let err = provider(&server).fetch_current_by_city("Nowhere").await.unwrap_err();
    assert!(matches!(err, WeatherError::NotFound(_)));
}

#[tokio::test]
async fn invalid_key_is_service_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forecast.json"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": { "code": 2006, "message": "API key is invalid." }
        })))
        .mount(&server)
        .await;

    let err = provider(&server).fetch_forecast("Ha Noi").await.unwrap_err();
    match err {
        WeatherError::Service(msg) => assert!(msg.contains("401")),
        other => panic!("expected service error, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_fields_are_service_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/current.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "location": location() })),
        )
        .mount(&server)
        .await;

    let err = provider(&server).fetch_current_by_city("Ha Noi").await.unwrap_err();
    assert!(matches!(err, WeatherError::Service(_)));
}
