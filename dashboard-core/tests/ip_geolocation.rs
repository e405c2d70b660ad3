//! IpGeolocation failure classification against a mock lookup service.

use std::time::Duration;

use dashboard_core::{GeolocationError, GeolocationProvider, IpGeolocation, PositionOptions};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn locate(
    server: &MockServer,
    options: PositionOptions,
) -> Result<(f64, f64), GeolocationError> {
    let geo = IpGeolocation::new(&format!("{}/json", server.uri())).expect("valid url");
    geo.current_position(&options)
        .await
        .map(|p| (p.coordinates.latitude, p.coordinates.longitude))
}

async fn respond(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("GET")).and(path("/json")).respond_with(template).mount(server).await;
}

#[tokio::test]
async fn success_yields_coordinates() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/json"))
        .and(header("cache-control", "no-cache"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "success",
            "lat": 19.076,
            "lon": 72.8777,
            "city": "Mumbai"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let at = locate(&server, PositionOptions::default()).await.unwrap();
    assert_eq!(at, (19.076, 72.8777));
}

#[tokio::test]
async fn failed_lookup_is_position_unavailable() {
    let server = MockServer::start().await;
    respond(
        &server,
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "fail",
            "message": "private range"
        })),
    )
    .await;

    let err = locate(&server, PositionOptions::default()).await.unwrap_err();
    assert_eq!(err, GeolocationError::PositionUnavailable);
}

#[tokio::test]
async fn forbidden_is_permission_denied() {
    let server = MockServer::start().await;
    respond(&server, ResponseTemplate::new(403)).await;

    let err = locate(&server, PositionOptions::default()).await.unwrap_err();
    assert_eq!(err, GeolocationError::PermissionDenied);
}

#[tokio::test]
async fn server_error_is_unclassified() {
    let server = MockServer::start().await;
    respond(&server, ResponseTemplate::new(503)).await;

    let err = locate(&server, PositionOptions::default()).await.unwrap_err();
    assert!(matches!(err, GeolocationError::Other(_)));
    assert_eq!(err.code(), None);
}

#[tokio::test]
async fn slow_lookup_times_out() {
    let server = MockServer::start().await;
    respond(
        &server,
        ResponseTemplate::new(200)
            .set_body_json(serde_json::json!({"status": "success", "lat": 1.0, "lon": 2.0}))
            .set_delay(Duration::from_secs(2)),
    )
    .await;

    let options = PositionOptions { timeout: Duration::from_millis(100), ..Default::default() };
    let err = locate(&server, options).await.unwrap_err();

    assert_eq!(err, GeolocationError::Timeout);
}

#[tokio::test]
async fn unreachable_service_is_position_unavailable() {
    let server = MockServer::start().await;
    let geo = IpGeolocation::new(&format!("{}/json", server.uri())).expect("valid url");
    drop(server);

    let err = geo.current_position(&PositionOptions::default()).await.unwrap_err();
    assert_eq!(err, GeolocationError::PositionUnavailable);
}
