//! Integration tests for voc-client
//!
//! These tests run the client against an in-process mock of the vendor API.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use reqwest::header::HeaderValue;
use reqwest::Method;
use serde_json::{json, Value};
use voc_client::testing::{wait_for, RecordingSleeper, TestServer};
use voc_client::{
    ClientConfig, RemoteCommand, ServiceState, Vehicle, VocClient, VocError,
};

const VEHICLE_ID: &str = "YV1ABC123";
const EXPECTED_AUTH: &str = "Basic dXNlcjpwYXNz"; // user:pass

// =============================================================================
// Mock Vendor API
// =============================================================================

#[derive(Default)]
struct MockState {
    requests: AtomicUsize,
    submits: AtomicUsize,
    polls: AtomicUsize,
    /// Statuses reported by successive polls; the last one repeats
    statuses: Mutex<VecDeque<String>>,
    failure_reason: Mutex<Option<Value>>,
    submit_delay: Mutex<Duration>,
    submit_http_status: Mutex<Option<StatusCode>>,
    poll_http_status: Mutex<Option<StatusCode>>,
    last_headers: Mutex<Option<HeaderMap>>,
    last_submit_body: Mutex<Option<String>>,
    submitted_commands: Mutex<Vec<String>>,
}

impl MockState {
    fn with_statuses(statuses: &[&str]) -> Arc<Self> {
        let state = Self::default();
        *state.statuses.lock() = statuses.iter().map(|s| s.to_string()).collect();
        Arc::new(state)
    }

    fn next_status(&self) -> String {
        let mut statuses = self.statuses.lock();
        if statuses.len() > 1 {
            statuses.pop_front().unwrap_or_default()
        } else {
            statuses.front().cloned().unwrap_or_else(|| "Successful".into())
        }
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        self.requests.fetch_add(1, Ordering::SeqCst);
        *self.last_headers.lock() = Some(headers.clone());
        headers
            .get("authorization")
            .is_some_and(|v| v == EXPECTED_AUTH)
    }
}

type Shared = Arc<MockState>;

fn mock_router(state: Shared) -> Router {
    let api = Router::new()
        .route("/customeraccounts", get(account))
        .route("/vehicle-account-relations/{relation_id}", get(relation))
        .route("/vehicles/{id}/status", get(vehicle_status))
        .route("/vehicles/{id}/attributes", get(vehicle_attributes))
        .route("/vehicles/{id}/services/{operation_id}", get(poll_operation))
        .route("/vehicles/{id}/updatestatus", post(submit_command))
        .route("/vehicles/{id}/lock", post(submit_command))
        .route("/vehicles/{id}/unlock", post(submit_command))
        .route("/vehicles/{id}/honk_and_blink", post(submit_command))
        .route("/broken", get(broken));

    Router::new()
        .nest("/customerapi/rest/v3.0", api)
        .with_state(state)
}

async fn account(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if !state.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({
        "username": "user",
        "firstName": "Sam",
        "lastName": "Driver",
        "accountId": "acc-1",
        "accountVehicleRelations": [
            "https://vocapi.wirelesscar.net/customerapi/rest/v3.0/vehicle-account-relations/11"
        ]
    }))
    .into_response()
}

async fn relation(
    State(state): State<Shared>,
    Path(relation_id): Path<u64>,
    headers: HeaderMap,
) -> Response {
    if !state.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({
        "vehicleId": VEHICLE_ID,
        "status": "Verified",
        "customerVehicleRelationId": relation_id,
        "username": "user"
    }))
    .into_response()
}

async fn vehicle_status(
    State(state): State<Shared>,
    Path(_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !state.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({
        "carLocked": true,
        "odometer": 123456,
        "fuelAmountLevel": 60,
        "doors": {"tailgateOpen": false, "hoodOpen": false},
        "heater": {"status": "off"}
    }))
    .into_response()
}

async fn vehicle_attributes(
    State(state): State<Shared>,
    Path(_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !state.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({
        "VIN": VEHICLE_ID,
        "registrationNumber": "ABC123",
        "modelYear": 2019,
        "lockSupported": true
    }))
    .into_response()
}

async fn submit_command(
    State(state): State<Shared>,
    Path(id): Path<String>,
    uri: axum::http::Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    if !state.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let n = state.submits.fetch_add(1, Ordering::SeqCst) + 1;
    *state.last_submit_body.lock() = Some(body);
    let command = uri.path().rsplit('/').next().unwrap_or_default().to_string();
    state.submitted_commands.lock().push(command.clone());

    let delay = *state.submit_delay.lock();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    if let Some(status) = *state.submit_http_status.lock() {
        return (status, "submit rejected").into_response();
    }

    Json(json!({
        "status": "Queued",
        "service": command,
        "serviceType": "Dashboard",
        "vehicleId": id,
        "customerServiceId": format!("op-{}", n),
        "failureReason": null
    }))
    .into_response()
}

async fn poll_operation(
    State(state): State<Shared>,
    Path((id, operation_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if !state.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    state.polls.fetch_add(1, Ordering::SeqCst);

    if let Some(status) = *state.poll_http_status.lock() {
        return (status, "poll rejected").into_response();
    }

    let status = state.next_status();
    let failure_reason = if status == "Failed" {
        state.failure_reason.lock().clone()
    } else {
        None
    };

    Json(json!({
        "status": status,
        "statusTimestamp": "2024-01-01T10:00:00+0000",
        "startTime": "2024-01-01T09:59:00+0000",
        "serviceType": "Dashboard",
        "service": "updatestatus",
        "vehicleId": id,
        "customerServiceId": operation_id,
        "failureReason": failure_reason
    }))
    .into_response()
}

async fn broken(State(state): State<Shared>, headers: HeaderMap) -> Response {
    state.authorized(&headers);
    (StatusCode::INTERNAL_SERVER_ERROR, "this is not json").into_response()
}

// =============================================================================
// Helpers
// =============================================================================

struct Harness {
    server: TestServer,
    state: Shared,
    sleeper: Arc<RecordingSleeper>,
    client: VocClient,
}

async fn harness(statuses: &[&str]) -> Harness {
    let state = MockState::with_statuses(statuses);
    let server = TestServer::start(mock_router(state.clone())).await.unwrap();
    let sleeper = Arc::new(RecordingSleeper::new());
    let client = VocClient::with_sleeper(server.config(), sleeper.clone())
        .unwrap()
        .authenticate("user", "pass");
    Harness {
        server,
        state,
        sleeper,
        client,
    }
}

fn vehicle() -> Vehicle {
    Vehicle::new(VEHICLE_ID, 11, "Verified".to_string().into())
}

fn config_for(server: &TestServer, interval_ms: u64, timeout_ms: Option<u64>) -> ClientConfig {
    let mut config = server.config();
    config.polling.interval_ms = interval_ms;
    config.polling.timeout_ms = timeout_ms;
    config
}

// =============================================================================
// Session / Transport
// =============================================================================

#[tokio::test]
async fn test_login_parses_relations() {
    let h = harness(&[]).await;

    let account = h.client.login().await.unwrap();
    assert_eq!(account.username, "user");
    assert_eq!(account.account_vehicle_relations, vec![11]);

    let headers = h.state.last_headers.lock().clone().unwrap();
    assert_eq!(headers["authorization"], EXPECTED_AUTH);
    assert_eq!(headers["x-os-type"], "Android");
    assert_eq!(headers["content-type"], "application/json");
}

#[tokio::test]
async fn test_login_with_wrong_credentials() {
    let h = harness(&[]).await;
    let client = VocClient::new(h.server.config())
        .unwrap()
        .authenticate("user", "wrong");

    let err = client.login().await.unwrap_err();
    match err {
        VocError::HttpError { status, path } => {
            assert_eq!(status, 401);
            assert_eq!(path, "customeraccounts");
        }
        other => panic!("expected HttpError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_send_without_credential_makes_no_request() {
    let h = harness(&[]).await;
    let client = VocClient::new(h.server.config()).unwrap();

    let err = client.login().await.unwrap_err();
    assert!(matches!(err, VocError::Unauthenticated));
    assert_eq!(h.state.requests.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_server_error_maps_to_http_error() {
    let h = harness(&[]).await;

    let err = h.client.session().get("broken").await.unwrap_err();
    match err {
        VocError::HttpError { status, path } => {
            assert_eq!(status, 500);
            assert_eq!(path, "broken");
        }
        other => panic!("expected HttpError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_header_override_wins_and_defaults_remain() {
    let h = harness(&[]).await;

    let mut overrides = HeaderMap::new();
    overrides.insert("x-os-type", HeaderValue::from_static("iOS"));
    h.client
        .session()
        .send(Method::GET, "customeraccounts", None, &overrides)
        .await
        .unwrap();

    let headers = h.state.last_headers.lock().clone().unwrap();
    assert_eq!(headers["x-os-type"], "iOS");
    assert_eq!(headers.get_all("x-os-type").iter().count(), 1);
    assert_eq!(headers["x-device-id"], "Device");
    assert_eq!(headers["x-originator-type"], "App");
    assert_eq!(headers["authorization"], EXPECTED_AUTH);
}

// =============================================================================
// Data Reads
// =============================================================================

#[tokio::test]
async fn test_vehicle_by_relation_loads_info() {
    let h = harness(&[]).await;

    let vehicle = h.client.vehicle_by_relation(11).await.unwrap();
    assert_eq!(vehicle.id, VEHICLE_ID);
    assert_eq!(vehicle.relation_id, 11);
    assert!(vehicle.relation_status.is_verified());

    let status = vehicle.status.unwrap();
    assert_eq!(status.car_locked, Some(true));
    assert!(status.extra.contains_key("heater"));

    let attributes = vehicle.attributes.unwrap();
    assert_eq!(attributes.vin(), Some(VEHICLE_ID));
    assert_eq!(attributes.lock_supported, Some(true));
}

#[tokio::test]
async fn test_vehicles_and_find_vehicle() {
    let h = harness(&[]).await;

    let vehicles = h.client.vehicles().await.unwrap();
    assert_eq!(vehicles.len(), 1);
    assert_eq!(vehicles[0].id, VEHICLE_ID);
    assert!(vehicles[0].status.is_some());
    assert!(vehicles[0].attributes.is_some());

    let found = h.client.find_vehicle(VEHICLE_ID).await.unwrap();
    assert!(found.is_some());
    assert!(h.client.find_vehicle("NOPE").await.unwrap().is_none());
}

// =============================================================================
// Remote Operations
// =============================================================================

#[tokio::test]
async fn test_poll_until_successful() {
    let h = harness(&["Queued", "Started", "Successful"]).await;

    let operation = h.client.update_vehicle_status(&vehicle()).await.unwrap();
    assert_eq!(operation.status, ServiceState::Successful);
    assert_eq!(operation.customer_service_id, "op-1");

    assert_eq!(h.state.submits.load(Ordering::SeqCst), 1);
    assert_eq!(h.state.polls.load(Ordering::SeqCst), 3);
    assert_eq!(
        h.sleeper.delays(),
        vec![Duration::from_secs(5), Duration::from_secs(5)]
    );
    assert_eq!(h.state.last_submit_body.lock().as_deref(), Some("{}"));
}

#[tokio::test]
async fn test_message_delivered_is_terminal_success() {
    let h = harness(&["MessageDelivered"]).await;

    let operation = h.client.update_vehicle_status(&vehicle()).await.unwrap();
    assert_eq!(operation.status, ServiceState::MessageDelivered);
    assert_eq!(h.sleeper.count(), 0);
}

#[tokio::test]
async fn test_failed_operation_carries_reason() {
    let h = harness(&["Failed"]).await;
    *h.state.failure_reason.lock() = Some(json!({"code": "CarOffline"}));

    let err = h.client.update_vehicle_status(&vehicle()).await.unwrap_err();
    match err {
        VocError::OperationFailed {
            operation_id,
            reason,
        } => {
            assert_eq!(operation_id, "op-1");
            assert_eq!(reason, Some(json!({"code": "CarOffline"})));
        }
        other => panic!("expected OperationFailed, got {:?}", other),
    }
    assert_eq!(h.state.polls.load(Ordering::SeqCst), 1);
    assert_eq!(h.sleeper.count(), 0);
}

#[tokio::test]
async fn test_unknown_status_is_unexpected_state() {
    let h = harness(&["SomethingNew"]).await;

    let err = h.client.update_vehicle_status(&vehicle()).await.unwrap_err();
    match err {
        VocError::UnexpectedState {
            operation_id,
            state,
        } => {
            assert_eq!(operation_id, "op-1");
            assert_eq!(state, "SomethingNew");
        }
        other => panic!("expected UnexpectedState, got {:?}", other),
    }
    assert_eq!(h.state.polls.load(Ordering::SeqCst), 1);
    assert_eq!(h.sleeper.count(), 0);
}

#[tokio::test]
async fn test_concurrent_submits_share_one_command() {
    let h = harness(&["Queued", "Successful"]).await;
    *h.state.submit_delay.lock() = Duration::from_millis(100);
    let vehicle = vehicle();

    let (first, second) = tokio::join!(
        h.client.update_vehicle_status(&vehicle),
        h.client.update_vehicle_status(&vehicle)
    );

    let first = first.unwrap();
    let second = second.unwrap();
    assert_eq!(first.customer_service_id, second.customer_service_id);
    assert_eq!(h.state.submits.load(Ordering::SeqCst), 1);
    assert!(!h.client.orchestrator().is_pending(VEHICLE_ID));
}

#[tokio::test]
async fn test_concurrent_submits_share_failure() {
    let h = harness(&["Failed"]).await;
    *h.state.submit_delay.lock() = Duration::from_millis(100);
    let vehicle = vehicle();

    let (first, second) = tokio::join!(
        h.client.update_vehicle_status(&vehicle),
        h.client.update_vehicle_status(&vehicle)
    );

    for result in [first, second] {
        match result.unwrap_err() {
            VocError::OperationFailed { operation_id, .. } => assert_eq!(operation_id, "op-1"),
            other => panic!("expected OperationFailed, got {:?}", other),
        }
    }
    assert_eq!(h.state.submits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_different_command_rejected_while_busy() {
    let h = harness(&["Successful"]).await;
    *h.state.submit_delay.lock() = Duration::from_millis(100);
    let vehicle = vehicle();

    let (lock, unlock) = tokio::join!(
        h.client.submit(&vehicle, RemoteCommand::Lock),
        h.client.submit(&vehicle, RemoteCommand::Unlock)
    );

    assert_eq!(lock.unwrap().customer_service_id, "op-1");
    match unlock.unwrap_err() {
        VocError::Busy {
            vehicle_id,
            running,
        } => {
            assert_eq!(vehicle_id, VEHICLE_ID);
            assert_eq!(running, RemoteCommand::Lock);
        }
        other => panic!("Expected Busy, got {:?}", other),
    }
    assert_eq!(*h.state.submitted_commands.lock(), vec!["lock"]);

    // Once the lock settles the vehicle accepts the next command
    let unlocked = h
        .client
        .submit(&vehicle, RemoteCommand::Unlock)
        .await
        .unwrap();
    assert_eq!(unlocked.customer_service_id, "op-2");
    assert_eq!(*h.state.submitted_commands.lock(), vec!["lock", "unlock"]);
}

#[tokio::test]
async fn test_guard_cleared_after_success_and_failure() {
    let h = harness(&["Successful"]).await;
    let vehicle = vehicle();

    h.client.update_vehicle_status(&vehicle).await.unwrap();
    let second = h.client.update_vehicle_status(&vehicle).await.unwrap();
    assert_eq!(second.customer_service_id, "op-2");
    assert_eq!(h.state.submits.load(Ordering::SeqCst), 2);

    *h.state.statuses.lock() = VecDeque::from(vec!["Failed".to_string()]);
    assert!(h.client.update_vehicle_status(&vehicle).await.is_err());

    *h.state.statuses.lock() = VecDeque::from(vec!["Successful".to_string()]);
    let fourth = h.client.update_vehicle_status(&vehicle).await.unwrap();
    assert_eq!(fourth.customer_service_id, "op-4");
    assert_eq!(h.state.submits.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_submit_transport_failure() {
    let h = harness(&["Successful"]).await;
    *h.state.submit_http_status.lock() = Some(StatusCode::SERVICE_UNAVAILABLE);

    let err = h.client.update_vehicle_status(&vehicle()).await.unwrap_err();
    match err {
        VocError::HttpError { status, path } => {
            assert_eq!(status, 503);
            assert_eq!(path, format!("vehicles/{}/updatestatus", VEHICLE_ID));
        }
        other => panic!("expected HttpError, got {:?}", other),
    }
    assert_eq!(h.state.polls.load(Ordering::SeqCst), 0);
    assert!(!h.client.orchestrator().is_pending(VEHICLE_ID));
}

#[tokio::test]
async fn test_poll_transport_failure_is_fatal() {
    let h = harness(&["Queued"]).await;
    *h.state.poll_http_status.lock() = Some(StatusCode::INTERNAL_SERVER_ERROR);

    let err = h.client.update_vehicle_status(&vehicle()).await.unwrap_err();
    match err {
        VocError::HttpError { status, path } => {
            assert_eq!(status, 500);
            assert_eq!(path, format!("vehicles/{}/services/op-1", VEHICLE_ID));
        }
        other => panic!("expected HttpError, got {:?}", other),
    }
    assert_eq!(h.state.polls.load(Ordering::SeqCst), 1);
    assert_eq!(h.sleeper.count(), 0);
}

#[tokio::test]
async fn test_operation_timeout() {
    let h = harness(&["Queued"]).await;
    let client = VocClient::new(config_for(&h.server, 10, Some(150)))
        .unwrap()
        .authenticate("user", "pass");

    let err = client.update_vehicle_status(&vehicle()).await.unwrap_err();
    match err {
        VocError::Timeout { operation_id } => assert_eq!(operation_id, "op-1"),
        other => panic!("expected Timeout, got {:?}", other),
    }
    assert!(h.state.polls.load(Ordering::SeqCst) >= 1);
    assert!(!client.orchestrator().is_pending(VEHICLE_ID));
}

#[tokio::test]
async fn test_cancel_reaches_every_waiter() {
    let h = harness(&["Queued"]).await;
    let client = VocClient::new(config_for(&h.server, 20, None))
        .unwrap()
        .authenticate("user", "pass");
    let vehicle = vehicle();

    let first = tokio::spawn({
        let client = client.clone();
        let vehicle = vehicle.clone();
        async move { client.update_vehicle_status(&vehicle).await }
    });
    let second = tokio::spawn({
        let client = client.clone();
        let vehicle = vehicle.clone();
        async move { client.update_vehicle_status(&vehicle).await }
    });

    let state = h.state.clone();
    assert!(
        wait_for(
            || {
                let state = state.clone();
                async move { state.polls.load(Ordering::SeqCst) >= 2 }
            },
            Duration::from_secs(5)
        )
        .await
    );
    assert!(client.orchestrator().is_pending(VEHICLE_ID));

    client.orchestrator().cancel_all();

    for handle in [first, second] {
        let result = handle.await.unwrap();
        assert!(matches!(result, Err(VocError::Cancelled)));
    }
    assert_eq!(h.state.submits.load(Ordering::SeqCst), 1);
    assert!(!client.orchestrator().is_pending(VEHICLE_ID));

    // Later submissions are not born cancelled
    *h.state.statuses.lock() = VecDeque::from(vec!["Successful".to_string()]);
    let next = client.update_vehicle_status(&vehicle).await.unwrap();
    assert_eq!(next.customer_service_id, "op-2");
}

#[tokio::test]
async fn test_cancel_single_vehicle() {
    let h = harness(&["Queued"]).await;
    let client = VocClient::new(config_for(&h.server, 20, None))
        .unwrap()
        .authenticate("user", "pass");
    let vehicle = vehicle();

    let waiter = tokio::spawn({
        let client = client.clone();
        async move { client.update_vehicle_status(&vehicle).await }
    });

    let orchestrator = client.orchestrator().clone();
    assert!(
        wait_for(
            || {
                let orchestrator = orchestrator.clone();
                async move { orchestrator.is_pending(VEHICLE_ID) }
            },
            Duration::from_secs(5)
        )
        .await
    );

    assert!(client.orchestrator().cancel(VEHICLE_ID));
    assert!(matches!(waiter.await.unwrap(), Err(VocError::Cancelled)));
    assert!(!client.orchestrator().cancel(VEHICLE_ID));
}
