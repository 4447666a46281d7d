//! Integration tests for fpb-relay API endpoints
//!
//! Tests cover:
//! - Device report ingestion (status slot, attendance ledger, diagnostic inbox)
//! - Dashboard queries (status, attendance, clear)
//! - Relayed commands (enroll, delete, list refresh) against a scripted device
//! - Failure responses (missing id, invalid action, unreachable device, read-only storage)
//! - Health and build info endpoints

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use fpb_common::store::{
    AttendanceEntry, AttendanceLedger, MemoryInbox, MemoryLedger, MemoryStatusStore, StatusStore,
};
use fpb_common::{DeviceCommand, Error, Result};
use fpb_relay::{build_router, AppState, CommandDispatcher, DeviceLink};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tower::util::ServiceExt; // for `oneshot` method

/// Scripted device: records commands, replies or fails on demand
struct FakeDevice {
    sent: Mutex<Vec<DeviceCommand>>,
    online: bool,
}

impl FakeDevice {
    fn new(online: bool) -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            online,
        })
    }

    fn sent(&self) -> Vec<DeviceCommand> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeviceLink for FakeDevice {
    fn base_url(&self) -> &str {
        "http://device.test"
    }

    async fn send(&self, command: &DeviceCommand) -> Result<String> {
        self.sent.lock().unwrap().push(*command);
        if self.online {
            Ok(format!("Command received: {}", command.path()))
        } else {
            Err(Error::DeviceUnreachable {
                url: self.base_url().to_string(),
                detail: "connection refused".to_string(),
            })
        }
    }
}

/// Test fixture holding the fakes behind the router
struct Harness {
    status: Arc<MemoryStatusStore>,
    ledger: Arc<MemoryLedger>,
    inbox: Arc<MemoryInbox>,
    device: Arc<FakeDevice>,
}

impl Harness {
    fn new() -> Self {
        Self::with_device(FakeDevice::new(true))
    }

    fn with_device(device: Arc<FakeDevice>) -> Self {
        Self {
            status: Arc::new(MemoryStatusStore::new()),
            ledger: Arc::new(MemoryLedger::new()),
            inbox: Arc::new(MemoryInbox::new()),
            device,
        }
    }

    fn app(&self) -> axum::Router {
        let state = AppState::new(
            self.status.clone(),
            self.ledger.clone(),
            self.inbox.clone(),
            Arc::new(CommandDispatcher::new(self.device.clone())),
        );
        build_router(state)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        send(self.app(), request).await
    }

    async fn post_form(&self, uri: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap();
        send(self.app(), request).await
    }
}

/// Test helper: Run one request and extract the JSON body
async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");
    let json = serde_json::from_slice(&bytes).expect("Should parse JSON");
    (status, json)
}

// =============================================================================
// Ingestion
// =============================================================================

#[tokio::test]
async fn test_status_report_updates_slot() {
    let h = Harness::new();

    let (status, body) = h
        .post_form("/index.php", "arduino_response=arduino_status%3AReady")
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Status updated");
    assert_eq!(body["outcome"], "status_update");
    assert_eq!(h.status.read().await.unwrap(), "Ready");
}

#[tokio::test]
async fn test_result_reports_store_full_text() {
    let h = Harness::new();
    let cases = [
        ("enrollment_success%3AID+7", "enrollment_success:ID 7", "Enrollment result received"),
        ("deleted_failed%3A3", "deleted_failed:3", "Deletion result received"),
        (
            "arduino_error%3AList_Request_Failed%3Abusy",
            "arduino_error:List_Request_Failed:busy",
            "List command processed confirmation received",
        ),
        ("arduino_error%3ASensor", "arduino_error:Sensor", "Arduino error received"),
    ];

    for (encoded, stored, message) in cases {
        let (status, body) = h
            .post_form("/", &format!("arduino_response={}", encoded))
            .await;
        assert_eq!(status, StatusCode::OK, "{}", stored);
        assert_eq!(body["message"], message);
        assert_eq!(h.status.read().await.unwrap(), stored);
    }
}

#[tokio::test]
async fn test_report_is_trimmed_before_classification() {
    let h = Harness::new();

    let (status, _) = h
        .post_form("/", "arduino_response=++arduino_status%3AIdle%0A")
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.status.read().await.unwrap(), "Idle");
}

#[tokio::test]
async fn test_unrecognized_report_is_rejected_and_logged() {
    let h = Harness::new();
    h.status.write("Ready").await.unwrap();

    let (status, body) = h.post_form("/", "arduino_response=hello+world").await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Unrecognized arduino_response data received");
    assert_eq!(h.status.read().await.unwrap(), "Ready");

    let lines = h.inbox.lines();
    assert!(lines
        .iter()
        .any(|l| l.ends_with("Unrecognized arduino_response: hello world")));
}

#[tokio::test]
async fn test_attendance_event_is_appended() {
    let h = Harness::new();

    let (status, body) = h
        .post_form("/index.php", "id=7&timestamp=2024-01-01+10%3A00%3A00")
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Attendance logged");
    assert_eq!(
        h.ledger.list().await.unwrap(),
        vec![AttendanceEntry::new("2024-01-01 10:00:00", "7").unwrap()]
    );
}

#[tokio::test]
async fn test_attendance_id_with_comma_is_rejected() {
    let h = Harness::new();

    let (status, body) = h
        .post_form("/", "id=8%2Cextra&timestamp=2024-01-01+10%3A00%3A00")
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(
        body["message"],
        "Failed to log attendance: id must not contain commas or line breaks"
    );
    assert!(h.ledger.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_report_field_takes_precedence_over_attendance() {
    let h = Harness::new();

    h.post_form("/", "arduino_response=arduino_status%3ABusy&id=7&timestamp=t")
        .await;

    assert_eq!(h.status.read().await.unwrap(), "Busy");
    assert!(h.ledger.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_body_without_known_fields() {
    let h = Harness::new();

    let (status, body) = h.post_form("/", "id=7").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "No recognized data received from device");
    assert!(h.ledger.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_every_body_is_captured_in_inbox() {
    let h = Harness::new();

    h.post_form("/", "arduino_response=arduino_status%3AReady").await;
    h.post_form("/", "id=1&timestamp=t").await;
    h.post_form("/", "junk").await;

    let received: Vec<String> = h
        .inbox
        .lines()
        .into_iter()
        .filter(|l| l.contains(" - Received: "))
        .collect();
    assert_eq!(received.len(), 3);
    assert!(received[0].contains("Parsed: {arduino_response=arduino_status:Ready}"));
    assert!(received[2].contains("Received: junk"));
}

#[tokio::test]
async fn test_read_only_ledger_reports_not_writable() {
    let h = Harness::new();
    h.ledger.set_writable(false);

    let (status, body) = h.post_form("/", "id=7&timestamp=t").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(
        body["message"],
        "Failed to log attendance: File not writable. Check permissions."
    );
    assert!(h
        .inbox
        .lines()
        .iter()
        .any(|l| l.contains("Failed to log attendance: Not writable")));
}

#[tokio::test]
async fn test_read_only_status_keeps_last_value() {
    let h = Harness::new();
    h.status.write("Ready").await.unwrap();
    h.status.set_writable(false);

    let (status, body) = h
        .post_form("/", "arduino_response=arduino_status%3ABusy")
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);

    let (_, body) = h.get("/?action=get_status").await;
    assert_eq!(body["status"], "Ready");
}

// =============================================================================
// Local queries
// =============================================================================

#[tokio::test]
async fn test_status_before_any_report() {
    let h = Harness::new();

    let (status, body) = h.get("/?action=get_status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "No status received yet.");
}

#[tokio::test]
async fn test_status_is_trimmed() {
    let h = Harness::new();
    h.status.write("  Ready\n").await.unwrap();

    let (_, body) = h.get("/index.php?action=get_status").await;
    assert_eq!(body["status"], "Ready");
}

#[tokio::test]
async fn test_attendance_listing_in_arrival_order() {
    let h = Harness::new();
    h.post_form("/", "id=7&timestamp=2024-01-02+08%3A00%3A00").await;
    h.post_form("/", "id=3&timestamp=2024-01-01+08%3A00%3A00").await;

    let (status, body) = h.get("/?action=get_attendance").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["attendance"],
        serde_json::json!([["2024-01-02 08:00:00", "7"], ["2024-01-01 08:00:00", "3"]])
    );
}

#[tokio::test]
async fn test_clear_attendance_twice() {
    let h = Harness::new();

    let (_, body) = h.get("/?action=clear_attendance").await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Attendance log file does not exist, nothing to clear.");

    h.post_form("/", "id=7&timestamp=t").await;

    let (_, first) = h.get("/?action=clear_attendance").await;
    let (_, second) = h.get("/?action=clear_attendance").await;
    assert_eq!(first["success"], true);
    assert_eq!(first["message"], "Attendance log cleared.");
    assert_eq!(second["success"], true);

    let (_, body) = h.get("/?action=get_attendance").await;
    assert_eq!(body["attendance"], serde_json::json!([]));
}

#[tokio::test]
async fn test_clear_on_read_only_ledger_fails() {
    let h = Harness::new();
    h.post_form("/", "id=7&timestamp=t").await;
    h.ledger.set_writable(false);

    let (status, body) = h.get("/?action=clear_attendance").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Failed to clear attendance log"));
    assert_eq!(h.ledger.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_local_queries_never_contact_device() {
    let h = Harness::new();

    h.get("/?action=get_status").await;
    h.get("/?action=get_attendance").await;
    h.get("/?action=clear_attendance").await;

    assert!(h.device.sent().is_empty());
}

#[tokio::test]
async fn test_invalid_or_missing_action() {
    let h = Harness::new();

    for uri in ["/?action=reboot", "/", "/?action="] {
        let (status, body) = h.get(uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Invalid action");
    }
}

#[tokio::test]
async fn test_repeated_query_keys_take_the_last_value() {
    let h = Harness::new();

    let (status, body) = h.get("/?action=get_status&action=get_status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "No status received yet.");

    let (status, body) = h.get("/?action=enroll&id=7&id=8").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["esp_response"], "Command received: enroll?id=8");

    let (status, body) = h.get("/?action=get_status&action=reboot").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Invalid action");
}

// =============================================================================
// Relayed commands
// =============================================================================

#[tokio::test]
async fn test_enroll_relays_device_reply() {
    let h = Harness::new();

    let (status, body) = h.get("/?action=enroll&id=7").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Command sent to device: http://device.test/enroll?id=7");
    assert_eq!(body["esp_response"], "Command received: enroll?id=7");
}

#[tokio::test]
async fn test_delete_relays_device_reply() {
    let h = Harness::new();

    let (status, body) = h.get("/?action=delete&id=12").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["esp_response"], "Command received: delete?id=12");
}

#[tokio::test]
async fn test_enroll_without_id_does_not_contact_device() {
    let h = Harness::new();

    let (status, body) = h.get("/?action=enroll").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "ID is required for enrollment");
    assert!(h.device.sent().is_empty());
}

#[tokio::test]
async fn test_out_of_range_id_does_not_contact_device() {
    let h = Harness::new();

    let (status, body) = h.get("/?action=delete&id=300").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "ID must be between 1 and 254");
    assert!(h.device.sent().is_empty());
}

#[tokio::test]
async fn test_unreachable_device() {
    let h = Harness::with_device(FakeDevice::new(false));

    let (status, body) = h.get("/?action=enroll&id=7").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);
    assert_eq!(
        body["message"],
        "Failed to send command to device. Is it online and reachable at http://device.test?"
    );
    assert_eq!(body["error_detail"], "connection refused");
    assert_eq!(h.device.sent().len(), 1);
}

#[tokio::test]
async fn test_list_refresh_succeeds_even_when_device_is_silent() {
    let h = Harness::with_device(FakeDevice::new(false));

    let (status, body) = h.get("/?action=get_list").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "List refresh command sent to device.");
    assert!(body["esp_trigger_response"].is_null());
    assert_eq!(h.device.sent(), vec![DeviceCommand::RefreshList]);
}

// =============================================================================
// Health and build info
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let h = Harness::new();

    let (status, body) = h.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "fpb-relay");
    assert!(body["version"].is_string());
    assert_eq!(body["device_url"], "http://device.test");
    // Reporting the device URL never contacts it
    assert!(h.device.sent().is_empty());
}

#[tokio::test]
async fn test_build_info_endpoint() {
    let h = Harness::new();

    let (status, body) = h.get("/api/buildinfo").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["git_hash"].is_string());
    assert!(body["build_timestamp"].is_string());
    assert!(body["build_target"].is_string());
}
