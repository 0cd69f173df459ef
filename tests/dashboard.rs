#![cfg(feature = "inmem-store")]

use actix_web::{test, App};
use glitchdesk::notify::LogNotifier;
use glitchdesk::repo::inmem::InMemRepo;
use glitchdesk::routes::AppState;
use glitchdesk::storage::{MediaStore, MediaStoreError};
use glitchdesk::config;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct MockMediaStore {
    inner: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait::async_trait]
impl MediaStore for MockMediaStore {
    async fn upload(&self, hash: &str, bytes: &[u8]) -> Result<String, MediaStoreError> {
        let mut map = self.inner.lock().unwrap();
        map.insert(hash.to_string(), bytes.to_vec());
        Ok(format!("https://media.test/{hash}"))
    }
    async fn delete(&self, url: &str) -> Result<(), MediaStoreError> {
        let hash = url.rsplit('/').next().unwrap_or_default().to_string();
        self.inner.lock().unwrap().remove(&hash);
        Ok(())
    }
}

fn setup_env() {
    let tmp = tempfile::tempdir().unwrap();
    std::env::set_var("GLITCHDESK_DATA_DIR", tmp.path().to_str().unwrap());
}

macro_rules! make_app {
    () => {
        test::init_service(
            App::new()
                .app_data(actix_web::web::Data::new(AppState {
                    repo: Arc::new(InMemRepo::new()),
                    media_store: Arc::new(MockMediaStore::default()),
                    notifier: Arc::new(LogNotifier),
                }))
                .configure(config),
        )
        .await
    };
}

// Submits a complete report through the intake endpoint and returns its uid
macro_rules! submit_report {
    ($app:expr) => {{
        let boundary = "DASHBOUNDARY";
        let mut body = String::new();
        for (name, value) in [
            ("email", "user@example.com"),
            ("username", "user1"),
            ("deviceType", "desktop"),
            ("browserInfo", "Firefox 128 on Linux"),
            ("glitchType", "visual"),
            ("glitchLocation", "settings page"),
            ("glitchDescription", "save button overlaps the footer"),
            ("stepsToReproduce", "open settings, scroll down"),
            ("urgency", "low"),
        ] {
            body.push_str(&format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        body.push_str(&format!("--{boundary}--\r\n"));
        let req = test::TestRequest::post()
            .uri("/report-glitch")
            .insert_header((
                "Content-Type",
                format!("multipart/form-data; boundary={boundary}"),
            ))
            .set_payload(body)
            .to_request();
        let resp = test::call_service($app, req).await;
        assert_eq!(resp.status(), 200);
        let v: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
        v["report"]["uid"].as_str().unwrap().to_string()
    }};
}

macro_rules! report_uids {
    ($app:expr) => {{
        let req = test::TestRequest::get().uri("/reports").to_request();
        let resp = test::call_service($app, req).await;
        assert!(resp.status().is_success());
        let v: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
        v["reports"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["uid"].as_str().unwrap().to_string())
            .collect::<Vec<_>>()
    }};
}

#[actix_web::test]
#[serial_test::serial]
async fn test_delete_report_lifecycle() {
    setup_env();
    let app = make_app!();
    let uid = submit_report!(&app);
    assert_eq!(report_uids!(&app), vec![uid.clone()]);

    // delete
    let req = test::TestRequest::delete()
        .uri("/reports/delete")
        .set_json(&json!({ "uid": uid }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let v: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(v["message"], "Report deleted successfully.");

    // gone from the list
    assert!(report_uids!(&app).is_empty());

    // second delete of the same uid reports not-found
    let req = test::TestRequest::delete()
        .uri("/reports/delete")
        .set_json(&json!({ "uid": uid }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 500);
    let v: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(v["error"], "No reports found by the given UID");
}

#[actix_web::test]
#[serial_test::serial]
async fn test_delete_report_unknown_uid() {
    setup_env();
    let app = make_app!();
    let uid = submit_report!(&app);

    let req = test::TestRequest::delete()
        .uri("/reports/delete")
        .set_json(&json!({ "uid": "unknown-id" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 500);
    let v: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(v["error"], "No reports found by the given UID");

    // the stored report is untouched
    assert_eq!(report_uids!(&app), vec![uid]);
}

#[actix_web::test]
#[serial_test::serial]
async fn test_delete_report_malformed_body() {
    setup_env();
    let app = make_app!();

    let req = test::TestRequest::delete()
        .uri("/reports/delete")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
#[serial_test::serial]
async fn test_resolve_report_lifecycle() {
    setup_env();
    let app = make_app!();
    let uid = submit_report!(&app);

    let req = test::TestRequest::post()
        .uri("/reports/resolve")
        .set_json(&json!({ "uid": uid }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let v: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(v["message"], "Report resolved successfully.");

    // resolved reports leave the pending list
    assert!(report_uids!(&app).is_empty());

    // resolving again reports not-found
    let req = test::TestRequest::post()
        .uri("/reports/resolve")
        .set_json(&json!({ "uid": uid }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 500);
    let v: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(v["error"], "No reports found by the given UID");
}

#[actix_web::test]
#[serial_test::serial]
async fn test_delete_inquiry_lifecycle() {
    setup_env();
    let app = make_app!();

    // create an inquiry and fetch its uid from the list
    let req = test::TestRequest::post()
        .uri("/contactus/new")
        .set_json(&json!({
            "name": "Sam",
            "email": "sam@example.com",
            "contact": "+1 555 0100",
            "type": "general",
            "subject": "Hello",
            "message": "Just checking in."
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let req = test::TestRequest::get().uri("/contactus").to_request();
    let resp = test::call_service(&app, req).await;
    let v: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    let uid = v["inquiries"][0]["uid"].as_str().unwrap().to_string();

    let req = test::TestRequest::delete()
        .uri("/contactus/delete")
        .set_json(&json!({ "uid": uid }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let v: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(v["message"], "Inquiry deleted successfully.");

    let req = test::TestRequest::get().uri("/contactus").to_request();
    let resp = test::call_service(&app, req).await;
    let v: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(v["message"], "0 inquiries found.");

    // retry reports not-found with the inquiry wording
    let req = test::TestRequest::delete()
        .uri("/contactus/delete")
        .set_json(&json!({ "uid": uid }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 500);
    let v: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(v["error"], "No inquiries found by the given UID");
}
