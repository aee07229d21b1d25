use axum::http::StatusCode;
use crm_core::actions;
use crm_core::clock::FixedClock;
use crm_core::config::Config;
use crm_core::contact::Contact;
use crm_core::deal::Deal;
use crm_core::sequence::SequenceStep;
use crm_core::store::YamlStore;
use crm_core::types::{RecordId, StepType};
use crm_server::state::AppState;
use http_body_util::BodyExt;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const NOW: &str = "2025-06-10T09:30:00-04:00";

fn app(dir: &TempDir) -> axum::Router {
    let clock = FixedClock::parse(NOW).unwrap();
    crm_server::router_with_state(
        AppState::new(dir.path().to_path_buf()).with_clock(Arc::new(clock)),
    )
}

struct Seeded {
    contact: RecordId,
    sequence: RecordId,
}

/// Initialize `.crm/` for "ana" with one contact and an email/call sequence.
fn init_project(dir: &TempDir) -> Seeded {
    actions::init(dir.path(), "ana").unwrap();
    let mut store = YamlStore::open(dir.path()).unwrap();
    let mut contact = Contact::new("ana", "Lin", "Park");
    contact.email = Some("lin@example.com".into());
    let contact = actions::create_contact(&mut store, contact).unwrap();
    let seq = actions::create_sequence(&mut store, "ana", "Cold outbound").unwrap();
    let mut email = SequenceStep::new(seq.id, 1, StepType::Email, 0);
    email.subject = "Intro".into();
    email.message = "Hi {{firstName}}".into();
    actions::add_step(&mut store, "ana", email).unwrap();
    actions::add_step(&mut store, "ana", SequenceStep::new(seq.id, 2, StepType::Call, 3)).unwrap();
    Seeded {
        contact: contact.id,
        sequence: seq.id,
    }
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn post_json(
    app: axum::Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn post(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    post_json(app, uri, serde_json::json!({})).await
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn uninitialized_root_is_bad_request() {
    let dir = TempDir::new().unwrap();
    let (status, body) = get(app(&dir), "/api/due").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("crm init"));
}

#[tokio::test]
async fn enroll_then_work_the_queue() {
    let dir = TempDir::new().unwrap();
    let seeded = init_project(&dir);

    let (status, body) = post_json(
        app(&dir),
        "/api/enrollments",
        serde_json::json!({ "contact_id": seeded.contact, "sequence_id": seeded.sequence }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Active");
    assert_eq!(body["current_step_number"], 1);
    let id = body["id"].as_u64().unwrap();

    let (status, due) = get(app(&dir), "/api/due").await;
    assert_eq!(status, StatusCode::OK);
    let rows = due.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["enrollment_id"], id);
    assert_eq!(rows[0]["sequence_name"], "Cold outbound");
    assert_eq!(rows[0]["action"], "send email");
    assert_eq!(rows[0]["message"], "Hi Lin");
    assert_eq!(rows[0]["contact_name"], "Lin Park");

    let (status, done) = post(app(&dir), &format!("/api/enrollments/{id}/complete")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["finished"], false);
    assert_eq!(done["enrollment"]["current_step_number"], 2);
    assert_eq!(done["activity"]["type"], "Sequence: email");
    assert_eq!(done["activity"]["description"], "Intro");

    // Step 2 waits three days.
    let (_, due) = get(app(&dir), "/api/due").await;
    assert!(due.as_array().unwrap().is_empty());

    let (_, recent) = get(app(&dir), "/api/activities/recent").await;
    assert_eq!(recent.as_array().unwrap().len(), 1);

    let (status, list) = get(app(&dir), "/api/enrollments").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list[0]["progress"]["completed"], 1);
    assert_eq!(list[0]["progress"]["total"], 2);
}

#[tokio::test]
async fn second_enrollment_conflicts() {
    let dir = TempDir::new().unwrap();
    let seeded = init_project(&dir);
    let body = serde_json::json!({ "contact_id": seeded.contact, "sequence_id": seeded.sequence });

    let (status, _) = post_json(app(&dir), "/api/enrollments", body.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, err) = post_json(app(&dir), "/api/enrollments", body).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(err["error"].as_str().unwrap().contains("already active"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_assigns_keep_every_enrollment() {
    let dir = TempDir::new().unwrap();
    let seeded = init_project(&dir);
    let mut store = YamlStore::open(dir.path()).unwrap();
    let mut contacts = vec![seeded.contact];
    for i in 0..7 {
        let c = actions::create_contact(&mut store, Contact::new("ana", "Lead", &i.to_string()))
            .unwrap();
        contacts.push(c.id);
    }

    let router = app(&dir);
    let mut set = tokio::task::JoinSet::new();
    for contact in contacts.iter().copied() {
        let body = serde_json::json!({ "contact_id": contact, "sequence_id": seeded.sequence });
        set.spawn(post_json(router.clone(), "/api/enrollments", body));
    }
    let mut ids = Vec::new();
    while let Some(res) = set.join_next().await {
        let (status, body) = res.unwrap();
        assert_eq!(status, StatusCode::OK);
        ids.push(body["id"].as_u64().unwrap());
    }
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), contacts.len());

    let (_, list) = get(router, "/api/enrollments").await;
    assert_eq!(list.as_array().unwrap().len(), contacts.len());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_duplicate_assigns_admit_one() {
    let dir = TempDir::new().unwrap();
    let seeded = init_project(&dir);
    let body = serde_json::json!({ "contact_id": seeded.contact, "sequence_id": seeded.sequence });

    let router = app(&dir);
    let mut set = tokio::task::JoinSet::new();
    for _ in 0..8 {
        set.spawn(post_json(router.clone(), "/api/enrollments", body.clone()));
    }
    let mut ok = 0;
    while let Some(res) = set.join_next().await {
        match res.unwrap().0 {
            StatusCode::OK => ok += 1,
            status => assert_eq!(status, StatusCode::CONFLICT),
        }
    }
    assert_eq!(ok, 1);
}

#[tokio::test]
async fn removed_enrollment_rejects_completion() {
    let dir = TempDir::new().unwrap();
    let seeded = init_project(&dir);
    let (_, body) = post_json(
        app(&dir),
        "/api/enrollments",
        serde_json::json!({ "contact_id": seeded.contact, "sequence_id": seeded.sequence }),
    )
    .await;
    let id = body["id"].as_u64().unwrap();

    let (status, removed) = post(app(&dir), &format!("/api/enrollments/{id}/remove")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(removed["status"], "Removed");

    let (status, _) = post(app(&dir), &format!("/api/enrollments/{id}/complete")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = post(app(&dir), &format!("/api/enrollments/{id}/revisit")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn unknown_enrollment_is_not_found() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let (status, _) = post(app(&dir), "/api/enrollments/999/complete").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sequences_list_ordered_steps() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let (status, body) = get(app(&dir), "/api/sequences").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["name"], "Cold outbound");
    let steps = body[0]["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0]["type"], "email");
    assert_eq!(steps[1]["delay_days"], 3);
}

#[tokio::test]
async fn quota_for_mine_and_team() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let mut config = Config::load(dir.path()).unwrap();
    config.quota.monthly_quota = 2000.0;
    config.save(dir.path()).unwrap();

    let mut store = YamlStore::open(dir.path()).unwrap();
    let june = chrono::NaiveDate::from_ymd_opt(2025, 6, 1);
    for (mrc, committed, close) in [
        (1000.0, true, june),
        (2000.0, false, june),
        (500.0, true, chrono::NaiveDate::from_ymd_opt(2025, 7, 1)),
    ] {
        let mut d = Deal::new("ana", "Fiber", mrc);
        d.is_committed = committed;
        d.close_month = close;
        actions::create_deal(&mut store, d).unwrap();
    }

    let (status, body) = get(app(&dir), "/api/quota").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scope"], "mine");
    assert_eq!(body["current_commit"], 1000.0);
    assert_eq!(body["commit_pct"], 50.0);
    assert_eq!(body["best_case"], 3000.0);
    assert_eq!(body["best_case_pct"], 150.0);
    assert_eq!(body["total_funnel"], 3500.0);

    // Not a manager: team falls back to the caller's own view.
    let (_, body) = get(app(&dir), "/api/quota?scope=team").await;
    assert_eq!(body["scope"], "mine");

    let (status, _) = get(app(&dir), "/api/quota?scope=galaxy").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, deals) = get(app(&dir), "/api/deals").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deals["deals"].as_array().unwrap().len(), 3);
    assert_eq!(deals["open_by_stage"][0]["stage"], "Discovery");
    assert_eq!(deals["open_by_stage"][0]["count"], 3);
}
