use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use exam_backend::{config::Config, database::pool::create_memory_pool, routes, AppState};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;

async fn app() -> Router {
    let pool = create_memory_pool().await.expect("pool");
    routes::create_router(AppState::new(pool, Config::default()))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<JsonValue>,
) -> (StatusCode, JsonValue) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let req = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let body = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null)
    };
    (status, body)
}

async fn register_and_login(app: &Router, username: &str, role: &str) -> String {
    let (status, _) = send(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "username": username, "password": "password123", "role": role })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": username, "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");
    assert!(body["user"].get("password_hash").is_none());
    body["token"].as_str().unwrap().to_string()
}

fn question_body(text: &str, correct: &[usize]) -> JsonValue {
    let options: Vec<JsonValue> = (0..4)
        .map(|i| json!({ "text": format!("Option {}", i + 1), "is_correct": correct.contains(&i) }))
        .collect();
    json!({ "text": text, "options": options })
}

#[tokio::test]
async fn health_reports_database() {
    let app = app().await;
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "ok");
}

#[tokio::test]
async fn exam_flow_end_to_end() {
    let app = app().await;
    let teacher = register_and_login(&app, "teacher", "teacher").await;
    let student = register_and_login(&app, "student", "student").await;

    let (status, exam) = send(
        &app,
        "POST",
        "/api/exams",
        Some(&teacher),
        Some(json!({ "title": "Arithmetic", "description": "Warm-up" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let exam_id = exam["id"].as_i64().unwrap();

    let (status, q1) = send(
        &app,
        "POST",
        &format!("/api/exams/{}/questions", exam_id),
        Some(&teacher),
        Some(question_body("2 + 2?", &[2])),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let q1_id = q1["id"].as_i64().unwrap();
    let q1_correct = q1["options"][2]["id"].as_i64().unwrap();

    let (status, q2) = send(
        &app,
        "POST",
        &format!("/api/exams/{}/questions", exam_id),
        Some(&teacher),
        Some(question_body("3 + 3?", &[0])),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let q2_id = q2["id"].as_i64().unwrap();
    let q2_wrong = q2["options"][3]["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/exams/{}/questions", exam_id),
        Some(&teacher),
        Some(question_body("Two answers?", &[0, 1])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Students never see correctness flags.
    let (status, public) = send(
        &app,
        "GET",
        &format!("/api/exams/{}", exam_id),
        Some(&student),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(public["questions"].as_array().unwrap().len(), 2);
    assert!(public["questions"][0]["options"][0].get("is_correct").is_none());

    let (status, result) = send(
        &app,
        "POST",
        &format!("/api/exams/{}/attempts", exam_id),
        Some(&student),
        Some(json!({ "selections": {
            q1_id.to_string(): q1_correct,
            q2_id.to_string(): q2_wrong,
        } })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(result["score"], 1);
    assert_eq!(result["total"], 2);
    assert_eq!(result["grade"], "E");
    let attempt_id = result["attempt_id"].as_i64().unwrap();

    let (status, report) = send(
        &app,
        "GET",
        &format!("/api/attempts/{}/report", attempt_id),
        Some(&student),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["student_name"], "student");
    assert_eq!(report["questions"][0]["is_correct"], true);

    let (status, dashboard) = send(&app, "GET", "/api/exams", Some(&student), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard[0]["latest_attempt"]["score"], 1);

    let (status, results) = send(
        &app,
        "GET",
        &format!("/api/exams/{}/results", exam_id),
        Some(&teacher),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(results["results"].as_array().unwrap().len(), 1);

    let req = Request::builder()
        .uri(format!("/api/exams/{}/results/export", exam_id))
        .header(header::AUTHORIZATION, format!("Bearer {}", teacher))
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[header::CONTENT_TYPE],
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    assert!(bytes.starts_with(b"PK"));

    let req = Request::builder()
        .uri(format!("/api/attempts/{}/export", attempt_id))
        .header(header::AUTHORIZATION, format!("Bearer {}", student))
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/exams/{}", exam_id),
        Some(&teacher),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/attempts/{}/report", attempt_id),
        Some(&student),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn access_control() {
    let app = app().await;

    let (status, body) = send(&app, "GET", "/api/exams", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = send(&app, "GET", "/api/exams", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let teacher = register_and_login(&app, "teacher", "teacher").await;
    let other_teacher = register_and_login(&app, "teacher2", "teacher").await;
    let student = register_and_login(&app, "student", "student").await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/exams",
        Some(&student),
        Some(json!({ "title": "Not allowed" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, exam) = send(
        &app,
        "POST",
        "/api/exams",
        Some(&teacher),
        Some(json!({ "title": "Owned" })),
    )
    .await;
    let exam_id = exam["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/exams/{}", exam_id),
        Some(&other_teacher),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/exams/{}/results", exam_id),
        Some(&student),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/exams/{}/attempts", exam_id),
        Some(&teacher),
        Some(json!({ "selections": {} })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "GET", "/api/exams/9999", Some(&teacher), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "username": "teacher", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("taken"));
}

#[tokio::test]
async fn malformed_requests_get_json_errors() {
    let app = app().await;
    let teacher = register_and_login(&app, "teacher", "teacher").await;
    let student = register_and_login(&app, "student", "student").await;
    let (_, exam) = send(
        &app,
        "POST",
        "/api/exams",
        Some(&teacher),
        Some(json!({ "title": "Parsing" })),
    )
    .await;
    let exam_id = exam["id"].as_i64().unwrap();

    let req = Request::builder()
        .method("POST")
        .uri("/api/exams")
        .header(header::AUTHORIZATION, format!("Bearer {}", teacher))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"title\": "))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let body: JsonValue = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].is_string());

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/exams/{}/attempts", exam_id),
        Some(&student),
        Some(json!({ "selections": { "first": 1 } })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send(&app, "GET", "/api/exams/abc", Some(&teacher), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn question_can_be_rewritten() {
    let app = app().await;
    let teacher = register_and_login(&app, "teacher", "teacher").await;
    let (_, exam) = send(
        &app,
        "POST",
        "/api/exams",
        Some(&teacher),
        Some(json!({ "title": "Editable" })),
    )
    .await;
    let exam_id = exam["id"].as_i64().unwrap();
    let (_, question) = send(
        &app,
        "POST",
        &format!("/api/exams/{}/questions", exam_id),
        Some(&teacher),
        Some(question_body("Old text", &[0])),
    )
    .await;
    let question_id = question["id"].as_i64().unwrap();

    let (status, updated) = send(
        &app,
        "PATCH",
        &format!("/api/questions/{}", question_id),
        Some(&teacher),
        Some(question_body("New text", &[1])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["text"], "New text");
    assert_eq!(updated["options"][1]["is_correct"], true);

    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/api/questions/{}", question_id),
        Some(&teacher),
        Some(question_body("Broken", &[])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
