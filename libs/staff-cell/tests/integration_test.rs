use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_models::auth::Role;
use shared_utils::test_utils::{MockPostgrest, SessionTestUtils, TestConfig, TestUser};
use staff_cell::router::staff_routes;

struct Harness {
    app: Router,
    cookie: String,
}

fn harness(server: &MockServer, user: TestUser) -> Harness {
    let config = TestConfig::with_supabase_url(&server.uri());
    Harness {
        cookie: SessionTestUtils::cookie_header(&user, &config.session_secret),
        app: staff_routes(config.to_arc()),
    }
}

fn form_post(uri: &str, cookie: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

const VALID_FORM: &str = "last_name=Tazi&first_name=Youssef&email=Y.Tazi%40Cabinet.ma\
&password=secret1&confirm_password=secret1&role=Secretaire";

#[tokio::test]
async fn test_non_admin_is_forbidden() {
    let server = MockServer::start().await;
    let h = harness(&server, TestUser::medecin("dr@cabinet.ma"));

    let response = h
        .app
        .oneshot(
            Request::builder()
                .uri("/")
                .header(header::COOKIE, &h.cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_list_hides_password_hashes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/employers"))
        .and(query_param("order", "last_name.asc,first_name.asc,id.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrest::employer_row(1, "admin@cabinet.ma", Role::Admin, "PBKDF2$1$x$y")
        ])))
        .mount(&server)
        .await;

    let h = harness(&server, TestUser::admin("admin@cabinet.ma"));
    let response = h
        .app
        .oneshot(
            Request::builder()
                .uri("/")
                .header(header::COOKIE, &h.cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["total"], 1);
    assert!(json["employers"][0].get("password_hash").is_none());
}

#[tokio::test]
async fn test_create_normalises_email_and_hashes_password() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/employers"))
        .and(query_param("email", "ilike.y.tazi@cabinet.ma"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/employers"))
        .respond_with(|req: &wiremock::Request| {
            let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
            let hashed = body["password_hash"]
                .as_str()
                .is_some_and(|h| h.starts_with("PBKDF2$100000$"));
            if body["email"] == "y.tazi@cabinet.ma" && hashed {
                let mut row = body.clone();
                row["id"] = json!(12);
                ResponseTemplate::new(201).set_body_json(json!([row]))
            } else {
                ResponseTemplate::new(400)
            }
        })
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server, TestUser::admin("admin@cabinet.ma"));
    let response = h.app.oneshot(form_post("/", &h.cookie, VALID_FORM)).await.unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/employers");
}

#[tokio::test]
async fn test_duplicate_email_is_a_field_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/employers"))
        .and(query_param("email", "ilike.y.tazi@cabinet.ma"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 3 }])))
        .mount(&server)
        .await;

    let h = harness(&server, TestUser::admin("admin@cabinet.ma"));
    let response = h.app.oneshot(form_post("/", &h.cookie, VALID_FORM)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["fields"]["email"][0], "This email is already in use");
}

#[tokio::test]
async fn test_update_missing_employer_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/employers"))
        .and(query_param("id", "eq.44"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let h = harness(&server, TestUser::admin("admin@cabinet.ma"));
    let body = "last_name=Tazi&first_name=Youssef&email=y%40cabinet.ma&role=Medecin";
    let response = h.app.oneshot(form_post("/44", &h.cookie, body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_without_password_keeps_hash() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/employers"))
        .and(query_param("id", "eq.5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrest::employer_row(5, "y@cabinet.ma", Role::Secretaire, "PBKDF2$1$x$y")
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/employers"))
        .and(query_param("id", "neq.5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/employers"))
        .and(query_param("id", "eq.5"))
        .respond_with(|req: &wiremock::Request| {
            let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
            if body.get("password_hash").is_none() && body["role"] == "Medecin" {
                ResponseTemplate::new(200).set_body_json(json!([
                    MockPostgrest::employer_row(5, "y@cabinet.ma", Role::Medecin, "PBKDF2$1$x$y")
                ]))
            } else {
                ResponseTemplate::new(400)
            }
        })
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server, TestUser::admin("admin@cabinet.ma"));
    let body = "last_name=Tazi&first_name=Youssef&email=y%40cabinet.ma&password=&confirm_password=&role=Medecin";
    let response = h.app.oneshot(form_post("/5", &h.cookie, body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_cannot_delete_own_account() {
    let server = MockServer::start().await;
    let admin = TestUser::admin("admin@cabinet.ma");
    let own_id = admin.id;
    let h = harness(&server, admin);

    let response = h
        .app
        .oneshot(form_post(&format!("/{}/delete", own_id), &h.cookie, ""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_delete_refused_when_movements_reference_employer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/employers"))
        .and(query_param("id", "eq.9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrest::employer_row(9, "old@cabinet.ma", Role::Secretaire, "x")
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/stock_movements"))
        .and(query_param("employer_id", "eq.9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 100 }])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let h = harness(&server, TestUser::admin("admin@cabinet.ma"));
    let response = h.app.oneshot(form_post("/9/delete", &h.cookie, "")).await.unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}
