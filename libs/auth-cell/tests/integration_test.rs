use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use auth_cell::router::auth_routes;
use auth_cell::PasswordSecurity;
use shared_models::auth::Role;
use shared_utils::test_utils::{MockPostgrest, SessionTestUtils, TestConfig, TestUser};

fn login_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn mount_employer(server: &MockServer, email: &str, password_hash: &str) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/employers"))
        .and(query_param("email", format!("ilike.{}", email)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrest::employer_row(7, email, Role::Medecin, password_hash)
        ])))
        .mount(server)
        .await;
}

fn app_for(server: &MockServer) -> Router {
    auth_routes(TestConfig::with_supabase_url(&server.uri()).to_arc())
}

#[tokio::test]
async fn test_login_page_echoes_return_url() {
    let app = auth_routes(TestConfig::default().to_arc());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/login?return_url=%2Fpatients")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["return_url"], "/patients");
}

#[tokio::test]
async fn test_login_success_sets_cookie_and_redirects() {
    let server = MockServer::start().await;
    let hash = PasswordSecurity::hash_password("consult2026").unwrap();
    mount_employer(&server, "dr.alami@cabinet.ma", &hash).await;

    let response = app_for(&server)
        .oneshot(login_request(
            "email=Dr.Alami%40cabinet.ma&password=consult2026&return_url=%2Fconsultations",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/consultations");

    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("cabinet_session="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
}

#[tokio::test]
async fn test_login_finds_employer_stored_with_mixed_case_email() {
    let server = MockServer::start().await;
    let hash = PasswordSecurity::hash_password("consult2026").unwrap();
    Mock::given(method("GET"))
        .and(path("/rest/v1/employers"))
        .and(query_param("email", "ilike.dr.alami@cabinet.ma"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrest::employer_row(7, "Dr.Alami@Cabinet.ma", Role::Medecin, &hash)
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let response = app_for(&server)
        .oneshot(login_request("email=dr.alami%40cabinet.ma&password=consult2026"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(response.headers().contains_key(header::SET_COOKIE));
}

#[tokio::test]
async fn test_login_ignores_foreign_return_url() {
    let server = MockServer::start().await;
    mount_employer(&server, "dr.alami@cabinet.ma", "legacy-pass").await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/employers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let response = app_for(&server)
        .oneshot(login_request(
            "email=dr.alami%40cabinet.ma&password=legacy-pass&return_url=%2F%2Fevil.example",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/");
}

#[tokio::test]
async fn test_legacy_password_is_rehashed() {
    let server = MockServer::start().await;
    mount_employer(&server, "sec@cabinet.ma", "plain-old").await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/employers"))
        .and(query_param("id", "eq.7"))
        .respond_with(|req: &wiremock::Request| {
            let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
            let hash = body["password_hash"].as_str().unwrap_or_default();
            if hash.starts_with("PBKDF2$100000$") {
                ResponseTemplate::new(200).set_body_json(json!([]))
            } else {
                ResponseTemplate::new(400)
            }
        })
        .expect(1)
        .mount(&server)
        .await;

    let response = app_for(&server)
        .oneshot(login_request("email=sec%40cabinet.ma&password=plain-old"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized() {
    let server = MockServer::start().await;
    mount_employer(&server, "sec@cabinet.ma", "plain-old").await;

    let response = app_for(&server)
        .oneshot(login_request("email=sec%40cabinet.ma&password=nope"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Invalid email or password");
}

#[tokio::test]
async fn test_missing_fields_are_reported() {
    let app = auth_routes(TestConfig::default().to_arc());

    let response = app
        .oneshot(login_request("email=not-an-email&password="))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["fields"]["email"][0], "Invalid email format");
    assert_eq!(json["fields"]["password"][0], "Password is required");
}

#[tokio::test]
async fn test_repeated_failures_lock_the_account() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/employers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let app = app_for(&server);

    for _ in 0..5 {
        let response = app
            .clone()
            .oneshot(login_request("email=ghost%40cabinet.ma&password=guess"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = app
        .oneshot(login_request("email=GHOST%40cabinet.ma&password=guess"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let message = body_json(response).await["error"].as_str().unwrap().to_string();
    assert!(message.contains("15 minute"), "{}", message);
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let config = TestConfig::default();
    let app = auth_routes(config.to_arc());
    let user = TestUser::secretaire("sec@cabinet.ma");

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/logout")
                .header(
                    header::COOKIE,
                    SessionTestUtils::cookie_header(&user, &config.session_secret),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/account/login");
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("cabinet_session=;"));
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_me_requires_session() {
    let config = TestConfig::default();
    let app = auth_routes(config.to_arc());

    let anonymous = app
        .clone()
        .oneshot(Request::builder().uri("/me").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::SEE_OTHER);

    let user = TestUser::medecin("dr@cabinet.ma");
    let response = app
        .oneshot(
            Request::builder()
                .uri("/me")
                .header(
                    header::COOKIE,
                    SessionTestUtils::cookie_header(&user, &config.session_secret),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["email"], "dr@cabinet.ma");
    assert_eq!(json["role"], "Medecin");
}

#[tokio::test]
async fn test_upstream_failure_is_a_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/employers"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(MockPostgrest::error_response("boom", "XX000")),
        )
        .mount(&server)
        .await;

    let response = app_for(&server)
        .oneshot(login_request("email=sec%40cabinet.ma&password=x"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
