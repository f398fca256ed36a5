mod common;

use axum::{
    extract::FromRequestParts,
    http::{Method, Request, StatusCode, Uri, header, request::Parts},
};
use common::*;
use payments_api::{ApiError, AppState, MockPaymentGateway, auth::AuthUser, config::Env};
use std::sync::Arc;
use uuid::Uuid;

// --- Helper Functions ---

fn state_for(env: Env, repo: MockRepo) -> AppState {
    let mut config = test_config();
    config.env = env;
    create_state(Arc::new(repo), MockPaymentGateway::new(), config)
}

fn get_request_parts(method: Method, uri: Uri) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

fn parts_with_header(name: header::HeaderName, value: &str) -> Parts {
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts
        .headers
        .insert(name, header::HeaderValue::from_str(value).unwrap());
    parts
}

fn assert_unauthorized(result: Result<AuthUser, ApiError>) {
    match result {
        Err(err) => assert_eq!(err.status(), StatusCode::UNAUTHORIZED),
        Ok(user) => panic!("expected rejection, resolved {:?}", user),
    }
}

// --- Tests ---

#[tokio::test]
async fn test_auth_success_with_valid_jwt() {
    let state = state_for(Env::Production, MockRepo::with_users(vec![plain_user()]));
    let mut parts = parts_with_header(header::AUTHORIZATION, &bearer(TEST_USER_ID));

    let user = AuthUser::from_request_parts(&mut parts, &state)
        .await
        .expect("valid token should resolve");

    assert_eq!(user.id, TEST_USER_ID);
    assert_eq!(user.role, "user");
}

#[tokio::test]
async fn test_auth_failure_with_missing_header() {
    let state = state_for(Env::Production, MockRepo::with_users(vec![plain_user()]));
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());

    assert_unauthorized(AuthUser::from_request_parts(&mut parts, &state).await);
}

#[tokio::test]
async fn test_auth_failure_without_bearer_prefix() {
    let state = state_for(Env::Production, MockRepo::with_users(vec![plain_user()]));
    let token = create_token(TEST_USER_ID, 3600);
    let mut parts = parts_with_header(header::AUTHORIZATION, &token);

    assert_unauthorized(AuthUser::from_request_parts(&mut parts, &state).await);
}

#[tokio::test]
async fn test_auth_failure_with_expired_jwt() {
    let state = state_for(Env::Production, MockRepo::with_users(vec![plain_user()]));
    let token = create_token(TEST_USER_ID, -3600);
    let mut parts = parts_with_header(header::AUTHORIZATION, &format!("Bearer {}", token));

    assert_unauthorized(AuthUser::from_request_parts(&mut parts, &state).await);
}

#[tokio::test]
async fn test_auth_failure_with_wrong_secret() {
    let mut state = state_for(Env::Production, MockRepo::with_users(vec![plain_user()]));
    state.config.jwt_secret = "a-different-secret".to_string();
    let mut parts = parts_with_header(header::AUTHORIZATION, &bearer(TEST_USER_ID));

    assert_unauthorized(AuthUser::from_request_parts(&mut parts, &state).await);
}

#[tokio::test]
async fn test_auth_failure_for_deleted_user() {
    let state = state_for(Env::Production, MockRepo::default());
    let mut parts = parts_with_header(header::AUTHORIZATION, &bearer(TEST_USER_ID));

    assert_unauthorized(AuthUser::from_request_parts(&mut parts, &state).await);
}

#[tokio::test]
async fn test_local_bypass_success() {
    let state = state_for(Env::Local, MockRepo::with_users(vec![admin_user()]));
    let mut parts = parts_with_header(
        header::HeaderName::from_static("x-user-id"),
        &TEST_ADMIN_ID.to_string(),
    );

    let user = AuthUser::from_request_parts(&mut parts, &state)
        .await
        .expect("local bypass should resolve");

    assert_eq!(user.id, TEST_ADMIN_ID);
    assert_eq!(user.role, "admin");
}

#[tokio::test]
async fn test_local_bypass_unknown_user_rejected() {
    let state = state_for(Env::Local, MockRepo::default());
    let mut parts = parts_with_header(
        header::HeaderName::from_static("x-user-id"),
        &Uuid::new_v4().to_string(),
    );

    assert_unauthorized(AuthUser::from_request_parts(&mut parts, &state).await);
}

#[tokio::test]
async fn test_local_bypass_disabled_in_prod() {
    let state = state_for(Env::Production, MockRepo::with_users(vec![plain_user()]));
    let mut parts = parts_with_header(
        header::HeaderName::from_static("x-user-id"),
        &TEST_USER_ID.to_string(),
    );

    assert_unauthorized(AuthUser::from_request_parts(&mut parts, &state).await);
}

#[tokio::test]
async fn test_repository_failure_is_internal_error() {
    let repo = MockRepo {
        should_fail: true,
        ..MockRepo::default()
    };
    let state = state_for(Env::Production, repo);
    let mut parts = parts_with_header(header::AUTHORIZATION, &bearer(TEST_USER_ID));

    let err = AuthUser::from_request_parts(&mut parts, &state)
        .await
        .expect_err("repository failure must not authenticate");
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
