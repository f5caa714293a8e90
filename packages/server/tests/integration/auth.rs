use crate::common::{ADMIN_PASSWORD, ADMIN_USERNAME, TestApp, routes};
use serde_json::json;

#[tokio::test]
async fn admin_can_log_in() {
    let app = TestApp::spawn().await;

    let res = app
        .post_without_token(
            routes::LOGIN,
            &json!({"username": ADMIN_USERNAME, "password": ADMIN_PASSWORD}),
        )
        .await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert!(res.body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(res.body["username"], ADMIN_USERNAME);
    assert_eq!(res.body["role"], "admin");
    let permissions = res.body["permissions"].as_array().unwrap();
    assert!(permissions.contains(&json!("user:manage")));
    assert!(permissions.contains(&json!("score:import")));
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let app = TestApp::spawn().await;

    let res = app
        .post_without_token(
            routes::LOGIN,
            &json!({"username": ADMIN_USERNAME, "password": "not-the-password"}),
        )
        .await;

    assert_eq!(res.status, 401);
    assert_eq!(res.body["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn unknown_user_gets_same_error_as_wrong_password() {
    let app = TestApp::spawn().await;

    let res = app
        .post_without_token(
            routes::LOGIN,
            &json!({"username": "ghost", "password": "whatever123"}),
        )
        .await;

    assert_eq!(res.status, 401);
    assert_eq!(res.body["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn empty_login_fields_are_validation_errors() {
    let app = TestApp::spawn().await;

    let res = app
        .post_without_token(routes::LOGIN, &json!({"username": "  ", "password": "x"}))
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn me_returns_current_user() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;

    let res = app.get_with_token(routes::ME, &token).await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["username"], ADMIN_USERNAME);
    assert_eq!(res.body["role"], "admin");
    assert!(res.body["id"].is_i64());
}

#[tokio::test]
async fn me_without_token_is_rejected() {
    let app = TestApp::spawn().await;

    let res = app.get_without_token(routes::ME).await;

    assert_eq!(res.status, 401);
    assert_eq!(res.body["code"], "TOKEN_MISSING");
}

#[tokio::test]
async fn me_with_garbage_token_is_rejected() {
    let app = TestApp::spawn().await;

    let res = app.get_with_token(routes::ME, "not.a.jwt").await;

    assert_eq!(res.status, 401);
    assert_eq!(res.body["code"], "TOKEN_INVALID");
}

#[tokio::test]
async fn admin_creates_staff_account() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;

    let res = app
        .post_with_token(
            routes::USERS,
            &json!({"username": "li_wei", "password": "s3cure_pass", "role": "staff"}),
            &admin,
        )
        .await;

    assert_eq!(res.status, 201, "{}", res.text);
    assert_eq!(res.body["username"], "li_wei");
    assert_eq!(res.body["role"], "staff");

    let login = app
        .post_without_token(
            routes::LOGIN,
            &json!({"username": "li_wei", "password": "s3cure_pass"}),
        )
        .await;
    assert_eq!(login.status, 200);
    let permissions = login.body["permissions"].as_array().unwrap();
    assert!(permissions.contains(&json!("score:import")));
    assert!(!permissions.contains(&json!("user:manage")));
}

#[tokio::test]
async fn new_account_defaults_to_viewer() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;

    let res = app
        .post_with_token(
            routes::USERS,
            &json!({"username": "guest", "password": "guest-password"}),
            &admin,
        )
        .await;

    assert_eq!(res.status, 201, "{}", res.text);
    assert_eq!(res.body["role"], "viewer");
}

#[tokio::test]
async fn duplicate_username_is_conflict() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let body = json!({"username": "dup_user", "password": "password123"});

    let first = app.post_with_token(routes::USERS, &body, &admin).await;
    assert_eq!(first.status, 201);

    let second = app.post_with_token(routes::USERS, &body, &admin).await;
    assert_eq!(second.status, 409);
    assert_eq!(second.body["code"], "USERNAME_TAKEN");
}

#[tokio::test]
async fn unknown_role_is_rejected() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;

    let res = app
        .post_with_token(
            routes::USERS,
            &json!({"username": "someone", "password": "password123", "role": "principal"}),
            &admin,
        )
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn staff_cannot_manage_users() {
    let app = TestApp::spawn().await;
    let staff = app.create_user_with_role("staff_wang", "staff").await;

    let res = app
        .post_with_token(
            routes::USERS,
            &json!({"username": "another", "password": "password123"}),
            &staff,
        )
        .await;

    assert_eq!(res.status, 403);
    assert_eq!(res.body["code"], "PERMISSION_DENIED");
}
