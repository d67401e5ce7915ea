// tests/integration/login_veto_tests.rs

use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use crate::common::{app_helper, auth_helper};

#[tokio::test]
async fn test_signin_vetoed_when_terms_not_accepted() {
    let app = app_helper::setup_app_with_settings(app_helper::TERMS_ONLY).await;
    let user = auth_helper::signup_user(&app.router, "alice", None).await;

    let res = auth_helper::signin(&app.router, &user.uname, false).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let cookie = auth_helper::set_cookie_value(&res, "legal_pending_login");
    let body = auth_helper::json_body(res).await;

    assert_eq!(body["success"], false);
    assert_eq!(body["error_type"], "policy_acceptance_required");
    assert_eq!(body["redirect_url"], "/legal/acceptpolicies?login=1");
    assert_eq!(body["outstanding_policies"], json!(["termsOfUse"]));

    // Cookieとボディのトークンは同じもの
    let login_token = body["login_token"].as_str().unwrap();
    assert!(!login_token.is_empty());
    assert_eq!(cookie.as_deref(), Some(login_token));
    assert_eq!(app.state.pending_login_service.len().await, 1);
}

#[tokio::test]
async fn test_signin_allowed_when_no_policy_active() {
    let app = app_helper::setup_app_with_settings(app_helper::NO_POLICIES).await;
    let user = auth_helper::signup_user(&app.router, "bob", None).await;

    let res = auth_helper::signin(&app.router, &user.email, false).await;
    assert_eq!(res.status(), StatusCode::OK);

    let body = auth_helper::json_body(res).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["user"]["uid"], user.uid);
    assert_eq!(body["data"]["tokens"]["token_type"], "Bearer");
    assert!(body["data"]["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_signup_consent_allows_signin() {
    // インストール直後の設定: 利用規約・プライバシー・年齢（13歳）が有効
    let app = app_helper::setup_app().await;
    let user = auth_helper::signup_user(&app.router, "carol", Some(true)).await;

    let res = auth_helper::signin(&app.router, &user.uname, false).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_trade_conditions_do_not_gate_login() {
    let app = app_helper::setup_app_with_settings(app_helper::NO_POLICIES).await;
    app.set_settings(&[
        ("tradeConditionsActive", "1"),
        ("cancellationRightPolicyActive", "1"),
    ])
    .await;
    let user = auth_helper::signup_user(&app.router, "dave", None).await;

    let res = auth_helper::signin(&app.router, &user.uname, false).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_policy_enabled_after_signup_vetoes_login() {
    let app = app_helper::setup_app_with_settings(app_helper::TERMS_ONLY).await;
    let user = auth_helper::signup_user(&app.router, "erin", Some(true)).await;
    assert_eq!(
        auth_helper::signin(&app.router, &user.uname, false).await.status(),
        StatusCode::OK
    );

    // 後からプライバシーポリシーを有効にすると、未承認分だけが拒否理由になる
    app.set_settings(&[("privacyPolicyActive", "1")]).await;

    let res = auth_helper::signin(&app.router, &user.uname, false).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body = auth_helper::json_body(res).await;
    assert_eq!(body["outstanding_policies"], json!(["privacyPolicy"]));
}

#[tokio::test]
async fn test_wrong_password_is_not_vetoed() {
    let app = app_helper::setup_app_with_settings(app_helper::TERMS_ONLY).await;
    let user = auth_helper::signup_user(&app.router, "frank", None).await;

    let res =
        auth_helper::signin_with_password(&app.router, &user.uname, "Wrong1234", false).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(app.state.pending_login_service.is_empty().await);
}

#[tokio::test]
async fn test_duplicate_signup_conflict() {
    let app = app_helper::setup_app().await;
    auth_helper::signup_user(&app.router, "grace", None).await;

    let req = auth_helper::json_request(
        "POST",
        "/auth/signup",
        None,
        Some(json!({
            "email": "grace@example.com",
            "uname": "grace2",
            "password": auth_helper::TEST_PASSWORD,
        })),
    );
    let res = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}
