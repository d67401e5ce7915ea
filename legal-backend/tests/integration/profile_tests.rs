// tests/integration/profile_tests.rs

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use legal_backend::domain::{
    policy::{PolicySlot, RESERVED_ADMIN_UID},
    user_model::UserClaims,
};
use legal_backend::repository::user_attribute_repository::UserAttributeRepository;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::common::{app_helper, auth_helper};

fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri).method("GET");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// 予約済み管理者のトークン。管理者はパスワード未設定のため直接発行する
fn admin_token(app: &app_helper::TestApp) -> String {
    app.state
        .jwt_manager
        .generate_access_token(
            UserClaims {
                uid: RESERVED_ADMIN_UID,
                uname: "admin".to_string(),
                email: "admin@localhost".to_string(),
                is_active: true,
            },
            false,
        )
        .unwrap()
}

async fn update_profile(
    app: &app_helper::TestApp,
    uid: i32,
    token: &str,
    payload: Value,
) -> (StatusCode, Value) {
    let res = app
        .router
        .clone()
        .oneshot(auth_helper::json_request(
            "PUT",
            &format!("/users/{}/profile", uid),
            Some(token),
            Some(payload),
        ))
        .await
        .unwrap();
    let status = res.status();
    (status, auth_helper::json_body(res).await)
}

#[tokio::test]
async fn test_profile_policies_visible_to_owner_only() {
    let app = app_helper::setup_app_with_settings(app_helper::ALL_POLICIES).await;
    let owner = auth_helper::signup_user(&app.router, "alice", Some(true)).await;
    let other = auth_helper::signup_user(&app.router, "bob", Some(true)).await;
    let owner_token = auth_helper::signin_token(&app.router, &owner.uname).await;
    let other_token = auth_helper::signin_token(&app.router, &other.uname).await;
    let uri = format!("/users/{}/policies", owner.uid);

    let res = app
        .router
        .clone()
        .oneshot(get_request(&uri, Some(&owner_token)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = auth_helper::json_body(res).await;
    let view = &body["data"];
    assert_eq!(view["viewable_policies"]["termsOfUse"], true);
    assert_eq!(view["viewable_policies"]["agePolicy"], true);
    // 取引条件と撤回権ポリシーはプロフィールに表示しない
    assert_eq!(view["viewable_policies"]["tradeConditions"], false);
    assert_eq!(view["viewable_policies"]["cancellationRightPolicy"], false);
    assert_eq!(view["accepted_policies"]["privacyPolicy"], true);

    for token in [Some(other_token.as_str()), None] {
        let res = app
            .router
            .clone()
            .oneshot(get_request(&uri, token))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = auth_helper::json_body(res).await;
        assert!(body["data"].is_null());
    }

    let res = app
        .router
        .clone()
        .oneshot(get_request(&uri, Some(&admin_token(&app))))
        .await
        .unwrap();
    let body = auth_helper::json_body(res).await;
    assert_eq!(body["data"]["viewable_policies"]["privacyPolicy"], true);
}

#[tokio::test]
async fn test_profile_policies_empty_when_nothing_active() {
    let app = app_helper::setup_app_with_settings(app_helper::NO_POLICIES).await;
    let user = auth_helper::signup_user(&app.router, "carol", None).await;
    let token = auth_helper::signin_token(&app.router, &user.uname).await;

    let res = app
        .router
        .clone()
        .oneshot(get_request(
            &format!("/users/{}/policies", user.uid),
            Some(&token),
        ))
        .await
        .unwrap();
    let body = auth_helper::json_body(res).await;
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn test_profile_policies_unknown_user() {
    let app = app_helper::setup_app().await;

    let res = app
        .router
        .clone()
        .oneshot(get_request("/users/9999/policies", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_profile_form_edit_access() {
    let app = app_helper::setup_app_with_settings(app_helper::TERMS_ONLY).await;
    let owner = auth_helper::signup_user(&app.router, "dave", Some(true)).await;
    let other = auth_helper::signup_user(&app.router, "erin", Some(true)).await;
    let owner_token = auth_helper::signin_token(&app.router, &owner.uname).await;
    let other_token = auth_helper::signin_token(&app.router, &other.uname).await;
    let uri = format!("/users/{}/profile/form", owner.uid);

    let cases = [
        (owner_token, true),
        (other_token, false),
        (admin_token(&app), true),
    ];
    for (token, expected) in cases {
        let res = app
            .router
            .clone()
            .oneshot(get_request(&uri, Some(&token)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = auth_helper::json_body(res).await;
        assert_eq!(body["data"]["user_edit_access"], expected);
        assert_eq!(body["data"]["accepted_policies"]["termsOfUse"], true);
    }

    let res = app
        .router
        .clone()
        .oneshot(get_request(&uri, None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_profile_edit_revokes_and_restores_acceptance() {
    let app = app_helper::setup_app_with_settings(app_helper::TERMS_ONLY).await;
    let user = auth_helper::signup_user(&app.router, "frank", Some(true)).await;
    let token = auth_helper::signin_token(&app.router, &user.uname).await;

    // 同意を外すと承認が取り消され、次のログインは拒否される
    let (status, body) = update_profile(
        &app,
        user.uid,
        &token,
        json!({ "acceptedpolicies_policies": false }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["accepted_policies"]["termsOfUse"], false);
    assert_eq!(
        auth_helper::signin(&app.router, &user.uname, false)
            .await
            .status(),
        StatusCode::FORBIDDEN
    );

    // 再び同意すると新しい日時で記録される
    let (status, body) = update_profile(
        &app,
        user.uid,
        &token,
        json!({ "acceptedpolicies_policies": true }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["accepted_policies"]["termsOfUse"], true);
    assert_eq!(
        auth_helper::signin(&app.router, &user.uname, false)
            .await
            .status(),
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_profile_edit_keeps_inactive_policy_acceptance() {
    let app = app_helper::setup_app_with_settings(app_helper::TERMS_ONLY).await;
    let user = auth_helper::signup_user(&app.router, "trudy", Some(true)).await;
    let token = auth_helper::signin_token(&app.router, &user.uname).await;

    // 取引条件が有効だった時期に承認した記録
    let trade = PolicySlot::TradeConditions.attribute_name();
    let accepted_at = "2024-03-01T09:30:05+0000";
    UserAttributeRepository::set(&app.db, user.uid, trade, accepted_at)
        .await
        .unwrap();
    let repo = UserAttributeRepository::new(app.db.clone());

    for consent in [true, false] {
        let (status, _) = update_profile(
            &app,
            user.uid,
            &token,
            json!({ "acceptedpolicies_policies": consent }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            repo.get(user.uid, trade).await.unwrap().as_deref(),
            Some(accepted_at),
            "consent={consent}"
        );
    }
}

#[tokio::test]
async fn test_profile_edit_without_consent_field_keeps_acceptance() {
    let app = app_helper::setup_app_with_settings(app_helper::TERMS_ONLY).await;
    let user = auth_helper::signup_user(&app.router, "grace", Some(true)).await;
    let token = auth_helper::signin_token(&app.router, &user.uname).await;

    let (status, body) = update_profile(
        &app,
        user.uid,
        &token,
        json!({ "email": "grace.new@example.com" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["email"], "grace.new@example.com");
    assert_eq!(body["data"]["accepted_policies"]["termsOfUse"], true);
}

#[tokio::test]
async fn test_admin_can_edit_other_profile() {
    let app = app_helper::setup_app_with_settings(app_helper::TERMS_ONLY).await;
    let user = auth_helper::signup_user(&app.router, "heidi", None).await;

    let (status, body) = update_profile(
        &app,
        user.uid,
        &admin_token(&app),
        json!({ "acceptedpolicies_policies": true }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["accepted_policies"]["termsOfUse"], true);
}

#[tokio::test]
async fn test_cannot_edit_other_profile() {
    let app = app_helper::setup_app_with_settings(app_helper::TERMS_ONLY).await;
    let owner = auth_helper::signup_user(&app.router, "ivan", Some(true)).await;
    let other = auth_helper::signup_user(&app.router, "judy", Some(true)).await;
    let other_token = auth_helper::signin_token(&app.router, &other.uname).await;

    let (status, body) = update_profile(
        &app,
        owner.uid,
        &other_token,
        json!({ "acceptedpolicies_policies": false }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error_type"], "forbidden");

    // 承認は残っている
    assert_eq!(
        auth_helper::signin(&app.router, &owner.uname, false)
            .await
            .status(),
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_profile_edit_email_conflict() {
    let app = app_helper::setup_app_with_settings(app_helper::NO_POLICIES).await;
    let user = auth_helper::signup_user(&app.router, "kate", None).await;
    let other = auth_helper::signup_user(&app.router, "leo", None).await;
    let token = auth_helper::signin_token(&app.router, &user.uname).await;

    let (status, _) = update_profile(&app, user.uid, &token, json!({ "email": other.email })).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // 自分の現在のアドレスは衝突扱いしない
    let (status, _) = update_profile(&app, user.uid, &token, json!({ "email": user.email })).await;
    assert_eq!(status, StatusCode::OK);
}
