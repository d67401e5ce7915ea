// tests/integration/acceptance_flow_tests.rs

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use legal_backend::{
    domain::policy::PolicySlot, repository::user_attribute_repository::UserAttributeRepository,
    types::parse_acceptance_timestamp,
};
use serde_json::json;
use tower::ServiceExt;

use crate::common::{app_helper, auth_helper};

fn get_request(uri: &str, token: Option<&str>, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri).method("GET");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_login_flow_accepts_terms_and_completes_login() {
    let app = app_helper::setup_app_with_settings(app_helper::TERMS_ONLY).await;
    let user = auth_helper::signup_user(&app.router, "alice", None).await;
    let first_token = auth_helper::signin_vetoed(&app.router, &user.uname).await;

    // フォーム表示
    let res = app
        .router
        .clone()
        .oneshot(get_request(
            &format!("/legal/acceptpolicies?login=1&login_token={}", first_token),
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = auth_helper::json_body(res).await;
    let form = &body["data"];

    assert_eq!(form["login"], true);
    assert_eq!(form["policies_uid"], user.uid);
    assert_eq!(form["active_policies"]["termsOfUse"], true);
    assert_eq!(form["active_policies"]["privacyPolicy"], false);
    assert_eq!(form["accepted_policies"]["termsOfUse"], false);

    // 表示のたびにトークンは新しくなる
    let second_token = form["login_token"].as_str().unwrap().to_string();
    assert_ne!(second_token, first_token);

    // 送信
    let uid = user.uid.to_string();
    let res = app
        .router
        .clone()
        .oneshot(auth_helper::form_request(
            "/legal/acceptpolicies",
            &[
                ("acceptedpolicies_uid", uid.as_str()),
                ("acceptedpolicies_termsofuse", "1"),
                ("login_token", second_token.as_str()),
            ],
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(auth_helper::set_cookie_value(&res, "access_token").is_some());

    let body = auth_helper::json_body(res).await;
    assert_eq!(body["data"]["user"]["uid"], user.uid);
    assert!(body["data"]["tokens"]["access_token"].is_string());
    assert!(app.state.pending_login_service.is_empty().await);

    // 以降のログインは拒否されない
    let res = auth_helper::signin(&app.router, &user.uname, false).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_flow_with_pending_cookie() {
    let app = app_helper::setup_app_with_settings(app_helper::TERMS_ONLY).await;
    let user = auth_helper::signup_user(&app.router, "bob", None).await;

    let res = auth_helper::signin(&app.router, &user.uname, true).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let token = auth_helper::set_cookie_value(&res, "legal_pending_login").unwrap();
    let cookie = format!("legal_pending_login={}", token);

    let res = app
        .router
        .clone()
        .oneshot(get_request(
            "/legal/acceptpolicies?login=1",
            None,
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let token = auth_helper::set_cookie_value(&res, "legal_pending_login").unwrap();
    let cookie = format!("legal_pending_login={}", token);

    let uid = user.uid.to_string();
    let res = app
        .router
        .clone()
        .oneshot(auth_helper::form_request(
            "/legal/acceptpolicies",
            &[
                ("acceptedpolicies_uid", uid.as_str()),
                ("acceptedpolicies_termsofuse", "on"),
            ],
            None,
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // remember_me は保留中も引き継がれる
    let body = auth_helper::json_body(res).await;
    let expires_in = body["data"]["tokens"]["expires_in"].as_i64().unwrap();
    assert_eq!(expires_in, 7 * 24 * 60 * 60);
}

#[tokio::test]
async fn test_missing_required_policy_returns_field_error() {
    let app = app_helper::setup_app_with_settings(app_helper::TERMS_ONLY).await;
    let user = auth_helper::signup_user(&app.router, "carol", None).await;
    let token = auth_helper::signin_vetoed(&app.router, &user.uname).await;

    let uid = user.uid.to_string();
    let res = app
        .router
        .clone()
        .oneshot(auth_helper::form_request(
            "/legal/acceptpolicies",
            &[
                ("acceptedpolicies_uid", uid.as_str()),
                ("acceptedpolicies_privacypolicy", "1"),
                ("login_token", token.as_str()),
            ],
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = auth_helper::json_body(res).await;
    assert_eq!(body["error_type"], "validation_errors");
    assert_eq!(
        body["validation_errors"]["termsofuse"],
        json!(["You must accept this site's Terms of Use in order to proceed."])
    );
    // 再表示用のスナップショットは送信された値
    assert_eq!(body["form"]["accepted_policies"]["termsOfUse"], false);
    assert_eq!(body["form"]["login"], true);

    // 何も保存されていない
    let repo = UserAttributeRepository::new(app.db.clone());
    assert!(repo.find_policy_attributes(user.uid).await.unwrap().is_empty());

    // 新しいトークンで再送信できる
    let retry_token = body["form"]["login_token"].as_str().unwrap().to_string();
    assert_ne!(retry_token, token);
    let res = app
        .router
        .clone()
        .oneshot(auth_helper::form_request(
            "/legal/acceptpolicies",
            &[
                ("acceptedpolicies_uid", uid.as_str()),
                ("acceptedpolicies_termsofuse", "1"),
                ("login_token", retry_token.as_str()),
            ],
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_accepted_timestamp_is_stored() {
    let app = app_helper::setup_app_with_settings(app_helper::TERMS_ONLY).await;
    let user = auth_helper::signup_user(&app.router, "dave", None).await;
    let token = auth_helper::signin_vetoed(&app.router, &user.uname).await;

    let uid = user.uid.to_string();
    let res = app
        .router
        .clone()
        .oneshot(auth_helper::form_request(
            "/legal/acceptpolicies",
            &[
                ("acceptedpolicies_uid", uid.as_str()),
                ("acceptedpolicies_termsofuse", "1"),
                ("login_token", token.as_str()),
            ],
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let repo = UserAttributeRepository::new(app.db.clone());
    let stored = repo
        .get(user.uid, PolicySlot::TermsOfUse.attribute_name())
        .await
        .unwrap()
        .unwrap();
    assert!(parse_acceptance_timestamp(&stored).is_some());

    // 無効なポリシーは書き込まれない
    let privacy = repo
        .get(user.uid, PolicySlot::PrivacyPolicy.attribute_name())
        .await
        .unwrap();
    assert!(privacy.is_none());
}

#[tokio::test]
async fn test_submit_without_session_is_unauthorized() {
    let app = app_helper::setup_app_with_settings(app_helper::TERMS_ONLY).await;
    let user = auth_helper::signup_user(&app.router, "erin", None).await;

    let uid = user.uid.to_string();
    let res = app
        .router
        .clone()
        .oneshot(auth_helper::form_request(
            "/legal/acceptpolicies",
            &[
                ("acceptedpolicies_uid", uid.as_str()),
                ("acceptedpolicies_termsofuse", "1"),
            ],
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_pending_token_is_read_once() {
    let app = app_helper::setup_app_with_settings(app_helper::TERMS_ONLY).await;
    let user = auth_helper::signup_user(&app.router, "frank", None).await;
    let token = auth_helper::signin_vetoed(&app.router, &user.uname).await;

    // GETで消費されたトークンは再利用できない
    let res = app
        .router
        .clone()
        .oneshot(get_request(
            &format!("/legal/acceptpolicies?login=1&login_token={}", token),
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let uid = user.uid.to_string();
    let res = app
        .router
        .clone()
        .oneshot(auth_helper::form_request(
            "/legal/acceptpolicies",
            &[
                ("acceptedpolicies_uid", uid.as_str()),
                ("acceptedpolicies_termsofuse", "1"),
                ("login_token", token.as_str()),
            ],
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_form_without_pending_login_is_invalid_state() {
    let app = app_helper::setup_app_with_settings(app_helper::TERMS_ONLY).await;

    let res = app
        .router
        .clone()
        .oneshot(get_request(
            "/legal/acceptpolicies?login=1&login_token=unknown",
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = auth_helper::json_body(res).await;
    assert_eq!(body["error_type"], "invalid_state");
}

#[tokio::test]
async fn test_form_without_user_is_invalid_state() {
    let app = app_helper::setup_app_with_settings(app_helper::TERMS_ONLY).await;

    let res = app
        .router
        .clone()
        .oneshot(get_request("/legal/acceptpolicies", None, None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_pending_login_while_authenticated_is_invalid_state() {
    let app = app_helper::setup_app_with_settings(app_helper::TERMS_ONLY).await;
    let member = auth_helper::signup_user(&app.router, "grace", Some(true)).await;
    let access_token = auth_helper::signin_token(&app.router, &member.uname).await;

    let pending_user = auth_helper::signup_user(&app.router, "heidi", None).await;
    let login_token = auth_helper::signin_vetoed(&app.router, &pending_user.uname).await;

    let uid = pending_user.uid.to_string();
    let res = app
        .router
        .clone()
        .oneshot(auth_helper::form_request(
            "/legal/acceptpolicies",
            &[
                ("acceptedpolicies_uid", uid.as_str()),
                ("acceptedpolicies_termsofuse", "1"),
                ("login_token", login_token.as_str()),
            ],
            Some(&access_token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = auth_helper::json_body(res).await;
    assert_eq!(body["error_type"], "invalid_state");
}

#[tokio::test]
async fn test_non_numeric_uid_is_invalid_state() {
    let app = app_helper::setup_app_with_settings(app_helper::TERMS_ONLY).await;
    let user = auth_helper::signup_user(&app.router, "ivan", None).await;
    let token = auth_helper::signin_vetoed(&app.router, &user.uname).await;

    let res = app
        .router
        .clone()
        .oneshot(auth_helper::form_request(
            "/legal/acceptpolicies",
            &[
                ("acceptedpolicies_uid", "abc"),
                ("acceptedpolicies_termsofuse", "1"),
                ("login_token", token.as_str()),
            ],
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = auth_helper::json_body(res).await;
    assert_eq!(body["error_type"], "invalid_state");
}

#[tokio::test]
async fn test_uid_must_match_session() {
    let app = app_helper::setup_app_with_settings(app_helper::TERMS_ONLY).await;
    let user = auth_helper::signup_user(&app.router, "judy", None).await;
    let other = auth_helper::signup_user(&app.router, "mallory", None).await;
    let token = auth_helper::signin_vetoed(&app.router, &user.uname).await;

    let other_uid = other.uid.to_string();
    let res = app
        .router
        .clone()
        .oneshot(auth_helper::form_request(
            "/legal/acceptpolicies",
            &[
                ("acceptedpolicies_uid", other_uid.as_str()),
                ("acceptedpolicies_termsofuse", "1"),
                ("login_token", token.as_str()),
            ],
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let repo = UserAttributeRepository::new(app.db.clone());
    assert!(repo.find_policy_attributes(other.uid).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_logged_in_user_accepts_new_policy() {
    let app = app_helper::setup_app_with_settings(app_helper::TERMS_ONLY).await;
    let user = auth_helper::signup_user(&app.router, "niaj", Some(true)).await;
    let access_token = auth_helper::signin_token(&app.router, &user.uname).await;

    app.set_settings(&[("privacyPolicyActive", "1")]).await;

    let res = app
        .router
        .clone()
        .oneshot(get_request("/legal/acceptpolicies", Some(&access_token), None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = auth_helper::json_body(res).await;
    assert_eq!(body["data"]["login"], false);
    assert_eq!(body["data"]["accepted_policies"]["termsOfUse"], true);
    assert_eq!(body["data"]["accepted_policies"]["privacyPolicy"], false);

    let uid = user.uid.to_string();
    let fields = [
        ("acceptedpolicies_uid", uid.as_str()),
        ("acceptedpolicies_termsofuse", "1"),
        ("acceptedpolicies_privacypolicy", "1"),
    ];

    // 同じ送信を繰り返しても結果は変わらない
    for _ in 0..2 {
        let res = app
            .router
            .clone()
            .oneshot(auth_helper::form_request(
                "/legal/acceptpolicies",
                &fields,
                Some(&access_token),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers()[header::LOCATION], "/");
    }

    let res = auth_helper::signin(&app.router, &user.uname, false).await;
    assert_eq!(res.status(), StatusCode::OK);
}
