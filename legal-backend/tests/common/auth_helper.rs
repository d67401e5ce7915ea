// tests/common/auth_helper.rs

use axum::{
    body::{self, Body},
    http::{header, Request, Response, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

pub const TEST_PASSWORD: &str = "Secure123";

/// テスト用のユーザー情報
#[derive(Debug, Clone)]
pub struct TestUser {
    pub uid: i32,
    pub uname: String,
    pub email: String,
}

pub async fn json_body(res: Response<Body>) -> Value {
    let body = body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .uri(uri)
        .method(method)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let body = body.map_or_else(Body::empty, |value| Body::from(value.to_string()));
    builder.body(body).unwrap()
}

/// application/x-www-form-urlencoded のPOST。値はエンコード不要なものだけを渡す
pub fn form_request(
    uri: &str,
    fields: &[(&str, &str)],
    token: Option<&str>,
    cookie: Option<&str>,
) -> Request<Body> {
    let encoded = fields
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("&");

    let mut builder = Request::builder()
        .uri(uri)
        .method("POST")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(encoded)).unwrap()
}

/// Set-Cookie ヘッダーから指定名の値を取り出す
pub fn set_cookie_value(res: &Response<Body>, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    res.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.strip_prefix(&prefix))
        .map(|rest| rest.split(';').next().unwrap_or_default().to_string())
        .last()
}

/// ユーザー登録し、uidを返す
pub async fn signup_user(app: &Router, uname: &str, consent: Option<bool>) -> TestUser {
    let email = format!("{}@example.com", uname);
    let mut payload = json!({
        "email": email,
        "uname": uname,
        "password": TEST_PASSWORD,
    });
    if let Some(consent) = consent {
        payload["acceptedpolicies_policies"] = json!(consent);
    }

    let res = app
        .clone()
        .oneshot(json_request("POST", "/auth/signup", None, Some(payload)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let body = json_body(res).await;
    TestUser {
        uid: body["data"]["user"]["uid"].as_i64().unwrap() as i32,
        uname: uname.to_string(),
        email,
    }
}

pub async fn signin(app: &Router, identifier: &str, remember_me: bool) -> Response<Body> {
    signin_with_password(app, identifier, TEST_PASSWORD, remember_me).await
}

pub async fn signin_with_password(
    app: &Router,
    identifier: &str,
    password: &str,
    remember_me: bool,
) -> Response<Body> {
    let payload = json!({
        "identifier": identifier,
        "password": password,
        "remember_me": remember_me,
    });

    app.clone()
        .oneshot(json_request("POST", "/auth/signin", None, Some(payload)))
        .await
        .unwrap()
}

/// ログインに成功することを前提にアクセストークンを返す
pub async fn signin_token(app: &Router, identifier: &str) -> String {
    let res = signin(app, identifier, false).await;
    assert_eq!(res.status(), StatusCode::OK);

    let body = json_body(res).await;
    body["data"]["tokens"]["access_token"]
        .as_str()
        .unwrap()
        .to_string()
}

/// ログインが拒否されることを前提に保留トークンを返す
pub async fn signin_vetoed(app: &Router, identifier: &str) -> String {
    let res = signin(app, identifier, false).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let body = json_body(res).await;
    body["login_token"].as_str().unwrap().to_string()
}
