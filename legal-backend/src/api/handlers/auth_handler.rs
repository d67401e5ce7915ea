// src/api/handlers/auth_handler.rs
use crate::api::dto::auth_dto::{AccessToken, SigninOutcome, SigninRequest, SignupRequest};
use crate::api::{AppState, CookieConfig};
use crate::error::AppResult;
use crate::ApiResponse;
use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::info;

// --- 認証ハンドラー ---

/// ユーザー登録
pub async fn signup_handler(
    State(app_state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> AppResult<impl IntoResponse> {
    info!(uname = %payload.uname, "User signup attempt");

    let response = app_state.auth_service.signup(payload).await?;
    let message = response.message.clone();

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(message, response)),
    ))
}

/// ログイン。未承認ポリシーがあれば403と保留トークンを返す
pub async fn signin_handler(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<SigninRequest>,
) -> AppResult<Response> {
    info!(identifier = %payload.identifier, "User signin attempt");

    match app_state.auth_service.signin(payload).await? {
        SigninOutcome::Authenticated(auth_response) => {
            let jar = jar.add(access_token_cookie(
                &auth_response.tokens,
                &app_state.cookie_config,
            ));
            let message = auth_response.message.clone();
            Ok((jar, Json(ApiResponse::success(message, auth_response))).into_response())
        }
        SigninOutcome::PolicyAcceptanceRequired(veto) => {
            let jar = jar.add(pending_login_cookie(
                &veto.login_token,
                &app_state.cookie_config,
                app_state.config.pending_login.ttl_seconds,
            ));
            Ok((StatusCode::FORBIDDEN, jar, Json(veto)).into_response())
        }
    }
}

// --- Cookie ヘルパー ---

pub(crate) fn access_token_cookie(tokens: &AccessToken, config: &CookieConfig) -> Cookie<'static> {
    Cookie::build((config.access_token_name.clone(), tokens.access_token.clone()))
        .path(config.path.clone())
        .secure(config.secure)
        .http_only(config.http_only)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::seconds(tokens.expires_in))
        .build()
}

pub(crate) fn pending_login_cookie(
    token: &str,
    config: &CookieConfig,
    ttl_seconds: i64,
) -> Cookie<'static> {
    Cookie::build((config.pending_login_name.clone(), token.to_string()))
        .path(config.pending_login_path.clone())
        .secure(config.secure)
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(ttl_seconds))
        .build()
}

/// 保留ログインCookieを削除する
pub(crate) fn expired_pending_login_cookie(config: &CookieConfig) -> Cookie<'static> {
    Cookie::build((config.pending_login_name.clone(), ""))
        .path(config.pending_login_path.clone())
        .secure(config.secure)
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(0))
        .build()
}

// --- ルーター ---

pub fn auth_router(app_state: AppState) -> Router {
    Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/signin", post(signin_handler))
        .with_state(app_state)
}
