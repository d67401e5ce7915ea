// src/middleware/auth.rs

use crate::api::CookieConfig;
use crate::domain::user_model::UserClaims;
use crate::error::AppError;
use crate::utils::jwt::{JwtError, JwtManager};
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use axum_extra::extract::cookie::CookieJar;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, warn};

/// JWT マネージャーを提供するトレイト
pub trait HasJwtManager {
    fn jwt_manager(&self) -> &Arc<JwtManager>;
    fn cookie_config(&self) -> &CookieConfig;
}

/// 認証済みユーザー情報抽出器
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub UserClaims);

impl AuthenticatedUser {
    pub fn uid(&self) -> i32 {
        self.0.uid
    }

    pub fn claims(&self) -> &UserClaims {
        &self.0
    }
}

/// 未ログインでも拒否しない抽出器
#[derive(Debug, Clone, Default)]
pub struct MaybeAuthenticatedUser(pub Option<UserClaims>);

impl MaybeAuthenticatedUser {
    pub fn uid(&self) -> Option<i32> {
        self.0.as_ref().map(|claims| claims.uid)
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: HasJwtManager + Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers, &state.cookie_config().access_token_name)
            .ok_or_else(|| {
                warn!("Authentication attempt without token");
                AppError::Unauthorized("Missing authentication token".to_string())
            })?;

        let claims = verify(state.jwt_manager(), &token)?;
        debug!(uid = claims.uid, "User authenticated");

        Ok(AuthenticatedUser(claims))
    }
}

impl<S> FromRequestParts<S> for MaybeAuthenticatedUser
where
    S: HasJwtManager + Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // 無効なトークンは未ログインとして扱う
        let claims = extract_token(&parts.headers, &state.cookie_config().access_token_name)
            .and_then(|token| verify(state.jwt_manager(), &token).ok());

        Ok(MaybeAuthenticatedUser(claims))
    }
}

fn verify(jwt_manager: &JwtManager, token: &str) -> Result<UserClaims, AppError> {
    let access_claims = jwt_manager.verify_access_token(token).map_err(|e| {
        warn!(error = %e, "JWT verification failed");
        match e {
            JwtError::TokenExpired => {
                AppError::Unauthorized("Access token has expired".to_string())
            }
            JwtError::InvalidToken => AppError::Unauthorized("Invalid access token".to_string()),
            _ => AppError::Unauthorized("Authentication failed".to_string()),
        }
    })?;

    Ok(access_claims.user)
}

/// Authorization ヘッダー、なければCookieからトークンを取り出す
fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|auth_str| auth_str.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty());

    auth_header.or_else(|| {
        CookieJar::from_headers(headers)
            .get(cookie_name)
            .map(|cookie| cookie.value().to_string())
    })
}
