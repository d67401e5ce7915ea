// src/api/mod.rs
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::logging::{inject_request_context, logging_middleware};
use crate::middleware::auth::HasJwtManager;
use crate::service::{
    auth_service::AuthService, legal_service::LegalService,
    pending_login_service::PendingLoginService, user_service::UserService,
};
use crate::utils::error_helper::internal_server_error;
use crate::utils::jwt::JwtManager;
use crate::utils::password::{PasswordManager, PasswordPolicy};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod dto;
pub mod handlers;

/// 統一されたアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub user_service: Arc<UserService>,
    pub legal_service: Arc<LegalService>,
    pub pending_login_service: Arc<PendingLoginService>,
    pub jwt_manager: Arc<JwtManager>,
    pub cookie_config: CookieConfig,
    pub config: Arc<AppConfig>,
}

/// Cookie設定
#[derive(Clone, Debug)]
pub struct CookieConfig {
    pub access_token_name: String,
    pub pending_login_name: String,
    pub secure: bool,
    pub http_only: bool,
    pub path: String,
    /// 保留ログインCookieは承認フォームにだけ送る
    pub pending_login_path: String,
}

impl CookieConfig {
    pub fn from_app_config(app_config: &AppConfig) -> Self {
        Self {
            access_token_name: "access_token".to_string(),
            pending_login_name: app_config.pending_login.cookie_name.clone(),
            secure: app_config.security.cookie_secure,
            http_only: true,
            path: "/".to_string(),
            pending_login_path: "/legal".to_string(),
        }
    }
}

impl AppState {
    pub fn new(
        auth_service: Arc<AuthService>,
        user_service: Arc<UserService>,
        legal_service: Arc<LegalService>,
        pending_login_service: Arc<PendingLoginService>,
        jwt_manager: Arc<JwtManager>,
        app_config: &AppConfig,
    ) -> Self {
        Self {
            auth_service,
            user_service,
            legal_service,
            pending_login_service,
            jwt_manager,
            cookie_config: CookieConfig::from_app_config(app_config),
            config: Arc::new(app_config.clone()),
        }
    }
}

impl AppState {
    /// データベース接続から全サービスを組み立てる
    pub fn build(db: DbPool, app_config: &AppConfig) -> AppResult<Self> {
        let jwt_manager = Arc::new(JwtManager::new(app_config.jwt.clone()).map_err(|e| {
            internal_server_error(e, "api::AppState::build", "Failed to initialize JWT")
        })?);
        let password_manager = Arc::new(
            PasswordManager::new(app_config.argon2.clone(), PasswordPolicy::default()).map_err(
                |e| internal_server_error(e, "api::AppState::build", "Failed to initialize Argon2"),
            )?,
        );

        let legal_service = Arc::new(LegalService::new(db.clone()));
        let pending_login_service = Arc::new(PendingLoginService::new(&app_config.pending_login));
        let auth_service = Arc::new(AuthService::new(
            db.clone(),
            legal_service.clone(),
            pending_login_service.clone(),
            password_manager,
            jwt_manager.clone(),
        ));
        let user_service = Arc::new(UserService::new(db, legal_service.clone()));

        Ok(Self::new(
            auth_service,
            user_service,
            legal_service,
            pending_login_service,
            jwt_manager,
            app_config,
        ))
    }
}

impl HasJwtManager for AppState {
    fn jwt_manager(&self) -> &Arc<JwtManager> {
        &self.jwt_manager
    }

    fn cookie_config(&self) -> &CookieConfig {
        &self.cookie_config
    }
}

/// 全ルーターをまとめ、ロギング層を付ける
pub fn create_app_router(app_state: AppState) -> Router {
    Router::new()
        .merge(handlers::auth_handler::auth_router(app_state.clone()))
        .merge(handlers::legal_handler::legal_router(app_state.clone()))
        .merge(handlers::user_handler::user_router(app_state))
        .layer(axum::middleware::from_fn(logging_middleware))
        .layer(axum::middleware::from_fn(inject_request_context))
        .layer(TraceLayer::new_for_http())
}
