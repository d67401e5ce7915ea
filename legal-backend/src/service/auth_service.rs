// src/service/auth_service.rs

use crate::api::dto::auth_dto::{
    AccessToken, AuthResponse, PolicyVetoResponse, SigninOutcome, SigninRequest, SignupRequest,
    SignupResponse,
};
use crate::db::DbPool;
use crate::domain::user_model::{self, UserClaims};
use crate::error::{AppError, AppResult};
use crate::repository::user_repository::{CreateUser, UserRepository};
use crate::service::legal_service::LegalService;
use crate::service::pending_login_service::{PendingLogin, PendingLoginService};
use crate::utils::error_helper::{
    conflict_error, convert_validation_errors, internal_server_error,
};
use crate::utils::jwt::JwtManager;
use crate::utils::password::PasswordManager;
use crate::utils::transaction::TransactionManager;
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

#[derive(Clone)]
pub struct AuthService {
    db: DbPool,
    user_repo: Arc<UserRepository>,
    legal_service: Arc<LegalService>,
    pending_logins: Arc<PendingLoginService>,
    password_manager: Arc<PasswordManager>,
    jwt_manager: Arc<JwtManager>,
}

impl AuthService {
    pub fn new(
        db: DbPool,
        legal_service: Arc<LegalService>,
        pending_logins: Arc<PendingLoginService>,
        password_manager: Arc<PasswordManager>,
        jwt_manager: Arc<JwtManager>,
    ) -> Self {
        Self {
            user_repo: Arc::new(UserRepository::new(db.clone())),
            db,
            legal_service,
            pending_logins,
            password_manager,
            jwt_manager,
        }
    }

    /// ユーザー登録。同意チェックはプロフィール編集と同じ規則で記録する
    pub async fn signup(&self, signup_data: SignupRequest) -> AppResult<SignupResponse> {
        signup_data
            .validate()
            .map_err(|e| convert_validation_errors(e, "auth_service::signup"))?;

        if self.user_repo.is_email_taken(&signup_data.email, None).await? {
            return Err(conflict_error(
                "email address is already registered",
                "auth_service::signup",
            ));
        }

        if self.user_repo.is_uname_taken(&signup_data.uname).await? {
            return Err(conflict_error(
                "username is already taken",
                "auth_service::signup",
            ));
        }

        let password_hash = self
            .password_manager
            .hash_password(&signup_data.password)
            .map_err(|e| {
                internal_server_error(e, "auth_service::signup", "Registration failed")
            })?;

        let active = self.legal_service.get_active_policies().await?;
        let consent = signup_data.acceptedpolicies_policies;
        let create_user = CreateUser {
            uname: signup_data.uname,
            email: signup_data.email,
            password_hash,
        };

        let user = self
            .db
            .execute_in_transaction(move |txn| {
                Box::pin(async move {
                    let user = UserRepository::create(txn, create_user).await?;
                    LegalService::apply_profile_consent(txn, user.uid, &active, consent).await?;
                    Ok::<_, AppError>(user)
                })
            })
            .await?;

        info!(
            uid = user.uid,
            uname = %user.uname,
            policies_accepted = ?consent,
            "User registered successfully"
        );

        Ok(SignupResponse {
            user: user.into(),
            message: "Registration successful".to_string(),
        })
    }

    /// ログイン。未承認のポリシーがあればログインを保留する
    pub async fn signin(&self, signin_data: SigninRequest) -> AppResult<SigninOutcome> {
        signin_data
            .validate()
            .map_err(|e| convert_validation_errors(e, "auth_service::signin"))?;

        let user = self
            .user_repo
            .find_by_email_or_uname(&signin_data.identifier)
            .await?
            .ok_or_else(|| {
                warn!("Login attempt with unknown identifier");
                AppError::Unauthorized("Invalid credentials".to_string())
            })?;

        if !user.can_authenticate() {
            warn!(uid = user.uid, "Login attempt for inactive account");
            return Err(AppError::Unauthorized("Account is inactive".to_string()));
        }

        let is_valid = self
            .password_manager
            .verify_password(&signin_data.password, &user.password_hash)
            .map_err(|e| {
                internal_server_error(e, "auth_service::signin", "Authentication failed")
            })?;

        if !is_valid {
            warn!(uid = user.uid, "Login attempt with incorrect password");
            return Err(AppError::Unauthorized("Invalid credentials".to_string()));
        }

        let veto = self.legal_service.check_login_veto(user.uid).await?;
        if veto.blocked {
            let login_token = self
                .pending_logins
                .stash(user.uid, signin_data.remember_me)
                .await;

            // 拒否されたログインは決して認証成功にしない
            return PolicyVetoResponse::from_veto(veto, login_token)
                .map(SigninOutcome::PolicyAcceptanceRequired)
                .ok_or_else(|| {
                    AppError::InvalidState("blocked login veto carried no reason".to_string())
                });
        }

        let response = self
            .issue_login(user, signin_data.remember_me, "Login successful")
            .await?;
        Ok(SigninOutcome::Authenticated(response))
    }

    /// ポリシー承認後に保留中のログインを完了する
    pub async fn complete_pending_login(&self, pending: PendingLogin) -> AppResult<AuthResponse> {
        let user = self
            .user_repo
            .find_by_id(pending.uid)
            .await?
            .ok_or_else(|| {
                AppError::InvalidState("pending login user no longer exists".to_string())
            })?;

        if !user.can_authenticate() {
            return Err(AppError::Unauthorized("Account is inactive".to_string()));
        }

        self.issue_login(user, pending.remember_me, "Login successful")
            .await
    }

    async fn issue_login(
        &self,
        user: user_model::Model,
        remember_me: bool,
        message: &str,
    ) -> AppResult<AuthResponse> {
        let access_token = self
            .jwt_manager
            .generate_access_token(UserClaims::from(&user), remember_me)
            .map_err(|e| {
                internal_server_error(e, "auth_service::issue_login", "Authentication failed")
            })?;

        self.user_repo.update_last_login(user.uid).await?;

        info!(uid = user.uid, remember_me, "User signed in successfully");

        Ok(AuthResponse {
            user: user.into(),
            tokens: AccessToken {
                access_token,
                token_type: "Bearer".to_string(),
                expires_in: self.jwt_manager.token_lifetime(remember_me).num_seconds(),
            },
            message: message.to_string(),
        })
    }
}
