// src/api/dto/auth_dto.rs

use crate::domain::policy::PolicySlot;
use crate::domain::user_model::SafeUser;
use crate::service::policy_reconciler::LoginVeto;
use crate::utils::validation;
use serde::{Deserialize, Serialize};
use validator::Validate;

// --- リクエストDTO ---

/// ユーザー登録リクエスト
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(
        length(
            min = validation::uname::MIN_LENGTH,
            max = validation::uname::MAX_LENGTH,
            message = "Username must be between 3 and 50 characters"
        ),
        custom(function = validation::validate_uname)
    )]
    pub uname: String,

    #[validate(
        length(
            min = validation::password::MIN_LENGTH,
            message = "Password must be at least 8 characters"
        ),
        custom(function = validation::validate_password_strength)
    )]
    pub password: String,

    /// 登録フォームの「ポリシーに同意する」チェック。省略時は何も記録しない
    #[serde(default)]
    pub acceptedpolicies_policies: Option<bool>,
}

/// ログインリクエスト
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SigninRequest {
    #[validate(length(min = 1, message = "Email or username is required"))]
    pub identifier: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    #[serde(default, alias = "rememberme")]
    pub remember_me: bool,
}

// --- レスポンスDTO ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
    /// 秒
    pub expires_in: i64,
}

/// 認証レスポンス
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub user: SafeUser,
    pub tokens: AccessToken,
    pub message: String,
}

/// 登録レスポンス。トークンはログイン時に発行する
#[derive(Debug, Clone, Serialize)]
pub struct SignupResponse {
    pub user: SafeUser,
    pub message: String,
}

/// ポリシー未承認によるログイン拒否
#[derive(Debug, Clone, Serialize)]
pub struct PolicyVetoResponse {
    pub success: bool,
    pub error_type: String,
    pub message: String,
    pub redirect_url: String,
    /// `/legal/acceptpolicies` に渡す一度きりのトークン
    pub login_token: String,
    pub outstanding_policies: Vec<PolicySlot>,
}

impl PolicyVetoResponse {
    /// ログインが拒否されていなければNone
    pub fn from_veto(veto: LoginVeto, login_token: String) -> Option<Self> {
        Some(Self {
            success: false,
            error_type: veto.reason()?.to_string(),
            message: veto.message()?.to_string(),
            redirect_url: veto.redirect_url()?.to_string(),
            login_token,
            outstanding_policies: veto.outstanding,
        })
    }
}

/// ログイン結果
#[derive(Debug, Clone)]
pub enum SigninOutcome {
    Authenticated(AuthResponse),
    PolicyAcceptanceRequired(PolicyVetoResponse),
}
