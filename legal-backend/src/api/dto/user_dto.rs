// src/api/dto/user_dto.rs

use crate::domain::policy::AcceptancePolicySet;
use crate::domain::user_model::SafeUser;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// プロフィール表示に添えるポリシー承認状況
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfilePolicyView {
    pub active_policies: AcceptancePolicySet<bool>,
    pub viewable_policies: AcceptancePolicySet<bool>,
    pub accepted_policies: AcceptancePolicySet<bool>,
}

/// プロフィール編集フォームのポリシー欄
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileFormView {
    pub uid: i32,
    pub active_policies: AcceptancePolicySet<bool>,
    pub accepted_policies: AcceptancePolicySet<bool>,
    pub user_edit_access: bool,
}

/// プロフィール更新リクエスト
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    /// 省略時はポリシー承認状態を変更しない
    #[serde(default)]
    pub acceptedpolicies_policies: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateProfileResponse {
    pub user: SafeUser,
    pub accepted_policies: AcceptancePolicySet<bool>,
}
