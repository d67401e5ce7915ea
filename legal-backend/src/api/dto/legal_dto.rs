// src/api/dto/legal_dto.rs

use crate::domain::policy::{parse_flag, AcceptancePolicySet, LegalDocument};
use crate::service::legal_service::AcceptanceForm;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// チェックボックスの値。"1" / "true" / "on" / "yes" のみを真とする
pub fn is_checked(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "on" | "yes"
    )
}

fn deserialize_checkbox<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.as_deref().is_some_and(is_checked))
}

// --- リクエストDTO ---

/// `GET /legal/acceptpolicies` のクエリ
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AcceptPoliciesQuery {
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub login_token: Option<String>,
}

impl AcceptPoliciesQuery {
    pub fn is_login(&self) -> bool {
        self.login.as_deref().is_some_and(parse_flag)
    }
}

/// `POST /legal/acceptpolicies` のフォーム
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AcceptPoliciesForm {
    #[serde(default)]
    pub acceptedpolicies_uid: Option<String>,
    #[serde(default, deserialize_with = "deserialize_checkbox")]
    pub acceptedpolicies_termsofuse: bool,
    #[serde(default, deserialize_with = "deserialize_checkbox")]
    pub acceptedpolicies_privacypolicy: bool,
    #[serde(default, deserialize_with = "deserialize_checkbox")]
    pub acceptedpolicies_agepolicy: bool,
    #[serde(default, deserialize_with = "deserialize_checkbox")]
    pub acceptedpolicies_cancellationrightpolicy: bool,
    #[serde(default, deserialize_with = "deserialize_checkbox")]
    pub acceptedpolicies_tradeconditions: bool,
    #[serde(default)]
    pub login_token: Option<String>,
}

impl AcceptPoliciesForm {
    /// 数値でないuidはNone
    pub fn policies_uid(&self) -> Option<i32> {
        self.acceptedpolicies_uid
            .as_deref()
            .map(str::trim)
            .filter(|uid| !uid.is_empty())
            .and_then(|uid| uid.parse().ok())
    }

    pub fn submitted_policies(&self) -> AcceptancePolicySet<bool> {
        AcceptancePolicySet {
            terms_of_use: self.acceptedpolicies_termsofuse,
            privacy_policy: self.acceptedpolicies_privacypolicy,
            age_policy: self.acceptedpolicies_agepolicy,
            cancellation_right_policy: self.acceptedpolicies_cancellationrightpolicy,
            trade_conditions: self.acceptedpolicies_tradeconditions,
        }
    }
}

// --- レスポンスDTO ---

/// 承認フォームの表示データ
#[derive(Debug, Clone, Serialize)]
pub struct AcceptPoliciesView {
    pub login: bool,
    pub policies_uid: i32,
    pub active_policies: AcceptancePolicySet<bool>,
    pub accepted_policies: AcceptancePolicySet<bool>,
    pub original_accepted_policies: AcceptancePolicySet<bool>,
    pub minimum_age: u32,
    pub field_errors: BTreeMap<&'static str, String>,
    /// ログインフロー継続用の新しいトークン
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_token: Option<String>,
}

impl AcceptPoliciesView {
    pub fn new(form: AcceptanceForm, login: bool) -> Self {
        Self {
            login,
            policies_uid: form.uid,
            active_policies: form.active_policies,
            accepted_policies: form.accepted_policies,
            original_accepted_policies: form.original_accepted_policies,
            minimum_age: form.config.minimum_age,
            field_errors: BTreeMap::new(),
            login_token: None,
        }
    }

    pub fn with_field_errors(mut self, field_errors: BTreeMap<&'static str, String>) -> Self {
        self.field_errors = field_errors;
        self
    }

    pub fn with_login_token(mut self, token: Option<String>) -> Self {
        self.login_token = token;
        self
    }
}

/// 承認フォーム送信時のフィールドエラー
#[derive(Debug, Clone, Serialize)]
pub struct AcceptPoliciesErrorResponse {
    pub success: bool,
    pub message: String,
    pub error_type: String,
    pub validation_errors: BTreeMap<String, Vec<String>>,
    pub form: AcceptPoliciesView,
}

impl AcceptPoliciesErrorResponse {
    pub fn new(form: AcceptPoliciesView) -> Self {
        let validation_errors = form
            .field_errors
            .iter()
            .map(|(field, message)| (field.to_string(), vec![message.clone()]))
            .collect();

        Self {
            success: false,
            message: "You must accept the required policies in order to proceed".to_string(),
            error_type: "validation_errors".to_string(),
            validation_errors,
            form,
        }
    }
}

/// 文書ページのレスポンス
#[derive(Debug, Clone, Serialize)]
pub struct LegalDocumentResponse {
    pub document: LegalDocument,
    pub active: bool,
    /// 描画に使うテンプレート名
    pub template: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LegalDocumentResponse {
    pub fn inline(document: LegalDocument) -> Self {
        Self {
            document,
            active: true,
            template: format!("legal/{}", document.slug()),
            message: None,
        }
    }

    pub fn inactive(document: LegalDocument) -> Self {
        Self {
            document,
            active: false,
            template: "legal/policynotactive".to_string(),
            message: Some("This policy is not currently in effect on this site.".to_string()),
        }
    }
}
