// src/service/legal_service.rs

use crate::db::DbPool;
use crate::domain::policy::{
    AcceptancePolicySet, AttributeChange, LegalDocument, PolicyConfig, UserPolicyRecord,
};
use crate::error::{AppError, AppResult};
use crate::{log_with_context, with_transaction};
use crate::repository::legal_setting_repository::LegalSettingRepository;
use crate::repository::user_attribute_repository::UserAttributeRepository;
use crate::service::policy_reconciler::{self, LoginVeto, SubmissionOutcome};
use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, DbErr};
use std::sync::Arc;

/// How a `/legal/...` document request is answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentResolution {
    /// The document is switched off; show the "not active" placeholder.
    Inactive,
    /// The site points to an external document.
    Redirect(String),
    /// Rendered by the site itself.
    Inline,
}

/// Data needed to display the acceptance form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptanceForm {
    pub uid: i32,
    pub config: PolicyConfig,
    pub active_policies: AcceptancePolicySet<bool>,
    pub original_accepted_policies: AcceptancePolicySet<bool>,
    pub accepted_policies: AcceptancePolicySet<bool>,
}

#[derive(Clone)]
pub struct LegalService {
    db: DbPool,
    setting_repo: Arc<LegalSettingRepository>,
    attribute_repo: Arc<UserAttributeRepository>,
}

impl LegalService {
    pub fn new(db: DbPool) -> Self {
        Self {
            setting_repo: Arc::new(LegalSettingRepository::new(db.clone())),
            attribute_repo: Arc::new(UserAttributeRepository::new(db.clone())),
            db,
        }
    }

    /// 設定ストアから現在のポリシー設定を読み込む
    pub async fn load_policy_config(&self) -> AppResult<PolicyConfig> {
        let settings = self.setting_repo.load_all().await?;
        Ok(PolicyConfig::from_settings(&settings))
    }

    pub async fn get_active_policies(&self) -> AppResult<AcceptancePolicySet<bool>> {
        let config = self.load_policy_config().await?;
        Ok(policy_reconciler::active_policies(&config))
    }

    pub async fn get_user_record(&self, uid: i32) -> AppResult<UserPolicyRecord> {
        let attributes = self.attribute_repo.find_policy_attributes(uid).await?;
        Ok(UserPolicyRecord::from_attributes(uid, &attributes))
    }

    pub async fn get_accepted_policies(&self, uid: i32) -> AppResult<AcceptancePolicySet<bool>> {
        if policy_reconciler::is_exempt(uid) {
            return Ok(AcceptancePolicySet::all(true));
        }
        let record = self.get_user_record(uid).await?;
        Ok(policy_reconciler::accepted_policies(&record))
    }

    pub async fn get_viewable_policies(
        &self,
        uid: i32,
        viewer_uid: Option<i32>,
    ) -> AppResult<AcceptancePolicySet<bool>> {
        let active = self.get_active_policies().await?;
        Ok(policy_reconciler::viewable_policies(&active, uid, viewer_uid))
    }

    /// ログイン可否を判定する
    pub async fn check_login_veto(&self, uid: i32) -> AppResult<LoginVeto> {
        let active = self.get_active_policies().await?;
        if !active.any() {
            return Ok(LoginVeto::allowed());
        }

        let accepted = self.get_accepted_policies(uid).await?;
        let veto = policy_reconciler::evaluate_login_veto(&active, &accepted);

        if veto.blocked {
            log_with_context!(
                tracing::Level::INFO,
                "Login vetoed until policies are accepted",
                "uid" => uid,
                "outstanding" => &veto.outstanding
            );
        }

        Ok(veto)
    }

    /// 承認フォームの表示用データ
    pub async fn acceptance_form(&self, uid: i32) -> AppResult<AcceptanceForm> {
        let config = self.load_policy_config().await?;
        let accepted = self.get_accepted_policies(uid).await?;

        Ok(AcceptanceForm {
            uid,
            active_policies: policy_reconciler::active_policies(&config),
            original_accepted_policies: accepted,
            accepted_policies: accepted,
            config,
        })
    }

    /// 承認フォームの送信を処理する。フィールドエラーがあれば何も保存しない
    pub async fn submit_acceptance(
        &self,
        uid: i32,
        submitted: AcceptancePolicySet<bool>,
    ) -> AppResult<(AcceptanceForm, SubmissionOutcome)> {
        self.submit_acceptance_at(uid, submitted, Utc::now()).await
    }

    pub async fn submit_acceptance_at(
        &self,
        uid: i32,
        submitted: AcceptancePolicySet<bool>,
        now: DateTime<Utc>,
    ) -> AppResult<(AcceptanceForm, SubmissionOutcome)> {
        let config = self.load_policy_config().await?;
        let active = policy_reconciler::active_policies(&config);
        let original = self.get_accepted_policies(uid).await?;

        let outcome =
            policy_reconciler::reconcile_submission(uid, &config, &original, &submitted, now);

        if outcome.has_errors() {
            log_with_context!(
                tracing::Level::INFO,
                "Policy acceptance rejected",
                "uid" => uid,
                "fields" => outcome.field_errors.keys().collect::<Vec<_>>()
            );
        } else if !outcome.changes.is_empty() {
            self.persist_changes(outcome.changes.clone()).await?;
            log_with_context!(
                tracing::Level::INFO,
                "Policy acceptance recorded",
                "uid" => uid,
                "slots" => outcome.changes.iter().map(|c| c.slot()).collect::<Vec<_>>()
            );
        }

        let form = AcceptanceForm {
            uid,
            active_policies: active,
            original_accepted_policies: original,
            accepted_policies: outcome.accepted_policies,
            config,
        };

        Ok((form, outcome))
    }

    /// プロフィール編集フォームの同意チェックを反映する。呼び出し側のトランザクション内で実行する
    pub async fn apply_profile_consent<C>(
        conn: &C,
        uid: i32,
        active: &AcceptancePolicySet<bool>,
        consent: Option<bool>,
    ) -> Result<Vec<AttributeChange>, DbErr>
    where
        C: ConnectionTrait,
    {
        let changes = policy_reconciler::reconcile_profile_edit(uid, active, consent, Utc::now());
        UserAttributeRepository::apply_changes(conn, &changes).await?;
        Ok(changes)
    }

    /// 文書ページの表示方法を決める
    pub async fn resolve_document(&self, document: LegalDocument) -> AppResult<DocumentResolution> {
        let config = self.load_policy_config().await?;
        Ok(resolve_document(&config, document))
    }

    /// `/legal` のリダイレクト先
    pub async fn main_document_url(&self) -> AppResult<String> {
        let config = self.load_policy_config().await?;
        Ok(config
            .custom_url(LegalDocument::TermsOfUse)
            .map(str::to_string)
            .unwrap_or_else(|| format!("/legal/{}", LegalDocument::TermsOfUse.slug())))
    }

    async fn persist_changes(&self, changes: Vec<AttributeChange>) -> AppResult<()> {
        with_transaction!(self.db, |txn| async move {
            UserAttributeRepository::apply_changes(txn, &changes)
                .await
                .map_err(AppError::from)
        })
    }
}

fn resolve_document(config: &PolicyConfig, document: LegalDocument) -> DocumentResolution {
    if !config.is_document_active(document) {
        return DocumentResolution::Inactive;
    }
    match config.custom_url(document) {
        Some(url) => DocumentResolution::Redirect(url.to_string()),
        None => DocumentResolution::Inline,
    }
}
