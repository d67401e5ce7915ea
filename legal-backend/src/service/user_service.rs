// src/service/user_service.rs

use crate::api::dto::user_dto::{
    ProfileFormView, ProfilePolicyView, UpdateProfileRequest, UpdateProfileResponse,
};
use crate::db::DbPool;
use crate::domain::user_model::{self, UserClaims};
use crate::error::{AppError, AppResult};
use crate::repository::user_repository::UserRepository;
use crate::service::legal_service::LegalService;
use crate::utils::error_helper::{
    conflict_error, convert_validation_errors, forbidden_error, not_found_error,
};
use crate::utils::transaction::TransactionManager;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

#[derive(Clone)]
pub struct UserService {
    db: DbPool,
    user_repo: Arc<UserRepository>,
    legal_service: Arc<LegalService>,
}

impl UserService {
    pub fn new(db: DbPool, legal_service: Arc<LegalService>) -> Self {
        Self {
            user_repo: Arc::new(UserRepository::new(db.clone())),
            db,
            legal_service,
        }
    }

    /// プロフィール表示用のポリシー承認状況。表示するものがなければNone
    pub async fn profile_policy_view(
        &self,
        uid: i32,
        viewer_uid: Option<i32>,
    ) -> AppResult<Option<ProfilePolicyView>> {
        self.find_user(uid).await?;

        let viewable = self
            .legal_service
            .get_viewable_policies(uid, viewer_uid)
            .await?;
        if !viewable.any() {
            return Ok(None);
        }

        let active = self.legal_service.get_active_policies().await?;
        let accepted = self.legal_service.get_accepted_policies(uid).await?;
        Ok(Some(ProfilePolicyView {
            active_policies: active,
            viewable_policies: viewable,
            accepted_policies: accepted,
        }))
    }

    /// プロフィール編集フォームに追加するポリシー欄
    pub async fn profile_form(
        &self,
        uid: i32,
        viewer: &UserClaims,
    ) -> AppResult<Option<ProfileFormView>> {
        self.find_user(uid).await?;

        let active = self.legal_service.get_active_policies().await?;
        if !active.any() {
            return Ok(None);
        }

        let accepted = self.legal_service.get_accepted_policies(uid).await?;
        Ok(Some(ProfileFormView {
            uid,
            active_policies: active,
            accepted_policies: accepted,
            user_edit_access: can_edit(uid, viewer),
        }))
    }

    /// プロフィールを更新し、同意チェックに従ってポリシー承認を記録・取り消す
    pub async fn update_profile(
        &self,
        uid: i32,
        viewer: &UserClaims,
        request: UpdateProfileRequest,
    ) -> AppResult<UpdateProfileResponse> {
        if !can_edit(uid, viewer) {
            return Err(forbidden_error(
                "You cannot edit this profile",
                "user_service::update_profile",
                Some(viewer.uid),
            ));
        }

        request
            .validate()
            .map_err(|e| convert_validation_errors(e, "user_service::update_profile"))?;

        let user = self.find_user(uid).await?;

        let email = request.email.filter(|email| *email != user.email);
        if let Some(email) = &email {
            if self.user_repo.is_email_taken(email, Some(uid)).await? {
                return Err(conflict_error(
                    "email address is already registered",
                    "user_service::update_profile",
                ));
            }
        }

        let active = self.legal_service.get_active_policies().await?;
        let consent = request.acceptedpolicies_policies;

        let user = self
            .db
            .execute_in_transaction(move |txn| {
                Box::pin(async move {
                    let user = match email {
                        Some(email) => UserRepository::update_email(txn, user, email).await?,
                        None => user,
                    };
                    LegalService::apply_profile_consent(txn, uid, &active, consent).await?;
                    Ok::<_, AppError>(user)
                })
            })
            .await?;

        info!(
            uid,
            editor_uid = viewer.uid,
            policies_accepted = ?consent,
            "Profile updated"
        );

        let accepted = self.legal_service.get_accepted_policies(uid).await?;
        Ok(UpdateProfileResponse {
            user: user.into(),
            accepted_policies: accepted,
        })
    }

    async fn find_user(&self, uid: i32) -> AppResult<user_model::Model> {
        self.user_repo
            .find_by_id(uid)
            .await?
            .ok_or_else(|| not_found_error("User", &uid.to_string(), "user_service"))
    }
}

/// 本人またはサイト管理者のみ編集できる
fn can_edit(uid: i32, viewer: &UserClaims) -> bool {
    viewer.uid == uid || viewer.is_site_admin()
}
