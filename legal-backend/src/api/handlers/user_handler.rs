// src/api/handlers/user_handler.rs
use crate::api::dto::user_dto::UpdateProfileRequest;
use crate::api::AppState;
use crate::error::AppResult;
use crate::middleware::auth::{AuthenticatedUser, MaybeAuthenticatedUser};
use crate::ApiResponse;
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, put},
    Router,
};

/// プロフィールに表示するポリシー承認状況
pub async fn profile_policies_handler(
    State(app_state): State<AppState>,
    Path(uid): Path<i32>,
    viewer: MaybeAuthenticatedUser,
) -> AppResult<impl IntoResponse> {
    let view = app_state
        .user_service
        .profile_policy_view(uid, viewer.uid())
        .await?;

    Ok(Json(ApiResponse::success("Profile policies", view)))
}

/// プロフィール編集フォームのポリシー欄
pub async fn profile_form_handler(
    State(app_state): State<AppState>,
    Path(uid): Path<i32>,
    user: AuthenticatedUser,
) -> AppResult<impl IntoResponse> {
    let form = app_state
        .user_service
        .profile_form(uid, user.claims())
        .await?;

    Ok(Json(ApiResponse::success("Profile form", form)))
}

/// プロフィール更新
pub async fn update_profile_handler(
    State(app_state): State<AppState>,
    Path(uid): Path<i32>,
    user: AuthenticatedUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<impl IntoResponse> {
    let response = app_state
        .user_service
        .update_profile(uid, user.claims(), payload)
        .await?;

    Ok(Json(ApiResponse::success("Profile updated", response)))
}

pub fn user_router(app_state: AppState) -> Router {
    Router::new()
        .route("/users/{uid}/policies", get(profile_policies_handler))
        .route("/users/{uid}/profile/form", get(profile_form_handler))
        .route("/users/{uid}/profile", put(update_profile_handler))
        .with_state(app_state)
}
