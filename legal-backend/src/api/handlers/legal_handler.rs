// src/api/handlers/legal_handler.rs
use crate::api::dto::legal_dto::{
    AcceptPoliciesErrorResponse, AcceptPoliciesForm, AcceptPoliciesQuery, AcceptPoliciesView,
    LegalDocumentResponse,
};
use crate::api::handlers::auth_handler::{
    access_token_cookie, expired_pending_login_cookie, pending_login_cookie,
};
use crate::api::AppState;
use crate::domain::policy::LegalDocument;
use crate::error::{AppError, AppResult};
use crate::log_with_context;
use crate::middleware::auth::MaybeAuthenticatedUser;
use crate::service::legal_service::DocumentResolution;
use crate::service::pending_login_service::PendingLogin;
use crate::utils::error_helper::{forbidden_error, not_found_error, unauthorized_error};
use crate::ApiResponse;
use axum::{
    extract::{Form, Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use axum_extra::extract::cookie::CookieJar;

// --- 文書ページ ---

/// `/legal` は利用規約へ
pub async fn legal_index_handler(State(app_state): State<AppState>) -> AppResult<Redirect> {
    let url = app_state.legal_service.main_document_url().await?;
    Ok(Redirect::to(&url))
}

/// 旧パス
pub async fn legacy_privacy_handler() -> Redirect {
    Redirect::permanent(&format!("/legal/{}", LegalDocument::PrivacyPolicy.slug()))
}

pub async fn document_handler(
    State(app_state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Response> {
    let document = LegalDocument::from_slug(&slug)
        .ok_or_else(|| not_found_error("Legal document", &slug, "legal_handler::document"))?;

    let response = match app_state.legal_service.resolve_document(document).await? {
        DocumentResolution::Inactive => {
            Json(LegalDocumentResponse::inactive(document)).into_response()
        }
        DocumentResolution::Redirect(url) => Redirect::to(&url).into_response(),
        DocumentResolution::Inline => {
            Json(LegalDocumentResponse::inline(document)).into_response()
        }
    };
    Ok(response)
}

// --- ポリシー承認フォーム ---

/// 承認フォームの表示
pub async fn accept_policies_form_handler(
    State(app_state): State<AppState>,
    Query(query): Query<AcceptPoliciesQuery>,
    user: MaybeAuthenticatedUser,
    jar: CookieJar,
) -> AppResult<Response> {
    // 保留ログインは読んだ時点で破棄する
    let pending = take_pending_login(&app_state, &jar, query.login_token.as_deref()).await;

    if query.is_login() {
        let pending = pending.ok_or_else(|| {
            AppError::InvalidState("acceptance form requested without a pending login".to_string())
        })?;

        let form = app_state.legal_service.acceptance_form(pending.uid).await?;
        let (jar, token) = restash(&app_state, jar, &pending).await;
        let view = AcceptPoliciesView::new(form, true).with_login_token(Some(token));

        return Ok((jar, Json(ApiResponse::success("Accept policies", view))).into_response());
    }

    let uid = user.uid().ok_or_else(|| {
        AppError::InvalidState("acceptance form requested without a user".to_string())
    })?;

    let form = app_state.legal_service.acceptance_form(uid).await?;
    let view = AcceptPoliciesView::new(form, false);
    Ok(Json(ApiResponse::success("Accept policies", view)).into_response())
}

/// 承認フォームの送信
pub async fn accept_policies_submit_handler(
    State(app_state): State<AppState>,
    user: MaybeAuthenticatedUser,
    jar: CookieJar,
    Form(form): Form<AcceptPoliciesForm>,
) -> AppResult<Response> {
    let pending = take_pending_login(&app_state, &jar, form.login_token.as_deref()).await;
    let jar = jar.add(expired_pending_login_cookie(&app_state.cookie_config));

    let expected_uid = match (&pending, user.uid()) {
        (None, None) => {
            return Err(unauthorized_error(
                "You must be logged in to accept policies",
                "legal_handler::accept_policies",
            ));
        }
        (Some(_), Some(_)) => {
            return Err(AppError::InvalidState(
                "pending login submitted by an authenticated user".to_string(),
            ));
        }
        (Some(pending), None) => pending.uid,
        (None, Some(uid)) => uid,
    };

    let uid = form.policies_uid().ok_or_else(|| {
        AppError::InvalidState("missing or non-numeric acceptedpolicies_uid".to_string())
    })?;

    if uid != expected_uid {
        return Err(forbidden_error(
            "You cannot accept policies for another user",
            "legal_handler::accept_policies",
            Some(expected_uid),
        ));
    }

    let (acceptance_form, outcome) = app_state
        .legal_service
        .submit_acceptance(uid, form.submitted_policies())
        .await?;

    if outcome.has_errors() {
        let (jar, token) = match &pending {
            Some(pending) => {
                let (jar, token) = restash(&app_state, jar, pending).await;
                (jar, Some(token))
            }
            None => (jar, None),
        };

        let view = AcceptPoliciesView::new(acceptance_form, pending.is_some())
            .with_field_errors(outcome.field_errors)
            .with_login_token(token);

        return Ok((
            StatusCode::BAD_REQUEST,
            jar,
            Json(AcceptPoliciesErrorResponse::new(view)),
        )
            .into_response());
    }

    match pending {
        Some(pending) => {
            let auth_response = app_state.auth_service.complete_pending_login(pending).await?;
            let jar = jar.add(access_token_cookie(
                &auth_response.tokens,
                &app_state.cookie_config,
            ));
            Ok((
                jar,
                Json(ApiResponse::success("Policies accepted", auth_response)),
            )
                .into_response())
        }
        None => Ok((jar, Redirect::to(&app_state.config.homepage_url)).into_response()),
    }
}

/// Cookie、なければリクエストで渡されたトークンで保留ログインを取り出す
async fn take_pending_login(
    app_state: &AppState,
    jar: &CookieJar,
    fallback_token: Option<&str>,
) -> Option<PendingLogin> {
    let cookie_token = jar
        .get(&app_state.cookie_config.pending_login_name)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty());

    let tokens = cookie_token
        .into_iter()
        .chain(fallback_token.map(str::to_string));

    for token in tokens {
        if let Some(pending) = app_state.pending_login_service.take(&token).await {
            return Some(pending);
        }
    }
    None
}

/// フォーム再表示のため保留ログインを新しいトークンで登録し直す
async fn restash(
    app_state: &AppState,
    jar: CookieJar,
    pending: &PendingLogin,
) -> (CookieJar, String) {
    let token = app_state
        .pending_login_service
        .restash(pending.clone())
        .await;

    log_with_context!(
        tracing::Level::DEBUG,
        "Pending login carried over",
        "uid" => pending.uid
    );

    let jar = jar.add(pending_login_cookie(
        &token,
        &app_state.cookie_config,
        app_state.config.pending_login.ttl_seconds,
    ));
    (jar, token)
}

// --- ルーター ---

pub fn legal_router(app_state: AppState) -> Router {
    Router::new()
        .route("/legal", get(legal_index_handler))
        .route("/legal/privacy", get(legacy_privacy_handler))
        .route(
            "/legal/acceptpolicies",
            get(accept_policies_form_handler).post(accept_policies_submit_handler),
        )
        .route("/legal/{document}", get(document_handler))
        .with_state(app_state)
}
