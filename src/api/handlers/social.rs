/*
 * Responsibility
 * - GET /social/callback?tx_id=... : IdP トランザクション取得 → 登録フォーム表示
 * - POST /social/callback : 追加プロフィール送信 → provision
 *   - SUCCESS: finish ページ (token を auto-post)
 *   - それ以外: IdP のレスポンスをそのまま JSON で返す
 */
use axum::{
    Form, Json,
    extract::{Query, State},
    response::{Html, IntoResponse, Response},
};

use crate::api::dto::registration::{CallbackQuery, RegistrationForm};
use crate::api::extractors::CurrentSession;
use crate::api::views;
use crate::error::AppError;
use crate::services::idp::{IdpTransactionCoordinator, SubmitOutcome};
use crate::state::AppState;

fn coordinator(state: &AppState) -> Result<&IdpTransactionCoordinator, AppError> {
    state.idp.as_ref().ok_or(AppError::ServiceUnavailable {
        feature: "social registration",
    })
}

pub async fn begin_registration(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Query(query): Query<CallbackQuery>,
) -> Result<Html<String>, AppError> {
    let tx = coordinator(&state)?
        .begin(session, query.tx_id.as_deref())
        .await?;

    Ok(Html(views::render_register_page(tx.profile())))
}

pub async fn submit_registration(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Form(form): Form<RegistrationForm>,
) -> Result<Response, AppError> {
    let outcome = coordinator(&state)?
        .submit(session, form.into_profile())
        .await?;

    let response = match outcome {
        SubmitOutcome::Completed {
            finish_url,
            session_token,
        } => Html(views::render_finish_page(
            &finish_url,
            session_token.as_deref(),
        ))
        .into_response(),
        SubmitOutcome::Pending(body) => Json(body).into_response(),
    };

    Ok(response)
}
