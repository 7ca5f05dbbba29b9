use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;

use crate::db::AccountShare;
use crate::error::{AppError, AppResult};
use crate::middleware::StockContext;
use crate::services::account_share::{
    AccountShareStatusView, ShareDecision, ShareRequestInput, ShareResponseInput,
};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/status", get(get_status))
        .route("/request", post(request_share))
        .route("/request/cancel", post(cancel_request))
        .route("/respond", post(respond))
        .route("/stop", post(stop_sharing))
}

// ============================================================================
// Request Types
// ============================================================================

// Bodies are read as loose JSON so that a missing body, a wrong content type
// or a wrongly typed field all end in the same 400 as a missing field.
fn json_body(body: Result<Json<Value>, JsonRejection>) -> Value {
    match body {
        Ok(Json(value)) => value,
        Err(rejection) => {
            tracing::debug!("Unreadable account-share body: {}", rejection);
            Value::Null
        }
    }
}

fn string_field(body: &Value, name: &str) -> Option<String> {
    body.get(name).and_then(Value::as_str).map(str::to_string)
}

// ============================================================================
// Handlers
// ============================================================================

/// The view was already resolved while building the request context.
async fn get_status(ctx: StockContext) -> Json<AccountShareStatusView> {
    Json(ctx.share_status)
}

async fn request_share(
    State(state): State<Arc<AppState>>,
    ctx: StockContext,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<(StatusCode, Json<AccountShare>)> {
    let body = json_body(body);
    let target_email = string_field(&body, "targetEmail")
        .ok_or_else(|| AppError::BadRequest("targetEmail is required".to_string()))?;

    let share = state
        .shares
        .request_share(ShareRequestInput {
            owner_user_id: ctx.actor_stock_user.id.clone(),
            owner_auth_user_id: ctx.auth_user.id.clone(),
            owner_email: ctx.auth_user.email.clone(),
            target_email,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(share)))
}

async fn cancel_request(
    State(state): State<Arc<AppState>>,
    ctx: StockContext,
) -> AppResult<Json<AccountShare>> {
    let share = state
        .shares
        .cancel_share_request(&ctx.actor_stock_user.id)
        .await?;
    Ok(Json(share))
}

async fn respond(
    State(state): State<Arc<AppState>>,
    ctx: StockContext,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<AccountShare>> {
    let body = json_body(body);
    let share_id = string_field(&body, "requestId")
        .ok_or_else(|| AppError::BadRequest("requestId is required".to_string()))?;
    let decision = body
        .get("decision")
        .and_then(Value::as_str)
        .and_then(ShareDecision::from_str)
        .ok_or_else(|| AppError::BadRequest("decision must be accept or refuse".to_string()))?;

    // The responder always acts as themselves, never as a substituted owner.
    let share = state
        .shares
        .respond_to_incoming_share(ShareResponseInput {
            share_id,
            target_email: ctx.auth_user.email.clone(),
            target_auth_user_id: ctx.auth_user.id.clone(),
            target_user_id: ctx.actor_stock_user.id.clone(),
            decision,
        })
        .await?;

    Ok(Json(share))
}

async fn stop_sharing(
    State(state): State<Arc<AppState>>,
    ctx: StockContext,
) -> AppResult<Json<AccountShare>> {
    let share = state
        .shares
        .stop_sharing(&ctx.actor_stock_user.id, &ctx.auth_user.id)
        .await?;
    Ok(Json(share))
}
