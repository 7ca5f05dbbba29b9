//! Request-scoped identity resolution.
//!
//! Every stock route works on `StockContext::stock_user`, whose id is the
//! effective owner id. A target bound by an accepted share therefore reads
//! and writes the owner's partition without the item code knowing.

use std::sync::Arc;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::db::{StockUser, StockUserRepository};
use crate::error::AppError;
use crate::routes::auth::{AuthIdentity, AuthUser};
use crate::services::account_share::{AccountShareStatusView, ShareActor};
use crate::AppState;

pub struct StockContext {
    pub auth_user: AuthIdentity,
    /// The caller's own record. Used wherever the caller acts as themselves,
    /// e.g. answering a share request.
    pub actor_stock_user: StockUser,
    /// `actor_stock_user` with `id` replaced by the effective owner id.
    pub stock_user: StockUser,
    pub share_status: AccountShareStatusView,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for StockContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(auth_user) = AuthUser::from_request_parts(parts, state).await?;

        let actor_stock_user =
            StockUserRepository::get_or_create(&state.db, &auth_user.id, &auth_user.email)
                .await
                .map_err(|e| {
                    tracing::error!(
                        "Failed to get/create stock user for {}: {:?}",
                        auth_user.id,
                        e
                    );
                    AppError::Internal(anyhow::anyhow!("stock user resolution failed"))
                })?;

        let actor = ShareActor {
            user_id: actor_stock_user.id.clone(),
            auth_user_id: auth_user.id.clone(),
            email: auth_user.email.clone(),
        };
        let share_status = state.shares.get_share_status(&actor).await.map_err(|e| {
            tracing::error!(
                "Failed to resolve share status for {}: {:?}",
                actor_stock_user.id,
                e
            );
            AppError::Internal(anyhow::anyhow!("share status resolution failed"))
        })?;

        let stock_user = StockUser {
            id: share_status.effective_owner_user_id.clone(),
            ..actor_stock_user.clone()
        };

        if stock_user.id != actor_stock_user.id {
            tracing::debug!(
                "User {} acting in partition of {}",
                actor_stock_user.id,
                stock_user.id
            );
        }

        Ok(StockContext {
            auth_user,
            actor_stock_user,
            stock_user,
            share_status,
        })
    }
}
