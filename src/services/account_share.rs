//! Account share lifecycle.
//!
//! An owner requests a share with a target email (`pending`). The owner may
//! cancel it, or the target may accept or refuse it. Either participant may
//! stop an accepted share. Every operation reads the full share set once,
//! validates against that snapshot, then performs at most one write.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::{AccountShare, NewAccountShare, ShareStatus, UpdateAccountShare};
use crate::error::{AppError, AppResult};
use crate::services::account_share_domain::{
    find_accepted_share_for_target_auth, find_owner_active_share, incoming_pending_shares,
    normalize_share_email, resolve_effective_user_id,
};

/// Persistence seam for share records.
#[async_trait]
pub trait ShareStore: Send + Sync {
    async fn list_all(&self) -> AppResult<Vec<AccountShare>>;
    async fn create(&self, input: NewAccountShare) -> AppResult<AccountShare>;
    /// Fails with `AppError::NotFound` for an unknown id and
    /// `AppError::Conflict` when `expected_status` does not hold.
    async fn update(&self, id: &str, update: UpdateAccountShare) -> AppResult<AccountShare>;
    async fn get_by_id(&self, id: &str) -> AppResult<Option<AccountShare>>;
}

#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Authorization(String),

    #[error(transparent)]
    Store(AppError),
}

impl From<ShareError> for AppError {
    fn from(err: ShareError) -> Self {
        match err {
            ShareError::Validation(msg)
            | ShareError::Conflict(msg)
            | ShareError::NotFound(msg)
            | ShareError::Authorization(msg) => AppError::BadRequest(msg),
            ShareError::Store(e) => e,
        }
    }
}

pub type ShareResult<T> = Result<T, ShareError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareDecision {
    Accept,
    Refuse,
}

impl ShareDecision {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "accept" => Some(ShareDecision::Accept),
            "refuse" => Some(ShareDecision::Refuse),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareRole {
    None,
    Owner,
    Target,
}

/// Per-actor view of the share state. Computed per request, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountShareStatusView {
    pub role: ShareRole,
    pub effective_owner_user_id: String,
    pub partner_email: Option<String>,
    pub outgoing_request: Option<AccountShare>,
    pub incoming_requests: Vec<AccountShare>,
}

#[derive(Debug, Clone)]
pub struct ShareRequestInput {
    pub owner_user_id: String,
    pub owner_auth_user_id: String,
    pub owner_email: String,
    pub target_email: String,
}

#[derive(Debug, Clone)]
pub struct ShareResponseInput {
    pub share_id: String,
    pub target_email: String,
    pub target_auth_user_id: String,
    pub target_user_id: String,
    pub decision: ShareDecision,
}

/// The identity an operation acts as.
#[derive(Debug, Clone)]
pub struct ShareActor {
    pub user_id: String,
    pub auth_user_id: String,
    pub email: String,
}

const ACTIVE_SHARE_EXISTS: &str = "An active share already exists for this account";
const CONCURRENT_UPDATE: &str = "Share request was modified concurrently";

/// `updated_at` never moves backwards, even if the clock does.
fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    Utc::now().max(previous)
}

/// Base update for a legal transition, guarded on the status we read.
fn transition(share: &AccountShare, next: ShareStatus) -> ShareResult<UpdateAccountShare> {
    if !share.status.can_transition_to(next) {
        return Err(ShareError::NotFound(format!(
            "Share {} cannot move from {} to {}",
            share.id, share.status, next
        )));
    }

    Ok(UpdateAccountShare {
        status: Some(next),
        updated_at: Some(next_timestamp(share.updated_at)),
        expected_status: Some(share.status),
        ..Default::default()
    })
}

fn map_write_error(err: AppError) -> ShareError {
    match err {
        AppError::Conflict(_) => ShareError::Conflict(CONCURRENT_UPDATE.to_string()),
        AppError::NotFound(msg) => ShareError::NotFound(msg),
        other => ShareError::Store(other),
    }
}

#[derive(Clone)]
pub struct AccountShareService {
    store: Arc<dyn ShareStore>,
}

impl AccountShareService {
    pub fn new(store: Arc<dyn ShareStore>) -> Self {
        Self { store }
    }

    async fn all_shares(&self) -> ShareResult<Vec<AccountShare>> {
        self.store.list_all().await.map_err(ShareError::Store)
    }

    async fn write(&self, id: &str, update: UpdateAccountShare) -> ShareResult<AccountShare> {
        self.store.update(id, update).await.map_err(map_write_error)
    }

    /// Create a `pending` share from the owner to `target_email`.
    ///
    /// The target does not need an account yet; the request is matched by
    /// email when they next sign in.
    pub async fn request_share(&self, input: ShareRequestInput) -> ShareResult<AccountShare> {
        let target_email = normalize_share_email(&input.target_email);
        if target_email.is_empty() {
            return Err(ShareError::Validation("Target email is required".to_string()));
        }

        let shares = self.all_shares().await?;
        if let Some(active) = find_owner_active_share(&shares, &input.owner_user_id) {
            tracing::debug!(
                "Owner {} already has active share {} ({})",
                input.owner_user_id,
                active.id,
                active.status
            );
            return Err(ShareError::Conflict(ACTIVE_SHARE_EXISTS.to_string()));
        }

        let share = self
            .store
            .create(NewAccountShare {
                owner_user_id: input.owner_user_id,
                owner_auth_user_id: input.owner_auth_user_id,
                owner_email: normalize_share_email(&input.owner_email),
                target_email,
            })
            .await
            .map_err(|e| match e {
                AppError::Conflict(_) => ShareError::Conflict(ACTIVE_SHARE_EXISTS.to_string()),
                other => ShareError::Store(other),
            })?;

        tracing::info!(
            "Share {} requested by owner {}",
            share.id,
            share.owner_user_id
        );
        Ok(share)
    }

    /// Withdraw the owner's pending request. An accepted share must be
    /// stopped instead.
    pub async fn cancel_share_request(&self, owner_user_id: &str) -> ShareResult<AccountShare> {
        let shares = self.all_shares().await?;
        let pending = find_owner_active_share(&shares, owner_user_id)
            .filter(|s| s.status == ShareStatus::Pending)
            .ok_or_else(|| ShareError::NotFound("No pending share request found".to_string()))?;

        let update = transition(pending, ShareStatus::Cancelled)?;
        let share = self.write(&pending.id, update).await?;

        tracing::info!("Share {} cancelled by owner {}", share.id, owner_user_id);
        Ok(share)
    }

    /// Accept or refuse a pending request addressed to the caller's email.
    pub async fn respond_to_incoming_share(
        &self,
        input: ShareResponseInput,
    ) -> ShareResult<AccountShare> {
        let share = self
            .store
            .get_by_id(&input.share_id)
            .await
            .map_err(ShareError::Store)?
            .filter(|s| s.status == ShareStatus::Pending)
            .ok_or_else(|| ShareError::NotFound("Pending share request not found".to_string()))?;

        if normalize_share_email(&share.target_email) != normalize_share_email(&input.target_email)
        {
            tracing::debug!(
                "Auth user {} tried to answer share {} addressed to someone else",
                input.target_auth_user_id,
                share.id
            );
            return Err(ShareError::Authorization(
                "Share request does not target this user".to_string(),
            ));
        }

        let update = match input.decision {
            ShareDecision::Refuse => {
                let mut update = transition(&share, ShareStatus::Refused)?;
                update.responded_at = update.updated_at;
                update
            }
            ShareDecision::Accept => {
                let mut update = transition(&share, ShareStatus::Accepted)?;
                update.responded_at = update.updated_at;
                update.target_auth_user_id = Some(input.target_auth_user_id.clone());
                update.target_user_id = Some(input.target_user_id.clone());
                update
            }
        };

        let share = self.write(&share.id, update).await?;
        tracing::info!(
            "Share {} {} by auth user {}",
            share.id,
            share.status,
            input.target_auth_user_id
        );
        Ok(share)
    }

    /// Compute the actor's role, effective partition and pending requests.
    pub async fn get_share_status(&self, actor: &ShareActor) -> ShareResult<AccountShareStatusView> {
        let shares = self.all_shares().await?;
        let owner_active = find_owner_active_share(&shares, &actor.user_id);
        let accepted_for_target = find_accepted_share_for_target_auth(&shares, &actor.auth_user_id);
        let incoming_requests: Vec<AccountShare> = incoming_pending_shares(&shares, &actor.email)
            .into_iter()
            .cloned()
            .collect();

        // Owning an active share takes precedence over being a target elsewhere.
        if let Some(share) = owner_active {
            return Ok(AccountShareStatusView {
                role: ShareRole::Owner,
                effective_owner_user_id: actor.user_id.clone(),
                partner_email: Some(normalize_share_email(&share.target_email)),
                outgoing_request: Some(share.clone()),
                incoming_requests,
            });
        }

        if let Some(share) = accepted_for_target {
            return Ok(AccountShareStatusView {
                role: ShareRole::Target,
                effective_owner_user_id: resolve_effective_user_id(
                    &actor.user_id,
                    &actor.auth_user_id,
                    Some(share),
                ),
                partner_email: Some(normalize_share_email(&share.owner_email)),
                outgoing_request: Some(share.clone()),
                incoming_requests,
            });
        }

        Ok(AccountShareStatusView {
            role: ShareRole::None,
            effective_owner_user_id: actor.user_id.clone(),
            partner_email: None,
            outgoing_request: None,
            incoming_requests,
        })
    }

    /// End an accepted share. Either the owner or the bound target may do it.
    pub async fn stop_sharing(
        &self,
        actor_user_id: &str,
        actor_auth_user_id: &str,
    ) -> ShareResult<AccountShare> {
        let shares = self.all_shares().await?;
        let accepted = shares
            .iter()
            .filter(|s| {
                s.status == ShareStatus::Accepted
                    && (s.owner_user_id == actor_user_id
                        || s.target_auth_user_id.as_deref() == Some(actor_auth_user_id))
            })
            .max_by_key(|s| s.updated_at)
            .ok_or_else(|| ShareError::NotFound("No active accepted share found".to_string()))?;

        let mut update = transition(accepted, ShareStatus::Stopped)?;
        update.stopped_at = update.updated_at;

        let share = self.write(&accepted.id, update).await?;
        tracing::info!("Share {} stopped by user {}", share.id, actor_user_id);
        Ok(share)
    }
}
