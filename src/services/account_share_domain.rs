//! Pure views over the full set of share records. No I/O happens here.

use crate::db::models::{AccountShare, ShareStatus};

/// Trim and lowercase. Email syntax is not validated; matching is exact on
/// the normalized form.
pub fn normalize_share_email(value: &str) -> String {
    value.trim().to_lowercase()
}

/// The owner's single active share, if any.
///
/// An `accepted` share always beats a `pending` one. Duplicates of the same
/// status should not exist; if they do, the most recently updated wins.
pub fn find_owner_active_share<'a>(
    shares: &'a [AccountShare],
    owner_user_id: &str,
) -> Option<&'a AccountShare> {
    let latest_with = |status: ShareStatus| {
        shares
            .iter()
            .filter(|s| s.owner_user_id == owner_user_id && s.status == status)
            .max_by_key(|s| s.updated_at)
    };

    latest_with(ShareStatus::Accepted).or_else(|| latest_with(ShareStatus::Pending))
}

/// Pending requests addressed to `actor_email`, newest first.
pub fn incoming_pending_shares<'a>(
    shares: &'a [AccountShare],
    actor_email: &str,
) -> Vec<&'a AccountShare> {
    let email = normalize_share_email(actor_email);

    let mut incoming: Vec<&AccountShare> = shares
        .iter()
        .filter(|s| {
            s.status == ShareStatus::Pending && normalize_share_email(&s.target_email) == email
        })
        .collect();
    incoming.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    incoming
}

/// The accepted share bound to this auth identity as target.
pub fn find_accepted_share_for_target_auth<'a>(
    shares: &'a [AccountShare],
    actor_auth_user_id: &str,
) -> Option<&'a AccountShare> {
    shares
        .iter()
        .filter(|s| {
            s.status == ShareStatus::Accepted
                && s.target_auth_user_id.as_deref() == Some(actor_auth_user_id)
        })
        .max_by_key(|s| s.updated_at)
}

/// The user id whose partition the actor reads and writes.
///
/// A target bound by an accepted share works in the owner's partition;
/// everyone else works in their own.
pub fn resolve_effective_user_id(
    actor_user_id: &str,
    actor_auth_user_id: &str,
    accepted_share_for_target: Option<&AccountShare>,
) -> String {
    match accepted_share_for_target {
        Some(share)
            if share.status == ShareStatus::Accepted
                && share.target_auth_user_id.as_deref() == Some(actor_auth_user_id) =>
        {
            share.owner_user_id.clone()
        }
        _ => actor_user_id.to_string(),
    }
}
