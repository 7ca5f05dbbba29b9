use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Account Share Models
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareStatus {
    Pending,
    Accepted,
    Refused,
    Cancelled,
    Stopped,
}

impl ShareStatus {
    /// Convert from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(ShareStatus::Pending),
            "accepted" => Some(ShareStatus::Accepted),
            "refused" => Some(ShareStatus::Refused),
            "cancelled" => Some(ShareStatus::Cancelled),
            "stopped" => Some(ShareStatus::Stopped),
            _ => None,
        }
    }

    /// Convert to string
    pub fn as_str(self) -> &'static str {
        match self {
            ShareStatus::Pending => "pending",
            ShareStatus::Accepted => "accepted",
            ShareStatus::Refused => "refused",
            ShareStatus::Cancelled => "cancelled",
            ShareStatus::Stopped => "stopped",
        }
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: ShareStatus) -> bool {
        matches!(
            (self, next),
            (ShareStatus::Pending, ShareStatus::Cancelled)
                | (ShareStatus::Pending, ShareStatus::Accepted)
                | (ShareStatus::Pending, ShareStatus::Refused)
                | (ShareStatus::Accepted, ShareStatus::Stopped)
        )
    }
}

impl std::fmt::Display for ShareStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ShareStatus> for String {
    fn from(status: ShareStatus) -> Self {
        status.as_str().to_string()
    }
}

impl TryFrom<&str> for ShareStatus {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::from_str(value).ok_or_else(|| format!("Invalid share status: {}", value))
    }
}

/// A request by `owner_user_id` to share their stock partition with `target_email`.
///
/// Rows are never deleted; terminal states are kept as history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountShare {
    pub id: String,
    pub owner_user_id: String,
    pub owner_auth_user_id: String,
    pub owner_email: String,
    pub target_email: String,
    pub status: ShareStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_auth_user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responded_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stopped_at: Option<DateTime<Utc>>,
}

/// Fields supplied when a new share is requested. The store assigns id,
/// status (`pending`) and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccountShare {
    pub owner_user_id: String,
    pub owner_auth_user_id: String,
    pub owner_email: String,
    pub target_email: String,
}

/// Partial update of a share. `None` leaves the stored value untouched.
///
/// When `expected_status` is set the store only applies the update if the
/// row still has that status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateAccountShare {
    pub status: Option<ShareStatus>,
    pub target_auth_user_id: Option<String>,
    pub target_user_id: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub responded_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub expected_status: Option<ShareStatus>,
}

impl UpdateAccountShare {
    /// Merge the present fields into `share`, field by field.
    pub fn apply_to(&self, share: &mut AccountShare) {
        if let Some(status) = self.status {
            share.status = status;
        }
        if let Some(ref v) = self.target_auth_user_id {
            share.target_auth_user_id = Some(v.clone());
        }
        if let Some(ref v) = self.target_user_id {
            share.target_user_id = Some(v.clone());
        }
        if let Some(v) = self.updated_at {
            share.updated_at = v;
        }
        if let Some(v) = self.responded_at {
            share.responded_at = Some(v);
        }
        if let Some(v) = self.stopped_at {
            share.stopped_at = Some(v);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.target_auth_user_id.is_none()
            && self.target_user_id.is_none()
            && self.updated_at.is_none()
            && self.responded_at.is_none()
            && self.stopped_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            ShareStatus::Pending,
            ShareStatus::Accepted,
            ShareStatus::Refused,
            ShareStatus::Cancelled,
            ShareStatus::Stopped,
        ] {
            assert_eq!(ShareStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(ShareStatus::from_str("ACCEPTED"), Some(ShareStatus::Accepted));
        assert!(ShareStatus::try_from("deleted").is_err());
    }

    #[test]
    fn only_documented_transitions_are_legal() {
        use ShareStatus::*;
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Pending.can_transition_to(Accepted));
        assert!(Pending.can_transition_to(Refused));
        assert!(Accepted.can_transition_to(Stopped));

        assert!(!Accepted.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Stopped));
        assert!(!Refused.can_transition_to(Accepted));
        assert!(!Stopped.can_transition_to(Accepted));
        assert!(!Cancelled.can_transition_to(Pending));
    }

    #[test]
    fn serializes_with_camel_case_and_lowercase_status() {
        let now = Utc::now();
        let share = AccountShare {
            id: "share-1".to_string(),
            owner_user_id: "owner-1".to_string(),
            owner_auth_user_id: "auth-owner-1".to_string(),
            owner_email: "owner@example.test".to_string(),
            target_email: "target@example.test".to_string(),
            status: ShareStatus::Pending,
            target_auth_user_id: None,
            target_user_id: None,
            created_at: now,
            updated_at: now,
            responded_at: None,
            stopped_at: None,
        };

        let json = serde_json::to_value(&share).unwrap();
        assert_eq!(json["ownerUserId"], "owner-1");
        assert_eq!(json["targetEmail"], "target@example.test");
        assert_eq!(json["status"], "pending");
        assert!(json.get("targetAuthUserId").is_none());
    }

    #[test]
    fn update_merges_only_present_fields() {
        let now = Utc::now();
        let mut share = AccountShare {
            id: "share-1".to_string(),
            owner_user_id: "owner-1".to_string(),
            owner_auth_user_id: "auth-owner-1".to_string(),
            owner_email: "owner@example.test".to_string(),
            target_email: "target@example.test".to_string(),
            status: ShareStatus::Pending,
            target_auth_user_id: None,
            target_user_id: None,
            created_at: now,
            updated_at: now,
            responded_at: None,
            stopped_at: None,
        };

        let later = now + chrono::Duration::seconds(5);
        let update = UpdateAccountShare {
            status: Some(ShareStatus::Refused),
            updated_at: Some(later),
            responded_at: Some(later),
            ..Default::default()
        };
        assert!(!update.is_empty());
        update.apply_to(&mut share);

        assert_eq!(share.status, ShareStatus::Refused);
        assert_eq!(share.updated_at, later);
        assert_eq!(share.responded_at, Some(later));
        assert_eq!(share.target_auth_user_id, None);
        assert_eq!(share.created_at, now);
    }
}
