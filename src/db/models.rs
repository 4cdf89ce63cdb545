use crate::error::LinkError;
use crate::spotify_oauth::TokenSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Library sync progress for a linked account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    NotStarted,
    InProgress,
    Completed,
    NeedsUpdate,
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::NotStarted => "not_started",
            SyncStatus::InProgress => "in_progress",
            SyncStatus::Completed => "completed",
            SyncStatus::NeedsUpdate => "needs_update",
            SyncStatus::Failed => "failed",
        }
    }

    /// Forward-only, except `completed -> needs_update` on re-link.
    pub fn can_transition_to(&self, next: SyncStatus) -> bool {
        use SyncStatus::*;
        matches!(
            (self, next),
            (NotStarted, InProgress)
                | (NeedsUpdate, InProgress)
                | (Failed, InProgress)
                | (InProgress, Completed)
                | (InProgress, Failed)
                | (Completed, NeedsUpdate)
        )
    }

    /// Status after a re-link event.
    pub fn after_relink(self) -> SyncStatus {
        match self {
            SyncStatus::Completed => SyncStatus::NeedsUpdate,
            other => other,
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(SyncStatus::NotStarted),
            "in_progress" => Ok(SyncStatus::InProgress),
            "completed" => Ok(SyncStatus::Completed),
            "needs_update" => Ok(SyncStatus::NeedsUpdate),
            "failed" => Ok(SyncStatus::Failed),
            other => Err(LinkError::CorruptRow(format!("unknown sync_status {other:?}"))),
        }
    }
}

/// A stored `spotify_credentials` row.
#[derive(Debug, Clone, PartialEq)]
pub struct SpotifyCredential {
    pub id: i64,
    pub user_id: i64,
    pub spotify_id: String,
    pub access_token: String,
    pub refresh_token: String,
    pub token_expires_at: DateTime<Utc>,
    pub sync_status: SyncStatus,
    pub sync_count: i64,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl SpotifyCredential {
    /// Reads are only attempted while `now < token_expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.token_expires_at
    }
}

/// Everything the OAuth callback learns about a freshly linked account.
#[derive(Debug, Clone)]
pub struct LinkedAccount {
    pub user_id: i64,
    pub spotify_id: String,
    pub tokens: TokenSet,
}

/// The authenticated application user, as resolved from a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppUser {
    pub id: i64,
    pub username: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn relink_only_demotes_completed() {
        assert_eq!(SyncStatus::Completed.after_relink(), SyncStatus::NeedsUpdate);
        for s in [
            SyncStatus::NotStarted,
            SyncStatus::InProgress,
            SyncStatus::NeedsUpdate,
            SyncStatus::Failed,
        ] {
            assert_eq!(s.after_relink(), s);
        }
    }

    #[test]
    fn transitions_are_forward_only() {
        assert!(SyncStatus::NotStarted.can_transition_to(SyncStatus::InProgress));
        assert!(SyncStatus::InProgress.can_transition_to(SyncStatus::Completed));
        assert!(SyncStatus::Completed.can_transition_to(SyncStatus::NeedsUpdate));
        assert!(!SyncStatus::Completed.can_transition_to(SyncStatus::NotStarted));
        assert!(!SyncStatus::Completed.can_transition_to(SyncStatus::InProgress));
        assert!(!SyncStatus::NotStarted.can_transition_to(SyncStatus::Completed));
    }

    #[test]
    fn status_text_parses_back() {
        for s in [
            SyncStatus::NotStarted,
            SyncStatus::InProgress,
            SyncStatus::Completed,
            SyncStatus::NeedsUpdate,
            SyncStatus::Failed,
        ] {
            assert_eq!(s.as_str().parse::<SyncStatus>().ok(), Some(s));
        }
        assert!("syncing".parse::<SyncStatus>().is_err());
    }

    #[test]
    fn expiry_boundary_counts_as_expired() {
        let now = Utc::now();
        let cred = SpotifyCredential {
            id: 1,
            user_id: 1,
            spotify_id: "sp".to_string(),
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            token_expires_at: now,
            sync_status: SyncStatus::NotStarted,
            sync_count: 0,
            last_synced_at: None,
            last_used_at: None,
            created_at: now,
        };
        assert!(cred.is_expired_at(now));
        assert!(!cred.is_expired_at(now - Duration::seconds(1)));
    }
}
