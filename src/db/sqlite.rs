use crate::db::models::{AppUser, LinkedAccount, SpotifyCredential, SyncStatus};
use crate::db::schema::SQLITE_INIT;
use crate::error::LinkError;
use crate::spotify_oauth::TokenSet;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::collections::HashSet;
use std::str::FromStr;
use tracing::debug;

pub type SqlitePool = Pool<Sqlite>;

#[derive(Clone)]
pub struct CredentialStore {
    pool: SqlitePool,
}

impl CredentialStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database at `database_url` and apply the schema.
    pub async fn connect(database_url: &str) -> Result<Self, LinkError> {
        let connect_opts = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new().connect_with(connect_opts).await?;
        let store = Self::new(pool);
        store.init_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), LinkError> {
        // sqlx::query runs one statement at a time
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn get_by_user(&self, user_id: i64) -> Result<Option<SpotifyCredential>, LinkError> {
        let row = sqlx::query(
            r#"SELECT id, user_id, spotify_id, access_token, refresh_token, token_expires_at,
               sync_status, sync_count, last_synced_at, last_used_at, created_at
               FROM spotify_credentials WHERE user_id = ?"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_model).transpose()
    }

    pub async fn exists(&self, user_id: i64) -> Result<bool, LinkError> {
        let rec: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM spotify_credentials WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(rec.is_some())
    }

    /// Upsert by unique user_id in one statement.
    /// A re-link demotes `completed` to `needs_update`; other statuses are kept.
    pub async fn upsert_linked(&self, account: LinkedAccount) -> Result<(), LinkError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO spotify_credentials (
                user_id, spotify_id, access_token, refresh_token,
                token_expires_at, sync_status, last_used_at, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                spotify_id = excluded.spotify_id,
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                token_expires_at = excluded.token_expires_at,
                last_used_at = excluded.last_used_at,
                sync_status = CASE
                    WHEN spotify_credentials.sync_status = ? THEN ?
                    ELSE spotify_credentials.sync_status
                END
            "#,
        )
        .bind(account.user_id)
        .bind(account.spotify_id)
        .bind(account.tokens.access_token)
        .bind(account.tokens.refresh_token)
        .bind(account.tokens.expires_at.to_rfc3339())
        .bind(SyncStatus::NotStarted.as_str())
        .bind(now.clone())
        .bind(now)
        .bind(SyncStatus::Completed.as_str())
        .bind(SyncStatus::Completed.after_relink().as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Persist a refresh result. Returns false when the row vanished meanwhile.
    pub async fn update_tokens(&self, user_id: i64, tokens: &TokenSet) -> Result<bool, LinkError> {
        let res = sqlx::query(
            r#"UPDATE spotify_credentials SET
                access_token = ?,
                refresh_token = ?,
                token_expires_at = ?,
                last_used_at = ?
              WHERE user_id = ?"#,
        )
        .bind(&tokens.access_token)
        .bind(&tokens.refresh_token)
        .bind(tokens.expires_at.to_rfc3339())
        .bind(Utc::now().to_rfc3339())
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn delete_by_user(&self, user_id: i64) -> Result<u64, LinkError> {
        let res = sqlx::query("DELETE FROM spotify_credentials WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }

    /// Spotify ids of playlists this user already imported into the application.
    pub async fn imported_playlist_ids(&self, user_id: i64) -> Result<HashSet<String>, LinkError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"SELECT spotify_playlist_id FROM playlists
               WHERE user_id = ? AND spotify_playlist_id IS NOT NULL"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Move `sync_status` along an allowed edge. Returns false (and writes nothing)
    /// when the row is missing or the edge is not allowed from its current status.
    pub async fn set_sync_status(&self, user_id: i64, next: SyncStatus) -> Result<bool, LinkError> {
        let mut tx = self.pool.begin().await?;
        let current: Option<(String,)> =
            sqlx::query_as("SELECT sync_status FROM spotify_credentials WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((current,)) = current else {
            return Ok(false);
        };
        let current: SyncStatus = current.parse()?;
        if !current.can_transition_to(next) {
            debug!(user_id, from = %current, to = %next, "sync status transition refused");
            return Ok(false);
        }
        sqlx::query("UPDATE spotify_credentials SET sync_status = ? WHERE user_id = ?")
            .bind(next.as_str())
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(true)
    }

    /// Record a finished sync: `in_progress -> completed`, item count and timestamp.
    pub async fn record_sync_result(&self, user_id: i64, count: i64) -> Result<bool, LinkError> {
        let res = sqlx::query(
            r#"UPDATE spotify_credentials SET
                sync_status = ?,
                sync_count = ?,
                last_synced_at = ?
              WHERE user_id = ? AND sync_status = ?"#,
        )
        .bind(SyncStatus::Completed.as_str())
        .bind(count)
        .bind(Utc::now().to_rfc3339())
        .bind(user_id)
        .bind(SyncStatus::InProgress.as_str())
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    /// Resolve a session token issued by the auth module. Expired sessions resolve to None.
    pub async fn user_for_session(&self, token: &str) -> Result<Option<AppUser>, LinkError> {
        let row: Option<(i64, String, String)> = sqlx::query_as(
            r#"SELECT u.id, u.username, s.expires_at
               FROM user_sessions s JOIN users u ON u.id = s.user_id
               WHERE s.token = ?"#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        let Some((id, username, expires_at)) = row else {
            return Ok(None);
        };
        if parse_timestamp(&expires_at)? <= Utc::now() {
            return Ok(None);
        }
        Ok(Some(AppUser { id, username }))
    }

    fn row_to_model(row: SqliteRow) -> Result<SpotifyCredential, LinkError> {
        let last_synced_at: Option<String> = row.try_get("last_synced_at")?;
        let last_used_at: Option<String> = row.try_get("last_used_at")?;
        let sync_status: String = row.try_get("sync_status")?;

        Ok(SpotifyCredential {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            spotify_id: row.try_get("spotify_id")?,
            access_token: row.try_get("access_token")?,
            refresh_token: row.try_get("refresh_token")?,
            token_expires_at: parse_timestamp(row.try_get("token_expires_at")?)?,
            sync_status: sync_status.parse()?,
            sync_count: row.try_get("sync_count")?,
            last_synced_at: last_synced_at.as_deref().map(parse_timestamp).transpose()?,
            last_used_at: last_used_at.as_deref().map(parse_timestamp).transpose()?,
            created_at: parse_timestamp(row.try_get("created_at")?)?,
        })
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, LinkError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| LinkError::CorruptRow(format!("bad timestamp {raw:?}: {e}")))
}
