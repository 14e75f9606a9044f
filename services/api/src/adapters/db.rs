//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, the Postgres implementation of
//! the `SessionRepository` port. It handles all session persistence using `sqlx`.

use async_trait::async_trait;
use billing_portal_core::domain::{PersistedSession, Session};
use billing_portal_core::ports::{PortError, PortResult, SessionRepository};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `SessionRepository` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct SessionRecord {
    id: String,
    user_ref: String,
    user_name: String,
    user_id: i64,
    access_token: String,
    refresh_token: String,
    discom_id: i64,
    role_id: i64,
    last_login_at: Option<String>,
    user_scopes: Vec<String>,
    token_expiry: Option<i64>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl SessionRecord {
    fn to_domain(self) -> PersistedSession {
        PersistedSession {
            session_id: self.id,
            session: Session {
                id: self.user_ref,
                user_name: self.user_name,
                user_id: self.user_id,
                access_token: self.access_token,
                refresh_token: self.refresh_token,
                discom_id: self.discom_id,
                role_id: self.role_id,
                last_login_at: self.last_login_at,
                scopes: self.user_scopes,
                token_expiry: self.token_expiry,
            },
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// `SessionRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl SessionRepository for DbAdapter {
    async fn save(&self, record: &PersistedSession) -> PortResult<()> {
        let session = &record.session;
        sqlx::query(
            "INSERT INTO portal_sessions (
                id, user_ref, user_name, user_id, access_token, refresh_token,
                discom_id, role_id, last_login_at, user_scopes, token_expiry,
                created_at, expires_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (id) DO UPDATE SET
                access_token = EXCLUDED.access_token,
                refresh_token = EXCLUDED.refresh_token,
                user_scopes = EXCLUDED.user_scopes,
                token_expiry = EXCLUDED.token_expiry,
                expires_at = EXCLUDED.expires_at",
        )
        .bind(&record.session_id)
        .bind(&session.id)
        .bind(&session.user_name)
        .bind(session.user_id)
        .bind(&session.access_token)
        .bind(&session.refresh_token)
        .bind(session.discom_id)
        .bind(session.role_id)
        .bind(&session.last_login_at)
        .bind(&session.scopes)
        .bind(session.token_expiry)
        .bind(record.created_at)
        .bind(record.expires_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn load(&self, session_id: &str) -> PortResult<Option<PersistedSession>> {
        let record = sqlx::query_as::<_, SessionRecord>(
            "SELECT id, user_ref, user_name, user_id, access_token, refresh_token,
                    discom_id, role_id, last_login_at, user_scopes, token_expiry,
                    created_at, expires_at
             FROM portal_sessions WHERE id = $1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(SessionRecord::to_domain))
    }

    async fn delete(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM portal_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM portal_sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected())
    }
}
