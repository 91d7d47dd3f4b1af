//! Durable session store over SQLite.
//!
//! Point lookups by (tenant, user) plus range scans by inactivity cutoff.
//! The store itself does not serialize concurrent turns; that is the job of
//! [`super::locks::SessionLocks`], which callers hold across a whole
//! get-or-create → handle → save cycle.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::storage::db::{get_connection, DbPool};
use crate::types::TenantId;

use super::{FlowData, Session, SessionKey, SessionState};

/// Session persistence contract.
///
/// `save` always refreshes `last_activity_at`; `find_stale` is paginated so
/// sweeps over large tenants stay bounded.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads the session for `key`, creating one in the initial state if absent.
    async fn get_or_create(&self, key: &SessionKey) -> AppResult<Session>;

    /// Upserts the session, refreshing its activity timestamp.
    async fn save(&self, session: &Session) -> AppResult<()>;

    /// Sessions in `tenant`'s namespace idle since before `cutoff`, one page at a time.
    async fn find_stale(
        &self,
        tenant: Option<TenantId>,
        cutoff: DateTime<Utc>,
        limit: usize,
        offset: usize,
    ) -> AppResult<Vec<Session>>;

    /// Deletes `tenant`'s sessions idle since before `cutoff`; returns how many.
    async fn delete_stale(&self, tenant: Option<TenantId>, cutoff: DateTime<Utc>) -> AppResult<usize>;

    /// Deletes stale sessions across every namespace; returns how many.
    async fn delete_stale_all(&self, cutoff: DateTime<Utc>) -> AppResult<usize>;
}

/// SQLite-backed store. Sessions live in the `sessions` table with the state
/// machine position and flow payload as JSON columns.
pub struct SqliteSessionStore {
    pool: Arc<DbPool>,
}

// The admin namespace is stored as tenant id 0: SQLite composite primary
// keys treat NULLs as distinct, which would allow duplicate admin rows.
// Shop row ids start at 1, so 0 is never a real tenant.
fn encode_tenant(tenant: Option<TenantId>) -> i64 {
    tenant.map(|t| t.0).unwrap_or(0)
}

fn decode_tenant(raw: i64) -> Option<TenantId> {
    if raw == 0 {
        None
    } else {
        Some(TenantId(raw))
    }
}

fn parse_timestamp(raw: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::Validation(format!("bad session timestamp {raw:?}: {e}")))
}

fn row_to_session(row: &Row<'_>) -> rusqlite::Result<(i64, i64, String, String, String, String, String)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

impl SqliteSessionStore {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    fn decode(raw: (i64, i64, String, String, String, String, String)) -> AppResult<Session> {
        let (tenant_raw, user_id, state_json, flow_json, attrs_json, language, ts) = raw;
        let state: SessionState = serde_json::from_str(&state_json)?;
        let flow_data: FlowData = serde_json::from_str(&flow_json)?;
        let attributes: HashMap<String, String> = serde_json::from_str(&attrs_json)?;

        Ok(Session {
            key: SessionKey::new(decode_tenant(tenant_raw), user_id),
            state,
            last_activity_at: parse_timestamp(&ts)?,
            language,
            flow_data,
            attributes,
        })
    }

    fn load(&self, key: &SessionKey) -> AppResult<Option<Session>> {
        let conn = get_connection(&self.pool)?;
        let raw = conn
            .query_row(
                "SELECT tenant_id, user_id, state, flow_data, attributes, language, last_activity_at
                 FROM sessions WHERE tenant_id = ?1 AND user_id = ?2",
                params![encode_tenant(key.tenant_id), key.user_id],
                row_to_session,
            )
            .optional()?;

        raw.map(Self::decode).transpose()
    }

    fn upsert(&self, session: &Session, last_activity_at: DateTime<Utc>) -> AppResult<()> {
        let conn = get_connection(&self.pool)?;
        conn.execute(
            "INSERT INTO sessions (tenant_id, user_id, state, flow_data, attributes, language, last_activity_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(tenant_id, user_id) DO UPDATE SET
                 state = excluded.state,
                 flow_data = excluded.flow_data,
                 attributes = excluded.attributes,
                 language = excluded.language,
                 last_activity_at = excluded.last_activity_at",
            params![
                encode_tenant(session.key.tenant_id),
                session.key.user_id,
                serde_json::to_string(&session.state)?,
                serde_json::to_string(&session.flow_data)?,
                serde_json::to_string(&session.attributes)?,
                session.language,
                last_activity_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn get_or_create(&self, key: &SessionKey) -> AppResult<Session> {
        if let Some(session) = self.load(key)? {
            return Ok(session);
        }

        let session = Session::new(*key);
        self.upsert(&session, session.last_activity_at)?;
        log::debug!("Created session for {}", key);
        Ok(session)
    }

    async fn save(&self, session: &Session) -> AppResult<()> {
        self.upsert(session, Utc::now())
    }

    async fn find_stale(
        &self,
        tenant: Option<TenantId>,
        cutoff: DateTime<Utc>,
        limit: usize,
        offset: usize,
    ) -> AppResult<Vec<Session>> {
        let conn = get_connection(&self.pool)?;
        let mut stmt = conn.prepare(
            "SELECT tenant_id, user_id, state, flow_data, attributes, language, last_activity_at
             FROM sessions
             WHERE tenant_id = ?1 AND last_activity_at < ?2
             ORDER BY last_activity_at ASC
             LIMIT ?3 OFFSET ?4",
        )?;

        let rows = stmt.query_map(
            params![
                encode_tenant(tenant),
                cutoff.to_rfc3339(),
                limit as i64,
                offset as i64
            ],
            row_to_session,
        )?;

        let mut sessions = Vec::new();
        for raw in rows {
            sessions.push(Self::decode(raw?)?);
        }
        Ok(sessions)
    }

    async fn delete_stale(&self, tenant: Option<TenantId>, cutoff: DateTime<Utc>) -> AppResult<usize> {
        let conn = get_connection(&self.pool)?;
        let deleted = conn.execute(
            "DELETE FROM sessions WHERE tenant_id = ?1 AND last_activity_at < ?2",
            params![encode_tenant(tenant), cutoff.to_rfc3339()],
        )?;
        Ok(deleted)
    }

    async fn delete_stale_all(&self, cutoff: DateTime<Utc>) -> AppResult<usize> {
        let conn = get_connection(&self.pool)?;
        let deleted = conn.execute(
            "DELETE FROM sessions WHERE last_activity_at < ?1",
            params![cutoff.to_rfc3339()],
        )?;
        Ok(deleted)
    }
}
