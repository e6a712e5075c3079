//! PostgreSQL store
//!
//! Events live in an append-only `events` table with a unique
//! `(aggregate_id, version)` constraint; user documents and dashboard
//! snapshots are JSONB rows. `save_changes` runs in one transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::aggregate::{Aggregate, User, UserField};
use crate::domain::{OperationContext, UserEvent};
use crate::projection::UserDashboardStats;

use super::{
    check_append, DocumentChange, DocumentStore, EventStore, MatchMode, SessionChanges,
    SnapshotStore, StoreError, StoredEvent, UserStore,
};

/// Unique index enforcing case-insensitive email uniqueness
const EMAIL_UNIQUE_INDEX: &str = "user_documents_email_key";

type EventRow = (
    Uuid,
    Uuid,
    i64,
    String,
    serde_json::Value,
    serde_json::Value,
    DateTime<Utc>,
);

#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map a unique violation to the domain meaning of the constraint
fn classify_write_error(err: sqlx::Error, stream_id: Uuid, expected: i64) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return match db_err.constraint() {
                Some(EMAIL_UNIQUE_INDEX) => StoreError::UniqueViolation("email".to_string()),
                _ => StoreError::ConcurrencyConflict {
                    stream_id,
                    expected,
                    actual: expected + 1,
                },
            };
        }
    }
    StoreError::Database(err)
}

fn decode_event(row: EventRow) -> Result<StoredEvent, StoreError> {
    let (id, stream_id, version, event_type, event_data, context, created_at) = row;
    Ok(StoredEvent {
        id,
        stream_id,
        version,
        event_type,
        event: serde_json::from_value(event_data)?,
        context: serde_json::from_value(context)?,
        recorded_at: created_at,
    })
}

async fn current_version(conn: &mut PgConnection, stream_id: Uuid) -> Result<i64, StoreError> {
    let version: i64 =
        sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM events WHERE aggregate_id = $1")
            .bind(stream_id)
            .fetch_one(&mut *conn)
            .await?;

    Ok(version)
}

async fn insert_event(
    conn: &mut PgConnection,
    stream_id: Uuid,
    event: &UserEvent,
    expected_version: Option<i64>,
    context: &OperationContext,
) -> Result<i64, StoreError> {
    let current = current_version(conn, stream_id).await?;
    check_append(stream_id, current, expected_version, event)?;

    let new_version = current + 1;
    sqlx::query(
        r#"
        INSERT INTO events (
            aggregate_type, aggregate_id, version,
            event_type, event_data, context
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(User::aggregate_type())
    .bind(stream_id)
    .bind(new_version)
    .bind(event.event_type())
    .bind(serde_json::to_value(event)?)
    .bind(serde_json::to_value(context)?)
    .execute(&mut *conn)
    .await
    .map_err(|e| classify_write_error(e, stream_id, current))?;

    Ok(new_version)
}

async fn write_document(conn: &mut PgConnection, user: &User) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO user_documents (id, data, version)
        VALUES ($1, $2, $3)
        ON CONFLICT (id)
        DO UPDATE SET data = EXCLUDED.data, version = EXCLUDED.version, updated_at = NOW()
        "#,
    )
    .bind(user.id())
    .bind(serde_json::to_value(user)?)
    .bind(user.version())
    .execute(&mut *conn)
    .await
    .map_err(|e| classify_write_error(e, user.id(), user.version()))?;

    Ok(())
}

async fn remove_document(conn: &mut PgConnection, id: Uuid) -> Result<(), StoreError> {
    sqlx::query("DELETE FROM user_documents WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn write_snapshot(
    conn: &mut PgConnection,
    snapshot: &UserDashboardStats,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO user_dashboard_stats (id, data, version)
        VALUES ($1, $2, $3)
        ON CONFLICT (id)
        DO UPDATE SET data = EXCLUDED.data, version = EXCLUDED.version, updated_at = NOW()
        WHERE user_dashboard_stats.version <= EXCLUDED.version
        "#,
    )
    .bind(snapshot.id)
    .bind(serde_json::to_value(snapshot)?)
    .bind(snapshot.version)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn overwrite_snapshot(
    conn: &mut PgConnection,
    snapshot: &UserDashboardStats,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO user_dashboard_stats (id, data, version)
        VALUES ($1, $2, $3)
        ON CONFLICT (id)
        DO UPDATE SET data = EXCLUDED.data, version = EXCLUDED.version, updated_at = NOW()
        "#,
    )
    .bind(snapshot.id)
    .bind(serde_json::to_value(snapshot)?)
    .bind(snapshot.version)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[async_trait]
impl EventStore for PgUserStore {
    async fn append_event(
        &self,
        stream_id: Uuid,
        event: &UserEvent,
        expected_version: Option<i64>,
        context: &OperationContext,
    ) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let version = insert_event(&mut tx, stream_id, event, expected_version, context).await?;
        tx.commit().await?;
        Ok(version)
    }

    async fn read_stream(&self, stream_id: Uuid) -> Result<Vec<StoredEvent>, StoreError> {
        let rows: Vec<EventRow> = sqlx::query_as(
            r#"
            SELECT id, aggregate_id, version, event_type, event_data, context, created_at
            FROM events
            WHERE aggregate_id = $1
            ORDER BY version ASC
            "#,
        )
        .bind(stream_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(decode_event).collect()
    }

    async fn stream_ids(&self) -> Result<Vec<Uuid>, StoreError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT aggregate_id FROM events WHERE version = 1 ORDER BY created_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}

#[async_trait]
impl DocumentStore for PgUserStore {
    async fn load_document(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let data: Option<serde_json::Value> =
            sqlx::query_scalar("SELECT data FROM user_documents WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(data.map(serde_json::from_value).transpose()?)
    }

    async fn upsert_document(&self, user: &User) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        write_document(&mut conn, user).await
    }

    async fn delete_document(&self, id: Uuid) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        remove_document(&mut conn, id).await
    }

    async fn query_documents(
        &self,
        field: UserField,
        value: &str,
        mode: MatchMode,
    ) -> Result<Vec<User>, StoreError> {
        // The field name is a bind parameter, never part of the SQL text
        let sql = match mode {
            MatchMode::Exact => {
                "SELECT data FROM user_documents WHERE data->>$1 = $2 ORDER BY created_at ASC"
            }
            MatchMode::IgnoreCase => {
                "SELECT data FROM user_documents WHERE lower(data->>$1) = lower($2) ORDER BY created_at ASC"
            }
        };

        let rows: Vec<serde_json::Value> = sqlx::query_scalar(sql)
            .bind(field.json_key())
            .bind(value)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|data| serde_json::from_value(data).map_err(StoreError::from))
            .collect()
    }
}

#[async_trait]
impl SnapshotStore for PgUserStore {
    async fn load_snapshot(&self, id: Uuid) -> Result<Option<UserDashboardStats>, StoreError> {
        let data: Option<serde_json::Value> =
            sqlx::query_scalar("SELECT data FROM user_dashboard_stats WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(data.map(serde_json::from_value).transpose()?)
    }

    async fn save_snapshot(&self, snapshot: &UserDashboardStats) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        write_snapshot(&mut conn, snapshot).await
    }

    async fn replace_snapshot(&self, snapshot: &UserDashboardStats) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        overwrite_snapshot(&mut conn, snapshot).await
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn save_changes(&self, changes: SessionChanges) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await?;

        let version = insert_event(
            &mut tx,
            changes.stream_id,
            &changes.event,
            changes.expected_version,
            &changes.context,
        )
        .await?;

        match &changes.document {
            DocumentChange::Upsert(user) => write_document(&mut tx, user).await?,
            DocumentChange::Delete => remove_document(&mut tx, changes.stream_id).await?,
        }

        if let Some(snapshot) = &changes.snapshot {
            write_snapshot(&mut tx, snapshot).await?;
        }

        tx.commit().await?;

        tracing::debug!(
            stream_id = %changes.stream_id,
            version = version,
            event_type = changes.event.event_type(),
            "Session changes committed"
        );

        Ok(version)
    }
}
