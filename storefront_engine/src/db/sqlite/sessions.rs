//! Sqlite operations for buyer sessions.
//!
//! Generally clients should never call these methods directly, and prefer to use the [`AuthManagement`] trait methods
//! that are implemented on the [`SqliteDatabase`] struct instead.
//!
//! [`AuthManagement`]: crate::traits::AuthManagement
//! [`SqliteDatabase`]: crate::SqliteDatabase
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};

use super::SqliteDatabaseError;
use crate::db_types::{Role, Session};

#[derive(Debug, FromRow)]
struct SessionRow {
    buyer_id: i64,
    roles: String,
    expires_at: DateTime<Utc>,
}

fn roles_to_string(roles: &[Role]) -> String {
    roles.iter().map(Role::to_string).collect::<Vec<_>>().join(",")
}

pub async fn fetch_session(token_hash: &str, conn: &mut SqliteConnection) -> Result<Option<Session>, SqliteDatabaseError> {
    let row: Option<SessionRow> =
        sqlx::query_as("SELECT buyer_id, roles, expires_at FROM sessions WHERE token_hash = $1")
            .bind(token_hash)
            .fetch_optional(conn)
            .await?;
    let Some(row) = row else {
        return Ok(None);
    };
    let roles = row
        .roles
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.parse::<Role>())
        .collect::<Result<Vec<Role>, _>>()?;
    Ok(Some(Session { buyer_id: row.buyer_id, roles, expires_at: row.expires_at }))
}

pub async fn upsert_session(
    token_hash: &str,
    buyer_id: i64,
    roles: &[Role],
    expires_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    sqlx::query(
        r#"
            INSERT INTO sessions (token_hash, buyer_id, roles, expires_at) VALUES ($1, $2, $3, $4)
            ON CONFLICT (token_hash) DO UPDATE SET
                buyer_id = excluded.buyer_id,
                roles = excluded.roles,
                expires_at = excluded.expires_at
        "#,
    )
    .bind(token_hash)
    .bind(buyer_id)
    .bind(roles_to_string(roles))
    .bind(expires_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn revoke_session(token_hash: &str, conn: &mut SqliteConnection) -> Result<(), SqliteDatabaseError> {
    sqlx::query("DELETE FROM sessions WHERE token_hash = $1").bind(token_hash).execute(conn).await?;
    Ok(())
}
