use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db_types::{Role, Session};

#[derive(Debug, Clone, Error)]
pub enum AuthApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("No session exists for the given token")]
    SessionNotFound,
    #[error("The session has expired")]
    SessionExpired,
    #[error("The requested role does not exist")]
    RoleNotFound,
}

impl From<sqlx::Error> for AuthApiError {
    fn from(e: sqlx::Error) -> Self {
        AuthApiError::DatabaseError(e.to_string())
    }
}

/// Sessions are issued by the external authentication service and shared with this one through the database. Tokens
/// are never stored in the clear; backends only ever see their hash.
#[allow(async_fn_in_trait)]
pub trait AuthManagement {
    async fn fetch_session(&self, token_hash: &str) -> Result<Option<Session>, AuthApiError>;

    async fn upsert_session(
        &self,
        token_hash: &str,
        buyer_id: i64,
        roles: &[Role],
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthApiError>;

    async fn revoke_session(&self, token_hash: &str) -> Result<(), AuthApiError>;
}
