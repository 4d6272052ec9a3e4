use blake2::{Blake2b512, Digest};
use chrono::{DateTime, Utc};
use log::{debug, trace};

use crate::{
    db_types::{Role, Session},
    traits::{AuthApiError, AuthManagement},
};

/// Hashes a bearer token the way the session store keys it: hex-encoded Blake2b-512.
pub fn hash_token(token: &str) -> String {
    hex::encode(Blake2b512::digest(token.as_bytes()))
}

/// Resolves bearer tokens into buyer sessions.
#[derive(Debug, Clone)]
pub struct AuthApi<B> {
    db: B,
}

impl<B> AuthApi<B>
where B: AuthManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Looks up the session for a bearer token. Unknown and expired tokens are both rejected.
    pub async fn authenticate(&self, token: &str) -> Result<Session, AuthApiError> {
        let session = self.db.fetch_session(&hash_token(token)).await?.ok_or(AuthApiError::SessionNotFound)?;
        if session.is_expired() {
            debug!("🔐️ Session for buyer #{} expired at {}", session.buyer_id, session.expires_at);
            return Err(AuthApiError::SessionExpired);
        }
        trace!("🔐️ Buyer #{} authenticated", session.buyer_id);
        Ok(session)
    }

    /// Registers a session for a token. The authentication service normally does this; it is exposed for tooling and
    /// tests.
    pub async fn register_session(
        &self,
        token: &str,
        buyer_id: i64,
        roles: &[Role],
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthApiError> {
        self.db.upsert_session(&hash_token(token), buyer_id, roles, expires_at).await
    }

    pub async fn revoke(&self, token: &str) -> Result<(), AuthApiError> {
        self.db.revoke_session(&hash_token(token)).await
    }
}
