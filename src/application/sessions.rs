//! Bearer/cookie session tokens standing in for the external login system.
//!
//! A token has the shape `ys_{prefix}_{secret}`. Only the prefix and the
//! SHA-256 of the secret are stored; lookups go by prefix and the digest is
//! compared in constant time.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::application::context::Actor;
use crate::application::repos::{CreateSessionParams, RepoError, SessionsRepo, UsersRepo};
use crate::domain::entities::SessionRecord;

const TOKEN_PREFIX: &str = "ys";
const PREFIX_LEN: usize = 12;
const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid session token")]
    Invalid,
    #[error("session expired")]
    Expired,
    #[error("session revoked")]
    Revoked,
    #[error("user `{0}` does not exist")]
    UnknownUser(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct SessionIssued {
    pub record: SessionRecord,
    pub token: String,
}

#[derive(Clone)]
pub struct SessionService {
    sessions: Arc<dyn SessionsRepo>,
    users: Arc<dyn UsersRepo>,
}

impl SessionService {
    pub fn new(sessions: Arc<dyn SessionsRepo>, users: Arc<dyn UsersRepo>) -> Self {
        Self { sessions, users }
    }

    /// Issue a fresh token for `username`. `ttl` of `None` never expires.
    pub async fn issue(
        &self,
        username: &str,
        ttl: Option<Duration>,
    ) -> Result<SessionIssued, SessionError> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| SessionError::UnknownUser(username.to_string()))?;

        let prefix = generate_prefix();
        let secret = generate_secret();
        let token = format!("{TOKEN_PREFIX}_{prefix}_{secret}");

        let record = self
            .sessions
            .create_session(CreateSessionParams {
                user_id: user.id,
                prefix,
                hashed_secret: hash_secret(&secret),
                expires_at: ttl.map(|ttl| OffsetDateTime::now_utc() + ttl),
            })
            .await?;

        Ok(SessionIssued { record, token })
    }

    /// Resolve a presented token into the acting user.
    pub async fn authenticate(&self, token: &str) -> Result<Actor, SessionError> {
        let parsed = parse_token(token).ok_or(SessionError::Invalid)?;
        let record = self
            .sessions
            .find_by_prefix(parsed.prefix)
            .await?
            .ok_or(SessionError::Invalid)?;

        let now = OffsetDateTime::now_utc();
        if let Some(revoked_at) = record.revoked_at
            && revoked_at <= now
        {
            return Err(SessionError::Revoked);
        }
        if let Some(expires_at) = record.expires_at
            && expires_at <= now
        {
            return Err(SessionError::Expired);
        }

        let presented = hash_secret(parsed.secret);
        if record.hashed_secret.ct_eq(&presented).unwrap_u8() == 0 {
            return Err(SessionError::Invalid);
        }

        let user = self
            .users
            .find_by_id(record.user_id)
            .await?
            .ok_or(SessionError::Invalid)?;
        Ok(Actor::from(user))
    }
}

struct ParsedToken<'a> {
    prefix: &'a str,
    secret: &'a str,
}

fn parse_token(token: &str) -> Option<ParsedToken<'_>> {
    let mut parts = token.trim().splitn(3, '_');
    if parts.next()? != TOKEN_PREFIX {
        return None;
    }
    let prefix = parts.next()?;
    let secret = parts.next()?;
    if prefix.len() != PREFIX_LEN || secret.len() < MIN_SECRET_LEN {
        return None;
    }
    Some(ParsedToken { prefix, secret })
}

fn hash_secret(secret: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.finalize().to_vec()
}

fn generate_prefix() -> String {
    Uuid::new_v4().simple().to_string()[..PREFIX_LEN].to_string()
}

fn generate_secret() -> String {
    let mut raw = Vec::with_capacity(32);
    raw.extend_from_slice(Uuid::new_v4().as_bytes());
    raw.extend_from_slice(Uuid::new_v4().as_bytes());
    hex::encode(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_parse_back() {
        let prefix = generate_prefix();
        let secret = generate_secret();
        let token = format!("{TOKEN_PREFIX}_{prefix}_{secret}");

        let parsed = parse_token(&token).expect("token parses");
        assert_eq!(parsed.prefix, prefix);
        assert_eq!(parsed.secret, secret);
    }

    #[test]
    fn foreign_or_truncated_tokens_are_rejected() {
        assert!(parse_token("sk_abcdefabcdef_0123456789abcdef0123456789abcdef").is_none());
        assert!(parse_token("ys_short_0123456789abcdef0123456789abcdef").is_none());
        assert!(parse_token("ys_abcdefabcdef_tooshort").is_none());
        assert!(parse_token("").is_none());
    }

    #[test]
    fn secret_hash_is_sha256() {
        assert_eq!(hash_secret("secret").len(), 32);
        assert_ne!(hash_secret("a"), hash_secret("b"));
    }
}
