use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::helpers::time::expires_at_with_margin;

/// Token pair as returned by the auth endpoint, lifetimes in seconds.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub expires_in: i64,
    pub refresh_token: String,
    pub refresh_token_expires_in: i64,
}

/// Access/refresh pair with expiry instants already reduced by the safety margins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

/// Safety margins subtracted from upstream-declared lifetimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafetyMargins {
    pub access_seconds: i64,
    pub refresh_seconds: i64,
}

impl Credential {
    pub fn from_grant(grant: TokenGrant, now: DateTime<Utc>, margins: SafetyMargins) -> Self {
        Self {
            access_expires_at: expires_at_with_margin(now, grant.expires_in, margins.access_seconds),
            refresh_expires_at: expires_at_with_margin(
                now,
                grant.refresh_token_expires_in,
                margins.refresh_seconds,
            ),
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
        }
    }

    pub fn access_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.access_expires_at
    }

    pub fn refresh_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.refresh_expires_at
    }
}

/// Holder of the current credential.
///
/// The credential is swapped as a whole `Arc`, so a reader sees either the old
/// pair or the new one, never a mix of both.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    inner: Arc<RwLock<Option<Arc<Credential>>>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self) -> Option<Arc<Credential>> {
        self.inner.read().await.clone()
    }

    /// Last writer wins.
    pub async fn replace(&self, credential: Credential) -> Arc<Credential> {
        let credential = Arc::new(credential);
        *self.inner.write().await = Some(credential.clone());
        credential
    }

    pub async fn clear(&self) {
        *self.inner.write().await = None;
    }
}
