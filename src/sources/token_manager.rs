use std::sync::Arc;

use tracing::{error, info, warn};

use crate::cache::credential::{Credential, CredentialStore, SafetyMargins, TokenGrant};
use crate::config::secret::SecretProvider;
use crate::error::{AgentError, UpstreamError};
use crate::helpers::time::Clock;
use crate::observability::metrics::get_metrics;
use crate::sources::psn_auth::PsnAuth;
use crate::utils::constants::truncate_diagnostic;

const KIND_FULL: &str = "full";
const KIND_REFRESH: &str = "refresh";

/// Produces a usable access credential, exchanging or refreshing on demand.
pub struct TokenManager<A> {
    auth: A,
    store: CredentialStore,
    secret: Arc<dyn SecretProvider>,
    clock: Arc<dyn Clock>,
    margins: SafetyMargins,
}

impl<A: PsnAuth> TokenManager<A> {
    pub fn new(
        auth: A,
        store: CredentialStore,
        secret: Arc<dyn SecretProvider>,
        clock: Arc<dyn Clock>,
        margins: SafetyMargins,
    ) -> Self {
        Self { auth, store, secret, clock, margins }
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// 1. cached access token still inside its margin: returned as is, no I/O
    /// 2. refresh token still inside its margin: one refresh exchange
    /// 3. otherwise: full exchange from the long-lived secret
    ///
    /// A failed refresh is returned as `ExchangeFailed`; it does not fall
    /// through to a full exchange.
    pub async fn get_valid_credential(&self) -> Result<Arc<Credential>, AgentError> {
        let now = self.clock.now();
        if let Some(current) = self.store.get().await {
            if current.access_valid_at(now) {
                return Ok(current);
            }
            if current.refresh_valid_at(now) {
                return self.refresh(&current.refresh_token).await;
            }
            info!("stored credential fully expired");
        }
        self.full_exchange().await
    }

    /// Drop the stored credential so the next call re-exchanges from the secret.
    pub async fn invalidate(&self) {
        warn!("invalidating stored PSN credential");
        self.store.clear().await;
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Arc<Credential>, AgentError> {
        info!("refreshing PSN access token");
        let grant = self.auth.exchange_refresh_token(refresh_token).await;
        self.store_grant(KIND_REFRESH, grant).await
    }

    async fn full_exchange(&self) -> Result<Arc<Credential>, AgentError> {
        let Some(secret) = self.secret.long_lived_secret() else {
            error!("no PSN secret configured");
            record_exchange(KIND_FULL, "missing_secret").await;
            return Err(AgentError::CredentialMissing);
        };

        info!("exchanging long-lived secret for a new token pair");
        let grant = match self.auth.exchange_secret_for_code(&secret).await {
            Ok(code) => self.auth.exchange_code_for_tokens(&code).await,
            Err(err) => Err(err),
        };
        self.store_grant(KIND_FULL, grant).await
    }

    async fn store_grant(
        &self,
        kind: &'static str,
        grant: Result<TokenGrant, UpstreamError>,
    ) -> Result<Arc<Credential>, AgentError> {
        match grant {
            Ok(grant) => {
                let credential = Credential::from_grant(grant, self.clock.now(), self.margins);
                info!(
                    kind,
                    access_expires_at = %credential.access_expires_at,
                    refresh_expires_at = %credential.refresh_expires_at,
                    "stored new PSN credential"
                );
                record_exchange(kind, "success").await;
                Ok(self.store.replace(credential).await)
            }
            Err(err) => {
                error!(kind, "credential exchange failed: {}", err);
                record_exchange(kind, "failure").await;
                Err(AgentError::ExchangeFailed(truncate_diagnostic(&err.to_string())))
            }
        }
    }
}

async fn record_exchange(kind: &'static str, outcome: &'static str) {
    get_metrics()
        .await
        .credential_exchanges
        .with_label_values(&[kind, outcome])
        .inc();
}
