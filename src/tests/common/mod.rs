// tests/common/mod.rs
pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;

use crate::cache::credential::{CredentialStore, SafetyMargins, TokenGrant};
use crate::cache::store::{CacheStore, CacheTtls};
use crate::config::secret::SecretProvider;
use crate::config::settings::{MetricsConfig, ServerConfig, SettingsConfig, UpstreamConfig};
use crate::error::UpstreamError;
use crate::helpers::time::ManualClock;
use crate::sources::psn_auth::PsnAuth;
use crate::sources::token_manager::TokenManager;
use crate::{BangumiConfig, PsnConfig, ServiceConfig};

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

pub fn build_reqwest_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .expect("reqwest client")
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 16, 12, 0, 0).unwrap()
}

pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(start_time()))
}

pub const MARGINS: SafetyMargins = SafetyMargins {
    access_seconds: 30,
    refresh_seconds: 60,
};

/// Default grant lifetimes; every grant gets a fresh sequence number.
pub const ACCESS_LIFETIME: i64 = 3600;
pub const REFRESH_LIFETIME: i64 = 7200;

pub struct FixedSecret(pub Option<String>);

impl SecretProvider for FixedSecret {
    fn long_lived_secret(&self) -> Option<String> {
        self.0.clone()
    }
}

pub fn secret(value: &str) -> Arc<dyn SecretProvider> {
    Arc::new(FixedSecret(Some(value.to_owned())))
}

/// In-memory auth API that counts calls.
#[derive(Default)]
pub struct FakeAuth {
    pub code_calls: AtomicUsize,
    pub token_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub fail_code: AtomicBool,
    pub fail_refresh: AtomicBool,
    pub refresh_delay_ms: AtomicUsize,
    pub access_lifetime: AtomicI64,
    pub refresh_lifetime: AtomicI64,
    sequence: AtomicUsize,
}

impl FakeAuth {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            access_lifetime: AtomicI64::new(ACCESS_LIFETIME),
            refresh_lifetime: AtomicI64::new(REFRESH_LIFETIME),
            ..Self::default()
        })
    }

    pub fn exchanges(&self) -> (usize, usize, usize) {
        (
            self.code_calls.load(Ordering::SeqCst),
            self.token_calls.load(Ordering::SeqCst),
            self.refresh_calls.load(Ordering::SeqCst),
        )
    }

    fn next_grant(&self) -> TokenGrant {
        let n = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        TokenGrant {
            access_token: format!("access-{n}"),
            expires_in: self.access_lifetime.load(Ordering::SeqCst),
            refresh_token: format!("refresh-{n}"),
            refresh_token_expires_in: self.refresh_lifetime.load(Ordering::SeqCst),
        }
    }
}

impl PsnAuth for Arc<FakeAuth> {
    async fn exchange_secret_for_code(&self, secret: &str) -> Result<String, UpstreamError> {
        self.code_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_code.load(Ordering::SeqCst) {
            return Err(UpstreamError::Status { status: 400, body: "bad npsso".into() });
        }
        Ok(format!("code-for-{secret}"))
    }

    async fn exchange_code_for_tokens(&self, _code: &str) -> Result<TokenGrant, UpstreamError> {
        self.token_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.next_grant())
    }

    async fn exchange_refresh_token(&self, _refresh_token: &str) -> Result<TokenGrant, UpstreamError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.refresh_delay_ms.load(Ordering::SeqCst) as u64;
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_refresh.load(Ordering::SeqCst) {
            return Err(UpstreamError::Unauthorized);
        }
        Ok(self.next_grant())
    }
}

pub fn token_manager(
    auth: Arc<FakeAuth>,
    secret: Arc<dyn SecretProvider>,
    clock: Arc<ManualClock>,
) -> Arc<TokenManager<Arc<FakeAuth>>> {
    Arc::new(TokenManager::new(auth, CredentialStore::new(), secret, clock, MARGINS))
}

pub fn cache_store(clock: Arc<ManualClock>) -> CacheStore {
    CacheStore::new(
        CacheTtls {
            psn: chrono::Duration::seconds(60),
            subjects: chrono::Duration::seconds(600),
        },
        clock,
    )
}

/// Service config with every upstream pointed at `base` (an httpmock server).
pub fn service_config(base: &str) -> ServiceConfig {
    ServiceConfig {
        settings: SettingsConfig {
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: "0".into(),
            },
            metrics: MetricsConfig {
                path: "/metrics".into(),
                is_enabled: true,
            },
            upstream: UpstreamConfig { timeout_ms: 2000 },
            logging: None,
        },
        psn: PsnConfig {
            auth_base_url: format!("{base}/api/authz/v3/oauth"),
            api_base_url: format!("{base}/api"),
            ..PsnConfig::default()
        },
        bangumi: BangumiConfig {
            api_base_url: format!("{base}/v0"),
            user_agent: "trophy-agent-test".into(),
            ..BangumiConfig::default()
        },
    }
}
