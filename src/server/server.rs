use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use chrono::Duration as TtlDuration;
use tracing::info;

use crate::aggregate::bangumi::BangumiService;
use crate::aggregate::psn::PsnService;
use crate::cache::credential::{CredentialStore, SafetyMargins};
use crate::cache::store::{CacheStore, CacheTtls};
use crate::config::secret::SecretProvider;
use crate::config::settings::MetricsConfig;
use crate::helpers::time::{Clock, SystemClock};
use crate::observability::metrics::{get_metrics, Metrics};
use crate::observability::routes::MetricsState;
use crate::server::routes;
use crate::sources::bangumi::BangumiClient;
use crate::sources::psn::PsnClient;
use crate::sources::psn_auth::PsnAuthClient;
use crate::sources::token_manager::TokenManager;
use crate::ServiceConfig;

#[derive(Clone)]
pub struct AppState {
    pub metrics_state: MetricsState,
    pub psn: PsnService,
    pub bangumi: BangumiService,
    pub default_bangumi_user: Option<String>,
}

impl AppState {
    /// Production wiring: system clock, secret from the configured env vars.
    pub fn from_config(service_config: &ServiceConfig, metrics: &Metrics) -> Result<Self> {
        Self::build(
            service_config,
            metrics,
            Arc::new(SystemClock),
            Arc::new(service_config.psn.secret.clone()),
        )
    }

    /// Every store is created here and injected; nothing below reaches for globals.
    pub fn build(
        service_config: &ServiceConfig,
        metrics: &Metrics,
        clock: Arc<dyn Clock>,
        secret: Arc<dyn SecretProvider>,
    ) -> Result<Self> {
        let psn_cfg = &service_config.psn;
        let bangumi_cfg = &service_config.bangumi;
        let timeout = Duration::from_millis(service_config.settings.upstream.timeout_ms);

        let caches = CacheStore::new(
            CacheTtls {
                psn: TtlDuration::seconds(psn_cfg.cache_ttl_seconds as i64),
                subjects: TtlDuration::seconds(bangumi_cfg.subject_ttl_seconds as i64),
            },
            clock.clone(),
        );

        let auth = PsnAuthClient::new(&psn_cfg.auth_base_url, timeout).context("building PSN auth client")?;
        let tokens = TokenManager::new(
            auth,
            CredentialStore::new(),
            secret,
            clock.clone(),
            SafetyMargins {
                access_seconds: psn_cfg.access_margin_seconds as i64,
                refresh_seconds: psn_cfg.refresh_margin_seconds as i64,
            },
        );
        let psn_client = PsnClient::new(&psn_cfg.api_base_url, &psn_cfg.account_id, timeout)
            .context("building PSN data client")?;

        let bangumi_client = BangumiClient::new(
            &bangumi_cfg.api_base_url,
            &bangumi_cfg.user_agent,
            bangumi_cfg.access_token.clone(),
            timeout,
        )
        .context("building Bangumi client")?;

        Ok(Self {
            metrics_state: MetricsState::new(metrics.registry.clone()),
            psn: PsnService::new(Arc::new(tokens), psn_client, caches.clone(), clock),
            bangumi: BangumiService::new(bangumi_client, caches.subjects, bangumi_cfg.enrichment_concurrency),
            default_bangumi_user: bangumi_cfg.default_user.clone(),
        })
    }
}

pub fn build_router(state: AppState, metrics_config: &MetricsConfig) -> Router {
    Router::new()
        .merge(state.metrics_state.router(metrics_config))
        .merge(routes::router())
        .with_state(state)
}

/// Bind the configured address and serve until Ctrl-C or SIGTERM.
pub async fn start(service_config: &ServiceConfig) -> Result<()> {
    let metrics = get_metrics().await;
    let state = AppState::from_config(service_config, metrics)?;
    let app = build_router(state, &service_config.settings.metrics);

    let bind_addr = format!(
        "{}:{}",
        service_config.settings.server.host, service_config.settings.server.port
    );
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("cannot bind {}", bind_addr))?;
    info!("listening on {}", bind_addr);

    metrics.up.set(1);
    let served = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await;
    metrics.up.set(0);
    info!("server stopped");

    served.context("http server failed")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
