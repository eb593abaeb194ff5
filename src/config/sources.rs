use serde::Deserialize;

use crate::config::secret::SecretConfig;
use crate::config::settings::SettingsConfig;
use crate::utils::constants::{
    BANGUMI_API_BASE_URL, DEFAULT_ACCESS_MARGIN_SECS, DEFAULT_ENRICHMENT_CONCURRENCY, DEFAULT_PSN_CACHE_TTL_SECS,
    DEFAULT_REFRESH_MARGIN_SECS, DEFAULT_SUBJECT_CACHE_TTL_SECS, PSN_API_BASE_URL, PSN_AUTH_BASE_URL,
};

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub settings: SettingsConfig,
    #[serde(default)]
    pub psn: PsnConfig,
    #[serde(default)]
    pub bangumi: BangumiConfig,
}

/// ================================
/// Trophy service
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct PsnConfig {
    #[serde(default = "default_psn_auth_base_url")]
    pub auth_base_url: String,
    #[serde(default = "default_psn_api_base_url")]
    pub api_base_url: String,
    /// `me` addresses the account that owns the credential.
    #[serde(default = "default_account_id")]
    pub account_id: String,
    #[serde(default = "default_access_margin")]
    pub access_margin_seconds: u64,
    #[serde(default = "default_refresh_margin")]
    pub refresh_margin_seconds: u64,
    #[serde(default = "default_psn_cache_ttl")]
    pub cache_ttl_seconds: u64,
    #[serde(default)]
    pub secret: SecretConfig,
}

impl Default for PsnConfig {
    fn default() -> Self {
        Self {
            auth_base_url: default_psn_auth_base_url(),
            api_base_url: default_psn_api_base_url(),
            account_id: default_account_id(),
            access_margin_seconds: default_access_margin(),
            refresh_margin_seconds: default_refresh_margin(),
            cache_ttl_seconds: default_psn_cache_ttl(),
            secret: SecretConfig::default(),
        }
    }
}

/// ================================
/// Collection-tracking service
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct BangumiConfig {
    #[serde(default = "default_bangumi_api_base_url")]
    pub api_base_url: String,
    /// Used when a request names no user.
    pub default_user: Option<String>,
    pub access_token: Option<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_subject_ttl")]
    pub subject_ttl_seconds: u64,
    #[serde(default = "default_enrichment_concurrency")]
    pub enrichment_concurrency: usize,
}

impl Default for BangumiConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_bangumi_api_base_url(),
            default_user: None,
            access_token: None,
            user_agent: default_user_agent(),
            subject_ttl_seconds: default_subject_ttl(),
            enrichment_concurrency: default_enrichment_concurrency(),
        }
    }
}

fn default_psn_auth_base_url() -> String {
    PSN_AUTH_BASE_URL.to_owned()
}

fn default_psn_api_base_url() -> String {
    PSN_API_BASE_URL.to_owned()
}

fn default_account_id() -> String {
    "me".to_owned()
}

fn default_access_margin() -> u64 {
    DEFAULT_ACCESS_MARGIN_SECS
}

fn default_refresh_margin() -> u64 {
    DEFAULT_REFRESH_MARGIN_SECS
}

fn default_psn_cache_ttl() -> u64 {
    DEFAULT_PSN_CACHE_TTL_SECS
}

fn default_bangumi_api_base_url() -> String {
    BANGUMI_API_BASE_URL.to_owned()
}

fn default_user_agent() -> String {
    concat!("trophy-agent/", env!("CARGO_PKG_VERSION")).to_owned()
}

fn default_subject_ttl() -> u64 {
    DEFAULT_SUBJECT_CACHE_TTL_SECS
}

fn default_enrichment_concurrency() -> usize {
    DEFAULT_ENRICHMENT_CONCURRENCY
}
