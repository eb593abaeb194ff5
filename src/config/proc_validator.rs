//! Configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - Server bind address, metrics path, log level
//! - Upstream base URLs, timeouts, TTLs, safety margins, fan-out width

use tracing::{error, info};

use crate::config::settings::SettingsConfig;
use crate::config::sources::{BangumiConfig, PsnConfig, ServiceConfig};
use crate::observability::metrics::get_metrics;

const ONE_YEAR_SECS: u64 = 60 * 60 * 24 * 365;

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub async fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_settings(&cfg.settings, &mut errors);
    validate_psn(&cfg.psn, &mut errors);
    validate_bangumi(&cfg.bangumi, &mut errors);

    if errors.is_empty() {
        info!("config valid");
        Ok(())
    } else {
        error!("configuration validation errors ({}):", errors.len());
        for e in &errors {
            error!(" - {}", e);
        }
        get_metrics().await.config_validation_errors.inc_by(errors.len() as u64);
        Err(errors)
    }
}

/// SETTINGS VALIDATION
fn validate_settings(settings: &SettingsConfig, errors: &mut Vec<String>) {
    if settings.server.host.trim().is_empty() {
        errors.push(format!(
            "settings.server.host '{}' must be valid",
            settings.server.host
        ));
    }
    if settings.server.port.parse::<u16>().is_err() {
        errors.push(format!(
            "settings.server.port '{}' must be an integer in range 0-65535",
            settings.server.port
        ));
    }

    // metrics endpoint start with '/'
    let metrics = &settings.metrics;
    if !metrics.path.starts_with('/') {
        errors.push(format!(
            "settings.metrics.path '{}' must start with '/'",
            metrics.path
        ));
    }

    if settings.upstream.timeout_ms == 0 {
        errors.push("settings.upstream.timeout_ms must be > 0".to_string());
    }

    // logging level
    if let Some(logging) = &settings.logging {
        let valid = ["trace", "debug", "info", "warn", "error"];
        if !valid.contains(&logging.level.to_lowercase().as_str()) {
            errors.push(format!(
                "settings.logging.level '{}' invalid; allowed: {:?}",
                logging.level, valid
            ));
        }
    }
}

fn validate_psn(psn: &PsnConfig, errors: &mut Vec<String>) {
    validate_base_url("psn.auth_base_url", &psn.auth_base_url, errors);
    validate_base_url("psn.api_base_url", &psn.api_base_url, errors);

    if psn.account_id.is_empty() {
        errors.push("psn.account_id cannot be empty".to_string());
    }
    for (name, value) in [
        ("psn.access_margin_seconds", psn.access_margin_seconds),
        ("psn.refresh_margin_seconds", psn.refresh_margin_seconds),
    ] {
        if value > ONE_YEAR_SECS {
            errors.push(format!("{} ({}) is unreasonably large", name, value));
        }
    }
    validate_ttl("psn.cache_ttl_seconds", psn.cache_ttl_seconds, errors);

    let secret = &psn.secret;
    if secret.plain_env.iter().any(|name| name.trim().is_empty()) {
        errors.push("psn.secret.plain_env: env name cannot be empty".to_string());
    }
    if secret.encrypted_env.trim().is_empty() || secret.key_env.trim().is_empty() {
        errors.push("psn.secret.encrypted_env and psn.secret.key_env cannot be empty".to_string());
    }
}

fn validate_bangumi(bangumi: &BangumiConfig, errors: &mut Vec<String>) {
    validate_base_url("bangumi.api_base_url", &bangumi.api_base_url, errors);

    if bangumi.user_agent.is_empty() {
        errors.push("bangumi.user_agent cannot be empty".to_string());
    }
    validate_ttl("bangumi.subject_ttl_seconds", bangumi.subject_ttl_seconds, errors);
    if bangumi.enrichment_concurrency == 0 {
        errors.push("bangumi.enrichment_concurrency must be > 0".to_string());
    }
}

fn validate_ttl(path: &str, value: u64, errors: &mut Vec<String>) {
    if value == 0 {
        errors.push(format!("{} must be > 0", path));
    } else if value > ONE_YEAR_SECS {
        errors.push(format!("{} ({}) is unreasonably large", path, value));
    }
}

fn validate_base_url(path: &str, url: &str, errors: &mut Vec<String>) {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        errors.push(format!("{}: '{}' must be an http(s) URL", path, url));
    }
}
