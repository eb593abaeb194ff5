use std::{fs, path::Path};

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use tracing::{debug, error};

use crate::config::proc_initiateor::initiate_default_values;
use crate::config::proc_validator;
use crate::config::settings::LoggingConfig;
use crate::config::sources::ServiceConfig;
use crate::observability::metrics::get_metrics;

/// Load and validate config from YAML file
pub async fn file_to_config(path: &Path) -> Result<ServiceConfig> {
    let content = fs::read_to_string(path).with_context(|| format!("cannot read config file {}", path.display()))?;

    let expanded = expand_env_vars(&content)?;
    parse_config(expanded).await
}

pub async fn parse_config(content: String) -> Result<ServiceConfig> {
    let metrics = get_metrics().await;
    let mut service_config: ServiceConfig = serde_yaml::from_str(&content).inspect_err(|e| {
        error!("parse config error: {}", e);
        metrics.config_parse_failures.inc();
    })?;

    // Apply defaults
    if service_config.settings.logging.is_none() {
        service_config.settings.logging = Some(LoggingConfig::default());
    }
    service_config = initiate_default_values(service_config);

    debug!("validation config ...");
    proc_validator::validate_service_config(&service_config)
        .await
        .map_err(|errors| {
            anyhow!(
                "config is not valid, total errors: {}\n{}",
                errors.len(),
                errors.join("\n")
            )
        })?;

    Ok(service_config)
}

/// Replace `${VAR}` and `${VAR:default}` with the environment value, the
/// default, or an empty string.
pub fn expand_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{(\w+)(?::([^\}]*))?\}")?;
    Ok(re
        .replace_all(input, |caps: &regex::Captures| {
            let var = &caps[1];
            let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            std::env::var(var).unwrap_or_else(|_| default.to_string())
        })
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    const MINIMAL: &str = r#"
settings:
  server:
    host: 127.0.0.1
    port: "8080"
"#;

    #[tokio::test]
    async fn minimal_config_gets_defaults() {
        let cfg = parse_config(MINIMAL.to_owned()).await.unwrap();
        assert_eq!(cfg.settings.upstream.timeout_ms, 2800);
        assert_eq!(cfg.settings.metrics.path, "/metrics");
        assert!(!cfg.settings.metrics.is_enabled);
        assert_eq!(cfg.settings.logging.as_ref().map(|l| l.level.as_str()), Some("info"));
        assert_eq!(cfg.psn.account_id, "me");
        assert_eq!(cfg.psn.access_margin_seconds, 30);
        assert_eq!(cfg.psn.refresh_margin_seconds, 60);
        assert_eq!(cfg.psn.cache_ttl_seconds, 60);
        assert_eq!(cfg.psn.secret.plain_env, vec!["PSN_NPSSO", "PSN_TOKEN"]);
        assert_eq!(cfg.bangumi.subject_ttl_seconds, 600);
        assert_eq!(cfg.bangumi.enrichment_concurrency, 6);
        assert_eq!(cfg.bangumi.api_base_url, "https://api.bgm.tv/v0");
    }

    #[tokio::test]
    async fn invalid_config_reports_every_problem() {
        let yaml = r#"
settings:
  server:
    host: ""
    port: "not-a-port"
  logging:
    level: loud
    format: json
  upstream:
    timeout_ms: 0
psn:
  api_base_url: ftp://example
bangumi:
  enrichment_concurrency: 0
"#;
        let err = parse_config(yaml.to_owned()).await.unwrap_err().to_string();
        assert!(err.contains("total errors: 6"), "{err}");
        assert!(err.contains("settings.server.host"));
        assert!(err.contains("settings.server.port"));
        assert!(err.contains("settings.logging.level"));
        assert!(err.contains("settings.upstream.timeout_ms"));
        assert!(err.contains("psn.api_base_url"));
        assert!(err.contains("bangumi.enrichment_concurrency"));
    }

    #[tokio::test]
    async fn unparsable_yaml_is_an_error() {
        assert!(parse_config("settings: [".to_owned()).await.is_err());
    }

    #[tokio::test]
    #[serial]
    async fn file_is_loaded_with_env_expansion() {
        std::env::set_var("TA_LOADER_PORT", "9191");
        std::env::remove_var("TA_LOADER_USER");

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
settings:
  server:
    host: 0.0.0.0
    port: "${{TA_LOADER_PORT}}"
bangumi:
  default_user: "${{TA_LOADER_USER:fallback-user}}"
  access_token: "${{TA_LOADER_TOKEN_UNSET}}"
  api_base_url: https://api.bgm.tv/v0/
"#
        )
        .unwrap();

        let cfg = file_to_config(file.path()).await.unwrap();
        assert_eq!(cfg.settings.server.port, "9191");
        assert_eq!(cfg.bangumi.default_user.as_deref(), Some("fallback-user"));
        assert_eq!(cfg.bangumi.access_token, None, "blank strings become absent");
        assert_eq!(cfg.bangumi.api_base_url, "https://api.bgm.tv/v0");

        std::env::remove_var("TA_LOADER_PORT");
    }

    #[test]
    #[serial]
    fn expansion_handles_missing_and_defaults() {
        std::env::remove_var("TA_EXPAND_MISSING");
        let out = expand_env_vars("a=${TA_EXPAND_MISSING} b=${TA_EXPAND_MISSING:x:y}").unwrap();
        assert_eq!(out, "a= b=x:y");
    }
}
