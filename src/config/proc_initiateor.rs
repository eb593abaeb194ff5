use crate::ServiceConfig;

/// Post-parse normalization: blank optional strings become `None` and base
/// URLs lose trailing slashes so endpoint paths can be appended directly.
pub fn initiate_default_values(mut config: ServiceConfig) -> ServiceConfig {
    trim_base_url(&mut config.psn.auth_base_url);
    trim_base_url(&mut config.psn.api_base_url);
    trim_base_url(&mut config.bangumi.api_base_url);

    config.psn.account_id = config.psn.account_id.trim().to_owned();
    config.bangumi.default_user = non_blank(config.bangumi.default_user.take());
    config.bangumi.access_token = non_blank(config.bangumi.access_token.take());
    config.bangumi.user_agent = config.bangumi.user_agent.trim().to_owned();

    config
}

fn trim_base_url(url: &mut String) {
    *url = url.trim().trim_end_matches('/').to_owned();
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
