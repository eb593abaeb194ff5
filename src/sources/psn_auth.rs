use std::future::Future;
use std::time::Duration;

use http::header::{AUTHORIZATION, COOKIE, LOCATION};
use reqwest::{redirect, Client, Url};
use tracing::debug;

use crate::cache::credential::TokenGrant;
use crate::error::UpstreamError;
use crate::observability::metrics::get_metrics;
use crate::sources::http::{check_status, fetch_json};
use crate::utils::constants::{
    truncate_diagnostic, PSN_CLIENT_BASIC_AUTH, PSN_CLIENT_ID, PSN_REDIRECT_URI, PSN_SCOPE, UPSTREAM_PSN_AUTH,
};

/// The three calls of the trophy service's auth API.
pub trait PsnAuth: Send + Sync {
    /// Long-lived secret -> short-lived access code.
    fn exchange_secret_for_code(&self, secret: &str) -> impl Future<Output = Result<String, UpstreamError>> + Send;

    fn exchange_code_for_tokens(&self, code: &str) -> impl Future<Output = Result<TokenGrant, UpstreamError>> + Send;

    fn exchange_refresh_token(&self, refresh_token: &str) -> impl Future<Output = Result<TokenGrant, UpstreamError>> + Send;
}

#[derive(Debug, Clone)]
pub struct PsnAuthClient {
    client: Client,
    base_url: String,
}

impl PsnAuthClient {
    /// The authorize call answers with a redirect carrying the code, so this
    /// client never follows redirects.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenGrant, UpstreamError> {
        let request = self
            .client
            .post(format!("{}/token", self.base_url))
            .header(AUTHORIZATION, PSN_CLIENT_BASIC_AUTH)
            .form(form);
        let body = fetch_json(request, UPSTREAM_PSN_AUTH, "token").await?;
        serde_json::from_value(body)
            .map_err(|e| UpstreamError::InvalidJson(truncate_diagnostic(&format!("token response: {e}"))))
    }
}

impl PsnAuth for PsnAuthClient {
    async fn exchange_secret_for_code(&self, secret: &str) -> Result<String, UpstreamError> {
        let metrics = get_metrics().await;
        metrics.upstream_requests.with_label_values(&[UPSTREAM_PSN_AUTH, "authorize"]).inc();

        let request = self
            .client
            .get(format!("{}/authorize", self.base_url))
            .query(&[
                ("access_type", "offline"),
                ("client_id", PSN_CLIENT_ID),
                ("redirect_uri", PSN_REDIRECT_URI),
                ("response_type", "code"),
                ("scope", PSN_SCOPE),
            ])
            .header(COOKIE, format!("npsso={secret}"));

        let result = async {
            let response = request.send().await?;
            if !response.status().is_redirection() {
                let response = check_status(response).await?;
                return Err(UpstreamError::Status {
                    status: response.status().as_u16(),
                    body: "authorize did not redirect; the npsso secret is likely invalid".to_owned(),
                });
            }
            code_from_location(response.headers().get(LOCATION).and_then(|v| v.to_str().ok()))
        }
        .await;

        if let Err(err) = &result {
            metrics.upstream_failures.with_label_values(&[UPSTREAM_PSN_AUTH, err.reason()]).inc();
        } else {
            debug!("received access code");
        }
        result
    }

    async fn exchange_code_for_tokens(&self, code: &str) -> Result<TokenGrant, UpstreamError> {
        self.token_request(&[
            ("code", code),
            ("redirect_uri", PSN_REDIRECT_URI),
            ("grant_type", "authorization_code"),
            ("token_format", "jwt"),
        ])
        .await
    }

    async fn exchange_refresh_token(&self, refresh_token: &str) -> Result<TokenGrant, UpstreamError> {
        self.token_request(&[
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
            ("token_format", "jwt"),
            ("scope", PSN_SCOPE),
        ])
        .await
    }
}

/// Pull `code` out of the redirect target.
fn code_from_location(location: Option<&str>) -> Result<String, UpstreamError> {
    let location = location.ok_or_else(|| UpstreamError::Rejected("authorize redirect has no Location".to_owned()))?;
    let url = Url::parse(location)
        .map_err(|e| UpstreamError::Rejected(truncate_diagnostic(&format!("unparsable redirect '{location}': {e}"))))?;
    url.query_pairs()
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.into_owned())
        .filter(|code| !code.is_empty())
        .ok_or_else(|| UpstreamError::Rejected("authorize redirect carried no code".to_owned()))
}
