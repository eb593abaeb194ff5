use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::error::UpstreamError;
use crate::sources::http::fetch_json;
use crate::utils::constants::UPSTREAM_PSN;

/// Read-only trophy data endpoints, all authorized with a bearer access token.
#[derive(Debug, Clone)]
pub struct PsnClient {
    client: Client,
    base_url: String,
    account_id: String,
}

impl PsnClient {
    pub fn new(base_url: &str, account_id: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_owned(),
            account_id: account_id.to_owned(),
        })
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub async fn trophy_summary(&self, access_token: &str) -> Result<Value, UpstreamError> {
        let url = format!("{}/trophy/v1/users/{}/trophySummary", self.base_url, self.account_id);
        fetch_json(self.client.get(url).bearer_auth(access_token), UPSTREAM_PSN, "trophy_summary").await
    }

    pub async fn profile(&self, access_token: &str, account_id: &str) -> Result<Value, UpstreamError> {
        let url = format!("{}/userProfile/v1/internal/users/{}/profiles", self.base_url, account_id);
        fetch_json(self.client.get(url).bearer_auth(access_token), UPSTREAM_PSN, "profile").await
    }

    pub async fn trophy_titles(&self, access_token: &str, limit: u32, offset: u32) -> Result<Value, UpstreamError> {
        let url = format!("{}/trophy/v1/users/{}/trophyTitles", self.base_url, self.account_id);
        let request = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .query(&[("limit", limit), ("offset", offset)]);
        fetch_json(request, UPSTREAM_PSN, "trophy_titles").await
    }

    /// Group definitions of one title.
    pub async fn title_trophy_groups(
        &self,
        access_token: &str,
        np_communication_id: &str,
        np_service_name: &str,
    ) -> Result<Value, UpstreamError> {
        let url = format!(
            "{}/trophy/v1/npCommunicationIds/{}/trophyGroups",
            self.base_url, np_communication_id
        );
        let request = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .query(&[("npServiceName", np_service_name)]);
        fetch_json(request, UPSTREAM_PSN, "title_trophy_groups").await
    }

    /// The account's earnings per group of one title.
    pub async fn user_trophy_group_earnings(
        &self,
        access_token: &str,
        np_communication_id: &str,
        np_service_name: &str,
    ) -> Result<Value, UpstreamError> {
        let url = format!(
            "{}/trophy/v1/users/{}/npCommunicationIds/{}/trophyGroups",
            self.base_url, self.account_id, np_communication_id
        );
        let request = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .query(&[("npServiceName", np_service_name)]);
        fetch_json(request, UPSTREAM_PSN, "user_trophy_groups").await
    }
}
