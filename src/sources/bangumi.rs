use std::time::Duration;

use http::header::ACCEPT;
use reqwest::{Client, RequestBuilder, Url};
use serde_json::Value;

use crate::error::UpstreamError;
use crate::sources::http::fetch_json;
use crate::utils::constants::UPSTREAM_BANGUMI;

/// Collection-tracking service: user collections and subject lookups.
#[derive(Debug, Clone)]
pub struct BangumiClient {
    client: Client,
    base_url: String,
    access_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionQuery {
    pub subject_type: u32,
    pub limit: u32,
    pub offset: u32,
}

impl BangumiClient {
    pub fn new(
        base_url: &str,
        user_agent: &str,
        access_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().user_agent(user_agent).timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_owned(),
            access_token,
        })
    }

    pub async fn user_collections(&self, user: &str, query: CollectionQuery) -> Result<Value, UpstreamError> {
        let url = self.endpoint(&["users", user, "collections"])?;
        let request = self.get(url).query(&[
            ("subject_type", query.subject_type),
            ("limit", query.limit),
            ("offset", query.offset),
        ]);
        fetch_json(request, UPSTREAM_BANGUMI, "collections").await
    }

    pub async fn subject(&self, id: u64) -> Result<Value, UpstreamError> {
        let id = id.to_string();
        let url = self.endpoint(&["subjects", id.as_str()])?;
        fetch_json(self.get(url), UPSTREAM_BANGUMI, "subject").await
    }

    fn get(&self, url: Url) -> RequestBuilder {
        let request = self.client.get(url).header(ACCEPT, "application/json");
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Append percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, UpstreamError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| UpstreamError::Network(format!("invalid base url '{}': {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| UpstreamError::Network(format!("base url '{}' cannot take a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}
