use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::store::{CacheStore, SUMMARY_KEY};
use crate::error::{AgentError, UpstreamError};
use crate::helpers::time::Clock;
use crate::parser::trophy::{
    merge_title_detail, normalize_profile, normalize_summary, normalize_title_list, TitleDetail, TitleList,
    TrophySummary,
};
use crate::sources::psn::PsnClient;
use crate::sources::psn_auth::{PsnAuth, PsnAuthClient};
use crate::sources::token_manager::TokenManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NpServiceName {
    Trophy,
    Trophy2,
}

impl NpServiceName {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "trophy" => Some(Self::Trophy),
            "trophy2" => Some(Self::Trophy2),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trophy => "trophy",
            Self::Trophy2 => "trophy2",
        }
    }
}

/// Titles page either as upstream sent it or through the list normalizer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TitlesView {
    Raw(Value),
    Normalized(TitleList),
}

/// Summary, titles and title-detail modes of the trophy endpoint.
pub struct PsnService<A = PsnAuthClient> {
    tokens: Arc<TokenManager<A>>,
    client: PsnClient,
    caches: CacheStore,
    clock: Arc<dyn Clock>,
}

impl<A> Clone for PsnService<A> {
    fn clone(&self) -> Self {
        Self {
            tokens: self.tokens.clone(),
            client: self.client.clone(),
            caches: self.caches.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl<A: PsnAuth> PsnService<A> {
    pub fn new(tokens: Arc<TokenManager<A>>, client: PsnClient, caches: CacheStore, clock: Arc<dyn Clock>) -> Self {
        Self { tokens, client, caches, clock }
    }

    pub fn tokens(&self) -> &TokenManager<A> {
        &self.tokens
    }

    /// Summary plus profile. A failed profile call only drops the profile.
    pub async fn summary(&self) -> Result<TrophySummary, AgentError> {
        if let Some(cached) = self.caches.summary.get(SUMMARY_KEY).await {
            return Ok(cached);
        }

        let credential = self.tokens.get_valid_credential().await?;
        let raw = self.checked(self.client.trophy_summary(&credential.access_token).await).await?;
        let mut summary = normalize_summary(&raw, self.clock.now());

        let account_id = if summary.account_id.is_empty() {
            self.client.account_id().to_owned()
        } else {
            summary.account_id.clone()
        };
        match self.client.profile(&credential.access_token, &account_id).await {
            Ok(raw_profile) => summary.profile = normalize_profile(&raw_profile),
            Err(err) => {
                warn!(%account_id, "profile lookup failed, returning summary without it: {}", err);
                if err == UpstreamError::Unauthorized {
                    self.tokens.invalidate().await;
                }
            }
        }

        self.caches.summary.put(SUMMARY_KEY, summary.clone()).await;
        Ok(summary)
    }

    /// One page of titles, cached per `limit:offset`.
    pub async fn titles(&self, limit: u32, offset: u32, normalized: bool) -> Result<TitlesView, AgentError> {
        let key = format!("{limit}:{offset}");
        let raw = match self.caches.titles.get(&key).await {
            Some(cached) => cached,
            None => {
                let credential = self.tokens.get_valid_credential().await?;
                let raw = self
                    .checked(self.client.trophy_titles(&credential.access_token, limit, offset).await)
                    .await?;
                self.caches.titles.put(key, raw.clone()).await;
                raw
            }
        };

        Ok(if normalized {
            TitlesView::Normalized(normalize_title_list(&raw))
        } else {
            TitlesView::Raw(raw)
        })
    }

    /// Group definitions and earnings fetched in parallel, then left-joined.
    pub async fn title_detail(
        &self,
        np_communication_id: &str,
        service: NpServiceName,
    ) -> Result<TitleDetail, AgentError> {
        let key = format!("{}:{}", service.as_str(), np_communication_id);
        if let Some(cached) = self.caches.title_detail.get(&key).await {
            return Ok(cached);
        }

        let credential = self.tokens.get_valid_credential().await?;
        let token = credential.access_token.as_str();
        let fetched = tokio::try_join!(
            self.client.title_trophy_groups(token, np_communication_id, service.as_str()),
            self.client.user_trophy_group_earnings(token, np_communication_id, service.as_str()),
        );
        let (groups, earnings) = self.checked(fetched).await?;

        let detail = merge_title_detail(&groups, &earnings);
        debug!(%key, groups = detail.trophy_groups.len(), "merged title detail");
        self.caches.title_detail.put(key, detail.clone()).await;
        Ok(detail)
    }

    /// Primary-call result: a 401 drops the stored credential before surfacing.
    async fn checked<T>(&self, result: Result<T, UpstreamError>) -> Result<T, AgentError> {
        match result {
            Err(UpstreamError::Unauthorized) => {
                self.tokens.invalidate().await;
                Err(AgentError::Unauthorized)
            }
            other => other.map_err(AgentError::from),
        }
    }
}
