use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::response_cache::ResponseCache;
use crate::error::{AgentError, UpstreamError};
use crate::observability::metrics::get_metrics;
use crate::parser::collection::{collection_subject_ids, compose_anime_items, normalize_subject, AnimePage, SubjectInfo};
use crate::resilience::bounded_pool::map_concurrent;
use crate::sources::bangumi::{BangumiClient, CollectionQuery};

/// Anime is subject type 2 on the collection service.
pub const ANIME_SUBJECT_TYPE: u32 = 2;

/// Collection list enrichment and the raw collection pass-through.
#[derive(Clone)]
pub struct BangumiService {
    client: BangumiClient,
    subjects: ResponseCache<SubjectInfo>,
    concurrency: usize,
}

impl BangumiService {
    pub fn new(client: BangumiClient, subjects: ResponseCache<SubjectInfo>, concurrency: usize) -> Self {
        Self { client, subjects, concurrency }
    }

    /// Collection page with each distinct subject looked up once through the
    /// bounded pool. Failed lookups keep the item with placeholder fields.
    pub async fn anime(&self, user: &str, limit: u32, offset: u32) -> Result<AnimePage, AgentError> {
        let query = CollectionQuery {
            subject_type: ANIME_SUBJECT_TYPE,
            limit,
            offset,
        };
        let collections = self
            .client
            .user_collections(user, query)
            .await
            .map_err(AgentError::Upstream)?;

        let ids = collection_subject_ids(&collections);
        let lookups = map_concurrent(&ids, self.concurrency, |id| {
            let id = *id;
            self.subject_info(id)
        })
        .await;

        let mut subjects = HashMap::with_capacity(ids.len());
        for (id, lookup) in ids.iter().zip(lookups) {
            match lookup {
                Ok(info) => {
                    subjects.insert(*id, info);
                }
                Err(source) => {
                    let err = AgentError::PartialEnrichment { id: *id, source };
                    warn!(user, "{}", err);
                    get_metrics().await.enrichment_failures.inc();
                }
            }
        }

        let items = compose_anime_items(&collections, &subjects);
        debug!(user, items = items.len(), enriched = subjects.len(), "composed anime page");
        Ok(AnimePage { items })
    }

    /// Upstream collection payload untouched.
    pub async fn collections(&self, user: &str, query: CollectionQuery) -> Result<Value, UpstreamError> {
        self.client.user_collections(user, query).await
    }

    async fn subject_info(&self, id: u64) -> Result<SubjectInfo, UpstreamError> {
        let key = id.to_string();
        if let Some(cached) = self.subjects.get(&key).await {
            return Ok(cached);
        }
        let raw = self.client.subject(id).await?;
        let info = normalize_subject(&raw);
        self.subjects.put(key, info.clone()).await;
        Ok(info)
    }
}
