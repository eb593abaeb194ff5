use std::sync::Arc;

use chrono::Duration;
use serde_json::Value;

use crate::cache::response_cache::ResponseCache;
use crate::helpers::time::Clock;
use crate::parser::collection::SubjectInfo;
use crate::parser::trophy::{TitleDetail, TrophySummary};

pub const NAMESPACE_SUMMARY: &str = "summary";
pub const NAMESPACE_TITLES: &str = "titles";
pub const NAMESPACE_TITLE_DETAIL: &str = "title_detail";
pub const NAMESPACE_SUBJECTS: &str = "subjects";

/// The summary namespace only ever holds this key.
pub const SUMMARY_KEY: &str = "me";

#[derive(Debug, Clone, Copy)]
pub struct CacheTtls {
    pub psn: Duration,
    pub subjects: Duration,
}

/// All response cache namespaces, created together and shared by the aggregators.
#[derive(Clone)]
pub struct CacheStore {
    pub summary: ResponseCache<TrophySummary>,
    pub titles: ResponseCache<Value>,
    pub title_detail: ResponseCache<TitleDetail>,
    pub subjects: ResponseCache<SubjectInfo>,
}

impl CacheStore {
    pub fn new(ttls: CacheTtls, clock: Arc<dyn Clock>) -> Self {
        Self {
            summary: ResponseCache::new(NAMESPACE_SUMMARY, ttls.psn, clock.clone()),
            titles: ResponseCache::new(NAMESPACE_TITLES, ttls.psn, clock.clone()),
            title_detail: ResponseCache::new(NAMESPACE_TITLE_DETAIL, ttls.psn, clock.clone()),
            subjects: ResponseCache::new(NAMESPACE_SUBJECTS, ttls.subjects, clock),
        }
    }
}
