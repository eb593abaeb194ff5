//! Query parameter parsing for the HTTP surface.

use serde::Deserialize;

use crate::aggregate::bangumi::ANIME_SUBJECT_TYPE;
use crate::aggregate::psn::NpServiceName;
use crate::error::AgentError;
use crate::sources::bangumi::CollectionQuery;

/// Integer value of a query parameter, `fallback` when absent or not a number.
pub fn to_int(value: Option<&str>, fallback: i64) -> i64 {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(fallback)
}

pub fn clamp(value: i64, min: i64, max: i64) -> i64 {
    value.max(min).min(max)
}

/// `to_int` followed by `clamp`; bounds are never negative so the cast is lossless.
fn bounded(value: Option<&str>, fallback: i64, min: i64, max: i64) -> u32 {
    clamp(to_int(value, fallback), min, max) as u32
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Default, Deserialize)]
pub struct PsnQuery {
    pub mode: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub normalized: Option<String>,
    #[serde(rename = "npCommunicationId")]
    pub np_communication_id: Option<String>,
    #[serde(rename = "npServiceName")]
    pub np_service_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PsnMode {
    Summary,
    Titles { limit: u32, offset: u32, normalized: bool },
    Title { np_communication_id: String, service: NpServiceName },
}

impl PsnQuery {
    pub fn into_mode(self) -> Result<PsnMode, AgentError> {
        let mode = non_blank(self.mode.as_deref()).map(str::to_lowercase);
        match mode.as_deref() {
            None | Some("summary") => Ok(PsnMode::Summary),
            Some("titles") => Ok(PsnMode::Titles {
                limit: bounded(self.limit.as_deref(), 50, 1, 800),
                offset: bounded(self.offset.as_deref(), 0, 0, 10_000),
                normalized: matches!(non_blank(self.normalized.as_deref()), Some("true" | "1")),
            }),
            Some("title") => {
                let np_communication_id = non_blank(self.np_communication_id.as_deref());
                let service = non_blank(self.np_service_name.as_deref()).and_then(NpServiceName::parse);
                match (np_communication_id, service) {
                    (Some(id), Some(service)) => Ok(PsnMode::Title {
                        np_communication_id: id.to_owned(),
                        service,
                    }),
                    _ => Err(AgentError::BadRequest(
                        "npCommunicationId and npServiceName (trophy|trophy2) are required".to_owned(),
                    )),
                }
            }
            Some(other) => Err(AgentError::BadRequest(format!("unknown mode '{other}'"))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct BangumiQuery {
    pub user: Option<String>,
    pub user_id: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub subject_type: Option<String>,
}

impl BangumiQuery {
    /// `user`, then `user_id`, then the configured default.
    pub fn user(&self, default_user: Option<&str>) -> Result<String, AgentError> {
        non_blank(self.user.as_deref())
            .or_else(|| non_blank(self.user_id.as_deref()))
            .or(default_user)
            .map(str::to_owned)
            .ok_or_else(|| AgentError::BadRequest("user is required".to_owned()))
    }

    pub fn anime_page(&self) -> (u32, u32) {
        (
            bounded(self.limit.as_deref(), 48, 1, 100),
            bounded(self.offset.as_deref(), 0, 0, 5_000),
        )
    }

    pub fn collection_query(&self) -> CollectionQuery {
        CollectionQuery {
            subject_type: bounded(self.subject_type.as_deref(), ANIME_SUBJECT_TYPE as i64, 1, 6),
            limit: bounded(self.limit.as_deref(), 24, 1, 100),
            offset: bounded(self.offset.as_deref(), 0, 0, 5_000),
        }
    }
}
