//! Normalization of trophy API payloads.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::parser::coerce::{
    array_items, clamp_percentage, coerce_count, coerce_percentage, non_blank_string, string_or_empty,
};

const PREFERRED_AVATAR_SIZE: &str = "40x40";

/// Per-tier counts. `None` means the upstream value could not be trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrophyCounts {
    pub bronze: Option<u64>,
    pub silver: Option<u64>,
    pub gold: Option<u64>,
    pub platinum: Option<u64>,
    /// Only present when every tier is known.
    pub total: Option<u64>,
}

impl TrophyCounts {
    pub fn from_raw(raw: Option<&Value>) -> Self {
        let field = |name: &str| coerce_count(raw.and_then(|r| r.get(name))).ok();
        Self::new(field("bronze"), field("silver"), field("gold"), field("platinum"))
    }

    pub fn new(bronze: Option<u64>, silver: Option<u64>, gold: Option<u64>, platinum: Option<u64>) -> Self {
        let total = match (bronze, silver, gold, platinum) {
            (Some(b), Some(s), Some(g), Some(p)) => Some(b + s + g + p),
            _ => None,
        };
        Self { bronze, silver, gold, platinum, total }
    }

    pub fn zero() -> Self {
        Self::new(Some(0), Some(0), Some(0), Some(0))
    }
}

/// Explicit upstream progress wins; otherwise `round(100 * earned / defined)`
/// when both totals are known and `defined > 0`.
pub fn derive_progress(explicit: Option<&Value>, earned: &TrophyCounts, defined: &TrophyCounts) -> Option<u8> {
    if let Ok(progress) = coerce_percentage(explicit) {
        return Some(progress);
    }
    match (earned.total, defined.total) {
        (Some(earned), Some(defined)) if defined > 0 => {
            Some(clamp_percentage(100.0 * earned as f64 / defined as f64))
        }
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub online_id: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrophySummary {
    pub account_id: String,
    pub trophy_level: Option<u64>,
    pub progress: Option<u8>,
    pub tier: Option<u64>,
    pub earned_trophies: TrophyCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
    pub updated_at: String,
}

pub fn normalize_summary(raw: &Value, now: DateTime<Utc>) -> TrophySummary {
    let earned = TrophyCounts::from_raw(raw.get("earnedTrophies"));
    TrophySummary {
        account_id: string_or_empty(raw.get("accountId")),
        trophy_level: coerce_count(raw.get("trophyLevel")).ok(),
        progress: coerce_percentage(raw.get("progress")).ok(),
        tier: coerce_count(raw.get("tier")).ok(),
        earned_trophies: earned,
        profile: None,
        updated_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}

/// `None` unless the payload carries a usable online id.
pub fn normalize_profile(raw: &Value) -> Option<Profile> {
    let online_id = non_blank_string(raw.get("onlineId"))?;
    let avatars = array_items(raw.get("avatars"));
    let avatar_url = avatars
        .iter()
        .find(|avatar| avatar.get("size").and_then(Value::as_str) == Some(PREFERRED_AVATAR_SIZE))
        .or_else(|| avatars.first())
        .and_then(|avatar| non_blank_string(avatar.get("url")));
    Some(Profile { online_id, avatar_url })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleEntry {
    pub np_communication_id: String,
    pub np_service_name: String,
    pub trophy_title_name: String,
    pub trophy_title_icon_url: String,
    pub trophy_title_platform: String,
    pub progress: Option<u8>,
    pub earned_trophies: TrophyCounts,
    pub defined_trophies: TrophyCounts,
    pub last_updated_date_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleList {
    pub trophy_titles: Vec<TitleEntry>,
    pub total_item_count: Option<u64>,
    pub next_offset: Option<u64>,
    pub previous_offset: Option<u64>,
}

/// Drops titles without an id or timestamp and orders the rest most recently
/// updated first. Unparsable timestamps sort last; ties keep upstream order.
pub fn normalize_title_list(raw: &Value) -> TitleList {
    let mut entries: Vec<(Option<DateTime<Utc>>, TitleEntry)> = array_items(raw.get("trophyTitles"))
        .iter()
        .filter_map(|title| {
            let np_communication_id = non_blank_string(title.get("npCommunicationId"))?;
            let last_updated = non_blank_string(title.get("lastUpdatedDateTime"))?;
            let earned = TrophyCounts::from_raw(title.get("earnedTrophies"));
            let defined = TrophyCounts::from_raw(title.get("definedTrophies"));
            let entry = TitleEntry {
                np_communication_id,
                np_service_name: string_or_empty(title.get("npServiceName")),
                trophy_title_name: string_or_empty(title.get("trophyTitleName")),
                trophy_title_icon_url: string_or_empty(title.get("trophyTitleIconUrl")),
                trophy_title_platform: string_or_empty(title.get("trophyTitlePlatform")),
                progress: derive_progress(title.get("progress"), &earned, &defined),
                earned_trophies: earned,
                defined_trophies: defined,
                last_updated_date_time: last_updated,
            };
            Some((parse_timestamp(&entry.last_updated_date_time), entry))
        })
        .collect();

    entries.sort_by(|(a, _), (b, _)| b.cmp(a));

    TitleList {
        trophy_titles: entries.into_iter().map(|(_, entry)| entry).collect(),
        total_item_count: coerce_count(raw.get("totalItemCount")).ok(),
        next_offset: coerce_count(raw.get("nextOffset")).ok(),
        previous_offset: coerce_count(raw.get("previousOffset")).ok(),
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrophyGroup {
    pub trophy_group_id: String,
    pub trophy_group_name: String,
    pub trophy_group_icon_url: String,
    pub defined_trophies: TrophyCounts,
    pub progress: Option<u8>,
    pub earned_trophies: TrophyCounts,
    pub last_updated_date_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleDetail {
    pub trophy_title_name: String,
    pub trophy_title_icon_url: String,
    pub trophy_title_platform: String,
    pub trophy_set_version: String,
    pub progress: Option<u8>,
    pub earned_trophies: TrophyCounts,
    pub last_updated_date_time: Option<String>,
    pub trophy_groups: Vec<TrophyGroup>,
}

/// Left-joins group definitions with the user's earnings on `trophyGroupId`.
///
/// Earnings without a matching definition are dropped; definitions without
/// earnings report zero earned and `progress: 0`.
pub fn merge_title_detail(groups: &Value, earnings: &Value) -> TitleDetail {
    let mut earnings_by_group: HashMap<String, &Value> = HashMap::new();
    for earning in array_items(earnings.get("trophyGroups")) {
        if let Some(id) = non_blank_string(earning.get("trophyGroupId")) {
            earnings_by_group.entry(id).or_insert(earning);
        }
    }

    let trophy_groups = array_items(groups.get("trophyGroups"))
        .iter()
        .filter_map(|group| {
            let trophy_group_id = non_blank_string(group.get("trophyGroupId"))?;
            let defined = TrophyCounts::from_raw(group.get("definedTrophies"));
            let (earned, progress, last_updated) = match earnings_by_group.get(&trophy_group_id) {
                Some(earning) => {
                    let earned = TrophyCounts::from_raw(earning.get("earnedTrophies"));
                    let progress = derive_progress(earning.get("progress"), &earned, &defined);
                    (earned, progress, non_blank_string(earning.get("lastUpdatedDateTime")))
                }
                None => (TrophyCounts::zero(), Some(0), None),
            };
            Some(TrophyGroup {
                trophy_group_id,
                trophy_group_name: string_or_empty(group.get("trophyGroupName")),
                trophy_group_icon_url: string_or_empty(group.get("trophyGroupIconUrl")),
                defined_trophies: defined,
                progress,
                earned_trophies: earned,
                last_updated_date_time: last_updated,
            })
        })
        .collect();

    let earned = TrophyCounts::from_raw(earnings.get("earnedTrophies"));
    let defined = TrophyCounts::from_raw(groups.get("definedTrophies"));
    TitleDetail {
        trophy_title_name: string_or_empty(groups.get("trophyTitleName")),
        trophy_title_icon_url: string_or_empty(groups.get("trophyTitleIconUrl")),
        trophy_title_platform: string_or_empty(groups.get("trophyTitlePlatform")),
        trophy_set_version: string_or_empty(groups.get("trophySetVersion")),
        progress: derive_progress(earnings.get("progress"), &earned, &defined),
        earned_trophies: earned,
        last_updated_date_time: non_blank_string(earnings.get("lastUpdatedDateTime")),
        trophy_groups,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn earned_counts_accept_numeric_strings() {
        let counts = TrophyCounts::from_raw(Some(&json!({
            "bronze": "10", "silver": 3, "gold": 1, "platinum": 0
        })));
        assert_eq!(counts, TrophyCounts::new(Some(10), Some(3), Some(1), Some(0)));
        assert_eq!(counts.total, Some(14));
    }

    #[test]
    fn total_is_unknown_when_any_tier_is_malformed() {
        let counts = TrophyCounts::from_raw(Some(&json!({
            "bronze": "ten", "silver": 3, "gold": 1, "platinum": 0
        })));
        assert_eq!(counts.bronze, None);
        assert_eq!(counts.silver, Some(3));
        assert_eq!(counts.total, None);
    }

    #[test]
    fn progress_is_unknown_when_nothing_is_defined() {
        let earned = TrophyCounts::from_raw(Some(&json!({"bronze": 0})));
        let defined = TrophyCounts::from_raw(Some(&json!({"bronze": 0})));
        assert_eq!(derive_progress(None, &earned, &defined), None);

        let earned = TrophyCounts::zero();
        let defined = TrophyCounts::zero();
        assert_eq!(derive_progress(None, &earned, &defined), None);
    }

    #[test]
    fn progress_is_derived_and_clamped() {
        let earned = TrophyCounts::new(Some(1), Some(0), Some(0), Some(0));
        let defined = TrophyCounts::new(Some(2), Some(1), Some(0), Some(0));
        assert_eq!(derive_progress(None, &earned, &defined), Some(33));
        assert_eq!(derive_progress(Some(&json!("57")), &earned, &defined), Some(57));
        assert_eq!(derive_progress(Some(&json!("bogus")), &earned, &defined), Some(33));

        let earned = TrophyCounts::new(Some(9), Some(0), Some(0), Some(0));
        assert_eq!(derive_progress(None, &earned, &defined), Some(100));
    }

    #[test]
    fn summary_is_normalized_and_idempotent() {
        let now = Utc.with_ymd_and_hms(2026, 1, 16, 0, 0, 0).unwrap();
        let raw = json!({
            "accountId": "123",
            "trophyLevel": "250",
            "progress": 42,
            "tier": 3,
            "earnedTrophies": {"bronze": 10, "silver": 5, "gold": 2, "platinum": "1"}
        });
        let first = normalize_summary(&raw, now);
        let second = normalize_summary(&raw, now);
        assert_eq!(first, second);
        assert_eq!(first.account_id, "123");
        assert_eq!(first.trophy_level, Some(250));
        assert_eq!(first.progress, Some(42));
        assert_eq!(first.earned_trophies.total, Some(18));
        assert_eq!(first.updated_at, "2026-01-16T00:00:00.000Z");

        let json = serde_json::to_value(&first).unwrap();
        assert!(json.get("profile").is_none());
        assert_eq!(json["earnedTrophies"]["platinum"], 1);
    }

    #[test]
    fn summary_tolerates_garbage() {
        let now = Utc::now();
        let summary = normalize_summary(&json!({"accountId": null, "progress": "n/a", "earnedTrophies": []}), now);
        assert_eq!(summary.account_id, "");
        assert_eq!(summary.progress, None);
        assert_eq!(summary.earned_trophies.total, None);
        assert_eq!(serde_json::to_value(&summary).unwrap()["progress"], Value::Null);
    }

    #[test]
    fn profile_prefers_small_avatar() {
        let profile = normalize_profile(&json!({
            "onlineId": "Soki",
            "avatars": [
                {"size": "440x440", "url": "https://example.com/big.png"},
                {"size": "40x40", "url": "https://example.com/small.png"}
            ]
        }))
        .unwrap();
        assert_eq!(profile.avatar_url.as_deref(), Some("https://example.com/small.png"));

        let profile = normalize_profile(&json!({
            "onlineId": "Soki",
            "avatars": [{"size": "440x440", "url": "https://example.com/big.png"}]
        }))
        .unwrap();
        assert_eq!(profile.avatar_url.as_deref(), Some("https://example.com/big.png"));

        let profile = normalize_profile(&json!({"onlineId": "Soki"})).unwrap();
        assert_eq!(profile.avatar_url, None);
        assert!(normalize_profile(&json!({"avatars": []})).is_none());
    }

    #[test]
    fn title_list_is_filtered_and_sorted() {
        let list = normalize_title_list(&json!({
            "trophyTitles": [
                {"npCommunicationId": "OLD", "lastUpdatedDateTime": "2024-01-01T00:00:00Z"},
                {"npCommunicationId": "BROKEN", "lastUpdatedDateTime": "yesterday"},
                {"lastUpdatedDateTime": "2026-01-01T00:00:00Z"},
                {"npCommunicationId": "NO_TS"},
                {"npCommunicationId": "NEW", "lastUpdatedDateTime": "2026-01-01T00:00:00Z",
                 "earnedTrophies": {"bronze": 1, "silver": 0, "gold": 0, "platinum": 0},
                 "definedTrophies": {"bronze": 4, "silver": 0, "gold": 0, "platinum": 0}},
                {"npCommunicationId": "MID", "lastUpdatedDateTime": "2025-06-01T08:00:00+08:00"}
            ],
            "totalItemCount": 6
        }));

        let ids: Vec<&str> = list
            .trophy_titles
            .iter()
            .map(|t| t.np_communication_id.as_str())
            .collect();
        assert_eq!(ids, vec!["NEW", "MID", "OLD", "BROKEN"]);
        assert_eq!(list.trophy_titles[0].progress, Some(25));
        assert_eq!(list.total_item_count, Some(6));
        assert_eq!(list.next_offset, None);
    }

    #[test]
    fn sort_is_stable_for_equal_timestamps() {
        let list = normalize_title_list(&json!({
            "trophyTitles": [
                {"npCommunicationId": "A", "lastUpdatedDateTime": "2026-01-01T00:00:00Z"},
                {"npCommunicationId": "B", "lastUpdatedDateTime": "2026-01-01T00:00:00Z"},
                {"npCommunicationId": "C", "lastUpdatedDateTime": "bad"},
                {"npCommunicationId": "D", "lastUpdatedDateTime": "worse"}
            ]
        }));
        let ids: Vec<&str> = list
            .trophy_titles
            .iter()
            .map(|t| t.np_communication_id.as_str())
            .collect();
        assert_eq!(ids, vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn title_detail_left_joins_groups_with_earnings() {
        let groups = json!({
            "trophyTitleName": "Demo Game",
            "trophyTitleIconUrl": "https://example.com/icon.png",
            "trophyTitlePlatform": "PS5",
            "trophySetVersion": "01.00",
            "definedTrophies": {"bronze": 2, "silver": 1, "gold": 1, "platinum": 1},
            "trophyGroups": [
                {"trophyGroupId": "default", "trophyGroupName": "Base",
                 "definedTrophies": {"bronze": 1, "silver": 1, "gold": 1, "platinum": 1}},
                {"trophyGroupId": "001", "trophyGroupName": "DLC",
                 "definedTrophies": {"bronze": 1, "silver": 0, "gold": 0, "platinum": 0}},
                {"trophyGroupName": "no id"}
            ]
        });
        let earnings = json!({
            "progress": 20,
            "earnedTrophies": {"bronze": 1, "silver": 0, "gold": 0, "platinum": 0},
            "lastUpdatedDateTime": "2026-01-16T00:00:00Z",
            "trophyGroups": [
                {"trophyGroupId": "default", "progress": 20,
                 "earnedTrophies": {"bronze": 1, "silver": 0, "gold": 0, "platinum": 0},
                 "lastUpdatedDateTime": "2026-01-16T00:00:00Z"},
                {"trophyGroupId": "999", "progress": 100,
                 "earnedTrophies": {"bronze": 5, "silver": 0, "gold": 0, "platinum": 0}}
            ]
        });

        let detail = merge_title_detail(&groups, &earnings);
        assert_eq!(detail.trophy_title_name, "Demo Game");
        assert_eq!(detail.progress, Some(20));
        assert_eq!(detail.trophy_groups.len(), 2);

        let base = &detail.trophy_groups[0];
        assert_eq!(base.trophy_group_id, "default");
        assert_eq!(base.progress, Some(20));
        assert_eq!(base.earned_trophies.total, Some(1));

        let dlc = &detail.trophy_groups[1];
        assert_eq!(dlc.trophy_group_id, "001");
        assert_eq!(dlc.progress, Some(0));
        assert_eq!(dlc.earned_trophies, TrophyCounts::zero());
        assert_eq!(dlc.last_updated_date_time, None);

        assert!(detail.trophy_groups.iter().all(|g| g.trophy_group_id != "999"));
    }

    #[test]
    fn title_detail_progress_unknown_without_definitions() {
        let groups = json!({
            "trophyGroups": [
                {"trophyGroupId": "default",
                 "definedTrophies": {"bronze": 0, "silver": 0, "gold": 0, "platinum": 0}}
            ]
        });
        let earnings = json!({
            "trophyGroups": [
                {"trophyGroupId": "default",
                 "earnedTrophies": {"bronze": 0, "silver": 0, "gold": 0, "platinum": 0}}
            ]
        });
        let detail = merge_title_detail(&groups, &earnings);
        assert_eq!(detail.trophy_groups[0].progress, None);
        assert_eq!(detail.progress, None);
        assert_eq!(detail.trophy_title_name, "");
    }
}
