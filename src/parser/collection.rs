//! Normalization of collection (Bangumi) payloads.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use serde_json::Value;

use crate::parser::coerce::{array_items, coerce_count, non_blank_string};

pub const UNKNOWN_TEXT: &str = "未知";

const PRODUCTION_KEYS: [&str; 3] = ["动画制作", "制作", "製作"];
const COVER_SIZES: [&str; 5] = ["medium", "common", "large", "small", "grid"];

/// Fields taken from the per-subject lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectInfo {
    pub year: String,
    pub production: String,
    pub tags: Vec<String>,
}

impl SubjectInfo {
    pub fn unknown() -> Self {
        Self {
            year: UNKNOWN_TEXT.to_owned(),
            production: UNKNOWN_TEXT.to_owned(),
            tags: Vec::new(),
        }
    }
}

pub fn normalize_subject(raw: &Value) -> SubjectInfo {
    SubjectInfo {
        year: parse_year(raw.get("date").and_then(Value::as_str)),
        production: parse_production(raw.get("infobox")),
        tags: array_items(raw.get("tags"))
            .iter()
            .filter_map(|tag| non_blank_string(tag.get("name")))
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimeItem {
    pub id: u64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    pub status_text: String,
    pub progress_text: String,
    pub year: String,
    pub production: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnimePage {
    pub items: Vec<AnimeItem>,
}

fn entry_subject_id(entry: &Value) -> Option<u64> {
    coerce_count(entry.get("subject").and_then(|s| s.get("id")))
        .ok()
        .filter(|id| *id > 0)
}

/// Distinct subject ids in collection order.
pub fn collection_subject_ids(collections: &Value) -> Vec<u64> {
    let mut seen = HashSet::new();
    array_items(collections.get("data"))
        .iter()
        .filter_map(entry_subject_id)
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Builds the item list in collection order. Entries without a subject id are
/// skipped; entries whose subject lookup is missing keep placeholder fields.
pub fn compose_anime_items(collections: &Value, subjects: &HashMap<u64, SubjectInfo>) -> Vec<AnimeItem> {
    array_items(collections.get("data"))
        .iter()
        .filter_map(|entry| {
            let id = entry_subject_id(entry)?;
            let subject = entry.get("subject");
            let field = |name: &str| subject.and_then(|s| s.get(name));

            let title = non_blank_string(field("name_cn"))
                .or_else(|| non_blank_string(field("name")))
                .unwrap_or_else(|| format!("#{id}"));

            let episode = coerce_count(entry.get("ep_status")).unwrap_or(0);
            let progress_text = match coerce_count(field("eps")) {
                Ok(total) if total > 0 => format!("{episode}/{total}"),
                _ => episode.to_string(),
            };

            let info = subjects.get(&id).cloned().unwrap_or_else(SubjectInfo::unknown);
            Some(AnimeItem {
                id,
                title,
                cover: cover_url(field("images")),
                status_text: status_text(entry.get("type")).to_owned(),
                progress_text,
                year: info.year,
                production: info.production,
                tags: info.tags,
            })
        })
        .collect()
}

fn status_text(collection_type: Option<&Value>) -> &'static str {
    match coerce_count(collection_type) {
        Ok(1) => "想看",
        Ok(2) => "看过",
        Ok(3) => "在看",
        Ok(4) => "搁置",
        Ok(5) => "抛弃",
        _ => UNKNOWN_TEXT,
    }
}

fn cover_url(images: Option<&Value>) -> Option<String> {
    let images = images?;
    COVER_SIZES
        .iter()
        .find_map(|size| non_blank_string(images.get(*size)))
}

fn parse_year(date: Option<&str>) -> String {
    date.and_then(|d| d.get(..4))
        .filter(|year| year.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_owned)
        .unwrap_or_else(|| UNKNOWN_TEXT.to_owned())
}

fn parse_production(infobox: Option<&Value>) -> String {
    let rows = array_items(infobox);
    PRODUCTION_KEYS
        .iter()
        .find_map(|key| {
            let row = rows
                .iter()
                .find(|row| row.get("key").and_then(Value::as_str) == Some(*key))?;
            let text = value_to_text(row.get("value").unwrap_or(&Value::Null));
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_owned())
        })
        .unwrap_or_else(|| UNKNOWN_TEXT.to_owned())
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(text) => text.clone(),
                Value::Number(number) => number.to_string(),
                Value::Object(_) => labelled_text(item),
                _ => String::new(),
            })
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" / "),
        Value::Object(_) => labelled_text(value),
        _ => String::new(),
    }
}

fn labelled_text(value: &Value) -> String {
    ["v", "value", "name"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .unwrap_or_default()
        .to_owned()
}
