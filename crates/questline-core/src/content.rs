//! Records exchanged with the remote content/profile store.
//!
//! Course content is opaque to the core: only `id` and `title` are
//! interpreted, everything else rides along in `fields` and is compared
//! structurally when deciding whether a fetched snapshot changed anything.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::progress::ProgressRecord;

/// One entry of a content collection (module, material, stream, event,
/// scenario).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl ContentItem {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            fields: serde_json::Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Lesson ids listed under a module's `lessons` field.
    pub fn lesson_ids(&self) -> Vec<String> {
        self.fields
            .get("lessons")
            .and_then(|v| v.as_array())
            .map(|lessons| {
                lessons
                    .iter()
                    .filter_map(|l| match l {
                        serde_json::Value::String(id) => Some(id.clone()),
                        other => other.get("id").and_then(|id| id.as_str()).map(str::to_string),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// A platform announcement shown in the learner's inbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub read: bool,
}

/// Remote projection of a learner, also used for leaderboard rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub xp: u64,
    #[serde(default = "default_level")]
    pub level: u32,
    /// Full progress snapshot; leaderboard rows usually omit it.
    #[serde(default)]
    pub progress: Option<ProgressRecord>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_level() -> u32 {
    1
}

impl Profile {
    pub fn from_progress(record: &ProgressRecord, now: DateTime<Utc>) -> Self {
        Self {
            id: record.profile_id().to_string(),
            name: record.display_name.clone(),
            xp: record.xp(),
            level: record.level(),
            progress: Some(record.clone()),
            updated_at: Some(now),
        }
    }
}

/// Distinct lesson ids across course modules.
pub fn course_lessons(modules: &[ContentItem]) -> BTreeSet<String> {
    modules.iter().flat_map(|m| m.lesson_ids()).collect()
}

/// Number of distinct lessons in the course.
pub fn total_lessons(modules: &[ContentItem]) -> usize {
    course_lessons(modules).len()
}
