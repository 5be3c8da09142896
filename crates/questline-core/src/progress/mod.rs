//! Learner progress data model.
//!
//! One [`ProgressRecord`] exists per learner. It is what the gamification
//! rules transform and what the sync layer persists locally and pushes to
//! the remote profile. Field names serialize in camelCase to stay
//! compatible with caches written by the web client.

mod goal;
mod habit;
pub mod identity;

pub use goal::Goal;
pub use habit::Habit;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// XP needed to advance one level.
pub const XP_PER_LEVEL: u64 = 1000;

/// Level for a given XP total: `floor(xp / 1000) + 1`.
///
/// Levels are `u32` and saturate at `u32::MAX`: the formula holds for
/// every total below `u32::MAX * 1000` XP, and anything at or above that
/// reports `u32::MAX`.
pub fn level_for_xp(xp: u64) -> u32 {
    u32::try_from(xp / XP_PER_LEVEL).map_or(u32::MAX, |full_levels| full_levels.saturating_add(1))
}

/// A submitted homework answer. Grading happens elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeworkSubmission {
    pub id: String,
    pub lesson_id: String,
    pub answer: String,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub grade: Option<String>,
}

/// A free-form note, optionally attached to a lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotebookEntry {
    pub id: String,
    #[serde(default)]
    pub lesson_id: Option<String>,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Counter for an action limited per calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCounter {
    pub day: NaiveDate,
    pub count: u32,
}

/// Rate-limit counters and lifetime totals, keyed by action name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionStats {
    /// action -> lesson id -> count. Never resets.
    #[serde(default)]
    pub per_lesson: BTreeMap<String, BTreeMap<String, u32>>,
    /// action -> counter for the day it was last used.
    #[serde(default)]
    pub per_day: BTreeMap<String, DailyCounter>,
    /// action -> count over the learner's lifetime.
    #[serde(default)]
    pub totals: BTreeMap<String, u32>,
}

impl ActionStats {
    pub fn total(&self, action: &str) -> u32 {
        self.totals.get(action).copied().unwrap_or(0)
    }
}

/// Everything the platform knows about one learner's progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub local_id: String,
    #[serde(default)]
    pub remote_id: Option<String>,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub(crate) xp: u64,
    #[serde(default)]
    pub completed_lesson_ids: BTreeSet<String>,
    #[serde(default)]
    pub submitted_homeworks: Vec<HomeworkSubmission>,
    #[serde(default)]
    pub habits: Vec<Habit>,
    #[serde(default)]
    pub goals: Vec<Goal>,
    #[serde(default)]
    pub notebook_entries: Vec<NotebookEntry>,
    #[serde(default)]
    pub stats: ActionStats,
    #[serde(default)]
    pub referral_count: u32,
    #[serde(default)]
    pub last_sync_timestamp: Option<DateTime<Utc>>,
}

impl ProgressRecord {
    pub fn new(local_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            local_id: local_id.into(),
            remote_id: None,
            display_name: display_name.into(),
            xp: 0,
            completed_lesson_ids: BTreeSet::new(),
            submitted_homeworks: Vec::new(),
            habits: Vec::new(),
            goals: Vec::new(),
            notebook_entries: Vec::new(),
            stats: ActionStats::default(),
            referral_count: 0,
            last_sync_timestamp: None,
        }
    }

    /// A fresh record with a generated local id.
    pub fn anonymous() -> Self {
        Self::new(identity::new_learner_id(), "")
    }

    pub fn xp(&self) -> u64 {
        self.xp
    }

    /// Always derived from xp.
    pub fn level(&self) -> u32 {
        level_for_xp(self.xp)
    }

    /// Id used when talking to the remote store.
    pub fn profile_id(&self) -> &str {
        self.remote_id.as_deref().unwrap_or(&self.local_id)
    }

    pub fn habit(&self, id: &str) -> Option<&Habit> {
        self.habits.iter().find(|h| h.id == id)
    }

    pub fn goal(&self, id: &str) -> Option<&Goal> {
        self.goals.iter().find(|g| g.id == id)
    }

    /// Longest current streak across all habits.
    pub fn best_streak(&self) -> u32 {
        self.habits.iter().map(Habit::streak).max().unwrap_or(0)
    }
}
