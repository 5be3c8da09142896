//! Rate-limited micro-rewards ("ask a question", "share a story").
//!
//! Counters live in [`ActionStats`]. Per-lesson counters never reset; a
//! per-day counter is only meaningful for the day it records, so a later
//! day reads as zero. Days before the recorded one are closed: claiming
//! them is refused, otherwise alternating two dates would reset the
//! counter on every call.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Award, RewardRules};
use crate::progress::{ActionStats, DailyCounter, ProgressRecord};

/// The period a counter is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "scope", content = "key")]
pub enum RateScope {
    Lesson(String),
    Day(NaiveDate),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitOutcome {
    pub allowed: bool,
    pub record: ProgressRecord,
}

/// Current count for `action` in `scope`.
pub fn current_count(stats: &ActionStats, action: &str, scope: &RateScope) -> u32 {
    match scope {
        RateScope::Lesson(lesson_id) => stats
            .per_lesson
            .get(action)
            .and_then(|lessons| lessons.get(lesson_id))
            .copied()
            .unwrap_or(0),
        RateScope::Day(day) => stats
            .per_day
            .get(action)
            .filter(|counter| counter.day == *day)
            .map(|counter| counter.count)
            .unwrap_or(0),
    }
}

fn is_closed_day(stats: &ActionStats, action: &str, scope: &RateScope) -> bool {
    match scope {
        RateScope::Day(day) => stats
            .per_day
            .get(action)
            .is_some_and(|counter| *day < counter.day),
        RateScope::Lesson(_) => false,
    }
}

/// Count one `action` in `scope` unless `limit` is already reached or the
/// scope is a day before the one last counted.
///
/// A refused action returns the record unchanged.
pub fn apply_rate_limited_action(
    record: &ProgressRecord,
    action: &str,
    scope: &RateScope,
    limit: u32,
) -> RateLimitOutcome {
    let count = current_count(&record.stats, action, scope);
    if count >= limit || is_closed_day(&record.stats, action, scope) {
        return RateLimitOutcome {
            allowed: false,
            record: record.clone(),
        };
    }

    let mut next = record.clone();
    let stats = &mut next.stats;
    match scope {
        RateScope::Lesson(lesson_id) => {
            stats
                .per_lesson
                .entry(action.to_string())
                .or_default()
                .insert(lesson_id.clone(), count + 1);
        }
        RateScope::Day(day) => {
            stats.per_day.insert(
                action.to_string(),
                DailyCounter {
                    day: *day,
                    count: count + 1,
                },
            );
        }
    }
    *stats.totals.entry(action.to_string()).or_insert(0) += 1;

    RateLimitOutcome {
        allowed: true,
        record: next,
    }
}

/// Micro-rewards granted for engagement outside lessons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MicroReward {
    AskQuestion,
    ShareStory,
}

impl MicroReward {
    pub fn action_key(&self) -> &'static str {
        match self {
            MicroReward::AskQuestion => "question_asked",
            MicroReward::ShareStory => "story_shared",
        }
    }

    pub fn xp(&self, rules: &RewardRules) -> u64 {
        match self {
            MicroReward::AskQuestion => rules.question_xp,
            MicroReward::ShareStory => rules.story_xp,
        }
    }

    pub fn limit(&self, rules: &RewardRules) -> u32 {
        match self {
            MicroReward::AskQuestion => rules.questions_per_lesson,
            MicroReward::ShareStory => rules.stories_per_day,
        }
    }
}

/// Rate-limited XP grant. Questions are scoped per lesson, stories per
/// day; the caller picks the matching scope.
pub fn claim_micro_reward(
    record: &ProgressRecord,
    reward: MicroReward,
    scope: &RateScope,
    rules: &RewardRules,
) -> Award {
    let outcome =
        apply_rate_limited_action(record, reward.action_key(), scope, reward.limit(rules));
    if !outcome.allowed {
        return Award::none(outcome.record);
    }
    let xp = reward.xp(rules);
    Award {
        record: super::add_xp(&outcome.record, xp),
        xp_awarded: xp,
    }
}
