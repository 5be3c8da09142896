//! Deterministic gamification rules.
//!
//! Every function here takes a snapshot and returns a new one: nothing
//! reads a clock, touches storage or talks to the network. Callers pass
//! "today" explicitly, which keeps streak and daily-limit calculations
//! reproducible no matter when they are recomputed.
//!
//! ## Key Components
//!
//! - [`add_xp`] / [`complete_lesson`]: XP accrual with derived levels
//! - [`record_habit_toggle`]: habit streaks with a one-day grace period
//! - [`update_goal_progress`]: clamped goals with one-time completion bonus
//! - [`apply_rate_limited_action`]: per-lesson and per-day counters
//! - [`evaluate_achievements`]: threshold badges, evaluated from scratch

pub mod achievements;
pub mod goals;
pub mod habits;
pub mod rate_limit;
pub mod xp;

pub use achievements::{
    all_achievements, completion_percent, evaluate_achievements, newly_unlocked, Achievement,
    AchievementId,
};
pub use goals::{advance_goal, update_goal_progress, GoalUpdate};
pub use habits::{
    normalize_record, record_habit_toggle, refresh_streaks, streak_as_of, toggle_habit,
};
pub use rate_limit::{
    apply_rate_limited_action, claim_micro_reward, current_count, MicroReward, RateLimitOutcome,
    RateScope,
};
pub use xp::{
    add_notebook_entry, add_xp, admin_reset, complete_lesson, rank_leaderboard, record_referral,
    submit_homework,
};

use serde::{Deserialize, Serialize};

use crate::progress::ProgressRecord;

/// Result of a rule that may grant XP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Award {
    pub record: ProgressRecord,
    pub xp_awarded: u64,
}

impl Award {
    pub(crate) fn none(record: ProgressRecord) -> Self {
        Self {
            record,
            xp_awarded: 0,
        }
    }
}

/// XP table and micro-reward limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardRules {
    #[serde(default = "default_lesson_xp")]
    pub lesson_xp: u64,
    #[serde(default = "default_homework_xp")]
    pub homework_xp: u64,
    #[serde(default = "default_question_xp")]
    pub question_xp: u64,
    #[serde(default = "default_questions_per_lesson")]
    pub questions_per_lesson: u32,
    #[serde(default = "default_story_xp")]
    pub story_xp: u64,
    #[serde(default = "default_stories_per_day")]
    pub stories_per_day: u32,
    #[serde(default = "default_goal_completion_xp")]
    pub goal_completion_xp: u64,
    #[serde(default = "default_referral_xp")]
    pub referral_xp: u64,
}

fn default_lesson_xp() -> u64 {
    100
}
fn default_homework_xp() -> u64 {
    150
}
fn default_question_xp() -> u64 {
    10
}
fn default_questions_per_lesson() -> u32 {
    3
}
fn default_story_xp() -> u64 {
    25
}
fn default_stories_per_day() -> u32 {
    1
}
fn default_goal_completion_xp() -> u64 {
    200
}
fn default_referral_xp() -> u64 {
    300
}

impl Default for RewardRules {
    fn default() -> Self {
        Self {
            lesson_xp: default_lesson_xp(),
            homework_xp: default_homework_xp(),
            question_xp: default_question_xp(),
            questions_per_lesson: default_questions_per_lesson(),
            story_xp: default_story_xp(),
            stories_per_day: default_stories_per_day(),
            goal_completion_xp: default_goal_completion_xp(),
            referral_xp: default_referral_xp(),
        }
    }
}
