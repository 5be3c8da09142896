//! Achievement badges.
//!
//! Evaluation is a pure threshold check over the current record and is
//! redone from scratch on every call. Remembering which badges were
//! already announced is the caller's job (see [`newly_unlocked`]).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::rate_limit::MicroReward;
use crate::progress::ProgressRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementId {
    FirstLesson,
    TenLessons,
    FirstHomework,
    FiveHomeworks,
    Streak3,
    Streak7,
    Streak30,
    Curious,
    Storyteller,
    Recruiter,
    Halfway,
    Graduate,
}

/// Badge metadata for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Achievement {
    pub id: AchievementId,
    pub name: &'static str,
    pub description: &'static str,
}

impl Achievement {
    const fn new(id: AchievementId, name: &'static str, description: &'static str) -> Self {
        Self {
            id,
            name,
            description,
        }
    }
}

/// Every badge, in display order.
pub fn all_achievements() -> Vec<Achievement> {
    use AchievementId::*;
    vec![
        Achievement::new(FirstLesson, "First Step", "Complete your first lesson"),
        Achievement::new(TenLessons, "Bookworm", "Complete 10 lessons"),
        Achievement::new(FirstHomework, "Homework Hero", "Submit your first homework"),
        Achievement::new(FiveHomeworks, "Diligent", "Submit 5 homeworks"),
        Achievement::new(Streak3, "On Fire", "Keep a habit for 3 days in a row"),
        Achievement::new(Streak7, "Week Warrior", "Keep a habit for 7 days in a row"),
        Achievement::new(Streak30, "Unstoppable", "Keep a habit for 30 days in a row"),
        Achievement::new(Curious, "Curious Mind", "Ask 10 questions"),
        Achievement::new(Storyteller, "Storyteller", "Share 5 stories"),
        Achievement::new(Recruiter, "Recruiter", "Invite a friend who joins"),
        Achievement::new(Halfway, "Halfway There", "Complete half of the course"),
        Achievement::new(Graduate, "Graduate", "Complete the whole course"),
    ]
}

/// Share of the course's lessons completed, as a whole percent in
/// `[0, 100]`. Only lessons listed in `course` count; an empty course
/// counts as 0%.
pub fn completion_percent(record: &ProgressRecord, course: &BTreeSet<String>) -> u32 {
    if course.is_empty() {
        return 0;
    }
    let done = record.completed_lesson_ids.intersection(course).count();
    u32::try_from(done * 100 / course.len()).unwrap_or(100)
}

fn is_unlocked(id: AchievementId, record: &ProgressRecord, percent: u32) -> bool {
    let lessons = record.completed_lesson_ids.len();
    let homeworks = record.submitted_homeworks.len();
    let streak = record.best_streak();
    let questions = record.stats.total(MicroReward::AskQuestion.action_key());
    let stories = record.stats.total(MicroReward::ShareStory.action_key());

    match id {
        AchievementId::FirstLesson => lessons >= 1,
        AchievementId::TenLessons => lessons >= 10,
        AchievementId::FirstHomework => homeworks >= 1,
        AchievementId::FiveHomeworks => homeworks >= 5,
        AchievementId::Streak3 => streak >= 3,
        AchievementId::Streak7 => streak >= 7,
        AchievementId::Streak30 => streak >= 30,
        AchievementId::Curious => questions >= 10,
        AchievementId::Storyteller => stories >= 5,
        AchievementId::Recruiter => record.referral_count >= 1,
        AchievementId::Halfway => percent >= 50,
        AchievementId::Graduate => percent >= 100,
    }
}

/// Badges the record currently qualifies for, given the lesson ids that
/// make up the course.
pub fn evaluate_achievements(
    record: &ProgressRecord,
    course: &BTreeSet<String>,
) -> BTreeSet<AchievementId> {
    let percent = completion_percent(record, course);
    all_achievements()
        .into_iter()
        .map(|a| a.id)
        .filter(|&id| is_unlocked(id, record, percent))
        .collect()
}

/// Badges in `current` that are not in `seen`.
pub fn newly_unlocked(
    seen: &BTreeSet<AchievementId>,
    current: &BTreeSet<AchievementId>,
) -> BTreeSet<AchievementId> {
    current.difference(seen).copied().collect()
}
