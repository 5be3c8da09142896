//! Learner-facing operations.
//!
//! [`LearnerSession`] ties the pure rules in [`crate::gamification`] to the
//! local store and the sync coordinator: read the current record, apply a
//! rule, write the result locally and schedule the remote save.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::content::{course_lessons, ContentItem, Notification, Profile};
use crate::error::CoreError;
use crate::gamification::{
    self, all_achievements, evaluate_achievements, newly_unlocked, Achievement, AchievementId,
    Award, MicroReward, RateScope, RewardRules,
};
use crate::progress::identity::new_entry_id;
use crate::progress::{Goal, Habit, HomeworkSubmission, NotebookEntry, ProgressRecord};
use crate::storage::{Config, LocalStore, StorageKey};
use crate::sync::{
    gateway_from_config, ContentCollection, CrossTabBus, SyncCoordinator, SyncOptions, SyncReport,
};

/// Client-side state that never leaves this device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppState {
    #[serde(default)]
    seen_achievements: BTreeSet<AchievementId>,
}

/// What a learner action changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionResult {
    pub xp_awarded: u64,
    pub xp: u64,
    pub level: u32,
    pub leveled_up: bool,
    /// Badges earned by this action, announced once.
    pub new_achievements: Vec<AchievementId>,
}

/// Badge with its unlocked flag, for listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AchievementStatus {
    #[serde(flatten)]
    pub achievement: Achievement,
    pub unlocked: bool,
}

pub struct LearnerSession {
    sync: SyncCoordinator,
    rules: RewardRules,
}

impl LearnerSession {
    /// Wrap an existing coordinator. Creates an anonymous learner record
    /// when the store has none.
    pub fn new(sync: SyncCoordinator, rules: RewardRules) -> Self {
        let store = sync.store();
        if !store.contains(StorageKey::Progress) {
            let record = ProgressRecord::anonymous();
            tracing::info!(learner = %record.local_id, "created local learner record");
            store.set(StorageKey::Progress, &record);
        }
        Self { sync, rules }
    }

    /// Open the default store for `config` and join `bus`.
    pub fn open(config: &Config, bus: &CrossTabBus) -> Result<Self, CoreError> {
        let path = config.storage.database_path()?;
        let store = LocalStore::open(&path, &config.storage.namespace)?;
        Ok(Self::with_store(config, store, bus))
    }

    pub fn with_store(config: &Config, store: LocalStore, bus: &CrossTabBus) -> Self {
        let gateway = gateway_from_config(&config.remote);
        let options = SyncOptions::from_settings(&config.sync)
            .with_user_id(config.remote.user_id.clone());
        let sync = SyncCoordinator::new(store, gateway, bus.join(), options);
        Self::new(sync, config.rewards.clone())
    }

    pub fn sync(&self) -> &SyncCoordinator {
        &self.sync
    }

    pub fn rules(&self) -> &RewardRules {
        &self.rules
    }

    fn store(&self) -> &LocalStore {
        self.sync.store()
    }

    pub fn progress(&self) -> ProgressRecord {
        self.store()
            .get::<Option<ProgressRecord>>(StorageKey::Progress, None)
            .unwrap_or_else(ProgressRecord::anonymous)
    }

    pub fn modules(&self) -> Vec<ContentItem> {
        self.sync.content(ContentCollection::Modules)
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.store().get(StorageKey::LocalNotifications, Vec::new())
    }

    /// Cached leaderboard, best first.
    pub fn leaderboard(&self) -> Vec<Profile> {
        gamification::rank_leaderboard(self.store().get(StorageKey::AllUsers, Vec::new()))
    }

    /// Lesson ids of the cached course.
    pub fn course_lessons(&self) -> BTreeSet<String> {
        course_lessons(&self.modules())
    }

    pub fn total_lessons(&self) -> usize {
        self.course_lessons().len()
    }

    pub fn completion_percent(&self) -> u32 {
        gamification::completion_percent(&self.progress(), &self.course_lessons())
    }

    pub fn achievements(&self) -> Vec<AchievementStatus> {
        let unlocked = evaluate_achievements(&self.progress(), &self.course_lessons());
        all_achievements()
            .into_iter()
            .map(|achievement| AchievementStatus {
                unlocked: unlocked.contains(&achievement.id),
                achievement,
            })
            .collect()
    }

    fn app_state(&self) -> AppState {
        self.store().get(StorageKey::AppConfig, AppState::default())
    }

    /// Persist `after` if it differs from `before` and report the change.
    fn commit(&self, before: &ProgressRecord, award: Award) -> ActionResult {
        let after = award.record;
        if after != *before {
            self.sync.push_user(&after);
        }

        let mut app = self.app_state();
        let current = evaluate_achievements(&after, &self.course_lessons());
        let fresh = newly_unlocked(&app.seen_achievements, &current);
        if !fresh.is_empty() {
            app.seen_achievements.extend(fresh.iter().copied());
            self.store().set(StorageKey::AppConfig, &app);
            tracing::info!(?fresh, "achievements unlocked");
        }

        ActionResult {
            xp_awarded: award.xp_awarded,
            xp: after.xp(),
            level: after.level(),
            leveled_up: after.level() > before.level(),
            new_achievements: fresh.into_iter().collect(),
        }
    }

    fn commit_record(&self, before: &ProgressRecord, record: ProgressRecord) -> ActionResult {
        self.commit(
            before,
            Award {
                record,
                xp_awarded: 0,
            },
        )
    }

    pub fn complete_lesson(&self, lesson_id: &str) -> ActionResult {
        let before = self.progress();
        let award = gamification::complete_lesson(&before, lesson_id, &self.rules);
        self.commit(&before, award)
    }

    pub fn submit_homework(&self, lesson_id: &str, answer: &str) -> ActionResult {
        let before = self.progress();
        let submission = HomeworkSubmission {
            id: new_entry_id("hw"),
            lesson_id: lesson_id.to_string(),
            answer: answer.to_string(),
            submitted_at: Utc::now(),
            grade: None,
        };
        let award = gamification::submit_homework(&before, submission, &self.rules);
        self.commit(&before, award)
    }

    /// Rate-limited per lesson.
    pub fn ask_question(&self, lesson_id: &str) -> ActionResult {
        let before = self.progress();
        let scope = RateScope::Lesson(lesson_id.to_string());
        let award = gamification::claim_micro_reward(&before, MicroReward::AskQuestion, &scope, &self.rules);
        self.commit(&before, award)
    }

    /// Rate-limited per day.
    pub fn share_story(&self, today: NaiveDate) -> ActionResult {
        let before = self.progress();
        let award = gamification::claim_micro_reward(
            &before,
            MicroReward::ShareStory,
            &RateScope::Day(today),
            &self.rules,
        );
        self.commit(&before, award)
    }

    pub fn add_habit(&self, title: &str) -> String {
        let before = self.progress();
        let id = new_entry_id("habit");
        let mut record = before.clone();
        record.habits.push(Habit::new(id.clone(), title));
        self.commit_record(&before, record);
        id
    }

    /// # Errors
    ///
    /// Returns an error if no habit has this id.
    pub fn toggle_habit(&self, habit_id: &str, date: NaiveDate, today: NaiveDate) -> Result<ActionResult, CoreError> {
        let before = self.progress();
        if before.habit(habit_id).is_none() {
            return Err(CoreError::Custom(format!("no habit with id {habit_id}")));
        }
        let record = gamification::toggle_habit(&before, habit_id, date, today);
        Ok(self.commit_record(&before, record))
    }

    /// Recompute streaks for `today` so lapsed ones read as zero.
    pub fn refresh_streaks(&self, today: NaiveDate) -> ProgressRecord {
        let before = self.progress();
        let record = gamification::refresh_streaks(&before, today);
        self.commit_record(&before, record.clone());
        record
    }

    pub fn add_goal(&self, title: &str, target: u32) -> String {
        let before = self.progress();
        let id = new_entry_id("goal");
        let mut record = before.clone();
        record.goals.push(Goal::new(id.clone(), title, target));
        self.commit_record(&before, record);
        id
    }

    /// # Errors
    ///
    /// Returns an error if no goal has this id.
    pub fn advance_goal(&self, goal_id: &str, delta: i64) -> Result<ActionResult, CoreError> {
        let before = self.progress();
        if before.goal(goal_id).is_none() {
            return Err(CoreError::Custom(format!("no goal with id {goal_id}")));
        }
        let award = gamification::advance_goal(&before, goal_id, delta, &self.rules);
        Ok(self.commit(&before, award))
    }

    pub fn add_note(&self, lesson_id: Option<&str>, text: &str) -> String {
        let before = self.progress();
        let entry = NotebookEntry {
            id: new_entry_id("note"),
            lesson_id: lesson_id.map(str::to_string),
            text: text.to_string(),
            created_at: Utc::now(),
        };
        let id = entry.id.clone();
        self.commit_record(&before, gamification::add_notebook_entry(&before, entry));
        id
    }

    pub fn record_referral(&self) -> ActionResult {
        let before = self.progress();
        let award = gamification::record_referral(&before, &self.rules);
        self.commit(&before, award)
    }

    pub fn set_display_name(&self, name: &str) {
        let before = self.progress();
        let mut record = before.clone();
        record.display_name = name.to_string();
        self.commit_record(&before, record);
    }

    /// Wipe progress (identity kept) and forget announced badges.
    pub fn admin_reset(&self) -> ProgressRecord {
        let before = self.progress();
        let record = gamification::admin_reset(&before);
        self.store().set(StorageKey::AppConfig, &AppState::default());
        self.commit_record(&before, record.clone());
        tracing::info!(learner = %record.local_id, "progress reset");
        record
    }

    pub async fn sync_now(&self) -> SyncReport {
        self.sync.sync_all().await
    }

    /// Flush pending saves and stop background sync.
    pub async fn shutdown(&self) {
        self.sync.shutdown().await;
    }
}
