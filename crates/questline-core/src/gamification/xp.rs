//! XP accrual and the progress log operations that grant it.

use std::cmp::Ordering;

use super::{Award, RewardRules};
use crate::content::Profile;
use crate::progress::{HomeworkSubmission, NotebookEntry, ProgressRecord};

/// Add `amount` XP. The level follows from the new total.
pub fn add_xp(record: &ProgressRecord, amount: u64) -> ProgressRecord {
    let mut next = record.clone();
    next.xp = next.xp.saturating_add(amount);
    next
}

/// Mark a lesson complete. XP is granted the first time only.
pub fn complete_lesson(record: &ProgressRecord, lesson_id: &str, rules: &RewardRules) -> Award {
    if record.completed_lesson_ids.contains(lesson_id) {
        return Award::none(record.clone());
    }
    let mut next = add_xp(record, rules.lesson_xp);
    next.completed_lesson_ids.insert(lesson_id.to_string());
    Award {
        record: next,
        xp_awarded: rules.lesson_xp,
    }
}

/// Append a homework submission. Resubmissions for the same lesson are
/// logged but earn nothing.
pub fn submit_homework(
    record: &ProgressRecord,
    submission: HomeworkSubmission,
    rules: &RewardRules,
) -> Award {
    let first_for_lesson = !record
        .submitted_homeworks
        .iter()
        .any(|h| h.lesson_id == submission.lesson_id);

    let (mut next, xp_awarded) = if first_for_lesson {
        (add_xp(record, rules.homework_xp), rules.homework_xp)
    } else {
        (record.clone(), 0)
    };
    next.submitted_homeworks.push(submission);
    Award {
        record: next,
        xp_awarded,
    }
}

/// Count a successful referral.
pub fn record_referral(record: &ProgressRecord, rules: &RewardRules) -> Award {
    let mut next = add_xp(record, rules.referral_xp);
    next.referral_count = next.referral_count.saturating_add(1);
    Award {
        record: next,
        xp_awarded: rules.referral_xp,
    }
}

pub fn add_notebook_entry(record: &ProgressRecord, entry: NotebookEntry) -> ProgressRecord {
    let mut next = record.clone();
    next.notebook_entries.push(entry);
    next
}

/// Admin reset: the only operation that lowers XP. Identity survives.
pub fn admin_reset(record: &ProgressRecord) -> ProgressRecord {
    let mut next = ProgressRecord::new(record.local_id.clone(), record.display_name.clone());
    next.remote_id = record.remote_id.clone();
    next.last_sync_timestamp = record.last_sync_timestamp;
    next
}

/// Order profiles by XP (highest first), then name, then id.
pub fn rank_leaderboard(mut profiles: Vec<Profile>) -> Vec<Profile> {
    profiles.sort_by(|a, b| match b.xp.cmp(&a.xp) {
        Ordering::Equal => a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)),
        other => other,
    });
    profiles
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record() -> ProgressRecord {
        ProgressRecord::new("learner-1", "Ada")
    }

    fn homework(lesson: &str) -> HomeworkSubmission {
        HomeworkSubmission {
            id: format!("hw-{lesson}"),
            lesson_id: lesson.into(),
            answer: "42".into(),
            submitted_at: Utc.with_ymd_and_hms(2025, 3, 9, 12, 0, 0).unwrap(),
            grade: None,
        }
    }

    #[test]
    fn add_xp_crosses_level_boundary() {
        let next = add_xp(&record(), 999);
        assert_eq!(next.level(), 1);
        let next = add_xp(&next, 1);
        assert_eq!(next.xp(), 1000);
        assert_eq!(next.level(), 2);
    }

    #[test]
    fn add_xp_leaves_input_untouched() {
        let before = record();
        let _ = add_xp(&before, 500);
        assert_eq!(before.xp(), 0);
    }

    #[test]
    fn lesson_xp_is_awarded_once() {
        let rules = RewardRules::default();
        let first = complete_lesson(&record(), "l1", &rules);
        assert_eq!(first.xp_awarded, 100);
        let again = complete_lesson(&first.record, "l1", &rules);
        assert_eq!(again.xp_awarded, 0);
        assert_eq!(again.record.xp(), 100);
        assert_eq!(again.record.completed_lesson_ids.len(), 1);
    }

    #[test]
    fn homework_resubmission_is_logged_without_xp() {
        let rules = RewardRules::default();
        let first = submit_homework(&record(), homework("l1"), &rules);
        let second = submit_homework(&first.record, homework("l1"), &rules);
        assert_eq!(first.xp_awarded, 150);
        assert_eq!(second.xp_awarded, 0);
        assert_eq!(second.record.submitted_homeworks.len(), 2);
    }

    #[test]
    fn referral_increments_counter() {
        let award = record_referral(&record(), &RewardRules::default());
        assert_eq!(award.record.referral_count, 1);
        assert_eq!(award.record.xp(), 300);
    }

    #[test]
    fn admin_reset_keeps_identity() {
        let mut r = complete_lesson(&record(), "l1", &RewardRules::default()).record;
        r.remote_id = Some("rec1".into());
        let reset = admin_reset(&r);
        assert_eq!(reset.xp(), 0);
        assert_eq!(reset.level(), 1);
        assert!(reset.completed_lesson_ids.is_empty());
        assert_eq!(reset.remote_id.as_deref(), Some("rec1"));
        assert_eq!(reset.local_id, "learner-1");
    }

    #[test]
    fn leaderboard_ranks_by_xp_then_name() {
        let p = |id: &str, name: &str, xp: u64| Profile {
            id: id.into(),
            name: name.into(),
            xp,
            level: 1,
            progress: None,
            updated_at: None,
        };
        let ranked = rank_leaderboard(vec![p("1", "Bo", 10), p("2", "Al", 50), p("3", "Ab", 10)]);
        let ids: Vec<_> = ranked.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3", "1"]);
    }
}
