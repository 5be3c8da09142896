//! Goal progress with a one-time completion bonus.

use super::{Award, RewardRules};
use crate::progress::{Goal, ProgressRecord};

/// Outcome of a goal update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalUpdate {
    pub goal: Goal,
    /// True only on the update that moved the goal from below target to
    /// at-or-above target.
    pub just_completed: bool,
}

/// Apply `delta` and clamp into `[0, target]`.
pub fn update_goal_progress(goal: &Goal, delta: i64) -> GoalUpdate {
    let was_completed = goal.is_completed();
    let target = i64::from(goal.target_value);
    let value = i64::from(goal.current_value)
        .saturating_add(delta)
        .clamp(0, target);

    let mut next = goal.clone();
    // Clamped into [0, target], so it fits.
    next.current_value = u32::try_from(value).unwrap_or(goal.target_value);
    let just_completed = !was_completed && next.is_completed();
    GoalUpdate {
        goal: next,
        just_completed,
    }
}

/// Advance a goal on the record, granting the completion bonus when it
/// is first reached. Unknown ids leave the record unchanged.
pub fn advance_goal(
    record: &ProgressRecord,
    goal_id: &str,
    delta: i64,
    rules: &RewardRules,
) -> Award {
    let Some(index) = record.goals.iter().position(|g| g.id == goal_id) else {
        return Award::none(record.clone());
    };

    let update = update_goal_progress(&record.goals[index], delta);
    let xp_awarded = if update.just_completed {
        rules.goal_completion_xp
    } else {
        0
    };

    let mut next = super::add_xp(record, xp_awarded);
    next.goals[index] = update.goal;
    Award {
        record: next,
        xp_awarded,
    }
}
