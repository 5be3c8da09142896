//! Habit streaks.
//!
//! A streak is the run of consecutive completed days ending today, or
//! ending yesterday when today is not checked off yet. Anything older
//! breaks the streak.

use chrono::{Days, NaiveDate};
use std::collections::BTreeSet;

use crate::progress::{Goal, Habit, ProgressRecord};

/// Streak length for `dates` as seen on `today`.
pub fn streak_as_of(dates: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let anchor = if dates.contains(&today) {
        today
    } else {
        match today.pred_opt() {
            Some(yesterday) if dates.contains(&yesterday) => yesterday,
            _ => return 0,
        }
    };

    let mut streak = 0u32;
    let mut day = Some(anchor);
    while let Some(d) = day {
        if !dates.contains(&d) {
            break;
        }
        streak += 1;
        day = d.checked_sub_days(Days::new(1));
    }
    streak
}

/// Toggle `date` on `habit` and recompute its streak.
pub fn record_habit_toggle(habit: &Habit, date: NaiveDate, today: NaiveDate) -> Habit {
    let mut next = habit.clone();
    if !next.completed_dates.remove(&date) {
        next.completed_dates.insert(date);
    }
    next.streak = streak_as_of(&next.completed_dates, today);
    next
}

/// Record-level toggle. An unknown habit id leaves the record unchanged.
pub fn toggle_habit(
    record: &ProgressRecord,
    habit_id: &str,
    date: NaiveDate,
    today: NaiveDate,
) -> ProgressRecord {
    let mut next = record.clone();
    if let Some(habit) = next.habits.iter_mut().find(|h| h.id == habit_id) {
        *habit = record_habit_toggle(habit, date, today);
    }
    next
}

/// Recompute every stored streak for `today`, e.g. after days without a
/// toggle have broken some of them.
pub fn refresh_streaks(record: &ProgressRecord, today: NaiveDate) -> ProgressRecord {
    let mut next = record.clone();
    for habit in &mut next.habits {
        habit.streak = streak_as_of(&habit.completed_dates, today);
    }
    next
}

/// Bring a record read from outside (the remote, an older cache) back
/// within the rules: streaks recomputed for `today`, goals clamped.
pub fn normalize_record(record: &ProgressRecord, today: NaiveDate) -> ProgressRecord {
    let mut next = refresh_streaks(record, today);
    next.goals = next.goals.iter().map(Goal::clamped).collect();
    next
}
