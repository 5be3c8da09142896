use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A daily habit the learner checks off.
///
/// `streak` is derived from `completed_dates` by the gamification rules
/// on every toggle; it is stored only so readers need no clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub(crate) completed_dates: BTreeSet<NaiveDate>,
    #[serde(default)]
    pub(crate) streak: u32,
}

impl Habit {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            completed_dates: BTreeSet::new(),
            streak: 0,
        }
    }

    pub fn completed_dates(&self) -> &BTreeSet<NaiveDate> {
        &self.completed_dates
    }

    pub fn is_done_on(&self, date: NaiveDate) -> bool {
        self.completed_dates.contains(&date)
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }
}
