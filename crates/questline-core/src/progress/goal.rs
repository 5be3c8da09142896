use serde::{Deserialize, Serialize};

/// A numeric goal such as "finish 5 lessons this week".
///
/// `current_value` always stays within `[0, target_value]` and the target
/// is at least 1, including for goals read back from storage or the
/// remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredGoal")]
pub struct Goal {
    pub id: String,
    pub title: String,
    pub(crate) current_value: u32,
    pub(crate) target_value: u32,
}

/// Goal as persisted, before its bounds are enforced.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredGoal {
    id: String,
    title: String,
    #[serde(default)]
    current_value: u32,
    target_value: u32,
}

impl From<StoredGoal> for Goal {
    fn from(stored: StoredGoal) -> Self {
        let mut goal = Goal::new(stored.id, stored.title, stored.target_value);
        goal.current_value = stored.current_value;
        goal.clamped()
    }
}

impl Goal {
    /// A target of 0 is raised to 1.
    pub fn new(id: impl Into<String>, title: impl Into<String>, target_value: u32) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            current_value: 0,
            target_value: target_value.max(1),
        }
    }

    pub fn current_value(&self) -> u32 {
        self.current_value
    }

    pub fn target_value(&self) -> u32 {
        self.target_value
    }

    pub fn is_completed(&self) -> bool {
        self.current_value >= self.target_value
    }

    /// Copy with the target raised to 1 and progress capped at the target.
    pub fn clamped(&self) -> Self {
        let target_value = self.target_value.max(1);
        Self {
            id: self.id.clone(),
            title: self.title.clone(),
            current_value: self.current_value.min(target_value),
            target_value,
        }
    }

    /// Completion ratio in `[0.0, 1.0]`.
    pub fn ratio(&self) -> f64 {
        f64::from(self.current_value) / f64::from(self.target_value.max(1))
    }
}
