// Generated identifiers for learners, client instances and log entries.
// Format: "<prefix>-<uuid>"

use serde::{Deserialize, Serialize};
use uuid::Uuid;

const LEARNER_ID_PREFIX: &str = "learner-";
const TAB_ID_PREFIX: &str = "tab-";

/// New local learner id, used until the record is linked to a remote one.
pub fn new_learner_id() -> String {
    format!("{}{}", LEARNER_ID_PREFIX, Uuid::new_v4())
}

/// Whether `id` was generated locally (not yet linked to the remote store).
pub fn is_local_learner_id(id: &str) -> bool {
    id.strip_prefix(LEARNER_ID_PREFIX)
        .is_some_and(|rest| Uuid::parse_str(rest).is_ok())
}

/// New id for an appended log entry (homework, notebook).
pub fn new_entry_id(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4())
}

/// Identity of one open client instance on the cross-tab bus.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TabId(String);

impl TabId {
    pub fn new() -> Self {
        Self(format!("{}{}", TAB_ID_PREFIX, Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TabId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
