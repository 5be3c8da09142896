//! Persisted key names.
//!
//! The names match the schema the web client already writes, so a cache
//! populated by an older build stays readable.

/// A well-known LocalStore key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StorageKey {
    Progress,
    CourseModules,
    Materials,
    Streams,
    Events,
    Scenarios,
    LocalNotifications,
    AllUsers,
    AppConfig,
    /// Shared sync bookkeeping: write generations, unsaved collections
    /// and the last completed sync.
    SyncState,
}

impl StorageKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::Progress => "progress",
            StorageKey::CourseModules => "courseModules",
            StorageKey::Materials => "materials",
            StorageKey::Streams => "streams",
            StorageKey::Events => "events",
            StorageKey::Scenarios => "scenarios",
            StorageKey::LocalNotifications => "local_notifications",
            StorageKey::AllUsers => "allUsers",
            StorageKey::AppConfig => "appConfig",
            StorageKey::SyncState => "syncState",
        }
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
