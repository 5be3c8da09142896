//! # Questline Core Library
//!
//! Local-first progress and content sync plus the gamification rules of a
//! learning platform. Every learner action is applied to a local snapshot
//! first; a background coordinator reconciles it with a remote content
//! store and tells other open tabs to re-read.
//!
//! ## Architecture
//!
//! - **Storage**: SQLite-backed key/value cache and TOML configuration
//! - **Sync**: retry with backoff, cross-tab bus, remote gateway trait and
//!   the coordinator that ties them together
//! - **Gamification**: pure functions over [`ProgressRecord`] snapshots
//!
//! ## Key Components
//!
//! - [`LocalStore`]: namespaced, never-failing cache
//! - [`SyncCoordinator`]: local-first reconciliation with the remote store
//! - [`LearnerSession`]: learner actions wired to rules, store and sync
//! - [`Config`]: application configuration management

pub mod content;
pub mod error;
pub mod gamification;
pub mod progress;
pub mod session;
pub mod storage;
pub mod sync;

pub use content::{ContentItem, Notification, Profile};
pub use error::{ConfigError, CoreError, StoreError, SyncError};
pub use gamification::{AchievementId, Award, RewardRules};
pub use progress::{level_for_xp, Goal, Habit, ProgressRecord};
pub use session::{ActionResult, AchievementStatus, LearnerSession};
pub use storage::{Config, LocalStore, StorageKey};
pub use sync::{
    CrossTabBus, RemoteContentGateway, RetryPolicy, SyncCoordinator, SyncReport, SyncStatus,
};
