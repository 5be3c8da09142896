//! Progress and content synchronization layer.
//!
//! Keeps the local store and the remote content store in step while the
//! local copy stays authoritative for everything the UI shows. Remote
//! failures are retried with backoff and then absorbed; other tabs are
//! told to re-read local state through the cross-tab bus.

pub mod bus;
pub mod coordinator;
pub mod gateway;
pub mod http_gateway;
pub mod ledger;
mod push_queue;
pub mod retry;
pub mod types;


pub use bus::{CrossTabBus, Listener, Subscription, TabChannel};
pub use coordinator::{PushTicket, SyncCoordinator, SyncOptions};
pub use gateway::{MemoryGateway, OfflineGateway, RemoteContentGateway};
pub use http_gateway::{gateway_from_config, HttpGateway};
pub use ledger::SyncLedger;
pub use push_queue::DebounceQueue;
pub use retry::{retry, RetryPolicy};
pub use types::{
    Collection, CollectionOutcome, ContentCollection, KeepReason, PushOutcome, SignalKind,
    SyncEnvelope, SyncReport, SyncSignal, SyncStatus,
};
