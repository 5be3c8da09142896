//! Sync subcommand.
//!
//! Runs one reconciliation round against the configured remote store, or
//! shows what is still waiting to be saved.

use clap::Subcommand;
use questline_core::sync::{Collection, CollectionOutcome, KeepReason};
use questline_core::LearnerSession;

use super::{print_json, CommandResult};

#[derive(Subcommand)]
pub enum SyncAction {
    /// Run one sync round for every collection
    Run,
    /// Show last sync time and pending local changes
    Status,
}

pub async fn run(action: SyncAction, session: &LearnerSession, json: bool) -> CommandResult {
    match action {
        SyncAction::Run => {
            let report = session.sync_now().await;
            if json {
                return print_json(&report);
            }
            if report.skipped {
                println!("sync already in progress");
                return Ok(());
            }
            if !session.sync().is_configured() {
                println!("remote not configured (set remote.base_url); using local data");
            }
            for collection in Collection::all() {
                if let Some(outcome) = report.outcome(collection) {
                    println!("{:<14} {}", collection.name(), describe(outcome));
                }
            }
        }
        SyncAction::Status => {
            let status = session.sync().status();
            if json {
                return print_json(&status);
            }
            match status.last_sync_at {
                Some(at) => println!("last sync:  {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
                None => println!("last sync:  never"),
            }
            println!("pending:    {}", status.pending_count);
            println!(
                "remote:     {}",
                if session.sync().is_configured() { "configured" } else { "offline" }
            );
        }
    }
    Ok(())
}

fn describe(outcome: &CollectionOutcome) -> String {
    match outcome {
        CollectionOutcome::Updated => "updated".into(),
        CollectionOutcome::Unchanged => "unchanged".into(),
        CollectionOutcome::KeptLocal(reason) => match reason {
            KeepReason::NotConfigured => "kept local (not configured)".into(),
            KeepReason::FetchFailed(e) => format!("kept local (fetch failed: {e})"),
            KeepReason::EmptyRemote => "kept local (remote empty)".into(),
            KeepReason::LocalPending => "kept local (unsaved local changes)".into(),
            KeepReason::StoreFailed(e) => format!("kept local (cache write failed: {e})"),
        },
    }
}
