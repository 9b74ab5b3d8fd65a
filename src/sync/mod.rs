//! Fetch, enrich and reconcile: the per-source and per-user sync pipeline,
//! plus the HTTP trigger in front of it.

pub mod dtos;
pub mod handlers;
pub mod orchestrator;
pub mod reconcile;

pub use orchestrator::{BatchSyncResult, SyncError, SyncOrchestrator, SyncResult};
pub use reconcile::{NormalizedEntry, ReconcileOutcome, Reconciler, SyncWindow};
