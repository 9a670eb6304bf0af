//! Synchronization between the local board model and the remote project.

mod coordinator;
mod notify;
mod pending;
mod remote;
#[cfg(test)]
pub(crate) mod testing;

pub use coordinator::{
  PushReport, SyncCoordinator, SyncOptions, SyncOutcome, DEFAULT_MAX_PUSH_FAILURES,
};
pub use notify::{LogNotifier, Notice, NoticeLevel, Notifier};
pub use pending::{FailureOutcome, PendingQueue};
pub use remote::RemoteClient;
