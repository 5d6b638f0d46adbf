//! Notification dispatch: the durable queue of pending notifications, the
//! retry/backoff policy, the exclusive-pass lease, and the dispatcher that
//! drives one delivery pass over the candidate set.

pub mod dispatcher;
pub mod lock;
pub mod policy;
pub mod store;
