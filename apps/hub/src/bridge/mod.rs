// Synchronization bridge
//
// The only component coupling the transport channel to the registry and
// the sole producer of the observable snapshot.

#![allow(clippy::module_inception)]

pub mod bridge;
pub mod notifications;
pub mod state;

pub use bridge::SyncBridge;
pub use notifications::{Notification, NotificationSink, Severity, TracingNotifier};
pub use state::ObservableState;
