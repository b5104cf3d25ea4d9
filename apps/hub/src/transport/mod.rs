// Resilient message channel
//
// `TransportChannel` is the handle consumers hold. The connection itself
// is driven by a background supervisor through the `Connector` seam.

pub mod channel;
pub mod connector;
pub mod errors;
pub mod history;
pub mod message;
pub mod state;
mod supervisor;

pub use channel::{Subscription, TransportChannel};
pub use connector::{Connection, Connector};
pub use errors::{TransportError, TransportResult};
pub use history::{MessageHistory, MESSAGE_HISTORY_CAPACITY};
pub use message::{Envelope, MessageKind};
pub use state::{ConnectionState, ConnectionStatus};
