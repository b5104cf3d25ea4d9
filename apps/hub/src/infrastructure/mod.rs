// Infrastructure layer module
// Contains adapters for external protocols
// Follows Hexagonal Architecture

pub mod websocket;

pub use websocket::{WebSocketConnection, WebSocketConnector};
