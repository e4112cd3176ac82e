pub mod connection;
pub mod status;

pub use connection::{
    ConnectionConfig, ConnectionEvent, ConnectionManager, DEFAULT_RECONNECT_INTERVAL_MS,
    LinkState, MAX_RECONNECT_ATTEMPTS,
};
pub use status::NetworkStatus;
