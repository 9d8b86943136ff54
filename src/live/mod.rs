//! Live update channel: push notifications that invalidate the snapshot cache
//! and are republished on the update bus.

mod channel;
mod connector;

pub use channel::{ConnectionState, LiveChannel};
pub use connector::{ConnectError, Connector, Frame, LiveStream, WsConnector};
