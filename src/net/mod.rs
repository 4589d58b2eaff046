//! Peer-to-peer state sync

pub mod client;
pub mod protocol;

pub use client::{GameClient, Inbound, PeerInbox, TransportError};
pub use protocol::{BulletRecord, PeerMsg, ShipState};
