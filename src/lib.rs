//! A reliable, in-order byte-stream transport over an unreliable datagram
//! channel: sequence numbering, checksumming, cumulative acknowledgment, a
//! sliding-window sender, a reordering receiver, timer-driven
//! retransmission, and a bilateral end-of-stream handshake.
//!
//! The protocol engine ([`Session`], [`sender::Sender`],
//! [`receiver::Receiver`], and the wire framing in [`packet`]) is the core
//! this crate exists to get right. The datagram I/O substrate
//! ([`connection::Connection`]), the [`registry::SessionRegistry`], and the
//! [`dispatcher`] are external collaborators the core consumes through
//! narrow interfaces; none of them participate in the protocol's
//! correctness invariants.

pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod packet;
pub mod receiver;
pub mod registry;
pub mod sender;
pub mod seq;
pub mod session;

pub use config::Config;
pub use connection::{ChannelConnection, Connection, ReadOutcome};
pub use error::Error;
pub use packet::Packet;
pub use registry::SessionRegistry;
pub use session::Session;
