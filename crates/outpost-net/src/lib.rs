//! Outpost Net - authority and state sync
//!
//! Provides:
//! - Intent and delta messages with a JSON codec
//! - A single authority gate for every mutation entry point
//! - An in-process loopback relay behind the `Transport` trait
//! - Host (authoritative) and client (replica) sessions

pub mod authority;
pub mod client;
pub mod codec;
pub mod error;
pub mod host;
pub mod message;
pub mod transport;

pub use authority::{AuthorityGate, Role, StateScope};
pub use client::{ClientSession, JobView, ReplicaState, MAX_REPLICA_SLOTS};
pub use codec::MAX_PACKET_LEN;
pub use error::{AuthorityError, CodecError, IntentError, SessionError, TransportError};
pub use host::{HostSession, SessionConfig};
pub use message::{Delta, Envelope, Intent, Message, SlotUpdate, WorldPickup};
pub use transport::{LoopbackEndpoint, LoopbackHub, Packet, Target, Transport};
