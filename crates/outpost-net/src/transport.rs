//! Packet transport
//!
//! `Transport` is the seam between sessions and the wire. `LoopbackHub`
//! relays packets between in-process peers over unbounded tokio channels,
//! reliable and ordered per sender. Sessions drain their inbox once per tick.

use std::collections::HashMap;
use std::sync::Arc;

use outpost_core::PeerId;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use crate::error::TransportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Peer(PeerId),
    /// Every connected peer except the sender
    Broadcast,
}

/// Raw payload stamped with the sender the relay saw
#[derive(Debug, Clone)]
pub struct Packet {
    pub from: PeerId,
    pub payload: Vec<u8>,
}

pub trait Transport {
    fn local_peer(&self) -> PeerId;

    fn send(&self, target: Target, payload: Vec<u8>) -> Result<(), TransportError>;

    /// Everything received since the last call, in arrival order
    fn drain(&mut self) -> Vec<Packet>;
}

/// In-process relay connecting any number of endpoints
#[derive(Debug, Clone, Default)]
pub struct LoopbackHub {
    routes: Arc<Mutex<HashMap<PeerId, UnboundedSender<Packet>>>>,
}

impl LoopbackHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a peer and hand back its endpoint. Reconnecting replaces the
    /// old route.
    pub fn connect(&self, peer: PeerId) -> LoopbackEndpoint {
        let (tx, rx) = mpsc::unbounded_channel();
        if self.routes.lock().insert(peer, tx).is_some() {
            warn!("Peer {} reconnected, dropping old route", peer);
        }
        debug!("Peer {} connected to loopback hub", peer);
        LoopbackEndpoint {
            peer,
            hub: self.clone(),
            inbox: rx,
        }
    }

    pub fn disconnect(&self, peer: PeerId) -> bool {
        self.routes.lock().remove(&peer).is_some()
    }

    pub fn peer_count(&self) -> usize {
        self.routes.lock().len()
    }

    fn route(&self, from: PeerId, target: Target, payload: Vec<u8>) -> Result<(), TransportError> {
        let routes = self.routes.lock();
        match target {
            Target::Peer(peer) => {
                let tx = routes.get(&peer).ok_or(TransportError::UnknownPeer(peer))?;
                tx.send(Packet { from, payload })
                    .map_err(|_| TransportError::Disconnected(peer))
            }
            Target::Broadcast => {
                for (peer, tx) in routes.iter().filter(|(peer, _)| **peer != from) {
                    if tx
                        .send(Packet {
                            from,
                            payload: payload.clone(),
                        })
                        .is_err()
                    {
                        debug!("Skipping closed route to {}", peer);
                    }
                }
                Ok(())
            }
        }
    }
}

/// One peer's connection to a `LoopbackHub`
#[derive(Debug)]
pub struct LoopbackEndpoint {
    peer: PeerId,
    hub: LoopbackHub,
    inbox: UnboundedReceiver<Packet>,
}

impl Transport for LoopbackEndpoint {
    fn local_peer(&self) -> PeerId {
        self.peer
    }

    fn send(&self, target: Target, payload: Vec<u8>) -> Result<(), TransportError> {
        self.hub.route(self.peer, target, payload)
    }

    fn drain(&mut self) -> Vec<Packet> {
        let mut packets = Vec::new();
        while let Ok(packet) = self.inbox.try_recv() {
            packets.push(packet);
        }
        packets
    }
}

impl Drop for LoopbackEndpoint {
    fn drop(&mut self) {
        self.inbox.close();
        // Leave a newer route for the same peer alone
        let mut routes = self.hub.routes.lock();
        if routes.get(&self.peer).is_some_and(|tx| tx.is_closed()) {
            routes.remove(&self.peer);
        }
    }
}
