use outpost_core::PeerId;
use outpost_game::{CraftError, EquipError};
use thiserror::Error;

/// A peer tried to touch state it does not own
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AuthorityError {
    #[error("This peer is not the session authority")]
    NotAuthority,

    #[error("Peer {0} is not part of the session")]
    UnknownPeer(PeerId),

    #[error("Peer {sender} cannot change state owned by {owner}")]
    NotOwner { sender: PeerId, owner: PeerId },

    #[error("Peer {0} attempted an authority-only action")]
    AuthorityOnly(PeerId),

    #[error("Ignoring state update from non-authority peer {0}")]
    DeltaFromNonAuthority(PeerId),

    #[error("Envelope claims sender {claimed} but arrived from {actual}")]
    SpoofedSender { claimed: PeerId, actual: PeerId },
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Packet of {len} bytes exceeds the {max} byte limit")]
    TooLarge { len: usize, max: usize },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    #[error("No route to peer {0}")]
    UnknownPeer(PeerId),

    #[error("Peer {0} disconnected")]
    Disconnected(PeerId),
}

/// Why the host refused an intent. Sent back to the requester as text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntentError {
    #[error(transparent)]
    Authority(#[from] AuthorityError),

    #[error(transparent)]
    Craft(#[from] CraftError),

    #[error(transparent)]
    Equip(#[from] EquipError),

    #[error("No player state for {0}")]
    UnknownPlayer(PeerId),

    #[error("{0}")]
    Invalid(&'static str),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}
