//! Authority checks
//!
//! Every intent and every delta passes through one `AuthorityGate` before it
//! may touch state. The gate knows who the authority is, who is in the
//! session, and which scope an intent mutates.

use std::collections::HashSet;

use outpost_core::PeerId;

use crate::error::AuthorityError;

/// Role of the local peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Authority,
    Client,
}

/// Which state an intent mutates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateScope {
    /// Private state of one player; only that player may ask
    Player(PeerId),
    /// World state shared by everyone; any member may ask, only the
    /// authority applies
    Shared,
    /// Only the authority itself may ask
    AuthorityOnly,
}

#[derive(Debug, Clone)]
pub struct AuthorityGate {
    local: PeerId,
    authority: PeerId,
    members: HashSet<PeerId>,
}

impl AuthorityGate {
    pub fn new(local: PeerId, authority: PeerId) -> Self {
        let members = [local, authority].into_iter().collect();
        Self {
            local,
            authority,
            members,
        }
    }

    pub fn role(&self) -> Role {
        if self.local == self.authority {
            Role::Authority
        } else {
            Role::Client
        }
    }

    pub fn is_authority(&self) -> bool {
        self.role() == Role::Authority
    }

    pub fn local(&self) -> PeerId {
        self.local
    }

    pub fn authority(&self) -> PeerId {
        self.authority
    }

    /// Add a peer. Returns false if it was already a member.
    pub fn admit(&mut self, peer: PeerId) -> bool {
        self.members.insert(peer)
    }

    /// The authority cannot be removed
    pub fn remove(&mut self, peer: PeerId) -> bool {
        peer != self.authority && self.members.remove(&peer)
    }

    pub fn is_member(&self, peer: PeerId) -> bool {
        self.members.contains(&peer)
    }

    /// May `sender`'s intent on `scope` be applied here?
    pub fn check_intent(&self, sender: PeerId, scope: StateScope) -> Result<(), AuthorityError> {
        if !self.is_authority() {
            return Err(AuthorityError::NotAuthority);
        }
        if !self.is_member(sender) {
            return Err(AuthorityError::UnknownPeer(sender));
        }
        match scope {
            StateScope::Player(owner) if owner != sender => {
                Err(AuthorityError::NotOwner { sender, owner })
            }
            StateScope::AuthorityOnly if sender != self.authority => {
                Err(AuthorityError::AuthorityOnly(sender))
            }
            _ => Ok(()),
        }
    }

    /// May a state update from `sender` be applied here?
    pub fn check_delta(&self, sender: PeerId) -> Result<(), AuthorityError> {
        if sender == self.authority && !self.is_authority() {
            Ok(())
        } else {
            Err(AuthorityError::DeltaFromNonAuthority(sender))
        }
    }

    /// Transport identity must match what the envelope claims
    pub fn check_sender(&self, claimed: PeerId, actual: PeerId) -> Result<(), AuthorityError> {
        if claimed == actual {
            Ok(())
        } else {
            Err(AuthorityError::SpoofedSender { claimed, actual })
        }
    }
}
