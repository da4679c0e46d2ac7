//! JSON encoding of envelopes with a size limit

use crate::error::CodecError;
use crate::message::Envelope;

/// Largest accepted packet
pub const MAX_PACKET_LEN: usize = 64 * 1024;

pub fn encode(envelope: &Envelope) -> Result<Vec<u8>, CodecError> {
    let bytes = serde_json::to_vec(envelope)?;
    if bytes.len() > MAX_PACKET_LEN {
        return Err(CodecError::TooLarge {
            len: bytes.len(),
            max: MAX_PACKET_LEN,
        });
    }
    Ok(bytes)
}

pub fn decode(bytes: &[u8]) -> Result<Envelope, CodecError> {
    if bytes.len() > MAX_PACKET_LEN {
        return Err(CodecError::TooLarge {
            len: bytes.len(),
            max: MAX_PACKET_LEN,
        });
    }
    Ok(serde_json::from_slice(bytes)?)
}
