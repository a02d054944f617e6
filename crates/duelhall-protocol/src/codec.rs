//! Codec trait and the JSON implementation.
//!
//! The server never calls `serde_json` directly; it goes through a
//! [`Codec`] so the wire format can change without touching the
//! connection handler.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes outbound messages and decodes inbound frames.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a frame.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if the value can't be
    /// represented in this format.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes a frame into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] for malformed or mismatched input.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`.
///
/// Browser front-ends speak JSON natively, so this is the only codec the
/// server ships with. Text and binary WebSocket frames are both accepted.
///
/// ```rust
/// use duelhall_protocol::{ClientMessage, Codec, JsonCodec};
///
/// let codec = JsonCodec;
/// let msg: ClientMessage<u8> = ClientMessage::Heartbeat { client_time: 7 };
/// let bytes = codec.encode(&msg).unwrap();
/// let back: ClientMessage<u8> = codec.decode(&bytes).unwrap();
/// assert_eq!(msg, back);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
