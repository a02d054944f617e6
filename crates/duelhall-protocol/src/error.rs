//! Error types for the protocol layer.

/// Errors raised while turning messages into bytes and back.
///
/// A `ProtocolError` always means the bytes or their shape were wrong,
/// never that the transport or the lobby misbehaved.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, a missing field, or an
    /// unknown message `type`.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message decoded fine but breaks a protocol rule, e.g. a join
    /// announcing the wrong protocol version.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
