//! Protocol-layer errors: bytes that are not a request, or a request that
//! cannot be turned into bytes. Networking and game rules live elsewhere.

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// Malformed JSON, an unknown `request` tag, an unknown hand, or a
    /// missing field such as `time_offset`.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// The connect query did not name both an affiliation and a name.
    ///
    /// The text is sent to the client verbatim before the socket is closed.
    #[error("affiliation and name are required")]
    MissingIdentity,
}
