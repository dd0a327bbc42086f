//! Frame encoding.
//!
//! The gateway and the coordinator never call `serde_json` directly; they go
//! through a [`Codec`]. Browser clients speak JSON, so [`JsonCodec`] is the
//! only implementation.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Turns outbound messages into frames and inbound frames into requests.
///
/// One instance is shared by every connection task.
pub trait Codec: Send + Sync + 'static {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// # Errors
    /// [`ProtocolError::Decode`] if the bytes are not a `T`.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// JSON over `serde_json`. Output is UTF-8, so it leaves as text frames.
///
/// ## Example
///
/// ```rust
/// use handgame_protocol::{ClientRequest, Codec, Hand, JsonCodec};
///
/// let codec = JsonCodec;
/// let request: ClientRequest = codec
///     .decode(br#"{"request":"hand","hand":"rock"}"#)
///     .unwrap();
/// assert_eq!(request, ClientRequest::Hand { hand: Hand::Rock });
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
