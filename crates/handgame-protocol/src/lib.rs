//! Wire protocol for handgame.
//!
//! This crate defines what clients and the server say to each other:
//!
//! - **Records** ([`Room`], [`Standing`], [`MoveRecord`], ...): the
//!   entities the engine keeps and sends to clients unchanged.
//! - **Messages** ([`ClientRequest`], [`ServerMessage`]): inbound
//!   requests and outbound replies/broadcasts.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how messages become bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! The protocol layer sits between transport (raw frames) and the room
//! coordinator. It knows nothing about connections or game rules.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientRequest) → Coordinator (rooms)
//! ```

mod codec;
mod error;
mod message;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use message::{
    Body, ClientRequest, ConnectParams, RequestKind, ResponseStatus, ServerMessage,
};
pub use types::{
    Hand, HandEntry, MoveRecord, Participant, ParticipantId, RankedStanding, Room,
    RoomId, RoomState, Standing,
};
