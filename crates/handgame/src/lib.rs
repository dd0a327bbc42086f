//! # handgame
//!
//! Real-time rock/paper/scissors rooms over WebSocket.
//!
//! Participants connect with `?affiliation=..&name=..`, are seated in the
//! open room, and throw hands while the room is playing and its window is
//! open. Every change is broadcast to the room as JSON.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use handgame::prelude::*;
//!
//! # async fn run() -> Result<(), HandgameError> {
//! let server = HandgameServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build(MemoryStore::new())
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::HandgameError;
pub use server::{DEFAULT_BIND_ADDR, HandgameServer, HandgameServerBuilder};

/// Common imports for running a server or talking to one in tests.
pub mod prelude {
    pub use crate::{HandgameError, HandgameServer, HandgameServerBuilder};
    pub use handgame_protocol::{
        Body, ClientRequest, Hand, HandEntry, ParticipantId, RankedStanding, RequestKind,
        ResponseStatus, Room, RoomId, RoomState, ServerMessage, Standing,
    };
    pub use handgame_room::{
        Admin, AdminError, ErrorStatus, LifecycleStore, MemoryStore, RoomCoordinator,
        RoomError,
    };
}
