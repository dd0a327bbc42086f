//! Request and response envelopes for the realtime channel.
//!
//! Inbound frames are a closed set of requests tagged by `request`:
//!
//! ```text
//! {"request":"hand","hand":"rock"}
//! {"request":"quit"}
//! {"request":"start","time_offset":5,"time_duration":60}
//! ```
//!
//! Every outbound frame echoes the request it answers, a response status,
//! and a `type` tag describing `data`:
//!
//! ```text
//! {"request":"join","response":"success","type":"game","data":{...}}
//! ```

use serde::{Deserialize, Serialize};

use crate::{HandEntry, Hand, ProtocolError, RankedStanding, Room, Standing};

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// A request a connected participant can make.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "request", rename_all = "snake_case")]
pub enum ClientRequest {
    /// Submit a hand while the room is Playing.
    Hand { hand: Hand },
    /// Leave the room while it is still Waiting.
    Quit,
    /// Move the room from Waiting to Playing.
    Start { time_offset: u32, time_duration: u32 },
}

impl ClientRequest {
    /// The kind echoed back in replies to this request.
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::Hand { .. } => RequestKind::Hand,
            Self::Quit => RequestKind::Quit,
            Self::Start { .. } => RequestKind::Start,
        }
    }
}

/// Identity parameters supplied in the connect URL's query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectParams {
    pub affiliation: String,
    pub name: String,
}

impl ConnectParams {
    /// Parses `affiliation=..&name=..` (percent-encoded, any order).
    ///
    /// # Errors
    /// Returns [`ProtocolError::MissingIdentity`] when either value is
    /// missing or blank.
    pub fn from_query(query: Option<&str>) -> Result<Self, ProtocolError> {
        let mut affiliation = None;
        let mut name = None;
        for (key, value) in url::form_urlencoded::parse(query.unwrap_or("").as_bytes()) {
            match key.as_ref() {
                "affiliation" => affiliation = Some(value.trim().to_string()),
                "name" => name = Some(value.trim().to_string()),
                _ => {}
            }
        }
        match (affiliation, name) {
            (Some(affiliation), Some(name)) if !affiliation.is_empty() && !name.is_empty() => {
                Ok(Self { affiliation, name })
            }
            _ => Err(ProtocolError::MissingIdentity),
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Which request an outbound frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Join,
    Hand,
    Quit,
    Start,
    End,
    Disconnected,
    /// The inbound frame could not be decoded.
    Unknown,
}

/// How an outbound frame relates to the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
    /// Sent to every member of the room, not only the requester.
    Broadcast,
}

/// The payload of an outbound frame, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Body {
    /// The recipient's own standing.
    Game(Standing),
    /// The room's ranked standings.
    GameList(Vec<RankedStanding>),
    /// The room's move history, newest first.
    HandList(Vec<HandEntry>),
    Room(Room),
    /// Human-readable text, used for errors and acknowledgements.
    Message { message: String },
}

/// One outbound frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerMessage {
    pub request: RequestKind,
    pub response: ResponseStatus,
    #[serde(flatten)]
    pub body: Body,
}

impl ServerMessage {
    pub fn success(request: RequestKind, body: Body) -> Self {
        Self {
            request,
            response: ResponseStatus::Success,
            body,
        }
    }

    pub fn broadcast(request: RequestKind, body: Body) -> Self {
        Self {
            request,
            response: ResponseStatus::Broadcast,
            body,
        }
    }

    /// An error reply carrying a human-readable message.
    pub fn error(request: RequestKind, message: impl Into<String>) -> Self {
        Self {
            request,
            response: ResponseStatus::Error,
            body: Body::Message {
                message: message.into(),
            },
        }
    }
}
