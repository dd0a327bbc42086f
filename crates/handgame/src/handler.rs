//! Per-connection handler: join, request routing and disconnect.
//!
//! Each accepted peer gets its own Tokio task running this handler.
//! The flow is:
//!   0. Finish the WebSocket handshake
//!   1. Read `affiliation`/`name` from the connect query string
//!   2. Join through the coordinator → participant is seated and bound
//!   3. Loop: decode inbound requests, write queued outbound frames
//!   4. On exit, the binding guard unbinds the connection
//!
//! The task is the only writer to its socket. Everything addressed to this
//! participant (replies, broadcasts, a close) arrives through one channel,
//! so frames reach the client in the order they were queued.

use std::sync::Arc;

use handgame_protocol::{ClientRequest, Codec, ConnectParams, RequestKind};
use handgame_room::{LifecycleStore, Seat};
use handgame_session::{Outbound, PlayerSender};
use handgame_transport::{
    Connection, ConnectionId, Incoming, PendingUpgrade, WebSocketConnection,
};
use tokio::sync::mpsc;

use crate::HandgameError;
use crate::server::ServerState;

/// Drop guard that unbinds the connection when the handler exits.
///
/// Runs even if the handler panics. Since `Drop` is synchronous, the
/// async unbind is spawned as a fire-and-forget task.
struct BindingGuard<S: LifecycleStore> {
    connection: ConnectionId,
    state: Arc<ServerState<S>>,
}

impl<S: LifecycleStore> Drop for BindingGuard<S> {
    fn drop(&mut self) {
        let connection = self.connection;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.coordinator.disconnect(connection).await;
        });
    }
}

/// Handles a single peer from accept to close.
pub(crate) async fn handle_connection<S: LifecycleStore>(
    incoming: PendingUpgrade,
    state: Arc<ServerState<S>>,
) -> Result<(), HandgameError> {
    let conn = incoming.upgrade().await?;
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = ?conn.peer_addr(), "handling new connection");

    let (tx, mut rx) = mpsc::unbounded_channel();

    // --- Step 1: Join ---
    let seat = match ConnectParams::from_query(conn.query()) {
        Ok(params) => state.coordinator.join(conn_id, &params, tx.clone()).await.ok(),
        Err(e) => {
            tracing::info!(%conn_id, error = %e, "rejecting connection");
            state.coordinator.refuse(&tx, &e.to_string());
            None
        }
    };

    let Some(seat) = seat else {
        // The refusal and a close are already queued.
        drop(tx);
        let result = flush(&conn, &mut rx).await;
        let _ = conn.close().await;
        return result;
    };

    let _guard = BindingGuard {
        connection: conn_id,
        state: Arc::clone(&state),
    };

    // --- Step 2: Message loop ---
    let result = session_loop(&conn, &state, &seat, &tx, &mut rx).await;
    let _ = conn.close().await;

    // _guard drops here → connection is unbound.
    result
}

async fn session_loop<S: LifecycleStore>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<S>>,
    seat: &Seat,
    tx: &PlayerSender,
    rx: &mut mpsc::UnboundedReceiver<Outbound>,
) -> Result<(), HandgameError> {
    let participant_id = seat.participant.id;

    loop {
        tokio::select! {
            inbound = conn.recv() => match inbound {
                Ok(Some(data)) => dispatch(state, seat, tx, &data).await,
                Ok(None) => {
                    tracing::info!(%participant_id, "connection closed cleanly");
                    return Ok(());
                }
                Err(e) => {
                    tracing::debug!(%participant_id, error = %e, "recv error");
                    return Ok(());
                }
            },
            outbound = rx.recv() => match outbound {
                Some(Outbound::Frame(frame)) => conn.send(&frame).await?,
                Some(Outbound::Close) | None => {
                    tracing::debug!(%participant_id, "close requested");
                    return Ok(());
                }
            },
        }
    }
}

/// Decodes one inbound frame and runs it. Failures are answered on this
/// connection only.
async fn dispatch<S: LifecycleStore>(
    state: &Arc<ServerState<S>>,
    seat: &Seat,
    tx: &PlayerSender,
    data: &[u8],
) {
    let participant_id = seat.participant.id;

    let request: ClientRequest = match state.codec.decode(data) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!(%participant_id, error = %e, "failed to decode request");
            reply_error(state, tx, RequestKind::Unknown, &e.to_string());
            return;
        }
    };

    let kind = request.kind();
    tracing::debug!(%participant_id, ?kind, "request");
    if let Err(e) = state.coordinator.handle(seat, request).await {
        tracing::debug!(%participant_id, ?kind, error = %e, "request failed");
        reply_error(state, tx, kind, &e.to_string());
    }
}

fn reply_error<S: LifecycleStore>(
    state: &ServerState<S>,
    tx: &PlayerSender,
    kind: RequestKind,
    message: &str,
) {
    if let Some(frame) = state.coordinator.error_frame(kind, message) {
        let _ = tx.send(Outbound::Frame(frame));
    }
}

/// Writes queued frames until a close is requested or the channel drains.
async fn flush(
    conn: &WebSocketConnection,
    rx: &mut mpsc::UnboundedReceiver<Outbound>,
) -> Result<(), HandgameError> {
    while let Some(outbound) = rx.recv().await {
        match outbound {
            Outbound::Frame(frame) => conn.send(&frame).await?,
            Outbound::Close => break,
        }
    }
    Ok(())
}
