//! `HandgameServer` builder and server loop.
//!
//! This is the entry point for running a handgame server. It ties
//! together all the layers: transport → protocol → session → room.

use std::sync::Arc;
use std::time::Duration;

use handgame_protocol::JsonCodec;
use handgame_room::{Admin, LifecycleStore, MemoryStore, RoomCoordinator, spawn_expiry_sweep};
use handgame_transport::{Transport, WebSocketTransport};

use crate::HandgameError;
use crate::handler::handle_connection;

/// Address used when the builder is not given one.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<S: LifecycleStore> {
    pub(crate) coordinator: Arc<RoomCoordinator<S>>,
    pub(crate) codec: JsonCodec,
}

/// Builder for configuring and starting a handgame server.
///
/// # Example
///
/// ```rust,no_run
/// use handgame::prelude::*;
///
/// # async fn run() -> Result<(), HandgameError> {
/// let server = HandgameServer::builder()
///     .bind("0.0.0.0:8080")
///     .build(MemoryStore::new())
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct HandgameServerBuilder {
    bind_addr: String,
    sweep_interval: Option<Duration>,
}

impl HandgameServerBuilder {
    /// Creates a new builder with default settings: bound to
    /// [`DEFAULT_BIND_ADDR`], no expiry sweep.
    pub fn new() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            sweep_interval: None,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Enables the background sweep that ends rooms whose window has
    /// elapsed, running every `interval`.
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = Some(interval);
        self
    }

    /// Binds the listener and wires the coordinator over `store`.
    pub async fn build<S: LifecycleStore>(
        self,
        store: S,
    ) -> Result<HandgameServer<S>, HandgameError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            coordinator: Arc::new(RoomCoordinator::new(Arc::new(store))),
            codec: JsonCodec,
        });

        Ok(HandgameServer {
            transport,
            state,
            sweep_interval: self.sweep_interval,
        })
    }
}

impl Default for HandgameServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound handgame server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct HandgameServer<S: LifecycleStore> {
    transport: WebSocketTransport,
    state: Arc<ServerState<S>>,
    sweep_interval: Option<Duration>,
}

impl HandgameServer<MemoryStore> {
    /// Creates a new builder.
    ///
    /// Lives on the in-memory server so `HandgameServer::builder()` needs no
    /// type annotation; [`HandgameServerBuilder::build`] still accepts any
    /// [`LifecycleStore`].
    pub fn builder() -> HandgameServerBuilder {
        HandgameServerBuilder::new()
    }
}

impl<S: LifecycleStore> HandgameServer<S> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The coordinator shared by every connection.
    pub fn coordinator(&self) -> Arc<RoomCoordinator<S>> {
        Arc::clone(&self.state.coordinator)
    }

    /// Administrative operations over this server's rooms.
    pub fn admin(&self) -> Admin<S> {
        Admin::new(self.coordinator())
    }

    /// Runs the server accept loop.
    ///
    /// Accepts incoming connections and spawns a handler task for each.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), HandgameError> {
        tracing::info!("handgame server running");

        let _sweep = self
            .sweep_interval
            .map(|interval| spawn_expiry_sweep(self.coordinator(), interval));

        loop {
            match self.transport.accept().await {
                Ok(incoming) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(incoming, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
