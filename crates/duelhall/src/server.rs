//! `DuelhallServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → lobby.

use std::future::Future;
use std::sync::Arc;

use duelhall_lobby::{spawn_lobby, LobbyConfig, LobbyHandle, RuleEngine};
use duelhall_protocol::{Codec, JsonCodec};
use duelhall_registry::RegistryConfig;
use duelhall_transport::{Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{ConnectionConfig, DuelhallError, ServerConfig};

/// Shared by every connection task.
pub(crate) struct ServerState<R: RuleEngine, C: Codec> {
    pub(crate) lobby: LobbyHandle<R>,
    pub(crate) codec: C,
    pub(crate) connection: ConnectionConfig,
}

/// Builder for configuring and starting a Duelhall server.
///
/// ```rust,ignore
/// use duelhall::prelude::*;
///
/// let server = DuelhallServer::builder()
///     .bind("0.0.0.0:8080")
///     .lobby_config(LobbyConfig::with_turn_timeout(Duration::from_secs(20)))
///     .build::<QuizDuel>(QuizConfig::default())
///     .await?;
/// server.run().await
/// ```
pub struct DuelhallServerBuilder {
    bind_addr: String,
    lobby: LobbyConfig,
    registry: RegistryConfig,
    connection: ConnectionConfig,
}

impl DuelhallServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            lobby: LobbyConfig::default(),
            registry: RegistryConfig::default(),
            connection: ConnectionConfig::default(),
        }
    }

    /// Takes every setting from a loaded [`ServerConfig`].
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            bind_addr: config.bind.clone(),
            lobby: config.lobby_config(),
            registry: config.registry_config(),
            connection: config.connection_config(),
        }
    }

    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    pub fn lobby_config(mut self, config: LobbyConfig) -> Self {
        self.lobby = config;
        self
    }

    pub fn registry_config(mut self, config: RegistryConfig) -> Self {
        self.registry = config;
        self
    }

    pub fn connection_config(mut self, config: ConnectionConfig) -> Self {
        self.connection = config;
        self
    }

    /// Binds the listener and starts the lobby for rule engine `R`.
    pub async fn build<R: RuleEngine>(
        self,
        rules_config: R::Config,
    ) -> Result<DuelhallServer<R, JsonCodec>, DuelhallError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let lobby = spawn_lobby::<R>(self.lobby, self.registry, rules_config);

        let state = Arc::new(ServerState {
            lobby,
            codec: JsonCodec,
            connection: self.connection,
        });

        Ok(DuelhallServer { transport, state })
    }
}

impl Default for DuelhallServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound server. Call [`run()`](Self::run) to start accepting.
pub struct DuelhallServer<R: RuleEngine, C: Codec = JsonCodec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<R, C>>,
}

// The rule engine is picked at `build`; this impl only gives the builder
// a home under the server's name.
impl DuelhallServer<duelhall_rules::GridGame> {
    pub fn builder() -> DuelhallServerBuilder {
        DuelhallServerBuilder::new()
    }
}

impl<R, C> DuelhallServer<R, C>
where
    R: RuleEngine,
    C: Codec + Clone,
{
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// A handle to the lobby behind this server.
    pub fn lobby(&self) -> LobbyHandle<R> {
        self.state.lobby.clone()
    }

    /// Accepts connections until the process ends.
    pub async fn run(self) -> Result<(), DuelhallError> {
        self.run_until(std::future::pending()).await
    }

    /// Accepts connections until `shutdown` resolves, then stops the
    /// lobby. Stopping the lobby closes every participant's stream.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), DuelhallError> {
        tracing::info!(game = R::name(), "duelhall server running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("shutdown requested");
                    break;
                }
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            let conn_id = conn.id;
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(%conn_id, error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }

        if let Err(e) = self.state.lobby.shutdown().await {
            tracing::debug!(error = %e, "lobby already stopped");
        }
        Ok(())
    }
}
