//! Per-connection handler: join, then route messages to the lobby.
//!
//! Each accepted connection gets its own task. The flow is:
//!   1. Receive `Join`, check the version, register with the lobby. A
//!      rejected name may be retried until the join deadline.
//!   2. Send `Welcome`, then hand the sink to a writer task that drains
//!      lobby notifications and this connection's direct replies.
//!   3. Loop: receive actions, heartbeats and `Leave` until the peer goes
//!      away or stays silent past the idle timeout.
//!
//! Leaving step 3 for any reason disconnects the participant exactly once.

use std::sync::Arc;

use duelhall_lobby::{JoinReceipt, LobbyError, LobbyHandle, Outbox, RuleEngine};
use duelhall_protocol::{
    ClientMessage, Codec, Envelope, Notification, ParticipantId, ProtocolError, ServerMessage,
    PROTOCOL_VERSION,
};
use duelhall_registry::JoinRequest;
use duelhall_transport::{Connection, FrameSink, FrameSource, WebSocketSink, WebSocketSource};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::server::ServerState;
use crate::DuelhallError;

/// Drop guard that disconnects a participant when the handler exits.
///
/// `Drop` is synchronous, so the lobby call runs in a spawned task.
struct DisconnectGuard<R: RuleEngine> {
    participant_id: ParticipantId,
    lobby: LobbyHandle<R>,
}

impl<R: RuleEngine> Drop for DisconnectGuard<R> {
    fn drop(&mut self) {
        let participant_id = self.participant_id;
        let lobby = self.lobby.clone();
        tokio::spawn(async move {
            if let Err(e) = lobby.disconnect(participant_id).await {
                tracing::debug!(%participant_id, error = %e, "disconnect not delivered");
            }
        });
    }
}

/// Owns the outbound half and stamps every frame with `seq` and
/// `server_time`.
struct FrameWriter<C> {
    sink: WebSocketSink,
    codec: C,
    seq: u64,
    opened: Instant,
}

impl<C: Codec> FrameWriter<C> {
    async fn send<P: Serialize>(&mut self, message: &ServerMessage<P>) -> Result<(), DuelhallError> {
        let bytes = {
            let envelope = Envelope {
                seq: self.seq,
                server_time: millis_since(self.opened),
                message,
            };
            self.codec.encode(&envelope)?
        };
        self.sink.send(bytes).await?;
        self.seq += 1;
        Ok(())
    }

    async fn reject(&mut self, code: u16, message: &str) -> Result<(), DuelhallError> {
        self.send::<()>(&ServerMessage::Rejected {
            code,
            message: message.to_string(),
        })
        .await
    }

    async fn close(&mut self) {
        if let Err(e) = self.sink.close().await {
            tracing::debug!(error = %e, "close failed");
        }
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<R, C>(
    conn: Connection<WebSocketSink, WebSocketSource>,
    state: Arc<ServerState<R, C>>,
) -> Result<(), DuelhallError>
where
    R: RuleEngine,
    C: Codec + Clone,
{
    let Connection {
        id: conn_id,
        peer,
        sink,
        mut source,
    } = conn;
    let participant_id = ParticipantId(conn_id.into_inner());
    tracing::debug!(%conn_id, %peer, "handling new connection");

    let mut writer = FrameWriter {
        sink,
        codec: state.codec.clone(),
        seq: 0,
        opened: Instant::now(),
    };
    let (outbox, notifications) = mpsc::unbounded_channel();

    // --- Join ---
    let receipt = match join_phase(&mut source, &mut writer, &state, participant_id, outbox).await {
        Ok(Some(receipt)) => receipt,
        Ok(None) => {
            tracing::debug!(%conn_id, "left before joining");
            writer.close().await;
            return Ok(());
        }
        Err(e) => {
            writer.close().await;
            return Err(e);
        }
    };
    let guard = DisconnectGuard {
        participant_id,
        lobby: state.lobby.clone(),
    };
    tracing::info!(
        %conn_id,
        %participant_id,
        name = %receipt.participant.display_name,
        queue_position = ?receipt.queue_position,
        "participant connected"
    );

    // Notifications queued while joining wait in the outbox until the
    // writer starts, so Welcome is always seq 0.
    writer
        .send(&ServerMessage::<R::Payload>::Welcome {
            participant_id,
            queue_position: receipt.queue_position,
        })
        .await?;

    let opened = writer.opened;
    let (replies, reply_rx) = mpsc::unbounded_channel();
    let writer_task = tokio::spawn(run_writer(writer, notifications, reply_rx, participant_id));

    // --- Message loop ---
    let result = read_loop(&mut source, &state, participant_id, opened, &replies).await;

    drop(replies);
    drop(guard);
    // Ends once the lobby has detached the outbox.
    if let Err(e) = writer_task.await {
        tracing::warn!(%participant_id, error = %e, "writer task failed");
    }
    result
}

/// Waits for an accepted `Join`. `Ok(None)` means the peer left first.
async fn join_phase<R, C>(
    source: &mut WebSocketSource,
    writer: &mut FrameWriter<C>,
    state: &ServerState<R, C>,
    participant_id: ParticipantId,
    outbox: Outbox<R::Payload>,
) -> Result<Option<JoinReceipt>, DuelhallError>
where
    R: RuleEngine,
    C: Codec,
{
    let deadline = Instant::now() + state.connection.join_timeout;

    loop {
        let data = match tokio::time::timeout_at(deadline, source.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => return Ok(None),
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                writer.reject(408, "join timed out").await?;
                return Err(ProtocolError::InvalidMessage("join timed out".into()).into());
            }
        };

        let (version, name, attributes) =
            match state.codec.decode::<ClientMessage<R::Action>>(&data) {
                Ok(ClientMessage::Join {
                    version,
                    name,
                    attributes,
                }) => (version, name, attributes),
                Ok(ClientMessage::Leave) => return Ok(None),
                Ok(_) | Err(_) => {
                    writer.reject(400, "expected Join").await?;
                    return Err(
                        ProtocolError::InvalidMessage("first message must be Join".into()).into(),
                    );
                }
            };

        if version != PROTOCOL_VERSION {
            let message = format!("version mismatch: expected {PROTOCOL_VERSION}, got {version}");
            writer.reject(400, &message).await?;
            return Err(ProtocolError::InvalidMessage(message).into());
        }

        let request = JoinRequest::named(name).with_attributes(attributes);
        match state.lobby.join(participant_id, request, outbox.clone()).await {
            Ok(receipt) => return Ok(Some(receipt)),
            Err(LobbyError::Registry(e)) => {
                tracing::debug!(%participant_id, error = %e, "join refused");
                writer.reject(409, &e.to_string()).await?;
            }
            Err(e) => {
                writer.reject(rejection_code(&e), &e.to_string()).await?;
                return Err(e.into());
            }
        }
    }
}

/// Reads client frames until the connection should end.
async fn read_loop<R, C>(
    source: &mut WebSocketSource,
    state: &ServerState<R, C>,
    participant_id: ParticipantId,
    opened: Instant,
    replies: &mpsc::UnboundedSender<ServerMessage<R::Payload>>,
) -> Result<(), DuelhallError>
where
    R: RuleEngine,
    C: Codec,
{
    let reply = |message| {
        // The writer only goes away together with the peer.
        let _ = replies.send(message);
    };

    loop {
        let data = match tokio::time::timeout(state.connection.idle_timeout, source.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::info!(%participant_id, "connection closed cleanly");
                return Ok(());
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                tracing::info!(%participant_id, "connection idle, closing");
                return Ok(());
            }
        };

        let message: ClientMessage<R::Action> = match state.codec.decode(&data) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(%participant_id, error = %e, "failed to decode message");
                reply(ServerMessage::Rejected {
                    code: 400,
                    message: e.to_string(),
                });
                continue;
            }
        };

        match message {
            ClientMessage::Join { .. } => reply(ServerMessage::Rejected {
                code: 400,
                message: "already joined".into(),
            }),
            ClientMessage::Action { action } => {
                match state.lobby.submit_action(participant_id, action).await {
                    Ok(()) => {}
                    Err(LobbyError::Unavailable) => {
                        reply(ServerMessage::Rejected {
                            code: 503,
                            message: LobbyError::Unavailable.to_string(),
                        });
                        return Err(LobbyError::Unavailable.into());
                    }
                    Err(e) => {
                        tracing::debug!(%participant_id, error = %e, "action refused");
                        reply(ServerMessage::Rejected {
                            code: rejection_code(&e),
                            message: e.to_string(),
                        });
                    }
                }
            }
            ClientMessage::Heartbeat { client_time } => reply(ServerMessage::HeartbeatAck {
                client_time,
                server_time: millis_since(opened),
            }),
            ClientMessage::Leave => {
                tracing::info!(%participant_id, "participant left");
                return Ok(());
            }
        }
    }
}

/// Owns the sink after the join. Stops when both inputs are closed or
/// the peer stops accepting frames.
async fn run_writer<P, C>(
    mut writer: FrameWriter<C>,
    mut notifications: mpsc::UnboundedReceiver<Notification<P>>,
    mut replies: mpsc::UnboundedReceiver<ServerMessage<P>>,
    participant_id: ParticipantId,
) where
    P: Serialize + Send + Sync + 'static,
    C: Codec,
{
    loop {
        let message = tokio::select! {
            Some(notification) = notifications.recv() => ServerMessage::Event(notification),
            Some(reply) = replies.recv() => reply,
            else => break,
        };
        if let Err(e) = writer.send(&message).await {
            tracing::debug!(%participant_id, error = %e, "send failed, writer stopping");
            break;
        }
    }
    writer.close().await;
}

fn rejection_code(err: &LobbyError) -> u16 {
    match err {
        LobbyError::Registry(_) => 409,
        LobbyError::Unavailable => 503,
        e if e.is_user_error() => 400,
        _ => 500,
    }
}

fn millis_since(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
