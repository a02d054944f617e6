//! End-to-end tests: real WebSocket clients against a server running the
//! grid game.

use std::time::Duration;

use duelhall::prelude::*;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

type Frame = Envelope<ServerMessage<GridBoard>>;

const WAIT: Duration = Duration::from_secs(3);

async fn start_with(connection: ConnectionConfig) -> (String, LobbyHandle<GridGame>) {
    let server = DuelhallServer::builder()
        .bind("127.0.0.1:0")
        .connection_config(connection)
        .build::<GridGame>(())
        .await
        .expect("server should build");
    let addr = server.local_addr().expect("local addr").to_string();
    let lobby = server.lobby();

    tokio::spawn(async move {
        let _ = server.run().await;
    });
    (addr, lobby)
}

async fn start_server() -> (String, LobbyHandle<GridGame>) {
    start_with(ConnectionConfig::default()).await
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send(ws: &mut ClientWs, value: Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .expect("send");
}

/// Next data frame from the server. Panics on close or timeout.
async fn recv(ws: &mut ClientWs) -> Frame {
    loop {
        let msg = tokio::time::timeout(WAIT, ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("websocket error");
        match msg {
            Message::Text(_) | Message::Binary(_) => {
                return serde_json::from_slice(&msg.into_data()).expect("decode frame");
            }
            Message::Close(_) => panic!("connection closed"),
            _ => continue,
        }
    }
}

/// Skips frames until one matches.
async fn recv_until(
    ws: &mut ClientWs,
    pred: impl Fn(&ServerMessage<GridBoard>) -> bool,
) -> ServerMessage<GridBoard> {
    loop {
        let frame = recv(ws).await;
        if pred(&frame.message) {
            return frame.message;
        }
    }
}

/// `true` once the server has closed the stream.
async fn closed(ws: &mut ClientWs) -> bool {
    loop {
        match tokio::time::timeout(WAIT, ws.next()).await {
            Ok(None) | Ok(Some(Err(_))) | Ok(Some(Ok(Message::Close(_)))) => return true,
            Ok(Some(Ok(_))) => continue,
            Err(_) => return false,
        }
    }
}

async fn join(ws: &mut ClientWs, name: &str) -> (ParticipantId, Option<usize>) {
    send(ws, json!({ "type": "Join", "version": PROTOCOL_VERSION, "name": name })).await;
    match recv(ws).await.message {
        ServerMessage::Welcome {
            participant_id,
            queue_position,
        } => (participant_id, queue_position),
        other => panic!("expected Welcome, got {other:?}"),
    }
}

async fn play(ws: &mut ClientWs, cell: usize) {
    send(ws, json!({ "type": "Action", "action": { "cell": cell } })).await;
}

fn is_started(msg: &ServerMessage<GridBoard>) -> bool {
    matches!(msg, ServerMessage::Event(Notification::SessionStarted(_)))
}

fn is_ended(msg: &ServerMessage<GridBoard>) -> bool {
    matches!(msg, ServerMessage::Event(Notification::SessionEnded(_)))
}

fn is_rejected(msg: &ServerMessage<GridBoard>) -> bool {
    matches!(msg, ServerMessage::Rejected { .. })
}

/// Polls the lobby until `pred` holds.
async fn wait_for_lobby(
    lobby: &LobbyHandle<GridGame>,
    pred: impl Fn(&StateSnapshot<GridBoard>) -> bool,
) {
    for _ in 0..100 {
        let snapshot = lobby.snapshot().await.expect("lobby alive");
        if pred(&snapshot) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("lobby never reached the expected state");
}

// =========================================================================
// Join
// =========================================================================

#[tokio::test]
async fn test_join_welcome_then_snapshot() {
    let (addr, _lobby) = start_server().await;
    let mut ws = connect(&addr).await;

    send(&mut ws, json!({ "type": "Join", "version": 1, "name": "Ana" })).await;

    let welcome = recv(&mut ws).await;
    assert_eq!(welcome.seq, 0);
    let participant_id = match welcome.message {
        ServerMessage::Welcome {
            participant_id,
            queue_position,
        } => {
            assert_eq!(queue_position, Some(1));
            participant_id
        }
        other => panic!("expected Welcome first, got {other:?}"),
    };

    let snapshot = recv(&mut ws).await;
    assert_eq!(snapshot.seq, 1);
    match snapshot.message {
        ServerMessage::Event(Notification::Snapshot(s)) => {
            assert_eq!(s.participants.len(), 1);
            assert_eq!(s.participants[0].id, participant_id);
            assert_eq!(s.queue[0].display_name, "Ana");
            assert!(s.session.is_none());
        }
        other => panic!("expected Snapshot, got {other:?}"),
    }
}

#[tokio::test]
async fn test_version_mismatch_rejected_and_closed() {
    let (addr, _lobby) = start_server().await;
    let mut ws = connect(&addr).await;

    send(&mut ws, json!({ "type": "Join", "version": 99, "name": "Ana" })).await;

    match recv(&mut ws).await.message {
        ServerMessage::Rejected { code, message } => {
            assert_eq!(code, 400);
            assert!(message.contains("version"));
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
    assert!(closed(&mut ws).await);
}

#[tokio::test]
async fn test_first_message_must_be_join() {
    let (addr, _lobby) = start_server().await;
    let mut ws = connect(&addr).await;

    send(&mut ws, json!({ "type": "Heartbeat", "client_time": 1 })).await;

    match recv(&mut ws).await.message {
        ServerMessage::Rejected { code, .. } => assert_eq!(code, 400),
        other => panic!("expected Rejected, got {other:?}"),
    }
    assert!(closed(&mut ws).await);
}

#[tokio::test]
async fn test_taken_name_can_retry() {
    let (addr, _lobby) = start_server().await;
    let mut first = connect(&addr).await;
    join(&mut first, "Ana").await;

    let mut second = connect(&addr).await;
    send(&mut second, json!({ "type": "Join", "version": 1, "name": " ana " })).await;
    match recv(&mut second).await.message {
        ServerMessage::Rejected { code, .. } => assert_eq!(code, 409),
        other => panic!("expected 409, got {other:?}"),
    }

    let (_, queue_position) = join(&mut second, "Bo").await;
    assert_eq!(queue_position, None);
}

#[tokio::test]
async fn test_empty_name_rejected() {
    let (addr, _lobby) = start_server().await;
    let mut ws = connect(&addr).await;

    send(&mut ws, json!({ "type": "Join", "version": 1, "name": "   " })).await;
    match recv(&mut ws).await.message {
        ServerMessage::Rejected { code, message } => {
            assert_eq!(code, 409);
            assert!(message.contains("empty"));
        }
        other => panic!("expected 409, got {other:?}"),
    }
}

#[tokio::test]
async fn test_join_timeout_closes() {
    let (addr, _lobby) = start_with(ConnectionConfig {
        join_timeout: Duration::from_millis(100),
        ..ConnectionConfig::default()
    })
    .await;
    let mut ws = connect(&addr).await;

    match recv(&mut ws).await.message {
        ServerMessage::Rejected { code, .. } => assert_eq!(code, 408),
        other => panic!("expected 408, got {other:?}"),
    }
    assert!(closed(&mut ws).await);
}

// =========================================================================
// Sessions
// =========================================================================

#[tokio::test]
async fn test_second_join_starts_session() {
    let (addr, _lobby) = start_server().await;
    let mut a = connect(&addr).await;
    let mut b = connect(&addr).await;
    let (id_a, _) = join(&mut a, "Ana").await;
    let (id_b, _) = join(&mut b, "Bo").await;

    for ws in [&mut a, &mut b] {
        match recv_until(ws, is_started).await {
            ServerMessage::Event(Notification::SessionStarted(started)) => {
                assert_eq!(started.participants[0].id, id_a);
                assert_eq!(started.participants[1].id, id_b);
                assert_eq!(started.turn_of, id_a);
                assert_eq!(started.payload.cells, [None; 9]);
            }
            other => panic!("expected SessionStarted, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_out_of_turn_rejected_only_to_caller() {
    let (addr, lobby) = start_server().await;
    let mut a = connect(&addr).await;
    let mut b = connect(&addr).await;
    join(&mut a, "Ana").await;
    join(&mut b, "Bo").await;
    recv_until(&mut b, is_started).await;

    play(&mut b, 4).await;
    match recv_until(&mut b, is_rejected).await {
        ServerMessage::Rejected { code, message } => {
            assert_eq!(code, 400);
            assert!(message.contains("turn"));
        }
        other => panic!("expected Rejected, got {other:?}"),
    }

    // Ana sees only the session start and snapshots, never Bo's rejection.
    send(&mut a, json!({ "type": "Heartbeat", "client_time": 5 })).await;
    let ack = recv_until(&mut a, |m| {
        assert!(!is_rejected(m), "rejection leaked to another participant");
        matches!(m, ServerMessage::HeartbeatAck { .. })
    })
    .await;
    assert!(matches!(ack, ServerMessage::HeartbeatAck { client_time: 5, .. }));

    let snapshot = lobby.snapshot().await.unwrap();
    let session = snapshot.session.as_ref().expect("session live");
    assert_eq!(session.payload.cells, [None; 9]);
}

#[tokio::test]
async fn test_full_match_reports_winner() {
    let (addr, lobby) = start_server().await;
    let mut a = connect(&addr).await;
    let mut b = connect(&addr).await;
    let (id_a, _) = join(&mut a, "Ana").await;
    let (id_b, _) = join(&mut b, "Bo").await;
    recv_until(&mut a, is_started).await;

    // Ana takes the top row.
    for (seat, cell) in [(0, 0), (1, 3), (0, 1), (1, 4), (0, 2)] {
        let ws = if seat == 0 { &mut a } else { &mut b };
        play(ws, cell).await;
        wait_for_lobby(&lobby, |s| {
            s.session
                .as_ref()
                .is_none_or(|v| v.session_id != SessionId(1) || v.payload.cells[cell].is_some())
        })
        .await;
    }

    match recv_until(&mut b, is_ended).await {
        ServerMessage::Event(Notification::SessionEnded(ended)) => {
            assert_eq!(
                ended.result,
                TerminalResult::Win {
                    winner: id_a,
                    loser: id_b
                }
            );
            assert_eq!(ended.winner_name.as_deref(), Some("Ana"));
            assert_eq!(ended.winner_identity.as_deref(), Some("ana"));
        }
        other => panic!("expected SessionEnded, got {other:?}"),
    }

    // The pair is reseated straight away, winner first.
    wait_for_lobby(&lobby, |s| {
        s.session
            .as_ref()
            .is_some_and(|v| v.session_id == SessionId(2))
    })
    .await;
    let snapshot = lobby.snapshot().await.unwrap();
    let session = snapshot.session.as_ref().unwrap();
    assert_eq!(session.participants[0].id, id_a);
    assert_eq!(snapshot.rankings[0].display_name, "Ana");
    assert_eq!(snapshot.rankings[0].wins, 1);
}

#[tokio::test]
async fn test_illegal_move_rejected() {
    let (addr, _lobby) = start_server().await;
    let mut a = connect(&addr).await;
    let mut b = connect(&addr).await;
    join(&mut a, "Ana").await;
    join(&mut b, "Bo").await;
    recv_until(&mut a, is_started).await;

    play(&mut a, 9).await;
    match recv_until(&mut a, is_rejected).await {
        ServerMessage::Rejected { code, message } => {
            assert_eq!(code, 400);
            assert!(message.contains("off the board"));
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn test_disconnect_mid_session_abandons() {
    let (addr, _lobby) = start_server().await;
    let mut a = connect(&addr).await;
    let mut b = connect(&addr).await;
    let (id_a, _) = join(&mut a, "Ana").await;
    let (id_b, _) = join(&mut b, "Bo").await;
    recv_until(&mut a, is_started).await;

    b.close(None).await.expect("close");

    match recv_until(&mut a, is_ended).await {
        ServerMessage::Event(Notification::SessionEnded(ended)) => {
            assert_eq!(
                ended.result,
                TerminalResult::Abandoned {
                    remaining: id_a,
                    departed: id_b
                }
            );
        }
        other => panic!("expected SessionEnded, got {other:?}"),
    }
}

#[tokio::test]
async fn test_turn_timeout_forfeits() {
    let (addr, _lobby) = {
        let server = DuelhallServer::builder()
            .bind("127.0.0.1:0")
            .lobby_config(LobbyConfig::with_turn_timeout(Duration::from_millis(200)))
            .build::<GridGame>(())
            .await
            .expect("server should build");
        let addr = server.local_addr().unwrap().to_string();
        let lobby = server.lobby();
        tokio::spawn(server.run());
        (addr, lobby)
    };
    let mut a = connect(&addr).await;
    let mut b = connect(&addr).await;
    let (id_a, _) = join(&mut a, "Ana").await;
    let (id_b, _) = join(&mut b, "Bo").await;

    match recv_until(&mut b, is_ended).await {
        ServerMessage::Event(Notification::SessionEnded(ended)) => {
            assert_eq!(
                ended.result,
                TerminalResult::TimedOut {
                    timed_out: id_a,
                    winner: id_b
                }
            );
        }
        other => panic!("expected SessionEnded, got {other:?}"),
    }
}

// =========================================================================
// Connection housekeeping
// =========================================================================

#[tokio::test]
async fn test_heartbeat_ack_echoes_client_time() {
    let (addr, _lobby) = start_server().await;
    let mut ws = connect(&addr).await;
    join(&mut ws, "Ana").await;

    send(&mut ws, json!({ "type": "Heartbeat", "client_time": 12345 })).await;
    match recv_until(&mut ws, |m| matches!(m, ServerMessage::HeartbeatAck { .. })).await {
        ServerMessage::HeartbeatAck { client_time, .. } => assert_eq!(client_time, 12345),
        other => panic!("expected HeartbeatAck, got {other:?}"),
    }
}

#[tokio::test]
async fn test_sequence_numbers_increase() {
    let (addr, _lobby) = start_server().await;
    let mut ws = connect(&addr).await;
    join(&mut ws, "Ana").await;

    send(&mut ws, json!({ "type": "Heartbeat", "client_time": 1 })).await;
    send(&mut ws, json!({ "type": "Heartbeat", "client_time": 2 })).await;

    let mut last = 0;
    for _ in 0..3 {
        let frame = recv(&mut ws).await;
        assert!(frame.seq > last);
        last = frame.seq;
    }
}

#[tokio::test]
async fn test_malformed_message_rejected_connection_survives() {
    let (addr, _lobby) = start_server().await;
    let mut ws = connect(&addr).await;
    join(&mut ws, "Ana").await;

    ws.send(Message::Text("not json".into())).await.expect("send");
    recv_until(&mut ws, is_rejected).await;

    send(&mut ws, json!({ "type": "Heartbeat", "client_time": 9 })).await;
    recv_until(&mut ws, |m| matches!(m, ServerMessage::HeartbeatAck { .. })).await;
}

#[tokio::test]
async fn test_leave_closes_and_deregisters() {
    let (addr, lobby) = start_server().await;
    let mut ws = connect(&addr).await;
    join(&mut ws, "Ana").await;
    wait_for_lobby(&lobby, |s| s.participants.len() == 1).await;

    send(&mut ws, json!({ "type": "Leave" })).await;

    assert!(closed(&mut ws).await);
    wait_for_lobby(&lobby, |s| s.participants.is_empty() && s.queue.is_empty()).await;
}

#[tokio::test]
async fn test_idle_connection_closed() {
    let (addr, lobby) = start_with(ConnectionConfig {
        idle_timeout: Duration::from_millis(150),
        ..ConnectionConfig::default()
    })
    .await;
    let mut ws = connect(&addr).await;
    join(&mut ws, "Ana").await;

    assert!(closed(&mut ws).await);
    wait_for_lobby(&lobby, |s| s.participants.is_empty()).await;
}

#[tokio::test]
async fn test_name_free_again_after_disconnect() {
    let (addr, lobby) = start_server().await;
    let mut first = connect(&addr).await;
    join(&mut first, "Ana").await;
    first.close(None).await.expect("close");
    wait_for_lobby(&lobby, |s| s.participants.is_empty()).await;

    let mut second = connect(&addr).await;
    let (_, queue_position) = join(&mut second, "Ana").await;
    assert_eq!(queue_position, Some(1));
}
