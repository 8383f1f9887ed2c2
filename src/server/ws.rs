use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::config::{MAX_FRAME_BYTES, MAX_NAME_CHARS, OUTBOUND_QUEUE};
use crate::game::engine::{GameHandle, InputMsg, JoinRequest};
use crate::protocol::codec;
use crate::protocol::messages::{ClientMessage, ServerMessage};
use crate::server::AppState;

const READ_DEADLINE: Duration = Duration::from_secs(60);
const WRITE_DEADLINE: Duration = Duration::from_secs(5);
const PING_INTERVAL: Duration = Duration::from_secs(30);

const VERSION: &str = env!("CARGO_PKG_VERSION");

static PLAYER_ID_COUNTER: AtomicI32 = AtomicI32::new(0);

fn next_player_id() -> i32 {
    PLAYER_ID_COUNTER.fetch_add(1, Ordering::Relaxed) + 1
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.max_message_size(MAX_FRAME_BYTES)
        .on_upgrade(move |socket| handle_socket(socket, state.game))
}

async fn handle_socket(mut socket: WebSocket, game: GameHandle) {
    let id = next_player_id();

    let welcome = ServerMessage::Welcome {
        pid: id,
        ws: game.world_size,
        v: VERSION.to_string(),
    };
    let Ok(welcome) = serde_json::to_string(&welcome) else {
        return;
    };
    if socket.send(Message::Text(welcome.into())).await.is_err() {
        return;
    }
    debug!(player = id, "welcome sent");

    let (sender, receiver) = socket.split();
    let (tx, rx) = mpsc::channel::<Vec<u8>>(OUTBOUND_QUEUE);
    let writer = tokio::spawn(write_pump(sender, rx));

    // The reader runs on this task until the peer goes away.
    read_pump(receiver, id, &game, tx).await;

    // The tick loop processes the leave on its next drain.
    let _ = game.leave_tx.send(id).await;
    writer.abort();
    info!(player = id, "disconnected");
}

/// Read until error, close, or 60s of silence. Malformed frames are
/// dropped, never fatal; every received frame refreshes the deadline
/// (pongs included).
async fn read_pump(
    mut receiver: SplitStream<WebSocket>,
    id: i32,
    game: &GameHandle,
    tx: mpsc::Sender<Vec<u8>>,
) {
    let mut joined = false;
    loop {
        let msg = match timeout(READ_DEADLINE, receiver.next()).await {
            Err(_) => return, // deadline expired
            Ok(None) => return,
            Ok(Some(Err(_))) => return,
            Ok(Some(Ok(msg))) => msg,
        };

        match msg {
            Message::Text(text) => {
                game.bytes_recv
                    .fetch_add(text.len() as i64, Ordering::Relaxed);
                let Ok(parsed) = serde_json::from_str::<ClientMessage>(&text) else {
                    continue;
                };
                match parsed {
                    ClientMessage::Join { name } if !joined => {
                        joined = true;
                        let name = sanitize_name(&name);
                        info!(player = id, name = %name, "join");
                        let req = JoinRequest {
                            id,
                            name,
                            tx: tx.clone(),
                        };
                        if game.join_tx.send(req).await.is_err() {
                            return;
                        }
                    }
                    ClientMessage::Join { .. } => {} // duplicate join, ignore
                    ClientMessage::Respawn => {
                        if game.respawn_tx.send(id).await.is_err() {
                            return;
                        }
                    }
                }
            }
            Message::Binary(data) => {
                game.bytes_recv
                    .fetch_add(data.len() as i64, Ordering::Relaxed);
                if let Some(input) = codec::decode_input(&data) {
                    let msg = InputMsg {
                        player_id: id,
                        angle: input.angle,
                        boost: input.boost,
                    };
                    if game.input_tx.send(msg).await.is_err() {
                        return;
                    }
                }
            }
            Message::Close(_) => return,
            // Keepalive traffic; reaching here already reset the deadline.
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }
}

/// Own the write half: drain the frame queue, ping every 30s, give up
/// on any write error or a closed queue.
async fn write_pump(mut sender: SplitSink<WebSocket, Message>, mut rx: mpsc::Receiver<Vec<u8>>) {
    let start = tokio::time::Instant::now() + PING_INTERVAL;
    let mut ping = tokio::time::interval_at(start, PING_INTERVAL);
    loop {
        tokio::select! {
            frame = rx.recv() => {
                let Some(frame) = frame else { return };
                let write = timeout(WRITE_DEADLINE, sender.send(Message::Binary(frame.into())));
                if !matches!(write.await, Ok(Ok(()))) {
                    return;
                }
            }
            _ = ping.tick() => {
                let write = timeout(WRITE_DEADLINE, sender.send(Message::Ping(Vec::new().into())));
                if !matches!(write.await, Ok(Ok(()))) {
                    return;
                }
            }
        }
    }
}

fn sanitize_name(raw: &str) -> String {
    if raw.is_empty() {
        return "Player".to_string();
    }
    raw.chars().take(MAX_NAME_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_becomes_player() {
        assert_eq!(sanitize_name(""), "Player");
    }

    #[test]
    fn long_names_truncate_to_fifteen_chars() {
        assert_eq!(sanitize_name("abcdefghijklmnopqrstu"), "abcdefghijklmno");
        assert_eq!(sanitize_name("short"), "short");
        // Truncation counts characters, not bytes.
        assert_eq!(sanitize_name("ääääääääääääääääää").chars().count(), 15);
    }

    #[test]
    fn ids_are_positive_and_increasing() {
        let a = next_player_id();
        let b = next_player_id();
        assert!(a > 0);
        assert!(b > a);
    }
}
