//! WebSocket progress stream (spec §4.10 "stream(task_id)"). Grounded on
//! `vclip-api/src/ws.rs`'s subscribe/select-loop shape, trimmed of the
//! JWT handshake, job enqueueing, heartbeat-ping, and mpsc backpressure
//! channel — none of which apply without per-user accounts or a durable
//! job queue.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use tokio::sync::broadcast;
use tracing::warn;

use narrata_models::{ProgressRecord, TaskId};

use crate::state::AppState;

/// `WS /api/v1/novels/{task_id}/ws`.
pub async fn stream(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_stream(socket, state, TaskId::from(task_id)))
}

async fn handle_stream(mut socket: WebSocket, state: AppState, task_id: TaskId) {
    let (initial, mut receiver) = state.bus.subscribe(&task_id);

    if let Some(record) = &initial {
        let terminal = record.is_terminal();
        if send_record(&mut socket, record).await.is_err() {
            return;
        }
        if terminal {
            let _ = socket.close().await;
            return;
        }
    }

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    // Client-sent text/binary/ping/pong is ignored per spec.
                    _ => {}
                }
            }
            record = receiver.recv() => {
                match record {
                    Ok(record) => {
                        let terminal = record.is_terminal();
                        if send_record(&mut socket, &record).await.is_err() {
                            break;
                        }
                        if terminal {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(task_id = %task_id, skipped, "progress stream lagged, dropping oldest records");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    let _ = socket.close().await;
}

async fn send_record(socket: &mut WebSocket, record: &ProgressRecord) -> Result<(), axum::Error> {
    let json = serde_json::to_string(record).unwrap_or_default();
    socket.send(Message::Text(json)).await
}
