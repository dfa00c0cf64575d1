//! Game-side listener
//!
//! Accepts raw WebSocket connections from game-server clients. Every inbound
//! data frame is relayed to the operators verbatim.

use super::{shutdown_requested, Writer};
use crate::connection::{Connection, ConnectionKind};
use crate::protocol::GamePayload;
use crate::server::GatewayState;
use futures_util::StreamExt;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

/// Pause after a failed accept (e.g. file descriptor exhaustion)
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Accept game connections until shutdown begins
pub async fn run_game_listener(listener: TcpListener, state: GatewayState) {
    let mut shutdown = state.shutdown_receiver();

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let state = state.clone();
                    tokio::spawn(async move {
                        // A peer that never sends the upgrade must not hold a task
                        match timeout(state.write_timeout(), accept_async(stream)).await {
                            Ok(Ok(socket)) => handle_game_socket(state, socket, peer).await,
                            Ok(Err(e)) => {
                                tracing::debug!(peer = %peer, error = %e, "Game handshake failed");
                            }
                            Err(_) => {
                                tracing::debug!(peer = %peer, "Game handshake timed out");
                            }
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to accept game connection");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            },
            () = shutdown_requested(&mut shutdown) => {
                tracing::info!("Game listener stopped");
                break;
            }
        }
    }
}

/// Drive one game connection from handshake to close
///
/// The session also ends when the server begins shutting down.
pub async fn handle_game_socket<S>(state: GatewayState, socket: WebSocketStream<S>, peer: SocketAddr)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(state.relay().outbound_buffer.max(1));
    let connection = Connection::game(tx);
    let connection_id = connection.id();
    let mut shutdown = state.shutdown_receiver();
    let (sink, mut stream) = socket.split();

    connection.mark_open();
    if !state.registry().register(connection.clone()) {
        return;
    }

    tracing::info!(connection_id = %connection_id, peer = %peer, "Minecraft client connected");

    let mut writer = Writer::spawn::<_, Message>(sink, rx, state.write_timeout(), connection_id);

    let reader = async {
        while let Some(msg) = stream.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    state.hub().on_game_message(&connection, GamePayload::Text(text));
                }
                Ok(Message::Binary(bytes)) => {
                    state.hub().on_game_message(&connection, GamePayload::Binary(bytes));
                }
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {
                    tracing::trace!(connection_id = %connection_id, "Control frame received");
                }
                Ok(Message::Close(_)) => {
                    tracing::debug!(connection_id = %connection_id, "Game client closed connection");
                    break;
                }
                Err(e) => {
                    tracing::warn!(connection_id = %connection_id, error = %e, "Game socket error");
                    break;
                }
            }
        }
    };

    tokio::select! {
        () = reader => {}
        () = writer.ended() => {
            tracing::debug!(connection_id = %connection_id, "Writer ended");
        }
        () = shutdown_requested(&mut shutdown) => {
            tracing::debug!(connection_id = %connection_id, "Closing game session for shutdown");
        }
    }

    connection.mark_closing();
    state.registry().unregister(ConnectionKind::Game, connection_id);
    writer.close().await;

    tracing::info!(
        connection_id = %connection_id,
        peer = %peer,
        duration_ms = connection.age().as_millis(),
        "Minecraft client disconnected"
    );
}
