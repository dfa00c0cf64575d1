//! Operator-side listener
//!
//! The event channel for authenticated operators. The session capability is
//! checked before the upgrade, so unauthorized clients are refused and never
//! reach the registry.

use super::{shutdown_requested, Writer};
use crate::connection::{Connection, ConnectionKind};
use crate::protocol::OperatorEvent;
use crate::server::GatewayState;
use crate::web::ApiError;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use bridge_common::{AppError, OperatorPrincipal};
use futures_util::StreamExt;
use tokio::sync::mpsc;

/// Event channel upgrade handler
pub async fn operator_handler(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(principal) = state.authorizer().authorize(&headers) else {
        tracing::warn!("Refused operator connection without a valid session");
        return ApiError::from(AppError::MissingAuth).into_response();
    };

    ws.on_upgrade(move |socket| handle_operator_socket(state, socket, principal))
}

/// Drive one operator connection from upgrade to close
pub async fn handle_operator_socket(
    state: GatewayState,
    socket: WebSocket,
    principal: OperatorPrincipal,
) {
    let (tx, rx) = mpsc::channel(state.relay().outbound_buffer.max(1));
    let connection = Connection::operator(principal, tx);
    let connection_id = connection.id();
    let username = connection
        .operator_principal()
        .map(|p| p.username.clone())
        .unwrap_or_default();
    let mut shutdown = state.shutdown_receiver();
    let (sink, mut stream) = socket.split();

    connection.mark_open();
    if !state.registry().register(connection.clone()) {
        return;
    }

    tracing::info!(connection_id = %connection_id, operator = %username, "Web admin connected");

    let mut writer = Writer::spawn::<_, Message>(sink, rx, state.write_timeout(), connection_id);

    let reader = async {
        while let Some(msg) = stream.next().await {
            match msg {
                Ok(Message::Text(text)) => match OperatorEvent::from_json(&text) {
                    Ok(OperatorEvent::Command(command)) => {
                        tracing::debug!(connection_id = %connection_id, command = %command, "Command from web admin");
                        state.hub().on_operator_command(&connection, command);
                    }
                    Err(e) => {
                        tracing::debug!(connection_id = %connection_id, error = %e, "Ignoring unrecognized operator event");
                    }
                },
                Ok(Message::Binary(_)) => {
                    tracing::debug!(connection_id = %connection_id, "Binary operator frames not supported");
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {}
                Ok(Message::Close(_)) => break,
                Err(e) => {
                    tracing::warn!(connection_id = %connection_id, error = %e, "Operator socket error");
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
            tracing::debug!(connection_id = %connection_id, "Closing operator session for shutdown");
        }
    }

    connection.mark_closing();
    state.registry().unregister(ConnectionKind::Operator, connection_id);
    writer.close().await;

    tracing::info!(
        connection_id = %connection_id,
        operator = %username,
        duration_ms = connection.age().as_millis(),
        "Web admin disconnected"
    );
}
