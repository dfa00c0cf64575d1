//! Test helpers for integration tests
//!
//! Spawns a relay on loopback, connects game and operator clients, and waits
//! on the registry instead of sleeping.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use bridge_common::OperatorPrincipal;
use bridge_gateway::{ConnectionKind, GatewayState, RelayServer, SESSION_COOKIE};
use futures_util::StreamExt;
use reqwest::{redirect::Policy, Client, Response};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{self, header::COOKIE, HeaderValue};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::fixtures::{test_config, FakeIdentity};

/// WebSocket client connection
pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long to wait for something that should happen
pub const WAIT: Duration = Duration::from_secs(5);

/// How long to watch for something that should not happen
pub const QUIET: Duration = Duration::from_millis(200);

/// Running relay instance that manages lifecycle
pub struct TestServer {
    pub web_addr: SocketAddr,
    pub game_addr: SocketAddr,
    pub state: GatewayState,
    pub client: Client,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    /// Start a relay on ephemeral ports
    pub async fn start() -> Result<Self> {
        let config = test_config()?;
        let state = GatewayState::new(config, Arc::new(FakeIdentity));

        let server = RelayServer::bind(state.clone()).await?;
        let web_addr = server.web_addr()?;
        let game_addr = server.game_addr()?;

        let (shutdown, signal) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let _ = server
                .serve_with_shutdown(async {
                    let _ = signal.await;
                })
                .await;
        });

        // Redirects are asserted on, not followed
        let client = Client::builder()
            .redirect(Policy::none())
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            web_addr,
            game_addr,
            state,
            client,
            shutdown: Some(shutdown),
            handle: Some(handle),
        })
    }

    /// Base URL of the operator surface
    pub fn base_url(&self) -> String {
        format!("http://{}", self.web_addr)
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<Response> {
        Ok(self.client.get(format!("{}{path}", self.base_url())).send().await?)
    }

    /// Make a GET request with a session token
    pub async fn get_auth(&self, path: &str, token: &str) -> Result<Response> {
        Ok(self
            .client
            .get(format!("{}{path}", self.base_url()))
            .bearer_auth(token)
            .send()
            .await?)
    }

    /// Issue a session token as if `username` had logged in
    pub fn session_token(&self, username: &str) -> Result<String> {
        let principal = OperatorPrincipal::new(format!("id-{username}"), username);
        Ok(self.state.sessions().issue(&principal)?)
    }

    /// Connect a game client and wait until it is registered
    pub async fn connect_game(&self) -> Result<WsClient> {
        let before = self.state.registry().game_count();
        let (ws, _) = connect_async(format!("ws://{}", self.game_addr)).await?;
        self.wait_for_count(ConnectionKind::Game, before + 1).await?;
        Ok(ws)
    }

    /// Connect an operator with a session cookie and wait until it is registered
    pub async fn connect_operator(&self, token: &str) -> Result<WsClient> {
        let before = self.state.registry().operator_count();
        let ws = self.try_connect_operator(Some(token)).await?;
        self.wait_for_count(ConnectionKind::Operator, before + 1).await?;
        Ok(ws)
    }

    /// Attempt the operator upgrade, with or without a session cookie
    pub async fn try_connect_operator(
        &self,
        token: Option<&str>,
    ) -> Result<WsClient, tokio_tungstenite::tungstenite::Error> {
        let mut request = format!("ws://{}/events", self.web_addr).into_client_request()?;
        if let Some(token) = token {
            let cookie = HeaderValue::from_str(&format!("{SESSION_COOKIE}={token}"))
                .map_err(http::Error::from)?;
            request.headers_mut().insert(COOKIE, cookie);
        }

        let (ws, _) = connect_async(request).await?;
        Ok(ws)
    }

    /// Poll the registry until a population reaches `expected`
    pub async fn wait_for_count(&self, kind: ConnectionKind, expected: usize) -> Result<()> {
        let registry = self.state.registry();
        eventually(move || async move { registry.count(kind) == expected })
            .await
            .with_context(|| {
                format!(
                    "expected {expected} {kind} connections, have {}",
                    registry.count(kind)
                )
            })
    }

    /// Stop both listeners and wait for the server task
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            tokio::time::timeout(WAIT, handle).await??;
        }
        Ok(())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Poll `check` until it holds or [`WAIT`] elapses
pub async fn eventually<F, Fut>(check: F) -> Result<()>
where
    F: Fn() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    bail!("condition not met within {WAIT:?}")
}

/// Next data message, skipping control frames
pub async fn recv_message(ws: &mut WsClient) -> Result<Message> {
    loop {
        let msg = tokio::time::timeout(WAIT, ws.next())
            .await
            .context("timed out waiting for a message")?
            .context("connection closed")??;

        match msg {
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            other => return Ok(other),
        }
    }
}

/// Next text message, parsed as JSON
pub async fn recv_json(ws: &mut WsClient) -> Result<serde_json::Value> {
    match recv_message(ws).await? {
        Message::Text(text) => Ok(serde_json::from_str(&text)?),
        other => bail!("expected a text message, got {other:?}"),
    }
}

/// Assert nothing arrives for [`QUIET`]
pub async fn assert_silent(ws: &mut WsClient) -> Result<()> {
    match tokio::time::timeout(QUIET, ws.next()).await {
        Err(_) => Ok(()),
        Ok(msg) => bail!("expected silence, got {msg:?}"),
    }
}
