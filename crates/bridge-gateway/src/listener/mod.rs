//! Transport listeners
//!
//! Translate transport events into registry and hub calls. Each accepted
//! connection gets one reader loop (inbound messages, in order) and one writer
//! task draining its outbound queue.

mod game;
mod operator;

pub use game::{handle_game_socket, run_game_listener};
pub use operator::{handle_operator_socket, operator_handler};

use crate::connection::ConnectionId;
use crate::protocol::Frame;
use futures_util::{Sink, SinkExt};
use std::fmt::Display;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// Drain a connection's outbound queue into its transport sink
///
/// Returns when the queue closes, `stop` fires, a write fails, or a write
/// exceeds `write_timeout`. The sink is always closed on the way out, which
/// also flushes the reply to a close started by the peer.
pub(crate) async fn write_frames<S, M>(
    mut sink: S,
    mut rx: mpsc::Receiver<Frame>,
    mut stop: oneshot::Receiver<()>,
    write_timeout: Duration,
    connection_id: ConnectionId,
) where
    S: Sink<M> + Unpin,
    S::Error: Display,
    M: From<Frame>,
{
    loop {
        let frame = tokio::select! {
            frame = rx.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
            _ = &mut stop => break,
        };

        match timeout(write_timeout, sink.send(M::from(frame))).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(connection_id = %connection_id, error = %e, "Failed to write frame");
                break;
            }
            Err(_) => {
                tracing::warn!(
                    connection_id = %connection_id,
                    timeout_ms = write_timeout.as_millis(),
                    "Write timed out"
                );
                break;
            }
        }
    }

    if timeout(write_timeout, sink.close()).await.is_err() {
        tracing::debug!(connection_id = %connection_id, "Timed out closing transport");
    }
}

/// A connection's writer task
pub(crate) struct Writer {
    handle: JoinHandle<()>,
    stop: Option<oneshot::Sender<()>>,
    finished: bool,
    write_timeout: Duration,
    connection_id: ConnectionId,
}

impl Writer {
    /// Spawn a writer draining `rx` into `sink`
    pub(crate) fn spawn<S, M>(
        sink: S,
        rx: mpsc::Receiver<Frame>,
        write_timeout: Duration,
        connection_id: ConnectionId,
    ) -> Self
    where
        S: Sink<M> + Unpin + Send + 'static,
        S::Error: Display,
        M: From<Frame> + Send + 'static,
    {
        let (stop, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(write_frames::<S, M>(
            sink,
            rx,
            stop_rx,
            write_timeout,
            connection_id,
        ));

        Self {
            handle,
            stop: Some(stop),
            finished: false,
            write_timeout,
            connection_id,
        }
    }

    /// Resolves when the writer ends on its own
    pub(crate) async fn ended(&mut self) {
        if self.finished {
            std::future::pending::<()>().await;
        }
        let _ = (&mut self.handle).await;
        self.finished = true;
    }

    /// Stop the writer and let it close the transport
    ///
    /// Bounded by one in-flight write plus the close itself; a writer that
    /// overruns that is aborted.
    pub(crate) async fn close(mut self) {
        if self.finished {
            return;
        }
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }

        if timeout(self.write_timeout * 2, &mut self.handle).await.is_err() {
            tracing::warn!(connection_id = %self.connection_id, "Writer did not stop in time");
            self.handle.abort();
        }
    }
}

/// Resolves once shutdown has begun (or its sender is gone)
pub(crate) async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stopping| *stopping).await;
}
