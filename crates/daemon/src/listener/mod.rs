// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for handling socket I/O.
//!
//! One listener per daemon instance accepts TCP clients and serves each on
//! its own task. Requests on a connection are handled strictly in arrival
//! order.

mod dispatch;

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use yaqd_wire::{encode, CodecError, Response, RpcError, StreamDecoder, Value};

use crate::{Context, Daemon};

const READ_CHUNK: usize = 4096;

/// Pause after a failed accept, e.g. when out of file descriptors.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Listener task for accepting client connections.
pub(crate) struct Listener<D: Daemon> {
    tcp: TcpListener,
    ctx: Context<D>,
}

/// Errors from connection handling.
#[derive(Debug, Error)]
pub(crate) enum ConnectionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl<D: Daemon> Listener<D> {
    pub fn new(tcp: TcpListener, ctx: Context<D>) -> Self {
        Self { tcp, ctx }
    }

    /// Accept connections until the daemon is asked to shut down.
    ///
    /// Returns the still-bound socket so the caller decides when the port
    /// is released.
    pub async fn run(self) -> TcpListener {
        let stop = self.ctx.stop_token();
        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                result = self.tcp.accept() => match result {
                    Ok((stream, peer)) => {
                        let ctx = self.ctx.clone();
                        tokio::spawn(async move {
                            ctx.add_peer(peer);
                            let (reader, writer) = stream.into_split();
                            if let Err(e) = handle_connection(reader, writer, &ctx).await {
                                log_connection_error(peer, e);
                            }
                            ctx.remove_peer(peer);
                        });
                    }
                    Err(e) => {
                        error!(daemon = self.ctx.name(), "accept error: {}", e);
                        accept_backoff(&stop).await;
                    }
                },
            }
        }
        debug!(daemon = self.ctx.name(), "listener stopped");
        self.tcp
    }
}

/// Sleep for [`ACCEPT_BACKOFF`], cut short by shutdown.
async fn accept_backoff(stop: &CancellationToken) {
    tokio::select! {
        _ = stop.cancelled() => {}
        _ = tokio::time::sleep(ACCEPT_BACKOFF) => {}
    }
}

fn log_connection_error(peer: SocketAddr, e: ConnectionError) {
    match e {
        ConnectionError::Io(e) => debug!(%peer, "connection closed: {}", e),
        ConnectionError::Codec(e) => warn!(%peer, "failed to encode response: {}", e),
    }
}

/// Serve one client until it disconnects, the daemon stops, or a
/// `shutdown` request succeeds.
///
/// Generic over reader/writer types so it can be driven by in-memory pipes.
async fn handle_connection<R, W, D>(
    mut reader: R,
    mut writer: W,
    ctx: &Context<D>,
) -> Result<(), ConnectionError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    D: Daemon,
{
    let stop = ctx.stop_token();
    let mut decoder = StreamDecoder::new();
    let mut chunk = vec![0u8; READ_CHUNK];

    loop {
        let n = tokio::select! {
            _ = stop.cancelled() => break,
            read = reader.read(&mut chunk) => read?,
        };
        if n == 0 {
            break;
        }
        decoder.feed(&chunk[..n]);

        loop {
            let value = match decoder.next_value() {
                Ok(Some(value)) => value,
                Ok(None) => break,
                Err(e) => {
                    debug!(daemon = ctx.name(), "{}", e);
                    let response = Response::error(Value::Nil, RpcError::Parse(e.to_string()));
                    write_response(&mut writer, &response).await?;
                    continue;
                }
            };

            let reply = dispatch::dispatch(ctx, value);
            if let Some(response) = &reply.response {
                write_response(&mut writer, response).await?;
            }
            if reply.close {
                writer.shutdown().await?;
                return Ok(());
            }
        }
    }

    writer.shutdown().await?;
    Ok(())
}

async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &Response,
) -> Result<(), ConnectionError> {
    let bytes = encode(response)?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
