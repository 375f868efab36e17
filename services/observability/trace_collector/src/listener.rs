//! TCP front end of the diagnostic dump

use crate::error::{DiagnosticError, Result};
use crate::tap::DiagnosticTap;
use actors::MessageTap;
use config::DiagnosticsConfig;
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, Semaphore};
use tracing::{debug, error, info, warn};

#[derive(Debug, Serialize)]
struct Greeting<'a> {
    service: &'a str,
    version: &'a str,
    max_connections: usize,
}

#[derive(Debug, Serialize)]
struct Rejection<'a> {
    error: &'a str,
    max_connections: usize,
}

/// Connection counters
#[derive(Debug, Default)]
pub struct ListenerStats {
    pub accepted: AtomicU64,
    pub rejected: AtomicU64,
    /// Records skipped because a client fell behind
    pub lagged: AtomicU64,
}

pub struct DiagnosticListener {
    address: String,
    max_connections: usize,
    tap: Arc<DiagnosticTap>,
    slots: Arc<Semaphore>,
    stats: Arc<ListenerStats>,
}

impl DiagnosticListener {
    pub fn new(config: &DiagnosticsConfig) -> Self {
        Self {
            address: format!("{}:{}", config.bind_address, config.port),
            max_connections: config.max_connections,
            tap: Arc::new(DiagnosticTap::new(config.buffer)),
            slots: Arc::new(Semaphore::new(config.max_connections)),
            stats: Arc::new(ListenerStats::default()),
        }
    }

    /// Tap to register with the task system
    pub fn tap(&self) -> Arc<dyn MessageTap> {
        Arc::clone(&self.tap) as Arc<dyn MessageTap>
    }

    pub fn diagnostic_tap(&self) -> &Arc<DiagnosticTap> {
        &self.tap
    }

    pub fn stats(&self) -> &ListenerStats {
        &self.stats
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub async fn bind(&self) -> Result<TcpListener> {
        let listener = TcpListener::bind(&self.address)
            .await
            .map_err(|source| DiagnosticError::Bind {
                address: self.address.clone(),
                source,
            })?;
        info!(
            address = %self.address,
            max_connections = self.max_connections,
            "Diagnostic listener bound"
        );
        Ok(listener)
    }

    /// Accept clients until `shutdown` completes
    pub async fn serve(&self, listener: TcpListener, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Diagnostic listener shutting down");
                    return;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => self.admit(stream, peer).await,
                    Err(e) => error!(error = %e, "Failed to accept diagnostic connection"),
                },
            }
        }
    }

    async fn admit(&self, mut stream: TcpStream, peer: SocketAddr) {
        let Ok(permit) = Arc::clone(&self.slots).try_acquire_owned() else {
            self.stats.rejected.fetch_add(1, Ordering::Relaxed);
            warn!(%peer, max_connections = self.max_connections, "Diagnostic connection rejected");
            let rejection = Rejection {
                error: "too many diagnostic connections",
                max_connections: self.max_connections,
            };
            if let Err(e) = write_json_line(&mut stream, &rejection).await {
                debug!(%peer, error = %e, "Failed to send rejection");
            }
            let _ = stream.shutdown().await;
            return;
        };

        self.stats.accepted.fetch_add(1, Ordering::Relaxed);
        info!(%peer, "Diagnostic client attached");

        let lines = self.tap.subscribe();
        let greeting = Greeting {
            service: "itti-diagnostics",
            version: env!("CARGO_PKG_VERSION"),
            max_connections: self.max_connections,
        };
        let stats = Arc::clone(&self.stats);

        tokio::spawn(async move {
            let _permit = permit;
            match stream_client(stream, lines, &greeting, &stats).await {
                Ok(()) => info!(%peer, "Diagnostic client detached"),
                Err(e) => debug!(%peer, error = %e, "Diagnostic client dropped"),
            }
        });
    }
}

async fn stream_client(
    stream: TcpStream,
    mut lines: broadcast::Receiver<Arc<str>>,
    greeting: &Greeting<'_>,
    stats: &ListenerStats,
) -> Result<()> {
    let (mut reader, mut writer) = stream.into_split();
    write_json_line(&mut writer, greeting).await?;

    // Client input is ignored; reading only detects a hang-up while idle
    let mut discard = [0u8; 256];
    loop {
        tokio::select! {
            read = reader.read(&mut discard) => match read {
                Ok(0) => return Ok(()),
                Ok(_) => continue,
                Err(e) => return Err(e.into()),
            },
            received = lines.recv() => match received {
                Ok(line) => {
                    writer.write_all(line.as_bytes()).await?;
                    writer.write_all(b"\n").await?;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    stats.lagged.fetch_add(skipped, Ordering::Relaxed);
                    debug!(skipped, "Diagnostic client lagging");
                }
                Err(broadcast::error::RecvError::Closed) => return Ok(()),
            },
        }
    }
}

async fn write_json_line<W, T>(stream: &mut W, value: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut line = serde_json::to_vec(value)?;
    line.push(b'\n');
    stream.write_all(&line).await?;
    Ok(())
}
