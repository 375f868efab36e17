//! Diagnostic listener hosted on a small dedicated runtime

use actors::MessageTap;
use anyhow::{Context, Result};
use config::DiagnosticsConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio::sync::oneshot;
use trace_collector::DiagnosticListener;
use tracing::{info, warn};

pub struct DiagnosticsServer {
    runtime: Runtime,
    listener: Arc<DiagnosticListener>,
    stop: oneshot::Sender<()>,
}

impl DiagnosticsServer {
    pub fn start(config: &DiagnosticsConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("itti-diagnostics")
            .enable_all()
            .build()
            .context("Failed to build diagnostics runtime")?;

        let listener = Arc::new(DiagnosticListener::new(config));
        let socket = runtime
            .block_on(listener.bind())
            .context("Failed to start diagnostic listener")?;

        let (stop, stopped) = oneshot::channel::<()>();
        let server = Arc::clone(&listener);
        runtime.spawn(async move {
            server
                .serve(socket, async {
                    let _ = stopped.await;
                })
                .await;
        });

        Ok(Self {
            runtime,
            listener,
            stop,
        })
    }

    pub fn tap(&self) -> Arc<dyn MessageTap> {
        self.listener.tap()
    }

    pub fn stop(self) {
        let stats = self.listener.stats();
        info!(
            accepted = stats.accepted.load(std::sync::atomic::Ordering::Relaxed),
            rejected = stats.rejected.load(std::sync::atomic::Ordering::Relaxed),
            published = self.listener.diagnostic_tap().published(),
            "Stopping diagnostic listener"
        );
        if self.stop.send(()).is_err() {
            warn!("Diagnostic listener already stopped");
        }
        self.runtime.shutdown_timeout(Duration::from_secs(1));
    }
}
