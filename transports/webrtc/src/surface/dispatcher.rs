//! Serialized dispatch onto the display surface
//!
//! One task owns the surface and delivers commands strictly in the order
//! they were enqueued, whichever thread enqueued them. Enqueueing never
//! blocks. Once the shared closed flag is set nothing further is delivered;
//! a delivery already in progress is allowed to finish.

use crate::error::ErrorReporter;
use crate::surface::{DisplaySurface, SurfaceCommand};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Single serialized execution context for display surface calls
#[derive(Debug)]
pub struct SurfaceDispatcher {
    tx: mpsc::UnboundedSender<SurfaceCommand>,
    closed: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl SurfaceDispatcher {
    /// Spawn the dispatch task
    ///
    /// `closed` is shared with the owner so that closing takes effect
    /// immediately, from any thread.
    pub fn spawn(
        surface: Arc<dyn DisplaySurface>,
        errors: ErrorReporter,
        closed: Arc<AtomicBool>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_dispatch(surface, rx, errors, Arc::clone(&closed)));
        Self { tx, closed, task }
    }

    /// Enqueue a command. Returns false if the dispatcher is closed.
    pub fn dispatch(&self, command: SurfaceCommand) -> bool {
        if self.closed.load(Ordering::SeqCst) {
            debug!("Dispatcher closed, dropping {}", command.function_name());
            return false;
        }
        self.tx.send(command).is_ok()
    }

    /// Stop delivering
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// True once closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Close, then wait for the task to drain and exit
    pub async fn shutdown(self) {
        self.close();
        drop(self.tx);
        if let Err(e) = self.task.await {
            debug!("Dispatch task ended abnormally: {}", e);
        }
    }
}

async fn run_dispatch(
    surface: Arc<dyn DisplaySurface>,
    mut rx: mpsc::UnboundedReceiver<SurfaceCommand>,
    errors: ErrorReporter,
    closed: Arc<AtomicBool>,
) {
    let mut skipped = 0usize;

    while let Some(command) = rx.recv().await {
        if closed.load(Ordering::SeqCst) {
            skipped += 1;
            continue;
        }

        trace!("Dispatching {}", command.function_name());
        if let Err(e) = surface.invoke(&command).await {
            errors.report(e);
        }
    }

    if skipped > 0 {
        debug!("Discarded {} queued surface calls after close", skipped);
    }
}
