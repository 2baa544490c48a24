//! Cooperative cancellation for long-running scans.
//!
//! Long loops poll a [`ShutdownPoll`] at fixed intervals and bail out with
//! `ImageError::Interrupted` once a shutdown has been requested. The
//! process-wide flag is what a server's signal handler sets; a
//! [`ShutdownToken`] scopes cancellation to a single caller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Something that can be asked whether work should stop.
pub trait ShutdownPoll {
    fn is_shutdown_pending(&self) -> bool;
}

/// Polls the process-wide shutdown flag.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalShutdown;

impl ShutdownPoll for GlobalShutdown {
    fn is_shutdown_pending(&self) -> bool {
        SHUTDOWN_REQUESTED.load(Ordering::Relaxed)
    }
}

/// Ask every polling loop in the process to stop.
pub fn request_shutdown() {
    info!("Shutdown requested");
    SHUTDOWN_REQUESTED.store(true, Ordering::Relaxed);
}

/// Clear a previous shutdown request.
pub fn clear_shutdown_request() {
    SHUTDOWN_REQUESTED.store(false, Ordering::Relaxed);
}

/// A cancellation flag shared between the requester and the worker.
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken {
    flag: Arc<AtomicBool>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }
}

impl ShutdownPoll for ShutdownToken {
    fn is_shutdown_pending(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
