//! Cooperative shutdown flag.
//!
//! The sidecar poll loop is single-threaded, so cancellation is a shared
//! atomic flag checked between `poll_once` calls. SIGINT and SIGTERM set
//! the flag; nothing is interrupted mid-cycle.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use signal_hook::consts::signal::{SIGINT, SIGTERM};
use tracing::debug;

/// Shared "keep running" flag settable from signal context.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag {
    flag: Arc<AtomicBool>,
}

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers SIGINT and SIGTERM to set this flag.
    pub fn install(&self) -> io::Result<()> {
        for signal in [SIGINT, SIGTERM] {
            signal_hook::flag::register(signal, self.flag.clone())?;
        }
        debug!("shutdown signal handlers installed");
        Ok(())
    }

    /// True once shutdown has been requested.
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Requests shutdown programmatically.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }
}
