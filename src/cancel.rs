//! Session cancellation flag
//!
//! SIGINT/SIGTERM set the flag instead of killing the process, so a session
//! that is interrupted still reports on the runs it already completed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route SIGINT and SIGTERM to this token
    pub fn install_signal_handlers(&self) -> std::io::Result<()> {
        use signal_hook::consts::{SIGINT, SIGTERM};
        signal_hook::flag::register(SIGINT, Arc::clone(&self.flag))?;
        signal_hook::flag::register(SIGTERM, Arc::clone(&self.flag))?;
        Ok(())
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
