//! SIGINT handling around property file writes.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;

static WRITING: AtomicBool = AtomicBool::new(false);
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Install the process-wide interrupt handler.
///
/// Outside a property write an interrupt exits with status 1. During a write
/// it is recorded and surfaced once the write has completed.
pub fn install_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        if WRITING.load(Ordering::SeqCst) {
            INTERRUPTED.store(true, Ordering::SeqCst);
        } else {
            eprintln!();
            std::process::exit(1);
        }
    })
    .context("Failed to install interrupt handler")
}

/// True when an interrupt arrived during a write that has not finished yet.
pub fn interrupt_pending() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Marks a property write as in progress for the handler above.
///
/// A guard dropped without [`WriteGuard::finish`] acts on a held interrupt
/// itself by exiting with status 1.
#[derive(Debug)]
pub struct WriteGuard {
    finished: bool,
}

impl WriteGuard {
    pub fn begin() -> Self {
        WRITING.store(true, Ordering::SeqCst);
        Self { finished: false }
    }

    /// End the write. Returns true if an interrupt arrived meanwhile.
    pub fn finish(mut self) -> bool {
        self.finished = true;
        INTERRUPTED.swap(false, Ordering::SeqCst)
    }
}

impl Drop for WriteGuard {
    fn drop(&mut self) {
        WRITING.store(false, Ordering::SeqCst);
        if !self.finished && INTERRUPTED.swap(false, Ordering::SeqCst) {
            eprintln!();
            std::process::exit(1);
        }
    }
}
