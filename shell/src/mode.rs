//! Foreground-only mode and the shell's own signal dispositions.
//!
//! The shell ignores SIGINT (children get it back before `exec`) and turns
//! SIGTSTP into a toggle of foreground-only mode. The handler only flips an
//! atomic flag and writes a fixed message with a raw `write(2)`.

use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Notice printed when the mode is switched on.
pub const ENTER_NOTICE: &str = "Entering foreground-only mode (& is now ignored)\n";
/// Notice printed when the mode is switched off.
pub const EXIT_NOTICE: &str = "Exiting foreground-only mode\n";

static FOREGROUND_ONLY: AtomicBool = AtomicBool::new(false);

/// Handle on a foreground-only flag.
///
/// [`ForegroundMode::global`] is the process-wide flag driven by SIGTSTP.
/// Clones share the flag they were cloned from.
#[derive(Debug, Clone)]
pub struct ForegroundMode {
    flag: Flag,
}

#[derive(Debug, Clone)]
enum Flag {
    Global,
    Owned(Arc<AtomicBool>),
}

impl ForegroundMode {
    pub fn global() -> Self {
        Self { flag: Flag::Global }
    }

    /// A flag of its own, not connected to any signal. It is freed with the
    /// last clone.
    pub fn detached(active: bool) -> Self {
        Self {
            flag: Flag::Owned(Arc::new(AtomicBool::new(active))),
        }
    }

    fn flag(&self) -> &AtomicBool {
        match &self.flag {
            Flag::Global => &FOREGROUND_ONLY,
            Flag::Owned(flag) => flag,
        }
    }

    /// Whether a trailing `&` is currently ignored.
    pub fn is_active(&self) -> bool {
        self.flag().load(Ordering::SeqCst)
    }

    /// Flip the mode and return the new state.
    pub fn toggle(&self) -> bool {
        !self.flag().fetch_xor(true, Ordering::SeqCst)
    }

    pub fn notice(active: bool) -> &'static str {
        if active { ENTER_NOTICE } else { EXIT_NOTICE }
    }
}

impl Default for ForegroundMode {
    fn default() -> Self {
        Self::global()
    }
}

extern "C" fn handle_stop(_signal: libc::c_int) {
    let active = ForegroundMode::global().toggle();
    let notice = ForegroundMode::notice(active);
    // SAFETY: write(2) is async-signal-safe and `notice` is a static string.
    unsafe {
        libc::write(libc::STDERR_FILENO, notice.as_ptr().cast(), notice.len());
    }
}

/// Install the interactive shell's dispositions: ignore SIGINT, toggle
/// foreground-only mode on SIGTSTP.
///
/// SIGTSTP uses `SA_RESTART` so a foreground `waitpid` is not cut short by the
/// toggle.
pub fn install_shell_handlers() -> nix::Result<()> {
    let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
    let toggle = SigAction::new(
        SigHandler::Handler(handle_stop),
        SaFlags::SA_RESTART,
        SigSet::all(),
    );
    // SAFETY: the handler touches only an atomic and calls write(2).
    unsafe {
        sigaction(Signal::SIGINT, &ignore)?;
        sigaction(Signal::SIGTSTP, &toggle)?;
    }
    Ok(())
}
