//! `smallsh`: a small interactive Unix shell.
//!
//! A line goes through `$$` expansion ([`expand`]) and is parsed into a
//! [`command::Command`] ([`parser`]): program, arguments, optional `<`/`>`
//! redirections and a trailing `&`. The builtins `exit`, `cd` and `status` run
//! in-process; anything else is forked and exec'd by the [`external::Executor`],
//! which waits for foreground commands and reaps background ones between
//! lines. SIGTSTP toggles foreground-only mode ([`mode`]), in which `&` is
//! ignored.
//!
//! The main entry point is [`Interpreter`].

mod builtin;
pub mod command;
pub mod env;
pub mod expand;
pub mod external;
mod interpreter;
pub mod io_adapters;
pub mod logging;
pub mod mode;
pub mod parser;
pub mod status;

pub use builtin::{CommandFactory, ExecutableCommand};
pub use interpreter::Interpreter;

/// Serializes tests that change the process working directory.
#[cfg(test)]
pub(crate) fn lock_current_dir() -> std::sync::MutexGuard<'static, ()> {
    use std::sync::{Mutex, OnceLock};
    static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
    MUTEX
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
