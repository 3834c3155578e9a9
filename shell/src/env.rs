use crate::status::ProcessStatus;
use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

/// State the shell carries from one line to the next.
///
/// The environment contains:
/// - `vars`: variables consulted by built-ins (e.g. `HOME` for a bare `cd`).
/// - `current_dir`: the working directory the shell believes it is in.
/// - `should_exit`: set by `exit`; the loop stops once it is true.
/// - `last_status`: outcome of the last foreground command, read by `status`.
#[derive(Debug, Clone)]
pub struct Environment {
    pub vars: HashMap<String, String>,
    pub current_dir: PathBuf,
    pub should_exit: bool,
    pub last_status: ProcessStatus,
}

impl Environment {
    /// Capture the current process state.
    ///
    /// Variables are copied from `std::env::vars()` and `current_dir` from
    /// `std::env::current_dir()`. No command has run yet, so `last_status`
    /// is `exit value 0`.
    pub fn new() -> Self {
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            vars: stdenv::vars().collect(),
            current_dir,
            should_exit: false,
            last_status: ProcessStatus::default(),
        }
    }

    /// Looks up the key in `self.vars` first, falling back to `std::env::var`.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| stdenv::var(key).ok())
    }

    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// Home directory for a bare `cd`.
    pub fn home_dir(&self) -> Option<PathBuf> {
        self.get_var("HOME")
            .filter(|home| !home.is_empty())
            .map(PathBuf::from)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
