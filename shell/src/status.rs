use nix::sys::wait::WaitStatus;
use std::fmt;

/// How a child process ended.
///
/// `Display` renders the report line users see: `exit value N` or
/// `terminated by signal N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    /// Normal exit with the given code.
    Exited(i32),
    /// Killed by the given signal number.
    Signaled(i32),
}

impl ProcessStatus {
    /// Translate a wait result into an outcome.
    ///
    /// Returns `None` for statuses that do not mean the child is gone
    /// (still running, stopped, continued, ptrace events).
    pub fn from_wait(status: WaitStatus) -> Option<Self> {
        match status {
            WaitStatus::Exited(_, code) => Some(ProcessStatus::Exited(code)),
            WaitStatus::Signaled(_, signal, _) => Some(ProcessStatus::Signaled(signal as i32)),
            _ => None,
        }
    }

    pub fn is_signaled(&self) -> bool {
        matches!(self, ProcessStatus::Signaled(_))
    }

    /// Exit code for the shell itself, `128 + N` for a signal like POSIX shells.
    pub fn exit_code(&self) -> i32 {
        match *self {
            ProcessStatus::Exited(code) => code,
            ProcessStatus::Signaled(signal) => 128 + signal,
        }
    }
}

impl Default for ProcessStatus {
    fn default() -> Self {
        ProcessStatus::Exited(0)
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessStatus::Exited(code) => write!(f, "exit value {}", code),
            ProcessStatus::Signaled(signal) => write!(f, "terminated by signal {}", signal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::signal::Signal;
    use nix::unistd::Pid;

    #[test]
    fn test_report_format() {
        assert_eq!(ProcessStatus::Exited(0).to_string(), "exit value 0");
        assert_eq!(ProcessStatus::Exited(3).to_string(), "exit value 3");
        assert_eq!(
            ProcessStatus::Signaled(15).to_string(),
            "terminated by signal 15"
        );
    }

    #[test]
    fn test_from_wait_keeps_exit_and_signal_apart() {
        let pid = Pid::from_raw(100);
        assert_eq!(
            ProcessStatus::from_wait(WaitStatus::Exited(pid, 2)),
            Some(ProcessStatus::Exited(2))
        );
        assert_eq!(
            ProcessStatus::from_wait(WaitStatus::Signaled(pid, Signal::SIGKILL, false)),
            Some(ProcessStatus::Signaled(9))
        );
        assert_eq!(ProcessStatus::from_wait(WaitStatus::StillAlive), None);
    }

    #[test]
    fn test_exit_code_mapping() {
        assert_eq!(ProcessStatus::Exited(7).exit_code(), 7);
        assert_eq!(ProcessStatus::Signaled(2).exit_code(), 130);
    }

    #[test]
    fn test_default_is_clean_exit() {
        assert_eq!(ProcessStatus::default(), ProcessStatus::Exited(0));
        assert!(!ProcessStatus::default().is_signaled());
    }
}
