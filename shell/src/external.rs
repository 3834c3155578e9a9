use crate::command::Command;
use crate::mode::ForegroundMode;
use crate::status::ProcessStatus;
use nix::errno::Errno;
use nix::fcntl::{FcntlArg, FdFlag, fcntl};
use nix::sys::signal::{self, SigHandler, Signal, kill};
use nix::sys::wait::{WaitPidFlag, waitpid};
use nix::unistd::{ForkResult, Pid, dup2, execvp, fork};
use std::ffi::{CString, NulError};
use std::io::Write;
use std::os::unix::io::RawFd;
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Where background commands read from and write to when not redirected.
pub const NULL_DEVICE: &str = "/dev/null";

/// Permission bits for files created by output redirection.
const OUTPUT_MODE: libc::c_uint = 0o644;

/// Failures the parent side of the executor can run into.
///
/// Failures inside the child (bad redirect, unknown program) are not errors
/// here; they show up as the child's exit status.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The OS refused to create a new process.
    #[error("fork() failed: {0}")]
    Fork(#[source] Errno),
    #[error("waitpid({pid}) failed: {source}")]
    Wait {
        pid: Pid,
        #[source]
        source: Errno,
    },
    /// A command without a program name.
    #[error("empty command")]
    EmptyCommand,
    /// An argument or path that cannot be handed to the OS.
    #[error("invalid argument {arg:?}: {source}")]
    InvalidArgument {
        arg: String,
        #[source]
        source: NulError,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// What happened to a dispatched command by the time control came back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Ran in the foreground and has been reaped.
    Foreground(ProcessStatus),
    /// Detached; will be picked up by a later [`Executor::reap_finished`].
    Background(Pid),
}

/// A background child that has been reaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Finished {
    pub pid: Pid,
    pub status: ProcessStatus,
}

fn c_string(text: &str) -> Result<CString, ExecError> {
    CString::new(text).map_err(|source| ExecError::InvalidArgument {
        arg: text.to_string(),
        source,
    })
}

/// One file to install over a standard descriptor in the child.
struct Redirect {
    path: CString,
    flags: libc::c_int,
    target: RawFd,
    diagnostic: Vec<u8>,
}

impl Redirect {
    fn input(path: &str) -> Result<Self, ExecError> {
        Ok(Self {
            path: c_string(path)?,
            flags: libc::O_RDONLY,
            target: libc::STDIN_FILENO,
            diagnostic: format!("cannot open {} for input\n", path).into_bytes(),
        })
    }

    fn output(path: &str) -> Result<Self, ExecError> {
        Ok(Self {
            path: c_string(path)?,
            flags: libc::O_WRONLY | libc::O_CREAT | libc::O_TRUNC,
            target: libc::STDOUT_FILENO,
            diagnostic: format!("cannot open {} for output\n", path).into_bytes(),
        })
    }

    /// Open the file and put it on the target descriptor. Child side only.
    fn install(&self) -> Result<(), Errno> {
        // SAFETY: `path` is a valid NUL-terminated string; open(2) is
        // async-signal-safe.
        let fd = unsafe { libc::open(self.path.as_ptr(), self.flags, OUTPUT_MODE) };
        if fd == -1 {
            return Err(Errno::last());
        }
        if fd != self.target {
            dup2(fd, self.target)?;
            fcntl(fd, FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))?;
        }
        Ok(())
    }
}

/// Everything the child needs, built before `fork` so the child never
/// allocates.
struct ChildPlan {
    argv: Vec<CString>,
    stdin: Option<Redirect>,
    stdout: Option<Redirect>,
    exec_prefix: Vec<u8>,
}

impl ChildPlan {
    fn prepare(command: &Command, background: bool) -> Result<Self, ExecError> {
        if command.arguments.is_empty() {
            return Err(ExecError::EmptyCommand);
        }
        let argv = command
            .arguments
            .iter()
            .map(|arg| c_string(arg))
            .collect::<Result<Vec<_>, _>>()?;

        let mut input = command.input_redirect.as_deref();
        let mut output = command.output_redirect.as_deref();
        if background {
            input.get_or_insert(NULL_DEVICE);
            output.get_or_insert(NULL_DEVICE);
        }

        Ok(Self {
            argv,
            stdin: input.map(Redirect::input).transpose()?,
            stdout: output.map(Redirect::output).transpose()?,
            exec_prefix: format!("{}: ", command.program()).into_bytes(),
        })
    }

    /// Set up the child and replace its image. Never returns.
    fn run(&self) -> ! {
        // SAFETY: installing default/ignore dispositions is async-signal-safe.
        unsafe {
            let _ = signal::signal(Signal::SIGINT, SigHandler::SigDfl);
            let _ = signal::signal(Signal::SIGTSTP, SigHandler::SigIgn);
        }

        for redirect in [&self.stdin, &self.stdout].into_iter().flatten() {
            if redirect.install().is_err() {
                child_exit(&[redirect.diagnostic.as_slice()]);
            }
        }

        let errno = match execvp(&self.argv[0], &self.argv) {
            Ok(never) => match never {},
            Err(errno) => errno,
        };
        child_exit(&[
            self.exec_prefix.as_slice(),
            errno.desc().as_bytes(),
            b"\n".as_slice(),
        ]);
    }
}

/// Write a diagnostic to stderr with raw writes and leave with status 1.
fn child_exit(parts: &[&[u8]]) -> ! {
    for part in parts {
        // SAFETY: write(2) and _exit(2) are async-signal-safe.
        unsafe {
            libc::write(libc::STDERR_FILENO, part.as_ptr().cast(), part.len());
        }
    }
    // SAFETY: _exit(2) skips atexit handlers and stdio flushing, which the
    // forked child must not run.
    unsafe { libc::_exit(1) }
}

/// Runs external commands and keeps track of detached ones.
///
/// Example
/// ```no_run
/// use smallsh::command::Command;
/// use smallsh::external::{Dispatch, Executor};
/// use smallsh::mode::ForegroundMode;
/// use smallsh::status::ProcessStatus;
///
/// let mut executor = Executor::new(ForegroundMode::detached(false));
/// let cmd = Command::new(vec!["true".to_string()]);
/// let outcome = executor.execute(&cmd, &mut std::io::stdout()).unwrap();
/// assert_eq!(outcome, Dispatch::Foreground(ProcessStatus::Exited(0)));
/// ```
pub struct Executor {
    mode: ForegroundMode,
    jobs: Vec<Pid>,
    early: Vec<Finished>,
}

impl Executor {
    pub fn new(mode: ForegroundMode) -> Self {
        Self {
            mode,
            jobs: Vec::new(),
            early: Vec::new(),
        }
    }

    pub fn mode(&self) -> &ForegroundMode {
        &self.mode
    }

    /// Background children not yet reaped.
    pub fn background_jobs(&self) -> &[Pid] {
        &self.jobs
    }

    /// Fork and exec `command`.
    ///
    /// A trailing `&` is honoured only while foreground-only mode is off. A
    /// detached command gets the null device for any stream it does not
    /// redirect itself; its id is reported on `out` as `background id PID`.
    /// A foreground command is waited for, and `out` gets
    /// `terminated by signal N` if a signal killed it.
    pub fn execute(
        &mut self,
        command: &Command,
        out: &mut dyn Write,
    ) -> Result<Dispatch, ExecError> {
        let background = !command.run_in_foreground && !self.mode.is_active();
        let plan = ChildPlan::prepare(command, background)?;
        out.flush()?;

        // SAFETY: the child branch only runs `ChildPlan::run`, which sticks to
        // async-signal-safe calls and never returns.
        match unsafe { fork() }.map_err(ExecError::Fork)? {
            ForkResult::Child => plan.run(),
            ForkResult::Parent { child } => {
                debug!(pid = %child, program = command.program(), background, "spawned");
                if background {
                    self.detach(child, out)
                } else {
                    self.wait_foreground(child, out)
                }
            }
        }
    }

    fn wait_foreground(
        &mut self,
        child: Pid,
        out: &mut dyn Write,
    ) -> Result<Dispatch, ExecError> {
        loop {
            match waitpid(child, None) {
                Ok(wait_status) => {
                    let Some(status) = ProcessStatus::from_wait(wait_status) else {
                        trace!(?wait_status, "foreground child not finished yet");
                        continue;
                    };
                    if status.is_signaled() {
                        writeln!(out, "{}", status)?;
                        out.flush()?;
                    }
                    return Ok(Dispatch::Foreground(status));
                }
                Err(Errno::EINTR) => continue,
                Err(source) => return Err(ExecError::Wait { pid: child, source }),
            }
        }
    }

    fn detach(&mut self, child: Pid, out: &mut dyn Write) -> Result<Dispatch, ExecError> {
        writeln!(out, "background id {}", child)?;
        out.flush()?;

        match waitpid(child, Some(WaitPidFlag::WNOHANG)) {
            Ok(wait_status) => match ProcessStatus::from_wait(wait_status) {
                Some(status) => self.early.push(Finished { pid: child, status }),
                None => self.jobs.push(child),
            },
            Err(Errno::EINTR) => self.jobs.push(child),
            Err(source) => return Err(ExecError::Wait { pid: child, source }),
        }
        Ok(Dispatch::Background(child))
    }

    /// Reap every background child that has finished, without blocking.
    ///
    /// Each one is reported on `out` as `background pid PID is done: STATUS`
    /// exactly once and returned.
    pub fn reap_finished(
        &mut self,
        out: &mut dyn Write,
    ) -> Result<Vec<Finished>, ExecError> {
        let mut finished = std::mem::take(&mut self.early);
        let mut running = Vec::with_capacity(self.jobs.len());

        for pid in self.jobs.drain(..) {
            match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
                Ok(wait_status) => match ProcessStatus::from_wait(wait_status) {
                    Some(status) => finished.push(Finished { pid, status }),
                    None => running.push(pid),
                },
                Err(Errno::EINTR) => running.push(pid),
                Err(errno) => warn!(%pid, %errno, "dropping background job"),
            }
        }
        self.jobs = running;

        for done in &finished {
            debug!(pid = %done.pid, status = %done.status, "background child reaped");
            writeln!(out, "background pid {} is done: {}", done.pid, done.status)?;
        }
        out.flush()?;
        Ok(finished)
    }

    /// Send SIGTERM to every background child still running and wait for
    /// each of them. Nothing is reported.
    ///
    /// Returns how many children were terminated.
    pub fn terminate_background(&mut self) -> usize {
        self.early.clear();
        let jobs = std::mem::take(&mut self.jobs);
        for &pid in &jobs {
            if let Err(errno) = kill(pid, Signal::SIGTERM) {
                debug!(%pid, %errno, "kill failed");
            }
            while let Err(Errno::EINTR) = waitpid(pid, None) {}
        }
        jobs.len()
    }
}
