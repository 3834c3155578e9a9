use crate::builtin::{CommandFactory, ExecutableCommand};
use crate::command::Command;
use crate::env::Environment;
use crate::expand::expand;
use crate::external::{Dispatch, ExecError, Executor};
use crate::io_adapters::LineSource;
use crate::mode::ForegroundMode;
use crate::parser::parse_line;
use crate::status::ProcessStatus;
use std::io::Write;
use tracing::{debug, trace};

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports the builtins defined in this crate.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// The shell: reads lines, runs them, and reports on background commands.
///
/// Each line goes through `$$` expansion and parsing, then either a builtin
/// (`cd`, `status`, `exit`) or the external [`Executor`]. After every line the
/// finished background commands are reaped and reported.
///
/// Example
/// ```no_run
/// use smallsh::Interpreter;
/// let mut sh = Interpreter::default();
/// let mut out = Vec::new();
/// sh.execute_line("status", &mut out).unwrap();
/// assert_eq!(out, b"exit value 0\n");
/// ```
pub struct Interpreter {
    env: Environment,
    executor: Executor,
    commands: Vec<Box<dyn CommandFactory>>,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of builtin factories.
    pub fn new(commands: Vec<Box<dyn CommandFactory>>, mode: ForegroundMode) -> Self {
        Self {
            env: Environment::new(),
            executor: Executor::new(mode),
            commands,
        }
    }

    /// Default builtins, with the given foreground-only flag.
    pub fn with_mode(mode: ForegroundMode) -> Self {
        use crate::builtin::*;
        Self::new(
            vec![
                Box::new(Factory::<Exit>::default()),
                Box::new(Factory::<Cd>::default()),
                Box::new(Factory::<Status>::default()),
            ],
            mode,
        )
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    pub fn should_exit(&self) -> bool {
        self.env.should_exit
    }

    /// Outcome of the last foreground command.
    pub fn last_status(&self) -> ProcessStatus {
        self.env.last_status
    }

    fn find_builtin(&self, command: &Command) -> Option<Box<dyn ExecutableCommand>> {
        let args: Vec<&str> = command.args().iter().map(String::as_str).collect();
        self.commands
            .iter()
            .find_map(|factory| factory.try_create(command.program(), &args))
    }

    /// Run one raw input line, writing reports to `out`.
    ///
    /// Fails only on conditions the shell cannot continue from, such as
    /// being unable to fork.
    pub fn execute_line(&mut self, line: &str, out: &mut dyn Write) -> anyhow::Result<()> {
        let expanded = expand(line);
        let command = parse_line(&expanded);
        trace!(?command, "parsed");

        if command.is_comment() {
            return Ok(());
        }
        if let Some(builtin) = self.find_builtin(&command) {
            return builtin.execute(out, &mut self.env);
        }

        match self.executor.execute(&command, out) {
            Ok(Dispatch::Foreground(status)) => self.env.last_status = status,
            Ok(Dispatch::Background(_)) => {}
            Err(ExecError::InvalidArgument { arg, .. }) => {
                writeln!(out, "{}: cannot pass {:?} to a program", command.program(), arg)?;
                self.env.last_status = ProcessStatus::Exited(1);
            }
            Err(err) => return Err(err.into()),
        }
        Ok(())
    }

    /// Report and forget background commands that have finished.
    pub fn reap(&mut self, out: &mut dyn Write) -> anyhow::Result<()> {
        self.executor.reap_finished(out)?;
        Ok(())
    }

    /// Read–eval–print loop over `source` until `exit` or end of input.
    ///
    /// Background commands still running when the loop ends are terminated.
    pub fn repl(
        &mut self,
        source: &mut dyn LineSource,
        prompt: &str,
        out: &mut dyn Write,
    ) -> anyhow::Result<()> {
        self.reap(out)?;
        while !self.env.should_exit {
            out.flush()?;
            let Some(line) = source.next_line(prompt)? else {
                debug!("end of input");
                break;
            };
            self.execute_line(&line, out)?;
            self.reap(out)?;
        }
        self.shutdown();
        Ok(())
    }

    /// Terminate whatever is still running in the background.
    pub fn shutdown(&mut self) {
        let killed = self.executor.terminate_background();
        if killed > 0 {
            debug!(killed, "terminated background commands on exit");
        }
    }
}

impl Default for Interpreter {
    /// Create an interpreter with the default set of builtins (`exit`, `cd`,
    /// `status`) bound to the process-wide foreground-only flag.
    fn default() -> Self {
        Self::with_mode(ForegroundMode::global())
    }
}
