use crate::env::Environment;
use crate::interpreter::Factory;
use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Object-safe trait for a command the shell runs in its own process.
pub trait ExecutableCommand {
    /// Executes the command, writing any output to `stdout`.
    fn execute(self: Box<Self>, stdout: &mut dyn Write, env: &mut Environment) -> Result<()>;
}

/// Factory that tries to create a built-in from a name and its arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`, in which case
/// the line goes to the external executor.
pub trait CommandFactory {
    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>>;
}

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process. They ignore redirections and
/// the background marker.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "cd" or "status".
    fn name() -> &'static str;

    /// Treat every argument as positional, so `cd -dir` reaches a directory
    /// named `-dir` instead of failing as an unknown option.
    const POSITIONAL_ONLY: bool = false;

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<()>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(self: Box<Self>, stdout: &mut dyn Write, env: &mut Environment) -> Result<()> {
        <T as BuiltinCommand>::execute(*self, stdout, env)
    }
}

/// Stand-in for a builtin whose arguments did not parse; prints argh's
/// message (help text or error).
struct InvalidArgs {
    output: String,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(self: Box<Self>, stdout: &mut dyn Write, _env: &mut Environment) -> Result<()> {
        writeln!(stdout, "{}", self.output.trim_end())?;
        Ok(())
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>> {
        if name != T::name() {
            return None;
        }
        let parsed = if T::POSITIONAL_ONLY && args.first() != Some(&"--") {
            let mut positional = Vec::with_capacity(args.len() + 1);
            positional.push("--");
            positional.extend_from_slice(args);
            T::from_args(&[name], &positional)
        } else {
            T::from_args(&[name], args)
        };
        Some(match parsed {
            Ok(cmd) => Box::new(cmd),
            Err(EarlyExit { output, .. }) => Box::new(InvalidArgs { output }),
        })
    }
}

#[derive(FromArgs)]
/// Leave the shell, terminating any background commands still running.
pub struct Exit {
    #[argh(positional, greedy)]
    /// ignored.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    const POSITIONAL_ONLY: bool = true;

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<()> {
        env.should_exit = true;
        Ok(())
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// If no target is provided, changes to the directory specified by the HOME environment variable.
pub struct Cd {
    #[argh(positional, greedy)]
    /// directory to switch to, absolute or relative; only the first one is used.
    pub target: Vec<String>,
}

impl Cd {
    fn destination(&self, env: &Environment) -> Option<PathBuf> {
        match self.target.first() {
            Some(t) if !t.is_empty() => Some(PathBuf::from(t)),
            _ => env.home_dir(),
        }
    }
}

fn change_dir(target: &Path, env: &mut Environment) -> Result<()> {
    let new_dir = if target.is_absolute() {
        target.to_path_buf()
    } else {
        env.current_dir.join(target)
    };

    let canonical = fs::canonicalize(&new_dir)
        .with_context(|| format!("cd: can't canonicalize {}", new_dir.display()))?;

    env::set_current_dir(&canonical)
        .with_context(|| format!("cd: can't chdir to {}", canonical.display()))?;
    env.current_dir = canonical;
    Ok(())
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    const POSITIONAL_ONLY: bool = true;

    /// Failures are not reported to the user; the directory just stays put.
    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<()> {
        let Some(target) = self.destination(env) else {
            debug!("cd: no target and HOME not set");
            return Ok(());
        };
        if let Err(err) = change_dir(&target, env) {
            debug!("{:#}", err);
        }
        Ok(())
    }
}

#[derive(FromArgs)]
/// Print how the last foreground command ended.
pub struct Status {}

impl BuiltinCommand for Status {
    fn name() -> &'static str {
        "status"
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<()> {
        writeln!(stdout, "{}", env.last_status)?;
        Ok(())
    }
}
