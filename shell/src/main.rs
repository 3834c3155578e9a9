use anyhow::{Context, Result};
use argh::FromArgs;
use smallsh::Interpreter;
use smallsh::io_adapters::{EditorSource, LineSource, ReaderSource};
use smallsh::logging::init_logging;
use smallsh::mode::install_shell_handlers;
use std::fs::File;
use std::io::{self, BufReader, IsTerminal, Write};
use std::path::PathBuf;

#[derive(FromArgs)]
/// A small interactive shell with redirection, background jobs and
/// foreground-only mode (toggled with Ctrl-Z).
struct Args {
    #[argh(option, short = 'c')]
    /// run a single command line and exit.
    command: Option<String>,

    #[argh(option, short = 'p', default = "String::from(\": \")")]
    /// prompt shown before each line in interactive mode.
    prompt: String,

    #[argh(switch, short = 'v')]
    /// log debug messages to standard error.
    verbose: bool,

    #[argh(positional)]
    /// script to read commands from instead of standard input.
    script: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args: Args = argh::from_env();
    init_logging(args.verbose);
    install_shell_handlers().context("failed to install signal handlers")?;

    let mut sh = Interpreter::default();
    let mut out = io::stdout();

    if let Some(line) = &args.command {
        sh.execute_line(line, &mut out)?;
        sh.reap(&mut out)?;
        sh.shutdown();
    } else {
        let mut source: Box<dyn LineSource> = match &args.script {
            Some(path) => {
                let file = File::open(path)
                    .with_context(|| format!("cannot open script {}", path.display()))?;
                Box::new(ReaderSource::new(BufReader::new(file)))
            }
            None if io::stdin().is_terminal() => Box::new(EditorSource::new()?),
            None => Box::new(ReaderSource::new(io::stdin().lock())),
        };
        sh.repl(source.as_mut(), &args.prompt, &mut out)?;
    }

    out.flush()?;
    std::process::exit(sh.last_status().exit_code());
}
