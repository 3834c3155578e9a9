use anyhow::{Context, Result};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::BufRead;

/// Where the shell gets its input lines from.
pub trait LineSource {
    /// Read the next line without its terminator.
    ///
    /// Returns `Ok(None)` at end of input.
    fn next_line(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// Interactive source backed by a `rustyline` editor, with history.
pub struct EditorSource {
    editor: DefaultEditor,
}

impl EditorSource {
    pub fn new() -> Result<Self> {
        let editor = DefaultEditor::new().context("failed to set up the line editor")?;
        Ok(Self { editor })
    }
}

impl LineSource for EditorSource {
    fn next_line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    self.editor.add_history_entry(line.as_str())?;
                }
                Ok(Some(line))
            }
            // Ctrl-C at the prompt discards the line, it does not end the shell.
            Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
            Err(ReadlineError::Eof) => Ok(None),
            Err(err) => Err(err).context("failed to read a line"),
        }
    }
}

/// Non-interactive source: script files and piped standard input.
///
/// Never shows a prompt.
pub struct ReaderSource<R> {
    reader: R,
}

impl<R: BufRead> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> LineSource for ReaderSource<R> {
    fn next_line(&mut self, _prompt: &str) -> Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_reader_source_strips_terminators() {
        let mut source = ReaderSource::new(Cursor::new("ls -la\r\necho hi\nlast"));
        assert_eq!(source.next_line(": ").unwrap().as_deref(), Some("ls -la"));
        assert_eq!(source.next_line(": ").unwrap().as_deref(), Some("echo hi"));
        assert_eq!(source.next_line(": ").unwrap().as_deref(), Some("last"));
        assert_eq!(source.next_line(": ").unwrap(), None);
    }

    #[test]
    fn test_reader_source_keeps_blank_lines() {
        let mut source = ReaderSource::new(Cursor::new("\n\nstatus\n"));
        assert_eq!(source.next_line("").unwrap().as_deref(), Some(""));
        assert_eq!(source.next_line("").unwrap().as_deref(), Some(""));
        assert_eq!(source.next_line("").unwrap().as_deref(), Some("status"));
        assert_eq!(source.next_line("").unwrap(), None);
    }
}
