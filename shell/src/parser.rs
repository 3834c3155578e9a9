use crate::command::{COMMENT, Command};
use thiserror::Error;
use tracing::debug;

/// Trailing marker asking the shell not to wait for the command.
pub const BACKGROUND_MARKER: char = '&';
/// Marker introducing an input redirect clause.
pub const INPUT_MARKER: char = '<';
/// Marker introducing an output redirect clause.
pub const OUTPUT_MARKER: char = '>';

const MARKERS: [char; 3] = [INPUT_MARKER, OUTPUT_MARKER, BACKGROUND_MARKER];

/// Reasons a line does not match the command grammar.
///
/// These never reach the caller of [`parse_line`]; they only decide that the
/// line falls back to the comment sentinel.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// Nothing but whitespace (or only markers) on the line.
    #[error("no command on the line")]
    NoCommand,
    /// A marker character inside a word, e.g. `a&b` or `< in>out`.
    #[error("marker inside word `{0}`")]
    EmbeddedMarker(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Input,
    Output,
}

impl Direction {
    fn of(marker: char) -> Option<Self> {
        match marker {
            INPUT_MARKER => Some(Direction::Input),
            OUTPUT_MARKER => Some(Direction::Output),
            _ => None,
        }
    }
}

/// Walks the words of one line and sorts them into arguments and clauses.
struct CommandBuilder<'a> {
    words: Vec<&'a str>,
    pos: usize,
    arguments: Vec<String>,
    input: Option<String>,
    output: Option<String>,
}

impl<'a> CommandBuilder<'a> {
    fn from(body: &'a str) -> Self {
        CommandBuilder {
            words: body.split_whitespace().collect(),
            pos: 0,
            arguments: Vec::new(),
            input: None,
            output: None,
        }
    }

    fn build(mut self, run_in_foreground: bool) -> Result<Command, ParseError> {
        while let Some(word) = self.consume() {
            match word.chars().next().and_then(Direction::of) {
                Some(direction) => self.parse_redirect(direction, word)?,
                None => self.parse_argument(word)?,
            }
        }

        if self.arguments.is_empty() {
            return Err(ParseError::NoCommand);
        }

        Ok(Command {
            arguments: self.arguments,
            input_redirect: self.input,
            output_redirect: self.output,
            run_in_foreground,
        })
    }

    fn peek(&self) -> Option<&'a str> {
        self.words.get(self.pos).copied()
    }

    fn consume(&mut self) -> Option<&'a str> {
        let word = self.peek();
        if word.is_some() {
            self.pos += 1;
        }
        word
    }

    /// Parse a redirect clause: marker followed by a path, either attached
    /// (`<in.txt`) or as the next word (`< in.txt`).
    ///
    /// A marker without a usable path leaves the redirect unset.
    fn parse_redirect(&mut self, direction: Direction, word: &'a str) -> Result<(), ParseError> {
        let attached = &word[1..];
        let path = if !attached.is_empty() {
            Some(attached)
        } else {
            match self.peek() {
                Some(next) if !next.starts_with(MARKERS) => self.consume(),
                _ => None,
            }
        };

        let Some(path) = path else {
            debug!(?direction, "redirect marker without a path, ignored");
            return Ok(());
        };
        if path.contains(MARKERS) {
            return Err(ParseError::EmbeddedMarker(path.to_string()));
        }

        let slot = match direction {
            Direction::Input => &mut self.input,
            Direction::Output => &mut self.output,
        };
        *slot = Some(path.to_string());
        Ok(())
    }

    fn parse_argument(&mut self, word: &'a str) -> Result<(), ParseError> {
        if word.contains(MARKERS) {
            return Err(ParseError::EmbeddedMarker(word.to_string()));
        }
        self.arguments.push(word.to_string());
        Ok(())
    }
}

/// Split off a trailing background marker.
///
/// Returns the rest of the line and whether the command stays in the
/// foreground.
fn strip_background_marker(line: &str) -> (&str, bool) {
    let trimmed = line.trim_end();
    match trimmed.strip_suffix(BACKGROUND_MARKER) {
        Some(rest) => (rest, false),
        None => (trimmed, true),
    }
}

/// Parse an already expanded line, reporting why it does not match the
/// grammar.
///
/// Comment lines (first non-blank character `#`) are returned as their plain
/// words so the leading word is preserved.
pub fn parse(line: &str) -> Result<Command, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ParseError::NoCommand);
    }
    if line.starts_with(COMMENT) {
        return Ok(Command::new(
            line.split_whitespace().map(str::to_string).collect(),
        ));
    }

    let (body, run_in_foreground) = strip_background_marker(line);
    CommandBuilder::from(body).build(run_in_foreground)
}

/// Parse an already expanded line into a [`Command`].
///
/// Never fails: a line that does not match the grammar yields
/// [`Command::comment`].
pub fn parse_line(line: &str) -> Command {
    match parse(line) {
        Ok(command) => command,
        Err(err) => {
            debug!(%err, line, "line parsed as comment");
            Command::comment()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(cmd: &Command) -> Vec<&str> {
        cmd.arguments.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_plain_command_with_flag() {
        let cmd = parse_line("ls -la");
        assert_eq!(args(&cmd), ["ls", "-la"]);
        assert_eq!(cmd.input_redirect, None);
        assert_eq!(cmd.output_redirect, None);
        assert!(cmd.run_in_foreground);
    }

    #[test]
    fn test_both_redirects_and_background() {
        let cmd = parse_line("sort < in.txt > out.txt &");
        assert_eq!(args(&cmd), ["sort"]);
        assert_eq!(cmd.input_redirect.as_deref(), Some("in.txt"));
        assert_eq!(cmd.output_redirect.as_deref(), Some("out.txt"));
        assert!(!cmd.run_in_foreground);
    }

    #[test]
    fn test_redirect_order_does_not_matter() {
        let forward = parse_line("echo hi < in.txt > out.txt");
        let reversed = parse_line("echo hi > out.txt < in.txt");
        assert_eq!(forward, reversed);
        assert_eq!(args(&reversed), ["echo", "hi"]);
        assert_eq!(reversed.input_redirect.as_deref(), Some("in.txt"));
        assert_eq!(reversed.output_redirect.as_deref(), Some("out.txt"));
    }

    #[test]
    fn test_blank_lines_are_comments() {
        assert_eq!(parse_line(""), Command::comment());
        assert_eq!(parse_line("   \t  "), Command::comment());
        assert_eq!(parse(""), Err(ParseError::NoCommand));
    }

    #[test]
    fn test_comment_keeps_first_word() {
        let cmd = parse_line("  #todo: echo > x &");
        assert!(cmd.is_comment());
        assert_eq!(cmd.arguments[0], "#todo:");
        assert_eq!(cmd.output_redirect, None);
        assert!(cmd.run_in_foreground);
    }

    #[test]
    fn test_whitespace_runs_are_one_delimiter() {
        let cmd = parse_line("  echo   a\t\tb    c  ");
        assert_eq!(args(&cmd), ["echo", "a", "b", "c"]);
    }

    #[test]
    fn test_background_marker_attached_to_word() {
        let cmd = parse_line("sleep 5&");
        assert_eq!(args(&cmd), ["sleep", "5"]);
        assert!(!cmd.run_in_foreground);
    }

    #[test]
    fn test_background_marker_only_counts_at_end() {
        assert_eq!(parse_line("echo a & b"), Command::comment());
        assert_eq!(
            parse("echo a&b"),
            Err(ParseError::EmbeddedMarker("a&b".to_string()))
        );
    }

    #[test]
    fn test_lone_marker_is_comment() {
        assert_eq!(parse_line("&"), Command::comment());
        assert_eq!(parse_line("< in.txt"), Command::comment());
    }

    #[test]
    fn test_redirect_without_path_is_ignored() {
        let cmd = parse_line("cat <");
        assert_eq!(args(&cmd), ["cat"]);
        assert_eq!(cmd.input_redirect, None);

        let cmd = parse_line("cat < > out.txt");
        assert_eq!(cmd.input_redirect, None);
        assert_eq!(cmd.output_redirect.as_deref(), Some("out.txt"));
    }

    #[test]
    fn test_attached_redirect_path() {
        let cmd = parse_line("wc <in.txt >out.txt");
        assert_eq!(args(&cmd), ["wc"]);
        assert_eq!(cmd.input_redirect.as_deref(), Some("in.txt"));
        assert_eq!(cmd.output_redirect.as_deref(), Some("out.txt"));
    }

    #[test]
    fn test_marker_inside_redirect_path_falls_back() {
        assert_eq!(
            parse("cat < in>out"),
            Err(ParseError::EmbeddedMarker("in>out".to_string()))
        );
        assert_eq!(parse_line("cat > a&b"), Command::comment());
    }

    #[test]
    fn test_words_after_clauses_are_arguments() {
        let cmd = parse_line("grep < in.txt pattern > out.txt -n");
        assert_eq!(args(&cmd), ["grep", "pattern", "-n"]);
        assert_eq!(cmd.input_redirect.as_deref(), Some("in.txt"));
        assert_eq!(cmd.output_redirect.as_deref(), Some("out.txt"));
    }

    #[test]
    fn test_last_redirect_wins() {
        let cmd = parse_line("echo x > a.txt > b.txt");
        assert_eq!(cmd.output_redirect.as_deref(), Some("b.txt"));
    }

    #[test]
    fn test_expanded_pid_survives_parse() {
        let line = crate::expand::expand_pid("touch tmp.$$ &", 4711);
        let cmd = parse_line(&line);
        assert_eq!(args(&cmd), ["touch", "tmp.4711"]);
        assert!(!cmd.run_in_foreground);
    }
}
