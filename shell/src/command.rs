/// Text of the single argument carried by the comment sentinel.
pub const COMMENT: &str = "#";

/// One parsed input line.
///
/// A `Command` is rebuilt from scratch for every line; nothing from a previous
/// line survives into the next one. `arguments` is never empty: lines that carry
/// nothing to run collapse into the comment sentinel (see [`Command::comment`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Program name followed by its arguments (`argv[0]`, `argv[1]`, ...).
    pub arguments: Vec<String>,
    /// File that replaces standard input, if any.
    pub input_redirect: Option<String>,
    /// File that replaces standard output, if any.
    pub output_redirect: Option<String>,
    /// `false` when the line ended with the background marker `&`.
    pub run_in_foreground: bool,
}

impl Command {
    /// Build a foreground command with no redirections.
    ///
    /// Returns the comment sentinel when `arguments` is empty, so the
    /// non-empty invariant holds for every value handed out.
    pub fn new(arguments: Vec<String>) -> Self {
        if arguments.is_empty() {
            return Self::comment();
        }
        Self {
            arguments,
            input_redirect: None,
            output_redirect: None,
            run_in_foreground: true,
        }
    }

    /// The no-op value produced for blank or unparseable lines.
    pub fn comment() -> Self {
        Self {
            arguments: vec![COMMENT.to_string()],
            input_redirect: None,
            output_redirect: None,
            run_in_foreground: true,
        }
    }

    /// Name of the program to run; empty if `arguments` was emptied by hand.
    pub fn program(&self) -> &str {
        self.arguments.first().map_or("", String::as_str)
    }

    /// Arguments after the program name.
    pub fn args(&self) -> &[String] {
        self.arguments.get(1..).unwrap_or_default()
    }

    /// Whether the line should be skipped entirely.
    pub fn is_comment(&self) -> bool {
        self.program().starts_with(COMMENT)
    }

    pub fn with_input(mut self, path: impl Into<String>) -> Self {
        self.input_redirect = Some(path.into());
        self
    }

    pub fn with_output(mut self, path: impl Into<String>) -> Self {
        self.output_redirect = Some(path.into());
        self
    }

    pub fn in_background(mut self) -> Self {
        self.run_in_foreground = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_arguments_become_comment() {
        let cmd = Command::new(Vec::new());
        assert_eq!(cmd, Command::comment());
        assert!(cmd.is_comment());
        assert_eq!(cmd.arguments, vec!["#".to_string()]);
    }

    #[test]
    fn test_program_and_args_split() {
        let cmd = Command::new(vec!["ls".into(), "-la".into(), "/tmp".into()]);
        assert_eq!(cmd.program(), "ls");
        assert_eq!(cmd.args(), &["-la".to_string(), "/tmp".to_string()]);
        assert!(!cmd.is_comment());
        assert!(cmd.run_in_foreground);
    }

    #[test]
    fn test_leading_hash_word_is_comment() {
        let cmd = Command::new(vec!["#note".into(), "echo".into()]);
        assert!(cmd.is_comment());
    }

    #[test]
    fn test_hand_built_empty_command_does_not_panic() {
        let cmd = Command {
            arguments: Vec::new(),
            input_redirect: None,
            output_redirect: None,
            run_in_foreground: true,
        };
        assert_eq!(cmd.program(), "");
        assert!(cmd.args().is_empty());
        assert!(!cmd.is_comment());
    }
}
