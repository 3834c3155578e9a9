//! `$$` expansion, applied to the raw line before it is parsed.

use std::borrow::Cow;

/// The only placeholder the shell understands.
pub const PID_TOKEN: &str = "$$";

/// Replace every `$$` in `input` with the id of the running shell.
pub fn expand(input: &str) -> Cow<'_, str> {
    expand_pid(input, std::process::id())
}

/// Replace every non-overlapping `$$` in `input` with `pid`, scanning left to
/// right.
///
/// Returns the input borrowed when there is nothing to replace. A lone `$` is
/// left alone, and `$$$` becomes the pid followed by a single `$`.
pub fn expand_pid(input: &str, pid: u32) -> Cow<'_, str> {
    if !input.contains(PID_TOKEN) {
        return Cow::Borrowed(input);
    }
    Cow::Owned(input.replace(PID_TOKEN, &pid.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_token_is_borrowed() {
        let out = expand_pid("echo $HOME costs $5", 4242);
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(out, "echo $HOME costs $5");
    }

    #[test]
    fn test_single_and_many_tokens() {
        assert_eq!(expand_pid("echo $$", 77), "echo 77");
        assert_eq!(
            expand_pid("touch f$$.txt; ls $$", 123),
            "touch f123.txt; ls 123"
        );
    }

    #[test]
    fn test_adjacent_tokens_expand_separately() {
        assert_eq!(expand_pid("$$$$", 9), "99");
        assert_eq!(expand_pid("$$$", 9), "9$");
        assert_eq!(expand_pid("a$$$$$b", 10), "a1010$b");
    }

    #[test]
    fn test_length_grows_by_pid_digits() {
        let pid = 31337u32;
        let input = "x $$ y $$$$ z";
        let k = input.matches(PID_TOKEN).count();
        let out = expand_pid(input, pid);
        let digits = pid.to_string().len();
        assert_eq!(out.len(), input.len() + k * digits - k * 2);
    }

    #[test]
    fn test_expand_uses_own_pid() {
        let out = expand("kill $$");
        assert_eq!(out, format!("kill {}", std::process::id()));
    }
}
