// ai4kali-core/src/normalize.rs

//! Turns raw model output into a single candidate command line.

use crate::prompt::NO_COMMAND_SENTINEL;

/// The command line taken from a model answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub raw_line: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    Command(Candidate),
    /// The model printed the sentinel and declined to answer.
    NoCommand,
    /// Nothing usable in the output.
    Empty,
}

/// Picks the first non-blank line that is not a markdown fence.
///
/// Inline backtick wrapping (`` `cmd` ``) is removed from the chosen line,
/// and a line that only becomes a fence once unwrapped is skipped too.
/// When several command lines are present, the first one wins.
pub fn normalize(raw: &str) -> Normalized {
    let line = raw
        .lines()
        .map(str::trim)
        .filter(|l| !is_fence(l))
        .map(strip_backticks)
        .find(|l| !l.is_empty() && !is_fence(l));

    match line {
        None => Normalized::Empty,
        Some(l) if l == NO_COMMAND_SENTINEL => Normalized::NoCommand,
        Some(l) => Normalized::Command(Candidate {
            raw_line: l.to_string(),
        }),
    }
}

fn is_fence(line: &str) -> bool {
    line.starts_with("```")
}

fn strip_backticks(mut line: &str) -> &str {
    while line.len() >= 2 && line.starts_with('`') && line.ends_with('`') {
        line = line[1..line.len() - 1].trim();
    }
    line
}

impl Normalized {
    /// Text that normalizes back to `self`. Used to check idempotence.
    pub fn as_text(&self) -> &str {
        match self {
            Normalized::Command(c) => &c.raw_line,
            Normalized::NoCommand => NO_COMMAND_SENTINEL,
            Normalized::Empty => "",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::build_sentinel_line;

    fn command(line: &str) -> Normalized {
        Normalized::Command(Candidate {
            raw_line: line.to_string(),
        })
    }

    #[test]
    fn test_first_non_blank_line_wins() {
        let raw = "\n\n   \nnmap -sV 10.10.10.10\nls -la\n";
        assert_eq!(normalize(raw), command("nmap -sV 10.10.10.10"));
    }

    #[test]
    fn test_markdown_fences_are_skipped() {
        let raw = "\n\n```bash\ngobuster dir -u http://10.0.0.5 -w words.txt\n```\n";
        assert_eq!(
            normalize(raw),
            command("gobuster dir -u http://10.0.0.5 -w words.txt")
        );
    }

    #[test]
    fn test_inline_backticks_are_stripped() {
        assert_eq!(normalize("`ping -c 3 8.8.8.8`"), command("ping -c 3 8.8.8.8"));
        assert_eq!(normalize("`` ls ``"), command("ls"));
    }

    #[test]
    fn test_command_substitution_backticks_are_kept() {
        assert_eq!(normalize("echo `whoami`"), command("echo `whoami`"));
    }

    #[test]
    fn test_sentinel_detected() {
        assert_eq!(normalize("echo \"no-command\"\n"), Normalized::NoCommand);
    }

    #[test]
    fn test_sentinel_with_surrounding_whitespace() {
        let raw = format!("\n\n   {}   \n\n", build_sentinel_line());
        assert_eq!(normalize(&raw), Normalized::NoCommand);
    }

    #[test]
    fn test_sentinel_must_match_exactly() {
        assert_eq!(
            normalize("echo 'no-command'"),
            command("echo 'no-command'")
        );
    }

    #[test]
    fn test_empty_output() {
        assert_eq!(normalize(""), Normalized::Empty);
        assert_eq!(normalize(" \n\t\n"), Normalized::Empty);
        assert_eq!(normalize("```\n```"), Normalized::Empty);
        assert_eq!(normalize("` ```foo `"), Normalized::Empty);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            "\n```sh\n  `sudo nmap -p- 10.0.0.1`  \n```",
            "echo \"no-command\"",
            "",
            "ls -la\npwd",
            "   tcpdump -i eth0   ",
            "` ```foo `",
            "` ```foo `\nwhoami",
            "```",
            "`",
        ];
        for raw in samples {
            let once = normalize(raw);
            let twice = normalize(once.as_text());
            assert_eq!(once, twice, "not idempotent for {:?}", raw);
        }
    }
}
