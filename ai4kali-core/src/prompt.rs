// ai4kali-core/src/prompt.rs

//! Instruction templates sent to the model.

/// The line the model is told to print when it will not produce a command.
/// [`crate::normalize`] compares against this constant byte-for-byte.
pub const NO_COMMAND_SENTINEL: &str = r#"echo "no-command""#;

const COMMAND_TEMPLATE: &str = r#"You are a Kali Linux command generator.
The user request is:

"{query}"

Return EXACTLY ONE valid Linux command that performs this task, on a single line.
Do NOT include explanations, comments, markdown, code fences or backticks.
If the request is unclear or unsafe, return exactly: {sentinel}
"#;

const EXPLAIN_TEMPLATE: &str = r#"You are a Kali Linux expert.
Explain in a few short sentences what the following shell command does,
including what each flag means and any risk of running it.
Do not suggest a different command.

Command:
{command}
"#;

pub fn build_sentinel_line() -> &'static str {
    NO_COMMAND_SENTINEL
}

/// Embeds the user's request in the command-generation frame.
pub fn build_prompt(user_text: &str) -> String {
    COMMAND_TEMPLATE
        .replace("{sentinel}", NO_COMMAND_SENTINEL)
        .replace("{query}", user_text.trim())
}

/// Frame asking for a plain-language description of `command`.
pub fn build_explain_prompt(command: &str) -> String {
    EXPLAIN_TEMPLATE.replace("{command}", command.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_request_and_sentinel() {
        let prompt = build_prompt("  scan ports on 10.0.0.1 ");
        assert!(prompt.contains("\"scan ports on 10.0.0.1\""));
        assert!(prompt.contains(NO_COMMAND_SENTINEL));
        assert!(prompt.contains("EXACTLY ONE"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        assert_eq!(build_prompt("list files"), build_prompt("list files"));
    }

    #[test]
    fn test_placeholders_in_user_text_are_not_expanded() {
        // The sentinel is substituted before the query, so user text is inserted verbatim.
        let prompt = build_prompt("print {sentinel} literally");
        assert!(prompt.contains("\"print {sentinel} literally\""));
    }

    #[test]
    fn test_explain_prompt_differs_from_command_prompt() {
        let explain = build_explain_prompt("nmap -sV 10.10.10.10");
        assert!(explain.contains("nmap -sV 10.10.10.10"));
        assert!(!explain.contains(NO_COMMAND_SENTINEL));
        assert_ne!(explain, build_prompt("nmap -sV 10.10.10.10"));
    }
}
