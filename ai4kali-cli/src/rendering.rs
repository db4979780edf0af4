// ai4kali-cli/src/rendering.rs
use lazy_static::lazy_static;
use syntect::{
    easy::HighlightLines,
    highlighting::ThemeSet,
    parsing::SyntaxSet,
    util::as_24_bit_terminal_escaped,
};
use termimad::{crossterm::style::Color, MadSkin};
use tracing::debug;

const THEME_NAME: &str = "base16-ocean.dark";

lazy_static! {
    static ref SYNTAX_SET: SyntaxSet = SyntaxSet::load_defaults_newlines();
    static ref THEME_SET: ThemeSet = ThemeSet::load_defaults();
}

/// Colours a one-line shell command. Plain text when colours are off.
pub fn highlight_command(command: &str) -> String {
    if !colored::control::SHOULD_COLORIZE.should_colorize() {
        return command.to_string();
    }
    let Some(theme) = THEME_SET.themes.get(THEME_NAME) else {
        return command.to_string();
    };
    let syntax = SYNTAX_SET
        .find_syntax_by_token("bash")
        .unwrap_or_else(|| SYNTAX_SET.find_syntax_plain_text());

    let mut highlighter = HighlightLines::new(syntax, theme);
    match highlighter.highlight_line(command, &SYNTAX_SET) {
        Ok(ranges) => format!("{}\x1b[0m", as_24_bit_terminal_escaped(&ranges, false)),
        Err(e) => {
            debug!("Failed to highlight command: {}", e);
            command.to_string()
        }
    }
}

fn create_skin() -> MadSkin {
    let mut skin = MadSkin::default();
    skin.inline_code.set_fg(Color::Cyan);
    skin.inline_code.set_bg(Color::Reset);
    skin.code_block.set_fg(Color::Reset);
    skin.code_block.set_bg(Color::Reset);
    skin
}

/// Prints the model's explanation, which usually contains light markdown.
pub fn print_explanation(markdown_text: &str) {
    if colored::control::SHOULD_COLORIZE.should_colorize() {
        create_skin().print_text(markdown_text);
    } else {
        println!("{}", markdown_text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip_ansi(text: &str) -> String {
        let mut out = String::new();
        let mut chars = text.chars();
        while let Some(c) = chars.next() {
            if c == '\x1b' {
                for c in chars.by_ref() {
                    if c == 'm' {
                        break;
                    }
                }
            } else {
                out.push(c);
            }
        }
        out
    }

    #[test]
    fn test_highlight_keeps_command_text() {
        colored::control::set_override(true);
        let coloured = highlight_command("nmap -sV 10.10.10.10 | tee scan.txt");
        colored::control::set_override(false);
        let plain = highlight_command("ls -la");
        colored::control::unset_override();

        assert_eq!(strip_ansi(&coloured), "nmap -sV 10.10.10.10 | tee scan.txt");
        assert_eq!(plain, "ls -la");
    }
}
