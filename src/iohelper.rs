/**
 * Helper functions for input and output.
 *
 * Author:  Ian Fisher (iafisher@fastmail.com)
 * Version: October 2019
 */
use colored::*;
use std::io::Write;

use rustyline::error::ReadlineError;
use rustyline::Editor;

use super::common::{QuizError, Result};

#[macro_export]
macro_rules! my_println {
    ($($arg:tt)*) => (
        writeln!(std::io::stdout(), $($arg)*).map_err(QuizError::Io)
    );
}

#[macro_export]
macro_rules! my_print {
    ($($arg:tt)*) => (
        write!(std::io::stdout(), $($arg)*).map_err(QuizError::Io)
    );
}


const LETTERS: &str = "abcdefghijklmnopqrstuvwxyz";


/// Read lines until the user enters one with at least one non-whitespace character,
/// and return it trimmed. Ctrl+D gives `Ok(None)`; Ctrl+C gives
/// `Err(QuizError::ReadlineInterrupted)`.
pub fn prompt(editor: &mut Editor<()>, message: &str) -> Result<Option<String>> {
    loop {
        match editor.readline(message) {
            Ok(response) => {
                let response = response.trim();
                if !response.is_empty() {
                    editor.add_history_entry(response);
                    return Ok(Some(response.to_string()));
                }
            },
            Err(ReadlineError::Interrupted) => {
                return Err(QuizError::ReadlineInterrupted);
            },
            Err(ReadlineError::Eof) => {
                return Ok(None);
            },
            Err(ReadlineError::Io(err)) => {
                return Err(QuizError::Io(err));
            },
            Err(_) => {},
        }
    }
}


/// The letter that labels the choice at `index`, if there is one.
pub fn letter(index: usize) -> Option<char> {
    LETTERS.chars().nth(index)
}


/// Interpret `response` as one of `n` lettered choices.
pub fn parse_letter(response: &str, n: usize) -> Option<usize> {
    let mut chars = response.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => {
            let c = c.to_ascii_lowercase();
            LETTERS.chars().take(n).position(|l| l == c)
        },
        _ => None,
    }
}


/// Print `message` to standard output, breaking lines according to the current width
/// of the terminal. Prepend `prefix` to the first line and indent all subsequent lines
/// by its length.
pub fn prettyprint(message: &str, prefix: &str) -> Result<()> {
    prettyprint_colored(message, prefix, None, None)
}

pub fn prettyprint_colored(
    message: &str,
    prefix: &str,
    message_color: Option<Color>,
    prefix_color: Option<Color>,
) -> Result<()> {
    let width = textwrap::termwidth().saturating_sub(prefix.len()).max(20);
    let indent = " ".repeat(prefix.len());
    for (i, line) in textwrap::wrap_iter(message, width).enumerate() {
        let lead = if i == 0 { color_optional(prefix, prefix_color) } else { indent.normal() };
        my_println!("{}{}", lead, color_optional(&line, message_color))?;
    }
    Ok(())
}

fn color_optional(text: &str, color: Option<Color>) -> ColoredString {
    match color {
        Some(color) => text.color(color),
        None => text.normal(),
    }
}
