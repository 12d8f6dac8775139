//! Operator console: menus, confirmations and status lines.
//!
//! The resolver and destructive commands talk to the operator only through
//! [`Console`]. [`TerminalConsole`] renders on stderr and reads stdin;
//! tests use [`crate::test_support::ScriptedConsole`].

use std::io::{self, BufRead, IsTerminal, Write};

use thiserror::Error;

/// Maximum number of unreadable answers before a menu gives up.
const MAX_ATTEMPTS: usize = 3;

/// Errors raised by console interaction.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ConsoleError {
    /// Reading from or writing to the terminal failed.
    #[error("console I/O failed: {message}")]
    Io {
        /// Underlying I/O error text.
        message: String,
    },
    /// The operator kept giving answers that are not menu entries.
    #[error("no valid choice entered after {attempts} attempts")]
    NoValidChoice {
        /// Number of attempts made.
        attempts: usize,
    },
}

impl From<io::Error> for ConsoleError {
    fn from(err: io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

/// Interactive collaborator used for prompts.
pub trait Console {
    /// Returns `true` when the operator can be asked questions.
    fn can_prompt(&self) -> bool;

    /// Presents `options` and returns the chosen index, or `None` when the
    /// operator cancels.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError`] when the terminal cannot be used.
    fn choose(&self, message: &str, options: &[String]) -> Result<Option<usize>, ConsoleError>;

    /// Asks a yes/no question. Returns `default` without asking when prompts
    /// are unavailable.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError`] when the terminal cannot be used.
    fn confirm(&self, message: &str, default: bool) -> Result<bool, ConsoleError>;

    /// Writes a progress or status line.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError`] when the line cannot be written.
    fn status(&self, line: &str) -> Result<(), ConsoleError>;
}

/// Console on the process's stdin and stderr.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TerminalConsole {
    prompts_disabled: bool,
}

impl TerminalConsole {
    /// Creates a console. With `prompts_disabled` every question is answered
    /// with its default or refused.
    #[must_use]
    pub const fn new(prompts_disabled: bool) -> Self {
        Self { prompts_disabled }
    }
}

impl Console for TerminalConsole {
    fn can_prompt(&self) -> bool {
        !self.prompts_disabled && io::stdin().is_terminal()
    }

    fn choose(&self, message: &str, options: &[String]) -> Result<Option<usize>, ConsoleError> {
        let mut input = io::stdin().lock();
        let mut output = io::stderr().lock();
        read_choice(&mut input, &mut output, message, options)
    }

    fn confirm(&self, message: &str, default: bool) -> Result<bool, ConsoleError> {
        if !self.can_prompt() {
            return Ok(default);
        }
        let mut input = io::stdin().lock();
        let mut output = io::stderr().lock();
        read_confirmation(&mut input, &mut output, message, default)
    }

    fn status(&self, line: &str) -> Result<(), ConsoleError> {
        writeln!(io::stderr(), "{line}")?;
        Ok(())
    }
}

/// Renders a numbered menu with a trailing cancel entry and reads the answer.
///
/// # Errors
///
/// Returns [`ConsoleError::Io`] on I/O failure and
/// [`ConsoleError::NoValidChoice`] after repeated unreadable answers.
pub fn read_choice(
    input: &mut impl BufRead,
    output: &mut impl Write,
    message: &str,
    options: &[String],
) -> Result<Option<usize>, ConsoleError> {
    writeln!(output, "{message}")?;
    for (position, option) in options.iter().enumerate() {
        writeln!(output, " [{}] {option}", position.saturating_add(1))?;
    }
    let cancel = options.len().saturating_add(1);
    writeln!(output, " [{cancel}] cancel")?;

    for _ in 0..MAX_ATTEMPTS {
        write!(output, "Please enter your numeric choice:  ")?;
        output.flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        match line.trim().parse::<usize>() {
            Ok(answer) if answer == cancel => return Ok(None),
            Ok(answer) if (1..cancel).contains(&answer) => return Ok(Some(answer.saturating_sub(1))),
            _ => writeln!(output, "Please enter a value between 1 and {cancel}:")?,
        }
    }
    Err(ConsoleError::NoValidChoice {
        attempts: MAX_ATTEMPTS,
    })
}

/// Asks a yes/no question; an empty answer selects `default`.
///
/// # Errors
///
/// Returns [`ConsoleError::Io`] on I/O failure.
pub fn read_confirmation(
    input: &mut impl BufRead,
    output: &mut impl Write,
    message: &str,
    default: bool,
) -> Result<bool, ConsoleError> {
    let hint = if default { "Y/n" } else { "y/N" };
    writeln!(output, "{message}")?;
    writeln!(output)?;
    loop {
        write!(output, "Do you want to continue ({hint})?  ")?;
        output.flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(default);
        }
        match line.trim().to_ascii_lowercase().as_str() {
            "" => return Ok(default),
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => writeln!(output, "Please enter 'y' or 'n':")?,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for terminal prompt rendering.

    use std::io::Cursor;

    use super::*;
    use rstest::rstest;

    fn zones() -> Vec<String> {
        vec![String::from("us-central1-a"), String::from("europe-west1-b")]
    }

    #[rstest]
    #[case("2\n", Some(1))]
    #[case("3\n", None)]
    #[case("", None)]
    #[case("9\n1\n", Some(0))]
    fn choice_reads_numbered_answer(#[case] answers: &str, #[case] expected: Option<usize>) {
        let mut input = Cursor::new(answers.as_bytes().to_vec());
        let mut output = Vec::new();
        let choice = read_choice(&mut input, &mut output, "Pick a zone:", &zones()).expect("choice");
        assert_eq!(choice, expected);
        let rendered = String::from_utf8(output).expect("utf8");
        assert!(rendered.contains(" [1] us-central1-a"));
        assert!(rendered.contains(" [3] cancel"));
    }

    #[rstest]
    fn choice_gives_up_after_repeated_garbage() {
        let mut input = Cursor::new(b"x\ny\nz\n".to_vec());
        let mut output = Vec::new();
        let err = read_choice(&mut input, &mut output, "Pick:", &zones()).expect_err("garbage");
        assert_eq!(err, ConsoleError::NoValidChoice { attempts: 3 });
    }

    #[rstest]
    #[case("\n", true, true)]
    #[case("\n", false, false)]
    #[case("n\n", true, false)]
    #[case("maybe\nYES\n", false, true)]
    fn confirmation_honours_default(#[case] answers: &str, #[case] default: bool, #[case] expected: bool) {
        let mut input = Cursor::new(answers.as_bytes().to_vec());
        let mut output = Vec::new();
        let answer =
            read_confirmation(&mut input, &mut output, "Delete it?", default).expect("answer");
        assert_eq!(answer, expected);
    }

    #[rstest]
    fn disabled_console_returns_default_confirmation() {
        let console = TerminalConsole::new(true);
        assert!(!console.can_prompt());
        assert_eq!(console.confirm("Delete?", true), Ok(true));
        assert_eq!(console.confirm("Delete?", false), Ok(false));
    }
}
