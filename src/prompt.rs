//! Interactive questions asked while applying templates

use std::io::{self, BufRead, IsTerminal, Write};

use inquire::InquireError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PromptError {
    #[error("prompt interrupted")]
    Interrupted,
    #[error("prompt failed: {0}")]
    Inquire(InquireError),
    #[error("prompt I/O failed: {0}")]
    Io(#[from] io::Error),
}

impl From<InquireError> for PromptError {
    fn from(e: InquireError) -> Self {
        match e {
            InquireError::OperationInterrupted => PromptError::Interrupted,
            InquireError::IO(e) => PromptError::Io(e),
            other => PromptError::Inquire(other),
        }
    }
}

pub trait Prompter {
    /// Ask a yes/no question. Anything but an explicit yes is `false`.
    ///
    /// # Errors
    ///
    /// Returns `PromptError` if the terminal cannot be read.
    fn confirm(&mut self, message: &str) -> Result<bool, PromptError>;

    /// Ask for a line of text. `None` means end of input.
    ///
    /// # Errors
    ///
    /// Returns `PromptError` if the terminal cannot be read.
    fn input(&mut self, message: &str) -> Result<Option<String>, PromptError>;

    /// Show an informational line.
    ///
    /// # Errors
    ///
    /// Returns `PromptError::Io` if the output cannot be written.
    fn say(&mut self, message: &str) -> Result<(), PromptError>;
}

/// Prompts rendered with `inquire`, for interactive terminals
#[derive(Debug, Default)]
pub struct InquirePrompter;

impl Prompter for InquirePrompter {
    fn confirm(&mut self, message: &str) -> Result<bool, PromptError> {
        match inquire::Confirm::new(message).with_default(false).prompt() {
            Ok(answer) => Ok(answer),
            Err(InquireError::OperationCanceled) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn input(&mut self, message: &str) -> Result<Option<String>, PromptError> {
        match inquire::Text::new(message).prompt() {
            Ok(answer) => Ok(Some(answer)),
            Err(InquireError::OperationCanceled) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn say(&mut self, message: &str) -> Result<(), PromptError> {
        println!("{message}");
        Ok(())
    }
}

/// Plain line-based prompts, used when input is piped
pub struct LinePrompter<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> LinePrompter<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Consume the prompter, returning everything written to it.
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn read_line(&mut self) -> Result<Option<String>, PromptError> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

impl<R: BufRead, W: Write> Prompter for LinePrompter<R, W> {
    fn confirm(&mut self, message: &str) -> Result<bool, PromptError> {
        write!(self.writer, "{message} (y/N): ")?;
        self.writer.flush()?;
        let answer = self.read_line()?.unwrap_or_default();
        Ok(matches!(
            answer.trim().to_ascii_lowercase().as_str(),
            "y" | "yes"
        ))
    }

    fn input(&mut self, message: &str) -> Result<Option<String>, PromptError> {
        write!(self.writer, "{message} ")?;
        self.writer.flush()?;
        self.read_line()
    }

    fn say(&mut self, message: &str) -> Result<(), PromptError> {
        writeln!(self.writer, "{message}")?;
        Ok(())
    }
}

/// Prompter for the current process: `inquire` on a terminal, plain lines otherwise.
#[must_use]
pub fn interactive() -> Box<dyn Prompter> {
    if io::stdin().is_terminal() && io::stdout().is_terminal() {
        Box::new(InquirePrompter)
    } else {
        Box::new(LinePrompter::new(io::stdin().lock(), io::stdout()))
    }
}
