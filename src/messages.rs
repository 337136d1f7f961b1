use std::io::IsTerminal;

use anstyle::{AnsiColor, Reset, RgbColor, Style};

const ACCENT: Style = Style::new().fg_color(Some(anstyle::Color::Rgb(RgbColor(207, 106, 76))));
const SUCCESS_COLOR: Style = Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::Green)));
const ERROR_COLOR: Style = Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::Red)));
const DIM: Style = Style::new().dimmed();

/// Status line formatting; escape codes are only emitted for terminals.
#[derive(Debug, Clone, Copy)]
pub struct Painter {
    color: bool,
}

impl Painter {
    #[must_use]
    pub fn stdout() -> Self {
        Self {
            color: std::io::stdout().is_terminal(),
        }
    }

    #[must_use]
    pub fn stderr() -> Self {
        Self {
            color: std::io::stderr().is_terminal(),
        }
    }

    #[must_use]
    pub fn plain() -> Self {
        Self { color: false }
    }

    fn paint(self, style: Style, s: &str) -> String {
        if self.color {
            format!("{style}{s}{Reset}")
        } else {
            s.to_string()
        }
    }

    #[must_use]
    pub fn arrow(self, message: &str) -> String {
        format!("{} {message}", self.paint(ACCENT, "❱"))
    }

    #[must_use]
    pub fn success(self, message: &str) -> String {
        format!("{} {message}", self.paint(SUCCESS_COLOR, "✓"))
    }

    #[must_use]
    pub fn failure(self, message: &str) -> String {
        format!("{} {message}", self.paint(ERROR_COLOR, "✘"))
    }

    #[must_use]
    pub fn dim(self, message: &str) -> String {
        self.paint(DIM, message)
    }
}
