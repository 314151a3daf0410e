use std::fmt;
use std::io::{self, Write};

use is_terminal::IsTerminal;
use termcolor::Color::{Cyan, Green, Red, Yellow};
use termcolor::{self, Color, ColorSpec, StandardStream, WriteColor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorChoice {
    Always,
    Never,
    /// Colour only when stderr is a terminal.
    Auto,
}

impl ColorChoice {
    fn to_termcolor(self, stream: impl IsTerminal) -> termcolor::ColorChoice {
        match self {
            ColorChoice::Always => termcolor::ColorChoice::Always,
            ColorChoice::Never => termcolor::ColorChoice::Never,
            ColorChoice::Auto => {
                if stream.is_terminal() {
                    termcolor::ColorChoice::Auto
                } else {
                    termcolor::ColorChoice::Never
                }
            }
        }
    }
}

enum ShellOut {
    Write(Box<dyn Write>),
    Stream { stderr: StandardStream },
}

/// Status and diagnostic output, written to stderr.
pub struct Shell {
    output: ShellOut,
    verbosity: Verbosity,
}

impl fmt::Debug for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shell")
            .field("verbosity", &self.verbosity)
            .finish()
    }
}

impl Default for Shell {
    fn default() -> Self {
        Self::new()
    }
}

impl Shell {
    pub fn new() -> Shell {
        Shell {
            output: ShellOut::Stream {
                stderr: StandardStream::stderr(ColorChoice::Auto.to_termcolor(io::stderr())),
            },
            verbosity: Verbosity::Normal,
        }
    }

    /// A shell writing uncoloured output to `out`.
    pub fn from_write(out: Box<dyn Write>) -> Shell {
        Shell {
            output: ShellOut::Write(out),
            verbosity: Verbosity::Verbose,
        }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn set_verbosity(&mut self, verbosity: Verbosity) {
        self.verbosity = verbosity;
    }

    pub fn set_color_choice(&mut self, color: Option<&str>) -> anyhow::Result<()> {
        let choice = match color {
            Some("always") => ColorChoice::Always,
            Some("never") => ColorChoice::Never,
            Some("auto") | None => ColorChoice::Auto,
            Some(other) => anyhow::bail!(
                "argument for --color must be auto, always, or never, but found `{other}`"
            ),
        };
        if let ShellOut::Stream { stderr } = &mut self.output {
            *stderr = StandardStream::stderr(choice.to_termcolor(io::stderr()));
        }
        Ok(())
    }

    /// Runs `callback` only when verbose output is enabled.
    pub fn verbose<F>(&mut self, mut callback: F) -> anyhow::Result<()>
    where
        F: FnMut(&mut Shell) -> anyhow::Result<()>,
    {
        match self.verbosity {
            Verbosity::Verbose | Verbosity::VeryVerbose => callback(self),
            _ => Ok(()),
        }
    }

    pub fn very_verbose<F>(&mut self, mut callback: F) -> anyhow::Result<()>
    where
        F: FnMut(&mut Shell) -> anyhow::Result<()>,
    {
        match self.verbosity {
            Verbosity::VeryVerbose => callback(self),
            _ => Ok(()),
        }
    }

    pub fn status<T, U>(&mut self, status: T, message: U) -> anyhow::Result<()>
    where
        T: fmt::Display,
        U: fmt::Display,
    {
        self.status_with_color(status, message, Green)
    }

    pub fn status_with_color<T, U>(
        &mut self,
        status: T,
        message: U,
        color: Color,
    ) -> anyhow::Result<()>
    where
        T: fmt::Display,
        U: fmt::Display,
    {
        match self.verbosity {
            Verbosity::Quiet => Ok(()),
            _ => self.print(&status, Some(&message), color, true),
        }
    }

    pub fn error<T: fmt::Display>(&mut self, message: T) -> anyhow::Result<()> {
        self.print(&"error", Some(&message), Red, false)
    }

    pub fn warn<T: fmt::Display>(&mut self, message: T) -> anyhow::Result<()> {
        match self.verbosity {
            Verbosity::Quiet => Ok(()),
            _ => self.print(&"warning", Some(&message), Yellow, false),
        }
    }

    pub fn note<T: fmt::Display>(&mut self, message: T) -> anyhow::Result<()> {
        self.print(&"note", Some(&message), Cyan, false)
    }

    fn print(
        &mut self,
        status: &dyn fmt::Display,
        message: Option<&dyn fmt::Display>,
        color: Color,
        justified: bool,
    ) -> anyhow::Result<()> {
        match &mut self.output {
            ShellOut::Write(w) => {
                if justified {
                    write!(w, "{status:>12}")?;
                } else {
                    write!(w, "{status}:")?;
                }
                match message {
                    Some(message) => writeln!(w, " {message}")?,
                    None => writeln!(w)?,
                }
            }
            ShellOut::Stream { stderr } => {
                stderr.reset()?;
                stderr.set_color(ColorSpec::new().set_bold(true).set_fg(Some(color)))?;
                if justified {
                    write!(stderr, "{status:>12}")?;
                } else {
                    write!(stderr, "{status}")?;
                    stderr.set_color(ColorSpec::new().set_bold(true))?;
                    write!(stderr, ":")?;
                }
                stderr.reset()?;
                match message {
                    Some(message) => writeln!(stderr, " {message}")?,
                    None => writeln!(stderr)?,
                }
            }
        }
        Ok(())
    }
}
