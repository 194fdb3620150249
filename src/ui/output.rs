//! ui::output
//!
//! GitHub Actions workflow commands.
//!
//! # Design
//!
//! The runner reads `::<command>::<data>` lines from stdout. Notices go
//! there directly. Outputs are appended to the file named by
//! `GITHUB_OUTPUT` when the runner provides one and fall back to the
//! legacy `::set-output` command otherwise. Diagnostics never go to
//! stdout; they are `tracing` events on stderr.

use std::fmt::Display;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;

use tracing::warn;

use crate::engine::Notifier;

/// Escape workflow command data so it stays on one line.
///
/// # Example
///
/// ```
/// use bufpush::ui::output::escape_data;
///
/// assert_eq!(escape_data("50%\nline two"), "50%25%0Aline two");
/// ```
pub fn escape_data(data: &str) -> String {
    data.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Format a `::notice::` line.
pub fn notice_line(message: impl Display) -> String {
    format!("::notice::{}", escape_data(&message.to_string()))
}

/// Format an `::error::` line.
pub fn error_line(message: impl Display) -> String {
    format!("::error::{}", escape_data(&message.to_string()))
}

/// Writer for workflow commands and step outputs.
#[derive(Debug)]
pub struct Workflow<W: Write> {
    out: W,
    /// File step outputs are appended to; `None` uses `::set-output`.
    output_file: Option<PathBuf>,
}

impl Workflow<io::Stdout> {
    /// Workflow writer on the process's stdout.
    pub fn stdout(output_file: Option<PathBuf>) -> Self {
        Self::new(io::stdout(), output_file)
    }
}

impl<W: Write> Workflow<W> {
    pub fn new(out: W, output_file: Option<PathBuf>) -> Self {
        Self { out, output_file }
    }

    /// Emit a notice annotation.
    pub fn notice(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.out, "{}", notice_line(message))
    }

    /// Set a step output.
    pub fn set_output(&mut self, name: &str, value: &str) -> io::Result<()> {
        match &self.output_file {
            Some(path) => {
                let mut file = OpenOptions::new().create(true).append(true).open(path)?;
                writeln!(file, "{}={}", name, value)
            }
            None => writeln!(
                self.out,
                "::set-output name={}::{}",
                name,
                escape_data(value)
            ),
        }
    }

    /// The underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Notifier for Workflow<W> {
    fn notice(&mut self, message: &str) {
        if let Err(e) = Workflow::notice(self, message) {
            warn!(error = %e, "failed to write notice");
        }
    }
}
