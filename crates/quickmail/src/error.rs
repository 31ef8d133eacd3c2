//! Error types for sending operations.

use std::io;
use std::process::ExitStatus;

/// Result type alias for quickmail operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Opaque failure reported by a [`Transport`](crate::Transport).
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// Quickmail error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed server address or unreadable credentials.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Address text could not be parsed.
    #[error("Invalid email address: {0}")]
    AddressParse(String),

    /// Message is missing something required at send time.
    #[error("{0}")]
    Validation(&'static str),

    /// SMTP collaborator failed (network, auth or server rejection).
    #[error("Transport error: {0}")]
    Transport(#[source] TransportError),

    /// The sendmail program could not be run or exited unsuccessfully.
    #[error("sendmail failed ({reason}): {output}")]
    Subprocess {
        /// Exit status, if the program ran at all.
        status: Option<ExitStatus>,
        /// What went wrong.
        reason: String,
        /// Everything the program wrote to stdout, followed by everything it
        /// wrote to stderr. The two streams are not interleaved.
        output: String,
    },

    /// I/O error while reading a message body.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Creates a subprocess error for a program that never ran.
    #[must_use]
    pub fn spawn_failed(program: &str, err: &io::Error) -> Self {
        Self::Subprocess {
            status: None,
            reason: format!("cannot run {program}: {err}"),
            output: String::new(),
        }
    }

    /// Returns true if the failure came from the SMTP collaborator.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns true if the failure came from the sendmail program.
    #[must_use]
    pub const fn is_subprocess(&self) -> bool {
        matches!(self, Self::Subprocess { .. })
    }
}
