//! Delivery through the host's `sendmail` program.
//!
//! Only useful on Unix-like hosts with a configured local mailer. Where the
//! program is missing every send fails with [`Error::Subprocess`].

use std::ffi::OsString;
use std::io::Write as _;
use std::process::{Command, Stdio};
use std::thread;

use tracing::{debug, warn};

use crate::address::Address;
use crate::envelope;
use crate::error::{Error, Result};

/// Program name looked up on `PATH` by default.
pub const SENDMAIL_PROGRAM: &str = "sendmail";

/// Runs a sendmail-compatible program for each message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sendmail {
    program: OsString,
}

impl Sendmail {
    /// Uses `program` instead of `sendmail`.
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Returns the program that will be run.
    #[must_use]
    pub fn program(&self) -> &std::ffi::OsStr {
        &self.program
    }

    /// Pipes the message into `<program> -F <name> -f <address> -t`.
    ///
    /// The program reads recipients from the `To:` header.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Subprocess`] if the program cannot be started, the
    /// message cannot be written to it, or it exits unsuccessfully. The
    /// error carries the program's stdout followed by its stderr.
    pub fn send<S: AsRef<str>>(
        &self,
        from: &Address,
        subject: &str,
        body: &[u8],
        to: &[S],
    ) -> Result<()> {
        let message = envelope::render(subject, body, to);
        let program = self.program.to_string_lossy();

        debug!(
            program = %program,
            from = %from.address,
            recipients = to.len(),
            "Piping message to sendmail"
        );

        let mut child = Command::new(&self.program)
            .arg("-F")
            .arg(&from.name)
            .arg("-f")
            .arg(&from.address)
            .arg("-t")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::spawn_failed(&program, &e))?;

        // Feed stdin from another thread so a chatty child cannot fill its
        // output pipes and stall while we are still writing.
        let stdin = child.stdin.take();
        let (written, output) = thread::scope(|scope| {
            let writer = scope.spawn(move || match stdin {
                Some(mut stdin) => stdin.write_all(message.as_bytes()),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(std::io::Error::other("stdin writer panicked")));
            (written, output)
        });

        let output = output.map_err(|e| Error::Subprocess {
            status: None,
            reason: format!("waiting for {program}: {e}"),
            output: String::new(),
        })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            warn!(program = %program, status = %output.status, "sendmail failed");
            return Err(Error::Subprocess {
                status: Some(output.status),
                reason: output.status.to_string(),
                output: combined,
            });
        }

        // A program that exits successfully without draining stdin is fine.
        if let Err(e) = written.or_else(|e| match e.kind() {
            std::io::ErrorKind::BrokenPipe => Ok(()),
            _ => Err(e),
        }) {
            return Err(Error::Subprocess {
                status: Some(output.status),
                reason: format!("writing message to {program}: {e}"),
                output: combined,
            });
        }

        Ok(())
    }
}

impl Default for Sendmail {
    fn default() -> Self {
        Self::new(SENDMAIL_PROGRAM)
    }
}

/// Sends through the default `sendmail` program.
///
/// # Errors
///
/// See [`Sendmail::send`].
pub fn send_unix<S: AsRef<str>>(from: &Address, subject: &str, body: &[u8], to: &[S]) -> Result<()> {
    Sendmail::default().send(from, subject, body, to)
}
