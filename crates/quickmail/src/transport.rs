//! The SMTP collaborator seam.
//!
//! [`Mail`](crate::Mail) serializes the message itself and hands the result
//! to a [`Transport`]. [`SmtpRelay`] speaks SMTP through `lettre`;
//! [`MemoryTransport`] keeps submissions in memory.

use std::sync::Arc;
use std::time::Duration;

use lettre::Transport as _;
use lettre::address::Envelope;
use lettre::transport::smtp::SmtpTransport;
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::transport::smtp::client::{Tls, TlsParameters};
use parking_lot::Mutex;
use tracing::debug;

use crate::address::Address;
use crate::credentials::PlainAuth;
use crate::error::TransportError;
use crate::server::ServerAddr;

/// One fully serialized message on its way to a server.
#[derive(Debug, Clone, Copy)]
pub struct Submission<'a> {
    /// Server to deliver to.
    pub server: &'a ServerAddr,
    /// Authentication handle.
    pub auth: &'a PlainAuth,
    /// Sender identity. [`SmtpRelay`] uses its address as the envelope
    /// sender, since the SMTP envelope needs a mailbox rather than a name.
    pub from: &'a Address,
    /// Envelope recipients.
    pub recipients: &'a [String],
    /// Serialized headers and body.
    pub message: &'a [u8],
}

/// Delivers serialized messages.
///
/// Implementations block until the server accepted or refused the message.
pub trait Transport: Send + Sync {
    /// Sends one message.
    ///
    /// # Errors
    ///
    /// Returns whatever the underlying client reports; callers do not
    /// classify it further.
    fn submit(&self, submission: &Submission<'_>) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn submit(&self, submission: &Submission<'_>) -> Result<(), TransportError> {
        (**self).submit(submission)
    }
}

/// SMTP delivery through a fresh `lettre` connection per message.
///
/// STARTTLS is used when the server offers it, and credentials go out with
/// the PLAIN mechanism.
#[derive(Debug, Clone)]
pub struct SmtpRelay {
    timeout: Option<Duration>,
}

impl SmtpRelay {
    /// Connection and command timeout applied by default.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Creates a relay with the default timeout.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout: Some(Self::DEFAULT_TIMEOUT),
        }
    }

    /// Overrides the timeout; `None` waits forever.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Refuses credentials that belong to another host, or that ask for an
    /// authorization identity the PLAIN exchange here cannot carry.
    fn check_auth(server: &ServerAddr, auth: &PlainAuth) -> Result<(), TransportError> {
        if !auth.host.eq_ignore_ascii_case(server.host()) {
            return Err(format!(
                "wrong host name: credentials are for {:?}, server is {:?}",
                auth.host,
                server.host()
            )
            .into());
        }
        if !auth.identity.is_empty() && auth.identity != auth.username {
            return Err(format!(
                "authorization identity {:?} differs from username",
                auth.identity
            )
            .into());
        }
        Ok(())
    }

    fn client(
        &self,
        server: &ServerAddr,
        auth: &PlainAuth,
    ) -> Result<SmtpTransport, TransportError> {
        let tls = TlsParameters::new(server.host().to_string())?;
        let transport = SmtpTransport::builder_dangerous(server.host())
            .port(server.port())
            .tls(Tls::Opportunistic(tls))
            .credentials(Credentials::new(auth.username.clone(), auth.password.clone()))
            .authentication(vec![Mechanism::Plain])
            .timeout(self.timeout)
            .build();
        Ok(transport)
    }
}

impl Default for SmtpRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for SmtpRelay {
    fn submit(&self, submission: &Submission<'_>) -> Result<(), TransportError> {
        Self::check_auth(submission.server, submission.auth)?;

        let from: lettre::Address = submission.from.address.parse()?;
        let recipients = submission
            .recipients
            .iter()
            .map(|rcpt| rcpt.parse::<lettre::Address>())
            .collect::<Result<Vec<_>, _>>()?;
        let envelope = Envelope::new(Some(from), recipients)?;

        debug!(
            server = %submission.server,
            recipients = submission.recipients.len(),
            bytes = submission.message.len(),
            "Submitting message over SMTP"
        );

        let client = self.client(submission.server, submission.auth)?;
        client.send_raw(&envelope, submission.message)?;
        Ok(())
    }
}

/// An owned copy of a [`Submission`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSubmission {
    /// Server the message was addressed to.
    pub server: ServerAddr,
    /// Sender identity.
    pub from: Address,
    /// Envelope recipients.
    pub recipients: Vec<String>,
    /// Serialized headers and body.
    pub message: Vec<u8>,
}

impl RecordedSubmission {
    /// Returns the message as text.
    #[must_use]
    pub fn message_text(&self) -> String {
        String::from_utf8_lossy(&self.message).into_owned()
    }
}

/// Records submissions instead of sending them.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    submissions: Mutex<Vec<RecordedSubmission>>,
}

impl MemoryTransport {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything submitted so far.
    #[must_use]
    pub fn submissions(&self) -> Vec<RecordedSubmission> {
        self.submissions.lock().clone()
    }

    /// Returns the number of submissions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.submissions.lock().len()
    }

    /// Returns true if nothing was submitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.submissions.lock().is_empty()
    }

    /// Removes and returns everything submitted so far.
    pub fn take(&self) -> Vec<RecordedSubmission> {
        std::mem::take(&mut *self.submissions.lock())
    }
}

impl Transport for MemoryTransport {
    fn submit(&self, submission: &Submission<'_>) -> Result<(), TransportError> {
        self.submissions.lock().push(RecordedSubmission {
            server: submission.server.clone(),
            from: submission.from.clone(),
            recipients: submission.recipients.to_vec(),
            message: submission.message.to_vec(),
        });
        Ok(())
    }
}
