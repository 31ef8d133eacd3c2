//! The sender.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::address::Address;
use crate::builder::Builder;
use crate::credentials::{Credentials, PlainAuth};
use crate::envelope;
use crate::error::{Error, Result};
use crate::pool::BuilderPool;
use crate::sendmail::Sendmail;
use crate::server::ServerAddr;
use crate::transport::{SmtpRelay, Submission, Transport};

/// Sends e-mail through one SMTP server.
///
/// Build it once from [`Credentials`] and share it; every method takes
/// `&self`.
///
/// ```ignore
/// let mail = Mail::new(Credentials::new("smtp.example.com:587", "apikey", "secret"))?;
///
/// mail.subject("Hello subject")
///     .body_string("<h1>Hello</h1>")
///     .to(["one@example.com", "two@example.com"])
///     .from("FromName", "from@example.com")
///     .send()?;
/// ```
pub struct Mail {
    addr: ServerAddr,
    /// Sender used when a message has no explicit from address:
    /// `username <username@host>`.
    pub default_from: Address,
    /// Authentication handed to the transport, PLAIN over the credentials
    /// by default.
    pub auth: PlainAuth,
    transport: Arc<dyn Transport>,
    pool: Arc<BuilderPool>,
    sendmail: Sendmail,
}

impl Mail {
    /// Creates a sender from credentials.
    ///
    /// No connection is made here.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `credentials.addr` is not a valid
    /// `host[:port]`.
    pub fn new(credentials: Credentials) -> Result<Self> {
        let Credentials {
            addr,
            username,
            password,
        } = credentials;

        let addr = ServerAddr::parse(&addr)?;
        let host = addr.host().to_string();

        debug!(server = %addr, username = %username, "Creating mail sender");

        Ok(Self {
            default_from: Address::new(username.clone(), format!("{username}@{host}")),
            auth: PlainAuth::new(username, password, host),
            addr,
            transport: Arc::new(SmtpRelay::new()),
            pool: BuilderPool::global(),
            sendmail: Sendmail::default(),
        })
    }

    /// Replaces the SMTP transport.
    #[must_use]
    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    /// Gives builders from this sender their own pool instead of the global
    /// one.
    #[must_use]
    pub fn with_pool(mut self, pool: Arc<BuilderPool>) -> Self {
        self.pool = pool;
        self
    }

    /// Replaces the program used by [`Builder::send_unix`].
    #[must_use]
    pub fn with_sendmail(mut self, sendmail: Sendmail) -> Self {
        self.sendmail = sendmail;
        self
    }

    /// Returns the normalized server address.
    #[must_use]
    pub const fn server(&self) -> &ServerAddr {
        &self.addr
    }

    /// Returns the pool builders are taken from.
    #[must_use]
    pub const fn pool(&self) -> &Arc<BuilderPool> {
        &self.pool
    }

    /// Returns the sendmail program used by builders.
    #[must_use]
    pub const fn sendmail(&self) -> &Sendmail {
        &self.sendmail
    }

    /// Sends a message. The body may be HTML.
    ///
    /// `from` falls back to [`Mail::default_from`] when `None`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the from address is empty, and
    /// [`Error::Transport`] with the transport's error otherwise.
    pub fn send<S: AsRef<str>>(
        &self,
        from: Option<&Address>,
        subject: &str,
        body: &[u8],
        to: &[S],
    ) -> Result<()> {
        let from = from.unwrap_or(&self.default_from);
        if from.address.is_empty() {
            return Err(Error::Validation("from address is required"));
        }

        let message = envelope::render_with_from(from, subject, body, to);
        let recipients: Vec<String> = to.iter().map(|r| r.as_ref().to_string()).collect();

        self.transport
            .submit(&Submission {
                server: &self.addr,
                auth: &self.auth,
                from,
                recipients: &recipients,
                message: message.as_bytes(),
            })
            .map_err(Error::Transport)
    }

    /// Starts a message with `subject`.
    ///
    /// The returned builder's storage comes from the pool.
    #[must_use]
    pub fn subject(&self, subject: &str) -> Builder<'_> {
        let mut builder = Builder::acquire(self);
        builder.subject(subject);
        builder
    }
}

impl fmt::Debug for Mail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mail")
            .field("addr", &self.addr)
            .field("default_from", &self.default_from)
            .field("auth", &self.auth)
            .field("sendmail", &self.sendmail)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::encoding::decode_base64;
    use crate::error::TransportError;
    use crate::server::DEFAULT_SMTP_PORT;
    use crate::transport::MemoryTransport;

    fn mail() -> (Mail, Arc<MemoryTransport>) {
        let transport = Arc::new(MemoryTransport::new());
        let mail = Mail::new(Credentials::new("smtp.example.com", "u", "p"))
            .unwrap()
            .with_transport(Arc::clone(&transport))
            .with_pool(Arc::new(BuilderPool::new()));
        (mail, transport)
    }

    #[test]
    fn test_default_port_and_from() {
        let (mail, _) = mail();
        assert_eq!(mail.server().port(), DEFAULT_SMTP_PORT);
        assert_eq!(mail.default_from, Address::new("u", "u@smtp.example.com"));
        assert_eq!(mail.auth.host, "smtp.example.com");
        assert_eq!(mail.auth.username, "u");
    }

    #[test]
    fn test_explicit_port_kept_out_of_from() {
        let mail = Mail::new(Credentials::new("smtp.sendgrid.net:587", "apikey", "k")).unwrap();
        assert_eq!(mail.server().port(), 587);
        assert_eq!(mail.default_from.address, "apikey@smtp.sendgrid.net");
    }

    #[test]
    fn test_bad_server_address() {
        let err = Mail::new(Credentials::new("a:b:c", "u", "p")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_empty_from_address_is_rejected_before_transport() {
        let (mail, transport) = mail();
        let from = Address::new("Name Only", "");
        let err = mail.send(Some(&from), "S", b"hi", &["a@x.com"]).unwrap_err();
        assert!(matches!(err, Error::Validation("from address is required")));
        assert!(transport.is_empty());
    }

    #[test]
    fn test_direct_send() {
        let (mail, transport) = mail();
        let from = Address::new("FromName", "from@example.com");
        mail.send(Some(&from), "Hello subject", b"<h1>Hello</h1>", &["a@x.com", "b@x.com"])
            .unwrap();

        let sent = transport.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].from, from);
        assert_eq!(sent[0].recipients, ["a@x.com", "b@x.com"]);

        let text = sent[0].message_text();
        assert!(text.starts_with("From: FromName <from@example.com>\r\nTo: a@x.com,b@x.com\r\n"));
        assert!(text.contains("Subject: Hello subject\r\n"));
        let body = envelope::body_section(&text).unwrap();
        assert_eq!(decode_base64(body).unwrap(), b"<h1>Hello</h1>");
    }

    #[test]
    fn test_direct_send_without_from_uses_default() {
        let (mail, transport) = mail();
        mail.send(None, "S", b"", &["a@x.com"]).unwrap();
        assert_eq!(transport.take()[0].from, mail.default_from);
    }

    #[test]
    fn test_overridden_default_from() {
        let (mut mail, transport) = mail();
        mail.default_from = Address::new("Example", "example@example.com");
        mail.send::<&str>(None, "S", b"", &[]).unwrap();
        assert_eq!(transport.take()[0].from.address, "example@example.com");
    }

    #[test]
    fn test_transport_error_surfaces_verbatim() {
        struct Refusing;

        impl Transport for Refusing {
            fn submit(&self, _: &Submission<'_>) -> std::result::Result<(), TransportError> {
                Err("550 mailbox unavailable".into())
            }
        }

        let mail = Mail::new(Credentials::new("smtp.example.com", "u", "p"))
            .unwrap()
            .with_transport(Refusing);
        let err = mail.send(None, "S", b"hi", &["a@x.com"]).unwrap_err();
        assert!(err.is_transport());
        assert!(!err.is_subprocess());
        match err {
            Error::Transport(inner) => assert_eq!(inner.to_string(), "550 mailbox unavailable"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_swapped_auth_host_is_refused() {
        let mut mail = Mail::new(Credentials::new("127.0.0.1:1", "u", "p")).unwrap();
        mail.auth.host = "smtp.other.org".into();
        let err = mail.send(None, "S", b"hi", &["a@x.com"]).unwrap_err();
        assert!(err.is_transport());
        assert!(err.to_string().contains("wrong host name"));
    }
}
