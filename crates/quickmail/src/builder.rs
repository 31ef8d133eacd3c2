//! Fluent message builder backed by pooled storage.

use std::io::Read;

use tracing::trace;

use crate::address::Address;
use crate::error::Result;
use crate::mail::Mail;
use crate::pool::Draft;

/// Accumulates one message, obtained from [`Mail::subject`].
///
/// Setters return `&mut Self`, so a message can be written as one chain:
///
/// ```ignore
/// mail.subject("Hello")
///     .body_string("<p>Hi</p>")
///     .to(["a@example.com"])
///     .send()?;
/// ```
///
/// Nothing is validated until [`send`](Self::send) or
/// [`send_unix`](Self::send_unix). After either call the fields are cleared
/// and the storage goes back to the pool, whether the send worked or not.
/// Setting anything afterwards starts a new, empty message. Call
/// [`mark_singleton`](Self::mark_singleton) first to keep the fields and the
/// storage for repeated sends.
pub struct Builder<'m> {
    mail: &'m Mail,
    draft: Option<Box<Draft>>,
}

impl<'m> Builder<'m> {
    pub(crate) fn acquire(mail: &'m Mail) -> Self {
        trace!("Acquiring message builder");
        Self {
            mail,
            draft: Some(mail.pool().acquire()),
        }
    }

    /// The draft, fetching fresh storage if the last send released it.
    fn draft(&mut self) -> &mut Draft {
        let mail = self.mail;
        self.draft.get_or_insert_with(|| mail.pool().acquire())
    }

    /// Keeps this builder's fields and storage across sends.
    pub fn mark_singleton(&mut self) -> &mut Self {
        self.draft().singleton = true;
        self
    }

    /// Sets the from header. Optional; [`Mail::default_from`] is used
    /// otherwise.
    pub fn from(&mut self, name: impl Into<String>, address: impl Into<String>) -> &mut Self {
        self.draft().from = Some(Address::new(name, address));
        self
    }

    /// Sets the from header from a parsed address.
    pub fn from_address(&mut self, address: Address) -> &mut Self {
        self.draft().from = Some(address);
        self
    }

    /// Sets the subject.
    pub fn subject(&mut self, subject: &str) -> &mut Self {
        let draft = self.draft();
        draft.subject.clear();
        draft.subject.push_str(subject);
        self
    }

    /// Replaces the body.
    pub fn body(&mut self, body: impl AsRef<[u8]>) -> &mut Self {
        let draft = self.draft();
        draft.body.clear();
        draft.body.extend_from_slice(body.as_ref());
        self
    }

    /// Appends to the body.
    pub fn append_body(&mut self, data: impl AsRef<[u8]>) -> &mut Self {
        self.draft().body.extend_from_slice(data.as_ref());
        self
    }

    /// Replaces the body with text.
    pub fn body_string(&mut self, body: &str) -> &mut Self {
        self.body(body)
    }

    /// Replaces the body with everything `reader` yields. The reader is left
    /// open.
    ///
    /// # Errors
    ///
    /// Returns the read error; the body is left as it was.
    pub fn body_reader<R: Read + ?Sized>(&mut self, reader: &mut R) -> Result<&mut Self> {
        let mut body = Vec::new();
        reader.read_to_end(&mut body)?;
        Ok(self.body(body))
    }

    /// Like [`body_reader`](Self::body_reader) but takes the reader and
    /// closes it by dropping it once the body is read.
    ///
    /// # Errors
    ///
    /// Returns the read error; the body is left as it was.
    pub fn body_read_closer<R: Read>(&mut self, mut reader: R) -> Result<&mut Self> {
        let mut body = Vec::new();
        reader.read_to_end(&mut body)?;
        drop(reader);
        Ok(self.body(body))
    }

    /// Adds recipients. Can be called many times.
    pub fn to<I>(&mut self, recipients: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.draft()
            .recipients
            .extend(recipients.into_iter().map(Into::into));
        self
    }

    /// Sends through the sender's SMTP transport, then recycles the builder
    /// unless it is a singleton.
    ///
    /// # Errors
    ///
    /// Whatever [`Mail::send`] returns.
    pub fn send(&mut self) -> Result<()> {
        let mail = self.mail;
        let draft = self.resolve_from();
        let result = mail.send(
            draft.from.as_ref(),
            &draft.subject,
            &draft.body,
            &draft.recipients,
        );
        self.finish();
        result
    }

    /// Sends through the sender's sendmail program, then recycles the
    /// builder unless it is a singleton.
    ///
    /// # Errors
    ///
    /// Whatever [`Sendmail::send`](crate::Sendmail::send) returns.
    pub fn send_unix(&mut self) -> Result<()> {
        let mail = self.mail;
        let draft = self.resolve_from();
        let from = draft.from.as_ref().unwrap_or(&mail.default_from);
        let result = mail
            .sendmail()
            .send(from, &draft.subject, &draft.body, &draft.recipients);
        self.finish();
        result
    }

    /// Fills in the default from address; it sticks on singletons.
    fn resolve_from(&mut self) -> &Draft {
        let mail = self.mail;
        let draft = self.draft();
        if draft.from.is_none() {
            draft.from = Some(mail.default_from.clone());
        }
        draft
    }

    fn finish(&mut self) {
        if self.draft.as_ref().is_some_and(|d| d.singleton) {
            return;
        }
        if let Some(draft) = self.draft.take() {
            self.mail.pool().release(draft);
        }
    }

    /// Current subject.
    #[must_use]
    pub fn current_subject(&self) -> &str {
        self.draft.as_ref().map(|d| d.subject.as_str()).unwrap_or_default()
    }

    /// Current body.
    #[must_use]
    pub fn current_body(&self) -> &[u8] {
        self.draft.as_ref().map(|d| d.body.as_slice()).unwrap_or_default()
    }

    /// Current recipients.
    #[must_use]
    pub fn current_recipients(&self) -> &[String] {
        self.draft
            .as_ref()
            .map(|d| d.recipients.as_slice())
            .unwrap_or_default()
    }

    /// Current from address, if one was set or resolved.
    #[must_use]
    pub fn current_from(&self) -> Option<&Address> {
        self.draft.as_ref().and_then(|d| d.from.as_ref())
    }

    /// Returns true if [`mark_singleton`](Self::mark_singleton) was called.
    #[must_use]
    pub fn is_singleton(&self) -> bool {
        self.draft.as_ref().is_some_and(|d| d.singleton)
    }

    /// Returns true while the builder owns pooled storage.
    #[must_use]
    pub const fn holds_storage(&self) -> bool {
        self.draft.is_some()
    }
}

impl Drop for Builder<'_> {
    fn drop(&mut self) {
        if let Some(draft) = self.draft.take() {
            self.mail.pool().release(draft);
        }
    }
}

impl std::fmt::Debug for Builder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder")
            .field("from", &self.current_from())
            .field("subject", &self.current_subject())
            .field("body_len", &self.current_body().len())
            .field("recipients", &self.current_recipients())
            .field("singleton", &self.is_singleton())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::credentials::Credentials;
    use crate::pool::BuilderPool;
    use crate::transport::MemoryTransport;

    fn mail() -> (Mail, Arc<MemoryTransport>, Arc<BuilderPool>) {
        let transport = Arc::new(MemoryTransport::new());
        let pool = Arc::new(BuilderPool::new());
        let mail = Mail::new(Credentials::new("smtp.example.com", "u", "p"))
            .unwrap()
            .with_transport(Arc::clone(&transport))
            .with_pool(Arc::clone(&pool));
        (mail, transport, pool)
    }

    fn storage(builder: &Builder<'_>) -> *const Draft {
        builder.draft.as_deref().map(std::ptr::from_ref).unwrap()
    }

    #[test]
    fn test_send_recycles_storage() {
        let (mail, transport, pool) = mail();

        let mut first = mail.subject("S");
        first.to(["a@x.com"]).body_string("hi").from("n", "n@x.com");
        let ptr = storage(&first);

        first.send().unwrap();
        assert!(!first.holds_storage());
        assert_eq!(pool.idle(), 1);
        assert_eq!(transport.len(), 1);

        let second = mail.subject("");
        assert_eq!(storage(&second), ptr);
        assert_eq!(second.current_subject(), "");
        assert!(second.current_body().is_empty());
        assert!(second.current_recipients().is_empty());
        assert!(second.current_from().is_none());
        assert!(!second.is_singleton());
    }

    #[test]
    fn test_failed_send_still_recycles() {
        let (mail, transport, pool) = mail();

        let mut builder = mail.subject("S");
        builder.from("Name Only", "").to(["a@x.com"]);
        assert!(builder.send().is_err());
        assert!(transport.is_empty());
        assert!(!builder.holds_storage());
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn test_reuse_after_send_starts_empty() {
        let (mail, transport, _) = mail();

        let mut builder = mail.subject("first");
        builder.to(["a@x.com"]).send().unwrap();

        builder.to(["b@x.com"]).send().unwrap();
        let sent = transport.take();
        assert_eq!(sent[1].recipients, ["b@x.com"]);
        assert!(sent[1].message_text().contains("Subject: \r\n"));
    }

    #[test]
    fn test_singleton_keeps_fields_and_storage() {
        let (mail, transport, pool) = mail();

        let mut builder = mail.subject("S");
        builder.mark_singleton().to(["a@x.com"]).body_string("hi");
        let ptr = storage(&builder);

        builder.send().unwrap();
        builder.send().unwrap();

        assert_eq!(storage(&builder), ptr);
        assert_eq!(pool.idle(), 0);
        assert!(builder.is_singleton());
        assert_eq!(builder.current_subject(), "S");
        assert_eq!(builder.current_body(), b"hi");
        assert_eq!(builder.current_recipients(), ["a@x.com"]);
        assert_eq!(builder.current_from(), Some(&mail.default_from));
        assert_eq!(transport.len(), 2);
    }

    #[test]
    fn test_drop_returns_storage() {
        let (mail, _, pool) = mail();
        {
            let mut builder = mail.subject("S");
            builder.mark_singleton();
        }
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn test_append_body() {
        let (mail, _, _) = mail();
        let mut builder = mail.subject("S");
        builder.append_body("ab").append_body(b"cd");
        assert_eq!(builder.current_body(), b"abcd");

        builder.body("x");
        assert_eq!(builder.current_body(), b"x");
    }

    #[test]
    fn test_body_reader_leaves_reader_usable() {
        let (mail, _, _) = mail();
        let mut reader = std::io::Cursor::new(b"from a reader".to_vec());
        let mut builder = mail.subject("S");
        builder.body_reader(&mut reader).unwrap();
        assert_eq!(builder.current_body(), b"from a reader");
        assert_eq!(reader.position(), 13);
    }

    #[test]
    fn test_body_read_closer() {
        let (mail, _, _) = mail();
        let mut builder = mail.subject("S");
        builder
            .body_read_closer(&b"owned"[..])
            .unwrap()
            .to(["a@x.com"]);
        assert_eq!(builder.current_body(), b"owned");
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("boom"))
        }
    }

    #[test]
    fn test_body_reader_error_leaves_body() {
        let (mail, _, _) = mail();
        let mut builder = mail.subject("S");
        builder.body_string("kept");

        assert!(builder.body_reader(&mut Broken).is_err());
        assert!(builder.body_read_closer(Broken).is_err());
        assert_eq!(builder.current_body(), b"kept");
    }

    #[test]
    fn test_to_appends() {
        let (mail, _, _) = mail();
        let mut builder = mail.subject("S");
        builder.to(["a@x.com"]).to(vec![String::from("b@x.com"), String::from("c@x.com")]);
        assert_eq!(builder.current_recipients(), ["a@x.com", "b@x.com", "c@x.com"]);
    }
}
