//! Message serialization.
//!
//! Every message is a single HTML part sent as base64:
//!
//! ```text
//! To: a@example.com,b@example.com\r\n
//! Subject: Hello\r\n
//! MIME-Version: 1.0\r\n
//! Content-Type: text/html; charset=utf-8\r\n
//! Content-Transfer-Encoding: base64\r\n
//! \r\n
//! PGgxPkhlbGxvPC9oMT4=
//! ```
//!
//! The encoded body is one line with no trailing CRLF. The SMTP path puts a
//! `From:` header in front; the sendmail path leaves it to the program.

use crate::address::Address;
use crate::encoding::encode_base64;

/// `MIME-Version` header value.
pub const MIME_VERSION: &str = "1.0";

/// `Content-Type` header value.
pub const CONTENT_TYPE_HTML: &str = "text/html; charset=utf-8";

/// `Content-Transfer-Encoding` header value.
pub const CONTENT_TRANSFER_ENCODING: &str = "base64";

/// Appends the headers and the encoded body to `out`.
pub fn write_envelope<S: AsRef<str>>(out: &mut String, subject: &str, body: &[u8], to: &[S]) {
    out.push_str("To: ");
    for (i, rcpt) in to.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(rcpt.as_ref());
    }
    out.push_str("\r\n");

    push_header(out, "Subject", subject);
    push_header(out, "MIME-Version", MIME_VERSION);
    push_header(out, "Content-Type", CONTENT_TYPE_HTML);
    push_header(out, "Content-Transfer-Encoding", CONTENT_TRANSFER_ENCODING);
    out.push_str("\r\n");
    out.push_str(&encode_base64(body));
}

fn push_header(out: &mut String, name: &str, value: &str) {
    out.push_str(name);
    out.push_str(": ");
    out.push_str(value);
    out.push_str("\r\n");
}

/// Serializes the envelope without a `From:` header.
#[must_use]
pub fn render<S: AsRef<str>>(subject: &str, body: &[u8], to: &[S]) -> String {
    let mut out = String::with_capacity(192 + body.len() * 4 / 3);
    write_envelope(&mut out, subject, body, to);
    out
}

/// Serializes the envelope behind a `From:` header.
#[must_use]
pub fn render_with_from<S: AsRef<str>>(
    from: &Address,
    subject: &str,
    body: &[u8],
    to: &[S],
) -> String {
    let mut out = String::with_capacity(256 + body.len() * 4 / 3);
    push_header(&mut out, "From", &from.to_string());
    write_envelope(&mut out, subject, body, to);
    out
}

/// Pulls the encoded body back out of a serialized envelope.
///
/// Returns `None` if there is no blank line separating headers and body.
#[must_use]
pub fn body_section(envelope: &str) -> Option<&str> {
    envelope.split_once("\r\n\r\n").map(|(_, body)| body)
}
