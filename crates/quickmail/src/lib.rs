//! # quickmail
//!
//! A small e-mail sender: SMTP through a pluggable transport, or the local
//! `sendmail` program.
//!
//! ## Features
//!
//! - **One-call sends**: [`Mail::send`] with from, subject, body and
//!   recipients
//! - **Fluent builder**: [`Mail::subject`] returns a [`Builder`] whose storage
//!   is pooled and recycled after each send
//! - **Singleton builders**: keep a builder's fields for repeated sends
//! - **sendmail**: [`send_unix`] and [`Builder::send_unix`] pipe the message
//!   to `sendmail -t` on Unix-like hosts
//! - **Credentials files**: JSON, TOML or YAML via [`config`]
//!
//! Messages are a single `text/html` part, base64 encoded. There is no
//! multipart or attachment support.
//!
//! ## Quick Start
//!
//! ```ignore
//! use quickmail::{Address, Credentials, Mail};
//!
//! let mail = Mail::new(Credentials::new("smtp.sendgrid.net:587", "apikey", "secret"))?;
//!
//! // Direct
//! mail.send(
//!     Some(&Address::new("FromName", "from@example.com")),
//!     "Hello subject",
//!     b"<h1>Hello</h1>",
//!     &["one@example.com", "two@example.com"],
//! )?;
//!
//! // Builder
//! mail.subject("Hello subject")
//!     .body_string("<h1>Hello</h1>")
//!     .to(["one@example.com"])
//!     .send()?;
//! ```
//!
//! ## Builder reuse
//!
//! ```text
//! Mail::subject ──acquire──→ Builder ──setters──→ send / send_unix
//!       ↑                                              │
//!       └──────────── release (cleared) ───────────────┘  unless singleton
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod builder;
pub mod config;
mod credentials;
pub mod encoding;
pub mod envelope;
mod error;
mod mail;
mod pool;
mod sendmail;
mod server;
mod transport;

pub use address::Address;
pub use builder::Builder;
pub use credentials::{Credentials, PlainAuth};
pub use error::{Error, Result, TransportError};
pub use mail::Mail;
pub use pool::BuilderPool;
pub use sendmail::{SENDMAIL_PROGRAM, Sendmail, send_unix};
pub use server::{DEFAULT_SMTP_PORT, ServerAddr};
pub use transport::{MemoryTransport, RecordedSubmission, SmtpRelay, Submission, Transport};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
