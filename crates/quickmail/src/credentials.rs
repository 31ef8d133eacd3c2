//! SMTP credentials and the PLAIN authentication handle derived from them.

use std::fmt;

use serde::Deserialize;

/// The SMTP credentials consumed by [`Mail::new`](crate::Mail::new).
///
/// Field names are `addr`, `username` and `password`; the capitalized forms
/// are accepted too when deserializing.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    /// Mail server host, IP or `host:port`. The SMTP port is used when the
    /// port is missing.
    #[serde(alias = "Addr")]
    pub addr: String,
    /// Login name, also the local part of the default sender address.
    #[serde(alias = "Username")]
    pub username: String,
    /// Login password.
    #[serde(alias = "Password")]
    pub password: String,
}

impl Credentials {
    /// Creates credentials for `addr`.
    #[must_use]
    pub fn new(
        addr: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            addr: addr.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("addr", &self.addr)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// SASL PLAIN authentication bound to one server host.
///
/// The handle is public on [`Mail`](crate::Mail) so it can be swapped after
/// construction.
#[derive(Clone, PartialEq, Eq)]
pub struct PlainAuth {
    /// Authorization identity, usually empty.
    pub identity: String,
    /// Authentication identity.
    pub username: String,
    /// Password.
    pub password: String,
    /// Host the credentials belong to.
    pub host: String,
}

impl PlainAuth {
    /// Creates a PLAIN handle with an empty authorization identity.
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            identity: String::new(),
            username: username.into(),
            password: password.into(),
            host: host.into(),
        }
    }
}

impl fmt::Debug for PlainAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlainAuth")
            .field("identity", &self.identity)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .finish()
    }
}
