//! Mail server address parsing.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Default SMTP port, used when the server address has none.
pub const DEFAULT_SMTP_PORT: u16 = 25;

/// A normalized `host:port` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerAddr {
    host: String,
    port: u16,
}

impl ServerAddr {
    /// Creates a server address from its parts.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parses `host`, `host:port` or `[ipv6]:port`.
    ///
    /// A value without any colon gets the SMTP port. The port may be a number
    /// or one of the service names `smtp`, `submission`, `smtps` and
    /// `submissions`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the host and port cannot be split apart,
    /// the host is empty or the port is unknown.
    pub fn parse(addr: &str) -> Result<Self> {
        let (host, port) = if addr.contains(':') {
            split_host_port(addr)?
        } else {
            (addr, "smtp")
        };

        if host.is_empty() {
            return Err(invalid(addr, "missing host"));
        }

        Ok(Self::new(host, parse_port(addr, port)?))
    }

    /// Returns the host without brackets.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }
}

impl FromStr for ServerAddr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ServerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

fn split_host_port(addr: &str) -> Result<(&str, &str)> {
    if let Some(rest) = addr.strip_prefix('[') {
        let (host, after) = rest
            .split_once(']')
            .ok_or_else(|| invalid(addr, "missing ']'"))?;
        let port = after
            .strip_prefix(':')
            .ok_or_else(|| invalid(addr, "missing port"))?;
        return Ok((host, port));
    }

    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| invalid(addr, "missing port"))?;
    if host.contains(':') {
        return Err(invalid(addr, "too many colons"));
    }
    if host.contains('[') || host.contains(']') {
        return Err(invalid(addr, "unexpected bracket"));
    }
    Ok((host, port))
}

fn parse_port(addr: &str, port: &str) -> Result<u16> {
    match port {
        "" => Err(invalid(addr, "missing port")),
        "smtp" => Ok(DEFAULT_SMTP_PORT),
        "submission" => Ok(587),
        "smtps" | "submissions" => Ok(465),
        numeric => numeric
            .parse::<u16>()
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| invalid(addr, "unknown port")),
    }
}

fn invalid(addr: &str, reason: &str) -> Error {
    Error::Config(format!("invalid server address {addr:?}: {reason}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_host_only_uses_smtp_port() {
        let addr = ServerAddr::parse("smtp.example.com").unwrap();
        assert_eq!(addr.host(), "smtp.example.com");
        assert_eq!(addr.port(), DEFAULT_SMTP_PORT);
        assert_eq!(addr.to_string(), "smtp.example.com:25");
    }

    #[test]
    fn test_host_and_port() {
        let addr: ServerAddr = "smtp.sendgrid.net:587".parse().unwrap();
        assert_eq!(addr, ServerAddr::new("smtp.sendgrid.net", 587));
    }

    #[test]
    fn test_service_names() {
        assert_eq!(ServerAddr::parse("h:submission").unwrap().port(), 587);
        assert_eq!(ServerAddr::parse("h:smtps").unwrap().port(), 465);
        assert_eq!(ServerAddr::parse("h:smtp").unwrap().port(), 25);
    }

    #[test]
    fn test_ipv6() {
        let addr = ServerAddr::parse("[::1]:2525").unwrap();
        assert_eq!(addr.host(), "::1");
        assert_eq!(addr.port(), 2525);
        assert_eq!(addr.to_string(), "[::1]:2525");
    }

    #[test]
    fn test_invalid_addresses() {
        for addr in [
            "::1",
            "host:",
            ":25",
            "[::1",
            "[::1]",
            "host:port",
            "host:70000",
            "host:0",
            "a]b:25",
        ] {
            assert!(
                matches!(ServerAddr::parse(addr), Err(Error::Config(_))),
                "{addr:?} should be rejected"
            );
        }
    }
}
