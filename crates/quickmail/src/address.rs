//! E-mail address with an optional display name.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::encoding::{decode_words, encode_word};
use crate::error::{Error, Result};

/// A mailbox: display name plus address, e.g. `John Doe <john@example.com>`.
///
/// The name may be empty. The address is only checked when the value is
/// produced by [`Address::parse`]; direct construction accepts anything, and
/// send operations reject an empty address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    /// Display name, may be empty.
    #[serde(default)]
    pub name: String,
    /// The `user@domain` part.
    pub address: String,
}

impl Address {
    /// Creates an address from a display name and an addr-spec.
    #[must_use]
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }

    /// Parses `Name <user@host>`, `"Quoted Name" <user@host>`, `<user@host>`
    /// or a bare `user@host`.
    ///
    /// Encoded words (`=?utf-8?b?...?=`) in the display name are decoded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AddressParse`] if the text is not one of those forms
    /// or the address part is not `local@domain`.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::AddressParse("no address".into()));
        }

        let Some(open) = find_angle(text) else {
            validate_addr_spec(text)?;
            return Ok(Self::new("", text));
        };

        let close = text[open..]
            .find('>')
            .map(|i| open + i)
            .ok_or_else(|| Error::AddressParse(format!("missing '>' in {text:?}")))?;
        if !text[close + 1..].trim().is_empty() {
            return Err(Error::AddressParse(format!(
                "unexpected text after '>' in {text:?}"
            )));
        }

        let address = text[open + 1..close].trim();
        validate_addr_spec(address)?;

        let name = parse_display_name(text[..open].trim())?;
        Ok(Self::new(name, address))
    }

    /// Returns true if the address part is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.address.is_empty()
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Renders the header form used in `From:`.
impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            return write!(f, "<{}>", self.address);
        }

        if !self.name.is_ascii() {
            return write!(f, "{} <{}>", encode_word(&self.name), self.address);
        }

        if self.name.split(' ').all(|word| !word.is_empty() && word.bytes().all(is_atext)) {
            return write!(f, "{} <{}>", self.name, self.address);
        }

        f.write_str("\"")?;
        for ch in self.name.chars() {
            if ch == '"' || ch == '\\' {
                f.write_str("\\")?;
            }
            write!(f, "{ch}")?;
        }
        write!(f, "\" <{}>", self.address)
    }
}

/// Finds the `<` that opens the angle-addr, skipping any inside quotes.
fn find_angle(text: &str) -> Option<usize> {
    let mut quoted = false;
    let mut escaped = false;
    for (i, ch) in text.char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            '<' if !quoted => return Some(i),
            _ => {}
        }
    }
    None
}

fn parse_display_name(raw: &str) -> Result<String> {
    if let Some(inner) = raw.strip_prefix('"') {
        let inner = inner
            .strip_suffix('"')
            .ok_or_else(|| Error::AddressParse(format!("unterminated quoted name {raw:?}")))?;
        let mut name = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(ch) = chars.next() {
            if ch == '\\' {
                if let Some(next) = chars.next() {
                    name.push(next);
                }
            } else {
                name.push(ch);
            }
        }
        return Ok(name);
    }

    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    decode_words(&collapsed).map_err(|e| Error::AddressParse(e.to_string()))
}

fn validate_addr_spec(addr: &str) -> Result<()> {
    let Some((local, domain)) = addr.rsplit_once('@') else {
        return Err(Error::AddressParse(format!("missing @ in {addr:?}")));
    };
    if local.is_empty() || domain.is_empty() {
        return Err(Error::AddressParse(format!(
            "local and domain parts cannot be empty in {addr:?}"
        )));
    }
    if addr.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(Error::AddressParse(format!("invalid address {addr:?}")));
    }
    if !local.starts_with('"') && local.contains('@') {
        return Err(Error::AddressParse(format!("too many @ in {addr:?}")));
    }
    Ok(())
}

/// RFC 5322 `atext`.
const fn is_atext(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'!' | b'#'
                | b'$'
                | b'%'
                | b'&'
                | b'\''
                | b'*'
                | b'+'
                | b'-'
                | b'/'
                | b'='
                | b'?'
                | b'^'
                | b'_'
                | b'`'
                | b'{'
                | b'|'
                | b'}'
                | b'~'
        )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_name_and_address() {
        let addr = Address::parse("Gerasimos <gerasimos@example.com>").unwrap();
        assert_eq!(addr.name, "Gerasimos");
        assert_eq!(addr.address, "gerasimos@example.com");
    }

    #[test]
    fn test_parse_bare_address() {
        let addr: Address = "user@example.com".parse().unwrap();
        assert_eq!(addr, Address::new("", "user@example.com"));
    }

    #[test]
    fn test_parse_angle_only() {
        let addr = Address::parse("  <user@example.com> ").unwrap();
        assert!(addr.name.is_empty());
        assert_eq!(addr.address, "user@example.com");
    }

    #[test]
    fn test_parse_quoted_name_with_specials() {
        let addr = Address::parse(r#""Doe, John \"JD\"" <john@example.com>"#).unwrap();
        assert_eq!(addr.name, r#"Doe, John "JD""#);
        assert_eq!(addr.address, "john@example.com");
    }

    #[test]
    fn test_parse_quoted_angle_is_part_of_name() {
        let addr = Address::parse(r#""a <b>" <c@example.com>"#).unwrap();
        assert_eq!(addr.name, "a <b>");
        assert_eq!(addr.address, "c@example.com");
    }

    #[test]
    fn test_parse_encoded_name() {
        let addr = Address::parse("=?utf-8?b?SMOpbGxv?= <h@example.com>").unwrap();
        assert_eq!(addr.name, "Héllo");
    }

    #[test]
    fn test_parse_collapses_name_whitespace() {
        let addr = Address::parse("John    Doe <john@example.com>").unwrap();
        assert_eq!(addr.name, "John Doe");
    }

    #[test]
    fn test_parse_rejects_invalid() {
        for text in [
            "",
            "userexample.com",
            "@example.com",
            "user@",
            "John <john@example.com",
            "John <john@example.com> trailing",
            "a@b@c",
            "John <jo hn@example.com>",
        ] {
            assert!(
                matches!(Address::parse(text), Err(Error::AddressParse(_))),
                "{text:?} should not parse"
            );
        }
    }

    #[test]
    fn test_display_plain_name() {
        let addr = Address::new("John Doe", "john@example.com");
        assert_eq!(addr.to_string(), "John Doe <john@example.com>");
    }

    #[test]
    fn test_display_without_name() {
        assert_eq!(Address::new("", "a@b.c").to_string(), "<a@b.c>");
    }

    #[test]
    fn test_display_quotes_specials() {
        let addr = Address::new(r#"Doe, "JD""#, "jd@example.com");
        assert_eq!(addr.to_string(), r#""Doe, \"JD\"" <jd@example.com>"#);
    }

    #[test]
    fn test_display_encodes_non_ascii() {
        let addr = Address::new("Héllo", "h@example.com");
        assert_eq!(addr.to_string(), "=?utf-8?b?SMOpbGxv?= <h@example.com>");
    }

    #[test]
    fn test_display_then_parse() {
        let original = Address::new(r#"Doe, "JD""#, "jd@example.com");
        assert_eq!(Address::parse(&original.to_string()).unwrap(), original);
    }
}
