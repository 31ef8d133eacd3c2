//! Base64 body encoding and RFC 2047 encoded words for display names.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Failure while decoding encoded text.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Base64 payload is malformed.
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Decoded bytes are not valid UTF-8.
    #[error("UTF-8 decode error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Encoded word is malformed or uses an unsupported charset.
    #[error("Invalid encoded word: {0}")]
    EncodedWord(String),
}

/// Encodes data as standard padded Base64 on a single line.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decodes standard Base64, ignoring CR and LF between groups.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>, DecodeError> {
    let compact: String = data.chars().filter(|c| *c != '\r' && *c != '\n').collect();
    Ok(STANDARD.decode(compact)?)
}

/// Encodes a header phrase as an RFC 2047 `B` encoded word when it is not
/// plain printable ASCII.
#[must_use]
pub fn encode_word(text: &str) -> String {
    if text.bytes().all(|b| (0x20..0x7f).contains(&b)) {
        return text.to_string();
    }
    format!("=?utf-8?b?{}?=", encode_base64(text.as_bytes()))
}

/// Decodes every RFC 2047 encoded word in `text`.
///
/// Whitespace between two adjacent encoded words is dropped, as the RFC
/// requires. Text without encoded words is returned unchanged.
///
/// # Errors
///
/// Returns an error if an encoded word is malformed, names a charset other
/// than UTF-8 or US-ASCII, or does not decode to UTF-8.
pub fn decode_words(text: &str) -> Result<String, DecodeError> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut after_word = false;

    while let Some(start) = rest.find("=?") {
        let (before, candidate) = rest.split_at(start);
        let Some((word, tail)) = split_encoded_word(candidate) else {
            out.push_str(before);
            out.push_str("=?");
            rest = &candidate[2..];
            after_word = false;
            continue;
        };

        if !(after_word && before.chars().all(char::is_whitespace)) {
            out.push_str(before);
        }
        out.push_str(&decode_word(word)?);
        rest = tail;
        after_word = true;
    }

    out.push_str(rest);
    Ok(out)
}

/// Splits `=?charset?enc?text?=` off the front of `s`.
fn split_encoded_word(s: &str) -> Option<(&str, &str)> {
    let inner = s.strip_prefix("=?")?;
    let mut marks = inner.match_indices('?').map(|(i, _)| i);
    let _charset_end = marks.next()?;
    let _encoding_end = marks.next()?;
    let text_end = marks.next()?;
    if inner.as_bytes().get(text_end + 1) != Some(&b'=') {
        return None;
    }
    let len = 2 + text_end + 2;
    Some((&s[..len], &s[len..]))
}

fn decode_word(word: &str) -> Result<String, DecodeError> {
    let inner = &word[2..word.len() - 2];
    let mut parts = inner.splitn(3, '?');
    let (Some(charset), Some(encoding), Some(payload)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(DecodeError::EncodedWord(word.to_string()));
    };

    let charset = charset.split('*').next().unwrap_or_default();
    if !charset.eq_ignore_ascii_case("utf-8") && !charset.eq_ignore_ascii_case("us-ascii") {
        return Err(DecodeError::EncodedWord(format!(
            "unsupported charset {charset}"
        )));
    }

    let bytes = match encoding {
        "B" | "b" => decode_base64(payload)?,
        "Q" | "q" => decode_q(payload)?,
        other => {
            return Err(DecodeError::EncodedWord(format!(
                "unknown encoding {other}"
            )));
        }
    };
    Ok(String::from_utf8(bytes)?)
}

/// Decodes the `Q` flavour of quoted-printable used inside encoded words.
fn decode_q(payload: &str) -> Result<Vec<u8>, DecodeError> {
    let mut out = Vec::with_capacity(payload.len());
    let mut bytes = payload.bytes();

    while let Some(byte) = bytes.next() {
        match byte {
            b'_' => out.push(b' '),
            b'=' => {
                let hex = [bytes.next(), bytes.next()];
                let [Some(hi), Some(lo)] = hex else {
                    return Err(DecodeError::EncodedWord(
                        "incomplete escape sequence".to_string(),
                    ));
                };
                let pair = [hi, lo];
                let value = std::str::from_utf8(&pair)
                    .ok()
                    .and_then(|h| u8::from_str_radix(h, 16).ok())
                    .ok_or_else(|| DecodeError::EncodedWord(format!("invalid hex {pair:?}")))?;
                out.push(value);
            }
            _ => out.push(byte),
        }
    }

    Ok(out)
}
