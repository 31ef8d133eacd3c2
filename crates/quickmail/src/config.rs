//! Loading [`Credentials`] from command line values and files.
//!
//! A value is either inline JSON or the path of a file whose extension picks
//! the format:
//!
//! | Extension | Format |
//! |-----------|--------|
//! | `.json` | JSON |
//! | `.toml`, `.tml` | TOML |
//! | `.yaml`, `.yml` | YAML |
//!
//! A leading `@` (`@credentials.toml`) is ignored.

use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::credentials::Credentials;
use crate::error::{Error, Result};

/// Supported file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// JSON.
    Json,
    /// TOML.
    Toml,
    /// YAML.
    Yaml,
}

impl Format {
    /// Picks the format for a file extension (without the dot).
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "toml" | "tml" => Some(Self::Toml),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }

    /// Decodes `contents`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the contents do not decode into `T`.
    pub fn decode<T: DeserializeOwned>(self, contents: &str) -> Result<T> {
        let decoded = match self {
            Self::Json => serde_json::from_str(contents).map_err(|e| e.to_string()),
            Self::Toml => toml::from_str(contents).map_err(|e| e.to_string()),
            Self::Yaml => serde_yaml::from_str(contents).map_err(|e| e.to_string()),
        };
        decoded.map_err(|e| Error::Config(format!("cannot decode {self:?}: {e}")))
    }
}

/// Decodes a value that is inline JSON or a path to a credentials file.
///
/// # Errors
///
/// Returns [`Error::Config`] if the file cannot be read, its extension is not
/// supported, or the contents do not decode.
pub fn load<T: DeserializeOwned>(value: &str) -> Result<T> {
    let value = value.strip_prefix('@').unwrap_or(value);
    if value.trim_start().starts_with('{') {
        return Format::Json.decode(value);
    }
    let path = Path::new(value);

    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return Format::Json.decode(value);
    };

    let format = Format::from_extension(ext).ok_or_else(|| {
        Error::Config(
            "unsupported file extension: available formats are json, yaml and toml".into(),
        )
    })?;

    debug!(path = %path.display(), ?format, "Loading configuration file");
    let contents = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
    format.decode(&contents)
}

/// Loads [`Credentials`]; see [`load`].
///
/// # Errors
///
/// See [`load`].
pub fn load_credentials(value: &str) -> Result<Credentials> {
    load(value)
}
