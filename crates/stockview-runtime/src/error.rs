#![forbid(unsafe_code)]

//! Runtime error types.
//!
//! None of these reach the render path: a failed fetch keeps the previous
//! collection, a failed image probe falls back to a square image. They are
//! logged where they are absorbed.

use std::fmt;
use std::io;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// FetchError
// ---------------------------------------------------------------------------

/// Failure of one inventory fetch.
#[derive(Debug)]
pub enum FetchError {
    /// The data source reported an error.
    Source(String),
    /// The payload could not be decoded.
    Decode(serde_json::Error),
    /// Reading the payload failed.
    Io(io::Error),
}

impl FetchError {
    pub fn source_error(message: impl Into<String>) -> Self {
        Self::Source(message.into())
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source(msg) => write!(f, "data source error: {msg}"),
            Self::Decode(err) => write!(f, "inventory decode error: {err}"),
            Self::Io(err) => write!(f, "inventory read error: {err}"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Source(_) => None,
            Self::Decode(err) => Some(err),
            Self::Io(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err)
    }
}

impl From<io::Error> for FetchError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

// ---------------------------------------------------------------------------
// ImageError
// ---------------------------------------------------------------------------

/// Failure to determine an image's intrinsic size.
#[derive(Debug)]
pub enum ImageError {
    /// The URI could not be interpreted.
    InvalidUri(String),
    /// The scheme has no loader.
    Unsupported { scheme: String },
    Io { path: PathBuf, source: io::Error },
    /// Inline data was not valid base64.
    Base64(base64::DecodeError),
    Decode(image::ImageError),
    /// The image reported a zero dimension.
    ZeroSize,
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUri(uri) => write!(f, "invalid image uri `{uri}`"),
            Self::Unsupported { scheme } => write!(f, "unsupported image scheme `{scheme}`"),
            Self::Io { path, source } => write!(f, "cannot read {}: {source}", path.display()),
            Self::Base64(err) => write!(f, "invalid inline image data: {err}"),
            Self::Decode(err) => write!(f, "image decode error: {err}"),
            Self::ZeroSize => write!(f, "image has a zero dimension"),
        }
    }
}

impl std::error::Error for ImageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Base64(err) => Some(err),
            Self::Decode(err) => Some(err),
            Self::InvalidUri(_) | Self::Unsupported { .. } | Self::ZeroSize => None,
        }
    }
}

impl From<base64::DecodeError> for ImageError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Base64(err)
    }
}

impl From<image::ImageError> for ImageError {
    fn from(err: image::ImageError) -> Self {
        Self::Decode(err)
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Failure to load screen configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: io::Error },
    Parse { path: PathBuf, source: serde_json::Error },
    /// An environment override had an unusable value.
    InvalidEnv { key: &'static str, value: String },
    /// A loaded field is out of range.
    OutOfRange { field: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot read config {}: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "invalid config {}: {source}", path.display())
            }
            Self::InvalidEnv { key, value } => write!(f, "invalid value for {key}: `{value}`"),
            Self::OutOfRange { field, value } => write!(f, "{field} out of range: `{value}`"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::InvalidEnv { .. } | Self::OutOfRange { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn fetch_error_display_and_source() {
        let err = FetchError::source_error("timeout");
        assert_eq!(err.to_string(), "data source error: timeout");
        assert!(err.source().is_none());

        let io = FetchError::from(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(io.source().is_some());
    }

    #[test]
    fn image_error_display() {
        let err = ImageError::Unsupported {
            scheme: "https".into(),
        };
        assert_eq!(err.to_string(), "unsupported image scheme `https`");
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError::InvalidEnv {
            key: "STOCKVIEW_WINDOW_SIZE",
            value: "big".into(),
        };
        assert_eq!(err.to_string(), "invalid value for STOCKVIEW_WINDOW_SIZE: `big`");
    }
}
