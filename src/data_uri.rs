//! `data:<mime>;base64,<payload>` encoding and parsing.
//!
//! Photos carry their image bytes in-band as data-URIs. Only the base64 form
//! is produced or accepted.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataUriError {
    #[error("Not a base64 data-URI")]
    Malformed,
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// A decoded data-URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl DataUri {
    /// Parse a `data:<mime>;base64,<payload>` string.
    ///
    /// The MIME type must be non-empty and must not contain `;`, and the
    /// payload must be non-empty.
    pub fn parse(uri: &str) -> Result<Self, DataUriError> {
        let rest = uri.strip_prefix("data:").ok_or(DataUriError::Malformed)?;
        let (mime_type, payload) = rest.split_once(";base64,").ok_or(DataUriError::Malformed)?;
        if mime_type.is_empty() || mime_type.contains(';') || payload.is_empty() {
            return Err(DataUriError::Malformed);
        }
        let data = STANDARD.decode(payload)?;
        Ok(Self {
            mime_type: mime_type.to_string(),
            data,
        })
    }
}

/// Encode bytes as a base64 data-URI.
pub fn encode(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_produces_prefix() {
        assert_eq!(encode("image/png", b"hi"), "data:image/png;base64,aGk=");
    }

    #[test]
    fn parse_extracts_mime_and_bytes() {
        let uri = DataUri::parse("data:image/webp;base64,aGVsbG8=").unwrap();
        assert_eq!(uri.mime_type, "image/webp");
        assert_eq!(uri.data, b"hello");
    }

    #[test]
    fn parse_reverses_encode() {
        let bytes: Vec<u8> = (0..=255).collect();
        let uri = DataUri::parse(&encode("image/jpeg", &bytes)).unwrap();
        assert_eq!(uri.data, bytes);
    }

    #[test]
    fn parse_rejects_missing_scheme() {
        assert!(matches!(
            DataUri::parse("https://example.com/a.jpg"),
            Err(DataUriError::Malformed)
        ));
    }

    #[test]
    fn parse_rejects_non_base64_form() {
        assert!(matches!(
            DataUri::parse("data:text/plain,hello"),
            Err(DataUriError::Malformed)
        ));
    }

    #[test]
    fn parse_rejects_parameters_in_mime() {
        assert!(matches!(
            DataUri::parse("data:image/png;charset=utf-8;base64,aGk="),
            Err(DataUriError::Malformed)
        ));
    }

    #[test]
    fn parse_rejects_empty_parts() {
        assert!(DataUri::parse("data:;base64,aGk=").is_err());
        assert!(DataUri::parse("data:image/png;base64,").is_err());
    }

    #[test]
    fn parse_rejects_bad_base64() {
        assert!(matches!(
            DataUri::parse("data:image/png;base64,!!!"),
            Err(DataUriError::Base64(_))
        ));
    }
}
