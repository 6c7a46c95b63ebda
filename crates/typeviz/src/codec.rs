//! Compression codec for cached payloads.
//!
//! Cached values are data URLs whose MIME type says how the payload is
//! encoded:
//!
//! - `application/x-lz4`: an LZ4 frame of the UTF-8 text.
//! - `text/plain;charset=utf-8`: the raw UTF-8 text, used when compression
//!   fails.
//!
//! Both payloads are base64 encoded. [`decompress`] branches on the MIME
//! type, so values written by either path read back identically.
//!
//! ```
//! use typeviz::codec::{compress, decompress};
//!
//! let svg = "<svg><g id=\"graph0\"></g></svg>";
//! let blob = compress(svg);
//! assert!(blob.starts_with("data:application/x-lz4;base64,"));
//! assert_eq!(decompress(&blob).unwrap(), svg);
//! ```

use std::{
    fmt,
    io::{self, Read, Write},
    string::FromUtf8Error,
};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use log::warn;
use lz4_flex::frame::{FrameDecoder, FrameEncoder};
use thiserror::Error;

const DATA_URL_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64";

/// Errors produced while encoding or decoding cached payloads.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("value is not a data URL")]
    NotDataUrl,

    #[error("data URL payload is not base64 encoded")]
    UnsupportedEncoding,

    #[error("can not convert data URL with MIME type `{0}`")]
    UnsupportedMime(String),

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("compression failed: {0}")]
    Compress(String),

    #[error("decompression failed: {0}")]
    Decompress(#[from] io::Error),

    #[error("decoded payload is not UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),
}

/// How an envelope payload is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MimeType {
    Lz4,
    PlainText,
}

impl MimeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lz4 => "application/x-lz4",
            Self::PlainText => "text/plain;charset=utf-8",
        }
    }

    fn parse(mime: &str) -> Result<Self, CodecError> {
        match mime {
            "application/x-lz4" => Ok(Self::Lz4),
            "text/plain" | "text/plain;charset=utf-8" => Ok(Self::PlainText),
            other => Err(CodecError::UnsupportedMime(other.to_string())),
        }
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payload tagged with its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    mime: MimeType,
    payload: Vec<u8>,
}

impl Envelope {
    /// Wrap `text` without compressing it.
    pub fn plain_text(text: &str) -> Self {
        Self {
            mime: MimeType::PlainText,
            payload: text.as_bytes().to_vec(),
        }
    }

    /// Compress `text` into an LZ4 envelope.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Compress`] if the encoder fails.
    pub fn lz4(text: &str) -> Result<Self, CodecError> {
        let mut encoder = FrameEncoder::new(Vec::new());
        encoder
            .write_all(text.as_bytes())
            .map_err(|err| CodecError::Compress(err.to_string()))?;
        let payload = encoder
            .finish()
            .map_err(|err| CodecError::Compress(err.to_string()))?;

        Ok(Self {
            mime: MimeType::Lz4,
            payload,
        })
    }

    /// Parse an envelope from its data URL form.
    ///
    /// # Errors
    ///
    /// Returns an error if `data_url` is not a base64 data URL with a
    /// supported MIME type.
    pub fn from_data_url(data_url: &str) -> Result<Self, CodecError> {
        let rest = data_url
            .strip_prefix(DATA_URL_PREFIX)
            .ok_or(CodecError::NotDataUrl)?;
        let (header, data) = rest.split_once(',').ok_or(CodecError::NotDataUrl)?;
        let mime = header
            .strip_suffix(BASE64_MARKER)
            .ok_or(CodecError::UnsupportedEncoding)?;

        Ok(Self {
            mime: MimeType::parse(mime)?,
            payload: STANDARD.decode(data)?,
        })
    }

    /// Render the envelope as a data URL.
    pub fn to_data_url(&self) -> String {
        format!(
            "{DATA_URL_PREFIX}{}{BASE64_MARKER},{}",
            self.mime,
            STANDARD.encode(&self.payload)
        )
    }

    pub fn mime(&self) -> MimeType {
        self.mime
    }

    /// Decode the payload back into text.
    ///
    /// # Errors
    ///
    /// Returns an error if the LZ4 frame is corrupt or the text is not UTF-8.
    pub fn into_text(self) -> Result<String, CodecError> {
        let bytes = match self.mime {
            MimeType::PlainText => self.payload,
            MimeType::Lz4 => {
                let mut bytes = Vec::new();
                FrameDecoder::new(self.payload.as_slice()).read_to_end(&mut bytes)?;
                bytes
            }
        };
        Ok(String::from_utf8(bytes)?)
    }
}

/// Compress `text` into a data URL.
///
/// Falls back to an uncompressed `text/plain` envelope if compression fails.
pub fn compress(text: &str) -> String {
    let envelope = Envelope::lz4(text).unwrap_or_else(|err| {
        warn!(err:%; "Can not compress string, storing it uncompressed");
        Envelope::plain_text(text)
    });
    envelope.to_data_url()
}

/// Decode a data URL produced by [`compress`].
///
/// # Errors
///
/// Returns a [`CodecError`] for malformed data URLs, unknown MIME types and
/// corrupt payloads.
pub fn decompress(data_url: &str) -> Result<String, CodecError> {
    Envelope::from_data_url(data_url)?.into_text()
}


#[cfg(test)]
mod proptest_tests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn compress_round_trips(text in ".*") {
            prop_assert_eq!(decompress(&compress(&text)).unwrap(), text);
        }
    }
}
