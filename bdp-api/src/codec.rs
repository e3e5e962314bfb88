//! Request bodies and reply parsing for the player's control CGI
//!
//! Requests mimic an HTML image button: `cCMD_<ACTION>.x=100&cCMD_<ACTION>.y=100`,
//! optionally followed by extra form fields. Replies are CRLF-separated
//! text: a header line `<code>,"<text>",<n>` and an optional CSV data line.
//! Some firmware gzips the body without saying so.

use crate::{ApiError, Result};
use flate2::read::GzDecoder;
use std::io::Read;

/// Reply code the player uses for success
pub const SUCCESS_CODE: &str = "00";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Build the image-button body for `action` (without the `cCMD_` prefix)
pub fn image_button(action: &str) -> String {
    format!("cCMD_{action}.x=100&cCMD_{action}.y=100", action = action)
}

/// Append `&name=value` to a form body
pub fn append_field(body: &mut String, name: &str, value: &str) {
    body.push('&');
    body.push_str(name);
    body.push('=');
    body.push_str(&form_escape(value));
}

fn form_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'*' => {
                out.push(byte as char)
            }
            b' ' => out.push('+'),
            other => out.push_str(&format!("%{:02X}", other)),
        }
    }
    out
}

/// Turn a raw response body into text
///
/// Inflates gzip bodies, then decodes UTF-8, falling back to Latin-1 (which
/// cannot fail) for firmware emitting legacy encodings.
pub fn decode_body(bytes: &[u8]) -> Result<String> {
    let inflated;
    let bytes = if bytes.starts_with(&GZIP_MAGIC) {
        let mut out = Vec::new();
        GzDecoder::new(bytes)
            .read_to_end(&mut out)
            .map_err(|e| ApiError::decode(format!("Corrupt gzip body: {}", e)))?;
        inflated = out;
        inflated.as_slice()
    } else {
        bytes
    };

    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(text.to_string()),
        Err(_) => Ok(bytes.iter().map(|&b| b as char).collect()),
    }
}

/// A parsed player reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    code: String,
    message: String,
    data: Option<Vec<String>>,
}

impl Reply {
    /// Parse reply text into header and data line
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.trim().lines().map(str::trim);

        let header = lines
            .next()
            .filter(|line| !line.is_empty())
            .ok_or_else(|| ApiError::decode("Empty reply"))?;

        let mut header_fields = header.split(',');
        let code = header_fields.next().unwrap_or_default().trim();
        if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ApiError::decode(format!("Missing reply code in {:?}", header)));
        }
        let message = header_fields
            .next()
            .map(|m| m.trim().trim_matches('"').to_string())
            .unwrap_or_default();

        let data = lines
            .next()
            .filter(|line| !line.is_empty())
            .map(|line| line.split(',').map(|f| f.trim().to_string()).collect());

        Ok(Self {
            code: code.to_ascii_uppercase(),
            message,
            data,
        })
    }

    /// Decode raw bytes straight into a reply
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::parse(&decode_body(bytes)?)
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }

    /// Fields of the data line, if the reply had one
    pub fn data(&self) -> Option<&[String]> {
        self.data.as_deref()
    }

    pub fn field(&self, index: usize) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|d| d.get(index))
            .map(String::as_str)
    }

    /// The data line, or a decode error naming what was expected
    pub fn require_data(&self, what: &str) -> Result<&[String]> {
        self.data()
            .ok_or_else(|| ApiError::decode(format!("{} reply has no data line", what)))
    }

    /// A required numeric field
    pub fn number(&self, index: usize, name: &str) -> Result<i64> {
        let raw = self
            .field(index)
            .ok_or_else(|| ApiError::decode(format!("Missing field {} ({})", index, name)))?;
        parse_number(raw, name)
    }

    /// A numeric field that may be absent; present but non-numeric is still an error
    pub fn optional_number(&self, index: usize, name: &str) -> Result<Option<i64>> {
        match self.field(index) {
            None | Some("") => Ok(None),
            Some(raw) => parse_number(raw, name).map(Some),
        }
    }
}

fn parse_number(raw: &str, name: &str) -> Result<i64> {
    raw.parse::<i64>()
        .map_err(|_| ApiError::decode(format!("Field {} is not numeric: {:?}", name, raw)))
}
