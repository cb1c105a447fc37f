//! Self-describing attachment payloads.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// A MIME-typed, base64-encoded attachment, ready to embed as a data URL.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Payload {
    /// MIME type resolved from the file extension.
    pub mime_type: String,

    /// Standard (padded) base64 encoding of the file content.
    pub data: String,
}

impl Payload {
    /// Encode raw bytes under the given MIME type.
    pub fn encode(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: STANDARD.encode(bytes),
        }
    }

    /// `data:<mime>;base64,<data>`
    pub fn to_data_url(&self) -> String {
        self.to_string()
    }

    /// Decode the payload back to the original bytes.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.data)
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.mime_type, self.data)
    }
}
