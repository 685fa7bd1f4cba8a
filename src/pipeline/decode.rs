//! Response decoding: service JSON → [`ProcessedResult`].
//!
//! The service speaks loosely typed JSON. Nothing leaves this module unless
//! it has been checked against an explicit shape: both `html_content` and
//! `docx_base64` must be present strings, and the base64 must decode with
//! the standard alphabet. Anything else fails closed with a decode error so
//! the session can route it through its failure path.

use crate::config::DOCX_MEDIA_TYPE;
use crate::error::DocFlowError;
use crate::pipeline::download::derive_download_name;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Message used when a failure body carries no usable `error` field.
pub const GENERIC_FAILURE: &str = "Unknown error while processing the document.";

/// Success body after validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceResponse {
    pub html_content: String,
    pub docx_base64: String,
    pub message: Option<String>,
}

#[derive(Deserialize)]
struct RawSuccess {
    html_content: Option<String>,
    docx_base64: Option<String>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct RawFailure {
    error: Option<String>,
}

/// Validate a success body.
pub fn parse_success(body: &[u8]) -> Result<ServiceResponse, DocFlowError> {
    let raw: RawSuccess = serde_json::from_slice(body)
        .map_err(|e| DocFlowError::MalformedResponse(e.to_string()))?;

    Ok(ServiceResponse {
        html_content: raw
            .html_content
            .ok_or(DocFlowError::MissingField("html_content"))?,
        docx_base64: raw
            .docx_base64
            .ok_or(DocFlowError::MissingField("docx_base64"))?,
        message: raw.message,
    })
}

/// Pull the human-readable reason out of a failure body.
///
/// Falls back to [`GENERIC_FAILURE`] when the body is not JSON, has no
/// `error` field, or the field is blank.
pub fn parse_failure_message(body: &[u8]) -> String {
    serde_json::from_slice::<RawFailure>(body)
        .ok()
        .and_then(|f| f.error)
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| GENERIC_FAILURE.to_string())
}

/// The decoded output document.
#[derive(Clone, PartialEq, Eq)]
pub struct DecodedArtifact {
    pub bytes: Arc<[u8]>,
    pub media_type: &'static str,
    /// Suggested name for the saved file.
    pub file_name: String,
}

impl fmt::Debug for DecodedArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedArtifact")
            .field("size", &self.bytes.len())
            .field("media_type", &self.media_type)
            .field("file_name", &self.file_name)
            .finish()
    }
}

/// Everything a successful run produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedResult {
    /// Markup fragment exactly as the service sent it.
    pub preview: String,
    pub artifact: DecodedArtifact,
    /// Optional status line from the service.
    pub service_message: Option<String>,
}

/// Decode standard-alphabet base64.
pub fn decode_base64(encoded: &str) -> Result<Vec<u8>, DocFlowError> {
    Ok(STANDARD.decode(encoded)?)
}

/// Turn a validated response into a result for `original_name`.
pub fn decode_response(
    response: ServiceResponse,
    original_name: &str,
    version_suffix: &str,
) -> Result<ProcessedResult, DocFlowError> {
    let bytes = decode_base64(&response.docx_base64)?;
    debug!(
        "Decoded {} base64 chars → {} bytes",
        response.docx_base64.len(),
        bytes.len()
    );

    Ok(ProcessedResult {
        preview: response.html_content,
        artifact: DecodedArtifact {
            bytes: Arc::from(bytes),
            media_type: DOCX_MEDIA_TYPE,
            file_name: derive_download_name(original_name, version_suffix),
        },
        service_message: response.message,
    })
}
