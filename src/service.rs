//! The remote formatter, seen from the client.
//!
//! [`DocumentService`] is the seam between the session and the network. It
//! carries one [`ProcessRequest`] out and hands back the raw status and body;
//! interpreting them (success shape, structured error, fallback message) is
//! the session's job, so a fake service in tests exercises exactly the same
//! decision logic as the real one.
//!
//! [`HttpDocumentService`] is the production implementation: one multipart
//! POST via reqwest, two fields, no retry.

use crate::config::{WorkflowConfig, DOCX_MEDIA_TYPE};
use crate::error::DocFlowError;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Multipart field carrying the document bytes.
pub const FILE_FIELD: &str = "file";

/// Multipart field carrying the instruction text.
pub const INSTRUCTION_FIELD: &str = "format_text";

/// What gets sent for one submission.
#[derive(Debug, Clone)]
pub struct ProcessRequest {
    pub file_name: String,
    pub document: Arc<[u8]>,
    /// Sent exactly as typed; never trimmed.
    pub instruction: String,
}

/// Status and body of whatever the service answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceReply {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ServiceReply {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// True for any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Carries a request to the remote formatter.
///
/// Implementations return `Err` only when no reply was obtained at all
/// (connect failure, TLS, timeout). Any reply, whatever its status, is `Ok`.
#[async_trait]
pub trait DocumentService: Send + Sync {
    async fn process(&self, request: ProcessRequest) -> Result<ServiceReply, DocFlowError>;
}

/// reqwest-backed [`DocumentService`].
#[derive(Debug, Clone)]
pub struct HttpDocumentService {
    client: reqwest::Client,
    endpoint: String,
    timeout_secs: Option<u64>,
}

impl HttpDocumentService {
    /// Build a client from the workflow configuration.
    pub fn new(config: &WorkflowConfig) -> Result<Self, DocFlowError> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| DocFlowError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            timeout_secs: config.request_timeout_secs,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_form(request: ProcessRequest) -> Result<Form, DocFlowError> {
        let file_part = Part::bytes(request.document.to_vec())
            .file_name(request.file_name)
            .mime_str(DOCX_MEDIA_TYPE)
            .map_err(|e| DocFlowError::Internal(format!("multipart: {e}")))?;

        Ok(Form::new()
            .part(FILE_FIELD, file_part)
            .text(INSTRUCTION_FIELD, request.instruction))
    }

    fn transport_error(&self, e: reqwest::Error) -> DocFlowError {
        match self.timeout_secs {
            Some(secs) if e.is_timeout() => DocFlowError::Timeout {
                endpoint: self.endpoint.clone(),
                secs,
            },
            _ => DocFlowError::Network {
                endpoint: self.endpoint.clone(),
                reason: e.to_string(),
            },
        }
    }
}

#[async_trait]
impl DocumentService for HttpDocumentService {
    async fn process(&self, request: ProcessRequest) -> Result<ServiceReply, DocFlowError> {
        info!(
            "Uploading '{}' ({} bytes) to {}",
            request.file_name,
            request.document.len(),
            self.endpoint
        );

        // The multipart boundary and Content-Type header come from reqwest.
        let form = Self::build_form(request)?;
        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?;

        debug!("Service answered HTTP {} with {} bytes", status, body.len());
        Ok(ServiceReply::new(status, body.to_vec()))
    }
}
