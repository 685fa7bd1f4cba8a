//! Configuration for the conversion workflow.
//!
//! Every knob lives in [`WorkflowConfig`], built via
//! [`WorkflowConfigBuilder`]. Callers set only what they care about and rely
//! on the defaults for the rest.

use crate::error::DocFlowError;
use serde::{Deserialize, Serialize};

/// Endpoint of the hosted formatter service.
pub const DEFAULT_ENDPOINT: &str = "https://formateador-de-web-app.onrender.com/process-document";

/// The only document extension the workflow accepts.
pub const ACCEPTED_EXTENSION: &str = ".docx";

/// Media type attached to the decoded artifact.
pub const DOCX_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Configuration for a conversion session.
///
/// # Example
/// ```rust
/// use docx_reformat::WorkflowConfig;
///
/// let config = WorkflowConfig::builder()
///     .endpoint("http://localhost:5000/process-document")
///     .request_timeout_secs(Some(120))
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// URL the multipart request is POSTed to. Default: [`DEFAULT_ENDPOINT`].
    pub endpoint: String,

    /// Upper bound on one request, in seconds. Default: 300.
    ///
    /// `None` waits indefinitely. Free-tier hosts can take a minute to wake
    /// up, so keep this generous.
    pub request_timeout_secs: Option<u64>,

    /// `User-Agent` header sent with the request.
    pub user_agent: String,

    /// Suffix inserted before the extension of the downloaded file. Default: `_v1`.
    pub version_suffix: String,

    /// Strip `<script>`/`<style>` blocks and `on*=` attributes from the
    /// preview before rendering. Default: false (markup is trusted as-is).
    pub sanitize_preview: bool,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout_secs: Some(300),
            user_agent: format!("docx-reformat/{}", env!("CARGO_PKG_VERSION")),
            version_suffix: "_v1".to_string(),
            sanitize_preview: false,
        }
    }
}

impl WorkflowConfig {
    /// Create a new builder for `WorkflowConfig`.
    pub fn builder() -> WorkflowConfigBuilder {
        WorkflowConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`WorkflowConfig`].
#[derive(Debug)]
pub struct WorkflowConfigBuilder {
    config: WorkflowConfig,
}

impl WorkflowConfigBuilder {
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn request_timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    pub fn version_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.config.version_suffix = suffix.into();
        self
    }

    pub fn sanitize_preview(mut self, v: bool) -> Self {
        self.config.sanitize_preview = v;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<WorkflowConfig, DocFlowError> {
        let c = &self.config;
        if !(c.endpoint.starts_with("http://") || c.endpoint.starts_with("https://")) {
            return Err(DocFlowError::InvalidConfig(format!(
                "endpoint must be an HTTP/HTTPS URL, got '{}'",
                c.endpoint
            )));
        }
        if c.request_timeout_secs == Some(0) {
            return Err(DocFlowError::InvalidConfig(
                "request timeout must be ≥ 1 second (use no timeout instead of 0)".into(),
            ));
        }
        if c.version_suffix.is_empty() || c.version_suffix.contains(['/', '\\']) {
            return Err(DocFlowError::InvalidConfig(format!(
                "version suffix must be a non-empty filename fragment, got '{}'",
                c.version_suffix
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_hosted_service() {
        let c = WorkflowConfig::default();
        assert_eq!(c.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(c.request_timeout_secs, Some(300));
        assert_eq!(c.version_suffix, "_v1");
        assert!(!c.sanitize_preview);
    }

    #[test]
    fn builder_rejects_non_http_endpoint() {
        let err = WorkflowConfig::builder()
            .endpoint("ftp://example.com/upload")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("ftp://"));
    }

    #[test]
    fn builder_rejects_zero_timeout() {
        assert!(WorkflowConfig::builder()
            .request_timeout_secs(Some(0))
            .build()
            .is_err());
        assert!(WorkflowConfig::builder()
            .request_timeout_secs(None)
            .build()
            .is_ok());
    }

    #[test]
    fn builder_rejects_path_in_suffix() {
        assert!(WorkflowConfig::builder()
            .version_suffix("../v2")
            .build()
            .is_err());
    }
}
