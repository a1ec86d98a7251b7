// Configuration errors: missing credentials or plugin selection detected
// before any request is sent. `RemoteRequestError` covers typed calls the CMS
// rejected; other transport failures travel as `anyhow::Error` with context
// attached by `api`.

use thiserror::Error;

use crate::api::RemoteError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("an admin token is required for {0}")]
    MissingAdminToken(&'static str),

    #[error("no scheduler plugin configured; call `configure_scheduler` first")]
    MissingSchedulerPlugin,

    #[error("CMS_API_TOKEN is not set")]
    MissingApiToken,

    #[error("unknown scheduler plugin `{0}` (expected `scheduler` or `publisher`)")]
    UnknownSchedulerPlugin(String),
}

/// A typed call (upload, folder creation) the CMS refused. Carries the HTTP
/// status, the `error` object when the body had one, and the raw body.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("CMS answered {status}: {}", describe(.error.as_ref(), .body))]
pub struct RemoteRequestError {
    pub status: u16,
    pub error: Option<RemoteError>,
    pub body: String,
}

fn describe<'a>(error: Option<&'a RemoteError>, body: &'a str) -> &'a str {
    error
        .and_then(|e| e.message.as_deref().or(e.name.as_deref()))
        .unwrap_or(body)
}
