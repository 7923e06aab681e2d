//! Startup errors and the process exit statuses they map to.

use std::process::ExitCode;

use iolo_core::ConnectionFileError;

use crate::sink::SinkError;
use crate::source::SourceError;

/// Documented process exit statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitStatus {
    /// Inbound channel closed cleanly.
    Success = 0,
    /// No connection file argument was given.
    MissingConnectionFile = 3,
    /// Connection file unreadable or invalid.
    ConnectionFile = 4,
    /// Hub URL could not be parsed.
    HubUrl = 5,
    /// Hub connection could not be established.
    HubConnect = 6,
    /// IOPub subscription socket could not be opened.
    Subscribe = 7,
    /// Too many consecutive outbound write failures.
    SustainedOutboundFailure = 8,
    /// Inbound socket failed with a transport error.
    InboundFailure = 9,
    /// Stopped by SIGINT/SIGTERM.
    Interrupted = 130,
}

impl ExitStatus {
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        Self::from(status.code())
    }
}

/// Fatal errors raised before the bridge starts streaming.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("no connection file given")]
    MissingConnectionFile,

    #[error(transparent)]
    ConnectionFile(#[from] ConnectionFileError),

    #[error("invalid hub URL {url:?}: {reason}")]
    HubUrl { url: String, reason: String },

    #[error("failed to connect to hub: {0}")]
    HubConnect(#[source] SinkError),

    #[error("failed to open IOPub subscription: {0}")]
    Subscribe(#[source] SourceError),
}

impl StartupError {
    pub const fn exit_status(&self) -> ExitStatus {
        match self {
            Self::MissingConnectionFile => ExitStatus::MissingConnectionFile,
            Self::ConnectionFile(_) => ExitStatus::ConnectionFile,
            Self::HubUrl { .. } => ExitStatus::HubUrl,
            Self::HubConnect(_) => ExitStatus::HubConnect,
            Self::Subscribe(_) => ExitStatus::Subscribe,
        }
    }
}

/// Parse and check a hub URL. Only plain `ws://` is supported.
pub fn parse_hub_url(raw: &str) -> Result<url::Url, StartupError> {
    let url = url::Url::parse(raw).map_err(|e| StartupError::HubUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "ws" => {}
        other => {
            return Err(StartupError::HubUrl {
                url: raw.to_string(),
                reason: format!("unsupported scheme {other:?}, expected ws"),
            });
        }
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(StartupError::HubUrl {
            url: raw.to_string(),
            reason: "missing host".into(),
        });
    }
    Ok(url)
}
