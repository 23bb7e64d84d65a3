use thiserror::Error;

/// Failure kinds of the remote mutation and dispatch protocols.
///
/// Public operations collapse these to `false` for the operator; the variant
/// and its status/body details only reach the diagnostic log.
#[derive(Debug, Error)]
pub enum PanelError {
    #[error("no GitHub token configured")]
    NoCredential,

    #[error("fetching '{path}' failed (HTTP {status}): {body}")]
    FetchFailed {
        path: String,
        status: u16,
        body: String,
    },

    #[error("writing '{path}' failed (HTTP {status}): {body}")]
    WriteFailed {
        path: String,
        status: u16,
        body: String,
    },

    #[error("could not decode '{path}': {reason}")]
    DecodeFailed { path: String, reason: String },

    #[error("could not parse '{path}': {reason}")]
    ParseFailed { path: String, reason: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("dispatch of '{workflow}' rejected (HTTP {status}): {body}")]
    DispatchRejected {
        workflow: String,
        status: u16,
        body: String,
    },

    #[error("invalid cron expression '{0}'")]
    InvalidCron(String),
}

impl PanelError {
    /// HTTP status carried by the error, if the remote answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            PanelError::FetchFailed { status, .. }
            | PanelError::WriteFailed { status, .. }
            | PanelError::DispatchRejected { status, .. } => Some(*status),
            PanelError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_exposed_for_http_failures() {
        let err = PanelError::WriteFailed {
            path: "config/sources.json".into(),
            status: 409,
            body: "{\"message\":\"sha mismatch\"}".into(),
        };
        assert_eq!(err.status(), Some(409));
        assert!(err.to_string().contains("HTTP 409"));
    }

    #[test]
    fn no_credential_has_no_status() {
        assert_eq!(PanelError::NoCredential.status(), None);
        assert_eq!(PanelError::InvalidCron("x".into()).status(), None);
    }
}
