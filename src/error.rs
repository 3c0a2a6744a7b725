use rmcp::model::ErrorData;

#[derive(Debug, thiserror::Error)]
pub enum McpGhError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("GitHub authentication required. Run 'gh auth login' or set a token environment variable")]
    AuthUnavailable,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("No changes to commit in {0}")]
    NoChanges(String),

    #[error("GitHub error: {0}")]
    Remote(String),

    #[error("git error: {0}")]
    Git(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl McpGhError {
    /// Stable identifier for the error kind, sent to the host alongside the message.
    pub fn kind(&self) -> &'static str {
        match self {
            McpGhError::InvalidArgument(_) => "invalid_argument",
            McpGhError::AuthUnavailable => "auth_unavailable",
            McpGhError::NotFound(_) => "not_found",
            McpGhError::AlreadyExists(_) => "already_exists",
            McpGhError::NoChanges(_) => "no_changes",
            McpGhError::Remote(_) => "remote_error",
            McpGhError::Git(_) => "git_error",
            McpGhError::Io(_) => "io_error",
        }
    }

    pub fn to_mcp_error(&self) -> ErrorData {
        let data = Some(serde_json::json!({ "kind": self.kind() }));
        match self {
            McpGhError::InvalidArgument(_)
            | McpGhError::AuthUnavailable
            | McpGhError::NotFound(_)
            | McpGhError::AlreadyExists(_)
            | McpGhError::NoChanges(_) => ErrorData::invalid_params(self.to_string(), data),
            McpGhError::Remote(_) | McpGhError::Git(_) | McpGhError::Io(_) => {
                ErrorData::internal_error(self.to_string(), data)
            }
        }
    }

    /// Classify a REST failure. A 404 means the resource is missing or hidden
    /// from the current credentials.
    pub fn from_api(e: octocrab::Error, subject: &str) -> Self {
        match e {
            octocrab::Error::GitHub { source, .. } => {
                if source.status_code.as_u16() == 404 {
                    McpGhError::NotFound(subject.to_string())
                } else {
                    McpGhError::Remote(format!(
                        "{} ({})",
                        source.message,
                        source.status_code.as_u16()
                    ))
                }
            }
            other => McpGhError::Remote(other.to_string()),
        }
    }

    /// Classify a failed `gh` invocation from its stderr.
    pub fn from_gh_stderr(stderr: &str, subject: &str) -> Self {
        const NOT_FOUND: [&str; 3] = ["Could not resolve to a Repository", "HTTP 404", "Not Found"];
        if NOT_FOUND.iter().any(|needle| stderr.contains(needle)) {
            McpGhError::NotFound(subject.to_string())
        } else {
            McpGhError::Remote(stderr.trim().to_string())
        }
    }
}
