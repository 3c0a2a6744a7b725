use std::sync::Arc;

use base64::Engine;

use crate::config::ServerConfig;
use crate::error::McpGhError;
use crate::runner::{CommandRunner, CommandSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// An authenticated `gh` session; operations go through the CLI.
    CliSession,
    /// A bearer token; operations go through the REST API.
    Token,
}

/// Credentials for a single tool call. Never cached between calls.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub mode: AuthMode,
    pub token: Option<String>,
}

// Hand-written so the token can't end up in a log line via `{:?}`.
impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthContext")
            .field("mode", &self.mode)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl AuthContext {
    pub fn cli_session() -> Self {
        Self {
            mode: AuthMode::CliSession,
            token: None,
        }
    }

    pub fn token(token: String) -> Self {
        Self {
            mode: AuthMode::Token,
            token: Some(token),
        }
    }

    /// Environment that gives `git` credentials for `host` without them ever
    /// touching argv or `.git/config`. A token becomes an auth header; a CLI
    /// session delegates to `gh auth git-credential`, like `gh auth setup-git`.
    pub fn git_envs(&self, host: &str, gh_path: &str) -> Vec<(String, String)> {
        let pairs: Vec<(String, String)> = match (self.mode, self.token.as_deref()) {
            (AuthMode::Token, Some(token)) => {
                let basic = base64::engine::general_purpose::STANDARD
                    .encode(format!("x-access-token:{}", token));
                vec![(
                    format!("http.https://{}/.extraheader", host),
                    format!("AUTHORIZATION: basic {}", basic),
                )]
            }
            (AuthMode::Token, None) => Vec::new(),
            (AuthMode::CliSession, _) => {
                let key = format!("credential.https://{}.helper", host);
                vec![
                    // empty value clears helpers inherited from global config
                    (key.clone(), String::new()),
                    (key, format!("!{} auth git-credential", gh_path)),
                ]
            }
        };
        git_config_envs(pairs)
    }
}

/// Encode config pairs as `GIT_CONFIG_COUNT`/`GIT_CONFIG_KEY_n`/`GIT_CONFIG_VALUE_n`.
fn git_config_envs(pairs: Vec<(String, String)>) -> Vec<(String, String)> {
    if pairs.is_empty() {
        return Vec::new();
    }
    let mut envs = vec![("GIT_CONFIG_COUNT".to_string(), pairs.len().to_string())];
    for (i, (key, value)) in pairs.into_iter().enumerate() {
        envs.push((format!("GIT_CONFIG_KEY_{}", i), key));
        envs.push((format!("GIT_CONFIG_VALUE_{}", i), value));
    }
    envs
}

/// Decides per call whether to use the `gh` session or the fallback token.
#[derive(Clone)]
pub struct CredentialResolver {
    runner: Arc<dyn CommandRunner>,
    config: Arc<ServerConfig>,
}

impl CredentialResolver {
    pub fn new(runner: Arc<dyn CommandRunner>, config: Arc<ServerConfig>) -> Self {
        Self { runner, config }
    }

    pub async fn resolve(&self) -> Result<AuthContext, McpGhError> {
        if self.config.use_gh_cli && self.gh_session_active().await {
            tracing::debug!("Using authenticated gh session");
            return Ok(AuthContext::cli_session());
        }

        match self.config.token_source.read() {
            Some(token) => {
                tracing::debug!(source = %self.config.token_source.describe(), "Using token");
                Ok(AuthContext::token(token))
            }
            None => Err(McpGhError::AuthUnavailable),
        }
    }

    async fn gh_session_active(&self) -> bool {
        let host = self.config.git_host();
        let status = CommandSpec::new(
            &self.config.gh_path,
            ["auth", "status", "--hostname", host.as_str()],
        );
        match self.runner.run(&status).await {
            Ok(out) => out.success(),
            Err(e) => {
                // usually gh is simply not installed
                tracing::debug!(error = %e, "gh auth status could not run");
                false
            }
        }
    }
}
