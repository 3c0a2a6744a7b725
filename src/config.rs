/// Default environment variable holding a GitHub token.
pub const DEFAULT_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// GitHub API maximum page size.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Where the fallback bearer token comes from.
///
/// `Env` is re-read on every resolution so a token exported after startup is
/// picked up; `Static` pins a value (from `--token`, or in tests).
#[derive(Debug, Clone)]
pub enum TokenSource {
    Static(Option<String>),
    Env(String),
}

impl TokenSource {
    pub fn read(&self) -> Option<String> {
        let token = match self {
            TokenSource::Static(t) => t.clone(),
            TokenSource::Env(name) => std::env::var(name).ok(),
        };
        token.filter(|t| !t.trim().is_empty())
    }

    /// Human-readable origin, safe to log.
    pub fn describe(&self) -> String {
        match self {
            TokenSource::Static(Some(_)) => "--token".to_string(),
            TokenSource::Static(None) => "none".to_string(),
            TokenSource::Env(name) => format!("${}", name),
        }
    }
}

impl Default for TokenSource {
    fn default() -> Self {
        TokenSource::Env(DEFAULT_TOKEN_ENV.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub token_source: TokenSource,
    pub default_owner: Option<String>,
    pub max_results: u32,
    pub gh_path: String,
    pub git_path: String,
    /// Check for and use an authenticated `gh` session before falling back to the token.
    pub use_gh_cli: bool,
    /// REST base URL override, e.g. for GitHub Enterprise.
    pub api_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            token_source: TokenSource::default(),
            default_owner: None,
            max_results: 30,
            gh_path: "gh".to_string(),
            git_path: "git".to_string(),
            use_gh_cli: true,
            api_url: None,
        }
    }
}

impl ServerConfig {
    /// Cap a requested result count to the API maximum.
    pub fn capped_limit(&self, limit: Option<u32>) -> u32 {
        std::cmp::min(limit.unwrap_or(self.max_results), MAX_PAGE_SIZE)
    }

    /// Host that git credentials are scoped to, derived from the API URL.
    pub fn git_host(&self) -> String {
        match self.api_url.as_deref() {
            None => "github.com".to_string(),
            Some(url) => {
                let without_scheme = url.split("://").nth(1).unwrap_or(url);
                let host = without_scheme.split('/').next().unwrap_or(without_scheme);
                host.strip_prefix("api.").unwrap_or(host).to_string()
            }
        }
    }
}
