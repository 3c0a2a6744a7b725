//! Tool names, typed parameters, and argument validation.

use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::McpGhError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    CreateRepo,
    CommitAndPush,
    CloneRepo,
    CreateIssue,
    ListRepos,
    GetRepoInfo,
}

impl ToolName {
    pub const ALL: [ToolName; 6] = [
        ToolName::CreateRepo,
        ToolName::CommitAndPush,
        ToolName::CloneRepo,
        ToolName::CreateIssue,
        ToolName::ListRepos,
        ToolName::GetRepoInfo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::CreateRepo => "create_repo",
            ToolName::CommitAndPush => "commit_and_push",
            ToolName::CloneRepo => "clone_repo",
            ToolName::CreateIssue => "create_issue",
            ToolName::ListRepos => "list_repos",
            ToolName::GetRepoInfo => "get_repo_info",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ToolName::CreateRepo => "Create a new GitHub repository for the authenticated user",
            ToolName::CommitAndPush => {
                "Stage files (or all changes) in a local repository, commit, and push"
            }
            ToolName::CloneRepo => "Clone a GitHub repository into a local directory",
            ToolName::CreateIssue => "Create an issue in a repository, optionally with labels",
            ToolName::ListRepos => {
                "List repositories for the authenticated user or a given owner"
            }
            ToolName::GetRepoInfo => {
                "Get repository info including description, visibility, stars, forks, language, and dates"
            }
        }
    }

    /// JSON Schema of the tool's arguments, as published in `tools/list`.
    pub fn input_schema(&self) -> Arc<serde_json::Map<String, serde_json::Value>> {
        match self {
            ToolName::CreateRepo => schema_object::<CreateRepoParams>(),
            ToolName::CommitAndPush => schema_object::<CommitAndPushParams>(),
            ToolName::CloneRepo => schema_object::<CloneRepoParams>(),
            ToolName::CreateIssue => schema_object::<CreateIssueParams>(),
            ToolName::ListRepos => schema_object::<ListReposParams>(),
            ToolName::GetRepoInfo => schema_object::<RepoInfoParams>(),
        }
    }
}

fn schema_object<T: schemars::JsonSchema>() -> Arc<serde_json::Map<String, serde_json::Value>> {
    let schema = schemars::schema_for!(T);
    let value = serde_json::to_value(&schema)
        .unwrap_or_else(|_| serde_json::json!({ "type": "object" }));
    Arc::new(value.as_object().cloned().unwrap_or_default())
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = McpGhError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| McpGhError::InvalidArgument(format!("unknown tool '{}'", s)))
    }
}

// -- Tool parameter types --

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct CreateRepoParams {
    #[schemars(description = "Repository name")]
    pub name: String,

    #[schemars(description = "Repository description")]
    #[serde(default)]
    pub description: Option<String>,

    #[schemars(description = "Create a private repository (default: false)")]
    #[serde(default)]
    pub private: Option<bool>,

    #[schemars(description = "Initialize with a README (default: true)")]
    #[serde(default)]
    pub initialize: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct CommitAndPushParams {
    #[schemars(description = "Path of the local git repository")]
    #[serde(alias = "repo_path")]
    pub path: String,

    #[schemars(description = "Commit message")]
    #[serde(alias = "commit_message")]
    pub message: String,

    #[schemars(description = "Files to commit, relative to path (default: all changes)")]
    #[serde(default)]
    pub files: Option<Vec<String>>,

    #[schemars(description = "Branch to push to (default: the tracked upstream)")]
    #[serde(default)]
    pub branch: Option<String>,
}

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct CloneRepoParams {
    #[schemars(description = "Repository URL or owner/repo")]
    #[serde(alias = "repo_url")]
    pub repo: String,

    #[schemars(description = "Local destination directory (default: derived from the repository name)")]
    #[serde(default)]
    pub destination: Option<String>,

    #[schemars(description = "Branch to check out")]
    #[serde(default)]
    pub branch: Option<String>,
}

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct CreateIssueParams {
    #[schemars(description = "Repository in owner/repo format")]
    pub repo: String,

    #[schemars(description = "Issue title")]
    pub title: String,

    #[schemars(description = "Issue body")]
    #[serde(default)]
    pub body: Option<String>,

    #[schemars(description = "Label names to apply")]
    #[serde(default)]
    pub labels: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, schemars::JsonSchema)]
pub struct ListReposParams {
    #[schemars(
        description = "Filter by visibility: all, public, or private (default: all). \
                       'owner' lists only repositories the authenticated user owns"
    )]
    #[serde(default, alias = "type")]
    pub visibility: Option<String>,

    #[schemars(description = "User or organization to list (default: the authenticated user)")]
    #[serde(default)]
    pub owner: Option<String>,

    #[schemars(description = "Maximum number of results")]
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct RepoInfoParams {
    #[schemars(description = "Repository in owner/repo format")]
    pub repo: String,
}

/// A validated-shape tool call, one variant per tool.
#[derive(Debug, Clone)]
pub enum ToolRequest {
    CreateRepo(CreateRepoParams),
    CommitAndPush(CommitAndPushParams),
    CloneRepo(CloneRepoParams),
    CreateIssue(CreateIssueParams),
    ListRepos(ListReposParams),
    GetRepoInfo(RepoInfoParams),
}

impl ToolRequest {
    /// Build a request from a tool name and its raw JSON arguments.
    pub fn parse(name: &str, arguments: serde_json::Value) -> Result<Self, McpGhError> {
        let tool: ToolName = name.parse()?;
        let arguments = match arguments {
            serde_json::Value::Null => serde_json::Value::Object(Default::default()),
            v @ serde_json::Value::Object(_) => v,
            _ => {
                return Err(McpGhError::InvalidArgument(
                    "arguments must be a JSON object".to_string(),
                ))
            }
        };

        fn de<T: serde::de::DeserializeOwned>(v: serde_json::Value) -> Result<T, McpGhError> {
            serde_json::from_value(v).map_err(|e| McpGhError::InvalidArgument(e.to_string()))
        }

        Ok(match tool {
            ToolName::CreateRepo => ToolRequest::CreateRepo(de(arguments)?),
            ToolName::CommitAndPush => ToolRequest::CommitAndPush(de(arguments)?),
            ToolName::CloneRepo => ToolRequest::CloneRepo(de(arguments)?),
            ToolName::CreateIssue => ToolRequest::CreateIssue(de(arguments)?),
            ToolName::ListRepos => ToolRequest::ListRepos(de(arguments)?),
            ToolName::GetRepoInfo => ToolRequest::GetRepoInfo(de(arguments)?),
        })
    }

    pub fn name(&self) -> ToolName {
        match self {
            ToolRequest::CreateRepo(_) => ToolName::CreateRepo,
            ToolRequest::CommitAndPush(_) => ToolName::CommitAndPush,
            ToolRequest::CloneRepo(_) => ToolName::CloneRepo,
            ToolRequest::CreateIssue(_) => ToolName::CreateIssue,
            ToolRequest::ListRepos(_) => ToolName::ListRepos,
            ToolRequest::GetRepoInfo(_) => ToolName::GetRepoInfo,
        }
    }

    /// Shape checks that need no I/O.
    pub fn validate(&self) -> Result<(), McpGhError> {
        match self {
            ToolRequest::CreateRepo(p) => {
                sanitize_github_name(&p.name, "name")?;
                if let Some(ref d) = p.description {
                    reject_control_chars(d, "description")?;
                }
            }
            ToolRequest::CommitAndPush(p) => {
                require_non_empty(&p.path, "path")?;
                require_non_empty(&p.message, "message")?;
                if let Some(ref files) = p.files {
                    if files.is_empty() {
                        return Err(McpGhError::InvalidArgument(
                            "files must not be an empty list (omit it to commit all changes)"
                                .to_string(),
                        ));
                    }
                    for f in files {
                        require_non_empty(f, "files[]")?;
                    }
                }
                if let Some(ref b) = p.branch {
                    sanitize_branch(b)?;
                }
            }
            ToolRequest::CloneRepo(p) => {
                require_non_empty(&p.repo, "repo")?;
                if p.repo.chars().any(char::is_whitespace) || p.repo.starts_with('-') {
                    return Err(McpGhError::InvalidArgument(
                        "repo must be a URL or owner/repo".to_string(),
                    ));
                }
                if let Some(ref d) = p.destination {
                    require_non_empty(d, "destination")?;
                }
                if let Some(ref b) = p.branch {
                    sanitize_branch(b)?;
                }
            }
            ToolRequest::CreateIssue(p) => {
                require_non_empty(&p.repo, "repo")?;
                require_non_empty(&p.title, "title")?;
                if let Some(ref labels) = p.labels {
                    for l in labels {
                        require_non_empty(l, "labels[]")?;
                    }
                }
            }
            ToolRequest::ListRepos(p) => {
                Visibility::parse(p.visibility.as_deref())?;
                if let Some(ref owner) = p.owner {
                    sanitize_github_name(owner, "owner")?;
                }
                if p.limit == Some(0) {
                    return Err(McpGhError::InvalidArgument(
                        "limit must be at least 1".to_string(),
                    ));
                }
            }
            ToolRequest::GetRepoInfo(p) => require_non_empty(&p.repo, "repo")?,
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    All,
    Public,
    Private,
    /// Every visibility, limited to repositories the authenticated user owns.
    Owned,
}

impl Visibility {
    pub fn parse(value: Option<&str>) -> Result<Self, McpGhError> {
        match value.unwrap_or("all") {
            "all" => Ok(Visibility::All),
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            "owner" => Ok(Visibility::Owned),
            other => Err(McpGhError::InvalidArgument(format!(
                "visibility must be one of all, public, private, owner (got '{}')",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::All => "all",
            Visibility::Public => "public",
            Visibility::Private => "private",
            Visibility::Owned => "owner",
        }
    }

    /// Value for the REST `visibility`/`type` filters, which have no owner-only form.
    pub fn api_value(&self) -> &'static str {
        match self {
            Visibility::Owned => "all",
            other => other.as_str(),
        }
    }

    /// `gh repo list --visibility` value, if any filter applies.
    pub fn cli_flag(&self) -> Option<&'static str> {
        match self {
            Visibility::Public | Visibility::Private => Some(self.as_str()),
            Visibility::All | Visibility::Owned => None,
        }
    }

    /// Query for `/user/repos`.
    pub fn user_repos_query(&self) -> String {
        match self {
            Visibility::Owned => "affiliation=owner".to_string(),
            other => format!("visibility={}", other.as_str()),
        }
    }
}

/// `owner/name` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    /// Parse `owner/name`, or a bare `name` when a default owner is configured.
    pub fn parse(repo: &str, default_owner: Option<&str>) -> Result<Self, McpGhError> {
        let (owner, name) = match repo.split_once('/') {
            Some((owner, name)) => (owner.to_string(), name.to_string()),
            None => {
                let owner = default_owner.ok_or_else(|| {
                    McpGhError::InvalidArgument(format!(
                        "repo '{}' must be in owner/repo format (or set --owner default)",
                        repo
                    ))
                })?;
                (owner.to_string(), repo.to_string())
            }
        };
        sanitize_github_name(&owner, "owner")?;
        sanitize_github_name(&name, "repo")?;
        Ok(Self { owner, name })
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// URL to hand to `git clone`. Full URLs pass through; `owner/repo` is
/// expanded against `host`.
pub fn clone_url(repo: &str, host: &str) -> Result<String, McpGhError> {
    if repo.contains("://") || repo.starts_with("git@") {
        return Ok(repo.to_string());
    }
    let r = RepoRef::parse(repo, None)?;
    Ok(format!("https://{}/{}/{}.git", host, r.owner, r.name))
}

/// Directory name `git clone` would pick for `repo`.
pub fn default_clone_dir(repo: &str) -> String {
    let last = repo
        .trim_end_matches('/')
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(repo);
    last.strip_suffix(".git").unwrap_or(last).to_string()
}

fn require_non_empty(value: &str, field: &str) -> Result<(), McpGhError> {
    if value.trim().is_empty() {
        return Err(McpGhError::InvalidArgument(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(())
}

fn reject_control_chars(value: &str, field: &str) -> Result<(), McpGhError> {
    if value.contains('\0') {
        return Err(McpGhError::InvalidArgument(format!(
            "{} contains invalid character",
            field
        )));
    }
    Ok(())
}

/// Validate that a GitHub owner/repo name doesn't contain characters that
/// could be used for URL injection in raw API routes.
fn sanitize_github_name(name: &str, field: &str) -> Result<(), McpGhError> {
    require_non_empty(name, field)?;
    if name.starts_with('-') {
        return Err(McpGhError::InvalidArgument(format!(
            "{} must not start with '-'",
            field
        )));
    }
    for ch in ['/', '?', '#', '%', '&', '\0', ' ', '\n', '\t'] {
        if name.contains(ch) {
            return Err(McpGhError::InvalidArgument(format!(
                "{} contains invalid character '{}'",
                field,
                ch.escape_default()
            )));
        }
    }
    Ok(())
}

fn sanitize_branch(branch: &str) -> Result<(), McpGhError> {
    require_non_empty(branch, "branch")?;
    if branch.starts_with('-') || branch.chars().any(|c| c.is_whitespace() || c == '\0') {
        return Err(McpGhError::InvalidArgument(format!(
            "branch '{}' is not a valid branch name",
            branch.escape_default()
        )));
    }
    Ok(())
}
