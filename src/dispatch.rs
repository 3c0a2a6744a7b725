//! Routes each typed tool request to `gh`, `git`, or the REST API.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{json, Value};

use crate::auth::{AuthContext, AuthMode, CredentialResolver};
use crate::config::ServerConfig;
use crate::error::McpGhError;
use crate::runner::{CommandOutput, CommandRunner, CommandSpec};
use crate::tools::{
    clone_url, default_clone_dir, CloneRepoParams, CommitAndPushParams, CreateIssueParams,
    CreateRepoParams, ListReposParams, RepoInfoParams, RepoRef, ToolRequest, Visibility,
};

#[derive(Clone)]
pub struct Dispatcher {
    config: Arc<ServerConfig>,
    runner: Arc<dyn CommandRunner>,
    resolver: CredentialResolver,
}

impl Dispatcher {
    pub fn new(config: ServerConfig, runner: Arc<dyn CommandRunner>) -> Self {
        let config = Arc::new(config);
        Self {
            resolver: CredentialResolver::new(runner.clone(), config.clone()),
            config,
            runner,
        }
    }

    /// Validate, resolve credentials, and run one tool call.
    pub async fn dispatch(&self, request: ToolRequest) -> Result<Value, McpGhError> {
        let tool = request.name();
        request.validate()?;
        tracing::info!(tool = %tool, "Dispatching tool call");

        let result = match request {
            ToolRequest::CreateRepo(p) => self.create_repo(p).await,
            ToolRequest::CommitAndPush(p) => self.commit_and_push(p).await,
            ToolRequest::CloneRepo(p) => self.clone_repo(p).await,
            ToolRequest::CreateIssue(p) => self.create_issue(p).await,
            ToolRequest::ListRepos(p) => self.list_repos(p).await,
            ToolRequest::GetRepoInfo(p) => self.get_repo_info(p).await,
        };

        if let Err(ref e) = result {
            tracing::warn!(tool = %tool, kind = e.kind(), error = %e, "Tool call failed");
        }
        result
    }

    async fn create_repo(&self, p: CreateRepoParams) -> Result<Value, McpGhError> {
        let auth = self.resolver.resolve().await?;
        let private = p.private.unwrap_or(false);
        let initialize = p.initialize.unwrap_or(true);

        match auth.mode {
            AuthMode::CliSession => {
                let mut args = vec![
                    "repo".to_string(),
                    "create".to_string(),
                    p.name.clone(),
                    if private { "--private" } else { "--public" }.to_string(),
                ];
                if let Some(ref d) = p.description {
                    args.push(format!("--description={}", d));
                }
                if initialize {
                    args.push("--add-readme".to_string());
                }

                let out = self.gh(args).await?;
                if !out.success() {
                    return Err(McpGhError::from_gh_stderr(&out.stderr, &p.name));
                }
                let url = last_line(&out.stdout);
                Ok(json!({
                    "name": p.name,
                    "url": url,
                    "clone_url": format!("{}.git", url),
                    "private": private,
                }))
            }
            AuthMode::Token => {
                let github = self.api(&auth)?;
                let body = json!({
                    "name": p.name,
                    "description": p.description.as_deref().unwrap_or(""),
                    "private": private,
                    "auto_init": initialize,
                });
                let repo: Value = github
                    .post("/user/repos", Some(&body))
                    .await
                    .map_err(|e| McpGhError::from_api(e, &p.name))?;
                Ok(json!({
                    "name": repo.get("name"),
                    "full_name": repo.get("full_name"),
                    "url": repo.get("html_url"),
                    "clone_url": repo.get("clone_url"),
                    "private": repo.get("private"),
                }))
            }
        }
    }

    async fn commit_and_push(&self, p: CommitAndPushParams) -> Result<Value, McpGhError> {
        let repo_dir = PathBuf::from(&p.path);
        if !repo_dir.is_dir() {
            return Err(McpGhError::InvalidArgument(format!(
                "path does not exist: {}",
                p.path
            )));
        }
        if !repo_dir.join(".git").exists() {
            return Err(McpGhError::InvalidArgument(format!(
                "not a git repository: {}",
                p.path
            )));
        }
        if let Some(ref files) = p.files {
            let missing: Vec<&str> = files
                .iter()
                .filter(|f| !repo_dir.join(f).exists())
                .map(String::as_str)
                .collect();
            if !missing.is_empty() {
                return Err(McpGhError::InvalidArgument(format!(
                    "files not found in {}: {}",
                    p.path,
                    missing.join(", ")
                )));
            }
        }

        let auth = self.resolver.resolve().await?;
        let envs = self.git_envs(&auth);

        let mut add = vec!["add".to_string()];
        match p.files {
            Some(ref files) => {
                add.push("--".to_string());
                add.extend(files.iter().cloned());
            }
            None => add.push("--all".to_string()),
        }
        self.git_checked(&repo_dir, add, Vec::new()).await?;

        // exit 0 from --quiet means the index matches HEAD
        let diff = self
            .git(&repo_dir, ["diff", "--cached", "--quiet"], Vec::new())
            .await?;
        match diff.exit_code {
            0 => return Err(McpGhError::NoChanges(p.path)),
            1 => {}
            _ => return Err(McpGhError::Git(diff.stderr.trim().to_string())),
        }

        let commit = self
            .git_checked(
                &repo_dir,
                vec!["commit".to_string(), "-m".to_string(), p.message.clone()],
                Vec::new(),
            )
            .await?;

        let mut push = vec!["push".to_string()];
        if let Some(ref branch) = p.branch {
            push.push("origin".to_string());
            push.push(branch.clone());
        }
        self.git_checked(&repo_dir, push, envs).await?;

        Ok(json!({
            "path": p.path,
            "message": p.message,
            "commit": first_line(&commit.stdout),
            "files": p.files,
            "pushed_to": p.branch.as_deref().unwrap_or("upstream"),
        }))
    }

    async fn clone_repo(&self, p: CloneRepoParams) -> Result<Value, McpGhError> {
        let destination = p
            .destination
            .clone()
            .unwrap_or_else(|| default_clone_dir(&p.repo));
        if is_occupied(Path::new(&destination))? {
            return Err(McpGhError::AlreadyExists(destination));
        }
        let url = clone_url(&p.repo, &self.config.git_host())?;

        let auth = self.resolver.resolve().await?;
        let envs = self.git_envs(&auth);

        let mut args = vec!["clone".to_string()];
        if let Some(ref branch) = p.branch {
            args.push("--branch".to_string());
            args.push(branch.clone());
        }
        args.extend(["--".to_string(), url, destination.clone()]);

        let spec = CommandSpec::new(&self.config.git_path, args).envs(envs);
        let out = self.runner.run(&spec).await?;
        if !out.success() {
            return Err(clone_failure(&out.stderr, &p.repo, p.branch.as_deref()));
        }

        Ok(json!({
            "repo": p.repo,
            "location": destination,
            "branch": p.branch,
        }))
    }

    async fn create_issue(&self, p: CreateIssueParams) -> Result<Value, McpGhError> {
        let repo = RepoRef::parse(&p.repo, self.config.default_owner.as_deref())?;
        let auth = self.resolver.resolve().await?;
        let labels = p.labels.clone().unwrap_or_default();

        match auth.mode {
            AuthMode::CliSession => {
                let mut args = vec![
                    "issue".to_string(),
                    "create".to_string(),
                    format!("--repo={}", repo),
                    format!("--title={}", p.title),
                    format!("--body={}", p.body.as_deref().unwrap_or("")),
                ];
                args.extend(labels.iter().map(|l| format!("--label={}", l)));

                let out = self.gh(args).await?;
                if !out.success() {
                    return Err(McpGhError::from_gh_stderr(&out.stderr, &repo.full_name()));
                }
                let url = last_line(&out.stdout);
                let number = url.rsplit('/').next().and_then(|n| n.parse::<u64>().ok());
                Ok(json!({
                    "repo": repo.full_name(),
                    "number": number,
                    "title": p.title,
                    "url": url,
                    "labels": labels,
                }))
            }
            AuthMode::Token => {
                let github = self.api(&auth)?;
                let route = format!("/repos/{}/{}/issues", repo.owner, repo.name);
                let body = json!({
                    "title": p.title,
                    "body": p.body.as_deref().unwrap_or(""),
                    "labels": labels,
                });
                let issue: Value = github
                    .post(route, Some(&body))
                    .await
                    .map_err(|e| McpGhError::from_api(e, &repo.full_name()))?;
                Ok(json!({
                    "repo": repo.full_name(),
                    "number": issue.get("number"),
                    "title": issue.get("title"),
                    "url": issue.get("html_url"),
                    "labels": labels,
                }))
            }
        }
    }

    async fn list_repos(&self, p: ListReposParams) -> Result<Value, McpGhError> {
        let visibility = Visibility::parse(p.visibility.as_deref())?;
        let owner = p.owner.or_else(|| self.config.default_owner.clone());
        let limit = self.config.capped_limit(p.limit);
        let auth = self.resolver.resolve().await?;

        let repos: Vec<Value> = match auth.mode {
            AuthMode::CliSession => {
                let mut args = vec!["repo".to_string(), "list".to_string()];
                if let Some(ref o) = owner {
                    args.push(o.clone());
                }
                args.push(format!("--limit={}", limit));
                args.push("--json=name,nameWithOwner,description,isPrivate,url".to_string());
                if let Some(v) = visibility.cli_flag() {
                    args.push(format!("--visibility={}", v));
                }

                let out = self.gh(args).await?;
                if !out.success() {
                    return Err(McpGhError::from_gh_stderr(
                        &out.stderr,
                        owner.as_deref().unwrap_or("authenticated user"),
                    ));
                }
                let items: Vec<Value> = parse_json_array(&out.stdout)?;
                items
                    .iter()
                    .map(|r| {
                        json!({
                            "name": r.get("name"),
                            "full_name": r.get("nameWithOwner"),
                            "description": r.get("description").and_then(Value::as_str).unwrap_or(""),
                            "private": r.get("isPrivate").and_then(Value::as_bool).unwrap_or(false),
                            "url": r.get("url"),
                        })
                    })
                    .collect()
            }
            AuthMode::Token => {
                let github = self.api(&auth)?;
                let items = match owner {
                    Some(ref o) => {
                        self.list_owner_repos(&github, o, visibility, limit)
                            .await?
                    }
                    None => {
                        let route = format!(
                            "/user/repos?per_page={}&sort=updated&{}",
                            limit,
                            visibility.user_repos_query()
                        );
                        github
                            .get::<Vec<Value>, _, _>(&route, None::<&()>)
                            .await
                            .map_err(|e| McpGhError::from_api(e, "authenticated user"))?
                    }
                };
                items
                    .iter()
                    .map(|r| {
                        json!({
                            "name": r.get("name"),
                            "full_name": r.get("full_name"),
                            "description": r.get("description").and_then(Value::as_str).unwrap_or(""),
                            "private": r.get("private").and_then(Value::as_bool).unwrap_or(false),
                            "url": r.get("html_url"),
                        })
                    })
                    .collect()
            }
        };

        Ok(json!({
            "owner": owner,
            "visibility": visibility.as_str(),
            "repos": repos,
            "count": repos.len(),
        }))
    }

    async fn get_repo_info(&self, p: RepoInfoParams) -> Result<Value, McpGhError> {
        let repo = RepoRef::parse(&p.repo, self.config.default_owner.as_deref())?;
        let auth = self.resolver.resolve().await?;

        // `gh api` returns the same REST document, so both paths share the formatting
        let raw: Value = match auth.mode {
            AuthMode::CliSession => {
                let out = self
                    .gh(["api".to_string(), format!("repos/{}/{}", repo.owner, repo.name)])
                    .await?;
                if !out.success() {
                    return Err(McpGhError::from_gh_stderr(&out.stderr, &repo.full_name()));
                }
                serde_json::from_str(&out.stdout)
                    .map_err(|e| McpGhError::Remote(format!("unexpected gh output: {}", e)))?
            }
            AuthMode::Token => self
                .api(&auth)?
                .get(format!("/repos/{}/{}", repo.owner, repo.name), None::<&()>)
                .await
                .map_err(|e| McpGhError::from_api(e, &repo.full_name()))?,
        };

        Ok(json!({
            "full_name": raw.get("full_name"),
            "description": raw.get("description"),
            "private": raw.get("private"),
            "stars": raw.get("stargazers_count"),
            "forks": raw.get("forks_count"),
            "open_issues": raw.get("open_issues_count"),
            "language": raw.get("language"),
            "default_branch": raw.get("default_branch"),
            "url": raw.get("html_url"),
            "created_at": raw.get("created_at"),
            "updated_at": raw.get("updated_at"),
            "size_kb": raw.get("size"),
        }))
    }

    /// Repositories of a named owner. Organizations filter by visibility
    /// server-side; for the token's own login `/user/repos` includes private
    /// repos; any other user only exposes public ones.
    async fn list_owner_repos(
        &self,
        github: &octocrab::Octocrab,
        owner: &str,
        visibility: Visibility,
        limit: u32,
    ) -> Result<Vec<Value>, McpGhError> {
        let org_route = format!(
            "/orgs/{}/repos?per_page={}&type={}",
            owner,
            limit,
            visibility.api_value()
        );
        match github.get::<Vec<Value>, _, _>(&org_route, None::<&()>).await {
            Ok(items) => return Ok(items),
            Err(e) => match McpGhError::from_api(e, owner) {
                McpGhError::NotFound(_) => {}
                other => return Err(other),
            },
        }

        // Not an org, so it is a user
        let me: Value = github
            .get("/user", None::<&()>)
            .await
            .map_err(|e| McpGhError::from_api(e, "authenticated user"))?;
        let is_self = me
            .get("login")
            .and_then(Value::as_str)
            .is_some_and(|login| login.eq_ignore_ascii_case(owner));

        if is_self {
            let route = format!(
                "/user/repos?per_page={}&sort=updated&affiliation=owner&visibility={}",
                limit,
                visibility.api_value()
            );
            return github
                .get(&route, None::<&()>)
                .await
                .map_err(|e| McpGhError::from_api(e, owner));
        }

        if visibility == Visibility::Private {
            // other users' private repos are never listed
            return Ok(Vec::new());
        }
        let route = format!("/users/{}/repos?per_page={}&sort=updated", owner, limit);
        github
            .get(&route, None::<&()>)
            .await
            .map_err(|e| McpGhError::from_api(e, owner))
    }

    // -- external call helpers --

    fn git_envs(&self, auth: &AuthContext) -> Vec<(String, String)> {
        auth.git_envs(&self.config.git_host(), &self.config.gh_path)
    }

    async fn gh<I>(&self, args: I) -> Result<CommandOutput, McpGhError>
    where
        I: IntoIterator<Item = String>,
    {
        // keep gh on the same host the API URL points at
        let spec = CommandSpec::new(&self.config.gh_path, args)
            .envs(vec![("GH_HOST".to_string(), self.config.git_host())]);
        Ok(self.runner.run(&spec).await?)
    }

    async fn git<I, S>(
        &self,
        dir: &Path,
        args: I,
        envs: Vec<(String, String)>,
    ) -> Result<CommandOutput, McpGhError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let spec = CommandSpec::new(&self.config.git_path, args)
            .cwd(dir)
            .envs(envs);
        Ok(self.runner.run(&spec).await?)
    }

    /// Like `git`, but a non-zero exit becomes `McpGhError::Git`.
    async fn git_checked(
        &self,
        dir: &Path,
        args: Vec<String>,
        envs: Vec<(String, String)>,
    ) -> Result<CommandOutput, McpGhError> {
        let out = self.git(dir, args, envs).await?;
        if !out.success() {
            let detail = if out.stderr.trim().is_empty() {
                out.stdout.trim()
            } else {
                out.stderr.trim()
            };
            return Err(McpGhError::Git(detail.to_string()));
        }
        Ok(out)
    }

    fn api(&self, auth: &AuthContext) -> Result<octocrab::Octocrab, McpGhError> {
        let token = auth.token.clone().ok_or(McpGhError::AuthUnavailable)?;
        let mut builder = octocrab::OctocrabBuilder::new().personal_token(token);
        if let Some(ref url) = self.config.api_url {
            builder = builder
                .base_uri(url.as_str())
                .map_err(|e| McpGhError::InvalidArgument(format!("invalid API URL: {}", e)))?;
        }
        builder
            .build()
            .map_err(|e| McpGhError::Remote(format!("Failed to create GitHub client: {}", e)))
    }
}

/// Classify a failed `git clone`. A missing branch is the caller's mistake;
/// an unknown or unreadable repository (git falls back to a credential prompt
/// for private repos it cannot see) is reported as not found.
fn clone_failure(stderr: &str, repo: &str, branch: Option<&str>) -> McpGhError {
    let lower = stderr.to_lowercase();
    if lower.contains("remote branch") && lower.contains("not found") {
        return McpGhError::InvalidArgument(format!(
            "branch '{}' does not exist in {}",
            branch.unwrap_or_default(),
            repo
        ));
    }
    const NOT_FOUND: [&str; 4] = [
        "repository not found",
        "could not read username",
        "does not exist",
        "not found",
    ];
    if NOT_FOUND.iter().any(|needle| lower.contains(needle)) {
        return McpGhError::NotFound(repo.to_string());
    }
    McpGhError::Git(stderr.trim().to_string())
}

/// A destination counts as taken if it is a file or a non-empty directory.
fn is_occupied(path: &Path) -> Result<bool, McpGhError> {
    if !path.exists() {
        return Ok(false);
    }
    if !path.is_dir() {
        return Ok(true);
    }
    Ok(std::fs::read_dir(path)?.next().is_some())
}

fn parse_json_array(stdout: &str) -> Result<Vec<Value>, McpGhError> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(stdout)
        .map_err(|e| McpGhError::Remote(format!("unexpected gh output: {}", e)))
}

fn first_line(s: &str) -> &str {
    s.lines().next().unwrap_or("").trim()
}

fn last_line(s: &str) -> &str {
    s.lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("")
        .trim()
}
