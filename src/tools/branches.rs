//! Branch and commit-history tools.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::git::{self, GitRef, RepoId};
use crate::error::GitHubResult;
use crate::github::{GitHubClient, Pagination, Query};
use crate::schema::{Field, InputShape, ToolDescriptor};

#[derive(Debug, Deserialize)]
pub struct ListBranchesParams {
    #[serde(flatten)]
    pub repo: RepoId,
    #[serde(default)]
    pub protected: Option<bool>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
}

pub fn list_branches_tool() -> ToolDescriptor {
    ToolDescriptor::new(
        "list_branches",
        "List branches in a GitHub repository",
        InputShape::new()
            .repository()
            .field(Field::boolean("protected", "Only return protected (true) or unprotected (false) branches"))
            .paginated(),
    )
}

pub async fn list_branches(client: &GitHubClient, params: ListBranchesParams) -> GitHubResult<Value> {
    let query = Query::new()
        .opt("protected", params.protected)
        .page(Pagination::new(params.page, params.per_page));
    client.get(&query.apply(&params.repo.path("/branches"))).await
}

#[derive(Debug, Deserialize)]
pub struct CreateBranchParams {
    #[serde(flatten)]
    pub repo: RepoId,
    pub branch: String,
    #[serde(default)]
    pub from_branch: Option<String>,
}

pub fn create_branch_tool() -> ToolDescriptor {
    ToolDescriptor::new(
        "create_branch",
        "Create a new branch in a GitHub repository. Starts from `from_branch`, \
         or from the repository's default branch when omitted.",
        InputShape::new()
            .repository()
            .field(Field::string("branch", "Name for the new branch").required())
            .field(Field::string(
                "from_branch",
                "Source branch to create from (defaults to the repository's default branch)",
            )),
    )
}

#[derive(Debug, Deserialize)]
struct DefaultBranch {
    default_branch: String,
}

/// Create `refs/heads/{branch}` at the current tip of the source branch.
///
/// The source SHA is always read from the remote ref during this call. When
/// `from_branch` is omitted the repository is read first to learn its
/// default branch, then that branch's ref.
pub async fn create_branch(client: &GitHubClient, params: CreateBranchParams) -> GitHubResult<GitRef> {
    let repo = &params.repo;
    let source = match params.from_branch {
        Some(source) => source,
        None => {
            let info: DefaultBranch = client.get(&repo.path("")).await?;
            debug!(default_branch = info.default_branch, "create_branch: resolved default branch");
            info.default_branch
        }
    };

    let tip = git::get_branch_ref(client, repo, &source).await?;
    debug!(source, sha = tip.object.sha, "create_branch: resolved source tip");

    git::create_branch_ref(client, repo, &params.branch, &tip.object.sha).await
}

#[derive(Debug, Deserialize)]
pub struct ListCommitsParams {
    #[serde(flatten)]
    pub repo: RepoId,
    /// Branch name or commit SHA to start listing from.
    #[serde(default)]
    pub sha: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
}

pub fn list_commits_tool() -> ToolDescriptor {
    ToolDescriptor::new(
        "list_commits",
        "List commits on a branch of a GitHub repository",
        InputShape::new()
            .repository()
            .field(Field::string("sha", "Branch name or commit SHA to list from"))
            .field(Field::string("path", "Only commits touching this path"))
            .field(Field::string("author", "GitHub login or email of the author"))
            .paginated(),
    )
}

pub async fn list_commits(client: &GitHubClient, params: ListCommitsParams) -> GitHubResult<Value> {
    let query = Query::new()
        .opt("sha", params.sha)
        .opt("path", params.path)
        .opt("author", params.author)
        .page(Pagination::new(params.page, params.per_page));
    client.get(&query.apply(&params.repo.path("/commits"))).await
}
