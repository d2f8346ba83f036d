//! Repository tools.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::git::RepoId;
use crate::error::GitHubResult;
use crate::github::GitHubClient;
use crate::schema::{Field, InputShape, NAME_PATTERN, ToolDescriptor};

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateRepositoryParams {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_init: Option<bool>,
}

pub fn create_repository_tool() -> ToolDescriptor {
    ToolDescriptor::new(
        "create_repository",
        "Create a new GitHub repository in your account",
        InputShape::new()
            .field(Field::string("name", "Repository name").pattern(NAME_PATTERN).required())
            .field(Field::string("description", "Repository description"))
            .field(Field::boolean("private", "Whether the repository should be private"))
            .field(Field::boolean("auto_init", "Initialize with a README.md")),
    )
}

pub async fn create_repository(client: &GitHubClient, params: CreateRepositoryParams) -> GitHubResult<Value> {
    client.post("/user/repos", &params).await
}

#[derive(Debug, Deserialize)]
pub struct GetRepositoryParams {
    #[serde(flatten)]
    pub repo: RepoId,
}

pub fn get_repository_tool() -> ToolDescriptor {
    ToolDescriptor::new(
        "get_repository",
        "Get details of a GitHub repository, including its default branch",
        InputShape::new().repository(),
    )
}

pub async fn get_repository(client: &GitHubClient, params: GetRepositoryParams) -> GitHubResult<Value> {
    client.get(&params.repo.path("")).await
}

#[derive(Debug, Deserialize)]
pub struct ForkRepositoryParams {
    #[serde(flatten)]
    pub repo: RepoId,
    #[serde(default)]
    pub organization: Option<String>,
}

pub fn fork_repository_tool() -> ToolDescriptor {
    ToolDescriptor::new(
        "fork_repository",
        "Fork a GitHub repository to your account or specified organization",
        InputShape::new()
            .repository()
            .field(Field::string("organization", "Organization to fork to (defaults to your account)")),
    )
}

pub async fn fork_repository(client: &GitHubClient, params: ForkRepositoryParams) -> GitHubResult<Value> {
    let body = match params.organization {
        Some(org) => serde_json::json!({ "organization": org }),
        None => serde_json::json!({}),
    };
    client.post(&params.repo.path("/forks"), &body).await
}
