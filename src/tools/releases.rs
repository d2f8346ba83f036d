//! Release tools.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::git::RepoId;
use crate::error::GitHubResult;
use crate::github::{GitHubClient, Pagination, Query};
use crate::schema::{Field, InputShape, ToolDescriptor};

#[derive(Debug, Deserialize)]
pub struct CreateReleaseParams {
    #[serde(flatten)]
    pub repo: RepoId,
    #[serde(flatten)]
    pub release: NewRelease,
}

/// Request body of a release creation.
#[derive(Debug, Deserialize, Serialize)]
pub struct NewRelease {
    pub tag_name: String,
    /// Branch or SHA the tag is created from when it does not exist yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_commitish: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prerelease: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate_release_notes: Option<bool>,
}

pub fn create_release_tool() -> ToolDescriptor {
    ToolDescriptor::new(
        "create_release",
        "Create a release (and its tag, if missing) in a GitHub repository",
        InputShape::new()
            .repository()
            .field(Field::string("tag_name", "Name of the tag").required())
            .field(Field::string(
                "target_commitish",
                "Branch or commit SHA the tag is created from (default: default branch)",
            ))
            .field(Field::string("name", "Release title"))
            .field(Field::string("body", "Release notes (Markdown)"))
            .field(Field::boolean("draft", "Create an unpublished draft release"))
            .field(Field::boolean("prerelease", "Mark as a pre-release"))
            .field(Field::boolean(
                "generate_release_notes",
                "Let GitHub generate the release name and notes",
            )),
    )
}

pub async fn create_release(client: &GitHubClient, params: CreateReleaseParams) -> GitHubResult<Value> {
    client.post(&params.repo.path("/releases"), &params.release).await
}

#[derive(Debug, Deserialize)]
pub struct ListReleasesParams {
    #[serde(flatten)]
    pub repo: RepoId,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
}

pub fn list_releases_tool() -> ToolDescriptor {
    ToolDescriptor::new(
        "list_releases",
        "List releases of a GitHub repository, newest first",
        InputShape::new().repository().paginated(),
    )
}

pub async fn list_releases(client: &GitHubClient, params: ListReleasesParams) -> GitHubResult<Value> {
    let query = Query::new().page(Pagination::new(params.page, params.per_page));
    client.get(&query.apply(&params.repo.path("/releases"))).await
}

#[derive(Debug, Deserialize)]
pub struct GetLatestReleaseParams {
    #[serde(flatten)]
    pub repo: RepoId,
}

pub fn get_latest_release_tool() -> ToolDescriptor {
    ToolDescriptor::new(
        "get_latest_release",
        "Get the latest published, non-prerelease release of a GitHub repository",
        InputShape::new().repository(),
    )
}

pub async fn get_latest_release(client: &GitHubClient, params: GetLatestReleaseParams) -> GitHubResult<Value> {
    client.get(&params.repo.path("/releases/latest")).await
}
