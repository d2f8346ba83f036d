//! Search tools. The query string is forwarded verbatim so GitHub search
//! qualifiers (`language:ts`, `repo:o/r`, `is:pr`) keep their meaning.

use serde::Deserialize;
use serde_json::Value;

use crate::error::GitHubResult;
use crate::github::{GitHubClient, Pagination, Query};
use crate::schema::{Field, InputShape, ToolDescriptor};

const ORDERS: &[&str] = &["asc", "desc"];

/// Parameters common to every search endpoint.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    /// Search text including qualifiers; sent as `q`.
    pub query: String,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub order: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
}

/// Which `/search/*` endpoint to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Repositories,
    Code,
    Issues,
    Users,
}

impl SearchKind {
    const fn endpoint(self) -> &'static str {
        match self {
            Self::Repositories => "/search/repositories",
            Self::Code => "/search/code",
            Self::Issues => "/search/issues",
            Self::Users => "/search/users",
        }
    }

    const fn sorts(self) -> &'static [&'static str] {
        match self {
            Self::Repositories => &["stars", "forks", "help-wanted-issues", "updated"],
            Self::Code => &["indexed"],
            Self::Issues => &[
                "comments",
                "reactions",
                "reactions-+1",
                "reactions--1",
                "reactions-smile",
                "reactions-thinking_face",
                "reactions-heart",
                "reactions-tada",
                "interactions",
                "created",
                "updated",
            ],
            Self::Users => &["followers", "repositories", "joined"],
        }
    }
}

fn search_shape(kind: SearchKind, query_help: &'static str) -> InputShape {
    InputShape::new()
        .field(Field::string("query", query_help).required())
        .field(Field::string("sort", "Sort field (default: best match)").one_of(kind.sorts()))
        .field(Field::string("order", "Sort order").one_of(ORDERS))
        .paginated()
}

async fn search(client: &GitHubClient, kind: SearchKind, params: SearchParams) -> GitHubResult<Value> {
    let query = Query::new()
        .with("q", params.query)
        .opt("sort", params.sort)
        .opt("order", params.order)
        .page(Pagination::new(params.page, params.per_page));
    client.get(&query.apply(kind.endpoint())).await
}

pub fn search_repositories_tool() -> ToolDescriptor {
    ToolDescriptor::new(
        "search_repositories",
        "Search for GitHub repositories",
        search_shape(SearchKind::Repositories, "Search query (see GitHub repository search syntax)"),
    )
}

pub async fn search_repositories(client: &GitHubClient, params: SearchParams) -> GitHubResult<Value> {
    search(client, SearchKind::Repositories, params).await
}

pub fn search_code_tool() -> ToolDescriptor {
    ToolDescriptor::new(
        "search_code",
        "Search for code across GitHub repositories. Supports qualifiers such as \
         `language:`, `repo:`, `path:` and `extension:`.",
        search_shape(SearchKind::Code, "Search query (see GitHub code search syntax)"),
    )
}

pub async fn search_code(client: &GitHubClient, params: SearchParams) -> GitHubResult<Value> {
    search(client, SearchKind::Code, params).await
}

pub fn search_issues_tool() -> ToolDescriptor {
    ToolDescriptor::new(
        "search_issues",
        "Search for issues and pull requests across GitHub repositories",
        search_shape(SearchKind::Issues, "Search query (see GitHub issue search syntax)"),
    )
}

pub async fn search_issues(client: &GitHubClient, params: SearchParams) -> GitHubResult<Value> {
    search(client, SearchKind::Issues, params).await
}

pub fn search_users_tool() -> ToolDescriptor {
    ToolDescriptor::new(
        "search_users",
        "Search for users on GitHub",
        search_shape(SearchKind::Users, "Search query (see GitHub user search syntax)"),
    )
}

pub async fn search_users(client: &GitHubClient, params: SearchParams) -> GitHubResult<Value> {
    search(client, SearchKind::Users, params).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_search_sort_enum() {
        let shape = search_code_tool().shape;
        let schema = shape.to_json_schema();
        assert_eq!(schema["required"], serde_json::json!(["query"]));
        assert_eq!(schema["properties"]["sort"]["enum"], serde_json::json!(["indexed"]));
    }
}
