//! Issue tools.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::git::RepoId;
use crate::error::GitHubResult;
use crate::github::{GitHubClient, Pagination, Query};
use crate::schema::{Field, FieldKind, InputShape, ToolDescriptor};

const LIST_STATES: &[&str] = &["open", "closed", "all"];
const UPDATE_STATES: &[&str] = &["open", "closed"];
const SORTS: &[&str] = &["created", "updated", "comments"];
const DIRECTIONS: &[&str] = &["asc", "desc"];

fn issue_number() -> Field {
    Field::integer("issue_number", "Issue number").range(Some(1), None).required()
}

#[derive(Debug, Deserialize)]
pub struct CreateIssueParams {
    #[serde(flatten)]
    pub repo: RepoId,
    #[serde(flatten)]
    pub issue: NewIssue,
}

/// Request body of an issue creation.
#[derive(Debug, Deserialize, Serialize)]
pub struct NewIssue {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignees: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone: Option<u64>,
}

pub fn create_issue_tool() -> ToolDescriptor {
    ToolDescriptor::new(
        "create_issue",
        "Create a new issue in a GitHub repository",
        InputShape::new()
            .repository()
            .field(Field::string("title", "Issue title").required())
            .field(Field::string("body", "Issue body (Markdown)"))
            .field(Field::array("assignees", "Logins to assign", FieldKind::string()))
            .field(Field::array("labels", "Labels to apply", FieldKind::string()))
            .field(Field::integer("milestone", "Milestone number").range(Some(1), None)),
    )
}

pub async fn create_issue(client: &GitHubClient, params: CreateIssueParams) -> GitHubResult<Value> {
    client.post(&params.repo.path("/issues"), &params.issue).await
}

#[derive(Debug, Deserialize)]
pub struct GetIssueParams {
    #[serde(flatten)]
    pub repo: RepoId,
    pub issue_number: u64,
}

pub fn get_issue_tool() -> ToolDescriptor {
    ToolDescriptor::new(
        "get_issue",
        "Get details of a specific issue in a GitHub repository",
        InputShape::new().repository().field(issue_number()),
    )
}

pub async fn get_issue(client: &GitHubClient, params: GetIssueParams) -> GitHubResult<Value> {
    client
        .get(&params.repo.path(&format!("/issues/{}", params.issue_number)))
        .await
}

#[derive(Debug, Deserialize)]
pub struct ListIssuesParams {
    #[serde(flatten)]
    pub repo: RepoId,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub labels: Option<Vec<String>>,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
    /// ISO 8601 timestamp; only issues updated at or after it.
    #[serde(default)]
    pub since: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
}

pub fn list_issues_tool() -> ToolDescriptor {
    ToolDescriptor::new(
        "list_issues",
        "List issues in a GitHub repository with filtering options",
        InputShape::new()
            .repository()
            .field(Field::string("state", "Filter by state").one_of(LIST_STATES))
            .field(Field::array("labels", "Filter by labels", FieldKind::string()))
            .field(Field::string("sort", "Sort field").one_of(SORTS))
            .field(Field::string("direction", "Sort direction").one_of(DIRECTIONS))
            .field(Field::string("since", "Only issues updated at or after this ISO 8601 timestamp"))
            .paginated(),
    )
}

pub async fn list_issues(client: &GitHubClient, params: ListIssuesParams) -> GitHubResult<Value> {
    let query = Query::new()
        .opt("state", params.state)
        .list("labels", params.labels.as_deref())
        .opt("sort", params.sort)
        .opt("direction", params.direction)
        .opt("since", params.since)
        .page(Pagination::new(params.page, params.per_page));
    client.get(&query.apply(&params.repo.path("/issues"))).await
}

#[derive(Debug, Deserialize)]
pub struct UpdateIssueParams {
    #[serde(flatten)]
    pub repo: RepoId,
    pub issue_number: u64,
    #[serde(flatten)]
    pub changes: IssueChanges,
}

/// Request body of an issue update; only supplied fields are sent.
#[derive(Debug, Deserialize, Serialize)]
pub struct IssueChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignees: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone: Option<u64>,
}

pub fn update_issue_tool() -> ToolDescriptor {
    ToolDescriptor::new(
        "update_issue",
        "Update an existing issue in a GitHub repository",
        InputShape::new()
            .repository()
            .field(issue_number())
            .field(Field::string("title", "New title"))
            .field(Field::string("body", "New body"))
            .field(Field::string("state", "New state").one_of(UPDATE_STATES))
            .field(Field::array("labels", "Replacement label set", FieldKind::string()))
            .field(Field::array("assignees", "Replacement assignee set", FieldKind::string()))
            .field(Field::integer("milestone", "Milestone number").range(Some(1), None)),
    )
}

pub async fn update_issue(client: &GitHubClient, params: UpdateIssueParams) -> GitHubResult<Value> {
    client
        .patch(
            &params.repo.path(&format!("/issues/{}", params.issue_number)),
            &params.changes,
        )
        .await
}

#[derive(Debug, Deserialize)]
pub struct AddIssueCommentParams {
    #[serde(flatten)]
    pub repo: RepoId,
    pub issue_number: u64,
    pub body: String,
}

pub fn add_issue_comment_tool() -> ToolDescriptor {
    ToolDescriptor::new(
        "add_issue_comment",
        "Add a comment to an existing issue or pull request",
        InputShape::new()
            .repository()
            .field(issue_number())
            .field(Field::string("body", "Comment text").required()),
    )
}

pub async fn add_issue_comment(client: &GitHubClient, params: AddIssueCommentParams) -> GitHubResult<Value> {
    client
        .post(
            &params.repo.path(&format!("/issues/{}/comments", params.issue_number)),
            &json!({ "body": params.body }),
        )
        .await
}
