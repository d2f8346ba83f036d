//! Pull request tools.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::git::{RepoId, ShaRef};
use crate::error::GitHubResult;
use crate::github::{GitHubClient, Pagination, Query};
use crate::schema::{Field, FieldKind, InputShape, ToolDescriptor};

const LIST_STATES: &[&str] = &["open", "closed", "all"];
const SORTS: &[&str] = &["created", "updated", "popularity", "long-running"];
const DIRECTIONS: &[&str] = &["asc", "desc"];
const MERGE_METHODS: &[&str] = &["merge", "squash", "rebase"];
const REVIEW_EVENTS: &[&str] = &["APPROVE", "REQUEST_CHANGES", "COMMENT"];

fn pull_number() -> Field {
    Field::integer("pull_number", "Pull request number").range(Some(1), None).required()
}

/// Parameters shared by the read-only single-PR tools.
#[derive(Debug, Deserialize)]
pub struct PullRequestParams {
    #[serde(flatten)]
    pub repo: RepoId,
    pub pull_number: u64,
}

impl PullRequestParams {
    fn path(&self, suffix: &str) -> String {
        self.repo.path(&format!("/pulls/{}{suffix}", self.pull_number))
    }
}

fn pull_request_shape() -> InputShape {
    InputShape::new().repository().field(pull_number())
}

// ---------------------------------------------------------------------------
// create / get / list
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreatePullRequestParams {
    #[serde(flatten)]
    pub repo: RepoId,
    #[serde(flatten)]
    pub pull: NewPullRequest,
}

/// Request body of a pull request creation.
#[derive(Debug, Deserialize, Serialize)]
pub struct NewPullRequest {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Branch containing the changes (`user:branch` for cross-repo PRs).
    pub head: String,
    pub base: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintainer_can_modify: Option<bool>,
}

pub fn create_pull_request_tool() -> ToolDescriptor {
    ToolDescriptor::new(
        "create_pull_request",
        "Create a new pull request in a GitHub repository",
        InputShape::new()
            .repository()
            .field(Field::string("title", "Pull request title").required())
            .field(Field::string("body", "Pull request body (Markdown)"))
            .field(Field::string("head", "Branch where your changes are implemented").required())
            .field(Field::string("base", "Branch you want the changes pulled into").required())
            .field(Field::boolean("draft", "Create as a draft pull request"))
            .field(Field::boolean("maintainer_can_modify", "Allow maintainers to modify the pull request")),
    )
}

pub async fn create_pull_request(client: &GitHubClient, params: CreatePullRequestParams) -> GitHubResult<Value> {
    client.post(&params.repo.path("/pulls"), &params.pull).await
}

pub fn get_pull_request_tool() -> ToolDescriptor {
    ToolDescriptor::new(
        "get_pull_request",
        "Get details of a specific pull request",
        pull_request_shape(),
    )
}

pub async fn get_pull_request(client: &GitHubClient, params: PullRequestParams) -> GitHubResult<Value> {
    client.get(&params.path("")).await
}

#[derive(Debug, Deserialize)]
pub struct ListPullRequestsParams {
    #[serde(flatten)]
    pub repo: RepoId,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub head: Option<String>,
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
}

pub fn list_pull_requests_tool() -> ToolDescriptor {
    ToolDescriptor::new(
        "list_pull_requests",
        "List and filter pull requests in a GitHub repository",
        InputShape::new()
            .repository()
            .field(Field::string("state", "Filter by state").one_of(LIST_STATES))
            .field(Field::string("head", "Filter by head user/org and branch (user:ref-name)"))
            .field(Field::string("base", "Filter by base branch name"))
            .field(Field::string("sort", "Sort field").one_of(SORTS))
            .field(Field::string("direction", "Sort direction").one_of(DIRECTIONS))
            .paginated(),
    )
}

pub async fn list_pull_requests(client: &GitHubClient, params: ListPullRequestsParams) -> GitHubResult<Value> {
    let query = Query::new()
        .opt("state", params.state)
        .opt("head", params.head)
        .opt("base", params.base)
        .opt("sort", params.sort)
        .opt("direction", params.direction)
        .page(Pagination::new(params.page, params.per_page));
    client.get(&query.apply(&params.repo.path("/pulls"))).await
}

// ---------------------------------------------------------------------------
// merge / update branch
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct MergePullRequestParams {
    #[serde(flatten)]
    pub repo: RepoId,
    pub pull_number: u64,
    #[serde(flatten)]
    pub merge: MergeOptions,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MergeOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_method: Option<String>,
}

pub fn merge_pull_request_tool() -> ToolDescriptor {
    ToolDescriptor::new(
        "merge_pull_request",
        "Merge a pull request",
        pull_request_shape()
            .field(Field::string("commit_title", "Title for the merge commit"))
            .field(Field::string("commit_message", "Extra detail for the merge commit"))
            .field(Field::string("merge_method", "Merge method to use").one_of(MERGE_METHODS)),
    )
}

pub async fn merge_pull_request(client: &GitHubClient, params: MergePullRequestParams) -> GitHubResult<Value> {
    client
        .put(
            &params.repo.path(&format!("/pulls/{}/merge", params.pull_number)),
            &params.merge,
        )
        .await
}

#[derive(Debug, Deserialize)]
pub struct UpdatePullRequestBranchParams {
    #[serde(flatten)]
    pub repo: RepoId,
    pub pull_number: u64,
    #[serde(flatten)]
    pub update: BranchUpdate,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct BranchUpdate {
    /// Update only if the PR head still matches this SHA.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_head_sha: Option<String>,
}

pub fn update_pull_request_branch_tool() -> ToolDescriptor {
    ToolDescriptor::new(
        "update_pull_request_branch",
        "Update a pull request branch with the latest changes from the base branch",
        pull_request_shape().field(Field::string(
            "expected_head_sha",
            "Expected SHA of the pull request's HEAD; the update is rejected if it moved",
        )),
    )
}

pub async fn update_pull_request_branch(
    client: &GitHubClient,
    params: UpdatePullRequestBranchParams,
) -> GitHubResult<Value> {
    client
        .put(
            &params.repo.path(&format!("/pulls/{}/update-branch", params.pull_number)),
            &params.update,
        )
        .await
}

// ---------------------------------------------------------------------------
// files / status / comments / reviews
// ---------------------------------------------------------------------------

pub fn get_pull_request_files_tool() -> ToolDescriptor {
    ToolDescriptor::new(
        "get_pull_request_files",
        "Get the list of files changed in a pull request",
        pull_request_shape(),
    )
}

pub async fn get_pull_request_files(client: &GitHubClient, params: PullRequestParams) -> GitHubResult<Value> {
    client.get(&params.path("/files")).await
}

pub fn get_pull_request_status_tool() -> ToolDescriptor {
    ToolDescriptor::new(
        "get_pull_request_status",
        "Get the combined status of all status checks for a pull request's head commit",
        pull_request_shape(),
    )
}

#[derive(Debug, Deserialize)]
struct PullHead {
    head: ShaRef,
}

/// Combined status of the PR's current head commit (PR read first).
pub async fn get_pull_request_status(client: &GitHubClient, params: PullRequestParams) -> GitHubResult<Value> {
    let pull: PullHead = client.get(&params.path("")).await?;
    debug!(head = pull.head.sha, "get_pull_request_status: resolved head");
    client
        .get(&params.repo.path(&format!("/commits/{}/status", pull.head.sha)))
        .await
}

pub fn get_pull_request_comments_tool() -> ToolDescriptor {
    ToolDescriptor::new(
        "get_pull_request_comments",
        "Get the review comments on a pull request",
        pull_request_shape(),
    )
}

pub async fn get_pull_request_comments(client: &GitHubClient, params: PullRequestParams) -> GitHubResult<Value> {
    client.get(&params.path("/comments")).await
}

pub fn get_pull_request_reviews_tool() -> ToolDescriptor {
    ToolDescriptor::new(
        "get_pull_request_reviews",
        "Get the reviews on a pull request",
        pull_request_shape(),
    )
}

pub async fn get_pull_request_reviews(client: &GitHubClient, params: PullRequestParams) -> GitHubResult<Value> {
    client.get(&params.path("/reviews")).await
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ReviewComment {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u64>,
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatePullRequestReviewParams {
    #[serde(flatten)]
    pub repo: RepoId,
    pub pull_number: u64,
    #[serde(flatten)]
    pub review: NewReview,
}

/// Request body of a review submission.
#[derive(Debug, Deserialize, Serialize)]
pub struct NewReview {
    pub body: String,
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<ReviewComment>>,
}

pub fn create_pull_request_review_tool() -> ToolDescriptor {
    ToolDescriptor::new(
        "create_pull_request_review",
        "Create a review on a pull request",
        pull_request_shape()
            .field(Field::string("body", "Text of the review").required())
            .field(Field::string("event", "Review action to perform").one_of(REVIEW_EVENTS).required())
            .field(Field::string("commit_id", "SHA of the commit to review (default: latest)"))
            .field(Field::array(
                "comments",
                "Line comments to attach to the review",
                FieldKind::Object(vec![
                    Field::string("path", "File path being commented on").required(),
                    Field::integer("position", "Position in the diff").range(Some(1), None),
                    Field::integer("line", "Line number in the file").range(Some(1), None),
                    Field::string("body", "Comment text").required(),
                ]),
            )),
    )
}

pub async fn create_pull_request_review(
    client: &GitHubClient,
    params: CreatePullRequestReviewParams,
) -> GitHubResult<Value> {
    client
        .post(
            &params.repo.path(&format!("/pulls/{}/reviews", params.pull_number)),
            &params.review,
        )
        .await
}
