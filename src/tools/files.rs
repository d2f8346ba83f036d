//! File tools: read a path, write a single file, and push many files as one
//! commit.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use super::git::{self, GitCommit, RepoId, TreeEntry};
use crate::error::{GitHubError, GitHubResult};
use crate::github::{GitHubClient, Query, encode_path};
use crate::schema::{Field, FieldKind, InputShape, ToolDescriptor};

// ---------------------------------------------------------------------------
// get_file_contents
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct GetFileContentsParams {
    #[serde(flatten)]
    pub repo: RepoId,
    pub path: String,
    #[serde(default)]
    pub branch: Option<String>,
}

pub fn get_file_contents_tool() -> ToolDescriptor {
    ToolDescriptor::new(
        "get_file_contents",
        "Get the contents of a file or directory from a GitHub repository. \
         Text files are returned decoded; directories are returned as a listing.",
        InputShape::new()
            .repository()
            .field(Field::string("path", "Path to the file or directory").required())
            .field(Field::string("branch", "Branch to read from (default: repository default branch)")),
    )
}

pub async fn get_file_contents(client: &GitHubClient, params: GetFileContentsParams) -> GitHubResult<Value> {
    let path = params
        .repo
        .path(&format!("/contents/{}", encode_path(repo_path(&params.path))));
    let mut contents: Value = client
        .get(&Query::new().opt("ref", params.branch).apply(&path))
        .await?;

    // Directory listings come back as an array and are returned as-is.
    if let Some(file) = contents.as_object_mut() {
        if let Some(text) = file
            .get("content")
            .and_then(Value::as_str)
            .and_then(decode_content)
        {
            file.insert("content".to_owned(), Value::String(text));
            file.insert("encoding".to_owned(), Value::String("utf-8".to_owned()));
        }
    }
    Ok(contents)
}

/// Repository-relative form of a user-supplied path.
fn repo_path(path: &str) -> &str {
    path.trim_start_matches('/')
}

/// Decode GitHub's line-wrapped base64; `None` for binary content.
fn decode_content(encoded: &str) -> Option<String> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD.decode(compact).ok()?;
    String::from_utf8(bytes).ok()
}

// ---------------------------------------------------------------------------
// create_or_update_file
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateOrUpdateFileParams {
    #[serde(flatten)]
    pub repo: RepoId,
    pub path: String,
    pub content: String,
    pub message: String,
    pub branch: String,
    /// Blob SHA of the file being replaced.
    #[serde(default)]
    pub sha: Option<String>,
}

pub fn create_or_update_file_tool() -> ToolDescriptor {
    ToolDescriptor::new(
        "create_or_update_file",
        "Create or update a single file in a GitHub repository. \
         When updating without `sha`, the current blob SHA is looked up first.",
        InputShape::new()
            .repository()
            .field(Field::string("path", "Path where to create/update the file").required())
            .field(Field::string("content", "Content of the file (plain text)").required())
            .field(Field::string("message", "Commit message").required())
            .field(Field::string("branch", "Branch to create/update the file in").required())
            .field(Field::string(
                "sha",
                "SHA of the file being replaced (required by GitHub for updates; looked up when omitted)",
            )),
    )
}

pub async fn create_or_update_file(
    client: &GitHubClient,
    params: CreateOrUpdateFileParams,
) -> GitHubResult<Value> {
    let path = params
        .repo
        .path(&format!("/contents/{}", encode_path(repo_path(&params.path))));

    let sha = match params.sha {
        Some(sha) => Some(sha),
        None => existing_blob_sha(client, &path, &params.branch).await?,
    };

    let mut body = json!({
        "message": params.message,
        "content": STANDARD.encode(params.content.as_bytes()),
        "branch": params.branch,
    });
    if let Some(sha) = sha {
        body["sha"] = Value::String(sha);
    }
    client.put(&path, &body).await
}

/// SHA of the file at `path` on `branch`, or `None` if it does not exist yet.
async fn existing_blob_sha(client: &GitHubClient, path: &str, branch: &str) -> GitHubResult<Option<String>> {
    match client
        .get::<Value>(&Query::new().with("ref", branch).apply(path))
        .await
    {
        Ok(existing) => Ok(existing.get("sha").and_then(Value::as_str).map(str::to_owned)),
        Err(GitHubError::NotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

// ---------------------------------------------------------------------------
// push_files
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FileChange {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct PushFilesParams {
    #[serde(flatten)]
    pub repo: RepoId,
    pub branch: String,
    pub files: Vec<FileChange>,
    pub message: String,
}

/// Outcome of a successful [`push_files`].
#[derive(Debug, Clone, Serialize)]
pub struct PushResult {
    pub commit: GitCommit,
    #[serde(rename = "ref")]
    pub ref_name: String,
    /// SHA the branch now points at.
    pub sha: String,
    pub files: Vec<String>,
}

pub fn push_files_tool() -> ToolDescriptor {
    ToolDescriptor::new(
        "push_files",
        "Push multiple files to a branch in a single commit. The branch only moves \
         once every blob, the tree, and the commit exist; a concurrent push to the \
         branch makes the call fail instead of overwriting it.",
        InputShape::new()
            .repository()
            .field(Field::string("branch", "Branch to push to (e.g. 'main')").required())
            .field(
                Field::array(
                    "files",
                    "Files to push, each with path and content",
                    FieldKind::Object(vec![
                        Field::string("path", "Path of the file in the repository").required(),
                        Field::string("content", "Content of the file (plain text)").required(),
                    ]),
                )
                .min_items(1)
                .required(),
            )
            .field(Field::string("message", "Commit message").required()),
    )
}

/// Append `files` to `branch` as exactly one commit.
///
/// Steps run strictly in order; each depends on the previous one's output:
///
/// 1. read the branch ref → parent commit SHA
/// 2. read the parent commit → base tree SHA
/// 3. create one blob per file (concurrently)
/// 4. create a tree on top of the base tree, once all blobs exist
/// 5. create a commit with that tree and the single parent
/// 6. fast-forward the branch ref to the new commit (`force: false`)
///
/// Step 6 is the only externally visible change. Any failure returns the
/// classified error and leaves the branch where it was; objects created
/// before the failure stay unreferenced. Nothing is retried: a caller that
/// retries must start over from step 1.
pub async fn push_files(client: &GitHubClient, params: PushFilesParams) -> GitHubResult<PushResult> {
    let repo = &params.repo;
    let branch = params.branch.as_str();

    let parent_sha = resolve_tip(client, repo, branch).await?;
    let base_tree_sha = resolve_base_tree(client, repo, &parent_sha).await?;
    let entries = create_blobs(client, repo, &params.files).await?;
    let tree_sha = create_tree(client, repo, &base_tree_sha, &entries).await?;
    let commit = create_commit(client, repo, &params.message, &tree_sha, &parent_sha).await?;
    let sha = advance_ref(client, repo, branch, &commit.sha).await?;

    info!(
        owner = repo.owner,
        repo = repo.repo,
        branch,
        files = params.files.len(),
        commit = sha,
        "pushed files"
    );

    Ok(PushResult {
        commit,
        ref_name: format!("refs/heads/{branch}"),
        sha,
        files: params.files.iter().map(|f| repo_path(&f.path).to_owned()).collect(),
    })
}

async fn resolve_tip(client: &GitHubClient, repo: &RepoId, branch: &str) -> GitHubResult<String> {
    let tip = git::get_branch_ref(client, repo, branch).await?;
    debug!(branch, parent = tip.object.sha, "push_files: resolved branch tip");
    Ok(tip.object.sha)
}

async fn resolve_base_tree(client: &GitHubClient, repo: &RepoId, parent_sha: &str) -> GitHubResult<String> {
    let parent = git::get_commit(client, repo, parent_sha).await?;
    debug!(base_tree = parent.tree.sha, "push_files: resolved base tree");
    Ok(parent.tree.sha)
}

/// Upload every file as a blob. The uploads are independent of each other;
/// this returns only after all of them succeeded, or with the first error.
async fn create_blobs(client: &GitHubClient, repo: &RepoId, files: &[FileChange]) -> GitHubResult<Vec<TreeEntry>> {
    let uploads = files.iter().map(|file| async move {
        let blob = git::create_blob(client, repo, &file.content).await?;
        Ok::<_, GitHubError>(TreeEntry::blob(repo_path(&file.path), blob.sha))
    });
    let entries = try_join_all(uploads).await?;
    debug!(blobs = entries.len(), "push_files: created blobs");
    Ok(entries)
}

async fn create_tree(
    client: &GitHubClient,
    repo: &RepoId,
    base_tree_sha: &str,
    entries: &[TreeEntry],
) -> GitHubResult<String> {
    let tree = git::create_tree(client, repo, base_tree_sha, entries).await?;
    debug!(tree = tree.sha, "push_files: created tree");
    Ok(tree.sha)
}

async fn create_commit(
    client: &GitHubClient,
    repo: &RepoId,
    message: &str,
    tree_sha: &str,
    parent_sha: &str,
) -> GitHubResult<GitCommit> {
    let commit = git::create_commit(client, repo, message, tree_sha, &[parent_sha.to_owned()]).await?;
    debug!(commit = commit.sha, "push_files: created commit");
    Ok(commit)
}

async fn advance_ref(client: &GitHubClient, repo: &RepoId, branch: &str, commit_sha: &str) -> GitHubResult<String> {
    let updated = git::update_branch_ref(client, repo, branch, commit_sha, false).await?;
    Ok(updated.object.sha)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_wrapped_base64() {
        // GitHub wraps base64 content at 60 columns.
        assert_eq!(decode_content("aGVsbG8g\nd29ybGQ=\n").as_deref(), Some("hello world"));
    }

    #[test]
    fn test_decode_binary_is_none() {
        let encoded = STANDARD.encode([0xff, 0xfe, 0x00]);
        assert!(decode_content(&encoded).is_none());
    }

    #[test]
    fn test_push_params_flatten_repo() {
        let params: PushFilesParams = serde_json::from_value(json!({
            "owner": "a",
            "repo": "b",
            "branch": "main",
            "message": "m",
            "files": [{"path": "x.txt", "content": "1"}]
        }))
        .expect("parse");
        assert_eq!(params.repo, RepoId::new("a", "b"));
        assert_eq!(params.files.len(), 1);
    }
}
