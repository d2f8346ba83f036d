//! Git data objects (refs, commits, trees, blobs) and the single-call REST
//! operations on them.
//!
//! These are transient local views of remote, content-addressed state.
//! Higher-level tools compose them in dependency order: blobs before the
//! tree that lists them, the tree before the commit that names it, and the
//! commit before the ref that points at it.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::GitHubResult;
use crate::github::{GitHubClient, encode_path};

/// Mode for a regular, non-executable file.
pub const FILE_MODE: &str = "100644";

/// Owner and repository name; flattened into every tool's parameters.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RepoId {
    pub owner: String,
    pub repo: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// `/repos/{owner}/{repo}` followed by `suffix`.
    pub fn path(&self, suffix: &str) -> String {
        format!("/repos/{}/{}{suffix}", self.owner, self.repo)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ShaRef {
    pub sha: String,
}

/// The object a ref points at.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RefTarget {
    pub sha: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct GitRef {
    #[serde(rename = "ref")]
    pub name: String,
    pub object: RefTarget,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct GitCommit {
    pub sha: String,
    pub tree: ShaRef,
    #[serde(default)]
    pub parents: Vec<ShaRef>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct GitBlob {
    pub sha: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: String,
    pub mode: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub sha: String,
}

impl TreeEntry {
    /// Regular-file entry pointing at an existing blob.
    pub fn blob(path: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: FILE_MODE.to_owned(),
            kind: "blob".to_owned(),
            sha: sha.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct GitTree {
    pub sha: String,
    #[serde(default)]
    pub tree: Vec<TreeEntry>,
    #[serde(default)]
    pub truncated: bool,
}

/// Read `refs/heads/{branch}`.
pub async fn get_branch_ref(client: &GitHubClient, repo: &RepoId, branch: &str) -> GitHubResult<GitRef> {
    client
        .get(&repo.path(&format!("/git/ref/heads/{}", encode_path(branch))))
        .await
}

pub async fn get_commit(client: &GitHubClient, repo: &RepoId, sha: &str) -> GitHubResult<GitCommit> {
    client.get(&repo.path(&format!("/git/commits/{sha}"))).await
}

/// Upload `content` as a blob (base64 on the wire).
pub async fn create_blob(client: &GitHubClient, repo: &RepoId, content: &str) -> GitHubResult<GitBlob> {
    let body = json!({
        "content": STANDARD.encode(content.as_bytes()),
        "encoding": "base64",
    });
    client.post(&repo.path("/git/blobs"), &body).await
}

/// Create a tree layered on top of `base_tree`.
pub async fn create_tree(
    client: &GitHubClient,
    repo: &RepoId,
    base_tree: &str,
    entries: &[TreeEntry],
) -> GitHubResult<GitTree> {
    let body = json!({
        "base_tree": base_tree,
        "tree": entries,
    });
    client.post(&repo.path("/git/trees"), &body).await
}

pub async fn create_commit(
    client: &GitHubClient,
    repo: &RepoId,
    message: &str,
    tree: &str,
    parents: &[String],
) -> GitHubResult<GitCommit> {
    let body = json!({
        "message": message,
        "tree": tree,
        "parents": parents,
    });
    client.post(&repo.path("/git/commits"), &body).await
}

/// Create `refs/heads/{branch}` at `sha`.
pub async fn create_branch_ref(
    client: &GitHubClient,
    repo: &RepoId,
    branch: &str,
    sha: &str,
) -> GitHubResult<GitRef> {
    let body = json!({
        "ref": format!("refs/heads/{branch}"),
        "sha": sha,
    });
    client.post(&repo.path("/git/refs"), &body).await
}

/// Move `refs/heads/{branch}` to `sha`. With `force == false` GitHub rejects
/// the update unless it is a fast-forward.
pub async fn update_branch_ref(
    client: &GitHubClient,
    repo: &RepoId,
    branch: &str,
    sha: &str,
    force: bool,
) -> GitHubResult<GitRef> {
    let body = json!({
        "sha": sha,
        "force": force,
    });
    client
        .patch(&repo.path(&format!("/git/refs/heads/{}", encode_path(branch))), &body)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_path() {
        let repo = RepoId::new("octo", "hello");
        assert_eq!(repo.path(""), "/repos/octo/hello");
        assert_eq!(repo.path("/git/blobs"), "/repos/octo/hello/git/blobs");
    }

    #[test]
    fn test_tree_entry_wire_format() {
        let entry = TreeEntry::blob("src/x.txt", "abc123");
        let value = serde_json::to_value(&entry).expect("serialize");
        assert_eq!(
            value,
            json!({"path": "src/x.txt", "mode": "100644", "type": "blob", "sha": "abc123"})
        );
    }

    #[test]
    fn test_ref_decodes_from_github_shape() {
        let r: GitRef = serde_json::from_value(json!({
            "ref": "refs/heads/main",
            "node_id": "x",
            "url": "https://api.github.com/repos/o/r/git/refs/heads/main",
            "object": {"sha": "c0ffee", "type": "commit", "url": "u"}
        }))
        .expect("decode");
        assert_eq!(r.name, "refs/heads/main");
        assert_eq!(r.object.sha, "c0ffee");
        assert_eq!(r.object.kind.as_deref(), Some("commit"));
    }
}
