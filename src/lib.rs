//! `oa-github`: MCP server exposing the GitHub REST API as typed tools.
//!
//! Speaks the Model Context Protocol over stdio (JSON-RPC 2.0,
//! newline-delimited). Every tool validates its arguments against a JSON
//! Schema before any request leaves the process, and every GitHub failure
//! is classified into a fixed error taxonomy before it is reported.
//!
//! # Tools
//!
//! - repositories: `create_repository`, `get_repository`, `fork_repository`
//! - files: `get_file_contents`, `create_or_update_file`, `push_files`
//! - branches and commits: `list_branches`, `create_branch`, `list_commits`
//! - issues: `create_issue`, `get_issue`, `list_issues`, `update_issue`,
//!   `add_issue_comment`
//! - pull requests: `create_pull_request`, `get_pull_request`,
//!   `list_pull_requests`, `merge_pull_request`, `update_pull_request_branch`,
//!   `get_pull_request_files`, `get_pull_request_status`,
//!   `get_pull_request_comments`, `get_pull_request_reviews`,
//!   `create_pull_request_review`
//! - search: `search_repositories`, `search_code`, `search_issues`,
//!   `search_users`
//! - releases: `create_release`, `list_releases`, `get_latest_release`
//!
//! `push_files` commits several files at once through the Git Data API
//! (blobs, tree, commit, then a non-forced ref update), so the branch
//! either moves to the new commit or stays where it was.
//!
//! # Architecture
//!
//! ```text
//! stdin (JSON-RPC) → server → ToolRouter → schema::validate
//!                                  ↓
//!                            tools::* operation
//!                                  ↓
//!                     GitHubClient → HttpTransport → api.github.com
//! stdout (JSON-RPC) ←── envelope ←─┘
//! ```

pub mod config;
pub mod error;
pub mod github;
pub mod schema;
pub mod server;
pub mod tools;

pub use config::GitHubConfig;
pub use error::{ConfigError, GitHubError, GitHubResult, ToolError};
pub use github::GitHubClient;
pub use server::run_mcp_server;
pub use tools::ToolRouter;
