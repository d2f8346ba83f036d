//! Tool router: the command table that maps a tool name to its schema and
//! handler, and the single place where errors become MCP envelopes.
//!
//! Each call goes through the same steps:
//! 1. look the name up (unknown names never reach GitHub)
//! 2. validate the arguments against the tool's [`InputShape`]
//! 3. parse them into the tool's typed parameters
//! 4. run the operation and serialize its result
//!
//! Calls on one router run one at a time, in the order they acquire the
//! router.

pub mod branches;
pub mod files;
pub mod git;
pub mod issues;
pub mod pulls;
pub mod releases;
pub mod repositories;
pub mod search;

use std::collections::HashMap;
use std::future::Future;

use futures::FutureExt as _;
use futures::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use crate::error::{GitHubResult, ToolError};
use crate::github::GitHubClient;
use crate::schema::{self, ToolDefinition, ToolDescriptor};
use crate::server::ToolCallResult;

type Handler = Box<dyn Fn(GitHubClient, Value) -> BoxFuture<'static, Result<Value, ToolError>> + Send + Sync>;

struct ToolEntry {
    descriptor: ToolDescriptor,
    handler: Handler,
}

/// What the router is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Executing { tool: &'static str },
}

/// Tool router that dispatches MCP tool calls to GitHub operations.
pub struct ToolRouter {
    client: GitHubClient,
    /// Registration order, for a stable tools/list.
    order: Vec<&'static str>,
    table: HashMap<&'static str, ToolEntry>,
    /// Held for the whole duration of a call.
    in_flight: tokio::sync::Mutex<()>,
    current: std::sync::Mutex<Option<&'static str>>,
}

impl ToolRouter {
    /// Create a router with every GitHub tool registered.
    pub fn new(client: GitHubClient) -> Self {
        let mut router = Self {
            client,
            order: Vec::new(),
            table: HashMap::new(),
            in_flight: tokio::sync::Mutex::new(()),
            current: std::sync::Mutex::new(None),
        };

        // Repositories
        router.register(repositories::create_repository_tool(), |c, p| async move {
            repositories::create_repository(&c, p).await
        });
        router.register(repositories::get_repository_tool(), |c, p| async move {
            repositories::get_repository(&c, p).await
        });
        router.register(repositories::fork_repository_tool(), |c, p| async move {
            repositories::fork_repository(&c, p).await
        });

        // Files
        router.register(files::get_file_contents_tool(), |c, p| async move {
            files::get_file_contents(&c, p).await
        });
        router.register(files::create_or_update_file_tool(), |c, p| async move {
            files::create_or_update_file(&c, p).await
        });
        router.register(files::push_files_tool(), |c, p| async move {
            files::push_files(&c, p).await
        });

        // Branches and commits
        router.register(branches::list_branches_tool(), |c, p| async move {
            branches::list_branches(&c, p).await
        });
        router.register(branches::create_branch_tool(), |c, p| async move {
            branches::create_branch(&c, p).await
        });
        router.register(branches::list_commits_tool(), |c, p| async move {
            branches::list_commits(&c, p).await
        });

        // Issues
        router.register(issues::create_issue_tool(), |c, p| async move {
            issues::create_issue(&c, p).await
        });
        router.register(issues::get_issue_tool(), |c, p| async move {
            issues::get_issue(&c, p).await
        });
        router.register(issues::list_issues_tool(), |c, p| async move {
            issues::list_issues(&c, p).await
        });
        router.register(issues::update_issue_tool(), |c, p| async move {
            issues::update_issue(&c, p).await
        });
        router.register(issues::add_issue_comment_tool(), |c, p| async move {
            issues::add_issue_comment(&c, p).await
        });

        // Pull requests
        router.register(pulls::create_pull_request_tool(), |c, p| async move {
            pulls::create_pull_request(&c, p).await
        });
        router.register(pulls::get_pull_request_tool(), |c, p| async move {
            pulls::get_pull_request(&c, p).await
        });
        router.register(pulls::list_pull_requests_tool(), |c, p| async move {
            pulls::list_pull_requests(&c, p).await
        });
        router.register(pulls::merge_pull_request_tool(), |c, p| async move {
            pulls::merge_pull_request(&c, p).await
        });
        router.register(pulls::update_pull_request_branch_tool(), |c, p| async move {
            pulls::update_pull_request_branch(&c, p).await
        });
        router.register(pulls::get_pull_request_files_tool(), |c, p| async move {
            pulls::get_pull_request_files(&c, p).await
        });
        router.register(pulls::get_pull_request_status_tool(), |c, p| async move {
            pulls::get_pull_request_status(&c, p).await
        });
        router.register(pulls::get_pull_request_comments_tool(), |c, p| async move {
            pulls::get_pull_request_comments(&c, p).await
        });
        router.register(pulls::get_pull_request_reviews_tool(), |c, p| async move {
            pulls::get_pull_request_reviews(&c, p).await
        });
        router.register(pulls::create_pull_request_review_tool(), |c, p| async move {
            pulls::create_pull_request_review(&c, p).await
        });

        // Search
        router.register(search::search_repositories_tool(), |c, p| async move {
            search::search_repositories(&c, p).await
        });
        router.register(search::search_code_tool(), |c, p| async move {
            search::search_code(&c, p).await
        });
        router.register(search::search_issues_tool(), |c, p| async move {
            search::search_issues(&c, p).await
        });
        router.register(search::search_users_tool(), |c, p| async move {
            search::search_users(&c, p).await
        });

        // Releases
        router.register(releases::create_release_tool(), |c, p| async move {
            releases::create_release(&c, p).await
        });
        router.register(releases::list_releases_tool(), |c, p| async move {
            releases::list_releases(&c, p).await
        });
        router.register(releases::get_latest_release_tool(), |c, p| async move {
            releases::get_latest_release(&c, p).await
        });

        router
    }

    /// Add one tool to the command table. The handler parses the arguments
    /// into `P`, runs `op`, and serializes its result.
    fn register<P, R, F, Fut>(&mut self, descriptor: ToolDescriptor, op: F)
    where
        P: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        F: Fn(GitHubClient, P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = GitHubResult<R>> + Send + 'static,
    {
        let name = descriptor.name;
        let handler: Handler = Box::new(move |client, arguments| {
            let arguments = if arguments.is_null() {
                Value::Object(serde_json::Map::new())
            } else {
                arguments
            };
            match serde_json::from_value::<P>(arguments) {
                Ok(params) => {
                    let pending = op(client, params);
                    async move { Ok::<Value, ToolError>(serde_json::to_value(pending.await?)?) }.boxed()
                }
                Err(e) => futures::future::ready(Err(ToolError::InvalidArguments {
                    tool: name.to_owned(),
                    violations: vec![e.to_string()],
                }))
                .boxed(),
            }
        });

        debug_assert!(!self.table.contains_key(name), "duplicate tool {name}");
        self.order.push(name);
        self.table.insert(name, ToolEntry { descriptor, handler });
    }

    /// List all available tools with their JSON Schema definitions.
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.table.get(name))
            .map(|entry| entry.descriptor.definition())
            .collect()
    }

    pub fn state(&self) -> DispatchState {
        match *self.current.lock().unwrap_or_else(std::sync::PoisonError::into_inner) {
            Some(tool) => DispatchState::Executing { tool },
            None => DispatchState::Idle,
        }
    }

    /// Call a tool by name. Always produces an envelope; failures are
    /// rendered into it with `is_error` set.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> ToolCallResult {
        match self.invoke(name, arguments).await {
            Ok(value) => {
                let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
                ToolCallResult::text(text, false)
            }
            Err(e) => {
                error!(tool = name, error = %e, "tool call failed");
                ToolCallResult::text(e.render(), true)
            }
        }
    }

    /// Validate, parse, and run a tool, returning its raw JSON result.
    pub async fn invoke(&self, name: &str, arguments: Value) -> Result<Value, ToolError> {
        let Some((&tool, entry)) = self.table.get_key_value(name) else {
            return Err(ToolError::UnknownTool(name.to_owned()));
        };

        schema::validate(&entry.descriptor.shape, &arguments).map_err(|violations| {
            ToolError::InvalidArguments {
                tool: tool.to_owned(),
                violations,
            }
        })?;

        let _guard = self.in_flight.lock().await;
        let _executing = Executing::enter(&self.current, tool);
        debug!(tool, "dispatching tool call");
        (entry.handler)(self.client.clone(), arguments).await
    }
}

/// Marks the router as executing `tool` until dropped.
struct Executing<'a> {
    slot: &'a std::sync::Mutex<Option<&'static str>>,
}

impl<'a> Executing<'a> {
    fn enter(slot: &'a std::sync::Mutex<Option<&'static str>>, tool: &'static str) -> Self {
        *slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(tool);
        Self { slot }
    }
}

impl Drop for Executing<'_> {
    fn drop(&mut self) {
        *self.slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = None;
    }
}

impl std::fmt::Debug for ToolRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRouter")
            .field("tools", &self.order)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
