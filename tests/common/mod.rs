//! In-memory GitHub used by the integration tests.
//!
//! Implements just enough of the Git Data API (refs, commits, trees, blobs)
//! to run real multi-step operations, plus canned responses for everything
//! else. Every request is recorded in arrival order.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use oa_github::github::{HttpRequest, HttpResponse, HttpTransport};
use oa_github::{GitHubClient, GitHubConfig, ToolRouter};
use serde_json::{Value, json};
use tokio::sync::Notify;

pub const BASE_URL: &str = "https://api.github.test";
pub const TOKEN: &str = "test-token";
pub const OWNER: &str = "octo";
pub const REPO: &str = "hello";

/// One recorded request. `path` excludes the base URL but keeps the query.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl Recorded {
    /// Path without the query string.
    pub fn route(&self) -> &str {
        self.path.split('?').next().unwrap_or_default()
    }

    pub fn is(&self, method: &str, suffix: &str) -> bool {
        self.method == method && self.route().ends_with(suffix)
    }
}

#[derive(Debug, Clone)]
pub struct FakeCommit {
    pub tree: String,
    pub parents: Vec<String>,
    pub message: String,
}

struct Canned {
    method: String,
    suffix: String,
    response: HttpResponse,
}

#[derive(Default)]
struct State {
    default_branch: String,
    refs: HashMap<String, String>,
    commits: HashMap<String, FakeCommit>,
    trees: HashMap<String, BTreeMap<String, String>>,
    blobs: HashMap<String, Vec<u8>>,
    next_id: u64,
    canned: Vec<Canned>,
    /// Branch that someone else advances right before our ref update lands.
    race_on: Option<String>,
    requests: Vec<Recorded>,
}

impl State {
    fn mint(&mut self, kind: &str) -> String {
        self.next_id += 1;
        format!("{kind}{:036x}", self.next_id)
    }

    fn commit_files(&mut self, parent: Option<&str>, files: &[(&str, &str)], message: &str) -> String {
        let mut tree = parent
            .and_then(|p| self.commits.get(p))
            .and_then(|c| self.trees.get(&c.tree))
            .cloned()
            .unwrap_or_default();
        for (path, content) in files {
            let blob = self.mint("b");
            self.blobs.insert(blob.clone(), content.as_bytes().to_vec());
            tree.insert((*path).to_owned(), blob);
        }
        let tree_sha = self.mint("t");
        self.trees.insert(tree_sha.clone(), tree);
        let sha = self.mint("c");
        self.commits.insert(
            sha.clone(),
            FakeCommit {
                tree: tree_sha,
                parents: parent.map(str::to_owned).into_iter().collect(),
                message: message.to_owned(),
            },
        );
        sha
    }
}

/// Fake GitHub serving a single repository `octo/hello`.
pub struct FakeGitHub {
    state: Mutex<State>,
}

impl FakeGitHub {
    /// Repository whose `main` branch holds one commit with `README.md`.
    pub fn new() -> Arc<Self> {
        let mut state = State {
            default_branch: "main".to_owned(),
            ..State::default()
        };
        let root = state.commit_files(None, &[("README.md", "# hello\n")], "initial commit");
        state.refs.insert("main".to_owned(), root);
        Arc::new(Self {
            state: Mutex::new(state),
        })
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("fake state lock")
    }

    pub fn client(self: &Arc<Self>) -> GitHubClient {
        let config = GitHubConfig::new(TOKEN, BASE_URL).expect("config");
        GitHubClient::new(config, self.clone())
    }

    pub fn router(self: &Arc<Self>) -> ToolRouter {
        ToolRouter::new(self.client())
    }

    /// Client whose `method suffix` requests wait for [`Gated::release`].
    pub fn gated(self: &Arc<Self>, method: &'static str, suffix: &'static str) -> (GitHubClient, Arc<Gated>) {
        let gate = Arc::new(Gated {
            inner: self.clone(),
            method,
            suffix,
            entered: Notify::new(),
            release: Notify::new(),
        });
        let config = GitHubConfig::new(TOKEN, BASE_URL).expect("config");
        (GitHubClient::new(config, gate.clone()), gate)
    }

    /// Create `branch` with one extra commit on top of `main`.
    pub fn add_branch(&self, branch: &str, files: &[(&str, &str)]) -> String {
        let mut state = self.lock();
        let main = state.refs["main"].clone();
        let sha = state.commit_files(Some(&main), files, &format!("work on {branch}"));
        state.refs.insert(branch.to_owned(), sha.clone());
        sha
    }

    /// Answer `method` requests whose path (query stripped) ends with
    /// `suffix` with `response`, ahead of the built-in routes.
    pub fn respond(&self, method: &str, suffix: &str, response: HttpResponse) {
        self.lock().canned.push(Canned {
            method: method.to_owned(),
            suffix: suffix.to_owned(),
            response,
        });
    }

    /// Make `method suffix` fail with `status` and a GitHub-style body.
    pub fn fail(&self, method: &str, suffix: &str, status: u16, message: &str) {
        self.respond(method, suffix, HttpResponse::json(status, &json!({ "message": message })));
    }

    /// Advance `branch` behind our back just before the next ref update.
    pub fn race_on(&self, branch: &str) {
        self.lock().race_on = Some(branch.to_owned());
    }

    pub fn branch_sha(&self, branch: &str) -> Option<String> {
        self.lock().refs.get(branch).cloned()
    }

    pub fn commit(&self, sha: &str) -> Option<FakeCommit> {
        self.lock().commits.get(sha).cloned()
    }

    /// Every file reachable from `branch`, decoded as text.
    pub fn files_at(&self, branch: &str) -> BTreeMap<String, String> {
        let state = self.lock();
        let Some(commit) = state.refs.get(branch).and_then(|sha| state.commits.get(sha)) else {
            return BTreeMap::new();
        };
        state.trees[&commit.tree]
            .iter()
            .map(|(path, blob)| (path.clone(), String::from_utf8_lossy(&state.blobs[blob]).into_owned()))
            .collect()
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.lock().requests.clone()
    }

    pub fn count(&self, method: &str, suffix: &str) -> usize {
        self.lock().requests.iter().filter(|r| r.is(method, suffix)).count()
    }

    fn handle(&self, method: &str, route: &str, body: &Value) -> HttpResponse {
        let mut state = self.lock();

        if let Some(canned) = state
            .canned
            .iter()
            .find(|c| c.method == method && route.ends_with(&c.suffix))
        {
            return canned.response.clone();
        }

        let prefix = format!("/repos/{OWNER}/{REPO}");
        let Some(rest) = route.strip_prefix(&prefix) else {
            return not_found();
        };

        match (method, rest) {
            ("GET", "") => HttpResponse::json(
                200,
                &json!({
                    "name": REPO,
                    "full_name": format!("{OWNER}/{REPO}"),
                    "default_branch": state.default_branch,
                    "private": false,
                }),
            ),
            ("GET", r) if r.starts_with("/git/ref/heads/") => {
                let branch = &r["/git/ref/heads/".len()..];
                state
                    .refs
                    .get(branch)
                    .map_or_else(not_found, |sha| HttpResponse::json(200, &ref_json(branch, sha)))
            }
            ("GET", r) if r.starts_with("/git/commits/") => {
                let sha = &r["/git/commits/".len()..];
                state
                    .commits
                    .get(sha)
                    .map_or_else(not_found, |c| HttpResponse::json(200, &commit_json(sha, c)))
            }
            ("POST", "/git/blobs") => {
                let Some(bytes) = body["content"].as_str().and_then(|c| STANDARD.decode(c).ok()) else {
                    return validation("Invalid blob content");
                };
                let sha = state.mint("b");
                state.blobs.insert(sha.clone(), bytes);
                HttpResponse::json(201, &json!({ "sha": sha, "url": format!("{BASE_URL}{prefix}/git/blobs/{sha}") }))
            }
            ("POST", "/git/trees") => {
                let base = body["base_tree"].as_str().unwrap_or_default();
                let Some(mut tree) = state.trees.get(base).cloned() else {
                    return validation("Invalid base_tree");
                };
                for entry in body["tree"].as_array().into_iter().flatten() {
                    let (Some(path), Some(sha)) = (entry["path"].as_str(), entry["sha"].as_str()) else {
                        return validation("Invalid tree entry");
                    };
                    if !state.blobs.contains_key(sha) {
                        return validation("Invalid tree entry sha");
                    }
                    tree.insert(path.to_owned(), sha.to_owned());
                }
                let sha = state.mint("t");
                state.trees.insert(sha.clone(), tree);
                HttpResponse::json(201, &json!({ "sha": sha, "tree": [], "truncated": false }))
            }
            ("POST", "/git/commits") => {
                let tree = body["tree"].as_str().unwrap_or_default().to_owned();
                if !state.trees.contains_key(&tree) {
                    return validation("Invalid tree");
                }
                let commit = FakeCommit {
                    tree,
                    parents: body["parents"]
                        .as_array()
                        .into_iter()
                        .flatten()
                        .filter_map(Value::as_str)
                        .map(str::to_owned)
                        .collect(),
                    message: body["message"].as_str().unwrap_or_default().to_owned(),
                };
                let sha = state.mint("c");
                let response = commit_json(&sha, &commit);
                state.commits.insert(sha, commit);
                HttpResponse::json(201, &response)
            }
            ("POST", "/git/refs") => {
                let Some(branch) = body["ref"].as_str().and_then(|r| r.strip_prefix("refs/heads/")) else {
                    return validation("Reference name is invalid");
                };
                let sha = body["sha"].as_str().unwrap_or_default().to_owned();
                if state.refs.contains_key(branch) {
                    return validation("Reference already exists");
                }
                if !state.commits.contains_key(&sha) {
                    return validation("Object does not exist");
                }
                let response = ref_json(branch, &sha);
                state.refs.insert(branch.to_owned(), sha);
                HttpResponse::json(201, &response)
            }
            ("PATCH", r) if r.starts_with("/git/refs/heads/") => {
                let branch = r["/git/refs/heads/".len()..].to_owned();
                if state.race_on.as_deref() == Some(branch.as_str()) {
                    state.race_on = None;
                    let tip = state.refs[&branch].clone();
                    let theirs = state.commit_files(Some(&tip), &[("RACE.md", "someone else\n")], "concurrent push");
                    state.refs.insert(branch.clone(), theirs);
                }
                let Some(current) = state.refs.get(&branch).cloned() else {
                    return validation("Reference does not exist");
                };
                let sha = body["sha"].as_str().unwrap_or_default().to_owned();
                let force = body["force"].as_bool().unwrap_or(false);
                let fast_forward = state.commits.get(&sha).is_some_and(|c| c.parents.contains(&current));
                if !force && !fast_forward {
                    return validation("Update is not a fast forward");
                }
                state.refs.insert(branch.clone(), sha.clone());
                HttpResponse::json(200, &ref_json(&branch, &sha))
            }
            _ => not_found(),
        }
    }
}

#[async_trait]
impl HttpTransport for FakeGitHub {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, String> {
        let path = request
            .url
            .strip_prefix(BASE_URL)
            .ok_or_else(|| format!("unexpected host in {}", request.url))?
            .to_owned();
        let body = request.json_body();
        let recorded = Recorded {
            method: request.method.as_str().to_owned(),
            path,
            headers: request.headers.clone(),
            body,
        };
        self.lock().requests.push(recorded.clone());
        Ok(self.handle(&recorded.method, recorded.route(), &recorded.body))
    }
}

/// Holds matching requests until released, then forwards them to the fake.
pub struct Gated {
    inner: Arc<FakeGitHub>,
    method: &'static str,
    suffix: &'static str,
    /// Signalled when a matching request arrives.
    pub entered: Notify,
    /// Lets one held request through.
    pub release: Notify,
}

#[async_trait]
impl HttpTransport for Gated {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, String> {
        let route = request.url.split('?').next().unwrap_or_default();
        if request.method.as_str() == self.method && route.ends_with(self.suffix) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.send(request).await
    }
}

fn ref_json(branch: &str, sha: &str) -> Value {
    json!({
        "ref": format!("refs/heads/{branch}"),
        "object": { "sha": sha, "type": "commit" },
    })
}

fn commit_json(sha: &str, commit: &FakeCommit) -> Value {
    json!({
        "sha": sha,
        "tree": { "sha": commit.tree },
        "parents": commit.parents.iter().map(|p| json!({ "sha": p })).collect::<Vec<_>>(),
        "message": commit.message,
    })
}

fn not_found() -> HttpResponse {
    HttpResponse::json(
        404,
        &json!({ "message": "Not Found", "documentation_url": "https://docs.github.com/rest" }),
    )
}

fn validation(message: &str) -> HttpResponse {
    HttpResponse::json(422, &json!({ "message": message }))
}
