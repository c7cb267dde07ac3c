//! Static registry of REST operations
//!
//! The client surface is enumerated here rather than discovered at runtime.
//! Each [`Endpoint`] binds a `(namespace, name)` pair to an HTTP method and
//! a path template whose `{placeholders}` are filled from call arguments.

use std::fmt;

use reqwest::Method;

/// HTTP method of an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

impl HttpMethod {
    /// Whether leftover arguments travel in the query string
    /// (as opposed to a JSON body)
    pub fn uses_query(self) -> bool {
        matches!(self, HttpMethod::Get | HttpMethod::Delete)
    }
}

impl From<HttpMethod> for Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

/// One REST operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub namespace: &'static str,
    pub name: &'static str,
    pub method: HttpMethod,
    /// Path template relative to the API root, e.g. `/repos/{owner}/{repo}`
    pub path: &'static str,
}

impl Endpoint {
    const fn new(
        namespace: &'static str,
        name: &'static str,
        method: HttpMethod,
        path: &'static str,
    ) -> Self {
        Self {
            namespace,
            name,
            method,
            path,
        }
    }

    /// Names of the `{placeholders}` in the path template, in order
    pub fn path_params(&self) -> Vec<&'static str> {
        let mut params = Vec::new();
        let mut rest = self.path;
        while let Some(start) = rest.find('{') {
            let Some(len) = rest[start..].find('}') else {
                break;
            };
            params.push(&rest[start + 1..start + len]);
            rest = &rest[start + len + 1..];
        }
        params
    }
}

use HttpMethod::{Delete, Get, Patch, Post, Put};

/// Every operation exposed by the REST client
pub static ENDPOINTS: &[Endpoint] = &[
    // --- repos ---
    Endpoint::new("repos", "get", Get, "/repos/{owner}/{repo}"),
    Endpoint::new("repos", "listForOrg", Get, "/orgs/{org}/repos"),
    Endpoint::new("repos", "listBranches", Get, "/repos/{owner}/{repo}/branches"),
    Endpoint::new("repos", "getContent", Get, "/repos/{owner}/{repo}/contents/{path}"),
    Endpoint::new("repos", "listReleases", Get, "/repos/{owner}/{repo}/releases"),
    Endpoint::new("repos", "createRelease", Post, "/repos/{owner}/{repo}/releases"),
    Endpoint::new("repos", "deleteRelease", Delete, "/repos/{owner}/{repo}/releases/{release_id}"),
    Endpoint::new("repos", "createFork", Post, "/repos/{owner}/{repo}/forks"),
    // --- issues ---
    Endpoint::new("issues", "get", Get, "/repos/{owner}/{repo}/issues/{issue_number}"),
    Endpoint::new("issues", "listForRepo", Get, "/repos/{owner}/{repo}/issues"),
    Endpoint::new("issues", "create", Post, "/repos/{owner}/{repo}/issues"),
    Endpoint::new("issues", "update", Patch, "/repos/{owner}/{repo}/issues/{issue_number}"),
    Endpoint::new("issues", "createComment", Post, "/repos/{owner}/{repo}/issues/{issue_number}/comments"),
    // --- pulls ---
    Endpoint::new("pulls", "get", Get, "/repos/{owner}/{repo}/pulls/{pull_number}"),
    Endpoint::new("pulls", "list", Get, "/repos/{owner}/{repo}/pulls"),
    Endpoint::new("pulls", "create", Post, "/repos/{owner}/{repo}/pulls"),
    Endpoint::new("pulls", "merge", Put, "/repos/{owner}/{repo}/pulls/{pull_number}/merge"),
    // --- git ---
    Endpoint::new("git", "getRef", Get, "/repos/{owner}/{repo}/git/ref/{ref}"),
    Endpoint::new("git", "createRef", Post, "/repos/{owner}/{repo}/git/refs"),
    Endpoint::new("git", "createBlob", Post, "/repos/{owner}/{repo}/git/blobs"),
    Endpoint::new("git", "createTree", Post, "/repos/{owner}/{repo}/git/trees"),
    Endpoint::new("git", "createCommit", Post, "/repos/{owner}/{repo}/git/commits"),
    // --- users ---
    Endpoint::new("users", "getAuthenticated", Get, "/user"),
    Endpoint::new("users", "getByUsername", Get, "/users/{username}"),
    // --- search ---
    Endpoint::new("search", "repos", Get, "/search/repositories"),
    Endpoint::new("search", "code", Get, "/search/code"),
    Endpoint::new("search", "issuesAndPullRequests", Get, "/search/issues"),
    Endpoint::new("search", "users", Get, "/search/users"),
    Endpoint::new("search", "commits", Get, "/search/commits"),
    // --- rate_limit ---
    Endpoint::new("rate_limit", "get", Get, "/rate_limit"),
];

/// Looks up an endpoint by namespace and name
pub fn find(namespace: &str, name: &str) -> Option<&'static Endpoint> {
    ENDPOINTS
        .iter()
        .find(|e| e.namespace == namespace && e.name == name)
}
