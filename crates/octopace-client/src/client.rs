//! REST API client
//!
//! Sends the requests behind every [`Endpoint`] of the static catalogue and
//! exposes them as [`Operation`]s grouped into an [`OperationTree`].
//!
//! Argument handling for a call:
//! 1. `{placeholders}` in the path template are filled from the argument
//!    object and removed from it.
//! 2. Remaining arguments become the query string (`GET`, `DELETE`) or the
//!    JSON request body (other methods).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use octopace_client::client::RestClient;
//! use octopace_core::config::TransportConfig;
//! use serde_json::json;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = Arc::new(RestClient::new(&TransportConfig::default())?);
//! let tree = client.operation_tree();
//! if let Some(op) = tree.operation("users", "getByUsername") {
//!     let user = op.invoke(&json!({"username": "octocat"})).await?;
//!     println!("{}", user["login"]);
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use octopace_core::config::{TransportConfig, DEFAULT_API_VERSION};
use octopace_core::ports::{Operation, OperationTree};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use url::Url;

use crate::endpoints::{Endpoint, ENDPOINTS};
use crate::transport::{self, TransportError};
use crate::ApiError;

/// Namespace holding the non-callable client values
pub const META_NAMESPACE: &str = "meta";

/// HTTP client for the REST API
///
/// Wraps a configured `reqwest::Client` with the API root URL and bearer
/// credential.
pub struct RestClient {
    /// The underlying HTTP client
    http: Client,
    /// `base_url` plus `path_prefix`
    root: Url,
    /// Bearer token, if configured
    credential: Option<String>,
    /// Value sent in `x-github-api-version`
    api_version: String,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("root", &self.root.as_str())
            .field("authenticated", &self.credential.is_some())
            .finish()
    }
}

impl RestClient {
    /// Creates a client from transport settings
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let http = transport::http_client(config)?;
        let root = transport::api_root(config)?;
        let api_version = config
            .headers
            .get("x-github-api-version")
            .cloned()
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());

        debug!(root = %root, "Created REST client");
        Ok(Self {
            http,
            root,
            credential: config.credential.clone(),
            api_version,
        })
    }

    /// API root URL
    pub fn root(&self) -> &Url {
        &self.root
    }

    /// API version reported in the `meta` namespace
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Absolute URL for a path relative to the API root
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.root.as_str().trim_end_matches('/'), path)
    }

    /// Creates a request builder for the given method and path
    ///
    /// Adds the `Authorization` header when a credential is configured.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.http.request(method, self.url_for(path));
        match &self.credential {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Sends the request for `endpoint` with the given arguments
    pub async fn execute(&self, endpoint: &Endpoint, args: &Value) -> Result<Value, ApiError> {
        let (path, rest) = render_path(endpoint, args)?;
        let operation = format!("{}.{}", endpoint.namespace, endpoint.name);

        let mut request = self.request(endpoint.method.into(), &path);
        if !rest.is_empty() {
            if endpoint.method.uses_query() {
                request = request.query(&query_pairs(&rest));
            } else {
                request = request.json(&rest);
            }
        }

        debug!(
            operation = %operation,
            method = %endpoint.method,
            path = %path,
            "Sending request"
        );

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if status.is_success() {
            return parse_success(status, &bytes);
        }

        let body: Option<Value> = serde_json::from_slice(&bytes).ok();
        let message = body
            .as_ref()
            .and_then(|b| b.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| status.canonical_reason().map(str::to_string))
            .unwrap_or_else(|| "Unknown error".to_string());

        warn!(
            operation = %operation,
            status = status.as_u16(),
            message = %message,
            "Request failed"
        );
        Err(ApiError::Http {
            status: status.as_u16(),
            message,
            body,
        })
    }

    /// Builds the operation tree for the whole endpoint catalogue
    ///
    /// Also adds the non-callable `meta` namespace (`base_url`,
    /// `api_version`).
    pub fn operation_tree(self: &Arc<Self>) -> OperationTree<ApiError> {
        let mut tree: OperationTree<ApiError> = OperationTree::new();
        for endpoint in ENDPOINTS {
            tree.insert_operation(
                endpoint.namespace,
                endpoint.name,
                Arc::new(RestOperation {
                    client: Arc::clone(self),
                    endpoint,
                }),
            );
        }
        tree.insert_value(
            META_NAMESPACE,
            "base_url",
            Value::String(self.url_for("")),
        );
        tree.insert_value(
            META_NAMESPACE,
            "api_version",
            Value::String(self.api_version.clone()),
        );
        tree
    }
}

// ============================================================================
// Request and response helpers
// ============================================================================

/// Fills the path template and returns the arguments it did not consume
fn render_path(endpoint: &Endpoint, args: &Value) -> Result<(String, Map<String, Value>), ApiError> {
    let mut rest = match args {
        Value::Null => Map::new(),
        Value::Object(map) => map.clone(),
        other => {
            return Err(ApiError::InvalidArguments(format!(
                "expected an object, got {other}"
            )))
        }
    };

    let mut path = endpoint.path.to_string();
    for param in endpoint.path_params() {
        let value = rest.remove(param).ok_or_else(|| {
            ApiError::InvalidArguments(format!("missing required argument '{param}'"))
        })?;
        let text = scalar_to_string(&value).ok_or_else(|| {
            ApiError::InvalidArguments(format!("argument '{param}' must be a string or number"))
        })?;
        // `path` holds a file path whose slashes are part of the route.
        let encoded = encode_segment(&text, param == "path");
        path = path.replace(&format!("{{{param}}}"), &encoded);
    }
    Ok((path, rest))
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Everything outside the RFC 3986 unreserved set
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// [`SEGMENT`] with `/` kept as a separator
const SEGMENT_PATH: &AsciiSet = &SEGMENT.remove(b'/');

fn encode_segment(value: &str, keep_slashes: bool) -> String {
    let set = if keep_slashes { SEGMENT_PATH } else { SEGMENT };
    utf8_percent_encode(value, set).to_string()
}

fn query_pairs(args: &Map<String, Value>) -> Vec<(String, String)> {
    args.iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| {
            let text = match v {
                Value::Array(items) => items
                    .iter()
                    .map(|i| scalar_to_string(i).unwrap_or_else(|| i.to_string()))
                    .collect::<Vec<_>>()
                    .join(","),
                other => scalar_to_string(other).unwrap_or_else(|| other.to_string()),
            };
            (k.clone(), text)
        })
        .collect()
}

fn parse_success(status: StatusCode, bytes: &[u8]) -> Result<Value, ApiError> {
    if status == StatusCode::NO_CONTENT || bytes.is_empty() {
        return Ok(Value::Null);
    }
    match serde_json::from_slice(bytes) {
        Ok(value) => Ok(value),
        Err(_) => match std::str::from_utf8(bytes) {
            // Raw media types (e.g. file contents) come back as text.
            Ok(text) => Ok(Value::String(text.to_string())),
            Err(e) => Err(ApiError::InvalidResponse(e.to_string())),
        },
    }
}

// ============================================================================
// RestOperation
// ============================================================================

/// One catalogue endpoint bound to a client
pub struct RestOperation {
    client: Arc<RestClient>,
    endpoint: &'static Endpoint,
}

impl RestOperation {
    /// The endpoint this operation calls
    pub fn endpoint(&self) -> &'static Endpoint {
        self.endpoint
    }
}

#[async_trait]
impl Operation for RestOperation {
    type Error = ApiError;

    async fn invoke(&self, args: &Value) -> Result<Value, ApiError> {
        self.client.execute(self.endpoint, args).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::endpoints::find;

    fn client_with(config: TransportConfig) -> RestClient {
        RestClient::new(&config).unwrap()
    }

    #[test]
    fn test_request_builder_adds_bearer_auth() {
        let client = client_with(TransportConfig {
            credential: Some("test-token".into()),
            ..TransportConfig::default()
        });
        let request = client.request(Method::GET, "/user").build().unwrap();
        assert_eq!(request.url().as_str(), "https://api.github.com/user");
        let auth_header = request
            .headers()
            .get("authorization")
            .unwrap()
            .to_str()
            .unwrap();
        assert_eq!(auth_header, "Bearer test-token");
    }

    #[test]
    fn test_request_without_credential_is_anonymous() {
        let client = client_with(TransportConfig::default());
        let request = client.request(Method::GET, "/user").build().unwrap();
        assert!(request.headers().get("authorization").is_none());
    }

    #[test]
    fn test_path_prefix_is_applied() {
        let client = client_with(TransportConfig {
            base_url: "https://github.example.com".into(),
            path_prefix: Some("/api/v3".into()),
            ..TransportConfig::default()
        });
        let request = client.request(Method::GET, "/user").build().unwrap();
        assert_eq!(
            request.url().as_str(),
            "https://github.example.com/api/v3/user"
        );
    }

    #[test]
    fn test_render_path_consumes_placeholders() {
        let endpoint = find("issues", "get").unwrap();
        let (path, rest) = render_path(
            endpoint,
            &json!({"owner": "octo", "repo": "hello", "issue_number": 7, "extra": true}),
        )
        .unwrap();
        assert_eq!(path, "/repos/octo/hello/issues/7");
        assert_eq!(rest.len(), 1);
        assert_eq!(rest["extra"], json!(true));
    }

    #[test]
    fn test_render_path_encodes_values() {
        let endpoint = find("repos", "getContent").unwrap();
        let (path, _) = render_path(
            endpoint,
            &json!({"owner": "a b", "repo": "r", "path": "docs/read me.md"}),
        )
        .unwrap();
        assert_eq!(path, "/repos/a%20b/r/contents/docs/read%20me.md");
    }

    #[test]
    fn test_encode_segment_keeps_only_unreserved() {
        assert_eq!(encode_segment("a b/c", false), "a%20b%2Fc");
        assert_eq!(encode_segment("a b/c", true), "a%20b/c");
        assert_eq!(encode_segment("é~_.-", false), "%C3%A9~_.-");
        assert_eq!(encode_segment("q?x=1&y#z", false), "q%3Fx%3D1%26y%23z");
    }

    #[test]
    fn test_render_path_escapes_slash_outside_path_argument() {
        let endpoint = find("repos", "get").unwrap();
        let (path, _) = render_path(endpoint, &json!({"owner": "a/b", "repo": "ré"})).unwrap();
        assert_eq!(path, "/repos/a%2Fb/r%C3%A9");
    }

    #[test]
    fn test_render_path_missing_argument() {
        let endpoint = find("repos", "get").unwrap();
        let err = render_path(endpoint, &json!({"owner": "octo"})).unwrap_err();
        assert!(matches!(err, ApiError::InvalidArguments(ref m) if m.contains("'repo'")));
    }

    #[test]
    fn test_render_path_rejects_non_object_args() {
        let endpoint = find("users", "getAuthenticated").unwrap();
        assert!(render_path(endpoint, &Value::Null).is_ok());
        assert!(matches!(
            render_path(endpoint, &json!([1, 2])),
            Err(ApiError::InvalidArguments(_))
        ));
    }

    #[test]
    fn test_query_pairs() {
        let args = json!({"q": "tokio", "per_page": 5, "labels": ["bug", "p1"], "skip": null});
        let Value::Object(map) = args else {
            unreachable!()
        };
        let mut pairs = query_pairs(&map);
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                ("labels".to_string(), "bug,p1".to_string()),
                ("per_page".to_string(), "5".to_string()),
                ("q".to_string(), "tokio".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_success() {
        assert_eq!(parse_success(StatusCode::NO_CONTENT, b"").unwrap(), Value::Null);
        assert_eq!(
            parse_success(StatusCode::OK, br#"{"id": 1}"#).unwrap(),
            json!({"id": 1})
        );
        assert_eq!(
            parse_success(StatusCode::OK, b"plain text").unwrap(),
            json!("plain text")
        );
    }

    #[test]
    fn test_operation_tree_covers_catalogue() {
        let client = Arc::new(client_with(TransportConfig::default()));
        let tree = client.operation_tree();

        assert_eq!(tree.operation_count(), ENDPOINTS.len());
        assert!(tree.operation("repos", "createRelease").is_some());
        assert!(tree.operation("search", "code").is_some());
        assert!(tree.operation(META_NAMESPACE, "base_url").is_none());
        assert_eq!(
            tree.entry(META_NAMESPACE, "base_url")
                .and_then(|e| e.as_value()),
            Some(&json!("https://api.github.com"))
        );
        assert_eq!(
            tree.entry(META_NAMESPACE, "api_version")
                .and_then(|e| e.as_value()),
            Some(&json!(DEFAULT_API_VERSION))
        );
    }
}
