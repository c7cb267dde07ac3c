//! Transport configuration
//!
//! Builds the `reqwest::Client` that every REST operation goes through:
//! default headers, user agent, request timeout and outbound proxy.
//!
//! Two proxy forms are supported:
//! - **Forward proxy** (`proxy: http://host:port`): all traffic is routed
//!   through the proxy and each request carries `Via` and `X-Forwarded-For`
//!   headers.
//! - **Tunnel proxy** (`proxy: {host, port, ...}`): encrypted traffic goes
//!   through a CONNECT tunnel. Configured headers are sent with the CONNECT
//!   request, and certificate validation can be relaxed with
//!   `reject_unauthorized: false`.
//!
//! Connection and proxy negotiation failures are not detected here; they
//! surface as [`crate::ApiError::Network`] from the first call that needs
//! the connection.

use std::time::Duration;

use octopace_core::config::{ProxyConfig, TransportConfig, TunnelProxyConfig};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, VIA};
use reqwest::{Client, Proxy};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

/// `Via` value added to requests sent through a forward proxy
pub const VIA_VALUE: &str = "1.1 octopace";

/// `X-Forwarded-For` value added to requests sent through a forward proxy
pub const FORWARDED_FOR_VALUE: &str = "127.0.0.1";

/// Errors raised while building the HTTP client
#[derive(Debug, Error)]
pub enum TransportError {
    /// A configured URL could not be parsed
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// A configured header name or value is not valid HTTP
    #[error("Invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    /// reqwest rejected the client or proxy settings
    #[error("Failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Converts a name → value map into a `HeaderMap`
fn header_map<'a>(
    headers: impl IntoIterator<Item = (&'a String, &'a String)>,
) -> Result<HeaderMap, TransportError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| TransportError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        let header_value =
            HeaderValue::from_str(value).map_err(|e| TransportError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

/// Headers attached to every outbound request
///
/// Includes the configured default headers, plus `Via` and
/// `X-Forwarded-For` when a forward proxy is configured (unless the
/// configuration already sets them).
pub fn default_headers(config: &TransportConfig) -> Result<HeaderMap, TransportError> {
    let mut headers = header_map(&config.headers)?;

    if matches!(config.proxy, Some(ProxyConfig::Forward(_))) {
        if !headers.contains_key(VIA) {
            headers.insert(VIA, HeaderValue::from_static(VIA_VALUE));
        }
        let forwarded_for = HeaderName::from_static("x-forwarded-for");
        if !headers.contains_key(&forwarded_for) {
            headers.insert(forwarded_for, HeaderValue::from_static(FORWARDED_FOR_VALUE));
        }
    }

    Ok(headers)
}

/// Root URL for operation paths: `base_url` followed by `path_prefix`
pub fn api_root(config: &TransportConfig) -> Result<Url, TransportError> {
    let mut root = config.base_url.trim_end_matches('/').to_string();
    if let Some(prefix) = &config.path_prefix {
        root.push_str(prefix.trim_end_matches('/'));
    }
    Url::parse(&root).map_err(|source| TransportError::InvalidUrl { url: root, source })
}

/// Builds a reqwest proxy for the given settings
pub fn build_proxy(proxy: &ProxyConfig) -> Result<Proxy, TransportError> {
    match proxy {
        ProxyConfig::Forward(url) => {
            Url::parse(url).map_err(|source| TransportError::InvalidUrl {
                url: url.clone(),
                source,
            })?;
            Ok(Proxy::all(url.as_str())?)
        }
        ProxyConfig::Tunnel(tunnel) => build_tunnel_proxy(tunnel),
    }
}

fn build_tunnel_proxy(tunnel: &TunnelProxyConfig) -> Result<Proxy, TransportError> {
    let url = format!("http://{}:{}", tunnel.host, tunnel.port);
    Url::parse(&url).map_err(|source| TransportError::InvalidUrl {
        url: url.clone(),
        source,
    })?;

    // Only https targets are tunnelled; plain http goes direct.
    let mut proxy = Proxy::https(url.as_str())?;
    if !tunnel.headers.is_empty() {
        proxy = proxy.headers(header_map(&tunnel.headers)?);
    }
    Ok(proxy)
}

/// Builds the HTTP client described by `config`
pub fn http_client(config: &TransportConfig) -> Result<Client, TransportError> {
    let mut builder = Client::builder()
        .user_agent(config.user_agent.as_str())
        .default_headers(default_headers(config)?);

    if let Some(secs) = config.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }

    match &config.proxy {
        None => {
            // Ignore HTTP(S)_PROXY from the environment: an absent proxy
            // setting means direct connections.
            builder = builder.no_proxy();
        }
        Some(proxy) => {
            builder = builder.proxy(build_proxy(proxy)?);
            if let ProxyConfig::Tunnel(tunnel) = proxy {
                info!(
                    host = %tunnel.host,
                    port = tunnel.port,
                    "Routing HTTPS traffic through CONNECT tunnel"
                );
                if !tunnel.reject_unauthorized {
                    warn!("TLS certificate validation disabled for tunnelled connections");
                    builder = builder.danger_accept_invalid_certs(true);
                }
            } else {
                info!("Routing traffic through forward proxy");
            }
        }
    }

    debug!(
        user_agent = %config.user_agent,
        headers = config.headers.len(),
        "Building HTTP client"
    );
    Ok(builder.build()?)
}
