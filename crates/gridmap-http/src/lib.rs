#![forbid(unsafe_code)]

//! [`TopologyBackend`] over HTTP.
//!
//! Speaks the remote node store's JSON API (see [`gridmap_core::wire`]) with `reqwest`. Any
//! async runtime that can drive `reqwest` works; the editor itself stays executor-agnostic.

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;
use url::Url;

use gridmap_core::sync::TopologyBackend;
use gridmap_core::wire::{self, AUTH_HEADER, Method, Route};
use gridmap_core::{Node, NodeId, RemoteError};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid API base URL {url:?}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base: Url,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Self::with_client(client, base_url)
    }

    /// Uses a caller-configured client (proxies, TLS roots, timeouts).
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self> {
        let invalid = |source: url::ParseError| Error::InvalidBaseUrl {
            url: base_url.to_string(),
            source,
        };
        let base = Url::parse(base_url).map_err(invalid)?;
        if base.cannot_be_a_base() {
            return Err(invalid(url::ParseError::RelativeUrlWithCannotBeABaseBase));
        }
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Appends the route's segments to the base path, percent-encoding each one.
    pub fn url(&self, route: &Route) -> std::result::Result<Url, RemoteError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| RemoteError::Unavailable {
                message: format!("API base URL {} cannot carry a path", self.base),
            })?
            .pop_if_empty()
            .extend(route.segments());
        Ok(url)
    }

    async fn send(
        &self,
        route: Route,
        credential: Option<&str>,
        body: Option<Value>,
    ) -> std::result::Result<Value, RemoteError> {
        let url = self.url(&route)?;
        let method = match route.method() {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };
        tracing::debug!(%method, %url, "remote call");

        let mut request = self.client.request(method, url);
        if let Some(token) = credential {
            request = request.header(AUTH_HEADER, token);
        }
        if let Some(body) = &body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let text = response.text().await.map_err(transport)?;
        let value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        check_status(status, value)
    }
}

fn transport(err: reqwest::Error) -> RemoteError {
    tracing::warn!(error = %err, "remote call failed");
    RemoteError::Unavailable {
        message: err.to_string(),
    }
}

/// Maps HTTP status and the `{ success: false, message }` envelope onto [`RemoteError`].
fn check_status(status: StatusCode, body: Value) -> std::result::Result<Value, RemoteError> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(RemoteError::Unauthorized);
    }
    let reason = || {
        wire::error_reason(&body)
            .or_else(|| status.canonical_reason().map(str::to_string))
            .unwrap_or_default()
    };
    if !status.is_success() {
        return Err(RemoteError::Rejected {
            status: status.as_u16(),
            reason: reason(),
        });
    }
    if body.get("success").and_then(Value::as_bool) == Some(false) {
        return Err(RemoteError::Rejected {
            status: status.as_u16(),
            reason: reason(),
        });
    }
    Ok(body)
}

impl TopologyBackend for HttpBackend {
    async fn fetch_nodes(&self) -> std::result::Result<Vec<Node>, RemoteError> {
        let body = self.send(Route::ListNodes, None, None).await?;
        let list = wire::parse_node_list(&body)?;
        if list.skipped > 0 {
            tracing::warn!(skipped = list.skipped, "node list contained malformed records");
        }
        Ok(list.nodes)
    }

    async fn create_node(
        &self,
        credential: &str,
        node: &Node,
    ) -> std::result::Result<NodeId, RemoteError> {
        let body = self
            .send(
                Route::CreateNode,
                Some(credential),
                Some(wire::create_payload(node)),
            )
            .await?;
        wire::created_id(&body).ok_or_else(|| RemoteError::Unavailable {
            message: "create response carried no id".to_string(),
        })
    }

    async fn update_node(&self, credential: &str, node: &Node) -> std::result::Result<(), RemoteError> {
        self.send(
            Route::UpdateNode(node.id.clone()),
            Some(credential),
            Some(wire::update_payload(node)),
        )
        .await
        .map(|_| ())
    }

    async fn delete_node(&self, credential: &str, id: &NodeId) -> std::result::Result<(), RemoteError> {
        self.send(Route::DeleteNode(id.clone()), Some(credential), None)
            .await
            .map(|_| ())
    }

    async fn connect(
        &self,
        credential: &str,
        from: &NodeId,
        to: &NodeId,
    ) -> std::result::Result<(), RemoteError> {
        self.send(
            Route::Connect { to: to.clone() },
            Some(credential),
            Some(wire::connect_payload(from)),
        )
        .await
        .map(|_| ())
    }

    async fn disconnect(
        &self,
        credential: &str,
        from: &NodeId,
        to: &NodeId,
    ) -> std::result::Result<(), RemoteError> {
        self.send(
            Route::Disconnect {
                from: from.clone(),
                to: to.clone(),
            },
            Some(credential),
            None,
        )
        .await
        .map(|_| ())
    }
}
