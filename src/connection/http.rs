//! HTTP connection handles backed by reqwest.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use std::collections::HashMap;
use url::Url;

use crate::connection::Connector;
use crate::pool::{Endpoint, TargetKind};

/// Handle given to operations against an HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpHandle {
    pub kind: TargetKind,
    /// Parsed base URL of the endpoint.
    pub url: Url,
    /// Client configured for this target kind.
    pub client: reqwest::Client,
}

impl HttpHandle {
    /// Resolve `path` against the endpoint's base URL.
    pub fn join(&self, path: &str) -> Result<Url, url::ParseError> {
        self.url.join(path)
    }
}

/// Builds [`HttpHandle`]s, one shared client per target kind.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    clients: HashMap<TargetKind, reqwest::Client>,
}

impl HttpConnector {
    pub fn new() -> Result<Self, reqwest::Error> {
        let mut clients = HashMap::new();
        for kind in TargetKind::ALL {
            let client = reqwest::Client::builder()
                .user_agent(concat!("rpc-failover/", env!("CARGO_PKG_VERSION")))
                .default_headers(default_headers(kind))
                .build()?;
            clients.insert(kind, client);
        }
        Ok(Self { clients })
    }
}

fn default_headers(kind: TargetKind) -> HeaderMap {
    let mut headers = HeaderMap::new();
    match kind {
        TargetKind::Rpc => {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        }
        TargetKind::Horizon => {
            headers.insert(
                ACCEPT,
                HeaderValue::from_static("application/hal+json, application/json"),
            );
        }
    }
    headers
}

impl Connector for HttpConnector {
    type Handle = HttpHandle;

    fn connect(&self, endpoint: &Endpoint) -> Result<HttpHandle, String> {
        let url = Url::parse(&endpoint.address)
            .map_err(|e| format!("invalid endpoint URL '{}': {}", endpoint.address, e))?;
        let client = self
            .clients
            .get(&endpoint.kind)
            .cloned()
            .ok_or_else(|| format!("no HTTP client for target kind '{}'", endpoint.kind))?;

        Ok(HttpHandle {
            kind: endpoint.kind,
            url,
            client,
        })
    }
}
