// Remote resource HTTP client.
// Restricts fetches to http/https and applies a fixed header set to every request.

use reqwest::{
    Client, ClientBuilder, Response, Url,
    header::{HeaderMap, HeaderValue, USER_AGENT},
};
use tracing::debug;

use crate::error::{HostError, Result};

/// User agent sent when the configured header set does not provide one.
const DEFAULT_USER_AGENT: &str = concat!("apihost/", env!("CARGO_PKG_VERSION"));

/// HTTP client holding an immutable snapshot of the request headers.
///
/// Headers are captured when the client is built and installed as the
/// client's default headers, so concurrent fetches never observe a
/// half-updated header set.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    headers: HeaderMap,
}

impl Fetcher {
    /// Create a fetcher that sends `headers` with every request.
    pub fn new(headers: HeaderMap) -> Result<Self> {
        Self::from_builder(Client::builder(), headers)
    }

    /// Create a fetcher from a preconfigured client builder.
    pub fn from_builder(builder: ClientBuilder, mut headers: HeaderMap) -> Result<Self> {
        if !headers.contains_key(USER_AGENT) {
            headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        }

        let client = builder
            .default_headers(headers.clone())
            .build()
            .map_err(HostError::Http)?;

        Ok(Self { client, headers })
    }

    /// The header snapshot applied to every request.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Issue a GET request for `url`.
    ///
    /// The response is returned as-is: the status is not checked and the
    /// body is not read. Redirects are followed by the underlying client.
    pub async fn get(&self, url: &str) -> Result<Response> {
        let url = parse_http_url(url)?;
        debug!(%url, "fetching remote resource");

        let response = self.client.get(url).send().await.map_err(HostError::Http)?;
        debug!(status = response.status().as_u16(), "remote responded");
        Ok(response)
    }
}

/// Parse `url` and reject any scheme other than http or https.
pub fn parse_http_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| HostError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(HostError::UnsupportedProtocol(format!("{}:", other))),
    }
}
