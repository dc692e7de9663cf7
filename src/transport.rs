//! HTTP transport to the chart repository
//!
//! The transport knows how to reach the repository (base URL, credentials,
//! TLS policy, timeout) and nothing else. It does not retry and it does not
//! interpret status codes: a non-2xx response is handed back to the caller,
//! which decides whether it is an error worth retrying.

use crate::config::RepositoryConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use url::Url;

/// Response body as a stream of chunks
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// A response from the repository: status code plus streamed body
pub struct RemoteResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body, consumed incrementally
    pub body: ByteStream,
}

impl RemoteResponse {
    /// Response with an in-memory body
    pub fn from_bytes(status: u16, body: impl Into<Bytes>) -> Self {
        let body: Bytes = body.into();
        Self {
            status,
            body: futures::stream::once(async move { Ok(body) }).boxed(),
        }
    }

    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Drain the whole body into memory
    pub async fn bytes(mut self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        while let Some(chunk) = self.body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf)
    }
}

impl std::fmt::Debug for RemoteResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Fetches paths relative to a repository base URL
///
/// Implemented by [`HttpTransport`] for real repositories; tests substitute
/// in-process implementations to simulate failures.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Repository base URL (no trailing slash)
    fn base_url(&self) -> &Url;

    /// GET `path` relative to the base URL
    ///
    /// An absolute `http(s)://` URL is requested as-is, without repository
    /// credentials unless it shares the repository's origin. Fails only when no
    /// response could be obtained; non-2xx responses are returned normally.
    async fn fetch(&self, path: &str) -> Result<RemoteResponse>;
}

/// Transport backed by a `reqwest` client
///
/// Proxies are taken from the environment (`HTTP_PROXY`, `HTTPS_PROXY`,
/// `NO_PROXY`), which reqwest honors by default.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
    credentials: Option<(String, String)>,
    verify_certificates: bool,
}

impl HttpTransport {
    /// Build a client for the given repository
    ///
    /// # Errors
    /// Returns a config error for an unusable URL, or a network error if the
    /// TLS backend cannot be initialized.
    pub fn new(config: &RepositoryConfig) -> Result<Self> {
        let base_url = config.base_url()?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("chart-mirror/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(config.insecure_skip_verify)
            .build()?;

        if config.insecure_skip_verify {
            tracing::warn!(url = %base_url, "TLS certificate verification disabled");
        }

        Ok(Self {
            client,
            base_url,
            credentials: config
                .credentials()
                .map(|(u, p)| (u.to_string(), p.to_string())),
            verify_certificates: !config.insecure_skip_verify,
        })
    }

    /// Whether server certificates are checked
    pub fn verifies_certificates(&self) -> bool {
        self.verify_certificates
    }

    /// Credentials to send to `url`
    ///
    /// Only requests to the repository's own origin (scheme, host and port)
    /// carry them; artifacts hosted elsewhere are fetched anonymously.
    fn credentials_for(&self, url: &Url) -> Option<(&str, &str)> {
        let (username, password) = self.credentials.as_ref()?;
        if url.origin() == self.base_url.origin() {
            Some((username.as_str(), password.as_str()))
        } else {
            None
        }
    }

    /// Resolve `path` against the base URL
    pub fn resolve(&self, path: &str) -> Result<Url> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Url::parse(path).map_err(|e| Error::InvalidArtifactUrl {
                url: path.to_string(),
                reason: e.to_string(),
            });
        }

        let (rest, fragment) = match path.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment)),
            None => (path, None),
        };
        let (rest, query) = match rest.split_once('?') {
            Some((rest, query)) => (rest, Some(query)),
            None => (rest, None),
        };

        let mut url = self.base_url.clone();
        let joined = format!(
            "{}/{}",
            url.path().trim_end_matches('/'),
            rest.trim_start_matches('/')
        );
        url.set_path(&joined);
        url.set_query(query);
        url.set_fragment(fragment);
        Ok(url)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn fetch(&self, path: &str) -> Result<RemoteResponse> {
        let url = self.resolve(path)?;
        tracing::debug!(%url, "GET");

        let credentials = self.credentials_for(&url);
        let mut request = self.client.get(url.clone());
        if let Some((username, password)) = credentials {
            request = request.basic_auth(username, Some(password));
        } else if self.credentials.is_some() {
            tracing::debug!(%url, "off-repository host, sending no credentials");
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(Error::Network))
            .boxed();

        Ok(RemoteResponse { status, body })
    }
}
