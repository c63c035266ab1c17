//! Request values, the transport seam, and the reqwest-backed transport
//!
//! Requests are immutable values built up front and handed to a
//! [`Transport`]. The production transport adds client-side rate limiting,
//! backoff on throttling responses, and redirect handling that keeps every
//! `Set-Cookie` header seen along the way.

use std::fmt;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Jitter, Quota, RateLimiter};
use reqwest::multipart;
use reqwest::Client;
use url::Url;

use crate::constants::{http, limits};
use crate::errors::{TransportError, TransportResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

/// One field of a multipart body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text { name: String, value: String },
    File { name: String, path: PathBuf },
}

impl Part {
    pub fn text(name: &str, value: impl Into<String>) -> Self {
        Part::Text {
            name: name.to_string(),
            value: value.into(),
        }
    }

    pub fn file(name: &str, path: impl Into<PathBuf>) -> Self {
        Part::File {
            name: name.to_string(),
            path: path.into(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Part::Text { name, .. } | Part::File { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Form(Vec<(String, String)>),
    Multipart(Vec<Part>),
}

/// An HTTP request, fully described before it is sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingRequest {
    method: Method,
    url: Url,
    headers: Vec<(String, String)>,
    body: RequestBody,
    follow_redirects: bool,
}

impl OutgoingRequest {
    pub fn get(url: Url) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: Url) -> Self {
        Self::new(Method::Post, url)
    }

    fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body: RequestBody::Empty,
            follow_redirects: true,
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    /// URL-encoded form body
    pub fn with_form<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.body = RequestBody::Form(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    pub fn with_multipart(mut self, parts: Vec<Part>) -> Self {
        self.body = RequestBody::Multipart(parts);
        self
    }

    /// Return 3xx responses as they are instead of following them
    pub fn without_redirects(mut self) -> Self {
        self.follow_redirects = false;
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    pub fn follows_redirects(&self) -> bool {
        self.follow_redirects
    }

    /// Value of a form or multipart text field
    pub fn field(&self, name: &str) -> Option<&str> {
        match &self.body {
            RequestBody::Form(fields) => fields
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            RequestBody::Multipart(parts) => parts.iter().find_map(|part| match part {
                Part::Text { name: n, value } if n == name => Some(value.as_str()),
                _ => None,
            }),
            RequestBody::Empty => None,
        }
    }

    /// Every value of a repeated form field, in order
    pub fn field_values(&self, name: &str) -> Vec<&str> {
        match &self.body {
            RequestBody::Form(fields) => fields
                .iter()
                .filter(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Status, headers and body of a completed exchange
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawResponse {
    pub status: u16,
    /// In arrival order; repeated names are kept
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// First header with the given name, compared case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn location(&self) -> Option<&str> {
        self.header(http::HEADER_LOCATION)
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Executes one request and returns the raw response
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    async fn execute(&self, request: &OutgoingRequest) -> TransportResult<RawResponse>;
}

/// Reject addresses reqwest cannot reach before any I/O happens
pub fn check_address(url: &Url) -> TransportResult<()> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(TransportError::InvalidAddress {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(TransportError::InvalidAddress {
            url: url.to_string(),
            reason: "missing host".to_string(),
        });
    }
    Ok(())
}

/// Transport backed by a reqwest client
#[derive(Debug)]
pub struct HttpTransport {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl HttpTransport {
    /// The client must be built with redirects disabled; this transport
    /// follows them itself.
    pub fn new(client: Client, rate_limit_rps: u32) -> TransportResult<Self> {
        let rate_limiter = Self::build_rate_limiter(rate_limit_rps)?;
        Ok(Self {
            client,
            rate_limiter,
        })
    }

    fn build_rate_limiter(
        rate_limit_rps: u32,
    ) -> TransportResult<RateLimiter<NotKeyed, InMemoryState, DefaultClock>> {
        let quota = Quota::per_second(
            NonZeroU32::new(rate_limit_rps).ok_or(TransportError::InvalidRateLimit)?,
        );
        Ok(RateLimiter::direct(quota))
    }

    async fn build(
        &self,
        request: &OutgoingRequest,
        url: &Url,
        method: Method,
    ) -> TransportResult<reqwest::RequestBuilder> {
        let mut builder = match method {
            Method::Get => self.client.get(url.clone()),
            Method::Post => self.client.post(url.clone()),
        };
        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }
        // A redirected POST is re-issued as a bodiless GET
        if method != request.method() {
            return Ok(builder);
        }
        builder = match request.body() {
            RequestBody::Empty => builder,
            RequestBody::Form(fields) => builder.form(fields),
            RequestBody::Multipart(parts) => builder.multipart(build_multipart(parts).await?),
        };
        Ok(builder)
    }

    /// One exchange with backoff on 429 and 503
    async fn send_with_retry(
        &self,
        request: &OutgoingRequest,
        url: &Url,
        method: Method,
    ) -> TransportResult<RawResponse> {
        let mut retries = 0;
        loop {
            self.rate_limiter
                .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(100)))
                .await;

            let builder = self.build(request, url, method).await?;
            tracing::debug!("{} {}", method, url);
            let response = match builder.send().await {
                Ok(response) => response,
                Err(e) if e.is_timeout() && retries < limits::MAX_RETRIES => {
                    retries += 1;
                    let delay = backoff_delay(retries);
                    tracing::warn!(
                        "Request timed out (attempt {}/{}). Retrying in {}ms",
                        retries,
                        limits::MAX_RETRIES,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                Err(e) if e.is_builder() => {
                    return Err(TransportError::InvalidAddress {
                        url: url.to_string(),
                        reason: e.to_string(),
                    })
                }
                Err(e) => return Err(TransportError::Http(e)),
            };

            let status = response.status().as_u16();
            if status == 429 || status == 503 {
                if retries < limits::MAX_RETRIES {
                    retries += 1;
                    let delay = backoff_delay(retries);
                    tracing::warn!("Server answered {}. Backing off for {}ms", status, delay.as_millis());
                    tokio::time::sleep(delay).await;
                    continue;
                }
                return Err(if status == 429 {
                    TransportError::RateLimitExceeded
                } else {
                    TransportError::ServerOverloaded
                });
            }

            let headers = response
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_string(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect();
            let body = response.bytes().await?.to_vec();
            tracing::debug!("{} {} -> {} ({} bytes)", method, url, status, body.len());
            return Ok(RawResponse {
                status,
                headers,
                body,
            });
        }
    }
}

fn backoff_delay(retries: u32) -> Duration {
    Duration::from_millis(limits::RETRY_BASE_DELAY_MS * 2_u64.pow(retries))
}

async fn build_multipart(parts: &[Part]) -> TransportResult<multipart::Form> {
    let mut form = multipart::Form::new();
    for part in parts {
        form = match part {
            Part::Text { name, value } => form.text(name.clone(), value.clone()),
            Part::File { name, path } => {
                let bytes = tokio::fs::read(path).await.map_err(|source| TransportError::Body {
                    path: path.clone(),
                    source,
                })?;
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                form.part(name.clone(), multipart::Part::bytes(bytes).file_name(file_name))
            }
        };
    }
    Ok(form)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &OutgoingRequest) -> TransportResult<RawResponse> {
        check_address(request.url())?;

        let mut url = request.url().clone();
        let mut method = request.method();
        // Set-Cookie headers of intermediate hops, most recent first
        let mut carried: Vec<(String, String)> = Vec::new();

        for _ in 0..=http::MAX_REDIRECTS {
            let mut response = self.send_with_retry(request, &url, method).await?;

            let next = match (request.follows_redirects(), response.is_redirect()) {
                (true, true) => response.location().and_then(|loc| url.join(loc).ok()),
                _ => None,
            };
            let Some(next) = next else {
                response.headers.extend(carried);
                return Ok(response);
            };

            let mut hop_cookies: Vec<(String, String)> = response
                .headers
                .into_iter()
                .filter(|(k, _)| k.eq_ignore_ascii_case(http::HEADER_SET_COOKIE))
                .collect();
            hop_cookies.append(&mut carried);
            carried = hop_cookies;

            if response.status != 307 && response.status != 308 {
                method = Method::Get;
            }
            tracing::debug!("Following redirect to {}", next);
            url = next;
        }

        Err(TransportError::TooManyRedirects {
            limit: http::MAX_REDIRECTS,
        })
    }
}
