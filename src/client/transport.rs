use std::time::Duration;

/// Per-request timeout for the production transport.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Raw HTTP response as the client sees it: status plus body text.
/// Higher-level status handling (401 re-auth, 404 mapping) lives in the
/// client, not here.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport-level failure. Transient failures (timeout, connection
/// reset) are eligible for the client's single-retry policy; fatal ones
/// are surfaced immediately.
#[derive(Debug)]
pub enum TransportError {
    Transient(String),
    Fatal(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Transient(msg) => write!(f, "{}", msg),
            TransportError::Fatal(msg) => write!(f, "{}", msg),
        }
    }
}

/// Seam between the client logic and the wire. The retry, re-auth and
/// cache behavior is tested against an in-memory implementation.
pub trait Transport {
    fn get(&self, url: &str, token: Option<&str>) -> Result<ApiResponse, TransportError>;
    fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<ApiResponse, TransportError>;
}

/// Production transport over reqwest's blocking client with fixed
/// request and connect timeouts.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("fieldfolio/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| TransportError::Fatal(e.to_string()))?;
        Ok(HttpTransport { client })
    }

    fn classify(e: reqwest::Error) -> TransportError {
        if e.is_timeout() || e.is_connect() {
            TransportError::Transient(e.to_string())
        } else {
            TransportError::Fatal(e.to_string())
        }
    }

    fn finish(
        response: Result<reqwest::blocking::Response, reqwest::Error>,
    ) -> Result<ApiResponse, TransportError> {
        let response = response.map_err(Self::classify)?;
        let status = response.status().as_u16();
        let body = response.text().map_err(Self::classify)?;
        Ok(ApiResponse { status, body })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, token: Option<&str>) -> Result<ApiResponse, TransportError> {
        let mut request = self.client.get(url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        Self::finish(request.send())
    }

    fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<ApiResponse, TransportError> {
        Self::finish(self.client.post(url).json(body).send())
    }
}
