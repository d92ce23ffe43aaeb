pub mod progress;
pub mod transport;

pub use progress::FetchProgress;
pub use transport::{ApiResponse, HttpTransport, Transport, TransportError};

use crate::{FieldfolioError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Submissions fetched per page request.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Extra attempts after a transient network failure (timeout, connection
/// reset). Deliberately an explicit, overridable constant rather than
/// inferred behavior.
pub const DEFAULT_TRANSIENT_RETRIES: usize = 1;

/// An authenticated, time-bounded credential for subsequent API calls.
/// Lives for one CLI invocation; replaced when the server answers 401.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub expires_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    pub id: u64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Form {
    #[serde(rename = "xmlFormId")]
    pub xml_form_id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// One form-response record: a mapping from field name to JSON value,
/// immutable once fetched. Unknown server fields ride along untouched.
#[derive(Debug, Clone, serde::Serialize, Deserialize)]
pub struct Submission(serde_json::Map<String, serde_json::Value>);

impl Submission {
    pub fn new(fields: serde_json::Map<String, serde_json::Value>) -> Self {
        Submission(fields)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.0.iter()
    }

    /// The server-assigned submission identity, under whichever key the
    /// server used for it.
    pub fn instance_id(&self) -> Option<&str> {
        ["__id", "instanceId"]
            .iter()
            .find_map(|key| self.0.get(*key))
            .and_then(|v| v.as_str())
    }
}

/// Cache key for fetched submissions. The base URL is fixed per client
/// instance, so together with it this identifies (server, project, form).
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct SubmissionKey {
    pub project: u64,
    pub form: String,
}

/// Process-lived response cache; no eviction (one dataset per run).
#[derive(Default)]
struct ResponseCache {
    projects: Option<Vec<Project>>,
    forms: HashMap<u64, Vec<Form>>,
    submissions: HashMap<SubmissionKey, Vec<Submission>>,
}

/// Client for an ODK-Central-style REST API. Network I/O only; never
/// touches the filesystem.
pub struct OdkClient<T: Transport> {
    transport: T,
    base_url: String,
    email: String,
    password: String,
    session: Option<Session>,
    transient_retries: usize,
    cache: ResponseCache,
}

impl OdkClient<HttpTransport> {
    pub fn connect(base_url: &str, email: &str, password: &str) -> Result<Self> {
        url::Url::parse(base_url)
            .map_err(|e| FieldfolioError::Config(format!("invalid base URL '{}': {}", base_url, e)))?;
        let transport =
            HttpTransport::new().map_err(|e| FieldfolioError::Network(e.to_string()))?;
        Ok(Self::with_transport(transport, base_url, email, password))
    }
}

impl<T: Transport> OdkClient<T> {
    pub fn with_transport(transport: T, base_url: &str, email: &str, password: &str) -> Self {
        OdkClient {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            email: email.to_string(),
            password: password.to_string(),
            session: None,
            transient_retries: DEFAULT_TRANSIENT_RETRIES,
            cache: ResponseCache::default(),
        }
    }

    pub fn transient_retries(mut self, retries: usize) -> Self {
        self.transient_retries = retries;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Log in and store the session token. Rejected credentials surface
    /// as an authentication error; transport failures follow the
    /// single-retry policy.
    pub fn authenticate(&mut self) -> Result<()> {
        let url = format!("{}/v1/sessions", self.base_url);
        let body = serde_json::json!({
            "email": self.email,
            "password": self.password,
        });

        let response = self.post_with_retry(&url, &body)?;
        if response.status == 401 || response.status == 403 {
            return Err(FieldfolioError::Auth(format!(
                "credentials rejected by {}",
                self.base_url
            )));
        }
        if !response.is_success() {
            return Err(FieldfolioError::Network(format!(
                "HTTP {} during login to {}",
                response.status, self.base_url
            )));
        }

        // Unknown response fields are tolerated; only the token matters.
        #[derive(Deserialize)]
        struct SessionBody {
            token: String,
            #[serde(rename = "expiresAt", default)]
            expires_at: Option<String>,
        }
        let parsed: SessionBody = serde_json::from_str(&response.body)
            .map_err(|e| FieldfolioError::Parse(format!("malformed login response: {}", e)))?;

        debug!("authenticated as {}", self.email);
        self.session = Some(Session {
            token: parsed.token,
            expires_at: parsed.expires_at,
        });
        Ok(())
    }

    pub fn list_projects(&mut self) -> Result<Vec<Project>> {
        if let Some(projects) = &self.cache.projects {
            debug!("using cached project list");
            return Ok(projects.clone());
        }

        let url = format!("{}/v1/projects", self.base_url);
        let response = self.authed_get(&url)?;
        let projects: Vec<Project> = serde_json::from_str(&response.body)
            .map_err(|e| FieldfolioError::Parse(format!("malformed project list: {}", e)))?;

        self.cache.projects = Some(projects.clone());
        Ok(projects)
    }

    pub fn list_forms(&mut self, project_id: u64) -> Result<Vec<Form>> {
        if let Some(forms) = self.cache.forms.get(&project_id) {
            debug!("using cached form list for project {}", project_id);
            return Ok(forms.clone());
        }

        let url = format!("{}/v1/projects/{}/forms", self.base_url, project_id);
        let response = self.authed_get(&url)?;
        let forms: Vec<Form> = serde_json::from_str(&response.body)
            .map_err(|e| FieldfolioError::Parse(format!("malformed form list: {}", e)))?;

        self.cache.forms.insert(project_id, forms.clone());
        Ok(forms)
    }

    /// Fetch every submission for a form, paginating transparently.
    /// Repeated calls for the same (project, form) return the cached
    /// record set without touching the network.
    pub fn fetch_submissions(
        &mut self,
        project_id: u64,
        form_id: &str,
        page_size: usize,
        progress: &mut FetchProgress,
    ) -> Result<Vec<Submission>> {
        let key = SubmissionKey {
            project: project_id,
            form: form_id.to_string(),
        };
        if let Some(cached) = self.cache.submissions.get(&key) {
            debug!("using cached submissions for {:?}", key);
            progress.finish(&format!("{} records (cached)", cached.len()));
            return Ok(cached.clone());
        }

        let page_size = page_size.max(1);
        let mut all = Vec::new();
        let mut page = 1usize;
        loop {
            let url = format!(
                "{}/v1/projects/{}/forms/{}/submissions?page={}&pageSize={}",
                self.base_url, project_id, form_id, page, page_size
            );
            let response = self.authed_get(&url)?;
            let batch = parse_submission_page(&response.body)?;
            let batch_len = batch.len();
            all.extend(batch);
            progress.page_fetched(page, all.len());

            if batch_len < page_size {
                break;
            }
            page += 1;
        }

        progress.finish(&format!("{} records in {} pages", all.len(), page));
        self.cache.submissions.insert(key, all.clone());
        Ok(all)
    }

    /// GET with the session token; on a 401 the session is refreshed once
    /// and the request repeated. A second consecutive 401 surfaces as an
    /// authentication error (via the rejected re-login or the repeated
    /// response).
    fn authed_get(&mut self, url: &str) -> Result<ApiResponse> {
        if self.session.is_none() {
            self.authenticate()?;
        }

        let mut refreshed = false;
        loop {
            let token = self.session.as_ref().map(|s| s.token.clone());
            let response = self.get_with_retry(url, token.as_deref())?;
            match response.status {
                401 if !refreshed => {
                    warn!("session expired, re-authenticating");
                    self.session = None;
                    self.authenticate()?;
                    refreshed = true;
                }
                401 => {
                    return Err(FieldfolioError::Auth(
                        "session rejected again after re-authentication".to_string(),
                    ))
                }
                404 => {
                    return Err(FieldfolioError::NotFound(format!(
                        "server returned 404 for {}",
                        url
                    )))
                }
                _ if response.is_success() => return Ok(response),
                status => {
                    return Err(FieldfolioError::Network(format!(
                        "HTTP {} from {}",
                        status, url
                    )))
                }
            }
        }
    }

    fn get_with_retry(&self, url: &str, token: Option<&str>) -> Result<ApiResponse> {
        let mut attempts = 0usize;
        loop {
            match self.transport.get(url, token) {
                Ok(response) => return Ok(response),
                Err(TransportError::Transient(msg)) if attempts < self.transient_retries => {
                    attempts += 1;
                    warn!("transient network error ({}), retrying", msg);
                }
                Err(e) => return Err(FieldfolioError::Network(e.to_string())),
            }
        }
    }

    fn post_with_retry(&self, url: &str, body: &serde_json::Value) -> Result<ApiResponse> {
        let mut attempts = 0usize;
        loop {
            match self.transport.post_json(url, body) {
                Ok(response) => return Ok(response),
                Err(TransportError::Transient(msg)) if attempts < self.transient_retries => {
                    attempts += 1;
                    warn!("transient network error ({}), retrying", msg);
                }
                Err(e) => return Err(FieldfolioError::Network(e.to_string())),
            }
        }
    }
}

/// A submissions page is either a bare JSON array or an OData-style
/// envelope with a `value` array; both are accepted.
fn parse_submission_page(body: &str) -> Result<Vec<Submission>> {
    let json: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| FieldfolioError::Parse(format!("malformed submissions page: {}", e)))?;

    let items = match json {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => match map.remove("value") {
            Some(serde_json::Value::Array(items)) => items,
            _ => {
                return Err(FieldfolioError::Parse(
                    "submissions page is neither an array nor a value envelope".to_string(),
                ))
            }
        },
        _ => {
            return Err(FieldfolioError::Parse(
                "submissions page is neither an array nor a value envelope".to_string(),
            ))
        }
    };

    items
        .into_iter()
        .map(|item| match item {
            serde_json::Value::Object(fields) => Ok(Submission::new(fields)),
            other => Err(FieldfolioError::Parse(format!(
                "submission record is not an object: {}",
                other
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Scripted transport: pops one outcome per request and records the
    /// request line for later assertions.
    #[derive(Default)]
    struct FakeTransport {
        script: RefCell<VecDeque<std::result::Result<ApiResponse, TransportError>>>,
        log: RefCell<Vec<String>>,
    }

    impl FakeTransport {
        fn push_ok(&self, status: u16, body: &str) {
            self.script.borrow_mut().push_back(Ok(ApiResponse {
                status,
                body: body.to_string(),
            }));
        }

        fn push_transient(&self, msg: &str) {
            self.script
                .borrow_mut()
                .push_back(Err(TransportError::Transient(msg.to_string())));
        }

        fn log(&self) -> Vec<String> {
            self.log.borrow().clone()
        }

        fn requests_matching(&self, needle: &str) -> usize {
            self.log.borrow().iter().filter(|l| l.contains(needle)).count()
        }
    }

    impl Transport for FakeTransport {
        fn get(
            &self,
            url: &str,
            token: Option<&str>,
        ) -> std::result::Result<ApiResponse, TransportError> {
            self.log
                .borrow_mut()
                .push(format!("GET {} token={}", url, token.unwrap_or("-")));
            self.script
                .borrow_mut()
                .pop_front()
                .expect("unexpected GET request")
        }

        fn post_json(
            &self,
            url: &str,
            _body: &serde_json::Value,
        ) -> std::result::Result<ApiResponse, TransportError> {
            self.log.borrow_mut().push(format!("POST {}", url));
            self.script
                .borrow_mut()
                .pop_front()
                .expect("unexpected POST request")
        }
    }

    fn client(transport: FakeTransport) -> OdkClient<FakeTransport> {
        OdkClient::with_transport(transport, "https://central.example.org/", "a@b.c", "secret")
    }

    fn page_body(ids: std::ops::Range<usize>) -> String {
        let items: Vec<String> = ids
            .map(|i| format!(r#"{{"__id":"uuid:{}","status":"ok"}}"#, i))
            .collect();
        format!("[{}]", items.join(","))
    }

    #[test]
    fn test_rejected_credentials_surface_auth_error() {
        let transport = FakeTransport::default();
        transport.push_ok(401, r#"{"message":"bad credentials"}"#);
        let mut client = client(transport);

        assert!(matches!(
            client.authenticate(),
            Err(FieldfolioError::Auth(_))
        ));
    }

    #[test]
    fn test_login_tolerates_unknown_fields_and_strips_slash() {
        let transport = FakeTransport::default();
        transport.push_ok(
            200,
            r#"{"token":"tok-1","expiresAt":"2026-01-01T00:00:00Z","csrf":"ignored"}"#,
        );
        let mut client = client(transport);

        client.authenticate().unwrap();
        assert_eq!(client.base_url(), "https://central.example.org");
        assert_eq!(client.session().unwrap().token, "tok-1");
    }

    #[test]
    fn test_list_projects_is_cached_per_process() {
        let transport = FakeTransport::default();
        transport.push_ok(200, r#"{"token":"tok-1"}"#);
        transport.push_ok(200, r#"[{"id":1,"name":"Survey A","extra":true}]"#);
        let mut client = client(transport);

        let first = client.list_projects().unwrap();
        let second = client.list_projects().unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].id, second[0].id);
        // One GET total: the second call was served from the cache.
        assert_eq!(client.transport.requests_matching("GET"), 1);
    }

    #[test]
    fn test_unknown_project_maps_404_to_not_found() {
        let transport = FakeTransport::default();
        transport.push_ok(200, r#"{"token":"tok-1"}"#);
        transport.push_ok(404, "");
        let mut client = client(transport);

        assert!(matches!(
            client.list_forms(99),
            Err(FieldfolioError::NotFound(_))
        ));
        // 4xx responses are not retried.
        assert_eq!(client.transport.requests_matching("GET"), 1);
    }

    #[test]
    fn test_pagination_stops_on_short_page() {
        let transport = FakeTransport::default();
        transport.push_ok(200, r#"{"token":"tok-1"}"#);
        transport.push_ok(200, &page_body(0..3));
        transport.push_ok(200, &page_body(3..6));
        transport.push_ok(200, &page_body(6..7));
        let mut client = client(transport);

        let subs = client
            .fetch_submissions(1, "household", 3, &mut FetchProgress::hidden())
            .unwrap();
        assert_eq!(subs.len(), 7);
        assert_eq!(subs[0].instance_id(), Some("uuid:0"));
        assert_eq!(client.transport.requests_matching("page="), 3);
    }

    #[test]
    fn test_submissions_cache_hits_skip_network() {
        let transport = FakeTransport::default();
        transport.push_ok(200, r#"{"token":"tok-1"}"#);
        transport.push_ok(200, &page_body(0..2));
        let mut client = client(transport);

        let first = client
            .fetch_submissions(1, "f", 10, &mut FetchProgress::hidden())
            .unwrap();
        let second = client
            .fetch_submissions(1, "f", 10, &mut FetchProgress::hidden())
            .unwrap();
        assert_eq!(first.len(), second.len());
        assert_eq!(client.transport.requests_matching("submissions"), 1);
    }

    #[test]
    fn test_mid_pagination_401_reauthenticates_once_and_resumes() {
        let transport = FakeTransport::default();
        transport.push_ok(200, r#"{"token":"tok-1"}"#);
        transport.push_ok(200, &page_body(0..2));
        // Second page hits an expired session, then a fresh login succeeds
        // and the same page is retried with the new token.
        transport.push_ok(401, "");
        transport.push_ok(200, r#"{"token":"tok-2"}"#);
        transport.push_ok(200, &page_body(2..3));
        let mut client = client(transport);

        let subs = client
            .fetch_submissions(1, "f", 2, &mut FetchProgress::hidden())
            .unwrap();
        assert_eq!(subs.len(), 3);

        let log = client.transport.log();
        let logins = log.iter().filter(|l| l.contains("POST")).count();
        assert_eq!(logins, 2);
        // The retried page request carries the refreshed token.
        assert!(log.last().unwrap().contains("token=tok-2"));
    }

    #[test]
    fn test_second_consecutive_401_surfaces_auth_error() {
        let transport = FakeTransport::default();
        transport.push_ok(200, r#"{"token":"tok-1"}"#);
        transport.push_ok(401, "");
        transport.push_ok(200, r#"{"token":"tok-2"}"#);
        transport.push_ok(401, "");
        let mut client = client(transport);

        assert!(matches!(
            client.fetch_submissions(1, "f", 2, &mut FetchProgress::hidden()),
            Err(FieldfolioError::Auth(_))
        ));
    }

    #[test]
    fn test_transient_failure_is_retried_once() {
        let transport = FakeTransport::default();
        transport.push_ok(200, r#"{"token":"tok-1"}"#);
        transport.push_transient("connection reset");
        transport.push_ok(200, r#"[]"#);
        let mut client = client(transport);

        let projects_url_hits = {
            client.list_projects().unwrap();
            client.transport.requests_matching("GET")
        };
        assert_eq!(projects_url_hits, 2);
    }

    #[test]
    fn test_transient_failure_after_retry_surfaces_network_error() {
        let transport = FakeTransport::default();
        transport.push_ok(200, r#"{"token":"tok-1"}"#);
        transport.push_transient("timeout");
        transport.push_transient("timeout");
        let mut client = client(transport);

        assert!(matches!(
            client.list_projects(),
            Err(FieldfolioError::Network(_))
        ));
    }

    #[test]
    fn test_odata_envelope_is_accepted() {
        let body = r#"{"value":[{"__id":"uuid:9"}],"@odata.count":1}"#;
        let subs = parse_submission_page(body).unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].instance_id(), Some("uuid:9"));
    }
}
