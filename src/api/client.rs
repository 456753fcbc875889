//! JIRA API client implementation.
//!
//! This module provides the main client for interacting with the JIRA REST API v3.
//! Requests run through the [`Pipeline`], which handles caching, timeouts,
//! rate limiting and error classification; this layer adds authentication,
//! endpoint URLs and the mapping into [`ApiError`].

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, error, info, instrument};

use super::auth::Auth;
use super::error::{ApiError, Result};
use super::types::{
    CreatedIssue, Issue, IssueAssignment, IssueCreate, IssueTransition, IssueTransitionRequest,
    IssueType, IssueUpdate, Project, ProjectVersion, ProjectVersionCreate, TransitionsResponse,
    User,
};
use crate::batch::{run_batch, BatchOptions, BatchReport};
use crate::cache::MemoryCache;
use crate::config::JiraConfig;
use crate::limit::MaxInFlight;
use crate::pipeline::{Decoded, Pipeline, RequestSpec};
use crate::transport::ReqwestTransport;

/// Maximum number of requests kept in flight at once.
const DEFAULT_MAX_IN_FLIGHT: usize = 8;

/// How long cached GET responses stay fresh, in seconds.
const CACHE_TTL_SECS: u64 = 30;

/// The JIRA API client.
///
/// Provides async methods for interacting with the JIRA REST API v3.
/// Every request carries Basic authentication and is executed through the
/// request pipeline, so GET responses are cached briefly and the number of
/// concurrent requests against the instance stays bounded.
pub struct JiraClient {
    /// The request pipeline all calls go through.
    pipeline: Pipeline,
    /// The API root, `{base_url}/rest/api/3`.
    api_base: String,
    /// Authentication credentials.
    auth: Auth,
}

impl std::fmt::Debug for JiraClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraClient")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl JiraClient {
    /// Create a new JIRA client from a configuration.
    ///
    /// Builds the default pipeline: a reqwest transport, an in-memory
    /// response cache with a short TTL and a concurrency cap of
    /// [`DEFAULT_MAX_IN_FLIGHT`] requests.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Config`] if the configuration is invalid or the
    /// HTTP client cannot be built.
    pub fn new(config: &JiraConfig) -> Result<Self> {
        let transport =
            ReqwestTransport::new().map_err(|e| ApiError::Config(e.to_string()))?;

        let pipeline = Pipeline::builder(Arc::new(transport))
            .with_timeout(Duration::from_secs(config.timeout_secs))
            .with_cache(Arc::new(MemoryCache::with_ttl(Duration::from_secs(
                CACHE_TTL_SECS,
            ))))
            .with_rate_limiter(Arc::new(MaxInFlight::new(DEFAULT_MAX_IN_FLIGHT)))
            .build();

        Self::with_pipeline(config, pipeline)
    }

    /// Create a client over an explicit pipeline.
    ///
    /// Lets the caller choose the transport, cache, retry and rate-limiting
    /// behavior instead of the defaults used by [`JiraClient::new`].
    pub fn with_pipeline(config: &JiraConfig, pipeline: Pipeline) -> Result<Self> {
        config
            .validate()
            .map_err(|e| ApiError::Config(e.to_string()))?;

        let api_base = format!("{}/rest/api/3", config.base_url.trim_end_matches('/'));

        Ok(Self {
            pipeline,
            api_base,
            auth: Auth::new(&config.email, &config.api_token),
        })
    }

    /// Get the API root URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Validate the connection by calling the `/myself` endpoint.
    ///
    /// This verifies that:
    /// - The URL is reachable
    /// - The credentials are valid
    /// - The user has access to the JIRA instance
    #[instrument(skip(self))]
    pub async fn validate_connection(&self) -> Result<User> {
        debug!("Validating JIRA connection");

        let user = self.current_user().await.map_err(|e| {
            error!("Connection validation failed: {}", e);
            match e {
                ApiError::Unauthorized => e,
                other => ApiError::ConnectionFailed(other.to_string()),
            }
        })?;

        info!("Connected as user: {}", user.display_name);
        Ok(user)
    }

    /// Get the current authenticated user.
    ///
    /// Calls `GET /rest/api/3/myself` to retrieve user information.
    #[instrument(skip(self))]
    pub async fn current_user(&self) -> Result<User> {
        self.fetch("myself").await
    }

    /// Get a user by account ID.
    #[instrument(skip(self), fields(account_id = %account_id))]
    pub async fn get_user(&self, account_id: &str) -> Result<User> {
        let path = format!("user?accountId={}", urlencoding::encode(account_id));
        self.fetch(&path).await
    }

    /// Search for users matching a query string.
    ///
    /// The query matches against display names and email addresses.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn search_users(&self, query: &str, max_results: u32) -> Result<Vec<User>> {
        let path = format!(
            "user/search?query={}&maxResults={}",
            urlencoding::encode(query),
            max_results
        );
        self.fetch(&path).await
    }

    /// Find users assignable to issues in the given projects.
    ///
    /// # Arguments
    ///
    /// * `project_keys` - Keys of the projects the user must be assignable in
    /// * `query` - Optional query string to filter users
    /// * `max_results` - Maximum number of results to return
    #[instrument(skip(self, project_keys, query))]
    pub async fn find_assignable_users(
        &self,
        project_keys: &[String],
        query: Option<&str>,
        max_results: u32,
    ) -> Result<Vec<User>> {
        let mut path = format!(
            "user/assignable/multiProjectSearch?projectKeys={}&maxResults={}",
            urlencoding::encode(&project_keys.join(",")),
            max_results
        );
        if let Some(query) = query {
            path.push_str(&format!("&query={}", urlencoding::encode(query)));
        }
        self.fetch(&path).await
    }

    /// Create a new issue.
    ///
    /// JIRA answers the create call with only the new issue's coordinates,
    /// so the full issue is fetched in a second request.
    ///
    /// # Returns
    ///
    /// The created issue with all fields populated.
    #[instrument(skip(self, issue), fields(summary = %issue.summary))]
    pub async fn create_issue(&self, issue: &IssueCreate) -> Result<Issue> {
        debug!("Creating issue");

        let spec = RequestSpec::post(self.url("issue")).with_body(issue.to_jira_format());
        let created: CreatedIssue = self.send(spec).await?;

        let key = created.key.ok_or_else(|| {
            ApiError::InvalidResponse("issue created but no key returned".to_string())
        })?;

        info!("Created issue: {}", key);
        self.get_issue(&key).await
    }

    /// Get a single issue by key.
    ///
    /// # Arguments
    ///
    /// * `key` - The issue key (e.g., "PROJ-123")
    #[instrument(skip(self), fields(issue_key = %key))]
    pub async fn get_issue(&self, key: &str) -> Result<Issue> {
        debug!("Fetching issue");

        let path = format!("issue/{}", key);
        let issue: Issue = self.fetch(&path).await.map_err(|e| {
            if matches!(e, ApiError::NotFound(_)) {
                ApiError::NotFound(format!("Issue '{}' not found", key))
            } else {
                e
            }
        })?;

        Ok(issue)
    }

    /// Update fields on an existing issue.
    #[instrument(skip(self, update), fields(issue_key = %key))]
    pub async fn update_issue(&self, key: &str, update: &IssueUpdate) -> Result<()> {
        let spec = RequestSpec::put(self.url(&format!("issue/{}", key)))
            .with_body(update.to_jira_format());
        self.send_no_content(spec).await
    }

    /// Assign an issue to a user, or unassign it.
    #[instrument(skip(self, assignment), fields(issue_key = %key))]
    pub async fn assign_issue(&self, key: &str, assignment: &IssueAssignment) -> Result<()> {
        let spec = RequestSpec::put(self.url(&format!("issue/{}/assignee", key)))
            .with_body(assignment.to_jira_format());
        self.send_no_content(spec).await
    }

    /// Get the workflow transitions currently available on an issue.
    #[instrument(skip(self), fields(issue_key = %key))]
    pub async fn get_issue_transitions(&self, key: &str) -> Result<Vec<IssueTransition>> {
        let path = format!("issue/{}/transitions", key);
        let response: TransitionsResponse = self.fetch(&path).await?;
        Ok(response.transitions)
    }

    /// Move an issue through a workflow transition.
    #[instrument(skip(self, request), fields(issue_key = %key))]
    pub async fn transition_issue(
        &self,
        key: &str,
        request: &IssueTransitionRequest,
    ) -> Result<()> {
        let spec = RequestSpec::post(self.url(&format!("issue/{}/transitions", key)))
            .with_body(request.to_jira_format());
        self.send_no_content(spec).await
    }

    /// Get a project by key.
    #[instrument(skip(self), fields(project_key = %key))]
    pub async fn get_project(&self, key: &str) -> Result<Project> {
        let path = format!("project/{}", key);
        self.fetch(&path).await.map_err(|e| {
            if matches!(e, ApiError::NotFound(_)) {
                ApiError::NotFound(format!("Project '{}' not found", key))
            } else {
                e
            }
        })
    }

    /// Get the versions (releases) of a project.
    #[instrument(skip(self), fields(project_key = %key))]
    pub async fn get_project_versions(&self, key: &str) -> Result<Vec<ProjectVersion>> {
        let path = format!("project/{}/versions", key);
        self.fetch(&path).await
    }

    /// Create a new project version.
    #[instrument(skip(self, version), fields(version_name = %version.name))]
    pub async fn create_project_version(
        &self,
        version: &ProjectVersionCreate,
    ) -> Result<ProjectVersion> {
        let body = serde_json::to_value(version)
            .map_err(|e| ApiError::Validation(format!("could not serialize version: {}", e)))?;
        let spec = RequestSpec::post(self.url("version")).with_body(body);
        self.send(spec).await
    }

    /// Get all issue types visible to the authenticated user.
    #[instrument(skip(self))]
    pub async fn get_issue_types(&self) -> Result<Vec<IssueType>> {
        self.fetch("issuetype").await
    }

    /// Get the issue types available in a specific project.
    #[instrument(skip(self), fields(project_key = %key))]
    pub async fn get_project_issue_types(&self, key: &str) -> Result<Vec<IssueType>> {
        let project = self.get_project(key).await?;
        Ok(project.issue_types.unwrap_or_default())
    }

    /// Look up an issue type ID by its name within a project.
    ///
    /// The name comparison ignores case, so "bug" finds "Bug".
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] naming the available types when no
    /// issue type with that name exists in the project.
    #[instrument(skip(self), fields(project_key = %project_key, type_name = %name))]
    pub async fn get_issue_type_id_by_name(
        &self,
        project_key: &str,
        name: &str,
    ) -> Result<String> {
        let issue_types = self.get_project_issue_types(project_key).await?;

        for issue_type in &issue_types {
            if issue_type.name.eq_ignore_ascii_case(name) {
                return Ok(issue_type.id.clone());
            }
        }

        let available: Vec<&str> = issue_types.iter().map(|it| it.name.as_str()).collect();
        Err(ApiError::Validation(format!(
            "issue type '{}' not found in project '{}'; available types: {}",
            name,
            project_key,
            available.join(", ")
        )))
    }

    /// Create many issues with bounded concurrency.
    ///
    /// Issues are processed in groups of `options.concurrency`; each failed
    /// create is retried per the batch options before it counts as a
    /// failure. With `continue_on_error` set, the returned report carries
    /// every created issue and every failure with the index of the input it
    /// belongs to. Without it, the first failing issue's error is returned
    /// once its group has settled.
    #[instrument(skip(self, issues, options), fields(total = issues.len()))]
    pub async fn bulk_create_issues(
        &self,
        issues: Vec<IssueCreate>,
        options: &BatchOptions,
    ) -> Result<BatchReport<Issue, IssueCreate, ApiError>> {
        run_batch(issues, options, |issue| async move {
            self.create_issue(&issue).await
        })
        .await
        .map_err(|failure| failure.error)
    }

    /// Build the absolute URL for an API path.
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }

    /// Attach authentication and content negotiation headers.
    fn authorized(&self, spec: RequestSpec) -> RequestSpec {
        spec.with_header("Authorization", self.auth.header_value())
            .with_header("Accept", "application/json")
    }

    /// Run a request through the pipeline, mapping failures into [`ApiError`].
    async fn execute(&self, spec: RequestSpec) -> Result<Decoded> {
        self.pipeline
            .execute(self.authorized(spec))
            .await
            .map_err(ApiError::from_pipeline)
    }

    /// GET an API path and deserialize the JSON response.
    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let decoded = self.execute(RequestSpec::get(self.url(path))).await?;
        Self::parse(decoded)
    }

    /// Execute a prepared request and deserialize the JSON response.
    async fn send<T: DeserializeOwned>(&self, spec: RequestSpec) -> Result<T> {
        let decoded = self.execute(spec).await?;
        Self::parse(decoded)
    }

    /// Execute a prepared request, discarding the response body.
    ///
    /// For endpoints that answer `204 No Content`.
    async fn send_no_content(&self, spec: RequestSpec) -> Result<()> {
        self.execute(spec).await?;
        Ok(())
    }

    /// Deserialize a decoded response into the expected type.
    fn parse<T: DeserializeOwned>(decoded: Decoded) -> Result<T> {
        match decoded {
            Decoded::Json(value) => serde_json::from_value(value)
                .map_err(|e| ApiError::InvalidResponse(format!("failed to parse response: {}", e))),
            Decoded::Text(_) | Decoded::Bytes(_) => Err(ApiError::InvalidResponse(
                "expected a JSON payload".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str) -> JiraConfig {
        JiraConfig {
            base_url: base_url.to_string(),
            email: "user@example.com".to_string(),
            api_token: "secret-token".to_string(),
            timeout_secs: 5,
        }
    }

    fn client_for(server: &MockServer) -> JiraClient {
        let transport = ReqwestTransport::new().unwrap();
        let pipeline = Pipeline::new(Arc::new(transport));
        JiraClient::with_pipeline(&test_config(&server.uri()), pipeline).unwrap()
    }

    fn cached_client_for(server: &MockServer) -> JiraClient {
        let transport = ReqwestTransport::new().unwrap();
        let pipeline = Pipeline::builder(Arc::new(transport))
            .with_cache(Arc::new(MemoryCache::new()))
            .build();
        JiraClient::with_pipeline(&test_config(&server.uri()), pipeline).unwrap()
    }

    fn issue_json(key: &str) -> Value {
        json!({
            "id": "10001",
            "key": key,
            "self": format!("https://jira.example.com/rest/api/3/issue/{}", key),
            "fields": {
                "summary": "Fix the login flow",
                "issuetype": {"id": "10002", "name": "Bug"},
                "project": {"id": "10000", "key": "PROJ", "name": "Project"},
                "status": {"id": "3", "name": "In Progress"},
                "labels": ["auth"]
            }
        })
    }

    fn json_response(body: &Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(body.to_string(), "application/json")
    }

    #[tokio::test]
    async fn test_get_issue_sends_auth_and_parses() {
        let server = MockServer::start().await;
        let expected_auth = Auth::new("user@example.com", "secret-token");

        Mock::given(method("GET"))
            .and(path("/rest/api/3/issue/PROJ-1"))
            .and(header("Authorization", expected_auth.header_value()))
            .and(header("Accept", "application/json"))
            .respond_with(json_response(&issue_json("PROJ-1")))
            .expect(1)
            .mount(&server)
            .await;

        let issue = client_for(&server).get_issue("PROJ-1").await.unwrap();
        assert_eq!(issue.key, "PROJ-1");
        assert_eq!(issue.summary(), "Fix the login flow");
        assert_eq!(issue.status_name(), "In Progress");
    }

    #[tokio::test]
    async fn test_get_issue_not_found_names_the_key() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/api/3/issue/MISSING-1"))
            .respond_with(
                ResponseTemplate::new(404).set_body_raw(
                    json!({"errorMessages": ["Issue does not exist"]}).to_string(),
                    "application/json",
                ),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).get_issue("MISSING-1").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(ref msg) if msg.contains("MISSING-1")));
    }

    #[tokio::test]
    async fn test_unauthorized_response() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/api/3/myself"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client_for(&server).current_user().await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
    }

    #[tokio::test]
    async fn test_validation_error_joins_messages() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/api/3/issue"))
            .respond_with(
                ResponseTemplate::new(400).set_body_raw(
                    json!({
                        "errorMessages": ["Field 'summary' is required"],
                        "errors": {"priority": "Priority is invalid"}
                    })
                    .to_string(),
                    "application/json",
                ),
            )
            .mount(&server)
            .await;

        let issue = IssueCreate::new("10000", "10002", "Broken");
        let err = client_for(&server).create_issue(&issue).await.unwrap_err();

        match err {
            ApiError::Validation(msg) => {
                assert!(msg.contains("Field 'summary' is required"));
                assert!(msg.contains("priority: Priority is invalid"));
            }
            other => panic!("expected Validation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_validate_connection_reports_user() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/api/3/myself"))
            .respond_with(json_response(&json!({
                "accountId": "abc123",
                "displayName": "Jane Doe",
                "emailAddress": "jane@example.com"
            })))
            .mount(&server)
            .await;

        let user = client_for(&server).validate_connection().await.unwrap();
        assert_eq!(user.account_id, "abc123");
        assert_eq!(user.display_name, "Jane Doe");
    }

    #[tokio::test]
    async fn test_validate_connection_wraps_server_errors() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/api/3/myself"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client_for(&server).validate_connection().await.unwrap_err();
        assert!(matches!(err, ApiError::ConnectionFailed(_)));
    }

    #[tokio::test]
    async fn test_validate_connection_keeps_unauthorized() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/api/3/myself"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client_for(&server).validate_connection().await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
    }

    #[tokio::test]
    async fn test_get_user_encodes_account_id() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/api/3/user"))
            .and(query_param("accountId", "557058:user id"))
            .respond_with(json_response(&json!({
                "accountId": "557058:user id",
                "displayName": "Sam Smith"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let user = client_for(&server).get_user("557058:user id").await.unwrap();
        assert_eq!(user.display_name, "Sam Smith");
    }

    #[tokio::test]
    async fn test_find_assignable_users_builds_query() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/api/3/user/assignable/multiProjectSearch"))
            .and(query_param("projectKeys", "PROJ,OPS"))
            .and(query_param("query", "ali"))
            .and(query_param("maxResults", "50"))
            .respond_with(json_response(&json!([
                {"accountId": "u1", "displayName": "Alice"}
            ])))
            .mount(&server)
            .await;

        let users = client_for(&server)
            .find_assignable_users(
                &["PROJ".to_string(), "OPS".to_string()],
                Some("ali"),
                50,
            )
            .await
            .unwrap();

        assert_eq!(users.len(), 1);
        assert_eq!(users[0].display_name, "Alice");
    }

    #[tokio::test]
    async fn test_create_issue_fetches_full_issue() {
        let server = MockServer::start().await;
        let issue = IssueCreate::new("10000", "10002", "New bug").with_labels(vec![
            "auth".to_string(),
        ]);

        Mock::given(method("POST"))
            .and(path("/rest/api/3/issue"))
            .and(body_json(issue.to_jira_format()))
            .respond_with(json_response(&json!({
                "id": "10001",
                "key": "PROJ-7",
                "self": "https://jira.example.com/rest/api/3/issue/PROJ-7"
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/rest/api/3/issue/PROJ-7"))
            .respond_with(json_response(&issue_json("PROJ-7")))
            .expect(1)
            .mount(&server)
            .await;

        let created = client_for(&server).create_issue(&issue).await.unwrap();
        assert_eq!(created.key, "PROJ-7");
    }

    #[tokio::test]
    async fn test_create_issue_without_key_is_invalid() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/api/3/issue"))
            .respond_with(json_response(&json!({})))
            .mount(&server)
            .await;

        let issue = IssueCreate::new("10000", "10002", "New bug");
        let err = client_for(&server).create_issue(&issue).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(ref msg) if msg.contains("no key")));
    }

    #[tokio::test]
    async fn test_update_issue_sends_update_document() {
        let server = MockServer::start().await;
        let update = IssueUpdate::new()
            .with_summary("Clearer title")
            .add_label("regression");

        Mock::given(method("PUT"))
            .and(path("/rest/api/3/issue/PROJ-1"))
            .and(body_json(update.to_jira_format()))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .update_issue("PROJ-1", &update)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unassign_sends_null_account_id() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/rest/api/3/issue/PROJ-1/assignee"))
            .and(body_json(json!({"accountId": null})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .assign_issue("PROJ-1", &IssueAssignment::unassign())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_get_issue_transitions_unwraps_list() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/api/3/issue/PROJ-1/transitions"))
            .respond_with(json_response(&json!({
                "transitions": [
                    {"id": "21", "name": "Start Progress", "to": {"id": "3", "name": "In Progress"}},
                    {"id": "31", "name": "Done", "to": {"id": "5", "name": "Done"}}
                ]
            })))
            .mount(&server)
            .await;

        let transitions = client_for(&server)
            .get_issue_transitions("PROJ-1")
            .await
            .unwrap();

        assert_eq!(transitions.len(), 2);
        assert_eq!(transitions[0].name, "Start Progress");
        assert_eq!(transitions[1].to.name, "Done");
    }

    #[tokio::test]
    async fn test_transition_issue_posts_document() {
        let server = MockServer::start().await;
        let request = IssueTransitionRequest::new("31").with_resolution("Fixed");

        Mock::given(method("POST"))
            .and(path("/rest/api/3/issue/PROJ-1/transitions"))
            .and(body_json(request.to_jira_format()))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .transition_issue("PROJ-1", &request)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_get_project_versions() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/api/3/project/PROJ/versions"))
            .respond_with(json_response(&json!([
                {"id": "100", "name": "1.0", "released": true},
                {"id": "101", "name": "1.1"}
            ])))
            .mount(&server)
            .await;

        let versions = client_for(&server)
            .get_project_versions("PROJ")
            .await
            .unwrap();

        assert_eq!(versions.len(), 2);
        assert!(versions[0].released);
        assert!(!versions[1].released);
    }

    #[tokio::test]
    async fn test_create_project_version_sends_camel_case() {
        let server = MockServer::start().await;
        let version = ProjectVersionCreate::new("2.0", 10000).with_description("Big release");

        Mock::given(method("POST"))
            .and(path("/rest/api/3/version"))
            .and(body_json(json!({
                "name": "2.0",
                "projectId": 10000,
                "description": "Big release",
                "archived": false,
                "released": false
            })))
            .respond_with(json_response(&json!({
                "id": "102",
                "name": "2.0",
                "projectId": 10000
            })))
            .expect(1)
            .mount(&server)
            .await;

        let created = client_for(&server)
            .create_project_version(&version)
            .await
            .unwrap();

        assert_eq!(created.id, "102");
        assert_eq!(created.project_id, Some(10000));
    }

    #[tokio::test]
    async fn test_issue_type_lookup_ignores_case() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/api/3/project/PROJ"))
            .respond_with(json_response(&json!({
                "id": "10000",
                "key": "PROJ",
                "name": "Project",
                "issueTypes": [
                    {"id": "10002", "name": "Bug"},
                    {"id": "10003", "name": "Story"}
                ]
            })))
            .mount(&server)
            .await;

        let id = client_for(&server)
            .get_issue_type_id_by_name("PROJ", "bug")
            .await
            .unwrap();

        assert_eq!(id, "10002");
    }

    #[tokio::test]
    async fn test_issue_type_lookup_lists_available_on_miss() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/api/3/project/PROJ"))
            .respond_with(json_response(&json!({
                "id": "10000",
                "key": "PROJ",
                "name": "Project",
                "issueTypes": [
                    {"id": "10002", "name": "Bug"},
                    {"id": "10003", "name": "Story"}
                ]
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_issue_type_id_by_name("PROJ", "Epic")
            .await
            .unwrap_err();

        match err {
            ApiError::Validation(msg) => {
                assert!(msg.contains("'Epic' not found"));
                assert!(msg.contains("Bug, Story"));
            }
            other => panic!("expected Validation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_bulk_create_continues_past_failures() {
        let server = MockServer::start().await;
        let issues = vec![
            IssueCreate::new("10000", "10002", "First"),
            IssueCreate::new("10000", "10002", "Second"),
            IssueCreate::new("10000", "10002", "Third"),
        ];

        Mock::given(method("POST"))
            .and(path("/rest/api/3/issue"))
            .and(body_json(issues[0].to_jira_format()))
            .respond_with(json_response(&json!({"id": "1", "key": "BULK-1"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/api/3/issue"))
            .and(body_json(issues[1].to_jira_format()))
            .respond_with(
                ResponseTemplate::new(400).set_body_raw(
                    json!({"errorMessages": ["bad summary"]}).to_string(),
                    "application/json",
                ),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/api/3/issue"))
            .and(body_json(issues[2].to_jira_format()))
            .respond_with(json_response(&json!({"id": "3", "key": "BULK-3"})))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/rest/api/3/issue/BULK-1"))
            .respond_with(json_response(&issue_json("BULK-1")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/api/3/issue/BULK-3"))
            .respond_with(json_response(&issue_json("BULK-3")))
            .mount(&server)
            .await;

        let options = BatchOptions::default()
            .with_concurrency(2)
            .with_retries(0);
        let report = client_for(&server)
            .bulk_create_issues(issues, &options)
            .await
            .unwrap();

        assert_eq!(report.success_count(), 2);
        assert_eq!(report.failure_count(), 1);
        assert_eq!(report.total, 3);
        assert_eq!(report.failures[0].index, 1);
        assert!(matches!(report.failures[0].error, ApiError::Validation(_)));

        let keys: Vec<&str> = report.successes.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["BULK-1", "BULK-3"]);
    }

    #[tokio::test]
    async fn test_bulk_create_fail_fast_stops_after_group() {
        let server = MockServer::start().await;
        let issues = vec![
            IssueCreate::new("10000", "10002", "First"),
            IssueCreate::new("10000", "10002", "Second"),
            IssueCreate::new("10000", "10002", "Third"),
        ];

        Mock::given(method("POST"))
            .and(path("/rest/api/3/issue"))
            .and(body_json(issues[0].to_jira_format()))
            .respond_with(json_response(&json!({"id": "1", "key": "BULK-1"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/api/3/issue"))
            .and(body_json(issues[1].to_jira_format()))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;
        // Fail-fast must stop before the second group starts.
        Mock::given(method("POST"))
            .and(path("/rest/api/3/issue"))
            .and(body_json(issues[2].to_jira_format()))
            .respond_with(json_response(&json!({"id": "3", "key": "BULK-3"})))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/api/3/issue/BULK-1"))
            .respond_with(json_response(&issue_json("BULK-1")))
            .mount(&server)
            .await;

        let options = BatchOptions::default()
            .with_concurrency(2)
            .with_continue_on_error(false)
            .with_retries(0);
        let err = client_for(&server)
            .bulk_create_issues(issues, &options)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_cached_get_hits_server_once() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/api/3/issue/PROJ-1"))
            .respond_with(json_response(&issue_json("PROJ-1")))
            .expect(1)
            .mount(&server)
            .await;

        let client = cached_client_for(&server);
        let first = client.get_issue("PROJ-1").await.unwrap();
        let second = client.get_issue("PROJ-1").await.unwrap();
        assert_eq!(first.key, second.key);
    }

    #[tokio::test]
    async fn test_trailing_slash_in_base_url_is_normalized() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/api/3/myself"))
            .respond_with(json_response(&json!({
                "accountId": "abc123",
                "displayName": "Jane Doe"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = test_config(&server.uri());
        config.base_url.push('/');

        let transport = ReqwestTransport::new().unwrap();
        let client =
            JiraClient::with_pipeline(&config, Pipeline::new(Arc::new(transport))).unwrap();

        client.current_user().await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let config = JiraConfig {
            base_url: "https://jira.example.com".to_string(),
            email: "not-an-email".to_string(),
            api_token: "token".to_string(),
            timeout_secs: 5,
        };

        let err = JiraClient::new(&config).unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }
}
