//! HTTP client for the auth API with transparent access-token recovery.
//!
//! Flow Overview:
//! - `send` decorates the request with the in-memory access token and performs
//!   one network call.
//! - A 401 enters `recover` unless the request targets a public, credential or
//!   refresh endpoint: the request is marked as a retry, joins (or opens) the
//!   current refresh cycle, and is replayed once with the new token.
//! - A failed exchange, or a missing refresh token, ends the session: durable
//!   keys are cleared and a single `Redirect::Login` is emitted.
//!
//! Transport errors are propagated unchanged; nothing here retries more than
//! the single refresh-and-replay cycle.

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::http::{
    interceptor::RequestInterceptor,
    refresh::{RefreshCoordinator, RefreshPhase, Ticket},
    request::ApiRequest,
};
use crate::navigation::{Navigator, Redirect};
use crate::session::SessionStore;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Raw successful response.
#[derive(Clone, Debug)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    /// Decodes the body as JSON; an empty body decodes as `null`.
    /// # Errors
    /// Returns `Error::Parse` if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        let body = self.body.trim();
        let body = if body.is_empty() { "null" } else { body };
        Ok(serde_json::from_str(body)?)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshTokenRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshTokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

pub struct ApiClient {
    http: Client,
    base_url: String,
    refresh_path: String,
    session: Arc<SessionStore>,
    interceptor: RequestInterceptor,
    coordinator: RefreshCoordinator,
    navigator: Navigator,
}

impl ApiClient {
    /// # Errors
    /// Returns `Error::Config` if the base URL or an endpoint pattern is
    /// invalid, or the HTTP client cannot be built.
    pub fn new(
        config: &ClientConfig,
        session: Arc<SessionStore>,
        navigator: Navigator,
    ) -> Result<Self> {
        let base_url = config.validated_base_url()?;
        let interceptor = RequestInterceptor::new(&config.public_endpoints)?
            .with_credential_endpoints(&config.credential_endpoints)?;
        let http = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()
            .map_err(|err| Error::Config(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            http,
            base_url,
            refresh_path: config.refresh_path.clone(),
            session,
            interceptor,
            coordinator: RefreshCoordinator::new(),
            navigator,
        })
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    #[must_use]
    pub fn refresh_phase(&self) -> RefreshPhase {
        self.coordinator.phase()
    }

    /// Number of refresh exchanges started by this client.
    #[must_use]
    pub fn refresh_cycles(&self) -> u64 {
        self.coordinator.cycles()
    }

    /// Requests parked on the refresh currently in flight.
    #[must_use]
    pub fn waiting_requests(&self) -> usize {
        self.coordinator.waiting()
    }

    /// Sends a request, recovering once from an expired access token.
    /// # Errors
    /// Returns the transport or HTTP error of the final attempt, or
    /// `Error::RefreshFailed` when this request waited on a failed refresh.
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let request = self.interceptor.decorate(request, &self.session);

        match self.dispatch(&request).await {
            Err(err) if err.is_auth_failure() && self.is_recoverable(&request) => {
                self.recover(request, err).await
            }
            result => result,
        }
    }

    /// # Errors
    /// See [`ApiClient::send`]; also fails if the body does not decode as `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(ApiRequest::get(path)).await?.json()
    }

    /// # Errors
    /// See [`ApiClient::send`]; also fails if the body cannot be encoded or the
    /// response does not decode as `T`.
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.send(ApiRequest::post(path).json(body)?).await?.json()
    }

    /// Posts without a body and decodes the JSON response.
    /// # Errors
    /// See [`ApiClient::send`].
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(ApiRequest::post(path)).await?.json()
    }

    fn is_refresh_endpoint(&self, path: &str) -> bool {
        let path = path.split('?').next().unwrap_or_default();
        path.trim_matches('/') == self.refresh_path.trim_matches('/')
    }

    /// Public, credential and refresh routes surface their 401s unchanged.
    fn is_recoverable(&self, request: &ApiRequest) -> bool {
        !self.is_refresh_endpoint(&request.path)
            && !self.interceptor.is_public(&request.path)
            && !self.interceptor.is_credential_exchange(&request.path)
    }

    async fn recover(&self, request: ApiRequest, failure: Error) -> Result<ApiResponse> {
        if request.is_retry() {
            debug!("replayed request rejected again, not refreshing");
            return Err(failure);
        }

        let Some(refresh_token) = self.session.current_refresh_token() else {
            debug!("no refresh token stored, ending session");
            self.end_session();
            return Err(failure);
        };

        let request = request.into_retry();

        // A cycle finished between sending and failing: reuse its token.
        let current = self.session.current_access_token();
        if current.is_some() && !request.carries(current.as_ref()) {
            debug!("access token changed while request was in flight");
            return self.replay(request, current).await;
        }

        match self.coordinator.join() {
            Ticket::Waiter(waiter) => match waiter.wait().await {
                Ok(token) => self.replay(request, Some(token)).await,
                Err(reason) => Err(Error::RefreshFailed(reason)),
            },
            Ticket::Leader(cycle) => match self.exchange(&refresh_token).await {
                Ok(token) => {
                    cycle.settle(Ok(token.clone()));
                    self.replay(request, Some(token)).await
                }
                Err(err) => {
                    warn!("refresh exchange failed: {}", err);
                    self.end_session();
                    cycle.settle(Err(err.to_string()));
                    Err(failure)
                }
            },
        }
    }

    /// Trades the refresh token for a new access token and stores it.
    #[instrument(skip_all)]
    async fn exchange(&self, refresh_token: &SecretString) -> Result<SecretString> {
        let request = ApiRequest::post(self.refresh_path.as_str())
            .json(&RefreshTokenRequest {
                refresh_token: refresh_token.expose_secret(),
            })?
            .with_bearer(Some(refresh_token.clone()));

        let response: RefreshTokenResponse = self.dispatch(&request).await?.json()?;

        let access_token = response
            .access_token
            .filter(|token| !token.is_empty())
            .map(SecretString::from)
            .ok_or_else(|| Error::Validation("refresh response is missing accessToken".into()))?;
        let rotated = response
            .refresh_token
            .filter(|token| !token.is_empty())
            .map(SecretString::from);

        if let Err(err) = self
            .session
            .set_session(Some(access_token.clone()), rotated)
        {
            warn!("failed to persist rotated refresh token: {}", err);
        }

        debug!("access token refreshed");

        Ok(access_token)
    }

    async fn replay(
        &self,
        request: ApiRequest,
        token: Option<SecretString>,
    ) -> Result<ApiResponse> {
        let request = request.with_bearer(token);
        debug!("replaying request with refreshed token");
        self.dispatch(&request).await
    }

    fn end_session(&self) {
        if let Err(err) = self.session.clear_session() {
            warn!("failed to clear session: {}", err);
        }
        self.navigator.redirect(Redirect::Login);
    }

    /// Performs exactly one network call for the request as decorated.
    async fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let url = build_url(&self.base_url, &request.path);
        let mut builder = self.http.request(request.method.clone(), url.as_str());

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(token) = request.bearer() {
            builder = builder.bearer_auth(token.expose_secret());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            Ok(ApiResponse {
                status: status.as_u16(),
                body,
            })
        } else {
            debug!(status = status.as_u16(), "request rejected");
            Err(Error::http(status.as_u16(), &body))
        }
    }
}

/// Joins the API base URL and a request path.
fn build_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    let path = path.trim();

    if base.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", base, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::storage::MemoryStorage;
    use serde_json::json;
    use std::net::TcpListener;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    fn client_for(server: &MockServer) -> (ApiClient, crate::navigation::NavigationEvents) {
        let (navigator, events) = Navigator::channel();
        let session = Arc::new(SessionStore::new(MemoryStorage::new()));
        let config = ClientConfig::new(&format!("{}/api", server.uri()));
        (ApiClient::new(&config, session, navigator).unwrap(), events)
    }

    #[test]
    fn build_url_joins_with_single_slash() {
        assert_eq!(
            build_url("http://localhost:8080/api/", "/user/profile"),
            "http://localhost:8080/api/user/profile"
        );
        assert_eq!(build_url("", "/user/profile"), "/user/profile");
    }

    #[test]
    fn empty_body_decodes_as_null() {
        let response = ApiResponse {
            status: 204,
            body: String::new(),
        };
        assert_eq!(response.json::<Option<String>>().unwrap(), None);
    }

    #[tokio::test]
    async fn refresh_endpoint_is_never_recovered() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/refresh-token"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let (client, mut events) = client_for(&server);
        client
            .session()
            .set_session(Some(secret("a1")), Some(secret("r1")))
            .unwrap();

        let err = client
            .send(ApiRequest::post("/auth/refresh-token"))
            .await
            .unwrap_err();

        assert!(err.is_auth_failure());
        assert_eq!(client.refresh_cycles(), 0);
        assert_eq!(events.try_next(), None);
    }

    #[tokio::test]
    async fn refresh_endpoint_without_leading_slash_is_never_recovered() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/refresh-token"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let (client, mut events) = client_for(&server);
        client
            .session()
            .set_session(Some(secret("a1")), Some(secret("r1")))
            .unwrap();

        for route in ["auth/refresh-token", "auth/refresh-token/"] {
            assert!(client.is_refresh_endpoint(route), "{route}");
        }
        let err = client
            .send(ApiRequest::post("auth/refresh-token"))
            .await
            .unwrap_err();

        assert!(err.is_auth_failure());
        assert_eq!(client.refresh_cycles(), 0);
        assert!(client.session().current_refresh_token().is_some());
        assert_eq!(events.try_next(), None);
    }

    #[tokio::test]
    async fn rejected_credentials_do_not_touch_the_session() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Bad credentials"))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(path("/api/auth/refresh-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "accessToken": "a2" })))
            .expect(0)
            .mount(&server)
            .await;

        let (client, mut events) = client_for(&server);
        client
            .session()
            .set_session(Some(secret("a1")), Some(secret("r1")))
            .unwrap();

        let err = client
            .send(ApiRequest::post("/auth/login"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert_eq!(client.refresh_cycles(), 0);
        assert_eq!(
            client
                .session()
                .current_access_token()
                .map(|t| t.expose_secret().to_string()),
            Some("a1".to_string())
        );
        assert!(client.session().current_refresh_token().is_some());

        // without a refresh token the session is not ended either
        client.session().clear_session().unwrap();
        let err = client
            .send(ApiRequest::post("/auth/login"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert_eq!(events.try_next(), None);
    }

    #[tokio::test]
    async fn exchange_sends_refresh_token_and_stores_rotation() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/refresh-token"))
            .and(header("Authorization", "Bearer r1"))
            .and(body_json(json!({ "refreshToken": "r1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "accessToken": "a2",
                "refreshToken": "r2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (client, _events) = client_for(&server);
        client
            .session()
            .set_session(None, Some(secret("r1")))
            .unwrap();

        let token = client.exchange(&secret("r1")).await.unwrap();

        assert_eq!(token.expose_secret(), "a2");
        assert_eq!(
            client
                .session()
                .current_access_token()
                .map(|t| t.expose_secret().to_string()),
            Some("a2".to_string())
        );
        assert_eq!(
            client
                .session()
                .current_refresh_token()
                .map(|t| t.expose_secret().to_string()),
            Some("r2".to_string())
        );
    }

    #[tokio::test]
    async fn exchange_without_access_token_is_a_validation_error() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/refresh-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let (client, _events) = client_for(&server);
        let err = client.exchange(&secret("r1")).await.unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert!(client.session().current_access_token().is_none());
    }

    #[tokio::test]
    async fn non_auth_errors_are_propagated_without_refresh() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/user/profile"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let (client, _events) = client_for(&server);
        client
            .session()
            .set_session(Some(secret("a1")), Some(secret("r1")))
            .unwrap();

        let err = client
            .send(ApiRequest::get("/user/profile"))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(500));
        assert_eq!(client.refresh_cycles(), 0);
    }
}
