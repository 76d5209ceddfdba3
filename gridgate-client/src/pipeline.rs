//! The authenticated request pipeline.
//!
//! Every request sent through [`RequestPipeline`] carries the stored access
//! token. When the server answers 401 the pipeline renews the credentials
//! once and resends the request; callers only see an error when renewal is
//! impossible or the renewed credentials are rejected too.
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use gridgate_client::{ApiRequest, CredentialStore, MemoryStore, RequestPipeline};
//!
//! let credentials = CredentialStore::new(MemoryStore::new());
//! let pipeline = RequestPipeline::new("https://admin.example.com/api/".parse()?, credentials);
//!
//! pipeline.login(&serde_json::json!({"username": "amy", "password": "hunter2"})).await?;
//! let projects: serde_json::Value = pipeline.get_json("projects/").await?;
//! # Ok(())
//! # }
//! ```

use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use url::Url;

use crate::credentials::CredentialStore;
use crate::error::PipelineError;
use crate::renewal::{RenewalCoordinator, RenewalOutcome, RenewalPolicy};
use crate::store::Secret;
use crate::token::{RenewalRequest, TokenEnvelope, TokenPair};

/// Default path of the login endpoint, relative to the base URL.
pub const DEFAULT_LOGIN_PATH: &str = "auth/login/";

/// Default path of the renewal endpoint, relative to the base URL.
pub const DEFAULT_REFRESH_PATH: &str = "auth/refresh/";

/// A request description that can be rebuilt for a retry.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,

    /// Path relative to the pipeline's base URL, or an absolute URL.
    pub path: String,

    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::POST, path).with_json(body)
    }

    pub fn put(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::PUT, path).with_json(body)
    }

    pub fn patch(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::PATCH, path).with_json(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Where a single call is in its authorization lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    /// First attempt; a 401 may still trigger renewal.
    Initial,

    /// Renewal has been attempted once; a further 401 is final.
    Retried,

    /// The call has failed for good.
    Terminal,
}

/// Per-call retry bookkeeping, kept outside the request itself.
#[derive(Debug)]
pub struct CallLifecycle {
    state: CallState,
}

impl CallLifecycle {
    pub fn new() -> Self {
        Self {
            state: CallState::Initial,
        }
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    /// Record a 401. Returns `true` if renewal may be attempted.
    pub fn on_unauthorized(&mut self) -> bool {
        match self.state {
            CallState::Initial => {
                self.state = CallState::Retried;
                true
            }
            CallState::Retried | CallState::Terminal => {
                self.state = CallState::Terminal;
                false
            }
        }
    }

    pub fn terminate(&mut self) {
        self.state = CallState::Terminal;
    }
}

impl Default for CallLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Sends requests with the stored access token and renews it on 401.
///
/// Share one pipeline per credential store (wrap it in an `Arc`); renewal
/// coordination only spans calls made through the same pipeline.
pub struct RequestPipeline {
    http: reqwest::Client,
    base_url: Url,
    login_path: String,
    refresh_path: String,
    credentials: CredentialStore,
    renewal: RenewalCoordinator,
}

impl RequestPipeline {
    /// Create a pipeline with default endpoints and the shared renewal policy.
    pub fn new(base_url: Url, credentials: CredentialStore) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: with_trailing_slash(base_url),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            credentials,
            renewal: RenewalCoordinator::default(),
        }
    }

    /// Use a preconfigured HTTP client (timeouts, proxies, TLS).
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    pub fn with_renewal_policy(mut self, policy: RenewalPolicy) -> Self {
        self.renewal = RenewalCoordinator::new(policy);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn renewal_policy(&self) -> RenewalPolicy {
        self.renewal.policy()
    }

    fn url(&self, path: &str) -> Result<Url, PipelineError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Send a request, renewing credentials once if it is rejected with 401.
    ///
    /// Returns the response for any 2xx/3xx status. Other statuses become
    /// [`PipelineError::Status`]; a 401 that survives renewal becomes
    /// [`PipelineError::Unauthorized`].
    pub async fn execute(&self, request: &ApiRequest) -> Result<reqwest::Response, PipelineError> {
        let mut call = CallLifecycle::new();

        loop {
            let generation = self.renewal.generation();
            let access = self.credentials.load_access().await?;
            let response = self.send_once(request, access.as_ref()).await?;

            if response.status() != StatusCode::UNAUTHORIZED {
                return check_status(response).await;
            }

            let unauthorized = PipelineError::Unauthorized {
                body: response.text().await.unwrap_or_default(),
            };

            if !call.on_unauthorized() {
                tracing::warn!(
                    "{} {} rejected again after renewal",
                    request.method,
                    request.path
                );
                return Err(unauthorized);
            }

            tracing::warn!(
                "{} {} returned 401, renewing credentials",
                request.method,
                request.path
            );

            match self
                .renewal
                .renew(generation, || self.renew_credentials())
                .await
            {
                RenewalOutcome::Renewed => continue,
                RenewalOutcome::MissingRefresh => {
                    call.terminate();
                    return Err(unauthorized);
                }
                RenewalOutcome::Failed(message) => {
                    call.terminate();
                    return Err(PipelineError::RenewalFailed { message });
                }
            }
        }
    }

    async fn send_once(
        &self,
        request: &ApiRequest,
        access: Option<&Secret>,
    ) -> Result<reqwest::Response, PipelineError> {
        let url = self.url(&request.path)?;
        let mut builder = self.http.request(request.method.clone(), url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(token) = access {
            tracing::trace!("Attaching bearer token to {} {}", request.method, request.path);
            builder = builder.bearer_auth(token.expose());
        }

        Ok(builder.send().await?)
    }

    /// Exchange the stored refresh token for a new pair.
    ///
    /// Clears both tokens on any failure.
    async fn renew_credentials(&self) -> RenewalOutcome {
        let refresh = match self.credentials.load_refresh().await {
            Ok(Some(refresh)) => refresh,
            Ok(None) => {
                tracing::info!("No refresh token available, clearing credentials");
                self.clear_after_failure().await;
                return RenewalOutcome::MissingRefresh;
            }
            Err(e) => {
                tracing::error!("Failed to read refresh token: {}", e);
                self.clear_after_failure().await;
                return RenewalOutcome::Failed(format!("failed to read refresh token: {}", e));
            }
        };

        let renewed = match self.request_renewal(&refresh).await {
            Ok(pair) => self.credentials.store_pair(&pair).await.map_err(PipelineError::from),
            Err(e) => Err(e),
        };

        match renewed {
            Ok(()) => {
                tracing::info!("Renewed credentials");
                RenewalOutcome::Renewed
            }
            Err(e) => {
                tracing::error!("Credential renewal failed: {}", e);
                self.clear_after_failure().await;
                RenewalOutcome::Failed(e.to_string())
            }
        }
    }

    async fn request_renewal(&self, refresh: &Secret) -> Result<TokenPair, PipelineError> {
        let url = self.url(&self.refresh_path)?;
        let response = self
            .http
            .post(url)
            .json(&RenewalRequest {
                refresh: refresh.expose(),
            })
            .send()
            .await?;

        let envelope: TokenEnvelope = check_status(response).await?.json().await?;
        Ok(envelope.into_pair())
    }

    async fn clear_after_failure(&self) {
        if let Err(e) = self.credentials.clear().await {
            tracing::warn!("Failed to clear credentials: {}", e);
        }
    }

    /// Sign in: post `credentials` to the login endpoint and store the
    /// returned token pair, replacing any previous one.
    ///
    /// The request carries no bearer token and is never retried.
    pub async fn login<B>(&self, credentials: &B) -> Result<TokenPair, PipelineError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url(&self.login_path)?;
        let response = self.http.post(url).json(credentials).send().await?;

        let envelope: TokenEnvelope = check_status(response).await?.json().await?;
        let pair = envelope.into_pair();

        self.credentials.clear().await?;
        self.credentials.store_pair(&pair).await?;
        self.renewal.reset().await;
        tracing::info!("Logged in, credentials stored");

        Ok(pair)
    }

    /// Forget the stored credentials.
    pub async fn logout(&self) -> Result<(), PipelineError> {
        self.credentials.clear().await?;
        self.renewal.reset().await;
        tracing::info!("Logged out, credentials cleared");
        Ok(())
    }

    /// Whether an access token is currently stored.
    pub async fn is_authenticated(&self) -> Result<bool, PipelineError> {
        Ok(self.credentials.load_access().await?.is_some())
    }

    /// Send a request and decode the JSON response body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, PipelineError> {
        Ok(self.execute(request).await?.json().await?)
    }

    /// `GET` a path and decode the JSON response body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, PipelineError> {
        self.send_json(&ApiRequest::get(path)).await
    }
}

impl fmt::Debug for RequestPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestPipeline")
            .field("base_url", &self.base_url.as_str())
            .field("login_path", &self.login_path)
            .field("refresh_path", &self.refresh_path)
            .field("renewal_policy", &self.renewal.policy())
            .field("credentials", &self.credentials)
            .finish()
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, PipelineError> {
    let status = response.status();
    if status.is_success() || status.is_redirection() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(PipelineError::Status { status, body })
}
