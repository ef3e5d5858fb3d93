//! vSphere REST API HTTP client with session-based authentication.
//!
//! Communicates with vCenter via `https://{hostname}/api/...` (and the legacy
//! `/rest/...` tree). Manages the session lifecycle and carries raw requests
//! for the reconciler through [`RestTransport`].

use crate::error::{VmwareError, VmwareResult};
use crate::transport::{RestRequest, RestResponse, RestTransport};
use crate::types::ConnectionConfig;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};

const SESSION_HEADER: &str = "vmware-api-session-id";

/// vSphere REST API client.
pub struct VsphereClient {
    client: Client,
    base_url: String,
    session_id: Option<String>,
    config: ConnectionConfig,
}

impl VsphereClient {
    /// Build a new client from config (does NOT create a session yet).
    pub fn new(config: &ConnectionConfig) -> VmwareResult<Self> {
        let base_url = if config.port == 443 {
            format!("https://{}", config.hostname)
        } else {
            format!("https://{}:{}", config.hostname, config.port)
        };
        Self::with_base_url(config, base_url)
    }

    /// Build a client that talks to an explicit base URL (proxies, test servers).
    pub fn with_base_url(config: &ConnectionConfig, base_url: impl Into<String>) -> VmwareResult<Self> {
        config.validate()?;

        let client = Client::builder()
            .danger_accept_invalid_certs(!config.verifies_certs())
            .timeout(config.timeout()?)
            .build()
            .map_err(|e| VmwareError::connection(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session_id: None,
            config: config.clone(),
        })
    }

    /// Whether we have an active session.
    pub fn is_connected(&self) -> bool {
        self.session_id.is_some()
    }

    /// Current session ID (if any).
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Current config.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    // ── Session management ──────────────────────────────────────────

    /// Create a new API session (POST /api/session).
    pub async fn login(&mut self) -> VmwareResult<String> {
        let url = format!("{}/api/session", self.base_url);

        let resp = self
            .client
            .post(&url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .send()
            .await?;

        if resp.status() == StatusCode::UNAUTHORIZED {
            return Err(VmwareError::auth("Invalid credentials"));
        }

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(VmwareError::api(status.as_u16(), format!("Login failed: {body}")));
        }

        // Session ID comes back as a quoted JSON string
        let session_id: String = resp.json().await.map_err(|e| {
            VmwareError::parse(format!("Failed to parse session response: {e}"))
        })?;

        log::debug!("opened vSphere session on {}", self.base_url);
        self.session_id = Some(session_id.clone());
        Ok(session_id)
    }

    /// Delete the current session (DELETE /api/session).
    pub async fn logout(&mut self) -> VmwareResult<()> {
        if let Some(ref sid) = self.session_id {
            let url = format!("{}/api/session", self.base_url);
            let _ = self
                .client
                .delete(&url)
                .header(SESSION_HEADER, sid.as_str())
                .send()
                .await;
        }
        self.session_id = None;
        Ok(())
    }

    /// Check if the session is still valid (GET /api/session).
    pub async fn check_session(&self) -> VmwareResult<bool> {
        let sid = self.require_session()?;
        let url = format!("{}/api/session", self.base_url);
        let resp = self
            .client
            .get(&url)
            .header(SESSION_HEADER, sid)
            .send()
            .await?;

        Ok(resp.status().is_success())
    }

    fn require_session(&self) -> VmwareResult<&str> {
        self.session_id
            .as_deref()
            .ok_or_else(|| VmwareError::auth("Not logged in: no active session"))
    }
}

#[async_trait]
impl RestTransport for VsphereClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request(&self, req: RestRequest) -> VmwareResult<RestResponse> {
        let sid = self.require_session()?;

        log::debug!("{} {}", req.method, req.url);
        let mut builder = self
            .client
            .request(req.method.into(), &req.url)
            .header(SESSION_HEADER, sid);
        if let Some(ref body) = req.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = resp.text().await.map_err(|e| {
            VmwareError::parse(format!("Failed to read response body: {e}"))
        })?;
        log::debug!("{} {} -> {status}", req.method, req.url);

        Ok(RestResponse { status, content_type, text })
    }
}
