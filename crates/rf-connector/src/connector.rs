//! Game Connector: HTTP connection to the game server

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use rf_reveal::{GameService, ServiceFailure, SpinOutcome};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::protocol::{
    is_insufficient_balance, ConnectionConfig, ErrorBody, PlaySlotResponse, SpinRequest,
    TumbleSpinResponse, CASCADE_SPIN_PATH, PLAY_SLOT_PATH,
};
use crate::session::HttpSession;

/// Game service backed by the HTTP game server
#[derive(Clone)]
pub struct GameConnector {
    /// Connection configuration
    config: ConnectionConfig,

    /// Parsed server root (always ends in `/`)
    base: Url,

    client: reqwest::Client,

    /// Bearer token shared with the session handle
    token: Arc<RwLock<Option<String>>>,
}

impl GameConnector {
    /// Create a connector with config
    pub fn new(config: ConnectionConfig) -> Result<Self, ConnectorError> {
        let mut base = Url::parse(&config.base_url)
            .map_err(|e| ConnectorError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(u64::from(config.timeout_ms)))
            .build()
            .map_err(|e| ConnectorError::ConnectionFailed(e.to_string()))?;

        log::info!("[Connector] Game server at {}", base);

        Ok(Self {
            token: Arc::new(RwLock::new(config.auth_token.clone())),
            config,
            base,
            client,
        })
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Session collaborator sharing this connector's token
    pub fn session(&self) -> HttpSession {
        HttpSession::new(self.clone())
    }

    /// Replace the bearer token (after login)
    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
    }

    /// Forget the bearer token
    pub fn clear_token(&self) {
        *self.token.write() = None;
    }

    pub fn has_token(&self) -> bool {
        self.token.read().is_some()
    }

    /// Absolute URL for an endpoint path
    pub fn endpoint(&self, path: &str) -> Result<Url, ConnectorError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| ConnectorError::InvalidUrl(e.to_string()))
    }

    /// POST a JSON body and decode the JSON reply
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ConnectorError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        log::debug!("[Connector] POST {}", url);
        let request = self.authorize(self.client.post(url)).json(body);
        Self::decode(request.send().await?).await
    }

    /// GET and decode the JSON reply
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ConnectorError> {
        let url = self.endpoint(path)?;
        log::debug!("[Connector] GET {}", url);
        let request = self.authorize(self.client.get(url));
        Self::decode(request.send().await?).await
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.token.read().as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ConnectorError> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        if !(200..300).contains(&status) {
            let error = ConnectorError::from_response(status, &body);
            log::warn!("[Connector] {}", error);
            return Err(error);
        }
        serde_json::from_str(&body).map_err(|e| ConnectorError::Protocol(e.to_string()))
    }
}

impl GameService for GameConnector {
    async fn request_spin(&self, bet: f64) -> Result<SpinOutcome, ServiceFailure> {
        let response: PlaySlotResponse = self.post_json(PLAY_SLOT_PATH, &SpinRequest { bet }).await?;
        Ok(response.into())
    }

    async fn request_cascade_spin(&self, bet: f64) -> Result<SpinOutcome, ServiceFailure> {
        let response: TumbleSpinResponse =
            self.post_json(CASCADE_SPIN_PATH, &SpinRequest { bet }).await?;
        Ok(response.into())
    }
}

/// Connector builder
pub struct ConnectorBuilder {
    config: ConnectionConfig,
}

impl ConnectorBuilder {
    /// Create builder for a server root URL
    pub fn http(base_url: &str) -> Self {
        Self {
            config: ConnectionConfig {
                base_url: base_url.to_string(),
                ..ConnectionConfig::default()
            },
        }
    }

    /// Set auth token
    pub fn auth(mut self, token: &str) -> Self {
        self.config.auth_token = Some(token.to_string());
        self
    }

    /// Set request timeout
    pub fn timeout(mut self, timeout_ms: u32) -> Self {
        self.config.timeout_ms = timeout_ms;
        self
    }

    /// Build the connector
    pub fn build(self) -> Result<GameConnector, ConnectorError> {
        GameConnector::new(self.config)
    }
}

/// Connector errors
#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection timeout")]
    Timeout,

    #[error("Authentication failed")]
    AuthFailed,

    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl ConnectorError {
    /// Classify a non-2xx reply
    pub fn from_response(status: u16, body: &str) -> Self {
        if status == 401 {
            return Self::AuthFailed;
        }
        let message = serde_json::from_str::<ErrorBody>(body)
            .map(|b| b.error)
            .unwrap_or_else(|_| body.trim().to_string());
        Self::Rejected { status, message }
    }
}

impl From<reqwest::Error> for ConnectorError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::Protocol(e.to_string())
        } else {
            Self::ConnectionFailed(e.to_string())
        }
    }
}

impl From<ConnectorError> for ServiceFailure {
    fn from(e: ConnectorError) -> Self {
        match e {
            ConnectorError::AuthFailed => Self::Unauthorized,
            ConnectorError::Rejected { status: 400, message } if is_insufficient_balance(&message) => {
                Self::InsufficientFunds
            }
            ConnectorError::Rejected { message, .. } => Self::Service(message),
            other => Self::Service(other.to_string()),
        }
    }
}
