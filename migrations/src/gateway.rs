//! Gateway clients
//!
//! Every gateway speaks the same request protocol: JSON body, `Content-Type:
//! application/json`, any 2xx is success. Dialects differ only in the header
//! that carries the API key.

use crate::error::MigrateError;
use crate::migration::Action;
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use std::str::FromStr;
use std::time::Duration;
use tracing::Span;

// ============================================================================
// Dialect
// ============================================================================

/// Gateway flavour, selecting how the API key is attached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    /// Apache APISIX admin API
    Apisix,
    /// Kong admin API
    Kong,
    /// Any API accepting a bearer token
    #[default]
    Generic,
}

impl Dialect {
    pub const ALL: &'static [&'static str] = &["apisix", "kong", "generic"];

    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Apisix => "apisix",
            Self::Kong => "kong",
            Self::Generic => "generic",
        }
    }

    /// Name of the authentication header
    #[inline]
    pub const fn auth_header(self) -> &'static str {
        match self {
            Self::Apisix => "X-API-KEY",
            Self::Kong => "Kong-Admin-Token",
            Self::Generic => "Authorization",
        }
    }

    /// Value of the authentication header for the given key
    pub fn auth_value(self, api_key: &str) -> String {
        match self {
            Self::Apisix | Self::Kong => api_key.to_string(),
            Self::Generic => format!("Bearer {api_key}"),
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "apisix" => Ok(Self::Apisix),
            "kong" => Ok(Self::Kong),
            "generic" => Ok(Self::Generic),
            _ => Err(MigrateError::configuration(format!(
                "unsupported gateway type: {s} (expected one of: {})",
                Self::ALL.join(", ")
            ))),
        }
    }
}

// ============================================================================
// Gateway trait
// ============================================================================

/// Sends one migration action to the target service
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn send_request(&self, action: &Action) -> Result<(), MigrateError>;
}

#[async_trait]
impl<G: Gateway + ?Sized> Gateway for Box<G> {
    async fn send_request(&self, action: &Action) -> Result<(), MigrateError> {
        (**self).send_request(action).await
    }
}

// ============================================================================
// HTTP gateway
// ============================================================================

/// Connection settings for an [`HttpGateway`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub dialect: Dialect,
    pub base_url: String,
    pub api_key: Option<String>,
    /// Per-request timeout; `None` keeps the transport default
    pub timeout: Option<Duration>,
}

impl GatewayConfig {
    pub fn new(dialect: Dialect, base_url: impl Into<String>) -> Self {
        Self {
            dialect,
            base_url: base_url.into(),
            api_key: None,
            timeout: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Gateway client over HTTP
#[derive(Debug, Clone)]
pub struct HttpGateway {
    dialect: Dialect,
    base_url: String,
    auth: Option<(HeaderName, HeaderValue)>,
    client: reqwest::Client,
    span: Span,
}

impl HttpGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, MigrateError> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(MigrateError::configuration("base URL is required"));
        }

        let auth = match config.api_key.as_deref().filter(|k| !k.is_empty()) {
            Some(key) => {
                let name = HeaderName::from_bytes(config.dialect.auth_header().as_bytes())
                    .map_err(|e| MigrateError::configuration(format!("invalid auth header: {e}")))?;
                let mut value = HeaderValue::from_str(&config.dialect.auth_value(key))
                    .map_err(|_| {
                        MigrateError::configuration("API key contains characters not allowed in an HTTP header")
                    })?;
                value.set_sensitive(true);
                Some((name, value))
            }
            None => None,
        };

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            MigrateError::configuration(format!("failed to create HTTP client: {e}"))
        })?;

        Ok(Self {
            dialect: config.dialect,
            base_url,
            auth,
            client,
            span: Span::none(),
        })
    }

    /// Build a client from a gateway type name (`apisix`, `kong`, `generic`)
    pub fn from_parts(
        gateway_type: &str,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, MigrateError> {
        let dialect = gateway_type.parse()?;
        Self::new(GatewayConfig {
            dialect,
            base_url: base_url.into(),
            api_key,
            timeout: None,
        })
    }

    /// Emit request diagnostics under the given span
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for an endpoint path
    pub fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn send_request(&self, action: &Action) -> Result<(), MigrateError> {
        let url = self.url(&action.endpoint);

        let mut request = self
            .client
            .request(action.method.clone(), &url)
            .header(CONTENT_TYPE, "application/json");

        if let Some((name, value)) = &self.auth {
            request = request.header(name.clone(), value.clone());
        }

        if let Some(body) = &action.body {
            request = request.json(body);
        }

        tracing::debug!(parent: &self.span, method = %action.method, url = %url, "sending request");

        let response = request.send().await.map_err(MigrateError::Network)?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.map_err(MigrateError::Network)?;
            tracing::debug!(parent: &self.span, status = status.as_u16(), url = %url, "request rejected");
            return Err(MigrateError::Request {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(parent: &self.span, status = status.as_u16(), url = %url, "request successful");
        Ok(())
    }
}
