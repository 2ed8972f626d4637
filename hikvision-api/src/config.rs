//! Client configuration
//!
//! A [`ClientConfig`] is built in-process, either through
//! [`ClientConfig::builder`] or by deserializing it from the host
//! application's own configuration. It is immutable once a client has been
//! constructed from it.

use std::fmt;
use std::time::Duration;

use isapi_client::{AuthScheme, Credentials, WriteMethod};
use serde::{Deserialize, Deserializer};

use crate::endpoint::{build_url_base, Dialect, EndpointSet};
use crate::xml::NamespaceMode;
use crate::{ApiError, Result};

/// Motion-detection sensitivity written when the device reports 0
///
/// 1 corresponds to roughly 20% on the camera's own scale.
pub const DEFAULT_SENSITIVITY_LEVEL: u8 = 1;

/// Highest sensitivity level the device accepts
pub const MAX_SENSITIVITY_LEVEL: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    Basic,
    #[default]
    Digest,
}

impl From<AuthMode> for AuthScheme {
    fn from(mode: AuthMode) -> Self {
        match mode {
            AuthMode::Basic => AuthScheme::Basic,
            AuthMode::Digest => AuthScheme::Digest,
        }
    }
}

/// What a device-info field query returns when the field is absent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingFieldPolicy {
    /// Report `ApiError::FieldNotFound`
    #[default]
    Fail,
    /// Report `Ok(None)`
    Fallback,
}

/// Connection parameters for one device
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub host: String,
    pub port: Option<u16>,
    pub scheme: Scheme,
    pub username: Option<String>,
    pub password: Option<String>,
    pub auth: AuthMode,
    pub dialect: Dialect,
    /// Used only when the device reports a sensitivity level of 0
    pub sensitivity_level: u8,
    /// Overall per-request deadline handed to the transport
    #[serde(rename = "timeout_secs", deserialize_with = "deserialize_timeout")]
    pub timeout: Option<Duration>,
    /// Overrides the dialect's write verb
    #[serde(deserialize_with = "deserialize_write_method")]
    pub write_method: Option<WriteMethod>,
    pub namespace_mode: NamespaceMode,
    pub missing_field_policy: MissingFieldPolicy,
    /// Sink for this client's log events; the global default when `None`
    #[serde(skip)]
    pub log_dispatch: Option<tracing::Dispatch>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: None,
            scheme: Scheme::default(),
            username: None,
            password: None,
            auth: AuthMode::default(),
            dialect: Dialect::default(),
            sensitivity_level: DEFAULT_SENSITIVITY_LEVEL,
            timeout: None,
            write_method: None,
            namespace_mode: NamespaceMode::default(),
            missing_field_policy: MissingFieldPolicy::default(),
            log_dispatch: None,
        }
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Check the inputs a client cannot be constructed without
    ///
    /// # Errors
    ///
    /// `ApiError::MissingParameter` when no host is set,
    /// `ApiError::InvalidParameter` when the sensitivity level is outside 1-100.
    /// 0 is what the device reports when the level is unset, so it cannot
    /// stand in for it.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(ApiError::MissingParameter("host".to_string()));
        }
        if self.sensitivity_level == 0 || self.sensitivity_level > MAX_SENSITIVITY_LEVEL {
            return Err(ApiError::InvalidParameter(format!(
                "sensitivity_level {} is out of range [1, {}]",
                self.sensitivity_level, MAX_SENSITIVITY_LEVEL
            )));
        }
        Ok(())
    }

    pub fn is_https(&self) -> bool {
        self.scheme == Scheme::Https
    }

    pub fn base_url(&self) -> String {
        build_url_base(self.is_https(), self.host.trim(), self.port)
    }

    pub fn endpoints(&self) -> EndpointSet {
        EndpointSet::new(&self.base_url(), self.dialect)
    }

    /// Value sent in the `Host` header of writes
    pub fn host_header(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{}", self.host.trim(), port),
            None => self.host.trim().to_string(),
        }
    }

    pub fn write_method(&self) -> WriteMethod {
        self.write_method
            .unwrap_or_else(|| self.dialect.default_write_method())
    }

    /// Credentials to authenticate with, if a username was given
    pub fn credentials(&self) -> Option<Credentials> {
        self.username.as_ref().map(|username| {
            Credentials::new(username.clone(), self.password.clone().unwrap_or_default())
        })
    }

    /// Basic auth over plain HTTP sends the password in the clear
    pub fn is_insecure(&self) -> bool {
        self.auth == AuthMode::Basic && !self.is_https()
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("scheme", &self.scheme)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("auth", &self.auth)
            .field("dialect", &self.dialect)
            .field("sensitivity_level", &self.sensitivity_level)
            .field("timeout", &self.timeout)
            .field("write_method", &self.write_method)
            .field("namespace_mode", &self.namespace_mode)
            .field("missing_field_policy", &self.missing_field_policy)
            .field("log_dispatch", &self.log_dispatch.is_some())
            .finish()
    }
}

/// Builder for [`ClientConfig`]
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = Some(port);
        self
    }

    pub fn https(mut self, https: bool) -> Self {
        self.config.scheme = if https { Scheme::Https } else { Scheme::Http };
        self
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.username = Some(username.into());
        self.config.password = Some(password.into());
        self
    }

    pub fn auth(mut self, auth: AuthMode) -> Self {
        self.config.auth = auth;
        self
    }

    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.config.dialect = dialect;
        self
    }

    pub fn sensitivity_level(mut self, level: u8) -> Self {
        self.config.sensitivity_level = level;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    pub fn write_method(mut self, method: WriteMethod) -> Self {
        self.config.write_method = Some(method);
        self
    }

    pub fn namespace_mode(mut self, mode: NamespaceMode) -> Self {
        self.config.namespace_mode = mode;
        self
    }

    pub fn missing_field_policy(mut self, policy: MissingFieldPolicy) -> Self {
        self.config.missing_field_policy = policy;
        self
    }

    /// Route this client's log events to `dispatch` instead of the global default
    pub fn log_dispatch(mut self, dispatch: tracing::Dispatch) -> Self {
        self.config.log_dispatch = Some(dispatch);
        self
    }

    /// Validate and return the configuration
    pub fn build(self) -> Result<ClientConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

fn deserialize_timeout<'de, D>(deserializer: D) -> std::result::Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?
        .filter(|secs| secs.is_finite() && *secs > 0.0)
        .map(Duration::from_secs_f64))
}

fn deserialize_write_method<'de, D>(deserializer: D) -> std::result::Result<Option<WriteMethod>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(verb) => match verb.to_ascii_uppercase().as_str() {
            "PUT" => Ok(Some(WriteMethod::Put)),
            "PATCH" => Ok(Some(WriteMethod::Patch)),
            other => Err(serde::de::Error::custom(format!(
                "unsupported write method '{}', expected PUT or PATCH",
                other
            ))),
        },
    }
}
