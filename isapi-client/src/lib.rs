//! Private HTTP/XML transport for Hikvision device communication
//!
//! This crate provides a minimal blocking HTTP client for the camera
//! configuration API. It knows how to authenticate (Basic or Digest), how to
//! GET an XML document and how to write one back, and it turns anything other
//! than `200 OK` into an error. It knows nothing about the documents
//! themselves; that lives in `hikvision-api`.

mod auth;
mod error;

pub use auth::{AuthScheme, Credentials, DigestChallenge};
pub use error::{TransportError, BODY_SNIPPET_LEN};

use std::time::Duration;

/// Content type sent with every write
pub const XML_CONTENT_TYPE: &str = "application/xml; charset=UTF-8";

/// HTTP verb used to submit a modified document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WriteMethod {
    #[default]
    Put,
    Patch,
}

impl WriteMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteMethod::Put => "PUT",
            WriteMethod::Patch => "PATCH",
        }
    }
}

/// Request/response exchange with a single device
///
/// Both calls return the response body of a `200 OK` answer. Any other
/// outcome is a [`TransportError`].
pub trait Transport {
    /// Fetch the document at `url`
    fn get(&self, url: &str) -> Result<String, TransportError>;

    /// Submit `body` to `url` with the given verb
    fn send(&self, method: WriteMethod, url: &str, body: &str) -> Result<String, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(&self, url: &str) -> Result<String, TransportError> {
        (**self).get(url)
    }

    fn send(&self, method: WriteMethod, url: &str, body: &str) -> Result<String, TransportError> {
        (**self).send(method, url, body)
    }
}

/// Builder for [`HttpTransport`]
#[derive(Debug, Clone, Default)]
pub struct HttpTransportBuilder {
    credentials: Option<Credentials>,
    auth: AuthScheme,
    timeout: Option<Duration>,
    host_header: Option<String>,
}

impl HttpTransportBuilder {
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn auth(mut self, auth: AuthScheme) -> Self {
        self.auth = auth;
        self
    }

    /// Overall deadline for a single request
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Value of the `Host` header sent with writes
    pub fn host_header(mut self, host: impl Into<String>) -> Self {
        self.host_header = Some(host.into());
        self
    }

    pub fn build(self) -> HttpTransport {
        let mut agent = ureq::AgentBuilder::new().timeout_connect(Duration::from_secs(5));
        agent = match self.timeout {
            Some(timeout) => agent.timeout(timeout),
            None => agent.timeout_read(Duration::from_secs(10)),
        };

        HttpTransport {
            agent: agent.build(),
            credentials: self.credentials,
            auth: self.auth,
            host_header: self.host_header,
        }
    }
}

/// Blocking HTTP transport backed by a `ureq` agent
///
/// One request per call; nothing is kept open between calls beyond the
/// agent's connection pool.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    agent: ureq::Agent,
    credentials: Option<Credentials>,
    auth: AuthScheme,
    host_header: Option<String>,
}

impl HttpTransport {
    /// Create an unauthenticated transport with default timeouts
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::default()
    }

    fn execute(
        &self,
        method: &str,
        url: &str,
        body: Option<&str>,
    ) -> Result<String, TransportError> {
        tracing::debug!("{} {}", method, url);

        let basic = match (&self.credentials, self.auth) {
            (Some(creds), AuthScheme::Basic) => Some(creds.basic_header()),
            _ => None,
        };

        let response = match self.dispatch(method, url, body, basic.as_deref()) {
            Err(ureq::Error::Status(401, response)) if self.auth == AuthScheme::Digest => {
                let creds = match &self.credentials {
                    Some(creds) => creds,
                    None => return Err(status_error(401, response)),
                };
                let header = response
                    .all("www-authenticate")
                    .into_iter()
                    .find(|h| h.trim_start().to_ascii_lowercase().starts_with("digest"))
                    .map(str::to_string);
                let challenge = match header {
                    Some(header) => DigestChallenge::parse(&header)?,
                    None => return Err(status_error(401, response)),
                };

                let cnonce = uuid::Uuid::new_v4().simple().to_string();
                let authorization =
                    challenge.authorization(creds, method, &request_target(url)?, &cnonce, 1);
                tracing::debug!("Answering digest challenge for realm {}", challenge.realm);

                self.dispatch(method, url, body, Some(&authorization))
            }
            other => other,
        };

        let response = match response {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => return Err(status_error(code, response)),
            Err(ureq::Error::Transport(transport)) => return Err(transport.into()),
        };

        let code = response.status();
        let text = response
            .into_string()
            .map_err(|e| TransportError::Body(e.to_string()))?;
        tracing::debug!("{} {} -> {}", method, url, code);

        if code != 200 {
            return Err(TransportError::status(code, Some(text)));
        }
        Ok(text)
    }

    fn dispatch(
        &self,
        method: &str,
        url: &str,
        body: Option<&str>,
        authorization: Option<&str>,
    ) -> Result<ureq::Response, ureq::Error> {
        let mut request = self.agent.request(method, url);
        if let Some(authorization) = authorization {
            request = request.set("Authorization", authorization);
        }

        match body {
            Some(body) => {
                request = request
                    .set("Content-Type", XML_CONTENT_TYPE)
                    .set("Accept", "*/*")
                    .set("Content-Length", &body.len().to_string());
                if let Some(host) = &self.host_header {
                    request = request.set("Host", host);
                }
                request.send_string(body)
            }
            None => request.call(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<String, TransportError> {
        self.execute("GET", url, None)
    }

    fn send(&self, method: WriteMethod, url: &str, body: &str) -> Result<String, TransportError> {
        tracing::debug!("Request body: {}", body);
        self.execute(method.as_str(), url, Some(body))
    }
}

fn status_error(code: u16, response: ureq::Response) -> TransportError {
    TransportError::status(code, response.into_string().ok())
}

/// Path and query of `url`, as used in the digest `uri` field
fn request_target(url: &str) -> Result<String, TransportError> {
    let parsed = url::Url::parse(url).map_err(|e| TransportError::InvalidUrl(e.to_string()))?;
    Ok(match parsed.query() {
        Some(query) => format!("{}?{}", parsed.path(), query),
        None => parsed.path().to_string(),
    })
}
