//! HTTP Basic and Digest authentication
//!
//! Digest support covers what camera firmware actually sends: RFC 2617
//! challenges with `MD5` or `MD5-sess` and an optional `qop="auth"`.

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::TransportError;

/// Username/password pair sent to the device
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Value of an `Authorization` header for HTTP Basic auth
    pub fn basic_header(&self) -> String {
        let token = STANDARD.encode(format!("{}:{}", self.username, self.password));
        format!("Basic {}", token)
    }
}

// Never print the password.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Which HTTP authentication scheme to use against the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthScheme {
    /// Send credentials up front with every request
    Basic,
    /// Answer the device's `WWW-Authenticate: Digest` challenge
    #[default]
    Digest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DigestAlgorithm {
    Md5,
    Md5Sess,
}

/// A parsed `WWW-Authenticate: Digest ...` challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub opaque: Option<String>,
    /// Whether the server offered `qop="auth"`
    pub qop_auth: bool,
    algorithm: DigestAlgorithm,
}

impl DigestChallenge {
    /// Parse a `WWW-Authenticate` header value
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Auth` when the header is not a Digest challenge,
    /// lacks a realm or nonce, or asks for an algorithm other than MD5/MD5-sess.
    pub fn parse(header: &str) -> Result<Self, TransportError> {
        let header = header.trim();
        let params = match header.split_once(char::is_whitespace) {
            Some((scheme, rest)) if scheme.eq_ignore_ascii_case("digest") => rest,
            _ => {
                return Err(TransportError::Auth(format!(
                    "Not a Digest challenge: {}",
                    header
                )))
            }
        };

        let mut realm = None;
        let mut nonce = None;
        let mut opaque = None;
        let mut qop_auth = false;
        let mut algorithm = DigestAlgorithm::Md5;

        for (key, value) in split_params(params) {
            match key.to_ascii_lowercase().as_str() {
                "realm" => realm = Some(value),
                "nonce" => nonce = Some(value),
                "opaque" => opaque = Some(value),
                "qop" => {
                    qop_auth = value
                        .split(',')
                        .any(|q| q.trim().eq_ignore_ascii_case("auth"));
                }
                "algorithm" => {
                    algorithm = match value.to_ascii_uppercase().as_str() {
                        "MD5" => DigestAlgorithm::Md5,
                        "MD5-SESS" => DigestAlgorithm::Md5Sess,
                        other => {
                            return Err(TransportError::Auth(format!(
                                "Unsupported digest algorithm: {}",
                                other
                            )))
                        }
                    };
                }
                _ => {}
            }
        }

        Ok(Self {
            realm: realm.ok_or_else(|| TransportError::Auth("Digest challenge without realm".to_string()))?,
            nonce: nonce.ok_or_else(|| TransportError::Auth("Digest challenge without nonce".to_string()))?,
            opaque,
            qop_auth,
            algorithm,
        })
    }

    /// Build the `Authorization` header answering this challenge
    ///
    /// # Arguments
    /// * `credentials` - Username and password
    /// * `method` - HTTP method of the request being authorized
    /// * `uri` - Request target (path and query) of that request
    /// * `cnonce` - Client nonce
    /// * `nc` - Nonce count, starting at 1
    pub fn authorization(
        &self,
        credentials: &Credentials,
        method: &str,
        uri: &str,
        cnonce: &str,
        nc: u32,
    ) -> String {
        let nc = format!("{:08x}", nc);

        let mut ha1 = md5_hex(&format!(
            "{}:{}:{}",
            credentials.username, self.realm, credentials.password
        ));
        if self.algorithm == DigestAlgorithm::Md5Sess {
            ha1 = md5_hex(&format!("{}:{}:{}", ha1, self.nonce, cnonce));
        }
        let ha2 = md5_hex(&format!("{}:{}", method, uri));

        let response = if self.qop_auth {
            md5_hex(&format!("{}:{}:{}:{}:auth:{}", ha1, self.nonce, nc, cnonce, ha2))
        } else {
            md5_hex(&format!("{}:{}:{}", ha1, self.nonce, ha2))
        };

        let algorithm = match self.algorithm {
            DigestAlgorithm::Md5 => "MD5",
            DigestAlgorithm::Md5Sess => "MD5-sess",
        };

        let mut header = format!(
            r#"Digest username="{}", realm="{}", nonce="{}", uri="{}", algorithm={}, response="{}""#,
            credentials.username, self.realm, self.nonce, uri, algorithm, response
        );
        if let Some(opaque) = &self.opaque {
            header.push_str(&format!(r#", opaque="{}""#, opaque));
        }
        if self.qop_auth {
            header.push_str(&format!(r#", qop=auth, nc={}, cnonce="{}""#, nc, cnonce));
        }
        header
    }
}

fn md5_hex(input: &str) -> String {
    format!("{:x}", md5::compute(input.as_bytes()))
}

/// Split `key="value", key=value` pairs, honoring commas inside quotes
fn split_params(params: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut chars = params.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(c) if c.is_whitespace() || *c == ',') {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' || c == ',' {
                break;
            }
            key.push(c);
            chars.next();
        }

        let mut value = String::new();
        if chars.peek() == Some(&'=') {
            chars.next();
            if chars.peek() == Some(&'"') {
                chars.next();
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                value.push(escaped);
                            }
                        }
                        '"' => break,
                        _ => value.push(c),
                    }
                }
            } else {
                while let Some(&c) = chars.peek() {
                    if c == ',' {
                        break;
                    }
                    value.push(c);
                    chars.next();
                }
            }
        }

        pairs.push((key.trim().to_string(), value.trim().to_string()));
    }

    pairs
}
