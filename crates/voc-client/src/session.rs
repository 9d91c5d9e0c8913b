//! Authenticated request layer
//!
//! A [`Session`] starts unauthenticated and becomes usable once a
//! [`Credential`] is attached with [`Session::authenticate`]. Every call to
//! the vendor API goes through [`Session::send`], which applies the default
//! headers, the `Authorization: Basic` header and any per-call overrides,
//! and maps non-2xx responses to [`VocError::HttpError`].

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::config::{ClientConfig, DeviceConfig};
use crate::error::{Result, VocError};

/// Opaque authorization token derived from account identifier and secret
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Encode `identifier:secret` as the Basic auth token
    pub fn encode(identifier: &str, secret: &str) -> Self {
        Self(BASE64_STANDARD.encode(format!("{}:{}", identifier, secret)))
    }

    /// The encoded token
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn header_value(&self) -> Result<HeaderValue> {
        let mut value = HeaderValue::from_str(&format!("Basic {}", self.0))
            .map_err(|e| VocError::InvalidHeader(format!("authorization: {}", e)))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// HTTP session against the vendor API
#[derive(Debug, Clone)]
pub struct Session {
    client: Client,
    base_url: Url,
    default_headers: HeaderMap,
    credential: Option<Credential>,
}

impl Session {
    /// Create an unauthenticated session
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.connection.request_timeout())
            .connect_timeout(config.connection.connect_timeout())
            .build()?;

        let base_url = Url::parse(&config.connection.api_base_url())?;
        let default_headers = device_headers(&config.device)?;

        debug!("Session created for {}", base_url);

        Ok(Self {
            client,
            base_url,
            default_headers,
            credential: None,
        })
    }

    /// Attach a credential encoded from account identifier and secret
    pub fn authenticate(self, identifier: &str, secret: &str) -> Self {
        self.with_credential(Credential::encode(identifier, secret))
    }

    /// Attach an already encoded credential
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.credential.is_some()
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Get the API root URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Full URL for a path relative to the API root
    pub fn url_for(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(Into::into)
    }

    /// Headers for one request: defaults, then authorization, then overrides.
    ///
    /// Overrides replace a default with the same name; every other default
    /// is kept.
    pub fn request_headers(&self, overrides: &HeaderMap) -> Result<HeaderMap> {
        let credential = self.credential.as_ref().ok_or(VocError::Unauthenticated)?;

        let mut headers = self.default_headers.clone();
        headers.insert(AUTHORIZATION, credential.header_value()?);
        for (name, value) in overrides {
            headers.insert(name.clone(), value.clone());
        }
        Ok(headers)
    }

    /// Send an authenticated request and return the parsed JSON body.
    ///
    /// `GET` requests carry no body; every other method sends `body` as
    /// JSON, or `{}` when none is given. Non-2xx responses fail with
    /// [`VocError::HttpError`] without reading the body.
    #[instrument(skip(self, body, header_overrides))]
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        header_overrides: &HeaderMap,
    ) -> Result<Value> {
        let headers = self.request_headers(header_overrides)?;
        let url = self.url_for(path)?;
        debug!("Sending {} {}", method, url);

        let mut request = self.client.request(method.clone(), url).headers(headers);
        if method != Method::GET {
            let payload = match body {
                Some(body) => serde_json::to_vec(body),
                None => serde_json::to_vec(&Value::Object(Default::default())),
            }
            .map_err(|e| VocError::Parse(e.to_string()))?;
            request = request.body(payload);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            debug!("{} {} failed with {}", method, path, status);
            return Err(VocError::http_error(status.as_u16(), path));
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| VocError::Parse(e.to_string()))
    }

    /// Authenticated GET
    pub async fn get(&self, path: &str) -> Result<Value> {
        self.send(Method::GET, path, None, &HeaderMap::new()).await
    }

    /// Authenticated POST with a JSON body
    pub async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        self.send(Method::POST, path, Some(body), &HeaderMap::new())
            .await
    }

    /// Authenticated GET deserialized into `T`
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        decode(self.get(path).await?)
    }

    /// Authenticated POST deserialized into `T`
    pub async fn post_json<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T> {
        decode(self.post(path, body).await?)
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| VocError::Parse(e.to_string()))
}

fn device_headers(device: &DeviceConfig) -> Result<HeaderMap> {
    let pairs = [
        ("user-agent", device.user_agent.as_str()),
        ("x-device-id", device.device_id.as_str()),
        ("x-os-type", device.os_type.as_str()),
        ("x-originator-type", device.originator_type.as_str()),
        ("x-os-version", device.os_version.as_str()),
        ("cache-control", "no-cache"),
        ("content-type", "application/json"),
        ("accept", "*/*"),
    ];

    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        let value = HeaderValue::from_str(value)
            .map_err(|e| VocError::InvalidHeader(format!("{}: {}", name, e)))?;
        headers.insert(HeaderName::from_static(name), value);
    }
    Ok(headers)
}
