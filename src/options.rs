//! Request options and the plain data types shared with the bridge

use crate::body::Body;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Header name to value, unique keys
pub type Header = HashMap<String, String>;

/// Cookie name to value, unique keys
pub type Cookies = HashMap<String, String>;

/// HTTP methods accepted by `fetch`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// GET method
    #[default]
    Get,
    /// POST method
    Post,
    /// PUT method
    Put,
    /// DELETE method
    Delete,
    /// PATCH method
    Patch,
    /// HEAD method
    Head,
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => http::Method::GET,
            Method::Post => http::Method::POST,
            Method::Put => http::Method::PUT,
            Method::Delete => http::Method::DELETE,
            Method::Patch => http::Method::PATCH,
            Method::Head => http::Method::HEAD,
        }
    }
}

/// How the response body is handed back
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Decode as UTF-8 text
    #[default]
    Text,
    /// Encode the bytes as base64
    Base64,
    /// Raw bytes (fallback) or a saved file (native)
    Blob,
    /// A saved file (native) or an object URL (fallback)
    File,
}

/// Certificates used for pinning
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SslPinning {
    /// Certificate asset names, or SPKI pins when `pkPinning` is set
    #[serde(default)]
    pub certs: Vec<String>,
}

/// Storage locations a file response can be saved into.
///
/// Only a hint for the native backend; see
/// [`DirectoryRoots`](crate::DirectoryRoots) for how each one resolves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Directory {
    /// User generated content
    Documents,
    /// Application files, removed on uninstall
    #[default]
    Data,
    /// Application library files
    Library,
    /// Re-creatable files that may be purged
    Cache,
    /// Application owned files on shared storage
    External,
    /// Primary shared storage
    ExternalStorage,
    /// Cache on shared storage
    ExternalCache,
    /// Library files excluded from cloud backup
    LibraryNoCloud,
    /// Temporary files
    Temporary,
}

/// A file that already lives on the device, referenced instead of re-encoded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacitorFileType {
    /// File name sent in the multipart part
    pub name: String,
    /// Mime type
    #[serde(rename = "type")]
    pub mime_type: String,
    /// Native URI of the file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Filesystem path, used when `uri` is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl CapacitorFileType {
    /// Create a reference to a native file URI
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        uri: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            uri: Some(uri.into()),
            path: None,
        }
    }

    /// Create a reference to a filesystem path
    pub fn from_path(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            uri: None,
            path: Some(path.into()),
        }
    }

    /// The URI, falling back to the path
    pub fn location(&self) -> Option<&str> {
        self.uri.as_deref().or(self.path.as_deref())
    }
}

/// Options for a single `fetch` call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Options {
    /// HTTP method
    #[serde(default)]
    pub method: Method,
    /// Request headers
    #[serde(default)]
    pub headers: Header,
    /// Request body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Body>,
    /// Credentials mode (`omit`, `same-origin`, `include`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,
    /// Response body handling
    #[serde(default)]
    pub response_type: ResponseType,
    /// Pinned certificates; always present, possibly empty
    pub ssl_pinning: SslPinning,
    /// Treat `ssl_pinning.certs` as public key pins
    #[serde(default)]
    pub pk_pinning: bool,
    /// Timeout in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_interval: Option<u64>,
    /// Skip certificate validation entirely
    #[serde(default)]
    pub disable_all_security: bool,
    /// Keep header name case as received
    #[serde(default)]
    pub case_sensitive_headers: bool,
    /// File name for `file`/`blob` responses on native
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Directory for `file`/`blob` responses on native
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_save_directory: Option<Directory>,
    /// Follow 3xx responses
    #[serde(default)]
    pub follow_redirects: bool,
}

impl Options {
    /// Options for a plain GET with no pinned certificates
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the method
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Add a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the body
    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set the credentials mode
    pub fn credentials(mut self, credentials: impl Into<String>) -> Self {
        self.credentials = Some(credentials.into());
        self
    }

    /// Set the response type
    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    /// Pin against these certificate assets
    pub fn ssl_pinning<I, S>(mut self, certs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ssl_pinning.certs = certs.into_iter().map(Into::into).collect();
        self
    }

    /// Interpret the pinned certs as public key pins
    pub fn pk_pinning(mut self, enabled: bool) -> Self {
        self.pk_pinning = enabled;
        self
    }

    /// Set the timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_interval = Some(timeout.as_millis() as u64);
        self
    }

    /// Skip certificate validation (for testing only)
    pub fn disable_all_security(mut self, disabled: bool) -> Self {
        self.disable_all_security = disabled;
        self
    }

    /// Save a file response under this name
    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    /// Save a file response into this directory
    pub fn file_save_directory(mut self, directory: Directory) -> Self {
        self.file_save_directory = Some(directory);
        self
    }

    /// Follow redirects
    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    /// The timeout as a duration
    pub fn timeout_duration(&self) -> Option<Duration> {
        self.timeout_interval.map(Duration::from_millis)
    }

    /// Look up a request header ignoring case
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Host of `url` without a leading `www.`; the input itself when it does not parse
pub(crate) fn domain_name(url: &str) -> String {
    let host = match url::Url::parse(url) {
        Ok(parsed) => parsed.host_str().map(str::to_string),
        Err(_) => None,
    };
    let host = host.unwrap_or_else(|| url.to_string());
    match host.strip_prefix("www.") {
        Some(stripped) => stripped.to_string(),
        None => host,
    }
}
