//! Fallback backend built on plain reqwest
//!
//! Behaves like the native backend for callers but offers none of its
//! security: pinning options are ignored, cookies live in a flat
//! [`DocumentCookies`] string and non-2xx responses resolve normally.

pub mod document_cookies;

use crate::backend::BackendConfig;
use crate::body::Body;
use crate::options::{Cookies, Options, ResponseType};
use crate::response::{Response, ResponseBody, header_map, mime_type};
use crate::{Error, Result, multipart};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
pub use document_cookies::DocumentCookies;
use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex};
use url::Url;

/// Fallback backend
#[derive(Clone)]
pub struct FallbackBackend {
    client: reqwest::Client,
    cookies: DocumentCookies,
    object_urls: Arc<Mutex<HashMap<String, tempfile::TempPath>>>,
}

impl FallbackBackend {
    /// Create a fallback backend
    pub fn new() -> Result<Self> {
        Self::with_config(BackendConfig::default())
    }

    /// Create a fallback backend with configuration.
    ///
    /// Only `user_agent` and `default_headers` apply here.
    pub fn with_config(config: BackendConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(user_agent) = config.user_agent {
            builder = builder.user_agent(user_agent);
        }
        if let Some(default_headers) = config.default_headers {
            builder = builder.default_headers(default_headers);
        }

        let client = builder
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create reqwest client: {}", e)))?;

        Ok(Self {
            client,
            cookies: DocumentCookies::new(),
            object_urls: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// The document cookie store
    pub fn document_cookies(&self) -> &DocumentCookies {
        &self.cookies
    }

    /// Perform a request; every status resolves
    pub async fn fetch(&self, url: &str, options: Options) -> Result<Response> {
        let parsed = Url::parse(url).map_err(|_| Error::InvalidUrl(url.to_string()))?;

        let method: http::Method = options.method.into();
        let mut request = self.client.request(method, parsed);
        if let Some(timeout) = options.timeout_duration() {
            request = request.timeout(timeout);
        }
        for (name, value) in &options.headers {
            request = request.header(name, value);
        }

        let json_body = matches!(options.body, Some(Body::Json(_) | Body::Parts(_)));
        if json_body && options.header_value("content-type").is_none() {
            request = request.header(http::header::CONTENT_TYPE, "application/json");
        }

        if options.credentials.as_deref() != Some("omit") {
            let cookie_string = self.cookies.cookie_string()?;
            if !cookie_string.is_empty() {
                request = request.header(http::header::COOKIE, cookie_string);
            }
        }

        request = match &options.body {
            None => request,
            Some(Body::Text(text)) => request.body(text.clone()),
            Some(Body::Json(value)) => request.body(serde_json::to_vec(value)?),
            Some(Body::Parts(form)) => request.body(serde_json::to_vec(form)?),
            Some(Body::FormData(form)) => {
                request.multipart(multipart::form_data_to_multipart(form).await?)
            }
        };

        let response = request.send().await?;

        for set_cookie in response.headers().get_all(http::header::SET_COOKIE) {
            match set_cookie.to_str() {
                Ok(set_cookie) => self.cookies.set_from_header(set_cookie),
                Err(_) => tracing::warn!("Skipping non-ASCII Set-Cookie header"),
            }
        }

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers = header_map(response.headers());
        let mime_type = mime_type(response.headers());
        let data = response.bytes().await?;

        let body = match options.response_type {
            ResponseType::Blob => ResponseBody::Blob { data, mime_type },
            ResponseType::Base64 => ResponseBody::Base64 {
                data: STANDARD.encode(&data),
                mime_type,
            },
            ResponseType::File => {
                let url = self.create_object_url(&data)?;
                ResponseBody::ObjectUrl {
                    data,
                    url,
                    mime_type,
                }
            }
            ResponseType::Text => match String::from_utf8(data.to_vec()) {
                Ok(text) => ResponseBody::Text(text),
                Err(e) => {
                    tracing::warn!("Response from {} is not UTF-8: {}", final_url, e);
                    ResponseBody::Text(String::new())
                }
            },
        };

        Ok(Response {
            status,
            headers,
            url: final_url,
            body,
        })
    }

    /// Write `data` to a temporary file and name it with a `file://` URL
    fn create_object_url(&self, data: &[u8]) -> Result<String> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(data)?;
        let path = file.into_temp_path();

        let url = Url::from_file_path(&path)
            .map_err(|_| Error::Internal(format!("No file URL for {}", path.display())))?
            .to_string();
        self.object_urls
            .lock()
            .map_err(|e| Error::Internal(format!("Failed to lock object URLs: {}", e)))?
            .insert(url.clone(), path);
        Ok(url)
    }

    /// Delete the file behind an object URL; false if the URL is unknown
    pub fn revoke_object_url(&self, url: &str) -> bool {
        match self.object_urls.lock() {
            Ok(mut urls) => urls.remove(url).is_some(),
            Err(_) => false,
        }
    }

    /// Cookies from the document cookie string; `domain` is ignored
    pub fn get_cookies(&self, _domain: &str) -> Result<Cookies> {
        self.cookies.cookies()
    }

    /// Expire the cookie called `name`
    pub fn remove_cookie_by_name(&self, name: &str) -> Result<()> {
        self.cookies.remove(name)
    }

    /// Not available without a native HTTP stack
    pub fn toggle_logging(&self, _enable: bool) -> Result<()> {
        Err(Error::Unavailable("toggleLogging"))
    }
}
