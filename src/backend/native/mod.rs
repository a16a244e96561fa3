//! Native backend: pinned reqwest clients, a shared cookie jar and
//! file-backed responses

pub mod cookie_jar;
pub mod storage;
pub mod tls;

use crate::backend::BackendConfig;
use crate::body::Body;
use crate::options::{Cookies, Options, ResponseType, domain_name};
use crate::response::{Response, ResponseBody, header_map, mime_type};
use crate::{Error, Result, multipart};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use cookie_jar::CookieJar;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use storage::DirectoryRoots;
use tls::TlsPolicy;
use url::Url;

const DEFAULT_ASSETS_DIR: &str = "assets";
const TEXT_CONTENT_TYPE: &str = "application/json; charset=utf-8";
const MAX_REDIRECTS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ClientKey {
    domain: String,
    policy: TlsPolicy,
    follow_redirects: bool,
}

/// Native backend
#[derive(Clone)]
pub struct NativeBackend {
    inner: Arc<Inner>,
}

struct Inner {
    clients: Mutex<HashMap<ClientKey, reqwest::Client>>,
    cookies: CookieJar,
    verbose: AtomicBool,
    assets_dir: PathBuf,
    directories: DirectoryRoots,
    user_agent: Option<String>,
    default_headers: Option<http::HeaderMap>,
}

impl NativeBackend {
    /// Create a native backend with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(BackendConfig::default())
    }

    /// Create a native backend with configuration
    pub fn with_config(config: BackendConfig) -> Result<Self> {
        Ok(Self {
            inner: Arc::new(Inner {
                clients: Mutex::new(HashMap::new()),
                cookies: CookieJar::new(),
                verbose: AtomicBool::new(config.verbose_logging.unwrap_or(false)),
                assets_dir: config
                    .assets_dir
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_ASSETS_DIR)),
                directories: config.directories.unwrap_or_default(),
                user_agent: config.user_agent,
                default_headers: config.default_headers,
            }),
        })
    }

    /// The cookie jar shared by every client
    pub fn cookie_jar(&self) -> &CookieJar {
        &self.inner.cookies
    }

    /// Directory roots used for file responses
    pub fn directories(&self) -> &DirectoryRoots {
        &self.inner.directories
    }

    fn verbose(&self) -> bool {
        self.inner.verbose.load(Ordering::Relaxed)
    }

    fn client_for(&self, key: ClientKey) -> Result<reqwest::Client> {
        let mut clients = self
            .inner
            .clients
            .lock()
            .map_err(|e| Error::Internal(format!("Failed to lock client cache: {}", e)))?;
        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }

        let redirect = if key.follow_redirects {
            reqwest::redirect::Policy::limited(MAX_REDIRECTS)
        } else {
            reqwest::redirect::Policy::none()
        };
        let mut builder = reqwest::Client::builder()
            .cookie_provider(Arc::new(self.inner.cookies.clone()))
            .redirect(redirect);

        if let Some(user_agent) = &self.inner.user_agent {
            builder = builder.user_agent(user_agent);
        }
        if let Some(default_headers) = &self.inner.default_headers {
            builder = builder.default_headers(default_headers.clone());
        }
        builder = key.policy.apply(builder, &self.inner.assets_dir)?;

        let client = builder
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create reqwest client: {}", e)))?;

        tracing::debug!(
            "Created client for {} (follow redirects: {})",
            key.domain,
            key.follow_redirects
        );
        clients.insert(key, client.clone());
        Ok(client)
    }

    /// Perform a request.
    ///
    /// Non-2xx statuses come back as [`Error::Status`] carrying the response.
    pub async fn fetch(&self, url: &str, options: Options) -> Result<Response> {
        let parsed = Url::parse(url).map_err(|_| Error::InvalidUrl(url.to_string()))?;
        let policy = TlsPolicy::from_options(&options)?;
        if let Some(file_name) = &options.file_name {
            storage::validate_file_name(file_name)?;
        }

        let client = self.client_for(ClientKey {
            domain: domain_name(url),
            policy,
            follow_redirects: options.follow_redirects,
        })?;

        let method: http::Method = options.method.into();
        let mut request = client.request(method.clone(), parsed);
        if let Some(timeout) = options.timeout_duration() {
            request = request.timeout(timeout);
        }

        let multipart_body = matches!(options.body, Some(Body::Parts(_) | Body::FormData(_)));
        for (name, value) in &options.headers {
            if multipart_body && name.eq_ignore_ascii_case("content-type") {
                continue;
            }
            request = request.header(name, value);
        }

        if self.verbose() {
            tracing::debug!("--> {} {} {:?}", method, url, options.headers);
        }

        request = match &options.body {
            None => request,
            Some(Body::Text(text)) if options.header_value("content-type").is_none() => request
                .header(http::header::CONTENT_TYPE, TEXT_CONTENT_TYPE)
                .body(text.clone()),
            Some(Body::Text(text)) => request.body(text.clone()),
            Some(Body::Json(value)) => request.json(value),
            Some(Body::Parts(form)) => request.multipart(form.to_multipart().await?),
            Some(Body::FormData(form)) => {
                request.multipart(multipart::form_data_to_multipart(form).await?)
            }
        };

        let response = request.send().await?;

        let status = response.status();
        let final_url = response.url().to_string();
        let headers = header_map(response.headers());
        let mime_type = mime_type(response.headers());

        if self.verbose() {
            tracing::debug!("<-- {} {} {:?}", status.as_u16(), final_url, headers);
        }

        if !status.is_success() {
            let body = ResponseBody::Text(response.text().await?);
            tracing::debug!("{} {} failed with {}", method, url, status);
            return Err(Error::Status {
                response: Box::new(Response {
                    status: status.as_u16(),
                    headers,
                    url: final_url,
                    body,
                }),
            });
        }

        let body = match options.response_type {
            ResponseType::File | ResponseType::Blob => {
                let directory = self
                    .inner
                    .directories
                    .resolve(options.file_save_directory.unwrap_or_default());
                let file_name = options
                    .file_name
                    .clone()
                    .unwrap_or_else(storage::default_file_name);
                let path = storage::save_response(response, directory, &file_name).await?;
                ResponseBody::File { path, mime_type }
            }
            ResponseType::Base64 => ResponseBody::Base64 {
                data: STANDARD.encode(response.bytes().await?),
                mime_type,
            },
            ResponseType::Text => ResponseBody::Text(response.text().await?),
        };

        Ok(Response {
            status: status.as_u16(),
            headers,
            url: final_url,
            body,
        })
    }

    /// Cookies visible to `domain`
    pub fn get_cookies(&self, domain: &str) -> Result<Cookies> {
        self.inner.cookies.cookies_for_domain(domain)
    }

    /// Remove every cookie called `name`
    pub fn remove_cookie_by_name(&self, name: &str) -> Result<()> {
        self.inner.cookies.remove_by_name(name)
    }

    /// Switch verbose request and response logging
    pub fn toggle_logging(&self, enable: bool) -> Result<()> {
        self.inner.verbose.store(enable, Ordering::Relaxed);
        tracing::info!(
            "Verbose HTTP logging {}",
            if enable { "enabled" } else { "disabled" }
        );
        Ok(())
    }
}

impl std::fmt::Debug for NativeBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeBackend")
            .field("assets_dir", &self.inner.assets_dir)
            .field("verbose", &self.verbose())
            .finish_non_exhaustive()
    }
}
