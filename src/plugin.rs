//! The plugin facade

use crate::backend::{Backend, BackendConfig};
use crate::body::Body;
use crate::options::{Cookies, Options};
use crate::response::Response;
use crate::{Result, multipart};
use std::path::PathBuf;

/// HTTP plugin with a backend chosen once at construction
#[derive(Clone)]
pub struct NativeHttp {
    backend: Backend,
}

impl NativeHttp {
    /// Create a plugin on the default backend
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a plugin on an existing backend
    pub fn with_backend(backend: Backend) -> Self {
        Self { backend }
    }

    /// Create a plugin builder
    pub fn builder() -> NativeHttpBuilder {
        NativeHttpBuilder::new()
    }

    /// The backend serving this plugin
    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Perform an HTTP request.
    ///
    /// On the native backend a [`Body::FormData`] is converted to the
    /// `_parts` representation first and `Content-Type` defaults to
    /// `application/json`.
    pub async fn fetch(&self, url: &str, mut options: Options) -> Result<Response> {
        if self.backend.is_native() {
            if let Some(Body::FormData(form)) = &options.body {
                let converted = multipart::convert_form_data(form).await?;
                options.body = Some(Body::Parts(converted));
                if options.header_value("content-type").is_none() {
                    options
                        .headers
                        .insert("Content-Type".to_string(), "application/json".to_string());
                }
            }
        }

        self.backend.fetch(url, options).await
    }

    /// Cookies for a domain; the fallback backend ignores `domain`
    pub fn get_cookies(&self, domain: &str) -> Result<Cookies> {
        self.backend.get_cookies(domain)
    }

    /// Remove a cookie by name.
    ///
    /// On the native backend this removes the name from every domain.
    pub fn remove_cookie_by_name(&self, name: &str) -> Result<()> {
        self.backend.remove_cookie_by_name(name)
    }

    /// Switch verbose logging; fails on the fallback backend
    pub fn toggle_logging(&self, enable: bool) -> Result<()> {
        self.backend.toggle_logging(enable)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BackendChoice {
    Platform,
    #[cfg(feature = "native")]
    Native,
    Fallback,
}

/// Builder for [`NativeHttp`]
#[derive(Debug, Clone)]
pub struct NativeHttpBuilder {
    config: BackendConfig,
    choice: BackendChoice,
}

impl Default for NativeHttpBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeHttpBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            config: BackendConfig::default(),
            choice: BackendChoice::Platform,
        }
    }

    /// Force the native backend
    #[cfg(feature = "native")]
    pub fn native(mut self) -> Self {
        self.choice = BackendChoice::Native;
        self
    }

    /// Force the fallback backend
    pub fn fallback(mut self) -> Self {
        self.choice = BackendChoice::Fallback;
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = Some(user_agent.into());
        self
    }

    /// Add a default header; invalid names or values are skipped
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (
            http::HeaderName::from_bytes(name.as_bytes()),
            http::HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.config
                    .default_headers
                    .get_or_insert_with(http::HeaderMap::new)
                    .insert(name, value);
            }
            _ => tracing::warn!("Skipping invalid default header {}", name),
        }
        self
    }

    /// Directory holding certificate assets
    pub fn assets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.assets_dir = Some(dir.into());
        self
    }

    /// Roots for file responses
    #[cfg(feature = "native")]
    pub fn directories(mut self, directories: crate::DirectoryRoots) -> Self {
        self.config.directories = Some(directories);
        self
    }

    /// Initial state of verbose logging
    pub fn verbose_logging(mut self, enable: bool) -> Self {
        self.config.verbose_logging = Some(enable);
        self
    }

    /// Build the plugin
    pub fn build(self) -> Result<NativeHttp> {
        let backend = match self.choice {
            BackendChoice::Platform => Backend::with_config(self.config)?,
            #[cfg(feature = "native")]
            BackendChoice::Native => Backend::native_with_config(self.config)?,
            BackendChoice::Fallback => Backend::fallback_with_config(self.config)?,
        };
        Ok(NativeHttp::with_backend(backend))
    }
}
