//! Backend abstraction for the plugin operations

#[cfg(feature = "native")]
pub mod native;

pub mod fallback;

use crate::options::{Cookies, Options};
use crate::response::Response;
use crate::Result;
use std::path::PathBuf;

/// Configuration for backend creation
#[derive(Clone, Debug, Default)]
pub struct BackendConfig {
    /// User agent string
    pub user_agent: Option<String>,
    /// Default headers to add to all requests
    pub default_headers: Option<http::HeaderMap>,
    /// Directory holding `<name>.cer` certificate assets (default `assets`)
    pub assets_dir: Option<PathBuf>,
    /// Roots for file responses
    #[cfg(feature = "native")]
    pub directories: Option<native::storage::DirectoryRoots>,
    /// Initial state of verbose logging
    pub verbose_logging: Option<bool>,
}

/// HTTP backend implementations
#[derive(Clone)]
pub enum Backend {
    /// Pinned reqwest clients with a cookie jar and file storage
    #[cfg(feature = "native")]
    Native(native::NativeBackend),

    /// Plain reqwest with a document cookie string, no pinning
    Fallback(fallback::FallbackBackend),
}

impl Backend {
    /// Auto-select the best backend that was compiled in
    pub fn default_for_platform() -> Result<Self> {
        Self::with_config(BackendConfig::default())
    }

    /// Auto-select with configuration
    pub fn with_config(config: BackendConfig) -> Result<Self> {
        #[cfg(feature = "native")]
        {
            Self::native_with_config(config)
        }

        #[cfg(not(feature = "native"))]
        {
            Self::fallback_with_config(config)
        }
    }

    /// Use the native backend
    #[cfg(feature = "native")]
    pub fn native() -> Result<Self> {
        Ok(Backend::Native(native::NativeBackend::new()?))
    }

    /// Use the native backend with configuration
    #[cfg(feature = "native")]
    pub fn native_with_config(config: BackendConfig) -> Result<Self> {
        Ok(Backend::Native(native::NativeBackend::with_config(config)?))
    }

    /// Use the fallback backend (available everywhere)
    pub fn fallback() -> Result<Self> {
        Ok(Backend::Fallback(fallback::FallbackBackend::new()?))
    }

    /// Use the fallback backend with configuration
    pub fn fallback_with_config(config: BackendConfig) -> Result<Self> {
        Ok(Backend::Fallback(fallback::FallbackBackend::with_config(
            config,
        )?))
    }

    /// Whether this is the native backend
    pub fn is_native(&self) -> bool {
        match self {
            #[cfg(feature = "native")]
            Backend::Native(_) => true,
            Backend::Fallback(_) => false,
        }
    }

    /// Perform a request
    pub async fn fetch(&self, url: &str, options: Options) -> Result<Response> {
        match self {
            #[cfg(feature = "native")]
            Backend::Native(n) => n.fetch(url, options).await,
            Backend::Fallback(f) => f.fetch(url, options).await,
        }
    }

    /// Cookies visible to `domain`
    pub fn get_cookies(&self, domain: &str) -> Result<Cookies> {
        match self {
            #[cfg(feature = "native")]
            Backend::Native(n) => n.get_cookies(domain),
            Backend::Fallback(f) => f.get_cookies(domain),
        }
    }

    /// Remove cookies called `name`
    pub fn remove_cookie_by_name(&self, name: &str) -> Result<()> {
        match self {
            #[cfg(feature = "native")]
            Backend::Native(n) => n.remove_cookie_by_name(name),
            Backend::Fallback(f) => f.remove_cookie_by_name(name),
        }
    }

    /// Switch verbose logging
    pub fn toggle_logging(&self, enable: bool) -> Result<()> {
        match self {
            #[cfg(feature = "native")]
            Backend::Native(n) => n.toggle_logging(enable),
            Backend::Fallback(f) => f.toggle_logging(enable),
        }
    }
}
