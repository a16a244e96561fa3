//! Cookie storage for the native backend
//!
//! Wraps the cookie_store crate for RFC 6265 handling and plugs into reqwest
//! as its cookie provider, so every pinned client shares one jar.

use crate::options::{Cookies, domain_name};
use crate::{Error, Result};
use cookie_store::CookieStore;
use http::HeaderValue;
use std::sync::{Arc, Mutex, MutexGuard};
use url::Url;

/// Shared, thread safe cookie jar
#[derive(Clone, Debug, Default)]
pub struct CookieJar {
    store: Arc<Mutex<CookieStore>>,
}

impl CookieJar {
    /// Create an empty jar
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, CookieStore>> {
        self.store
            .lock()
            .map_err(|e| Error::Internal(format!("Failed to lock cookie store: {}", e)))
    }

    /// Store a `Set-Cookie` header value received from `url`
    pub fn add_cookie_str(&self, set_cookie: &str, url: &Url) -> Result<()> {
        let mut store = self.lock()?;
        store
            .parse(set_cookie, url)
            .map_err(|e| Error::Internal(format!("Failed to parse cookie: {}", e)))?;
        Ok(())
    }

    /// Unexpired cookies whose domain matches `domain`.
    ///
    /// `domain` may be a URL or a bare host; a leading `www.` is ignored.
    pub fn cookies_for_domain(&self, domain: &str) -> Result<Cookies> {
        let host = domain_name(domain);
        let url = Url::parse(&format!("https://{}/", host))
            .map_err(|_| Error::InvalidUrl(domain.to_string()))?;

        let store = self.lock()?;
        Ok(store
            .iter_unexpired()
            .filter(|cookie| cookie.domain.matches(&url))
            .map(|cookie| (cookie.name().to_string(), cookie.value().to_string()))
            .collect())
    }

    /// Remove every cookie called `name`, whatever its domain or path.
    ///
    /// Names are not unique across domains; all of them go.
    pub fn remove_by_name(&self, name: &str) -> Result<()> {
        let mut store = self.lock()?;
        let kept: Vec<_> = store
            .iter_any()
            .filter(|cookie| cookie.name() != name)
            .cloned()
            .map(Ok::<_, Error>)
            .collect();
        *store = CookieStore::from_cookies(kept, true)?;
        Ok(())
    }

    /// Remove all cookies
    pub fn clear(&self) {
        if let Ok(mut store) = self.store.lock() {
            *store = CookieStore::default();
        }
    }

    /// `name=value` pairs that would be sent to `url`
    pub fn request_values(&self, url: &Url) -> Result<Vec<(String, String)>> {
        let store = self.lock()?;
        Ok(store
            .get_request_values(url)
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect())
    }
}

impl reqwest::cookie::CookieStore for CookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let Ok(mut store) = self.store.lock() else {
            tracing::warn!("Cookie store poisoned, dropping cookies from {}", url);
            return;
        };

        for header in cookie_headers {
            let Ok(header) = header.to_str() else {
                continue;
            };
            if let Err(e) = store.parse(header, url) {
                tracing::warn!("Ignoring cookie from {}: {}", url, e);
            }
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let pairs = self.request_values(url).ok()?;
        if pairs.is_empty() {
            return None;
        }

        let header = pairs
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ");
        HeaderValue::from_str(&header).ok()
    }
}
