//! A `document.cookie` style store: one flat, origin-wide cookie string

use crate::options::Cookies;
use crate::{Error, Result};
use cookie_store::RawCookie;
use std::sync::{Arc, Mutex, MutexGuard};
use time::OffsetDateTime;

#[derive(Debug, Clone)]
struct StoredCookie {
    name: String,
    value: String,
    expires_at: Option<OffsetDateTime>,
}

impl StoredCookie {
    fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|expires| expires <= now)
    }
}

/// Cookie string shared by every request of a fallback backend
#[derive(Debug, Clone, Default)]
pub struct DocumentCookies {
    cookies: Arc<Mutex<Vec<StoredCookie>>>,
}

impl DocumentCookies {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<StoredCookie>>> {
        self.cookies
            .lock()
            .map_err(|e| Error::Internal(format!("Failed to lock document cookies: {}", e)))
    }

    /// Assign a cookie the way `document.cookie = "..."` does.
    ///
    /// An expired cookie deletes any cookie with the same name; attributes
    /// other than `Expires` and `Max-Age` are accepted and ignored.
    pub fn set(&self, cookie: &str) -> Result<()> {
        let parsed = RawCookie::parse(cookie.to_string())
            .map_err(|e| Error::InvalidRequest(format!("Invalid cookie '{}': {}", cookie, e)))?;

        let now = OffsetDateTime::now_utc();
        // A Max-Age past the representable range means no expiry
        let expires_at = match parsed.max_age() {
            Some(max_age) => now.checked_add(max_age),
            None => parsed.expires_datetime(),
        };
        let stored = StoredCookie {
            name: parsed.name().to_string(),
            value: parsed.value().to_string(),
            expires_at,
        };

        let mut cookies = self.lock()?;
        cookies.retain(|existing| existing.name != stored.name);
        if !stored.is_expired(now) {
            cookies.push(stored);
        }
        Ok(())
    }

    /// Store a `Set-Cookie` header unless it is `HttpOnly`
    pub fn set_from_header(&self, set_cookie: &str) {
        let http_only = RawCookie::parse(set_cookie)
            .map(|cookie| cookie.http_only() == Some(true))
            .unwrap_or(false);
        if http_only {
            return;
        }
        if let Err(e) = self.set(set_cookie) {
            tracing::warn!("Ignoring Set-Cookie header: {}", e);
        }
    }

    /// The current cookie string, `name=value` pairs joined by `; `
    pub fn cookie_string(&self) -> Result<String> {
        let now = OffsetDateTime::now_utc();
        let mut cookies = self.lock()?;
        cookies.retain(|cookie| !cookie.is_expired(now));
        Ok(cookies
            .iter()
            .map(|cookie| format!("{}={}", cookie.name, cookie.value))
            .collect::<Vec<_>>()
            .join("; "))
    }

    /// Split the cookie string into a map
    pub fn cookies(&self) -> Result<Cookies> {
        let cookie_string = self.cookie_string()?;
        Ok(cookie_string
            .split(';')
            .filter_map(|pair| {
                let (name, value) = pair.split_once('=')?;
                let name = name.trim();
                (!name.is_empty()).then(|| (name.to_string(), value.trim().to_string()))
            })
            .collect())
    }

    /// Expire the cookie called `name`; unknown names are ignored
    pub fn remove(&self, name: &str) -> Result<()> {
        let name = name.trim();
        self.lock()?.retain(|cookie| cookie.name != name);
        Ok(())
    }
}
