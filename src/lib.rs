//! HTTP plugin with SSL pinning, cookie management and file downloads
//!
//! [`NativeHttp`] exposes four operations (`fetch`, `get_cookies`,
//! `remove_cookie_by_name` and `toggle_logging`) over one of two backends:
//!
//! - the **native** backend (feature `native`, on by default) pins
//!   certificates or public keys, keeps an RFC 6265 cookie jar and can
//!   stream responses into storage directories;
//! - the **fallback** backend behaves the same for callers but offers no
//!   pinning and keeps cookies in a flat document cookie string.
//!
//! ```no_run
//! # async fn example() -> nativehttp::Result<()> {
//! use nativehttp::{Method, NativeHttp, Options};
//!
//! let http = NativeHttp::new()?;
//! let response = http
//!     .fetch(
//!         "https://api.example.com/items",
//!         Options::new().method(Method::Get).ssl_pinning(["api"]),
//!     )
//!     .await?;
//! println!("{} {:?}", response.status, response.text());
//! # Ok(())
//! # }
//! ```
//!
//! Plugin hosts talk JSON through [`bridge::PluginCall`] and
//! [`NativeHttp::handle`].

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]

pub use backend::fallback::{DocumentCookies, FallbackBackend};
#[cfg(feature = "native")]
pub use backend::native::{NativeBackend, cookie_jar::CookieJar, storage::DirectoryRoots};
pub use backend::{Backend, BackendConfig};
pub use body::{Blob, Body, FormData, FormDataValue};
pub use error::{Error, Rejection, Result};
pub use multipart::{NativeForm, NativePart, convert_form_data};
pub use options::{
    CapacitorFileType, Cookies, Directory, Header, Method, Options, ResponseType, SslPinning,
};
pub use plugin::{NativeHttp, NativeHttpBuilder};
pub use response::{Response, ResponseBody};

pub mod backend;
pub mod bridge;
mod body;
mod error;
mod multipart;
mod options;
mod plugin;
mod response;
