//! JSON call surface for plugin hosts
//!
//! A host hands over `{ "method": ..., "args": {...} }` and gets back either
//! a JSON result or a [`Rejection`](crate::Rejection).

use crate::options::Options;
use crate::plugin::NativeHttp;
use crate::{Error, Rejection, Result};
use serde::Deserialize;
use serde_json::Value;

/// A call as received from the host
#[derive(Debug, Clone, Deserialize)]
pub struct PluginCall {
    /// Method name, e.g. `fetch`
    pub method: String,
    /// Method arguments
    #[serde(default)]
    pub args: Value,
}

impl PluginCall {
    /// Create a call
    pub fn new(method: impl Into<String>, args: Value) -> Self {
        Self {
            method: method.into(),
            args,
        }
    }
}

#[derive(Deserialize)]
struct FetchArgs {
    url: String,
    options: Options,
}

#[derive(Deserialize)]
struct GetCookiesArgs {
    #[serde(default)]
    domain: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoveCookieArgs {
    cookie_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToggleLoggingArgs {
    #[serde(default)]
    enable_logging: bool,
}

impl NativeHttp {
    /// Dispatch a host call
    pub async fn handle(&self, call: PluginCall) -> Result<Value> {
        tracing::debug!("Plugin call: {}", call.method);

        match call.method.as_str() {
            "fetch" => {
                let args: FetchArgs = serde_json::from_value(call.args)?;
                let response = self.fetch(&args.url, args.options).await?;
                Ok(serde_json::to_value(response)?)
            }
            "getCookies" => {
                let args: GetCookiesArgs = serde_json::from_value(call.args)?;
                Ok(serde_json::to_value(self.get_cookies(&args.domain)?)?)
            }
            "removeCookieByName" => {
                let args: RemoveCookieArgs = serde_json::from_value(call.args)?;
                self.remove_cookie_by_name(&args.cookie_name)?;
                Ok(Value::Null)
            }
            "toggleLogging" => {
                let args: ToggleLoggingArgs = serde_json::from_value(call.args)?;
                self.toggle_logging(args.enable_logging)?;
                Ok(Value::Null)
            }
            other => Err(Error::Unimplemented(other.to_string())),
        }
    }

    /// Dispatch a host call, mapping failures to rejections
    pub async fn handle_call(&self, call: PluginCall) -> std::result::Result<Value, Rejection> {
        self.handle(call).await.map_err(|e| {
            tracing::debug!("Rejecting plugin call: {}", e);
            e.rejection()
        })
    }
}
