//! Response handling

use crate::options::Header;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::path::PathBuf;

/// Mime type reported when the server sends none
pub(crate) const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// HTTP response
#[derive(Debug, Clone)]
pub struct Response {
    /// Status code
    pub status: u16,
    /// Response headers
    pub headers: Header,
    /// Final URL after redirects
    pub url: String,
    /// Body, shaped by the requested response type
    pub body: ResponseBody,
}

/// Response body, one variant per delivery shape
#[derive(Debug, Clone)]
pub enum ResponseBody {
    /// UTF-8 text
    Text(String),
    /// Base64 of the body bytes
    Base64 {
        /// Base64 data
        data: String,
        /// Mime type of the body
        mime_type: String,
    },
    /// Raw bytes
    Blob {
        /// Body bytes
        data: Bytes,
        /// Mime type of the body
        mime_type: String,
    },
    /// Body saved to a file
    File {
        /// Where the body was written
        path: PathBuf,
        /// Mime type of the body
        mime_type: String,
    },
    /// Body bytes plus a URL naming a local copy of them
    ObjectUrl {
        /// Body bytes
        data: Bytes,
        /// `file://` URL of the local copy
        url: String,
        /// Mime type of the body
        mime_type: String,
    },
}

impl Response {
    /// Check if the response status indicates success (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get a header value, ignoring case
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// The text body, if the response was decoded as text
    pub fn text(&self) -> Option<&str> {
        match &self.body {
            ResponseBody::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("status", &self.status)?;
        map.serialize_entry("headers", &self.headers)?;
        map.serialize_entry("url", &self.url)?;

        match &self.body {
            ResponseBody::Text(text) => map.serialize_entry("bodyString", text)?,
            ResponseBody::Base64 { data, mime_type } => map.serialize_entry(
                "fileDetails",
                &FileDetails {
                    data: Some(data.as_str()),
                    mime_type,
                    ..FileDetails::default()
                },
            )?,
            ResponseBody::File { path, mime_type } => map.serialize_entry(
                "fileDetails",
                &FileDetails {
                    path: Some(path.to_string_lossy().into_owned()),
                    mime_type,
                    ..FileDetails::default()
                },
            )?,
            ResponseBody::Blob { data, mime_type } => {
                map.serialize_entry("data", &STANDARD.encode(data))?;
                map.serialize_entry("mimeType", mime_type)?;
            }
            ResponseBody::ObjectUrl {
                data,
                url,
                mime_type,
            } => {
                map.serialize_entry("data", &STANDARD.encode(data))?;
                map.serialize_entry(
                    "fileDetails",
                    &FileDetails {
                        url: Some(url.as_str()),
                        mime_type,
                        ..FileDetails::default()
                    },
                )?;
            }
        }

        map.end()
    }
}

#[derive(Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileDetails<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    mime_type: &'a str,
}

/// Response headers as a name to value map; repeated headers are joined with `, `.
///
/// Names arrive lower-cased from the HTTP stack.
pub(crate) fn header_map(headers: &http::HeaderMap) -> Header {
    let mut result = Header::new();
    for name in headers.keys() {
        let values: Vec<&str> = headers
            .get_all(name)
            .iter()
            .filter_map(|value| match value.to_str() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Skipping non-ASCII value for header {}", name);
                    None
                }
            })
            .collect();
        if values.is_empty() {
            continue;
        }
        result.insert(name.as_str().to_string(), values.join(", "));
    }
    result
}

/// Mime type from a Content-Type header, or the octet-stream default
pub(crate) fn mime_type(headers: &http::HeaderMap) -> String {
    headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or(DEFAULT_MIME_TYPE)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(body: ResponseBody) -> Response {
        Response {
            status: 200,
            headers: Header::from([("content-type".to_string(), "text/plain".to_string())]),
            url: "https://example.com/".to_string(),
            body,
        }
    }

    #[test]
    fn text_serializes_as_body_string() {
        let value = serde_json::to_value(response(ResponseBody::Text("hi".into()))).unwrap();
        assert_eq!(value["bodyString"], "hi");
        assert_eq!(value["status"], 200);
        assert_eq!(value["url"], "https://example.com/");
        assert_eq!(value["headers"]["content-type"], "text/plain");
    }

    #[test]
    fn base64_serializes_as_file_details() {
        let value = serde_json::to_value(response(ResponseBody::Base64 {
            data: "aGk=".into(),
            mime_type: "text/plain".into(),
        }))
        .unwrap();
        assert_eq!(
            value["fileDetails"],
            json!({"data": "aGk=", "mimeType": "text/plain"})
        );
    }

    #[test]
    fn file_serializes_path() {
        let value = serde_json::to_value(response(ResponseBody::File {
            path: PathBuf::from("/data/out.bin"),
            mime_type: "application/pdf".into(),
        }))
        .unwrap();
        assert_eq!(
            value["fileDetails"],
            json!({"path": "/data/out.bin", "mimeType": "application/pdf"})
        );
    }

    #[test]
    fn repeated_headers_are_joined() {
        let mut headers = http::HeaderMap::new();
        headers.append("x-multi", "a".parse().unwrap());
        headers.append("x-multi", "b".parse().unwrap());
        headers.insert("content-type", "image/png".parse().unwrap());

        let map = header_map(&headers);
        assert_eq!(map["x-multi"], "a, b");
        assert_eq!(mime_type(&headers), "image/png");
        assert_eq!(mime_type(&http::HeaderMap::new()), DEFAULT_MIME_TYPE);
    }
}
