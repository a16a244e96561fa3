//! Multipart body adapter
//!
//! Native HTTP stacks cannot consume a browser-style [`FormData`], so before a
//! form crosses the bridge it is flattened into a [`NativeForm`]: an ordered
//! list of `(name, part)` pairs serialized as `{"_parts": [[name, value], ...]}`.
//! Blobs are read and base64 encoded, device files travel by URI and plain
//! fields pass through unchanged.

use crate::body::{FormData, FormDataValue};
use crate::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::ser::{SerializeMap, SerializeTuple};
use serde::{Serialize, Serializer};
use serde_json::Value;

const DEFAULT_BLOB_NAME: &str = "upload.bin";
const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// One converted form entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativePart {
    /// Binary content carried inline as base64
    Data {
        /// File name
        name: String,
        /// Mime type
        mime_type: String,
        /// Base64 without a `data:` prefix
        data: String,
    },
    /// A device file referenced by URI, read by the native side
    Reference {
        /// File name
        name: String,
        /// Mime type
        mime_type: String,
        /// Native URI or filesystem path
        uri: String,
    },
    /// Plain text field
    Scalar(String),
}

/// Form data in the `_parts` representation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NativeForm {
    parts: Vec<(String, NativePart)>,
}

impl NativeForm {
    /// Create from already converted parts
    pub fn new(parts: Vec<(String, NativePart)>) -> Self {
        Self { parts }
    }

    /// Parts in order
    pub fn parts(&self) -> &[(String, NativePart)] {
        &self.parts
    }

    /// Decode a `{"_parts": [...]}` object.
    ///
    /// Keys may be strings or integers. An object value is a file part when it
    /// has a `type` and one of `data`, `uri` or `path`; `fileName` wins over
    /// `name`. Anything else is a scalar.
    pub fn from_value(value: &Value) -> Result<Self> {
        let raw_parts = value
            .get("_parts")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::InvalidRequest("form data has no _parts array".to_string()))?;

        let mut parts = Vec::with_capacity(raw_parts.len());
        for raw in raw_parts {
            let pair = raw
                .as_array()
                .filter(|pair| pair.len() == 2)
                .ok_or_else(|| Error::InvalidRequest(format!("malformed form part: {}", raw)))?;

            let key = match &pair[0] {
                Value::String(key) => key.clone(),
                Value::Number(key) => key.to_string(),
                other => {
                    return Err(Error::InvalidRequest(format!(
                        "form part key must be a string or number, got {}",
                        other
                    )));
                }
            };

            parts.push((key, Self::decode_part(&pair[1])));
        }

        Ok(Self { parts })
    }

    fn decode_part(value: &Value) -> NativePart {
        if let Value::Object(map) = value {
            let location = map
                .get("uri")
                .or_else(|| map.get("path"))
                .and_then(Value::as_str);
            let data = map.get("data").and_then(Value::as_str);

            if map.contains_key("type") && (location.is_some() || data.is_some()) {
                let mime_type = map
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or(DEFAULT_MIME_TYPE)
                    .to_string();
                let name = map
                    .get("fileName")
                    .or_else(|| map.get("name"))
                    .and_then(Value::as_str)
                    .unwrap_or(DEFAULT_BLOB_NAME)
                    .to_string();

                return match data {
                    Some(data) => NativePart::Data {
                        name,
                        mime_type,
                        data: data.to_string(),
                    },
                    None => NativePart::Reference {
                        name,
                        mime_type,
                        uri: location.unwrap_or_default().to_string(),
                    },
                };
            }
        }

        match value {
            Value::String(text) => NativePart::Scalar(text.clone()),
            other => NativePart::Scalar(other.to_string()),
        }
    }

    /// Encode as a multipart/form-data body for reqwest.
    ///
    /// Inline data is base64 decoded; references are read from a `file://`
    /// URI or a plain path.
    pub async fn to_multipart(&self) -> Result<reqwest::multipart::Form> {
        let mut form = reqwest::multipart::Form::new();

        for (key, part) in &self.parts {
            let part = match part {
                NativePart::Scalar(text) => reqwest::multipart::Part::text(text.clone()),
                NativePart::Data {
                    name,
                    mime_type,
                    data,
                } => file_part(STANDARD.decode(data)?, name, mime_type)?,
                NativePart::Reference {
                    name,
                    mime_type,
                    uri,
                } => {
                    let path = local_path(uri)?;
                    let content = tokio::fs::read(&path).await?;
                    file_part(content, name, mime_type)?
                }
            };
            form = form.part(key.clone(), part);
        }

        Ok(form)
    }
}

impl Serialize for NativeForm {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("_parts", &PartList(&self.parts))?;
        map.end()
    }
}

struct PartList<'a>(&'a [(String, NativePart)]);

impl Serialize for PartList<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter().map(|(key, part)| PartPair(key, part)))
    }
}

struct PartPair<'a>(&'a str, &'a NativePart);

impl Serialize for PartPair<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(self.0)?;
        tuple.serialize_element(self.1)?;
        tuple.end()
    }
}

impl Serialize for NativePart {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            NativePart::Scalar(text) => serializer.serialize_str(text),
            NativePart::Data {
                name,
                mime_type,
                data,
            } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("name", name)?;
                map.serialize_entry("type", mime_type)?;
                map.serialize_entry("data", data)?;
                map.end()
            }
            NativePart::Reference {
                name,
                mime_type,
                uri,
            } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("name", name)?;
                map.serialize_entry("type", mime_type)?;
                map.serialize_entry("uri", uri)?;
                map.end()
            }
        }
    }
}

/// Convert a form into the `_parts` representation.
///
/// Entries keep their order. A failed blob read fails the whole conversion.
pub async fn convert_form_data(form: &FormData) -> Result<NativeForm> {
    let mut parts = Vec::with_capacity(form.len());

    for (key, value) in form.entries() {
        let part = match value {
            FormDataValue::Blob(blob) => {
                let content = blob.read().await?;
                NativePart::Data {
                    name: blob.file_name().unwrap_or(DEFAULT_BLOB_NAME).to_string(),
                    mime_type: blob.content_type().unwrap_or(DEFAULT_MIME_TYPE).to_string(),
                    data: STANDARD.encode(&content),
                }
            }
            FormDataValue::File(file) => {
                let uri = file.location().ok_or_else(|| Error::MissingFileLocation {
                    field: key.to_string(),
                })?;
                NativePart::Reference {
                    name: file.name.clone(),
                    mime_type: file.mime_type.clone(),
                    uri: uri.to_string(),
                }
            }
            FormDataValue::Text(text) => NativePart::Scalar(text.clone()),
        };
        parts.push((key.to_string(), part));
    }

    Ok(NativeForm { parts })
}

/// Encode a form directly as multipart/form-data, reading every file
pub(crate) async fn form_data_to_multipart(form: &FormData) -> Result<reqwest::multipart::Form> {
    let mut multipart = reqwest::multipart::Form::new();

    for (key, value) in form.entries() {
        let part = match value {
            FormDataValue::Text(text) => reqwest::multipart::Part::text(text.clone()),
            FormDataValue::Blob(blob) => file_part(
                blob.read().await?.to_vec(),
                blob.file_name().unwrap_or("blob"),
                blob.content_type().unwrap_or(DEFAULT_MIME_TYPE),
            )?,
            FormDataValue::File(file) => {
                let location = file.location().ok_or_else(|| Error::MissingFileLocation {
                    field: key.to_string(),
                })?;
                let content = tokio::fs::read(local_path(location)?).await?;
                file_part(content, &file.name, &file.mime_type)?
            }
        };
        multipart = multipart.part(key.to_string(), part);
    }

    Ok(multipart)
}

fn file_part(content: Vec<u8>, name: &str, mime_type: &str) -> Result<reqwest::multipart::Part> {
    reqwest::multipart::Part::bytes(content)
        .file_name(name.to_string())
        .mime_str(mime_type)
        .map_err(|e| Error::InvalidRequest(format!("Invalid content type {}: {}", mime_type, e)))
}

/// Filesystem path for a `file://` URI or a plain path
pub(crate) fn local_path(location: &str) -> Result<std::path::PathBuf> {
    if location.starts_with("file:") {
        let url = url::Url::parse(location).map_err(|_| Error::InvalidUrl(location.to_string()))?;
        return url
            .to_file_path()
            .map_err(|_| Error::InvalidUrl(location.to_string()));
    }
    if location.contains("://") {
        return Err(Error::InvalidRequest(format!(
            "Unsupported file location: {}",
            location
        )));
    }
    Ok(std::path::PathBuf::from(location))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Blob;
    use crate::options::CapacitorFileType;
    use serde_json::json;

    #[tokio::test]
    async fn scalar_fields_keep_order_and_values() {
        let mut form = FormData::new();
        form.append_text("b", "2")
            .append_text("a", "1")
            .append_text("b", "3");

        let converted = convert_form_data(&form).await.unwrap();

        assert_eq!(
            serde_json::to_value(&converted).unwrap(),
            json!({"_parts": [["b", "2"], ["a", "1"], ["b", "3"]]})
        );
    }

    #[tokio::test]
    async fn blob_becomes_plain_base64() {
        let mut form = FormData::new();
        form.append_blob(
            "avatar",
            Blob::from_bytes(&b"\x00\x01binary\xff"[..])
                .name("a.bin")
                .mime_type("image/png"),
        );

        let converted = convert_form_data(&form).await.unwrap();
        let (key, part) = &converted.parts()[0];

        assert_eq!(key, "avatar");
        match part {
            NativePart::Data {
                name,
                mime_type,
                data,
            } => {
                assert_eq!(name, "a.bin");
                assert_eq!(mime_type, "image/png");
                assert!(!data.starts_with("data:"));
                assert_eq!(STANDARD.decode(data).unwrap(), b"\x00\x01binary\xff");
            }
            other => panic!("Expected NativePart::Data, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn unnamed_blob_gets_defaults() {
        let mut form = FormData::new();
        form.append_blob("raw", Blob::from_bytes(vec![1u8, 2, 3]));

        let converted = convert_form_data(&form).await.unwrap();

        assert_eq!(
            serde_json::to_value(&converted).unwrap(),
            json!({"_parts": [["raw", {
                "name": "upload.bin",
                "type": "application/octet-stream",
                "data": "AQID"
            }]]})
        );
    }

    #[tokio::test]
    async fn file_reference_is_not_read() {
        let mut form = FormData::new();
        form.append_file(
            "doc",
            CapacitorFileType::from_path("doc.pdf", "application/pdf", "/no/such/doc.pdf"),
        );

        let converted = convert_form_data(&form).await.unwrap();

        assert_eq!(
            converted.parts()[0].1,
            NativePart::Reference {
                name: "doc.pdf".to_string(),
                mime_type: "application/pdf".to_string(),
                uri: "/no/such/doc.pdf".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn file_reference_keeps_empty_name_and_type() {
        let mut form = FormData::new();
        form.append_file("doc", CapacitorFileType::new("", "", "content://docs/1"));

        let converted = convert_form_data(&form).await.unwrap();

        assert_eq!(
            converted.parts()[0].1,
            NativePart::Reference {
                name: String::new(),
                mime_type: String::new(),
                uri: "content://docs/1".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn file_reference_without_location_fails() {
        let mut form = FormData::new();
        form.append_file(
            "doc",
            CapacitorFileType {
                name: "doc.pdf".to_string(),
                mime_type: "application/pdf".to_string(),
                uri: None,
                path: None,
            },
        );

        let result = convert_form_data(&form).await;
        assert!(matches!(result, Err(Error::MissingFileLocation { ref field }) if field == "doc"));
    }

    #[tokio::test]
    async fn unreadable_blob_fails_whole_conversion() {
        let mut form = FormData::new();
        form.append_text("ok", "fine")
            .append_blob("bad", Blob::from_path("/no/such/file.bin"));

        assert!(convert_form_data(&form).await.is_err());
    }

    #[test]
    fn decode_accepts_numeric_keys_and_file_name() {
        let form = NativeForm::from_value(&json!({"_parts": [
            [7, "seven"],
            ["upload", {"type": "text/plain", "data": "aGk=", "fileName": "hi.txt", "name": "ignored"}],
            ["local", {"type": "text/plain", "path": "/tmp/x.txt"}],
            ["flag", true],
            ["meta", {"type": "text/plain"}]
        ]}))
        .unwrap();

        let parts = form.parts();
        assert_eq!(parts[0], ("7".to_string(), NativePart::Scalar("seven".to_string())));
        assert_eq!(
            parts[1].1,
            NativePart::Data {
                name: "hi.txt".to_string(),
                mime_type: "text/plain".to_string(),
                data: "aGk=".to_string(),
            }
        );
        assert_eq!(
            parts[2].1,
            NativePart::Reference {
                name: "upload.bin".to_string(),
                mime_type: "text/plain".to_string(),
                uri: "/tmp/x.txt".to_string(),
            }
        );
        assert_eq!(parts[3].1, NativePart::Scalar("true".to_string()));
        assert!(matches!(parts[4].1, NativePart::Scalar(_)));
    }

    #[test]
    fn decode_rejects_missing_parts() {
        assert!(NativeForm::from_value(&json!({"fields": []})).is_err());
        assert!(NativeForm::from_value(&json!({"_parts": [["only-key"]]})).is_err());
    }

    #[test]
    fn local_path_handles_file_uris() {
        assert_eq!(
            local_path("file:///tmp/a%20b.txt").unwrap(),
            std::path::PathBuf::from("/tmp/a b.txt")
        );
        assert_eq!(
            local_path("/tmp/plain.txt").unwrap(),
            std::path::PathBuf::from("/tmp/plain.txt")
        );
        assert!(local_path("content://media/1").is_err());
    }
}
