//! Request body types

use crate::multipart::NativeForm;
use crate::options::CapacitorFileType;
use crate::{Error, Result};
use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::PathBuf;

/// Request body types
#[derive(Debug, Clone)]
pub enum Body {
    /// A string sent as is
    Text(String),

    /// A plain object, serialized as JSON
    Json(serde_json::Value),

    /// Browser-style form data; never crosses the bridge unconverted
    FormData(FormData),

    /// Form data already converted to the `_parts` representation
    Parts(NativeForm),
}

impl Body {
    /// Create a text body
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    /// Create a JSON body
    pub fn json(value: impl Serialize) -> Result<Self> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }
}

impl From<String> for Body {
    fn from(content: String) -> Self {
        Self::Text(content)
    }
}

impl From<&str> for Body {
    fn from(content: &str) -> Self {
        Self::Text(content.to_string())
    }
}

impl From<serde_json::Value> for Body {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl From<FormData> for Body {
    fn from(form: FormData) -> Self {
        Self::FormData(form)
    }
}

impl From<NativeForm> for Body {
    fn from(form: NativeForm) -> Self {
        Self::Parts(form)
    }
}

impl Serialize for Body {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Body::Text(content) => serializer.serialize_str(content),
            Body::Json(value) => value.serialize(serializer),
            Body::Parts(form) => form.serialize(serializer),
            Body::FormData(_) => Err(serde::ser::Error::custom(
                "form data must be converted to parts before it is serialized",
            )),
        }
    }
}

impl<'de> Deserialize<'de> for Body {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;

        if let Some(form) = value
            .get("formData")
            .filter(|form| form.get("_parts").is_some())
        {
            return NativeForm::from_value(form)
                .map(Body::Parts)
                .map_err(serde::de::Error::custom);
        }
        if value.get("_parts").is_some() {
            return NativeForm::from_value(&value)
                .map(Body::Parts)
                .map_err(serde::de::Error::custom);
        }

        match value {
            serde_json::Value::String(content) => Ok(Body::Text(content)),
            other => Ok(Body::Json(other)),
        }
    }
}

/// Ordered multipart form, the way a browser `FormData` collects entries
#[derive(Debug, Clone, Default)]
pub struct FormData {
    entries: Vec<(String, FormDataValue)>,
}

/// A single form entry value
#[derive(Debug, Clone)]
pub enum FormDataValue {
    /// Plain text field
    Text(String),
    /// Binary content read when the form is converted
    Blob(Blob),
    /// A file already resident on the device
    File(CapacitorFileType),
}

impl FormData {
    /// Create an empty form
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text field
    pub fn append_text(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.entries
            .push((name.into(), FormDataValue::Text(value.into())));
        self
    }

    /// Append a blob
    pub fn append_blob(&mut self, name: impl Into<String>, blob: Blob) -> &mut Self {
        self.entries.push((name.into(), FormDataValue::Blob(blob)));
        self
    }

    /// Append a reference to a device file
    pub fn append_file(&mut self, name: impl Into<String>, file: CapacitorFileType) -> &mut Self {
        self.entries.push((name.into(), FormDataValue::File(file)));
        self
    }

    /// Entries in insertion order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &FormDataValue)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the form has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Binary form content with optional file name and mime type
#[derive(Debug, Clone)]
pub struct Blob {
    name: Option<String>,
    mime_type: Option<String>,
    source: BlobSource,
}

#[derive(Debug, Clone)]
enum BlobSource {
    Bytes(Bytes),
    Path(PathBuf),
}

impl Blob {
    /// Create a blob from bytes in memory
    pub fn from_bytes(content: impl Into<Bytes>) -> Self {
        Self {
            name: None,
            mime_type: None,
            source: BlobSource::Bytes(content.into()),
        }
    }

    /// Create a blob backed by a file that is read on conversion
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string);
        Self {
            name,
            mime_type: None,
            source: BlobSource::Path(path),
        }
    }

    /// Set the file name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the mime type
    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// File name, if any
    pub fn file_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.is_empty())
    }

    /// Mime type, if any
    pub fn content_type(&self) -> Option<&str> {
        self.mime_type.as_deref().filter(|mime| !mime.is_empty())
    }

    /// Read the whole content
    pub async fn read(&self) -> Result<Bytes> {
        match &self.source {
            BlobSource::Bytes(content) => Ok(content.clone()),
            BlobSource::Path(path) => tokio::fs::read(path).await.map(Bytes::from).map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to read {}: {}", path.display(), e),
                ))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multipart::NativePart;

    #[test]
    fn string_body_deserializes_as_text() {
        let body: Body = serde_json::from_value(serde_json::json!("hello")).unwrap();
        assert!(matches!(body, Body::Text(ref s) if s == "hello"));
    }

    #[test]
    fn plain_object_deserializes_as_json() {
        let body: Body = serde_json::from_value(serde_json::json!({"a": 1})).unwrap();
        match body {
            Body::Json(value) => assert_eq!(value["a"], 1),
            other => panic!("Expected Body::Json, got {:?}", other),
        }
    }

    #[test]
    fn parts_object_deserializes_as_parts() {
        let body: Body = serde_json::from_value(serde_json::json!({
            "_parts": [["field", "value"]]
        }))
        .unwrap();
        match body {
            Body::Parts(form) => {
                assert_eq!(form.parts().len(), 1);
                assert_eq!(form.parts()[0].1, NativePart::Scalar("value".to_string()));
            }
            other => panic!("Expected Body::Parts, got {:?}", other),
        }
    }

    #[test]
    fn nested_form_data_deserializes_as_parts() {
        let body: Body = serde_json::from_value(serde_json::json!({
            "formData": {"_parts": [["a", "1"], ["b", "2"]]}
        }))
        .unwrap();
        match body {
            Body::Parts(form) => assert_eq!(form.parts().len(), 2),
            other => panic!("Expected Body::Parts, got {:?}", other),
        }
    }

    #[test]
    fn form_data_refuses_to_serialize() {
        let mut form = FormData::new();
        form.append_text("a", "b");
        assert!(serde_json::to_value(Body::FormData(form)).is_err());
    }

    #[tokio::test]
    async fn blob_from_missing_path_fails_to_read() {
        let blob = Blob::from_path("/definitely/not/here.bin");
        assert_eq!(blob.file_name(), Some("here.bin"));
        assert!(blob.read().await.is_err());
    }
}
