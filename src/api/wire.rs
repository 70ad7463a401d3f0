use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ApiError;
use crate::workspace::FileRecord;

/// Acknowledgement of `POST /api/files/upload`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadAck {
    pub uploaded: Vec<UploadedFile>,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadedFile {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: String,
    pub size: u64,
}

/// Decodes a list response. A JSON value that is not an array is an empty
/// list; a body that is not JSON, or an array of malformed records, fails.
pub fn decode_file_list(body: &[u8]) -> Result<Vec<FileRecord>, ApiError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| ApiError::Decode(e.to_string()))?;
    match value {
        Value::Array(_) => {
            serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
        }
        other => {
            tracing::warn!("File list response is not an array ({}), treating as empty", kind(&other));
            Ok(Vec::new())
        }
    }
}

/// Upload acks are informational; an unexpected body still counts as success.
pub fn decode_upload_ack(body: &[u8]) -> UploadAck {
    serde_json::from_slice(body).unwrap_or_default()
}

/// Server-supplied message of an error body: FastAPI's `detail`, or `message`.
pub fn error_detail(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    ["detail", "message"]
        .into_iter()
        .filter_map(|key| value.get(key).and_then(Value::as_str))
        .map(str::trim)
        .find(|msg| !msg.is_empty())
        .map(str::to_string)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_array_of_records() {
        let body = br#"[{"id":"1","name":"a.txt","type":"text/plain","size":10,"created_at":"2024-01-01"}]"#;
        let files = decode_file_list(body).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "a.txt");
    }

    #[test]
    fn non_array_payload_is_empty() {
        assert!(decode_file_list(br#"{"files":[]}"#).unwrap().is_empty());
        assert!(decode_file_list(b"null").unwrap().is_empty());
    }

    #[test]
    fn non_json_or_malformed_records_fail() {
        assert!(matches!(decode_file_list(b"<html>"), Err(ApiError::Decode(_))));
        assert!(matches!(
            decode_file_list(br#"[{"name":"no id"}]"#),
            Err(ApiError::Decode(_))
        ));
    }

    #[test]
    fn upload_ack_is_lenient() {
        let ack = decode_upload_ack(
            br#"{"uploaded":[{"id":"x","name":"a.txt","type":".txt","size":3}],"count":1}"#,
        );
        assert_eq!(ack.count, 1);
        assert_eq!(ack.uploaded[0].file_type, ".txt");
        assert_eq!(decode_upload_ack(b""), UploadAck::default());
        assert_eq!(decode_upload_ack(br#"{"success":true}"#).count, 0);
    }

    #[test]
    fn detail_extraction() {
        assert_eq!(
            error_detail(br#"{"detail":"Maximum 10 files per upload"}"#).as_deref(),
            Some("Maximum 10 files per upload")
        );
        assert_eq!(error_detail(br#"{"message":"quota"}"#).as_deref(), Some("quota"));
        assert_eq!(error_detail(br#"{"detail":[{"loc":["body"]}]}"#), None);
        assert_eq!(error_detail(br#"{"detail":"  "}"#), None);
        assert_eq!(error_detail(b"Internal Server Error"), None);
    }
}
