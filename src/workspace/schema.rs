use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A file as listed by the storage backend.
///
/// Records are never edited client-side; a refresh replaces the whole list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub file_type: String,
    #[serde(default)]
    pub size: u64,
    pub created_at: CreatedAt,
    /// Only present in the admin (all files) listing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

/// Creation timestamp as sent by the backend, plus its parsed instant.
///
/// The backend emits naive ISO timestamps (`2024-01-01T10:00:00.123456`),
/// RFC 3339 or bare dates depending on the code path. Naive values are read
/// as UTC. Unparseable values are kept verbatim and sort before everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedAt {
    raw: String,
    millis: Option<i64>,
}

impl CreatedAt {
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let millis = parse_timestamp(raw.trim()).map(|t| t.timestamp_millis());
        Self { raw, millis }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Milliseconds since the Unix epoch, if the raw value parsed.
    pub fn timestamp_millis(&self) -> Option<i64> {
        self.millis
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(t.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

impl Serialize for CreatedAt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for CreatedAt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(raw))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Date,
    Size,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// Which files the workspace is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// The caller's own files.
    #[default]
    Mine,
    /// Every user's files. Admin sessions only.
    All,
}

/// Page size the backend uses when none is requested.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Window of the listing to load, sent as `skip`/`limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paging {
    pub skip: u32,
    pub limit: u32,
}

impl Default for Paging {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Paging {
    /// 1-based page of `limit` records. Page 0 is read as the first page.
    pub fn page(page: u32, limit: u32) -> Self {
        Self {
            skip: page.saturating_sub(1).saturating_mul(limit),
            limit,
        }
    }
}

/// User-chosen search, filter, paging and sort parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueryState {
    pub filename_term: String,
    pub content_term: String,
    /// Empty means any type.
    pub type_filter: String,
    pub paging: Paging,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    pub scope: Scope,
}

/// Query parameters of a list request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListParams {
    pub search: Option<String>,
    pub file_type: Option<String>,
    pub paging: Paging,
}

/// Everything the presentation layer renders besides the query itself.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorkspaceState {
    pub files: Vec<FileRecord>,
    pub loading: bool,
    pub error: Option<String>,
    pub uploading: bool,
    /// Coarse: 0 while idle or in flight, 100 once the server acknowledged.
    pub upload_progress: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_file_listing() {
        let json = r#"[{"id":"1","name":"a.txt","type":"text/plain","size":10,"created_at":"2024-01-01"}]"#;
        let files: Vec<FileRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_type, "text/plain");
        assert_eq!(files[0].owner, None);
        assert_eq!(files[0].created_at.as_str(), "2024-01-01");
        assert_eq!(files[0].created_at.timestamp_millis(), Some(1_704_067_200_000));
    }

    #[test]
    fn admin_listing_carries_owner() {
        let json = r#"{"id":"9","name":"b.pdf","type":".pdf","size":1,"created_at":"2024-03-05T10:11:12.5","owner":"ann@example.com"}"#;
        let file: FileRecord = serde_json::from_str(json).unwrap();
        assert_eq!(file.owner.as_deref(), Some("ann@example.com"));
        assert!(file.created_at.timestamp_millis().is_some());
    }

    #[test]
    fn timestamp_formats() {
        let naive = CreatedAt::parse("2024-01-01T00:00:01");
        let zoned = CreatedAt::parse("2024-01-01T02:00:01+02:00");
        assert_eq!(naive.timestamp_millis(), zoned.timestamp_millis());
        assert_eq!(
            CreatedAt::parse("2024-01-01 00:00:01.250").timestamp_millis(),
            Some(1_704_067_201_250)
        );
        assert_eq!(CreatedAt::parse("yesterday").timestamp_millis(), None);
    }

    #[test]
    fn created_at_serializes_verbatim() {
        let json = serde_json::to_string(&CreatedAt::parse("2024-01-01")).unwrap();
        assert_eq!(json, "\"2024-01-01\"");
    }

    #[test]
    fn pages_map_to_offsets() {
        assert_eq!(Paging::default(), Paging { skip: 0, limit: 50 });
        assert_eq!(Paging::page(1, 20), Paging { skip: 0, limit: 20 });
        assert_eq!(Paging::page(3, 20), Paging { skip: 40, limit: 20 });
        assert_eq!(Paging::page(0, 20), Paging::page(1, 20));
        assert_eq!(Paging::page(u32::MAX, 50).skip, u32::MAX);
    }

    #[test]
    fn sort_order_toggles() {
        assert_eq!(SortOrder::Asc.toggled(), SortOrder::Desc);
        assert_eq!(SortOrder::default().toggled(), SortOrder::Asc);
    }
}
