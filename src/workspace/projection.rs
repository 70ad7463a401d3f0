//! Read-only derivations of the loaded file list for display.

use std::collections::BTreeSet;

use super::schema::{FileRecord, SortBy, SortOrder};

/// Returns a freshly ordered copy of `files`.
///
/// The sort is stable in both directions: records with equal keys keep
/// their relative order from the input.
pub fn sorted(files: &[FileRecord], sort_by: SortBy, order: SortOrder) -> Vec<FileRecord> {
    let mut view = files.to_vec();
    view.sort_by(|a, b| {
        let ord = match sort_by {
            SortBy::Date => a
                .created_at
                .timestamp_millis()
                .cmp(&b.created_at.timestamp_millis()),
            SortBy::Size => a.size.cmp(&b.size),
        };
        match order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
    view
}

/// Distinct `type` values of the loaded page, sorted. Feeds the type filter.
/// A record without a type contributes the empty string.
pub fn unique_file_types(files: &[FileRecord]) -> Vec<String> {
    files
        .iter()
        .map(|f| f.file_type.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}
