//! Pure checks evaluated before any side-effecting call.

use super::error::WorkspaceError;
use super::schema::{ListParams, QueryState, Scope};
use crate::auth::Role;

pub const MAX_FILES_PER_UPLOAD: usize = 10;

/// Which search box the user submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Filename,
    Content,
}

pub fn check_batch_size(count: usize) -> Result<(), WorkspaceError> {
    if count > MAX_FILES_PER_UPLOAD {
        return Err(WorkspaceError::Validation(format!(
            "Maximum {MAX_FILES_PER_UPLOAD} files per upload"
        )));
    }
    Ok(())
}

pub fn check_scope(role: Role, scope: Scope) -> Result<(), WorkspaceError> {
    match (scope, role) {
        (Scope::All, Role::User) => Err(WorkspaceError::ScopeViolation),
        _ => Ok(()),
    }
}

/// Makes `mode` the active search by clearing the other term.
pub fn select_search(query: &mut QueryState, mode: SearchMode) {
    match mode {
        SearchMode::Filename => query.content_term.clear(),
        SearchMode::Content => query.filename_term.clear(),
    }
}

/// Content term wins over filename term; blanks are omitted. Paging is
/// always sent.
pub fn list_params(query: &QueryState) -> ListParams {
    let search = [&query.content_term, &query.filename_term]
        .into_iter()
        .find(|term| !term.is_empty())
        .cloned();
    let file_type = (!query.type_filter.is_empty()).then(|| query.type_filter.clone());
    ListParams {
        search,
        file_type,
        paging: query.paging,
    }
}
