//! Client for a bearer-token file-storage backend.
//!
//! [`workspace::WorkspaceController`] holds the dashboard state and drives
//! the REST API in [`api`]; [`auth`] turns stored tokens into sessions.

pub mod api;
pub mod auth;
pub mod config;
pub mod logging;
pub mod workspace;

pub use api::{ApiError, FileApi, HttpFileApi};
pub use auth::{Role, Session, TokenStore};
pub use config::Config;
pub use workspace::{WorkspaceController, WorkspaceError, WorkspacePorts, WorkspaceState};
