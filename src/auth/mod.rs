//! Session collaborator: token decoding, credential storage and the OAuth
//! entry/exit points of the backend.
//!
//! Nothing here verifies signatures; the backend does that on every request.

pub mod session;
pub mod store;

pub use session::{decode_token, Claims, Role, Session, SessionError};
pub use store::TokenStore;

use reqwest::Url;

/// Backend route that starts the Google OAuth redirect.
pub const LOGIN_PATH: &str = "/api/auth/google";

pub fn login_url(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), LOGIN_PATH)
}

/// Extracts the bearer token the OAuth callback appends as `?token=...`.
pub fn token_from_callback(callback_url: &str) -> Option<String> {
    let url = Url::parse(callback_url.trim()).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "token")
        .map(|(_, value)| value.trim().to_string())
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_url_joins_without_double_slash() {
        assert_eq!(
            login_url("http://localhost:8000/"),
            "http://localhost:8000/api/auth/google"
        );
    }

    #[test]
    fn callback_token_extraction() {
        assert_eq!(
            token_from_callback("http://localhost:3000/oauth/callback?token=a.b.c&x=1").as_deref(),
            Some("a.b.c")
        );
        assert_eq!(token_from_callback("http://localhost:3000/oauth/callback"), None);
        assert_eq!(token_from_callback("http://localhost:3000/cb?token="), None);
        assert_eq!(token_from_callback("not a url"), None);
    }
}
