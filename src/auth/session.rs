use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("malformed token: {0}")]
    MalformedToken(String),
    #[error("token expired at {0}")]
    Expired(DateTime<Utc>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    /// Anything other than `admin` is a plain user.
    pub fn from_claim(value: &str) -> Self {
        if value.eq_ignore_ascii_case("admin") {
            Self::Admin
        } else {
            Self::User
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

/// Claims carried in the payload segment of the backend's JWT.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
}

/// Reads the claims of a JWT without verifying its signature.
pub fn decode_token(token: &str) -> Result<Claims, SessionError> {
    let mut segments = token.trim().split('.');
    let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_), None) if !payload.is_empty() => payload,
        _ => {
            return Err(SessionError::MalformedToken(
                "expected three dot-separated segments".into(),
            ))
        }
    };
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| SessionError::MalformedToken(format!("payload is not base64url: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| SessionError::MalformedToken(format!("payload is not a claims object: {e}")))
}

/// An authenticated identity plus the bearer credential that proves it.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
    user_id: String,
    email: String,
    name: String,
    role: Role,
}

impl Session {
    pub fn new(
        token: impl Into<String>,
        user_id: impl Into<String>,
        email: impl Into<String>,
        name: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            token: token.into(),
            user_id: user_id.into(),
            email: email.into(),
            name: name.into(),
            role,
        }
    }

    pub fn from_token(token: &str) -> Result<Self, SessionError> {
        Self::from_token_at(token, Utc::now())
    }

    pub fn from_token_at(token: &str, now: DateTime<Utc>) -> Result<Self, SessionError> {
        let claims = decode_token(token)?;
        if let Some(exp) = claims.exp {
            let expires = DateTime::from_timestamp(exp, 0)
                .ok_or_else(|| SessionError::MalformedToken(format!("exp out of range: {exp}")))?;
            if expires <= now {
                return Err(SessionError::Expired(expires));
            }
        }

        let email = claims.email.unwrap_or_else(|| claims.sub.clone());
        let name = claims.name.unwrap_or_else(|| email.clone());
        let role = claims.role.as_deref().map(Role::from_claim).unwrap_or_default();
        Ok(Self {
            token: token.trim().to_string(),
            user_id: claims.sub,
            email,
            name,
            role,
        })
    }

    /// Turns a stored credential into a session. A missing, malformed or
    /// expired token all mean "logged out".
    pub fn resolve(token: Option<&str>) -> Option<Self> {
        let token = token.map(str::trim).filter(|t| !t.is_empty())?;
        match Self::from_token(token) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!("Ignoring stored token: {e}");
                None
            }
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// Keep the bearer credential out of logs.
impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("name", &self.name)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) fn encode_test_token(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}
