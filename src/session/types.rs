use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::{AccessToken, RefreshToken, UserId};

/// Signed-in user as reported by the login and refresh endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct UserProfile {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl UserProfile {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: UserId(id.into()),
            email: None,
            name: None,
        }
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Stored credentials of the signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Session {
    pub access_token: AccessToken,
    #[serde(default)]
    pub refresh_token: Option<RefreshToken>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

impl Session {
    #[must_use]
    pub fn new(access_token: AccessToken) -> Self {
        Self {
            access_token,
            refresh_token: None,
            expires_at: None,
            user: None,
        }
    }

    #[must_use]
    pub fn with_refresh_token(mut self, token: RefreshToken) -> Self {
        self.refresh_token = Some(token);
        self
    }

    #[must_use]
    pub fn with_expires_at(mut self, at: OffsetDateTime) -> Self {
        self.expires_at = Some(at);
        self
    }

    #[must_use]
    pub fn with_user(mut self, user: UserProfile) -> Self {
        self.user = Some(user);
        self
    }

    /// `true` once `expires_at` has passed. Sessions without expiry never expire.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Token payload returned by the login and refresh endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct TokenGrant {
    #[serde(alias = "access_token")]
    pub access_token: AccessToken,
    #[serde(default, alias = "refresh_token")]
    pub refresh_token: Option<RefreshToken>,
    #[serde(default, alias = "expires_in")]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

impl TokenGrant {
    /// Session for a fresh login.
    #[must_use]
    pub fn into_session(self, now: OffsetDateTime) -> Session {
        self.apply_to(None, now)
    }

    /// Session after a refresh: fields missing from the grant are kept from
    /// `previous`, so a rotation-less refresh keeps the old refresh token.
    #[must_use]
    pub fn apply_to(self, previous: Option<Session>, now: OffsetDateTime) -> Session {
        let (prev_refresh, prev_user) = match previous {
            Some(s) => (s.refresh_token, s.user),
            None => (None, None),
        };
        let expires_at = self
            .expires_in
            .and_then(|secs| i64::try_from(secs).ok())
            .map(|secs| now + time::Duration::seconds(secs));

        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(prev_refresh),
            expires_at,
            user: self.user.or(prev_user),
        }
    }
}

/// Email/password pair posted to the login endpoint.
#[derive(Clone, Serialize)]
#[non_exhaustive]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// Why the session was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutReason {
    /// The refresh endpoint refused the refresh token.
    RefreshRejected,
    /// A refresh was needed but no refresh token was stored.
    MissingRefreshToken,
    /// The user logged out.
    LoggedOut,
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn grant_accepts_camel_and_snake_case() {
        let camel: TokenGrant = serde_json::from_value(serde_json::json!({
            "accessToken": "a1",
            "refreshToken": "r1",
            "expiresIn": 900,
        }))
        .unwrap();
        assert_eq!(camel.access_token.as_str(), "a1");
        assert_eq!(camel.refresh_token.unwrap().as_str(), "r1");
        assert_eq!(camel.expires_in, Some(900));

        let snake: TokenGrant = serde_json::from_value(serde_json::json!({
            "access_token": "a2",
            "user": {"id": "u-1", "email": "ana@example.com"},
        }))
        .unwrap();
        assert_eq!(snake.access_token.as_str(), "a2");
        assert!(snake.refresh_token.is_none());
        assert_eq!(snake.user.unwrap().email.as_deref(), Some("ana@example.com"));
    }

    #[test]
    fn grant_keeps_previous_refresh_token_and_user() {
        let now = datetime!(2026-03-01 12:00 UTC);
        let previous = Session::new(AccessToken::new("old"))
            .with_refresh_token(RefreshToken::new("r-old"))
            .with_user(UserProfile::new("u-7"));
        let grant: TokenGrant =
            serde_json::from_value(serde_json::json!({"accessToken": "new", "expiresIn": 60}))
                .unwrap();

        let session = grant.apply_to(Some(previous), now);
        assert_eq!(session.access_token.as_str(), "new");
        assert_eq!(session.refresh_token.unwrap().as_str(), "r-old");
        assert_eq!(session.user.unwrap().id.to_string(), "u-7");
        assert_eq!(session.expires_at, Some(datetime!(2026-03-01 12:01 UTC)));
    }

    #[test]
    fn session_expiry() {
        let now = datetime!(2026-03-01 12:00 UTC);
        let session = Session::new(AccessToken::new("t"));
        assert!(!session.is_expired_at(now));
        let session = session.with_expires_at(datetime!(2026-03-01 11:59 UTC));
        assert!(session.is_expired_at(now));
    }

    #[test]
    fn session_serde_roundtrip() {
        let session = Session::new(AccessToken::new("t"))
            .with_refresh_token(RefreshToken::new("r"))
            .with_expires_at(datetime!(2026-03-01 12:00 UTC))
            .with_user(UserProfile::new("u-1").with_name("Ana"));
        let json = serde_json::to_string(&session).unwrap();
        let parsed: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, session);
    }

    #[test]
    fn credentials_debug_hides_password() {
        let creds = Credentials::new("ana@example.com", "hunter2");
        assert!(!format!("{creds:?}").contains("hunter2"));
    }
}
