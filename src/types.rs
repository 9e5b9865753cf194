use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// Bearer access token issued by the StockLens API.
///
/// `Debug` is redacted so tokens never end up in logs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, From, Into)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `Authorization` header value for this token.
    #[must_use]
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

impl From<&str> for AccessToken {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Long-lived refresh token, exchanged for a new [`AccessToken`].
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, From, Into)]
#[serde(transparent)]
pub struct RefreshToken(String);

impl RefreshToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RefreshToken(***)")
    }
}

/// Platform user identifier (opaque string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct UserId(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_header_value() {
        let token = AccessToken::new("abc123");
        assert_eq!(token.bearer(), "Bearer abc123");
    }

    #[test]
    fn tokens_are_redacted_in_debug() {
        let access = AccessToken::from("secret-access");
        let refresh = RefreshToken::new("secret-refresh");
        assert!(!format!("{access:?}").contains("secret"));
        assert!(!format!("{refresh:?}").contains("secret"));
    }

    #[test]
    fn token_serde_is_transparent() {
        let token = AccessToken::new("t1");
        assert_eq!(serde_json::to_string(&token).unwrap(), "\"t1\"");
        let parsed: RefreshToken = serde_json::from_str("\"r1\"").unwrap();
        assert_eq!(parsed.as_str(), "r1");
    }

    #[test]
    fn user_id_from_string() {
        let id = UserId::from("user-42".to_string());
        assert_eq!(id.to_string(), "user-42");
    }
}
