use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::Error;
use crate::types::AccessToken;

pub const AUTHORIZATION: &str = "Authorization";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the request body is put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Json,
    /// `application/x-www-form-urlencoded`
    Form,
}

/// How a successful response body is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseType {
    #[default]
    Json,
    Text,
}

/// Description of one intended API call.
///
/// Built by the caller; the gateway only clones it to attach credentials.
///
/// ```rust,ignore
/// let req = RequestDescriptor::get("/portfolio/holdings")
///     .with_query("symbol", "AAPL");
/// let login = RequestDescriptor::post("/auth/login")
///     .with_json(serde_json::json!({"email": email, "password": password}))
///     .public();
/// ```
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct RequestDescriptor {
    pub target: String,
    pub method: Method,
    pub body: Option<JsonValue>,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub require_auth: bool,
    pub encoding: Encoding,
    pub response_type: ResponseType,
}

impl RequestDescriptor {
    /// New authenticated request with a JSON body encoding and JSON response.
    #[must_use]
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            method,
            body: None,
            headers: Vec::new(),
            query: Vec::new(),
            require_auth: true,
            encoding: Encoding::default(),
            response_type: ResponseType::default(),
        }
    }

    #[must_use]
    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::Get, target)
    }

    #[must_use]
    pub fn post(target: impl Into<String>) -> Self {
        Self::new(Method::Post, target)
    }

    #[must_use]
    pub fn put(target: impl Into<String>) -> Self {
        Self::new(Method::Put, target)
    }

    #[must_use]
    pub fn patch(target: impl Into<String>) -> Self {
        Self::new(Method::Patch, target)
    }

    #[must_use]
    pub fn delete(target: impl Into<String>) -> Self {
        Self::new(Method::Delete, target)
    }

    /// Mark the request as not needing credentials (`require_auth = false`).
    #[must_use]
    pub fn public(mut self) -> Self {
        self.require_auth = false;
        self
    }

    #[must_use]
    pub fn with_require_auth(mut self, require_auth: bool) -> Self {
        self.require_auth = require_auth;
        self
    }

    #[must_use]
    pub fn with_json(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self.encoding = Encoding::Json;
        self
    }

    #[must_use]
    pub fn with_form(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self.encoding = Encoding::Form;
        self
    }

    /// Set a header, replacing any existing header with the same name.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    /// Header value by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn has_authorization(&self) -> bool {
        self.header(AUTHORIZATION).is_some()
    }

    /// Copy of this request carrying `Authorization: Bearer <token>`.
    #[must_use]
    pub fn with_bearer(&self, token: &AccessToken) -> Self {
        self.clone().with_header(AUTHORIZATION, token.bearer())
    }

    fn set_header(&mut self, name: String, value: String) {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.headers.push((name, value));
    }
}

/// Successful API answer: `{status, message?, data?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ApiResponse {
    pub status: u16,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<JsonValue>,
}

impl ApiResponse {
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            message: None,
            data: None,
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: JsonValue) -> Self {
        self.data = Some(data);
        self
    }

    /// Decode `data` into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if `data` is absent or does not match `T`.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, Error> {
        let data = self
            .data
            .clone()
            .ok_or_else(|| Error::Decode("response has no data".into()))?;
        serde_json::from_value(data).map_err(|e| Error::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_require_auth() {
        let req = RequestDescriptor::get("/me");
        assert!(req.require_auth);
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.encoding, Encoding::Json);
        assert_eq!(req.response_type, ResponseType::Json);
        assert!(!req.public().require_auth);
    }

    #[test]
    fn headers_are_case_insensitive() {
        let req = RequestDescriptor::get("/me").with_header("authorization", "Bearer x");
        assert!(req.has_authorization());
        assert_eq!(req.header("AUTHORIZATION"), Some("Bearer x"));
    }

    #[test]
    fn with_bearer_replaces_existing_authorization() {
        let req = RequestDescriptor::get("/me").with_header("authorization", "Bearer old");
        let replayed = req.with_bearer(&AccessToken::new("new"));
        assert_eq!(replayed.header(AUTHORIZATION), Some("Bearer new"));
        assert_eq!(replayed.headers.len(), 1);
        // original untouched
        assert_eq!(req.header(AUTHORIZATION), Some("Bearer old"));
    }

    #[test]
    fn form_body_sets_encoding() {
        let req = RequestDescriptor::post("/alerts").with_form(serde_json::json!({"a": "1"}));
        assert_eq!(req.encoding, Encoding::Form);
        assert!(req.body.is_some());
    }

    #[test]
    fn data_as_decodes_payload() {
        #[derive(Deserialize)]
        struct Quote {
            symbol: String,
            price: f64,
        }

        let resp = ApiResponse::new(200).with_data(serde_json::json!({"symbol": "MSFT", "price": 411.5}));
        let quote: Quote = resp.data_as().unwrap();
        assert_eq!(quote.symbol, "MSFT");
        assert!((quote.price - 411.5).abs() < f64::EPSILON);
    }

    #[test]
    fn data_as_without_data_is_decode_error() {
        let resp = ApiResponse::new(204);
        assert!(matches!(resp.data_as::<JsonValue>(), Err(Error::Decode(_))));
    }
}
