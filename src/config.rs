use std::borrow::Cow;
use std::time::Duration;

use url::Url;

use crate::error::Error;

const DEFAULT_LOGIN_PATH: &str = "/auth/login";
const DEFAULT_REFRESH_PATH: &str = "/auth/refresh-token";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(15);

/// StockLens API client configuration.
///
/// The base URL is the only required field, so it is a constructor parameter.
///
/// ```rust,ignore
/// use stocklens_client::GatewayConfig;
///
/// let config = GatewayConfig::new("https://api.stocklens.app/v1/".parse()?)
///     .with_refresh_timeout(None)
///     .with_no_refresh_paths(vec!["/auth/login".into(), "/auth/refresh-token".into(), "/auth/otp".into()]);
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct GatewayConfig {
    pub(crate) base_url: Url,
    pub(crate) login_path: String,
    pub(crate) refresh_path: String,
    /// `None` until set explicitly; falls back to the login and refresh paths.
    pub(crate) no_refresh_paths: Option<Vec<String>>,
    pub(crate) request_timeout: Duration,
    pub(crate) refresh_timeout: Option<Duration>,
}

impl GatewayConfig {
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            login_path: DEFAULT_LOGIN_PATH.into(),
            refresh_path: DEFAULT_REFRESH_PATH.into(),
            no_refresh_paths: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            refresh_timeout: Some(DEFAULT_REFRESH_TIMEOUT),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `STOCKLENS_API_URL`: API base URL
    ///
    /// # Optional env vars
    /// - `STOCKLENS_LOGIN_PATH`: login endpoint (default `/auth/login`)
    /// - `STOCKLENS_REFRESH_PATH`: refresh endpoint (default `/auth/refresh-token`)
    /// - `STOCKLENS_NO_REFRESH_PATHS`: comma-separated URL substrings whose 401s
    ///   never trigger a refresh (default: login and refresh paths)
    /// - `STOCKLENS_REQUEST_TIMEOUT_SECS`: per-request timeout (default 30)
    /// - `STOCKLENS_REFRESH_TIMEOUT_SECS`: refresh timeout, `0` disables (default 15)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the base URL is missing or any value is invalid.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the base URL is missing or any value is invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let base_url: Url = lookup("STOCKLENS_API_URL")
            .ok_or_else(|| Error::Config("STOCKLENS_API_URL is required".into()))?
            .parse()
            .map_err(|e| Error::Config(format!("STOCKLENS_API_URL: {e}")))?;

        let mut config = Self::new(base_url);

        if let Some(path) = lookup("STOCKLENS_LOGIN_PATH") {
            config.login_path = path.trim().to_string();
        }
        if let Some(path) = lookup("STOCKLENS_REFRESH_PATH") {
            config.refresh_path = path.trim().to_string();
        }
        if let Some(paths) = lookup("STOCKLENS_NO_REFRESH_PATHS") {
            config.no_refresh_paths = Some(
                paths
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(ToString::to_string)
                    .collect(),
            );
        }

        if let Some(secs) = lookup("STOCKLENS_REQUEST_TIMEOUT_SECS") {
            let secs = parse_secs("STOCKLENS_REQUEST_TIMEOUT_SECS", &secs)?;
            if secs == 0 {
                return Err(Error::Config(
                    "STOCKLENS_REQUEST_TIMEOUT_SECS must be greater than zero".into(),
                ));
            }
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = lookup("STOCKLENS_REFRESH_TIMEOUT_SECS") {
            let secs = parse_secs("STOCKLENS_REFRESH_TIMEOUT_SECS", &secs)?;
            config.refresh_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    #[must_use]
    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    /// Replace the list of URL substrings whose 401s never trigger a refresh.
    ///
    /// Once set, later [`with_login_path`](Self::with_login_path) and
    /// [`with_refresh_path`](Self::with_refresh_path) calls leave it alone.
    #[must_use]
    pub fn with_no_refresh_paths(mut self, paths: Vec<String>) -> Self {
        self.no_refresh_paths = Some(paths);
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// `None` lets a refresh run until the refresher itself gives up.
    #[must_use]
    pub fn with_refresh_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    #[must_use]
    pub fn refresh_path(&self) -> &str {
        &self.refresh_path
    }

    /// URL substrings whose 401s never trigger a refresh: the explicit list,
    /// or else the current login and refresh paths.
    #[must_use]
    pub fn no_refresh_paths(&self) -> Cow<'_, [String]> {
        match &self.no_refresh_paths {
            Some(paths) => Cow::Borrowed(paths),
            None => Cow::Owned(vec![self.login_path.clone(), self.refresh_path.clone()]),
        }
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    #[must_use]
    pub fn refresh_timeout(&self) -> Option<Duration> {
        self.refresh_timeout
    }

    /// `true` if a 401 from `target` must never start a refresh.
    #[must_use]
    pub fn is_no_refresh(&self, target: &str) -> bool {
        self.no_refresh_paths()
            .iter()
            .any(|p| !p.is_empty() && target.contains(p.as_str()))
    }
}

fn parse_secs(key: &str, value: &str) -> Result<u64, Error> {
    value
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("{key}: {e}")))
}
