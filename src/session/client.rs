use time::OffsetDateTime;

use super::events::SessionEvents;
use super::types::{Credentials, Session, SignOutReason, TokenGrant};
use crate::config::GatewayConfig;
use crate::error::Error;
use crate::request::RequestDescriptor;
use crate::traits::{RequestExecutor, SessionStore, TokenRefresher};
use crate::types::AccessToken;

/// Login, refresh and logout against the StockLens auth endpoints.
///
/// Owns all writes to the [`SessionStore`]. Plugs into the gateway as its
/// [`TokenRefresher`].
pub struct SessionClient<E, S> {
    executor: E,
    sessions: S,
    login_path: String,
    refresh_path: String,
    events: SessionEvents,
}

impl<E: RequestExecutor, S: SessionStore> SessionClient<E, S> {
    /// Create a session client using the auth paths from `config`.
    #[must_use]
    pub fn new(config: &GatewayConfig, executor: E, sessions: S) -> Self {
        Self {
            executor,
            sessions,
            login_path: config.login_path.clone(),
            refresh_path: config.refresh_path.clone(),
            events: SessionEvents::new(),
        }
    }

    /// Share an existing sign-out broadcaster.
    #[must_use]
    pub fn with_events(mut self, events: SessionEvents) -> Self {
        self.events = events;
        self
    }

    #[must_use]
    pub fn events(&self) -> &SessionEvents {
        &self.events
    }

    /// Receiver for sign-out signals.
    #[must_use]
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<SignOutReason> {
        self.events.subscribe()
    }

    #[must_use]
    pub fn sessions(&self) -> &S {
        &self.sessions
    }

    /// Log in with email and password and store the resulting session.
    ///
    /// # Errors
    ///
    /// Returns the normalized executor error if the login endpoint fails, or
    /// [`Error::Decode`] if it answers without a usable token grant.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, Error> {
        let body =
            serde_json::to_value(credentials).map_err(|e| Error::Decode(e.to_string()))?;
        let request = RequestDescriptor::post(self.login_path.as_str())
            .with_json(body)
            .public();

        let response = self.executor.send(&request).await?;
        let grant: TokenGrant = response.data_as()?;
        let session = grant.into_session(OffsetDateTime::now_utc());
        self.sessions.save(session.clone());

        tracing::info!(
            user_id = ?session.user.as_ref().map(|u| u.id.to_string()),
            "Login successful"
        );
        Ok(session)
    }

    /// Drop the stored session and notify subscribers.
    pub fn logout(&self) {
        self.sessions.clear();
        self.events.sign_out(SignOutReason::LoggedOut);
    }

    async fn refresh_session(&self) -> Result<Option<AccessToken>, Error> {
        let previous = self.sessions.session();
        let Some(refresh_token) = previous.as_ref().and_then(|s| s.refresh_token.clone()) else {
            tracing::warn!("Token refresh needed but no refresh token is stored");
            self.sessions.clear();
            self.events.sign_out(SignOutReason::MissingRefreshToken);
            return Ok(None);
        };

        let request = RequestDescriptor::post(self.refresh_path.as_str())
            .with_json(serde_json::json!({ "refreshToken": refresh_token.as_str() }))
            .public();

        match self.executor.send(&request).await.map_err(Error::from) {
            Ok(response) => {
                let grant: TokenGrant = response.data_as()?;
                let session = grant.apply_to(previous, OffsetDateTime::now_utc());
                let token = session.access_token.clone();
                self.sessions.save(session);
                tracing::info!("Access token refreshed");
                Ok(Some(token))
            }
            Err(Error::Http { status_code, message, .. })
                if matches!(status_code, 400 | 401 | 403) =>
            {
                tracing::warn!(status_code, message = %message, "Refresh token rejected");
                self.sessions.clear();
                self.events.sign_out(SignOutReason::RefreshRejected);
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed");
                Err(e)
            }
        }
    }
}

impl<E: RequestExecutor, S: SessionStore> TokenRefresher for SessionClient<E, S> {
    fn refresh(
        &self,
    ) -> impl std::future::Future<Output = Result<Option<AccessToken>, Error>> + Send {
        self.refresh_session()
    }
}
