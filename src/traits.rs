use std::future::Future;
use std::sync::Arc;

use crate::error::{Error, ExecutorFailure};
use crate::request::{ApiResponse, RequestDescriptor};
use crate::session::Session;
use crate::types::{AccessToken, RefreshToken};

/// Performs exactly one network request, with no credential handling.
///
/// [`HttpExecutor`](crate::HttpExecutor) is the reqwest-backed implementation.
///
/// # Example
///
/// ```rust,ignore
/// impl RequestExecutor for RecordingExecutor {
///     async fn send(&self, request: &RequestDescriptor) -> Result<ApiResponse, ExecutorFailure> {
///         self.sent.lock().push(request.clone());
///         Ok(ApiResponse::new(200))
///     }
/// }
/// ```
pub trait RequestExecutor: Send + Sync + 'static {
    /// Send the request as-is.
    ///
    /// Any non-2xx answer or transport failure is reported as an
    /// [`ExecutorFailure`]; `status_code` is `None` when no response arrived.
    fn send(
        &self,
        request: &RequestDescriptor,
    ) -> impl Future<Output = Result<ApiResponse, ExecutorFailure>> + Send;
}

/// Consumer-provided session persistence.
///
/// The gateway only calls [`access_token`](SessionStore::access_token);
/// writes come from the [`TokenRefresher`] and the session client.
pub trait SessionStore: Send + Sync + 'static {
    /// Current session, if signed in.
    fn session(&self) -> Option<Session>;

    /// Persist a new session, replacing the previous one.
    fn save(&self, session: Session);

    /// Drop the stored session (sign-out).
    fn clear(&self);

    fn access_token(&self) -> Option<AccessToken> {
        self.session().map(|s| s.access_token)
    }

    fn refresh_token(&self) -> Option<RefreshToken> {
        self.session().and_then(|s| s.refresh_token)
    }
}

/// Obtains a fresh access token.
///
/// Implementations persist the new session themselves. `Ok(None)` means the
/// refresh was definitively refused; `Err` means the attempt itself failed.
pub trait TokenRefresher: Send + Sync + 'static {
    fn refresh(&self) -> impl Future<Output = Result<Option<AccessToken>, Error>> + Send;
}

impl<T: RequestExecutor> RequestExecutor for Arc<T> {
    fn send(
        &self,
        request: &RequestDescriptor,
    ) -> impl Future<Output = Result<ApiResponse, ExecutorFailure>> + Send {
        (**self).send(request)
    }
}

impl<T: SessionStore> SessionStore for Arc<T> {
    fn session(&self) -> Option<Session> {
        (**self).session()
    }

    fn save(&self, session: Session) {
        (**self).save(session);
    }

    fn clear(&self) {
        (**self).clear();
    }

    fn access_token(&self) -> Option<AccessToken> {
        (**self).access_token()
    }

    fn refresh_token(&self) -> Option<RefreshToken> {
        (**self).refresh_token()
    }
}

impl<T: TokenRefresher> TokenRefresher for Arc<T> {
    fn refresh(&self) -> impl Future<Output = Result<Option<AccessToken>, Error>> + Send {
        (**self).refresh()
    }
}
