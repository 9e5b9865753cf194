use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::config::GatewayConfig;
use crate::error::Error;
use crate::request::{ApiResponse, RequestDescriptor};
use crate::traits::{RequestExecutor, SessionStore, TokenRefresher};
use crate::types::AccessToken;

/// Status reported when the refresh timeout elapses.
const REFRESH_TIMEOUT_STATUS: u16 = 504;

/// Authenticated entry point for every StockLens API call.
///
/// Attaches the stored bearer token, and on a 401 runs one refresh for all
/// concurrent callers before replaying their requests with the new token.
///
/// Clones share the same refresh state.
///
/// # Example
///
/// ```rust,ignore
/// let gateway = Gateway::new(&config, executor, store, session_client);
/// let holdings = gateway
///     .execute(&RequestDescriptor::get("/portfolio/holdings"))
///     .await?
///     .data_as::<Vec<Holding>>()?;
/// ```
pub struct Gateway<E, S, R> {
    inner: Arc<Inner<E, S, R>>,
}

struct Inner<E, S, R> {
    executor: E,
    sessions: S,
    refresher: R,
    config: GatewayConfig,
    state: Arc<Mutex<RefreshState>>,
}

#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    queue: Vec<PendingEntry>,
}

/// A caller parked until the in-flight refresh settles.
struct PendingEntry {
    descriptor: RequestDescriptor,
    /// The caller's own 401, returned as-is if the refresh is refused.
    error: Error,
    reply: oneshot::Sender<Result<ApiResponse, Error>>,
}

// Manual Clone: avoid derive adding `E: Clone, S: Clone, R: Clone` bounds.
impl<E, S, R> Clone for Gateway<E, S, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E, S, R> Gateway<E, S, R>
where
    E: RequestExecutor,
    S: SessionStore,
    R: TokenRefresher,
{
    /// Create a gateway with its own refresh state.
    ///
    /// Uses the no-refresh paths and refresh timeout from `config`.
    #[must_use]
    pub fn new(config: &GatewayConfig, executor: E, sessions: S, refresher: R) -> Self {
        Self {
            inner: Arc::new(Inner {
                executor,
                sessions,
                refresher,
                config: config.clone(),
                state: Arc::new(Mutex::new(RefreshState::default())),
            }),
        }
    }

    /// Execute one request.
    ///
    /// # Errors
    ///
    /// - [`Error::Unauthenticated`] if auth is required and no token is stored
    ///   (nothing is sent).
    /// - [`Error::Network`] if no HTTP answer was received.
    /// - [`Error::Http`] for any non-2xx answer, including the original 401
    ///   when the refresh was refused and any failure of the replayed request.
    /// - Any error returned by the refresher itself.
    ///
    /// Must be called inside a Tokio runtime; the refresh cycle is spawned onto it.
    pub async fn execute(&self, descriptor: &RequestDescriptor) -> Result<ApiResponse, Error> {
        let request = self.authorize(descriptor)?;

        let error = match self.inner.executor.send(&request).await {
            Ok(response) => return Ok(response),
            Err(failure) => Error::from(failure),
        };

        if !self.should_refresh(descriptor, &error) {
            return Err(error);
        }
        self.refresh_and_replay(descriptor, error).await
    }

    /// `true` while a refresh is outstanding.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.inner.state.lock().in_flight
    }

    /// Number of callers parked behind the in-flight refresh.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    fn authorize(&self, descriptor: &RequestDescriptor) -> Result<RequestDescriptor, Error> {
        if !descriptor.require_auth || descriptor.has_authorization() {
            return Ok(descriptor.clone());
        }
        let token = self
            .inner
            .sessions
            .access_token()
            .ok_or(Error::Unauthenticated)?;
        Ok(descriptor.with_bearer(&token))
    }

    fn should_refresh(&self, descriptor: &RequestDescriptor, error: &Error) -> bool {
        error.is_unauthorized()
            && descriptor.require_auth
            && !self.inner.config.is_no_refresh(&descriptor.target)
    }

    async fn refresh_and_replay(
        &self,
        descriptor: &RequestDescriptor,
        error: Error,
    ) -> Result<ApiResponse, Error> {
        let (reply, outcome) = oneshot::channel();
        let entry = PendingEntry {
            descriptor: descriptor.clone(),
            error,
            reply,
        };

        // Check-and-set under one lock: two concurrent 401s can never both
        // see `in_flight == false`.
        let leader = {
            let mut state = self.inner.state.lock();
            if state.in_flight {
                state.queue.push(entry);
                tracing::debug!(
                    path = %descriptor.target,
                    queued = state.queue.len(),
                    "Token refresh in flight, request queued"
                );
                None
            } else {
                state.in_flight = true;
                Some((entry, CycleGuard::new(Arc::clone(&self.inner.state))))
            }
        };

        if let Some((entry, guard)) = leader {
            tracing::debug!(path = %descriptor.target, "Starting token refresh");
            // Own task, so dropping this caller does not strand the queue.
            // The guard moves in with it: a task dropped before its first
            // poll still resets the state.
            let inner = Arc::clone(&self.inner);
            tokio::spawn(inner.run_refresh_cycle(guard, entry));
        }

        outcome.await.unwrap_or_else(|_| {
            Err(Error::Network {
                status_code: crate::error::NETWORK_FAILURE_STATUS,
                message: "token refresh aborted".into(),
            })
        })
    }
}

impl<E, S, R> Inner<E, S, R>
where
    E: RequestExecutor,
    S: SessionStore,
    R: TokenRefresher,
{
    async fn run_refresh_cycle(self: Arc<Self>, guard: CycleGuard, leader: PendingEntry) {
        let outcome = self.refresh().await;

        let mut entries = guard.settle();
        entries.push(leader);

        match outcome {
            Ok(Some(token)) => {
                tracing::info!(replays = entries.len(), "Token refreshed, replaying requests");
                self.replay(entries, &token).await;
            }
            Ok(None) => {
                tracing::warn!(rejected = entries.len(), "Token refresh refused");
                for entry in entries {
                    let _ = entry.reply.send(Err(entry.error));
                }
            }
            Err(error) => {
                tracing::warn!(error = %error, rejected = entries.len(), "Token refresh failed");
                for entry in entries {
                    let _ = entry.reply.send(Err(error.clone()));
                }
            }
        }
    }

    async fn refresh(&self) -> Result<Option<AccessToken>, Error> {
        let Some(limit) = self.config.refresh_timeout else {
            return self.refresher.refresh().await;
        };
        tokio::time::timeout(limit, self.refresher.refresh())
            .await
            .unwrap_or_else(|_| {
                Err(Error::Network {
                    status_code: REFRESH_TIMEOUT_STATUS,
                    message: format!("token refresh timed out after {limit:?}"),
                })
            })
    }

    /// Re-sends each entry straight through the executor, never through
    /// `execute`, so a replayed 401 cannot start another refresh.
    async fn replay(&self, entries: Vec<PendingEntry>, token: &AccessToken) {
        let executor = &self.executor;
        join_all(entries.into_iter().map(|entry| {
            let request = entry.descriptor.with_bearer(token);
            async move {
                let result = executor.send(&request).await.map_err(Error::from);
                if let Err(e) = &result {
                    tracing::debug!(path = %request.target, error = %e, "Replayed request failed");
                }
                let _ = entry.reply.send(result);
            }
        }))
        .await;
    }
}

/// Clears `in_flight` and drains the queue exactly once per cycle.
///
/// If the cycle unwinds before settling, dropping the guard still resets the
/// state; parked callers then see their reply channel closed.
struct CycleGuard {
    state: Arc<Mutex<RefreshState>>,
    settled: bool,
}

impl CycleGuard {
    fn new(state: Arc<Mutex<RefreshState>>) -> Self {
        Self {
            state,
            settled: false,
        }
    }

    fn settle(mut self) -> Vec<PendingEntry> {
        self.settled = true;
        let mut state = self.state.lock();
        state.in_flight = false;
        std::mem::take(&mut state.queue)
    }
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        if !self.settled {
            let mut state = self.state.lock();
            state.in_flight = false;
            state.queue.clear();
        }
    }
}
