use tokio::sync::broadcast;

use super::types::SignOutReason;

const CHANNEL_CAPACITY: usize = 16;

/// Broadcasts sign-out signals to whoever renders the signed-in UI.
///
/// Sending with no subscribers is not an error.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    tx: broadcast::Sender<SignOutReason>,
}

impl SessionEvents {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SignOutReason> {
        self.tx.subscribe()
    }

    pub(crate) fn sign_out(&self, reason: SignOutReason) {
        tracing::warn!(?reason, "Session signed out");
        let _ = self.tx.send(reason);
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_sign_out() {
        let events = SessionEvents::new();
        let mut rx1 = events.subscribe();
        let mut rx2 = events.clone().subscribe();

        events.sign_out(SignOutReason::RefreshRejected);

        assert_eq!(rx1.recv().await.unwrap(), SignOutReason::RefreshRejected);
        assert_eq!(rx2.recv().await.unwrap(), SignOutReason::RefreshRejected);
    }

    #[test]
    fn sign_out_without_subscribers_is_silent() {
        SessionEvents::new().sign_out(SignOutReason::LoggedOut);
    }
}
