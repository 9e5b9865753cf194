use parking_lot::RwLock;

use super::types::Session;
use crate::traits::SessionStore;

/// Process-local [`SessionStore`].
///
/// Suitable for CLIs, tests and single-user processes; anything that must
/// survive a restart should implement [`SessionStore`] over durable storage.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: RwLock<Option<Session>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_session(session: Session) -> Self {
        Self {
            session: RwLock::new(Some(session)),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn session(&self) -> Option<Session> {
        self.session.read().clone()
    }

    fn save(&self, session: Session) {
        *self.session.write() = Some(session);
    }

    fn clear(&self) {
        self.session.write().take();
    }
}
