//! Session glue: stored credentials, login/refresh/logout, sign-out signals.
//!
//! The gateway only ever reads the access token. Everything that writes the
//! session lives here.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stocklens_client::{Gateway, GatewayConfig, HttpExecutor};
//! use stocklens_client::session::{Credentials, MemorySessionStore, SessionClient};
//!
//! let config = GatewayConfig::from_env()?;
//! let executor = Arc::new(HttpExecutor::from_config(&config)?);
//! let store = Arc::new(MemorySessionStore::new());
//! let sessions = Arc::new(SessionClient::new(&config, executor.clone(), store.clone()));
//!
//! sessions.login(&Credentials::new("ana@example.com", "secret")).await?;
//! let gateway = Gateway::new(&config, executor, store, sessions.clone());
//! ```

mod client;
mod events;
mod store;
mod types;

pub use client::SessionClient;
pub use events::SessionEvents;
pub use store::MemorySessionStore;
pub use types::{Credentials, Session, SignOutReason, TokenGrant, UserProfile};
