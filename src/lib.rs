#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod gateway;
#[cfg(feature = "http")]
pub mod http;
pub mod request;
pub mod session;
pub mod traits;
pub mod types;

// Re-exports for convenient access
pub use config::GatewayConfig;
pub use error::{Error, ExecutorFailure};
pub use gateway::Gateway;
#[cfg(feature = "http")]
pub use http::HttpExecutor;
pub use request::{ApiResponse, Encoding, Method, RequestDescriptor, ResponseType};
pub use session::{MemorySessionStore, Session, SessionClient};
pub use traits::{RequestExecutor, SessionStore, TokenRefresher};
pub use types::{AccessToken, RefreshToken, UserId};
