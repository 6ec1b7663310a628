//! KK Scanner HTTP gateway
//!
//! REST endpoints over scan sessions plus a WebSocket event stream.

pub mod error;
pub mod health_api;
pub mod server;
pub mod session_registry;
pub mod sessions_api;
pub mod ws_server;

pub use error::{ApiError, ApiResult};
pub use server::{AppState, body_limit, build_router, start_server};
pub use session_registry::{SessionRegistry, SharedSession};
