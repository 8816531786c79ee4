//! The HTTP façade (C5), auth middleware (C6), and WebSocket bridge (C7)
//! that front the kernel manager.

pub mod auth;
pub mod channels;
pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod openapi;
pub mod routes;

pub use channels::{NoopChannelConnector, UpstreamChannelConnector};
pub use config::Config;
pub use routes::{AppState, build_router};
