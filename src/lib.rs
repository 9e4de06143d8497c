//! Round-robin request dispatcher with a per-worker circuit breaker.

pub mod admin;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod resilience;

pub use config::schema::ProxyConfig;
pub use dispatch::{DispatchHandler, DispatchRequest, DispatchResponse};
pub use error::{DispatchError, RpcError, SetupError};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
