//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! DispatchRequest (method, uri, content type, headers, body, timeout)
//!     → handler.rs (strip prefix, pick worker, record outcome)
//!     → rpc.rs (RpcClient boundary)
//!     → hyper_client.rs (default HTTP implementation)
//!     → DispatchResponse (headers, body, status, error)
//! ```

pub mod handler;
pub mod hyper_client;
pub mod rpc;

pub use handler::{DispatchHandler, DispatchRequest, DispatchResponse};
pub use hyper_client::HyperRpcClient;
pub use rpc::{RpcClient, RpcRequest, RpcResponse};
