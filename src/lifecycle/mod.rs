//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build handler → Start listeners
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGTERM/SIGINT → broadcast → servers stop accepting and drain
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
