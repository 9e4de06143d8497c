//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → balancer section builds the DispatchHandler
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the worker set never changes at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, BalancerConfig, LimitsConfig, ListenerConfig, ObservabilityConfig, ProxyConfig,
    TimeoutConfig,
};
