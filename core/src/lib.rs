// Core generative-language functionality shared by the proxy and the widget:
// - API client for the hosted model
// - Request/response data structures
// - Unified configuration loading
// - Shared error types

// Export client module - API client for the hosted model
pub mod client;
pub use client::*;

// Export types module - Request/response data structures
pub mod types;
pub use types::*;

// Export config module - Configuration loading
pub mod config;
pub use config::*;

// Export errors module - Shared error types
pub mod errors;
pub use errors::*;
