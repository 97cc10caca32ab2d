//! HTTP forwarder between the storefront widget and the hosted model.
//!
//! Stateless: each request is relayed with the server-held credential and
//! answered with the upstream body, or with a diagnostic error message.

pub mod config;
pub mod error;
pub mod http_server;
pub mod relay;
