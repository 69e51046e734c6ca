//! `cronlink-gateway`: HTTP collaborators for the function gateway.
//!
//! [`GatewayClient`] lists namespaces and functions from `/system/*`;
//! [`GatewayInvoker`] triggers functions on `/function/` or
//! `/async-function/` and publishes each [`cronlink_core::InvocationResult`]
//! on an unbounded channel.

pub mod auth;
pub mod client;
pub mod error;
pub mod invoker;

#[cfg(test)]
mod test_support;

pub use auth::{resolve_credentials, BasicAuth};
pub use client::GatewayClient;
pub use error::{GatewayError, Result};
pub use invoker::{GatewayInvoker, CONNECTOR_NAME};

/// Shared HTTP client with the configured upstream timeout.
pub fn build_http_client(timeout: std::time::Duration) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("cronlink/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()?;
    Ok(client)
}
