use async_trait::async_trait;

use crate::error::RegistryError;
use crate::types::FunctionDescriptor;

/// Read-only view of the remote function registry.
#[async_trait]
pub trait FunctionRegistry: Send + Sync {
    /// All namespaces that may contain functions.
    async fn list_namespaces(&self) -> Result<Vec<String>, RegistryError>;

    /// Every function currently deployed in `namespace`.
    async fn list_functions(&self, namespace: &str)
        -> Result<Vec<FunctionDescriptor>, RegistryError>;
}
