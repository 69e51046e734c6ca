use async_trait::async_trait;
use cronlink_core::{FunctionDescriptor, FunctionRegistry, RegistryError};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::auth::BasicAuth;

/// Registry client backed by the gateway's `/system` API.
pub struct GatewayClient {
    client: reqwest::Client,
    base_url: String,
    credentials: Option<BasicAuth>,
}

impl GatewayClient {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        credentials: Option<BasicAuth>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            credentials,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, RegistryError> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.get(&url).query(query);
        if let Some(ref creds) = self.credentials {
            req = creds.apply(req);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| RegistryError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RegistryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        resp.json()
            .await
            .map_err(|e| RegistryError::Decode(e.to_string()))
    }
}

#[async_trait]
impl FunctionRegistry for GatewayClient {
    /// Providers without namespace support return an empty list; that is
    /// reported as the single default namespace `""`.
    async fn list_namespaces(&self) -> Result<Vec<String>, RegistryError> {
        let namespaces: Vec<String> = self.get_json("/system/namespaces", &[]).await?;
        if namespaces.is_empty() {
            debug!("gateway reports no namespaces, using the default namespace");
            return Ok(vec![String::new()]);
        }
        Ok(namespaces)
    }

    async fn list_functions(
        &self,
        namespace: &str,
    ) -> Result<Vec<FunctionDescriptor>, RegistryError> {
        if namespace.is_empty() {
            self.get_json("/system/functions", &[]).await
        } else {
            self.get_json("/system/functions", &[("namespace", namespace)])
                .await
        }
    }
}
