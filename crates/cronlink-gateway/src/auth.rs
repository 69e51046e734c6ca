use std::fmt;
use std::path::Path;

use cronlink_core::config::GatewayConfig;
use tracing::info;

use crate::error::{GatewayError, Result};

const USER_FILE: &str = "basic-auth-user";
const PASSWORD_FILE: &str = "basic-auth-password";

/// Gateway basic auth credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl BasicAuth {
    /// Attach these credentials to an outbound request.
    pub fn apply(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.basic_auth(&self.username, Some(&self.password))
    }
}

/// Resolve credentials for the configured auth mode.
///
/// Returns `None` when basic auth is off. With a secret mount path the
/// `basic-auth-user` / `basic-auth-password` files win over inline values.
pub fn resolve_credentials(config: &GatewayConfig) -> Result<Option<BasicAuth>> {
    if !config.basic_auth {
        return Ok(None);
    }

    if let Some(ref dir) = config.secret_mount_path {
        let dir = Path::new(dir);
        let creds = BasicAuth {
            username: read_secret(&dir.join(USER_FILE))?,
            password: read_secret(&dir.join(PASSWORD_FILE))?,
        };
        info!(path = %dir.display(), user = %creds.username, "basic auth credentials loaded from secrets");
        return Ok(Some(creds));
    }

    match (&config.username, &config.password) {
        (Some(username), Some(password)) => Ok(Some(BasicAuth {
            username: username.clone(),
            password: password.clone(),
        })),
        _ => Err(GatewayError::Credentials(
            "no basic auth credentials provided".to_string(),
        )),
    }
}

fn read_secret(path: &Path) -> Result<String> {
    let value = std::fs::read_to_string(path)
        .map_err(|e| GatewayError::Credentials(format!("{}: {e}", path.display())))?;
    let value = value.trim();
    if value.is_empty() {
        return Err(GatewayError::Credentials(format!("{} is empty", path.display())));
    }
    Ok(value.to_string())
}
