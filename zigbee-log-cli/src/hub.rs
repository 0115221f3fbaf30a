//! Hub connection settings
//!
//! The capture and push utilities authenticate against the Hubitat web UI
//! with a session cookie. Both read `hubitat-config.json` from the working
//! directory; validation errors carry operator instructions since this file
//! is hand-written.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const CONFIG_FILE: &str = "hubitat-config.json";

const PLACEHOLDER_IP: &str = "PLEASE_REPLACE_WITH_YOUR_HUBITAT_IP";
const PLACEHOLDER_SESSION: &str = "PLEASE_REPLACE_WITH_YOUR_HUBSESSION_COOKIE";

/// Connection settings for one Hubitat hub
#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    #[serde(default)]
    pub hub_ip: String,
    #[serde(default)]
    pub hub_session: String,
}

impl HubConfig {
    /// Load and validate the config file from the working directory
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| {
            format!(
                "{} not found. Please create it with your hub's IP address and session cookie.",
                path.display()
            )
        })?;
        let config: HubConfig = serde_json::from_str(&text).with_context(|| {
            format!("Invalid JSON in {}. Please check its content.", path.display())
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.hub_ip.is_empty() || self.hub_ip == PLACEHOLDER_IP {
            bail!("Hub IP not configured in {CONFIG_FILE}. Please update it.");
        }
        if self.hub_session.is_empty() || self.hub_session == PLACEHOLDER_SESSION {
            bail!(
                "HUBSESSION cookie not configured in {CONFIG_FILE}. Please update it.\n\
                 You can get this from your browser's developer tools when logged into \
                 the Hubitat web interface."
            );
        }
        Ok(())
    }

    /// Cookie header value for authenticated requests
    pub fn cookie(&self) -> String {
        format!("HUBSESSION={}", self.hub_session)
    }

    /// Websocket endpoint streaming the live radio log
    pub fn log_socket_url(&self) -> String {
        format!("ws://{}/logsocket", self.hub_ip)
    }

    /// Code upload endpoint; `script_type` is `app` or `driver`
    pub fn push_url(&self, script_type: &str) -> String {
        format!("http://{}/{script_type}/saveOrUpdateJson", self.hub_ip)
    }
}
