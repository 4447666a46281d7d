//! Command relay to the biometric device
//!
//! The device is only reachable from the server, so enroll/delete/list commands
//! issued by the dashboard are proxied here: one synchronous GET per command,
//! bounded by the configured timeout, never retried. The dashboard polls, and
//! that is the only retry mechanism.

use async_trait::async_trait;
use fpb_common::{Action, DeviceCommand, Error, Result, SubjectId};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const USER_AGENT: &str = concat!("fpb-relay/", env!("CARGO_PKG_VERSION"));

/// Transport to the device
#[async_trait]
pub trait DeviceLink: Send + Sync {
    /// Base URL commands are resolved against
    fn base_url(&self) -> &str;

    /// Send one command and return the device's reply body verbatim
    async fn send(&self, command: &DeviceCommand) -> Result<String>;
}

/// Device reached over plain HTTP GET
pub struct HttpDeviceLink {
    http_client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpDeviceLink {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.into(),
            timeout,
        })
    }

    fn unreachable(&self, command_url: &str, err: reqwest::Error) -> Error {
        let detail = if err.is_timeout() {
            format!("{}: no response within {:?}", command_url, self.timeout)
        } else {
            format!("{}: {}", command_url, err)
        };
        Error::DeviceUnreachable {
            url: self.base_url.clone(),
            detail,
        }
    }
}

#[async_trait]
impl DeviceLink for HttpDeviceLink {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, command: &DeviceCommand) -> Result<String> {
        let url = command.url(&self.base_url);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.unreachable(&url, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.unreachable(&url, e))?;

        // The firmware answers errors with diagnostic text; hand it back as-is
        if !status.is_success() {
            warn!(url = %url, status = %status, "Device answered with non-success status");
        }

        Ok(body)
    }
}

/// Outcome of a relayed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayResult {
    /// Full URL the command was sent to
    pub command_url: String,
    /// Raw device reply; `None` only for a list refresh the device did not answer
    pub reply: Option<String>,
}

/// Turns dashboard actions into device commands and relays them
pub struct CommandDispatcher {
    link: Arc<dyn DeviceLink>,
}

impl CommandDispatcher {
    pub fn new(link: Arc<dyn DeviceLink>) -> Self {
        Self { link }
    }

    pub fn device_url(&self) -> &str {
        self.link.base_url()
    }

    /// Relay `action` to the device.
    ///
    /// Enroll and delete need a valid id; without one the device is never
    /// contacted. A list refresh succeeds as long as it was attempted. Actions
    /// served from local state are rejected.
    pub async fn dispatch(&self, action: Action, id: Option<&str>) -> Result<RelayResult> {
        if !action.is_relayed() {
            return Err(Error::InvalidAction(format!(
                "{} is not relayed to the device",
                action
            )));
        }

        let command = match action {
            Action::Enroll => DeviceCommand::Enroll(SubjectId::parse_for(action, id)?),
            Action::Delete => DeviceCommand::Delete(SubjectId::parse_for(action, id)?),
            _ => DeviceCommand::RefreshList,
        };

        let command_url = command.url(self.link.base_url());
        info!(action = %action, url = %command_url, "Relaying command to device");

        match self.link.send(&command).await {
            Ok(reply) => Ok(RelayResult {
                command_url,
                reply: Some(reply),
            }),
            Err(e) if command == DeviceCommand::RefreshList => {
                warn!(url = %command_url, "List refresh sent without acknowledgement: {}", e);
                Ok(RelayResult {
                    command_url,
                    reply: None,
                })
            }
            Err(e) => {
                warn!(
                    action = %action,
                    url = %command_url,
                    kind = e.kind(),
                    "Device relay failed: {}",
                    e
                );
                Err(e)
            }
        }
    }
}
