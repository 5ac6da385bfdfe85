//! Agent transport trait and the HTTP implementation.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::protocol::{AgentResponse, ExecuteRequest};

/// One network invocation against an agent endpoint.
///
/// The dispatcher owns device resolution and the loopback fallback; a
/// transport only talks to the address it is given. Tests substitute a
/// scripted implementation.
#[async_trait]
pub trait AgentTransport: Send + Sync {
    /// Execute an action on the agent at `address`, bounded by `timeout`.
    async fn invoke(
        &self,
        address: &str,
        request: &ExecuteRequest,
        timeout: Duration,
    ) -> Result<AgentResponse, TransportError>;

    /// Health-check the agent at `address`. Returns `true` when the agent
    /// answered with a success status.
    async fn probe(&self, address: &str, timeout: Duration) -> bool;
}

/// HTTP transport talking to agents on their fixed well-known port.
pub struct HttpAgentTransport {
    client: reqwest::Client,
    port: u16,
}

impl HttpAgentTransport {
    pub fn new(port: u16) -> Self {
        Self {
            client: reqwest::Client::new(),
            port,
        }
    }

    fn execute_url(&self, address: &str) -> String {
        format!("http://{}:{}/api/execute", address, self.port)
    }

    fn health_url(&self, address: &str) -> String {
        format!("http://{}:{}/health", address, self.port)
    }
}

#[async_trait]
impl AgentTransport for HttpAgentTransport {
    async fn invoke(
        &self,
        address: &str,
        request: &ExecuteRequest,
        timeout: Duration,
    ) -> Result<AgentResponse, TransportError> {
        let response = self
            .client
            .post(self.execute_url(address))
            .timeout(timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(timeout.as_millis() as u64)
                } else {
                    TransportError::Connection(e.to_string())
                }
            })?;

        response
            .json::<AgentResponse>()
            .await
            .map_err(|e| TransportError::Malformed(e.to_string()))
    }

    async fn probe(&self, address: &str, timeout: Duration) -> bool {
        match self
            .client
            .get(self.health_url(address))
            .timeout(timeout)
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute_url() {
        let transport = HttpAgentTransport::new(7410);
        assert_eq!(
            transport.execute_url("192.168.1.20"),
            "http://192.168.1.20:7410/api/execute"
        );
    }

    #[test]
    fn test_health_url() {
        let transport = HttpAgentTransport::new(7410);
        assert_eq!(
            transport.health_url("127.0.0.1"),
            "http://127.0.0.1:7410/health"
        );
    }

    #[tokio::test]
    async fn test_invoke_unreachable_host_is_connection_error() {
        // Reserved TEST-NET-1 address; nothing listens there.
        let transport = HttpAgentTransport::new(7410);
        let request = ExecuteRequest {
            plugin: "media".to_string(),
            action: "play".to_string(),
            params: serde_json::Map::new(),
        };
        let result = transport
            .invoke("192.0.2.1", &request, Duration::from_millis(200))
            .await;
        assert!(matches!(
            result.unwrap_err(),
            TransportError::Connection(_) | TransportError::Timeout(_)
        ));
    }

    #[tokio::test]
    async fn test_probe_unreachable_host_is_false() {
        let transport = HttpAgentTransport::new(7410);
        assert!(
            !transport
                .probe("192.0.2.1", Duration::from_millis(200))
                .await
        );
    }
}
