use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use transpak_core::a2a::protocol::{ExternalTransport, TransportError};
use transpak_core::a2a::types::A2aMessage;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Forwards A2A messages to agents registered with an HTTP endpoint.
pub struct HttpExternalTransport {
    http: reqwest::Client,
}

impl HttpExternalTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| TransportError::Transport(error.to_string()))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl ExternalTransport for HttpExternalTransport {
    async fn deliver(
        &self,
        endpoint: &str,
        bearer: Option<&SecretString>,
        message: &A2aMessage,
    ) -> Result<Value, TransportError> {
        let mut request = self.http.post(endpoint).json(message);
        if let Some(token) = bearer {
            request = request.bearer_auth(token.expose_secret());
        }

        let response =
            request.send().await.map_err(|error| TransportError::Transport(error.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        response.json::<Value>().await.map_err(|error| TransportError::Body(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use transpak_core::a2a::protocol::{ExternalTransport, TransportError};
    use transpak_core::a2a::types::{A2aMessage, CommunicationMode};

    use super::HttpExternalTransport;

    #[tokio::test]
    async fn refused_connection_is_a_transport_error() {
        let transport = HttpExternalTransport::new(Duration::from_secs(2)).expect("client");
        let message = A2aMessage::new(
            "external_client",
            "partner_agent",
            "task_request",
            json!({"skill_id": "analyze_shipment"}),
            CommunicationMode::Json,
            None,
        );

        let error = transport
            .deliver("http://127.0.0.1:1/a2a", None, &message)
            .await
            .expect_err("nothing listens on port 1");
        assert!(matches!(error, TransportError::Transport(_)));
    }
}
