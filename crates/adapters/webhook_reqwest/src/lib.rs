//! # wareflow-adapter-webhook-reqwest
//!
//! HTTP webhook delivery using [reqwest](https://docs.rs/reqwest).
//!
//! One call is one attempt with a bounded timeout; the retry/backoff
//! policy lives in the engine's webhook handler. Transport failures are
//! split into transient (retryable) and permanent so the handler can
//! decide.

use std::time::Duration;

use tracing::debug;

use wareflow_app::ports::{WebhookClient, WebhookDeliveryError, WebhookRequest, WebhookResponse};

/// Default per-request deadline.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// [`WebhookClient`] backed by a shared reqwest client.
#[derive(Clone)]
pub struct ReqwestWebhookClient {
    client: reqwest::Client,
}

impl ReqwestWebhookClient {
    /// Create a client with the default request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookDeliveryError::Permanent`] if the TLS backend
    /// cannot be initialised.
    pub fn new() -> Result<Self, WebhookDeliveryError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookDeliveryError::Permanent`] if the TLS backend
    /// cannot be initialised.
    pub fn with_timeout(timeout: Duration) -> Result<Self, WebhookDeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| WebhookDeliveryError::Permanent(err.to_string()))?;
        Ok(Self { client })
    }
}

impl WebhookClient for ReqwestWebhookClient {
    async fn post(
        &self,
        request: WebhookRequest,
    ) -> Result<WebhookResponse, WebhookDeliveryError> {
        let mut builder = self
            .client
            .post(&request.url)
            .header("Content-Type", "application/json")
            .json(&request.payload);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        debug!(url = %request.url, status, "webhook delivered");
        Ok(WebhookResponse { status })
    }
}

/// Map transport errors onto the port's retryability split.
fn classify(err: reqwest::Error) -> WebhookDeliveryError {
    if err.is_timeout() {
        WebhookDeliveryError::Timeout
    } else if err.is_connect() || err.is_request() {
        WebhookDeliveryError::Transient(err.to_string())
    } else if err.is_builder() {
        WebhookDeliveryError::Permanent(err.to_string())
    } else {
        WebhookDeliveryError::Transient(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Minimal one-shot HTTP server answering every request with the
    /// given status line.
    async fn one_shot_server(status_line: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = [0_u8; 4096];
                let _ = stream.read(&mut buf).await;
                let response =
                    format!("HTTP/1.1 {status_line}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
                let _ = stream.write_all(response.as_bytes()).await;
            }
        });
        format!("http://{addr}/hook")
    }

    fn request(url: String) -> WebhookRequest {
        WebhookRequest {
            url,
            headers: BTreeMap::from([(
                "X-Wareflow-Event".to_string(),
                "order.cancelled".to_string(),
            )]),
            payload: serde_json::json!({"event": "order.cancelled"}),
        }
    }

    #[tokio::test]
    async fn should_return_status_for_successful_delivery() {
        let url = one_shot_server("204 No Content").await;
        let client = ReqwestWebhookClient::new().unwrap();

        let response = client.post(request(url)).await.unwrap();
        assert_eq!(response.status, 204);
        assert!(response.is_success());
    }

    #[tokio::test]
    async fn should_return_server_error_status_without_transport_error() {
        let url = one_shot_server("503 Service Unavailable").await;
        let client = ReqwestWebhookClient::new().unwrap();

        let response = client.post(request(url)).await.unwrap();
        assert_eq!(response.status, 503);
        assert!(response.is_server_error());
    }

    #[tokio::test]
    async fn should_classify_connection_refusal_as_transient() {
        // Bind-then-drop guarantees nothing listens on the port.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ReqwestWebhookClient::new().unwrap();
        let result = client.post(request(format!("http://{addr}/hook"))).await;

        match result {
            Err(err) => assert!(err.is_retryable(), "expected retryable, got {err}"),
            Ok(response) => panic!("expected transport error, got HTTP {}", response.status),
        }
    }
}
