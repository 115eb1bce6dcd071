//! reqwest implementation of [`CallbackSender`].

use crate::domain::{CallbackPayload, DeliveryError, DispatchConfig};
use crate::ports::CallbackSender;
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, REFERER};
use tracing::debug;

/// POSTs callback payloads as JSON.
#[derive(Clone)]
pub struct HttpCallbackSender {
    client: reqwest::Client,
    referer: String,
}

impl HttpCallbackSender {
    pub fn new(config: &DispatchConfig) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| DeliveryError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            referer: config.referer.clone(),
        })
    }
}

#[async_trait]
impl CallbackSender for HttpCallbackSender {
    async fn send(&self, url: &str, payload: &CallbackPayload) -> Result<u16, DeliveryError> {
        let body = serde_json::to_vec(payload)?;

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(REFERER, &self.referer)
            .body(body)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        debug!(url, status, "[qc-18] Callback endpoint responded");
        Ok(status)
    }
}
