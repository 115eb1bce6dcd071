//! HTTP client for the node's registration API.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use super::types::*;

/// Errors that can occur when communicating with the registration API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{code}: {msg}")]
    Remote { code: String, msg: String },
    #[error("Failed to parse response: {0}")]
    Parse(String),
    #[error("Connection failed: {0}")]
    Connection(String),
}

/// Registration API client.
pub struct CallbacksApiClient {
    client: Client,
    base_url: String,
}

impl CallbacksApiClient {
    /// Create a client for the node at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(2))
            .build()
            .map_err(ApiError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn unwrap_envelope<R: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<R, ApiError> {
        let envelope: Envelope<R> = response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;

        match envelope {
            Envelope::Success { data } => Ok(data),
            Envelope::Fail { code, msg } => Err(ApiError::Remote { code, msg }),
        }
    }

    fn map_send_error(&self, e: reqwest::Error) -> ApiError {
        if e.is_connect() {
            ApiError::Connection(format!("Cannot connect to {}", self.base_url))
        } else {
            ApiError::Http(e)
        }
    }

    async fn post<P: Serialize, R: DeserializeOwned>(
        &self,
        route: &str,
        body: &P,
    ) -> Result<R, ApiError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, route))
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        Self::unwrap_envelope(response).await
    }

    /// Register `url` for `address`.
    pub async fn add_address_callback(&self, address: &str, url: &str) -> Result<bool, ApiError> {
        let body = AddressCallbackRequest {
            address: address.to_string(),
            url: url.to_string(),
        };
        self.post("/add-address-callback", &body).await
    }

    /// URLs registered for `address`, in registration order.
    pub async fn list_address_callbacks(&self, address: &str) -> Result<Vec<String>, ApiError> {
        let body = ListCallbacksRequest {
            address: address.to_string(),
        };
        self.post("/list-address-callbacks", &body).await
    }

    /// Remove `url` from `address`.
    pub async fn remove_address_callback(
        &self,
        address: &str,
        url: &str,
    ) -> Result<bool, ApiError> {
        let body = AddressCallbackRequest {
            address: address.to_string(),
            url: url.to_string(),
        };
        self.post("/remove-address-callback", &body).await
    }

    /// Recent delivery outcomes, optionally only the failed ones.
    pub async fn delivery_log(&self, dead_letters: bool) -> Result<Vec<DeliveryRecord>, ApiError> {
        let response = self
            .client
            .get(format!("{}/delivery-log", self.base_url))
            .query(&[("dead_letters", dead_letters)])
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        Self::unwrap_envelope(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ADDRESS: &str = "sample address should be of length more than 42 - 1";

    #[tokio::test]
    async fn test_add_sends_address_and_url() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/add-address-callback"))
            .and(body_json(json!({"address": ADDRESS, "url": "https://example.com"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"status": "success", "data": true})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = CallbacksApiClient::new(format!("{}/", mock_server.uri())).unwrap();
        assert!(client
            .add_address_callback(ADDRESS, "https://example.com")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_list_returns_urls() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/list-address-callbacks"))
            .and(body_json(json!({"address": ADDRESS})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": ["https://example.com/1", "https://example.com/2"]
            })))
            .mount(&mock_server)
            .await;

        let client = CallbacksApiClient::new(mock_server.uri()).unwrap();
        let urls = client.list_address_callbacks(ADDRESS).await.unwrap();
        assert_eq!(urls, ["https://example.com/1", "https://example.com/2"]);
    }

    #[tokio::test]
    async fn test_fail_envelope_becomes_remote_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/remove-address-callback"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "status": "fail",
                "code": "CALLBACK_NOT_FOUND",
                "msg": "callback url not found for address"
            })))
            .mount(&mock_server)
            .await;

        let client = CallbacksApiClient::new(mock_server.uri()).unwrap();
        let err = client
            .remove_address_callback(ADDRESS, "https://example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Remote { ref code, .. } if code == "CALLBACK_NOT_FOUND"));
    }

    #[tokio::test]
    async fn test_delivery_log_dead_letters_query() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/delivery-log"))
            .and(query_param("dead_letters", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": [{
                    "url": "https://example.com",
                    "address": ADDRESS,
                    "tx_id": "ab01",
                    "attempts": 3,
                    "outcome": "abandoned",
                    "error": "connection refused",
                    "finished_at": 1700000000u64
                }]
            })))
            .mount(&mock_server)
            .await;

        let client = CallbacksApiClient::new(mock_server.uri()).unwrap();
        let records = client.delivery_log(true).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].outcome, "abandoned");
        assert_eq!(records[0].error.as_deref(), Some("connection refused"));
    }

    #[tokio::test]
    async fn test_unreachable_node_is_connection_error() {
        let client = CallbacksApiClient::new("http://127.0.0.1:1").unwrap();
        let err = client.list_address_callbacks(ADDRESS).await.unwrap_err();
        assert!(matches!(err, ApiError::Connection(_)));
    }
}
