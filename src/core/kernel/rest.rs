use crate::core::errors::LedgerError;
use crate::core::kernel::stream::{sse_stream, EventStream};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{instrument, trace};

/// REST client trait for making HTTP requests
///
/// This trait provides a unified interface for the HTTP operations a ledger
/// backend needs: JSON queries, form posts and server-sent event streams.
/// Endpoints starting with `http` are treated as absolute URLs, which lets
/// the same client reach auxiliary hosts (faucets, federation servers).
#[async_trait]
pub trait RestClient: Send + Sync {
    /// Make a GET request
    ///
    /// # Arguments
    /// * `endpoint` - The API endpoint path
    /// * `query_params` - Query parameters as key-value pairs
    ///
    /// # Returns
    /// The response body as a JSON value
    async fn get(&self, endpoint: &str, query_params: &[(&str, &str)])
        -> Result<Value, LedgerError>;

    /// Make a GET request with strongly-typed response
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
    ) -> Result<T, LedgerError>;

    /// Make a GET request and return the raw body
    async fn get_text(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
    ) -> Result<String, LedgerError>;

    /// Make a POST request with a form-encoded body
    ///
    /// # Arguments
    /// * `endpoint` - The API endpoint path
    /// * `form` - Form fields as key-value pairs
    ///
    /// # Returns
    /// The response body as a JSON value
    async fn post_form(&self, endpoint: &str, form: &[(&str, &str)])
        -> Result<Value, LedgerError>;

    /// Open a `text/event-stream` subscription
    ///
    /// # Returns
    /// A stream of raw events; it ends when the server closes the connection
    async fn stream(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
    ) -> Result<EventStream, LedgerError>;
}

/// Configuration for the REST client
#[derive(Clone, Debug)]
pub struct RestClientConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Network name for logging and tracing
    pub network_name: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Connect timeout in seconds (also applies to streams)
    pub connect_timeout_seconds: u64,
    /// User agent string to include in requests
    pub user_agent: String,
}

impl RestClientConfig {
    /// Create a new configuration
    ///
    /// # Arguments
    /// * `base_url` - Base URL for the API
    /// * `network_name` - Name of the network
    pub fn new(base_url: String, network_name: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            network_name,
            timeout_seconds: 30,
            connect_timeout_seconds: 10,
            user_agent: "ledgerx/0.1".to_string(),
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    /// Set the connect timeout
    pub fn with_connect_timeout(mut self, connect_timeout_seconds: u64) -> Self {
        self.connect_timeout_seconds = connect_timeout_seconds;
        self
    }

    /// Set the user agent string
    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }
}

/// Builder for creating REST client instances
pub struct RestClientBuilder {
    config: RestClientConfig,
}

impl RestClientBuilder {
    pub fn new(config: RestClientConfig) -> Self {
        Self { config }
    }

    /// Build the REST client
    ///
    /// Streams get their own client without an overall request timeout so
    /// long-lived subscriptions are not cut off.
    pub fn build(self) -> Result<ReqwestRest, LedgerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_seconds))
            .connect_timeout(Duration::from_secs(self.config.connect_timeout_seconds))
            .user_agent(&self.config.user_agent)
            .build()
            .map_err(|e| LedgerError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        let stream_client = Client::builder()
            .connect_timeout(Duration::from_secs(self.config.connect_timeout_seconds))
            .user_agent(&self.config.user_agent)
            .build()
            .map_err(|e| {
                LedgerError::ConfigError(format!("Failed to build streaming client: {}", e))
            })?;

        Ok(ReqwestRest {
            client,
            stream_client,
            config: self.config,
        })
    }
}

/// Implementation of `RestClient` using reqwest
#[derive(Clone)]
pub struct ReqwestRest {
    client: Client,
    stream_client: Client,
    config: RestClientConfig,
}

impl std::fmt::Debug for ReqwestRest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestRest")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ReqwestRest {
    /// Create a new `ReqwestRest` instance with default settings
    pub fn new(base_url: String, network_name: String) -> Result<Self, LedgerError> {
        RestClientBuilder::new(RestClientConfig::new(base_url, network_name)).build()
    }

    pub fn config(&self) -> &RestClientConfig {
        &self.config
    }

    /// Build the full URL for an endpoint
    fn build_url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!("{}{}", self.config.base_url, endpoint)
        }
    }

    async fn read_body(response: Response) -> Result<(StatusCode, String), LedgerError> {
        let status = response.status();
        let text = response.text().await.map_err(|e| {
            LedgerError::NetworkError(format!("Failed to read response body: {}", e))
        })?;
        trace!("Response body: {}", text);
        Ok((status, text))
    }

    /// Handle the response and extract JSON
    #[instrument(skip(self, response), fields(network = %self.config.network_name, status = %response.status()))]
    async fn handle_response(&self, response: Response) -> Result<Value, LedgerError> {
        let (status, text) = Self::read_body(response).await?;

        if status.is_success() {
            serde_json::from_str(&text).map_err(|e| {
                LedgerError::DeserializationError(format!("Failed to parse JSON response: {}", e))
            })
        } else {
            Err(LedgerError::ApiError {
                code: i32::from(status.as_u16()),
                message: text,
            })
        }
    }

    async fn send_get(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
    ) -> Result<Response, LedgerError> {
        self.client
            .get(self.build_url(endpoint))
            .query(query_params)
            .send()
            .await
            .map_err(|e| LedgerError::NetworkError(format!("Request failed: {}", e)))
    }
}

#[async_trait]
impl RestClient for ReqwestRest {
    #[instrument(skip(self, query_params), fields(network = %self.config.network_name, endpoint = %endpoint, param_count = query_params.len()))]
    async fn get(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
    ) -> Result<Value, LedgerError> {
        let response = self.send_get(endpoint, query_params).await?;
        self.handle_response(response).await
    }

    #[instrument(skip(self, query_params), fields(network = %self.config.network_name, endpoint = %endpoint, param_count = query_params.len()))]
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
    ) -> Result<T, LedgerError> {
        self.get(endpoint, query_params).await.and_then(|value| {
            serde_json::from_value(value).map_err(|e| {
                LedgerError::DeserializationError(format!("Failed to deserialize JSON: {}", e))
            })
        })
    }

    #[instrument(skip(self, query_params), fields(network = %self.config.network_name, endpoint = %endpoint))]
    async fn get_text(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
    ) -> Result<String, LedgerError> {
        let response = self.send_get(endpoint, query_params).await?;
        let (status, text) = Self::read_body(response).await?;
        if status.is_success() {
            Ok(text)
        } else {
            Err(LedgerError::ApiError {
                code: i32::from(status.as_u16()),
                message: text,
            })
        }
    }

    #[instrument(skip(self, form), fields(network = %self.config.network_name, endpoint = %endpoint))]
    async fn post_form(
        &self,
        endpoint: &str,
        form: &[(&str, &str)],
    ) -> Result<Value, LedgerError> {
        let response = self
            .client
            .post(self.build_url(endpoint))
            .form(form)
            .send()
            .await
            .map_err(|e| LedgerError::NetworkError(format!("Request failed: {}", e)))?;

        self.handle_response(response).await
    }

    #[instrument(skip(self, query_params), fields(network = %self.config.network_name, endpoint = %endpoint))]
    async fn stream(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
    ) -> Result<EventStream, LedgerError> {
        let response = self
            .stream_client
            .get(self.build_url(endpoint))
            .query(query_params)
            .header("Accept", "text/event-stream")
            .header("Cache-Control", "no-cache")
            .send()
            .await
            .map_err(|e| LedgerError::NetworkError(format!("Stream request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let (_, text) = Self::read_body(response).await?;
            return Err(LedgerError::ApiError {
                code: i32::from(status.as_u16()),
                message: text,
            });
        }

        Ok(sse_stream(response.bytes_stream().boxed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url_relative_and_absolute() {
        let rest = ReqwestRest::new(
            "https://horizon-testnet.stellar.org/".to_string(),
            "test".to_string(),
        )
        .unwrap();
        assert_eq!(
            rest.build_url("/accounts/G1"),
            "https://horizon-testnet.stellar.org/accounts/G1"
        );
        assert_eq!(
            rest.build_url("https://friendbot.stellar.org/"),
            "https://friendbot.stellar.org/"
        );
    }

    #[test]
    fn test_config_builder() {
        let config = RestClientConfig::new("http://localhost".to_string(), "custom".to_string())
            .with_timeout(5)
            .with_connect_timeout(2)
            .with_user_agent("ledgerx-test/1".to_string());
        assert_eq!(config.timeout_seconds, 5);
        assert_eq!(config.connect_timeout_seconds, 2);
        assert_eq!(config.user_agent, "ledgerx-test/1");
    }
}
