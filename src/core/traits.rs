use crate::core::{errors::LedgerError, kernel::EventStream, types::TxResponse};
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait TxSubmitter {
    /// Submit a base64-encoded signed envelope
    async fn submit(&self, payload: &str) -> Result<TxResponse, LedgerError>;
}

#[async_trait]
pub trait LedgerQuery {
    /// Read a JSON resource from the ledger's REST API
    async fn query(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, LedgerError>;

    /// Read a non-JSON resource, e.g. a `stellar.toml` file
    async fn query_text(&self, path: &str, params: &[(&str, &str)])
        -> Result<String, LedgerError>;
}

#[async_trait]
pub trait EventSource {
    /// Open a server-sent event subscription
    async fn stream(&self, path: &str, params: &[(&str, &str)])
        -> Result<EventStream, LedgerError>;
}

/// Everything the engine needs from the remote ledger.
pub trait LedgerTransport: TxSubmitter + LedgerQuery + EventSource + Send + Sync + 'static {}

impl<T> LedgerTransport for T where T: TxSubmitter + LedgerQuery + EventSource + Send + Sync + 'static {}
