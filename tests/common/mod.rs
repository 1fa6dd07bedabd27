#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use ledgerx::core::kernel::{EventStream, StreamEvent};
use ledgerx::core::traits::{EventSource, LedgerQuery, TxSubmitter};
use ledgerx::{LedgerClient, LedgerError, NetworkConfig, TxResponse};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

pub const SEED: &str = "SAFOI5YIH5MXO6HCICLBG3UYOER6PDYQXHP47JUB7XNWHNT2YISAOMAQ";
pub const ADDRESS: &str = "GBY7XDYKXBDHQ2B523SF7K6BNJNRYHVQMWY7AYAEKTYLCQMYVFHL57UM";
pub const SEED2: &str = "SBWP26IQVZIH52ZCBW4ETX4I4XJZZHNTW5PNWNKSMM25WRBKTJQ7DWGD";
pub const ADDRESS2: &str = "GBH6GGAPBFH6IXCQBPJ7WSN2WMUFU7PO346BIVZXS6Q22YNFBUNVJS4U";
pub const DEST: &str = "GAUYTZ24ATLEBIV63MXMPOPQO2T6NHI6TQYEXRTFYXWYZ3JOCVO6UYUM";
pub const ISSUER: &str = "GAVQK5QMS6TNUZNS3TXDV5RKFIHLSMWDYZQR5ZV72VJT2SL4JMJXWQZE";

/// In-memory ledger: canned query responses, recorded submissions and
/// scripted event streams.
#[derive(Default)]
pub struct MockTransport {
    pub submissions: Mutex<Vec<String>>,
    pub queries: Mutex<Vec<(String, Vec<(String, String)>)>>,
    pub stream_requests: Mutex<Vec<(String, Vec<(String, String)>)>>,
    responses: Mutex<HashMap<String, Value>>,
    submit_error: Mutex<Option<LedgerError>>,
    stalled: Mutex<Vec<String>>,
    streams: Mutex<VecDeque<Vec<StreamEvent>>>,
}

fn own(params: &[(&str, &str)]) -> Vec<(String, String)> {
    params
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

impl MockTransport {
    pub fn new() -> Self {
        let mock = Self::default();
        mock.respond(&format!("/accounts/{}", ADDRESS), account_json(ADDRESS, "100"));
        mock.respond(&format!("/accounts/{}", ADDRESS2), account_json(ADDRESS2, "500"));
        mock
    }

    pub fn respond(&self, path: &str, value: Value) {
        self.responses
            .lock()
            .unwrap()
            .insert(path.to_string(), value);
    }

    /// Queries for `path` never answer.
    pub fn stall(&self, path: &str) {
        self.stalled.lock().unwrap().push(path.to_string());
    }

    pub fn fail_submissions(&self, err: LedgerError) {
        *self.submit_error.lock().unwrap() = Some(err);
    }

    /// Queue one subscription's worth of events; the stream ends after them.
    pub fn script_stream(&self, events: Vec<StreamEvent>) {
        self.streams.lock().unwrap().push_back(events);
    }

    pub fn submissions(&self) -> Vec<String> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn query_paths(&self) -> Vec<String> {
        self.queries
            .lock()
            .unwrap()
            .iter()
            .map(|(path, _)| path.clone())
            .collect()
    }

    pub fn stream_requests(&self) -> Vec<(String, Vec<(String, String)>)> {
        self.stream_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TxSubmitter for MockTransport {
    async fn submit(&self, payload: &str) -> Result<TxResponse, LedgerError> {
        self.submissions.lock().unwrap().push(payload.to_string());
        if let Some(err) = self.submit_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(TxResponse {
            hash: "mock_hash".to_string(),
            ledger: Some(1),
            envelope_xdr: payload.to_string(),
            result_xdr: None,
            submitted: true,
        })
    }
}

#[async_trait]
impl LedgerQuery for MockTransport {
    async fn query(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, LedgerError> {
        self.queries
            .lock()
            .unwrap()
            .push((path.to_string(), own(params)));
        let stalled = self.stalled.lock().unwrap().iter().any(|p| p == path);
        if stalled {
            futures::future::pending::<()>().await;
        }
        self.responses
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| LedgerError::ApiError {
                code: 404,
                message: format!("no canned response for {}", path),
            })
    }

    async fn query_text(&self, path: &str, params: &[(&str, &str)]) -> Result<String, LedgerError> {
        self.query(path, params).await.map(|value| match value {
            Value::String(text) => text,
            other => other.to_string(),
        })
    }
}

#[async_trait]
impl EventSource for MockTransport {
    async fn stream(&self, path: &str, params: &[(&str, &str)]) -> Result<EventStream, LedgerError> {
        self.stream_requests
            .lock()
            .unwrap()
            .push((path.to_string(), own(params)));
        match self.streams.lock().unwrap().pop_front() {
            Some(events) => Ok(stream::iter(events.into_iter().map(Ok)).boxed()),
            // Nothing scripted: a subscription that stays open and silent
            None => Ok(stream::pending::<Result<StreamEvent, LedgerError>>().boxed()),
        }
    }
}

pub fn account_json(address: &str, sequence: &str) -> Value {
    json!({
        "id": address,
        "sequence": sequence,
        "balances": [{"balance": "100.0000000", "asset_type": "native"}],
        "signers": [{"key": address, "weight": 1, "type": "ed25519_public_key"}],
        "thresholds": {"low_threshold": 0, "med_threshold": 0, "high_threshold": 0},
        "flags": {"auth_required": false, "auth_revocable": false, "auth_immutable": false},
        "data": {}
    })
}

pub fn event(data: Value) -> StreamEvent {
    StreamEvent {
        id: data["paging_token"].as_str().map(str::to_string),
        event: None,
        data: data.to_string(),
    }
}

pub fn hello() -> StreamEvent {
    StreamEvent {
        id: None,
        event: Some("open".to_string()),
        data: "\"hello\"".to_string(),
    }
}

pub fn ledger_json(paging_token: &str) -> Value {
    json!({
        "id": format!("ledger-{}", paging_token),
        "paging_token": paging_token,
        "hash": "abc",
        "sequence": 1,
        "successful_transaction_count": 1,
        "operation_count": 1,
        "closed_at": "2024-01-01T00:00:00Z",
        "total_coins": "100.0",
        "base_fee_in_stroops": 100
    })
}

pub fn mock_client(network: NetworkConfig) -> (Arc<MockTransport>, LedgerClient<MockTransport>) {
    let mock = Arc::new(MockTransport::new());
    let client = LedgerClient::with_shared_transport(Arc::clone(&mock), network);
    (mock, client)
}
