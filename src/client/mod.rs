pub mod account;
pub mod dex;
pub mod payments;
pub mod watch;

use crate::core::{
    config::{Network, NetworkConfig},
    errors::LedgerError,
    kernel::{strkey, KeyPair, ReadXdr, ReqwestRest, WriteXdr},
    options::Options,
    traits::LedgerTransport,
    types::TxResponse,
};
use crate::horizon::{build_transport, HorizonApi, HorizonTransport};
use crate::tx::{fake_response, Operation, TransactionEnvelope, Tx};
use std::sync::Arc;
use tracing::{debug, info, instrument};

pub use dex::filter_paths;
pub use watch::{ReconnectPolicy, WatchTarget, Watcher};

/// Entry point to the ledger: builds, signs and submits transactions, reads
/// account and exchange state, and opens event watchers.
///
/// The client itself is cheap to clone and holds no per-transaction state;
/// every submission runs through its own [`Tx`].
pub struct LedgerClient<T: LedgerTransport = HorizonTransport<ReqwestRest>> {
    transport: Arc<T>,
    config: NetworkConfig,
}

impl<T: LedgerTransport> Clone for LedgerClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            config: self.config.clone(),
        }
    }
}

impl LedgerClient {
    /// Create a client talking to Horizon for the configured network
    pub fn from_config(config: NetworkConfig) -> Result<Self, LedgerError> {
        let transport = build_transport(&config)?;
        Ok(Self::new(transport, config))
    }

    /// Generate a fresh random keypair
    pub fn create_keypair() -> KeyPair {
        KeyPair::random()
    }
}

impl<T: LedgerTransport> LedgerClient<T> {
    /// Create a client over any transport
    pub fn new(transport: T, config: NetworkConfig) -> Self {
        Self::with_shared_transport(Arc::new(transport), config)
    }

    pub fn with_shared_transport(transport: Arc<T>, config: NetworkConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub fn is_fake(&self) -> bool {
        self.config.is_fake()
    }

    pub(crate) fn api(&self) -> HorizonApi<'_, T> {
        HorizonApi::new(self.transport.as_ref())
    }

    /// A fresh pipeline instance bound to this client's network
    pub fn tx(&self, options: Options) -> Tx<T> {
        Tx::new(Arc::clone(&self.transport), self.config.clone(), options)
    }

    /// Build, sign and submit `operations` acting for `source`
    pub async fn execute(
        &self,
        source: &str,
        operations: Vec<Operation>,
        options: Options,
    ) -> Result<TxResponse, LedgerError> {
        self.tx(options).execute(source, operations).await
    }

    /// Start a multi-op transaction billed to `fee_source` (a seed or an address)
    pub fn start(&self, fee_source: &str, options: Options) -> Batch<T> {
        Batch {
            tx: self.tx(options.multi_op(fee_source)),
        }
    }

    /// Add signatures to an envelope built elsewhere
    pub fn sign_transaction(&self, envelope_b64: &str, seeds: &[&str]) -> Result<String, LedgerError> {
        let mut envelope = TransactionEnvelope::from_xdr_base64(envelope_b64)?;
        let network_id = self.config.network_id();
        for seed in seeds {
            envelope.sign(&KeyPair::from_seed(seed)?, &network_id)?;
        }
        debug!(signatures = envelope.signatures.len(), "Envelope signed");
        envelope.to_xdr_base64()
    }

    /// Submit an already signed envelope as-is
    #[instrument(skip(self, envelope_b64), fields(network = %self.config.network.name()))]
    pub async fn submit_transaction(&self, envelope_b64: &str) -> Result<TxResponse, LedgerError> {
        TransactionEnvelope::from_xdr_base64(envelope_b64)?;
        if self.is_fake() {
            return Ok(fake_response());
        }
        self.transport
            .submit(envelope_b64)
            .await
            .map_err(|e| LedgerError::SubmitError(Box::new(e)))
    }

    pub fn decode_transaction(&self, envelope_b64: &str) -> Result<TransactionEnvelope, LedgerError> {
        TransactionEnvelope::from_xdr_base64(envelope_b64)
    }

    /// Render an envelope as pretty JSON, including its hash on this network
    pub fn decode_transaction_json(&self, envelope_b64: &str) -> Result<String, LedgerError> {
        self.decode_transaction(envelope_b64)?
            .to_json(&self.config.network_id())
    }

    /// Resolve a `name*domain` federation address to an account id.
    ///
    /// Plain `G...` addresses are validated and returned unchanged.
    #[instrument(skip(self), fields(network = %self.config.network.name()))]
    pub async fn resolve(&self, address: &str) -> Result<String, LedgerError> {
        let Some((_, domain)) = address.rsplit_once('*') else {
            strkey::validate_address(address)?;
            return Ok(address.to_string());
        };
        if domain.is_empty() {
            return Err(LedgerError::InvalidAddress(address.to_string()));
        }
        if self.is_fake() {
            return Err(LedgerError::InvalidParameters(
                "federation lookups need a live network".to_string(),
            ));
        }

        let api = self.api();
        let toml = api.stellar_toml(domain).await?;
        let server = toml.federation_server.ok_or_else(|| {
            LedgerError::InvalidAddress(format!("{} publishes no federation server", domain))
        })?;
        let record = api.federation(&server, address).await?;
        strkey::validate_address(&record.account_id)?;
        info!(address, account_id = %record.account_id, "Federation address resolved");
        Ok(record.account_id)
    }

    /// Fund an account from the test network faucet
    pub async fn fund_with_friendbot(&self, address: &str) -> Result<(), LedgerError> {
        strkey::validate_address(address)?;
        if self.is_fake() {
            return Ok(());
        }
        if self.config.network != Network::Test {
            return Err(LedgerError::InvalidParameters(
                "friendbot only funds test network accounts".to_string(),
            ));
        }
        self.api().friendbot(address).await?;
        info!(address, "Account funded by friendbot");
        Ok(())
    }
}

/// A multi-op transaction under construction.
///
/// Every `add` appends to one operation list; `submit` assembles, signs and
/// submits a single envelope carrying all of them.
pub struct Batch<T: LedgerTransport> {
    tx: Tx<T>,
}

impl<T: LedgerTransport> Batch<T> {
    /// Append operations acting for `source` (a seed or an address)
    pub async fn add(&mut self, source: &str, operations: Vec<Operation>) -> Result<(), LedgerError> {
        self.tx.build(source, operations).await
    }

    pub fn len(&self) -> usize {
        self.tx.operations().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.operations().is_empty()
    }

    pub fn tx(&self) -> &Tx<T> {
        &self.tx
    }

    /// Sign with `seeds` (or the seeds the batch was built with) and submit
    pub async fn submit(&mut self, seeds: &[&str]) -> Result<TxResponse, LedgerError> {
        self.tx.sign(seeds).await?;
        self.tx.submit().await
    }
}
