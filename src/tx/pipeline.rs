use crate::core::config::NetworkConfig;
use crate::core::errors::LedgerError;
use crate::core::kernel::{AccountId, KeyPair, WriteXdr};
use crate::core::options::Options;
use crate::core::traits::LedgerTransport;
use crate::core::types::TxResponse;
use crate::horizon::HorizonApi;
use crate::tx::envelope::{TimeBounds, Transaction, TransactionEnvelope, BASE_FEE, MAX_OPERATIONS};
use crate::tx::operation::Operation;
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Payload written by `sign` on a fake network.
pub const FAKE_PAYLOAD: &str = "FAKE";
/// Hash reported by `submit` on a fake network.
pub const FAKE_HASH: &str = "fake_ok";

/// Progress of a [`Tx`] through build, sign and submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TxStage {
    Unbuilt,
    Built,
    Signed,
    Submitted,
}

/// The canned response returned by a fake network.
pub fn fake_response() -> TxResponse {
    TxResponse {
        hash: FAKE_HASH.to_string(),
        ledger: None,
        envelope_xdr: FAKE_PAYLOAD.to_string(),
        result_xdr: None,
        submitted: true,
    }
}

/// Interpret a source as a seed (which can also sign) or a bare address.
pub fn parse_source(source: &str) -> Result<(AccountId, Option<KeyPair>), LedgerError> {
    if source.starts_with('S') {
        let keys = KeyPair::from_seed(source)?;
        return Ok((keys.account_id(), Some(keys)));
    }
    Ok((source.parse()?, None))
}

/// A single transaction moving through `build -> sign -> submit`.
///
/// Stages only move forward. Any failure, including calling a stage out of
/// order, is terminal: the error is kept and returned by every later call
/// until [`Tx::reset`] clears the instance.
///
/// In multi-op mode (`Options::multi_op`) every `build` appends operations
/// to one list billed to the fee source, and the envelope is assembled once
/// at `sign` time.
///
/// A `Tx` is driven through `&mut self` and is not meant to be shared
/// between tasks; use one instance per independent submission.
pub struct Tx<T: LedgerTransport> {
    transport: Arc<T>,
    config: NetworkConfig,
    options: Options,
    stage: TxStage,
    err: Option<LedgerError>,
    source: Option<AccountId>,
    /// Keys implied by seed sources, used when no keys are supplied at `sign`.
    default_signers: Vec<KeyPair>,
    operations: Vec<Operation>,
    envelope: Option<TransactionEnvelope>,
    payload: Option<String>,
    response: Option<TxResponse>,
}

impl<T: LedgerTransport> Tx<T> {
    pub fn new(transport: Arc<T>, config: NetworkConfig, options: Options) -> Self {
        Self {
            transport,
            config,
            options,
            stage: TxStage::Unbuilt,
            err: None,
            source: None,
            default_signers: Vec::new(),
            operations: Vec::new(),
            envelope: None,
            payload: None,
            response: None,
        }
    }

    /// Clear all derived state, keeping the transport, network and options.
    pub fn reset(&mut self) {
        self.stage = TxStage::Unbuilt;
        self.err = None;
        self.source = None;
        self.default_signers.clear();
        self.operations.clear();
        self.envelope = None;
        self.payload = None;
        self.response = None;
    }

    pub fn err(&self) -> Option<&LedgerError> {
        self.err.as_ref()
    }

    pub fn response(&self) -> Option<&TxResponse> {
        self.response.as_ref()
    }

    /// The base64 signed envelope, once signed.
    pub fn payload(&self) -> Option<&str> {
        self.payload.as_deref()
    }

    pub fn envelope(&self) -> Option<&TransactionEnvelope> {
        self.envelope.as_ref()
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub const fn stage(&self) -> TxStage {
        self.stage
    }

    pub fn is_multi_op(&self) -> bool {
        self.options.is_multi_op()
    }

    fn check(&self) -> Result<(), LedgerError> {
        match &self.err {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn fail<V>(&mut self, err: LedgerError) -> Result<V, LedgerError> {
        debug!(error = %err, stage = ?self.stage, "Transaction pipeline failed");
        self.err = Some(err.clone());
        Err(err)
    }

    /// Add operations acting for `source` (a seed or an address).
    #[instrument(skip(self, source, operations), fields(network = %self.config.network.name(), ops = operations.len(), multi_op = self.is_multi_op()))]
    pub async fn build(
        &mut self,
        source: &str,
        operations: Vec<Operation>,
    ) -> Result<(), LedgerError> {
        self.check()?;
        match self.try_build(source, operations).await {
            Ok(()) => Ok(()),
            Err(err) => self.fail(err),
        }
    }

    async fn try_build(
        &mut self,
        source: &str,
        operations: Vec<Operation>,
    ) -> Result<(), LedgerError> {
        if self.is_multi_op() {
            return self.append(source, operations);
        }

        if self.stage != TxStage::Unbuilt {
            return Err(LedgerError::AlreadyBuilt);
        }
        if operations.is_empty() {
            return Err(LedgerError::EmptyTransaction);
        }
        self.options.validate()?;

        let (source_id, keys) = parse_source(source)?;
        self.source = Some(source_id);
        self.default_signers.extend(keys);
        self.operations = operations;

        if self.config.is_fake() {
            debug!("Fake network, skipping envelope assembly");
            self.stage = TxStage::Built;
            return Ok(());
        }

        self.envelope = Some(self.assemble().await?);
        self.stage = TxStage::Built;
        debug!(source = %source_id, "Transaction built");
        Ok(())
    }

    fn append(&mut self, source: &str, operations: Vec<Operation>) -> Result<(), LedgerError> {
        if self.stage >= TxStage::Signed {
            return Err(LedgerError::AlreadyBuilt);
        }

        let fee_source = match self.source {
            Some(fee_source) => fee_source,
            None => {
                self.options.validate()?;
                let secret = self
                    .options
                    .multi_op_source
                    .as_ref()
                    .ok_or(LedgerError::NotMultiOp)?;
                let (fee_source, keys) = parse_source(secret.expose_secret())?;
                self.source = Some(fee_source);
                self.default_signers.extend(keys);
                fee_source
            }
        };

        let (op_source, keys) = parse_source(source)?;
        if let Some(keys) = keys {
            if !self
                .default_signers
                .iter()
                .any(|k| k.account_id() == op_source)
            {
                self.default_signers.push(keys);
            }
        }

        for op in operations {
            let op = if op.source_account.is_none() && op_source != fee_source {
                op.with_source(op_source)
            } else {
                op
            };
            self.operations.push(op);
        }

        if self.operations.len() > MAX_OPERATIONS {
            return Err(LedgerError::InvalidParameters(format!(
                "a transaction holds at most {} operations",
                MAX_OPERATIONS
            )));
        }

        self.stage = TxStage::Built;
        debug!(total = self.operations.len(), "Operations appended");
        Ok(())
    }

    /// Fetch the next sequence number and lay out the unsigned envelope.
    async fn assemble(&self) -> Result<TransactionEnvelope, LedgerError> {
        let source = self.source.ok_or(LedgerError::EmptyTransaction)?;
        let sequence = HorizonApi::new(self.transport.as_ref())
            .sequence(&source.to_string())
            .await?;

        let op_count = u32::try_from(self.operations.len())
            .map_err(|_| LedgerError::InvalidParameters("too many operations".to_string()))?;
        let fee = self
            .options
            .fee
            .unwrap_or(BASE_FEE)
            .checked_mul(op_count)
            .ok_or_else(|| LedgerError::InvalidParameters("fee overflows u32".to_string()))?;
        let seq_num = sequence
            .checked_add(1)
            .ok_or_else(|| LedgerError::InvalidParameters("sequence exhausted".to_string()))?;

        Ok(TransactionEnvelope::new(Transaction {
            source_account: source,
            fee,
            seq_num,
            time_bounds: self
                .options
                .time_bounds()
                .map(|(min_time, max_time)| TimeBounds { min_time, max_time }),
            memo: self.options.memo.clone(),
            operations: self.operations.clone(),
        }))
    }

    /// Sign the envelope.
    ///
    /// Keys come from `Options::with_signer` if any were given, else from
    /// `seeds`, else from the seed(s) the transaction was built with.
    #[instrument(skip(self, seeds), fields(network = %self.config.network.name(), stage = ?self.stage))]
    pub async fn sign(&mut self, seeds: &[&str]) -> Result<(), LedgerError> {
        self.check()?;
        match self.try_sign(seeds).await {
            Ok(()) => Ok(()),
            Err(err) => self.fail(err),
        }
    }

    async fn try_sign(&mut self, seeds: &[&str]) -> Result<(), LedgerError> {
        match self.stage {
            TxStage::Unbuilt => return Err(LedgerError::EmptyTransaction),
            TxStage::Signed | TxStage::Submitted => return Err(LedgerError::AlreadySigned),
            TxStage::Built => {}
        }
        if self.operations.is_empty() {
            return Err(LedgerError::EmptyTransaction);
        }

        if self.config.is_fake() {
            self.payload = Some(FAKE_PAYLOAD.to_string());
            self.stage = TxStage::Signed;
            return Ok(());
        }

        let mut envelope = match self.envelope.take() {
            Some(envelope) => envelope,
            None => self.assemble().await?,
        };

        if self.options.skip_signatures {
            debug!("Leaving envelope unsigned");
        } else {
            let network_id = self.config.network_id();
            for keys in self.signing_keys(seeds)? {
                envelope.sign(&keys, &network_id)?;
            }
        }

        let payload = envelope.to_xdr_base64()?;
        debug!(
            signatures = envelope.signatures.len(),
            ops = envelope.tx.operations.len(),
            "Transaction signed"
        );
        self.envelope = Some(envelope);
        self.payload = Some(payload);
        self.stage = TxStage::Signed;
        Ok(())
    }

    fn signing_keys(&self, seeds: &[&str]) -> Result<Vec<KeyPair>, LedgerError> {
        let keys = if !self.options.signer_seeds.is_empty() {
            self.options
                .signer_seeds
                .iter()
                .map(|seed| KeyPair::from_seed(seed.expose_secret()))
                .collect::<Result<Vec<_>, _>>()?
        } else if !seeds.is_empty() {
            seeds
                .iter()
                .map(|seed| KeyPair::from_seed(seed))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            self.default_signers.clone()
        };

        if keys.is_empty() {
            return Err(LedgerError::SigningError(
                "no signing keys available".to_string(),
            ));
        }
        Ok(keys)
    }

    /// Submit the signed envelope.
    ///
    /// A before-submit handler returning `false` holds the transaction: the
    /// stage still advances and the response carries `submitted = false`.
    #[instrument(skip(self), fields(network = %self.config.network.name(), stage = ?self.stage))]
    pub async fn submit(&mut self) -> Result<TxResponse, LedgerError> {
        self.check()?;
        match self.try_submit().await {
            Ok(response) => Ok(response),
            Err(err) => self.fail(err),
        }
    }

    async fn try_submit(&mut self) -> Result<TxResponse, LedgerError> {
        match self.stage {
            TxStage::Unbuilt | TxStage::Built => return Err(LedgerError::NotSigned),
            TxStage::Submitted => return Err(LedgerError::AlreadySubmitted),
            TxStage::Signed => {}
        }
        let payload = self.payload.clone().ok_or(LedgerError::NotSigned)?;

        if let Some(handler) = &self.options.before_submit {
            if !handler(&payload)? {
                let response = TxResponse {
                    hash: self.local_hash()?,
                    ledger: None,
                    envelope_xdr: payload,
                    result_xdr: None,
                    submitted: false,
                };
                info!(hash = %response.hash, "Transaction held by before-submit handler");
                return Ok(self.finish(response));
            }
        }

        let response = if self.config.is_fake() {
            fake_response()
        } else {
            self.transport
                .submit(&payload)
                .await
                .map_err(|e| LedgerError::SubmitError(Box::new(e)))?
        };

        info!(hash = %response.hash, ledger = ?response.ledger, "Transaction submitted");
        Ok(self.finish(response))
    }

    fn finish(&mut self, response: TxResponse) -> TxResponse {
        self.stage = TxStage::Submitted;
        self.response = Some(response.clone());
        response
    }

    fn local_hash(&self) -> Result<String, LedgerError> {
        match &self.envelope {
            Some(envelope) => Ok(hex::encode(envelope.hash(&self.config.network_id())?)),
            None => Ok(FAKE_HASH.to_string()),
        }
    }

    /// Build, sign with the build keys, and submit in one go.
    pub async fn execute(
        &mut self,
        source: &str,
        operations: Vec<Operation>,
    ) -> Result<TxResponse, LedgerError> {
        self.build(source, operations).await?;
        self.sign(&[]).await?;
        self.submit().await
    }
}
