use crate::core::errors::LedgerError;
use crate::core::kernel::signer::{DecoratedSignature, TransactionSigner};
use crate::core::kernel::strkey::AccountId;
use crate::core::kernel::xdr::{ReadXdr, WriteXdr, XdrReader, XdrWriter};
use crate::core::types::Memo;
use crate::tx::operation::{read_account_id, write_account_id, Operation};
use serde::Serialize;
use sha2::{Digest, Sha256};

const ENVELOPE_TYPE_TX: u32 = 2;
const PRECOND_NONE: u32 = 0;
const PRECOND_TIME: u32 = 1;

const MEMO_NONE: u32 = 0;
const MEMO_TEXT: u32 = 1;
const MEMO_ID: u32 = 2;
const MEMO_HASH: u32 = 3;
const MEMO_RETURN: u32 = 4;

pub const MAX_OPERATIONS: usize = 100;
pub const MAX_SIGNATURES: usize = 20;
/// Minimum fee per operation, in stroops.
pub const BASE_FEE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeBounds {
    pub min_time: u64,
    pub max_time: u64,
}

impl WriteXdr for Memo {
    fn write_xdr(&self, w: &mut XdrWriter) -> Result<(), LedgerError> {
        match self {
            Self::None => w.write_u32(MEMO_NONE),
            Self::Text(text) => {
                w.write_u32(MEMO_TEXT);
                w.write_string(text, Self::MAX_TEXT_LEN)?;
            }
            Self::Id(id) => {
                w.write_u32(MEMO_ID);
                w.write_u64(*id);
            }
            Self::Hash(hash) => {
                w.write_u32(MEMO_HASH);
                w.write_fixed(hash);
            }
            Self::Return(hash) => {
                w.write_u32(MEMO_RETURN);
                w.write_fixed(hash);
            }
        }
        Ok(())
    }
}

impl ReadXdr for Memo {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, LedgerError> {
        match r.read_u32()? {
            MEMO_NONE => Ok(Self::None),
            MEMO_TEXT => Ok(Self::Text(r.read_string(Self::MAX_TEXT_LEN)?)),
            MEMO_ID => Ok(Self::Id(r.read_u64()?)),
            MEMO_HASH => Ok(Self::Hash(r.read_fixed::<32>()?)),
            MEMO_RETURN => Ok(Self::Return(r.read_fixed::<32>()?)),
            other => Err(LedgerError::EncodingError(format!("unknown memo type {}", other))),
        }
    }
}

/// The unsigned body of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub source_account: AccountId,
    /// Total fee in stroops for all operations.
    pub fee: u32,
    pub seq_num: i64,
    pub time_bounds: Option<TimeBounds>,
    pub memo: Memo,
    pub operations: Vec<Operation>,
}

impl Transaction {
    /// Hash signed by every signer: `sha256(network_id || ENVELOPE_TYPE_TX || tx)`.
    pub fn hash(&self, network_id: &[u8; 32]) -> Result<[u8; 32], LedgerError> {
        let mut hasher = Sha256::new();
        hasher.update(network_id);
        hasher.update(ENVELOPE_TYPE_TX.to_be_bytes());
        hasher.update(self.to_xdr()?);
        Ok(hasher.finalize().into())
    }
}

impl WriteXdr for Transaction {
    fn write_xdr(&self, w: &mut XdrWriter) -> Result<(), LedgerError> {
        write_account_id(w, &self.source_account);
        w.write_u32(self.fee);
        w.write_i64(self.seq_num);
        match &self.time_bounds {
            Some(bounds) => {
                w.write_u32(PRECOND_TIME);
                w.write_u64(bounds.min_time);
                w.write_u64(bounds.max_time);
            }
            None => w.write_u32(PRECOND_NONE),
        }
        self.memo.write_xdr(w)?;
        w.write_array(&self.operations, MAX_OPERATIONS)?;
        // ext
        w.write_u32(0);
        Ok(())
    }
}

impl ReadXdr for Transaction {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, LedgerError> {
        let source_account = read_account_id(r)?;
        let fee = r.read_u32()?;
        let seq_num = r.read_i64()?;
        let time_bounds = match r.read_u32()? {
            PRECOND_NONE => None,
            PRECOND_TIME => Some(TimeBounds {
                min_time: r.read_u64()?,
                max_time: r.read_u64()?,
            }),
            other => {
                return Err(LedgerError::EncodingError(format!(
                    "unsupported precondition type {}",
                    other
                )))
            }
        };
        let memo = Memo::read_xdr(r)?;
        let operations = r.read_array(MAX_OPERATIONS)?;
        match r.read_u32()? {
            0 => {}
            other => {
                return Err(LedgerError::EncodingError(format!(
                    "unsupported transaction extension {}",
                    other
                )))
            }
        }
        Ok(Self {
            source_account,
            fee,
            seq_num,
            time_bounds,
            memo,
            operations,
        })
    }
}

/// A transaction together with its signatures, as submitted to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionEnvelope {
    pub tx: Transaction,
    pub signatures: Vec<DecoratedSignature>,
}

impl TransactionEnvelope {
    pub const fn new(tx: Transaction) -> Self {
        Self {
            tx,
            signatures: Vec::new(),
        }
    }

    pub fn hash(&self, network_id: &[u8; 32]) -> Result<[u8; 32], LedgerError> {
        self.tx.hash(network_id)
    }

    pub fn sign(
        &mut self,
        signer: &dyn TransactionSigner,
        network_id: &[u8; 32],
    ) -> Result<(), LedgerError> {
        if self.signatures.len() >= MAX_SIGNATURES {
            return Err(LedgerError::SigningError(format!(
                "envelope already carries {} signatures",
                MAX_SIGNATURES
            )));
        }
        let hash = self.hash(network_id)?;
        self.signatures.push(signer.sign_decorated(&hash)?);
        Ok(())
    }

    /// Pretty JSON rendering, with the network-specific hash included.
    pub fn to_json(&self, network_id: &[u8; 32]) -> Result<String, LedgerError> {
        #[derive(Serialize)]
        struct Rendered<'a> {
            hash: String,
            #[serde(flatten)]
            envelope: &'a TransactionEnvelope,
        }

        let rendered = Rendered {
            hash: hex::encode(self.hash(network_id)?),
            envelope: self,
        };
        serde_json::to_string_pretty(&rendered)
            .map_err(|e| LedgerError::EncodingError(format!("failed to render JSON: {}", e)))
    }
}

impl WriteXdr for TransactionEnvelope {
    fn write_xdr(&self, w: &mut XdrWriter) -> Result<(), LedgerError> {
        w.write_u32(ENVELOPE_TYPE_TX);
        self.tx.write_xdr(w)?;
        w.write_array(&self.signatures, MAX_SIGNATURES)
    }
}

impl ReadXdr for TransactionEnvelope {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, LedgerError> {
        match r.read_u32()? {
            ENVELOPE_TYPE_TX => Ok(Self {
                tx: Transaction::read_xdr(r)?,
                signatures: r.read_array(MAX_SIGNATURES)?,
            }),
            other => Err(LedgerError::EncodingError(format!(
                "unsupported envelope type {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Network;
    use crate::core::kernel::KeyPair;
    use crate::core::types::Asset;

    const SEED: &str = "SAFOI5YIH5MXO6HCICLBG3UYOER6PDYQXHP47JUB7XNWHNT2YISAOMAQ";
    const DEST: &str = "GAUYTZ24ATLEBIV63MXMPOPQO2T6NHI6TQYEXRTFYXWYZ3JOCVO6UYUM";

    fn sample_tx(memo: Memo) -> Transaction {
        let keys = KeyPair::from_seed(SEED).unwrap();
        Transaction {
            source_account: keys.account_id(),
            fee: BASE_FEE,
            seq_num: 42,
            time_bounds: None,
            memo,
            operations: vec![Operation::payment(DEST, &Asset::native(), "4").unwrap()],
        }
    }

    #[test]
    fn test_envelope_round_trip_with_signature() {
        let keys = KeyPair::from_seed(SEED).unwrap();
        let network_id = Network::Test.network_id();
        let mut envelope = TransactionEnvelope::new(sample_tx(Memo::Text("hello".into())));
        envelope.sign(&keys, &network_id).unwrap();

        let encoded = envelope.to_xdr_base64().unwrap();
        let decoded = TransactionEnvelope::from_xdr_base64(&encoded).unwrap();
        assert_eq!(decoded, envelope);

        let hash = decoded.hash(&network_id).unwrap();
        assert!(keys.verify(&hash, &decoded.signatures[0].signature));
    }

    #[test]
    fn test_hash_depends_on_network() {
        let tx = sample_tx(Memo::None);
        assert_ne!(
            tx.hash(&Network::Test.network_id()).unwrap(),
            tx.hash(&Network::Public.network_id()).unwrap()
        );
    }

    #[test]
    fn test_memo_text_too_long_fails_encoding() {
        let tx = sample_tx(Memo::Text("x".repeat(29)));
        assert!(matches!(tx.to_xdr(), Err(LedgerError::EncodingError(_))));
    }

    #[test]
    fn test_time_bounds_encoding() {
        let mut tx = sample_tx(Memo::Id(7));
        tx.time_bounds = Some(TimeBounds {
            min_time: 10,
            max_time: 5,
        });
        let decoded = Transaction::from_xdr(&tx.to_xdr().unwrap()).unwrap();
        assert_eq!(decoded.time_bounds, tx.time_bounds);
        assert_eq!(decoded.memo, Memo::Id(7));
    }

    #[test]
    fn test_to_json_contains_operations() {
        let envelope = TransactionEnvelope::new(sample_tx(Memo::None));
        let json = envelope.to_json(&Network::Test.network_id()).unwrap();
        assert!(json.contains("\"type\": \"payment\""));
        assert!(json.contains(DEST));
        assert!(json.contains("\"hash\""));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(TransactionEnvelope::from_xdr_base64("not base64!").is_err());
        assert!(TransactionEnvelope::from_xdr_base64("AAAAAA==").is_err());
    }
}
