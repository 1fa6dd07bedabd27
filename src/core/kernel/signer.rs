use crate::core::errors::LedgerError;
use crate::core::kernel::strkey::{self, AccountId, VERSION_SEED};
use crate::core::kernel::xdr::{ReadXdr, WriteXdr, XdrReader, XdrWriter};
use ed25519_dalek::{Signer as Ed25519SignerTrait, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use secrecy::Secret;
use serde::{Serialize, Serializer};
use zeroize::Zeroizing;

/// Signer trait for transaction authentication
///
/// Implementations sign the 32-byte transaction hash and identify
/// themselves by the last four bytes of their public key (the hint).
pub trait TransactionSigner: Send + Sync {
    /// Public key of this signer
    fn public_key(&self) -> AccountId;

    /// Sign a message (the transaction hash)
    ///
    /// # Returns
    /// The raw 64-byte Ed25519 signature
    fn sign(&self, message: &[u8]) -> Result<[u8; 64], LedgerError>;

    /// Last four bytes of the public key
    fn hint(&self) -> [u8; 4] {
        let key = self.public_key();
        let mut hint = [0u8; 4];
        hint.copy_from_slice(&key.as_bytes()[28..]);
        hint
    }

    /// Sign and wrap the signature with this signer's hint
    fn sign_decorated(&self, message: &[u8]) -> Result<DecoratedSignature, LedgerError> {
        Ok(DecoratedSignature {
            hint: self.hint(),
            signature: self.sign(message)?.to_vec(),
        })
    }
}

/// A signature tagged with the hint of the key that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecoratedSignature {
    #[serde(serialize_with = "serialize_hex")]
    pub hint: [u8; 4],
    #[serde(serialize_with = "serialize_hex")]
    pub signature: Vec<u8>,
}

fn serialize_hex<S: Serializer, T: AsRef<[u8]>>(bytes: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

impl WriteXdr for DecoratedSignature {
    fn write_xdr(&self, w: &mut XdrWriter) -> Result<(), LedgerError> {
        w.write_fixed(&self.hint);
        w.write_var(&self.signature, 64)
    }
}

impl ReadXdr for DecoratedSignature {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, LedgerError> {
        Ok(Self {
            hint: r.read_fixed::<4>()?,
            signature: r.read_var(64)?,
        })
    }
}

/// An Ed25519 keypair addressed by its `G...` account id and `S...` seed.
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl KeyPair {
    /// Create a keypair from an `S...` secret seed
    pub fn from_seed(seed: &str) -> Result<Self, LedgerError> {
        let raw = Zeroizing::new(
            strkey::decode(VERSION_SEED, seed)
                .ok_or_else(|| LedgerError::InvalidSeed("malformed secret seed".to_string()))?,
        );
        Ok(Self::from_raw_seed(&raw))
    }

    pub fn from_raw_seed(raw: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(raw);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Generate a fresh keypair from the OS random source
    pub fn random() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    pub fn account_id(&self) -> AccountId {
        AccountId(self.verifying_key.to_bytes())
    }

    pub fn address(&self) -> String {
        self.account_id().to_string()
    }

    /// The `S...` seed (use carefully - exposes secret)
    pub fn seed(&self) -> Secret<String> {
        Secret::new(strkey::encode(VERSION_SEED, &self.signing_key.to_bytes()))
    }

    /// Verify a signature against this keypair's public key
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        let Ok(bytes) = <[u8; 64]>::try_from(signature) else {
            return false;
        };
        let signature = ed25519_dalek::Signature::from_bytes(&bytes);
        self.verifying_key.verify(message, &signature).is_ok()
    }
}

impl TransactionSigner for KeyPair {
    fn public_key(&self) -> AccountId {
        self.account_id()
    }

    fn sign(&self, message: &[u8]) -> Result<[u8; 64], LedgerError> {
        Ok(self.signing_key.sign(message).to_bytes())
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.address())
            .field("seed", &"[REDACTED]")
            .finish()
    }
}

// Never expose the seed in serialization
impl Serialize for KeyPair {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("KeyPair", 2)?;
        state.serialize_field("address", &self.address())?;
        state.serialize_field("seed", "[REDACTED]")?;
        state.end()
    }
}
