/// `ledgerx` Kernel - transport and wire layer shared by every ledger backend
///
/// This module provides the backend-agnostic building blocks: HTTP and
/// server-sent event transport, the binary envelope encoding, key encoding
/// and transaction signing. The kernel contains no knowledge of specific
/// REST endpoints or JSON shapes; those live in the backend modules.
///
/// # Architecture
///
/// ## Transport Layer
/// - `RestClient`: Unified HTTP client interface (JSON, form posts, streams)
/// - `SseDecoder` / `EventStream`: incremental `text/event-stream` parsing
///
/// ## Message Handling
/// - `StreamCodec`: Backend-specific event decoding
///
/// ## Wire Format
/// - `XdrWriter` / `XdrReader`: canonical big-endian encoding with padding
/// - `strkey`: checksummed base32 account ids and seeds
///
/// ## Authentication
/// - `TransactionSigner`: pluggable signing interface
/// - `KeyPair`: Ed25519 keys addressed by strkey
///
/// # Usage
///
/// ## Querying a backend
/// ```rust,no_run
/// use ledgerx::core::kernel::*;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = RestClientConfig::new(
///     "https://horizon-testnet.stellar.org".to_string(),
///     "test".to_string(),
/// )
/// .with_timeout(10);
/// let rest = RestClientBuilder::new(config).build()?;
///
/// let root: serde_json::Value = rest.get_json("/", &[]).await?;
/// println!("{}", root["horizon_version"]);
/// # Ok(())
/// # }
/// ```
///
/// ## Signing a payload
/// ```rust
/// use ledgerx::core::kernel::{KeyPair, TransactionSigner};
///
/// let keys = KeyPair::random();
/// let signature = keys.sign_decorated(b"transaction hash").unwrap();
/// assert_eq!(signature.hint, keys.hint());
/// ```
pub mod codec;
pub mod rest;
pub mod signer;
pub mod stream;
pub mod strkey;
pub mod xdr;

// Re-export key types for convenience
pub use codec::StreamCodec;
pub use rest::{ReqwestRest, RestClient, RestClientBuilder, RestClientConfig};
pub use signer::{DecoratedSignature, KeyPair, TransactionSigner};
pub use stream::{sse_stream, EventStream, SseDecoder, StreamEvent};
pub use strkey::AccountId;
pub use xdr::{ReadXdr, WriteXdr, XdrReader, XdrWriter};
