pub mod codec;
pub mod converters;
pub mod rest;
pub mod transport;
pub mod types;

use crate::core::{
    config::NetworkConfig,
    errors::LedgerError,
    kernel::{ReqwestRest, RestClientBuilder, RestClientConfig},
    types::EntryKind,
};

// Re-export main types for easier importing
pub use codec::HorizonCodec;
pub use rest::HorizonApi;
pub use transport::HorizonTransport;

/// Factory function to create a Horizon transport for a network
///
/// Fake networks get a client pointed at the test network; it is never
/// used because every fake-mode path short-circuits before any I/O.
pub fn build_transport(
    config: &NetworkConfig,
) -> Result<HorizonTransport<ReqwestRest>, LedgerError> {
    let rest_config = RestClientConfig::new(
        config.horizon_url().to_string(),
        config.network.name().to_string(),
    )
    .with_timeout(config.timeout_seconds);

    let rest = RestClientBuilder::new(rest_config).build()?;

    Ok(HorizonTransport::new(rest))
}

/// Streaming endpoint path for an entity kind
///
/// Payments and transactions are scoped to an account; ledger closes are
/// network-wide and ignore `address`.
pub fn stream_path(kind: EntryKind, address: &str) -> String {
    match kind {
        EntryKind::Payment => format!("/accounts/{}/payments", address),
        EntryKind::Transaction => format!("/accounts/{}/transactions", address),
        EntryKind::Ledger => "/ledgers".to_string(),
    }
}
