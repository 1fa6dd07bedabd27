pub mod client;
pub mod core;
pub mod horizon;
pub mod tx;

pub use client::{Batch, LedgerClient, ReconnectPolicy, WatchTarget, Watcher};
pub use core::{
    config::{Network, NetworkConfig},
    errors::{ErrorKind, LedgerError, ResultCodes},
    kernel::KeyPair,
    options::{Options, CURSOR_NOW, CURSOR_START},
    traits::LedgerTransport,
    types::*,
};
pub use tx::{Tx, TxStage};
