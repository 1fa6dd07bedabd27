pub mod envelope;
pub mod operation;
pub mod pipeline;

pub use envelope::{TimeBounds, Transaction, TransactionEnvelope, BASE_FEE};
pub use operation::{Operation, OperationBody, SetOptions, SignerSpec};
pub use pipeline::{fake_response, parse_source, Tx, TxStage};
