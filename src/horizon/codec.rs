use crate::core::errors::LedgerError;
use crate::core::kernel::{StreamCodec, StreamEvent};
use crate::core::types::{Entry, EntryKind};
use crate::horizon::converters::{convert_ledger, convert_payment, convert_transaction};
use crate::horizon::types::{HorizonLedger, HorizonPayment, HorizonTransaction};

/// Horizon event codec for one streaming endpoint
///
/// Every Horizon stream carries a single record type, so the codec is
/// parameterized by the kind of entry it produces.
#[derive(Debug, Clone, Copy)]
pub struct HorizonCodec {
    kind: EntryKind,
}

impl HorizonCodec {
    pub const fn new(kind: EntryKind) -> Self {
        Self { kind }
    }

    pub const fn kind(&self) -> EntryKind {
        self.kind
    }

    fn is_control(event: &StreamEvent) -> bool {
        if event.event.as_deref() == Some("open") {
            return true;
        }
        matches!(event.data.trim(), "\"hello\"" | "\"byebye\"" | "")
    }
}

impl StreamCodec for HorizonCodec {
    type Message = Entry;

    fn decode_event(&self, event: StreamEvent) -> Result<Option<Self::Message>, LedgerError> {
        if Self::is_control(&event) {
            return Ok(None);
        }

        let entry = match self.kind {
            EntryKind::Payment => {
                let payment: HorizonPayment = serde_json::from_str(&event.data)?;
                Entry::Payment(convert_payment(payment)?)
            }
            EntryKind::Transaction => {
                let tx: HorizonTransaction = serde_json::from_str(&event.data)?;
                Entry::Transaction(convert_transaction(tx))
            }
            EntryKind::Ledger => {
                let ledger: HorizonLedger = serde_json::from_str(&event.data)?;
                Entry::LedgerClose(convert_ledger(ledger))
            }
        };
        Ok(Some(entry))
    }
}
