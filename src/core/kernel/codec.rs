use crate::core::errors::LedgerError;
use crate::core::kernel::stream::StreamEvent;

/// Codec trait for turning raw server-sent events into typed messages
///
/// This trait defines the contract for converting a transport-level
/// [`StreamEvent`] into a backend-specific typed message. Each ledger
/// backend implements it for the shapes its streaming endpoints emit.
pub trait StreamCodec: Send + Sync + 'static {
    /// The type representing parsed messages from this backend
    type Message: Send + Sync;

    /// Decode a raw event into a typed message
    ///
    /// Control events (stream open/close notices) should be filtered here.
    ///
    /// # Arguments
    /// * `event` - The raw event to decode
    ///
    /// # Returns
    /// - `Ok(Some(message))` - Successfully decoded message
    /// - `Ok(None)` - Event was ignored/filtered by codec
    /// - `Err(error)` - Failed to decode event
    fn decode_event(&self, event: StreamEvent) -> Result<Option<Self::Message>, LedgerError>;
}
