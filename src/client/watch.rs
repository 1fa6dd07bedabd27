use crate::client::payments::load_payment_memo;
use crate::client::LedgerClient;
use crate::core::{
    errors::{ErrorKind, LedgerError},
    kernel::{strkey, EventStream, StreamCodec},
    options::Options,
    traits::LedgerTransport,
    types::{Entry, EntryKind},
};
use crate::horizon::{stream_path, HorizonCodec};
use futures_util::StreamExt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Interval between synthetic events on a fake network.
pub const FAKE_EVENT_INTERVAL: Duration = Duration::from_millis(200);

/// What a watcher subscribes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchTarget {
    Payments(String),
    Transactions(String),
    Ledgers,
}

impl WatchTarget {
    pub const fn kind(&self) -> EntryKind {
        match self {
            Self::Payments(_) => EntryKind::Payment,
            Self::Transactions(_) => EntryKind::Transaction,
            Self::Ledgers => EntryKind::Ledger,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Self::Payments(address) | Self::Transactions(address) => {
                stream_path(self.kind(), address)
            }
            Self::Ledgers => stream_path(EntryKind::Ledger, ""),
        }
    }

    fn validate(&self) -> Result<(), LedgerError> {
        match self {
            Self::Payments(address) | Self::Transactions(address) => {
                strkey::validate_address(address)
            }
            Self::Ledgers => Ok(()),
        }
    }
}

/// How the reconnect driver reacts to a dropped stream.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Fixed wait before re-subscribing.
    pub delay: Duration,
    /// Consecutive failed attempts before giving up; `None` retries forever.
    pub max_attempts: Option<u32>,
    /// Resume from the paging token of the last delivered entry.
    pub resume_from_last_seen: bool,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(2),
            max_attempts: None,
            resume_from_last_seen: true,
        }
    }
}

impl ReconnectPolicy {
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn without_resume(mut self) -> Self {
        self.resume_from_last_seen = false;
        self
    }
}

/// A live subscription: a channel of entries plus its cancellation handle.
///
/// The channel closes when the subscription is cancelled or the underlying
/// stream ends; `last_error` then tells which.
pub struct Watcher {
    rx: mpsc::Receiver<Entry>,
    cancel: CancellationToken,
    err: Arc<Mutex<Option<LedgerError>>>,
    task: JoinHandle<()>,
}

impl Watcher {
    /// Next entry, or `None` once the watcher has stopped
    pub async fn recv(&mut self) -> Option<Entry> {
        self.rx.recv().await
    }

    /// Cancel the subscription and close the channel.
    ///
    /// Entries already buffered are discarded; `recv` returns `None` from
    /// here on.
    pub fn done(&mut self) {
        self.cancel.cancel();
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Why the subscription stopped, if it stopped on its own
    pub fn last_error(&self) -> Option<LedgerError> {
        self.err.lock().ok().and_then(|err| err.clone())
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn record(err: &Mutex<Option<LedgerError>>, e: LedgerError) {
    if let Ok(mut slot) = err.lock() {
        *slot = Some(e);
    }
}

/// Send unless cancelled first. Returns `false` once the watcher should stop.
async fn deliver(tx: &mpsc::Sender<Entry>, cancel: &CancellationToken, entry: Entry) -> bool {
    tokio::select! {
        biased;
        () = cancel.cancelled() => false,
        sent = tx.send(entry) => sent.is_ok(),
    }
}

async fn run_fake(kind: EntryKind, tx: mpsc::Sender<Entry>, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(FAKE_EVENT_INTERVAL);
    // A slow reader must not get a burst of catch-up events.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if !deliver(&tx, &cancel, Entry::fake(kind)).await {
                    break;
                }
            }
        }
    }
    debug!(%kind, "Fake watcher stopped");
}

async fn run_stream<T: LedgerTransport>(
    transport: Arc<T>,
    codec: HorizonCodec,
    mut events: EventStream,
    tx: mpsc::Sender<Entry>,
    cancel: CancellationToken,
    err: Arc<Mutex<Option<LedgerError>>>,
) {
    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            next = events.next() => next,
        };

        let event = match next {
            Some(Ok(event)) => event,
            Some(Err(e)) => {
                warn!(kind = %codec.kind(), error = %e, "Stream failed");
                record(&err, e);
                break;
            }
            None => {
                warn!(kind = %codec.kind(), "Stream closed by server");
                record(
                    &err,
                    LedgerError::StreamDisconnected("stream closed by server".to_string()),
                );
                break;
            }
        };

        let entry = match codec.decode_event(event) {
            Ok(Some(entry)) => entry,
            Ok(None) => continue,
            Err(e) => {
                warn!(kind = %codec.kind(), error = %e, "Skipping undecodable event");
                continue;
            }
        };

        let entry = match entry {
            Entry::Payment(mut payment) => {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = load_payment_memo(transport.as_ref(), &mut payment) => {}
                }
                Entry::Payment(payment)
            }
            other => other,
        };

        if !deliver(&tx, &cancel, entry).await {
            break;
        }
    }
}

fn retryable(err: &LedgerError) -> bool {
    matches!(
        err.kind(),
        ErrorKind::StreamDisconnected | ErrorKind::TransportError
    )
}

impl<T: LedgerTransport> LedgerClient<T> {
    /// Subscribe to ledger events.
    ///
    /// The options' cursor, limit and order select where the stream starts
    /// (`CURSOR_NOW` for new events only), and `Options::with_cancellation`
    /// ties the watcher to an outer token.
    #[instrument(skip(self, options), fields(network = %self.config().network.name()))]
    pub async fn watch(&self, target: WatchTarget, options: Options) -> Result<Watcher, LedgerError> {
        target.validate()?;

        let cancel = options
            .cancel
            .as_ref()
            .map_or_else(CancellationToken::new, CancellationToken::child_token);
        let (tx, rx) = mpsc::channel(self.config().stream_buffer.max(1));
        let err = Arc::new(Mutex::new(None));
        let kind = target.kind();

        let task = if self.is_fake() {
            tokio::spawn(run_fake(kind, tx, cancel.clone()))
        } else {
            let params = options.query_params();
            let params: Vec<(&str, &str)> = params
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            let events = self.transport().stream(&target.path(), &params).await?;
            info!(path = %target.path(), "Subscribed");
            tokio::spawn(run_stream(
                Arc::clone(self.transport()),
                HorizonCodec::new(kind),
                events,
                tx,
                cancel.clone(),
                Arc::clone(&err),
            ))
        };

        Ok(Watcher {
            rx,
            cancel,
            err,
            task,
        })
    }

    pub async fn watch_payments(&self, address: &str, options: Options) -> Result<Watcher, LedgerError> {
        self.watch(WatchTarget::Payments(address.to_string()), options)
            .await
    }

    pub async fn watch_transactions(
        &self,
        address: &str,
        options: Options,
    ) -> Result<Watcher, LedgerError> {
        self.watch(WatchTarget::Transactions(address.to_string()), options)
            .await
    }

    pub async fn watch_ledgers(&self, options: Options) -> Result<Watcher, LedgerError> {
        self.watch(WatchTarget::Ledgers, options).await
    }

    /// Keep a subscription alive across disconnects, feeding every entry to `on_entry`.
    ///
    /// Returns `Ok(())` once the options' cancellation token fires, or the
    /// last error when it is not recoverable or `max_attempts` consecutive
    /// reconnects have failed.
    pub async fn watch_with_reconnect<F>(
        &self,
        target: WatchTarget,
        options: Options,
        policy: ReconnectPolicy,
        mut on_entry: F,
    ) -> Result<(), LedgerError>
    where
        F: FnMut(Entry) + Send,
    {
        let cancel = options.cancel.clone().unwrap_or_default();
        let mut options = options.with_cancellation(cancel.clone());
        let mut failures: u32 = 0;

        loop {
            let last_error = match self.watch(target.clone(), options.clone()).await {
                Ok(mut watcher) => {
                    while let Some(entry) = watcher.recv().await {
                        failures = 0;
                        if policy.resume_from_last_seen && !entry.paging_token().is_empty() {
                            options.cursor = Some(entry.paging_token().to_string());
                        }
                        on_entry(entry);
                    }
                    watcher.last_error()
                }
                Err(e) => Some(e),
            };

            if cancel.is_cancelled() {
                return Ok(());
            }

            let err = last_error.unwrap_or_else(|| {
                LedgerError::StreamDisconnected("stream ended".to_string())
            });
            if !retryable(&err) {
                return Err(err);
            }

            failures += 1;
            if policy.max_attempts.is_some_and(|max| failures > max) {
                warn!(attempts = failures - 1, error = %err, "Giving up on stream");
                return Err(err);
            }

            warn!(
                attempt = failures,
                delay_ms = policy.delay.as_millis() as u64,
                cursor = ?options.cursor,
                error = %err,
                "Stream disconnected, reconnecting"
            );
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(()),
                () = tokio::time::sleep(policy.delay) => {}
            }
        }
    }
}
