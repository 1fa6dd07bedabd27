use crate::core::errors::LedgerError;
use crate::core::kernel::strkey;
use crate::core::types::{parse_amount, Asset, Memo, SortOrder};
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, Secret};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Cursor value meaning "from genesis"; it is sent as no cursor at all.
pub const CURSOR_START: &str = "start";
/// Cursor value meaning "from this point forward".
pub const CURSOR_NOW: &str = "now";

/// Handler invoked with the signed payload right before submission.
///
/// Returning `Ok(false)` holds the transaction back without submitting it.
pub type BeforeSubmitHandler = Arc<dyn Fn(&str) -> Result<bool, LedgerError> + Send + Sync>;

/// Everything that can be attached to a transaction or a query.
///
/// Options are plain data built with chained `with_*` calls; consistency
/// checks run once in [`Options::validate`] when the options are consumed.
#[derive(Clone, Default)]
pub struct Options {
    pub memo: Memo,
    pub min_time: Option<DateTime<Utc>>,
    pub max_time: Option<DateTime<Utc>>,
    /// Base fee per operation, in stroops.
    pub fee: Option<u32>,
    pub signer_seeds: Vec<Secret<String>>,
    pub skip_signatures: bool,
    pub before_submit: Option<BeforeSubmitHandler>,

    pub cursor: Option<String>,
    pub limit: Option<u32>,
    pub sort_order: Option<SortOrder>,

    pub passive_offer: bool,

    pub send_asset: Option<Asset>,
    pub max_amount: Option<String>,
    pub path: Option<Vec<Asset>>,
    pub find_path_from: Option<String>,

    /// Fee-paying source of a multi-op transaction: a seed, or an address
    /// when signatures come from elsewhere.
    pub multi_op_source: Option<Secret<String>>,
    pub cancel: Option<CancellationToken>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick the configuration that applies out of several supplied ones.
    ///
    /// Only the first is honored; later ones are ignored, not merged.
    pub fn first_of(options: &[Self]) -> Self {
        options.first().cloned().unwrap_or_default()
    }

    pub fn with_memo_text(mut self, text: impl Into<String>) -> Self {
        self.memo = Memo::Text(text.into());
        self
    }

    pub fn with_memo_id(mut self, id: u64) -> Self {
        self.memo = Memo::Id(id);
        self
    }

    pub fn with_memo_hash(mut self, hash: [u8; 32]) -> Self {
        self.memo = Memo::Hash(hash);
        self
    }

    pub fn with_memo_return(mut self, hash: [u8; 32]) -> Self {
        self.memo = Memo::Return(hash);
        self
    }

    pub fn with_time_bounds(mut self, min: DateTime<Utc>, max: DateTime<Utc>) -> Self {
        self.min_time = Some(min);
        self.max_time = Some(max);
        self
    }

    pub fn with_min_time(mut self, min: DateTime<Utc>) -> Self {
        self.min_time = Some(min);
        self
    }

    pub fn with_max_time(mut self, max: DateTime<Utc>) -> Self {
        self.max_time = Some(max);
        self
    }

    pub fn with_fee(mut self, fee: u32) -> Self {
        self.fee = Some(fee);
        self
    }

    /// Sign with this seed instead of the keys passed to `sign`.
    pub fn with_signer(mut self, seed: impl Into<String>) -> Self {
        self.signer_seeds.push(Secret::new(seed.into()));
        self
    }

    /// Produce an unsigned envelope, e.g. for offline co-signing.
    pub fn skip_signatures(mut self) -> Self {
        self.skip_signatures = true;
        self
    }

    pub fn on_before_submit<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str) -> Result<bool, LedgerError> + Send + Sync + 'static,
    {
        self.before_submit = Some(Arc::new(handler));
        self
    }

    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_sort_order(mut self, order: SortOrder) -> Self {
        self.sort_order = Some(order);
        self
    }

    pub fn make_passive(mut self) -> Self {
        self.passive_offer = true;
        self
    }

    /// Pay with `asset`, spending at most `max_amount` of it.
    pub fn with_asset(mut self, asset: Asset, max_amount: impl Into<String>) -> Self {
        self.send_asset = Some(asset);
        self.max_amount = Some(max_amount.into());
        self
    }

    /// Route a path payment through these intermediate assets.
    pub fn through(mut self, assets: impl IntoIterator<Item = Asset>) -> Self {
        self.path.get_or_insert_with(Vec::new).extend(assets);
        self
    }

    /// Discover the payment path automatically, as seen from `address`.
    pub fn find_path_from(mut self, address: impl Into<String>) -> Self {
        self.find_path_from = Some(address.into());
        self
    }

    pub fn multi_op(mut self, fee_source: impl Into<String>) -> Self {
        self.multi_op_source = Some(Secret::new(fee_source.into()));
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn is_multi_op(&self) -> bool {
        self.multi_op_source.is_some()
    }

    pub fn has_time_bounds(&self) -> bool {
        self.min_time.is_some() || self.max_time.is_some()
    }

    /// Time bounds as unix seconds. A bound before the epoch clamps to zero.
    pub fn time_bounds(&self) -> Option<(u64, u64)> {
        match (self.min_time, self.max_time) {
            (Some(min), Some(max)) => Some((
                u64::try_from(min.timestamp()).unwrap_or(0),
                u64::try_from(max.timestamp()).unwrap_or(0),
            )),
            _ => None,
        }
    }

    /// Check the options for internal consistency.
    ///
    /// `min_time > max_time` is accepted; the ledger decides whether such
    /// bounds can ever be satisfied.
    pub fn validate(&self) -> Result<(), LedgerError> {
        self.memo.validate()?;

        if self.min_time.is_some() != self.max_time.is_some() {
            return Err(LedgerError::InvalidParameters(
                "time bounds need both a min and a max time".to_string(),
            ));
        }

        if self.path.is_some() && self.find_path_from.is_some() {
            return Err(LedgerError::InvalidParameters(
                "explicit path and path discovery are mutually exclusive".to_string(),
            ));
        }

        if let Some(asset) = &self.send_asset {
            asset.validate()?;
        }
        if let Some(max) = &self.max_amount {
            parse_amount(max)?;
        }
        if let Some(hops) = &self.path {
            for hop in hops {
                hop.validate()?;
            }
        }
        if let Some(address) = &self.find_path_from {
            strkey::validate_address(address)?;
        }
        if let Some(source) = &self.multi_op_source {
            let source = source.expose_secret();
            if strkey::validate_address(source).is_err() {
                strkey::validate_seed(source)?;
            }
        }
        for seed in &self.signer_seeds {
            strkey::validate_seed(seed.expose_secret())?;
        }

        Ok(())
    }

    /// Query parameters for paginated reads and streams.
    pub fn query_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(cursor) = &self.cursor {
            if cursor != CURSOR_START {
                params.push(("cursor".to_string(), cursor.clone()));
            }
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(order) = self.sort_order {
            params.push(("order".to_string(), order.as_str().to_string()));
        }
        params
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("memo", &self.memo)
            .field("min_time", &self.min_time)
            .field("max_time", &self.max_time)
            .field("fee", &self.fee)
            .field("signer_seeds", &self.signer_seeds.len())
            .field("skip_signatures", &self.skip_signatures)
            .field("has_before_submit", &self.before_submit.is_some())
            .field("cursor", &self.cursor)
            .field("limit", &self.limit)
            .field("sort_order", &self.sort_order)
            .field("passive_offer", &self.passive_offer)
            .field("send_asset", &self.send_asset)
            .field("max_amount", &self.max_amount)
            .field("path", &self.path)
            .field("find_path_from", &self.find_path_from)
            .field("multi_op", &self.multi_op_source.is_some())
            .finish_non_exhaustive()
    }
}
