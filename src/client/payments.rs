use crate::client::LedgerClient;
use crate::core::{
    errors::LedgerError,
    options::Options,
    traits::{LedgerQuery, LedgerTransport},
    types::{Asset, PaymentEntry, TxResponse},
};
use crate::horizon::HorizonApi;
use crate::tx::Operation;
use tracing::{debug, instrument};

impl<T: LedgerTransport> LedgerClient<T> {
    /// Send `amount` of `asset` to `target`.
    ///
    /// With `Options::with_asset` the payment becomes a path payment that
    /// spends at most the given amount of the sending asset, routed through
    /// the hops from `Options::through` or a path discovered from the
    /// `Options::find_path_from` account.
    #[instrument(skip(self, source_seed, options), fields(network = %self.config().network.name()))]
    pub async fn pay(
        &self,
        source_seed: &str,
        target: &str,
        amount: &str,
        asset: &Asset,
        options: Options,
    ) -> Result<TxResponse, LedgerError> {
        options.validate()?;

        let op = match (&options.send_asset, &options.max_amount) {
            (Some(send_asset), Some(send_max)) => {
                let path = self
                    .payment_path(target, amount, asset, send_asset, send_max, &options)
                    .await?;
                Operation::path_payment(target, asset, amount, send_asset, send_max, &path)?
            }
            _ => Operation::payment(target, asset, amount)?,
        };

        self.execute(source_seed, vec![op], options).await
    }

    /// Send native currency to `target`
    pub async fn pay_native(
        &self,
        source_seed: &str,
        target: &str,
        amount: &str,
        options: Options,
    ) -> Result<TxResponse, LedgerError> {
        self.pay(source_seed, target, amount, &Asset::native(), options)
            .await
    }

    async fn payment_path(
        &self,
        target: &str,
        amount: &str,
        asset: &Asset,
        send_asset: &Asset,
        send_max: &str,
        options: &Options,
    ) -> Result<Vec<Asset>, LedgerError> {
        if let Some(path) = &options.path {
            return Ok(path.clone());
        }
        let Some(from) = &options.find_path_from else {
            return Ok(Vec::new());
        };
        if self.is_fake() {
            return Ok(Vec::new());
        }

        let search = Options::new().with_asset(send_asset.clone(), send_max);
        let paths = self
            .find_paths(from, target, asset, amount, &search)
            .await?;
        let first = paths.into_iter().next().ok_or_else(|| {
            LedgerError::InvalidParameters(format!(
                "no payment path delivers {} {} for at most {} {}",
                amount, asset, send_max, send_asset
            ))
        })?;
        debug!(hops = first.path.len(), source_amount = %first.source_amount, "Using discovered path");
        Ok(first.path)
    }
}

/// Fill in the memo of a payment from its parent transaction.
///
/// Best effort: lookup failures are logged and the entry is left as is.
pub async fn load_payment_memo<Q: LedgerQuery + ?Sized>(query: &Q, entry: &mut PaymentEntry) {
    if entry.transaction_hash.is_empty() {
        return;
    }
    match HorizonApi::new(query)
        .transaction(&entry.transaction_hash)
        .await
    {
        Ok(tx) => {
            entry.memo_type = Some(tx.memo_type);
            entry.memo = tx.memo;
        }
        Err(e) => {
            debug!(hash = %entry.transaction_hash, error = %e, "Could not load payment memo");
        }
    }
}
