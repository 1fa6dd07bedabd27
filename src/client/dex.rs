use crate::client::LedgerClient;
use crate::core::{
    errors::LedgerError,
    kernel::strkey,
    options::Options,
    traits::LedgerTransport,
    types::{
        parse_amount, Asset, Offer, OfferParams, OfferType, OrderBook, PaymentPath, Price,
        TxResponse,
    },
};
use crate::tx::Operation;
use tracing::{debug, instrument};

fn require_offer_id(params: &OfferParams) -> Result<i64, LedgerError> {
    let raw = params
        .offer_id
        .as_deref()
        .ok_or_else(|| LedgerError::InvalidOfferId("an existing offer id is required".to_string()))?;
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(LedgerError::InvalidOfferId(raw.to_string())),
    }
}

fn reject_offer_id(params: &OfferParams) -> Result<(), LedgerError> {
    match params.offer_id.as_deref() {
        Some(id) if !id.is_empty() => Err(LedgerError::InvalidOfferId(format!(
            "new offers cannot carry an id, got {}",
            id
        ))),
        _ => Ok(()),
    }
}

/// Translate an offer intent into its ledger operation
pub fn offer_operation(params: &OfferParams, passive: bool) -> Result<Operation, LedgerError> {
    params.sell_asset.validate()?;
    params.buy_asset.validate()?;
    let price: Price = params.price.parse()?;

    let (selling, buying) = (&params.sell_asset, &params.buy_asset);
    match params.offer_type {
        OfferType::Create if !passive => {
            reject_offer_id(params)?;
            Operation::manage_sell_offer(selling, buying, &params.amount, price, 0)
        }
        OfferType::Create | OfferType::CreatePassive => {
            reject_offer_id(params)?;
            Operation::create_passive_sell_offer(selling, buying, &params.amount, price)
        }
        OfferType::Update => {
            let id = require_offer_id(params)?;
            Operation::manage_sell_offer(selling, buying, &params.amount, price, id)
        }
        OfferType::Delete => {
            let id = require_offer_id(params)?;
            Operation::manage_sell_offer(selling, buying, "0", price, id)
        }
    }
}

/// Keep only paths that spend `send_asset` and cost at most `max_amount`.
///
/// Amounts are compared as stroops; a path whose source amount does not
/// parse is dropped.
pub fn filter_paths(
    paths: Vec<PaymentPath>,
    send_asset: Option<&Asset>,
    max_amount: Option<&str>,
) -> Result<Vec<PaymentPath>, LedgerError> {
    let max = max_amount.map(parse_amount).transpose()?;

    Ok(paths
        .into_iter()
        .filter(|path| send_asset.map_or(true, |asset| path.source_asset.equals(asset)))
        .filter(|path| match max {
            Some(max) => parse_amount(&path.source_amount).is_ok_and(|cost| cost <= max),
            None => true,
        })
        .collect())
}

impl<T: LedgerTransport> LedgerClient<T> {
    /// Create, update or delete an offer on the built-in exchange.
    ///
    /// `Options::make_passive` turns a `Create` into a passive offer.
    #[instrument(skip(self, source_seed, options), fields(network = %self.config().network.name(), offer_type = ?params.offer_type))]
    pub async fn manage_offer(
        &self,
        source_seed: &str,
        params: &OfferParams,
        options: Options,
    ) -> Result<TxResponse, LedgerError> {
        let op = offer_operation(params, options.passive_offer)?;
        self.execute(source_seed, vec![op], options).await
    }

    /// Open offers of an account, paged by the options' cursor, limit and order
    pub async fn load_offers(
        &self,
        address: &str,
        options: &Options,
    ) -> Result<Vec<Offer>, LedgerError> {
        strkey::validate_address(address)?;
        if self.is_fake() {
            return Ok(Vec::new());
        }
        self.api().offers(address, options).await
    }

    pub async fn load_order_book(
        &self,
        selling: &Asset,
        buying: &Asset,
        options: &Options,
    ) -> Result<OrderBook, LedgerError> {
        selling.validate()?;
        buying.validate()?;
        if self.is_fake() {
            return Ok(OrderBook::empty(selling.clone(), buying.clone()));
        }
        self.api().order_book(selling, buying, options).await
    }

    /// Paths from `source` that deliver `dest_amount` of `dest_asset` to `destination`.
    ///
    /// The server's candidates are filtered locally by the sending asset and
    /// maximum spend set with `Options::with_asset`.
    pub async fn find_paths(
        &self,
        source: &str,
        destination: &str,
        dest_asset: &Asset,
        dest_amount: &str,
        options: &Options,
    ) -> Result<Vec<PaymentPath>, LedgerError> {
        strkey::validate_address(source)?;
        strkey::validate_address(destination)?;
        dest_asset.validate()?;
        parse_amount(dest_amount)?;
        if self.is_fake() {
            return Ok(Vec::new());
        }

        let candidates = self
            .api()
            .paths(source, destination, dest_asset, dest_amount)
            .await?;
        let total = candidates.len();
        let paths = filter_paths(
            candidates,
            options.send_asset.as_ref(),
            options.max_amount.as_deref(),
        )?;
        debug!(total, kept = paths.len(), "Filtered payment paths");
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::OperationBody;

    const ISSUER: &str = "GAUYTZ24ATLEBIV63MXMPOPQO2T6NHI6TQYEXRTFYXWYZ3JOCVO6UYUM";

    fn params(offer_type: OfferType, offer_id: Option<&str>) -> OfferParams {
        OfferParams {
            offer_type,
            sell_asset: Asset::native(),
            buy_asset: Asset::credit("USD", ISSUER),
            price: "0.25".to_string(),
            amount: "100".to_string(),
            offer_id: offer_id.map(str::to_string),
        }
    }

    fn path(source_asset: Asset, source_amount: &str) -> PaymentPath {
        PaymentPath {
            source_asset,
            source_amount: source_amount.to_string(),
            destination_asset: Asset::credit("USD", ISSUER),
            destination_amount: "10".to_string(),
            path: Vec::new(),
        }
    }

    #[test]
    fn test_delete_with_non_numeric_id() {
        let err = offer_operation(&params(OfferType::Delete, Some("abc")), false).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidOfferId(_)));
    }

    #[test]
    fn test_update_requires_id_and_create_rejects_one() {
        assert!(matches!(
            offer_operation(&params(OfferType::Update, None), false),
            Err(LedgerError::InvalidOfferId(_))
        ));
        assert!(matches!(
            offer_operation(&params(OfferType::Create, Some("12")), false),
            Err(LedgerError::InvalidOfferId(_))
        ));
    }

    #[test]
    fn test_dispatch_by_offer_type() {
        let op = offer_operation(&params(OfferType::Create, None), false).unwrap();
        assert!(matches!(
            op.body,
            OperationBody::ManageSellOffer { offer_id: 0, price, .. } if price == Price::new(1, 4)
        ));

        let op = offer_operation(&params(OfferType::Create, None), true).unwrap();
        assert!(matches!(op.body, OperationBody::CreatePassiveSellOffer { .. }));

        let op = offer_operation(&params(OfferType::Delete, Some("77")), false).unwrap();
        assert!(matches!(
            op.body,
            OperationBody::ManageSellOffer { offer_id: 77, amount: 0, .. }
        ));
    }

    #[test]
    fn test_filter_paths_by_asset_and_max() {
        let usd = Asset::credit("USD", ISSUER);
        let paths = vec![
            path(Asset::native(), "5"),
            path(Asset::native(), "20"),
            path(usd.clone(), "1"),
        ];

        let kept = filter_paths(paths.clone(), Some(&Asset::native()), Some("10")).unwrap();
        assert_eq!(kept, vec![path(Asset::native(), "5")]);

        let kept = filter_paths(paths.clone(), Some(&usd), None).unwrap();
        assert_eq!(kept.len(), 1);

        assert_eq!(filter_paths(paths, None, None).unwrap().len(), 3);
    }

    #[test]
    fn test_filter_paths_compares_fixed_point() {
        let paths = vec![path(Asset::native(), "10.0000001"), path(Asset::native(), "10")];
        let kept = filter_paths(paths, None, Some("10.0000000")).unwrap();
        assert_eq!(kept, vec![path(Asset::native(), "10")]);
    }
}
