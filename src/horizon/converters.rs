use crate::core::errors::LedgerError;
use crate::core::types::{
    Account, AccountFlags, AccountSigner, Asset, AssetKind, Balance, LedgerEntry, Offer,
    OrderBook, OrderBookEntry, PaymentEntry, PaymentPath, Price, Thresholds, TransactionEntry,
    TxResponse,
};
use crate::horizon::types::{
    HorizonAccount, HorizonAsset, HorizonLedger, HorizonOffer, HorizonOrderBook,
    HorizonOrderBookEntry, HorizonPath, HorizonPayment, HorizonPrice, HorizonSubmitResponse,
    HorizonTransaction,
};

/// Convert a Horizon `(type, code, issuer)` triple to a core `Asset`
pub fn convert_asset_parts(
    asset_type: &str,
    code: Option<&str>,
    issuer: Option<&str>,
) -> Result<Asset, LedgerError> {
    let kind = AssetKind::from_wire_name(asset_type)?;
    if kind == AssetKind::Native {
        return Ok(Asset::native());
    }
    Ok(Asset::new(
        code.unwrap_or_default(),
        issuer.unwrap_or_default(),
        kind,
    ))
}

pub fn convert_asset(asset: &HorizonAsset) -> Result<Asset, LedgerError> {
    convert_asset_parts(
        &asset.asset_type,
        asset.asset_code.as_deref(),
        asset.asset_issuer.as_deref(),
    )
}

/// Query parameters describing an asset, e.g. `selling_asset_type`
pub fn asset_query_params(prefix: &str, asset: &Asset) -> Vec<(String, String)> {
    let mut params = vec![(
        format!("{}asset_type", prefix),
        asset.kind.wire_name().to_string(),
    )];
    if !asset.is_native() {
        params.push((format!("{}asset_code", prefix), asset.code.clone()));
        params.push((format!("{}asset_issuer", prefix), asset.issuer.clone()));
    }
    params
}

/// Canonical `code:issuer` form used by the path endpoints' asset lists
pub fn asset_canonical(asset: &Asset) -> String {
    if asset.is_native() {
        "native".to_string()
    } else {
        format!("{}:{}", asset.code, asset.issuer)
    }
}

const fn convert_price(price: HorizonPrice) -> Price {
    Price::new(price.n, price.d)
}

/// Convert a Horizon account to core `Account` type
pub fn convert_account(account: HorizonAccount) -> Result<Account, LedgerError> {
    let sequence = account.sequence.parse::<i64>().map_err(|e| {
        LedgerError::DeserializationError(format!("invalid sequence {:?}: {}", account.sequence, e))
    })?;

    let balances = account
        .balances
        .into_iter()
        .map(|b| {
            Ok(Balance {
                asset: convert_asset_parts(
                    &b.asset_type,
                    b.asset_code.as_deref(),
                    b.asset_issuer.as_deref(),
                )?,
                amount: b.balance,
                limit: b.limit,
            })
        })
        .collect::<Result<Vec<_>, LedgerError>>()?;

    Ok(Account {
        address: account.id,
        sequence,
        balances,
        signers: account
            .signers
            .into_iter()
            .map(|s| AccountSigner {
                public_key: s.key,
                weight: s.weight,
            })
            .collect(),
        thresholds: Thresholds {
            low: account.thresholds.low_threshold,
            medium: account.thresholds.med_threshold,
            high: account.thresholds.high_threshold,
        },
        flags: AccountFlags {
            auth_required: account.flags.auth_required,
            auth_revocable: account.flags.auth_revocable,
            auth_immutable: account.flags.auth_immutable,
        },
        home_domain: account.home_domain.unwrap_or_default(),
        data: account.data,
    })
}

/// Convert a Horizon offer to core `Offer` type
pub fn convert_offer(offer: HorizonOffer) -> Result<Offer, LedgerError> {
    Ok(Offer {
        id: offer.id.parse().map_err(|_| {
            LedgerError::DeserializationError(format!("invalid offer id {:?}", offer.id))
        })?,
        seller: offer.seller,
        selling: convert_asset(&offer.selling)?,
        buying: convert_asset(&offer.buying)?,
        amount: offer.amount,
        price: offer.price,
        price_r: convert_price(offer.price_r),
    })
}

fn convert_order_book_entry(entry: HorizonOrderBookEntry) -> OrderBookEntry {
    OrderBookEntry {
        price: entry.price,
        amount: entry.amount,
        price_r: convert_price(entry.price_r),
    }
}

/// Convert a Horizon order book to core `OrderBook` type
pub fn convert_order_book(book: HorizonOrderBook) -> Result<OrderBook, LedgerError> {
    Ok(OrderBook {
        selling: convert_asset(&book.base)?,
        buying: convert_asset(&book.counter)?,
        bids: book.bids.into_iter().map(convert_order_book_entry).collect(),
        asks: book.asks.into_iter().map(convert_order_book_entry).collect(),
    })
}

/// Convert a Horizon path record to core `PaymentPath` type
pub fn convert_path(path: HorizonPath) -> Result<PaymentPath, LedgerError> {
    Ok(PaymentPath {
        source_asset: convert_asset_parts(
            &path.source_asset_type,
            path.source_asset_code.as_deref(),
            path.source_asset_issuer.as_deref(),
        )?,
        source_amount: path.source_amount,
        destination_asset: convert_asset_parts(
            &path.destination_asset_type,
            path.destination_asset_code.as_deref(),
            path.destination_asset_issuer.as_deref(),
        )?,
        destination_amount: path.destination_amount,
        path: path
            .path
            .iter()
            .map(convert_asset)
            .collect::<Result<Vec<_>, _>>()?,
    })
}

/// Convert a streamed payment-like operation to core `PaymentEntry` type
///
/// `create_account` records carry `funder`/`account`/`starting_balance`
/// instead of `from`/`to`/`amount` and always move the native asset.
pub fn convert_payment(payment: HorizonPayment) -> Result<PaymentEntry, LedgerError> {
    let asset = match payment.asset_type.as_deref() {
        Some(asset_type) => Some(convert_asset_parts(
            asset_type,
            payment.asset_code.as_deref(),
            payment.asset_issuer.as_deref(),
        )?),
        None if payment.payment_type == "create_account" => Some(Asset::native()),
        None => None,
    };

    Ok(PaymentEntry {
        id: payment.id,
        paging_token: payment.paging_token,
        kind: payment.payment_type,
        from: payment
            .from
            .or(payment.funder)
            .or(payment.source_account)
            .unwrap_or_default(),
        to: payment.to.or(payment.account).unwrap_or_default(),
        asset,
        amount: payment
            .amount
            .or(payment.starting_balance)
            .unwrap_or_default(),
        transaction_hash: payment.transaction_hash,
        created_at: payment.created_at,
        memo_type: None,
        memo: None,
    })
}

/// Convert a Horizon transaction to core `TransactionEntry` type
pub fn convert_transaction(tx: HorizonTransaction) -> TransactionEntry {
    TransactionEntry {
        id: tx.id,
        paging_token: tx.paging_token,
        hash: tx.hash,
        ledger: tx.ledger,
        source_account: tx.source_account,
        fee_charged: tx.fee_charged,
        operation_count: tx.operation_count,
        memo_type: tx.memo_type,
        memo: tx.memo,
        successful: tx.successful,
        created_at: tx.created_at,
    }
}

/// Convert a Horizon ledger to core `LedgerEntry` type
pub fn convert_ledger(ledger: HorizonLedger) -> LedgerEntry {
    LedgerEntry {
        id: ledger.id,
        paging_token: ledger.paging_token,
        hash: ledger.hash,
        sequence: ledger.sequence,
        transaction_count: ledger.successful_transaction_count,
        operation_count: ledger.operation_count,
        closed_at: ledger.closed_at,
        total_coins: ledger.total_coins,
        base_fee: ledger.base_fee_in_stroops,
    }
}

pub fn convert_submit_response(response: HorizonSubmitResponse) -> TxResponse {
    TxResponse {
        hash: response.hash,
        ledger: response.ledger,
        envelope_xdr: response.envelope_xdr,
        result_xdr: response.result_xdr,
        submitted: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISSUER: &str = "GAVQK5QMS6TNUZNS3TXDV5RKFIHLSMWDYZQR5ZV72VJT2SL4JMJXWQZE";

    #[test]
    fn test_asset_query_params() {
        let params = asset_query_params("selling_", &Asset::credit("USD", ISSUER));
        assert_eq!(
            params,
            vec![
                ("selling_asset_type".to_string(), "credit_alphanum4".to_string()),
                ("selling_asset_code".to_string(), "USD".to_string()),
                ("selling_asset_issuer".to_string(), ISSUER.to_string()),
            ]
        );
        assert_eq!(asset_query_params("buying_", &Asset::native()).len(), 1);
    }

    #[test]
    fn test_convert_create_account_payment() {
        let payment: HorizonPayment = serde_json::from_value(serde_json::json!({
            "id": "1", "paging_token": "1", "type": "create_account",
            "funder": "GFUNDER", "account": "GNEW", "starting_balance": "10.0000000",
            "transaction_hash": "abc", "created_at": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        let entry = convert_payment(payment).unwrap();
        assert_eq!(entry.from, "GFUNDER");
        assert_eq!(entry.to, "GNEW");
        assert_eq!(entry.amount, "10.0000000");
        assert_eq!(entry.asset, Some(Asset::native()));
    }

    #[test]
    fn test_convert_account_rejects_bad_sequence() {
        let account: HorizonAccount =
            serde_json::from_str(r#"{"id":"GA","sequence":"not-a-number"}"#).unwrap();
        assert!(convert_account(account).is_err());
    }
}
