mod common;

use common::*;
use ledgerx::client::filter_paths;
use ledgerx::core::kernel::ReadXdr;
use ledgerx::tx::{OperationBody, TransactionEnvelope};
use ledgerx::{
    to_amount_string, Asset, LedgerError, NetworkConfig, OfferParams, OfferType, Options,
    PaymentPath,
};
use proptest::prelude::*;
use serde_json::{json, Value};

#[cfg(test)]
mod dex_tests {
    use super::*;

    fn usd() -> Asset {
        Asset::credit("USD", ISSUER)
    }

    fn eur() -> Asset {
        Asset::credit("EUR", ISSUER)
    }

    fn credit_json(code: &str) -> Value {
        json!({"asset_type": "credit_alphanum4", "asset_code": code, "asset_issuer": ISSUER})
    }

    fn path_json(source_amount: &str, hops: Vec<Value>) -> Value {
        json!({
            "source_asset_type": "native",
            "source_amount": source_amount,
            "destination_asset_type": "credit_alphanum4",
            "destination_asset_code": "USD",
            "destination_asset_issuer": ISSUER,
            "destination_amount": "10.0000000",
            "path": hops
        })
    }

    fn page(records: Vec<Value>) -> Value {
        json!({"_embedded": {"records": records}})
    }

    fn offer(offer_type: OfferType, offer_id: Option<&str>) -> OfferParams {
        OfferParams {
            offer_type,
            sell_asset: Asset::native(),
            buy_asset: usd(),
            price: "0.25".to_string(),
            amount: "100".to_string(),
            offer_id: offer_id.map(str::to_string),
        }
    }

    fn path(source_amount: &str) -> PaymentPath {
        PaymentPath {
            source_asset: Asset::native(),
            source_amount: source_amount.to_string(),
            destination_asset: usd(),
            destination_amount: "10".to_string(),
            path: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_delete_with_bad_id_fails_before_io() {
        let (mock, client) = mock_client(NetworkConfig::test());

        let err = client
            .manage_offer(SEED, &offer(OfferType::Delete, Some("abc")), Options::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidOfferId(_)));
        assert!(mock.query_paths().is_empty());
        assert!(mock.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_passive_option_changes_create() {
        let (mock, client) = mock_client(NetworkConfig::test());

        client
            .manage_offer(SEED, &offer(OfferType::Create, None), Options::new().make_passive())
            .await
            .unwrap();
        client
            .manage_offer(SEED, &offer(OfferType::Update, Some("42")), Options::new())
            .await
            .unwrap();

        let submissions = mock.submissions();
        let passive = TransactionEnvelope::from_xdr_base64(&submissions[0]).unwrap();
        assert!(matches!(
            passive.tx.operations[0].body,
            OperationBody::CreatePassiveSellOffer { .. }
        ));
        let update = TransactionEnvelope::from_xdr_base64(&submissions[1]).unwrap();
        assert!(matches!(
            update.tx.operations[0].body,
            OperationBody::ManageSellOffer { offer_id: 42, amount: 1_000_000_000, .. }
        ));
    }

    #[tokio::test]
    async fn test_load_offers_pages_with_options() {
        let (mock, client) = mock_client(NetworkConfig::test());
        mock.respond(
            &format!("/accounts/{}/offers", ADDRESS),
            page(vec![json!({
                "id": "42",
                "seller": ADDRESS,
                "selling": {"asset_type": "native"},
                "buying": credit_json("USD"),
                "amount": "10.0000000",
                "price_r": {"n": 1, "d": 4},
                "price": "0.2500000"
            })]),
        );

        let offers = client
            .load_offers(ADDRESS, &Options::new().with_limit(5).with_cursor("99"))
            .await
            .unwrap();
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].id, 42);
        assert_eq!(offers[0].selling, Asset::native());
        assert_eq!(offers[0].buying, usd());

        let queries = mock.queries.lock().unwrap().clone();
        let (_, params) = queries.last().unwrap();
        assert!(params.contains(&("limit".to_string(), "5".to_string())));
        assert!(params.contains(&("cursor".to_string(), "99".to_string())));
    }

    #[tokio::test]
    async fn test_fake_reads_are_empty() {
        let (mock, client) = mock_client(NetworkConfig::fake());

        assert!(client.load_offers(ADDRESS, &Options::new()).await.unwrap().is_empty());
        let book = client
            .load_order_book(&Asset::native(), &usd(), &Options::new())
            .await
            .unwrap();
        assert!(book.bids.is_empty() && book.asks.is_empty());
        assert_eq!(client.load_account(ADDRESS).await.unwrap().address, ADDRESS);
        assert!(mock.query_paths().is_empty());
    }

    #[tokio::test]
    async fn test_find_paths_filters_by_max_spend() {
        let (mock, client) = mock_client(NetworkConfig::test());
        mock.respond(
            "/paths",
            page(vec![
                path_json("5.0000000", Vec::new()),
                path_json("20.0000000", Vec::new()),
            ]),
        );

        let all = client
            .find_paths(ADDRESS, DEST, &usd(), "10", &Options::new())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let affordable = client
            .find_paths(
                ADDRESS,
                DEST,
                &usd(),
                "10",
                &Options::new().with_asset(Asset::native(), "10"),
            )
            .await
            .unwrap();
        assert_eq!(affordable.len(), 1);
        assert_eq!(affordable[0].source_amount, "5.0000000");
    }

    #[tokio::test]
    async fn test_path_payment_uses_discovered_path() {
        let (mock, client) = mock_client(NetworkConfig::test());
        mock.respond("/paths", page(vec![path_json("8.0000000", vec![credit_json("EUR")])]));

        client
            .pay(
                SEED,
                DEST,
                "10",
                &usd(),
                Options::new()
                    .with_asset(Asset::native(), "10")
                    .find_path_from(ADDRESS),
            )
            .await
            .unwrap();

        let envelope = TransactionEnvelope::from_xdr_base64(&mock.submissions()[0]).unwrap();
        match &envelope.tx.operations[0].body {
            OperationBody::PathPaymentStrictReceive {
                send_asset,
                send_max,
                path,
                ..
            } => {
                assert_eq!(send_asset, &Asset::native());
                assert_eq!(*send_max, 100_000_000);
                assert_eq!(path, &vec![eur()]);
            }
            other => panic!("unexpected operation {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_path_payment_without_affordable_path() {
        let (mock, client) = mock_client(NetworkConfig::test());
        mock.respond("/paths", page(vec![path_json("50.0000000", Vec::new())]));

        let err = client
            .pay(
                SEED,
                DEST,
                "10",
                &usd(),
                Options::new()
                    .with_asset(Asset::native(), "10")
                    .find_path_from(ADDRESS),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidParameters(_)));
        assert!(mock.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_explicit_path_skips_discovery() {
        let (mock, client) = mock_client(NetworkConfig::test());

        client
            .pay(
                SEED,
                DEST,
                "10",
                &usd(),
                Options::new()
                    .with_asset(Asset::native(), "10")
                    .through([eur()]),
            )
            .await
            .unwrap();

        assert!(!mock.query_paths().contains(&"/paths".to_string()));
        assert_eq!(mock.submissions().len(), 1);
    }

    proptest! {
        #[test]
        fn prop_filter_keeps_exactly_affordable_paths(
            costs in prop::collection::vec(1i64..10_000_000_000, 0..16),
            max in 1i64..10_000_000_000,
        ) {
            let paths: Vec<PaymentPath> = costs
                .iter()
                .map(|cost| path(&to_amount_string(*cost)))
                .collect();

            let max_amount = to_amount_string(max);
            let kept = filter_paths(paths, Some(&Asset::native()), Some(max_amount.as_str()))
                .unwrap();

            let expected = costs.iter().filter(|cost| **cost <= max).count();
            prop_assert_eq!(kept.len(), expected);
            for kept_path in &kept {
                prop_assert!(ledgerx::parse_amount(&kept_path.source_amount).unwrap() <= max);
            }
        }

        #[test]
        fn prop_filter_by_other_asset_keeps_nothing(
            costs in prop::collection::vec(1i64..1_000_000, 0..8),
        ) {
            let paths: Vec<PaymentPath> = costs
                .iter()
                .map(|cost| path(&to_amount_string(*cost)))
                .collect();
            prop_assert!(filter_paths(paths, Some(&usd()), None).unwrap().is_empty());
        }
    }
}
