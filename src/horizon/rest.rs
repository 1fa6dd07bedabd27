use crate::core::errors::LedgerError;
use crate::core::options::Options;
use crate::core::traits::LedgerQuery;
use crate::core::types::{Account, Asset, Offer, OrderBook, PaymentPath};
use crate::horizon::converters::{
    asset_query_params, convert_account, convert_offer, convert_order_book, convert_path,
};
use crate::horizon::types::{
    FederationRecord, HorizonAccount, HorizonOffer, HorizonOrderBook, HorizonPage, HorizonPath,
    HorizonTransaction, StellarToml,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

pub const FRIENDBOT_URL: &str = "https://friendbot.stellar.org/";

/// Thin typed wrapper around `LedgerQuery` for the Horizon API
pub struct HorizonApi<'a, Q: LedgerQuery + ?Sized> {
    client: &'a Q,
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, LedgerError> {
    serde_json::from_value(value).map_err(|e| {
        LedgerError::DeserializationError(format!("Failed to deserialize Horizon record: {}", e))
    })
}

fn borrow_params(params: &[(String, String)]) -> Vec<(&str, &str)> {
    params
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect()
}

impl<'a, Q: LedgerQuery + ?Sized> HorizonApi<'a, Q> {
    pub const fn new(client: &'a Q) -> Self {
        Self { client }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<T, LedgerError> {
        let value = self.client.query(path, &borrow_params(params)).await?;
        decode(value)
    }

    /// Get an account's state
    pub async fn account(&self, address: &str) -> Result<Account, LedgerError> {
        let account: HorizonAccount = self.get(&format!("/accounts/{}", address), &[]).await?;
        convert_account(account)
    }

    /// Get the current sequence number of an account
    pub async fn sequence(&self, address: &str) -> Result<i64, LedgerError> {
        Ok(self.account(address).await?.sequence)
    }

    /// Get the open offers of an account
    pub async fn offers(&self, address: &str, opts: &Options) -> Result<Vec<Offer>, LedgerError> {
        let page: HorizonPage<HorizonOffer> = self
            .get(&format!("/accounts/{}/offers", address), &opts.query_params())
            .await?;
        page.embedded
            .records
            .into_iter()
            .map(convert_offer)
            .collect()
    }

    /// Get the order book between two assets
    pub async fn order_book(
        &self,
        selling: &Asset,
        buying: &Asset,
        opts: &Options,
    ) -> Result<OrderBook, LedgerError> {
        let mut params = asset_query_params("selling_", selling);
        params.extend(asset_query_params("buying_", buying));
        params.extend(
            opts.limit
                .map(|limit| ("limit".to_string(), limit.to_string())),
        );
        let book: HorizonOrderBook = self.get("/order_book", &params).await?;
        convert_order_book(book)
    }

    /// Find payment paths that deliver `dest_amount` of `dest_asset`
    pub async fn paths(
        &self,
        source: &str,
        destination: &str,
        dest_asset: &Asset,
        dest_amount: &str,
    ) -> Result<Vec<PaymentPath>, LedgerError> {
        let mut params = vec![
            ("source_account".to_string(), source.to_string()),
            ("destination_account".to_string(), destination.to_string()),
        ];
        params.extend(asset_query_params("destination_", dest_asset));
        params.push(("destination_amount".to_string(), dest_amount.to_string()));

        let page: HorizonPage<HorizonPath> = self.get("/paths", &params).await?;
        debug!(count = page.embedded.records.len(), "Received payment paths");
        page.embedded
            .records
            .into_iter()
            .map(convert_path)
            .collect()
    }

    /// Get a transaction record by hash
    pub async fn transaction(&self, hash: &str) -> Result<HorizonTransaction, LedgerError> {
        self.get(&format!("/transactions/{}", hash), &[]).await
    }

    /// Read the `stellar.toml` a domain publishes
    pub async fn stellar_toml(&self, domain: &str) -> Result<StellarToml, LedgerError> {
        let url = format!("https://{}/.well-known/stellar.toml", domain);
        let text = self.client.query_text(&url, &[]).await?;
        toml::from_str(&text).map_err(|e| {
            LedgerError::DeserializationError(format!("invalid stellar.toml for {}: {}", domain, e))
        })
    }

    /// Look up a `name*domain` address on a federation server
    pub async fn federation(
        &self,
        server_url: &str,
        address: &str,
    ) -> Result<FederationRecord, LedgerError> {
        let value = self
            .client
            .query(server_url, &[("q", address), ("type", "name")])
            .await?;
        decode(value)
    }

    /// Ask the test network's faucet to fund an account
    pub async fn friendbot(&self, address: &str) -> Result<Value, LedgerError> {
        self.client.query(FRIENDBOT_URL, &[("addr", address)]).await
    }
}
