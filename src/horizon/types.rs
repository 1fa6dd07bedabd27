use crate::core::errors::ResultCodes;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

// Horizon reports some numeric fields as strings and others as numbers,
// depending on server version.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Num(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Num(n) => n.to_string(),
    })
}

// REST API Response Types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HorizonPage<T> {
    #[serde(rename = "_embedded")]
    pub embedded: HorizonRecords<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HorizonRecords<T> {
    pub records: Vec<T>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HorizonAsset {
    pub asset_type: String,
    #[serde(default)]
    pub asset_code: Option<String>,
    #[serde(default)]
    pub asset_issuer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HorizonBalance {
    pub balance: String,
    #[serde(default)]
    pub limit: Option<String>,
    pub asset_type: String,
    #[serde(default)]
    pub asset_code: Option<String>,
    #[serde(default)]
    pub asset_issuer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HorizonSigner {
    pub key: String,
    pub weight: u32,
    #[serde(rename = "type", default)]
    pub signer_type: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HorizonThresholds {
    pub low_threshold: u8,
    pub med_threshold: u8,
    pub high_threshold: u8,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HorizonFlags {
    #[serde(default)]
    pub auth_required: bool,
    #[serde(default)]
    pub auth_revocable: bool,
    #[serde(default)]
    pub auth_immutable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HorizonAccount {
    #[serde(alias = "account_id")]
    pub id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub sequence: String,
    #[serde(default)]
    pub balances: Vec<HorizonBalance>,
    #[serde(default)]
    pub signers: Vec<HorizonSigner>,
    #[serde(default)]
    pub thresholds: HorizonThresholds,
    #[serde(default)]
    pub flags: HorizonFlags,
    #[serde(default)]
    pub home_domain: Option<String>,
    #[serde(default)]
    pub data: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HorizonPrice {
    pub n: i32,
    pub d: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HorizonOffer {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub seller: String,
    pub selling: HorizonAsset,
    pub buying: HorizonAsset,
    pub amount: String,
    pub price_r: HorizonPrice,
    pub price: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HorizonOrderBookEntry {
    pub price_r: HorizonPrice,
    pub price: String,
    pub amount: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HorizonOrderBook {
    #[serde(default)]
    pub bids: Vec<HorizonOrderBookEntry>,
    #[serde(default)]
    pub asks: Vec<HorizonOrderBookEntry>,
    pub base: HorizonAsset,
    pub counter: HorizonAsset,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HorizonPath {
    pub source_asset_type: String,
    #[serde(default)]
    pub source_asset_code: Option<String>,
    #[serde(default)]
    pub source_asset_issuer: Option<String>,
    pub source_amount: String,
    pub destination_asset_type: String,
    #[serde(default)]
    pub destination_asset_code: Option<String>,
    #[serde(default)]
    pub destination_asset_issuer: Option<String>,
    pub destination_amount: String,
    #[serde(default)]
    pub path: Vec<HorizonAsset>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HorizonSubmitResponse {
    pub hash: String,
    #[serde(default)]
    pub ledger: Option<u32>,
    #[serde(default)]
    pub envelope_xdr: String,
    #[serde(default)]
    pub result_xdr: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HorizonProblemExtras {
    #[serde(default)]
    pub result_codes: Option<ResultCodes>,
    #[serde(default)]
    pub envelope_xdr: Option<String>,
    #[serde(default)]
    pub result_xdr: Option<String>,
}

/// RFC 7807 problem document returned on errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HorizonProblem {
    #[serde(rename = "type", default)]
    pub problem_type: String,
    pub title: String,
    pub status: u16,
    #[serde(default)]
    pub detail: String,
    #[serde(default)]
    pub extras: Option<HorizonProblemExtras>,
}

// Streaming Types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HorizonPayment {
    pub id: String,
    pub paging_token: String,
    #[serde(rename = "type")]
    pub payment_type: String,
    #[serde(default)]
    pub source_account: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    /// create_account: the new account
    #[serde(default)]
    pub account: Option<String>,
    /// create_account: the funding account
    #[serde(default)]
    pub funder: Option<String>,
    #[serde(default)]
    pub starting_balance: Option<String>,
    #[serde(default)]
    pub asset_type: Option<String>,
    #[serde(default)]
    pub asset_code: Option<String>,
    #[serde(default)]
    pub asset_issuer: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub transaction_hash: String,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HorizonTransaction {
    pub id: String,
    pub paging_token: String,
    pub hash: String,
    pub ledger: u32,
    pub source_account: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub fee_charged: String,
    #[serde(default)]
    pub operation_count: u32,
    #[serde(default)]
    pub memo_type: String,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub successful: bool,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HorizonLedger {
    pub id: String,
    pub paging_token: String,
    pub hash: String,
    pub sequence: u32,
    #[serde(default, alias = "transaction_count")]
    pub successful_transaction_count: u32,
    #[serde(default)]
    pub operation_count: u32,
    #[serde(default)]
    pub closed_at: String,
    #[serde(default)]
    pub total_coins: String,
    #[serde(default)]
    pub base_fee_in_stroops: u32,
}

// Federation Types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederationRecord {
    #[serde(default)]
    pub stellar_address: Option<String>,
    pub account_id: String,
    #[serde(default)]
    pub memo_type: Option<String>,
    #[serde(default)]
    pub memo: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StellarToml {
    #[serde(rename = "FEDERATION_SERVER", default)]
    pub federation_server: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_sequence_as_string_or_number() {
        let account: HorizonAccount =
            serde_json::from_str(r#"{"id":"GA","sequence":"123"}"#).unwrap();
        assert_eq!(account.sequence, "123");
        let account: HorizonAccount =
            serde_json::from_str(r#"{"account_id":"GA","sequence":456}"#).unwrap();
        assert_eq!(account.sequence, "456");
    }

    #[test]
    fn test_problem_with_result_codes() {
        let problem: HorizonProblem = serde_json::from_str(
            r#"{"type":"https://stellar.org/horizon-errors/transaction_failed",
                "title":"Transaction Failed","status":400,"detail":"failed",
                "extras":{"result_codes":{"transaction":"tx_failed","operations":["op_no_trust"]}}}"#,
        )
        .unwrap();
        let codes = problem.extras.unwrap().result_codes.unwrap();
        assert_eq!(codes.transaction, "tx_failed");
        assert_eq!(codes.operations, vec!["op_no_trust"]);
    }

    #[test]
    fn test_stellar_toml_federation_server() {
        let parsed: StellarToml = toml::from_str(
            "VERSION=\"2.0.0\"\nFEDERATION_SERVER=\"https://fed.example.com/federation\"\n",
        )
        .unwrap();
        assert_eq!(
            parsed.federation_server.as_deref(),
            Some("https://fed.example.com/federation")
        );
    }
}
