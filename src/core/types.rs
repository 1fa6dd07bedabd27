use crate::core::errors::LedgerError;
use crate::core::kernel::strkey;
use base64::engine::general_purpose;
use base64::Engine;
use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Number of stroops in one unit of any asset.
pub const STROOPS_PER_UNIT: i64 = 10_000_000;
const AMOUNT_DECIMALS: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Native,
    Credit4,
    Credit12,
}

impl AssetKind {
    pub const fn max_code_len(self) -> usize {
        match self {
            Self::Native => 0,
            Self::Credit4 => 4,
            Self::Credit12 => 12,
        }
    }

    /// Name used by the ledger's REST API.
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Credit4 => "credit_alphanum4",
            Self::Credit12 => "credit_alphanum12",
        }
    }

    pub fn from_wire_name(name: &str) -> Result<Self, LedgerError> {
        match name {
            "native" => Ok(Self::Native),
            "credit_alphanum4" => Ok(Self::Credit4),
            "credit_alphanum12" => Ok(Self::Credit12),
            other => Err(LedgerError::InvalidAsset(format!("unknown asset type {}", other))),
        }
    }
}

/// A ledger asset: the native currency, or a credit issued by an account.
///
/// Native assets compare equal regardless of their code and issuer fields.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub code: String,
    pub issuer: String,
    pub kind: AssetKind,
}

impl Asset {
    pub fn native() -> Self {
        Self {
            code: "XLM".to_string(),
            issuer: String::new(),
            kind: AssetKind::Native,
        }
    }

    pub fn new(code: impl Into<String>, issuer: impl Into<String>, kind: AssetKind) -> Self {
        Self {
            code: code.into(),
            issuer: issuer.into(),
            kind,
        }
    }

    /// Credit asset whose kind is picked from the code length.
    pub fn credit(code: impl Into<String>, issuer: impl Into<String>) -> Self {
        let code = code.into();
        let kind = if code.len() <= 4 {
            AssetKind::Credit4
        } else {
            AssetKind::Credit12
        };
        Self::new(code, issuer, kind)
    }

    pub const fn is_native(&self) -> bool {
        matches!(self.kind, AssetKind::Native)
    }

    pub fn equals(&self, other: &Self) -> bool {
        if self.is_native() || other.is_native() {
            return self.is_native() && other.is_native();
        }
        self.kind == other.kind && self.code == other.code && self.issuer == other.issuer
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.is_native() {
            return Ok(());
        }
        let max = self.kind.max_code_len();
        if self.code.is_empty() || self.code.len() > max {
            return Err(LedgerError::InvalidAsset(format!(
                "code {:?} must be 1 to {} characters for {}",
                self.code,
                max,
                self.kind.wire_name()
            )));
        }
        if !self.code.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(LedgerError::InvalidAsset(format!(
                "code {:?} must be alphanumeric",
                self.code
            )));
        }
        strkey::validate_address(&self.issuer).map_err(|_| {
            LedgerError::InvalidAsset(format!("invalid issuer {:?} for {}", self.issuer, self.code))
        })
    }
}

impl PartialEq for Asset {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_native() {
            f.write_str("native")
        } else {
            write!(f, "{}:{}", self.code, self.issuer)
        }
    }
}

/// Parse a decimal amount string into stroops.
///
/// At most seven decimal places are accepted; negative amounts are rejected.
pub fn parse_amount(amount: &str) -> Result<i64, LedgerError> {
    let value = Decimal::from_str(amount.trim())
        .map_err(|e| LedgerError::InvalidAmount(format!("{:?}: {}", amount, e)))?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(LedgerError::InvalidAmount(format!("{:?} is negative", amount)));
    }
    if value.normalize().scale() > AMOUNT_DECIMALS {
        return Err(LedgerError::InvalidAmount(format!(
            "{:?} has more than {} decimal places",
            amount, AMOUNT_DECIMALS
        )));
    }
    value
        .checked_mul(Decimal::from(STROOPS_PER_UNIT))
        .and_then(|stroops| stroops.to_i64())
        .ok_or_else(|| LedgerError::InvalidAmount(format!("{:?} is out of range", amount)))
}

/// Render stroops as a seven-decimal amount string.
pub fn to_amount_string(stroops: i64) -> String {
    let mut value = Decimal::from(stroops);
    // scale 7 is always in range for Decimal
    let _ = value.set_scale(AMOUNT_DECIMALS);
    format!("{:.7}", value)
}

/// A price as a rational number `n / d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Price {
    pub n: i32,
    pub d: i32,
}

impl Price {
    pub const fn new(n: i32, d: i32) -> Self {
        Self { n, d }
    }

    /// Best rational approximation of a positive decimal, with both terms
    /// bounded by `i32::MAX`.
    pub fn from_decimal(value: Decimal) -> Result<Self, LedgerError> {
        if value <= Decimal::ZERO {
            return Err(LedgerError::InvalidParameters(format!(
                "price must be positive: {}",
                value
            )));
        }

        let max = i128::from(i32::MAX);
        let max_decimal = Decimal::from(i32::MAX);
        let mut convergents: Vec<(i128, i128)> = vec![(0, 1), (1, 0)];
        let mut number = value;

        loop {
            if number > max_decimal {
                break;
            }
            let whole = number.floor();
            let fraction = number - whole;
            let a = whole.to_i128().ok_or_else(|| {
                LedgerError::InvalidParameters(format!("price out of range: {}", value))
            })?;
            let (h1, k1) = convergents[convergents.len() - 1];
            let (h2, k2) = convergents[convergents.len() - 2];
            let h = a * h1 + h2;
            let k = a * k1 + k2;
            if h > max || k > max {
                break;
            }
            convergents.push((h, k));
            if fraction.is_zero() {
                break;
            }
            match Decimal::ONE.checked_div(fraction) {
                Some(next) => number = next,
                None => break,
            }
        }

        let (n, d) = convergents[convergents.len() - 1];
        if n == 0 || d == 0 {
            return Err(LedgerError::InvalidParameters(format!(
                "price {} cannot be represented",
                value
            )));
        }
        Ok(Self::new(n as i32, d as i32))
    }

    pub fn to_decimal(&self) -> Option<Decimal> {
        Decimal::from(self.n).checked_div(Decimal::from(self.d))
    }
}

impl FromStr for Price {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim())
            .map_err(|e| LedgerError::InvalidParameters(format!("invalid price {:?}: {}", s, e)))?;
        Self::from_decimal(value)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.n, self.d)
    }
}

/// Auxiliary metadata attached to a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Memo {
    #[default]
    None,
    Text(String),
    Id(u64),
    Hash([u8; 32]),
    Return([u8; 32]),
}

impl Memo {
    pub const MAX_TEXT_LEN: usize = 28;

    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        match self {
            Self::Text(text) if text.len() > Self::MAX_TEXT_LEN => {
                Err(LedgerError::EncodingError(format!(
                    "memo text is {} bytes, limit is {}",
                    text.len(),
                    Self::MAX_TEXT_LEN
                )))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub asset: Asset,
    pub amount: String,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSigner {
    pub public_key: String,
    pub weight: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    pub low: u8,
    pub medium: u8,
    pub high: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountFlags {
    pub auth_required: bool,
    pub auth_revocable: bool,
    pub auth_immutable: bool,
}

/// Account flags as set or cleared by a set-options operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountFlag {
    AuthRequired = 1,
    AuthRevocable = 2,
    AuthImmutable = 4,
}

impl AccountFlag {
    pub fn combine(flags: &[Self]) -> u32 {
        flags.iter().fold(0, |acc, f| acc | *f as u32)
    }
}

/// A snapshot of an account as reported by the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub address: String,
    pub sequence: i64,
    pub balances: Vec<Balance>,
    pub signers: Vec<AccountSigner>,
    pub thresholds: Thresholds,
    pub flags: AccountFlags,
    pub home_domain: String,
    /// Data entries, values base64-encoded as on the wire.
    pub data: HashMap<String, String>,
}

impl Account {
    pub fn native_balance(&self) -> String {
        self.balance(&Asset::native())
    }

    /// Balance of the given asset, `"0"` when the account holds none.
    pub fn balance(&self, asset: &Asset) -> String {
        self.balances
            .iter()
            .find(|b| b.asset.equals(asset))
            .map_or_else(|| "0".to_string(), |b| b.amount.clone())
    }

    /// Weight of the account's own key.
    pub fn master_weight(&self) -> u32 {
        self.signers
            .iter()
            .find(|s| s.public_key == self.address)
            .map_or(0, |s| s.weight)
    }

    /// Decoded value of a data entry.
    pub fn data(&self, key: &str) -> Option<Vec<u8>> {
        self.data
            .get(key)
            .and_then(|v| general_purpose::STANDARD.decode(v).ok())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub id: i64,
    pub seller: String,
    pub selling: Asset,
    pub buying: Asset,
    pub amount: String,
    pub price: String,
    pub price_r: Price,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookEntry {
    pub price: String,
    pub amount: String,
    pub price_r: Price,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBook {
    pub selling: Asset,
    pub buying: Asset,
    pub bids: Vec<OrderBookEntry>,
    pub asks: Vec<OrderBookEntry>,
}

impl OrderBook {
    pub fn empty(selling: Asset, buying: Asset) -> Self {
        Self {
            selling,
            buying,
            bids: Vec::new(),
            asks: Vec::new(),
        }
    }
}

/// A candidate conversion route returned by path finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentPath {
    pub source_asset: Asset,
    pub source_amount: String,
    pub destination_asset: Asset,
    pub destination_amount: String,
    /// Intermediate assets, excluding source and destination.
    pub path: Vec<Asset>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferType {
    Create,
    CreatePassive,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferParams {
    pub offer_type: OfferType,
    pub sell_asset: Asset,
    pub buy_asset: Asset,
    /// Price of one unit of `sell_asset` in terms of `buy_asset`.
    pub price: String,
    pub amount: String,
    pub offer_id: Option<String>,
}

/// Outcome of a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxResponse {
    pub hash: String,
    pub ledger: Option<u32>,
    pub envelope_xdr: String,
    pub result_xdr: Option<String>,
    /// `false` when a before-submit handler held the transaction back.
    pub submitted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Payment,
    Transaction,
    Ledger,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Payment => "payment",
            Self::Transaction => "transaction",
            Self::Ledger => "ledger",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEntry {
    pub id: String,
    pub paging_token: String,
    /// Operation type, e.g. `payment` or `create_account`.
    pub kind: String,
    pub from: String,
    pub to: String,
    pub asset: Option<Asset>,
    pub amount: String,
    pub transaction_hash: String,
    pub created_at: String,
    pub memo_type: Option<String>,
    pub memo: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEntry {
    pub id: String,
    pub paging_token: String,
    pub hash: String,
    pub ledger: u32,
    pub source_account: String,
    pub fee_charged: String,
    pub operation_count: u32,
    pub memo_type: String,
    pub memo: Option<String>,
    pub successful: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: String,
    pub paging_token: String,
    pub hash: String,
    pub sequence: u32,
    pub transaction_count: u32,
    pub operation_count: u32,
    pub closed_at: String,
    pub total_coins: String,
    pub base_fee: u32,
}

/// One event delivered by a watcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entry", rename_all = "lowercase")]
pub enum Entry {
    Payment(PaymentEntry),
    Transaction(TransactionEntry),
    LedgerClose(LedgerEntry),
}

impl Entry {
    pub fn kind(&self) -> EntryKind {
        match self {
            Self::Payment(_) => EntryKind::Payment,
            Self::Transaction(_) => EntryKind::Transaction,
            Self::LedgerClose(_) => EntryKind::Ledger,
        }
    }

    pub fn paging_token(&self) -> &str {
        match self {
            Self::Payment(p) => &p.paging_token,
            Self::Transaction(t) => &t.paging_token,
            Self::LedgerClose(l) => &l.paging_token,
        }
    }

    /// The canned entry emitted by simulated watchers.
    pub fn fake(kind: EntryKind) -> Self {
        match kind {
            EntryKind::Payment => Self::Payment(PaymentEntry {
                kind: "fake".to_string(),
                ..PaymentEntry::default()
            }),
            EntryKind::Transaction => Self::Transaction(TransactionEntry {
                source_account: "FAKE".to_string(),
                ..TransactionEntry::default()
            }),
            EntryKind::Ledger => Self::LedgerClose(LedgerEntry {
                id: "fake".to_string(),
                total_coins: "0".to_string(),
                ..LedgerEntry::default()
            }),
        }
    }
}
