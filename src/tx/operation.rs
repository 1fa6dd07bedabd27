use crate::core::errors::LedgerError;
use crate::core::kernel::strkey::AccountId;
use crate::core::kernel::xdr::{ReadXdr, WriteXdr, XdrReader, XdrWriter};
use crate::core::types::{parse_amount, Asset, AssetKind, Price};
use base64::engine::general_purpose;
use base64::Engine;
use serde::{Serialize, Serializer};

const KEY_TYPE_ED25519: u32 = 0;
const SIGNER_KEY_TYPE_ED25519: u32 = 0;

const ASSET_TYPE_NATIVE: u32 = 0;
const ASSET_TYPE_CREDIT_ALPHANUM4: u32 = 1;
const ASSET_TYPE_CREDIT_ALPHANUM12: u32 = 2;

const CREATE_ACCOUNT: u32 = 0;
const PAYMENT: u32 = 1;
const PATH_PAYMENT_STRICT_RECEIVE: u32 = 2;
const MANAGE_SELL_OFFER: u32 = 3;
const CREATE_PASSIVE_SELL_OFFER: u32 = 4;
const SET_OPTIONS: u32 = 5;
const CHANGE_TRUST: u32 = 6;
const MANAGE_DATA: u32 = 10;

pub const MAX_PATH_LENGTH: usize = 5;
pub const MAX_DATA_LENGTH: usize = 64;
pub const MAX_HOME_DOMAIN_LENGTH: usize = 32;

fn serialize_base64<S: Serializer>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(bytes) => serializer.serialize_some(&general_purpose::STANDARD.encode(bytes)),
        None => serializer.serialize_none(),
    }
}

/// A new signer (or a signer removal, at weight zero) for set-options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignerSpec {
    pub key: AccountId,
    pub weight: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SetOptions {
    pub inflation_dest: Option<AccountId>,
    pub clear_flags: Option<u32>,
    pub set_flags: Option<u32>,
    pub master_weight: Option<u32>,
    pub low_threshold: Option<u32>,
    pub med_threshold: Option<u32>,
    pub high_threshold: Option<u32>,
    pub home_domain: Option<String>,
    pub signer: Option<SignerSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperationBody {
    CreateAccount {
        destination: AccountId,
        starting_balance: i64,
    },
    Payment {
        destination: AccountId,
        asset: Asset,
        amount: i64,
    },
    PathPaymentStrictReceive {
        send_asset: Asset,
        send_max: i64,
        destination: AccountId,
        dest_asset: Asset,
        dest_amount: i64,
        path: Vec<Asset>,
    },
    ManageSellOffer {
        selling: Asset,
        buying: Asset,
        amount: i64,
        price: Price,
        offer_id: i64,
    },
    CreatePassiveSellOffer {
        selling: Asset,
        buying: Asset,
        amount: i64,
        price: Price,
    },
    SetOptions(SetOptions),
    ChangeTrust {
        line: Asset,
        limit: i64,
    },
    ManageData {
        name: String,
        #[serde(serialize_with = "serialize_base64")]
        value: Option<Vec<u8>>,
    },
}

impl OperationBody {
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::CreateAccount { .. } => "create_account",
            Self::Payment { .. } => "payment",
            Self::PathPaymentStrictReceive { .. } => "path_payment_strict_receive",
            Self::ManageSellOffer { .. } => "manage_sell_offer",
            Self::CreatePassiveSellOffer { .. } => "create_passive_sell_offer",
            Self::SetOptions(_) => "set_options",
            Self::ChangeTrust { .. } => "change_trust",
            Self::ManageData { .. } => "manage_data",
        }
    }
}

/// One ledger operation, optionally acting on behalf of another account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Operation {
    pub source_account: Option<AccountId>,
    pub body: OperationBody,
}

impl Operation {
    pub const fn new(body: OperationBody) -> Self {
        Self {
            source_account: None,
            body,
        }
    }

    pub fn with_source(mut self, source: AccountId) -> Self {
        self.source_account = Some(source);
        self
    }

    pub fn create_account(destination: &str, starting_balance: &str) -> Result<Self, LedgerError> {
        Ok(Self::new(OperationBody::CreateAccount {
            destination: destination.parse()?,
            starting_balance: parse_amount(starting_balance)?,
        }))
    }

    pub fn payment(destination: &str, asset: &Asset, amount: &str) -> Result<Self, LedgerError> {
        asset.validate()?;
        Ok(Self::new(OperationBody::Payment {
            destination: destination.parse()?,
            asset: asset.clone(),
            amount: parse_amount(amount)?,
        }))
    }

    pub fn path_payment(
        destination: &str,
        dest_asset: &Asset,
        dest_amount: &str,
        send_asset: &Asset,
        send_max: &str,
        path: &[Asset],
    ) -> Result<Self, LedgerError> {
        dest_asset.validate()?;
        send_asset.validate()?;
        if path.len() > MAX_PATH_LENGTH {
            return Err(LedgerError::InvalidParameters(format!(
                "payment path has {} hops, limit is {}",
                path.len(),
                MAX_PATH_LENGTH
            )));
        }
        for hop in path {
            hop.validate()?;
        }
        Ok(Self::new(OperationBody::PathPaymentStrictReceive {
            send_asset: send_asset.clone(),
            send_max: parse_amount(send_max)?,
            destination: destination.parse()?,
            dest_asset: dest_asset.clone(),
            dest_amount: parse_amount(dest_amount)?,
            path: path.to_vec(),
        }))
    }

    /// Create (id 0), update or delete (amount 0) an offer.
    pub fn manage_sell_offer(
        selling: &Asset,
        buying: &Asset,
        amount: &str,
        price: Price,
        offer_id: i64,
    ) -> Result<Self, LedgerError> {
        Ok(Self::new(OperationBody::ManageSellOffer {
            selling: selling.clone(),
            buying: buying.clone(),
            amount: parse_amount(amount)?,
            price,
            offer_id,
        }))
    }

    pub fn create_passive_sell_offer(
        selling: &Asset,
        buying: &Asset,
        amount: &str,
        price: Price,
    ) -> Result<Self, LedgerError> {
        Ok(Self::new(OperationBody::CreatePassiveSellOffer {
            selling: selling.clone(),
            buying: buying.clone(),
            amount: parse_amount(amount)?,
            price,
        }))
    }

    pub fn set_options(options: SetOptions) -> Result<Self, LedgerError> {
        if let Some(domain) = &options.home_domain {
            if domain.len() > MAX_HOME_DOMAIN_LENGTH {
                return Err(LedgerError::InvalidParameters(format!(
                    "home domain is {} bytes, limit is {}",
                    domain.len(),
                    MAX_HOME_DOMAIN_LENGTH
                )));
            }
        }
        for weight in [
            options.master_weight,
            options.low_threshold,
            options.med_threshold,
            options.high_threshold,
            options.signer.as_ref().map(|s| s.weight),
        ]
        .into_iter()
        .flatten()
        {
            if weight > 255 {
                return Err(LedgerError::InvalidParameters(format!(
                    "weight {} exceeds 255",
                    weight
                )));
            }
        }
        Ok(Self::new(OperationBody::SetOptions(options)))
    }

    /// `limit = None` trusts up to the maximum amount; `Some(0)` removes the line.
    pub fn change_trust(line: &Asset, limit: Option<&str>) -> Result<Self, LedgerError> {
        line.validate()?;
        if line.is_native() {
            return Err(LedgerError::InvalidAsset(
                "cannot create a trust line to the native asset".to_string(),
            ));
        }
        let limit = match limit {
            Some(limit) => parse_amount(limit)?,
            None => i64::MAX,
        };
        Ok(Self::new(OperationBody::ChangeTrust {
            line: line.clone(),
            limit,
        }))
    }

    /// `value = None` deletes the entry.
    pub fn manage_data(name: &str, value: Option<&[u8]>) -> Result<Self, LedgerError> {
        if name.is_empty() || name.len() > MAX_DATA_LENGTH {
            return Err(LedgerError::InvalidParameters(format!(
                "data key must be 1 to {} bytes",
                MAX_DATA_LENGTH
            )));
        }
        if let Some(value) = value {
            if value.len() > MAX_DATA_LENGTH {
                return Err(LedgerError::InvalidParameters(format!(
                    "data value is {} bytes, limit is {}",
                    value.len(),
                    MAX_DATA_LENGTH
                )));
            }
        }
        Ok(Self::new(OperationBody::ManageData {
            name: name.to_string(),
            value: value.map(<[u8]>::to_vec),
        }))
    }
}

pub(crate) fn write_account_id(w: &mut XdrWriter, id: &AccountId) {
    w.write_u32(KEY_TYPE_ED25519);
    w.write_fixed(id.as_bytes());
}

pub(crate) fn read_account_id(r: &mut XdrReader<'_>) -> Result<AccountId, LedgerError> {
    match r.read_u32()? {
        KEY_TYPE_ED25519 => Ok(AccountId(r.read_fixed::<32>()?)),
        other => Err(LedgerError::EncodingError(format!(
            "unsupported account key type {}",
            other
        ))),
    }
}

fn padded_code<const N: usize>(code: &str) -> [u8; N] {
    let mut out = [0u8; N];
    for (slot, byte) in out.iter_mut().zip(code.bytes()) {
        *slot = byte;
    }
    out
}

fn code_from_bytes(bytes: &[u8]) -> Result<String, LedgerError> {
    let trimmed: Vec<u8> = bytes.iter().copied().take_while(|b| *b != 0).collect();
    String::from_utf8(trimmed)
        .map_err(|e| LedgerError::EncodingError(format!("invalid asset code: {}", e)))
}

impl WriteXdr for Asset {
    fn write_xdr(&self, w: &mut XdrWriter) -> Result<(), LedgerError> {
        match self.kind {
            AssetKind::Native => {
                w.write_u32(ASSET_TYPE_NATIVE);
                return Ok(());
            }
            AssetKind::Credit4 => {
                w.write_u32(ASSET_TYPE_CREDIT_ALPHANUM4);
                w.write_fixed(&padded_code::<4>(&self.code));
            }
            AssetKind::Credit12 => {
                w.write_u32(ASSET_TYPE_CREDIT_ALPHANUM12);
                w.write_fixed(&padded_code::<12>(&self.code));
            }
        }
        let issuer: AccountId = self
            .issuer
            .parse()
            .map_err(|_| LedgerError::InvalidAsset(format!("invalid issuer {:?}", self.issuer)))?;
        write_account_id(w, &issuer);
        Ok(())
    }
}

impl ReadXdr for Asset {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, LedgerError> {
        let (code, kind) = match r.read_u32()? {
            ASSET_TYPE_NATIVE => return Ok(Self::native()),
            ASSET_TYPE_CREDIT_ALPHANUM4 => (code_from_bytes(&r.read_fixed::<4>()?)?, AssetKind::Credit4),
            ASSET_TYPE_CREDIT_ALPHANUM12 => {
                (code_from_bytes(&r.read_fixed::<12>()?)?, AssetKind::Credit12)
            }
            other => {
                return Err(LedgerError::EncodingError(format!(
                    "unsupported asset type {}",
                    other
                )))
            }
        };
        let issuer = read_account_id(r)?;
        Ok(Self::new(code, issuer.to_string(), kind))
    }
}

impl WriteXdr for Price {
    fn write_xdr(&self, w: &mut XdrWriter) -> Result<(), LedgerError> {
        w.write_i32(self.n);
        w.write_i32(self.d);
        Ok(())
    }
}

impl ReadXdr for Price {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, LedgerError> {
        Ok(Self::new(r.read_i32()?, r.read_i32()?))
    }
}

fn write_opt_u32(w: &mut XdrWriter, value: Option<u32>) -> Result<(), LedgerError> {
    w.write_option(value.as_ref(), |w, v| {
        w.write_u32(*v);
        Ok(())
    })
}

impl WriteXdr for SetOptions {
    fn write_xdr(&self, w: &mut XdrWriter) -> Result<(), LedgerError> {
        w.write_option(self.inflation_dest.as_ref(), |w, id| {
            write_account_id(w, id);
            Ok(())
        })?;
        write_opt_u32(w, self.clear_flags)?;
        write_opt_u32(w, self.set_flags)?;
        write_opt_u32(w, self.master_weight)?;
        write_opt_u32(w, self.low_threshold)?;
        write_opt_u32(w, self.med_threshold)?;
        write_opt_u32(w, self.high_threshold)?;
        w.write_option(self.home_domain.as_ref(), |w, domain| {
            w.write_string(domain, MAX_HOME_DOMAIN_LENGTH)
        })?;
        w.write_option(self.signer.as_ref(), |w, signer| {
            w.write_u32(SIGNER_KEY_TYPE_ED25519);
            w.write_fixed(signer.key.as_bytes());
            w.write_u32(signer.weight);
            Ok(())
        })
    }
}

impl ReadXdr for SetOptions {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, LedgerError> {
        Ok(Self {
            inflation_dest: r.read_option(read_account_id)?,
            clear_flags: r.read_option(|r| r.read_u32())?,
            set_flags: r.read_option(|r| r.read_u32())?,
            master_weight: r.read_option(|r| r.read_u32())?,
            low_threshold: r.read_option(|r| r.read_u32())?,
            med_threshold: r.read_option(|r| r.read_u32())?,
            high_threshold: r.read_option(|r| r.read_u32())?,
            home_domain: r.read_option(|r| r.read_string(MAX_HOME_DOMAIN_LENGTH))?,
            signer: r.read_option(|r| match r.read_u32()? {
                SIGNER_KEY_TYPE_ED25519 => Ok(SignerSpec {
                    key: AccountId(r.read_fixed::<32>()?),
                    weight: r.read_u32()?,
                }),
                other => Err(LedgerError::EncodingError(format!(
                    "unsupported signer key type {}",
                    other
                ))),
            })?,
        })
    }
}

impl WriteXdr for Operation {
    fn write_xdr(&self, w: &mut XdrWriter) -> Result<(), LedgerError> {
        w.write_option(self.source_account.as_ref(), |w, id| {
            write_account_id(w, id);
            Ok(())
        })?;

        match &self.body {
            OperationBody::CreateAccount {
                destination,
                starting_balance,
            } => {
                w.write_u32(CREATE_ACCOUNT);
                write_account_id(w, destination);
                w.write_i64(*starting_balance);
            }
            OperationBody::Payment {
                destination,
                asset,
                amount,
            } => {
                w.write_u32(PAYMENT);
                write_account_id(w, destination);
                asset.write_xdr(w)?;
                w.write_i64(*amount);
            }
            OperationBody::PathPaymentStrictReceive {
                send_asset,
                send_max,
                destination,
                dest_asset,
                dest_amount,
                path,
            } => {
                w.write_u32(PATH_PAYMENT_STRICT_RECEIVE);
                send_asset.write_xdr(w)?;
                w.write_i64(*send_max);
                write_account_id(w, destination);
                dest_asset.write_xdr(w)?;
                w.write_i64(*dest_amount);
                w.write_array(path, MAX_PATH_LENGTH)?;
            }
            OperationBody::ManageSellOffer {
                selling,
                buying,
                amount,
                price,
                offer_id,
            } => {
                w.write_u32(MANAGE_SELL_OFFER);
                selling.write_xdr(w)?;
                buying.write_xdr(w)?;
                w.write_i64(*amount);
                price.write_xdr(w)?;
                w.write_i64(*offer_id);
            }
            OperationBody::CreatePassiveSellOffer {
                selling,
                buying,
                amount,
                price,
            } => {
                w.write_u32(CREATE_PASSIVE_SELL_OFFER);
                selling.write_xdr(w)?;
                buying.write_xdr(w)?;
                w.write_i64(*amount);
                price.write_xdr(w)?;
            }
            OperationBody::SetOptions(options) => {
                w.write_u32(SET_OPTIONS);
                options.write_xdr(w)?;
            }
            OperationBody::ChangeTrust { line, limit } => {
                w.write_u32(CHANGE_TRUST);
                line.write_xdr(w)?;
                w.write_i64(*limit);
            }
            OperationBody::ManageData { name, value } => {
                w.write_u32(MANAGE_DATA);
                w.write_string(name, MAX_DATA_LENGTH)?;
                w.write_option(value.as_ref(), |w, v| w.write_var(v, MAX_DATA_LENGTH))?;
            }
        }
        Ok(())
    }
}

impl ReadXdr for Operation {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, LedgerError> {
        let source_account = r.read_option(read_account_id)?;
        let body = match r.read_u32()? {
            CREATE_ACCOUNT => OperationBody::CreateAccount {
                destination: read_account_id(r)?,
                starting_balance: r.read_i64()?,
            },
            PAYMENT => OperationBody::Payment {
                destination: read_account_id(r)?,
                asset: Asset::read_xdr(r)?,
                amount: r.read_i64()?,
            },
            PATH_PAYMENT_STRICT_RECEIVE => OperationBody::PathPaymentStrictReceive {
                send_asset: Asset::read_xdr(r)?,
                send_max: r.read_i64()?,
                destination: read_account_id(r)?,
                dest_asset: Asset::read_xdr(r)?,
                dest_amount: r.read_i64()?,
                path: r.read_array(MAX_PATH_LENGTH)?,
            },
            MANAGE_SELL_OFFER => OperationBody::ManageSellOffer {
                selling: Asset::read_xdr(r)?,
                buying: Asset::read_xdr(r)?,
                amount: r.read_i64()?,
                price: Price::read_xdr(r)?,
                offer_id: r.read_i64()?,
            },
            CREATE_PASSIVE_SELL_OFFER => OperationBody::CreatePassiveSellOffer {
                selling: Asset::read_xdr(r)?,
                buying: Asset::read_xdr(r)?,
                amount: r.read_i64()?,
                price: Price::read_xdr(r)?,
            },
            SET_OPTIONS => OperationBody::SetOptions(SetOptions::read_xdr(r)?),
            CHANGE_TRUST => OperationBody::ChangeTrust {
                line: Asset::read_xdr(r)?,
                limit: r.read_i64()?,
            },
            MANAGE_DATA => OperationBody::ManageData {
                name: r.read_string(MAX_DATA_LENGTH)?,
                value: r.read_option(|r| r.read_var(MAX_DATA_LENGTH))?,
            },
            other => {
                return Err(LedgerError::EncodingError(format!(
                    "unsupported operation type {}",
                    other
                )))
            }
        };
        Ok(Self {
            source_account,
            body,
        })
    }
}
