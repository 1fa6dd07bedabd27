use crate::client::LedgerClient;
use crate::core::{
    errors::LedgerError,
    kernel::strkey,
    options::Options,
    traits::LedgerTransport,
    types::{Account, AccountFlag, Asset, TxResponse},
};
use crate::tx::{parse_source, Operation, SetOptions, SignerSpec};

impl<T: LedgerTransport> LedgerClient<T> {
    /// Load an account's balances, signers, thresholds, flags and data
    pub async fn load_account(&self, address: &str) -> Result<Account, LedgerError> {
        strkey::validate_address(address)?;
        if self.is_fake() {
            return Ok(Account {
                address: address.to_string(),
                ..Account::default()
            });
        }
        self.api().account(address).await
    }

    /// Create and fund a new account
    pub async fn fund_account(
        &self,
        source_seed: &str,
        address: &str,
        amount: &str,
        options: Options,
    ) -> Result<TxResponse, LedgerError> {
        let op = Operation::create_account(address, amount)?;
        self.execute(source_seed, vec![op], options).await
    }

    /// Trust `asset` up to `limit`, or up to the maximum when `limit` is `None`
    pub async fn create_trust_line(
        &self,
        source_seed: &str,
        asset: &Asset,
        limit: Option<&str>,
        options: Options,
    ) -> Result<TxResponse, LedgerError> {
        let op = Operation::change_trust(asset, limit)?;
        self.execute(source_seed, vec![op], options).await
    }

    pub async fn remove_trust_line(
        &self,
        source_seed: &str,
        asset: &Asset,
        options: Options,
    ) -> Result<TxResponse, LedgerError> {
        let op = Operation::change_trust(asset, Some("0"))?;
        self.execute(source_seed, vec![op], options).await
    }

    async fn set_options(
        &self,
        source_seed: &str,
        set: SetOptions,
        options: Options,
    ) -> Result<TxResponse, LedgerError> {
        let op = Operation::set_options(set)?;
        self.execute(source_seed, vec![op], options).await
    }

    pub async fn set_master_weight(
        &self,
        source_seed: &str,
        weight: u32,
        options: Options,
    ) -> Result<TxResponse, LedgerError> {
        let set = SetOptions {
            master_weight: Some(weight),
            ..SetOptions::default()
        };
        self.set_options(source_seed, set, options).await
    }

    /// Add `signer` to the account, or change its weight
    pub async fn add_signer(
        &self,
        source_seed: &str,
        signer: &str,
        weight: u32,
        options: Options,
    ) -> Result<TxResponse, LedgerError> {
        let (key, _) = parse_source(signer)?;
        let set = SetOptions {
            signer: Some(SignerSpec { key, weight }),
            ..SetOptions::default()
        };
        self.set_options(source_seed, set, options).await
    }

    pub async fn remove_signer(
        &self,
        source_seed: &str,
        signer: &str,
        options: Options,
    ) -> Result<TxResponse, LedgerError> {
        self.add_signer(source_seed, signer, 0, options).await
    }

    pub async fn set_thresholds(
        &self,
        source_seed: &str,
        low: u32,
        medium: u32,
        high: u32,
        options: Options,
    ) -> Result<TxResponse, LedgerError> {
        let set = SetOptions {
            low_threshold: Some(low),
            med_threshold: Some(medium),
            high_threshold: Some(high),
            ..SetOptions::default()
        };
        self.set_options(source_seed, set, options).await
    }

    pub async fn set_flags(
        &self,
        source_seed: &str,
        flags: &[AccountFlag],
        options: Options,
    ) -> Result<TxResponse, LedgerError> {
        let set = SetOptions {
            set_flags: Some(AccountFlag::combine(flags)),
            ..SetOptions::default()
        };
        self.set_options(source_seed, set, options).await
    }

    pub async fn clear_flags(
        &self,
        source_seed: &str,
        flags: &[AccountFlag],
        options: Options,
    ) -> Result<TxResponse, LedgerError> {
        let set = SetOptions {
            clear_flags: Some(AccountFlag::combine(flags)),
            ..SetOptions::default()
        };
        self.set_options(source_seed, set, options).await
    }

    pub async fn set_home_domain(
        &self,
        source_seed: &str,
        domain: &str,
        options: Options,
    ) -> Result<TxResponse, LedgerError> {
        let set = SetOptions {
            home_domain: Some(domain.to_string()),
            ..SetOptions::default()
        };
        self.set_options(source_seed, set, options).await
    }

    /// Attach a data entry to the account
    pub async fn set_data(
        &self,
        source_seed: &str,
        key: &str,
        value: &[u8],
        options: Options,
    ) -> Result<TxResponse, LedgerError> {
        let op = Operation::manage_data(key, Some(value))?;
        self.execute(source_seed, vec![op], options).await
    }

    pub async fn clear_data(
        &self,
        source_seed: &str,
        key: &str,
        options: Options,
    ) -> Result<TxResponse, LedgerError> {
        let op = Operation::manage_data(key, None)?;
        self.execute(source_seed, vec![op], options).await
    }
}
