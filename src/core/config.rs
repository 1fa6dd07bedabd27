use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::env;

pub const PUBLIC_PASSPHRASE: &str = "Public Global Stellar Network ; September 2015";
pub const TEST_PASSPHRASE: &str = "Test SDF Network ; September 2015";
pub const PUBLIC_HORIZON_URL: &str = "https://horizon.stellar.org";
pub const TEST_HORIZON_URL: &str = "https://horizon-testnet.stellar.org";

/// The ledger network a client talks to.
///
/// `Fake` uses the test network identity but never performs I/O: every
/// pipeline stage and every watcher is simulated locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Public,
    Test,
    Fake,
    Custom {
        horizon_url: String,
        passphrase: String,
    },
}

impl Network {
    /// Parse a network name. `custom` is rejected here since it needs a URL and passphrase.
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name.to_lowercase().as_str() {
            "public" | "main" => Ok(Self::Public),
            "test" => Ok(Self::Test),
            "fake" => Ok(Self::Fake),
            other => Err(ConfigError::InvalidConfiguration(format!(
                "unknown network: {}",
                other
            ))),
        }
    }

    pub fn passphrase(&self) -> &str {
        match self {
            Self::Public => PUBLIC_PASSPHRASE,
            Self::Test | Self::Fake => TEST_PASSPHRASE,
            Self::Custom { passphrase, .. } => passphrase,
        }
    }

    pub fn horizon_url(&self) -> &str {
        match self {
            Self::Public => PUBLIC_HORIZON_URL,
            Self::Test | Self::Fake => TEST_HORIZON_URL,
            Self::Custom { horizon_url, .. } => horizon_url,
        }
    }

    /// SHA-256 of the passphrase, mixed into every transaction hash.
    pub fn network_id(&self) -> [u8; 32] {
        Sha256::digest(self.passphrase().as_bytes()).into()
    }

    pub const fn is_fake(&self) -> bool {
        matches!(self, Self::Fake)
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Public => "public",
            Self::Test => "test",
            Self::Fake => "fake",
            Self::Custom { .. } => "custom",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub network: Network,
    /// Per-request timeout for REST calls. Streams only use it for connecting.
    pub timeout_seconds: u64,
    /// Capacity of each watcher's event channel.
    pub stream_buffer: usize,
}

impl NetworkConfig {
    #[must_use]
    pub fn new(network: Network) -> Self {
        Self {
            network,
            timeout_seconds: 30,
            stream_buffer: 64,
        }
    }

    #[must_use]
    pub fn public() -> Self {
        Self::new(Network::Public)
    }

    #[must_use]
    pub fn test() -> Self {
        Self::new(Network::Test)
    }

    #[must_use]
    pub fn fake() -> Self {
        Self::new(Network::Fake)
    }

    #[must_use]
    pub fn custom(horizon_url: String, passphrase: String) -> Self {
        Self::new(Network::Custom {
            horizon_url,
            passphrase,
        })
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    #[must_use]
    pub const fn with_stream_buffer(mut self, stream_buffer: usize) -> Self {
        self.stream_buffer = stream_buffer;
        self
    }

    pub fn is_fake(&self) -> bool {
        self.network.is_fake()
    }

    pub fn horizon_url(&self) -> &str {
        self.network.horizon_url()
    }

    pub fn passphrase(&self) -> &str {
        self.network.passphrase()
    }

    pub fn network_id(&self) -> [u8; 32] {
        self.network.network_id()
    }

    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `{PREFIX}_NETWORK` (`public`, `test`, `fake` or `custom`; defaults to `test`)
    /// - `{PREFIX}_HORIZON_URL` and `{PREFIX}_PASSPHRASE` (required for `custom`)
    /// - `{PREFIX}_TIMEOUT` (optional, seconds)
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        let prefix = prefix.to_uppercase();
        let network_var = format!("{}_NETWORK", prefix);
        let url_var = format!("{}_HORIZON_URL", prefix);
        let passphrase_var = format!("{}_PASSPHRASE", prefix);
        let timeout_var = format!("{}_TIMEOUT", prefix);

        let name = env::var(&network_var).unwrap_or_else(|_| "test".to_string());
        let network = if name.eq_ignore_ascii_case("custom") {
            let horizon_url = env::var(&url_var)
                .map_err(|_| ConfigError::MissingEnvironmentVariable(url_var))?;
            let passphrase = env::var(&passphrase_var)
                .map_err(|_| ConfigError::MissingEnvironmentVariable(passphrase_var))?;
            Network::Custom {
                horizon_url,
                passphrase,
            }
        } else {
            Network::from_name(&name)?
        };

        let mut config = Self::new(network);
        if let Ok(raw) = env::var(&timeout_var) {
            config.timeout_seconds = raw.parse::<u64>().map_err(|_| {
                ConfigError::InvalidConfiguration(format!("{} must be a number: {}", timeout_var, raw))
            })?;
        }

        Ok(config)
    }

    /// Load a `.env` file (if it exists) and then read the environment.
    ///
    /// **Security Warning**: never commit .env files holding seeds to version control.
    #[cfg(feature = "env-file")]
    pub fn from_env_file(prefix: &str) -> Result<Self, ConfigError> {
        Self::from_env_file_with_path(prefix, ".env")
    }

    #[cfg(feature = "env-file")]
    pub fn from_env_file_with_path(prefix: &str, env_file_path: &str) -> Result<Self, ConfigError> {
        load_env_file(env_file_path)?;
        Self::from_env(prefix)
    }

    /// Load configuration with automatic .env file detection
    ///
    /// Tries `.env.local`, then `.env.{ENVIRONMENT}`, then `.env`; only the
    /// first file found is loaded. Falls back to the process environment.
    #[cfg(feature = "env-file")]
    pub fn from_env_auto(prefix: &str) -> Result<Self, ConfigError> {
        let env_files = [
            ".env.local".to_string(),
            format!(
                ".env.{}",
                env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string())
            ),
            ".env".to_string(),
        ];

        for env_file in &env_files {
            if load_env_file(env_file)? {
                break;
            }
        }

        Self::from_env(prefix)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::test()
    }
}

/// Returns `Ok(false)` when the file does not exist.
#[cfg(feature = "env-file")]
fn load_env_file(path: &str) -> Result<bool, ConfigError> {
    match dotenv::from_path(path) {
        Ok(()) => Ok(true),
        Err(dotenv::Error::Io(io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => {
            Ok(false)
        }
        Err(e) => Err(ConfigError::InvalidConfiguration(format!(
            "Failed to load .env file '{}': {}",
            path, e
        ))),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvironmentVariable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_uses_test_identity() {
        let config = NetworkConfig::fake();
        assert!(config.is_fake());
        assert_eq!(config.passphrase(), TEST_PASSPHRASE);
        assert_eq!(config.horizon_url(), TEST_HORIZON_URL);
    }

    #[test]
    fn test_network_id_is_passphrase_hash() {
        assert_eq!(
            hex::encode(Network::Test.network_id()),
            "cee0302d59844d32bdca915c8203dd44b33fbb7edc19051ea37abedf28ecd472"
        );
    }

    #[test]
    fn test_from_env_custom_requires_url() {
        env::set_var("LEDGERX_CFGTEST_NETWORK", "custom");
        env::remove_var("LEDGERX_CFGTEST_HORIZON_URL");
        let err = NetworkConfig::from_env("ledgerx_cfgtest").unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvironmentVariable(_)));

        env::set_var("LEDGERX_CFGTEST_HORIZON_URL", "http://localhost:8000");
        env::set_var("LEDGERX_CFGTEST_PASSPHRASE", "Standalone Network ; February 2017");
        env::set_var("LEDGERX_CFGTEST_TIMEOUT", "5");
        let config = NetworkConfig::from_env("ledgerx_cfgtest").unwrap();
        assert_eq!(config.horizon_url(), "http://localhost:8000");
        assert_eq!(config.timeout_seconds, 5);
    }

    #[test]
    fn test_unknown_network_name() {
        assert!(Network::from_name("moon").is_err());
        assert_eq!(Network::from_name("PUBLIC").unwrap(), Network::Public);
    }
}
