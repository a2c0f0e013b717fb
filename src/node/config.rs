//! Process configuration
//!
//! All keys come from the environment and are required. Numeric tuning
//! knobs that are present but unparsable fall back to their defaults.

use std::str::FromStr;

use thiserror::Error;
use tracing::warn;

pub const DEFAULT_MINING_DIFFICULTY: usize = 2;
pub const DEFAULT_TXS_PER_BLOCK: usize = 10;
pub const DEFAULT_REWARD_AMOUNT: f64 = 1.0;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration key {0}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for configuration key {key}")]
    Invalid { key: &'static str, value: String },
}

struct Lookup<F>(F);

impl<F> Lookup<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        (self.0)(key).ok_or(ConfigError::Missing(key))
    }

    fn parsed<T: FromStr>(&self, key: &'static str) -> Result<T, ConfigError> {
        let value = self.required(key)?;
        value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value })
    }

    fn parsed_or<T: FromStr + std::fmt::Display>(
        &self,
        key: &'static str,
        default: T,
    ) -> Result<T, ConfigError> {
        let value = self.required(key)?;
        match value.trim().parse() {
            Ok(parsed) => Ok(parsed),
            Err(_) => {
                warn!(key, value = %value, default = %default, "invalid value, using default");
                Ok(default)
            }
        }
    }
}

/// Node configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub node_name: String,
    pub port: u16,
    pub dns_host: String,
    pub dns_port: u16,
    pub wallets_host: String,
    pub wallets_port: u16,
    pub nodes_filename: String,
    pub blockchain_filename: String,
    pub wallets_filename: String,
    pub mining_difficulty: usize,
    pub txs_per_block: usize,
    pub reward_amount: f64,
}

impl Config {
    /// Read from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Lookup(lookup);

        Ok(Self {
            node_name: env.required("NODE_NAME")?,
            port: env.parsed("PORT")?,
            dns_host: env.required("DNS_HOST")?,
            dns_port: env.parsed("DNS_PORT")?,
            wallets_host: env.required("WALLETS_HOST")?,
            wallets_port: env.parsed("WALLETS_PORT")?,
            nodes_filename: env.required("NODES_FILENAME")?,
            blockchain_filename: env.required("BLOCKCHAIN_FILENAME")?,
            wallets_filename: env.required("WALLETS_FILENAME")?,
            mining_difficulty: env.parsed_or("MINING_DIFFICULTY", DEFAULT_MINING_DIFFICULTY)?,
            txs_per_block: env.parsed_or("TXS_PER_BLOCK", DEFAULT_TXS_PER_BLOCK)?,
            reward_amount: env.parsed_or("REWARD_AMOUNT", DEFAULT_REWARD_AMOUNT)?,
        })
    }

    /// Base url of the discovery service
    pub fn dns_url(&self) -> String {
        format!("http://{}:{}", self.dns_host, self.dns_port)
    }

    /// Base url of the wallet service
    pub fn wallets_url(&self) -> String {
        format!("http://{}:{}", self.wallets_host, self.wallets_port)
    }
}

/// Configuration of the discovery and wallet services: a port and a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub port: u16,
    pub filename: String,
}

impl ServiceConfig {
    /// Read `PORT` and the given filename key from the environment
    pub fn from_env(filename_key: &'static str) -> Result<Self, ConfigError> {
        Self::from_lookup(filename_key, |key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(filename_key: &'static str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Lookup(lookup);

        Ok(Self {
            port: env.parsed("PORT")?,
            filename: env.required(filename_key)?,
        })
    }
}
