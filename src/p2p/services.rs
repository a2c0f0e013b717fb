//! Clients for the discovery and wallet services

use reqwest::Client;

use super::{get_json, post_json, ClientError, Node};
use crate::wallet::Wallet;

/// Client for the discovery service
#[derive(Debug, Clone)]
pub struct DiscoveryClient {
    http: Client,
    host: String,
}

impl DiscoveryClient {
    /// `host` is the service base url, `scheme://ip:port`
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            host: host.into(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Every node registered with the service
    pub async fn get_nodes(&self) -> Result<Vec<Node>, ClientError> {
        get_json(&self.http, &format!("{}/nodes", self.host)).await
    }

    /// Register `node`, or refresh its address if the name is already known
    pub async fn add_node(&self, node: &Node) -> Result<Node, ClientError> {
        post_json(&self.http, &format!("{}/nodes", self.host), node).await
    }
}

/// Client for the wallet service
#[derive(Debug, Clone)]
pub struct WalletClient {
    http: Client,
    host: String,
}

impl WalletClient {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            host: host.into(),
        }
    }

    /// Ask the service to generate and store a fresh wallet
    pub async fn new_wallet(&self) -> Result<Wallet, ClientError> {
        get_json(&self.http, &format!("{}/wallets/new", self.host)).await
    }
}
