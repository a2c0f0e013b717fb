//! Peer broadcast client
//!
//! Every peer operation fans out one request per peer, each on its own task,
//! and waits for all of them. Callers only look at the aggregate: the error
//! ratio and whether any peer refused the connection.

use std::error::Error as StdError;
use std::future::Future;

use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use super::Node;
use crate::ledger::{Block, Blockchain, Transaction};

/// Outbound request errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{url}: {source}")]
    Transport {
        url: String,
        refused: bool,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url}: status {status}: {body}")]
    Status { url: String, status: u16, body: String },
    #[error("{url}: invalid response body: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request task failed: {0}")]
    Task(String),
}

impl ClientError {
    fn transport(url: &str, source: reqwest::Error) -> Self {
        ClientError::Transport {
            url: url.to_string(),
            refused: is_connection_refused(&source),
            source,
        }
    }

    /// The peer actively refused the connection
    pub fn is_connection_refused(&self) -> bool {
        matches!(self, ClientError::Transport { refused: true, .. })
    }
}

fn is_connection_refused(err: &reqwest::Error) -> bool {
    let mut current = Some(err as &(dyn StdError + 'static));

    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::ConnectionRefused {
                return true;
            }
        }
        if e.to_string().to_lowercase().contains("connection refused") {
            return true;
        }
        current = e.source();
    }

    false
}

/// Issue a GET and decode the JSON body
pub async fn get_json<R>(http: &Client, url: &str) -> Result<R, ClientError>
where
    R: DeserializeOwned,
{
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| ClientError::transport(url, e))?;

    decode(url, response).await
}

/// Issue a JSON POST and decode the JSON body
pub async fn post_json<B, R>(http: &Client, url: &str, body: &B) -> Result<R, ClientError>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let response = http
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| ClientError::transport(url, e))?;

    decode(url, response).await
}

async fn decode<R>(url: &str, response: reqwest::Response) -> Result<R, ClientError>
where
    R: DeserializeOwned,
{
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ClientError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    response.json().await.map_err(|source| ClientError::Decode {
        url: url.to_string(),
        source,
    })
}

/// Outcome of a single peer request
#[derive(Debug)]
pub struct PeerResponse<T> {
    pub node: Node,
    pub result: Result<T, ClientError>,
}

/// Outcome of a fan-out
#[derive(Debug)]
pub struct BulkResponse<T> {
    pub responses: Vec<PeerResponse<T>>,
}

impl<T> BulkResponse<T> {
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    fn failures(&self) -> impl Iterator<Item = &ClientError> {
        self.responses.iter().filter_map(|r| r.result.as_ref().err())
    }

    /// Share of peers that errored; 0.0 when there were no peers
    pub fn error_ratio(&self) -> f64 {
        if self.responses.is_empty() {
            return 0.0;
        }
        self.failures().count() as f64 / self.responses.len() as f64
    }

    pub fn has_errors(&self) -> bool {
        self.failures().next().is_some()
    }

    pub fn has_connection_refused(&self) -> bool {
        self.failures().any(ClientError::is_connection_refused)
    }

    /// All error messages, one per line
    pub fn errors(&self) -> String {
        self.failures()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Successful payloads in peer order
    pub fn into_successes(self) -> Vec<T> {
        self.responses
            .into_iter()
            .filter_map(|r| r.result.ok())
            .collect()
    }
}

/// Run `request` against every node concurrently and collect all outcomes
pub async fn fan_out<T, F, Fut>(nodes: &[Node], request: F) -> BulkResponse<T>
where
    T: Send + 'static,
    F: Fn(Node) -> Fut,
    Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
{
    let handles: Vec<_> = nodes
        .iter()
        .cloned()
        .map(|node| (node.clone(), tokio::spawn(request(node))))
        .collect();

    let mut responses = Vec::with_capacity(handles.len());
    for (node, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(ClientError::Task(e.to_string())),
        };
        responses.push(PeerResponse { node, result });
    }

    BulkResponse { responses }
}

/// Client for the node-to-node HTTP surface
#[derive(Debug, Clone, Default)]
pub struct PeerClient {
    http: Client,
}

impl PeerClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Announce `self_node` to every peer; each answers with its peer list
    pub async fn ping(&self, nodes: &[Node], self_node: &Node) -> BulkResponse<Vec<Node>> {
        let http = self.http.clone();
        let self_node = self_node.clone();

        fan_out(nodes, move |node| {
            let http = http.clone();
            let self_node = self_node.clone();
            async move {
                let url = format!("{}/ping", node.host());
                post_json(&http, &url, &self_node).await
            }
        })
        .await
    }

    /// Replicate a pooled transaction
    pub async fn share_tx(&self, nodes: &[Node], tx: &Transaction) -> BulkResponse<Transaction> {
        let http = self.http.clone();
        let tx = tx.clone();

        fan_out(nodes, move |node| {
            let http = http.clone();
            let tx = tx.clone();
            async move {
                let url = format!("{}/shared-transactions", node.host());
                post_json(&http, &url, &tx).await
            }
        })
        .await
    }

    /// Propagate a mined block
    pub async fn share_block(&self, nodes: &[Node], block: &Block) -> BulkResponse<Block> {
        let http = self.http.clone();
        let block = block.clone();

        fan_out(nodes, move |node| {
            let http = http.clone();
            let block = block.clone();
            async move {
                let url = format!("{}/shared-blocks", node.host());
                post_json(&http, &url, &block).await
            }
        })
        .await
    }

    /// Fetch every peer's full chain
    pub async fn get_blockchains(&self, nodes: &[Node]) -> BulkResponse<Blockchain> {
        let http = self.http.clone();

        fan_out(nodes, move |node| {
            let http = http.clone();
            async move {
                let url = format!("{}/blockchain", node.host());
                get_json(&http, &url).await
            }
        })
        .await
    }
}
