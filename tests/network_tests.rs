//! Broadcast, consensus and HTTP scenarios against in-process peers

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use ledger_node::api::{dns_router, node_router, wallets_router};
use ledger_node::ledger::{Block, Blockchain, Transaction};
use ledger_node::node::{
    Config, Event, EventBus, EventHandler, EventKind, MiningOutcome, NodeContext, RefreshPeers,
    Repos, ResolveAfterFailure,
};
use ledger_node::p2p::{DiscoveryClient, Node, WalletClient};
use ledger_node::storage::{NodeRepo, WalletRepo};
use ledger_node::wallet::Wallet;

const DIFFICULTY: usize = 1;

fn test_config(name: &str, port: u16, dns_port: u16, wallets_port: u16) -> Config {
    Config {
        node_name: name.to_string(),
        port,
        dns_host: "127.0.0.1".to_string(),
        dns_port,
        wallets_host: "127.0.0.1".to_string(),
        wallets_port,
        nodes_filename: String::new(),
        blockchain_filename: String::new(),
        wallets_filename: String::new(),
        mining_difficulty: DIFFICULTY,
        txs_per_block: 2,
        reward_amount: 1.0,
    }
}

/// Forwards every event kind it sees to the test
struct Record(mpsc::UnboundedSender<EventKind>);

#[async_trait]
impl EventHandler for Record {
    async fn handle(&self, _ctx: Arc<NodeContext>, event: Event) {
        let _ = self.0.send(event.kind());
    }
}

fn recording_bus() -> (EventBus, mpsc::UnboundedReceiver<EventKind>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let mut bus = EventBus::new();
    for kind in [
        EventKind::TransactionReceived,
        EventKind::BlockMined,
        EventKind::BlockMiningFailed,
        EventKind::PeerUnreachable,
    ] {
        bus.register(kind, Record(tx.clone()));
    }
    (bus, rx)
}

fn test_node(name: &str, bus: EventBus) -> Arc<NodeContext> {
    let ctx = NodeContext::new(
        test_config(name, 0, 1, 1),
        "127.0.0.1",
        Repos::temporary().unwrap(),
        bus,
    );
    Arc::new(ctx)
}

async fn spawn_router(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn peer(name: &str, addr: SocketAddr) -> Node {
    Node::new(name, "127.0.0.1", addr.port())
}

/// A port nothing listens on
async fn refused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

async fn block_peer(status: StatusCode) -> SocketAddr {
    let router = Router::new().route(
        "/shared-blocks",
        post(move |Json(block): Json<Block>| async move { (status, Json(block)) }),
    );
    spawn_router(router).await
}

async fn chain_peer(chain: Blockchain) -> SocketAddr {
    let router = Router::new().route(
        "/blockchain",
        get(move || {
            let chain = chain.clone();
            async move { Json(chain) }
        }),
    );
    spawn_router(router).await
}

fn mine(mut block: Block) -> Block {
    while !block.is_valid(DIFFICULTY) {
        block.nonce += 1;
    }
    block
}

/// Genesis plus `len - 1` mined blocks, one coinbase each
fn mined_chain(len: usize) -> Blockchain {
    let mut chain = Blockchain::new();
    while chain.len() < len {
        chain
            .add_tx(Transaction::coinbase(format!("miner-{}", chain.len()), 1.0))
            .unwrap();
        let block = mine(chain.new_block(1).unwrap());
        chain.add_block(block).unwrap();
    }
    chain
}

#[tokio::test]
async fn test_block_rejected_when_most_peers_error() {
    let (bus, mut events) = recording_bus();
    let ctx = test_node("miner", bus);
    ctx.blockchain.create().unwrap();
    ctx.blockchain
        .add_tx(Transaction::coinbase("someone", 1.0))
        .unwrap();

    let ok = block_peer(StatusCode::CREATED).await;
    let mut peers = vec![peer("ok", ok)];
    for i in 0..3 {
        peers.push(peer(&format!("bad-{i}"), block_peer(StatusCode::UNPROCESSABLE_ENTITY).await));
    }
    ctx.nodes.replace_nodes(peers).unwrap();

    let outcome = ctx.mine_once().await.unwrap();
    assert!(matches!(outcome, MiningOutcome::Rejected(_)));

    let chain = ctx.blockchain.get().unwrap();
    assert_eq!(chain.len(), 1);
    assert_eq!(chain.tx_pool.len(), 1);

    ctx.report_outcome(outcome).unwrap().await.unwrap();
    assert_eq!(events.recv().await, Some(EventKind::BlockMiningFailed));
}

#[tokio::test]
async fn test_block_committed_when_majority_accepts() {
    let (bus, mut events) = recording_bus();
    let ctx = test_node("miner", bus);
    ctx.blockchain.create().unwrap();
    for i in 0..3 {
        ctx.blockchain
            .add_tx(Transaction::coinbase(format!("someone-{i}"), 1.0))
            .unwrap();
    }

    let mut peers = Vec::new();
    for i in 0..3 {
        peers.push(peer(&format!("ok-{i}"), block_peer(StatusCode::CREATED).await));
    }
    peers.push(peer("bad", block_peer(StatusCode::UNPROCESSABLE_ENTITY).await));
    ctx.nodes.replace_nodes(peers).unwrap();

    let outcome = ctx.mine_once().await.unwrap();
    let block = match &outcome {
        MiningOutcome::Committed(block) => block.clone(),
        other => panic!("unexpected outcome {other:?}"),
    };

    let chain = ctx.blockchain.get().unwrap();
    assert_eq!(chain.len(), 2);
    assert_eq!(chain.blocks[1], block);
    assert_eq!(chain.tx_pool.len(), 1);

    ctx.report_outcome(outcome).unwrap().await.unwrap();
    assert_eq!(events.recv().await, Some(EventKind::BlockMined));
}

#[tokio::test]
async fn test_block_committed_when_exactly_half_reject() {
    let ctx = test_node("miner", EventBus::new());
    ctx.blockchain.create().unwrap();
    ctx.blockchain
        .add_tx(Transaction::coinbase("someone", 1.0))
        .unwrap();

    let mut peers = Vec::new();
    for i in 0..2 {
        peers.push(peer(&format!("ok-{i}"), block_peer(StatusCode::CREATED).await));
        peers.push(peer(&format!("bad-{i}"), block_peer(StatusCode::UNPROCESSABLE_ENTITY).await));
    }
    ctx.nodes.replace_nodes(peers).unwrap();

    let outcome = ctx.mine_once().await.unwrap();
    assert!(matches!(outcome, MiningOutcome::Committed(_)));

    let chain = ctx.blockchain.get().unwrap();
    assert_eq!(chain.len(), 2);
    assert!(chain.tx_pool.is_empty());
}

#[tokio::test]
async fn test_refused_peer_raises_peer_unreachable() {
    let (bus, mut events) = recording_bus();
    let ctx = test_node("miner", bus);
    ctx.blockchain.create().unwrap();
    ctx.blockchain
        .add_tx(Transaction::coinbase("someone", 1.0))
        .unwrap();

    let port = refused_port().await;
    ctx.nodes
        .replace_nodes(vec![Node::new("gone", "127.0.0.1", port)])
        .unwrap();

    let outcome = ctx.mine_once().await.unwrap();
    assert!(matches!(outcome, MiningOutcome::Rejected(_)));
    assert_eq!(events.recv().await, Some(EventKind::PeerUnreachable));
}

#[tokio::test]
async fn test_empty_pool_is_no_work() {
    let ctx = test_node("miner", EventBus::new());
    ctx.blockchain.create().unwrap();

    let outcome = ctx.mine_once().await.unwrap();
    assert!(matches!(outcome, MiningOutcome::NoWork));
    assert!(ctx.report_outcome(outcome).is_none());
}

#[tokio::test]
async fn test_solo_node_commits_without_peers() {
    let ctx = test_node("solo", EventBus::new());
    ctx.blockchain.create().unwrap();
    ctx.blockchain
        .add_tx(Transaction::coinbase("someone", 1.0))
        .unwrap();

    let outcome = ctx.mine_once().await.unwrap();
    assert!(matches!(outcome, MiningOutcome::Committed(_)));
    assert_eq!(ctx.blockchain.get().unwrap().len(), 2);
}

#[tokio::test]
async fn test_resolver_adopts_longest_peer_chain() {
    let ctx = test_node("local", EventBus::new());

    let longest = mined_chain(7);
    let confirmed = longest.blocks[3].txs[0].clone();
    let pending = Transaction::coinbase("still-pending", 1.0);

    let mut local = mined_chain(5);
    local.tx_pool = vec![confirmed.clone(), pending.clone()];
    ctx.blockchain.replace(&local).unwrap();

    let same_len = chain_peer(mined_chain(5)).await;
    let longer = chain_peer(longest.clone()).await;
    ctx.nodes
        .replace_nodes(vec![peer("five", same_len), peer("seven", longer)])
        .unwrap();

    let resolution = ctx.resolve_longest_chain().await.unwrap();
    assert_eq!(resolution.peer_chains, 2);
    assert!(resolution.replaced);
    assert!(!resolution.unreachable);

    let chain = ctx.blockchain.get().unwrap();
    assert_eq!(chain.blocks, longest.blocks);
    assert_eq!(chain.tx_pool, vec![pending]);
}

#[tokio::test]
async fn test_resolver_ignores_invalid_and_unreachable_peers() {
    let ctx = test_node("local", EventBus::new());
    let local = mined_chain(3);
    ctx.blockchain.replace(&local).unwrap();

    let mut forged = mined_chain(6);
    forged.blocks[2].prev_hash = vec![0; 32];
    let forged_peer = chain_peer(forged).await;
    let port = refused_port().await;

    ctx.nodes
        .replace_nodes(vec![
            peer("forged", forged_peer),
            Node::new("gone", "127.0.0.1", port),
        ])
        .unwrap();

    let resolution = ctx.resolve_longest_chain().await.unwrap();
    assert_eq!(resolution.peer_chains, 0);
    assert!(!resolution.replaced);
    assert!(resolution.unreachable);
    assert_eq!(ctx.blockchain.get().unwrap().blocks, local.blocks);
}

#[tokio::test]
async fn test_mined_block_propagates_to_real_peer() {
    let miner = test_node("miner", EventBus::new());
    let follower = test_node("follower", EventBus::new());

    let genesis = miner.blockchain.create().unwrap();
    follower.blockchain.replace(&genesis).unwrap();

    let follower_addr = spawn_router(node_router(Arc::clone(&follower))).await;
    miner
        .nodes
        .replace_nodes(vec![peer("follower", follower_addr)])
        .unwrap();

    let tx = miner
        .blockchain
        .add_tx(Transaction::coinbase("someone", 3.0))
        .unwrap();
    miner.replicate_tx(&tx).await;
    assert_eq!(follower.blockchain.get().unwrap().tx_pool, vec![tx]);

    let outcome = miner.mine_once().await.unwrap();
    assert!(matches!(outcome, MiningOutcome::Committed(_)));

    let ours = miner.blockchain.get().unwrap();
    let theirs = follower.blockchain.get().unwrap();
    assert_eq!(ours, theirs);
    assert_eq!(theirs.len(), 2);
    assert!(theirs.tx_pool.is_empty());
}

#[tokio::test]
async fn test_node_http_surface() {
    let (bus, mut events) = recording_bus();
    let ctx = test_node("node", bus);
    ctx.blockchain.create().unwrap();
    let base = format!("http://{}", spawn_router(node_router(Arc::clone(&ctx))).await);
    let http = reqwest::Client::new();

    let response = http
        .post(format!("{base}/transactions"))
        .json(&serde_json::json!({"body": {"sender": "", "recipient": "b", "amount": 1.0}}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), StatusCode::BAD_REQUEST.as_u16());

    let response = http
        .post(format!("{base}/transactions"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), StatusCode::BAD_REQUEST.as_u16());

    let response = http
        .post(format!("{base}/transactions"))
        .json(&Transaction::coinbase("miner", 5.0))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), StatusCode::CREATED.as_u16());
    let stored: Transaction = response.json().await.unwrap();
    assert!(!stored.id.is_empty());
    assert!(stored.timestamp > 0);
    assert_eq!(events.recv().await, Some(EventKind::TransactionReceived));

    let broke = Wallet::generate().new_transaction("miner", 5.0).unwrap();
    let response = http
        .post(format!("{base}/transactions"))
        .json(&broke)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), StatusCode::UNPROCESSABLE_ENTITY.as_u16());
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("insufficient funds"));

    let chain: Blockchain = http
        .get(format!("{base}/blockchain"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(chain.tx_pool, vec![stored]);
}

#[tokio::test]
async fn test_shared_blocks_require_work() {
    let ctx = test_node("node", EventBus::new());
    let mut chain = ctx.blockchain.create().unwrap();
    chain.add_tx(Transaction::coinbase("miner", 1.0)).unwrap();
    let base = format!("http://{}", spawn_router(node_router(Arc::clone(&ctx))).await);
    let http = reqwest::Client::new();

    let mut lazy = chain.new_block(1).unwrap();
    while lazy.is_valid(DIFFICULTY) {
        lazy.nonce += 1;
    }
    let response = http
        .post(format!("{base}/shared-blocks"))
        .json(&lazy)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), StatusCode::UNPROCESSABLE_ENTITY.as_u16());

    let mined = mine(chain.new_block(1).unwrap());
    let response = http
        .post(format!("{base}/shared-blocks"))
        .json(&mined)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), StatusCode::CREATED.as_u16());
    assert_eq!(ctx.blockchain.get().unwrap().len(), 2);
}

#[tokio::test]
async fn test_ping_records_announcing_node() {
    let ctx = test_node("node", EventBus::new());
    let base = format!("http://{}", spawn_router(node_router(Arc::clone(&ctx))).await);

    let nodes: Vec<Node> = reqwest::Client::new()
        .post(format!("{base}/ping"))
        .json(&Node::new("other", "10.0.0.7", 3000))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(nodes, vec![Node::new("other", "10.0.0.7", 3000)]);
}

#[tokio::test]
async fn test_discovery_and_wallet_services() {
    let dns = spawn_router(dns_router(NodeRepo::temporary().unwrap())).await;
    let wallets_repo = WalletRepo::temporary().unwrap();
    let wallets = spawn_router(wallets_router(wallets_repo.clone())).await;

    let discovery = DiscoveryClient::new(format!("http://{dns}"));
    discovery.add_node(&Node::new("a", "10.0.0.1", 3000)).await.unwrap();
    discovery.add_node(&Node::new("a", "10.0.0.2", 3001)).await.unwrap();
    discovery.add_node(&Node::new("b", "10.0.0.3", 3000)).await.unwrap();

    let nodes = discovery.get_nodes().await.unwrap();
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].host(), "http://10.0.0.2:3001");

    let wallet = WalletClient::new(format!("http://{wallets}"))
        .new_wallet()
        .await
        .unwrap();
    assert_eq!(wallets_repo.first().unwrap(), Some(wallet));
}

#[tokio::test]
async fn test_node_init_joins_network() {
    let dns_repo = NodeRepo::temporary().unwrap();
    dns_repo.add_node(Node::new("peer", "127.0.0.1", refused_port().await)).unwrap();
    let dns = spawn_router(dns_router(dns_repo.clone())).await;
    let wallets = spawn_router(wallets_router(WalletRepo::temporary().unwrap())).await;

    let (bus, _events) = recording_bus();
    let ctx = Arc::new(NodeContext::new(
        test_config("fresh", 4000, dns.port(), wallets.port()),
        "127.0.0.1",
        Repos::temporary().unwrap(),
        bus,
    ));

    ctx.init().await.unwrap();

    let registered = dns_repo.get_nodes().unwrap();
    assert!(registered.iter().any(|n| n.name == "fresh" && n.port == 4000));

    let peers = ctx.nodes.get_nodes().unwrap();
    assert_eq!(peers.len(), 1);
    assert_eq!(peers[0].name, "peer");

    let chain = ctx.blockchain.get().unwrap();
    assert_eq!(chain.len(), 1);
    assert!(chain.blocks[0].is_genesis());

    let wallet = ctx.miner_wallet().unwrap();
    let reward = ctx.reward_miner().await.unwrap();
    assert_eq!(reward.body.recipient, wallet.address_hex());
    assert_eq!(reward.body.amount, 1.0);
}

#[tokio::test]
async fn test_refresh_peers_handler_never_redispatches() {
    let dns_repo = NodeRepo::temporary().unwrap();
    let gone = Node::new("gone", "127.0.0.1", refused_port().await);
    dns_repo.add_node(gone.clone()).unwrap();
    let dns = spawn_router(dns_router(dns_repo)).await;

    let (bus, mut events) = recording_bus();
    let ctx = Arc::new(NodeContext::new(
        test_config("local", 4000, dns.port(), 1),
        "127.0.0.1",
        Repos::temporary().unwrap(),
        bus,
    ));
    ctx.blockchain.create().unwrap();
    ctx.nodes
        .replace_nodes(vec![Node::new("stale", "127.0.0.1", 1)])
        .unwrap();

    RefreshPeers
        .handle(Arc::clone(&ctx), Event::PeerUnreachable)
        .await;

    assert_eq!(ctx.nodes.get_nodes().unwrap(), vec![gone]);
    let silent = tokio::time::timeout(Duration::from_millis(300), events.recv()).await;
    assert!(silent.is_err(), "unexpected event {silent:?}");
}

#[tokio::test]
async fn test_resolve_after_failure_reports_unreachable_peer() {
    let (bus, mut events) = recording_bus();
    let ctx = test_node("local", bus);
    ctx.blockchain.replace(&mined_chain(2)).unwrap();

    let longer = mined_chain(4);
    let longer_peer = chain_peer(longer.clone()).await;
    let port = refused_port().await;
    ctx.nodes
        .replace_nodes(vec![
            peer("longer", longer_peer),
            Node::new("gone", "127.0.0.1", port),
        ])
        .unwrap();

    ResolveAfterFailure
        .handle(Arc::clone(&ctx), Event::BlockMiningFailed)
        .await;

    assert_eq!(ctx.blockchain.get().unwrap().blocks, longer.blocks);
    assert_eq!(events.recv().await, Some(EventKind::PeerUnreachable));
}
