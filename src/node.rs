use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use tokio::task::JoinHandle;

use crate::blockchain::{Block, Blockchain, BlockchainError, Submission};
use crate::config::NodeConfig;
use crate::consensus::ConsensusResolver;
use crate::network::discovery::{self, DiscoveryRange};
use crate::network::{broadcast, PeerEvent, PeerNetwork, TransactionRequest};
use crate::scheduler::{spawn_periodic, spawn_periodic_after};

/// Where the node lives and how often its background tasks run
#[derive(Debug, Clone)]
pub struct NodeSettings {
    pub host: Ipv4Addr,
    pub port: u16,
    pub discovery: DiscoveryRange,
    pub peer_timeout: Duration,
    pub mining_interval: Duration,
    pub neighbour_sync_interval: Duration,
}

impl From<&NodeConfig> for NodeSettings {
    fn from(config: &NodeConfig) -> Self {
        NodeSettings {
            host: config.host,
            port: config.port,
            discovery: config.discovery_range(),
            peer_timeout: config.peer_timeout(),
            mining_interval: config.mining_interval(),
            neighbour_sync_interval: config.neighbour_sync_interval(),
        }
    }
}

/// A ledger wired to its peers
pub struct Node {
    blockchain: Arc<Blockchain>,
    network: Arc<dyn PeerNetwork>,
    consensus: ConsensusResolver,
    settings: NodeSettings,
}

impl Node {
    pub fn new(blockchain: Arc<Blockchain>, network: Arc<dyn PeerNetwork>, settings: NodeSettings) -> Self {
        let consensus = ConsensusResolver::new(blockchain.clone(), network.clone());

        Node {
            blockchain,
            network,
            consensus,
            settings,
        }
    }

    pub fn blockchain(&self) -> &Arc<Blockchain> {
        &self.blockchain
    }

    fn submission(request: TransactionRequest) -> Result<Submission, BlockchainError> {
        Submission::try_from(request).map_err(|err| {
            warn!("Rejected transaction request: {}", err);
            BlockchainError::from(err)
        })
    }

    /// Admits a transaction submitted by a client and relays it to every neighbour.
    ///
    /// Relay failures are logged and do not undo the local admission.
    pub async fn create_transaction(&self, request: TransactionRequest) -> Result<(), BlockchainError> {
        let submission = Self::submission(request.clone())?;
        self.blockchain.add_transaction(submission)?;

        let neighbours = self.blockchain.neighbours();
        broadcast(self.network.as_ref(), &neighbours, &PeerEvent::Transaction(request)).await;

        Ok(())
    }

    /// Admits a transaction relayed by a neighbour, without relaying it further
    pub fn add_transaction(&self, request: TransactionRequest) -> Result<(), BlockchainError> {
        let submission = Self::submission(request)?;
        self.blockchain.add_transaction(submission)
    }

    /// Mines one block off the async workers, then tells neighbours to clear
    /// their pools and run consensus.
    ///
    /// Notifications go out from a background task; the returned block does
    /// not wait for neighbours to answer.
    pub async fn mine(&self) -> Result<Block, BlockchainError> {
        let blockchain = self.blockchain.clone();
        let block = tokio::task::spawn_blocking(move || blockchain.mine())
            .await
            .map_err(|e| BlockchainError::SystemError(format!("Mining task failed: {}", e)))?;

        self.announce_block();
        Ok(block)
    }

    fn announce_block(&self) {
        let network = self.network.clone();
        let neighbours = self.blockchain.neighbours();

        tokio::spawn(async move {
            broadcast(network.as_ref(), &neighbours, &PeerEvent::BlockCreated).await;
            broadcast(network.as_ref(), &neighbours, &PeerEvent::ConsensusRequested).await;
        });
    }

    pub async fn resolve_conflicts(&self) -> bool {
        self.consensus.resolve_conflicts().await
    }

    /// Rescans the discovery range and replaces the neighbour list
    pub async fn sync_neighbours(&self) {
        let neighbours = discovery::find_neighbours(
            self.settings.host,
            self.settings.port,
            &self.settings.discovery,
            self.settings.peer_timeout,
        )
        .await;

        info!("Neighbours: {:?}", neighbours);
        self.blockchain.set_neighbours(neighbours);
    }

    /// Startup sequence: find neighbours, catch up with them, then keep
    /// mining and refreshing neighbours in the background.
    pub async fn run(self: Arc<Self>) -> Vec<JoinHandle<()>> {
        self.sync_neighbours().await;
        self.resolve_conflicts().await;

        let sync_node = self.clone();
        let neighbour_sync = spawn_periodic_after(
            "neighbour sync",
            self.settings.neighbour_sync_interval,
            self.settings.neighbour_sync_interval,
            move || {
                let node = sync_node.clone();
                async move { node.sync_neighbours().await }
            },
        );

        let mining_node = self.clone();
        let mining = spawn_periodic("mining", self.settings.mining_interval, move || {
            let node = mining_node.clone();
            async move {
                if let Err(err) = node.mine().await {
                    error!("Mining failed: {}", err);
                }
            }
        });

        vec![neighbour_sync, mining]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{MiningSettings, TransactionError, Wallet, MINING_SENDER};
    use crate::network::testing::StaticNetwork;

    fn settings() -> NodeSettings {
        NodeSettings {
            host: Ipv4Addr::LOCALHOST,
            port: 0,
            discovery: DiscoveryRange {
                ip_start: 0,
                ip_end: 0,
                port_start: 1,
                port_end: 1,
            },
            peer_timeout: Duration::from_millis(200),
            mining_interval: Duration::from_millis(20),
            neighbour_sync_interval: Duration::from_secs(60),
        }
    }

    fn node(network: &Arc<StaticNetwork>) -> Node {
        let blockchain = Arc::new(Blockchain::new("miner".into(), MiningSettings::default()));
        Node::new(blockchain, network.clone(), settings())
    }

    fn funded_wallet(node: &Node, value: f64) -> Wallet {
        let wallet = Wallet::new();
        node.blockchain()
            .add_transaction(Submission::Reward {
                recipient: wallet.address().clone(),
                value,
            })
            .unwrap();
        node.blockchain().mine();
        wallet
    }

    #[tokio::test]
    async fn test_create_transaction_relays_to_neighbours() {
        let network = Arc::new(StaticNetwork::new());
        let node = node(&network);
        node.blockchain().set_neighbours(vec!["a".into(), "b".into()]);
        let wallet = funded_wallet(&node, 10.0);

        let request = TransactionRequest::signed(&wallet, &"B".into(), 4.0);
        node.create_transaction(request.clone()).await.unwrap();

        assert_eq!(node.blockchain().transaction_pool().len(), 1);
        assert_eq!(
            network.sent(),
            vec![
                ("a".to_string(), PeerEvent::Transaction(request.clone())),
                ("b".to_string(), PeerEvent::Transaction(request)),
            ]
        );
    }

    #[tokio::test]
    async fn test_relay_failure_keeps_local_admission() {
        let network = Arc::new(StaticNetwork::new());
        network.set_unreachable("down");
        let node = node(&network);
        node.blockchain().set_neighbours(vec!["down".into()]);
        let wallet = funded_wallet(&node, 10.0);

        let request = TransactionRequest::signed(&wallet, &"B".into(), 4.0);
        assert!(node.create_transaction(request).await.is_ok());
        assert_eq!(node.blockchain().transaction_pool().len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_transaction_is_not_relayed() {
        let network = Arc::new(StaticNetwork::new());
        let node = node(&network);
        node.blockchain().set_neighbours(vec!["a".into()]);
        let broke = Wallet::new();

        let request = TransactionRequest::signed(&broke, &"B".into(), 4.0);
        let result = node.create_transaction(request).await;

        assert!(matches!(
            result,
            Err(BlockchainError::TransactionError(TransactionError::InsufficientBalance { .. }))
        ));
        assert!(network.sent().is_empty());
        assert!(node.blockchain().transaction_pool().is_empty());
    }

    #[tokio::test]
    async fn test_reward_sender_unreachable_from_requests() {
        let network = Arc::new(StaticNetwork::new());
        let node = node(&network);
        let wallet = Wallet::new();
        let mut request = TransactionRequest::signed(&wallet, &"B".into(), 4.0);
        request.sender_blockchain_address = MINING_SENDER.to_string();

        assert!(node.create_transaction(request.clone()).await.is_err());
        assert!(node.add_transaction(request).is_err());
        assert!(node.blockchain().transaction_pool().is_empty());
    }

    #[tokio::test]
    async fn test_replayed_transaction_is_not_relayed() {
        let network = Arc::new(StaticNetwork::new());
        let node = node(&network);
        node.blockchain().set_neighbours(vec!["a".into()]);
        let wallet = funded_wallet(&node, 10.0);

        node.add_transaction(TransactionRequest::signed(&wallet, &"B".into(), 4.0))
            .unwrap();

        assert_eq!(node.blockchain().transaction_pool().len(), 1);
        assert!(network.sent().is_empty());
    }

    #[tokio::test]
    async fn test_mine_notifies_neighbours() {
        let network = Arc::new(StaticNetwork::new());
        let node = node(&network);
        node.blockchain().set_neighbours(vec!["a".into()]);

        let block = node.mine().await.unwrap();
        assert_eq!(node.blockchain().last_block(), block);

        for _ in 0..100 {
            if network.sent().len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(
            network.sent(),
            vec![
                ("a".to_string(), PeerEvent::BlockCreated),
                ("a".to_string(), PeerEvent::ConsensusRequested),
            ]
        );
    }

    #[tokio::test]
    async fn test_mine_does_not_wait_for_neighbours() {
        let network = Arc::new(StaticNetwork::new());
        network.set_delay(Duration::from_secs(5));
        let node = node(&network);
        node.blockchain().set_neighbours(vec!["slow".into()]);

        let mined = tokio::time::timeout(Duration::from_secs(2), node.mine()).await;

        assert!(matches!(mined, Ok(Ok(_))));
        assert_eq!(node.blockchain().chain_len(), 2);
    }

    #[tokio::test]
    async fn test_sync_neighbours_replaces_list() {
        let network = Arc::new(StaticNetwork::new());
        let node = node(&network);
        node.blockchain().set_neighbours(vec!["stale:1".into()]);

        node.sync_neighbours().await;

        assert!(node.blockchain().neighbours().is_empty());
    }

    #[tokio::test]
    async fn test_run_catches_up_then_mines() {
        let network = Arc::new(StaticNetwork::new());
        let node = Arc::new(node(&network));

        let handles = node.clone().run().await;
        tokio::time::sleep(Duration::from_millis(500)).await;
        for handle in handles {
            handle.abort();
        }

        assert!(node.blockchain().chain_len() >= 2);
        assert!(node.blockchain().is_valid());
    }
}
