use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::blockchain::{Address, Block, Transaction, Wallet};
use crate::network::{ChainResponse, TransactionRequest};
use crate::node::Node;

/// Data structure for the node state
pub type NodeData = web::Data<Node>;

/// Response for the transaction pool endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct PoolResponse {
    pub length: usize,
    pub transactions: Vec<Transaction>,
}

/// Response for the mine endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct MineResponse {
    pub message: String,
    pub block: Block,
}

/// Response for the consensus endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ConsensusResponse {
    /// Whether the local chain was replaced
    pub replaced: bool,
}

/// Response for the amount endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct AmountResponse {
    pub address: String,
    pub amount: f64,
}

/// Response for the create wallet endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct WalletResponse {
    pub address: String,

    /// Hex-encoded ed25519 public key, as expected in transaction requests
    pub public_key: String,

    /// Hex-encoded secret key
    pub private_key: String,
}

fn bad_request(err: impl std::fmt::Display) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({ "error": err.to_string() }))
}

/// Get the full blockchain
#[utoipa::path(
    get,
    path = "/api/v1/chain",
    responses(
        (status = 200, description = "Blockchain retrieved successfully", body = ChainResponse)
    )
)]
pub async fn get_chain(node: NodeData) -> impl Responder {
    HttpResponse::Ok().json(ChainResponse::new(node.blockchain().chain()))
}

/// Get all pending transactions
#[utoipa::path(
    get,
    path = "/api/v1/transactions",
    responses(
        (status = 200, description = "Transaction pool retrieved successfully", body = PoolResponse)
    )
)]
pub async fn get_transactions(node: NodeData) -> impl Responder {
    let transactions = node.blockchain().transaction_pool();

    HttpResponse::Ok().json(PoolResponse {
        length: transactions.len(),
        transactions,
    })
}

/// Create a new transaction
///
/// Verifies and admits a signed transaction, then relays it to every neighbour
#[utoipa::path(
    post,
    path = "/api/v1/transactions",
    request_body = TransactionRequest,
    responses(
        (status = 201, description = "Transaction admitted"),
        (status = 400, description = "Transaction rejected")
    )
)]
pub async fn create_transaction(node: NodeData, request: web::Json<TransactionRequest>) -> impl Responder {
    match node.create_transaction(request.into_inner()).await {
        Ok(()) => HttpResponse::Created().json(serde_json::json!({ "message": "success" })),
        Err(err) => bad_request(err),
    }
}

/// Admit a transaction relayed by a neighbour
#[utoipa::path(
    put,
    path = "/api/v1/transactions",
    request_body = TransactionRequest,
    responses(
        (status = 200, description = "Transaction admitted"),
        (status = 400, description = "Transaction rejected")
    )
)]
pub async fn update_transaction(node: NodeData, request: web::Json<TransactionRequest>) -> impl Responder {
    match node.add_transaction(request.into_inner()) {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "message": "success" })),
        Err(err) => bad_request(err),
    }
}

/// Clear the transaction pool
#[utoipa::path(
    delete,
    path = "/api/v1/transactions",
    responses(
        (status = 200, description = "Transaction pool cleared")
    )
)]
pub async fn clear_transactions(node: NodeData) -> impl Responder {
    node.blockchain().clear_transaction_pool();
    HttpResponse::Ok().json(serde_json::json!({ "message": "success" }))
}

/// Mine a new block
#[utoipa::path(
    post,
    path = "/api/v1/mine",
    responses(
        (status = 200, description = "Block mined successfully", body = MineResponse),
        (status = 500, description = "Mining failed")
    )
)]
pub async fn mine_block(node: NodeData) -> impl Responder {
    match node.mine().await {
        Ok(block) => HttpResponse::Ok().json(MineResponse {
            message: "New Block Mined".to_string(),
            block,
        }),
        Err(err) => HttpResponse::InternalServerError().json(serde_json::json!({
            "error": format!("Failed to mine block: {}", err)
        })),
    }
}

/// Resolve conflicts against every neighbour
#[utoipa::path(
    put,
    path = "/api/v1/consensus",
    responses(
        (status = 200, description = "Consensus resolved", body = ConsensusResponse)
    )
)]
pub async fn consensus(node: NodeData) -> impl Responder {
    let replaced = node.resolve_conflicts().await;
    HttpResponse::Ok().json(ConsensusResponse { replaced })
}

/// Get the committed balance of an address
#[utoipa::path(
    get,
    path = "/api/v1/amount/{address}",
    responses(
        (status = 200, description = "Balance retrieved successfully", body = AmountResponse)
    )
)]
pub async fn get_amount(node: NodeData, address: web::Path<String>) -> impl Responder {
    let address = Address(address.into_inner());
    let amount = node.blockchain().balance_of(&address);

    HttpResponse::Ok().json(AmountResponse {
        address: address.0,
        amount,
    })
}

/// Check if the blockchain is valid
#[utoipa::path(
    get,
    path = "/api/v1/validate",
    responses(
        (status = 200, description = "Blockchain validation status", body = bool)
    )
)]
pub async fn validate_chain(node: NodeData) -> impl Responder {
    HttpResponse::Ok().json(node.blockchain().is_valid())
}

/// Create a new wallet
///
/// The private key is not stored; keep it yourself
#[utoipa::path(
    post,
    path = "/api/v1/wallet/new",
    responses(
        (status = 201, description = "Wallet created successfully", body = WalletResponse)
    )
)]
pub async fn create_wallet() -> impl Responder {
    let wallet = Wallet::new();

    HttpResponse::Created().json(WalletResponse {
        address: wallet.address().0.clone(),
        public_key: wallet.public_key_hex(),
        private_key: hex::encode(wallet.export_secret_key()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use actix_web::{http::StatusCode, test, App};

    use crate::api::configure_routes;
    use crate::blockchain::{Blockchain, MiningSettings, Submission, MINING_SENDER};
    use crate::network::discovery::DiscoveryRange;
    use crate::network::testing::StaticNetwork;
    use crate::node::NodeSettings;

    fn node_data() -> NodeData {
        let blockchain = Arc::new(Blockchain::new("miner".into(), MiningSettings::default()));
        let settings = NodeSettings {
            host: std::net::Ipv4Addr::LOCALHOST,
            port: 0,
            discovery: DiscoveryRange {
                ip_start: 0,
                ip_end: 0,
                port_start: 1,
                port_end: 1,
            },
            peer_timeout: Duration::from_millis(100),
            mining_interval: Duration::from_secs(60),
            neighbour_sync_interval: Duration::from_secs(60),
        };
        web::Data::new(Node::new(blockchain, Arc::new(StaticNetwork::new()), settings))
    }

    #[actix_web::test]
    async fn test_get_chain() {
        let app = test::init_service(App::new().app_data(node_data()).configure(configure_routes)).await;

        let request = test::TestRequest::get().uri("/api/v1/chain").to_request();
        let response: ChainResponse = test::call_and_read_body_json(&app, request).await;

        assert_eq!(response.length, 1);
        assert_eq!(response.chain[0].nonce, 0);
    }

    #[actix_web::test]
    async fn test_transaction_lifecycle() {
        let data = node_data();
        let wallet = Wallet::new();
        data.blockchain()
            .add_transaction(Submission::Reward {
                recipient: wallet.address().clone(),
                value: 10.0,
            })
            .unwrap();
        data.blockchain().mine();
        let app = test::init_service(App::new().app_data(data.clone()).configure(configure_routes)).await;

        let request = test::TestRequest::post()
            .uri("/api/v1/transactions")
            .set_json(TransactionRequest::signed(&wallet, &"B".into(), 3.0))
            .to_request();
        assert_eq!(test::call_service(&app, request).await.status(), StatusCode::CREATED);

        let request = test::TestRequest::get().uri("/api/v1/transactions").to_request();
        let pool: PoolResponse = test::call_and_read_body_json(&app, request).await;
        assert_eq!(pool.length, 1);

        let request = test::TestRequest::post().uri("/api/v1/mine").to_request();
        assert_eq!(test::call_service(&app, request).await.status(), StatusCode::OK);

        let request = test::TestRequest::get().uri("/api/v1/amount/B").to_request();
        let amount: AmountResponse = test::call_and_read_body_json(&app, request).await;
        assert_eq!(amount.amount, 3.0);
    }

    #[actix_web::test]
    async fn test_rejects_forged_and_reserved_requests() {
        let app = test::init_service(App::new().app_data(node_data()).configure(configure_routes)).await;
        let wallet = Wallet::new();

        let mut reserved = TransactionRequest::signed(&wallet, &"B".into(), 3.0);
        reserved.sender_blockchain_address = MINING_SENDER.to_string();
        let request = test::TestRequest::put()
            .uri("/api/v1/transactions")
            .set_json(reserved)
            .to_request();
        assert_eq!(test::call_service(&app, request).await.status(), StatusCode::BAD_REQUEST);

        let mut forged = TransactionRequest::signed(&wallet, &"B".into(), 3.0);
        forged.value = 30.0;
        let request = test::TestRequest::post()
            .uri("/api/v1/transactions")
            .set_json(forged)
            .to_request();
        assert_eq!(test::call_service(&app, request).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_clear_transactions_and_consensus() {
        let data = node_data();
        data.blockchain()
            .add_transaction(Submission::Reward {
                recipient: "B".into(),
                value: 1.0,
            })
            .unwrap();
        let app = test::init_service(App::new().app_data(data.clone()).configure(configure_routes)).await;

        let request = test::TestRequest::delete().uri("/api/v1/transactions").to_request();
        assert_eq!(test::call_service(&app, request).await.status(), StatusCode::OK);
        assert!(data.blockchain().transaction_pool().is_empty());

        let request = test::TestRequest::put().uri("/api/v1/consensus").to_request();
        let response: ConsensusResponse = test::call_and_read_body_json(&app, request).await;
        assert!(!response.replaced);
    }
}
