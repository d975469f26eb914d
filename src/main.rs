use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use clap::Parser;
use log::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use pow_ledger::api;
use pow_ledger::blockchain::{self, Address, Blockchain, Wallet};
use pow_ledger::config::NodeConfig;
use pow_ledger::network::{self, HttpPeerNetwork};
use pow_ledger::node::{Node, NodeSettings};

// Use the configured miner address, or create a wallet to receive rewards
fn miner_address(config: &NodeConfig) -> Address {
    if let Some(address) = &config.miner_address {
        return Address(address.clone());
    }

    let wallet = Wallet::new();
    info!("Created miner wallet with address: {}", wallet.address());
    info!("Miner wallet public key: {}", wallet.public_key_hex());
    info!("Miner wallet private key: {}", hex::encode(wallet.export_secret_key()));
    wallet.address().clone()
}

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::get_chain,
        api::handlers::get_transactions,
        api::handlers::create_transaction,
        api::handlers::update_transaction,
        api::handlers::clear_transactions,
        api::handlers::mine_block,
        api::handlers::consensus,
        api::handlers::get_amount,
        api::handlers::validate_chain,
        api::handlers::create_wallet
    ),
    components(
        schemas(
            blockchain::Block,
            blockchain::Transaction,
            blockchain::crypto::Address,
            network::ChainResponse,
            network::TransactionRequest,
            api::handlers::PoolResponse,
            api::handlers::MineResponse,
            api::handlers::ConsensusResponse,
            api::handlers::AmountResponse,
            api::handlers::WalletResponse
        )
    ),
    tags(
        (name = "ledger", description = "Proof-of-work ledger node API")
    ),
    info(
        title = "Ledger Node API",
        version = "1.0.0",
        description = "A proof-of-work ledger node with longest-chain consensus",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
struct ApiDoc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = NodeConfig::parse();
    config.validate()?;

    let blockchain = Arc::new(Blockchain::new(miner_address(&config), config.mining_settings()));
    let network = HttpPeerNetwork::new(config.peer_timeout()).context("Failed to build peer client")?;
    let node = Arc::new(Node::new(blockchain, Arc::new(network), NodeSettings::from(&config)));

    let bind = (config.host.to_string(), config.port);
    info!("Starting HTTP server at http://{}:{}", bind.0, bind.1);

    let data = web::Data::from(node.clone());
    let server = HttpServer::new(move || {
        // Configure CORS
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .app_data(data.clone())
            .configure(api::configure_routes)
            .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()))
    })
    .bind(bind.clone())
    .with_context(|| format!("Failed to bind {}:{}", bind.0, bind.1))?
    .run();
    let server = actix_web::rt::spawn(server);

    // Background loops start once the server accepts, so neighbours can reach us
    if config.manual {
        info!("Manual mode: background mining and neighbour sync disabled");
    } else {
        node.run().await;
    }

    server
        .await
        .context("HTTP server task panicked")?
        .context("HTTP server failed")
}
