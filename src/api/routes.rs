use actix_web::web;

use super::handlers;

/// Configures the API routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/chain", web::get().to(handlers::get_chain))
            .route("/transactions", web::get().to(handlers::get_transactions))
            .route("/transactions", web::post().to(handlers::create_transaction))
            .route("/transactions", web::put().to(handlers::update_transaction))
            .route("/transactions", web::delete().to(handlers::clear_transactions))
            .route("/mine", web::post().to(handlers::mine_block))
            .route("/consensus", web::put().to(handlers::consensus))
            .route("/amount/{address}", web::get().to(handlers::get_amount))
            .route("/validate", web::get().to(handlers::validate_chain))
            .route("/wallet/new", web::post().to(handlers::create_wallet))
    );
}
