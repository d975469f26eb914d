// API module
//
// REST surface of the node. Neighbours talk to each other through the same
// endpoints clients use.

pub mod handlers;
pub mod routes;

// Re-export main components for easier access
pub use routes::configure_routes;
