//! A proof-of-work ledger node.
//!
//! The ledger engine lives in [`blockchain`]; [`consensus`] adopts the longest
//! valid chain among neighbours; [`node`] wires the ledger to its peers and
//! drives the periodic mining and neighbour sync loops; [`api`] exposes it all
//! over HTTP.

pub mod api;
pub mod blockchain;
pub mod config;
pub mod consensus;
pub mod network;
pub mod node;
pub mod scheduler;
