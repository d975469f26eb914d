use std::net::Ipv4Addr;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::blockchain::chain::MINING_REWARD;
use crate::blockchain::pow::{MAX_DIFFICULTY, MINING_DIFFICULTY};
use crate::blockchain::MiningSettings;
use crate::network::discovery::DiscoveryRange;

/// Errors in node configuration
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid {name} range: {start} > {end}")]
    InvalidRange {
        name: &'static str,
        start: u64,
        end: u64,
    },

    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),

    #[error("Difficulty must be at most {max}, got {difficulty}")]
    InvalidDifficulty { difficulty: usize, max: usize },

    #[error("Mining reward must be a positive number, got {0}")]
    InvalidReward(f64),
}

/// Command-line and environment configuration of a node
#[derive(Debug, Clone, Parser)]
#[clap(name = "pow-ledger", version, about = "Proof-of-work ledger node")]
pub struct NodeConfig {
    /// IPv4 address to bind and to scan around for neighbours
    #[clap(long, env = "LEDGER_HOST", default_value = "127.0.0.1")]
    pub host: Ipv4Addr,

    /// Port to serve the API on
    #[clap(short, long, env = "LEDGER_PORT", default_value_t = 5001)]
    pub port: u16,

    /// Address credited with mining rewards; a fresh wallet is created when omitted
    #[clap(long, env = "LEDGER_MINER_ADDRESS")]
    pub miner_address: Option<String>,

    /// Leading hex zeros required in block hashes
    #[clap(long, env = "LEDGER_DIFFICULTY", default_value_t = MINING_DIFFICULTY)]
    pub difficulty: usize,

    /// Reward per mined block
    #[clap(long, env = "LEDGER_MINING_REWARD", default_value_t = MINING_REWARD)]
    pub mining_reward: f64,

    /// Seconds between the end of one mining attempt and the start of the next
    #[clap(long, env = "LEDGER_MINING_INTERVAL", default_value_t = 20)]
    pub mining_interval_secs: u64,

    /// Seconds between neighbour list refreshes
    #[clap(long, env = "LEDGER_NEIGHBOUR_SYNC", default_value_t = 20)]
    pub neighbour_sync_secs: u64,

    #[clap(long, default_value_t = 5001)]
    pub port_range_start: u16,

    #[clap(long, default_value_t = 5003)]
    pub port_range_end: u16,

    /// First offset added to the host's last octet when scanning
    #[clap(long, default_value_t = 0)]
    pub ip_range_start: u8,

    #[clap(long, default_value_t = 1)]
    pub ip_range_end: u8,

    /// Per-request timeout for neighbour probes and peer calls, in milliseconds
    #[clap(long, env = "LEDGER_PEER_TIMEOUT_MS", default_value_t = 3000)]
    pub peer_timeout_ms: u64,

    /// Serve the API only; do not sync, resolve or mine in the background
    #[clap(long)]
    pub manual: bool,
}

impl NodeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port_range_start > self.port_range_end {
            return Err(ConfigError::InvalidRange {
                name: "port",
                start: self.port_range_start.into(),
                end: self.port_range_end.into(),
            });
        }
        if self.ip_range_start > self.ip_range_end {
            return Err(ConfigError::InvalidRange {
                name: "ip",
                start: self.ip_range_start.into(),
                end: self.ip_range_end.into(),
            });
        }
        if self.mining_interval_secs == 0 {
            return Err(ConfigError::ZeroInterval("mining interval"));
        }
        if self.neighbour_sync_secs == 0 {
            return Err(ConfigError::ZeroInterval("neighbour sync interval"));
        }
        if self.peer_timeout_ms == 0 {
            return Err(ConfigError::ZeroInterval("peer timeout"));
        }
        if self.difficulty > MAX_DIFFICULTY {
            return Err(ConfigError::InvalidDifficulty {
                difficulty: self.difficulty,
                max: MAX_DIFFICULTY,
            });
        }
        if !self.mining_reward.is_finite() || self.mining_reward <= 0.0 {
            return Err(ConfigError::InvalidReward(self.mining_reward));
        }
        Ok(())
    }

    pub fn mining_settings(&self) -> MiningSettings {
        MiningSettings {
            difficulty: self.difficulty,
            reward: self.mining_reward,
        }
    }

    pub fn discovery_range(&self) -> DiscoveryRange {
        DiscoveryRange {
            ip_start: self.ip_range_start,
            ip_end: self.ip_range_end,
            port_start: self.port_range_start,
            port_end: self.port_range_end,
        }
    }

    pub fn mining_interval(&self) -> Duration {
        Duration::from_secs(self.mining_interval_secs)
    }

    pub fn neighbour_sync_interval(&self) -> Duration {
        Duration::from_secs(self.neighbour_sync_secs)
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_millis(self.peer_timeout_ms)
    }
}
