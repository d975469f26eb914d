use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode};

use super::messages::ChainResponse;
use super::{PeerError, PeerEvent, PeerNetwork};
use crate::blockchain::Block;

/// `PeerNetwork` over the neighbours' REST API
#[derive(Debug, Clone)]
pub struct HttpPeerNetwork {
    client: Client,
}

impl HttpPeerNetwork {
    /// Creates a client whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(HttpPeerNetwork { client })
    }

    fn endpoint(neighbour: &str, path: &str) -> String {
        format!("http://{}/api/v1/{}", neighbour, path)
    }
}

fn unreachable(neighbour: &str, err: reqwest::Error) -> PeerError {
    PeerError::Unreachable {
        neighbour: neighbour.to_string(),
        reason: err.to_string(),
    }
}

#[async_trait]
impl PeerNetwork for HttpPeerNetwork {
    async fn fetch_chain(&self, neighbour: &str) -> Result<Vec<Block>, PeerError> {
        let response = self
            .client
            .get(Self::endpoint(neighbour, "chain"))
            .send()
            .await
            .map_err(|e| unreachable(neighbour, e))?;

        if response.status() != StatusCode::OK {
            return Err(PeerError::UnexpectedStatus {
                neighbour: neighbour.to_string(),
                status: response.status().as_u16(),
            });
        }

        let body: ChainResponse = response.json().await.map_err(|e| PeerError::MalformedResponse {
            neighbour: neighbour.to_string(),
            reason: e.to_string(),
        })?;

        Ok(body.chain)
    }

    async fn notify(&self, neighbour: &str, event: &PeerEvent) -> Result<(), PeerError> {
        let request = match event {
            PeerEvent::Transaction(transaction) => self
                .client
                .put(Self::endpoint(neighbour, "transactions"))
                .json(transaction),
            PeerEvent::BlockCreated => self.client.delete(Self::endpoint(neighbour, "transactions")),
            PeerEvent::ConsensusRequested => self.client.put(Self::endpoint(neighbour, "consensus")),
        };

        let response = request.send().await.map_err(|e| unreachable(neighbour, e))?;
        debug!("Notified {} of {:?}: {}", neighbour, event, response.status());

        if !response.status().is_success() {
            return Err(PeerError::UnexpectedStatus {
                neighbour: neighbour.to_string(),
                status: response.status().as_u16(),
            });
        }

        Ok(())
    }
}
