use alloy_provider::{Provider, RootProvider};
use alloy_transport_http::{Client, Http};
use tracing::debug;
use url::Url;

use crate::error::ChainError;

pub type HttpProvider = RootProvider<Http<Client>>;

/// Read/write access to one chain: a provider plus the chain id it was
/// configured for. The configured id is checked against the node once at
/// connection time so a mis-pointed RPC endpoint fails loudly, not with
/// signatures for the wrong chain.
#[derive(Debug, Clone)]
pub struct ChainClient {
    chain_id: u64,
    provider: HttpProvider,
}

impl ChainClient {
    pub async fn connect(rpc_url: Url, chain_id: u64) -> Result<Self, ChainError> {
        let provider = RootProvider::new_http(rpc_url);
        let actual = provider
            .get_chain_id()
            .await
            .map_err(|e| ChainError::rpc("eth_chainId", e))?;
        if actual != chain_id {
            return Err(ChainError::ChainIdMismatch {
                expected: chain_id,
                actual,
            });
        }
        debug!(target: "stakewire::chain", chain_id, "connected");
        Ok(Self { chain_id, provider })
    }

    /// Wraps an already-constructed provider without the chain-id round trip.
    pub fn from_provider(provider: HttpProvider, chain_id: u64) -> Self {
        Self { chain_id, provider }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn provider(&self) -> &HttpProvider {
        &self.provider
    }

    pub async fn latest_block_number(&self) -> Result<u64, ChainError> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| ChainError::rpc("eth_blockNumber", e))
    }
}
