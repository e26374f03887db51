use alloy_primitives::Address;
use serde::Deserialize;
use stakewire_primitives::{CurveType, OperatorSet};

/// One RPC endpoint, keyed by the chain id it must serve. The id is verified
/// against the node at connection time.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainEndpoint {
    pub chain_id: u64,
    pub rpc_url: String,
}

/// Per-run parameters for a transport invocation. Persistence of these lives
/// outside this crate; this is only the deserialized shape.
#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    /// AVS whose operator set the caller owns and transports.
    pub avs: Address,
    pub operator_set_id: u32,
    pub curve_type: CurveType,

    /// Cross-chain registry on the source chain.
    pub cross_chain_registry: Address,
    pub source_chain: ChainEndpoint,
    pub destination_chains: Vec<ChainEndpoint>,

    /// Chains skipped entirely during transport.
    #[serde(default)]
    pub ignore_chain_ids: Vec<u64>,

    /// Hex scalar for the BLS key that signs transported roots.
    pub transport_bls_private_key: String,

    /// Local transaction-signing key; when absent a remote signer reference
    /// must be supplied instead.
    #[serde(default)]
    pub transporter_private_key: Option<String>,
    #[serde(default)]
    pub remote_signer_url: Option<String>,
}

impl TransportConfig {
    pub fn operator_set(&self) -> OperatorSet {
        OperatorSet::new(self.avs, self.operator_set_id)
    }

    pub fn is_ignored(&self, chain_id: u64) -> bool {
        self.ignore_chain_ids.contains(&chain_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_deserializes_with_defaults() {
        let config: TransportConfig = serde_json::from_str(
            r#"{
                "avs": "0x00000000000000000000000000000000000000aa",
                "operator_set_id": 1,
                "curve_type": "bn254",
                "cross_chain_registry": "0x00000000000000000000000000000000000000bb",
                "source_chain": { "chain_id": 1, "rpc_url": "http://localhost:8545" },
                "destination_chains": [
                    { "chain_id": 8453, "rpc_url": "http://localhost:8546" }
                ],
                "transport_bls_private_key": "0x01"
            }"#,
        )
        .unwrap();

        assert_eq!(config.curve_type, CurveType::Bn254);
        assert_eq!(config.operator_set().id, 1);
        assert!(config.ignore_chain_ids.is_empty());
        assert!(!config.is_ignored(8453));
        assert!(config.transporter_private_key.is_none());
    }
}
