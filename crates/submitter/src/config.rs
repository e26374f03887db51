use alloy_primitives::Address;
use serde::Deserialize;
use stakewire_primitives::{CurveType, OperatorSet};

/// Per-run parameters for the submission side. Deserialized shape only; how it
/// is stored or supplied lives outside this crate.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitterConfig {
    pub avs: Address,
    pub operator_set_id: u32,
    pub curve_type: CurveType,

    pub chain_id: u64,
    pub rpc_url: String,
    pub task_mailbox: Address,

    /// Per-weight-position stake thresholds in parts per ten thousand.
    #[serde(default)]
    pub stake_proportion_thresholds: Vec<u16>,

    /// Local transaction-signing key; when absent a remote signer reference
    /// must be supplied instead.
    #[serde(default)]
    pub submitter_private_key: Option<String>,
    #[serde(default)]
    pub remote_signer_url: Option<String>,
}

impl SubmitterConfig {
    pub fn operator_set(&self) -> OperatorSet {
        OperatorSet::new(self.avs, self.operator_set_id)
    }
}
