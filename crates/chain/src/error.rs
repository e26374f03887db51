//! Chain-call error taxonomy.
//!
//! Classification drives retry behavior: transient RPC failures are retryable,
//! reverts and signer failures are not, and two conflict classes ("stale
//! timestamp", "already registered") are absorbed as success by their callers.
//! Conflicts are detected from typed contract errors where the revert data
//! decodes, with substring matching on the revert message as a compatibility
//! shim for nodes that only return a rendered string.

use alloy_primitives::B256;

/// Revert markers for table updates that were already applied. Matched against
/// decoded custom-error names and raw node messages alike.
pub const STALE_TIMESTAMP_MARKERS: &[&str] = &[
    "stale timestamp",
    "GlobalTableRootStale",
    "TableUpdateForPastTimestamp",
];

/// Revert markers for key registrations that already exist.
pub const ALREADY_REGISTERED_MARKERS: &[&str] = &["already registered", "KeyAlreadyRegistered"];

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// Transport-level failure (timeout, connection, nonce race surfaced as an
    /// RPC error). Retryable.
    #[error("rpc error during {operation}: {message}")]
    Rpc {
        operation: &'static str,
        message: String,
    },

    /// An `eth_call` or transaction simulation reverted.
    #[error("{operation} reverted: {message}")]
    Revert {
        operation: &'static str,
        message: String,
    },

    /// A broadcast transaction mined with a failure status.
    #[error("transaction {tx_hash} reverted on chain {chain_id}")]
    TransactionReverted { tx_hash: B256, chain_id: u64 },

    #[error("failed to decode {operation} return data: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: alloy_sol_types::Error,
    },

    #[error("signer failure: {0}")]
    Signer(String),

    #[error("chain id mismatch: configured {expected}, rpc reports {actual}")]
    ChainIdMismatch { expected: u64, actual: u64 },

    /// Cancelled while waiting. If a transaction was already broadcast its hash
    /// is carried along: cancellation does not un-send it.
    #[error("cancelled{}", pending_tx.map(|h| format!(" while awaiting receipt of {h}")).unwrap_or_default())]
    Cancelled { pending_tx: Option<B256> },
}

impl ChainError {
    pub fn rpc(operation: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Rpc {
            operation,
            message: err.to_string(),
        }
    }

    pub fn revert(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Revert {
            operation,
            message: message.into(),
        }
    }

    /// Whether retrying could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Rpc { .. })
    }

    /// Update rejected because an equal-or-newer root was already applied.
    pub fn is_already_applied(&self) -> bool {
        self.matches_markers(STALE_TIMESTAMP_MARKERS)
    }

    /// Registration rejected because the key already exists.
    pub fn is_already_registered(&self) -> bool {
        self.matches_markers(ALREADY_REGISTERED_MARKERS)
    }

    fn matches_markers(&self, markers: &[&str]) -> bool {
        let Self::Revert { message, .. } = self else {
            return false;
        };
        let lowered = message.to_lowercase();
        markers.iter().any(|m| lowered.contains(&m.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_rpc_errors_are_transient() {
        assert!(ChainError::rpc("eth_call", "connection reset").is_transient());
        assert!(!ChainError::revert("updateOperatorTable", "boom").is_transient());
        assert!(!ChainError::TransactionReverted {
            tx_hash: B256::ZERO,
            chain_id: 1,
        }
        .is_transient());
    }

    #[test]
    fn stale_timestamp_is_detected_from_typed_name_and_raw_message() {
        let typed = ChainError::revert("updateOperatorTable", "TableUpdateForPastTimestamp");
        assert!(typed.is_already_applied());

        let raw = ChainError::revert(
            "updateOperatorTable",
            "execution reverted: Stale Timestamp for table update",
        );
        assert!(raw.is_already_applied());

        let other = ChainError::revert("updateOperatorTable", "InvalidProof");
        assert!(!other.is_already_applied());
    }

    #[test]
    fn already_registered_is_detected() {
        let err = ChainError::revert("registerKey", "KeyAlreadyRegistered");
        assert!(err.is_already_registered());
        assert!(!err.is_already_applied());

        // only reverts carry conflict semantics
        assert!(!ChainError::rpc("registerKey", "KeyAlreadyRegistered").is_already_registered());
    }
}
