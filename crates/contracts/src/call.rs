//! Read-only contract calls: encode a [`SolCall`], `eth_call` it, decode the
//! returns. Revert payloads are classified against the known conflict errors
//! before falling back to the node's rendered message.

use alloy_eips::BlockId;
use alloy_network::TransactionBuilder;
use alloy_primitives::Address;
use alloy_provider::Provider;
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::{SolCall, SolError};
use alloy_transport::TransportError;
use stakewire_chain::{ChainClient, ChainError};

use crate::bindings::{
    GlobalTableRootStale, InvalidOperatorSet, KeyAlreadyRegistered, TableUpdateForPastTimestamp,
};

/// Calls `to` with the given call at the latest block.
pub async fn call_and_decode<C: SolCall>(
    call: C,
    to: Address,
    client: &ChainClient,
) -> Result<C::Return, ChainError> {
    call_inner(call, to, client, None).await
}

/// Calls `to` with the given call pinned to `block`, for reads that must be
/// reproducible across a whole run.
pub async fn call_and_decode_at<C: SolCall>(
    call: C,
    to: Address,
    client: &ChainClient,
    block: u64,
) -> Result<C::Return, ChainError> {
    call_inner(call, to, client, Some(block)).await
}

async fn call_inner<C: SolCall>(
    call: C,
    to: Address,
    client: &ChainClient,
    block: Option<u64>,
) -> Result<C::Return, ChainError> {
    let call_data: Vec<u8> = call.abi_encode();

    let mut req = TransactionRequest::default().to(to);
    req.set_input(call_data);

    let eth_call = client.provider().call(&req);
    let eth_call = match block {
        Some(number) => eth_call.block(BlockId::from(number)),
        None => eth_call,
    };

    let data = eth_call
        .await
        .map_err(|err| classify_call_error(C::SIGNATURE, err))?;

    C::abi_decode_returns(data.as_ref(), true).map_err(|source| ChainError::Decode {
        operation: C::SIGNATURE,
        source,
    })
}

/// Maps a transport error to the chain taxonomy. JSON-RPC error responses are
/// reverts (non-retryable); everything else is a transient transport failure.
pub fn classify_call_error(operation: &'static str, err: TransportError) -> ChainError {
    match err.as_error_resp() {
        Some(payload) => {
            let message = payload
                .as_revert_data()
                .and_then(|data| decode_known_error(&data))
                .unwrap_or_else(|| payload.message.to_string());
            ChainError::revert(operation, message)
        }
        None => ChainError::rpc(operation, err),
    }
}

/// Typed-first detection of the conflict errors the pipeline absorbs; the
/// selector is authoritative where the node returns structured revert data.
fn decode_known_error(data: &[u8]) -> Option<String> {
    if TableUpdateForPastTimestamp::abi_decode(data, true).is_ok() {
        return Some("TableUpdateForPastTimestamp".into());
    }
    if GlobalTableRootStale::abi_decode(data, true).is_ok() {
        return Some("GlobalTableRootStale".into());
    }
    if KeyAlreadyRegistered::abi_decode(data, true).is_ok() {
        return Some("KeyAlreadyRegistered".into());
    }
    if InvalidOperatorSet::abi_decode(data, true).is_ok() {
        return Some("InvalidOperatorSet".into());
    }
    None
}
