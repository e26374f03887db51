//! Transaction signing and submission.
//!
//! One capability trait, two implementations: [`LocalSigner`] holds the key and
//! does the whole estimate/sign/broadcast/wait cycle in-process; [`RemoteSigner`]
//! hands the prepared transaction to an external signing service through the
//! narrow [`SignerDelegate`] seam and shares the same broadcast path.
//!
//! Every submission blocks until the transaction is mined and checks the receipt
//! status. Cancellation is honored while waiting, but a transaction that was
//! already broadcast keeps mining; the returned [`ChainError::Cancelled`] carries
//! the hash so the caller can reconcile it later.

use alloy_consensus::{SignableTransaction, TxEip1559, TxEnvelope};
use alloy_eips::eip2718::Encodable2718;
use alloy_network::{TransactionBuilder, TxSigner};
use alloy_primitives::{Address, Bytes, TxKind, U256};
use alloy_provider::Provider;
use alloy_rpc_types::{TransactionReceipt, TransactionRequest};
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::ChainError;
use crate::provider::ChainClient;

/// Fallback priority fee when the chain does not answer priority-fee queries:
/// 15 gwei.
pub const FALLBACK_PRIORITY_FEE: u128 = 15_000_000_000;

#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Sender address the transactions will originate from.
    fn address(&self) -> Address;

    /// Signs and broadcasts a call to `to` with the given calldata, waits for it
    /// to mine, and fails if the receipt status is not success.
    async fn send_transaction(
        &self,
        client: &ChainClient,
        to: Address,
        input: Bytes,
        cancel: &CancellationToken,
    ) -> Result<TransactionReceipt, ChainError>;
}

/// Prepares an unsigned EIP-1559 transaction with estimated fees, gas, and the
/// sender's pending nonce.
async fn prepare_transaction(
    client: &ChainClient,
    from: Address,
    to: Address,
    input: &Bytes,
) -> Result<TxEip1559, ChainError> {
    let provider = client.provider();

    let nonce = provider
        .get_transaction_count(from)
        .pending()
        .await
        .map_err(|e| ChainError::rpc("eth_getTransactionCount", e))?;

    let (max_fee_per_gas, max_priority_fee_per_gas) =
        match provider.estimate_eip1559_fees(None).await {
            Ok(estimate) => (estimate.max_fee_per_gas, estimate.max_priority_fee_per_gas),
            Err(err) => {
                debug!(
                    target: "stakewire::chain::signer",
                    chain_id = client.chain_id(),
                    error = %err,
                    "eip1559 fee estimation unsupported, falling back to gas price + fixed tip"
                );
                let gas_price = provider
                    .get_gas_price()
                    .await
                    .map_err(|e| ChainError::rpc("eth_gasPrice", e))?;
                (gas_price + FALLBACK_PRIORITY_FEE, FALLBACK_PRIORITY_FEE)
            }
        };

    let mut request = TransactionRequest::default().to(to);
    request.set_from(from);
    request.set_input(input.clone());
    let gas_limit = provider
        .estimate_gas(&request)
        .await
        .map_err(|e| ChainError::rpc("eth_estimateGas", e))?;

    Ok(TxEip1559 {
        chain_id: client.chain_id(),
        nonce,
        gas_limit,
        max_fee_per_gas,
        max_priority_fee_per_gas,
        to: TxKind::Call(to),
        value: U256::ZERO,
        access_list: Default::default(),
        input: input.clone(),
    })
}

/// Broadcasts a raw signed transaction and waits for a successful receipt.
async fn broadcast_and_wait(
    client: &ChainClient,
    raw: Vec<u8>,
    cancel: &CancellationToken,
) -> Result<TransactionReceipt, ChainError> {
    if cancel.is_cancelled() {
        return Err(ChainError::Cancelled { pending_tx: None });
    }

    let pending = client
        .provider()
        .send_raw_transaction(&raw)
        .await
        .map_err(|e| ChainError::rpc("eth_sendRawTransaction", e))?;
    let tx_hash = *pending.tx_hash();
    info!(
        target: "stakewire::chain::signer",
        chain_id = client.chain_id(),
        %tx_hash,
        "transaction broadcast, waiting for receipt"
    );

    let receipt = tokio::select! {
        _ = cancel.cancelled() => {
            return Err(ChainError::Cancelled { pending_tx: Some(tx_hash) });
        }
        receipt = pending.get_receipt() => {
            receipt.map_err(|e| ChainError::rpc("eth_getTransactionReceipt", e))?
        }
    };

    if !receipt.status() {
        return Err(ChainError::TransactionReverted {
            tx_hash: receipt.transaction_hash,
            chain_id: client.chain_id(),
        });
    }
    Ok(receipt)
}

/// In-process signer backed by a raw private key.
#[derive(Debug, Clone)]
pub struct LocalSigner {
    signer: PrivateKeySigner,
}

impl LocalSigner {
    pub fn new(signer: PrivateKeySigner) -> Self {
        Self { signer }
    }

    pub fn from_hex(private_key: &str) -> Result<Self, ChainError> {
        let signer: PrivateKeySigner = private_key
            .parse()
            .map_err(|e| ChainError::Signer(format!("bad private key: {e}")))?;
        Ok(Self { signer })
    }
}

#[async_trait]
impl TransactionSigner for LocalSigner {
    fn address(&self) -> Address {
        self.signer.address()
    }

    async fn send_transaction(
        &self,
        client: &ChainClient,
        to: Address,
        input: Bytes,
        cancel: &CancellationToken,
    ) -> Result<TransactionReceipt, ChainError> {
        let mut tx = prepare_transaction(client, self.address(), to, &input).await?;
        let signature = self
            .signer
            .sign_transaction(&mut tx)
            .await
            .map_err(|e| ChainError::Signer(e.to_string()))?;
        let envelope = TxEnvelope::Eip1559(tx.into_signed(signature));
        broadcast_and_wait(client, envelope.encoded_2718(), cancel).await
    }
}

/// The narrow interface to a remote signing service: it receives a fully
/// prepared unsigned transaction and returns the EIP-2718 encoded signed bytes.
/// The HTTP client behind it lives outside this crate.
#[async_trait]
pub trait SignerDelegate: Send + Sync {
    fn address(&self) -> Address;

    async fn sign_transaction(&self, tx: TxEip1559) -> Result<Bytes, ChainError>;
}

/// Remote-signing delegate: preparation and broadcast are identical to the
/// local path, only the signature round-trips through the delegate.
pub struct RemoteSigner<D: SignerDelegate> {
    delegate: D,
}

impl<D: SignerDelegate> RemoteSigner<D> {
    pub fn new(delegate: D) -> Self {
        Self { delegate }
    }
}

#[async_trait]
impl<D: SignerDelegate> TransactionSigner for RemoteSigner<D> {
    fn address(&self) -> Address {
        self.delegate.address()
    }

    async fn send_transaction(
        &self,
        client: &ChainClient,
        to: Address,
        input: Bytes,
        cancel: &CancellationToken,
    ) -> Result<TransactionReceipt, ChainError> {
        let tx = prepare_transaction(client, self.address(), to, &input).await?;
        let raw = self.delegate.sign_transaction(tx).await?;
        broadcast_and_wait(client, raw.to_vec(), cancel).await
    }
}
