//! The table-updater contract seam: everything the transport pipeline does to a
//! destination chain goes through [`TableUpdater`], so the pipeline can be
//! exercised against mocks and the provider-backed client stays thin.

use std::sync::Arc;

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::SolCall;
use ark_bn254::{G1Affine, G2Affine};
use async_trait::async_trait;
use stakewire_chain::{ChainClient, ChainError, TransactionSigner};
use stakewire_contracts::bindings::{self, IOperatorTableUpdater};
use stakewire_contracts::call_and_decode;
use stakewire_contracts::convert::{g1_point, g2_point};
use stakewire_primitives::OperatorSet;
use tokio_util::sync::CancellationToken;

/// Aggregate operator-set info installed for the generator: a single-operator
/// set backed by the transport key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorInfo {
    pub operator_info_tree_root: B256,
    pub num_operators: U256,
    pub aggregate_pubkey: G1Affine,
    pub total_weights: Vec<U256>,
}

/// BLS certificate over a transported global root, signed by the generator's
/// transport key. No non-signers by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalRootCertificate {
    pub reference_timestamp: u32,
    pub message_hash: B256,
    pub signature: G1Affine,
    pub apk: G2Affine,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TableUpdater: Send + Sync {
    fn chain_id(&self) -> u64;

    /// Reads the currently configured generator operator set.
    async fn generator(&self) -> Result<OperatorSet, ChainError>;

    async fn update_generator(
        &self,
        generator: OperatorSet,
        info: GeneratorInfo,
        cancel: CancellationToken,
    ) -> Result<B256, ChainError>;

    async fn confirm_global_root(
        &self,
        certificate: GlobalRootCertificate,
        global_root: B256,
        reference_timestamp: u32,
        reference_block_number: u32,
        cancel: CancellationToken,
    ) -> Result<B256, ChainError>;

    async fn update_operator_table(
        &self,
        reference_timestamp: u32,
        global_root: B256,
        operator_set_index: u32,
        proof: Vec<B256>,
        table: Bytes,
        cancel: CancellationToken,
    ) -> Result<B256, ChainError>;

    async fn latest_reference_timestamp(&self) -> Result<u32, ChainError>;

    async fn reference_block_number(&self, reference_timestamp: u32) -> Result<u32, ChainError>;
}

/// Provider-backed [`TableUpdater`] for one destination chain.
pub struct OperatorTableUpdaterClient {
    client: ChainClient,
    address: Address,
    signer: Arc<dyn TransactionSigner>,
}

impl OperatorTableUpdaterClient {
    pub fn new(client: ChainClient, address: Address, signer: Arc<dyn TransactionSigner>) -> Self {
        Self {
            client,
            address,
            signer,
        }
    }

    async fn send(
        &self,
        calldata: Vec<u8>,
        cancel: &CancellationToken,
    ) -> Result<B256, ChainError> {
        let receipt = self
            .signer
            .send_transaction(&self.client, self.address, calldata.into(), cancel)
            .await?;
        Ok(receipt.transaction_hash)
    }
}

#[async_trait]
impl TableUpdater for OperatorTableUpdaterClient {
    fn chain_id(&self) -> u64 {
        self.client.chain_id()
    }

    async fn generator(&self) -> Result<OperatorSet, ChainError> {
        let ret = call_and_decode(
            IOperatorTableUpdater::getGeneratorCall {},
            self.address,
            &self.client,
        )
        .await?;
        Ok(ret.generator.into())
    }

    async fn update_generator(
        &self,
        generator: OperatorSet,
        info: GeneratorInfo,
        cancel: CancellationToken,
    ) -> Result<B256, ChainError> {
        let call = IOperatorTableUpdater::updateGeneratorCall {
            generator: generator.into(),
            generatorInfo: bindings::BN254OperatorSetInfo {
                operatorInfoTreeRoot: info.operator_info_tree_root,
                numOperators: info.num_operators,
                aggregatePubkey: g1_point(&info.aggregate_pubkey),
                totalWeights: info.total_weights,
            },
        };
        self.send(call.abi_encode(), &cancel).await
    }

    async fn confirm_global_root(
        &self,
        certificate: GlobalRootCertificate,
        global_root: B256,
        reference_timestamp: u32,
        reference_block_number: u32,
        cancel: CancellationToken,
    ) -> Result<B256, ChainError> {
        let call = IOperatorTableUpdater::confirmGlobalTableRootCall {
            globalRootCert: bindings::BN254Certificate {
                referenceTimestamp: certificate.reference_timestamp,
                messageHash: certificate.message_hash,
                signature: g1_point(&certificate.signature),
                apk: g2_point(&certificate.apk),
                nonSignerWitnesses: vec![],
            },
            globalTableRoot: global_root,
            referenceTimestamp: reference_timestamp,
            referenceBlockNumber: reference_block_number,
        };
        self.send(call.abi_encode(), &cancel).await
    }

    async fn update_operator_table(
        &self,
        reference_timestamp: u32,
        global_root: B256,
        operator_set_index: u32,
        proof: Vec<B256>,
        table: Bytes,
        cancel: CancellationToken,
    ) -> Result<B256, ChainError> {
        let call = IOperatorTableUpdater::updateOperatorTableCall {
            referenceTimestamp: reference_timestamp,
            globalTableRoot: global_root,
            operatorSetIndex: operator_set_index,
            proof,
            operatorTableBytes: table,
        };
        self.send(call.abi_encode(), &cancel).await
    }

    async fn latest_reference_timestamp(&self) -> Result<u32, ChainError> {
        let ret = call_and_decode(
            IOperatorTableUpdater::getLatestReferenceTimestampCall {},
            self.address,
            &self.client,
        )
        .await?;
        Ok(ret._0)
    }

    async fn reference_block_number(&self, reference_timestamp: u32) -> Result<u32, ChainError> {
        let ret = call_and_decode(
            IOperatorTableUpdater::getReferenceBlockNumberByTimestampCall {
                referenceTimestamp: reference_timestamp,
            },
            self.address,
            &self.client,
        )
        .await?;
        Ok(ret._0)
    }
}
