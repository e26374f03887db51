//! The multi-chain stake-table transport pipeline: operator key registration,
//! per-operator-set table calculation under a single global Merkle root, and
//! signed propagation of both to every destination chain's table updater.
//!
//! The pipeline order is fixed: registration must precede table calculation,
//! which must precede transport. [`TableTransport::run`] drives the per-chain
//! steps; the calculation itself is read-only and repeatable.

pub mod config;
pub mod error;
pub mod generator;
pub mod operator_info;
pub mod registrar;
pub mod stake_table;
pub mod transport;
pub mod updater;

pub use config::{ChainEndpoint, TransportConfig};
pub use error::TransportError;
pub use generator::{choose_generator_id, GeneratorCoordinator};
pub use operator_info::{
    LeafHasher, OperatorInfoMerkleBuilder, OperatorSetInfo, TableCalculatorLeafHasher,
};
pub use registrar::{
    register_operator_keys, KeyRegistrar, KeyRegistrarClient, RegistrationOutcome,
};
pub use stake_table::{
    CrossChainRegistryClient, Distribution, DistributionEntry, RegistryView, StakeTableCalculator,
    SupportedChain,
};
pub use transport::{ChainOutcome, ChainTarget, TableTransport, TransportReport};
pub use updater::{
    GeneratorInfo, GlobalRootCertificate, OperatorTableUpdaterClient, TableUpdater,
};
