use alloy_primitives::Address;
use stakewire_chain::ChainError;
use stakewire_primitives::{OperatorSet, PrimitivesError};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The caller's operator set is not part of the calculated distribution;
    /// transporting would silently do nothing, so this fails fast instead.
    #[error("operator set {operator_set_id} for avs {avs} not found in distribution")]
    OperatorSetNotInDistribution {
        avs: Address,
        operator_set_id: u32,
    },

    /// The updater contracts encode the reference block as uint32; a block
    /// past that range cannot be transported without binding the root to the
    /// wrong block.
    #[error("reference block {0} does not fit the updater's uint32 encoding")]
    ReferenceBlockOutOfRange(u64),

    #[error("no active generation reservations; nothing to transport")]
    NoActiveReservations,

    #[error("operator set {0} appears more than once in generation reservations")]
    DuplicateReservation(OperatorSet),

    #[error("cannot build operator info from an empty operator list")]
    NoOperators,

    #[error("failed to fetch operator table for {operator_set}: {source}")]
    TableFetch {
        operator_set: OperatorSet,
        #[source]
        source: ChainError,
    },

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Primitives(#[from] PrimitivesError),
}
