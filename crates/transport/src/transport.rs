//! Per-chain transport of a calculated distribution.
//!
//! Chains are driven in parallel; within a chain the steps are strictly
//! ordered: configure and register keys, rotate the generator, confirm the
//! global root, then prove and push the caller's table. A chain that fails
//! partway reports its errors without blocking the others.
//!
//! Two revert classes are absorbed as success because the chain is already in
//! the target state: stale-root and already-applied table updates, and
//! already-registered keys.

use std::sync::Arc;

use futures_util::future::join_all;
use stakewire_primitives::{CurveType, OperatorKeyInfo, OperatorSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::generator::GeneratorCoordinator;
use crate::registrar::{register_operator_keys, KeyRegistrar, RegistrationOutcome};
use crate::stake_table::Distribution;
use crate::updater::TableUpdater;

/// One destination chain's contract handles.
#[derive(Clone)]
pub struct ChainTarget {
    pub chain_id: u64,
    pub updater: Arc<dyn TableUpdater>,
    pub registrar: Arc<dyn KeyRegistrar>,
}

/// What happened on one chain during a transport run.
#[derive(Debug, Default)]
pub struct ChainOutcome {
    pub chain_id: u64,
    pub skipped: bool,
    pub registration: RegistrationOutcome,
    pub generator_rotated: bool,
    pub root_confirmed: bool,
    pub tables_updated: Vec<OperatorSet>,
    pub errors: Vec<String>,
}

impl ChainOutcome {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.registration.is_clean()
    }
}

#[derive(Debug, Default)]
pub struct TransportReport {
    pub outcomes: Vec<ChainOutcome>,
}

impl TransportReport {
    pub fn is_clean(&self) -> bool {
        self.outcomes.iter().all(ChainOutcome::is_clean)
    }
}

/// Drives one transport run for the operator set the caller owns.
pub struct TableTransport {
    operator_set: OperatorSet,
    curve_type: CurveType,
    generator: GeneratorCoordinator,
    ignore_chain_ids: Vec<u64>,
}

impl TableTransport {
    pub fn new(
        operator_set: OperatorSet,
        curve_type: CurveType,
        generator: GeneratorCoordinator,
        ignore_chain_ids: Vec<u64>,
    ) -> Self {
        Self {
            operator_set,
            curve_type,
            generator,
            ignore_chain_ids,
        }
    }

    /// Transports the distribution to every target chain.
    ///
    /// Fails fast, before any write, if the caller's operator set is not part
    /// of the distribution: transporting a snapshot that does not contain the
    /// caller's own table would be a silent no-op.
    pub async fn run(
        &self,
        targets: &[ChainTarget],
        distribution: &Distribution,
        reference_timestamp: u32,
        operators: &[OperatorKeyInfo],
        cancel: CancellationToken,
    ) -> Result<TransportReport, TransportError> {
        if !distribution.contains(self.operator_set) {
            return Err(TransportError::OperatorSetNotInDistribution {
                avs: self.operator_set.avs,
                operator_set_id: self.operator_set.id,
            });
        }
        let reference_block = u32::try_from(distribution.reference_block)
            .map_err(|_| TransportError::ReferenceBlockOutOfRange(distribution.reference_block))?;

        let runs = targets.iter().map(|target| {
            self.run_chain(
                target,
                distribution,
                reference_timestamp,
                reference_block,
                operators,
                cancel.clone(),
            )
        });
        Ok(TransportReport {
            outcomes: join_all(runs).await,
        })
    }

    async fn run_chain(
        &self,
        target: &ChainTarget,
        distribution: &Distribution,
        reference_timestamp: u32,
        reference_block: u32,
        operators: &[OperatorKeyInfo],
        cancel: CancellationToken,
    ) -> ChainOutcome {
        let mut outcome = ChainOutcome {
            chain_id: target.chain_id,
            ..Default::default()
        };

        if self.ignore_chain_ids.contains(&target.chain_id) {
            debug!(
                target: "stakewire::transport",
                chain_id = target.chain_id,
                "chain ignored by configuration"
            );
            outcome.skipped = true;
            return outcome;
        }

        info!(
            target: "stakewire::transport",
            chain_id = target.chain_id,
            global_root = %distribution.global_root,
            reference_timestamp,
            "transporting to chain"
        );

        // Configuring a set that is already configured reverts; nothing later
        // depends on this write succeeding on a re-run.
        if let Err(err) = target
            .registrar
            .configure_operator_set(self.operator_set, self.curve_type, cancel.clone())
            .await
        {
            debug!(
                target: "stakewire::transport",
                chain_id = target.chain_id,
                error = %err,
                "configureOperatorSet not applied"
            );
        }

        outcome.registration = register_operator_keys(
            target.registrar.as_ref(),
            self.operator_set,
            self.curve_type,
            operators,
            cancel.clone(),
        )
        .await;

        // Generator rotation is maintenance: a chain whose generator is
        // already serviceable can still confirm roots.
        match self
            .generator
            .reconfigure(target.updater.as_ref(), self.operator_set.id, cancel.clone())
            .await
        {
            Ok(_) => outcome.generator_rotated = true,
            Err(err) => {
                warn!(
                    target: "stakewire::transport",
                    chain_id = target.chain_id,
                    error = %err,
                    "generator rotation failed; continuing"
                );
                outcome.errors.push(format!("generator rotation: {err}"));
            }
        }

        let certificate = self.generator.sign_global_root(
            distribution.global_root,
            reference_timestamp,
            reference_block,
        );
        match target
            .updater
            .confirm_global_root(
                certificate,
                distribution.global_root,
                reference_timestamp,
                reference_block,
                cancel.clone(),
            )
            .await
        {
            Ok(tx) => {
                info!(
                    target: "stakewire::transport",
                    chain_id = target.chain_id,
                    tx = %tx,
                    "global root confirmed"
                );
                outcome.root_confirmed = true;
            }
            Err(err) if err.is_already_applied() => {
                debug!(
                    target: "stakewire::transport",
                    chain_id = target.chain_id,
                    "global root already confirmed"
                );
                outcome.root_confirmed = true;
            }
            Err(err) => {
                warn!(
                    target: "stakewire::transport",
                    chain_id = target.chain_id,
                    error = %err,
                    "global root confirmation failed"
                );
                outcome.errors.push(format!("confirm global root: {err}"));
                // without a confirmed root no table update can verify
                return outcome;
            }
        }

        for entry in &distribution.entries {
            if entry.operator_set != self.operator_set {
                // other sets are their own transporters' responsibility
                debug!(
                    target: "stakewire::transport",
                    chain_id = target.chain_id,
                    operator_set = %entry.operator_set,
                    "skipping table owned by another transporter"
                );
                continue;
            }

            let proof = match distribution.proof(entry) {
                Ok(proof) => proof,
                Err(err) => {
                    outcome
                        .errors
                        .push(format!("proof for {}: {err}", entry.operator_set));
                    continue;
                }
            };

            match target
                .updater
                .update_operator_table(
                    reference_timestamp,
                    distribution.global_root,
                    entry.index,
                    proof.siblings,
                    entry.table.clone(),
                    cancel.clone(),
                )
                .await
            {
                Ok(tx) => {
                    info!(
                        target: "stakewire::transport",
                        chain_id = target.chain_id,
                        operator_set = %entry.operator_set,
                        tx = %tx,
                        "operator table updated"
                    );
                    outcome.tables_updated.push(entry.operator_set);
                }
                Err(err) if err.is_already_applied() => {
                    debug!(
                        target: "stakewire::transport",
                        chain_id = target.chain_id,
                        operator_set = %entry.operator_set,
                        "operator table already up to date"
                    );
                    outcome.tables_updated.push(entry.operator_set);
                }
                Err(err) => {
                    warn!(
                        target: "stakewire::transport",
                        chain_id = target.chain_id,
                        operator_set = %entry.operator_set,
                        error = %err,
                        "operator table update failed"
                    );
                    outcome
                        .errors
                        .push(format!("update table {}: {err}", entry.operator_set));
                }
            }
        }

        outcome
    }
}
