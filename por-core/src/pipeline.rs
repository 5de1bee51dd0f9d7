//! Batch pipeline (C5): three tiers, fan-in `FAN_IN`, bottom tier dispatched across a rayon
//! pool (`spec.md` §5's "dispatch bottom proofs to a worker pool and collect results in index
//! order"). Mid and top each get their own tier barrier; nothing in a later tier starts until
//! every proof feeding it has returned.

use rayon::prelude::*;

use por_circuit::account::{self, Account, Balance};
use por_circuit::{range_bits_for_tier, FAN_IN};

use crate::error::{PorError, Tier};
use crate::prover::generate_proof;
use crate::registry::SetupRegistry;
use crate::types::CompletedProof;

/// One bottom-tier batch's proving input, read from `out/secret/test_data_<i>.json`.
pub struct BatchInput {
    pub accounts: Vec<Account>,
    pub asset_sum: Balance,
}

pub struct PipelineOutput {
    pub bottom: Vec<CompletedProof>,
    pub mid: Vec<CompletedProof>,
    pub top: CompletedProof,
}

/// `batchProofs(total, fan_in)` from `spec.md` §8: the index ranges a tier's children are
/// grouped into. `fan_in == 0` aborts (mirrors the Go source's `batchProofs(proofs, 0)`
/// panic); `total == 0` yields zero groups.
pub fn partition_ranges(total: usize, fan_in: usize) -> Result<Vec<(usize, usize)>, PorError> {
    if fan_in == 0 {
        return Err(PorError::ZeroFanIn);
    }
    if total == 0 {
        return Ok(Vec::new());
    }
    let num_groups = (total + fan_in - 1) / fan_in;
    let mut ranges = Vec::with_capacity(num_groups);
    let mut start = 0;
    while start < total {
        let end = (start + fan_in).min(total);
        ranges.push((start, end));
        start = end;
    }
    Ok(ranges)
}

/// Builds the synthetic account batch a parent tier proves over, checking each child's
/// commitment consistency first (`spec.md` §4.5: "verify that the child's
/// `merkleRootWithAssetSumHash` equals the synthetic account's leaf hash"). `child_tier` is
/// the tier the children themselves belong to, carried on the resulting
/// [`PorError::CommitmentMismatch`] so the diagnostic names which proof is inconsistent.
fn synthetic_batch(
    children: &[CompletedProof],
    child_tier: Tier,
) -> Result<(Vec<Account>, Balance), PorError> {
    let mut accounts = Vec::with_capacity(children.len());
    for (i, child) in children.iter().enumerate() {
        let asset_sum = child.asset_sum.ok_or_else(|| PorError::Configuration {
            message: "child proof is missing the asset sum needed to build the parent batch"
                .to_string(),
        })?;
        let synthetic = Account::synthetic(child.merkle_root, asset_sum);
        let recomputed = account::hash_account(&synthetic);
        if recomputed != child.merkle_root_with_asset_sum_hash {
            return Err(PorError::CommitmentMismatch {
                tier: child_tier,
                batch_index: i,
                expected: crate::types::JsonCompletedProof::encode_digest(
                    child.merkle_root_with_asset_sum_hash,
                ),
                actual: crate::types::JsonCompletedProof::encode_digest(recomputed),
            });
        }
        accounts.push(synthetic);
    }
    let asset_sum = account::sum_balances(&accounts);
    Ok((accounts, asset_sum))
}

fn fresh_rng() -> rand::rngs::ThreadRng {
    rand::thread_rng()
}

/// Runs the full three-tier pipeline over a set of bottom-tier batches, matching
/// `examples/original_source/core/prover.go`'s `Prove`, generalized to an arbitrary number of
/// mid-tier groups (the Go source only ever had one).
pub fn run(batches: Vec<BatchInput>, registry: &SetupRegistry) -> Result<PipelineOutput, PorError> {
    if batches.is_empty() {
        return Err(PorError::Configuration { message: "no batches to prove".to_string() });
    }

    let bottom: Vec<CompletedProof> = batches
        .into_par_iter()
        .enumerate()
        .map(|(i, batch)| {
            let mut rng = fresh_rng();
            generate_proof(
                &batch.accounts,
                batch.asset_sum,
                Tier::Bottom,
                i,
                range_bits_for_tier(0),
                registry,
                &mut rng,
            )
        })
        .collect::<Result<Vec<_>, _>>()?;
    log::info!("bottom tier: {} proofs generated", bottom.len());

    let mid_ranges = partition_ranges(bottom.len(), FAN_IN)?;
    let mid: Vec<CompletedProof> = mid_ranges
        .into_par_iter()
        .enumerate()
        .map(|(j, (start, end))| {
            let (accounts, asset_sum) = synthetic_batch(&bottom[start..end], Tier::Bottom)?;
            let mut rng = fresh_rng();
            generate_proof(
                &accounts,
                asset_sum,
                Tier::Mid,
                j,
                range_bits_for_tier(1),
                registry,
                &mut rng,
            )
        })
        .collect::<Result<Vec<_>, _>>()?;
    log::info!("mid tier: {} proofs generated", mid.len());

    let top_ranges = partition_ranges(mid.len(), FAN_IN)?;
    if top_ranges.len() != 1 {
        return Err(PorError::Configuration {
            message: format!(
                "{} mid proofs need {} top-level groups, but this pipeline is fixed at three tiers",
                mid.len(),
                top_ranges.len()
            ),
        });
    }
    let (accounts, asset_sum) = synthetic_batch(&mid, Tier::Mid)?;
    let mut rng = fresh_rng();
    let top = generate_proof(&accounts, asset_sum, Tier::Top, 0, range_bits_for_tier(2), registry, &mut rng)?;
    log::info!("top tier: proof generated, asset sum published");

    Ok(PipelineOutput { bottom, mid, top })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_partitioning_matches_spec_table() {
        assert_eq!(partition_ranges(0, 16).unwrap().len(), 0);
        assert_eq!(partition_ranges(16, 16).unwrap().len(), 1);
        assert_eq!(partition_ranges(17, 16).unwrap().len(), 2);
        assert_eq!(partition_ranges(32, 16).unwrap().len(), 2);
        assert_eq!(partition_ranges(16000, 16).unwrap().len(), 1000);
    }

    #[test]
    fn zero_fan_in_aborts() {
        assert!(matches!(partition_ranges(17, 0), Err(PorError::ZeroFanIn)));
    }

    #[test]
    fn ranges_cover_every_index_exactly_once() {
        let ranges = partition_ranges(17, 16).unwrap();
        assert_eq!(ranges, vec![(0, 16), (16, 17)]);
    }

    #[test]
    fn small_pipeline_links_all_three_tiers() {
        let registry = SetupRegistry::new();
        let batches: Vec<BatchInput> = (0..2)
            .map(|b| {
                let accounts: Vec<Account> = (0..4)
                    .map(|i| {
                        let btc = (46 * i + 39) as u64;
                        let eth = (3 * i + 1001) as u64;
                        Account::new(format!("batch{b}-user{i}").as_bytes(), Balance::from_u64(btc, eth))
                    })
                    .collect();
                let asset_sum = account::sum_balances(&accounts);
                BatchInput { accounts, asset_sum }
            })
            .collect();

        let output = run(batches, &registry).unwrap();
        assert_eq!(output.bottom.len(), 2);
        assert_eq!(output.mid.len(), 1);
        assert!(output.top.asset_sum.is_some());
    }
}
