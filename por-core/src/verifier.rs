//! Verifier (C6): full auditor verification and O(log N) user-path verification.
//!
//! Mirrors `examples/original_source/core/verifier.go`, generalized to an arbitrary number
//! of mid-tier groups instead of the Go source's hardcoded single mid proof.

use ark_bn254::Bn254;
use ark_groth16::Groth16;
use ark_snark::SNARK;

use por_circuit::account::{self, Account};
use por_circuit::{Fr, FAN_IN};

use crate::error::{PorError, Tier};
use crate::pipeline::partition_ranges;
use crate::types::CompletedProof;

/// Verifies one tier's proof in isolation: the Groth16 proof against its own public inputs,
/// and that its disclosed `accountLeaves` actually hash to its `merkleRoot`
/// (`spec.md` §4.6, step 1).
pub fn verify_proof_standalone(
    proof: &CompletedProof,
    tier: Tier,
    batch_index: usize,
) -> Result<(), PorError> {
    let public_inputs = [proof.merkle_root, proof.merkle_root_with_asset_sum_hash];
    let ok = Groth16::<Bn254>::verify(&proof.vk, &public_inputs, &proof.proof)
        .map_err(|_| PorError::VerificationFailed { tier, batch_index })?;
    if !ok {
        return Err(PorError::VerificationFailed { tier, batch_index });
    }

    let recomputed_root = account::merkle_root_from_leaves(&proof.account_leaves);
    if recomputed_root != proof.merkle_root {
        return Err(PorError::MerkleRootMismatch {
            tier,
            batch_index,
            expected: crate::types::JsonCompletedProof::encode_digest(proof.merkle_root),
            actual: crate::types::JsonCompletedProof::encode_digest(recomputed_root),
        });
    }
    Ok(())
}

fn verify_tier_linkage(
    children: &[CompletedProof],
    parent: &CompletedProof,
    link_error: PorError,
) -> Result<(), PorError> {
    let child_roots: Vec<Fr> = children.iter().map(|c| c.merkle_root_with_asset_sum_hash).collect();
    let expected_parent_root = account::merkle_root_from_leaves(&child_roots);
    if expected_parent_root != parent.merkle_root {
        return Err(link_error);
    }
    Ok(())
}

/// Full auditor verification over every tier (`spec.md` §4.6).
pub fn verify_full(
    bottom: &[CompletedProof],
    mid: &[CompletedProof],
    top: &CompletedProof,
) -> Result<(), PorError> {
    for (i, proof) in bottom.iter().enumerate() {
        verify_proof_standalone(proof, Tier::Bottom, i)?;
    }
    for (j, proof) in mid.iter().enumerate() {
        verify_proof_standalone(proof, Tier::Mid, j)?;
    }
    verify_proof_standalone(top, Tier::Top, 0)?;

    let mid_groups = partition_ranges(bottom.len(), FAN_IN)?;
    if mid_groups.len() != mid.len() {
        return Err(PorError::BottomNotLinkedToMid);
    }
    for (j, (start, end)) in mid_groups.into_iter().enumerate() {
        verify_tier_linkage(&bottom[start..end], &mid[j], PorError::BottomNotLinkedToMid)?;
    }

    verify_tier_linkage(mid, top, PorError::MidNotLinkedToTop)?;

    let asset_sum = top.asset_sum.ok_or(PorError::TopAssetSumMismatch)?;
    let synthetic = Account::synthetic(top.merkle_root, asset_sum);
    if account::hash_account(&synthetic) != top.merkle_root_with_asset_sum_hash {
        return Err(PorError::TopAssetSumMismatch);
    }
    Ok(())
}

/// Checks that `leaf` appears among `haystack`'s leaves, mirroring
/// `verifyInclusionInProof`'s linear scan (`spec.md` §4.6: "acceptable since the user only
/// downloads three proofs").
fn contains_leaf(haystack: &[Fr], leaf: Fr) -> bool {
    haystack.iter().any(|&l| l == leaf)
}

/// Scans every bottom proof's leaves for `account_hash`, matching
/// `verifyInclusionInProof` (`examples/original_source/core/verifier.go`). Used by the
/// auditor's `verify` command after the tier-linkage checks all pass.
pub fn verify_inclusion_any(account_hash: Fr, bottom: &[CompletedProof]) -> Result<(), PorError> {
    if bottom.iter().any(|p| contains_leaf(&p.account_leaves, account_hash)) {
        Ok(())
    } else {
        Err(PorError::AccountNotIncluded { tier: Tier::Bottom })
    }
}

/// O(log N) user-path verification (`spec.md` §4.6, "User-path verification"): the account's
/// hash must chain up through the bottom, mid, and top proofs it was given.
pub fn verify_user_path(
    account: &Account,
    bottom: &CompletedProof,
    mid: &CompletedProof,
    top: &CompletedProof,
) -> Result<(), PorError> {
    verify_proof_standalone(bottom, Tier::Bottom, 0)?;
    verify_proof_standalone(mid, Tier::Mid, 0)?;
    verify_proof_standalone(top, Tier::Top, 0)?;

    let account_hash = account::hash_account(account);
    if !contains_leaf(&bottom.account_leaves, account_hash) {
        return Err(PorError::AccountNotIncluded { tier: Tier::Bottom });
    }
    if !contains_leaf(&mid.account_leaves, bottom.merkle_root_with_asset_sum_hash) {
        return Err(PorError::BottomNotLinkedToMid);
    }
    if !contains_leaf(&top.account_leaves, mid.merkle_root_with_asset_sum_hash) {
        return Err(PorError::MidNotLinkedToTop);
    }

    let asset_sum = top.asset_sum.ok_or(PorError::TopAssetSumMismatch)?;
    let synthetic = Account::synthetic(top.merkle_root, asset_sum);
    if account::hash_account(&synthetic) != top.merkle_root_with_asset_sum_hash {
        return Err(PorError::TopAssetSumMismatch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{self, BatchInput};
    use crate::registry::SetupRegistry;
    use por_circuit::account::Balance;

    fn sample_accounts(prefix: &str, n: usize) -> Vec<Account> {
        (0..n)
            .map(|i| {
                let btc = (46 * i + 39) as u64;
                let eth = (3 * i + 1001) as u64;
                Account::new(format!("{prefix}-{i}").as_bytes(), Balance::from_u64(btc, eth))
            })
            .collect()
    }

    /// `label` seeds the account ids so two calls produce genuinely different batches
    /// (and therefore different Merkle roots), not just different Groth16 randomness.
    fn sample_pipeline(label: &str) -> pipeline::PipelineOutput {
        let registry = SetupRegistry::new();
        let batches: Vec<BatchInput> = (0..2)
            .map(|b| {
                let accounts = sample_accounts(&format!("{label}-batch{b}"), 4);
                let asset_sum = account::sum_balances(&accounts);
                BatchInput { accounts, asset_sum }
            })
            .collect();
        pipeline::run(batches, &registry).unwrap()
    }

    #[test]
    fn full_verification_passes_on_an_honest_pipeline() {
        let output = sample_pipeline("alpha");
        verify_full(&output.bottom, &output.mid, &output.top).unwrap();
    }

    #[test]
    fn full_verification_rejects_a_tampered_mid_root() {
        let mut output = sample_pipeline("alpha");
        output.mid[0].merkle_root = Fr::from(123u64);
        let result = verify_full(&output.bottom, &output.mid, &output.top);
        assert!(result.is_err());
    }

    #[test]
    fn user_path_verification_succeeds_for_an_included_account() {
        let output = sample_pipeline("alpha");
        let account = Account::new(b"alpha-batch0-0", Balance::from_u64(39, 1001));
        verify_user_path(&account, &output.bottom[0], &output.mid[0], &output.top).unwrap();
    }

    #[test]
    fn user_path_verification_fails_for_a_non_member_account() {
        let output = sample_pipeline("alpha");
        let stranger = Account::new(b"not-in-any-batch", Balance::from_u64(1, 1));
        let result = verify_user_path(&stranger, &output.bottom[0], &output.mid[0], &output.top);
        assert!(matches!(result, Err(PorError::AccountNotIncluded { .. })));
    }

    /// `spec.md` §8 scenario 6: swap in a mid proof that never aggregated the given bottom
    /// proof. `other` is built from disjoint account data (not just a second run with the
    /// same data), so its mid root is genuinely foreign rather than coincidentally identical.
    #[test]
    fn user_path_verification_fails_when_mid_proof_is_swapped() {
        let output = sample_pipeline("alpha");
        let other = sample_pipeline("beta");
        let account = Account::new(b"alpha-batch0-0", Balance::from_u64(39, 1001));
        let result = verify_user_path(&account, &output.bottom[0], &other.mid[0], &output.top);
        assert!(matches!(result, Err(PorError::BottomNotLinkedToMid)));
    }
}
