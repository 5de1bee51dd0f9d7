//! Prover engine adapter (C4): turns a batch of accounts into a `CompletedProof`.
//!
//! Mirrors `examples/original_source/core/prover.go`'s `generateProof`, but sources
//! `(pk, vk)` from the memoized [`SetupRegistry`] instead of re-running setup per call.

use ark_bn254::Bn254;
use ark_groth16::Groth16;
use ark_snark::SNARK;
use ark_std::rand::RngCore;

use por_circuit::account::{self, Account, Balance};
use por_circuit::circuit::{AccountWitness, BalanceWitness, PorCircuit};
use por_circuit::FAN_IN;

use crate::error::{PorError, Tier};
use crate::registry::SetupRegistry;
use crate::types::CompletedProof;

/// Builds and proves a single batch's circuit, returning the completed proof with
/// `asset_sum` always attached — callers decide whether to persist it (`spec.md` §4.5:
/// bottom/mid proofs are stripped of `assetSum` before writing; only the top proof keeps it).
pub fn generate_proof<R: RngCore>(
    accounts: &[Account],
    asset_sum: Balance,
    tier: Tier,
    batch_index: usize,
    range_bits: usize,
    registry: &SetupRegistry,
    rng: &mut R,
) -> Result<CompletedProof, PorError> {
    if accounts.len() > FAN_IN {
        return Err(PorError::BatchTooLarge {
            tier,
            batch_index,
            count: accounts.len(),
            limit: FAN_IN,
        });
    }

    let declared_sum = account::sum_balances(accounts);
    if declared_sum != asset_sum {
        return Err(PorError::AssetSumMismatch { tier, batch_index });
    }

    let merkle_root = account::merkle_root_from_accounts(accounts);
    let synthetic = Account::synthetic(merkle_root, asset_sum);
    let merkle_root_with_asset_sum_hash = account::hash_account(&synthetic);

    // The registry key is the batch's real account count, not FAN_IN: the circuit only
    // allocates witnesses for accounts[0..n), padding the Merkle fold (not the witness
    // count) out to FAN_IN leaves with the literal field zero (`spec.md` §4.3, bullet 4).
    let (pk, vk) = {
        let keys = registry.get_or_setup(accounts.len(), range_bits, rng)?;
        ((*keys).0.clone(), (*keys).1.clone())
    };

    let circuit = PorCircuit {
        accounts: accounts
            .iter()
            .map(|a| AccountWitness {
                user_id: Some(a.user_id),
                bitcoin: Some(a.balance.bitcoin),
                ethereum: Some(a.balance.ethereum),
            })
            .collect(),
        asset_sum: BalanceWitness {
            bitcoin: Some(asset_sum.bitcoin),
            ethereum: Some(asset_sum.ethereum),
        },
        merkle_root: Some(merkle_root),
        merkle_root_with_asset_sum_hash: Some(merkle_root_with_asset_sum_hash),
        range_bits,
    };

    let proof = Groth16::<Bn254>::prove(&pk, circuit, rng)
        .map_err(|_| PorError::ProverFailed { tier, batch_index })?;

    log::debug!("{tier} batch {batch_index}: proof generated ({} accounts)", accounts.len());

    Ok(CompletedProof {
        proof,
        vk,
        account_leaves: account::account_leaves(accounts),
        merkle_root,
        merkle_root_with_asset_sum_hash,
        asset_sum: Some(asset_sum),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SetupRegistry;
    use ark_snark::SNARK;
    use ark_std::test_rng;

    fn sample_accounts(n: usize) -> Vec<Account> {
        (0..n)
            .map(|i| {
                let btc = (46 * i + 39) as u64;
                let eth = (3 * i + 1001) as u64;
                Account::new(format!("user-{i}").as_bytes(), Balance::from_u64(btc, eth))
            })
            .collect()
    }

    #[test]
    fn honest_batch_produces_a_verifying_proof() {
        let registry = SetupRegistry::new();
        let mut rng = test_rng();
        let accounts = sample_accounts(4);
        let asset_sum = account::sum_balances(&accounts);

        let completed =
            generate_proof(&accounts, asset_sum, Tier::Bottom, 0, 64, &registry, &mut rng).unwrap();

        let public_inputs =
            [completed.merkle_root, completed.merkle_root_with_asset_sum_hash];
        assert!(Groth16::<Bn254>::verify(&completed.vk, &public_inputs, &completed.proof).unwrap());
    }

    #[test]
    fn declared_sum_mismatch_is_rejected_before_proving() {
        let registry = SetupRegistry::new();
        let mut rng = test_rng();
        let accounts = sample_accounts(4);
        let mut wrong_sum = account::sum_balances(&accounts);
        wrong_sum.bitcoin += por_circuit::Fr::from(1u64);

        let result =
            generate_proof(&accounts, wrong_sum, Tier::Bottom, 0, 64, &registry, &mut rng);
        assert!(matches!(result, Err(PorError::AssetSumMismatch { .. })));
    }

    #[test]
    fn oversized_batch_is_rejected() {
        let registry = SetupRegistry::new();
        let mut rng = test_rng();
        let accounts = sample_accounts(FAN_IN + 1);
        let asset_sum = account::sum_balances(&accounts);

        let result =
            generate_proof(&accounts, asset_sum, Tier::Bottom, 0, 64, &registry, &mut rng);
        assert!(matches!(result, Err(PorError::BatchTooLarge { .. })));
    }
}
