//! The R1CS circuit (C3): range, sum, Merkle root, and commitment constraints.
//!
//! This is a direct translation of `examples/original_source/circuit/circuit.go`'s
//! `Circuit.Define`, generalized with a `range_bits` parameter (see `SPEC_FULL.md` §3.1) so
//! the same circuit shape is reused, unmodified, at every aggregation tier.

use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};

use crate::mimc::MimcGadgetHasher;
use crate::{Fr, FAN_IN};

/// Witness values for one account slot. `None` fields are only valid during trusted setup,
/// where the constraint system is built in "setup mode" and witness closures are never
/// actually invoked.
#[derive(Clone, Default)]
pub struct AccountWitness {
    pub user_id: Option<Fr>,
    pub bitcoin: Option<Fr>,
    pub ethereum: Option<Fr>,
}

#[derive(Clone, Default)]
pub struct BalanceWitness {
    pub bitcoin: Option<Fr>,
    pub ethereum: Option<Fr>,
}

/// The proof-of-reserves circuit for a single batch (of any tier).
///
/// `accounts` may contain fewer than [`FAN_IN`] entries — remaining slots are implicitly
/// zero, matching `computeMerkleRootFromAccounts`'s padding in the Go source. Witness
/// construction rejects batches longer than [`FAN_IN`] before this struct is ever built (see
/// `por-core::prover`), so `generate_constraints` only needs to assert the public commitment
/// matches, not re-check the length.
#[derive(Clone)]
pub struct PorCircuit {
    pub accounts: Vec<AccountWitness>,
    pub asset_sum: BalanceWitness,
    pub merkle_root: Option<Fr>,
    pub merkle_root_with_asset_sum_hash: Option<Fr>,
    pub range_bits: usize,
}

impl PorCircuit {
    /// An "empty" circuit of the right shape for trusted setup: every witness slot is
    /// unfilled, but the slot *count* and `range_bits` determine the constraint system's
    /// shape, which is all setup needs.
    pub fn setup_shape(num_slots: usize, range_bits: usize) -> Self {
        Self {
            accounts: vec![AccountWitness::default(); num_slots],
            asset_sum: BalanceWitness::default(),
            merkle_root: None,
            merkle_root_with_asset_sum_hash: None,
            range_bits,
        }
    }
}

fn assert_range(x: &FpVar<Fr>, bits: usize) -> Result<(), SynthesisError> {
    let le_bits = x.to_bits_le()?;
    for bit in le_bits.iter().skip(bits) {
        bit.enforce_equal(&Boolean::FALSE)?;
    }
    Ok(())
}

fn hash_account_gadget(
    user_id: &FpVar<Fr>,
    bitcoin: &FpVar<Fr>,
    ethereum: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    let mut balance_hasher = MimcGadgetHasher::new();
    balance_hasher.absorb(bitcoin)?;
    balance_hasher.absorb(ethereum)?;
    let balance_hash = balance_hasher.squeeze();

    let mut account_hasher = MimcGadgetHasher::new();
    account_hasher.absorb(user_id)?;
    account_hasher.absorb(&balance_hash)?;
    Ok(account_hasher.squeeze())
}

fn merkle_fold_gadget(mut leaves: Vec<FpVar<Fr>>) -> Result<FpVar<Fr>, SynthesisError> {
    while leaves.len() > 1 {
        let mut next = Vec::with_capacity(leaves.len() / 2);
        for pair in leaves.chunks(2) {
            let mut hasher = MimcGadgetHasher::new();
            hasher.absorb(&pair[0])?;
            hasher.absorb(&pair[1])?;
            next.push(hasher.squeeze());
        }
        leaves = next;
    }
    Ok(leaves.into_iter().next().expect("at least one leaf"))
}

impl ConstraintSynthesizer<Fr> for PorCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        assert!(self.accounts.len() <= FAN_IN, "batch exceeds the Merkle tree's leaf count");

        let merkle_root = FpVar::new_input(cs.clone(), || {
            self.merkle_root.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let merkle_root_with_sum = FpVar::new_input(cs.clone(), || {
            self.merkle_root_with_asset_sum_hash.ok_or(SynthesisError::AssignmentMissing)
        })?;

        let mut running_btc = FpVar::constant(Fr::from(0u64));
        let mut running_eth = FpVar::constant(Fr::from(0u64));
        let mut leaves = Vec::with_capacity(FAN_IN);

        for account in &self.accounts {
            let user_id = FpVar::new_witness(cs.clone(), || {
                account.user_id.ok_or(SynthesisError::AssignmentMissing)
            })?;
            let bitcoin = FpVar::new_witness(cs.clone(), || {
                account.bitcoin.ok_or(SynthesisError::AssignmentMissing)
            })?;
            let ethereum = FpVar::new_witness(cs.clone(), || {
                account.ethereum.ok_or(SynthesisError::AssignmentMissing)
            })?;

            assert_range(&bitcoin, self.range_bits)?;
            assert_range(&ethereum, self.range_bits)?;

            running_btc = running_btc + &bitcoin;
            running_eth = running_eth + &ethereum;

            leaves.push(hash_account_gadget(&user_id, &bitcoin, &ethereum)?);
        }
        while leaves.len() < FAN_IN {
            leaves.push(FpVar::constant(Fr::from(0u64)));
        }

        let asset_sum_btc = FpVar::new_witness(cs.clone(), || {
            self.asset_sum.bitcoin.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let asset_sum_eth = FpVar::new_witness(cs.clone(), || {
            self.asset_sum.ethereum.ok_or(SynthesisError::AssignmentMissing)
        })?;
        running_btc.enforce_equal(&asset_sum_btc)?;
        running_eth.enforce_equal(&asset_sum_eth)?;

        let computed_root = merkle_fold_gadget(leaves)?;
        computed_root.enforce_equal(&merkle_root)?;

        let computed_root_with_sum =
            hash_account_gadget(&computed_root, &asset_sum_btc, &asset_sum_eth)?;
        computed_root_with_sum.enforce_equal(&merkle_root_with_sum)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{self, Account, Balance};
    use ark_groth16::Groth16;
    use ark_relations::r1cs::{ConstraintSystem, OptimizationGoal};
    use ark_snark::SNARK;
    use ark_std::test_rng;

    fn witness_circuit(accounts: &[Account], asset_sum: Balance, range_bits: usize) -> PorCircuit {
        let merkle_root = account::merkle_root_from_accounts(accounts);
        let synthetic = Account::synthetic(merkle_root, asset_sum);
        let commitment = account::hash_account(&synthetic);

        PorCircuit {
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
            merkle_root_with_asset_sum_hash: Some(commitment),
            range_bits,
        }
    }

    fn sample_accounts(n: usize) -> Vec<Account> {
        (0..n)
            .map(|i| {
                let btc = (46 * i + 39) as u64;
                let eth = (3 * i + 1001) as u64;
                Account::new(b"foo", Balance::from_u64(btc, eth))
            })
            .collect()
    }

    #[test]
    fn honest_witness_satisfies_all_constraints() {
        let accounts = sample_accounts(16);
        let asset_sum = account::sum_balances(&accounts);
        let circuit = witness_circuit(&accounts, asset_sum, 64);

        let cs = ConstraintSystem::<Fr>::new_ref();
        cs.set_optimization_goal(OptimizationGoal::Constraints);
        circuit.generate_constraints(cs.clone()).unwrap();
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn tampered_merkle_root_is_unsatisfiable() {
        let accounts = sample_accounts(16);
        let asset_sum = account::sum_balances(&accounts);
        let mut circuit = witness_circuit(&accounts, asset_sum, 64);
        circuit.merkle_root = Some(Fr::from(123u64));

        let cs = ConstraintSystem::<Fr>::new_ref();
        circuit.generate_constraints(cs.clone()).unwrap();
        assert!(!cs.is_satisfied().unwrap());
    }

    #[test]
    fn tampered_commitment_is_unsatisfiable() {
        let accounts = sample_accounts(16);
        let asset_sum = account::sum_balances(&accounts);
        let mut circuit = witness_circuit(&accounts, asset_sum, 64);
        circuit.merkle_root_with_asset_sum_hash = Some(Fr::from(123u64));

        let cs = ConstraintSystem::<Fr>::new_ref();
        circuit.generate_constraints(cs.clone()).unwrap();
        assert!(!cs.is_satisfied().unwrap());
    }

    #[test]
    fn wrong_declared_sum_is_unsatisfiable() {
        let accounts = sample_accounts(16);
        let mut asset_sum = account::sum_balances(&accounts);
        asset_sum.bitcoin += Fr::from(1u64);
        let circuit = witness_circuit(&accounts, asset_sum, 64);

        let cs = ConstraintSystem::<Fr>::new_ref();
        circuit.generate_constraints(cs.clone()).unwrap();
        assert!(!cs.is_satisfied().unwrap());
    }

    #[test]
    fn negative_balance_fails_range_check() {
        let mut accounts = sample_accounts(16);
        accounts[0].balance.bitcoin = account::sign_extended_negative(1);
        let asset_sum = account::sum_balances(&accounts);
        let circuit = witness_circuit(&accounts, asset_sum, 64);

        let cs = ConstraintSystem::<Fr>::new_ref();
        circuit.generate_constraints(cs.clone()).unwrap();
        assert!(!cs.is_satisfied().unwrap());
    }

    #[test]
    fn oversized_balance_fails_range_check() {
        let mut accounts = sample_accounts(16);
        accounts[0].balance.bitcoin = account::oversized_positive(0xFF, 9);
        let asset_sum = account::sum_balances(&accounts);
        let circuit = witness_circuit(&accounts, asset_sum, 64);

        let cs = ConstraintSystem::<Fr>::new_ref();
        circuit.generate_constraints(cs.clone()).unwrap();
        assert!(!cs.is_satisfied().unwrap());
    }

    #[test]
    fn end_to_end_groth16_roundtrip() {
        use crate::Bn254;

        let mut rng = test_rng();
        let setup_circuit = PorCircuit::setup_shape(4, 64);
        let (pk, vk) = Groth16::<Bn254>::circuit_specific_setup(setup_circuit, &mut rng).unwrap();

        let accounts = sample_accounts(4);
        let asset_sum = account::sum_balances(&accounts);
        let circuit = witness_circuit(&accounts, asset_sum, 64);
        let public_inputs = [
            circuit.merkle_root.unwrap(),
            circuit.merkle_root_with_asset_sum_hash.unwrap(),
        ];

        let proof = Groth16::<Bn254>::prove(&pk, circuit, &mut rng).unwrap();
        assert!(Groth16::<Bn254>::verify(&vk, &public_inputs, &proof).unwrap());
    }
}
