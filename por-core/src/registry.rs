//! Memoized trusted-setup registry (`spec.md` §4.4, §5, §9 "Memoization of trusted setup").
//!
//! Keyed on `(num_slots, range_bits)` rather than `num_slots` alone, since §3.1 of
//! `SPEC_FULL.md` ties the range-check width to the tier, and two tiers sharing a slot count
//! but not a range-check width need distinct circuits. Write-once-per-key, double-checked
//! locking: a thread that misses the cache takes the lock, re-checks, and only then pays for
//! `Groth16::circuit_specific_setup`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use ark_bn254::Bn254;
use ark_groth16::{Groth16, ProvingKey, VerifyingKey};
use ark_snark::SNARK;
use ark_std::rand::RngCore;

use por_circuit::circuit::PorCircuit;

use crate::error::PorError;

type Key = (usize, usize);
type Keys = Arc<(ProvingKey<Bn254>, VerifyingKey<Bn254>)>;

/// Shared, write-once-per-key cache of `(pk, vk)` pairs, one per distinct circuit shape.
#[derive(Default)]
pub struct SetupRegistry {
    entries: Mutex<HashMap<Key, Keys>>,
}

impl SetupRegistry {
    pub fn new() -> Self {
        Self { entries: Mutex::new(HashMap::new()) }
    }

    /// Returns the `(pk, vk)` pair for this circuit shape, running trusted setup on first
    /// request and reusing it for every later call with the same key.
    pub fn get_or_setup<R: RngCore>(
        &self,
        num_slots: usize,
        range_bits: usize,
        rng: &mut R,
    ) -> Result<Keys, PorError> {
        let key = (num_slots, range_bits);

        if let Some(existing) = self.entries.lock().unwrap().get(&key) {
            return Ok(existing.clone());
        }

        let mut guard = self.entries.lock().unwrap();
        if let Some(existing) = guard.get(&key) {
            return Ok(existing.clone());
        }

        log::info!("trusted-setup cache miss for (num_slots={num_slots}, range_bits={range_bits}), running setup");
        let setup_circuit = PorCircuit::setup_shape(num_slots, range_bits);
        let (pk, vk) = Groth16::<Bn254>::circuit_specific_setup(setup_circuit, rng)
            .map_err(|_| PorError::Configuration {
                message: format!(
                    "trusted setup failed for shape (num_slots={num_slots}, range_bits={range_bits})"
                ),
            })?;
        let value = Arc::new((pk, vk));
        guard.insert(key, value.clone());
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_std::test_rng;

    #[test]
    fn reuses_the_same_keys_for_the_same_shape() {
        let registry = SetupRegistry::new();
        let mut rng = test_rng();
        let first = registry.get_or_setup(4, 64, &mut rng).unwrap();
        let second = registry.get_or_setup(4, 64, &mut rng).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn distinct_shapes_get_distinct_keys() {
        let registry = SetupRegistry::new();
        let mut rng = test_rng();
        let a = registry.get_or_setup(4, 64, &mut rng).unwrap();
        let b = registry.get_or_setup(4, 74, &mut rng).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }
}
