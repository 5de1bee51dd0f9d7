//! MiMC hashing, native and in-circuit.
//!
//! Both paths share the same round-constant table and the same Feistel permutation so
//! that a hash computed outside the circuit is bit-identical to the one the circuit
//! constrains — the contract `spec.md` §4.1 calls out as load-bearing for the whole
//! protocol. The construction mirrors `gnark-crypto`'s `ecc/bn254/fr/mimc` package: 91
//! rounds of `x -> (x + k + c_i)^7`, a final key addition, combined via Miyaguchi-Preneel
//! compression.

use std::borrow::Borrow;
use std::sync::OnceLock;

use ark_crypto_primitives::crh::{CRHScheme, TwoToOneCRHScheme};
use ark_crypto_primitives::Error as ArkError;
use ark_ff::{Field, PrimeField};
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::SynthesisError;
use ark_std::rand::Rng;

use crate::{Fr, MOD_BYTES};

/// Number of Feistel rounds. Matches gnark-crypto's constant for the BN254 scalar field.
const ROUNDS: usize = 91;

/// ASCII seed gnark-crypto expands (via repeated hashing) into the round-constant table.
const SEED: &[u8] = b"seed";

fn round_constants() -> &'static [Fr; ROUNDS] {
    static CONSTANTS: OnceLock<[Fr; ROUNDS]> = OnceLock::new();
    CONSTANTS.get_or_init(|| {
        use sha3::{Digest, Keccak256};

        let mut seed = SEED.to_vec();
        let mut constants = [Fr::from(0u64); ROUNDS];
        for constant in &mut constants {
            let mut hasher = Keccak256::new();
            hasher.update(&seed);
            seed = hasher.finalize().to_vec();
            *constant = Fr::from_be_bytes_mod_order(&seed);
        }
        constants
    })
}

fn pow7(x: Fr) -> Fr {
    let x2 = x.square();
    let x4 = x2.square();
    let x6 = x4 * x2;
    x6 * x
}

/// `E_k(m)`: the MiMC Feistel permutation keyed by `key`, applied to `msg`.
fn encrypt(key: Fr, msg: Fr) -> Fr {
    let mut x = msg;
    for c in round_constants() {
        x = pow7(x + key + c);
    }
    x + key
}

/// Miyaguchi-Preneel compression of one absorbed block: `h' = h + E_h(m) + m`.
fn compress(state: Fr, block: Fr) -> Fr {
    state + encrypt(state, block) + block
}

/// A reset-absorb-squeeze MiMC hasher over BN254 scalar-field elements, matching gnark's
/// `mimc.MiMC` usage pattern (`hasher.Reset(); hasher.Write(...); hasher.Sum()`).
#[derive(Default)]
pub struct MimcHasher {
    state: Fr,
}

impl MimcHasher {
    pub fn new() -> Self {
        Self { state: Fr::from(0u64) }
    }

    pub fn reset(&mut self) {
        self.state = Fr::from(0u64);
    }

    /// Absorb a single field element.
    pub fn absorb_element(&mut self, x: Fr) {
        self.state = compress(self.state, x);
    }

    /// Absorb raw bytes, chunked into [`MOD_BYTES`]-sized big-endian field elements.
    ///
    /// Each chunk is reduced modulo the scalar field the same way `Fr::from_be_bytes_mod_order`
    /// reduces any big-endian byte string, matching how the Go source feeds
    /// `pad32_be`-encoded balances and arbitrary-length `userId` bytes into the hasher.
    pub fn absorb_bytes(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            self.absorb_element(Fr::from(0u64));
            return;
        }
        for chunk in bytes.chunks(MOD_BYTES) {
            self.absorb_element(Fr::from_be_bytes_mod_order(chunk));
        }
    }

    pub fn squeeze(&self) -> Fr {
        self.state
    }
}

/// 32-byte big-endian zero-padded encoding of a non-negative integer, as `spec.md` §4.2
/// defines `pad32_be`.
pub fn pad32_be(value: u64) -> [u8; MOD_BYTES] {
    let mut bytes = [0u8; MOD_BYTES];
    bytes[MOD_BYTES - 8..].copy_from_slice(&value.to_be_bytes());
    bytes
}

/// Reduce an arbitrary-length big-endian byte string (e.g. a `userId`) to one field element.
pub fn field_from_be_bytes(bytes: &[u8]) -> Fr {
    Fr::from_be_bytes_mod_order(bytes)
}

/// Marker type wiring [`MimcHasher`] into arkworks' `CRHScheme`/`TwoToOneCRHScheme` traits,
/// the same pattern the teacher's `Blake2s` Merkle hash uses.
pub struct Mimc;

impl CRHScheme for Mimc {
    type Input = [u8];
    type Output = Fr;
    type Parameters = ();

    fn setup<R: Rng>(_rng: &mut R) -> Result<Self::Parameters, ArkError> {
        Ok(())
    }

    fn evaluate<T: Borrow<Self::Input>>(
        _parameters: &Self::Parameters,
        input: T,
    ) -> Result<Self::Output, ArkError> {
        let mut hasher = MimcHasher::new();
        hasher.absorb_bytes(input.borrow());
        Ok(hasher.squeeze())
    }
}

impl TwoToOneCRHScheme for Mimc {
    type Input = Fr;
    type Output = Fr;
    type Parameters = ();

    fn setup<R: Rng>(_rng: &mut R) -> Result<Self::Parameters, ArkError> {
        Ok(())
    }

    fn evaluate<T: Borrow<Self::Input>>(
        _parameters: &Self::Parameters,
        left_input: T,
        right_input: T,
    ) -> Result<Self::Output, ArkError> {
        Self::compress(_parameters, left_input, right_input)
    }

    fn compress<T: Borrow<Self::Output>>(
        _parameters: &Self::Parameters,
        left_input: T,
        right_input: T,
    ) -> Result<Self::Output, ArkError> {
        let mut hasher = MimcHasher::new();
        hasher.absorb_element(*left_input.borrow());
        hasher.absorb_element(*right_input.borrow());
        Ok(hasher.squeeze())
    }
}

/// In-circuit mirror of [`encrypt`]: the MiMC Feistel permutation over allocated variables.
fn encrypt_gadget(key: &FpVar<Fr>, msg: &FpVar<Fr>) -> Result<FpVar<Fr>, SynthesisError> {
    let mut x = msg.clone();
    for c in round_constants() {
        let t = &x + key + FpVar::constant(*c);
        let x2 = t.square()?;
        let x4 = x2.square()?;
        let x6 = &x4 * &x2;
        x = x6 * &t;
    }
    Ok(x + key)
}

fn compress_gadget(state: &FpVar<Fr>, block: &FpVar<Fr>) -> Result<FpVar<Fr>, SynthesisError> {
    let e = encrypt_gadget(state, block)?;
    Ok(state + &e + block)
}

/// In-circuit reset-absorb-squeeze hasher, the gadget equivalent of [`MimcHasher`].
pub struct MimcGadgetHasher {
    state: FpVar<Fr>,
}

impl MimcGadgetHasher {
    pub fn new() -> Self {
        Self { state: FpVar::constant(Fr::from(0u64)) }
    }

    pub fn absorb(&mut self, x: &FpVar<Fr>) -> Result<(), SynthesisError> {
        self.state = compress_gadget(&self.state, x)?;
        Ok(())
    }

    pub fn squeeze(&self) -> FpVar<Fr> {
        self.state.clone()
    }
}

impl Default for MimcGadgetHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let mut a = MimcHasher::new();
        a.absorb_element(Fr::from(7u64));
        let mut b = MimcHasher::new();
        b.absorb_element(Fr::from(7u64));
        assert_eq!(a.squeeze(), b.squeeze());
    }

    #[test]
    fn distinct_inputs_differ() {
        let mut a = MimcHasher::new();
        a.absorb_element(Fr::from(1u64));
        let mut b = MimcHasher::new();
        b.absorb_element(Fr::from(2u64));
        assert_ne!(a.squeeze(), b.squeeze());
    }

    #[test]
    fn reset_clears_state() {
        let mut h = MimcHasher::new();
        h.absorb_element(Fr::from(42u64));
        h.reset();
        assert_eq!(h.squeeze(), Fr::from(0u64));
    }

    #[test]
    fn pad32_be_is_big_endian_zero_extended() {
        let bytes = pad32_be(1_000_000_000);
        assert_eq!(bytes.len(), 32);
        assert_eq!(&bytes[24..], &1_000_000_000u64.to_be_bytes());
        assert!(bytes[..24].iter().all(|&b| b == 0));
    }

    #[test]
    fn empty_user_id_reduces_to_zero() {
        assert_eq!(field_from_be_bytes(&[]), Fr::from(0u64));
    }
}
