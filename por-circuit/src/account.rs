//! Native account hashing and Merkle root folding (C2).
//!
//! Everything here operates on plain [`Fr`] values and is meant to be called both by the
//! prover (to derive the public inputs before proving) and by the verifier (to recompute a
//! commitment from disclosed leaves). The Merkle root function is deliberately generic over
//! "what a leaf already is" so the same code folds fresh account hashes at the bottom tier
//! and already-hashed child commitments at the mid/top tiers.

use ark_crypto_primitives::crh::TwoToOneCRHScheme;

use crate::mimc::{field_from_be_bytes, Mimc, MimcHasher};
use crate::{Fr, FAN_IN};

/// A two-asset balance. Each component is assumed non-negative; the circuit enforces the
/// tier-appropriate bound (see [`crate::range_bits_for_tier`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Balance {
    pub bitcoin: Fr,
    pub ethereum: Fr,
}

impl Balance {
    pub fn zero() -> Self {
        Self { bitcoin: Fr::from(0u64), ethereum: Fr::from(0u64) }
    }

    pub fn from_u64(bitcoin: u64, ethereum: u64) -> Self {
        Self { bitcoin: Fr::from(bitcoin), ethereum: Fr::from(ethereum) }
    }

    pub fn add(self, other: Balance) -> Balance {
        Balance { bitcoin: self.bitcoin + other.bitcoin, ethereum: self.ethereum + other.ethereum }
    }

    /// The 64-byte `pad32_be(bitcoin) || pad32_be(ethereum)` layout `spec.md` §4.2 defines.
    /// Only meaningful for values that are genuinely representable as `u64`; see
    /// [`Balance::to_be_bytes_checked`] for the fallible variant used by adversarial tests.
    pub fn to_be_bytes(self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&fr_to_be_bytes_32(self.bitcoin));
        out[32..].copy_from_slice(&fr_to_be_bytes_32(self.ethereum));
        out
    }
}

/// Big-endian 32-byte encoding of a field element's canonical representative, used when a
/// component may already be an out-of-u64-range or "negative" (sign-extended) field element
/// constructed for adversarial tests.
fn fr_to_be_bytes_32(x: Fr) -> [u8; 32] {
    use ark_ff::{BigInteger, PrimeField};
    let mut bytes = x.into_bigint().to_bytes_be();
    let mut out = [0u8; 32];
    if bytes.len() > 32 {
        bytes = bytes[bytes.len() - 32..].to_vec();
    }
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    out
}

/// An account as the native layer sees it: an opaque id and a balance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub user_id: Fr,
    pub balance: Balance,
}

impl Account {
    pub fn new(user_id_bytes: &[u8], balance: Balance) -> Self {
        Self { user_id: field_from_be_bytes(user_id_bytes), balance }
    }

    pub fn synthetic(user_id: Fr, balance: Balance) -> Self {
        Self { user_id, balance }
    }
}

/// A 32-byte leaf digest, opaque outside this module.
pub type AccountLeaf = [u8; 32];

fn hash_balance(balance: Balance) -> Fr {
    let mut hasher = MimcHasher::new();
    hasher.absorb_bytes(&balance.to_be_bytes());
    hasher.squeeze()
}

/// `leaf(acc) = MiMC(userId, MiMC(balance_bytes))`, matching `spec.md` §4.2's ordering:
/// reset, absorb balance bytes, squeeze; reset, absorb userId, absorb that digest, squeeze.
pub fn hash_account(account: &Account) -> Fr {
    let balance_hash = hash_balance(account.balance);
    let mut hasher = MimcHasher::new();
    hasher.absorb_element(account.user_id);
    hasher.absorb_element(balance_hash);
    hasher.squeeze()
}

pub fn fr_to_leaf(x: Fr) -> AccountLeaf {
    fr_to_be_bytes_32(x)
}

pub fn leaf_to_fr(leaf: &AccountLeaf) -> Fr {
    field_from_be_bytes(leaf)
}

/// Fold up to [`FAN_IN`] leaves into the depth-`TREE_DEPTH` Merkle root, padding unused
/// slots with the field zero (not a hash of zero — matching `padToModBytes([]byte{})` in the
/// Go source, which is 32 zero bytes interpreted as the integer zero).
pub fn merkle_root(nodes: &[Fr]) -> Fr {
    assert!(nodes.len() <= FAN_IN, "more nodes than the tree has leaves");
    let mut level: Vec<Fr> = (0..FAN_IN)
        .map(|i| nodes.get(i).copied().unwrap_or(Fr::from(0u64)))
        .collect();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| Mimc::compress(&(), pair[0], pair[1]).expect("infallible CRH"))
            .collect();
    }
    level[0]
}

/// Merkle root over fresh account hashes (used at the bottom tier).
pub fn merkle_root_from_accounts(accounts: &[Account]) -> Fr {
    let leaves: Vec<Fr> = accounts.iter().map(hash_account).collect();
    merkle_root(&leaves)
}

/// Merkle root over already-computed digests (used at mid/top tiers, and by the verifier to
/// recompute a bottom proof's root from its disclosed `accountLeaves`).
pub fn merkle_root_from_leaves(leaves: &[Fr]) -> Fr {
    merkle_root(leaves)
}

/// Per-account leaf hashes for a batch, used for the `accountLeaves` field of a completed
/// proof so a user can later check inclusion in O(n) over a single batch.
pub fn account_leaves(accounts: &[Account]) -> Vec<Fr> {
    accounts.iter().map(hash_account).collect()
}

/// Sums a batch's balances via plain field addition. No range validation happens here — that
/// is the circuit's job; this just computes the `assetSum` a prover would declare.
pub fn sum_balances(accounts: &[Account]) -> Balance {
    accounts.iter().fold(Balance::zero(), |acc, a| acc.add(a.balance))
}

/// Construct the field element gnark's `padToModBytes(_, isNegative=true)` would produce for
/// a given absolute magnitude — i.e. the sign-extended encoding of `-magnitude`, used only to
/// build adversarial witnesses that the circuit's range check must reject (`spec.md` §9's
/// "Sign handling" design note).
pub fn sign_extended_negative(magnitude: u64) -> Fr {
    let magnitude_bytes = magnitude.to_be_bytes();
    let first_nonzero =
        magnitude_bytes.iter().position(|&b| b != 0).unwrap_or(magnitude_bytes.len() - 1);
    let trimmed = &magnitude_bytes[first_nonzero..];
    let mut encoded = [0xFFu8; 32];
    encoded[0] = 0x0F;
    encoded[32 - trimmed.len()..].copy_from_slice(trimmed);
    field_from_be_bytes(&encoded)
}

/// A balance component that is a valid non-negative integer but too wide for the leaf-tier
/// 64-bit range check (e.g. the "overflow rejection" scenario in `spec.md` §8: a 72-bit
/// value built from nine `0xFF` bytes).
pub fn oversized_positive(byte_value: u8, num_bytes: usize) -> Fr {
    let mut bytes = vec![byte_value; num_bytes];
    if bytes.len() > 32 {
        bytes = bytes[bytes.len() - 32..].to_vec();
    }
    field_from_be_bytes(&bytes)
}
