//! JSON wire types for `ProofElements` and `CompletedProof` (`spec.md` §3, §6), and their
//! conversions to/from the native [`por_circuit`] types.
//!
//! Encoding follows `spec.md` §6: digest/byte fields are base64 strings; balance components
//! are decimal-integer strings (mirroring `big.Int`'s JSON marshaling in
//! `examples/original_source/circuit/utils.go`'s `GoBalance`).

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use ark_bn254::Bn254;
use ark_ff::{BigInteger, PrimeField};
use ark_groth16::{Proof, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use por_circuit::account::{Account, Balance};
use por_circuit::Fr;

use crate::error::PorError;

fn fr_to_decimal(x: Fr) -> String {
    BigUint::from_bytes_be(&x.into_bigint().to_bytes_be()).to_string()
}

fn decimal_to_fr(s: &str) -> Result<Fr, PorError> {
    let digits = BigUint::parse_bytes(s.as_bytes(), 10).ok_or_else(|| PorError::Format {
        path: String::new(),
        what: "decimal balance component",
        source: format!("{s:?} is not a base-10 integer").into(),
    })?;
    Ok(Fr::from_be_bytes_mod_order(&digits.to_bytes_be()))
}

fn fr_to_base64(x: Fr) -> String {
    STANDARD.encode(por_circuit::account::fr_to_leaf(x))
}

fn base64_to_fr(s: &str) -> Result<Fr, PorError> {
    let bytes = STANDARD.decode(s).map_err(|e| PorError::Format {
        path: String::new(),
        what: "base64 digest",
        source: Box::new(e),
    })?;
    Ok(por_circuit::account::leaf_to_fr(&bytes.try_into().map_err(|_| PorError::Format {
        path: String::new(),
        what: "digest length",
        source: "expected exactly 32 bytes".into(),
    })?))
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct JsonBalance {
    pub bitcoin: String,
    pub ethereum: String,
}

impl JsonBalance {
    pub fn from_balance(b: Balance) -> Self {
        Self { bitcoin: fr_to_decimal(b.bitcoin), ethereum: fr_to_decimal(b.ethereum) }
    }

    pub fn to_balance(&self) -> Result<Balance, PorError> {
        Ok(Balance { bitcoin: decimal_to_fr(&self.bitcoin)?, ethereum: decimal_to_fr(&self.ethereum)? })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JsonAccount {
    /// Base64 of the arbitrary-length `userId` byte string (not the reduced field element).
    #[serde(rename = "userId")]
    pub user_id: String,
    pub balance: JsonBalance,
}

impl JsonAccount {
    pub fn from_account_bytes(user_id_bytes: &[u8], balance: Balance) -> Self {
        Self { user_id: STANDARD.encode(user_id_bytes), balance: JsonBalance::from_balance(balance) }
    }

    /// Recovers the account. Because `userId` reduction is lossy (arbitrary length -> one
    /// field element), this reconstructs `Account` directly from the decoded bytes rather
    /// than round-tripping through a field element, exactly mirroring how the prover first
    /// consumed it.
    pub fn to_account(&self) -> Result<Account, PorError> {
        let user_id_bytes = STANDARD.decode(&self.user_id).map_err(|e| PorError::Format {
            path: String::new(),
            what: "base64 userId",
            source: Box::new(e),
        })?;
        Ok(Account::new(&user_id_bytes, self.balance.to_balance()?))
    }
}

/// A synthetic account (mid/top tier) whose `userId` IS already a field element (a child's
/// Merkle root), so it skips the byte-reduction `JsonAccount` performs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JsonSyntheticAccount {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub balance: JsonBalance,
}

impl JsonSyntheticAccount {
    pub fn from_account(a: &Account) -> Self {
        Self { user_id: fr_to_base64(a.user_id), balance: JsonBalance::from_balance(a.balance) }
    }

    pub fn to_account(&self) -> Result<Account, PorError> {
        Ok(Account::synthetic(base64_to_fr(&self.user_id)?, self.balance.to_balance()?))
    }
}

/// A batch's proving input, as written under `out/secret/`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JsonProofElements {
    pub accounts: Vec<JsonAccount>,
    #[serde(rename = "assetSum", skip_serializing_if = "Option::is_none")]
    pub asset_sum: Option<JsonBalance>,
    #[serde(rename = "merkleRoot", skip_serializing_if = "Option::is_none")]
    pub merkle_root: Option<String>,
    #[serde(rename = "merkleRootWithAssetSumHash", skip_serializing_if = "Option::is_none")]
    pub merkle_root_with_asset_sum_hash: Option<String>,
}

/// A tier's output, as written under `out/public/`. `asset_sum` is only populated for the
/// top-level proof (`spec.md` §3, "Lifecycles").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JsonCompletedProof {
    pub proof: String,
    pub vk: String,
    #[serde(rename = "accountLeaves")]
    pub account_leaves: Vec<String>,
    #[serde(rename = "merkleRoot")]
    pub merkle_root: String,
    #[serde(rename = "merkleRootWithAssetSumHash")]
    pub merkle_root_with_asset_sum_hash: String,
    #[serde(rename = "assetSum", skip_serializing_if = "Option::is_none")]
    pub asset_sum: Option<JsonBalance>,
}

impl JsonCompletedProof {
    pub fn merkle_root_fr(&self) -> Result<Fr, PorError> {
        base64_to_fr(&self.merkle_root)
    }

    pub fn merkle_root_with_asset_sum_hash_fr(&self) -> Result<Fr, PorError> {
        base64_to_fr(&self.merkle_root_with_asset_sum_hash)
    }

    pub fn account_leaves_fr(&self) -> Result<Vec<Fr>, PorError> {
        self.account_leaves.iter().map(|s| base64_to_fr(s)).collect()
    }

    pub fn encode_digest(x: Fr) -> String {
        fr_to_base64(x)
    }
}

/// A tier's output in native form: an opaque Groth16 proof/vk plus the digests and (at the
/// top tier only) the asset sum `spec.md` §3's `CompletedProof` specifies.
#[derive(Clone)]
pub struct CompletedProof {
    pub proof: Proof<Bn254>,
    pub vk: VerifyingKey<Bn254>,
    pub account_leaves: Vec<Fr>,
    pub merkle_root: Fr,
    pub merkle_root_with_asset_sum_hash: Fr,
    pub asset_sum: Option<Balance>,
}

impl CompletedProof {
    pub fn to_json(&self) -> Result<JsonCompletedProof, PorError> {
        let mut proof_bytes = Vec::new();
        self.proof.serialize_compressed(&mut proof_bytes).map_err(|e| PorError::Format {
            path: String::new(),
            what: "groth16 proof",
            source: Box::new(e),
        })?;
        let mut vk_bytes = Vec::new();
        self.vk.serialize_compressed(&mut vk_bytes).map_err(|e| PorError::Format {
            path: String::new(),
            what: "groth16 verifying key",
            source: Box::new(e),
        })?;

        Ok(JsonCompletedProof {
            proof: STANDARD.encode(proof_bytes),
            vk: STANDARD.encode(vk_bytes),
            account_leaves: self.account_leaves.iter().map(|&x| fr_to_base64(x)).collect(),
            merkle_root: fr_to_base64(self.merkle_root),
            merkle_root_with_asset_sum_hash: fr_to_base64(self.merkle_root_with_asset_sum_hash),
            asset_sum: self.asset_sum.map(JsonBalance::from_balance),
        })
    }

    pub fn from_json(json: &JsonCompletedProof) -> Result<Self, PorError> {
        let proof_bytes = STANDARD.decode(&json.proof).map_err(|e| PorError::Format {
            path: String::new(),
            what: "base64 proof",
            source: Box::new(e),
        })?;
        let proof = Proof::<Bn254>::deserialize_compressed(&proof_bytes[..]).map_err(|e| {
            PorError::Format { path: String::new(), what: "groth16 proof", source: Box::new(e) }
        })?;

        let vk_bytes = STANDARD.decode(&json.vk).map_err(|e| PorError::Format {
            path: String::new(),
            what: "base64 verifying key",
            source: Box::new(e),
        })?;
        let vk = VerifyingKey::<Bn254>::deserialize_compressed(&vk_bytes[..]).map_err(|e| {
            PorError::Format {
                path: String::new(),
                what: "groth16 verifying key",
                source: Box::new(e),
            }
        })?;

        Ok(Self {
            proof,
            vk,
            account_leaves: json.account_leaves_fr()?,
            merkle_root: json.merkle_root_fr()?,
            merkle_root_with_asset_sum_hash: json.merkle_root_with_asset_sum_hash_fr()?,
            asset_sum: json.asset_sum.as_ref().map(|b| b.to_balance()).transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balance_decimal_round_trips() {
        let b = Balance::from_u64(46 * 3 + 39, 3 * 3 + 1001);
        let json = JsonBalance::from_balance(b);
        assert_eq!(json.to_balance().unwrap(), b);
    }

    #[test]
    fn digest_base64_round_trips() {
        let x = Fr::from(123456789u64);
        let encoded = fr_to_base64(x);
        assert_eq!(base64_to_fr(&encoded).unwrap(), x);
    }

    #[test]
    fn account_user_id_round_trips_through_bytes() {
        let account = Account::new(b"user-42", Balance::from_u64(1, 2));
        let json = JsonAccount::from_account_bytes(b"user-42", account.balance);
        let recovered = json.to_account().unwrap();
        assert_eq!(recovered, account);
    }

    #[test]
    fn rejects_non_decimal_balance() {
        let bad = JsonBalance { bitcoin: "not-a-number".into(), ethereum: "0".into() };
        assert!(bad.to_balance().is_err());
    }
}
