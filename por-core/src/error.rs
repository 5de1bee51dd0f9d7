//! The error taxonomy from `spec.md` §7: configuration, format, consistency, cryptographic,
//! inclusion. Every variant carries enough context (tier, batch index, expected/actual
//! digests) to produce the diagnostic §7 requires without the caller re-deriving it.

use thiserror::Error;

/// Which aggregation tier an error occurred in, for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tier {
    Bottom,
    Mid,
    Top,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Bottom => write!(f, "bottom"),
            Tier::Mid => write!(f, "mid"),
            Tier::Top => write!(f, "top"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PorError {
    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("{path}: failed to decode {what}: {source}")]
    Format {
        path: String,
        what: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{tier} batch {batch_index}: asset sum mismatch (declared != Σ balances)")]
    AssetSumMismatch { tier: Tier, batch_index: usize },

    #[error(
        "{tier} batch {batch_index}: merkle root mismatch (expected {expected}, got {actual})"
    )]
    MerkleRootMismatch { tier: Tier, batch_index: usize, expected: String, actual: String },

    #[error(
        "{tier} batch {batch_index}: commitment mismatch (expected {expected}, got {actual})"
    )]
    CommitmentMismatch { tier: Tier, batch_index: usize, expected: String, actual: String },

    #[error("{tier} batch {batch_index}: batch has {count} accounts, exceeds the {limit}-slot circuit")]
    BatchTooLarge { tier: Tier, batch_index: usize, count: usize, limit: usize },

    #[error("fan-in must be nonzero")]
    ZeroFanIn,

    #[error("{tier} batch {batch_index}: constraint system unsatisfied during proving")]
    ProverFailed { tier: Tier, batch_index: usize },

    #[error("{tier} batch {batch_index}: SNARK verification failed")]
    VerificationFailed { tier: Tier, batch_index: usize },

    #[error("bottom proof does not link to mid proof")]
    BottomNotLinkedToMid,

    #[error("mid proof does not link to top proof")]
    MidNotLinkedToTop,

    #[error("top proof's declared asset sum does not match its commitment")]
    TopAssetSumMismatch,

    #[error("account not found in any proof at tier {tier}")]
    AccountNotIncluded { tier: Tier },
}

pub type Result<T> = std::result::Result<T, PorError>;
