//! CLI dispatcher (`spec.md` §6), mirroring `examples/original_source/cli/*.go`'s four
//! subcommands 1:1 in argument shape: `generate`, `prove`, `verify`, `userverify`.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use por_core::persistence::{self, Layout};
use por_core::pipeline::{self, BatchInput};
use por_core::registry::SetupRegistry;
use por_core::testdata;
use por_core::types::{JsonAccount, JsonBalance, JsonCompletedProof, JsonProofElements};
use por_core::verifier;

#[derive(Parser)]
#[command(name = "por", about = "Hierarchical zk-SNARK proof-of-reserves tool")]
struct Cli {
    /// Base directory for the `secret/`, `public/`, `user/` tree.
    #[arg(long, default_value = "out", global = true)]
    out_dir: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Populates `out/secret/` with test data and a dummy account in `out/user/`.
    Generate { batch_count: usize, accounts_per_batch: usize },
    /// Generates proofs using the secret data in `out/secret/`.
    Prove { batch_count: usize },
    /// Verifies proofs using the public data in `out/public/` and the user data in `out/user/`.
    Verify { batch_count: usize },
    /// O(log N) path verification against four explicit proof files.
    Userverify {
        user_account: String,
        bottom_level_proof: String,
        mid_level_proof: String,
        top_level_proof: String,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let layout = Layout::new(cli.out_dir.clone());

    match cli.command {
        Command::Generate { batch_count, accounts_per_batch } => {
            run_generate(&layout, batch_count, accounts_per_batch)
        }
        Command::Prove { batch_count } => run_prove(&layout, batch_count),
        Command::Verify { batch_count } => run_verify(&layout, batch_count),
        Command::Userverify { user_account, bottom_level_proof, mid_level_proof, top_level_proof } => {
            run_userverify(&user_account, &bottom_level_proof, &mid_level_proof, &top_level_proof)
        }
    }
}

/// Mirrors `writeTestDataToFile`: note the Go source's `lastAccount` is reassigned every
/// iteration with no early exit, so the `out/user/test_account.json` convenience file ends
/// up holding the first account of the *last* generated batch, not the first.
fn run_generate(layout: &Layout, batch_count: usize, accounts_per_batch: usize) -> Result<()> {
    if batch_count == 0 {
        bail!("batchCount must be at least 1");
    }
    let mut last_batch_first_account_balance = None;

    for i in 0..batch_count {
        let seed = (i + 11) as i64;
        let batch = testdata::generate_batch(accounts_per_batch, seed);
        let merkle_root = por_circuit::account::merkle_root_from_accounts(&batch.accounts);
        let synthetic = por_circuit::account::Account::synthetic(merkle_root, batch.asset_sum);
        let commitment = por_circuit::account::hash_account(&synthetic);

        let json_accounts: Vec<JsonAccount> = batch
            .accounts
            .iter()
            .map(|a| JsonAccount::from_account_bytes(b"foo", a.balance))
            .collect();

        let elements = JsonProofElements {
            accounts: json_accounts,
            asset_sum: Some(JsonBalance::from_balance(batch.asset_sum)),
            merkle_root: Some(JsonCompletedProof::encode_digest(merkle_root)),
            merkle_root_with_asset_sum_hash: Some(JsonCompletedProof::encode_digest(commitment)),
        };
        persistence::write_secret_batch(&layout.secret_batch_path(i), &elements)
            .with_context(|| format!("writing secret batch {i}"))?;

        if let Some(first) = batch.accounts.first() {
            last_batch_first_account_balance = Some(first.balance);
        }
        log::info!("generated batch {i} ({accounts_per_batch} accounts)");
    }

    let last_balance =
        last_batch_first_account_balance.context("generated batch had zero accounts")?;
    let user_account = JsonAccount::from_account_bytes(b"foo", last_balance);
    persistence::write_json(&layout.user_account_path(), &user_account)
        .context("writing out/user/test_account.json")?;

    Ok(())
}

fn run_prove(layout: &Layout, batch_count: usize) -> Result<()> {
    if batch_count == 0 {
        bail!("batchCount must be at least 1");
    }
    let mut batches = Vec::with_capacity(batch_count);
    for i in 0..batch_count {
        let elements: JsonProofElements = persistence::read_secret_batch(&layout.secret_batch_path(i))
            .with_context(|| format!("reading secret batch {i}"))?;
        let asset_sum = elements
            .asset_sum
            .context("secret batch is missing assetSum")?
            .to_balance()?;
        let accounts = elements
            .accounts
            .iter()
            .map(|a| a.to_account())
            .collect::<Result<Vec<_>, _>>()?;
        batches.push(BatchInput { accounts, asset_sum });
    }

    let registry = SetupRegistry::new();
    let output = pipeline::run(batches, &registry).context("pipeline failed")?;

    for (i, proof) in output.bottom.iter().enumerate() {
        persistence::write_public_proof(&layout.bottom_proof_path(i), proof, false)
            .with_context(|| format!("writing bottom proof {i}"))?;
    }
    for (j, proof) in output.mid.iter().enumerate() {
        persistence::write_public_proof(&layout.mid_proof_path(j), proof, false)
            .with_context(|| format!("writing mid proof {j}"))?;
    }
    persistence::write_public_proof(&layout.top_proof_path(), &output.top, true)
        .context("writing top proof")?;

    log::info!(
        "prove complete: {} bottom, {} mid, 1 top proof",
        output.bottom.len(),
        output.mid.len()
    );
    Ok(())
}

fn run_verify(layout: &Layout, batch_count: usize) -> Result<()> {
    let bottom = (0..batch_count)
        .map(|i| persistence::read_public_proof(&layout.bottom_proof_path(i)))
        .collect::<Result<Vec<_>, _>>()?;

    let mid_groups = pipeline::partition_ranges(bottom.len(), por_circuit::FAN_IN)?;
    let mid = (0..mid_groups.len())
        .map(|j| persistence::read_public_proof(&layout.mid_proof_path(j)))
        .collect::<Result<Vec<_>, _>>()?;

    let top = persistence::read_public_proof(&layout.top_proof_path())?;

    verifier::verify_full(&bottom, &mid, &top)?;

    let user_json: JsonAccount = persistence::read_json(&layout.user_account_path())?;
    let user_account = user_json.to_account()?;
    let account_hash = por_circuit::account::hash_account(&user_account);
    verifier::verify_inclusion_any(account_hash, &bottom)?;

    println!("Verification succeeded!");
    Ok(())
}

fn run_userverify(
    user_account_path: &str,
    bottom_path: &str,
    mid_path: &str,
    top_path: &str,
) -> Result<()> {
    let user_json: JsonAccount = persistence::read_json(std::path::Path::new(user_account_path))?;
    let account = user_json.to_account()?;
    let bottom = persistence::read_public_proof(std::path::Path::new(bottom_path))?;
    let mid = persistence::read_public_proof(std::path::Path::new(mid_path))?;
    let top = persistence::read_public_proof(std::path::Path::new(top_path))?;

    verifier::verify_user_path(&account, &bottom, &mid, &top)?;

    println!("Verification path succeeded!");
    Ok(())
}
