//! Synthetic account generation for the `generate` CLI command, mirroring
//! `examples/original_source/circuit/utils.go`'s `GenerateTestData` exactly (including its
//! quirky `userId = "foo"` for every account — a test fixture, not a real identity scheme).

use por_circuit::account::{self, Account, Balance};
use por_circuit::Fr;

/// One batch of synthetic accounts plus its declared asset sum, seeded the same way
/// `core/generator.go`'s `writeTestDataToFile` seeds batch `i` with `i + 11`.
pub struct GeneratedBatch {
    pub accounts: Vec<Account>,
    pub asset_sum: Balance,
}

/// `GenerateTestData(count, seed)`: `iWithSeed = (i + seed) * (seed + 1)`,
/// `btc_i = 46 * iWithSeed + 39`, `eth_i = 3 * iWithSeed + 1001`.
pub fn generate_batch(count_per_batch: usize, seed: i64) -> GeneratedBatch {
    let accounts: Vec<Account> = (0..count_per_batch as i64)
        .map(|i| {
            let i_with_seed = (i + seed) * (seed + 1);
            let btc = 46 * i_with_seed + 39;
            let eth = 3 * i_with_seed + 1001;
            Account::new(b"foo", Balance { bitcoin: Fr::from(btc as u64), ethereum: Fr::from(eth as u64) })
        })
        .collect();
    let asset_sum = account::sum_balances(&accounts);
    GeneratedBatch { accounts, asset_sum }
}
