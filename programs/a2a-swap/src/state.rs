use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::error::{AmmError, Result};

// ─── Pool ──────────────────────────────────────────────────────────────────
// Constant-product pool (x * y = k).
// The pool is the only authority over reserves and fee accumulators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    #[serde(with = "b58")]
    pub mint_a: Pubkey,
    #[serde(with = "b58")]
    pub mint_b: Pubkey,
    pub reserve_a: u64,
    pub reserve_b: u64,
    /// Total LP shares outstanding (tracked in Pool, not via a mint)
    pub lp_supply: u64,
    /// Total swap fee in basis points, protocol cut included (e.g. 30 = 0.30 %)
    pub fee_rate_bps: u16,
    /// Part of `fee_rate_bps` paid into the claimable per-share stream
    pub claim_fee_bps: u16,
    /// Cumulative claim fee earned per LP share, Q64.64 fixed-point
    pub fee_per_share_a: u128,
    pub fee_per_share_b: u128,
    /// Claim-stream tokens held outside the reserves until positions claim them
    pub fee_vault_a: u64,
    pub fee_vault_b: u64,
    /// Cumulative protocol fee routed to the treasury
    pub protocol_fees_a: u64,
    pub protocol_fees_b: u64,
    /// Set once an accounting fault is detected; blocks every mutation
    #[serde(default)]
    pub halted: bool,
}

impl Pool {
    /// `true` when `mint` is this pool's token A, `false` for token B.
    pub fn is_token_a(&self, mint: &Pubkey) -> Result<bool> {
        if *mint == self.mint_a {
            Ok(true)
        } else if *mint == self.mint_b {
            Ok(false)
        } else {
            Err(AmmError::UnknownMint(*mint))
        }
    }

    /// `(reserve_in, reserve_out)` for a swap direction.
    pub fn reserves(&self, a_to_b: bool) -> (u64, u64) {
        if a_to_b {
            (self.reserve_a, self.reserve_b)
        } else {
            (self.reserve_b, self.reserve_a)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lp_supply == 0
    }

    pub fn ensure_active(&self) -> Result<()> {
        if self.halted {
            return Err(AmmError::PoolHalted);
        }
        Ok(())
    }

    /// `reserve_a * reserve_b`, the constant-product invariant.
    pub fn k(&self) -> u128 {
        self.reserve_a as u128 * self.reserve_b as u128
    }
}

// ─── Position ──────────────────────────────────────────────────────────────
// Tracks one owner's LP contribution in a single pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    #[serde(with = "b58")]
    pub owner: Pubkey,
    #[serde(with = "b58")]
    pub pool: Pubkey,
    /// LP shares this position holds
    pub lp_shares: u64,
    /// Fee-per-share snapshots at last sync
    pub fee_debt_a: u128,
    pub fee_debt_b: u128,
    /// Accrued but unclaimed fee tokens
    pub pending_a: u64,
    pub pending_b: u64,
    /// Sub-unit fee remainders (Q64.64 fraction of one token unit) carried
    /// into the next sync
    #[serde(default)]
    pub fee_dust_a: u64,
    #[serde(default)]
    pub fee_dust_b: u64,
    /// Reinvest fees into LP shares instead of paying them out
    pub auto_compound: bool,
    /// Minimum total fee (token_a + token_b in atomic units) to trigger compound
    pub compound_threshold: u64,
}

impl Position {
    /// Fresh position checkpointed at the pool's current accumulators, so it
    /// earns nothing that accrued before it existed.
    pub fn open(owner: Pubkey, pool_address: Pubkey, pool: &Pool) -> Self {
        Self {
            owner,
            pool: pool_address,
            lp_shares: 0,
            fee_debt_a: pool.fee_per_share_a,
            fee_debt_b: pool.fee_per_share_b,
            pending_a: 0,
            pending_b: 0,
            fee_dust_a: 0,
            fee_dust_b: 0,
            auto_compound: false,
            compound_threshold: 0,
        }
    }

    /// Zero shares and nothing left to claim: the position can be dropped.
    pub fn is_closed(&self) -> bool {
        self.lp_shares == 0 && self.pending_a == 0 && self.pending_b == 0
    }
}

/// Base-58 string encoding for `Pubkey` fields.
pub mod b58 {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use solana_sdk::pubkey::Pubkey;
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(key: &Pubkey, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&key.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Pubkey, D::Error> {
        let raw = String::deserialize(d)?;
        Pubkey::from_str(&raw).map_err(D::Error::custom)
    }
}
