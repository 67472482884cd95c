//! Read-only views over pools and positions.
//!
//! Nothing here mutates state. Fee figures come from [`preview_fees`], so a
//! report never advances a position's checkpoint.

use serde::Serialize;
use solana_sdk::pubkey::Pubkey;

use crate::{
    error::{AmmError, Result},
    instructions::preview_fees,
    math::mul_div,
    state::{b58, Pool, Position},
};

// ─── Pool ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolSummary {
    #[serde(with = "b58")]
    pub mint_a: Pubkey,
    #[serde(with = "b58")]
    pub mint_b: Pubkey,
    pub reserve_a: u64,
    pub reserve_b: u64,
    pub lp_supply: u64,
    pub fee_rate_bps: u16,
    pub claim_fee_bps: u16,
    /// Token B per token A (raw units); 0.0 while the pool is empty.
    pub spot_price: f64,
}

pub fn pool_info(pool: &Pool) -> PoolSummary {
    let spot_price = if pool.reserve_a > 0 {
        pool.reserve_b as f64 / pool.reserve_a as f64
    } else {
        0.0
    };
    PoolSummary {
        mint_a: pool.mint_a,
        mint_b: pool.mint_b,
        reserve_a: pool.reserve_a,
        reserve_b: pool.reserve_b,
        lp_supply: pool.lp_supply,
        fee_rate_bps: pool.fee_rate_bps,
        claim_fee_bps: pool.claim_fee_bps,
        spot_price,
    }
}

// ─── Owner index ───────────────────────────────────────────────────────────

/// Where a position lives: its own address and the pool it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PositionId {
    pub address: Pubkey,
    pub pool: Pubkey,
    pub owner: Pubkey,
}

/// Owner → positions lookup supplied by whatever stores the state.
///
/// `snapshot` must return the pool and position as of one consistent
/// moment; `None` means the position disappeared since `positions_for`.
pub trait PositionIndex {
    fn positions_for(&self, owner: &Pubkey) -> Vec<PositionId>;
    fn snapshot(&self, id: &PositionId) -> Option<(Pool, Position)>;
}

// ─── Fees ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionFees {
    #[serde(with = "b58")]
    pub address: Pubkey,
    #[serde(with = "b58")]
    pub pool: Pubkey,
    pub lp_shares: u64,
    pub fees_a: u64,
    pub fees_b: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeeReport {
    pub positions: Vec<PositionFees>,
    /// Sums across pools; only meaningful when every pool shares its pair.
    pub total_fees_a: u64,
    pub total_fees_b: u64,
}

/// Claimable fees for every position `owner` holds.
pub fn my_fees<I: PositionIndex + ?Sized>(owner: &Pubkey, index: &I) -> Result<FeeReport> {
    let mut report = FeeReport::default();
    for id in index.positions_for(owner) {
        let Some((pool, position)) = index.snapshot(&id) else {
            continue;
        };
        let (fees_a, fees_b) = preview_fees(&pool, &position)?;
        report.total_fees_a = report.total_fees_a.checked_add(fees_a).ok_or(AmmError::Overflow)?;
        report.total_fees_b = report.total_fees_b.checked_add(fees_b).ok_or(AmmError::Overflow)?;
        report.positions.push(PositionFees {
            address: id.address,
            pool: id.pool,
            lp_shares: position.lp_shares,
            fees_a,
            fees_b,
        });
    }
    Ok(report)
}

// ─── Positions ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionSummary {
    #[serde(with = "b58")]
    pub address: Pubkey,
    #[serde(with = "b58")]
    pub pool: Pubkey,
    #[serde(with = "b58")]
    pub mint_a: Pubkey,
    #[serde(with = "b58")]
    pub mint_b: Pubkey,
    pub lp_shares: u64,
    /// Share of the pool's LP supply, in percent.
    pub pool_share_pct: f64,
    /// Reserves the shares would redeem for right now (floored).
    pub value_a: u64,
    pub value_b: u64,
    pub fees_a: u64,
    pub fees_b: u64,
    pub auto_compound: bool,
    pub compound_threshold: u64,
}

pub fn my_positions<I: PositionIndex + ?Sized>(
    owner: &Pubkey,
    index: &I,
) -> Result<Vec<PositionSummary>> {
    let mut out = Vec::new();
    for id in index.positions_for(owner) {
        let Some((pool, position)) = index.snapshot(&id) else {
            continue;
        };
        let (fees_a, fees_b) = preview_fees(&pool, &position)?;
        let (value_a, value_b, pool_share_pct) = if pool.lp_supply > 0 {
            (
                mul_div(position.lp_shares, pool.reserve_a, pool.lp_supply)?,
                mul_div(position.lp_shares, pool.reserve_b, pool.lp_supply)?,
                100.0 * position.lp_shares as f64 / pool.lp_supply as f64,
            )
        } else {
            (0, 0, 0.0)
        };
        out.push(PositionSummary {
            address: id.address,
            pool: id.pool,
            mint_a: pool.mint_a,
            mint_b: pool.mint_b,
            lp_shares: position.lp_shares,
            pool_share_pct,
            value_a,
            value_b,
            fees_a,
            fees_b,
            auto_compound: position.auto_compound,
            compound_threshold: position.compound_threshold,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instructions::{apply_swap, initialize_pool, provide_liquidity};

    /// Single-pool index backed by plain values.
    struct OnePool {
        address: Pubkey,
        pool: Pool,
        positions: Vec<(Pubkey, Position)>,
    }

    impl PositionIndex for OnePool {
        fn positions_for(&self, owner: &Pubkey) -> Vec<PositionId> {
            self.positions
                .iter()
                .filter(|(_, p)| p.owner == *owner)
                .map(|(address, p)| PositionId { address: *address, pool: self.address, owner: p.owner })
                .collect()
        }

        fn snapshot(&self, id: &PositionId) -> Option<(Pool, Position)> {
            self.positions
                .iter()
                .find(|(address, _)| *address == id.address)
                .map(|(_, p)| (self.pool.clone(), p.clone()))
        }
    }

    fn two_lps() -> (OnePool, Pubkey, Pubkey) {
        let address = Pubkey::new_unique();
        let mut pool = initialize_pool(Pubkey::new_unique(), Pubkey::new_unique(), 30, 10).unwrap();
        let (alice, bob) = (Pubkey::new_unique(), Pubkey::new_unique());
        let mut pa = Position::open(alice, address, &pool);
        let mut pb = Position::open(bob, address, &pool);
        provide_liquidity(&mut pool, &mut pa, 3_000_000, Some(3_000_000), 0, true, 50).unwrap();
        provide_liquidity(&mut pool, &mut pb, 1_000_000, None, 0, false, 0).unwrap();
        let mint_a = pool.mint_a;
        apply_swap(&mut pool, &mint_a, 1_000_000, 0).unwrap();
        let positions = vec![(Pubkey::new_unique(), pa), (Pubkey::new_unique(), pb)];
        (OnePool { address, pool, positions }, alice, bob)
    }

    #[test]
    fn spot_price_is_b_per_a_and_zero_when_empty() {
        let (idx, _, _) = two_lps();
        let s = pool_info(&idx.pool);
        assert_eq!(s.spot_price, idx.pool.reserve_b as f64 / idx.pool.reserve_a as f64);
        // A was sold into the pool, so A got cheaper
        assert!(s.spot_price < 1.0);

        let empty = initialize_pool(Pubkey::new_unique(), Pubkey::new_unique(), 30, 0).unwrap();
        assert_eq!(pool_info(&empty).spot_price, 0.0);
    }

    #[test]
    fn fees_split_by_share_and_do_not_move_checkpoints() {
        let (idx, alice, bob) = two_lps();
        let a = my_fees(&alice, &idx).unwrap();
        let b = my_fees(&bob, &idx).unwrap();
        assert_eq!(a.positions.len(), 1);
        // claim fee is 1000 units of A; 3:1 split, floors only
        assert!(a.total_fees_a >= 749 && a.total_fees_a <= 750);
        assert!(b.total_fees_a >= 249 && b.total_fees_a <= 250);
        assert_eq!((a.total_fees_b, b.total_fees_b), (0, 0));
        assert_eq!(idx.positions[0].1.pending_a, 0);
    }

    #[test]
    fn unknown_owner_has_empty_report() {
        let (idx, _, _) = two_lps();
        let r = my_fees(&Pubkey::new_unique(), &idx).unwrap();
        assert!(r.positions.is_empty());
        assert_eq!((r.total_fees_a, r.total_fees_b), (0, 0));
    }

    #[test]
    fn positions_report_value_and_flags() {
        let (idx, alice, _) = two_lps();
        let list = my_positions(&alice, &idx).unwrap();
        assert_eq!(list.len(), 1);
        let p = &list[0];
        assert_eq!(p.lp_shares, 3_000_000);
        assert!((p.pool_share_pct - 75.0).abs() < 1e-9);
        assert!(p.auto_compound);
        assert_eq!(p.compound_threshold, 50);
        assert_eq!(p.value_a, idx.pool.reserve_a * 3 / 4);
    }
}
