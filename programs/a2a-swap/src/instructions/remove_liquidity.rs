use serde::Serialize;
use tracing::debug;

use crate::{
    error::{AmmError, Result},
    math::mul_div,
    state::{Pool, Position},
};

use super::claim_fees::sync_position;

/// Reserves released by burning shares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Withdrawal {
    pub amount_a: u64,
    pub amount_b: u64,
}

/// Burn `shares` against the pool alone and release the proportional
/// reserves, rounded down. Requires `0 < shares <= lp_supply`.
pub fn withdraw(pool: &mut Pool, shares: u64) -> Result<Withdrawal> {
    pool.ensure_active()?;
    if shares == 0 || shares > pool.lp_supply {
        return Err(AmmError::InsufficientShares {
            requested: shares,
            available: pool.lp_supply,
        });
    }

    let amount_a = mul_div(shares, pool.reserve_a, pool.lp_supply)?;
    let amount_b = mul_div(shares, pool.reserve_b, pool.lp_supply)?;

    pool.reserve_a -= amount_a;
    pool.reserve_b -= amount_b;
    pool.lp_supply -= shares;

    Ok(Withdrawal { amount_a, amount_b })
}

/// Burn a position's shares and withdraw proportional reserves.
/// Fees are synced first; auto-compound does NOT trigger here (call `claim`).
pub fn remove_liquidity(
    pool: &mut Pool,
    position: &mut Position,
    shares: u64,
    min_a: u64,
    min_b: u64,
) -> Result<Withdrawal> {
    if shares == 0 || shares > position.lp_shares {
        return Err(AmmError::InsufficientShares {
            requested: shares,
            available: position.lp_shares,
        });
    }

    let mut next_pool = pool.clone();
    let mut next_position = position.clone();

    sync_position(&next_pool, &mut next_position)?;
    let out = withdraw(&mut next_pool, shares)?;
    if out.amount_a < min_a {
        return Err(AmmError::SlippageExceeded { actual: out.amount_a, minimum: min_a });
    }
    if out.amount_b < min_b {
        return Err(AmmError::SlippageExceeded { actual: out.amount_b, minimum: min_b });
    }
    next_position.lp_shares -= shares;

    *pool = next_pool;
    *position = next_position;

    debug!(lp = shares, a = out.amount_a, b = out.amount_b, "liquidity removed");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instructions::{apply_swap, initialize_pool, provide_liquidity};
    use solana_sdk::pubkey::Pubkey;

    fn seeded() -> (Pool, Position) {
        let mut pool = initialize_pool(Pubkey::new_unique(), Pubkey::new_unique(), 30, 5).unwrap();
        let mut pos = Position::open(Pubkey::new_unique(), Pubkey::new_unique(), &pool);
        provide_liquidity(&mut pool, &mut pos, 4_000_000, Some(9_000_000), 0, false, 0).unwrap();
        (pool, pos)
    }

    #[test]
    fn withdraw_is_proportional_and_floors() {
        let (mut pool, _) = seeded();
        // 6_000_000 shares over 4e6 / 9e6
        let out = withdraw(&mut pool, 1_000_001).unwrap();
        assert_eq!(out.amount_a, 666_667);
        assert_eq!(out.amount_b, 1_500_001);
        assert_eq!(pool.lp_supply, 4_999_999);
        assert_eq!(pool.reserve_a, 4_000_000 - 666_667);
    }

    #[test]
    fn withdraw_rejects_zero_and_excess() {
        let (mut pool, _) = seeded();
        assert_eq!(
            withdraw(&mut pool, 0),
            Err(AmmError::InsufficientShares { requested: 0, available: 6_000_000 })
        );
        assert_eq!(
            withdraw(&mut pool, 6_000_001),
            Err(AmmError::InsufficientShares { requested: 6_000_001, available: 6_000_000 })
        );
    }

    #[test]
    fn full_exit_empties_the_pool() {
        let (mut pool, mut pos) = seeded();
        let out = remove_liquidity(&mut pool, &mut pos, 6_000_000, 4_000_000, 9_000_000).unwrap();
        assert_eq!((out.amount_a, out.amount_b), (4_000_000, 9_000_000));
        assert!(pool.is_empty());
        assert_eq!((pool.reserve_a, pool.reserve_b), (0, 0));
        assert!(pos.is_closed());
    }

    #[test]
    fn position_cannot_burn_more_than_it_holds() {
        let (mut pool, mut pos) = seeded();
        let mut other = Position::open(Pubkey::new_unique(), pos.pool, &pool);
        provide_liquidity(&mut pool, &mut other, 1_000_000, None, 0, false, 0).unwrap();

        let err = remove_liquidity(&mut pool, &mut pos, 6_000_001, 0, 0).unwrap_err();
        assert_eq!(err, AmmError::InsufficientShares { requested: 6_000_001, available: 6_000_000 });
    }

    #[test]
    fn removing_zero_shares_reports_the_position_balance() {
        let (mut pool, mut pos) = seeded();
        let mut other = Position::open(Pubkey::new_unique(), pos.pool, &pool);
        provide_liquidity(&mut pool, &mut other, 1_000_000, None, 0, false, 0).unwrap();
        let before = (pool.clone(), pos.clone());

        let err = remove_liquidity(&mut pool, &mut pos, 0, 0, 0).unwrap_err();
        assert_eq!(err, AmmError::InsufficientShares { requested: 0, available: 6_000_000 });
        assert_eq!((pool, pos), before);
    }

    #[test]
    fn min_guards_leave_state_untouched() {
        let (mut pool, mut pos) = seeded();
        let before = (pool.clone(), pos.clone());
        let err = remove_liquidity(&mut pool, &mut pos, 600_000, 400_001, 0).unwrap_err();
        assert_eq!(err, AmmError::SlippageExceeded { actual: 400_000, minimum: 400_001 });
        let err = remove_liquidity(&mut pool, &mut pos, 600_000, 0, 900_001).unwrap_err();
        assert_eq!(err, AmmError::SlippageExceeded { actual: 900_000, minimum: 900_001 });
        assert_eq!((pool, pos), before);
    }

    #[test]
    fn removal_syncs_fees_without_paying_them() {
        let (mut pool, mut pos) = seeded();
        let mint_a = pool.mint_a;
        apply_swap(&mut pool, &mint_a, 1_000_000, 0).unwrap();
        let vault = pool.fee_vault_a;

        remove_liquidity(&mut pool, &mut pos, 3_000_000, 0, 0).unwrap();
        assert!(pos.pending_a > 0);
        assert_eq!(pool.fee_vault_a, vault);
        assert_eq!(pos.fee_debt_a, pool.fee_per_share_a);
    }
}
