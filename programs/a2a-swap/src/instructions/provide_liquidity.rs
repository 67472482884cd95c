use serde::Serialize;
use tracing::debug;

use crate::{
    error::{AmmError, Result},
    math::{isqrt, mul_div, mul_div_ceil},
    state::{Pool, Position},
};

use super::claim_fees::sync_position;

/// Amounts a deposit actually took and the shares it minted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Deposit {
    pub accepted_a: u64,
    pub accepted_b: u64,
    pub minted_shares: u64,
}

/// Add reserves and mint LP shares against the pool alone.
///
/// First deposit: both amounts required, `minted = isqrt(a × b)`; the
/// depositor sets the price.
/// Later deposits: `amount_b` is ignored and recomputed as
/// `ceil(a × reserve_b / reserve_a)` so the pool is never under-funded;
/// `minted = floor(a × lp_supply / reserve_a)`.
pub fn deposit(pool: &mut Pool, amount_a: u64, amount_b: Option<u64>) -> Result<Deposit> {
    pool.ensure_active()?;
    if amount_a == 0 {
        return Err(AmmError::ZeroAmount);
    }

    let (accepted_b, minted_shares) = if pool.lp_supply == 0 {
        let b = amount_b.ok_or(AmmError::MissingInitialAmount)?;
        if b == 0 {
            return Err(AmmError::ZeroAmount);
        }
        // sqrt of a u64 × u64 product always fits in u64
        let minted = isqrt(amount_a as u128 * b as u128) as u64;
        (b, minted)
    } else {
        if pool.reserve_a == 0 || pool.reserve_b == 0 {
            return Err(AmmError::EmptyPool);
        }
        let b = mul_div_ceil(amount_a, pool.reserve_b, pool.reserve_a)?;
        let minted = mul_div(amount_a, pool.lp_supply, pool.reserve_a)?;
        (b, minted)
    };
    if minted_shares == 0 {
        return Err(AmmError::ZeroAmount);
    }

    let reserve_a = pool.reserve_a.checked_add(amount_a).ok_or(AmmError::Overflow)?;
    let reserve_b = pool.reserve_b.checked_add(accepted_b).ok_or(AmmError::Overflow)?;
    let lp_supply = pool.lp_supply.checked_add(minted_shares).ok_or(AmmError::Overflow)?;

    pool.reserve_a = reserve_a;
    pool.reserve_b = reserve_b;
    pool.lp_supply = lp_supply;

    Ok(Deposit { accepted_a: amount_a, accepted_b, minted_shares })
}

/// Deposit on behalf of a position and credit it the minted shares.
///
/// Fees are synced before the share balance changes. The position's
/// compounding preferences are replaced by the ones passed here.
pub fn provide_liquidity(
    pool: &mut Pool,
    position: &mut Position,
    amount_a: u64,
    amount_b: Option<u64>,
    min_lp: u64,
    auto_compound: bool,
    compound_threshold: u64,
) -> Result<Deposit> {
    let mut next_pool = pool.clone();
    let mut next_position = position.clone();

    sync_position(&next_pool, &mut next_position)?;
    let minted = deposit(&mut next_pool, amount_a, amount_b)?;
    if minted.minted_shares < min_lp {
        return Err(AmmError::SlippageExceeded {
            actual: minted.minted_shares,
            minimum: min_lp,
        });
    }

    next_position.lp_shares = next_position
        .lp_shares
        .checked_add(minted.minted_shares)
        .ok_or(AmmError::Overflow)?;
    next_position.auto_compound = auto_compound;
    next_position.compound_threshold = compound_threshold;

    *pool = next_pool;
    *position = next_position;

    debug!(
        lp = minted.minted_shares,
        a = minted.accepted_a,
        b = minted.accepted_b,
        auto_compound,
        "liquidity provided"
    );
    Ok(minted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instructions::initialize_pool;
    use solana_sdk::pubkey::Pubkey;

    fn empty_pool() -> Pool {
        initialize_pool(Pubkey::new_unique(), Pubkey::new_unique(), 30, 0).unwrap()
    }

    #[test]
    fn first_deposit_mints_geometric_mean() {
        let mut pool = empty_pool();
        let d = deposit(&mut pool, 1_000_000_000, Some(2_000_000_000)).unwrap();
        assert_eq!(d.minted_shares, 1_414_213_562);
        assert_eq!(pool.lp_supply, 1_414_213_562);
        assert_eq!((pool.reserve_a, pool.reserve_b), (1_000_000_000, 2_000_000_000));
    }

    #[test]
    fn first_deposit_requires_amount_b() {
        let mut pool = empty_pool();
        assert_eq!(deposit(&mut pool, 1_000, None), Err(AmmError::MissingInitialAmount));
        assert_eq!(deposit(&mut pool, 1_000, Some(0)), Err(AmmError::ZeroAmount));
        assert_eq!(deposit(&mut pool, 0, Some(1_000)), Err(AmmError::ZeroAmount));
        assert!(pool.is_empty());
    }

    #[test]
    fn later_deposit_ignores_amount_b_and_rounds_b_up() {
        let mut pool = empty_pool();
        deposit(&mut pool, 3_000, Some(7_000)).unwrap();
        let supply = pool.lp_supply;

        let d = deposit(&mut pool, 1_000, Some(1)).unwrap();
        // 1000 × 7000 / 3000 = 2333.33…
        assert_eq!(d.accepted_b, 2_334);
        assert_eq!(d.minted_shares, 1_000 * supply / 3_000);
        assert_eq!(pool.reserve_b, 9_334);
    }

    #[test]
    fn deposit_too_small_to_mint_is_refused() {
        let mut pool = empty_pool();
        deposit(&mut pool, 1_000_000, Some(1)).unwrap();
        // one share is worth ~1000 units of A
        let before = pool.clone();
        assert_eq!(deposit(&mut pool, 10, None), Err(AmmError::ZeroAmount));
        assert_eq!(pool, before);
    }

    #[test]
    fn provide_credits_position_and_checks_min_lp() {
        let mut pool = empty_pool();
        let mut pos = Position::open(Pubkey::new_unique(), Pubkey::new_unique(), &pool);

        let d = provide_liquidity(&mut pool, &mut pos, 4_000, Some(9_000), 0, true, 25).unwrap();
        assert_eq!(d.minted_shares, 6_000);
        assert_eq!(pos.lp_shares, 6_000);
        assert!(pos.auto_compound);
        assert_eq!(pos.compound_threshold, 25);

        let before = (pool.clone(), pos.clone());
        let err = provide_liquidity(&mut pool, &mut pos, 400, None, 10_000, false, 0).unwrap_err();
        assert_eq!(err, AmmError::SlippageExceeded { actual: 600, minimum: 10_000 });
        assert_eq!((pool, pos), before);
    }
}
