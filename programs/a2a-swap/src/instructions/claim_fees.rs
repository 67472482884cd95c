use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    error::{AmmError, Result},
    math::{mul_div, mul_q64_carry},
    state::{Pool, Position},
};

use super::provide_liquidity::{deposit, Deposit};

// ─── Fee accrual ───────────────────────────────────────────────────────────
// Call before any change to position.lp_shares.

/// Fees earned since the position's last checkpoint, without moving it,
/// together with the sub-unit remainders to carry forward.
fn accrued_since_checkpoint(pool: &Pool, position: &Position) -> Result<((u64, u64), (u64, u64))> {
    let delta_a = pool
        .fee_per_share_a
        .checked_sub(position.fee_debt_a)
        .ok_or(AmmError::AccumulatorInvariantViolated)?;
    let delta_b = pool
        .fee_per_share_b
        .checked_sub(position.fee_debt_b)
        .ok_or(AmmError::AccumulatorInvariantViolated)?;
    // pending += (lp_shares × delta + dust) >> 64  (Q64.64 → integer)
    let (fees_a, dust_a) = mul_q64_carry(position.lp_shares, delta_a, position.fee_dust_a)?;
    let (fees_b, dust_b) = mul_q64_carry(position.lp_shares, delta_b, position.fee_dust_b)?;
    Ok(((fees_a, fees_b), (dust_a, dust_b)))
}

/// Move newly accrued fees into the position's pending balance and advance
/// its checkpoint to the pool's accumulators. Returns what was accrued.
///
/// The fraction of a unit that does not yet make a whole token is kept in
/// the position's dust, so small positions still earn across many syncs.
pub fn sync_position(pool: &Pool, position: &mut Position) -> Result<(u64, u64)> {
    let ((fees_a, fees_b), (dust_a, dust_b)) = accrued_since_checkpoint(pool, position)?;
    let pending_a = position.pending_a.checked_add(fees_a).ok_or(AmmError::Overflow)?;
    let pending_b = position.pending_b.checked_add(fees_b).ok_or(AmmError::Overflow)?;

    position.pending_a = pending_a;
    position.pending_b = pending_b;
    position.fee_dust_a = dust_a;
    position.fee_dust_b = dust_b;
    position.fee_debt_a = pool.fee_per_share_a;
    position.fee_debt_b = pool.fee_per_share_b;
    Ok((fees_a, fees_b))
}

/// Dry-run of `sync_position`: pending plus not-yet-synced fees.
pub fn preview_fees(pool: &Pool, position: &Position) -> Result<(u64, u64)> {
    let ((fees_a, fees_b), _) = accrued_since_checkpoint(pool, position)?;
    Ok((
        position.pending_a.checked_add(fees_a).ok_or(AmmError::Overflow)?,
        position.pending_b.checked_add(fees_b).ok_or(AmmError::Overflow)?,
    ))
}

// ─── Claim ─────────────────────────────────────────────────────────────────

/// Result of a claim that had something to claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeeClaim {
    /// Total pending fees settled by this claim.
    pub fees_a: u64,
    pub fees_b: u64,
    /// Portion transferred out to the owner.
    pub paid_a: u64,
    pub paid_b: u64,
    /// Set when fees were reinvested as LP shares.
    pub compounded: Option<Deposit>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// Both pending balances were zero; nothing moved.
    NoFeesToClaim,
    Claimed(FeeClaim),
}

/// Settle a position's pending fees.
///
/// With auto-compound off, or below the compound threshold, the fees are
/// paid out of the fee vault. With auto-compound on, the largest
/// reserve-ratio-matched slice of the fee pair is deposited through
/// [`deposit`] and credited as shares; the unmatched remainder is paid out.
/// When compounding would mint nothing the whole balance is paid out instead
/// so fees are never stranded.
pub fn claim(pool: &mut Pool, position: &mut Position) -> Result<ClaimOutcome> {
    pool.ensure_active()?;
    let mut next_pool = pool.clone();
    let mut next_position = position.clone();
    sync_position(&next_pool, &mut next_position)?;

    let fees_a = next_position.pending_a;
    let fees_b = next_position.pending_b;
    if fees_a == 0 && fees_b == 0 {
        *position = next_position;
        debug!("no fees to claim");
        return Ok(ClaimOutcome::NoFeesToClaim);
    }

    let total = fees_a.saturating_add(fees_b);
    let wants_compound = next_position.auto_compound
        && total >= next_position.compound_threshold
        && next_pool.lp_supply > 0;

    let compounded = if wants_compound {
        match compound(&mut next_pool, fees_a, fees_b) {
            Ok(d) => Some(d),
            Err(AmmError::ZeroAmount | AmmError::EmptyPool) => {
                debug!(fees_a, fees_b, "compound would mint 0 LP shares; paying out instead");
                None
            }
            Err(e) => return Err(e),
        }
    } else {
        None
    };

    let (paid_a, paid_b) = match compounded {
        Some(d) => {
            next_position.lp_shares = next_position
                .lp_shares
                .checked_add(d.minted_shares)
                .ok_or(AmmError::Overflow)?;
            (fees_a - d.accepted_a, fees_b - d.accepted_b)
        }
        None => (fees_a, fees_b),
    };

    // Every settled unit leaves the fee vault: into reserves or out to the owner.
    next_pool.fee_vault_a = next_pool.fee_vault_a.checked_sub(fees_a).ok_or_else(|| {
        warn!(fees_a, vault = next_pool.fee_vault_a, "fee vault A underfunded");
        AmmError::AccumulatorInvariantViolated
    })?;
    next_pool.fee_vault_b = next_pool.fee_vault_b.checked_sub(fees_b).ok_or_else(|| {
        warn!(fees_b, vault = next_pool.fee_vault_b, "fee vault B underfunded");
        AmmError::AccumulatorInvariantViolated
    })?;
    next_position.pending_a = 0;
    next_position.pending_b = 0;

    *pool = next_pool;
    *position = next_position;

    debug!(fees_a, fees_b, paid_a, paid_b, compounded = compounded.is_some(), "fees claimed");
    Ok(ClaimOutcome::Claimed(FeeClaim { fees_a, fees_b, paid_a, paid_b, compounded }))
}

/// Deposit the reserve-ratio-matched part of `(fees_a, fees_b)`.
///
/// `amount_a = min(fees_a, floor(fees_b × reserve_a / reserve_b))`, which
/// keeps the ceiling-rounded `accepted_b` within `fees_b`.
fn compound(pool: &mut Pool, fees_a: u64, fees_b: u64) -> Result<Deposit> {
    if pool.reserve_a == 0 || pool.reserve_b == 0 {
        return Err(AmmError::EmptyPool);
    }
    let a_for_b = mul_div(fees_b, pool.reserve_a, pool.reserve_b)?;
    deposit(pool, fees_a.min(a_for_b), None)
}
