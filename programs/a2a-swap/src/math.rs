//! Deterministic integer math shared by every pool transition.
//!
//! All products of two `u64` operands are taken in `u128`, so only the final
//! narrowing can overflow. Rounding is chosen per call site: floor for amounts
//! leaving the pool, ceiling for amounts the pool must receive.

use crate::constants::{BPS_DENOMINATOR, Q64};
use crate::error::{AmmError, Result};

/// `floor(a * b / denom)`.
pub fn mul_div(a: u64, b: u64, denom: u64) -> Result<u64> {
    if denom == 0 {
        return Err(AmmError::DivisionByZero);
    }
    let q = (a as u128) * (b as u128) / denom as u128;
    u64::try_from(q).map_err(|_| AmmError::Overflow)
}

/// `ceil(a * b / denom)`.
pub fn mul_div_ceil(a: u64, b: u64, denom: u64) -> Result<u64> {
    if denom == 0 {
        return Err(AmmError::DivisionByZero);
    }
    let product = (a as u128) * (b as u128);
    let d = denom as u128;
    let q = product / d + u128::from(product % d != 0);
    u64::try_from(q).map_err(|_| AmmError::Overflow)
}

/// `floor(amount * bps / 10_000)`.
pub fn bps_of(amount: u64, bps: u16) -> Result<u64> {
    mul_div(amount, bps as u64, BPS_DENOMINATOR)
}

/// Integer square root (Babylonian method), floor.
pub fn isqrt(n: u128) -> u128 {
    if n == 0 {
        return 0;
    }
    let mut x = n;
    let mut y = (x >> 1) + (x & 1);
    while y < x {
        x = y;
        y = (y + n / y) >> 1;
    }
    x
}

/// `floor(amount * 2^64 / shares)` as a Q64.64 value.
///
/// Divide-first: `q * Q64 + r * Q64 / shares`, where `q < 2^64` and
/// `r < shares`, so neither term can overflow.
pub fn q64_ratio(amount: u64, shares: u64) -> Result<u128> {
    if shares == 0 {
        return Err(AmmError::DivisionByZero);
    }
    let amount = amount as u128;
    let shares = shares as u128;
    let q = amount / shares;
    let r = amount % shares;
    q.checked_mul(Q64)
        .and_then(|hi| hi.checked_add(r * Q64 / shares))
        .ok_or(AmmError::Overflow)
}

/// `shares * x64 + carry`, split into whole units and a Q64.64 fraction.
///
/// Split into high and low halves so the product is exact even when
/// `shares * x64` would not fit in 128 bits. `carry` is the fraction left over from a previous call, so repeated
/// accruals lose nothing to rounding until the units are credited.
pub fn mul_q64_carry(shares: u64, x64: u128, carry: u64) -> Result<(u64, u64)> {
    let s = shares as u128;
    let hi = x64 >> 64;
    let lo = x64 & (Q64 - 1);
    let whole = s.checked_mul(hi).ok_or(AmmError::Overflow)?;
    let low_product = s * lo;
    let frac = (low_product & (Q64 - 1)) + carry as u128;
    let units = (low_product >> 64) + (frac >> 64);
    let total = whole.checked_add(units).ok_or(AmmError::Overflow)?;
    let total = u64::try_from(total).map_err(|_| AmmError::Overflow)?;
    Ok((total, (frac & (Q64 - 1)) as u64))
}
