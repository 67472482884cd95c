use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use tracing::debug;

use crate::{
    constants::SLIPPAGE_DENOMINATOR,
    error::{AmmError, Result},
    math::{mul_div, q64_ratio},
    state::Pool,
};

use super::fee_math::{quote_swap, SwapQuote};

/// What a committed swap did to the pool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwapReceipt {
    #[serde(flatten)]
    pub quote: SwapQuote,
    /// Floor the realized output was checked against.
    pub min_out: u64,
    /// Q64.64 amount added to the input token's fee-per-share accumulator.
    pub fee_per_share_delta: u128,
}

/// Core constant-product swap: x * y = k.
///
/// Fee split on every swap (all taken from amount_in):
///   - protocol fee (2 bps): recorded for the treasury, leaves the pool
///   - claim fee (claim_fee_bps): into the fee vault, credited per LP share
///   - LP fee (the rest of fee_rate_bps): stays in the input reserve, grows k
///
/// Re-derives the quote against the live reserves and refuses with
/// `InsufficientOutput` when the output falls below `min_out`.
pub fn apply_swap(
    pool: &mut Pool,
    mint_in: &Pubkey,
    amount_in: u64,
    min_out: u64,
) -> Result<SwapReceipt> {
    pool.ensure_active()?;
    let quote = quote_swap(pool, mint_in, amount_in)?;
    if quote.amount_out == 0 || quote.amount_out < min_out {
        return Err(AmmError::InsufficientOutput {
            amount_out: quote.amount_out,
            min_out,
        });
    }

    let new_reserve_in = quote
        .reserve_in
        .checked_add(quote.net_in)
        .and_then(|r| r.checked_add(quote.lp_fee))
        .ok_or(AmmError::Overflow)?;
    // amount_out < reserve_out: net_in / (reserve_in + net_in) < 1
    let new_reserve_out = quote.reserve_out - quote.amount_out;

    let fee_per_share_delta = if quote.claim_fee > 0 {
        if pool.lp_supply == 0 {
            return Err(AmmError::EmptyPool);
        }
        q64_ratio(quote.claim_fee, pool.lp_supply)?
    } else {
        0
    };

    let (acc_in, vault_in, protocol_in) = if quote.a_to_b {
        (pool.fee_per_share_a, pool.fee_vault_a, pool.protocol_fees_a)
    } else {
        (pool.fee_per_share_b, pool.fee_vault_b, pool.protocol_fees_b)
    };
    let acc_in = acc_in
        .checked_add(fee_per_share_delta)
        .ok_or(AmmError::Overflow)?;
    let vault_in = vault_in
        .checked_add(quote.claim_fee)
        .ok_or(AmmError::Overflow)?;
    let protocol_in = protocol_in
        .checked_add(quote.protocol_fee)
        .ok_or(AmmError::Overflow)?;

    // ── Commit ───────────────────────────────────────────────────────────────
    if quote.a_to_b {
        pool.reserve_a = new_reserve_in;
        pool.reserve_b = new_reserve_out;
        pool.fee_per_share_a = acc_in;
        pool.fee_vault_a = vault_in;
        pool.protocol_fees_a = protocol_in;
    } else {
        pool.reserve_b = new_reserve_in;
        pool.reserve_a = new_reserve_out;
        pool.fee_per_share_b = acc_in;
        pool.fee_vault_b = vault_in;
        pool.protocol_fees_b = protocol_in;
    }

    debug!(
        amount_in,
        protocol_fee = quote.protocol_fee,
        lp_fee = quote.lp_fee,
        claim_fee = quote.claim_fee,
        amount_out = quote.amount_out,
        a_to_b = quote.a_to_b,
        "swap applied"
    );
    Ok(SwapReceipt { quote, min_out, fee_per_share_delta })
}

/// A quote paired with the output floor it must still meet when applied.
///
/// `prepare` only reads the pool; `commit` re-prices against whatever the
/// reserves are by then. A service can quote under a shared lock and apply
/// under an exclusive one: if another writer moved the price in between,
/// the commit fails with `SlippageExceeded` and nothing is written.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapGuard {
    pub mint_in: Pubkey,
    pub quote: SwapQuote,
    pub min_out: u64,
}

impl SwapGuard {
    pub fn prepare(
        pool: &Pool,
        mint_in: &Pubkey,
        mint_out: &Pubkey,
        amount_in: u64,
        max_slippage_pct: f64,
    ) -> Result<Self> {
        let a_to_b = pool.is_token_a(mint_in)?;
        let expected_out = if a_to_b { pool.mint_b } else { pool.mint_a };
        if *mint_out != expected_out {
            return Err(AmmError::UnknownMint(*mint_out));
        }
        let tolerance = slippage_ppm(max_slippage_pct)?;
        let quote = quote_swap(pool, mint_in, amount_in)?;
        let min_out = mul_div(
            quote.amount_out,
            SLIPPAGE_DENOMINATOR - tolerance,
            SLIPPAGE_DENOMINATOR,
        )?;
        Ok(Self { mint_in: *mint_in, quote, min_out })
    }

    pub fn commit(&self, pool: &mut Pool) -> Result<SwapReceipt> {
        apply_swap(pool, &self.mint_in, self.quote.amount_in, self.min_out).map_err(|e| match e {
            AmmError::InsufficientOutput { amount_out, min_out } => AmmError::SlippageExceeded {
                actual: amount_out,
                minimum: min_out,
            },
            other => other,
        })
    }
}

/// Quote, derive the slippage floor, and apply in one step.
pub fn execute_swap(
    pool: &mut Pool,
    mint_in: &Pubkey,
    mint_out: &Pubkey,
    amount_in: u64,
    max_slippage_pct: f64,
) -> Result<SwapReceipt> {
    SwapGuard::prepare(pool, mint_in, mint_out, amount_in, max_slippage_pct)?.commit(pool)
}

/// Percent tolerance as integer parts-per-million.
fn slippage_ppm(max_slippage_pct: f64) -> Result<u64> {
    if !max_slippage_pct.is_finite() || !(0.0..=100.0).contains(&max_slippage_pct) {
        return Err(AmmError::InvalidSlippage);
    }
    Ok((max_slippage_pct * 10_000.0).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instructions::{deposit, initialize_pool};

    fn pool_with(ra: u64, rb: u64, claim_fee_bps: u16) -> Pool {
        let mut pool =
            initialize_pool(Pubkey::new_unique(), Pubkey::new_unique(), 30, claim_fee_bps).unwrap();
        deposit(&mut pool, ra, Some(rb)).unwrap();
        pool
    }

    #[test]
    fn swap_moves_reserves_and_grows_k() {
        let mut pool = pool_with(1_000_000_000, 2_000_000_000, 0);
        let k_before = pool.k();
        let mint_a = pool.mint_a;
        let r = apply_swap(&mut pool, &mint_a, 10_000_000, 0).unwrap();

        assert_eq!(pool.reserve_a, 1_000_000_000 + 9_970_000 + 28_000);
        assert_eq!(pool.reserve_b, 2_000_000_000 - r.quote.amount_out);
        assert_eq!(pool.protocol_fees_a, 2_000);
        assert!(pool.k() > k_before);
        assert_eq!(r.fee_per_share_delta, 0);
    }

    #[test]
    fn claim_fee_feeds_vault_and_accumulator() {
        let mut pool = pool_with(1_000_000, 1_000_000, 5);
        let mint_b = pool.mint_b;
        let r = apply_swap(&mut pool, &mint_b, 100_000, 0).unwrap();

        assert_eq!(r.quote.claim_fee, 50);
        assert_eq!(pool.fee_vault_b, 50);
        assert_eq!(pool.fee_vault_a, 0);
        assert_eq!(pool.fee_per_share_b, q64_ratio(50, pool.lp_supply).unwrap());
        assert_eq!(pool.fee_per_share_a, 0);
    }

    #[test]
    fn min_out_violation_leaves_pool_untouched() {
        let mut pool = pool_with(1_000_000, 1_000_000, 0);
        let before = pool.clone();
        let mint_a = pool.mint_a;
        let err = apply_swap(&mut pool, &mint_a, 10_000, u64::MAX).unwrap_err();
        assert!(matches!(err, AmmError::InsufficientOutput { .. }));
        assert_eq!(pool, before);
    }

    #[test]
    fn dust_swap_with_zero_output_is_refused() {
        let mut pool = pool_with(1_000, 1_000_000_000, 0);
        let mint_b = pool.mint_b;
        let err = apply_swap(&mut pool, &mint_b, 10, 0).unwrap_err();
        assert_eq!(err, AmmError::InsufficientOutput { amount_out: 0, min_out: 0 });
    }

    #[test]
    fn execute_swap_checks_output_mint() {
        let mut pool = pool_with(1_000_000, 1_000_000, 0);
        let (mint_a, stranger) = (pool.mint_a, Pubkey::new_unique());
        assert_eq!(
            execute_swap(&mut pool, &mint_a, &stranger, 1_000, 1.0),
            Err(AmmError::UnknownMint(stranger))
        );
        assert_eq!(
            execute_swap(&mut pool, &mint_a, &mint_a, 1_000, 1.0),
            Err(AmmError::UnknownMint(mint_a))
        );
    }

    #[test]
    fn guard_floor_follows_tolerance() {
        let pool = pool_with(1_000_000_000, 1_000_000_000, 0);
        let (a, b) = (pool.mint_a, pool.mint_b);
        let strict = SwapGuard::prepare(&pool, &a, &b, 1_000_000, 0.0).unwrap();
        assert_eq!(strict.min_out, strict.quote.amount_out);

        let loose = SwapGuard::prepare(&pool, &a, &b, 1_000_000, 0.5).unwrap();
        assert_eq!(loose.min_out, strict.quote.amount_out * 995 / 1000);

        assert_eq!(
            SwapGuard::prepare(&pool, &a, &b, 1_000_000, 101.0),
            Err(AmmError::InvalidSlippage)
        );
        assert_eq!(
            SwapGuard::prepare(&pool, &a, &b, 1_000_000, f64::NAN),
            Err(AmmError::InvalidSlippage)
        );
    }

    #[test]
    fn stale_guard_fails_with_slippage_exceeded() {
        let mut pool = pool_with(1_000_000_000, 1_000_000_000, 0);
        let (a, b) = (pool.mint_a, pool.mint_b);
        let guard = SwapGuard::prepare(&pool, &a, &b, 10_000_000, 0.1).unwrap();

        // another writer sells A first, worsening the A→B price
        apply_swap(&mut pool, &a, 50_000_000, 0).unwrap();
        let moved = pool.clone();

        let err = guard.commit(&mut pool).unwrap_err();
        assert!(matches!(err, AmmError::SlippageExceeded { .. }));
        assert_eq!(pool, moved);
    }

    #[test]
    fn halted_pool_refuses_swaps() {
        let mut pool = pool_with(1_000_000, 1_000_000, 0);
        pool.halted = true;
        let mint_a = pool.mint_a;
        assert_eq!(apply_swap(&mut pool, &mint_a, 1_000, 0), Err(AmmError::PoolHalted));
    }
}
