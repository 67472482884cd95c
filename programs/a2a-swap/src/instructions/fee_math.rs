use serde::Serialize;
use solana_sdk::pubkey::Pubkey;

use crate::{
    constants::PROTOCOL_FEE_BPS,
    error::{AmmError, Result},
    math::{bps_of, mul_div},
    state::Pool,
};

/// Fee split and constant-product output for a hypothetical swap.
///
/// Shared by `quote_swap`, `apply_swap`, and the slippage guard so all
/// three agree on every unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwapQuote {
    /// `true` when the input token is the pool's token A.
    pub a_to_b: bool,
    pub amount_in: u64,
    /// 0.020 % of amount_in, routed to the treasury.
    pub protocol_fee: u64,
    /// Stays in the input reserve, growing every share's redemption value.
    pub lp_fee: u64,
    /// Paid into the fee vault and credited per share.
    pub claim_fee: u64,
    /// amount_in − all fees; the portion that moves the curve.
    pub net_in: u64,
    pub amount_out: u64,
    pub reserve_in: u64,
    pub reserve_out: u64,
    /// amount_out / amount_in (raw units).
    pub effective_rate: f64,
    /// 100 × (1 − effective_rate / spot_rate).
    pub price_impact_pct: f64,
}

/// Fees carved out of `amount_in`: `(protocol_fee, claim_fee, lp_fee)`.
pub fn split_fees(pool: &Pool, amount_in: u64) -> Result<(u64, u64, u64)> {
    let lp_bps = pool
        .fee_rate_bps
        .checked_sub(PROTOCOL_FEE_BPS)
        .and_then(|v| v.checked_sub(pool.claim_fee_bps))
        .ok_or(AmmError::InvalidFeeRate {
            fee_rate_bps: pool.fee_rate_bps,
            claim_fee_bps: pool.claim_fee_bps,
        })?;
    let protocol_fee = bps_of(amount_in, PROTOCOL_FEE_BPS)?;
    let claim_fee = bps_of(amount_in, pool.claim_fee_bps)?;
    let lp_fee = bps_of(amount_in, lp_bps)?;
    Ok((protocol_fee, claim_fee, lp_fee))
}

/// Price a swap of `amount_in` of `mint_in` without touching the pool.
///
/// Output is `reserve_out − ceil(k / (reserve_in + net_in))`, i.e.
/// `floor(reserve_out × net_in / (reserve_in + net_in))`: the rounding unit
/// always stays in the pool, so `k` cannot shrink.
pub fn quote_swap(pool: &Pool, mint_in: &Pubkey, amount_in: u64) -> Result<SwapQuote> {
    let a_to_b = pool.is_token_a(mint_in)?;
    if amount_in == 0 {
        return Err(AmmError::ZeroAmount);
    }
    let (reserve_in, reserve_out) = pool.reserves(a_to_b);
    if reserve_in == 0 || reserve_out == 0 {
        return Err(AmmError::EmptyPool);
    }

    let (protocol_fee, claim_fee, lp_fee) = split_fees(pool, amount_in)?;
    let net_in = protocol_fee
        .checked_add(claim_fee)
        .and_then(|f| f.checked_add(lp_fee))
        .and_then(|fees| amount_in.checked_sub(fees))
        .ok_or(AmmError::Overflow)?;

    let denom = reserve_in.checked_add(net_in).ok_or(AmmError::Overflow)?;
    let amount_out = mul_div(reserve_out, net_in, denom)?;

    let spot_rate = reserve_out as f64 / reserve_in as f64;
    let effective_rate = amount_out as f64 / amount_in as f64;
    let price_impact_pct = 100.0 * (1.0 - effective_rate / spot_rate);

    Ok(SwapQuote {
        a_to_b,
        amount_in,
        protocol_fee,
        lp_fee,
        claim_fee,
        net_in,
        amount_out,
        reserve_in,
        reserve_out,
        effective_rate,
        price_impact_pct,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instructions::initialize_pool;

    fn seeded(fee_rate_bps: u16, claim_fee_bps: u16, ra: u64, rb: u64) -> Pool {
        let mut pool =
            initialize_pool(Pubkey::new_unique(), Pubkey::new_unique(), fee_rate_bps, claim_fee_bps)
                .unwrap();
        pool.reserve_a = ra;
        pool.reserve_b = rb;
        pool.lp_supply = 1_000;
        pool
    }

    #[test]
    fn quote_matches_reference_breakdown() {
        let pool = seeded(30, 0, 1_000_000_000, 2_000_000_000);
        let q = quote_swap(&pool, &pool.mint_a, 10_000_000).unwrap();
        assert!(q.a_to_b);
        assert_eq!(q.protocol_fee, 2_000);
        assert_eq!(q.lp_fee, 28_000);
        assert_eq!(q.claim_fee, 0);
        assert_eq!(q.net_in, 9_970_000);
        // 2e9 − ceil(2e18 / 1_009_970_000)
        assert_eq!(q.amount_out, 19_743_160);
        assert!(q.price_impact_pct > 0.0 && q.price_impact_pct < 2.0);
    }

    #[test]
    fn quote_b_to_a_uses_swapped_reserves() {
        let pool = seeded(30, 0, 1_000_000_000, 2_000_000_000);
        let q = quote_swap(&pool, &pool.mint_b, 10_000_000).unwrap();
        assert!(!q.a_to_b);
        assert_eq!(q.reserve_in, 2_000_000_000);
        assert_eq!(q.reserve_out, 1_000_000_000);
        assert_eq!(q.amount_out, 1_000_000_000u64 * 9_970_000 / 2_009_970_000);
    }

    #[test]
    fn claim_fee_comes_out_of_the_lp_share() {
        let pool = seeded(30, 5, 1_000_000_000, 1_000_000_000);
        let q = quote_swap(&pool, &pool.mint_a, 1_000_000).unwrap();
        assert_eq!(q.protocol_fee, 200);
        assert_eq!(q.claim_fee, 500);
        assert_eq!(q.lp_fee, 2_300);
        assert_eq!(q.net_in, 1_000_000 - 3_000);
    }

    #[test]
    fn rejects_unknown_mint_zero_amount_and_empty_pool() {
        let pool = seeded(30, 0, 1_000, 1_000);
        let stranger = Pubkey::new_unique();
        assert_eq!(quote_swap(&pool, &stranger, 10), Err(AmmError::UnknownMint(stranger)));
        assert_eq!(quote_swap(&pool, &pool.mint_a, 0), Err(AmmError::ZeroAmount));

        let empty = seeded(30, 0, 0, 1_000);
        assert_eq!(quote_swap(&empty, &empty.mint_a, 10), Err(AmmError::EmptyPool));
    }
}
