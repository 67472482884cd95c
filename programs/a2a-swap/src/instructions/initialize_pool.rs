use solana_sdk::pubkey::Pubkey;
use tracing::debug;

use crate::{
    constants::{MAX_FEE_RATE_BPS, PROTOCOL_FEE_BPS},
    error::{AmmError, Result},
    state::Pool,
};

/// Create an empty constant-product pool.
///
/// `fee_rate_bps` is the whole swap fee and must cover the fixed protocol cut
/// plus `claim_fee_bps`; both are frozen for the life of the pool.
pub fn initialize_pool(
    mint_a: Pubkey,
    mint_b: Pubkey,
    fee_rate_bps: u16,
    claim_fee_bps: u16,
) -> Result<Pool> {
    if mint_a == mint_b {
        return Err(AmmError::IdenticalMints);
    }
    let floor = PROTOCOL_FEE_BPS as u32 + claim_fee_bps as u32;
    if fee_rate_bps > MAX_FEE_RATE_BPS || (fee_rate_bps as u32) < floor {
        return Err(AmmError::InvalidFeeRate { fee_rate_bps, claim_fee_bps });
    }

    debug!(%mint_a, %mint_b, fee_rate_bps, claim_fee_bps, "pool created");
    Ok(Pool {
        mint_a,
        mint_b,
        reserve_a: 0,
        reserve_b: 0,
        lp_supply: 0,
        fee_rate_bps,
        claim_fee_bps,
        fee_per_share_a: 0,
        fee_per_share_b: 0,
        fee_vault_a: 0,
        fee_vault_b: 0,
        protocol_fees_a: 0,
        protocol_fees_b: 0,
        halted: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_same_mint_and_out_of_range_fees() {
        let m = Pubkey::new_unique();
        assert_eq!(initialize_pool(m, m, 30, 0), Err(AmmError::IdenticalMints));

        let other = Pubkey::new_unique();
        assert!(matches!(
            initialize_pool(m, other, 101, 0),
            Err(AmmError::InvalidFeeRate { .. })
        ));
        // protocol cut alone is 2 bps
        assert!(matches!(
            initialize_pool(m, other, 1, 0),
            Err(AmmError::InvalidFeeRate { .. })
        ));
        assert!(matches!(
            initialize_pool(m, other, 10, 9),
            Err(AmmError::InvalidFeeRate { .. })
        ));
    }

    #[test]
    fn new_pool_is_empty() {
        let pool = initialize_pool(Pubkey::new_unique(), Pubkey::new_unique(), 30, 5).unwrap();
        assert!(pool.is_empty());
        assert_eq!((pool.reserve_a, pool.reserve_b), (0, 0));
        assert_eq!(pool.claim_fee_bps, 5);
        assert!(!pool.halted);
    }
}
