//! Deterministic addresses for pools, positions and the treasury.
//!
//! Seeds mirror `a2a_swap::constants`; addresses are program-derived under
//! [`PROGRAM_ID`](a2a_swap::PROGRAM_ID) unless a client overrides it.

use a2a_swap::{POOL_SEED, POSITION_SEED, TREASURY_SEED};
use solana_sdk::pubkey::Pubkey;

/// Derive the pool PDA for the given mint pair (order matters).
pub fn derive_pool(mint_a: &Pubkey, mint_b: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[POOL_SEED, mint_a.as_ref(), mint_b.as_ref()],
        program_id,
    )
}

/// Derive the per-agent position PDA for a pool.
pub fn derive_position(pool: &Pubkey, owner: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[POSITION_SEED, pool.as_ref(), owner.as_ref()],
        program_id,
    )
}

/// Derive the global treasury PDA that protocol fees are routed to.
pub fn derive_treasury(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[TREASURY_SEED], program_id)
}
