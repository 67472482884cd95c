use solana_sdk::{pubkey, pubkey::Pubkey};

/// PDA seeds
pub const POOL_SEED: &[u8] = b"pool";
pub const POSITION_SEED: &[u8] = b"position";
pub const TREASURY_SEED: &[u8] = b"treasury";

/// Program id the pool and position addresses are derived under.
pub const PROGRAM_ID: Pubkey = pubkey!("8XJfG4mHqRZjByAd7HxHdEALfB8jVtJVQsdhGEmysTFq");

/// Default total swap fee: 0.30 %
pub const FEE_RATE_DEFAULT_BPS: u16 = 30;

/// Upper bound on the total swap fee: 1.00 %
pub const MAX_FEE_RATE_BPS: u16 = 100;

/// Denominator for basis-point math
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Protocol fee: 0.020 %, carved out of the pool's fee rate
pub const PROTOCOL_FEE_BPS: u16 = 2;

/// Slippage tolerance is carried as parts-per-million (100 % = 1_000_000)
pub const SLIPPAGE_DENOMINATOR: u64 = 1_000_000;

/// Q64.64 fixed-point scale (fee-per-share accumulators)
pub const Q64: u128 = 1u128 << 64;
