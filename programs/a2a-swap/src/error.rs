use solana_sdk::pubkey::Pubkey;

/// Every way a pool transition can be refused.
///
/// A failed operation never leaves partial writes behind: the pool and
/// position passed in are untouched when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmmError {
    #[error("Token mint {0} does not match pool")]
    UnknownMint(Pubkey),
    #[error("Amount must be greater than zero")]
    ZeroAmount,
    #[error("Pool has no liquidity — seed it with provide first")]
    EmptyPool,
    #[error("amount_b is required when the pool is empty (first deposit sets the price)")]
    MissingInitialAmount,
    #[error("Insufficient LP shares: requested {requested}, available {available}")]
    InsufficientShares { requested: u64, available: u64 },
    #[error("Output {amount_out} below minimum {min_out}")]
    InsufficientOutput { amount_out: u64, min_out: u64 },
    #[error("Output below minimum — slippage exceeded (got {actual}, floor {minimum})")]
    SlippageExceeded { actual: u64, minimum: u64 },
    #[error("Math overflow")]
    Overflow,
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Fee accumulator regressed below position checkpoint — pool state is corrupt")]
    AccumulatorInvariantViolated,
    #[error("Fee rate {fee_rate_bps} bps (claim {claim_fee_bps} bps) is outside the allowed range")]
    InvalidFeeRate { fee_rate_bps: u16, claim_fee_bps: u16 },
    #[error("Token A and token B must be different mints")]
    IdenticalMints,
    #[error("Slippage tolerance must be between 0 and 100 percent")]
    InvalidSlippage,
    #[error("Pool is halted after an accounting fault; no further mutation is accepted")]
    PoolHalted,
}

pub type Result<T> = std::result::Result<T, AmmError>;
