//! A2A-Swap — constant-product AMM pool engine for autonomous agents.
//!
//! Pure state transitions over [`Pool`] and [`Position`] values. Every
//! operation works on a staged copy and writes back only on success, so an
//! `Err` never leaves a half-applied pool behind. Locking, persistence and
//! key management belong to the caller (see the `a2a-swap-sdk` ledger).
//!
//! Operations:
//!   initialize_pool   — create an empty pool with fixed fee rates
//!   provide_liquidity — add liquidity; supports auto-compound flag
//!   remove_liquidity  — withdraw proportional reserves
//!   claim             — claim (or auto-compound) accrued fees
//!   apply_swap        — x * y = k swap with an output floor
//!   execute_swap      — swap with a percentage slippage guard
//!
//! Queries: [`quote_swap`], [`preview_fees`], [`query::pool_info`],
//! [`query::my_fees`], [`query::my_positions`].

pub mod constants;
pub mod error;
pub mod instructions;
pub mod math;
pub mod query;
pub mod state;

pub use constants::*;
pub use error::{AmmError, Result};
pub use instructions::*;
pub use query::{FeeReport, PoolSummary, PositionFees, PositionId, PositionIndex, PositionSummary};
pub use state::{Pool, Position};
