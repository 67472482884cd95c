pub mod initialize_pool;
pub mod fee_math;
pub mod swap;
pub mod provide_liquidity;
pub mod remove_liquidity;
pub mod claim_fees;

pub use initialize_pool::*;
pub use fee_math::*;
pub use swap::*;
pub use provide_liquidity::*;
pub use remove_liquidity::*;
pub use claim_fees::*;
