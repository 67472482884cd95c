//! Client and local ledger for the A2A-Swap pool engine.
//!
//! Pools and positions live in a local [`Ledger`] that serializes writes per
//! pool and can persist to a JSON file shared by several processes; every
//! write returns a receipt signed by the agent's keypair.
//!
//! # Usage
//!
//! ```rust,no_run
//! use a2a_swap_sdk::{A2ASwapClient, CreatePoolParams, ProvideParams, SwapParams};
//! use solana_sdk::{pubkey::Pubkey, signature::Keypair};
//!
//! # fn main() -> a2a_swap_sdk::Result<()> {
//! let client = A2ASwapClient::open("ledger.json")?;
//! let agent = Keypair::new();
//! let (base, quote) = (Pubkey::new_unique(), Pubkey::new_unique());
//!
//! client.create_pool(&agent, CreatePoolParams {
//!     mint_a: base, mint_b: quote, fee_rate_bps: 30, claim_fee_bps: 0,
//! })?;
//! client.provide_liquidity(&agent, ProvideParams {
//!     mint_a: base, mint_b: quote,
//!     amount_a: 1_000_000, amount_b: Some(4_000_000),
//!     min_lp: 0, auto_compound: false, compound_threshold: 0,
//! })?;
//!
//! // sell 10_000 of the quote token, tolerating 0.5% below the quote
//! let fill = client.convert(&agent, SwapParams {
//!     mint_in: quote, mint_out: base, amount_in: 10_000, max_slippage_pct: 0.5,
//! })?;
//! println!("got {} base, receipt {}", fill.estimated_out, fill.signature);
//! # Ok(())
//! # }
//! ```
//!
//! # Operations
//!
//! | Method | What it does |
//! |---|---|
//! | [`A2ASwapClient::create_pool`] | Register an empty pool for a mint pair |
//! | [`A2ASwapClient::provide_liquidity`] | Deposit into a pool, mint LP shares |
//! | [`A2ASwapClient::convert`] | Swap with a slippage floor |
//! | [`A2ASwapClient::simulate`] | Fee and price-impact breakdown, nothing written |
//! | [`A2ASwapClient::remove_liquidity`] | Burn LP shares for reserves |
//! | [`A2ASwapClient::claim_fees`] | Pay out or compound accrued fees |
//! | [`A2ASwapClient::pool_info`] | Reserves, spot price, fee vaults |
//! | [`A2ASwapClient::my_positions`] | Every position an owner holds |
//! | [`A2ASwapClient::my_fees`] | Claimable fees per position and in total |

pub mod client;
pub mod error;
pub mod ledger;
pub mod pda;
pub mod types;

pub use client::A2ASwapClient;
pub use error::{Error, Result};
pub use ledger::Ledger;
pub use types::*;
