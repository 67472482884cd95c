//! Parameter and result types for [`A2ASwapClient`](crate::A2ASwapClient).
//!
//! Results serialize with base-58 addresses so they can be printed, logged
//! or signed as-is.

use a2a_swap::{state::b58, Deposit, FeeClaim, PoolSummary};
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;

// ─── create_pool ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CreatePoolParams {
    pub mint_a: Pubkey,
    pub mint_b: Pubkey,
    /// Total swap fee, protocol cut included (2..=100 bps).
    pub fee_rate_bps: u16,
    /// Part of the fee paid out per LP share instead of compounding in reserves.
    pub claim_fee_bps: u16,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatePoolResult {
    pub signature: String,
    #[serde(with = "b58")]
    pub pool: Pubkey,
    #[serde(with = "b58")]
    pub mint_a: Pubkey,
    #[serde(with = "b58")]
    pub mint_b: Pubkey,
    pub fee_rate_bps: u16,
    pub claim_fee_bps: u16,
}

// ─── provide_liquidity ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ProvideParams {
    /// Mint the caller's `amount_a` is denominated in; either pool token.
    pub mint_a: Pubkey,
    pub mint_b: Pubkey,
    pub amount_a: u64,
    /// Required only for the first deposit, which sets the price.
    pub amount_b: Option<u64>,
    pub min_lp: u64,
    pub auto_compound: bool,
    pub compound_threshold: u64,
}

/// Amounts are in pool order (`pool.mint_a` / `pool.mint_b`).
#[derive(Debug, Clone, Serialize)]
pub struct ProvideResult {
    pub signature: String,
    #[serde(with = "b58")]
    pub pool: Pubkey,
    #[serde(with = "b58")]
    pub position: Pubkey,
    pub amount_a: u64,
    pub amount_b: u64,
    pub lp_shares: u64,
}

impl ProvideResult {
    pub(crate) fn new(pool: Pubkey, position: Pubkey, d: Deposit) -> Self {
        Self {
            signature: String::new(),
            pool,
            position,
            amount_a: d.accepted_a,
            amount_b: d.accepted_b,
            lp_shares: d.minted_shares,
        }
    }
}

// ─── convert / simulate ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SwapParams {
    pub mint_in: Pubkey,
    pub mint_out: Pubkey,
    pub amount_in: u64,
    /// 0.0 = exact quote required, 100.0 = any output accepted.
    pub max_slippage_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwapResult {
    pub signature: String,
    #[serde(with = "b58")]
    pub pool: Pubkey,
    pub a_to_b: bool,
    pub amount_in: u64,
    pub estimated_out: u64,
    pub min_amount_out: u64,
    pub protocol_fee: u64,
    pub lp_fee: u64,
    pub claim_fee: u64,
    /// Where `protocol_fee` is routed.
    #[serde(with = "b58")]
    pub treasury: Pubkey,
}

#[derive(Debug, Clone)]
pub struct SimulateParams {
    pub mint_in: Pubkey,
    pub mint_out: Pubkey,
    pub amount_in: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulateResult {
    #[serde(with = "b58")]
    pub pool: Pubkey,
    pub a_to_b: bool,
    pub amount_in: u64,
    pub protocol_fee: u64,
    pub lp_fee: u64,
    pub claim_fee: u64,
    pub fee_rate_bps: u16,
    /// amount_in after every fee, the part that moves the curve.
    pub net_in: u64,
    pub estimated_out: u64,
    pub effective_rate: f64,
    pub price_impact_pct: f64,
    pub reserve_in: u64,
    pub reserve_out: u64,
}

// ─── remove_liquidity ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RemoveParams {
    pub mint_a: Pubkey,
    pub mint_b: Pubkey,
    pub lp_shares: u64,
    /// Floors in pool order (`pool.mint_a` / `pool.mint_b`).
    pub min_a: u64,
    pub min_b: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemoveResult {
    pub signature: String,
    #[serde(with = "b58")]
    pub pool: Pubkey,
    #[serde(with = "b58")]
    pub position: Pubkey,
    pub lp_shares: u64,
    pub amount_a: u64,
    pub amount_b: u64,
}

// ─── claim_fees ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ClaimResult {
    /// Absent when there was nothing to claim and no transition was made.
    pub signature: Option<String>,
    #[serde(with = "b58")]
    pub pool: Pubkey,
    #[serde(with = "b58")]
    pub position: Pubkey,
    pub auto_compound: bool,
    /// `None` means no fees were pending.
    pub claim: Option<FeeClaim>,
}

// ─── pool_info ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct PoolInfo {
    #[serde(with = "b58")]
    pub pool: Pubkey,
    #[serde(flatten)]
    pub summary: PoolSummary,
    pub fee_vault_a: u64,
    pub fee_vault_b: u64,
    pub protocol_fees_a: u64,
    pub protocol_fees_b: u64,
    pub halted: bool,
}
