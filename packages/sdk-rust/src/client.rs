//! [`A2ASwapClient`]: one method per agent operation, receipts signed by the caller.

use std::{path::PathBuf, sync::Arc};

use a2a_swap::{query, ClaimOutcome, FeeReport, PositionSummary, PROGRAM_ID};
use serde::Serialize;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};

use crate::{
    error::Result,
    ledger::Ledger,
    pda::derive_treasury,
    types::{
        ClaimResult, CreatePoolParams, CreatePoolResult, PoolInfo, ProvideParams, ProvideResult,
        RemoveParams, RemoveResult, SimulateParams, SimulateResult, SwapParams, SwapResult,
    },
};

// ─── Client ───────────────────────────────────────────────────────────────────

/// A2A-Swap client over a local [`Ledger`].
///
/// Every write returns a receipt signed by the acting agent's keypair: the
/// `signature` field is an Ed25519 signature over the JSON encoding of the
/// receipt with `signature` left empty.
///
/// Clones share one ledger, so a client can be handed to several agent
/// tasks. In memory, writes to the same pool are serialized and other pools
/// proceed. Over a file, every write holds the file's lock, so separate
/// processes can share one ledger; reads re-load the file first.
///
/// ```rust,no_run
/// # use a2a_swap_sdk::A2ASwapClient;
/// # use solana_sdk::pubkey::Pubkey;
/// # fn main() -> a2a_swap_sdk::Result<()> {
/// let client = A2ASwapClient::open("ledger.json")?;
/// let worker = client.clone();
/// std::thread::spawn(move || worker.my_fees(&Pubkey::new_unique()));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct A2ASwapClient {
    ledger: Arc<Ledger>,
}

impl A2ASwapClient {
    /// Wrap an existing (possibly shared) ledger.
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    /// Client over a fresh ledger that is never persisted.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(Ledger::in_memory(PROGRAM_ID)))
    }

    /// Client over the ledger file at `path`; created on first write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self::new(Arc::new(Ledger::open(path, PROGRAM_ID)?)))
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    // ── Write operations ──────────────────────────────────────────────────────

    /// Create a new constant-product pool for `mint_a` / `mint_b`.
    pub fn create_pool(&self, payer: &Keypair, params: CreatePoolParams) -> Result<CreatePoolResult> {
        let (pool, state) = self.ledger.create_pool(
            params.mint_a,
            params.mint_b,
            params.fee_rate_bps,
            params.claim_fee_bps,
        )?;

        let mut result = CreatePoolResult {
            signature: String::new(),
            pool,
            mint_a: state.mint_a,
            mint_b: state.mint_b,
            fee_rate_bps: state.fee_rate_bps,
            claim_fee_bps: state.claim_fee_bps,
        };
        result.signature = sign_receipt(payer, &result)?;
        Ok(result)
    }

    /// Deposit tokens into a pool and receive LP shares.
    ///
    /// The pool is found for the mint pair in either order. If
    /// `params.mint_a` is the pool's token B, `amount_a` is converted to the
    /// pool's token-A amount at the live reserve ratio. `amount_b` is only
    /// used for the first deposit, which sets the price.
    pub fn provide_liquidity(&self, payer: &Keypair, params: ProvideParams) -> Result<ProvideResult> {
        let (pool, a_is_pool_a) = self.ledger.find_pool(&params.mint_a, &params.mint_b)?;
        let (position, deposit) =
            self.ledger.provide(&pool, &payer.pubkey(), &params, a_is_pool_a)?;

        let mut result = ProvideResult::new(pool, position, deposit);
        result.signature = sign_receipt(payer, &result)?;
        Ok(result)
    }

    /// Swap `amount_in` of `mint_in` for `mint_out`.
    ///
    /// The output floor is the quote less `max_slippage_pct`; if the pool
    /// moves past it before the swap is applied, nothing is written and
    /// `SlippageExceeded` is returned.
    pub fn convert(&self, payer: &Keypair, params: SwapParams) -> Result<SwapResult> {
        let (pool, _) = self.ledger.find_pool(&params.mint_in, &params.mint_out)?;
        let receipt = self.ledger.swap(
            &pool,
            &params.mint_in,
            &params.mint_out,
            params.amount_in,
            params.max_slippage_pct,
        )?;

        let (treasury, _) = derive_treasury(self.ledger.program_id());
        let mut result = SwapResult {
            signature: String::new(),
            pool,
            a_to_b: receipt.quote.a_to_b,
            amount_in: receipt.quote.amount_in,
            estimated_out: receipt.quote.amount_out,
            min_amount_out: receipt.min_out,
            protocol_fee: receipt.quote.protocol_fee,
            lp_fee: receipt.quote.lp_fee,
            claim_fee: receipt.quote.claim_fee,
            treasury,
        };
        result.signature = sign_receipt(payer, &result)?;
        Ok(result)
    }

    /// Burn LP shares and withdraw the proportional reserves.
    pub fn remove_liquidity(&self, payer: &Keypair, params: RemoveParams) -> Result<RemoveResult> {
        let (pool, _) = self.ledger.find_pool(&params.mint_a, &params.mint_b)?;
        let (position, out) = self.ledger.remove(
            &pool,
            &payer.pubkey(),
            params.lp_shares,
            params.min_a,
            params.min_b,
        )?;

        let mut result = RemoveResult {
            signature: String::new(),
            pool,
            position,
            lp_shares: params.lp_shares,
            amount_a: out.amount_a,
            amount_b: out.amount_b,
        };
        result.signature = sign_receipt(payer, &result)?;
        Ok(result)
    }

    /// Claim accrued fees, or compound them if the position opted in.
    pub fn claim_fees(&self, payer: &Keypair, mint_a: Pubkey, mint_b: Pubkey) -> Result<ClaimResult> {
        let (pool, _) = self.ledger.find_pool(&mint_a, &mint_b)?;
        let (position, auto_compound, outcome) = self.ledger.claim(&pool, &payer.pubkey())?;

        let mut result = ClaimResult {
            signature: None,
            pool,
            position,
            auto_compound,
            claim: None,
        };
        if let ClaimOutcome::Claimed(c) = outcome {
            result.claim = Some(c);
            result.signature = Some(sign_receipt(payer, &result)?);
        }
        Ok(result)
    }

    // ── Read operations ───────────────────────────────────────────────────────

    /// Fee and slippage breakdown for a swap, without applying it.
    pub fn simulate(&self, params: SimulateParams) -> Result<SimulateResult> {
        self.ledger.refresh()?;
        let (pool, _) = self.ledger.find_pool(&params.mint_in, &params.mint_out)?;
        let fee_rate_bps = self.ledger.pool(&pool)?.fee_rate_bps;
        let q = self.ledger.quote(&pool, &params.mint_in, params.amount_in)?;
        Ok(SimulateResult {
            pool,
            a_to_b: q.a_to_b,
            amount_in: q.amount_in,
            protocol_fee: q.protocol_fee,
            lp_fee: q.lp_fee,
            claim_fee: q.claim_fee,
            fee_rate_bps,
            net_in: q.net_in,
            estimated_out: q.amount_out,
            effective_rate: q.effective_rate,
            price_impact_pct: q.price_impact_pct,
            reserve_in: q.reserve_in,
            reserve_out: q.reserve_out,
        })
    }

    /// Pool state plus current reserves and spot price.
    pub fn pool_info(&self, mint_a: Pubkey, mint_b: Pubkey) -> Result<PoolInfo> {
        self.ledger.refresh()?;
        let (address, _) = self.ledger.find_pool(&mint_a, &mint_b)?;
        let pool = self.ledger.pool(&address)?;
        Ok(PoolInfo {
            pool: address,
            summary: query::pool_info(&pool),
            fee_vault_a: pool.fee_vault_a,
            fee_vault_b: pool.fee_vault_b,
            protocol_fees_a: pool.protocol_fees_a,
            protocol_fees_b: pool.protocol_fees_b,
            halted: pool.halted,
        })
    }

    /// All LP positions held by `owner`, with claimable fees.
    pub fn my_positions(&self, owner: &Pubkey) -> Result<Vec<PositionSummary>> {
        self.ledger.refresh()?;
        Ok(query::my_positions(owner, self.ledger.as_ref())?)
    }

    /// Claimable fees per position and in total.
    pub fn my_fees(&self, owner: &Pubkey) -> Result<FeeReport> {
        self.ledger.refresh()?;
        Ok(query::my_fees(owner, self.ledger.as_ref())?)
    }
}

// ─── Utilities ────────────────────────────────────────────────────────────────

/// Sign the JSON form of a receipt (with its signature still unset).
fn sign_receipt<T: Serialize>(payer: &Keypair, receipt: &T) -> Result<String> {
    let bytes = serde_json::to_vec(receipt)?;
    Ok(payer.sign_message(&bytes).to_string())
}
