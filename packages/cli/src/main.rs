use a2a_swap::{FEE_RATE_DEFAULT_BPS, MAX_FEE_RATE_BPS, PROGRAM_ID, PROTOCOL_FEE_BPS};
use a2a_swap_sdk::{
    A2ASwapClient, CreatePoolParams, ProvideParams, RemoveParams, SimulateParams, SwapParams,
};
use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use serde_json::{json, Value};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{read_keypair_file, Keypair, Signer},
};
use std::{str::FromStr, sync::OnceLock};
use tracing::debug;
use tracing_subscriber::EnvFilter;

// ─── Token symbol registry (mainnet-beta) ────────────────────────────────────

const KNOWN_TOKENS: &[(&str, &str)] = &[
    ("SOL",  "So11111111111111111111111111111111111111112"),
    ("USDC", "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"),
    ("USDT", "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB"),
];

/// Resolve a symbol (SOL, USDC, USDT) or raw base-58 mint address to a Pubkey.
fn resolve_mint(symbol_or_address: &str) -> Result<Pubkey> {
    let upper = symbol_or_address.to_uppercase();
    if let Some((_, addr)) = KNOWN_TOKENS.iter().find(|(sym, _)| upper == *sym) {
        return Ok(Pubkey::from_str(addr)?);
    }
    Pubkey::from_str(symbol_or_address)
        .map_err(|_| anyhow!(
            "Unknown token '{}'. Use a built-in symbol ({}) or a base-58 mint address.",
            symbol_or_address,
            KNOWN_TOKENS.iter().map(|(s, _)| *s).collect::<Vec<_>>().join(", ")
        ))
}

/// Mint address → symbol, or a shortened address for unknown mints.
fn resolve_symbol(mint: &Pubkey) -> String {
    let addr = mint.to_string();
    match KNOWN_TOKENS.iter().find(|(_, known)| addr == *known) {
        Some((sym, _)) => sym.to_string(),
        None => format!("{}…{}", &addr[..4], &addr[addr.len() - 4..]),
    }
}

fn pair_label(mint_a: &Pubkey, mint_b: &Pubkey) -> String {
    format!("{}-{}", resolve_symbol(mint_a), resolve_symbol(mint_b))
}

/// Parse `"TOKEN_A-TOKEN_B"` into `(mint_a, mint_b)`.
fn parse_pair(pair: &str) -> Result<(Pubkey, Pubkey)> {
    let (sym_a, sym_b) = match pair.split_once('-') {
        Some((a, b)) if !a.is_empty() && !b.is_empty() => (a, b),
        _ => return Err(anyhow!(
            "--pair must be TOKEN_A-TOKEN_B (e.g. SOL-USDC or <mintA>-<mintB>). Got: '{}'",
            pair
        )),
    };
    let mint_a = resolve_mint(sym_a).context("pair: token A")?;
    let mint_b = resolve_mint(sym_b).context("pair: token B")?;
    if mint_a == mint_b {
        return Err(anyhow!("Token A and token B in --pair must be different."));
    }
    Ok((mint_a, mint_b))
}

/// Expand `~/` to `$HOME/` in file paths.
fn expand_home(path: &str) -> String {
    match path.strip_prefix("~/") {
        Some(rest) => format!("{}/{}", std::env::var("HOME").unwrap_or_default(), rest),
        None => path.to_string(),
    }
}

fn load_keypair(path: &str) -> Result<Keypair> {
    let expanded = expand_home(path);
    read_keypair_file(&expanded)
        .map_err(|e| anyhow!(
            "Cannot load keypair from '{}': {}\n  \
             Set A2A_KEYPAIR or pass --keypair to specify a different path.",
            expanded, e
        ))
}

fn open_client(state: &str) -> Result<A2ASwapClient> {
    let path = expand_home(state);
    debug!(%path, "opening ledger");
    A2ASwapClient::open(&path).with_context(|| format!(
        "Cannot open ledger '{path}'.\n  \
         Set A2A_STATE or pass --state to use a different file."
    ))
}

fn nonzero(amount: u64, flag: &str) -> Result<()> {
    if amount == 0 {
        return Err(anyhow!(
            "{flag} must be > 0 (atomic units: lamports for SOL, μUSDC for USDC, etc.)"
        ));
    }
    Ok(())
}

// ─── Version banner ───────────────────────────────────────────────────────────

fn print_banner() {
    let ver = env!("CARGO_PKG_VERSION");
    println!();
    println!("  A2A-Swap  v{ver}  ·  agent-native constant-product AMM");
    println!("  {}", "─".repeat(62));
    println!("  Program   {PROGRAM_ID}");
    println!("  State     local ledger (--state / A2A_STATE)");
    println!("  Fees      {:.3}% protocol  +  LP fee set per pool (max 1.00%)",
             PROTOCOL_FEE_BPS as f64 / 100.0);
    println!();
}

/// Text for `--version`, built once from the engine's constants.
fn long_version() -> &'static str {
    static TEXT: OnceLock<String> = OnceLock::new();
    TEXT.get_or_init(|| {
        format!(
            "{}\n\
             Program:      {PROGRAM_ID}\n\
             Protocol fee: {:.3}%  ({PROTOCOL_FEE_BPS} bps of amount_in)\n\
             Fee range:    {PROTOCOL_FEE_BPS}–{MAX_FEE_RATE_BPS} bps  (set per pool)\n\
             License:      MIT",
            env!("CARGO_PKG_VERSION"),
            PROTOCOL_FEE_BPS as f64 / 100.0,
        )
    })
}

// ─── CLI definition ───────────────────────────────────────────────────────────

/// A2A-Swap — agent-native constant-product AMM.
///
/// Every command supports --json for machine-readable output.
/// Global options can also be set via environment variables:
///   A2A_STATE    — path to the ledger JSON file
///   A2A_KEYPAIR  — path to agent Ed25519 keypair JSON
#[derive(Parser)]
#[command(
    name        = "a2a-swap",
    version     = env!("CARGO_PKG_VERSION"),
    long_version = long_version(),
    author  = "A2A Protocol",
    about   = "Agent-native constant-product AMM — zero-human-in-the-loop token swaps.",
    after_help = "\
ENVIRONMENT:
  A2A_STATE      Ledger JSON file  [default: ~/.a2a-swap/ledger.json]
  A2A_KEYPAIR    Path to Ed25519 keypair JSON  [default: ~/.config/solana/id.json]
  RUST_LOG       Log filter for stderr diagnostics  [default: warn]

QUICK START:
  a2a-swap create-pool      --pair SOL-USDC
  a2a-swap provide          --pair SOL-USDC --amount 1000000000 --amount-b 185000000
  a2a-swap simulate         --in SOL --out USDC --amount 1000000
  a2a-swap convert          --in SOL --out USDC --amount 1000000
  a2a-swap claim-fees       --pair SOL-USDC
  a2a-swap my-fees"
)]
struct Cli {
    /// Ledger JSON file holding pools and positions
    #[arg(
        long,
        global     = true,
        value_name = "PATH",
        default_value = "~/.a2a-swap/ledger.json",
        env = "A2A_STATE"
    )]
    state: String,

    /// Path to the agent's Ed25519 keypair JSON file
    #[arg(
        long,
        global     = true,
        value_name = "PATH",
        default_value = "~/.config/solana/id.json",
        env = "A2A_KEYPAIR"
    )]
    keypair: String,

    /// Output machine-readable JSON instead of human-readable text
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new x·y=k liquidity pool for a token pair
    ///
    /// The pool address is derived from the two mints; the pair order given
    /// here becomes the pool's token A / token B order.
    #[command(
        after_help = "\
EXAMPLES:
  # Create SOL/USDC pool with the default 0.30% fee
  a2a-swap create-pool --pair SOL-USDC

  # 0.10% fee, 0.05% of which is paid out per LP share on claim
  a2a-swap create-pool --pair <mintA>-<mintB> --fee-bps 10 --claim-fee-bps 5

NOTES:
  After creation the pool is empty. Run `provide` to seed initial liquidity.
  Fee range: 2–100 bps, the 2 bps protocol fee included.
  Fee parameters are fixed for the life of the pool."
    )]
    CreatePool {
        /// Token pair, e.g. SOL-USDC or <mintA>-<mintB>
        #[arg(long, value_name = "A-B")]
        pair: String,

        /// Total fee charged on every swap (basis points, 1 bp = 0.01%).
        #[arg(long, value_name = "BPS", default_value_t = FEE_RATE_DEFAULT_BPS)]
        fee_bps: u16,

        /// Slice of the fee credited to LPs as claimable fees instead of
        /// staying in the reserves. 0 = all LP fees compound in the pool.
        #[arg(long, value_name = "BPS", default_value_t = 0)]
        claim_fee_bps: u16,
    },

    /// Add liquidity to a pool and receive LP shares
    ///
    /// LP shares track your proportional ownership of the pool.
    /// Claimable fees accrue to your shares via a Q64.64 per-share
    /// accumulator. Use --auto-compound to reinvest them on `claim-fees`.
    #[command(
        after_help = "\
EXAMPLES:
  # Seed empty pool: 1 SOL + 185 USDC (first deposit sets price)
  a2a-swap provide --pair SOL-USDC --amount 1000000000 --amount-b 185000000

  # Add liquidity to an existing pool (token B matched from live reserves)
  a2a-swap provide --pair SOL-USDC --amount 500000000

  # Enable auto-compounding of accrued fees
  a2a-swap provide --pair SOL-USDC --amount 500000000 --auto-compound

NOTES:
  First deposit requires --amount-b to establish the initial price.
  Later deposits ignore --amount-b; token B is taken at the reserve ratio.
  Amounts are in atomic units: lamports for SOL, μUSDC for USDC, etc."
    )]
    Provide {
        /// Token pair of the pool to deposit into, e.g. SOL-USDC
        #[arg(long, value_name = "A-B")]
        pair: String,

        /// Amount of the pair's first token to deposit (atomic units)
        #[arg(long, value_name = "AMOUNT")]
        amount: u64,

        /// Amount of the pair's second token (atomic units).
        /// Required for the first deposit (sets the initial price ratio).
        #[arg(long, value_name = "AMOUNT")]
        amount_b: Option<u64>,

        /// Reject the deposit if it would mint fewer LP shares than this
        #[arg(long, value_name = "SHARES", default_value_t = 0)]
        min_lp: u64,

        /// Reinvest claimable fees into additional LP shares on `claim-fees`
        #[arg(long, default_value_t = false)]
        auto_compound: bool,

        /// Minimum combined fee balance (token A + B, atomic units) before
        /// auto-compound fires. 0 = compound every time fees exist.
        #[arg(long, value_name = "AMOUNT", default_value_t = 0)]
        compound_threshold: u64,
    },

    /// Execute an atomic token swap through a constant-product pool
    ///
    /// The swap is quoted, guarded by --max-slippage, and applied in one
    /// step under the pool's lock. Fees are deducted from amount_in.
    #[command(
        after_help = "\
EXAMPLES:
  # Swap 1 SOL for USDC
  a2a-swap convert --in SOL --out USDC --amount 1000000000

  # Tighter slippage tolerance (0.1%)
  a2a-swap convert --in SOL --out USDC --amount 1000000000 --max-slippage 0.1

  # Machine-readable output (for agent pipelines)
  a2a-swap convert --in SOL --out USDC --amount 1000000000 --json

FEE MODEL:
  protocol_fee  = amount_in × 0.020%       → treasury
  claim_fee     = amount_in × claim_bps     → fee vault (claimable per share)
  lp_fee        = amount_in × rest of fee   → stays in reserves
  estimated_out = reserve_out × net / (reserve_in + net)"
    )]
    Convert {
        /// Token to sell — symbol (SOL, USDC, USDT) or base-58 mint address
        #[arg(long = "in", value_name = "TOKEN")]
        token_in: String,

        /// Token to receive — symbol (SOL, USDC, USDT) or base-58 mint address
        #[arg(long = "out", value_name = "TOKEN")]
        token_out: String,

        /// Amount of the input token to sell (atomic units)
        #[arg(long, value_name = "AMOUNT")]
        amount: u64,

        /// Reject the swap if output falls more than this many percent below
        /// the quote. 0 = exact quote required, 100 = accept any output.
        #[arg(long, value_name = "PCT", default_value_t = 0.5)]
        max_slippage: f64,
    },

    /// Preview a swap's fee breakdown without changing any state
    ///
    /// Safe to call as often as needed. Returns all fee components,
    /// effective rate, and price impact.
    #[command(
        after_help = "\
EXAMPLES:
  a2a-swap simulate --in SOL --out USDC --amount 1000000000
  a2a-swap simulate --in SOL --out USDC --amount 1000000000 --json

OUTPUT FIELDS:
  protocol_fee   — 0.020% of amount_in, routed to the treasury
  lp_fee         — fee kept in the reserves
  claim_fee      — fee credited to LP shares as claimable
  net_in         — amount that moves the AMM curve
  estimated_out  — constant-product formula output
  effective_rate — estimated_out / amount_in (raw units)
  price_impact   — slippage from pool depth (excludes fee cost)"
    )]
    Simulate {
        /// Token to sell — symbol or base-58 mint address
        #[arg(long = "in", value_name = "TOKEN")]
        token_in: String,

        /// Token to receive — symbol or base-58 mint address
        #[arg(long = "out", value_name = "TOKEN")]
        token_out: String,

        /// Amount of the input token to simulate selling (atomic units)
        #[arg(long, value_name = "AMOUNT")]
        amount: u64,
    },

    /// List all LP positions owned by the agent keypair
    #[command(
        after_help = "\
EXAMPLES:
  a2a-swap my-positions
  a2a-swap my-positions --json
  a2a-swap my-positions --keypair ~/agent-keys/main.json"
    )]
    MyPositions,

    /// Show pool reserves, spot price, LP supply, and fee rate
    ///
    /// Read-only — no keypair required.
    #[command(
        after_help = "\
EXAMPLES:
  a2a-swap pool-info --pair SOL-USDC
  a2a-swap pool-info --pair <mintA>-<mintB> --json

  # Spot price is reserveB / reserveA in raw atomic units.
  # Divide by decimals to get a human price (e.g. 185.0 USDC/SOL)."
    )]
    PoolInfo {
        /// Token pair to query, e.g. SOL-USDC or <mintA>-<mintB>
        #[arg(long, value_name = "A-B")]
        pair: String,
    },

    /// Show unclaimed LP fees across all positions
    ///
    /// Includes fees accrued since each position's last checkpoint.
    /// Nothing is written — safe to poll frequently.
    #[command(
        after_help = "\
EXAMPLES:
  a2a-swap my-fees
  a2a-swap my-fees --json

  # To collect fees run: a2a-swap claim-fees --pair <PAIR>"
    )]
    MyFees,

    /// Burn LP shares and withdraw proportional tokens from a pool
    ///
    /// Fees are checkpointed before withdrawal but NOT paid out — run
    /// `claim-fees` separately to collect them.
    #[command(
        name = "remove-liquidity",
        after_help = "\
EXAMPLES:
  # Remove 1 000 000 LP shares from the SOL/USDC pool
  a2a-swap remove-liquidity --pair SOL-USDC --shares 1000000

  # With slippage guards (reject if you'd receive less than these amounts)
  a2a-swap remove-liquidity --pair SOL-USDC --shares 1000000 \\
    --min-a 450000000 --min-b 80000000

NOTES:
  Run `a2a-swap my-positions` to see your current LP share balance.
  --min-a / --min-b refer to the pool's token A / token B."
    )]
    RemoveLiquidity {
        /// Token pair of the pool, e.g. SOL-USDC or <mintA>-<mintB>
        #[arg(long, value_name = "A-B")]
        pair: String,

        /// Number of LP shares to burn
        #[arg(long, value_name = "SHARES")]
        shares: u64,

        /// Minimum token A to accept (slippage guard, atomic units)
        #[arg(long, value_name = "AMOUNT", default_value_t = 0)]
        min_a: u64,

        /// Minimum token B to accept (slippage guard, atomic units)
        #[arg(long, value_name = "AMOUNT", default_value_t = 0)]
        min_b: u64,
    },

    /// Claim accrued LP fees for one pool position
    ///
    /// If the position has auto_compound enabled AND total fees ≥ compound_threshold,
    /// fees are reinvested as additional LP shares. Otherwise they are paid out.
    #[command(
        name = "claim-fees",
        after_help = "\
EXAMPLES:
  a2a-swap claim-fees --pair SOL-USDC
  a2a-swap claim-fees --pair SOL-USDC --json

  # Check claimable amounts first:
  a2a-swap my-fees --json"
    )]
    ClaimFees {
        /// Token pair of the pool to claim fees from, e.g. SOL-USDC
        #[arg(long, value_name = "A-B")]
        pair: String,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::CreatePool { .. } => "create-pool",
            Commands::Provide { .. } => "provide",
            Commands::Convert { .. } => "convert",
            Commands::Simulate { .. } => "simulate",
            Commands::MyPositions => "my-positions",
            Commands::PoolInfo { .. } => "pool-info",
            Commands::MyFees => "my-fees",
            Commands::RemoveLiquidity { .. } => "remove-liquidity",
            Commands::ClaimFees { .. } => "claim-fees",
        }
    }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

fn main() {
    // When invoked with no arguments, show banner + full help and exit cleanly.
    if std::env::args().len() == 1 {
        print_banner();
        Cli::command().print_long_help().ok();
        println!();
        return;
    }

    let cli = Cli::parse();

    // Diagnostics go to stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(out) => {
            if cli.json {
                println!("{out}");
            }
        }
        Err(e) => {
            if cli.json {
                println!("{}", error_envelope(cli.command.name(), &e));
            }
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}

/// `--json` body printed in place of a command's result when it fails.
fn error_envelope(command: &str, err: &anyhow::Error) -> Value {
    json!({
        "status":  "error",
        "command": command,
        "error":   format!("{err:#}"),
    })
}

/// Execute the command. Human-readable output is printed here unless `--json`
/// is set; the JSON document is always returned for the caller to print.
fn run(cli: &Cli) -> Result<Value> {
    let client = open_client(&cli.state)?;
    let text = !cli.json;

    match &cli.command {
        Commands::CreatePool { pair, fee_bps, claim_fee_bps } => {
            let payer = load_keypair(&cli.keypair)?;
            cmd_create_pool(&client, &payer, pair, *fee_bps, *claim_fee_bps, text)
        }
        Commands::Provide { pair, amount, amount_b, min_lp, auto_compound, compound_threshold } => {
            let payer = load_keypair(&cli.keypair)?;
            let (mint_a, mint_b) = parse_pair(pair)?;
            nonzero(*amount, "--amount")?;
            let params = ProvideParams {
                mint_a,
                mint_b,
                amount_a: *amount,
                amount_b: *amount_b,
                min_lp: *min_lp,
                auto_compound: *auto_compound,
                compound_threshold: *compound_threshold,
            };
            cmd_provide(&client, &payer, pair, params, text)
        }
        Commands::Convert { token_in, token_out, amount, max_slippage } => {
            let payer = load_keypair(&cli.keypair)?;
            cmd_convert(&client, &payer, token_in, token_out, *amount, *max_slippage, text)
        }
        Commands::Simulate { token_in, token_out, amount } => {
            cmd_simulate(&client, token_in, token_out, *amount, text)
        }
        Commands::MyPositions => {
            let payer = load_keypair(&cli.keypair)?;
            cmd_my_positions(&client, &payer.pubkey(), text)
        }
        Commands::PoolInfo { pair } => cmd_pool_info(&client, pair, text),
        Commands::MyFees => {
            let payer = load_keypair(&cli.keypair)?;
            cmd_my_fees(&client, &payer.pubkey(), text)
        }
        Commands::RemoveLiquidity { pair, shares, min_a, min_b } => {
            let payer = load_keypair(&cli.keypair)?;
            cmd_remove_liquidity(&client, &payer, pair, *shares, *min_a, *min_b, text)
        }
        Commands::ClaimFees { pair } => {
            let payer = load_keypair(&cli.keypair)?;
            cmd_claim_fees(&client, &payer, pair, text)
        }
    }
}

// ─── create-pool ─────────────────────────────────────────────────────────────

fn cmd_create_pool(
    client: &A2ASwapClient,
    payer: &Keypair,
    pair: &str,
    fee_rate_bps: u16,
    claim_fee_bps: u16,
    text: bool,
) -> Result<Value> {
    let (mint_a, mint_b) = parse_pair(pair)?;
    let r = client
        .create_pool(payer, CreatePoolParams { mint_a, mint_b, fee_rate_bps, claim_fee_bps })
        .context("create_pool failed")?;

    if text {
        println!("─── Pool Created ─────────────────────────────────────────────────");
        println!("  Pair             {pair}");
        println!("  Token A          {}  ({})", resolve_symbol(&r.mint_a), r.mint_a);
        println!("  Token B          {}  ({})", resolve_symbol(&r.mint_b), r.mint_b);
        println!("  Pool             {}", r.pool);
        println!("  Fee rate         {} bps  ({:.2}% per swap)", r.fee_rate_bps, r.fee_rate_bps as f64 / 100.0);
        if r.claim_fee_bps > 0 {
            println!("  Claimable fee    {} bps  (paid per LP share)", r.claim_fee_bps);
        }
        println!("  Signature        {}", r.signature);
        println!();
        println!("  Run `a2a-swap provide --pair {pair} --amount <AMT_A> --amount-b <AMT_B>`");
        println!("  to seed the pool with initial liquidity.");
    }
    Ok(json!({
        "status":        "ok",
        "command":       "create-pool",
        "pair":          pair,
        "pool":          r.pool.to_string(),
        "token_a_mint":  r.mint_a.to_string(),
        "token_b_mint":  r.mint_b.to_string(),
        "fee_rate_bps":  r.fee_rate_bps,
        "claim_fee_bps": r.claim_fee_bps,
        "signature":     r.signature,
    }))
}

// ─── provide ─────────────────────────────────────────────────────────────────

fn cmd_provide(
    client: &A2ASwapClient,
    payer: &Keypair,
    pair: &str,
    params: ProvideParams,
    text: bool,
) -> Result<Value> {
    let auto_compound = params.auto_compound;
    let compound_threshold = params.compound_threshold;
    let r = client
        .provide_liquidity(payer, params)
        .with_context(|| format!(
            "provide_liquidity failed for '{pair}'.\n  \
             Run `a2a-swap pool-info --pair {pair}` to check the pool."
        ))?;

    if text {
        println!("─── Liquidity Provided ───────────────────────────────────────────");
        println!("  Pair             {pair}");
        println!("  Pool             {}", r.pool);
        println!("  Position         {}", r.position);
        println!("  Deposited A      {:>20}", r.amount_a);
        println!("  Deposited B      {:>20}", r.amount_b);
        println!("  LP shares        {:>20}", r.lp_shares);
        println!("  Auto-compound    {}", if auto_compound { "enabled" } else { "disabled" });
        if auto_compound && compound_threshold > 0 {
            println!("  Cmpnd threshold  {:>20}", compound_threshold);
        }
        println!("  Signature        {}", r.signature);
        println!();
        println!("  Run `a2a-swap my-fees --json` to check claimable LP fee balances.");
    }
    Ok(json!({
        "status":             "ok",
        "command":            "provide",
        "pair":               pair,
        "pool":               r.pool.to_string(),
        "position":           r.position.to_string(),
        "amount_a":           r.amount_a,
        "amount_b":           r.amount_b,
        "lp_shares":          r.lp_shares,
        "auto_compound":      auto_compound,
        "compound_threshold": compound_threshold,
        "signature":          r.signature,
    }))
}

// ─── convert ─────────────────────────────────────────────────────────────────

fn cmd_convert(
    client: &A2ASwapClient,
    payer: &Keypair,
    token_in: &str,
    token_out: &str,
    amount_in: u64,
    max_slippage: f64,
    text: bool,
) -> Result<Value> {
    let mint_in  = resolve_mint(token_in).context("--in")?;
    let mint_out = resolve_mint(token_out).context("--out")?;
    if mint_in == mint_out {
        return Err(anyhow!("--in and --out must be different tokens."));
    }
    nonzero(amount_in, "--amount")?;
    if !(0.0..=100.0).contains(&max_slippage) {
        return Err(anyhow!(
            "--max-slippage {} is out of range. Use 0–100 (percent). Default 0.5 = 0.5%.",
            max_slippage
        ));
    }

    let r = client
        .convert(payer, SwapParams { mint_in, mint_out, amount_in, max_slippage_pct: max_slippage })
        .context("swap failed")?;

    if text {
        let dir = if r.a_to_b { "A → B" } else { "B → A" };
        println!("─── Swap Executed ────────────────────────────────────────────────");
        println!("  Direction        {dir}  ({token_in} → {token_out})");
        println!("  Pool             {}", r.pool);
        println!();
        println!("  ─── Fee Breakdown ────────────────────────────────");
        println!("  Sold             {:>20}  {token_in}", r.amount_in);
        println!("  Protocol fee     {:>20}  (→ treasury {})", r.protocol_fee, r.treasury);
        println!("  LP fee           {:>20}", r.lp_fee);
        if r.claim_fee > 0 {
            println!("  Claimable fee    {:>20}", r.claim_fee);
        }
        println!();
        println!("  ─── Output ───────────────────────────────────────");
        println!("  Received         {:>20}  {token_out}", r.estimated_out);
        println!("  Min accepted     {:>20}  {token_out}  ({:.1}% slippage guard)", r.min_amount_out, max_slippage);
        println!();
        println!("  Signature        {}", r.signature);
    }
    Ok(json!({
        "status":         "ok",
        "command":        "convert",
        "token_in":       token_in,
        "token_out":      token_out,
        "pool":           r.pool.to_string(),
        "a_to_b":         r.a_to_b,
        "amount_in":      r.amount_in,
        "protocol_fee":   r.protocol_fee,
        "lp_fee":         r.lp_fee,
        "claim_fee":      r.claim_fee,
        "estimated_out":  r.estimated_out,
        "min_amount_out": r.min_amount_out,
        "signature":      r.signature,
    }))
}

// ─── simulate ────────────────────────────────────────────────────────────────

fn cmd_simulate(
    client: &A2ASwapClient,
    token_in: &str,
    token_out: &str,
    amount_in: u64,
    text: bool,
) -> Result<Value> {
    let mint_in  = resolve_mint(token_in).context("--in")?;
    let mint_out = resolve_mint(token_out).context("--out")?;
    if mint_in == mint_out {
        return Err(anyhow!("--in and --out must be different tokens."));
    }
    nonzero(amount_in, "--amount")?;

    let sim = client
        .simulate(SimulateParams { mint_in, mint_out, amount_in })
        .with_context(|| format!(
            "Cannot simulate {token_in} → {token_out}.\n  \
             Run `a2a-swap provide --pair {token_in}-{token_out}` to seed the pool first."
        ))?;

    if text {
        let dir = if sim.a_to_b { "A → B" } else { "B → A" };
        println!("─── Swap Simulation ──────────────────────────────────────────────");
        println!("  {token_in} → {token_out}  [{dir}]");
        println!("  Pool             {}", sim.pool);
        println!("  Reserve in       {:>20}", sim.reserve_in);
        println!("  Reserve out      {:>20}", sim.reserve_out);
        println!();
        println!("  ─── Fee Breakdown ────────────────────────────────");
        println!("  Amount in        {:>20}", sim.amount_in);
        println!("  Protocol fee     {:>20}  ({:.3}%  →  treasury)",
                 sim.protocol_fee, PROTOCOL_FEE_BPS as f64 / 100.0);
        println!("  LP fee           {:>20}  (stays in reserves)", sim.lp_fee);
        println!("  Claimable fee    {:>20}  (→ LP fee vault)", sim.claim_fee);
        println!("  Net to curve     {:>20}  ({:.2}% total fee)",
                 sim.net_in, sim.fee_rate_bps as f64 / 100.0);
        println!();
        println!("  ─── Output Estimate ──────────────────────────────");
        println!("  Estimated out    {:>20}", sim.estimated_out);
        println!("  Effective rate   {:>20.8}  {token_out}/{token_in} (raw units)",
                 sim.effective_rate);
        println!("  Price impact     {:>19.4}%", sim.price_impact_pct);
        println!();
        println!("  Nothing written.  To execute:");
        println!("    a2a-swap convert --in {token_in} --out {token_out} --amount {amount_in}");
    }
    Ok(json!({
        "status":           "ok",
        "command":          "simulate",
        "token_in":         token_in,
        "token_out":        token_out,
        "pool":             sim.pool.to_string(),
        "a_to_b":           sim.a_to_b,
        "amount_in":        sim.amount_in,
        "protocol_fee":     sim.protocol_fee,
        "lp_fee":           sim.lp_fee,
        "claim_fee":        sim.claim_fee,
        "net_in":           sim.net_in,
        "estimated_out":    sim.estimated_out,
        "effective_rate":   sim.effective_rate,
        "price_impact_pct": sim.price_impact_pct,
        "fee_rate_bps":     sim.fee_rate_bps,
        "reserve_in":       sim.reserve_in,
        "reserve_out":      sim.reserve_out,
    }))
}

// ─── my-positions ─────────────────────────────────────────────────────────────

fn cmd_my_positions(client: &A2ASwapClient, owner: &Pubkey, text: bool) -> Result<Value> {
    let positions = client.my_positions(owner).context("cannot list positions")?;

    let items = positions.iter().map(|p| -> Result<Value> {
        let mut item = serde_json::to_value(p)?;
        item["pair"] = json!(pair_label(&p.mint_a, &p.mint_b));
        Ok(item)
    }).collect::<Result<Vec<_>>>()?;
    let out = json!({
        "status": "ok", "command": "my-positions",
        "agent": owner.to_string(), "positions": items,
    });
    if !text {
        return Ok(out);
    }

    println!("─── My Positions ─────────────────────────────────────────────────");
    println!("  Agent   {owner}");
    println!();
    if positions.is_empty() {
        println!("  No LP positions found.");
        println!("  Run `a2a-swap provide --pair <PAIR> --amount <AMT>` to become an LP.");
        return Ok(out);
    }
    for (i, p) in positions.iter().enumerate() {
        println!("  [{i:>2}]  Pair       {}", pair_label(&p.mint_a, &p.mint_b));
        println!("        Position   {}", p.address);
        println!("        Pool       {}", p.pool);
        println!("        LP shares  {:>20}  ({:.4}% of pool)", p.lp_shares, p.pool_share_pct);
        println!("        Value A    {:>20}", p.value_a);
        println!("        Value B    {:>20}", p.value_b);
        println!("        Auto-cmpnd {}{}",
            if p.auto_compound { "enabled" } else { "disabled" },
            if p.auto_compound && p.compound_threshold > 0 {
                format!("  (threshold: {})", p.compound_threshold)
            } else { String::new() });
        println!();
    }
    println!("  Total: {} position(s)  ·  run `my-fees` to see claimable balances", positions.len());
    Ok(out)
}

// ─── pool-info ────────────────────────────────────────────────────────────────

fn cmd_pool_info(client: &A2ASwapClient, pair: &str, text: bool) -> Result<Value> {
    let (mint_a, mint_b) = parse_pair(pair)?;
    let info = client
        .pool_info(mint_a, mint_b)
        .with_context(|| format!(
            "Pool not found for '{pair}'. Run `a2a-swap create-pool --pair {pair}` first."
        ))?;
    let s = &info.summary;

    if text {
        let (sym_a, sym_b) = (resolve_symbol(&s.mint_a), resolve_symbol(&s.mint_b));
        println!("─── Pool Info ────────────────────────────────────────────────────");
        println!("  Pair             {sym_a}-{sym_b}");
        println!("  Pool             {}", info.pool);
        println!("  Token A          {sym_a}  ({})", s.mint_a);
        println!("  Token B          {sym_b}  ({})", s.mint_b);
        println!();
        println!("  Reserve A        {:>20}", s.reserve_a);
        println!("  Reserve B        {:>20}", s.reserve_b);
        println!("  LP supply        {:>20}", s.lp_supply);
        println!("  Spot price       {:>20.8}  {sym_b}/{sym_a} (raw units)", s.spot_price);
        println!("  Fee rate         {} bps  ({:.2}% per swap)", s.fee_rate_bps, s.fee_rate_bps as f64 / 100.0);
        if s.claim_fee_bps > 0 {
            println!("  Claimable fee    {} bps", s.claim_fee_bps);
            println!("  Fee vault A      {:>20}", info.fee_vault_a);
            println!("  Fee vault B      {:>20}", info.fee_vault_b);
        }
        println!("  Protocol fees A  {:>20}", info.protocol_fees_a);
        println!("  Protocol fees B  {:>20}", info.protocol_fees_b);
        if info.halted {
            println!();
            println!("  HALTED: fee accounting fault detected; the pool accepts no further writes.");
        }
    }
    Ok(json!({
        "status":          "ok",
        "command":         "pool-info",
        "pair":            pair,
        "pool":            info.pool.to_string(),
        "token_a_mint":    s.mint_a.to_string(),
        "token_b_mint":    s.mint_b.to_string(),
        "reserve_a":       s.reserve_a,
        "reserve_b":       s.reserve_b,
        "lp_supply":       s.lp_supply,
        "fee_rate_bps":    s.fee_rate_bps,
        "claim_fee_bps":   s.claim_fee_bps,
        "spot_price":      s.spot_price,
        "fee_vault_a":     info.fee_vault_a,
        "fee_vault_b":     info.fee_vault_b,
        "protocol_fees_a": info.protocol_fees_a,
        "protocol_fees_b": info.protocol_fees_b,
        "halted":          info.halted,
    }))
}

// ─── my-fees ──────────────────────────────────────────────────────────────────

fn cmd_my_fees(client: &A2ASwapClient, owner: &Pubkey, text: bool) -> Result<Value> {
    let report = client.my_fees(owner).context("cannot compute fees")?;

    let mut labels = Vec::with_capacity(report.positions.len());
    for p in &report.positions {
        let pool = client.ledger().pool(&p.pool)?;
        labels.push(pair_label(&pool.mint_a, &pool.mint_b));
    }

    let items: Vec<_> = report.positions.iter().zip(&labels).map(|(p, label)| json!({
        "address":   p.address.to_string(),
        "pool":      p.pool.to_string(),
        "pair":      label,
        "lp_shares": p.lp_shares,
        "fees_a":    p.fees_a,
        "fees_b":    p.fees_b,
    })).collect();
    let out = json!({
        "status": "ok", "command": "my-fees",
        "agent": owner.to_string(),
        "positions": items,
        "total_fees_a": report.total_fees_a,
        "total_fees_b": report.total_fees_b,
    });
    if !text {
        return Ok(out);
    }

    println!("─── My Fees ──────────────────────────────────────────────────────");
    println!("  Agent   {owner}");
    println!();
    if report.positions.is_empty() {
        println!("  No LP positions found, so no fees to show.");
        println!("  Run `a2a-swap provide --pair <PAIR> --amount <AMT>` to earn LP fees.");
        return Ok(out);
    }
    for (i, (p, label)) in report.positions.iter().zip(&labels).enumerate() {
        println!("  [{:>2}]  Pair       {label}", i + 1);
        println!("        Position   {}", p.address);
        println!("        LP shares  {:>20}", p.lp_shares);
        println!("        Fees A     {:>20}  (token A, atomic units)", p.fees_a);
        println!("        Fees B     {:>20}  (token B, atomic units)", p.fees_b);
        println!();
    }
    println!("  ─── Totals ───────────────────────────────────────");
    println!("  Total fees A     {:>20}  (across {} position(s))", report.total_fees_a, labels.len());
    println!("  Total fees B     {:>20}  (across {} position(s))", report.total_fees_b, labels.len());
    println!();
    println!("  Amounts are in atomic units (lamports, μUSDC, etc.).");
    Ok(out)
}

// ─── remove-liquidity ────────────────────────────────────────────────────────

fn cmd_remove_liquidity(
    client: &A2ASwapClient,
    payer: &Keypair,
    pair: &str,
    lp_shares: u64,
    min_a: u64,
    min_b: u64,
    text: bool,
) -> Result<Value> {
    let (mint_a, mint_b) = parse_pair(pair)?;
    nonzero(lp_shares, "--shares")?;

    let r = client
        .remove_liquidity(payer, RemoveParams { mint_a, mint_b, lp_shares, min_a, min_b })
        .with_context(|| format!(
            "remove_liquidity failed for '{pair}'.\n  \
             Run `a2a-swap my-positions` to see your LP share balance."
        ))?;

    if text {
        println!("─── Liquidity Removed ────────────────────────────────────────────");
        println!("  Pair             {pair}");
        println!("  Pool             {}", r.pool);
        println!("  Position         {}", r.position);
        println!("  Shares burned    {:>20}", r.lp_shares);
        println!("  Received A       {:>20}", r.amount_a);
        println!("  Received B       {:>20}", r.amount_b);
        println!("  Signature        {}", r.signature);
        println!();
        println!("  Run `a2a-swap claim-fees --pair {pair}` to collect accrued fees.");
    }
    Ok(json!({
        "status":     "ok",
        "command":    "remove-liquidity",
        "pair":       pair,
        "pool":       r.pool.to_string(),
        "position":   r.position.to_string(),
        "lp_shares":  r.lp_shares,
        "expected_a": r.amount_a,
        "expected_b": r.amount_b,
        "tx":         r.signature,
    }))
}

// ─── claim-fees ───────────────────────────────────────────────────────────────

fn cmd_claim_fees(
    client: &A2ASwapClient,
    payer: &Keypair,
    pair: &str,
    text: bool,
) -> Result<Value> {
    let (mint_a, mint_b) = parse_pair(pair)?;
    let r = client
        .claim_fees(payer, mint_a, mint_b)
        .with_context(|| format!(
            "claim_fees failed for '{pair}'.\n  \
             Run `a2a-swap my-positions` to see your LP positions."
        ))?;

    let (Some(c), Some(sig)) = (r.claim, r.signature.as_deref()) else {
        if text {
            println!("─── Claim Fees ───────────────────────────────────────────────────");
            println!("  Pair       {pair}");
            println!("  Position   {}", r.position);
            println!();
            println!("  No fees to claim for this position.");
        }
        return Ok(json!({
            "status":   "ok",
            "command":  "claim-fees",
            "pair":     pair,
            "pool":     r.pool.to_string(),
            "position": r.position.to_string(),
            "fees_a":   0,
            "fees_b":   0,
            "note":     "No fees to claim",
        }));
    };

    if text {
        println!("─── Fees Claimed ─────────────────────────────────────────────────");
        println!("  Pair             {pair}");
        println!("  Pool             {}", r.pool);
        println!("  Position         {}", r.position);
        println!("  Fees A           {:>20}  (token A, atomic units)", c.fees_a);
        println!("  Fees B           {:>20}  (token B, atomic units)", c.fees_b);
        match c.compounded {
            Some(d) => {
                println!("  Compounded       {:>20}  LP shares", d.minted_shares);
                println!("  Paid out A       {:>20}", c.paid_a);
                println!("  Paid out B       {:>20}", c.paid_b);
            }
            None => println!("  Mode             transferred to agent wallet"),
        }
        println!("  Signature        {sig}");
    }
    Ok(json!({
        "status":        "ok",
        "command":       "claim-fees",
        "pair":          pair,
        "pool":          r.pool.to_string(),
        "position":      r.position.to_string(),
        "fees_a":        c.fees_a,
        "fees_b":        c.fees_b,
        "paid_a":        c.paid_a,
        "paid_b":        c.paid_b,
        "compounded_shares": c.compounded.map(|d| d.minted_shares).unwrap_or(0),
        "auto_compound": r.auto_compound,
        "tx":            sig,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::signature::{write_keypair_file, Signature};

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn long_version_names_the_program() {
        let text = Cli::command().render_long_version();
        assert!(text.contains(&PROGRAM_ID.to_string()));
        assert!(text.contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn symbols_resolve_case_insensitively() {
        let sol = resolve_mint("sol").unwrap();
        assert_eq!(sol.to_string(), "So11111111111111111111111111111111111111112");
        assert_eq!(resolve_symbol(&sol), "SOL");

        let raw = Pubkey::new_unique();
        assert_eq!(resolve_mint(&raw.to_string()).unwrap(), raw);
        assert!(resolve_symbol(&raw).contains('…'));
        assert!(resolve_mint("DOGE").is_err());
    }

    #[test]
    fn pairs_must_name_two_distinct_tokens() {
        let (a, b) = parse_pair("SOL-USDC").unwrap();
        assert_eq!(resolve_symbol(&a), "SOL");
        assert_eq!(resolve_symbol(&b), "USDC");
        assert!(parse_pair("SOL").is_err());
        assert!(parse_pair("SOL-").is_err());
        assert!(parse_pair("SOL-sol").is_err());
    }

    #[test]
    fn home_prefix_is_expanded() {
        let home = std::env::var("HOME").unwrap_or_default();
        assert_eq!(expand_home("~/x/y.json"), format!("{home}/x/y.json"));
        assert_eq!(expand_home("/abs/path"), "/abs/path");
    }

    #[test]
    fn slippage_flag_defaults_to_half_a_percent() {
        let cli = Cli::try_parse_from(["a2a-swap", "convert", "--in", "SOL", "--out", "USDC", "--amount", "5"]).unwrap();
        match cli.command {
            Commands::Convert { max_slippage, amount, .. } => {
                assert_eq!(max_slippage, 0.5);
                assert_eq!(amount, 5);
            }
            _ => panic!("wrong subcommand"),
        }
    }

    #[test]
    fn json_output_against_a_ledger_file() {
        let dir = tempfile::tempdir().unwrap();
        let keypair = dir.path().join("id.json");
        write_keypair_file(&Keypair::new(), &keypair).unwrap();
        let state = dir.path().join("ledger.json");

        let parse = |args: &[&str]| {
            let mut argv = vec![
                "a2a-swap", "--json",
                "--state", state.to_str().unwrap(),
                "--keypair", keypair.to_str().unwrap(),
            ];
            argv.extend_from_slice(args);
            Cli::try_parse_from(argv).unwrap()
        };
        let run_args = |args: &[&str]| run(&parse(args));

        let created = run_args(&["create-pool", "--pair", "SOL-USDC", "--claim-fee-bps", "5"]).unwrap();
        assert_eq!(created["status"], "ok");
        assert_eq!(created["claim_fee_bps"], 5);

        let provided = run_args(&["provide", "--pair", "SOL-USDC", "--amount", "1000000000", "--amount-b", "2000000000"]).unwrap();
        let lp_shares = provided["lp_shares"].as_u64().unwrap();
        assert!(lp_shares > 0);

        let sim = run_args(&["simulate", "--in", "USDC", "--out", "SOL", "--amount", "10000000"]).unwrap();
        let swapped = run_args(&["convert", "--in", "USDC", "--out", "SOL", "--amount", "10000000"]).unwrap();
        assert_eq!(swapped["command"], "convert");
        assert_eq!(swapped["a_to_b"], false);
        assert_eq!(swapped["estimated_out"], sim["estimated_out"]);
        assert!(swapped["estimated_out"].as_u64().unwrap() > 0);
        Signature::from_str(swapped["signature"].as_str().unwrap()).unwrap();

        // USDC is token B, so only B fees accrue
        let fees = run_args(&["my-fees"]).unwrap();
        let positions = fees["positions"].as_array().unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0]["pair"], "SOL-USDC");
        assert_eq!(positions[0]["lp_shares"], lp_shares);
        assert_eq!(fees["total_fees_a"], 0);
        let total_b = fees["total_fees_b"].as_u64().unwrap();
        assert!(total_b > 0);
        assert_eq!(positions[0]["fees_b"], total_b);

        let claimed = run_args(&["claim-fees", "--pair", "USDC-SOL"]).unwrap();
        assert_eq!(claimed["fees_b"], total_b);
        assert_eq!(claimed["paid_b"], total_b);
        assert!(claimed["tx"].is_string());
        assert!(claimed.get("note").is_none());

        let nothing = run_args(&["claim-fees", "--pair", "SOL-USDC"]).unwrap();
        assert_eq!(nothing["note"], "No fees to claim");
        assert_eq!((nothing["fees_a"].as_u64(), nothing["fees_b"].as_u64()), (Some(0), Some(0)));
        assert!(nothing.get("tx").is_none());

        let info = run_args(&["pool-info", "--pair", "SOL-USDC"]).unwrap();
        let (reserve_a, reserve_b, supply) = (
            info["reserve_a"].as_u64().unwrap(),
            info["reserve_b"].as_u64().unwrap(),
            info["lp_supply"].as_u64().unwrap(),
        );
        let removed = run_args(&["remove-liquidity", "--pair", "SOL-USDC", "--shares", "1000"]).unwrap();
        assert_eq!(removed["lp_shares"], 1000);
        assert_eq!(removed["expected_a"], (1000 * reserve_a as u128 / supply as u128) as u64);
        assert_eq!(removed["expected_b"], (1000 * reserve_b as u128 / supply as u128) as u64);
        assert!(removed["tx"].is_string());

        let listed = run_args(&["my-positions"]).unwrap();
        assert_eq!(listed["positions"][0]["lp_shares"], lp_shares - 1000);
        assert_eq!(listed["positions"][0]["pair"], "SOL-USDC");

        let cli = parse(&["create-pool", "--pair", "USDC-SOL"]);
        let err = run(&cli).unwrap_err();
        let envelope = error_envelope(cli.command.name(), &err);
        assert_eq!(envelope["status"], "error");
        assert_eq!(envelope["command"], "create-pool");
        assert!(envelope["error"].as_str().unwrap().contains("already exists"));

        let err = run_args(&["convert", "--in", "SOL", "--out", "USDC", "--amount", "1", "--max-slippage", "101"]).unwrap_err();
        assert!(format!("{err:#}").contains("out of range"));
    }
}
