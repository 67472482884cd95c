//! SDK error type.

use a2a_swap::AmmError;
use solana_sdk::pubkey::Pubkey;

/// All errors returned by the A2A-Swap SDK.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // ── Engine ───────────────────────────────────────────────────────────────
    /// The pool engine refused the transition; nothing was written.
    #[error(transparent)]
    Amm(#[from] AmmError),

    // ── Pool discovery ───────────────────────────────────────────────────────
    /// No pool exists for the given mint pair in either ordering.
    #[error("Pool not found for mints {0} / {1}")]
    PoolNotFound(Pubkey, Pubkey),

    /// A pool for this pair already exists (in either ordering).
    #[error("Pool {0} already exists for this mint pair")]
    PoolExists(Pubkey),

    #[error("No position for owner {owner} in pool {pool}")]
    PositionNotFound { pool: Pubkey, owner: Pubkey },

    // ── Ledger file ──────────────────────────────────────────────────────────
    #[error("Ledger I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ledger JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Validation ───────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// The engine error behind this one, if any.
    pub fn amm(&self) -> Option<&AmmError> {
        match self {
            Error::Amm(e) => Some(e),
            _ => None,
        }
    }
}

/// Convenience alias so every module can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;
