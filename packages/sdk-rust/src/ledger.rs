//! In-process store for pools and positions.
//!
//! Each pool and its positions sit behind their own `RwLock`; the outer map
//! lock is held only long enough to find or insert a pool cell. Mutations
//! run the engine against the locked slot, which stages on a copy and only
//! writes back on success. An accumulator fault halts the pool for good.
//!
//! With a backing file the file is the source of truth. Every write takes an
//! exclusive advisory lock on a `<file>.lock` sidecar, re-reads the file,
//! applies the mutation and saves before releasing the lock, so writers in
//! other threads and processes never overwrite each other. Saves go to a
//! unique temporary sibling that is renamed into place.

use std::{
    collections::HashMap,
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use a2a_swap::{
    claim, initialize_pool, math::mul_div, provide_liquidity, quote_swap, remove_liquidity,
    state::b58, AmmError, ClaimOutcome, Deposit, Pool, Position, PositionId, PositionIndex,
    SwapGuard, SwapQuote, SwapReceipt, Withdrawal,
};
use fs4::fs_std::FileExt;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::{
    error::{Error, Result},
    pda::{derive_pool, derive_position},
    types::ProvideParams,
};

const LEDGER_VERSION: u32 = 1;

// ─── Slots ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PositionEntry {
    #[serde(with = "b58")]
    address: Pubkey,
    position: Position,
}

/// A pool and its open positions, keyed by owner.
#[derive(Debug)]
struct PoolSlot {
    pool: Pool,
    positions: HashMap<Pubkey, PositionEntry>,
}

type Cell = Arc<RwLock<PoolSlot>>;

// ─── File format ──────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct LedgerFile {
    version: u32,
    #[serde(with = "b58")]
    program_id: Pubkey,
    pools: Vec<PoolRecord>,
}

#[derive(Serialize, Deserialize)]
struct PoolRecord {
    #[serde(with = "b58")]
    address: Pubkey,
    pool: Pool,
    positions: Vec<PositionEntry>,
}

// ─── Backing file ─────────────────────────────────────────────────────────────

struct Store {
    path: PathBuf,
    lock_path: PathBuf,
    /// Queues this process's writers ahead of the file lock.
    writer: Mutex<()>,
}

impl Store {
    fn new(path: PathBuf) -> Self {
        let mut lock_path = path.clone().into_os_string();
        lock_path.push(".lock");
        Self { path, lock_path: lock_path.into(), writer: Mutex::new(()) }
    }
}

/// Advisory lock on the sidecar file; released when dropped.
struct FileLock(File);

impl FileLock {
    fn acquire(path: &Path, exclusive: bool) -> io::Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;
        if exclusive {
            FileExt::lock_exclusive(&file)?;
        } else {
            FileExt::lock_shared(&file)?;
        }
        Ok(Self(file))
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.0) {
            warn!(error = %e, "failed to release ledger lock");
        }
    }
}

// ─── Ledger ───────────────────────────────────────────────────────────────────

pub struct Ledger {
    program_id: Pubkey,
    pools: RwLock<HashMap<Pubkey, Cell>>,
    store: Option<Store>,
}

impl Ledger {
    /// Empty ledger that is never written to disk.
    pub fn in_memory(program_id: Pubkey) -> Self {
        Self { program_id, pools: RwLock::new(HashMap::new()), store: None }
    }

    /// Ledger backed by the file at `path`, which is created on the first
    /// write. Existing contents are loaded and validated now.
    pub fn open(path: impl Into<PathBuf>, program_id: Pubkey) -> Result<Self> {
        let ledger = Self {
            program_id,
            pools: RwLock::new(HashMap::new()),
            store: Some(Store::new(path.into())),
        };
        ledger.refresh()?;
        Ok(ledger)
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    pub fn path(&self) -> Option<&Path> {
        self.store.as_ref().map(|s| s.path.as_path())
    }

    /// Pick up writes made through other handles on the same file. No-op for
    /// in-memory ledgers.
    pub fn refresh(&self) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let _lock = FileLock::acquire(&store.lock_path, false)?;
        self.reload(store)
    }

    /// Replace the in-memory pools with the file's. Existing cells are
    /// updated in place so handles already taken see the new state.
    fn reload(&self, store: &Store) -> Result<()> {
        let slots = match fs::read(&store.path) {
            Ok(raw) => self.decode(serde_json::from_slice(&raw)?)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        let mut pools = self.pools.write();
        pools.retain(|address, _| slots.contains_key(address));
        for (address, slot) in slots {
            if let Some(cell) = pools.get(&address) {
                *cell.write() = slot;
                continue;
            }
            pools.insert(address, Arc::new(RwLock::new(slot)));
        }
        debug!(path = %store.path.display(), pools = pools.len(), "ledger loaded");
        Ok(())
    }

    fn decode(&self, file: LedgerFile) -> Result<HashMap<Pubkey, PoolSlot>> {
        if file.version != LEDGER_VERSION {
            return Err(Error::InvalidArgument(format!(
                "unsupported ledger version {} (expected {LEDGER_VERSION})",
                file.version
            )));
        }
        if file.program_id != self.program_id {
            return Err(Error::InvalidArgument(format!(
                "ledger belongs to program {}, not {}",
                file.program_id, self.program_id
            )));
        }

        let mut slots = HashMap::with_capacity(file.pools.len());
        for record in file.pools {
            let (expected, _) = derive_pool(&record.pool.mint_a, &record.pool.mint_b, &self.program_id);
            if expected != record.address {
                return Err(Error::InvalidArgument(format!(
                    "pool {} does not match its mints",
                    record.address
                )));
            }
            let mut positions = HashMap::with_capacity(record.positions.len());
            for entry in record.positions {
                if entry.position.pool != record.address {
                    return Err(Error::InvalidArgument(format!(
                        "position {} is filed under the wrong pool",
                        entry.address
                    )));
                }
                positions.insert(entry.position.owner, entry);
            }
            slots.insert(record.address, PoolSlot { pool: record.pool, positions });
        }
        Ok(slots)
    }

    /// Write every pool to the backing file.
    fn persist(&self, store: &Store) -> Result<()> {
        let mut pools: Vec<PoolRecord> = self
            .cells()
            .into_iter()
            .map(|(address, cell)| {
                let slot = cell.read();
                let mut positions: Vec<PositionEntry> = slot.positions.values().cloned().collect();
                positions.sort_by_key(|e| e.address);
                PoolRecord { address, pool: slot.pool.clone(), positions }
            })
            .collect();
        pools.sort_by_key(|r| r.address);

        let file = LedgerFile { version: LEDGER_VERSION, program_id: self.program_id, pools };
        let bytes = serde_json::to_vec_pretty(&file)?;

        let dir = match store.path.parent() {
            Some(d) if !d.as_os_str().is_empty() => d,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.persist(&store.path).map_err(|e| e.error)?;
        debug!(path = %store.path.display(), "ledger saved");
        Ok(())
    }

    /// Run a mutation as one transaction against the backing file.
    ///
    /// In memory this is just `op`. With a file, the process-wide writer
    /// mutex and the exclusive file lock are held from reload to save. The
    /// result is saved on success and also when `op` halted a pool. A failed
    /// save reloads the file, dropping the unsaved change, and is returned.
    fn write<T>(&self, op: impl FnOnce() -> Result<T>) -> Result<T> {
        let Some(store) = &self.store else {
            return op();
        };
        let _writer = store.writer.lock();
        let _lock = FileLock::acquire(&store.lock_path, true)?;
        self.reload(store)?;

        let out = op();
        let halted = matches!(out, Err(Error::Amm(AmmError::AccumulatorInvariantViolated)));
        if out.is_err() && !halted {
            return out;
        }
        if let Err(e) = self.persist(store) {
            if halted {
                warn!(error = %e, "failed to save halted pool");
                return out;
            }
            if let Err(reload) = self.reload(store) {
                warn!(error = %reload, "failed to roll back after a failed save");
            }
            return Err(e);
        }
        out
    }

    // ── Pools ─────────────────────────────────────────────────────────────────

    /// Create an empty pool. Fails if the pair exists in either ordering.
    pub fn create_pool(
        &self,
        mint_a: Pubkey,
        mint_b: Pubkey,
        fee_rate_bps: u16,
        claim_fee_bps: u16,
    ) -> Result<(Pubkey, Pool)> {
        let pool = initialize_pool(mint_a, mint_b, fee_rate_bps, claim_fee_bps)?;
        let (address, _) = derive_pool(&mint_a, &mint_b, &self.program_id);
        let (reversed, _) = derive_pool(&mint_b, &mint_a, &self.program_id);

        self.write(|| {
            let mut pools = self.pools.write();
            for existing in [address, reversed] {
                if pools.contains_key(&existing) {
                    return Err(Error::PoolExists(existing));
                }
            }
            let slot = PoolSlot { pool: pool.clone(), positions: HashMap::new() };
            pools.insert(address, Arc::new(RwLock::new(slot)));
            Ok(())
        })?;

        info!(pool = %address, %mint_a, %mint_b, fee_rate_bps, claim_fee_bps, "pool created");
        Ok((address, pool))
    }

    /// Look a pool up by its pair in either order.
    ///
    /// Returns `(address, x_is_a)`: `x_is_a` is `true` when `mint_x` is the
    /// pool's token A. A file-backed ledger re-reads the file on a miss.
    pub fn find_pool(&self, mint_x: &Pubkey, mint_y: &Pubkey) -> Result<(Pubkey, bool)> {
        if let Some(found) = self.lookup(mint_x, mint_y) {
            return Ok(found);
        }
        if self.store.is_some() {
            self.refresh()?;
            if let Some(found) = self.lookup(mint_x, mint_y) {
                return Ok(found);
            }
        }
        Err(Error::PoolNotFound(*mint_x, *mint_y))
    }

    fn lookup(&self, mint_x: &Pubkey, mint_y: &Pubkey) -> Option<(Pubkey, bool)> {
        let pools = self.pools.read();
        let (xy, _) = derive_pool(mint_x, mint_y, &self.program_id);
        if pools.contains_key(&xy) {
            return Some((xy, true));
        }
        let (yx, _) = derive_pool(mint_y, mint_x, &self.program_id);
        pools.contains_key(&yx).then_some((yx, false))
    }

    /// Snapshot of a pool's state.
    pub fn pool(&self, address: &Pubkey) -> Result<Pool> {
        Ok(self.cell(address)?.read().pool.clone())
    }

    /// Snapshot of `owner`'s position in a pool, with its address.
    pub fn position(&self, pool: &Pubkey, owner: &Pubkey) -> Result<(Pubkey, Position)> {
        let cell = self.cell(pool)?;
        let slot = cell.read();
        slot.positions
            .get(owner)
            .map(|e| (e.address, e.position.clone()))
            .ok_or(Error::PositionNotFound { pool: *pool, owner: *owner })
    }

    // ── Swaps ─────────────────────────────────────────────────────────────────

    pub fn quote(&self, pool: &Pubkey, mint_in: &Pubkey, amount_in: u64) -> Result<SwapQuote> {
        let cell = self.cell(pool)?;
        let slot = cell.read();
        Ok(quote_swap(&slot.pool, mint_in, amount_in)?)
    }

    /// Quote under the read lock, apply under the write lock.
    ///
    /// A writer that moves the price between the two steps makes the commit
    /// fail with `SlippageExceeded` rather than fill at a worse rate.
    pub fn swap(
        &self,
        pool: &Pubkey,
        mint_in: &Pubkey,
        mint_out: &Pubkey,
        amount_in: u64,
        max_slippage_pct: f64,
    ) -> Result<SwapReceipt> {
        let receipt = self.write(|| {
            let cell = self.cell(pool)?;
            let guard = {
                let slot = cell.read();
                slot.pool.ensure_active()?;
                SwapGuard::prepare(&slot.pool, mint_in, mint_out, amount_in, max_slippage_pct)?
            };
            self.commit(pool, &cell, |slot| Ok(guard.commit(&mut slot.pool)?))
        })?;
        info!(
            pool = %pool,
            amount_in,
            amount_out = receipt.quote.amount_out,
            min_out = receipt.min_out,
            "swap committed"
        );
        Ok(receipt)
    }

    // ── Liquidity ─────────────────────────────────────────────────────────────

    /// Deposit for `owner`, opening a position on first use.
    ///
    /// `mint_a_is_pool_a` says whether `params.mint_a` is the pool's token A.
    /// When it is token B the amounts are re-expressed in pool order: the
    /// first deposit just swaps them, later ones convert `amount_a` to the
    /// pool-A amount at the current reserve ratio (rounded down, so the
    /// derived pool-B side never exceeds what the caller offered).
    pub fn provide(
        &self,
        pool: &Pubkey,
        owner: &Pubkey,
        params: &ProvideParams,
        mint_a_is_pool_a: bool,
    ) -> Result<(Pubkey, Deposit)> {
        let (position_address, _) = derive_position(pool, owner, &self.program_id);

        let deposit = self.write(|| {
            let cell = self.cell(pool)?;
            self.commit(pool, &cell, |slot| {
                let (amount_a, amount_b) = if mint_a_is_pool_a {
                    (params.amount_a, params.amount_b)
                } else {
                    to_pool_order(&slot.pool, params.amount_a, params.amount_b)?
                };
                let mut position = match slot.positions.get(owner) {
                    Some(entry) => entry.position.clone(),
                    None => Position::open(*owner, *pool, &slot.pool),
                };
                let d = provide_liquidity(
                    &mut slot.pool,
                    &mut position,
                    amount_a,
                    amount_b,
                    params.min_lp,
                    params.auto_compound,
                    params.compound_threshold,
                )?;
                slot.positions
                    .insert(*owner, PositionEntry { address: position_address, position });
                Ok(d)
            })
        })?;

        info!(
            pool = %pool,
            position = %position_address,
            lp = deposit.minted_shares,
            a = deposit.accepted_a,
            b = deposit.accepted_b,
            "liquidity provided"
        );
        Ok((position_address, deposit))
    }

    pub fn remove(
        &self,
        pool: &Pubkey,
        owner: &Pubkey,
        shares: u64,
        min_a: u64,
        min_b: u64,
    ) -> Result<(Pubkey, Withdrawal)> {
        let (address, out) = self.write(|| {
            let cell = self.cell(pool)?;
            self.commit(pool, &cell, |slot| {
                let entry = slot
                    .positions
                    .get_mut(owner)
                    .ok_or(Error::PositionNotFound { pool: *pool, owner: *owner })?;
                let out = remove_liquidity(&mut slot.pool, &mut entry.position, shares, min_a, min_b)?;
                let address = entry.address;
                if entry.position.is_closed() {
                    slot.positions.remove(owner);
                }
                Ok((address, out))
            })
        })?;

        info!(pool = %pool, position = %address, lp = shares, a = out.amount_a, b = out.amount_b, "liquidity removed");
        Ok((address, out))
    }

    /// Claim (or compound) `owner`'s fees. Also returns the position's
    /// auto-compound flag as it stood at claim time.
    pub fn claim(&self, pool: &Pubkey, owner: &Pubkey) -> Result<(Pubkey, bool, ClaimOutcome)> {
        let result = self.write(|| {
            let cell = self.cell(pool)?;
            self.commit(pool, &cell, |slot| {
                let entry = slot
                    .positions
                    .get_mut(owner)
                    .ok_or(Error::PositionNotFound { pool: *pool, owner: *owner })?;
                let auto_compound = entry.position.auto_compound;
                let outcome = claim(&mut slot.pool, &mut entry.position)?;
                let address = entry.address;
                if entry.position.is_closed() {
                    slot.positions.remove(owner);
                }
                Ok((address, auto_compound, outcome))
            })
        })?;

        if let (address, _, ClaimOutcome::Claimed(c)) = &result {
            info!(
                pool = %pool,
                position = %address,
                fees_a = c.fees_a,
                fees_b = c.fees_b,
                compounded = c.compounded.is_some(),
                "fees claimed"
            );
        }
        Ok(result)
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn cell(&self, address: &Pubkey) -> Result<Cell> {
        self.pools
            .read()
            .get(address)
            .cloned()
            .ok_or(Error::PoolNotFound(*address, *address))
    }

    fn cells(&self) -> Vec<(Pubkey, Cell)> {
        self.pools.read().iter().map(|(k, v)| (*k, Arc::clone(v))).collect()
    }

    /// Run `op` under the pool's write lock, halting the pool if the engine
    /// reports an accumulator fault.
    fn commit<T>(
        &self,
        address: &Pubkey,
        cell: &RwLock<PoolSlot>,
        op: impl FnOnce(&mut PoolSlot) -> Result<T>,
    ) -> Result<T> {
        let mut slot = cell.write();
        let out = op(&mut *slot);
        if let Err(Error::Amm(AmmError::AccumulatorInvariantViolated)) = &out {
            slot.pool.halted = true;
            warn!(pool = %address, "fee accumulator fault; pool halted");
        }
        out
    }

    #[cfg(test)]
    fn corrupt_checkpoint(&self, pool: &Pubkey, owner: &Pubkey) {
        if let Ok(cell) = self.cell(pool) {
            let mut slot = cell.write();
            let acc = slot.pool.fee_per_share_a;
            if let Some(e) = slot.positions.get_mut(owner) {
                e.position.fee_debt_a = acc + 1;
            }
        }
    }
}

/// Caller amounts given as (pool-B, pool-A) re-expressed as (pool-A, pool-B).
fn to_pool_order(pool: &Pool, amount_b: u64, amount_a: Option<u64>) -> Result<(u64, Option<u64>)> {
    if pool.is_empty() {
        let a = amount_a.ok_or(AmmError::MissingInitialAmount)?;
        return Ok((a, Some(amount_b)));
    }
    if pool.reserve_a == 0 || pool.reserve_b == 0 {
        return Err(AmmError::EmptyPool.into());
    }
    Ok((mul_div(amount_b, pool.reserve_a, pool.reserve_b)?, None))
}

impl PositionIndex for Ledger {
    fn positions_for(&self, owner: &Pubkey) -> Vec<PositionId> {
        let mut ids: Vec<PositionId> = self
            .cells()
            .into_iter()
            .filter_map(|(pool, cell)| {
                let slot = cell.read();
                slot.positions
                    .get(owner)
                    .map(|e| PositionId { address: e.address, pool, owner: *owner })
            })
            .collect();
        ids.sort_by_key(|id| id.pool);
        ids
    }

    fn snapshot(&self, id: &PositionId) -> Option<(Pool, Position)> {
        let cell = self.cell(&id.pool).ok()?;
        let slot = cell.read();
        let entry = slot.positions.get(&id.owner)?;
        Some((slot.pool.clone(), entry.position.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use a2a_swap::PROGRAM_ID;

    fn params(mint_a: Pubkey, mint_b: Pubkey, amount_a: u64, amount_b: Option<u64>) -> ProvideParams {
        ProvideParams {
            mint_a,
            mint_b,
            amount_a,
            amount_b,
            min_lp: 0,
            auto_compound: false,
            compound_threshold: 0,
        }
    }

    #[test]
    fn duplicate_pair_is_rejected_in_either_order() {
        let ledger = Ledger::in_memory(PROGRAM_ID);
        let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
        let (address, _) = ledger.create_pool(a, b, 30, 0).unwrap();
        assert!(matches!(ledger.create_pool(a, b, 30, 0), Err(Error::PoolExists(p)) if p == address));
        assert!(matches!(ledger.create_pool(b, a, 30, 0), Err(Error::PoolExists(p)) if p == address));
        assert_eq!(ledger.find_pool(&b, &a).unwrap(), (address, false));
    }

    #[test]
    fn reversed_provide_is_mapped_to_pool_order() {
        let ledger = Ledger::in_memory(PROGRAM_ID);
        let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
        let (pool, _) = ledger.create_pool(a, b, 30, 0).unwrap();
        let owner = Pubkey::new_unique();

        // first deposit given as (B, A) amounts
        let (_, d) = ledger.provide(&pool, &owner, &params(b, a, 2_000, Some(1_000)), false).unwrap();
        assert_eq!((d.accepted_a, d.accepted_b), (1_000, 2_000));

        // later: 500 of B at 2 B per A → 250 A, 500 B
        let (_, d) = ledger.provide(&pool, &owner, &params(b, a, 500, None), false).unwrap();
        assert_eq!((d.accepted_a, d.accepted_b), (250, 500));
    }

    #[test]
    fn closed_positions_are_dropped() {
        let ledger = Ledger::in_memory(PROGRAM_ID);
        let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
        let (pool, _) = ledger.create_pool(a, b, 30, 0).unwrap();
        let owner = Pubkey::new_unique();
        let (_, d) = ledger.provide(&pool, &owner, &params(a, b, 10_000, Some(10_000)), true).unwrap();

        ledger.remove(&pool, &owner, d.minted_shares, 0, 0).unwrap();
        assert!(matches!(ledger.position(&pool, &owner), Err(Error::PositionNotFound { .. })));
        assert!(ledger.positions_for(&owner).is_empty());
    }

    #[test]
    fn failed_first_provide_leaves_no_position() {
        let ledger = Ledger::in_memory(PROGRAM_ID);
        let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
        let (pool, _) = ledger.create_pool(a, b, 30, 0).unwrap();
        let owner = Pubkey::new_unique();
        let err = ledger.provide(&pool, &owner, &params(a, b, 10_000, None), true).unwrap_err();
        assert!(matches!(err, Error::Amm(AmmError::MissingInitialAmount)));
        assert!(ledger.positions_for(&owner).is_empty());
    }

    #[test]
    fn accumulator_fault_halts_the_pool() {
        let ledger = Ledger::in_memory(PROGRAM_ID);
        let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
        let (pool, _) = ledger.create_pool(a, b, 30, 5).unwrap();
        let owner = Pubkey::new_unique();
        ledger.provide(&pool, &owner, &params(a, b, 1_000_000, Some(1_000_000)), true).unwrap();
        ledger.corrupt_checkpoint(&pool, &owner);

        let err = ledger.claim(&pool, &owner).unwrap_err();
        assert!(matches!(err, Error::Amm(AmmError::AccumulatorInvariantViolated)));
        assert!(ledger.pool(&pool).unwrap().halted);

        // every later mutation is refused, reads still work
        let err = ledger.swap(&pool, &a, &b, 1_000, 1.0).unwrap_err();
        assert!(matches!(err, Error::Amm(AmmError::PoolHalted)));
        let other = Pubkey::new_unique();
        let err = ledger.provide(&pool, &other, &params(a, b, 1_000, None), true).unwrap_err();
        assert!(matches!(err, Error::Amm(AmmError::PoolHalted)));
        assert!(ledger.quote(&pool, &a, 1_000).is_ok());
    }
}
