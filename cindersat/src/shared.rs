//! Shared clause pool for running multiple solver instances on one formula.
//!
//! Each member solver owns its private clause arena and exports small glue learned clauses into a
//! global arena guarded by a single mutex. Importing copies foreign clauses back into the private
//! arena, so member solvers never hold references into the global arena while searching.
//!
//! The global arena reclaims space with a readiness barrier: a member signals readiness after
//! each exchange, and only when every registered member has signalled readiness since the last
//! compaction are the pages of fully imported clauses retired. Stragglers merely delay the
//! compaction, dead clauses are kept in the pool until the next barrier.
use std::sync::{Arc, Mutex};

use partial_ref::{IntoPartialRefMut, PartialRef};

use rustc_hash::FxHashSet;

use cindersat_formula::Lit;

use crate::clause::{ClauseArena, ClauseHeader, ClauseRef};
use crate::context::{ensure_var_count, Context};
use crate::load::load_clause;

/// Number of conflicts between clause exchanges of a member.
const SYNC_INTERVAL: u64 = 1000;

/// Hash a single literal.
///
/// Multiple literals can be combined with xor, as done in [`clause_hash`].
fn lit_hash(lit: Lit) -> u64 {
    // Constant based on the golden ratio provides good mixing for the resulting upper bits
    (!(lit.code() as u64)).wrapping_mul(0x61c8_8646_80b5_83eb_u64)
}

/// A fast order independent hash for clauses, used to filter duplicates.
fn clause_hash(lits: &[Lit]) -> u64 {
    let mut hash = 0;
    for &lit in lits {
        hash ^= lit_hash(lit);
    }
    hash
}

struct PoolState {
    arena: ClauseArena,
    /// Shared clauses with the id of the exporting member, in export order.
    clauses: Vec<(ClauseRef, usize)>,
    /// Hashes of all clauses ever exported, used to filter duplicates.
    hashes: FxHashSet<u64>,
    /// Import position of each member within `clauses`.
    cursors: Vec<usize>,
    /// Which members signalled readiness since the last compaction.
    ready: Vec<bool>,
    /// Number of compactions performed.
    compactions: u64,
}

/// A clause pool shared by multiple solver instances.
pub struct GlobalArena {
    inner: Mutex<PoolState>,
}

impl Default for GlobalArena {
    fn default() -> GlobalArena {
        GlobalArena::new()
    }
}

impl GlobalArena {
    /// Create an empty clause pool.
    pub fn new() -> GlobalArena {
        GlobalArena {
            inner: Mutex::new(PoolState {
                arena: ClauseArena::new(),
                clauses: vec![],
                hashes: FxHashSet::default(),
                cursors: vec![],
                ready: vec![],
                compactions: 0,
            }),
        }
    }

    /// Register a new member solver.
    pub fn register(self: &Arc<GlobalArena>) -> SharedMember {
        let id = {
            let mut pool = self.inner.lock().unwrap();
            pool.cursors.push(0);
            pool.ready.push(false);
            pool.ready.len() - 1
        };

        SharedMember {
            pool: self.clone(),
            id,
            next_sync: SYNC_INTERVAL,
            seen: FxHashSet::default(),
        }
    }

    /// Number of clauses currently held by the pool.
    pub fn clause_count(&self) -> usize {
        self.inner.lock().unwrap().clauses.len()
    }

    /// Number of compactions performed so far.
    pub fn compactions(&self) -> u64 {
        self.inner.lock().unwrap().compactions
    }

    fn export(&self, id: usize, lits: &[Lit], glue: usize) {
        let mut pool = self.inner.lock().unwrap();

        if !pool.hashes.insert(clause_hash(lits)) {
            return;
        }

        let mut header = ClauseHeader::new();
        header.set_redundant(true);
        header.set_glue(glue);
        let cref = pool.arena.add_clause(header, lits);
        pool.clauses.push((cref, id));
    }

    fn import_new(&self, id: usize, mut consume: impl FnMut(&[Lit], usize)) {
        let mut pool = self.inner.lock().unwrap();
        let pool = &mut *pool;

        let cursor = pool.cursors[id];
        for &(cref, source) in pool.clauses[cursor..].iter() {
            if source != id {
                let clause = pool.arena.clause(cref);
                consume(clause.lits(), clause.header().glue());
            }
        }
        pool.cursors[id] = pool.clauses.len();
    }

    /// Signal that the member finished an exchange.
    ///
    /// When every registered member has signalled readiness since the last compaction, the
    /// clauses imported by all members are dropped and the remaining clauses are copied into a
    /// fresh page set. Only then are the old pages freed.
    fn signal_ready(&self, id: usize) {
        let mut pool = self.inner.lock().unwrap();
        let pool = &mut *pool;

        pool.ready[id] = true;

        if !pool.ready.iter().all(|&ready| ready) {
            return;
        }

        let everyone_behind = pool.cursors.iter().cloned().min().unwrap_or(0);

        let live = pool.clauses[everyone_behind..].to_vec();
        let (fresh, relocation) = pool
            .arena
            .reorganise(live.iter().map(|&(cref, _)| cref));

        pool.clauses = live
            .into_iter()
            .map(|(cref, source)| {
                let new_cref = relocation
                    .get(cref)
                    .expect("live shared clause lost in compaction");
                (new_cref, source)
            })
            .collect();

        for cursor in pool.cursors.iter_mut() {
            *cursor -= everyone_behind;
        }
        for ready in pool.ready.iter_mut() {
            *ready = false;
        }

        pool.arena = fresh;
        pool.compactions += 1;
    }
}

/// A member solver's handle into a [`GlobalArena`].
pub struct SharedMember {
    pool: Arc<GlobalArena>,
    id: usize,
    next_sync: u64,
    /// Hashes of clauses this member exported or imported, to avoid bouncing clauses.
    seen: FxHashSet<u64>,
}

impl SharedMember {
    /// Whether an exchange is due at the given conflict count.
    pub fn sync_due(&self, conflicts: u64) -> bool {
        conflicts >= self.next_sync
    }

    /// Exchange clauses with the pool.
    ///
    /// Exports redundant clauses up to the given glue limit, imports foreign clauses and signals
    /// readiness for the next pool compaction.
    pub fn exchange<'a>(
        &mut self,
        ctx: &mut Context<'a>,
        glue_limit: usize,
        conflicts: u64,
    ) {
        self.next_sync = conflicts + SYNC_INTERVAL;

        let mut exports: Vec<(Vec<Lit>, usize)> = vec![];
        for &cref in ctx.clause_db.redundant_clauses() {
            let header = ctx.arena.header(cref);
            if header.deleted() || header.glue() > glue_limit {
                continue;
            }
            let lits = ctx.arena.clause(cref).lits();
            if self.seen.insert(clause_hash(lits)) {
                exports.push((lits.to_vec(), header.glue()));
            }
        }

        for (lits, glue) in exports {
            self.pool.export(self.id, &lits, glue);
        }

        let mut imports: Vec<Vec<Lit>> = vec![];
        self.pool.import_new(self.id, |lits, _glue| {
            imports.push(lits.to_vec());
        });

        {
            let mut ctx = ctx.into_partial_ref_mut();
            for lits in imports {
                if !self.seen.insert(clause_hash(&lits)) {
                    continue;
                }
                let var_count = lits.iter().map(|lit| lit.index() + 1).max().unwrap_or(0);
                ensure_var_count(ctx.borrow(), var_count);
                load_clause(ctx.borrow(), &lits);
            }
        }

        self.pool.signal_ready(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use cindersat_formula::{cnf_formula, lits};

    use crate::solver::Solver;

    #[test]
    fn clauses_flow_between_members() {
        let pool = Arc::new(GlobalArena::new());
        let member_a = pool.register();
        let member_b = pool.register();

        pool.export(member_a.id, &lits![1, 2, 3], 2);
        pool.export(member_a.id, &lits![1, 2, 3], 2);
        assert_eq!(pool.clause_count(), 1);

        let mut received = vec![];
        pool.import_new(member_b.id, |clause, glue| {
            received.push((clause.to_vec(), glue));
        });
        assert_eq!(received, vec![(lits![1, 2, 3].to_vec(), 2)]);

        // The exporter does not get its own clause back.
        let mut bounced = vec![];
        pool.import_new(member_a.id, |clause, _| bounced.push(clause.to_vec()));
        assert!(bounced.is_empty());
    }

    #[test]
    fn compaction_waits_for_all_members() {
        let pool = Arc::new(GlobalArena::new());
        let member_a = pool.register();
        let member_b = pool.register();

        pool.export(member_a.id, &lits![1, 2], 1);
        pool.import_new(member_a.id, |_, _| ());
        pool.import_new(member_b.id, |_, _| ());

        pool.signal_ready(member_a.id);
        assert_eq!(pool.compactions(), 0);
        assert_eq!(pool.clause_count(), 1);

        pool.signal_ready(member_b.id);
        assert_eq!(pool.compactions(), 1);
        // Both members have imported the clause, so the compaction retired it.
        assert_eq!(pool.clause_count(), 0);
    }

    #[test]
    fn solvers_sharing_a_pool_agree() {
        let pool = Arc::new(GlobalArena::new());

        let formula = cnf_formula![
            1, 2, 3;
            -1, -2;
            -1, -3;
            -2, -3;
            1, 4;
            2, -4;
        ];

        let mut solver_a = Solver::new();
        solver_a.join(&pool);
        solver_a.add_formula(&formula);

        let mut solver_b = Solver::new();
        solver_b.join(&pool);
        solver_b.add_formula(&formula);

        assert_eq!(solver_a.solve().ok(), Some(true));
        assert_eq!(solver_b.solve().ok(), Some(true));
    }
}
