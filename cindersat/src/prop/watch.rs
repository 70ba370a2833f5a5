//! Watchlists to detect long clauses that became unit.
//!
//! Each long clause has always two watches pointing to it. The watches are kept in the watchlists
//! of two different literals of the clause. Whenever the watches are moved to different literals
//! the literals of the clause are permuted so the watched literals are in position 0 and 1.
//!
//! When a clause is not unit under the current assignment, the watched literals point at two
//! non-false literals. When a clause is unit and thus propagating, the true literal is watched
//! and in position 0, the other watched literal is the one with the largest decision level and
//! kept in position 1. When a clause becomes satisfied before becoming unit the watches can be
//! kept as they were.
//!
//! When a literal is assigned false that invariant can be invalidated. This can be detected by
//! scanning the watches of the assigned literal. When the assignment is processed the watches are
//! moved to restore that invariant. Unless there is a conflict, i.e. a clause with no non-false
//! literals, this can always be done. This also finds all clauses that became unit. The new unit
//! clauses are exactly those clauses where no two non-false literals can be found.
//!
//! There is no need to update watchlists on backtracking, as unassigning variables cannot
//! invalidate the invariant.
//!
//! Each watch stores a blocking literal of the clause that is different from the watched literal.
//! When the blocking literal is true the clause is already satisfied and does not have to be
//! dereferenced at all.
//!
//! Watchlists can be disabled, which drops every watch. This is done when the arena is
//! reorganised, as that invalidates all clause references. The watchlists are rebuilt from the
//! clause database before the next propagation.
use partial_ref::{partial, PartialRef};

use cindersat_formula::Lit;

use crate::clause::ClauseRef;
use crate::context::{ArenaP, ClauseDbP, Context, WatchlistsP};

/// A watch on a long clause.
#[derive(Copy, Clone)]
pub struct Watch {
    /// Clause which has the referring lit in position 0 or 1.
    pub cref: ClauseRef,
    /// A lit of the clause, different from the referring lit.
    pub blocking: Lit,
}

/// Watchlists to detect clauses that became unit.
pub struct Watchlists {
    /// Contains only valid data for indices of present variables.
    watches: Vec<Vec<Watch>>,
    /// Whether watches are present.
    enabled: bool,
}

impl Default for Watchlists {
    fn default() -> Watchlists {
        Watchlists {
            watches: vec![],
            enabled: true,
        }
    }
}

impl Watchlists {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.watches.resize(count * 2, vec![]);
    }

    /// Start watching a clause.
    ///
    /// `lits` have to be the first two literals of the given clause.
    pub fn watch_clause(&mut self, cref: ClauseRef, lits: [Lit; 2]) {
        for i in 0..2 {
            let watch = Watch {
                cref,
                blocking: lits[i ^ 1],
            };
            self.watches[(!lits[i]).code()].push(watch);
        }
    }

    /// Return watches for a given literal.
    pub fn watched_by_mut(&mut self, lit: Lit) -> &mut Vec<Watch> {
        &mut self.watches[lit.code()]
    }

    /// Make a literal watch a clause.
    pub fn add_watch(&mut self, lit: Lit, watch: Watch) {
        self.watches[lit.code()].push(watch)
    }

    /// Whether the watchlists are up to date.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Drop all watches.
    pub fn disable(&mut self) {
        for watchlist in self.watches.iter_mut() {
            watchlist.clear();
        }
        self.enabled = false;
    }
}

/// Rebuild the watchlists from the clause database.
pub fn enable_watchlists(
    mut ctx: partial!(Context, mut WatchlistsP, ArenaP, ClauseDbP),
) {
    let (watchlists, mut ctx) = ctx.split_part_mut(WatchlistsP);
    debug_assert!(!watchlists.enabled);

    let (db, ctx) = ctx.split_part(ClauseDbP);
    let arena = ctx.part(ArenaP);

    for &cref in db.clauses() {
        let clause = arena.clause(cref);
        if clause.header().deleted() || clause.lits().len() == 2 {
            continue;
        }
        let lits = clause.lits();
        watchlists.watch_clause(cref, [lits[0], lits[1]]);
    }

    watchlists.enabled = true;
}
