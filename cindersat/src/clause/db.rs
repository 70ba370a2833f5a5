//! Database for binary and long clauses.
use partial_ref::{partial, PartialRef};

use cindersat_formula::Lit;

use crate::context::{
    ArenaP, AssignmentP, BinaryWatchesP, ClauseDbP, Context, ImplGraphP, WatchlistsP,
};
use crate::prop::Reason;

use super::header::HEADER_LEN;
use super::{ClauseHeader, ClauseRef};

/// Database for binary and long clauses.
///
/// Removal of clauses from the `clauses` and `redundant` lists can be delayed, so the clause
/// header's deleted flag needs to be checked when iterating over them. The clause counts are
/// always up to date.
#[derive(Default)]
pub struct ClauseDb {
    /// May contain deleted clauses, see above.
    clauses: Vec<ClauseRef>,
    /// Redundant clauses, may contain deleted clauses, see above.
    redundant: Vec<ClauseRef>,
    /// Number of live irredundant clauses.
    irred_count: usize,
    /// Number of live redundant clauses.
    redundant_count: usize,
    /// Size of deleted but not collected clauses in arena words.
    garbage_words: usize,
}

impl ClauseDb {
    /// All clauses of the database, may contain deleted entries.
    pub fn clauses(&self) -> &[ClauseRef] {
        &self.clauses
    }

    /// The redundant clauses of the database, may contain deleted entries.
    pub fn redundant_clauses(&self) -> &[ClauseRef] {
        &self.redundant
    }

    /// The number of live irredundant clauses.
    pub fn irred_count(&self) -> usize {
        self.irred_count
    }

    /// The number of live redundant clauses.
    pub fn redundant_count(&self) -> usize {
        self.redundant_count
    }

    /// Arena words occupied by deleted but not collected clauses.
    pub fn garbage_words(&self) -> usize {
        self.garbage_words
    }

    pub(super) fn set_lists(
        &mut self,
        clauses: Vec<ClauseRef>,
        redundant: Vec<ClauseRef>,
    ) {
        self.clauses = clauses;
        self.redundant = redundant;
    }

    pub(super) fn redundant_list(&mut self) -> &mut Vec<ClauseRef> {
        &mut self.redundant
    }

    pub(super) fn add_garbage_words(&mut self, words: usize) {
        self.garbage_words += words;
    }

    pub(super) fn reset_garbage(&mut self) {
        self.garbage_words = 0;
    }

    pub(super) fn count_deletion(&mut self, redundant: bool) {
        if redundant {
            self.redundant_count -= 1;
        } else {
            self.irred_count -= 1;
        }
    }
}

/// Add a binary or long clause to the database.
///
/// Binary clauses are indexed by the compact binary watchlists, longer clauses by the generic
/// watchlists.
pub fn add_clause(
    mut ctx: partial!(
        Context,
        mut ArenaP,
        mut BinaryWatchesP,
        mut ClauseDbP,
        mut WatchlistsP
    ),
    header: ClauseHeader,
    lits: &[Lit],
) -> ClauseRef {
    debug_assert!(lits.len() >= 2);

    let redundant = header.redundant();

    let cref = ctx.part_mut(ArenaP).add_clause(header, lits);

    if lits.len() == 2 {
        ctx.part_mut(BinaryWatchesP)
            .watch_clause(cref, [lits[0], lits[1]]);
    } else if ctx.part(WatchlistsP).enabled() {
        ctx.part_mut(WatchlistsP)
            .watch_clause(cref, [lits[0], lits[1]]);
    }

    let db = ctx.part_mut(ClauseDbP);

    db.clauses.push(cref);
    if redundant {
        db.redundant.push(cref);
        db.redundant_count += 1;
    } else {
        db.irred_count += 1;
    }

    cref
}

/// Delete a clause from the database.
///
/// The clause's storage is only marked as garbage and reclaimed during the next arena
/// reorganisation. Binary watches are removed eagerly, the generic watchlists are dropped as a
/// whole and rebuilt before the next propagation.
pub fn delete_clause(
    mut ctx: partial!(
        Context,
        mut ArenaP,
        mut BinaryWatchesP,
        mut ClauseDbP,
        mut WatchlistsP
    ),
    cref: ClauseRef,
) {
    let (arena, mut ctx) = ctx.split_part_mut(ArenaP);

    let clause = arena.clause_mut(cref);
    let len = clause.lits().len();

    debug_assert!(
        !clause.header().deleted(),
        "delete_clause for already deleted clause"
    );

    if len == 2 {
        let lits = [clause.lits()[0], clause.lits()[1]];
        ctx.part_mut(BinaryWatchesP).unwatch_clause(cref, lits);
    } else {
        ctx.part_mut(WatchlistsP).disable();
    }

    let header = clause.header_mut();
    header.set_deleted(true);

    let db = ctx.part_mut(ClauseDbP);
    db.count_deletion(header.redundant());
    db.add_garbage_words(len + HEADER_LEN);
}

/// Delete a clause unless it is the reason for an assignment.
///
/// Returns whether the clause was deleted.
pub fn try_delete_clause(
    mut ctx: partial!(
        Context,
        mut ArenaP,
        mut BinaryWatchesP,
        mut ClauseDbP,
        mut WatchlistsP,
        AssignmentP,
        ImplGraphP
    ),
    cref: ClauseRef,
) -> bool {
    let lit_0 = ctx.part(ArenaP).clause(cref).lits()[0];
    let is_reason = ctx.part(AssignmentP).lit_is_true(lit_0)
        && ctx.part(ImplGraphP).reason(lit_0.var()) == &Reason::Long(cref);

    if !is_reason {
        delete_clause(ctx.borrow(), cref);
    }

    !is_reason
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    use cindersat_formula::cnf_formula;

    use crate::context::set_var_count;

    #[test]
    fn insert_and_delete() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        let clauses = cnf_formula![
            1, 2, 3;
            4, -5;
            -2, 3, -4;
            -3, 5, 2, 7;
        ];

        set_var_count(ctx.borrow(), clauses.var_count());

        let mut crefs = vec![];

        for (index, clause) in clauses.iter().enumerate() {
            let mut header = ClauseHeader::new();
            header.set_redundant(index >= 2);
            crefs.push(add_clause(ctx.borrow(), header, clause));
        }

        assert_eq!(ctx.part(ClauseDbP).irred_count(), 2);
        assert_eq!(ctx.part(ClauseDbP).redundant_count(), 2);

        delete_clause(ctx.borrow(), crefs[0]);
        delete_clause(ctx.borrow(), crefs[3]);

        assert_eq!(ctx.part(ClauseDbP).irred_count(), 1);
        assert_eq!(ctx.part(ClauseDbP).redundant_count(), 1);
        assert!(ctx.part(ClauseDbP).garbage_words() > 0);

        assert!(ctx.part(ArenaP).header(crefs[0]).deleted());
        assert!(!ctx.part(ArenaP).header(crefs[1]).deleted());
    }
}
