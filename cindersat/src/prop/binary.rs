//! Compact index and propagation of binary clauses.
use partial_ref::{partial, PartialRef};

use cindersat_formula::Lit;

use crate::clause::{ClauseRef, Relocation};
use crate::context::{
    AssignmentP, BinaryWatchesP, Context, DecisionP, ImplGraphP, TrailP,
};

use super::enqueue_assignment;
use super::{Conflict, Reason};

/// A watch for a binary clause.
///
/// The implied literal is stored next to the clause reference, so propagation does not have to
/// dereference the clause at all.
#[derive(Copy, Clone)]
pub struct BinaryWatch {
    /// The binary clause.
    pub cref: ClauseRef,
    /// The other literal of the clause.
    pub implied: Lit,
}

/// Compact watchlists for binary clauses.
///
/// For every literal this stores a watch for each binary clause containing its negation. Unlike
/// the generic watchlists these are kept exact: deleting a binary clause removes its two watches
/// eagerly.
#[derive(Default)]
pub struct BinaryWatches {
    by_lit: Vec<Vec<BinaryWatch>>,
    count: usize,
}

impl BinaryWatches {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.by_lit.resize(count * 2, vec![]);
    }

    /// Start watching a binary clause.
    pub fn watch_clause(&mut self, cref: ClauseRef, lits: [Lit; 2]) {
        for i in 0..2 {
            self.by_lit[(!lits[i]).code()].push(BinaryWatch {
                cref,
                implied: lits[i ^ 1],
            });
        }
        self.count += 1;
    }

    /// Remove the watches of a binary clause.
    pub fn unwatch_clause(&mut self, cref: ClauseRef, lits: [Lit; 2]) {
        for &lit in lits.iter() {
            self.by_lit[(!lit).code()].retain(|watch| watch.cref != cref);
        }
        self.count -= 1;
    }

    /// Watches for a given literal.
    pub fn watchers(&self, lit: Lit) -> &[BinaryWatch] {
        &self.by_lit[lit.code()]
    }

    /// Number of binary clauses.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Rewrite all clause references after an arena reorganisation.
    pub fn apply_relocation(&mut self, relocation: &Relocation) {
        for watchlist in self.by_lit.iter_mut() {
            for watch in watchlist.iter_mut() {
                watch.cref = relocation
                    .get(watch.cref)
                    .expect("binary watch for relocated dead clause");
            }
        }
    }
}

/// Propagate all literals implied by the given literal via binary clauses.
///
/// On conflict return the binary clause propagating the conflicting assignment.
pub fn propagate_binary(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut DecisionP,
        mut ImplGraphP,
        mut TrailP,
        BinaryWatchesP,
    ),
    lit: Lit,
) -> Result<(), Conflict> {
    let (binary_watches, mut ctx) = ctx.split_part(BinaryWatchesP);

    for watch in binary_watches.watchers(lit) {
        let implied = watch.implied;
        let assignment = ctx.part(AssignmentP);

        if assignment.lit_is_false(implied) {
            return Err(Conflict::Binary([implied, !lit]));
        } else if !assignment.lit_is_true(implied) {
            enqueue_assignment(ctx.borrow(), implied, Reason::Binary([!lit]));
        }
    }

    Ok(())
}
