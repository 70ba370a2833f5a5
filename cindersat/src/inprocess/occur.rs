//! Literal occurrence lists.
//!
//! Only maintained while an inprocessing pass runs. Entries of deleted clauses are not removed
//! eagerly, users have to skip them.
use partial_ref::{partial, PartialRef};

use cindersat_formula::Lit;

use crate::clause::ClauseRef;
use crate::context::{ArenaP, ClauseDbP, Context, ElimP};

/// Build the occurrence lists from the clause database.
pub fn build_occurrence_lists(
    mut ctx: partial!(Context, mut ElimP, ArenaP, ClauseDbP),
) {
    let (eliminator, ctx) = ctx.split_part_mut(ElimP);

    for list in eliminator.occurs.iter_mut() {
        list.clear();
    }

    let arena = ctx.part(ArenaP);

    for &cref in ctx.part(ClauseDbP).clauses() {
        let clause = arena.clause(cref);
        if clause.header().deleted() {
            continue;
        }
        for &lit in clause.lits() {
            eliminator.occurs[lit.code()].push(cref);
        }
    }

    eliminator.occurs_enabled = true;
}

/// Drop the occurrence lists at the end of an inprocessing pass.
pub fn drop_occurrence_lists(mut ctx: partial!(Context, mut ElimP)) {
    let eliminator = ctx.part_mut(ElimP);
    for list in eliminator.occurs.iter_mut() {
        list.clear();
    }
    eliminator.occurs_enabled = false;
}

/// Add a new clause to the occurrence lists.
pub fn add_occurrences(
    mut ctx: partial!(Context, mut ElimP),
    cref: ClauseRef,
    lits: &[Lit],
) {
    let eliminator = ctx.part_mut(ElimP);
    debug_assert!(eliminator.occurs_enabled);
    for &lit in lits {
        eliminator.occurs[lit.code()].push(cref);
    }
}

/// Live clauses of the given literal.
///
/// Filters deleted clauses but does not remove their entries.
pub fn live_occurrences(
    ctx: partial!(Context, ArenaP, ElimP),
    lit: Lit,
) -> Vec<ClauseRef> {
    let eliminator = ctx.part(ElimP);
    debug_assert!(eliminator.occurs_enabled);
    let arena = ctx.part(ArenaP);
    eliminator.occurs[lit.code()]
        .iter()
        .cloned()
        .filter(|&cref| !arena.header(cref).deleted())
        .collect()
}
