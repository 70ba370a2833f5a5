//! Garbage collection of deleted clauses.
use partial_ref::{partial, PartialRef};

use log::debug;

use crate::context::{
    ArenaP, BinaryWatchesP, ClauseDbP, Context, ImplGraphP, TrailP, WatchlistsP,
};
use crate::prop::Reason;

/// Perform an arena reorganisation if enough garbage accumulated.
pub fn collect_garbage(
    mut ctx: partial!(
        Context,
        mut ArenaP,
        mut BinaryWatchesP,
        mut ClauseDbP,
        mut ImplGraphP,
        mut WatchlistsP,
        TrailP,
    ),
) {
    // Collecting when a fixed fraction of the allocation is garbage amortizes collection costs.
    if ctx.part(ClauseDbP).garbage_words() * 2 > ctx.part(ArenaP).stored_words() {
        collect_garbage_now(ctx.borrow());
    }
}

/// Unconditionally reorganise the arena.
///
/// Every holder of a clause reference has to consume the relocation map: the clause database
/// lists and the binary watches are rewritten, reasons on the trail are updated and the generic
/// watchlists are dropped to be rebuilt before the next propagation. Only then are the old pages
/// freed by dropping the old arena.
pub fn collect_garbage_now(
    mut ctx: partial!(
        Context,
        mut ArenaP,
        mut BinaryWatchesP,
        mut ClauseDbP,
        mut ImplGraphP,
        mut WatchlistsP,
        TrailP,
    ),
) {
    let (db, mut ctx) = ctx.split_part_mut(ClauseDbP);

    assert!(
        db.garbage_words() <= ctx.part(ArenaP).stored_words(),
        "inconsistent garbage tracking in ClauseDb"
    );

    let (fresh, relocation) = {
        let arena = ctx.part(ArenaP);
        arena.reorganise(db.clauses().iter().cloned())
    };

    let mut clauses = Vec::with_capacity(relocation.len());
    let mut redundant = vec![];

    {
        let arena = ctx.part(ArenaP);
        for &cref in db.clauses() {
            if let Some(new_cref) = relocation.get(cref) {
                clauses.push(new_cref);
                if arena.header(cref).redundant() {
                    redundant.push(new_cref);
                }
            }
        }
    }

    db.set_lists(clauses, redundant);
    db.reset_garbage();

    ctx.part_mut(BinaryWatchesP).apply_relocation(&relocation);

    // Long reasons of assigned variables move with their clauses.
    {
        let (impl_graph, mut ctx) = ctx.split_part_mut(ImplGraphP);
        for &lit in ctx.part(TrailP).trail() {
            if let &Reason::Long(cref) = impl_graph.reason(lit.var()) {
                let new_cref = relocation
                    .get(cref)
                    .expect("reason clause deleted during garbage collection");
                impl_graph.update_reason(lit.var(), Reason::Long(new_cref));
            }
        }
    }

    ctx.part_mut(WatchlistsP).disable();

    let old_words = ctx.part(ArenaP).stored_words();
    *ctx.part_mut(ArenaP) = fresh;

    debug!(
        "arena reorganisation: {} -> {} words, {} clauses",
        old_words,
        ctx.part(ArenaP).stored_words(),
        relocation.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cmp::max;

    use partial_ref::IntoPartialRefMut;
    use proptest::*;

    use cindersat_formula::{cnf::strategy::*, Lit};

    use crate::clause::{db, ClauseHeader};
    use crate::context::{set_var_count, AssignmentP};
    use crate::prop::enqueue_assignment;

    proptest! {
        #[test]
        fn garbage_collection(
            input_a in cnf_formula(2..100usize, 100..500, 3..30),
            input_b in cnf_formula(2..100usize, 10..100, 4..20),
        ) {
            let mut ctx = Context::default();
            let mut ctx = ctx.into_partial_ref_mut();

            set_var_count(ctx.borrow(), max(input_a.var_count(), input_b.var_count()));

            let mut crefs_a = vec![];
            let mut crefs_b = vec![];

            for lits in input_a.iter() {
                let header = ClauseHeader::new();
                let cref = db::add_clause(ctx.borrow(), header, lits);
                crefs_a.push(cref);
            }

            for lits in input_b.iter() {
                let header = ClauseHeader::new();
                let cref = db::add_clause(ctx.borrow(), header, lits);
                crefs_b.push(cref);

                if ctx.part(AssignmentP).lit_value(lits[0]) == None {
                    // This isn't consistent, as the clause isn't actually propagating, but that
                    // isn't checked during garbage collection
                    enqueue_assignment(ctx.borrow(), lits[0], Reason::Long(cref));
                }
            }

            for cref in crefs_a {
                db::delete_clause(ctx.borrow(), cref);
                prop_assert!(ctx.part(ClauseDbP).garbage_words() > 0);
            }

            let old_stored = ctx.part(ArenaP).stored_words();

            collect_garbage(ctx.borrow());

            prop_assert!(
                ctx.part(ClauseDbP).garbage_words() * 2 <= ctx.part(ArenaP).stored_words()
            );

            prop_assert!(old_stored > ctx.part(ArenaP).stored_words());

            prop_assert!(!ctx.part(WatchlistsP).enabled());

            let mut output_clauses: Vec<Vec<Lit>> = vec![];

            for &cref in ctx.part(ClauseDbP).clauses().iter() {
                let clause = ctx.part(ArenaP).clause(cref);
                prop_assert!(!clause.header().deleted());
                output_clauses.push(clause.lits().to_vec());
            }

            let mut input_clauses: Vec<Vec<Lit>> = input_b
                .iter()
                .map(|c| c.to_vec())
                .collect();

            output_clauses.sort();
            input_clauses.sort();

            prop_assert_eq!(input_clauses, output_clauses);

            for &lit in ctx.part(TrailP).trail() {
                if let &Reason::Long(cref) = ctx.part(ImplGraphP).reason(lit.var()) {
                    prop_assert_eq!(ctx.part(ArenaP).clause(cref).lits()[0], lit)
                }
            }
        }
    }
}
