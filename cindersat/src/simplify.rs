//! Simplification using top level assignments.
use partial_ref::{partial, PartialRef};

use crate::clause::db;
use crate::context::{
    ArenaP, AssignmentP, BinaryWatchesP, ClauseDbP, Context, ImplGraphP, ProofP, TrailP,
    WatchlistsP,
};
use crate::proof;

/// Turn the level 0 trail into permanent unit clauses.
///
/// The assignments stay in place, but their reasons are detached so the clauses that propagated
/// them can be deleted or collected. Returns whether any new unit clause was found.
pub fn prove_units(
    mut ctx: partial!(Context, mut ImplGraphP, mut TrailP),
) -> bool {
    if ctx.part(TrailP).current_level() != 0 {
        return false;
    }

    let (trail, mut ctx) = ctx.split_part_mut(TrailP);
    let impl_graph = ctx.part_mut(ImplGraphP);

    let mut new_unit = false;

    for &lit in trail.trail() {
        new_unit = true;
        impl_graph.make_root(lit.var());
    }

    trail.clear();

    new_unit
}

/// Remove satisfied clauses and false literals.
///
/// May only be called at decision level 0 with no pending propagations, so no clause can be the
/// reason for an assignment.
pub fn simplify<'a>(
    mut ctx: partial!(
        Context<'a>,
        mut ArenaP,
        mut BinaryWatchesP,
        mut ClauseDbP,
        mut ProofP<'a>,
        mut WatchlistsP,
        AssignmentP,
        TrailP,
    ),
) {
    debug_assert_eq!(ctx.part(TrailP).current_level(), 0);

    let crefs: Vec<_> = ctx.part(ClauseDbP).clauses().to_vec();

    let mut new_lits = vec![];

    for cref in crefs {
        {
            let header = ctx.part(ArenaP).header(cref);
            if header.deleted() {
                continue;
            }
        }

        let mut satisfied = false;
        new_lits.clear();
        {
            let (arena, ctx) = ctx.split_part(ArenaP);
            let assignment = ctx.part(AssignmentP);
            for &lit in arena.clause(cref).lits() {
                match assignment.lit_value(lit) {
                    Some(true) => {
                        satisfied = true;
                        break;
                    }
                    Some(false) => (),
                    None => new_lits.push(lit),
                }
            }
        }

        let old_len = ctx.part(ArenaP).header(cref).len();

        if satisfied {
            let lits: Vec<_> = ctx.part(ArenaP).clause(cref).lits().to_vec();
            db::delete_clause(ctx.borrow(), cref);
            proof::delete_clause(ctx.borrow(), &lits);
        } else if new_lits.len() < old_len {
            // Cannot have empty or unit clauses after full propagation. An empty clause would
            // have been a conflict and a unit clause would have been propagated, making the
            // clause satisfied.
            assert!(new_lits.len() >= 2);

            let old_header = ctx.part(ArenaP).header(cref).clone();
            let old_lits: Vec<_> = ctx.part(ArenaP).clause(cref).lits().to_vec();

            proof::add_clause(ctx.borrow(), &new_lits);
            proof::delete_clause(ctx.borrow(), &old_lits);

            let mut header = old_header;
            header.set_glue(header.glue().min(new_lits.len()));
            header.set_protected(false);

            db::delete_clause(ctx.borrow(), cref);
            db::add_clause(ctx.borrow(), header, &new_lits);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    use cindersat_formula::{cnf_formula, lits};

    use crate::context::set_var_count;
    use crate::load::load_clause;
    use crate::prop::propagate;

    #[test]
    fn units_shrink_and_satisfy_clauses() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        let formula = cnf_formula![
            1, 2, 3;
            -1, 4, 5;
            -1, 2;
        ];

        set_var_count(ctx.borrow(), formula.var_count());

        for clause in formula.iter() {
            load_clause(ctx.borrow(), clause);
        }

        load_clause(ctx.borrow(), &lits![1]);

        assert!(propagate(ctx.borrow()).is_ok());
        assert!(prove_units(ctx.borrow()));

        simplify(ctx.borrow());

        // Clause 1 is satisfied by lit 1, clause 2 loses the false literal -1. The binary clause
        // -1 2 became a unit clause 2 during propagation and is satisfied.
        assert_eq!(ctx.part(ClauseDbP).irred_count(), 1);

        let mut live = vec![];
        for &cref in ctx.part(ClauseDbP).clauses() {
            if !ctx.part(ArenaP).header(cref).deleted() {
                live.push(ctx.part(ArenaP).clause(cref).lits().to_vec());
            }
        }
        assert_eq!(live, vec![lits![4, 5].to_vec()]);
    }
}
