//! Clause database reduction.
use std::mem::replace;

use ordered_float::OrderedFloat;
use partial_ref::{partial, PartialRef};

use log::debug;

use crate::context::{
    ArenaP, AssignmentP, BinaryWatchesP, ClauseDbP, Context, ImplGraphP, ProofP,
    SolverConfigP, TrailP, WatchlistsP,
};
use crate::proof;

use super::db::try_delete_clause;

/// Delete roughly half of the deletable redundant clauses.
///
/// Deletable are redundant clauses longer than two literals with a glue level above the
/// configured threshold that are neither protected nor currently the reason for an assignment.
/// Clauses with the highest glue are deleted first, ties are broken towards the lowest activity.
/// The protection mark of surviving clauses is cleared, so a clause has to re-earn it before the
/// next reduction.
///
/// May only be called at decision level 0, where the reason guard is vacuous after top level
/// units are removed from the trail.
pub fn reduce<'a>(
    mut ctx: partial!(
        Context<'a>,
        mut ArenaP,
        mut BinaryWatchesP,
        mut ClauseDbP,
        mut ProofP<'a>,
        mut WatchlistsP,
        AssignmentP,
        ImplGraphP,
        SolverConfigP,
        TrailP,
    ),
) {
    debug_assert_eq!(ctx.part(TrailP).current_level(), 0);

    let glue_keep = ctx.part(SolverConfigP).reduce_glue_keep;

    let mut redundant = replace(ctx.part_mut(ClauseDbP).redundant_list(), vec![]);

    // Drop entries of deleted clauses before selecting deletion candidates.
    {
        let arena = ctx.part(ArenaP);
        redundant.retain(|&cref| !arena.header(cref).deleted());
    }

    let mut candidates: Vec<_> = {
        let arena = ctx.part(ArenaP);
        redundant
            .iter()
            .cloned()
            .filter(|&cref| {
                let header = arena.header(cref);
                header.len() > 2 && header.glue() > glue_keep && !header.protected()
            })
            .collect()
    };

    {
        let arena = ctx.part(ArenaP);
        candidates.sort_unstable_by_key(|&cref| {
            let header = arena.header(cref);
            (
                std::cmp::Reverse(header.glue()),
                OrderedFloat(header.activity()),
            )
        });
    }

    let target = candidates.len() / 2;
    let mut deleted = 0;

    for &cref in candidates.iter() {
        if deleted >= target {
            break;
        }
        let lits: Vec<_> = ctx.part(ArenaP).clause(cref).lits().to_vec();
        if try_delete_clause(ctx.borrow(), cref) {
            proof::delete_clause(ctx.borrow(), &lits);
            deleted += 1;
        }
    }

    {
        let arena = ctx.part_mut(ArenaP);
        redundant.retain(|&cref| {
            let header = arena.header_mut(cref);
            if header.deleted() {
                false
            } else {
                header.set_protected(false);
                true
            }
        });
    }

    debug!(
        "reduced clause db: deleted {} of {} candidates, {} redundant clauses remain",
        deleted,
        candidates.len(),
        redundant.len()
    );

    *ctx.part_mut(ClauseDbP).redundant_list() = redundant;
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    use cindersat_formula::cnf_formula;

    use crate::clause::{db, ClauseHeader};
    use crate::context::set_var_count;

    #[test]
    fn reduce_prefers_high_glue() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        let clauses = cnf_formula![
            1, 2, 3;
            2, 3, 4;
            3, 4, 5;
            4, 5, 6;
        ];

        set_var_count(ctx.borrow(), clauses.var_count());

        let glues = [2, 3, 5, 9];
        let mut crefs = vec![];

        for (lits, &glue) in clauses.iter().zip(glues.iter()) {
            let mut header = ClauseHeader::new();
            header.set_redundant(true);
            header.set_glue(glue);
            crefs.push(db::add_clause(ctx.borrow(), header, lits));
        }

        reduce(ctx.borrow());

        // Half of the three deletable clauses (glue > 2) is deleted, highest glue first.
        assert!(ctx.part(ArenaP).header(crefs[3]).deleted());
        assert!(!ctx.part(ArenaP).header(crefs[2]).deleted());
        assert!(!ctx.part(ArenaP).header(crefs[1]).deleted());
        assert!(!ctx.part(ArenaP).header(crefs[0]).deleted());
        assert_eq!(ctx.part(ClauseDbP).redundant_count(), 3);
    }

    #[test]
    fn protected_clauses_survive() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        let clauses = cnf_formula![
            1, 2, 3;
            2, 3, 4;
        ];

        set_var_count(ctx.borrow(), clauses.var_count());

        let mut crefs = vec![];
        for lits in clauses.iter() {
            let mut header = ClauseHeader::new();
            header.set_redundant(true);
            header.set_glue(8);
            header.set_protected(true);
            crefs.push(db::add_clause(ctx.borrow(), header, lits));
        }

        reduce(ctx.borrow());

        for &cref in crefs.iter() {
            assert!(!ctx.part(ArenaP).header(cref).deleted());
            // Protection is consumed by the reduction.
            assert!(!ctx.part(ArenaP).header(cref).protected());
        }
    }
}
