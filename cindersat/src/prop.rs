//! Unit propagation.
pub mod assignment;
pub mod binary;
pub mod graph;
pub mod long;
pub mod watch;

pub use assignment::{backtrack, enqueue_assignment, full_restart, restart, Assignment, Trail};
pub use binary::{BinaryWatch, BinaryWatches};
pub use graph::{Conflict, ImplGraph, ImplNode, Reason};
pub use watch::{enable_watchlists, Watch, Watchlists};

use partial_ref::{partial, PartialRef};

use crate::context::{
    ArenaP, AssignmentP, BinaryWatchesP, ClauseDbP, Context, DecisionP, ImplGraphP, TrailP,
    WatchlistsP,
};

use binary::propagate_binary;
use long::propagate_long;

/// Propagate all enqueued assignments.
///
/// Returns the conflicting clause if propagation detects a conflict. The trail's queue head is
/// left on the conflicting assignment so propagation can resume after backtracking.
///
/// Assignments are processed in trail order. For each assignment the binary implications are
/// checked before the long clause watchlists.
pub fn propagate(
    mut ctx: partial!(
        Context,
        mut ArenaP,
        mut AssignmentP,
        mut DecisionP,
        mut ImplGraphP,
        mut TrailP,
        mut WatchlistsP,
        BinaryWatchesP,
        ClauseDbP,
    ),
) -> Result<(), Conflict> {
    if !ctx.part(WatchlistsP).enabled() {
        enable_watchlists(ctx.borrow());
    }

    while let Some(lit) = ctx.part_mut(TrailP).pop_queue() {
        propagate_binary(ctx.borrow(), lit)?;
        propagate_long(ctx.borrow(), lit)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    use cindersat_formula::{cnf_formula, lits};

    use crate::context::set_var_count;
    use crate::load::load_clause;
    use crate::state::SatState;
    use crate::context::SolverStateP;

    #[test]
    fn unit_implications_in_trail_order() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        let formula = cnf_formula![
            -1, 2;
            -2, 3, 4;
            -4, 5;
        ];

        set_var_count(ctx.borrow(), formula.var_count());

        for clause in formula.iter() {
            load_clause(ctx.borrow(), clause);
        }

        ctx.part_mut(TrailP).new_decision_level();
        enqueue_assignment(ctx.borrow(), lits![1][0], Reason::Unit);
        ctx.part_mut(TrailP).new_decision_level();
        enqueue_assignment(ctx.borrow(), lits![-3][0], Reason::Unit);

        assert!(propagate(ctx.borrow()).is_ok());

        assert!(ctx.part(AssignmentP).lit_is_true(lits![2][0]));
        assert!(ctx.part(AssignmentP).lit_is_true(lits![4][0]));
        assert!(ctx.part(AssignmentP).lit_is_true(lits![5][0]));
    }

    #[test]
    fn conflict_is_reported() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        let formula = cnf_formula![
            -1, 2;
            -1, -2;
        ];

        set_var_count(ctx.borrow(), formula.var_count());

        for clause in formula.iter() {
            load_clause(ctx.borrow(), clause);
        }

        assert_eq!(ctx.part(SolverStateP).sat_state, SatState::Unknown);

        ctx.part_mut(TrailP).new_decision_level();
        enqueue_assignment(ctx.borrow(), lits![1][0], Reason::Unit);

        assert!(propagate(ctx.borrow()).is_err());
    }
}
