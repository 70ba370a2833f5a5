//! Loading clauses into the solver.
use partial_ref::{partial, PartialRef};

use cindersat_formula::Lit;

use crate::clause::{db, ClauseHeader};
use crate::context::{
    ArenaP, AssignmentP, BinaryWatchesP, ClauseDbP, Context, DecisionP, ElimP, ImplGraphP,
    IncrementalP, ProofP, SolverStateP, TmpDataP, TrailP, VariablesP, WatchlistsP,
};
use crate::inprocess::restore_eliminated_var;
use crate::proof;
use crate::prop::{enqueue_assignment, full_restart, Reason};
use crate::state::SatState;

/// Adds a clause to the current formula.
///
/// Removes duplicated literals, ignores tautological clauses (eg. x v -x v y), handles empty
/// clauses and dispatches among unit, binary and long clauses. Clauses over eliminated variables
/// first restore those variables from the elimination log.
///
/// Does not adjust the solver's variable count. If necessary that has to be done before calling
/// this.
pub fn load_clause<'a>(
    mut ctx: partial!(
        Context<'a>,
        mut ArenaP,
        mut AssignmentP,
        mut BinaryWatchesP,
        mut ClauseDbP,
        mut DecisionP,
        mut ElimP,
        mut ImplGraphP,
        mut IncrementalP,
        mut ProofP<'a>,
        mut SolverStateP,
        mut TmpDataP,
        mut TrailP,
        mut VariablesP,
        mut WatchlistsP,
    ),
    lits: &[Lit],
) {
    match ctx.part(SolverStateP).sat_state {
        SatState::Unsat => return,
        SatState::Sat | SatState::UnsatUnderAssumptions => {
            ctx.part_mut(SolverStateP).sat_state = SatState::Unknown;
        }
        SatState::Unknown => {}
    }

    // Restart the search when the user adds new clauses.
    full_restart(ctx.borrow());

    for &lit in lits {
        if ctx.part(VariablesP).is_eliminated(lit.var()) {
            restore_eliminated_var(ctx.borrow(), lit.var());
        }
    }

    let (tmp_data, mut ctx) = ctx.split_part_mut(TmpDataP);

    tmp_data.lits.clear();
    tmp_data.lits.extend_from_slice(lits);
    let lits = &mut tmp_data.lits;
    let simplified_lits = &mut tmp_data.lits_2;

    lits.sort_unstable();
    lits.dedup();

    // Detect tautological clauses
    let mut last = None;

    for &lit in lits.iter() {
        if last == Some(!lit) {
            return;
        }
        last = Some(lit);
    }

    // Remove false literals and satisfied clauses
    simplified_lits.clear();

    for &lit in lits.iter() {
        match ctx.part(AssignmentP).lit_value(lit) {
            Some(true) => return,
            Some(false) => (),
            None => {
                simplified_lits.push(lit);
            }
        }
    }

    if ctx.part(ProofP).is_active()
        && !simplified_lits.is_empty()
        && simplified_lits.len() < lits.len()
    {
        proof::add_clause(ctx.borrow(), simplified_lits);
        proof::delete_clause(ctx.borrow(), lits);
    }

    match simplified_lits[..] {
        [] => {
            proof::add_empty_clause(ctx.borrow());
            ctx.part_mut(SolverStateP).sat_state = SatState::Unsat;
        }
        [lit] => enqueue_assignment(ctx.borrow(), lit, Reason::Unit),
        _ => {
            let header = ClauseHeader::new();
            db::add_clause(ctx.borrow(), header, simplified_lits);
        }
    }
}
