//! Inprocessing between search epochs.
//!
//! Runs at decision level 0 with an empty propagation queue. Performs backward subsumption,
//! self-subsuming resolution and bounded variable elimination over the clause database, mirroring
//! every change to the proof. Eliminated variables are reconstructed in the final model from the
//! elimination log and can be restored when later clauses or assumptions mention them again.
pub mod eliminate;
pub mod occur;
pub mod subsume;

pub use eliminate::restore_eliminated_var;

use partial_ref::{partial, PartialRef};

use log::debug;

use cindersat_formula::{Lit, Var};

use crate::clause::ClauseRef;
use crate::context::{
    ArenaP, AssignmentP, BinaryWatchesP, ClauseDbP, Context, DecisionP, ElimP, ImplGraphP,
    IncrementalP, ProofP, SolverConfigP, SolverStateP, TmpDataP, TrailP, VariablesP, WatchlistsP,
};
use crate::proof;
use crate::prop::propagate;
use crate::simplify::{prove_units, simplify};
use crate::state::SatState;

/// One clause of the elimination log.
///
/// Stores the literal of the eliminated variable separately from the remaining literals so model
/// reconstruction can check the clause without searching for the variable.
pub struct ElimClause {
    pub var_lit: Lit,
    pub rest: Vec<Lit>,
}

/// State of the inprocessing pass.
#[derive(Default)]
pub struct Eliminator {
    /// Occurrence lists by literal code. Only maintained during an inprocessing run, may contain
    /// deleted clauses.
    occurs: Vec<Vec<ClauseRef>>,
    /// Whether the occurrence lists are up to date.
    occurs_enabled: bool,
    /// Clauses of eliminated variables in elimination order.
    elim_log: Vec<ElimClause>,
}

impl Eliminator {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.occurs.resize(count * 2, vec![]);
    }

    /// The elimination log in elimination order.
    pub fn elim_log(&self) -> &[ElimClause] {
        &self.elim_log
    }

    pub(crate) fn log_clause(&mut self, var_lit: Lit, rest: Vec<Lit>) {
        self.elim_log.push(ElimClause { var_lit, rest });
    }

    /// Remove and return all logged clauses of the given variable.
    pub(crate) fn drain_log_of_var(&mut self, var: Var) -> Vec<ElimClause> {
        let mut drained = vec![];
        let mut index = 0;
        while index < self.elim_log.len() {
            if self.elim_log[index].var_lit.var() == var {
                drained.push(self.elim_log.remove(index));
            } else {
                index += 1;
            }
        }
        drained
    }
}

/// Run one inprocessing pass.
///
/// May only be called at decision level 0 with no pending propagations. Can discover
/// unsatisfiability, in which case the solver state is updated.
pub fn inprocess_step<'a>(
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
        SolverConfigP,
    ),
) {
    debug_assert_eq!(ctx.part(TrailP).current_level(), 0);

    if ctx.part(SolverStateP).sat_state != SatState::Unknown {
        return;
    }

    // Settle any pending unit propagations so all clauses are fully simplified.
    if propagate(ctx.borrow()).is_err() {
        proof::add_empty_clause(ctx.borrow());
        ctx.part_mut(SolverStateP).sat_state = SatState::Unsat;
        return;
    }
    prove_units(ctx.borrow());

    simplify(ctx.borrow());

    occur::build_occurrence_lists(ctx.borrow());

    let subsumed = subsume::backward_subsume(ctx.borrow());

    if ctx.part(SolverStateP).sat_state != SatState::Unknown {
        occur::drop_occurrence_lists(ctx.borrow());
        return;
    }

    // Strengthening can derive new units, settle them before elimination.
    if !ctx.part(TrailP).fully_propagated() {
        if propagate(ctx.borrow()).is_err() {
            proof::add_empty_clause(ctx.borrow());
            ctx.part_mut(SolverStateP).sat_state = SatState::Unsat;
            occur::drop_occurrence_lists(ctx.borrow());
            return;
        }
        prove_units(ctx.borrow());
        simplify(ctx.borrow());
        occur::build_occurrence_lists(ctx.borrow());
    }

    let eliminated = eliminate::eliminate_vars(ctx.borrow());

    occur::drop_occurrence_lists(ctx.borrow());

    debug!(
        "inprocessing: {} clauses subsumed or strengthened, {} variables eliminated",
        subsumed, eliminated
    );
}
