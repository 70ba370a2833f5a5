//! Boolean satisfiability solver.
use std::io;

use partial_ref::{IntoPartialRef, IntoPartialRefMut, PartialRef};

use anyhow::Error;
use log::info;
use thiserror::Error;

use cindersat_dimacs::DimacsParser;
use cindersat_formula::{CnfFormula, Lit};

use crate::callbacks::LearnCallback;
use crate::config::SolverConfigUpdate;
use crate::context::{
    config_changed, ensure_var_count, AssignmentP, Context, ProofP, SolverConfigP, SolverStateP,
};
use crate::incremental::set_assumptions;
use crate::load::load_clause;
use crate::model::reconstruct_model;
use crate::proof::ProofFormat;
use crate::prop::full_restart;
use crate::schedule::schedule_step;
use crate::shared::{GlobalArena, SharedMember};
use crate::state::SatState;

/// Errors that can terminate a solve call without an answer.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("solving was interrupted")]
    Interrupted,
    #[error("error writing the proof: {0}")]
    ProofIo(#[from] io::Error),
}

/// A boolean satisfiability solver.
pub struct Solver<'a> {
    ctx: Box<Context<'a>>,
    shared: Option<SharedMember>,
}

impl<'a> Default for Solver<'a> {
    fn default() -> Solver<'a> {
        Solver {
            ctx: Box::new(Context::default()),
            shared: None,
        }
    }
}

impl<'a> Solver<'a> {
    /// Create a new solver.
    pub fn new() -> Solver<'a> {
        Solver::default()
    }

    /// Change the solver configuration.
    pub fn config(&mut self, update: &SolverConfigUpdate) {
        let mut ctx = self.ctx.into_partial_ref_mut();
        update.apply(ctx.part_mut(SolverConfigP));
        config_changed(ctx.borrow());
    }

    /// Add a formula to the solver.
    pub fn add_formula(&mut self, formula: &CnfFormula) {
        let mut ctx = self.ctx.into_partial_ref_mut();
        ensure_var_count(ctx.borrow(), formula.var_count());
        for clause in formula.iter() {
            load_clause(ctx.borrow(), clause);
        }
    }

    /// Add a single clause to the solver.
    pub fn add_clause(&mut self, clause: &[Lit]) {
        let mut ctx = self.ctx.into_partial_ref_mut();
        let var_count = clause
            .iter()
            .map(|lit| lit.index() + 1)
            .max()
            .unwrap_or(0);
        ensure_var_count(ctx.borrow(), var_count);
        load_clause(ctx.borrow(), clause);
    }

    /// Reads and adds a formula in DIMACS CNF format.
    ///
    /// Using this avoids creating a temporary [`CnfFormula`].
    pub fn add_dimacs_cnf(&mut self, input: impl io::Read) -> Result<(), Error> {
        let parser = DimacsParser::parse_incremental(input, |parser| {
            self.add_formula(&parser.take_formula());
            Ok(())
        })?;

        info!(
            "parsed formula with {} variables and {} clauses",
            parser.var_count(),
            parser.clause_count()
        );

        Ok(())
    }

    /// Fix the given literals for the next solve call.
    ///
    /// The assumptions are cleared again when `solve` returns.
    pub fn assume(&mut self, assumptions: &[Lit]) {
        let mut ctx = self.ctx.into_partial_ref_mut();
        let var_count = assumptions
            .iter()
            .map(|lit| lit.index() + 1)
            .max()
            .unwrap_or(0);
        ensure_var_count(ctx.borrow(), var_count);
        set_assumptions(ctx.borrow(), assumptions);
    }

    /// Check the satisfiability of the current formula under the current assumptions.
    ///
    /// `Ok(true)` means satisfiable, `Ok(false)` unsatisfiable, possibly only under the current
    /// assumptions. An interrupted search leaves the solver in a consistent state and can be
    /// resumed by calling `solve` again.
    pub fn solve(&mut self) -> Result<bool, SolverError> {
        {
            let mut ctx = self.ctx.into_partial_ref_mut();
            ctx.part_mut(SolverStateP).stopped = false;

            let state = ctx.part_mut(SolverStateP);
            state.sat_state = match state.sat_state {
                SatState::Unsat => SatState::Unsat,
                _ => SatState::Unknown,
            };

            full_restart(ctx.borrow());
        }

        loop {
            let mut ctx = self.ctx.into_partial_ref_mut();
            if !schedule_step(ctx.borrow()) {
                break;
            }
            drop(ctx);
            self.sync_shared_clauses();
        }

        let result = {
            let mut ctx = self.ctx.into_partial_ref_mut();

            if let Some(error) = ctx.part_mut(ProofP).take_io_error() {
                Err(SolverError::ProofIo(error))
            } else {
                match ctx.part(SolverStateP).sat_state {
                    SatState::Unknown => Err(SolverError::Interrupted),
                    SatState::Sat => Ok(true),
                    SatState::Unsat | SatState::UnsatUnderAssumptions => Ok(false),
                }
            }
        };

        // Assumptions only last for a single call. The trail is unwound at the start of the next
        // call, so the current model stays accessible.
        self.ctx.incremental.clear_assumptions();

        result
    }

    /// Set of literals that satisfy the formula.
    pub fn model(&self) -> Option<Vec<Lit>> {
        let mut ctx = self.ctx.into_partial_ref();
        if ctx.part(SolverStateP).sat_state == SatState::Sat {
            Some(reconstruct_model(ctx.borrow()))
        } else {
            None
        }
    }

    /// The value assigned to a literal by the current model.
    ///
    /// Returns `None` when the solver state is not Sat.
    pub fn lit_value(&self, lit: Lit) -> Option<bool> {
        let mut ctx = self.ctx.into_partial_ref();
        if ctx.part(SolverStateP).sat_state == SatState::Sat {
            Some(
                ctx.part(AssignmentP)
                    .var_value(lit.var())
                    .unwrap_or(false)
                    ^ lit.is_negative(),
            )
        } else {
            None
        }
    }

    /// Whether an assumption literal was part of the unsatisfiable core of the last solve call.
    pub fn failed(&self, lit: Lit) -> bool {
        self.ctx.incremental.failed_core().contains(&lit)
    }

    /// Subset of the assumptions that made the last solve call unsatisfiable.
    pub fn failed_core(&self) -> &[Lit] {
        self.ctx.incremental.failed_core()
    }

    /// Install a callback that is polled at conflict boundaries.
    ///
    /// Returning true from the callback stops the search, `solve` then returns an
    /// [`Interrupted`](SolverError::Interrupted) error. The solver remains usable.
    pub fn set_terminate(&mut self, callback: impl FnMut() -> bool + 'a) {
        self.ctx.callbacks.terminate = Some(Box::new(callback));
    }

    /// Install a callback invoked for every learned clause with at most `max_len` literals.
    pub fn set_learn(&mut self, max_len: usize, callback: impl FnMut(&[Lit]) + 'a) {
        self.ctx.callbacks.learn = Some(LearnCallback {
            max_len,
            callback: Box::new(callback),
        });
    }

    /// Write a DRAT proof of unsatisfiability to the given target.
    pub fn write_proof(&mut self, target: impl io::Write + 'a, format: ProofFormat) {
        self.ctx.proof.write_proof(target, format);
    }

    /// Stop writing the proof and flush it.
    pub fn close_proof(&mut self) -> Result<(), SolverError> {
        self.ctx.proof.close_proof();
        if let Some(error) = self.ctx.proof.take_io_error() {
            return Err(SolverError::ProofIo(error));
        }
        Ok(())
    }

    /// Join a shared clause pool.
    ///
    /// Learned clauses with a small glue level are exported to the pool and clauses exported by
    /// other member solvers are imported between schedule steps.
    pub fn join(&mut self, pool: &std::sync::Arc<GlobalArena>) {
        self.shared = Some(pool.register());
    }

    fn sync_shared_clauses(&mut self) {
        let member = match &mut self.shared {
            Some(member) => member,
            None => return,
        };

        let glue_limit = self.ctx.solver_config.share_glue_limit;
        let conflicts = self.ctx.schedule.conflicts();

        if !member.sync_due(conflicts) {
            return;
        }

        member.exchange(&mut self.ctx, glue_limit, conflicts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    use cindersat_dimacs::write_dimacs;

    use cindersat_formula::{
        cnf_formula, lits,
        test::{conditional_pigeon_hole, sat_formula, sgen_unsat_formula},
    };

    proptest! {
        #[test]
        fn sgen_unsat(formula in sgen_unsat_formula(1..7usize)) {
            let mut solver = Solver::new();

            solver.add_formula(&formula);

            prop_assert_eq!(solver.solve().ok(), Some(false));
        }

        #[test]
        fn sat(formula in sat_formula(4..20usize, 10..100usize, 0.05..0.2, 0.9..1.0)) {
            let mut solver = Solver::new();

            solver.add_formula(&formula);

            prop_assert_eq!(solver.solve().ok(), Some(true));

            let model = solver.model().unwrap();

            for clause in formula.iter() {
                prop_assert!(clause.iter().any(|lit| model.contains(lit)));
            }
        }

        #[test]
        fn sat_via_dimacs(formula in sat_formula(4..20usize, 10..100usize, 0.05..0.2, 0.9..1.0)) {
            let mut solver = Solver::new();

            let mut dimacs = vec![];

            write_dimacs(&mut dimacs, &formula).unwrap();

            solver.add_dimacs_cnf(&mut &dimacs[..]).unwrap();

            prop_assert_eq!(solver.solve().ok(), Some(true));

            let model = solver.model().unwrap();

            for clause in formula.iter() {
                prop_assert!(clause.iter().any(|lit| model.contains(lit)));
            }
        }

        #[test]
        fn pigeon_hole_failed_assumptions(
            (enable_row, _columns, formula) in conditional_pigeon_hole(1..5usize, 1..5usize),
        ) {
            let mut solver = Solver::new();
            solver.add_formula(&formula);

            prop_assert_eq!(solver.solve().ok(), Some(true));

            solver.assume(&enable_row);
            prop_assert_eq!(solver.solve().ok(), Some(false));

            let core = solver.failed_core().to_vec();
            prop_assert!(!core.is_empty());
            for &lit in core.iter() {
                prop_assert!(solver.failed(lit));
                prop_assert!(enable_row.contains(&lit));
            }

            // Assumptions are cleared after each call.
            prop_assert_eq!(solver.solve().ok(), Some(true));
        }
    }

    #[test]
    fn empty_formula_is_sat() {
        let mut solver = Solver::new();
        assert_eq!(solver.solve().ok(), Some(true));
        assert_eq!(solver.model(), Some(vec![]));
    }

    #[test]
    fn terminate_callback_interrupts() {
        let mut solver = Solver::new();

        let formula = cnf_formula![
            1, 2, 3;
            -1, -2, -3;
            1, -2, 3;
        ];
        solver.add_formula(&formula);

        solver.set_terminate(|| true);

        assert!(matches!(solver.solve(), Err(SolverError::Interrupted)));

        // The solver remains usable after the interrupt.
        solver.set_terminate(|| false);
        assert_eq!(solver.solve().ok(), Some(true));
    }

    #[test]
    fn learn_callback_sees_short_clauses() {
        use std::cell::RefCell;

        let learned = RefCell::new(vec![]);

        let mut solver = Solver::new();
        let formula = cnf_formula![
            1, 2;
            1, -2;
            -1, 2;
            -1, -2;
        ];
        solver.add_formula(&formula);
        solver.set_learn(2, |clause| learned.borrow_mut().push(clause.to_vec()));

        assert_eq!(solver.solve().ok(), Some(false));
        assert!(!learned.borrow().is_empty());
        for clause in learned.borrow().iter() {
            assert!(clause.len() <= 2);
        }
    }

    #[test]
    fn unsat_after_empty_clause_stays_unsat() {
        let mut solver = Solver::new();
        solver.add_clause(&lits![1, 2]);
        solver.add_clause(&[]);
        assert_eq!(solver.solve().ok(), Some(false));

        solver.add_clause(&lits![3]);
        assert_eq!(solver.solve().ok(), Some(false));
    }
}
