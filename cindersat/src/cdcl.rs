//! Conflict driven clause learning.
use partial_ref::{partial, PartialRef};

use crate::analyze::analyze_conflict;
use crate::clause::{bump_clause_activity, db, decay_clause_activities, ClauseHeader, ClauseRef};
use crate::context::{
    AnalyzeConflictP, ArenaP, AssignmentP, BinaryWatchesP, CallbacksP, ClauseActivityP,
    ClauseDbP, Context, DecisionP, ElimP, ImplGraphP, IncrementalP, ProofP, SolverStateP,
    TmpDataP, TrailP, VariablesP, WatchlistsP,
};
use crate::decision::make_decision;
use crate::glue::compute_glue;
use crate::incremental::{enqueue_assumption, EnqueueAssumption};
use crate::proof;
use crate::prop::{backtrack, enqueue_assignment, propagate, Conflict, Reason};
use crate::simplify::{prove_units, simplify};
use crate::state::SatState;

/// Data about a handled conflict, fed into the restart heuristics.
pub struct ConflictSummary {
    /// Glue level of the learned clause.
    pub glue: usize,
    /// Trail length at the time of the conflict.
    pub trail_depth: usize,
}

/// Find a conflict, learn a clause and backjump.
///
/// Returns a summary of the conflict, or `None` when the search finished instead, leaving the
/// solver state at Sat, Unsat or UnsatUnderAssumptions.
pub fn conflict_step<'a>(
    mut ctx: partial!(
        Context<'a>,
        mut AnalyzeConflictP,
        mut ArenaP,
        mut AssignmentP,
        mut BinaryWatchesP,
        mut CallbacksP<'a>,
        mut ClauseActivityP,
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
) -> Option<ConflictSummary> {
    let conflict = match find_conflict(ctx.borrow()) {
        Ok(()) => {
            ctx.part_mut(SolverStateP).sat_state = SatState::Sat;
            return None;
        }
        Err(FoundConflict::Assumption) => {
            ctx.part_mut(SolverStateP).sat_state = SatState::UnsatUnderAssumptions;
            return None;
        }
        Err(FoundConflict::Conflict(conflict)) => conflict,
    };

    let trail_depth = ctx.part(TrailP).trail().len();

    let backtrack_to = analyze_conflict(ctx.borrow(), conflict);

    {
        let (analyze, mut ctx) = ctx.split_part(AnalyzeConflictP);
        for &cref in analyze.involved() {
            bump_involved_clause(ctx.borrow(), cref);
        }
    }

    decay_clause_activities(ctx.borrow());

    let glue = {
        let (analyze, mut ctx) = ctx.split_part(AnalyzeConflictP);
        let clause = analyze.clause();
        if clause.is_empty() {
            0
        } else {
            // Computed while the clause is still in conflict, so the glue level is one higher
            // than it'll be after backjumping when the clause becomes asserting.
            compute_glue(ctx.borrow(), clause) - 1
        }
    };

    backtrack(ctx.borrow(), backtrack_to);

    let (analyze, mut ctx) = ctx.split_part(AnalyzeConflictP);
    let clause = analyze.clause();

    if clause.is_empty() {
        proof::add_empty_clause(ctx.borrow());
        ctx.part_mut(SolverStateP).sat_state = SatState::Unsat;
        return None;
    }

    proof::add_clause(ctx.borrow(), clause);
    ctx.part_mut(CallbacksP).clause_learned(clause);

    let reason = match *clause {
        [_] => Reason::Unit,
        [lit_0, lit_1] => {
            let mut header = ClauseHeader::new();
            header.set_redundant(true);
            header.set_glue(glue);
            db::add_clause(ctx.borrow(), header, &[lit_0, lit_1]);
            Reason::Binary([lit_1])
        }
        _ => {
            let mut header = ClauseHeader::new();
            header.set_redundant(true);
            header.set_glue(glue);
            let cref = db::add_clause(ctx.borrow(), header, clause);
            Reason::Long(cref)
        }
    };

    enqueue_assignment(ctx.borrow(), clause[0], reason);

    Some(ConflictSummary { glue, trail_depth })
}

/// Bump an involved clause's activity and re-estimate its glue level.
///
/// Only decreases of the glue level are accepted, an improved clause is protected from the next
/// reduction.
fn bump_involved_clause(
    mut ctx: partial!(
        Context,
        mut ArenaP,
        mut ClauseActivityP,
        mut ClauseDbP,
        mut TmpDataP,
        ImplGraphP,
    ),
    cref: ClauseRef,
) {
    bump_clause_activity(ctx.borrow(), cref);

    if ctx.part(ArenaP).header(cref).redundant() {
        let (arena, mut ctx) = ctx.split_part_mut(ArenaP);
        let glue = compute_glue(ctx.borrow(), arena.clause(cref).lits());
        let header = arena.header_mut(cref);
        if glue < header.glue() {
            header.set_glue(glue);
            header.set_protected(true);
        }
    }
}

/// Return type of [`find_conflict`].
///
/// Specifies whether a conflict was found during propagation or while enqueuing assumptions.
enum FoundConflict {
    Conflict(Conflict),
    Assumption,
}

impl From<Conflict> for FoundConflict {
    fn from(conflict: Conflict) -> FoundConflict {
        FoundConflict::Conflict(conflict)
    }
}

/// Find a conflict.
///
/// Returns `Err` if a conflict was found and `Ok` if a satisfying assignment was found instead.
fn find_conflict<'a>(
    mut ctx: partial!(
        Context<'a>,
        mut ArenaP,
        mut AssignmentP,
        mut BinaryWatchesP,
        mut ClauseDbP,
        mut DecisionP,
        mut ImplGraphP,
        mut IncrementalP,
        mut ProofP<'a>,
        mut TmpDataP,
        mut TrailP,
        mut WatchlistsP,
        VariablesP,
    ),
) -> Result<(), FoundConflict> {
    loop {
        let propagation_result = propagate(ctx.borrow());

        let new_unit = prove_units(ctx.borrow());

        propagation_result.map_err(FoundConflict::from)?;

        if new_unit {
            simplify(ctx.borrow());
        }

        match enqueue_assumption(ctx.borrow()) {
            EnqueueAssumption::Enqueued => continue,
            EnqueueAssumption::Conflict => return Err(FoundConflict::Assumption),
            EnqueueAssumption::Done => (),
        }

        if !make_decision(ctx.borrow()) {
            return Ok(());
        }
    }
}
