//! Central solver data structure.
//!
//! This module defines the `Context` data structure which holds all data used by the solver. It
//! also contains global notification functions that likely need to be extended when new parts are
//! added to the solver.
use partial_ref::{part, partial, PartialRef, PartialRefTarget};

use crate::analyze::AnalyzeConflict;
use crate::callbacks::Callbacks;
use crate::clause::{ClauseActivity, ClauseArena, ClauseDb};
use crate::config::{SolverConfig, SolverConfigUpdate};
use crate::decision::Decision;
use crate::incremental::Incremental;
use crate::inprocess::Eliminator;
use crate::proof::Proof;
use crate::prop::{Assignment, BinaryWatches, ImplGraph, Trail, Watchlists};
use crate::schedule::Schedule;
use crate::state::SolverState;
use crate::tmp::TmpData;
use crate::variables::Variables;

part!(pub AnalyzeConflictP: AnalyzeConflict);
part!(pub ArenaP: ClauseArena);
part!(pub AssignmentP: Assignment);
part!(pub BinaryWatchesP: BinaryWatches);
part!(pub CallbacksP<'a>: Callbacks<'a>);
part!(pub ClauseActivityP: ClauseActivity);
part!(pub ClauseDbP: ClauseDb);
part!(pub DecisionP: Decision);
part!(pub ElimP: Eliminator);
part!(pub ImplGraphP: ImplGraph);
part!(pub IncrementalP: Incremental);
part!(pub ProofP<'a>: Proof<'a>);
part!(pub ScheduleP: Schedule);
part!(pub SolverConfigP: SolverConfig);
part!(pub SolverStateP: SolverState);
part!(pub TmpDataP: TmpData);
part!(pub TrailP: Trail);
part!(pub VariablesP: Variables);
part!(pub WatchlistsP: Watchlists);

/// Central solver data structure.
///
/// This struct contains all data kept by the solver. Most functions operating on multiple fields
/// of the context use partial references provided by the `partial_ref` crate. This documents the
/// data dependencies and makes the borrow checker happy without the overhead of passing
/// individual references.
#[derive(PartialRefTarget, Default)]
pub struct Context<'a> {
    #[part(AnalyzeConflictP)]
    pub analyze_conflict: AnalyzeConflict,
    #[part(ArenaP)]
    pub arena: ClauseArena,
    #[part(AssignmentP)]
    pub assignment: Assignment,
    #[part(BinaryWatchesP)]
    pub binary_watches: BinaryWatches,
    #[part(CallbacksP<'a>)]
    pub callbacks: Callbacks<'a>,
    #[part(ClauseActivityP)]
    pub clause_activity: ClauseActivity,
    #[part(ClauseDbP)]
    pub clause_db: ClauseDb,
    #[part(DecisionP)]
    pub decision: Decision,
    #[part(ElimP)]
    pub eliminator: Eliminator,
    #[part(ImplGraphP)]
    pub impl_graph: ImplGraph,
    #[part(IncrementalP)]
    pub incremental: Incremental,
    #[part(ProofP<'a>)]
    pub proof: Proof<'a>,
    #[part(ScheduleP)]
    pub schedule: Schedule,
    #[part(SolverConfigP)]
    pub solver_config: SolverConfig,
    #[part(SolverStateP)]
    pub solver_state: SolverState,
    #[part(TmpDataP)]
    pub tmp_data: TmpData,
    #[part(TrailP)]
    pub trail: Trail,
    #[part(VariablesP)]
    pub variables: Variables,
    #[part(WatchlistsP)]
    pub watchlists: Watchlists,
}

/// Update structures for a new variable count.
pub fn set_var_count(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        mut AssignmentP,
        mut BinaryWatchesP,
        mut DecisionP,
        mut ElimP,
        mut ImplGraphP,
        mut TmpDataP,
        mut VariablesP,
        mut WatchlistsP,
    ),
    count: usize,
) {
    ctx.part_mut(AnalyzeConflictP).set_var_count(count);
    ctx.part_mut(AssignmentP).set_var_count(count);
    ctx.part_mut(BinaryWatchesP).set_var_count(count);
    ctx.part_mut(DecisionP).set_var_count(count);
    ctx.part_mut(ElimP).set_var_count(count);
    ctx.part_mut(ImplGraphP).set_var_count(count);
    ctx.part_mut(TmpDataP).set_var_count(count);
    ctx.part_mut(VariablesP).set_var_count(count);
    ctx.part_mut(VariablesP).ensure_count(count);
    ctx.part_mut(WatchlistsP).set_var_count(count);
}

/// Increases the variable count to at least the watermark of the variable metadata.
pub fn ensure_var_count(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        mut AssignmentP,
        mut BinaryWatchesP,
        mut DecisionP,
        mut ElimP,
        mut ImplGraphP,
        mut TmpDataP,
        mut VariablesP,
        mut WatchlistsP,
    ),
    count: usize,
) {
    ctx.part_mut(VariablesP).ensure_count(count);
    let count = ctx.part(VariablesP).watermark();
    if count > ctx.part_mut(AssignmentP).assignment().len() {
        set_var_count(ctx.borrow(), count)
    }
}

/// The solver configuration has changed.
pub fn config_changed(
    mut ctx: partial!(Context, mut ClauseActivityP, mut DecisionP, SolverConfigP),
) {
    let (config, mut ctx) = ctx.split_part(SolverConfigP);
    let decision = ctx.part_mut(DecisionP);
    decision.set_mode(config.branching);
    decision.set_decay(config.vsids_decay);
    ctx.part_mut(ClauseActivityP)
        .set_decay(config.clause_activity_decay);
}
