//! Scheduling of restarts, reductions, inprocessing and solving steps.
mod ema;
mod luby;

use log::info;

use partial_ref::{partial, PartialRef};

use crate::cdcl::conflict_step;
use crate::clause::gc::collect_garbage;
use crate::clause::reduce::reduce;
use crate::config::RestartMode;
use crate::context::{
    AnalyzeConflictP, ArenaP, AssignmentP, BinaryWatchesP, CallbacksP, ClauseActivityP,
    ClauseDbP, Context, DecisionP, ElimP, ImplGraphP, IncrementalP, ProofP, ScheduleP,
    SolverConfigP, SolverStateP, TmpDataP, TrailP, VariablesP, WatchlistsP,
};
use crate::inprocess::inprocess_step;
use crate::proof;
use crate::prop::{full_restart, restart};
use crate::simplify::prove_units;
use crate::state::SatState;

use ema::Ema;
use luby::LubySequence;

/// Step size of the short term LBD average.
const LBD_FAST_ALPHA: f64 = 1.0 / 50.0;

/// Step size of the long term LBD average.
const LBD_SLOW_ALPHA: f64 = 1.0 / 10000.0;

/// Step size of the long term trail size average.
const TRAIL_ALPHA: f64 = 1.0 / 5000.0;

/// Number of conflicts before the dynamic restart heuristic is trusted.
const RESTART_MIN_CONFLICTS: u64 = 100;

/// Scheduling state of the search.
pub struct Schedule {
    conflicts: u64,
    restarts: u64,
    blocked_restarts: u64,
    reductions: u64,
    next_restart: u64,
    luby: LubySequence,
    lbd_fast: Ema,
    lbd_slow: Ema,
    trail_avg: Ema,
    next_reduce: u64,
    next_inprocess: u64,
}

impl Default for Schedule {
    fn default() -> Schedule {
        Schedule {
            conflicts: 0,
            restarts: 0,
            blocked_restarts: 0,
            reductions: 0,
            next_restart: 0,
            luby: LubySequence::default(),
            lbd_fast: Ema::new(LBD_FAST_ALPHA),
            lbd_slow: Ema::new(LBD_SLOW_ALPHA),
            trail_avg: Ema::new(TRAIL_ALPHA),
            next_inprocess: 0,
            next_reduce: 0,
        }
    }
}

impl Schedule {
    /// Number of conflicts handled so far.
    pub fn conflicts(&self) -> u64 {
        self.conflicts
    }

    /// Number of restarts performed so far.
    pub fn restarts(&self) -> u64 {
        self.restarts
    }
}

/// Perform one step of the schedule.
///
/// This handles exactly one conflict, with any restart, reduction or inprocessing that became due
/// before it. Returns false when the search is finished or was stopped.
pub fn schedule_step<'a>(
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
        mut ScheduleP,
        mut SolverStateP,
        mut TmpDataP,
        mut TrailP,
        mut VariablesP,
        mut WatchlistsP,
        SolverConfigP,
    ),
) -> bool {
    if ctx.part(SolverStateP).sat_state != SatState::Unknown
        || ctx.part(SolverStateP).stopped
    {
        return false;
    }

    if ctx.part_mut(CallbacksP).should_terminate() {
        ctx.part_mut(SolverStateP).stopped = true;
        return false;
    }

    proof::check_io(ctx.borrow());
    if ctx.part(SolverStateP).stopped {
        return false;
    }

    log_statistics(ctx.borrow());

    if restart_due(ctx.borrow()) {
        let (schedule, mut ctx) = ctx.split_part_mut(ScheduleP);
        restart(ctx.borrow());
        schedule.restarts += 1;
        schedule.lbd_fast.reset_to(schedule.lbd_slow.get());
    }

    if reduce_due(ctx.borrow()) {
        full_restart(ctx.borrow());
        prove_units(ctx.borrow());
        reduce(ctx.borrow());
        collect_garbage(ctx.borrow());

        let (schedule, ctx) = ctx.split_part_mut(ScheduleP);
        let config = ctx.part(SolverConfigP);
        schedule.reductions += 1;
        schedule.next_reduce = schedule.conflicts
            + config.reduce_interval_first
            + config.reduce_interval_inc * schedule.reductions;
    }

    if inprocess_due(ctx.borrow()) {
        full_restart(ctx.borrow());
        prove_units(ctx.borrow());
        inprocess_step(ctx.borrow());
        collect_garbage(ctx.borrow());

        let (schedule, ctx) = ctx.split_part_mut(ScheduleP);
        let config = ctx.part(SolverConfigP);
        schedule.next_inprocess = schedule.conflicts + config.inprocess_interval;

        if ctx.part(SolverStateP).sat_state != SatState::Unknown {
            return false;
        }
    }

    let summary = conflict_step(ctx.borrow());

    let (schedule, ctx) = ctx.split_part_mut(ScheduleP);
    schedule.conflicts += 1;

    if let Some(summary) = summary {
        schedule.lbd_fast.update(summary.glue as f64);
        schedule.lbd_slow.update(summary.glue as f64);
        schedule.trail_avg.update(summary.trail_depth as f64);
        true
    } else {
        ctx.part(SolverStateP).sat_state == SatState::Unknown
    }
}

/// Whether a restart is due, accounting for restart blocking.
fn restart_due(
    mut ctx: partial!(Context, mut ScheduleP, SolverConfigP, TrailP),
) -> bool {
    let (schedule, ctx) = ctx.split_part_mut(ScheduleP);
    let config = ctx.part(SolverConfigP);

    match config.restarts {
        RestartMode::Luby => {
            if schedule.conflicts >= schedule.next_restart {
                schedule.next_restart = schedule.conflicts
                    + config.luby_restart_interval_scale * schedule.luby.advance();
                schedule.conflicts > 0
            } else {
                false
            }
        }
        RestartMode::Glucose => {
            if schedule.conflicts < RESTART_MIN_CONFLICTS {
                return false;
            }
            if schedule.lbd_fast.get() * config.restart_lbd_ratio <= schedule.lbd_slow.get() {
                return false;
            }
            // A quickly growing trail hints at an imminent satisfying assignment, so the restart
            // is blocked.
            let trail_len = ctx.part(TrailP).trail().len() as f64;
            if trail_len > config.restart_blocking_scale * schedule.trail_avg.get() {
                schedule.blocked_restarts += 1;
                schedule.lbd_fast.reset_to(schedule.lbd_slow.get());
                return false;
            }
            true
        }
    }
}

/// Whether a clause database reduction is due.
fn reduce_due(
    mut ctx: partial!(Context, mut ScheduleP, SolverConfigP),
) -> bool {
    let (schedule, ctx) = ctx.split_part_mut(ScheduleP);
    let config = ctx.part(SolverConfigP);

    if schedule.next_reduce == 0 {
        schedule.next_reduce = config.reduce_interval_first;
    }

    schedule.conflicts >= schedule.next_reduce
}

/// Whether an inprocessing run is due.
fn inprocess_due(
    mut ctx: partial!(Context, mut ScheduleP, SolverConfigP),
) -> bool {
    let (schedule, ctx) = ctx.split_part_mut(ScheduleP);
    let config = ctx.part(SolverConfigP);

    if config.inprocess_interval == 0 {
        return false;
    }

    if schedule.next_inprocess == 0 {
        schedule.next_inprocess = config.inprocess_interval;
    }

    schedule.conflicts >= schedule.next_inprocess
}

/// Log search statistics at regular intervals.
fn log_statistics(
    ctx: partial!(
        Context,
        AssignmentP,
        BinaryWatchesP,
        ClauseDbP,
        ScheduleP,
        TrailP,
        VariablesP,
    ),
) {
    let schedule = ctx.part(ScheduleP);

    if schedule.conflicts > 0 && schedule.conflicts % 5000 == 0 {
        let db = ctx.part(ClauseDbP);
        let units = ctx.part(TrailP).top_level_assignment_count();
        info!(
            "confl: {}k rest: {} ({} blocked) vars: {} elim: {} bin: {} irred: {} red: {}",
            schedule.conflicts / 1000,
            schedule.restarts,
            schedule.blocked_restarts,
            ctx.part(AssignmentP).assignment().len() - units,
            ctx.part(VariablesP).eliminated_count(),
            ctx.part(BinaryWatchesP).count(),
            db.irred_count(),
            db.redundant_count(),
        );
    }
}
