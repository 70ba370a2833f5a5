//! Bounded variable elimination.
use partial_ref::{partial, PartialRef};

use cindersat_formula::{Lit, Var};

use crate::clause::{db, ClauseHeader, ClauseRef};
use crate::context::{
    ArenaP, AssignmentP, BinaryWatchesP, ClauseDbP, Context, DecisionP, ElimP, ImplGraphP,
    IncrementalP, ProofP, SolverConfigP, SolverStateP, TmpDataP, TrailP, VariablesP, WatchlistsP,
};
use crate::load::load_clause;
use crate::proof;
use crate::prop::{enqueue_assignment, Reason};
use crate::state::SatState;

use super::occur;

/// Eliminate variables by resolution where this does not grow the formula.
///
/// Candidates are processed by increasing occurrence count product. For each eliminated variable
/// all resolvents of its positive and negative occurrences are added, the original clauses are
/// deleted and pushed onto the elimination log for model reconstruction. Redundant clauses of the
/// variable are simply dropped.
///
/// Returns the number of eliminated variables.
pub fn eliminate_vars<'a>(
    mut ctx: partial!(
        Context<'a>,
        mut ArenaP,
        mut AssignmentP,
        mut BinaryWatchesP,
        mut ClauseDbP,
        mut DecisionP,
        mut ElimP,
        mut ImplGraphP,
        mut ProofP<'a>,
        mut SolverStateP,
        mut TrailP,
        mut VariablesP,
        mut WatchlistsP,
        SolverConfigP,
    ),
) -> usize {
    let mut candidates: Vec<(usize, Var)> = vec![];

    {
        let eliminator = ctx.part(ElimP);
        let variables = ctx.part(VariablesP);
        let assignment = ctx.part(AssignmentP);

        for index in 0..variables.watermark() {
            let var = Var::from_index(index);
            if variables.is_frozen(var)
                || variables.is_eliminated(var)
                || assignment.var_value(var).is_some()
            {
                continue;
            }
            let pos = eliminator.occurs[var.positive().code()].len();
            let neg = eliminator.occurs[var.negative().code()].len();
            if pos + neg == 0 {
                continue;
            }
            candidates.push((pos * neg, var));
        }
    }

    candidates.sort_unstable();

    let mut eliminated = 0;

    for &(_, var) in candidates.iter() {
        if ctx.part(SolverStateP).sat_state != SatState::Unknown {
            break;
        }
        if try_eliminate(ctx.borrow(), var) {
            eliminated += 1;
        }
    }

    eliminated
}

/// Try to eliminate a single variable.
fn try_eliminate<'a>(
    mut ctx: partial!(
        Context<'a>,
        mut ArenaP,
        mut AssignmentP,
        mut BinaryWatchesP,
        mut ClauseDbP,
        mut DecisionP,
        mut ElimP,
        mut ImplGraphP,
        mut ProofP<'a>,
        mut SolverStateP,
        mut TrailP,
        mut VariablesP,
        mut WatchlistsP,
        SolverConfigP,
    ),
    var: Var,
) -> bool {
    if ctx.part(AssignmentP).var_value(var).is_some() {
        return false;
    }

    let occ_product_limit = ctx.part(SolverConfigP).elim_occ_product_limit;
    let len_limit = ctx.part(SolverConfigP).elim_clause_len_limit;
    let grow_limit = ctx.part(SolverConfigP).elim_grow_limit;

    let pos_all = occur::live_occurrences(ctx.borrow(), var.positive());
    let neg_all = occur::live_occurrences(ctx.borrow(), var.negative());

    let mut pos = vec![];
    let mut neg = vec![];
    let mut redundant = vec![];

    {
        let arena = ctx.part(ArenaP);
        for &cref in pos_all.iter() {
            if arena.header(cref).redundant() {
                redundant.push(cref);
            } else {
                pos.push(cref);
            }
        }
        for &cref in neg_all.iter() {
            if arena.header(cref).redundant() {
                redundant.push(cref);
            } else {
                neg.push(cref);
            }
        }
    }

    if pos.len() * neg.len() > occ_product_limit {
        return false;
    }

    let (pos_lits, neg_lits) = {
        let arena = ctx.part(ArenaP);
        let collect = |crefs: &[ClauseRef]| -> Vec<Vec<Lit>> {
            crefs
                .iter()
                .map(|&cref| arena.clause(cref).lits().to_vec())
                .collect()
        };
        (collect(&pos), collect(&neg))
    };

    // Count and collect the non-tautological resolvents, giving up when the formula would grow.
    let mut resolvents = vec![];

    for p in pos_lits.iter() {
        for n in neg_lits.iter() {
            if let Some(resolvent) = merge(p, n, var) {
                if resolvent.len() > len_limit {
                    return false;
                }
                resolvents.push(resolvent);
                if resolvents.len() > pos.len() + neg.len() + grow_limit {
                    return false;
                }
            }
        }
    }

    for resolvent in resolvents {
        add_resolvent(ctx.borrow(), &resolvent);
        if ctx.part(SolverStateP).sat_state != SatState::Unknown {
            return true;
        }
    }

    for (&cref, lits) in pos.iter().zip(pos_lits.iter()) {
        log_and_delete(ctx.borrow(), cref, lits, var.positive());
    }
    for (&cref, lits) in neg.iter().zip(neg_lits.iter()) {
        log_and_delete(ctx.borrow(), cref, lits, var.negative());
    }

    for cref in redundant {
        if !ctx.part(ArenaP).header(cref).deleted() {
            let lits: Vec<_> = ctx.part(ArenaP).clause(cref).lits().to_vec();
            db::delete_clause(ctx.borrow(), cref);
            proof::delete_clause(ctx.borrow(), &lits);
        }
    }

    ctx.part_mut(VariablesP).set_eliminated(var, true);

    true
}

/// Resolve two clauses on a variable.
///
/// Returns `None` for tautological resolvents.
fn merge(pos: &[Lit], neg: &[Lit], var: Var) -> Option<Vec<Lit>> {
    let mut resolvent: Vec<Lit> = pos.iter().cloned().filter(|l| l.var() != var).collect();

    for &lit in neg.iter() {
        if lit.var() == var {
            continue;
        }
        if resolvent.contains(&!lit) {
            return None;
        }
        if !resolvent.contains(&lit) {
            resolvent.push(lit);
        }
    }

    Some(resolvent)
}

/// Add a resolvent produced by variable elimination.
///
/// Literals false at level 0 are dropped and satisfied resolvents are skipped. Unit resolvents
/// are enqueued, an empty resolvent makes the formula unsatisfiable.
fn add_resolvent<'a>(
    mut ctx: partial!(
        Context<'a>,
        mut ArenaP,
        mut AssignmentP,
        mut BinaryWatchesP,
        mut ClauseDbP,
        mut DecisionP,
        mut ElimP,
        mut ImplGraphP,
        mut ProofP<'a>,
        mut SolverStateP,
        mut TrailP,
        mut WatchlistsP,
    ),
    lits: &[Lit],
) {
    let mut simplified = vec![];

    for &lit in lits {
        match ctx.part(AssignmentP).lit_value(lit) {
            Some(true) => return,
            Some(false) => (),
            None => simplified.push(lit),
        }
    }

    proof::add_clause(ctx.borrow(), &simplified);

    match simplified[..] {
        [] => {
            ctx.part_mut(SolverStateP).sat_state = SatState::Unsat;
        }
        [lit] => enqueue_assignment(ctx.borrow(), lit, Reason::Unit),
        _ => {
            let header = ClauseHeader::new();
            let cref = db::add_clause(ctx.borrow(), header, &simplified);
            occur::add_occurrences(ctx.borrow(), cref, &simplified);
        }
    }
}

/// Push a clause onto the elimination log and delete it.
fn log_and_delete<'a>(
    mut ctx: partial!(
        Context<'a>,
        mut ArenaP,
        mut BinaryWatchesP,
        mut ClauseDbP,
        mut ElimP,
        mut ProofP<'a>,
        mut WatchlistsP,
    ),
    cref: ClauseRef,
    lits: &[Lit],
    var_lit: Lit,
) {
    let rest: Vec<_> = lits.iter().cloned().filter(|&l| l != var_lit).collect();
    ctx.part_mut(ElimP).log_clause(var_lit, rest);

    db::delete_clause(ctx.borrow(), cref);
    proof::delete_clause(ctx.borrow(), lits);
}

/// Undo the elimination of a variable.
///
/// Reloads the logged clauses of the variable, which in turn restores any other eliminated
/// variable they mention. Used when new clauses or assumptions refer to an eliminated variable.
///
/// This does not undo the proof records of the elimination, so proofs of incremental solver
/// uses that restore variables are not generally checkable.
pub fn restore_eliminated_var<'a>(
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
    var: Var,
) {
    ctx.part_mut(VariablesP).set_eliminated(var, false);
    ctx.part_mut(DecisionP).make_available(var);

    let drained = ctx.part_mut(ElimP).drain_log_of_var(var);

    let mut lits = vec![];
    for entry in drained {
        lits.clear();
        lits.extend_from_slice(&entry.rest);
        lits.push(entry.var_lit);
        load_clause(ctx.borrow(), &lits);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use cindersat_formula::lits;

    #[test]
    fn merge_resolves_and_detects_tautologies() {
        let var = lits![1][0].var();

        assert_eq!(
            merge(&lits![1, 2, 3], &lits![-1, 4], var),
            Some(lits![2, 3, 4].to_vec())
        );

        assert_eq!(
            merge(&lits![1, 2], &lits![-1, -2], var),
            None
        );

        // Duplicate literals are merged.
        assert_eq!(
            merge(&lits![1, 2], &lits![-1, 2], var),
            Some(lits![2].to_vec())
        );
    }
}
