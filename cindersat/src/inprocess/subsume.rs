//! Backward subsumption and self-subsuming resolution.
use partial_ref::{partial, PartialRef};

use cindersat_formula::Lit;

use crate::clause::{db, ClauseRef};
use crate::context::{
    ArenaP, AssignmentP, BinaryWatchesP, ClauseDbP, Context, DecisionP, ElimP, ImplGraphP,
    ProofP, SolverConfigP, SolverStateP, TrailP, WatchlistsP,
};
use crate::proof;
use crate::prop::{enqueue_assignment, Reason};
use crate::state::SatState;

use super::occur;

/// Result of matching a subsuming clause against a candidate.
enum Subsumption {
    /// Every literal of the subsuming clause occurs in the candidate.
    Subsumes,
    /// Every literal occurs in the candidate except this one, which occurs negated.
    Strengthen(Lit),
    /// Neither.
    None,
}

/// Check whether `a` subsumes `b`, or whether it can strengthen `b` by resolution.
///
/// The caller has to ensure `b` is at least as long as `a` and that the signature filter passed.
fn subsumes(a: &[Lit], b: &[Lit]) -> Subsumption {
    let mut strengthen = None;

    'outer: for &lit_a in a {
        for &lit_b in b {
            if lit_a == lit_b {
                continue 'outer;
            }
            if strengthen.is_none() && lit_a == !lit_b {
                strengthen = Some(lit_a);
                continue 'outer;
            }
        }
        return Subsumption::None;
    }

    match strengthen {
        None => Subsumption::Subsumes,
        Some(lit) => Subsumption::Strengthen(lit),
    }
}

/// Perform backward subsumption over the whole clause database.
///
/// Every irredundant clause up to the configured size is used as a subsuming clause. Subsumed
/// clauses are deleted, self-subsuming resolution removes single literals. Derived unit clauses
/// are enqueued at level 0 but not propagated here; a derived empty clause makes the formula
/// unsatisfiable.
///
/// Returns the number of deleted or strengthened clauses.
pub fn backward_subsume<'a>(
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
        SolverConfigP,
    ),
) -> usize {
    let size_limit = ctx.part(SolverConfigP).subsume_clause_size_limit;

    let mut queue: Vec<ClauseRef> = {
        let arena = ctx.part(ArenaP);
        ctx.part(ClauseDbP)
            .clauses()
            .iter()
            .cloned()
            .filter(|&cref| {
                let header = arena.header(cref);
                !header.deleted() && !header.redundant() && header.len() <= size_limit
            })
            .collect()
    };

    let mut changed = 0;

    while let Some(cref) = queue.pop() {
        if ctx.part(ArenaP).header(cref).deleted() {
            continue;
        }

        let (lits_a, signature_a) = {
            let clause = ctx.part(ArenaP).clause(cref);
            (clause.lits().to_vec(), clause.header().signature())
        };

        // Scanning the occurrence list of the rarest literal minimizes candidate checks.
        let best_lit = {
            let eliminator = ctx.part(ElimP);
            lits_a
                .iter()
                .cloned()
                .min_by_key(|lit| eliminator.occurs[lit.code()].len())
                .unwrap()
        };

        for candidate in occur::live_occurrences(ctx.borrow(), best_lit) {
            if candidate == cref {
                continue;
            }
            {
                let header = ctx.part(ArenaP).header(candidate);
                if header.deleted()
                    || header.len() < lits_a.len()
                    || signature_a & !header.signature() != 0
                {
                    continue;
                }
            }

            let verdict = subsumes(&lits_a, ctx.part(ArenaP).clause(candidate).lits());

            match verdict {
                Subsumption::None => (),
                Subsumption::Subsumes => {
                    let lits: Vec<_> = ctx.part(ArenaP).clause(candidate).lits().to_vec();
                    db::delete_clause(ctx.borrow(), candidate);
                    proof::delete_clause(ctx.borrow(), &lits);
                    changed += 1;
                }
                Subsumption::Strengthen(lit) => {
                    if let Some(new_cref) = strengthen_clause(ctx.borrow(), candidate, !lit) {
                        queue.push(new_cref);
                    }
                    changed += 1;
                    if ctx.part(SolverStateP).sat_state != SatState::Unknown {
                        return changed;
                    }
                }
            }
        }
    }

    changed
}

/// Remove a single literal from a clause by self-subsuming resolution.
///
/// The shortened clause replaces the original. Returns the new clause reference when the result
/// is still an irredundant clause that can subsume further clauses.
fn strengthen_clause<'a>(
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
    cref: ClauseRef,
    remove: Lit,
) -> Option<ClauseRef> {
    let (old_lits, mut header) = {
        let clause = ctx.part(ArenaP).clause(cref);
        (clause.lits().to_vec(), clause.header().clone())
    };

    let new_lits: Vec<_> = old_lits.iter().cloned().filter(|&l| l != remove).collect();
    debug_assert_eq!(new_lits.len() + 1, old_lits.len());

    proof::add_clause(ctx.borrow(), &new_lits);

    db::delete_clause(ctx.borrow(), cref);
    proof::delete_clause(ctx.borrow(), &old_lits);

    match new_lits[..] {
        [] => unreachable!("strengthening cannot empty a clause"),
        [lit] => {
            match ctx.part(AssignmentP).lit_value(lit) {
                Some(true) => (),
                Some(false) => {
                    proof::add_empty_clause(ctx.borrow());
                    ctx.part_mut(SolverStateP).sat_state = SatState::Unsat;
                }
                None => enqueue_assignment(ctx.borrow(), lit, Reason::Unit),
            }
            None
        }
        _ => {
            header.set_glue(header.glue().min(new_lits.len()));
            header.set_protected(false);
            let redundant = header.redundant();
            let new_cref = db::add_clause(ctx.borrow(), header, &new_lits);
            occur::add_occurrences(ctx.borrow(), new_cref, &new_lits);
            if redundant {
                None
            } else {
                Some(new_cref)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use cindersat_formula::lits;

    #[test]
    fn subsumption_verdicts() {
        assert!(matches!(
            subsumes(&lits![1, 2], &lits![1, 2, 3]),
            Subsumption::Subsumes
        ));
        assert!(matches!(
            subsumes(&lits![1, -3], &lits![1, 2, 3]),
            Subsumption::Strengthen(lit) if lit == lits![-3][0]
        ));
        assert!(matches!(
            subsumes(&lits![1, 4], &lits![1, 2, 3]),
            Subsumption::None
        ));
        // Two negated literals do not allow resolution in a single step.
        assert!(matches!(
            subsumes(&lits![-1, -2], &lits![1, 2, 3]),
            Subsumption::None
        ));
    }
}
