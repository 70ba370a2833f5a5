//! Propagation of long clauses.
use std::mem::take;

use partial_ref::{partial, PartialRef};

use cindersat_formula::Lit;

use crate::context::{
    ArenaP, AssignmentP, Context, DecisionP, ImplGraphP, TrailP, WatchlistsP,
};

use super::enqueue_assignment;
use super::{Conflict, Reason, Watch};

/// Propagate all literals implied by long clauses watched by the given literal.
///
/// On conflict return the clause propagating the conflicting assignment.
///
/// See [`prop::watch`](crate::prop::watch) for the invariants that this has to uphold.
pub fn propagate_long(
    mut ctx: partial!(
        Context,
        mut ArenaP,
        mut AssignmentP,
        mut DecisionP,
        mut ImplGraphP,
        mut TrailP,
        mut WatchlistsP,
    ),
    lit: Lit,
) -> Result<(), Conflict> {
    let (watchlists, mut ctx) = ctx.split_part_mut(WatchlistsP);
    let (arena, mut ctx) = ctx.split_part_mut(ArenaP);

    let false_lit = !lit;

    // The watchlist of the propagated literal is detached while we scan it. Replacement watches
    // are pushed onto other literals' lists, which thus never alias the detached one.
    let mut watches = take(watchlists.watched_by_mut(lit));

    let mut read = 0;
    let mut write = 0;

    let result = 'watchers: loop {
        if read == watches.len() {
            break Ok(());
        }
        let watch = watches[read];
        read += 1;

        // If the blocking literal (which is part of the watched clause) is already true, the
        // watched clause is satisfied and we don't even have to look at it.
        if ctx.part(AssignmentP).lit_is_true(watch.blocking) {
            watches[write] = watch;
            write += 1;
            continue;
        }

        let cref = watch.cref;
        let lits = arena.clause_mut(cref).lits_mut();

        // Ensure that the literal we're currently propagating is in position 1. This prepares the
        // literal order for further propagations, as the propagating literal has to be in
        // position 0.
        if lits[0] == false_lit {
            lits.swap(0, 1);
        }
        let first = lits[0];

        // The replacement watch uses the other watched literal as blocking literal.
        let new_watch = Watch {
            cref,
            blocking: first,
        };

        // If the other watched literal isn't the blocking literal, check whether it is true. If
        // so nothing else needs to be done.
        if first != watch.blocking && ctx.part(AssignmentP).lit_is_true(first) {
            watches[write] = new_watch;
            write += 1;
            continue;
        }

        // Look for a non-false unwatched literal to replace our watched literal.
        for pos in 2..lits.len() {
            let rest_lit = lits[pos];
            if !ctx.part(AssignmentP).lit_is_false(rest_lit) {
                lits[1] = rest_lit;
                lits[pos] = false_lit;

                debug_assert_ne!(!rest_lit, lit);
                watchlists.add_watch(!rest_lit, new_watch);
                continue 'watchers;
            }
        }

        // No replacement found, so the clause is propagating or in conflict.
        watches[write] = new_watch;
        write += 1;

        if ctx.part(AssignmentP).lit_is_false(first) {
            break Err(Conflict::Long(cref));
        }

        enqueue_assignment(ctx.borrow(), first, Reason::Long(cref));
    };

    // Keep any unprocessed watches when the scan stopped early on a conflict.
    while read < watches.len() {
        watches[write] = watches[read];
        write += 1;
        read += 1;
    }
    watches.truncate(write);
    *watchlists.watched_by_mut(lit) = watches;

    result
}
