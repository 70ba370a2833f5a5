//! The LRB branching heuristic.
//!
//! The LRB (Learning Rate Branching) heuristic scores a variable by an exponential moving average
//! of its learning rate: the fraction of conflicts it participated in while it was assigned. The
//! average is updated when the variable is unassigned during backtracking. The step size of the
//! moving average starts out large and shrinks as conflicts accumulate, following Liang et al.,
//! "Learning Rate Based Branching Heuristic for SAT Solvers".
use cindersat_formula::Var;

/// Initial step size of the moving average.
const ALPHA_INIT: f64 = 0.4;

/// Final step size of the moving average.
const ALPHA_MIN: f64 = 0.06;

/// Per conflict decrement of the step size.
const ALPHA_STEP: f64 = 1e-6;

/// Interval and participation bookkeeping of the LRB heuristic.
pub struct Lrb {
    /// Current step size of the moving average.
    alpha: f64,
    /// Total number of conflicts seen so far.
    conflicts: u64,
    /// Conflict count at the time each variable was assigned.
    assigned_at: Vec<u64>,
    /// Number of conflicts each variable participated in since it was assigned.
    participated: Vec<u64>,
}

impl Default for Lrb {
    fn default() -> Lrb {
        Lrb {
            alpha: ALPHA_INIT,
            conflicts: 0,
            assigned_at: vec![],
            participated: vec![],
        }
    }
}

impl Lrb {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.assigned_at.resize(count, 0);
        self.participated.resize(count, 0);
    }

    /// Account for a new conflict and shrink the step size.
    pub fn conflict(&mut self) {
        self.conflicts += 1;
        if self.alpha > ALPHA_MIN {
            self.alpha = (self.alpha - ALPHA_STEP).max(ALPHA_MIN);
        }
    }

    /// The variable participated in the current conflict.
    pub fn bump_participation(&mut self, var: Var) {
        self.participated[var.index()] += 1;
    }

    /// The variable was assigned, start a new interval.
    pub fn on_assign(&mut self, var: Var) {
        self.assigned_at[var.index()] = self.conflicts;
        self.participated[var.index()] = 0;
    }

    /// The variable was unassigned, fold its learning rate into the moving average.
    ///
    /// Returns the variable's new score.
    pub fn on_unassign(&mut self, var: Var, score: f64) -> f64 {
        let interval = self.conflicts - self.assigned_at[var.index()];
        if interval > 0 {
            let reward = self.participated[var.index()] as f64 / interval as f64;
            (1.0 - self.alpha) * score + self.alpha * reward
        } else {
            score
        }
    }
}
