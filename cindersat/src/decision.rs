//! Decision heuristics.
//!
//! Keeps a score for each variable and a max-heap of the unassigned variables keyed on that
//! score. Two scoring schemes are implemented: VSIDS in [`vsids`] and LRB in [`lrb`]. The active
//! scheme is selected by the solver configuration, the `lrb` cargo feature changes the build time
//! default.
pub mod lrb;
pub mod vsids;

use ordered_float::OrderedFloat;
use partial_ref::{partial, PartialRef};

use cindersat_formula::Var;

use crate::config::BranchingMode;
use crate::context::{
    AssignmentP, Context, DecisionP, ImplGraphP, TrailP, VariablesP,
};
use crate::prop::{enqueue_assignment, Reason};

use lrb::Lrb;
use vsids::Vsids;

/// Rescale scores if any value exceeds this value.
fn rescale_limit() -> f64 {
    std::f64::MAX / 16.0
}

/// Variable scores and the decision heap.
pub struct Decision {
    /// The score of each variable.
    score: Vec<OrderedFloat<f64>>,
    /// A binary max-heap of the variables.
    heap: Vec<Var>,
    /// The position in the binary heap for each variable.
    position: Vec<Option<usize>>,
    /// The active scoring scheme.
    mode: BranchingMode,
    vsids: Vsids,
    lrb: Lrb,
}

impl Default for Decision {
    fn default() -> Decision {
        Decision {
            score: vec![],
            heap: vec![],
            position: vec![],
            mode: BranchingMode::default(),
            vsids: Vsids::default(),
            lrb: Lrb::default(),
        }
    }
}

impl Decision {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        let old_count = self.score.len();
        debug_assert!(!self.heap.iter().any(|&v| v.index() >= count));
        self.score.resize(count, OrderedFloat(0.0));
        self.position.resize(count, None);
        self.lrb.set_var_count(count);

        for i in old_count..count {
            self.make_available(Var::from_index(i));
        }
    }

    /// Change the active scoring scheme.
    ///
    /// Scores do not transfer between schemes, so all scores are reset.
    pub fn set_mode(&mut self, mode: BranchingMode) {
        if self.mode != mode {
            self.mode = mode;
            for score in self.score.iter_mut() {
                *score = OrderedFloat(0.0);
            }
        }
    }

    /// Change the VSIDS decay factor.
    pub fn set_decay(&mut self, decay: f64) {
        self.vsids.set_decay(decay);
    }

    /// Bump a variable involved in a conflict.
    pub fn bump(&mut self, var: Var) {
        match self.mode {
            BranchingMode::Vsids => {
                let rescale = {
                    let value = &mut self.score[var.index()];
                    value.0 += self.vsids.bump();
                    value.0 >= rescale_limit()
                };
                if rescale {
                    self.rescale();
                }
                if let Some(pos) = self.position[var.index()] {
                    self.sift_up(pos);
                }
            }
            BranchingMode::Lrb => self.lrb.bump_participation(var),
        }
    }

    /// Per-conflict score evolution.
    pub fn decay(&mut self) {
        match self.mode {
            BranchingMode::Vsids => {
                if self.vsids.decay() >= rescale_limit() {
                    self.rescale();
                }
            }
            BranchingMode::Lrb => self.lrb.conflict(),
        }
    }

    /// A variable was assigned.
    pub fn on_assign(&mut self, var: Var) {
        if self.mode == BranchingMode::Lrb {
            self.lrb.on_assign(var);
        }
    }

    /// A variable was unassigned during backtracking.
    pub fn on_unassign(&mut self, var: Var) {
        if self.mode == BranchingMode::Lrb {
            let score = self.score[var.index()].0;
            let new_score = self.lrb.on_unassign(var, score);
            self.score[var.index()] = OrderedFloat(new_score);
            if let Some(pos) = self.position[var.index()] {
                self.sift_up(pos);
                self.sift_down(self.position[var.index()].unwrap());
            }
        }
    }

    /// Rescale all values to avoid an overflow.
    fn rescale(&mut self) {
        let rescale_factor = 1.0 / rescale_limit();
        for score in &mut self.score {
            score.0 *= rescale_factor;
        }
        self.vsids.rescale(rescale_factor);
    }

    /// Insert a variable into the heap if not already present.
    pub fn make_available(&mut self, var: Var) {
        if self.position[var.index()].is_none() {
            let position = self.heap.len();
            self.position[var.index()] = Some(position);
            self.heap.push(var);
            self.sift_up(position);
        }
    }

    /// Remove and return the variable with the highest score.
    pub fn pop(&mut self) -> Option<Var> {
        if self.heap.is_empty() {
            None
        } else {
            let var = self.heap.swap_remove(0);
            if !self.heap.is_empty() {
                let top_var = self.heap[0];
                self.position[top_var.index()] = Some(0);
                self.sift_down(0);
            }
            self.position[var.index()] = None;
            Some(var)
        }
    }

    /// Move a variable closer to the root until the heap property is satisfied.
    fn sift_up(&mut self, mut pos: usize) {
        let var = self.heap[pos];
        loop {
            if pos == 0 {
                return;
            }
            let parent_pos = (pos - 1) / 2;
            let parent_var = self.heap[parent_pos];
            if self.score[parent_var.index()] >= self.score[var.index()] {
                return;
            }
            self.position[var.index()] = Some(parent_pos);
            self.heap[parent_pos] = var;
            self.position[parent_var.index()] = Some(pos);
            self.heap[pos] = parent_var;
            pos = parent_pos;
        }
    }

    /// Move a variable away from the root until the heap property is satisfied.
    fn sift_down(&mut self, mut pos: usize) {
        let var = self.heap[pos];
        loop {
            let mut largest_pos = pos;
            let mut largest_var = var;

            let left_pos = pos * 2 + 1;
            if left_pos < self.heap.len() {
                let left_var = self.heap[left_pos];

                if self.score[largest_var.index()] < self.score[left_var.index()] {
                    largest_pos = left_pos;
                    largest_var = left_var;
                }
            }

            let right_pos = pos * 2 + 2;
            if right_pos < self.heap.len() {
                let right_var = self.heap[right_pos];

                if self.score[largest_var.index()] < self.score[right_var.index()] {
                    largest_pos = right_pos;
                    largest_var = right_var;
                }
            }

            if largest_pos == pos {
                return;
            }

            self.position[var.index()] = Some(largest_pos);
            self.heap[largest_pos] = var;
            self.position[largest_var.index()] = Some(pos);
            self.heap[pos] = largest_var;
            pos = largest_pos;
        }
    }

    #[cfg(test)]
    fn score_of(&self, var: Var) -> f64 {
        self.score[var.index()].0
    }
}

/// Make a decision and enqueue it.
///
/// Picks the unassigned variable with the highest score and assigns it to its saved phase, which
/// defaults to false for never-assigned variables. Eliminated variables are skipped.
///
/// Returns `false` if no decision was made because all variables are assigned.
pub fn make_decision(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut DecisionP,
        mut ImplGraphP,
        mut TrailP,
        VariablesP
    ),
) -> bool {
    let decision_var = loop {
        let var = match ctx.part_mut(DecisionP).pop() {
            Some(var) => var,
            None => return false,
        };

        if ctx.part(AssignmentP).var_value(var).is_none()
            && !ctx.part(VariablesP).is_eliminated(var)
        {
            break var;
        }
    };

    let decision = decision_var.lit(ctx.part(AssignmentP).last_var_value(decision_var));

    ctx.part_mut(TrailP).new_decision_level();

    enqueue_assignment(ctx.borrow(), decision, Reason::Unit);

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vsids_decision() -> Decision {
        let mut decision = Decision::default();
        decision.set_mode(BranchingMode::Vsids);
        decision
    }

    #[test]
    fn rescale_bump() {
        let mut decision = vsids_decision();
        decision.set_var_count(4);
        decision.set_decay(1.0 / 8.0);

        for _ in 0..4 {
            decision.pop();
        }

        for i in 0..4 {
            for _ in 0..i {
                decision.bump(Var::from_index(i));
            }
        }

        for _ in 0..41 {
            decision.decay();
        }

        for _ in 0..30 {
            decision.bump(Var::from_index(3));
        }

        // Decay is a power of two so these values are exact
        assert_eq!(decision.score_of(Var::from_index(0)), 0.0);
        assert_eq!(
            decision.score_of(Var::from_index(2)),
            decision.score_of(Var::from_index(1)) * 2.0
        );
        assert!(decision.score_of(Var::from_index(3)) > decision.score_of(Var::from_index(2)));
    }

    #[test]
    fn heap_sorts() {
        let mut decision = vsids_decision();
        decision.set_var_count(8);

        for _ in 0..8 {
            decision.pop();
        }

        for i in 0..8 {
            for _ in 0..i {
                decision.bump(Var::from_index(i));
            }
        }

        for i in 0..8 {
            decision.make_available(Var::from_index((i * 5) % 8));
        }

        for i in (0..8).rev() {
            assert_eq!(decision.pop(), Some(Var::from_index(i)));
        }
        assert_eq!(decision.pop(), None);
    }

    #[test]
    fn heap_bump() {
        let mut decision = vsids_decision();
        decision.set_var_count(8);
        decision.set_decay(1.0 / 8.0);

        for _ in 0..8 {
            decision.pop();
        }

        for i in 0..8 {
            for _ in 0..i {
                decision.bump(Var::from_index(i));
            }
        }

        for i in 0..8 {
            decision.make_available(Var::from_index((i * 5) % 8));
        }

        for i in (0..4).rev() {
            assert_eq!(decision.pop(), Some(Var::from_index(i + 4)));
        }

        decision.decay();
        decision.decay();

        for i in 0..8 {
            for _ in 0..(8 - i) {
                decision.bump(Var::from_index(i));
            }
        }

        for i in 0..4 {
            assert_eq!(decision.pop(), Some(Var::from_index(i)));
        }

        assert_eq!(decision.pop(), None);
    }

    #[test]
    fn lrb_rewards_participation() {
        let mut decision = Decision::default();
        decision.set_mode(BranchingMode::Lrb);
        decision.set_var_count(3);

        let busy = Var::from_index(0);
        let idle = Var::from_index(1);

        decision.on_assign(busy);
        decision.on_assign(idle);

        for _ in 0..10 {
            decision.bump(busy);
            decision.decay();
        }

        decision.on_unassign(busy);
        decision.on_unassign(idle);

        assert!(decision.score_of(busy) > decision.score_of(idle));

        // The busiest variable surfaces first.
        let mut popped = vec![];
        while let Some(var) = decision.pop() {
            popped.push(var);
        }
        assert_eq!(popped[0], busy);
    }
}
