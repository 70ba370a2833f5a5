//! Model extraction and reconstruction of eliminated variables.
use partial_ref::{partial, PartialRef};

use cindersat_formula::{Lit, Var};

use crate::context::{AssignmentP, Context, ElimP, VariablesP};

/// Extract a full model from a satisfying assignment.
///
/// Values of eliminated variables are reconstructed by scanning the elimination log in reverse:
/// an eliminated variable is set so that all its logged clauses are satisfied, which is always
/// possible as their resolvents are satisfied by the assignment. Unconstrained variables default
/// to false.
///
/// May only be called when the solver state is Sat.
pub fn reconstruct_model(
    ctx: partial!(Context, AssignmentP, ElimP, VariablesP),
) -> Vec<Lit> {
    let assignment = ctx.part(AssignmentP);
    let variables = ctx.part(VariablesP);

    let mut values: Vec<bool> = (0..variables.watermark())
        .map(|index| {
            assignment
                .var_value(Var::from_index(index))
                .unwrap_or(false)
        })
        .collect();

    let lit_value = |values: &[bool], lit: Lit| values[lit.index()] ^ lit.is_negative();

    for entry in ctx.part(ElimP).elim_log().iter().rev() {
        if !lit_value(&values, entry.var_lit) && !entry.rest.iter().any(|&l| lit_value(&values, l))
        {
            let var = entry.var_lit.var();
            values[var.index()] = entry.var_lit.is_positive();
        }
    }

    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| Var::from_index(index).lit(value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    use cindersat_formula::lits;

    use crate::context::set_var_count;

    #[test]
    fn eliminated_variables_are_reconstructed() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        set_var_count(ctx.borrow(), 3);

        // Simulate the elimination of var 1 from the clauses (1 v 2) and (-1 v 3) with an
        // assignment that leaves both resolvent-satisfying choices to the log scan.
        ctx.part_mut(ElimP).log_clause(lits![1][0], lits![2].to_vec());
        ctx.part_mut(ElimP).log_clause(lits![-1][0], lits![3].to_vec());

        ctx.part_mut(AssignmentP).assign_lit(lits![-2][0]);
        ctx.part_mut(AssignmentP).assign_lit(lits![3][0]);

        let model = reconstruct_model(ctx.borrow());

        // With 2 false, the clause (1 v 2) forces 1 true; (-1 v 3) is satisfied by 3.
        assert!(model.contains(&lits![1][0]));
        assert!(model.contains(&lits![-2][0]));
        assert!(model.contains(&lits![3][0]));
    }
}
