//! Shared proptest strategies for solver tests.
use proptest::{prelude::*, *};

use rand::distributions::Bernoulli;
use rand::seq::SliceRandom;

use crate::cnf::CnfFormula;
use crate::lit::{Lit, Var};

/// Generate small hard unsat instances.
///
/// Implementation of http://www.cs.qub.ac.uk/~i.spence/sgen/ but with random partitions
pub fn sgen_unsat_formula(
    blocks: impl Strategy<Value = usize>,
) -> impl Strategy<Value = CnfFormula> {
    blocks.prop_flat_map(|blocks| {
        collection::vec(bool::ANY, blocks * 4 + 1).prop_perturb(|negate, mut rng| {
            let mut clauses: Vec<Vec<Lit>> = vec![];
            let mut lits = negate
                .into_iter()
                .enumerate()
                .map(|(index, negate)| Lit::from_var(Var::from_index(index), negate))
                .collect::<Vec<_>>();

            for &invert in [false, true].iter() {
                lits.shuffle(&mut rng);
                for block in lits.chunks_exact(4) {
                    for a in 0..4 {
                        for b in 0..a {
                            for c in 0..b {
                                let mut clause =
                                    vec![block[a] ^ invert, block[b] ^ invert, block[c] ^ invert];
                                clause.shuffle(&mut rng);
                                clauses.push(clause);
                            }
                        }
                    }
                }
                let &lit_a = lits.last().unwrap();
                for b in 0..4 {
                    for c in 0..b {
                        let mut clause = vec![lit_a ^ invert, lits[b] ^ invert, lits[c] ^ invert];
                        clause.shuffle(&mut rng);
                        clauses.push(clause);
                    }
                }
            }

            clauses.shuffle(&mut rng);
            CnfFormula::from(clauses)
        })
    })
}

/// Generate a sat instance.
///
/// This generates a random full assignment and then only generates clauses compatible with that
/// assignment.
pub fn sat_formula(
    vars: impl Strategy<Value = usize>,
    clause_count: impl Strategy<Value = usize>,
    density: impl Strategy<Value = f64>,
    polarity_dist: impl Strategy<Value = f64>,
) -> impl Strategy<Value = CnfFormula> {
    (vars, clause_count, density, polarity_dist).prop_flat_map(
        |(vars, clause_count, density, polarity_dist)| {
            let density = Bernoulli::new(density).unwrap();
            let polarity_dist = Bernoulli::new(polarity_dist).unwrap();

            collection::vec(bool::ANY, vars).prop_perturb(move |negate, mut rng| {
                let mut clauses: Vec<Vec<Lit>> = vec![];
                let lits = negate
                    .into_iter()
                    .enumerate()
                    .map(|(index, negate)| Lit::from_var(Var::from_index(index), negate))
                    .collect::<Vec<_>>();

                for _ in 0..clause_count {
                    let &fixed_lit = lits.choose(&mut rng).unwrap();
                    let mut clause = vec![fixed_lit];
                    for &lit in lits.iter() {
                        if lit != fixed_lit && rng.sample(density) {
                            clause.push(lit ^ rng.sample(polarity_dist));
                        }
                    }
                    clause.shuffle(&mut rng);
                    clauses.push(clause);
                }

                clauses.shuffle(&mut rng);
                CnfFormula::from(clauses)
            })
        },
    )
}

/// Generate a pigeon hole formula guarded by per-row enable literals.
///
/// Returns the enable literals, the number of holes and the formula. The formula is satisfiable
/// unless all enable literals are assumed or forced.
pub fn conditional_pigeon_hole(
    columns: impl Strategy<Value = usize>,
    extra_rows: impl Strategy<Value = usize>,
) -> impl Strategy<Value = (Vec<Lit>, usize, CnfFormula)> {
    (columns, extra_rows).prop_map(|(columns, extra_rows)| {
        let rows = columns + extra_rows;
        let mut formula = CnfFormula::new();

        // One enable variable per row, then one variable per row and hole.
        let enable_row: Vec<_> = (0..rows)
            .map(|row| Var::from_index(row).positive())
            .collect();

        let hole_var = |row: usize, column: usize| Var::from_index(rows + row * columns + column);

        for row in 0..rows {
            let mut clause = vec![!enable_row[row]];
            clause.extend((0..columns).map(|column| hole_var(row, column).positive()));
            formula.add_clause(clause);
        }

        for column in 0..columns {
            for row_a in 0..rows {
                for row_b in 0..row_a {
                    formula.add_clause(
                        [
                            hole_var(row_a, column).negative(),
                            hole_var(row_b, column).negative(),
                        ]
                        .iter()
                        .cloned(),
                    );
                }
            }
        }

        (enable_row, columns, formula)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn sat_formula_has_model(formula in sat_formula(2..10usize, 1..40usize, 0.1..0.6, 0.5..1.0)) {
            // Every generated clause contains at least the planted literal.
            for clause in formula.iter() {
                prop_assert!(!clause.is_empty());
            }
        }

        #[test]
        fn pigeon_hole_shape((enable_row, columns, formula) in conditional_pigeon_hole(1..4usize, 0..3usize)) {
            let rows = enable_row.len();
            prop_assert!(rows >= columns);
            prop_assert_eq!(formula.len(), rows + columns * (rows * (rows - 1)) / 2);
        }
    }
}
