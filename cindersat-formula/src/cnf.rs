//! CNF formulas.
use std::cmp::max;
use std::fmt;
use std::iter::Extend;

use crate::lit::Lit;

/// Bitset over `var % 32` of a set of literals.
///
/// This is the signature abstraction used by the solver to prefilter subsumption checks: a
/// clause `a` can only subsume a clause `b` when `clause_signature(a) & !clause_signature(b)`
/// is zero. The signature is order independent, so permuting a clause's literals keeps it valid,
/// but it becomes stale when literals are added or removed and has to be recomputed then.
pub fn clause_signature(lits: &[Lit]) -> u32 {
    lits.iter()
        .fold(0, |signature, lit| signature | 1 << (lit.var().index() % 32))
}

/// A formula in conjunctive normal form (CNF).
///
/// All clauses share a single flat literal buffer, partitioned by a cumulative boundary table
/// with one entry per clause end. This keeps a formula of any size at two allocations and makes
/// clause scans cache friendly. The boundary table always starts at zero, so structurally equal
/// formulas are representationally equal and equality can be derived.
#[derive(PartialEq, Eq)]
pub struct CnfFormula {
    var_count: usize,
    literals: Vec<Lit>,
    boundaries: Vec<usize>,
}

impl Default for CnfFormula {
    fn default() -> CnfFormula {
        CnfFormula {
            var_count: 0,
            literals: vec![],
            boundaries: vec![0],
        }
    }
}

impl CnfFormula {
    /// Create an empty CNF formula.
    pub fn new() -> CnfFormula {
        CnfFormula::default()
    }

    /// Number of variables in the formula.
    ///
    /// This also counts missing variables if a variable with a higher index is present.
    /// A vector of this length can be indexed with the variable indices present.
    pub fn var_count(&self) -> usize {
        self.var_count
    }

    /// Increase the number of variables in the formula.
    ///
    /// If the parameter is less than the current variable count do nothing.
    pub fn set_var_count(&mut self, count: usize) {
        self.var_count = max(self.var_count, count)
    }

    /// Number of clauses in the formula.
    pub fn len(&self) -> usize {
        self.boundaries.len() - 1
    }

    /// Whether the formula contains no clauses.
    pub fn is_empty(&self) -> bool {
        self.boundaries.len() == 1
    }

    /// Total number of literals over all clauses.
    pub fn literal_count(&self) -> usize {
        self.literals.len()
    }

    /// Appends a clause to the formula.
    ///
    /// `literals` can be an `IntoIterator<Item = Lit>` or `IntoIterator<Item = &Lit>`.
    pub fn add_clause<L>(&mut self, literals: impl IntoIterator<Item = L>)
    where
        Vec<Lit>: Extend<L>,
    {
        let begin = self.literals.len();
        self.literals.extend(literals);

        for &lit in self.literals[begin..].iter() {
            self.var_count = max(lit.index() + 1, self.var_count);
        }

        self.boundaries.push(self.literals.len());
    }

    /// The clause at the given index.
    pub fn clause(&self, index: usize) -> &[Lit] {
        &self.literals[self.boundaries[index]..self.boundaries[index + 1]]
    }

    /// The signature abstraction of the clause at the given index.
    pub fn signature(&self, index: usize) -> u32 {
        clause_signature(self.clause(index))
    }

    /// Iterator over all clauses.
    pub fn iter(&self) -> impl Iterator<Item = &[Lit]> {
        let literals = &self.literals;
        self.boundaries
            .windows(2)
            .map(move |bounds| &literals[bounds[0]..bounds[1]])
    }
}

/// Convert any iterable of [`Lit`] iterables into a CnfFormula
impl<F, I, L> From<F> for CnfFormula
where
    F: IntoIterator<Item = I>,
    I: IntoIterator<Item = L>,
    Vec<Lit>: Extend<L>,
{
    fn from(formula: F) -> CnfFormula {
        formula
            .into_iter()
            .fold(CnfFormula::new(), |mut cnf_formula, clause| {
                cnf_formula.add_clause(clause);
                cnf_formula
            })
    }
}

impl fmt::Debug for CnfFormula {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{} vars] ", self.var_count())?;
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(any(test, feature = "proptest-strategies", feature = "internal-testing"))]
#[doc(hidden)]
pub mod strategy {
    use super::*;

    use proptest::{collection::SizeRange, prelude::*, *};

    use crate::lit::strategy::lit;

    pub fn vec_formula(
        vars: impl Strategy<Value = usize>,
        clauses: impl Into<SizeRange>,
        clause_len: impl Into<SizeRange>,
    ) -> impl Strategy<Value = Vec<Vec<Lit>>> {
        let clauses = clauses.into();
        let clause_len = clause_len.into();

        // Not using ind_flat_map makes shrinking too expensive
        vars.prop_ind_flat_map(move |vars| {
            collection::vec(
                collection::vec(lit(0..vars), clause_len.clone()),
                clauses.clone(),
            )
        })
    }

    pub fn cnf_formula(
        vars: impl Strategy<Value = usize>,
        clauses: impl Into<SizeRange>,
        clause_len: impl Into<SizeRange>,
    ) -> impl Strategy<Value = CnfFormula> {
        let clauses = clauses.into();
        let clause_len = clause_len.into();

        vars.prop_ind_flat_map2(move |vars| {
            vec_formula(Just(vars), clauses.clone(), clause_len.clone())
        })
        .prop_map(|(vars, clauses)| {
            let mut formula = CnfFormula::from(clauses);
            formula.set_var_count(vars);
            formula
        })
        .no_shrink() // Shrinking too expensive without this
    }
}
