//! Checks emitted DRAT proofs by forward RUP verification.
use proptest::prelude::*;

use cindersat::{CnfFormula, Lit, ProofFormat, Solver, Var};

use cindersat_formula::{cnf_formula, lits, test::sgen_unsat_formula};

/// A DRAT proof record.
#[derive(Debug)]
enum Record {
    Add(Vec<Lit>),
    Delete(Vec<Lit>),
}

/// Parse a textual DRAT proof.
fn parse_drat(proof: &[u8]) -> Vec<Record> {
    let text = std::str::from_utf8(proof).expect("proof is not utf-8");
    let mut records = vec![];

    for line in text.lines() {
        let mut tokens = line.split_whitespace().peekable();
        if tokens.peek().is_none() {
            continue;
        }
        let delete = tokens.peek() == Some(&"d");
        if delete {
            tokens.next();
        }

        let mut lits = vec![];
        for token in tokens {
            let number: isize = token.parse().expect("invalid literal in proof");
            if number == 0 {
                break;
            }
            lits.push(Lit::from_dimacs(number));
        }

        if delete {
            records.push(Record::Delete(lits));
        } else {
            records.push(Record::Add(lits));
        }
    }

    records
}

fn sorted(mut lits: Vec<Lit>) -> Vec<Lit> {
    lits.sort_unstable();
    lits.dedup();
    lits
}

/// Whether a clause is an asymmetric tautology of the given clause set.
///
/// Assumes the negation of the clause and propagates units until a conflict or a fixpoint.
fn is_rup(clauses: &[Vec<Lit>], lits: &[Lit]) -> bool {
    let mut assignment: Vec<Lit> = lits.iter().map(|&lit| !lit).collect();

    loop {
        let mut progress = false;

        'clauses: for clause in clauses {
            let mut unassigned = None;
            for &lit in clause {
                if assignment.contains(&lit) {
                    continue 'clauses;
                }
                if !assignment.contains(&!lit) {
                    if unassigned.is_some() {
                        continue 'clauses;
                    }
                    unassigned = Some(lit);
                }
            }
            match unassigned {
                None => return true,
                Some(lit) => {
                    assignment.push(lit);
                    progress = true;
                }
            }
        }

        if !progress {
            return false;
        }
    }
}

/// Verify a DRAT refutation of the given formula.
///
/// Every addition must be RUP valid against the current clause set and the proof has to derive
/// the empty clause. The solver never emits additions that are RAT but not RUP, so plain RUP
/// checking is complete here.
fn verify_refutation(formula: &CnfFormula, proof: &[u8]) {
    let mut clauses: Vec<Vec<Lit>> = formula.iter().map(|c| sorted(c.to_vec())).collect();

    for record in parse_drat(proof) {
        match record {
            Record::Add(lits) => {
                assert!(
                    is_rup(&clauses, &lits),
                    "addition {:?} is not RUP valid",
                    lits
                );
                if lits.is_empty() {
                    return;
                }
                clauses.push(sorted(lits));
            }
            Record::Delete(lits) => {
                let lits = sorted(lits);
                if let Some(position) = clauses.iter().position(|clause| *clause == lits) {
                    clauses.swap_remove(position);
                }
            }
        }
    }

    panic!("proof does not derive the empty clause");
}

fn solve_with_proof(formula: &CnfFormula) -> (bool, Vec<u8>) {
    let mut proof = vec![];
    let mut solver = Solver::new();

    solver.write_proof(&mut proof, ProofFormat::Drat);
    solver.add_formula(formula);
    let result = solver.solve().expect("solve failed");
    solver.close_proof().expect("proof output failed");
    drop(solver);

    (result, proof)
}

#[test]
fn two_variable_unsat_proof() {
    let formula = cnf_formula![
        1, 2;
        1, -2;
        -1, 2;
        -1, -2;
    ];

    let (result, proof) = solve_with_proof(&formula);

    assert!(!result);
    verify_refutation(&formula, &proof);
}

#[test]
fn empty_clause_input_gives_trivial_proof() {
    let mut proof = vec![];
    let mut solver = Solver::new();

    solver.write_proof(&mut proof, ProofFormat::Drat);
    solver.add_clause(&lits![1, 2]);
    solver.add_clause(&[]);
    assert_eq!(solver.solve().ok(), Some(false));
    solver.close_proof().unwrap();
    drop(solver);

    assert_eq!(&proof[..], b"0\n");
}

#[test]
fn pigeon_hole_proof() {
    let mut formula = CnfFormula::new();
    let holes = 3;
    let var = |pigeon: usize, hole: usize| Var::from_index(pigeon * holes + hole);

    for pigeon in 0..holes + 1 {
        formula.add_clause((0..holes).map(|hole| var(pigeon, hole).positive()));
    }
    for hole in 0..holes {
        for pigeon_a in 0..holes + 1 {
            for pigeon_b in 0..pigeon_a {
                formula.add_clause(
                    [
                        var(pigeon_a, hole).negative(),
                        var(pigeon_b, hole).negative(),
                    ]
                    .iter()
                    .cloned(),
                );
            }
        }
    }

    let (result, proof) = solve_with_proof(&formula);

    assert!(!result);
    verify_refutation(&formula, &proof);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn sgen_unsat_proofs_verify(formula in sgen_unsat_formula(1..4usize)) {
        let (result, proof) = solve_with_proof(&formula);

        prop_assert!(!result);
        verify_refutation(&formula, &proof);
    }

    #[test]
    fn proofs_with_inprocessing_verify(formula in sgen_unsat_formula(2..4usize)) {
        let mut proof = vec![];
        let mut solver = Solver::new();

        let mut config = cindersat::config::SolverConfigUpdate::new();
        config.inprocess_interval = Some(20);
        config.reduce_interval_first = Some(20);
        solver.config(&config);

        solver.write_proof(&mut proof, ProofFormat::Drat);
        solver.add_formula(&formula);
        prop_assert_eq!(solver.solve().ok(), Some(false));
        solver.close_proof().unwrap();
        drop(solver);

        verify_refutation(&formula, &proof);
    }
}
