//! DRAT proof generation.
//!
//! The proof is a write-only sequence of clause addition and deletion records. Every learned
//! clause is logged as added before it is used as a reason and every removed clause is logged as
//! deleted after its removal, so replaying the records alongside the input formula reproduces the
//! solver's clause database at any point. On unsatisfiability the proof ends with the addition of
//! the empty clause.
use std::io::{sink, BufWriter, Write};

use partial_ref::{partial, PartialRef};

use cindersat_formula::Lit;

use crate::context::{Context, ProofP, SolverStateP};

/// Proof formats that can be generated during solving.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ProofFormat {
    Drat,
    BinaryDrat,
}

/// DRAT proof generation.
pub struct Proof<'a> {
    format: Option<ProofFormat>,
    target: BufWriter<Box<dyn Write + 'a>>,
    io_error: Option<std::io::Error>,
}

impl<'a> Default for Proof<'a> {
    fn default() -> Proof<'a> {
        Proof {
            format: None,
            target: BufWriter::new(Box::new(sink())),
            io_error: None,
        }
    }
}

impl<'a> Proof<'a> {
    /// Start writing proof records to the given target with the given format.
    pub fn write_proof(&mut self, target: impl Write + 'a, format: ProofFormat) {
        self.format = Some(format);
        self.target = BufWriter::new(Box::new(target));
    }

    /// Stop writing proof records and flush the target.
    pub fn close_proof(&mut self) {
        let result = self.target.flush();
        self.handle_io_result(result);
        self.format = None;
        self.target = BufWriter::new(Box::new(sink()));
    }

    /// Whether proof generation is active.
    pub fn is_active(&self) -> bool {
        self.format.is_some()
    }

    /// Take a pending IO error of the proof target.
    pub fn take_io_error(&mut self) -> Option<std::io::Error> {
        self.io_error.take()
    }

    /// Whether an IO error is pending.
    pub fn io_error_pending(&self) -> bool {
        self.io_error.is_some()
    }

    fn record_clause(&mut self, prefix: Option<&'static [u8]>, lits: &[Lit]) {
        match self.format {
            None => return,
            Some(ProofFormat::Drat) => {
                if let Some(prefix) = prefix {
                    let result = self.target.write_all(prefix).and_then(|()| {
                        self.target.write_all(b" ")
                    });
                    self.handle_io_result(result);
                }
                for &lit in lits {
                    let result = itoa::write(&mut self.target, lit.to_dimacs())
                        .and_then(|_| self.target.write_all(b" "));
                    self.handle_io_result(result);
                }
                let result = self.target.write_all(b"0\n");
                self.handle_io_result(result);
            }
            Some(ProofFormat::BinaryDrat) => {
                let result = self.target.write_all(prefix.unwrap_or(b"a"));
                self.handle_io_result(result);
                for &lit in lits {
                    let drat_code = lit.code() as u64 + 2;
                    let result =
                        leb128::write::unsigned(&mut self.target, drat_code).map(|_| ());
                    self.handle_io_result(result);
                }
                let result = self.target.write_all(&[0]);
                self.handle_io_result(result);
            }
        }
    }

    /// Record the addition of a clause.
    pub fn record_added_clause(&mut self, lits: &[Lit]) {
        if self.io_error.is_some() {
            return;
        }
        self.record_clause(None, lits);
    }

    /// Record the deletion of a clause.
    pub fn record_deleted_clause(&mut self, lits: &[Lit]) {
        if self.io_error.is_some() {
            return;
        }
        self.record_clause(Some(b"d"), lits);
    }

    fn handle_io_result<V>(&mut self, result: std::io::Result<V>) {
        if let Err(error) = result {
            if self.io_error.is_none() {
                self.io_error = Some(error);
            }
        }
    }
}

/// Log the addition of a clause to an active proof.
pub fn add_clause<'a>(mut ctx: partial!(Context<'a>, mut ProofP<'a>), lits: &[Lit]) {
    ctx.part_mut(ProofP).record_added_clause(lits);
}

/// Log the deletion of a clause to an active proof.
pub fn delete_clause<'a>(mut ctx: partial!(Context<'a>, mut ProofP<'a>), lits: &[Lit]) {
    ctx.part_mut(ProofP).record_deleted_clause(lits);
}

/// Log the derivation of the empty clause, completing a refutation.
pub fn add_empty_clause<'a>(mut ctx: partial!(Context<'a>, mut ProofP<'a>)) {
    ctx.part_mut(ProofP).record_added_clause(&[]);
}

/// Check for pending proof IO errors and stop the search if one occurred.
pub fn check_io<'a>(
    mut ctx: partial!(Context<'a>, mut ProofP<'a>, mut SolverStateP),
) {
    if ctx.part(ProofP).io_error_pending() {
        ctx.part_mut(SolverStateP).stopped = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use cindersat_formula::lits;

    #[test]
    fn text_records() {
        let mut buffer = vec![];
        {
            let mut proof = Proof::default();
            proof.write_proof(&mut buffer, ProofFormat::Drat);
            proof.record_added_clause(&lits![1, -2, 3]);
            proof.record_deleted_clause(&lits![-4, 5]);
            proof.record_added_clause(&[]);
            proof.close_proof();
        }

        assert_eq!(&buffer[..], b"1 -2 3 0\nd -4 5 0\n0\n" as &[u8]);
    }

    #[test]
    fn binary_records() {
        let mut buffer = vec![];
        {
            let mut proof = Proof::default();
            proof.write_proof(&mut buffer, ProofFormat::BinaryDrat);
            proof.record_added_clause(&lits![1, -2]);
            proof.record_deleted_clause(&lits![1, -2]);
            proof.close_proof();
        }

        // Codes are 2 * var + sign + 2: lit 1 -> 2, lit -2 -> 5.
        assert_eq!(&buffer[..], b"a\x02\x05\x00d\x02\x05\x00" as &[u8]);
    }

    #[test]
    fn inactive_proof_writes_nothing() {
        let mut proof = Proof::default();
        proof.record_added_clause(&lits![1, 2]);
        assert!(!proof.is_active());
        assert!(!proof.io_error_pending());
    }
}
