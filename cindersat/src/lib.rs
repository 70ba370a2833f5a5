//! Cindersat is a CDCL based SAT solver written in rust.
pub mod config;
pub mod proof;
pub mod shared;
pub mod solver;

mod analyze;
mod callbacks;
mod cdcl;
mod clause;
mod context;
mod decision;
mod glue;
mod incremental;
mod inprocess;
mod load;
mod model;
mod prop;
mod schedule;
mod simplify;
mod state;
mod tmp;
mod variables;

pub use cindersat_dimacs as dimacs;
pub use cindersat_formula::{CnfFormula, Lit, Var};

pub use proof::ProofFormat;
pub use solver::{Solver, SolverError};
