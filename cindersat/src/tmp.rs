//! Temporary data.
use cindersat_formula::{lit::LitIdx, Lit};

/// Temporary data used by various parts of the solver.
///
/// Make sure to check any documented invariants when using this. Also make sure to check all
/// existing users when adding invariants.
#[derive(Default)]
pub struct TmpData {
    pub lits: Vec<Lit>,
    pub lits_2: Vec<Lit>,
    /// A boolean for each literal.
    ///
    /// Reset to all-false, keep size.
    pub flags: Vec<bool>,
    /// A stamp with an entry for each decision level.
    pub level_stamp: Stamp,
}

impl TmpData {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.flags.resize(count * 2, false);
        self.level_stamp.set_len(count + 1);
    }
}

/// Generation counting stamp over a dense index range.
///
/// Clearing all stamps is a constant time operation, entries are cleared lazily by advancing the
/// generation counter.
#[derive(Default)]
pub struct Stamp {
    stamped: Vec<LitIdx>,
    generation: LitIdx,
}

impl Stamp {
    /// Resize to support indices below the given length.
    pub fn set_len(&mut self, len: usize) {
        self.stamped.resize(len, 0);
    }

    /// Unstamp all indices.
    pub fn clear(&mut self) {
        if self.generation == LitIdx::max_value() {
            for entry in self.stamped.iter_mut() {
                *entry = 0;
            }
            self.generation = 0;
        }
        self.generation += 1;
    }

    /// Stamp an index.
    pub fn stamp(&mut self, index: usize) {
        self.stamped[index] = self.generation;
    }

    /// Whether an index was stamped since the last clear.
    pub fn is_stamped(&self, index: usize) -> bool {
        self.stamped[index] == self.generation
    }
}
