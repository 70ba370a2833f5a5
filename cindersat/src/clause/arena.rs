//! Page based clause arena.
use std::mem::transmute;
use std::slice;

use rustc_hash::FxHashMap;

use cindersat_formula::{lit::LitIdx, Lit};

use super::header::HEADER_LEN;
use super::{clause_signature, Clause, ClauseHeader};

/// Number of bits of a [`ClauseRef`] used for the offset within a page.
const OFFSET_BITS: u32 = 23;
const OFFSET_MASK: u32 = (1 << OFFSET_BITS) - 1;

/// Number of [`LitIdx`] words per page. This is 32 MiB per page.
const DEFAULT_PAGE_WORDS: usize = 1 << OFFSET_BITS;

/// Maximal number of pages addressable by a [`ClauseRef`].
const MAX_PAGES: usize = 1 << (32 - OFFSET_BITS);

/// Compact reference to a clause.
///
/// Encodes a page index and the offset of the clause within that page in a single 32-bit word.
/// Together with the page size this supports up to 16GB of clause storage.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct ClauseRef {
    id: u32,
}

impl ClauseRef {
    fn new(page: usize, offset: usize) -> ClauseRef {
        debug_assert!(page < MAX_PAGES);
        debug_assert!(offset <= OFFSET_MASK as usize);
        ClauseRef {
            id: ((page as u32) << OFFSET_BITS) | offset as u32,
        }
    }

    fn page(self) -> usize {
        (self.id >> OFFSET_BITS) as usize
    }

    fn offset(self) -> usize {
        (self.id & OFFSET_MASK) as usize
    }
}

/// A fixed-size slab of clause storage.
struct ClausePage {
    words: Vec<LitIdx>,
    size: usize,
}

impl ClausePage {
    fn new(size: usize) -> ClausePage {
        ClausePage {
            words: Vec::with_capacity(size),
            size,
        }
    }

    fn has_space(&self, words: usize) -> bool {
        self.words.len() + words <= self.size
    }
}

/// Bump allocator for clause storage.
///
/// Clauses are allocated from a sequence of fixed-size pages. Within a page allocation only bumps
/// a cursor, clauses are stored contiguously and iterated in allocation order. Clauses cannot be
/// freed individually, deletion only marks the clause's header. To reclaim the space of deleted
/// clauses, [`reorganise`](ClauseArena::reorganise) copies the remaining clauses into a fresh page
/// set and returns a relocation map. The old pages are freed once every holder of a [`ClauseRef`]
/// has consumed the relocation map and the old arena is dropped.
///
/// **Safety**: Using the safe methods is always memory safe, even if invariants of the clause
/// storage are violated. An example invariant is using only ClauseRef's produced by the same
/// arena. Some places in this codebase expect users of the safe methods to not violate these
/// invariants. It is important that this does not leak through the public API, i.e. crate external
/// code using safe methods must be unable to violate invariants expected for internal unsafe code.
pub struct ClauseArena {
    pages: Vec<ClausePage>,
    page_words: usize,
    stored_words: usize,
}

impl Default for ClauseArena {
    fn default() -> ClauseArena {
        ClauseArena::new()
    }
}

impl ClauseArena {
    /// Create an empty clause arena with the default page size.
    pub fn new() -> ClauseArena {
        ClauseArena::with_page_words(DEFAULT_PAGE_WORDS)
    }

    /// Create an empty clause arena with a custom page size in [`LitIdx`] words.
    ///
    /// Mostly useful to exercise the page handling in tests.
    pub fn with_page_words(page_words: usize) -> ClauseArena {
        assert!(page_words > 0 && page_words <= 1 << OFFSET_BITS);
        ClauseArena {
            pages: vec![],
            page_words,
            stored_words: 0,
        }
    }

    /// Allocate space for and add a new clause.
    ///
    /// Clauses have a minimal size of 2, unit clauses are represented by the trail instead. The
    /// length and signature of the header are set to match the given literals. The returned
    /// [`ClauseRef`] can be used to access the new clause.
    pub fn add_clause(&mut self, mut header: ClauseHeader, lits: &[Lit]) -> ClauseRef {
        assert!(
            lits.len() >= 2,
            "ClauseArena can only store binary and larger clauses"
        );

        let words = HEADER_LEN + lits.len();
        assert!(
            words <= self.page_words,
            "clause does not fit into a single arena page"
        );

        header.set_len(lits.len());
        header.set_signature(clause_signature(lits));

        if self.pages.last().map_or(true, |page| !page.has_space(words)) {
            assert!(
                self.pages.len() < MAX_PAGES,
                "clause arena address space exhausted"
            );
            self.pages.push(ClausePage::new(self.page_words));
        }

        let page_index = self.pages.len() - 1;
        let page = self.pages.last_mut().unwrap();
        let offset = page.words.len();

        page.words.extend_from_slice(&header.data);

        let lit_idx_slice = unsafe {
            // This is safe as Lit and LitIdx have the same representation
            slice::from_raw_parts(lits.as_ptr() as *const LitIdx, lits.len())
        };
        page.words.extend_from_slice(lit_idx_slice);

        self.stored_words += words;

        ClauseRef::new(page_index, offset)
    }

    fn page_words_of(&self, cref: ClauseRef) -> &[LitIdx] {
        let page = &self.pages[cref.page()];
        &page.words
    }

    /// Access the header of a clause.
    pub fn header(&self, cref: ClauseRef) -> &ClauseHeader {
        let words = self.page_words_of(cref);
        let offset = cref.offset();
        assert!(offset + HEADER_LEN <= words.len(), "ClauseRef out of bounds");
        unsafe {
            let header_ptr = words.as_ptr().add(offset) as *const ClauseHeader;
            &*header_ptr
        }
    }

    /// Mutate the header of a clause.
    pub fn header_mut(&mut self, cref: ClauseRef) -> &mut ClauseHeader {
        let offset = cref.offset();
        let words = &mut self.pages[cref.page()].words;
        assert!(offset + HEADER_LEN <= words.len(), "ClauseRef out of bounds");
        unsafe {
            let header_ptr = words.as_mut_ptr().add(offset) as *mut ClauseHeader;
            &mut *header_ptr
        }
    }

    /// Access a clause.
    pub fn clause(&self, cref: ClauseRef) -> &Clause {
        let len = self.header(cref).len();
        let words = self.page_words_of(cref);
        let offset = cref.offset();
        let end = offset + HEADER_LEN + len;
        assert!(end <= words.len(), "ClauseRef out of bounds");
        unsafe {
            transmute::<&[LitIdx], &Clause>(slice::from_raw_parts(
                words.as_ptr().add(offset),
                HEADER_LEN + len,
            ))
        }
    }

    /// Mutate a clause.
    pub fn clause_mut(&mut self, cref: ClauseRef) -> &mut Clause {
        let len = self.header(cref).len();
        let offset = cref.offset();
        let words = &mut self.pages[cref.page()].words;
        let end = offset + HEADER_LEN + len;
        assert!(end <= words.len(), "ClauseRef out of bounds");
        unsafe {
            transmute::<&mut [LitIdx], &mut Clause>(slice::from_raw_parts_mut(
                words.as_mut_ptr().add(offset),
                HEADER_LEN + len,
            ))
        }
    }

    /// Total words stored, including the space of deleted clauses.
    pub fn stored_words(&self) -> usize {
        self.stored_words
    }

    /// Number of allocated pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Copy the given clauses into a fresh page set.
    ///
    /// Clauses marked as deleted are dropped even when listed as live. Returns the new arena and
    /// the relocation map from old to new references. The old arena has to be kept around until
    /// every holder of a [`ClauseRef`] into it has consumed the relocation map.
    pub fn reorganise(&self, live: impl IntoIterator<Item = ClauseRef>) -> (ClauseArena, Relocation) {
        let mut fresh = ClauseArena::with_page_words(self.page_words);
        let mut map = FxHashMap::default();

        for cref in live {
            let clause = self.clause(cref);
            if clause.header().deleted() {
                continue;
            }
            let new_cref = fresh.add_clause(clause.header().clone(), clause.lits());
            map.insert(cref, new_cref);
        }

        (fresh, Relocation { map })
    }
}

/// Map from old to new clause references produced by [`ClauseArena::reorganise`].
pub struct Relocation {
    map: FxHashMap<ClauseRef, ClauseRef>,
}

impl Relocation {
    /// The new reference of a live clause, `None` if the clause did not survive.
    pub fn get(&self, cref: ClauseRef) -> Option<ClauseRef> {
        self.map.get(&cref).cloned()
    }

    /// Number of relocated clauses.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether no clause was relocated.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::*;

    use cindersat_formula::{cnf::strategy::*, CnfFormula};

    proptest! {
        #[test]
        fn roundtrip_from_cnf_formula(input in cnf_formula(1..100usize, 0..1000, 2..30)) {
            let mut arena = ClauseArena::new();
            let mut clause_refs = vec![];

            for clause_lits in input.iter() {
                let header = ClauseHeader::new();
                clause_refs.push(arena.add_clause(header, clause_lits));
            }

            let mut recovered = CnfFormula::new();

            for cref in clause_refs {
                let clause = arena.clause(cref);
                prop_assert_eq!(clause.header().len(), clause.lits().len());
                prop_assert_eq!(
                    clause.header().signature(),
                    clause_signature(clause.lits())
                );
                recovered.add_clause(clause.lits());
            }

            // Ignore difference caused by unused vars
            recovered.set_var_count(input.var_count());

            prop_assert_eq!(input, recovered);
        }

        #[test]
        fn page_spanning_allocation(input in cnf_formula(1..20usize, 100..300, 2..10)) {
            // Pages sized so that only a handful of clauses fit each.
            let mut arena = ClauseArena::with_page_words(64);
            let mut clause_refs = vec![];

            for clause_lits in input.iter() {
                clause_refs.push(arena.add_clause(ClauseHeader::new(), clause_lits));
            }

            prop_assert!(arena.page_count() > 1);

            for (cref, lits) in clause_refs.iter().zip(input.iter()) {
                prop_assert_eq!(arena.clause(*cref).lits(), lits);
            }
        }

        #[test]
        fn reorganise_relocates_live_clauses(input in cnf_formula(1..50usize, 10..100, 2..10)) {
            let mut arena = ClauseArena::with_page_words(128);
            let mut clause_refs = vec![];

            for clause_lits in input.iter() {
                clause_refs.push(arena.add_clause(ClauseHeader::new(), clause_lits));
            }

            // Delete every other clause.
            for chunk in clause_refs.chunks(2) {
                arena.header_mut(chunk[0]).set_deleted(true);
            }

            let (fresh, relocation) = arena.reorganise(clause_refs.iter().cloned());

            for (index, (&cref, lits)) in clause_refs.iter().zip(input.iter()).enumerate() {
                match relocation.get(cref) {
                    Some(new_cref) => {
                        prop_assert!(index % 2 == 1);
                        prop_assert_eq!(fresh.clause(new_cref).lits(), lits);
                    }
                    None => prop_assert!(index % 2 == 0),
                }
            }

            prop_assert!(fresh.stored_words() <= arena.stored_words());
        }
    }

    #[test]
    fn clause_mutation() {
        use cindersat_formula::lits;

        let mut arena = ClauseArena::new();
        let cref = arena.add_clause(ClauseHeader::new(), &lits![1, 2, 3, 4]);

        arena.clause_mut(cref).lits_mut().swap(0, 2);

        assert_eq!(arena.clause(cref).lits(), &lits![3, 2, 1, 4]);

        // Swapping literals keeps the order independent signature valid.
        assert_eq!(
            arena.clause(cref).header().signature(),
            clause_signature(&lits![1, 2, 3, 4])
        );
    }
}
