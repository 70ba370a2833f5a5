//! User provided callbacks.
use cindersat_formula::Lit;

/// Callback for learned clauses up to a maximal length.
pub struct LearnCallback<'a> {
    pub max_len: usize,
    pub callback: Box<dyn FnMut(&[Lit]) + 'a>,
}

/// User provided callbacks polled during the search.
#[derive(Default)]
pub struct Callbacks<'a> {
    /// Polled at conflict boundaries, returning true requests a stop.
    pub terminate: Option<Box<dyn FnMut() -> bool + 'a>>,
    /// Invoked for every learned clause that is short enough.
    pub learn: Option<LearnCallback<'a>>,
}

impl<'a> Callbacks<'a> {
    /// Poll the termination callback.
    pub fn should_terminate(&mut self) -> bool {
        match &mut self.terminate {
            Some(callback) => callback(),
            None => false,
        }
    }

    /// Report a learned clause to the learn callback.
    pub fn clause_learned(&mut self, lits: &[Lit]) {
        if let Some(learn) = &mut self.learn {
            if lits.len() <= learn.max_len {
                (learn.callback)(lits);
            }
        }
    }
}
