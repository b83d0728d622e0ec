//! Hand-off point to the rendering collaborator.

use crate::unit::Page;

/// Receives each page at the moment it becomes current.
///
/// The engine does not advance past a displayed page until it is re-entered
/// by the caller, after the page's response has been recorded.
pub trait Presenter {
    fn display(&mut self, page: &Page);
}

impl<F: FnMut(&Page)> Presenter for F {
    fn display(&mut self, page: &Page) {
        self(page);
    }
}
