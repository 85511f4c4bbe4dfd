//! Tree position tracking (Gorn addresses)
//!
//! A Gorn address names an element by the sibling index of every element on
//! the path from the root: "1.2.3" is the third child of the second child of
//! the first top-level element. Only element enters and exits move the
//! position; text, comments and other events do not count as siblings.

/// Current position in the element tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreePosition {
    /// Sibling counters from the root down; the last one counts children of
    /// the innermost open element and is not part of its address
    counters: Vec<u32>,
}

impl Default for TreePosition {
    fn default() -> Self {
        Self::new()
    }
}

impl TreePosition {
    pub fn new() -> Self {
        TreePosition { counters: vec![0] }
    }

    /// An element opened at the current depth
    #[inline]
    pub fn enter(&mut self) {
        if let Some(last) = self.counters.last_mut() {
            *last += 1;
        }
        self.counters.push(0);
    }

    /// The innermost open element closed
    ///
    /// Unbalanced exits are ignored; the transformer rejects them before they
    /// reach the tracker.
    #[inline]
    pub fn exit(&mut self) {
        if self.counters.len() > 1 {
            self.counters.pop();
        }
    }

    /// Number of open elements
    #[inline]
    pub fn depth(&self) -> usize {
        self.counters.len() - 1
    }

    /// Dot-joined address of the innermost open element, empty at the root
    pub fn current_path(&self) -> String {
        let address = &self.counters[..self.counters.len() - 1];
        let mut path = String::with_capacity(address.len() * 3);
        for (i, counter) in address.iter().enumerate() {
            if i > 0 {
                path.push('.');
            }
            path.push_str(&counter.to_string());
        }
        path
    }
}
