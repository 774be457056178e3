//! Mapping between memory locations and source code lines.

use std::collections::HashMap;
use std::iter::FromIterator;

/// Mapping from memory addresses into the 1-based source lines that emitted them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceMap {
    inner: HashMap<u16, usize>,
}

impl FromIterator<(u16, usize)> for SourceMap {
    fn from_iter<I>(iter: I) -> Self
        where I: IntoIterator<Item = (u16, usize)>
    {
        SourceMap {
            inner: HashMap::from_iter(iter),
        }
    }
}

impl SourceMap {
    pub(crate) fn insert(&mut self, addr: u16, line: usize) {
        self.inner.insert(addr, line);
    }

    /// Returns the line in the original source code which
    /// defined the value for the given memory location.
    pub fn get_source_line(&self, addr: u16) -> Option<usize> {
        self.inner.get(&addr).copied()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
