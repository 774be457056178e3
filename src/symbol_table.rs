//! Label table built by the first assembler pass.

use std::collections::HashMap;

/// Case-insensitive mapping from label names to word addresses.
///
/// Names are stored upper-cased, so `loop`, `Loop` and `LOOP` are the same label.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct SymbolTable {
    inner: HashMap<String, u16>,
}

fn normalize(label: &str) -> String {
    label.to_uppercase()
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            inner: HashMap::new(),
        }
    }

    /// Binds `label` to `address`.
    ///
    /// # Returns
    /// The address the label was previously bound to, if it was already defined.
    pub(crate) fn define_symbol(&mut self, label: &str, address: u16) -> Option<u16> {
        self.inner.insert(normalize(label), address)
    }

    pub fn get<S: AsRef<str>>(&self, label: S) -> Option<u16> {
        self.inner.get(&normalize(label.as_ref())).copied()
    }

    pub fn contains<S: AsRef<str>>(&self, label: S) -> bool {
        self.inner.contains_key(&normalize(label.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterates over the upper-cased labels and their addresses, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u16)> {
        self.inner.iter().map(|(label, addr)| (label.as_str(), *addr))
    }
}

#[test]
fn test_symbol_table_case_insensitive() {
    let mut table = SymbolTable::new();

    assert_eq!(table.define_symbol("Loop", 4), None);
    assert_eq!(table.get("LOOP"), Some(4));
    assert_eq!(table.get("loop"), Some(4));
    assert!(table.contains("lOoP"));
    assert_eq!(table.get("done"), None);

    assert_eq!(table.define_symbol("LOOP", 9), Some(4));
    assert_eq!(table.get("loop"), Some(9));
    assert_eq!(table.len(), 1);
    assert_eq!(table.iter().collect::<Vec<_>>(), vec![("LOOP", 9)]);
}
