// Xkbsym Atoms
// Interned strings for type and group names

use std::fmt;

use indexmap::IndexSet;

/// Handle to an interned string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Atom(u32);

impl Atom {
    /// Index of the atom in its table
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "atom#{}", self.0)
    }
}

/// String interning table
#[derive(Debug, Clone, Default)]
pub struct AtomTable {
    strings: IndexSet<String>,
}

impl AtomTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning the existing atom if already present
    pub fn intern(&mut self, text: &str) -> Atom {
        if let Some(index) = self.strings.get_index_of(text) {
            return Atom(index as u32);
        }
        let (index, _) = self.strings.insert_full(text.to_string());
        Atom(index as u32)
    }

    /// Find the atom of a string without interning it
    pub fn lookup(&self, text: &str) -> Option<Atom> {
        self.strings.get_index_of(text).map(|i| Atom(i as u32))
    }

    /// Text of an atom
    pub fn text(&self, atom: Atom) -> &str {
        self.strings
            .get_index(atom.0 as usize)
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Text of an optional atom, `(none)` when absent
    pub fn text_or_none(&self, atom: Option<Atom>) -> &str {
        match atom {
            Some(atom) => self.text(atom),
            None => "(none)",
        }
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}
