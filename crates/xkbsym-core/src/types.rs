// Xkbsym Key Types
// Named shift-level layouts a key group can use

use crate::atom::{Atom, AtomTable};

/// A key type: a name and the number of shift levels it supports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyType {
    pub name: Atom,
    pub num_levels: u32,
}

/// Names of the types chosen automatically by level count and keysym class
pub const ONE_LEVEL: &str = "ONE_LEVEL";
pub const TWO_LEVEL: &str = "TWO_LEVEL";
pub const ALPHABETIC: &str = "ALPHABETIC";
pub const KEYPAD: &str = "KEYPAD";
pub const FOUR_LEVEL: &str = "FOUR_LEVEL";
pub const FOUR_LEVEL_ALPHABETIC: &str = "FOUR_LEVEL_ALPHABETIC";
pub const FOUR_LEVEL_SEMIALPHABETIC: &str = "FOUR_LEVEL_SEMIALPHABETIC";
pub const FOUR_LEVEL_KEYPAD: &str = "FOUR_LEVEL_KEYPAD";

/// The default type table. Index 0 is always ONE_LEVEL.
pub fn default_types(atoms: &mut AtomTable) -> Vec<KeyType> {
    [
        (ONE_LEVEL, 1),
        (TWO_LEVEL, 2),
        (ALPHABETIC, 2),
        (KEYPAD, 2),
        (FOUR_LEVEL, 4),
        (FOUR_LEVEL_ALPHABETIC, 4),
        (FOUR_LEVEL_SEMIALPHABETIC, 4),
        (FOUR_LEVEL_KEYPAD, 4),
    ]
    .iter()
    .map(|(name, levels)| KeyType {
        name: atoms.intern(name),
        num_levels: *levels,
    })
    .collect()
}

/// Find a type by name, returning its index in the table
pub fn find_named_type(types: &[KeyType], name: Atom) -> Option<usize> {
    types.iter().position(|t| t.name == name)
}
