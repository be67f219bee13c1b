// Xkbsym Symbols - Builder Types
// Sparse, growable per-key state accumulated while statements are processed

use std::ops::{BitAnd, BitOr, BitOrAssign};

use smallvec::SmallVec;

use crate::action::Action;
use crate::ast::MergeMode;
use crate::atom::Atom;
use crate::keycodes::KeyName;
use crate::keymap::{RangeExceed, NUM_GROUPS};
use crate::keysym::Keysym;

macro_rules! field_set {
    ($(#[$meta:meta])* $name:ident { $($flag:ident = $bit:expr),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name(u8);

        impl $name {
            $(pub const $flag: $name = $name(1 << $bit);)*

            pub const fn empty() -> Self {
                $name(0)
            }

            pub fn is_empty(self) -> bool {
                self.0 == 0
            }

            pub fn contains(self, other: $name) -> bool {
                self.0 & other.0 == other.0
            }

            pub fn insert(&mut self, other: $name) {
                self.0 |= other.0;
            }
        }

        impl BitOr for $name {
            type Output = $name;
            fn bitor(self, rhs: $name) -> $name {
                $name(self.0 | rhs.0)
            }
        }

        impl BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: $name) {
                self.0 |= rhs.0;
            }
        }

        impl BitAnd for $name {
            type Output = $name;
            fn bitand(self, rhs: $name) -> $name {
                $name(self.0 & rhs.0)
            }
        }
    };
}

field_set! {
    /// Fields of a group that have been defined
    GroupFields { SYMS = 0, ACTS = 1, TYPE = 2 }
}

field_set! {
    /// Scalar fields of a key that have been defined
    KeyFields { REPEAT = 0, TYPE_DFLT = 1, GROUP_INFO = 2, VMODMAP = 3 }
}

/// One shift level: a span of the group's keysym buffer and an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LevelInfo {
    pub num_syms: u32,
    pub sym_index: u32,
    pub action: Action,
}

/// One group of a key under construction
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupInfo {
    pub defined: GroupFields,
    pub syms: Vec<Keysym>,
    pub levels: Vec<LevelInfo>,
    pub type_name: Option<Atom>,
}

impl GroupInfo {
    /// Keysyms of a level
    pub fn level_syms(&self, level: usize) -> &[Keysym] {
        let Some(info) = self.levels.get(level) else {
            return &[];
        };
        let start = info.sym_index as usize;
        self.syms
            .get(start..start + info.num_syms as usize)
            .unwrap_or(&[])
    }
}

/// Tri-state repeat setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyRepeat {
    #[default]
    Undefined,
    Yes,
    No,
}

/// Values accepted by the `repeat` field
pub const REPEAT_ENTRIES: &[(&str, KeyRepeat)] = &[
    ("true", KeyRepeat::Yes),
    ("yes", KeyRepeat::Yes),
    ("on", KeyRepeat::Yes),
    ("false", KeyRepeat::No),
    ("no", KeyRepeat::No),
    ("off", KeyRepeat::No),
    ("default", KeyRepeat::Undefined),
];

/// A key under construction
#[derive(Debug, Clone, PartialEq)]
pub struct KeyInfo {
    pub defined: KeyFields,
    pub file_id: u32,
    pub merge: MergeMode,
    pub name: KeyName,
    /// Index is group number - 1; placeholders have empty `defined`
    pub groups: SmallVec<[GroupInfo; NUM_GROUPS]>,
    pub repeat: KeyRepeat,
    pub vmodmap: u16,
    pub default_type: Option<Atom>,
    pub out_of_range: RangeExceed,
}

impl KeyInfo {
    /// A fresh key builder for a unit
    pub fn new(file_id: u32) -> Self {
        Self {
            defined: KeyFields::empty(),
            file_id,
            merge: MergeMode::Override,
            name: KeyName::new("*"),
            groups: SmallVec::new(),
            repeat: KeyRepeat::Undefined,
            vmodmap: 0,
            default_type: None,
            out_of_range: RangeExceed::Wrap,
        }
    }

    /// Grow the group list so that `index` is valid
    pub fn ensure_group(&mut self, index: usize) {
        if index >= self.groups.len() {
            self.groups.resize_with(index + 1, GroupInfo::default);
        }
    }
}

impl Default for KeyInfo {
    fn default() -> Self {
        Self::new(0)
    }
}

/// What a modifier-map entry refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModMapRef {
    KeyName(KeyName),
    Keysym(Keysym),
}

/// `(modifier, key)` binding from a `modifier_map` statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModMapEntry {
    pub merge: MergeMode,
    /// Core modifier index
    pub modifier: u32,
    pub reference: ModMapRef,
}

/// Compilation state of one description unit
#[derive(Debug, Clone)]
pub struct SymbolsInfo {
    pub name: Option<String>,
    pub error_count: u32,
    pub file_id: u32,
    pub merge: MergeMode,
    /// 0-based group all keys of the unit are moved to
    pub explicit_group: Option<u32>,
    pub keys: Vec<KeyInfo>,
    /// Template for keys, changed by `key.field = value;`
    pub dflt: KeyInfo,
    pub group_names: Vec<Option<Atom>>,
    pub mod_maps: Vec<ModMapEntry>,
}

impl SymbolsInfo {
    pub fn new(file_id: u32) -> Self {
        Self {
            name: None,
            error_count: 0,
            file_id,
            merge: MergeMode::Override,
            explicit_group: None,
            keys: Vec::new(),
            dflt: KeyInfo::new(file_id),
            group_names: Vec::new(),
            mod_maps: Vec::new(),
        }
    }

    /// Name of the unit for diagnostics
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("(unnamed)")
    }

    pub fn find_key(&self, name: KeyName) -> Option<&KeyInfo> {
        self.keys.iter().find(|k| k.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_sets() {
        let mut fields = GroupFields::empty();
        assert!(fields.is_empty());
        fields.insert(GroupFields::SYMS);
        fields |= GroupFields::TYPE;
        assert!(fields.contains(GroupFields::SYMS));
        assert!(!fields.contains(GroupFields::ACTS));
        assert_eq!(fields & GroupFields::TYPE, GroupFields::TYPE);
        assert!(!(GroupFields::SYMS | GroupFields::ACTS).contains(GroupFields::TYPE));
    }

    #[test]
    fn test_new_key_info() {
        let key = KeyInfo::new(3);
        assert_eq!(key.file_id, 3);
        assert_eq!(key.merge, MergeMode::Override);
        assert_eq!(key.name, KeyName::new("*"));
        assert_eq!(key.out_of_range, RangeExceed::Wrap);
        assert!(key.groups.is_empty());
    }

    #[test]
    fn test_ensure_group_adds_placeholders() {
        let mut key = KeyInfo::new(0);
        key.ensure_group(2);
        assert_eq!(key.groups.len(), 3);
        assert!(key.groups.iter().all(|g| g.defined.is_empty()));
        key.ensure_group(0);
        assert_eq!(key.groups.len(), 3);
    }

    #[test]
    fn test_level_syms() {
        let group = GroupInfo {
            defined: GroupFields::SYMS,
            syms: vec![Keysym(0x61), Keysym(0x41)],
            levels: vec![
                LevelInfo {
                    num_syms: 1,
                    sym_index: 1,
                    action: Action::NoAction,
                },
                LevelInfo::default(),
            ],
            type_name: None,
        };
        assert_eq!(group.level_syms(0), &[Keysym(0x41)]);
        assert!(group.level_syms(1).is_empty());
        assert!(group.level_syms(5).is_empty());
        assert_eq!(group.levels[1].num_syms, 0);
    }
}
