// Xkbsym Keymap
// Compiled keyboard map: per-key dense symbol tables and shared lookup tables

use crate::action::Action;
use crate::atom::{Atom, AtomTable};
use crate::keycodes::{KeyName, KeycodeTable};
use crate::keysym::Keysym;
use crate::modifier::VModTable;
use crate::types::KeyType;

/// Maximum number of groups per key
pub const NUM_GROUPS: usize = 4;

/// Error count above which a unit is abandoned
pub const MAX_ERRORS: u32 = 10;

/// Error count added when an include cannot be processed
pub const INCLUDE_PENALTY: u32 = 10;

/// Behavior when the effective group exceeds a key's group count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeExceed {
    #[default]
    Wrap,
    Saturate,
    /// 0-based target group
    Redirect(u32),
}

/// Components of a key set explicitly rather than by interpretation
pub mod explicit {
    pub const INTERP: u8 = 1 << 0;
    pub const VMODMAP: u8 = 1 << 1;
    pub const REPEAT: u8 = 1 << 2;
}

/// Shared compilation state
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub atoms: AtomTable,
    verbosity: i32,
}

impl Context {
    pub fn new(verbosity: i32) -> Self {
        Self {
            atoms: AtomTable::new(),
            verbosity,
        }
    }

    pub fn verbosity(&self) -> i32 {
        self.verbosity
    }

    pub fn set_verbosity(&mut self, verbosity: i32) {
        self.verbosity = verbosity;
    }
}

/// Dense symbol data of one key: `num_groups x width` cells
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeySymbols {
    pub explicit: u8,
    /// Bit i set when group i's type was chosen explicitly
    pub explicit_groups: u8,
    pub vmodmap: u16,
    pub repeats: bool,
    pub num_groups: u32,
    pub width: u32,
    /// Index into the keymap's type table, per group
    pub kt_index: [usize; NUM_GROUPS],
    pub out_of_range: RangeExceed,
    /// All keysyms of the key, group-major then level-minor
    pub syms: Vec<Keysym>,
    pub sym_index: Vec<u32>,
    pub num_syms: Vec<u32>,
    /// Empty when no level of the key carries an action
    pub actions: Vec<Action>,
}

impl KeySymbols {
    fn cell(&self, group: u32, level: u32) -> Option<usize> {
        if group >= self.num_groups || level >= self.width {
            return None;
        }
        Some((group * self.width + level) as usize)
    }

    /// Keysyms of a level; empty when the cell holds none
    pub fn syms_for(&self, group: u32, level: u32) -> &[Keysym] {
        let Some(cell) = self.cell(group, level) else {
            return &[];
        };
        let start = self.sym_index[cell] as usize;
        let count = self.num_syms[cell] as usize;
        &self.syms[start..start + count]
    }

    /// Action of a level; `NoAction` when the key has none
    pub fn action_for(&self, group: u32, level: u32) -> Action {
        match self.cell(group, level) {
            Some(cell) => self.actions.get(cell).copied().unwrap_or_default(),
            None => Action::NoAction,
        }
    }

    pub fn has_actions(&self) -> bool {
        !self.actions.is_empty()
    }
}

/// A physical key of the keymap
#[derive(Debug, Clone, PartialEq)]
pub struct Key {
    pub name: KeyName,
    pub keycode: u32,
    /// Core modifiers bound by the modifier map
    pub modmap: u8,
    pub symbols: KeySymbols,
}

/// The keyboard map the symbols pass compiles into
#[derive(Debug, Clone)]
pub struct Keymap {
    pub ctx: Context,
    pub keycodes: KeycodeTable,
    pub types: Vec<KeyType>,
    pub vmods: VModTable,
    /// One entry per key-code table entry, in key-code order
    pub keys: Vec<Key>,
    pub group_names: Vec<Option<Atom>>,
    pub symbols_section_name: Option<String>,
}

impl Keymap {
    /// Build an empty keymap over a key-code table and type table.
    ///
    /// `types` must not be empty; index 0 is the fallback type.
    pub fn new(ctx: Context, keycodes: KeycodeTable, types: Vec<KeyType>) -> Self {
        let keys = keycodes
            .iter_sorted()
            .into_iter()
            .map(|(name, keycode)| Key {
                name,
                keycode,
                modmap: 0,
                symbols: KeySymbols::default(),
            })
            .collect();

        Self {
            ctx,
            keycodes,
            types,
            vmods: VModTable::new(),
            keys,
            group_names: Vec::new(),
            symbols_section_name: None,
        }
    }

    /// Find a key's index in `keys` by name, optionally following aliases
    pub fn find_key(&self, name: KeyName, use_alias: bool) -> Option<usize> {
        if let Some(index) = self.keys.iter().position(|k| k.name == name) {
            return Some(index);
        }
        if use_alias {
            let real = self.keycodes.resolve_alias(name)?;
            return self.keys.iter().position(|k| k.name == real);
        }
        None
    }

    pub fn key(&self, name: &str) -> Option<&Key> {
        self.find_key(KeyName::new(name), true).map(|i| &self.keys[i])
    }

    /// Name of a type by table index
    pub fn type_name(&self, index: usize) -> &str {
        self.types
            .get(index)
            .map(|t| self.ctx.atoms.text(t.name))
            .unwrap_or("")
    }
}
