// Xkbsym Key Codes
// Physical key names, aliases and the key-code table

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;

/// A key name packed into 4 bytes, e.g. `<AD01>`.
///
/// Names longer than four characters are truncated, as in the
/// key-code section of a layout description.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct KeyName(u32);

impl KeyName {
    /// Pack a key name. Surrounding angle brackets are ignored.
    pub fn new(name: &str) -> Self {
        let name = name
            .strip_prefix('<')
            .and_then(|n| n.strip_suffix('>'))
            .unwrap_or(name);
        let mut packed = 0u32;
        for (i, byte) in name.bytes().take(4).enumerate() {
            packed |= (byte as u32) << (24 - 8 * i);
        }
        KeyName(packed)
    }

    /// The packed value
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Unpack the name without brackets
    pub fn text(self) -> String {
        self.0
            .to_be_bytes()
            .iter()
            .take_while(|b| **b != 0)
            .map(|b| *b as char)
            .collect()
    }
}

impl fmt::Display for KeyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.text())
    }
}

impl fmt::Debug for KeyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyName({})", self)
    }
}

impl FromStr for KeyName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err("empty key name".to_string());
        }
        Ok(KeyName::new(s))
    }
}

/// Key-code table: key names in key-code order plus aliases
#[derive(Debug, Clone, Default)]
pub struct KeycodeTable {
    keys: IndexMap<KeyName, u32>,
    aliases: HashMap<KeyName, KeyName>,
}

impl KeycodeTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key. A later definition of the same name replaces the code.
    pub fn add_key(&mut self, name: KeyName, keycode: u32) {
        self.keys.insert(name, keycode);
    }

    /// Add an alias for an existing (or later) key name
    pub fn add_alias(&mut self, alias: KeyName, real: KeyName) {
        self.aliases.insert(alias, real);
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterate over (name, keycode) sorted by keycode
    pub fn iter_sorted(&self) -> Vec<(KeyName, u32)> {
        let mut keys: Vec<(KeyName, u32)> = self.keys.iter().map(|(n, c)| (*n, *c)).collect();
        keys.sort_by_key(|(_, code)| *code);
        keys
    }

    /// Resolve an alias to its canonical key name
    pub fn resolve_alias(&self, name: KeyName) -> Option<KeyName> {
        self.aliases.get(&name).copied()
    }

    /// Find a key's code by name, optionally following aliases
    pub fn find_key(&self, name: KeyName, use_alias: bool) -> Option<u32> {
        if let Some(code) = self.keys.get(&name) {
            return Some(*code);
        }
        if use_alias {
            let real = self.resolve_alias(name)?;
            return self.keys.get(&real).copied();
        }
        None
    }

    /// The evdev key-code table with common qwerty aliases
    pub fn evdev() -> Self {
        let mut table = Self::new();
        let keys: &[(&str, u32)] = &[
            ("ESC", 9),
            ("AE01", 10),
            ("AE02", 11),
            ("AE03", 12),
            ("AE04", 13),
            ("AE05", 14),
            ("AE06", 15),
            ("AE07", 16),
            ("AE08", 17),
            ("AE09", 18),
            ("AE10", 19),
            ("AE11", 20),
            ("AE12", 21),
            ("BKSP", 22),
            ("TAB", 23),
            ("AD01", 24),
            ("AD02", 25),
            ("AD03", 26),
            ("AD04", 27),
            ("AD05", 28),
            ("AD06", 29),
            ("AD07", 30),
            ("AD08", 31),
            ("AD09", 32),
            ("AD10", 33),
            ("AD11", 34),
            ("AD12", 35),
            ("RTRN", 36),
            ("LCTL", 37),
            ("AC01", 38),
            ("AC02", 39),
            ("AC03", 40),
            ("AC04", 41),
            ("AC05", 42),
            ("AC06", 43),
            ("AC07", 44),
            ("AC08", 45),
            ("AC09", 46),
            ("AC10", 47),
            ("AC11", 48),
            ("TLDE", 49),
            ("LFSH", 50),
            ("BKSL", 51),
            ("AB01", 52),
            ("AB02", 53),
            ("AB03", 54),
            ("AB04", 55),
            ("AB05", 56),
            ("AB06", 57),
            ("AB07", 58),
            ("AB08", 59),
            ("AB09", 60),
            ("AB10", 61),
            ("RTSH", 62),
            ("KPMU", 63),
            ("LALT", 64),
            ("SPCE", 65),
            ("CAPS", 66),
            ("FK01", 67),
            ("FK02", 68),
            ("FK03", 69),
            ("FK04", 70),
            ("FK05", 71),
            ("FK06", 72),
            ("FK07", 73),
            ("FK08", 74),
            ("FK09", 75),
            ("FK10", 76),
            ("NMLK", 77),
            ("SCLK", 78),
            ("KP7", 79),
            ("KP8", 80),
            ("KP9", 81),
            ("KPSU", 82),
            ("KP4", 83),
            ("KP5", 84),
            ("KP6", 85),
            ("KPAD", 86),
            ("KP1", 87),
            ("KP2", 88),
            ("KP3", 89),
            ("KP0", 90),
            ("KPDL", 91),
            ("LVL3", 92),
            ("LSGT", 94),
            ("FK11", 95),
            ("FK12", 96),
            ("KPEN", 104),
            ("RCTL", 105),
            ("KPDV", 106),
            ("PRSC", 107),
            ("RALT", 108),
            ("HOME", 110),
            ("UP", 111),
            ("PGUP", 112),
            ("LEFT", 113),
            ("RGHT", 114),
            ("END", 115),
            ("DOWN", 116),
            ("PGDN", 117),
            ("INS", 118),
            ("DELE", 119),
            ("KPEQ", 125),
            ("PAUS", 127),
            ("LWIN", 133),
            ("RWIN", 134),
            ("COMP", 135),
        ];
        for (name, code) in keys {
            table.add_key(KeyName::new(name), *code);
        }

        let aliases: &[(&str, &str)] = &[
            ("LatQ", "AD01"),
            ("LatW", "AD02"),
            ("LatE", "AD03"),
            ("LatR", "AD04"),
            ("LatT", "AD05"),
            ("LatY", "AD06"),
            ("LatA", "AC01"),
            ("LatS", "AC02"),
            ("LatD", "AC03"),
            ("LatZ", "AB01"),
            ("LatX", "AB02"),
            ("LatC", "AB03"),
            ("MENU", "COMP"),
            ("ALGR", "RALT"),
            ("LMTA", "LWIN"),
            ("RMTA", "RWIN"),
        ];
        for (alias, real) in aliases {
            table.add_alias(KeyName::new(alias), KeyName::new(real));
        }

        table
    }
}
