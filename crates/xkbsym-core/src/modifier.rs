// Xkbsym Modifier System
// Core modifiers and the virtual-modifier table

use std::fmt;

use strum_macros::{Display, EnumString};

use crate::ast::{Expr, MergeMode, VModDef};

/// Number of core modifiers (Shift .. Mod5)
pub const NUM_CORE_MODS: u32 = 8;

/// Maximum number of virtual modifiers
pub const MAX_VMODS: usize = 16;

/// Bits of a combined mask belonging to core modifiers
pub const CORE_MOD_MASK: u32 = 0xff;

/// Core modifier indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum ModIndex {
    Shift = 0,
    Lock = 1,
    Control = 2,
    Mod1 = 3,
    Mod2 = 4,
    Mod3 = 5,
    Mod4 = 6,
    Mod5 = 7,
}

impl ModIndex {
    /// Bit index of this modifier
    pub fn index(self) -> u32 {
        self as u32
    }

    /// Mask with only this modifier set
    pub fn mask(self) -> u32 {
        1 << self.index()
    }

    /// Look up a core modifier by name, accepting `Ctrl` for Control
    pub fn from_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("ctrl") {
            return Some(ModIndex::Control);
        }
        name.parse().ok()
    }
}

/// Mask bits for a virtual modifier index
pub fn vmod_mask(index: usize) -> u32 {
    1 << (NUM_CORE_MODS as usize + index)
}

/// Extract the 16-bit virtual-modifier part of a combined mask
pub fn vmods_of(mask: u32) -> u16 {
    ((mask >> NUM_CORE_MODS) & 0xffff) as u16
}

/// A declared virtual modifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VMod {
    pub name: String,
    /// Core modifiers this virtual modifier maps to, if declared
    pub mapping: Option<u32>,
}

/// Errors that can occur when declaring virtual modifiers
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VModError {
    #[error("too many virtual modifiers defined (maximum {0})")]
    TooMany(usize),

    #[error("virtual modifier '{0}' shadows a core modifier")]
    ShadowsCore(String),

    #[error("illegal value for virtual modifier '{0}'")]
    IllegalValue(String),
}

/// Virtual-modifier table
#[derive(Debug, Clone, Default)]
pub struct VModTable {
    vmods: Vec<VMod>,
}

impl VModTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of a virtual modifier by name (case-insensitive)
    pub fn find(&self, name: &str) -> Option<usize> {
        self.vmods
            .iter()
            .position(|v| v.name.eq_ignore_ascii_case(name))
    }

    pub fn get(&self, index: usize) -> Option<&VMod> {
        self.vmods.get(index)
    }

    pub fn len(&self) -> usize {
        self.vmods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vmods.is_empty()
    }

    /// Handle a `virtual_modifiers` declaration.
    ///
    /// Redeclaring a known name only updates its mapping, and only when the
    /// merge mode allows overriding an existing one.
    pub fn declare(&mut self, def: &VModDef) -> Result<usize, VModError> {
        if ModIndex::from_name(&def.name).is_some() {
            return Err(VModError::ShadowsCore(def.name.clone()));
        }

        let mapping = match &def.value {
            None => None,
            Some(expr) => Some(
                crate::expr::resolve_mod_mask(expr)
                    .map_err(|_| VModError::IllegalValue(def.name.clone()))?,
            ),
        };

        if let Some(index) = self.find(&def.name) {
            let vmod = &mut self.vmods[index];
            match (vmod.mapping, mapping) {
                (_, None) => {}
                (None, Some(new)) => vmod.mapping = Some(new),
                (Some(old), Some(new)) if old != new => {
                    let (used, ignored) = if def.merge == MergeMode::Augment {
                        (old, new)
                    } else {
                        (new, old)
                    };
                    log::warn!(
                        "Virtual modifier {} defined multiple times; using {:#x}, ignoring {:#x}",
                        def.name,
                        used,
                        ignored
                    );
                    vmod.mapping = Some(used);
                }
                _ => {}
            }
            return Ok(index);
        }

        if self.vmods.len() >= MAX_VMODS {
            return Err(VModError::TooMany(MAX_VMODS));
        }
        self.vmods.push(VMod {
            name: def.name.clone(),
            mapping,
        });
        Ok(self.vmods.len() - 1)
    }

    /// Render a mask as `Shift+NumLock` style text
    pub fn mask_text(&self, mask: u32) -> String {
        let mut names = Vec::new();
        for index in 0..NUM_CORE_MODS {
            if mask & (1 << index) != 0 {
                names.push(core_mod_name(index).to_string());
            }
        }
        for (index, vmod) in self.vmods.iter().enumerate() {
            if mask & vmod_mask(index) != 0 {
                names.push(vmod.name.clone());
            }
        }
        if names.is_empty() {
            "none".to_string()
        } else {
            names.join("+")
        }
    }
}

/// Name of a core modifier by bit index
pub fn core_mod_name(index: u32) -> &'static str {
    match index {
        0 => "Shift",
        1 => "Lock",
        2 => "Control",
        3 => "Mod1",
        4 => "Mod2",
        5 => "Mod3",
        6 => "Mod4",
        7 => "Mod5",
        _ => "unknown",
    }
}

impl fmt::Display for VMod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mapping {
            Some(mask) => write!(f, "{} = {:#x}", self.name, mask),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Build a declaration for a bare virtual-modifier name
pub fn vmod_def(name: &str, value: Option<Expr>) -> VModDef {
    VModDef {
        merge: MergeMode::Default,
        name: name.to_string(),
        value,
    }
}
