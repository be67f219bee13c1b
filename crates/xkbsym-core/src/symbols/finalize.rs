// Xkbsym Symbols - Finalization
// Materializes key builders into dense keymap keys and resolves the modifier map

use super::info::{GroupInfo, KeyFields, KeyInfo, KeyRepeat, ModMapEntry, ModMapRef, SymbolsInfo};
use crate::action::Action;
use crate::keymap::{explicit, KeySymbols, Keymap};
use crate::keysym::{is_keypad, is_lower, is_upper, Keysym, NO_SYMBOL};
use crate::modifier::core_mod_name;
use crate::types::{
    find_named_type, ALPHABETIC, FOUR_LEVEL, FOUR_LEVEL_ALPHABETIC, FOUR_LEVEL_KEYPAD,
    FOUR_LEVEL_SEMIALPHABETIC, KEYPAD, ONE_LEVEL, TWO_LEVEL,
};

/// Choose a type from the level count and the first keysym of each level.
///
/// Returns the type name and whether the choice is purely automatic, or
/// `None` for more than four levels.
pub fn find_automatic_type(group: &GroupInfo) -> Option<(&'static str, bool)> {
    let width = group.levels.len();
    let sym = |level: usize| group.level_syms(level).first().copied().unwrap_or(NO_SYMBOL);
    let alphabetic = |a: usize, b: usize| is_lower(sym(a)) && is_upper(sym(b));
    let keypad = is_keypad(sym(0)) || is_keypad(sym(1));

    match width {
        0 | 1 => Some((ONE_LEVEL, true)),
        2 if alphabetic(0, 1) => Some((ALPHABETIC, false)),
        2 if keypad => Some((KEYPAD, true)),
        2 => Some((TWO_LEVEL, true)),
        3 | 4 if alphabetic(0, 1) => {
            if alphabetic(2, 3) {
                Some((FOUR_LEVEL_ALPHABETIC, false))
            } else {
                Some((FOUR_LEVEL_SEMIALPHABETIC, false))
            }
        }
        3 | 4 if keypad => Some((FOUR_LEVEL_KEYPAD, false)),
        3 | 4 => Some((FOUR_LEVEL, false)),
        _ => None,
    }
}

/// Write one key builder into its keymap key
pub fn copy_symbols_def(keymap: &mut Keymap, keyi: &mut KeyInfo) -> bool {
    // Builder names are already canonical
    let Some(key_index) = keymap.find_key(keyi.name, false) else {
        log_vrb!(
            keymap.ctx,
            5,
            "Key {} not found in keycodes; Symbols ignored",
            keyi.name
        );
        return false;
    };

    let Some(last) = keyi.groups.iter().rposition(|g| !g.defined.is_empty()) else {
        return false;
    };
    let num_groups = last + 1;
    keyi.groups.truncate(num_groups);

    // Gaps below the last defined group are filled from the first group
    let group0 = keyi.groups[0].clone();
    for groupi in keyi.groups.iter_mut().skip(1) {
        if groupi.defined.is_empty() {
            *groupi = group0.clone();
        }
    }

    let have_actions = keyi
        .groups
        .iter()
        .any(|g| g.levels.iter().any(|l| l.action.is_some()));

    let mut symbols = KeySymbols {
        num_groups: num_groups as u32,
        out_of_range: keyi.out_of_range,
        ..Default::default()
    };

    for (i, groupi) in keyi.groups.iter_mut().enumerate() {
        let mut auto_type = false;

        if groupi.type_name.is_none() {
            if keyi.default_type.is_some() {
                groupi.type_name = keyi.default_type;
            } else if let Some((name, automatic)) = find_automatic_type(groupi) {
                groupi.type_name = Some(keymap.ctx.atoms.intern(name));
                auto_type = automatic;
            } else {
                log_vrb!(
                    keymap.ctx,
                    5,
                    "No automatic type for {} levels; Using {} for the {} key",
                    groupi.levels.len(),
                    keymap.ctx.atoms.text_or_none(groupi.type_name),
                    keyi.name
                );
            }
        }

        let found = groupi
            .type_name
            .and_then(|name| find_named_type(&keymap.types, name));
        symbols.kt_index[i] = match found {
            Some(index) => {
                if !auto_type || groupi.levels.len() > 2 {
                    symbols.explicit_groups |= 1 << i;
                }
                index
            }
            None => {
                log_vrb!(
                    keymap.ctx,
                    3,
                    "Type \"{}\" is not defined; Using default type for the {} key",
                    keymap.ctx.atoms.text_or_none(groupi.type_name),
                    keyi.name
                );
                0
            }
        };

        let num_levels = keymap
            .types
            .get(symbols.kt_index[i])
            .map_or(1, |t| t.num_levels);
        if (num_levels as usize) < groupi.levels.len() {
            log_vrb!(
                keymap.ctx,
                1,
                "Type \"{}\" has {} levels, but {} has {} levels; Ignoring extra symbols",
                keymap.type_name(symbols.kt_index[i]),
                num_levels,
                keyi.name,
                groupi.levels.len()
            );
            groupi.levels.truncate(num_levels as usize);
        }

        symbols.width = symbols.width.max(num_levels);
    }

    let cells = num_groups * symbols.width as usize;
    symbols.sym_index = vec![0; cells];
    symbols.num_syms = vec![0; cells];
    if have_actions {
        symbols.actions = vec![Action::NoAction; cells];
        symbols.explicit |= explicit::INTERP;
    }
    if keyi.defined.contains(KeyFields::VMODMAP) {
        symbols.vmodmap = keyi.vmodmap;
        symbols.explicit |= explicit::VMODMAP;
    }
    symbols.repeats = true;
    if keyi.repeat != KeyRepeat::Undefined {
        symbols.repeats = keyi.repeat == KeyRepeat::Yes;
        symbols.explicit |= explicit::REPEAT;
    }

    for (i, groupi) in keyi.groups.iter().enumerate() {
        for (j, leveli) in groupi.levels.iter().enumerate() {
            let cell = i * symbols.width as usize + j;
            if have_actions && leveli.action.is_some() {
                symbols.actions[cell] = leveli.action;
            }

            let syms = groupi.level_syms(j);
            if syms.is_empty() {
                continue;
            }
            symbols.sym_index[cell] = symbols.syms.len() as u32;
            symbols.num_syms[cell] = syms.len() as u32;
            symbols.syms.extend_from_slice(syms);
        }
    }

    keymap.keys[key_index].symbols = symbols;
    true
}

/// Key producing `sym` alone at the lowest group, then lowest level
pub fn find_key_for_symbol(keymap: &Keymap, sym: Keysym) -> Option<usize> {
    let mut best: Option<(usize, u32, u32)> = None;

    for (index, key) in keymap.keys.iter().enumerate() {
        let symbols = &key.symbols;
        for group in 0..symbols.num_groups {
            let num_levels = keymap
                .types
                .get(symbols.kt_index[group as usize])
                .map_or(0, |t| t.num_levels)
                .min(symbols.width);

            for level in 0..num_levels {
                match symbols.syms_for(group, level) {
                    [only] if *only == sym => {}
                    _ => continue,
                }

                let better = match best {
                    None => true,
                    Some((_, g, l)) => group < g || (group == g && level < l),
                };
                if better {
                    if group == 0 && level == 0 {
                        return Some(index);
                    }
                    best = Some((index, group, level));
                }
            }
        }
    }

    best.map(|(index, _, _)| index)
}

/// Add an entry's modifier to the key it refers to
pub fn copy_mod_map_def(keymap: &mut Keymap, entry: &ModMapEntry) -> bool {
    let key_index = match entry.reference {
        ModMapRef::KeyName(name) => {
            let found = keymap.find_key(name, true);
            if found.is_none() {
                log_vrb!(
                    keymap.ctx,
                    5,
                    "Key {} not found in keycodes; Modifier map entry for {} not updated",
                    name,
                    core_mod_name(entry.modifier)
                );
            }
            found
        }
        ModMapRef::Keysym(sym) => {
            let found = find_key_for_symbol(keymap, sym);
            if found.is_none() {
                log_vrb!(
                    keymap.ctx,
                    5,
                    "Key \"{}\" not found in symbol map; Modifier map entry for {} not updated",
                    sym,
                    core_mod_name(entry.modifier)
                );
            }
            found
        }
    };

    let Some(key_index) = key_index else {
        return false;
    };
    keymap.keys[key_index].modmap |= 1 << entry.modifier;
    true
}

/// Commit a compiled unit to the keymap.
///
/// Keys or modifier-map entries that cannot be placed are counted as
/// errors but do not fail the commit.
pub fn copy_symbols_to_keymap(keymap: &mut Keymap, mut info: SymbolsInfo) {
    keymap.symbols_section_name = info.name.take();
    keymap.group_names = std::mem::take(&mut info.group_names);

    for keyi in info.keys.iter_mut() {
        if !copy_symbols_def(keymap, keyi) {
            info.error_count += 1;
        }
    }

    if keymap.ctx.verbosity() > 3 {
        for key in keymap.keys.iter().filter(|k| k.symbols.num_groups < 1) {
            log::info!("No symbols defined for {}", key.name);
        }
    }

    for entry in &info.mod_maps {
        if !copy_mod_map_def(keymap, entry) {
            info.error_count += 1;
        }
    }

    log::debug!(
        "Committed symbols section {} ({} keys, {} unplaced entries)",
        keymap.symbols_section_name.as_deref().unwrap_or("(unnamed)"),
        info.keys.len(),
        info.error_count
    );
}
