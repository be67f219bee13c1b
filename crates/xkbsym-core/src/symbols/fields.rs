// Xkbsym Symbols - Field Setters
// Populating key builders from `field[index] = value` assignments

use super::compiler::SymbolsCompiler;
use super::info::{GroupFields, GroupInfo, KeyFields, KeyInfo, SymbolsInfo, REPEAT_ENTRIES};
use crate::ast::Expr;
use crate::atom::Atom;
use crate::expr::{resolve_boolean, resolve_enum, resolve_group, resolve_string, resolve_vmod_mask};
use crate::keymap::{RangeExceed, NUM_GROUPS};
use crate::keysym::{lookup_keysym, NO_SYMBOL};
use crate::modifier::vmods_of;

/// Group a `symbols` or `actions` assignment applies to.
///
/// Without an index this is the first group not yet defining `field`,
/// appending a group if needed. An explicit 1-based index grows the
/// group list with placeholders.
pub fn get_group_index(keyi: &mut KeyInfo, index: Option<&Expr>, field: GroupFields) -> Option<usize> {
    let what = if field == GroupFields::SYMS {
        "symbols"
    } else {
        "actions"
    };

    let Some(index) = index else {
        if let Some(i) = keyi.groups.iter().position(|g| !g.defined.contains(field)) {
            return Some(i);
        }
        if keyi.groups.len() >= NUM_GROUPS {
            log::error!(
                "Too many groups of {} for key {} (max {}); Ignoring {} defined for extra groups",
                what,
                keyi.name,
                NUM_GROUPS,
                what
            );
            return None;
        }
        keyi.groups.push(GroupInfo::default());
        return Some(keyi.groups.len() - 1);
    };

    match resolve_group(index) {
        Ok(group) => {
            let ndx = group as usize - 1;
            keyi.ensure_group(ndx);
            Some(ndx)
        }
        Err(err) => {
            log::error!(
                "Illegal group index for {} of key {}: {}; Definition with non-integer array index ignored",
                what,
                keyi.name,
                err
            );
            None
        }
    }
}

fn is_field(field: &str, names: &[&str]) -> bool {
    names.iter().any(|n| field.eq_ignore_ascii_case(n))
}

fn has_prefix(field: &str, prefix: &str) -> bool {
    field.len() >= prefix.len() && field[..prefix.len()].eq_ignore_ascii_case(prefix)
}

impl SymbolsCompiler<'_> {
    /// Fill one group's keysyms from a keysym list
    pub fn add_symbols_to_key(
        &mut self,
        group_names: &[Option<Atom>],
        keyi: &mut KeyInfo,
        index: Option<&Expr>,
        value: Option<&Expr>,
    ) -> bool {
        let Some(ndx) = get_group_index(keyi, index, GroupFields::SYMS) else {
            return false;
        };
        let key_name = keyi.name;
        let groupi = &mut keyi.groups[ndx];

        let Some(value) = value else {
            groupi.defined.insert(GroupFields::SYMS);
            return true;
        };

        let Expr::KeysymList(levels) = value else {
            log::error!(
                "Expected a list of symbols, found {}; Ignoring symbols for group {} of {}",
                value.op_name(),
                ndx + 1,
                key_name
            );
            return false;
        };

        if groupi.defined.contains(GroupFields::SYMS) {
            log::error!(
                "Symbols for key {}, group {} already defined; Ignoring duplicate definition",
                key_name,
                ndx + 1
            );
            return false;
        }

        let num_syms: usize = levels.iter().map(Vec::len).sum();
        if groupi.syms.len() < num_syms {
            groupi.syms.resize(num_syms, NO_SYMBOL);
        }
        if groupi.levels.len() < levels.len() {
            groupi.levels.resize(levels.len(), Default::default());
        }
        groupi.defined.insert(GroupFields::SYMS);

        let group_name = group_names
            .get(ndx)
            .copied()
            .flatten()
            .map(|atom| self.keymap.ctx.atoms.text(atom))
            .unwrap_or("unnamed");

        let mut offset = 0u32;
        for (i, names) in levels.iter().enumerate() {
            let leveli = &mut groupi.levels[i];
            leveli.sym_index = offset;
            leveli.num_syms = names.len() as u32;
            offset += names.len() as u32;

            for (j, name) in names.iter().enumerate() {
                let Some(sym) = lookup_keysym(name) else {
                    log::warn!(
                        "Could not resolve keysym {} for key {}, group {} ({}), level {}",
                        name,
                        key_name,
                        ndx + 1,
                        group_name,
                        i + 1
                    );
                    leveli.sym_index = 0;
                    leveli.num_syms = 0;
                    break;
                };

                groupi.syms[leveli.sym_index as usize + j] = sym;
                if leveli.num_syms == 1 && sym == NO_SYMBOL {
                    leveli.sym_index = 0;
                    leveli.num_syms = 0;
                }
            }
        }

        while groupi.levels.last().is_some_and(|l| l.num_syms == 0) {
            groupi.levels.pop();
        }

        true
    }

    /// Fill one group's level actions from an action list
    pub fn add_actions_to_key(
        &mut self,
        keyi: &mut KeyInfo,
        index: Option<&Expr>,
        value: Option<&Expr>,
    ) -> bool {
        let Some(ndx) = get_group_index(keyi, index, GroupFields::ACTS) else {
            return false;
        };
        let key_name = keyi.name;
        let groupi = &mut keyi.groups[ndx];

        let Some(value) = value else {
            groupi.defined.insert(GroupFields::ACTS);
            return true;
        };

        let Expr::ActionList(actions) = value else {
            log::error!(
                "Bad expression type ({}) for action list value; Ignoring actions for group {} of {}",
                value.op_name(),
                ndx + 1,
                key_name
            );
            return false;
        };

        if groupi.defined.contains(GroupFields::ACTS) {
            log::error!(
                "Actions for key {}, group {} already defined",
                key_name,
                ndx + 1
            );
            return false;
        }

        if groupi.levels.len() < actions.len() {
            groupi.levels.resize(actions.len(), Default::default());
        }
        groupi.defined.insert(GroupFields::ACTS);

        for (i, act) in actions.iter().enumerate() {
            match self.actions.compile_action(act, &self.keymap.vmods) {
                Ok(action) => groupi.levels[i].action = action,
                Err(err) => log::error!(
                    "Illegal action definition for {}: {}; Action for group {}/level {} ignored",
                    key_name,
                    err,
                    ndx + 1,
                    i + 1
                ),
            }
        }

        true
    }

    /// Apply `field[index] = value` to a key builder
    pub fn set_symbols_field(
        &mut self,
        group_names: &[Option<Atom>],
        keyi: &mut KeyInfo,
        field: &str,
        index: Option<&Expr>,
        value: Option<&Expr>,
    ) -> bool {
        if is_field(field, &["symbols"]) {
            return self.add_symbols_to_key(group_names, keyi, index, value);
        }
        if is_field(field, &["actions"]) {
            return self.add_actions_to_key(keyi, index, value);
        }

        let Some(value) = value else {
            log::error!(
                "Missing value for field {} of key {}; Definition ignored",
                field,
                keyi.name
            );
            return false;
        };

        if is_field(field, &["type"]) {
            let type_name = match resolve_string(value) {
                Ok(name) => self.keymap.ctx.atoms.intern(&name),
                Err(_) => {
                    log_vrb!(
                        self.keymap.ctx,
                        1,
                        "The type field of a key symbol map must be a string; Ignoring illegal type definition"
                    );
                    return true;
                }
            };

            match index {
                None => {
                    keyi.default_type = Some(type_name);
                    keyi.defined.insert(KeyFields::TYPE_DFLT);
                }
                Some(index) => match resolve_group(index) {
                    Ok(group) => {
                        let ndx = group as usize - 1;
                        keyi.ensure_group(ndx);
                        keyi.groups[ndx].type_name = Some(type_name);
                        keyi.groups[ndx].defined.insert(GroupFields::TYPE);
                    }
                    Err(_) => {
                        log::error!(
                            "Illegal group index for type of key {}; Definition with non-integer array index ignored",
                            keyi.name
                        );
                        return false;
                    }
                },
            }
        } else if is_field(field, &["vmods", "virtualmods", "virtualmodifiers"]) {
            match resolve_vmod_mask(value, &self.keymap.vmods) {
                Ok(mask) => {
                    keyi.vmodmap = vmods_of(mask);
                    keyi.defined.insert(KeyFields::VMODMAP);
                }
                Err(_) => {
                    log::error!(
                        "Expected a virtual modifier mask, found {}; Ignoring virtual modifiers definition for key {}",
                        value.op_name(),
                        keyi.name
                    );
                    return false;
                }
            }
        } else if is_field(field, &["locking", "lock", "locks"]) {
            log::error!(
                "Key behaviors not supported; Ignoring locking specification for key {}",
                keyi.name
            );
        } else if is_field(field, &["radiogroup", "permanentradiogroup", "allownone"]) {
            log::error!(
                "Radio groups not supported; Ignoring radio group specification for key {}",
                keyi.name
            );
        } else if has_prefix(field, "overlay") || has_prefix(field, "permanentoverlay") {
            log::error!(
                "Overlays not supported; Ignoring overlay specification for key {}",
                keyi.name
            );
        } else if is_field(field, &["repeating", "repeats", "repeat"]) {
            match resolve_enum(value, REPEAT_ENTRIES) {
                Ok(repeat) => {
                    keyi.repeat = repeat;
                    keyi.defined.insert(KeyFields::REPEAT);
                }
                Err(_) => {
                    log::error!(
                        "Illegal repeat setting for {}; Non-boolean repeat setting ignored",
                        keyi.name
                    );
                    return false;
                }
            }
        } else if is_field(field, &["groupswrap", "wrapgroups"]) {
            let Ok(set) = resolve_boolean(value) else {
                log::error!(
                    "Illegal groupsWrap setting for {}; Non-boolean value ignored",
                    keyi.name
                );
                return false;
            };
            keyi.out_of_range = if set {
                RangeExceed::Wrap
            } else {
                RangeExceed::Saturate
            };
            keyi.defined.insert(KeyFields::GROUP_INFO);
        } else if is_field(field, &["groupsclamp", "clampgroups"]) {
            let Ok(set) = resolve_boolean(value) else {
                log::error!(
                    "Illegal groupsClamp setting for {}; Non-boolean value ignored",
                    keyi.name
                );
                return false;
            };
            keyi.out_of_range = if set {
                RangeExceed::Saturate
            } else {
                RangeExceed::Wrap
            };
            keyi.defined.insert(KeyFields::GROUP_INFO);
        } else if is_field(field, &["groupsredirect", "redirectgroups"]) {
            let Ok(group) = resolve_group(value) else {
                log::error!(
                    "Illegal group index for redirect of key {}; Definition with non-integer group ignored",
                    keyi.name
                );
                return false;
            };
            keyi.out_of_range = RangeExceed::Redirect(group - 1);
            keyi.defined.insert(KeyFields::GROUP_INFO);
        } else {
            log::error!(
                "Unknown field {} in a symbol interpretation; Definition ignored",
                field
            );
            return false;
        }

        true
    }

    /// Handle `name[index] = "..."` at file scope
    pub fn set_group_name(
        &mut self,
        info: &mut SymbolsInfo,
        index: Option<&Expr>,
        value: Option<&Expr>,
    ) -> bool {
        let Some(index) = index else {
            log_vrb!(
                self.keymap.ctx,
                1,
                "You must specify an index when specifying a group name; Group name definition without array subscript ignored"
            );
            return false;
        };

        let group = match resolve_group(index) {
            Ok(group) => group,
            Err(_) => {
                log::error!(
                    "Illegal index in group name definition; Definition with non-integer array index ignored"
                );
                return false;
            }
        };

        let name = match value.map(resolve_string) {
            Some(Ok(name)) => name,
            _ => {
                log::error!(
                    "Group name must be a string; Illegal name for group {} ignored",
                    group
                );
                return false;
            }
        };

        let target = match info.explicit_group {
            None => group - 1,
            Some(explicit) if group == 1 => explicit,
            Some(_) => {
                log::warn!(
                    "An explicit group was specified for the '{}' map, but it provides a name for a group other than Group1 ({}); Ignoring group name '{}'",
                    info.display_name(),
                    group,
                    name
                );
                return false;
            }
        } as usize;

        let atom = self.keymap.ctx.atoms.intern(&name);
        if target >= info.group_names.len() {
            info.group_names.resize(target + 1, None);
        }
        info.group_names[target] = Some(atom);
        true
    }
}
