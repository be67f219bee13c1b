// Xkbsym Symbols - Merging
// Combining group, key, modifier-map and unit builders under a merge policy

use std::cmp::max;
use std::mem;

use super::info::{
    GroupFields, GroupInfo, KeyFields, KeyInfo, LevelInfo, ModMapEntry, ModMapRef, SymbolsInfo,
};
use crate::ast::MergeMode;
use crate::keycodes::KeyName;
use crate::keymap::{Context, Keymap};
use crate::modifier::core_mod_name;

impl GroupInfo {
    /// Merge `from` into `self`; `from` is left empty.
    ///
    /// With `clobber`, values defined on both sides are taken from `from`.
    pub fn merge(
        &mut self,
        from: &mut GroupInfo,
        clobber: bool,
        report: bool,
        ctx: &Context,
        group: usize,
        key_name: KeyName,
    ) {
        match (self.type_name, from.type_name) {
            (_, None) => {}
            (None, Some(from_type)) => self.type_name = Some(from_type),
            (Some(into_type), Some(from_type)) if into_type != from_type => {
                let (used, ignored) = if clobber {
                    (from_type, into_type)
                } else {
                    (into_type, from_type)
                };
                if report {
                    log::warn!(
                        "Multiple definitions for group {} type of key {}; Using {}, ignoring {}",
                        group + 1,
                        key_name,
                        ctx.atoms.text(used),
                        ctx.atoms.text(ignored)
                    );
                }
                self.type_name = Some(used);
            }
            _ => {}
        }
        self.defined |= from.defined & GroupFields::TYPE;

        if from.levels.is_empty() {
            *from = GroupInfo::default();
            return;
        }

        if self.levels.is_empty() {
            let mut taken = mem::take(from);
            taken.type_name = self.type_name;
            taken.defined |= self.defined & GroupFields::TYPE;
            *self = taken;
            return;
        }

        // Actions, padding `self` with the levels only `from` has
        let num_levels = max(self.levels.len(), from.levels.len());
        for i in 0..from.levels.len() {
            if i >= self.levels.len() {
                let mut level = from.levels[i];
                level.num_syms = 0;
                level.sym_index = 0;
                self.levels.push(level);
                continue;
            }

            let into_act = self.levels[i].action;
            let from_act = from.levels[i].action;
            if !from_act.is_some() {
                continue;
            }
            if !into_act.is_some() {
                self.levels[i].action = from_act;
                continue;
            }

            let (used, ignored) = if clobber {
                (from_act, into_act)
            } else {
                (into_act, from_act)
            };
            if report && into_act != from_act {
                log::warn!(
                    "Multiple actions for level {}/group {} on key {}; Using {}, ignoring {}",
                    i + 1,
                    group + 1,
                    key_name,
                    used.action_type(),
                    ignored.action_type()
                );
            }
            self.levels[i].action = used;
        }
        self.defined |= from.defined & GroupFields::ACTS;

        // Keysyms: find out whether one side supplies every level
        let size_at = |levels: &[LevelInfo], i: usize| levels.get(i).map_or(0, |l| l.num_syms);
        let mut using_into = false;
        let mut using_from = false;
        for i in 0..num_levels {
            let into_size = self.levels[i].num_syms;
            let from_size = size_at(&from.levels, i);
            match (into_size, from_size) {
                (0, 0) => {}
                (0, _) => using_from = true,
                (_, 0) => using_into = true,
                _ if clobber => using_from = true,
                _ => using_into = true,
            }
        }

        if using_from && !using_into {
            self.syms = mem::take(&mut from.syms);
            for (into_level, from_level) in self.levels.iter_mut().zip(from.levels.iter()) {
                into_level.num_syms = from_level.num_syms;
                into_level.sym_index = from_level.sym_index;
            }
        } else if using_from {
            let mut syms = Vec::with_capacity(self.syms.len() + from.syms.len());
            for i in 0..num_levels {
                let into_size = self.levels[i].num_syms;
                let from_size = size_at(&from.levels, i);
                if into_size == 0 && from_size == 0 {
                    continue;
                }

                if into_size != 0 && from_size != 0 && report {
                    log::info!(
                        "Multiple symbols for group {}, level {} on key {}; Using {}, ignoring {}",
                        group + 1,
                        i + 1,
                        key_name,
                        if clobber { "from" } else { "to" },
                        if clobber { "to" } else { "from" }
                    );
                }

                let (source, level) = if into_size == 0 || (from_size != 0 && clobber) {
                    (&from.syms, from.levels[i])
                } else {
                    (&self.syms, self.levels[i])
                };
                let start = level.sym_index as usize;
                let span = source
                    .get(start..start + level.num_syms as usize)
                    .unwrap_or(&[]);
                self.levels[i].sym_index = syms.len() as u32;
                self.levels[i].num_syms = span.len() as u32;
                syms.extend_from_slice(span);
            }
            self.syms = syms;
        }
        self.defined |= from.defined & GroupFields::SYMS;

        *from = GroupInfo::default();
    }
}

/// Decide whether a key field is taken from the new definition
fn use_new_field(
    field: KeyFields,
    old: KeyFields,
    new: KeyFields,
    clobber: bool,
    report: bool,
    collide: &mut KeyFields,
) -> bool {
    if !old.contains(field) {
        return new.contains(field);
    }

    if new.contains(field) {
        if report {
            collide.insert(field);
        }
        if clobber {
            return true;
        }
    }

    false
}

impl KeyInfo {
    /// Merge `from` into `self` under `from.merge`; `from` is reset to a
    /// fresh key of `file_id`.
    pub fn merge(&mut self, from: &mut KeyInfo, ctx: &Context, file_id: u32) -> bool {
        if from.merge == MergeMode::Replace {
            *self = mem::replace(from, KeyInfo::new(file_id));
            return true;
        }

        let verbosity = ctx.verbosity();
        let clobber = from.merge != MergeMode::Augment;
        let report = verbosity > 9 || (self.file_id == from.file_id && verbosity > 0);

        let groups_in_both = self.groups.len().min(from.groups.len());
        for (i, (into, group)) in self
            .groups
            .iter_mut()
            .zip(from.groups.iter_mut())
            .enumerate()
        {
            into.merge(group, clobber, report, ctx, i, self.name);
        }
        // Groups only `from` has are moved over
        self.groups.extend(from.groups.drain(groups_in_both..));

        let mut collide = KeyFields::empty();
        if use_new_field(KeyFields::VMODMAP, self.defined, from.defined, clobber, report, &mut collide) {
            self.vmodmap = from.vmodmap;
            self.defined.insert(KeyFields::VMODMAP);
        }
        if use_new_field(KeyFields::REPEAT, self.defined, from.defined, clobber, report, &mut collide) {
            self.repeat = from.repeat;
            self.defined.insert(KeyFields::REPEAT);
        }
        if use_new_field(KeyFields::TYPE_DFLT, self.defined, from.defined, clobber, report, &mut collide) {
            self.default_type = from.default_type;
            self.defined.insert(KeyFields::TYPE_DFLT);
        }
        if use_new_field(KeyFields::GROUP_INFO, self.defined, from.defined, clobber, report, &mut collide) {
            self.out_of_range = from.out_of_range;
            self.defined.insert(KeyFields::GROUP_INFO);
        }

        if !collide.is_empty() {
            log::warn!(
                "Symbol map for key {} redefined; Using {} definition for conflicting fields",
                self.name,
                if clobber { "last" } else { "first" }
            );
        }

        *from = KeyInfo::new(file_id);
        true
    }
}

impl SymbolsInfo {
    /// Insert a key, merging with an existing key of the same canonical name
    pub fn add_key_symbols(&mut self, keymap: &Keymap, keyi: &mut KeyInfo) -> bool {
        // Aliases never enter the key list, so comparing names is enough
        if let Some(real) = keymap.keycodes.resolve_alias(keyi.name) {
            keyi.name = real;
        }

        let file_id = self.file_id;
        if let Some(existing) = self.keys.iter_mut().find(|k| k.name == keyi.name) {
            return existing.merge(keyi, &keymap.ctx, file_id);
        }

        self.keys.push(mem::replace(keyi, KeyInfo::new(file_id)));
        true
    }

    /// Add a modifier-map entry, resolving conflicts on the same reference
    pub fn add_mod_map_entry(&mut self, entry: ModMapEntry) -> bool {
        let clobber = entry.merge != MergeMode::Augment;

        let Some(index) = self
            .mod_maps
            .iter()
            .position(|mm| mm.reference == entry.reference)
        else {
            self.mod_maps.push(entry);
            return true;
        };
        let existing = &mut self.mod_maps[index];

        if existing.modifier != entry.modifier {
            let (used, ignored) = if clobber {
                (entry.modifier, existing.modifier)
            } else {
                (existing.modifier, entry.modifier)
            };
            match entry.reference {
                ModMapRef::Keysym(sym) => log::warn!(
                    "{} added to symbol map for multiple modifiers; Using {}, ignoring {}",
                    sym,
                    core_mod_name(used),
                    core_mod_name(ignored)
                ),
                ModMapRef::KeyName(name) => log::warn!(
                    "Key {} added to map for multiple modifiers; Using {}, ignoring {}",
                    name,
                    core_mod_name(used),
                    core_mod_name(ignored)
                ),
            }
            existing.modifier = used;
        }
        true
    }

    /// Fold a compiled included unit into this one.
    ///
    /// A unit carrying errors only contributes its error count.
    pub fn merge_included(&mut self, mut from: SymbolsInfo, merge: MergeMode, keymap: &Keymap) {
        if from.error_count > 0 {
            self.error_count += from.error_count;
            return;
        }

        if self.name.is_none() {
            self.name = from.name.take();
        }

        let names_in_both = self.group_names.len().min(from.group_names.len());
        for i in 0..names_in_both {
            let Some(name) = from.group_names[i] else {
                continue;
            };
            if merge == MergeMode::Augment && self.group_names[i].is_some() {
                continue;
            }
            self.group_names[i] = Some(name);
        }
        self.group_names
            .extend_from_slice(&from.group_names[names_in_both..]);

        for mut keyi in mem::take(&mut from.keys) {
            keyi.merge = keyi.merge.or(merge);
            if !self.add_key_symbols(keymap, &mut keyi) {
                self.error_count += 1;
            }
        }

        for mut entry in mem::take(&mut from.mod_maps) {
            entry.merge = entry.merge.or(merge);
            if !self.add_mod_map_entry(entry) {
                self.error_count += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Action, ModAction};
    use crate::keycodes::KeycodeTable;
    use crate::keysym::Keysym;
    use crate::symbols::info::KeyRepeat;
    use crate::types::default_types;

    fn group(syms: &[u32]) -> GroupInfo {
        GroupInfo {
            defined: GroupFields::SYMS,
            syms: syms.iter().map(|s| Keysym(*s)).collect(),
            levels: (0..syms.len())
                .map(|i| LevelInfo {
                    num_syms: 1,
                    sym_index: i as u32,
                    action: Action::NoAction,
                })
                .collect(),
            type_name: None,
        }
    }

    fn key(name: &str, merge: MergeMode, syms: &[u32]) -> KeyInfo {
        let mut key = KeyInfo::new(1);
        key.name = KeyName::new(name);
        key.merge = merge;
        key.groups.push(group(syms));
        key
    }

    fn keymap() -> Keymap {
        let mut ctx = Context::new(0);
        let types = default_types(&mut ctx.atoms);
        Keymap::new(ctx, KeycodeTable::evdev(), types)
    }

    #[test]
    fn test_group_merge_into_empty_moves_from() {
        let ctx = Context::new(0);
        let mut into = GroupInfo::default();
        let mut from = group(&[0x61, 0x41]);
        into.merge(&mut from, true, false, &ctx, 0, KeyName::new("AD01"));
        assert_eq!(into.level_syms(1), &[Keysym(0x41)]);
        assert_eq!(from, GroupInfo::default());
    }

    #[test]
    fn test_group_merge_into_empty_keeps_only_type_bit() {
        let mut ctx = Context::new(0);
        let two_level = ctx.atoms.intern("TWO_LEVEL");

        let mut into = GroupInfo::default();
        into.defined.insert(GroupFields::ACTS);
        into.defined.insert(GroupFields::TYPE);
        into.type_name = Some(two_level);
        let mut from = group(&[0x61, 0x41]);
        into.merge(&mut from, true, false, &ctx, 0, KeyName::new("AD01"));

        assert!(into.defined.contains(GroupFields::SYMS));
        assert!(into.defined.contains(GroupFields::TYPE));
        assert!(!into.defined.contains(GroupFields::ACTS));
        assert_eq!(into.type_name, Some(two_level));
    }

    #[test]
    fn test_group_merge_clobber_and_augment() {
        let ctx = Context::new(0);
        let name = KeyName::new("AD01");

        let mut into = group(&[0x61, 0x41]);
        let mut from = group(&[0x71, 0x51]);
        into.merge(&mut from, true, false, &ctx, 0, name);
        assert_eq!(into.level_syms(0), &[Keysym(0x71)]);

        let mut into = group(&[0x61, 0x41]);
        let mut from = group(&[0x71, 0x51]);
        into.merge(&mut from, false, false, &ctx, 0, name);
        assert_eq!(into.level_syms(0), &[Keysym(0x61)]);
        assert_eq!(into.level_syms(1), &[Keysym(0x41)]);
    }

    #[test]
    fn test_group_merge_mixed_sources_builds_new_buffer() {
        let ctx = Context::new(0);
        let mut into = group(&[0x61]);
        let mut from = group(&[0x71, 0x51, 0x32]);
        // Augment: level 0 stays from `into`, levels 1 and 2 come from `from`
        into.merge(&mut from, false, false, &ctx, 0, KeyName::new("AD01"));
        assert_eq!(into.levels.len(), 3);
        assert_eq!(into.level_syms(0), &[Keysym(0x61)]);
        assert_eq!(into.level_syms(1), &[Keysym(0x51)]);
        assert_eq!(into.level_syms(2), &[Keysym(0x32)]);
        assert_eq!(into.syms.len(), 3);
    }

    #[test]
    fn test_group_merge_actions() {
        let ctx = Context::new(0);
        let shift = Action::SetMods(ModAction {
            mods: 0x01,
            ..Default::default()
        });
        let mut into = group(&[0x61]);
        let mut from = group(&[0x61]);
        from.levels[0].action = shift;
        from.defined.insert(GroupFields::ACTS);
        into.merge(&mut from, false, false, &ctx, 0, KeyName::new("AD01"));
        assert_eq!(into.levels[0].action, shift);
        assert!(into.defined.contains(GroupFields::ACTS));
    }

    #[test]
    fn test_group_merge_type() {
        let mut ctx = Context::new(0);
        let alpha = ctx.atoms.intern("ALPHABETIC");
        let two = ctx.atoms.intern("TWO_LEVEL");

        let mut into = group(&[0x61]);
        into.type_name = Some(alpha);
        let mut from = group(&[0x62]);
        from.type_name = Some(two);
        from.defined.insert(GroupFields::TYPE);
        into.merge(&mut from, false, false, &ctx, 0, KeyName::new("AD01"));
        assert_eq!(into.type_name, Some(alpha));
        assert!(into.defined.contains(GroupFields::TYPE));
    }

    #[test]
    fn test_key_merge_replace_discards_into() {
        let ctx = Context::new(0);
        let mut into = key("AD01", MergeMode::Default, &[0x61, 0x41]);
        into.groups.push(group(&[0x71]));
        into.repeat = KeyRepeat::No;
        into.defined.insert(KeyFields::REPEAT);

        let mut from = key("AD01", MergeMode::Replace, &[0x62]);
        into.merge(&mut from, &ctx, 1);
        assert_eq!(into.groups.len(), 1);
        assert_eq!(into.repeat, KeyRepeat::Undefined);
        assert!(!into.defined.contains(KeyFields::REPEAT));
        assert_eq!(from.name, KeyName::new("*"));
    }

    #[test]
    fn test_key_merge_augment_keeps_fields() {
        let ctx = Context::new(0);
        let mut into = key("AD01", MergeMode::Default, &[0x61]);
        into.vmodmap = 0x1;
        into.defined.insert(KeyFields::VMODMAP);

        let mut from = key("AD01", MergeMode::Augment, &[0x62]);
        from.vmodmap = 0x2;
        from.defined.insert(KeyFields::VMODMAP);
        from.repeat = KeyRepeat::No;
        from.defined.insert(KeyFields::REPEAT);
        from.groups.push(group(&[0x63]));

        into.merge(&mut from, &ctx, 1);
        assert_eq!(into.vmodmap, 0x1);
        assert_eq!(into.repeat, KeyRepeat::No);
        assert_eq!(into.groups.len(), 2);
        assert_eq!(into.groups[0].level_syms(0), &[Keysym(0x61)]);
        assert_eq!(into.groups[1].level_syms(0), &[Keysym(0x63)]);
        assert!(from.groups.is_empty());
    }

    #[test]
    fn test_add_key_symbols_resolves_aliases() {
        let keymap = keymap();
        let mut info = SymbolsInfo::new(1);
        let mut first = key("AD01", MergeMode::Default, &[0x61]);
        let mut second = key("LatQ", MergeMode::Default, &[0x71]);
        assert!(info.add_key_symbols(&keymap, &mut first));
        assert!(info.add_key_symbols(&keymap, &mut second));
        assert_eq!(info.keys.len(), 1);
        assert_eq!(info.keys[0].name, KeyName::new("AD01"));
        assert_eq!(info.keys[0].groups[0].level_syms(0), &[Keysym(0x71)]);
    }

    #[test]
    fn test_mod_map_conflicts() {
        let mut info = SymbolsInfo::new(1);
        let caps = ModMapRef::Keysym(Keysym(0xffe5));
        let entry = |merge, modifier| ModMapEntry {
            merge,
            modifier,
            reference: caps,
        };
        assert!(info.add_mod_map_entry(entry(MergeMode::Default, 1)));
        assert!(info.add_mod_map_entry(entry(MergeMode::Augment, 2)));
        assert_eq!(info.mod_maps.len(), 1);
        assert_eq!(info.mod_maps[0].modifier, 1);
        assert!(info.add_mod_map_entry(entry(MergeMode::Override, 2)));
        assert_eq!(info.mod_maps[0].modifier, 2);
    }

    #[test]
    fn test_merge_included_poisoned() {
        let keymap = keymap();
        let mut into = SymbolsInfo::new(1);
        let mut from = SymbolsInfo::new(2);
        from.error_count = 3;
        from.keys.push(key("AD01", MergeMode::Default, &[0x61]));
        into.merge_included(from, MergeMode::Override, &keymap);
        assert_eq!(into.error_count, 3);
        assert!(into.keys.is_empty());
    }

    #[test]
    fn test_merge_included_group_names() {
        let mut keymap = keymap();
        let latin = keymap.ctx.atoms.intern("Latin");
        let greek = keymap.ctx.atoms.intern("Greek");

        let mut into = SymbolsInfo::new(1);
        into.group_names = vec![Some(latin)];
        let mut from = SymbolsInfo::new(2);
        from.name = Some("gr".to_string());
        from.group_names = vec![Some(greek), Some(greek)];

        into.merge_included(from.clone(), MergeMode::Augment, &keymap);
        assert_eq!(into.group_names, vec![Some(latin), Some(greek)]);
        assert_eq!(into.name.as_deref(), Some("gr"));

        into.merge_included(from, MergeMode::Override, &keymap);
        assert_eq!(into.group_names, vec![Some(greek), Some(greek)]);
    }
}
