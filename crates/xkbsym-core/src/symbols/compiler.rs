// Xkbsym Symbols - Statement Compiler
// Walks the statements of a unit and its includes into a SymbolsInfo

use super::finalize::copy_symbols_to_keymap;
use super::info::{KeyInfo, ModMapEntry, ModMapRef, SymbolsInfo};
use crate::action::ActionsInfo;
use crate::ast::{Expr, IncludeStmt, MergeMode, ModMapDef, Statement, SymbolsDef, VModDef, VarDef, XkbFile};
use crate::expr::{resolve_keysym, resolve_lhs};
use crate::include::{IncludeError, IncludeResolver};
use crate::keycodes::KeyName;
use crate::keymap::{Keymap, INCLUDE_PENALTY, MAX_ERRORS, NUM_GROUPS};
use crate::modifier::ModIndex;
use crate::settings::DEFAULT_MAX_INCLUDE_DEPTH;

/// Outcome of a failed symbols compilation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("no keys defined in symbols section")]
    NoKeys,

    #[error("failed to compile symbols section: {0} errors")]
    Errors(u32),
}

/// Compiles one symbols unit, following its includes, into a keymap
pub struct SymbolsCompiler<'a> {
    pub(super) keymap: &'a mut Keymap,
    includes: &'a mut dyn IncludeResolver,
    pub(super) actions: ActionsInfo,
    depth: usize,
    max_depth: usize,
}

impl<'a> SymbolsCompiler<'a> {
    pub fn new(keymap: &'a mut Keymap, includes: &'a mut dyn IncludeResolver) -> Self {
        Self {
            keymap,
            includes,
            actions: ActionsInfo::new(),
            depth: 0,
            max_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }

    /// Limit how deeply includes may nest
    pub fn with_max_include_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Compile `file` and commit the result to the keymap.
    ///
    /// Nothing is committed when the unit defines no keys or any error
    /// was counted.
    pub fn compile(mut self, file: &XkbFile, merge: MergeMode) -> Result<(), CompileError> {
        let saved_vmods = self.keymap.vmods.clone();

        let mut info = SymbolsInfo::new(file.id);
        info.dflt.merge = merge;
        self.handle_symbols_file(&mut info, file, merge);

        let result = if info.keys.is_empty() {
            Err(CompileError::NoKeys)
        } else if info.error_count != 0 {
            Err(CompileError::Errors(info.error_count))
        } else {
            Ok(())
        };

        match result {
            Ok(()) => {
                copy_symbols_to_keymap(self.keymap, info);
                Ok(())
            }
            Err(err) => {
                self.keymap.vmods = saved_vmods;
                log::error!("{}", err);
                Err(err)
            }
        }
    }

    /// Process every statement of a unit, abandoning it after too many errors
    pub fn handle_symbols_file(&mut self, info: &mut SymbolsInfo, file: &XkbFile, merge: MergeMode) {
        info.name = file.name.clone();

        for stmt in &file.statements {
            let ok = match stmt {
                Statement::Include(include) => self.handle_include(info, include),
                Statement::Symbols(def) => self.handle_symbols_def(info, def),
                Statement::Var(def) => self.handle_global_var(info, def),
                Statement::VMod(def) => self.handle_vmod_def(def, merge),
                Statement::ModMap(def) => self.handle_mod_map_def(info, def),
            };

            if !ok {
                info.error_count += 1;
            }

            if info.error_count > MAX_ERRORS {
                log::error!("Abandoning symbols file \"{}\"", info.display_name());
                break;
            }
        }
    }

    /// Compile every link of an include chain and fold the result into `info`
    pub fn handle_include(&mut self, info: &mut SymbolsInfo, stmt: &IncludeStmt) -> bool {
        if self.depth >= self.max_depth {
            log::error!(
                "{}; Ignoring include \"{}\"",
                IncludeError::TooDeep(self.max_depth),
                stmt.stmt
            );
            info.error_count += INCLUDE_PENALTY;
            return false;
        }

        let mut included = SymbolsInfo::new(info.file_id);
        included.name = Some(stmt.stmt.clone());

        for link in &stmt.links {
            let file = match self.includes.resolve(link) {
                Ok(file) => file,
                Err(err) => {
                    log::error!("Error interpreting include file \"{}\": {}", stmt.stmt, err);
                    info.error_count += INCLUDE_PENALTY;
                    return false;
                }
            };

            let mut next = SymbolsInfo::new(file.id);
            next.explicit_group = match link.modifier.as_deref() {
                None => info.explicit_group,
                Some(text) => match text.trim().parse::<u32>() {
                    Ok(group) if (1..=NUM_GROUPS as u32).contains(&group) => Some(group - 1),
                    _ => {
                        log::error!(
                            "Cannot set explicit group to {} - must be between 1..{}; Ignoring group number",
                            text,
                            NUM_GROUPS
                        );
                        info.explicit_group
                    }
                },
            };

            self.depth += 1;
            self.handle_symbols_file(&mut next, &file, MergeMode::Override);
            self.depth -= 1;

            included.merge_included(next, link.merge, &*self.keymap);
        }

        info.merge_included(included, stmt.merge, &*self.keymap);
        info.error_count == 0
    }

    /// Handle `key <NAME> { ... };`
    pub fn handle_symbols_def(&mut self, info: &mut SymbolsInfo, def: &SymbolsDef) -> bool {
        let mut keyi = info.dflt.clone();
        keyi.merge = def.merge;
        keyi.name = KeyName::new(&def.key_name);

        if !self.handle_symbols_body(info, &def.body, &mut keyi) {
            return false;
        }

        if !set_explicit_group(info, &mut keyi) {
            return false;
        }

        info.add_key_symbols(&*self.keymap, &mut keyi)
    }

    /// Apply each assignment of a key statement's body.
    ///
    /// All assignments are attempted; the result is false if any failed.
    pub fn handle_symbols_body(&mut self, info: &SymbolsInfo, body: &[VarDef], keyi: &mut KeyInfo) -> bool {
        let mut ok = true;

        for def in body {
            if let Some(Expr::FieldRef { .. }) = def.name {
                log::error!(
                    "Cannot set a global default value from within a key statement; Move statements to the global file scope"
                );
                continue;
            }

            let accepted = match &def.name {
                None => {
                    let field = match def.value {
                        None | Some(Expr::KeysymList(_)) => "symbols",
                        Some(_) => "actions",
                    };
                    self.set_symbols_field(&info.group_names, keyi, field, None, def.value.as_ref())
                }
                Some(name) => match resolve_lhs(name) {
                    Ok(lhs) => self.set_symbols_field(
                        &info.group_names,
                        keyi,
                        lhs.field,
                        lhs.index,
                        def.value.as_ref(),
                    ),
                    Err(err) => {
                        log::error!("Illegal key field in {}: {}", keyi.name, err);
                        false
                    }
                },
            };
            ok &= accepted;
        }

        ok
    }

    /// Handle a file-scope assignment
    pub fn handle_global_var(&mut self, info: &mut SymbolsInfo, def: &VarDef) -> bool {
        let Some(name) = &def.name else {
            log::error!("Missing name in global assignment; Ignored");
            return false;
        };
        let lhs = match resolve_lhs(name) {
            Ok(lhs) => lhs,
            Err(err) => {
                log::error!("Illegal global assignment: {}", err);
                return false;
            }
        };

        match lhs.element {
            Some(element) if element.eq_ignore_ascii_case("key") => {
                return self.set_symbols_field(
                    &info.group_names,
                    &mut info.dflt,
                    lhs.field,
                    lhs.index,
                    def.value.as_ref(),
                );
            }
            None => {
                let field = lhs.field.to_ascii_lowercase();
                match field.as_str() {
                    "name" | "groupname" => {
                        return self.set_group_name(info, lhs.index, def.value.as_ref());
                    }
                    "groupswrap" | "wrapgroups" => {
                        log::error!("Global \"groupswrap\" not supported; Ignored");
                        return true;
                    }
                    "groupsclamp" | "clampgroups" => {
                        log::error!("Global \"groupsclamp\" not supported; Ignored");
                        return true;
                    }
                    "groupsredirect" | "redirectgroups" => {
                        log::error!("Global \"groupsredirect\" not supported; Ignored");
                        return true;
                    }
                    "allownone" => {
                        log::error!("Radio groups not supported; Ignoring \"allownone\" specification");
                        return true;
                    }
                    _ => {}
                }
            }
            Some(_) => {}
        }

        let Some(element) = lhs.element else {
            log::error!("Unknown global field {}; Assignment ignored", lhs.field);
            return false;
        };
        let Some(value) = &def.value else {
            log::error!("Missing value for {}.{}; Assignment ignored", element, lhs.field);
            return false;
        };

        match self
            .actions
            .set_action_field(element, lhs.field, lhs.index, value, &self.keymap.vmods)
        {
            Ok(()) => true,
            Err(err) => {
                log::error!("{}", err);
                false
            }
        }
    }

    fn handle_vmod_def(&mut self, def: &VModDef, merge: MergeMode) -> bool {
        let mut def = def.clone();
        def.merge = def.merge.or(merge);
        match self.keymap.vmods.declare(&def) {
            Ok(_) => true,
            Err(err) => {
                log::error!("{}", err);
                false
            }
        }
    }

    /// Handle `modifier_map Mod { ... };`
    pub fn handle_mod_map_def(&mut self, info: &mut SymbolsInfo, def: &ModMapDef) -> bool {
        let Some(modifier) = ModIndex::from_name(&def.modifier) else {
            log::error!(
                "Illegal modifier map definition; Ignoring map for non-modifier \"{}\"",
                def.modifier
            );
            return false;
        };

        let mut ok = true;
        for item in &def.keys {
            let reference = match item {
                Expr::KeyName(name) => ModMapRef::KeyName(KeyName::new(name)),
                other => match resolve_keysym(other) {
                    Ok(sym) => ModMapRef::Keysym(sym),
                    Err(_) => {
                        log::error!(
                            "Modmap entries may contain only key names or keysyms; Illegal definition for {} modifier ignored",
                            modifier
                        );
                        continue;
                    }
                },
            };

            ok &= info.add_mod_map_entry(ModMapEntry {
                merge: def.merge,
                modifier: modifier.index(),
                reference,
            });
        }
        ok
    }
}

/// Move a key's first group to the unit's explicit group.
///
/// Every other group of the key is dropped.
pub fn set_explicit_group(info: &SymbolsInfo, keyi: &mut KeyInfo) -> bool {
    let Some(explicit) = info.explicit_group else {
        return true;
    };
    let explicit = explicit as usize;

    if keyi.groups.iter().skip(1).any(|g| !g.defined.is_empty()) {
        log::warn!(
            "For the map {} an explicit group specified, but key {} has more than one group defined; All groups except first one will be ignored",
            info.display_name(),
            keyi.name
        );
    }

    keyi.groups.truncate(1);
    keyi.ensure_group(explicit);
    keyi.groups.swap(0, explicit);
    true
}

/// Compile a symbols unit into `keymap`, resolving includes through `includes`
pub fn compile_symbols(
    file: &XkbFile,
    keymap: &mut Keymap,
    merge: MergeMode,
    includes: &mut dyn IncludeResolver,
) -> Result<(), CompileError> {
    SymbolsCompiler::new(keymap, includes).compile(file, merge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::IncludeLink;
    use crate::include::{Unit, UnitLibrary};
    use crate::keycodes::KeycodeTable;
    use crate::keymap::Context;
    use crate::keysym::Keysym;
    use crate::symbols::info::GroupFields;
    use crate::types::default_types;

    fn keymap() -> Keymap {
        let mut ctx = Context::new(0);
        let types = default_types(&mut ctx.atoms);
        Keymap::new(ctx, KeycodeTable::evdev(), types)
    }

    fn key_stmt(name: &str, merge: MergeMode, syms: &[&str]) -> Statement {
        Statement::Symbols(SymbolsDef {
            merge,
            key_name: name.to_string(),
            body: vec![VarDef::new(None, Some(Expr::keysyms(syms)))],
        })
    }

    fn file(statements: Vec<Statement>) -> XkbFile {
        XkbFile {
            id: 1,
            name: Some("test".to_string()),
            statements,
        }
    }

    #[test]
    fn test_handle_symbols_def_defines_key() {
        let mut keymap = keymap();
        let mut library = UnitLibrary::new();
        let mut compiler = SymbolsCompiler::new(&mut keymap, &mut library);
        let mut info = SymbolsInfo::new(1);

        compiler.handle_symbols_file(
            &mut info,
            &file(vec![key_stmt("AD01", MergeMode::Default, &["q", "Q"])]),
            MergeMode::Override,
        );
        assert_eq!(info.error_count, 0);
        let key = info.find_key(KeyName::new("AD01")).unwrap();
        assert_eq!(key.groups[0].level_syms(1), &[Keysym(0x51)]);
    }

    #[test]
    fn test_unknown_field_discards_key() {
        let mut keymap = keymap();
        let mut library = UnitLibrary::new();
        let mut compiler = SymbolsCompiler::new(&mut keymap, &mut library);
        let mut info = SymbolsInfo::new(1);

        let stmt = Statement::Symbols(SymbolsDef {
            merge: MergeMode::Default,
            key_name: "AD01".to_string(),
            body: vec![
                VarDef::new(None, Some(Expr::keysyms(&["q"]))),
                VarDef::new(Some(Expr::ident("bogus")), Some(Expr::int(1))),
            ],
        });
        compiler.handle_symbols_file(&mut info, &file(vec![stmt]), MergeMode::Override);
        assert_eq!(info.error_count, 1);
        assert!(info.keys.is_empty());
    }

    #[test]
    fn test_global_key_defaults_apply() {
        let mut keymap = keymap();
        let mut library = UnitLibrary::new();
        let mut compiler = SymbolsCompiler::new(&mut keymap, &mut library);
        let mut info = SymbolsInfo::new(1);

        let dflt = Statement::Var(VarDef::new(
            Some(Expr::FieldRef {
                element: "key".to_string(),
                field: "repeat".to_string(),
            }),
            Some(Expr::Boolean(false)),
        ));
        compiler.handle_symbols_file(
            &mut info,
            &file(vec![dflt, key_stmt("AC01", MergeMode::Default, &["a"])]),
            MergeMode::Override,
        );
        assert_eq!(info.error_count, 0);
        let key = info.find_key(KeyName::new("AC01")).unwrap();
        assert_eq!(key.repeat, crate::symbols::info::KeyRepeat::No);
    }

    #[test]
    fn test_mod_map_rejects_non_core_modifier() {
        let mut keymap = keymap();
        let mut library = UnitLibrary::new();
        let mut compiler = SymbolsCompiler::new(&mut keymap, &mut library);
        let mut info = SymbolsInfo::new(1);

        let bad = ModMapDef {
            merge: MergeMode::Default,
            modifier: "Hyper".to_string(),
            keys: vec![Expr::KeyName("CAPS".to_string())],
        };
        assert!(!compiler.handle_mod_map_def(&mut info, &bad));

        let good = ModMapDef {
            merge: MergeMode::Default,
            modifier: "Lock".to_string(),
            keys: vec![Expr::KeyName("CAPS".to_string()), Expr::ident("Caps_Lock"), Expr::int(-3)],
        };
        assert!(compiler.handle_mod_map_def(&mut info, &good));
        assert_eq!(info.mod_maps.len(), 2);
    }

    #[test]
    fn test_include_missing_file_penalty() {
        let mut keymap = keymap();
        let mut library = UnitLibrary::new();
        let mut compiler = SymbolsCompiler::new(&mut keymap, &mut library);
        let mut info = SymbolsInfo::new(1);

        let include = IncludeStmt {
            merge: MergeMode::Default,
            stmt: "nowhere".to_string(),
            links: vec![IncludeLink {
                file: "nowhere".to_string(),
                map: None,
                modifier: None,
                merge: MergeMode::Default,
            }],
        };
        assert!(!compiler.handle_include(&mut info, &include));
        assert_eq!(info.error_count, INCLUDE_PENALTY);
    }

    #[test]
    fn test_include_explicit_group() {
        let mut keymap = keymap();
        let mut library = UnitLibrary::new();
        library.add(Unit {
            file: "ru".to_string(),
            map: None,
            default: true,
            statements: vec![key_stmt("AD01", MergeMode::Default, &["q"])],
        });
        let mut compiler = SymbolsCompiler::new(&mut keymap, &mut library);
        let mut info = SymbolsInfo::new(1);

        let include = IncludeStmt {
            merge: MergeMode::Default,
            stmt: "ru:2".to_string(),
            links: vec![IncludeLink {
                file: "ru".to_string(),
                map: None,
                modifier: Some("2".to_string()),
                merge: MergeMode::Default,
            }],
        };
        let ok = compiler.handle_include(&mut info, &include);
        assert!(ok);
        let key = info.find_key(KeyName::new("AD01")).unwrap();
        assert_eq!(key.groups.len(), 2);
        assert!(key.groups[0].defined.is_empty());
        assert!(key.groups[1].defined.contains(GroupFields::SYMS));
    }

    #[test]
    fn test_include_depth_guard() {
        let mut keymap = keymap();
        let mut library = UnitLibrary::new();
        let looping = IncludeStmt {
            merge: MergeMode::Default,
            stmt: "loop".to_string(),
            links: vec![IncludeLink {
                file: "loop".to_string(),
                map: None,
                modifier: None,
                merge: MergeMode::Default,
            }],
        };
        library.add(Unit {
            file: "loop".to_string(),
            map: None,
            default: true,
            statements: vec![Statement::Include(looping.clone())],
        });

        let mut compiler = SymbolsCompiler::new(&mut keymap, &mut library).with_max_include_depth(3);
        let mut info = SymbolsInfo::new(1);
        assert!(!compiler.handle_include(&mut info, &looping));
        assert!(info.error_count >= INCLUDE_PENALTY);
    }

    #[test]
    fn test_set_explicit_group_moves_first_group() {
        let mut info = SymbolsInfo::new(1);
        info.explicit_group = Some(2);
        let mut key = KeyInfo::new(1);
        key.ensure_group(1);
        key.groups[0].defined.insert(GroupFields::SYMS);
        key.groups[1].defined.insert(GroupFields::SYMS);

        assert!(set_explicit_group(&info, &mut key));
        assert_eq!(key.groups.len(), 3);
        assert!(key.groups[0].defined.is_empty());
        assert!(key.groups[1].defined.is_empty());
        assert!(key.groups[2].defined.contains(GroupFields::SYMS));
    }

    #[test]
    fn test_set_explicit_first_group_drops_others() {
        let mut info = SymbolsInfo::new(1);
        info.explicit_group = Some(0);
        let mut key = KeyInfo::new(1);
        key.ensure_group(1);
        key.groups[0].defined.insert(GroupFields::SYMS);
        key.groups[1].defined.insert(GroupFields::SYMS);

        assert!(set_explicit_group(&info, &mut key));
        assert_eq!(key.groups.len(), 1);
        assert!(key.groups[0].defined.contains(GroupFields::SYMS));
    }

    #[test]
    fn test_compile_without_keys_fails() {
        let mut keymap = keymap();
        let mut library = UnitLibrary::new();
        let result = compile_symbols(&file(Vec::new()), &mut keymap, MergeMode::Override, &mut library);
        assert_eq!(result, Err(CompileError::NoKeys));
        assert!(keymap.symbols_section_name.is_none());
    }
}
