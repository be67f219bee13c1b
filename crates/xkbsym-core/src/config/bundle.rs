// Xkbsym Config - Layout Bundles
// Parses a self-contained TOML description of keycodes, types and symbol units

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::expr_parser::{parse_action, parse_expr, parse_lhs, ExprParseError};
use crate::ast::{
    Expr, MergeMode, ModMapDef, Statement, SymbolsDef, VModDef, VarDef, XkbFile,
};
use crate::include::{parse_include, IncludeError, Unit, UnitLibrary};
use crate::keycodes::{KeyName, KeycodeTable};
use crate::keymap::{Context, Keymap};
use crate::types::{default_types, KeyType};

/// Bundle loading errors
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Invalid expression in unit {unit}: {source}")]
    Expr {
        unit: String,
        source: ExprParseError,
    },

    #[error("Invalid include in unit {unit}: {source}")]
    Include {
        unit: String,
        source: IncludeError,
    },

    #[error("Invalid merge mode: {0}")]
    InvalidMerge(String),

    #[error("Invalid key type {0}: must have at least one level")]
    InvalidType(String),

    #[error("Alias {alias} refers to unknown key {real}")]
    UnknownAlias { alias: String, real: String },
}

/// Bundle file structure (root TOML table)
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BundleToml {
    /// Include string compiled as the top-level unit
    pub root: String,

    /// Start from the built-in evdev keycodes
    #[serde(default)]
    pub evdev: bool,

    /// Key name to keycode
    #[serde(default)]
    pub keycodes: HashMap<String, u32>,

    /// Alias name to real key name
    #[serde(default)]
    pub aliases: HashMap<String, String>,

    /// Key types; the defaults are used when empty
    #[serde(default)]
    pub types: Vec<TypeToml>,

    /// Symbol units, addressed by file and map name
    #[serde(default)]
    pub units: Vec<UnitToml>,
}

/// Key type entry
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeToml {
    pub name: String,
    pub levels: u32,
}

/// One named map of a symbols file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitToml {
    pub file: String,
    pub map: Option<String>,
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub statements: Vec<StatementToml>,
}

/// Statement of a unit; the first key names the kind
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StatementToml {
    Include(IncludeToml),
    Key(KeyToml),
    Var(VarToml),
    ModMap(ModMapToml),
    VMod(VModToml),
}

/// `include = "pc+us(intl)"`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IncludeToml {
    pub include: String,
    pub merge: Option<String>,
}

/// `key = "<AD01>"` with its groups and fields
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyToml {
    pub key: String,
    pub merge: Option<String>,
    #[serde(rename = "type")]
    pub key_type: Option<String>,
    /// Keysyms per group, then per level
    #[serde(default)]
    pub symbols: Vec<Vec<LevelToml>>,
    /// Action calls per group, then per level
    #[serde(default)]
    pub actions: Vec<Vec<String>>,
    /// Other assignments such as `type[2]`, `repeat` or `vmods`
    #[serde(default)]
    pub fields: Vec<FieldToml>,
}

/// A level: one keysym name or several
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LevelToml {
    One(String),
    Many(Vec<String>),
}

/// `field = value` inside a key statement
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldToml {
    pub field: String,
    pub value: ValueToml,
}

/// `var = "name[1]"` at file scope
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VarToml {
    pub var: String,
    pub value: Option<ValueToml>,
    pub merge: Option<String>,
}

/// Right-hand side of an assignment.
///
/// Strings are parsed as expressions; a string literal is written with
/// inner quotes, as in `'"English (US)"'`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ValueToml {
    Bool(bool),
    Int(i64),
    Text(String),
}

/// `modifier_map = "Lock"` with its keys and keysyms
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModMapToml {
    pub modifier_map: String,
    pub keys: Vec<String>,
    pub merge: Option<String>,
}

/// `virtual_modifiers = "NumLock"` with an optional core mapping
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VModToml {
    pub virtual_modifiers: String,
    pub value: Option<String>,
    pub merge: Option<String>,
}

/// A loaded bundle
#[derive(Debug, Clone)]
pub struct Bundle {
    pub root: String,
    pub keycodes: KeycodeTable,
    /// Type names and level counts, in table order
    pub types: Vec<(String, u32)>,
    pub library: UnitLibrary,
}

impl Bundle {
    /// Load a bundle from a TOML file
    pub fn from_toml_path<P: AsRef<Path>>(path: P) -> Result<Self, BundleError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse a bundle from TOML text
    pub fn from_toml(content: &str) -> Result<Self, BundleError> {
        let toml_bundle: BundleToml =
            toml::from_str(content).map_err(|e| BundleError::TomlParse(e.to_string()))?;
        toml_bundle.to_bundle()
    }

    /// Build an empty keymap over the bundle's keycodes and types
    pub fn keymap(&self, verbosity: i32) -> Keymap {
        let mut ctx = Context::new(verbosity);
        let types = if self.types.is_empty() {
            default_types(&mut ctx.atoms)
        } else {
            self.types
                .iter()
                .map(|(name, levels)| KeyType {
                    name: ctx.atoms.intern(name),
                    num_levels: *levels,
                })
                .collect()
        };
        Keymap::new(ctx, self.keycodes.clone(), types)
    }

    /// A unit holding only an include of `root`, as a keymap's symbols
    /// section would
    pub fn root_file(&mut self, root: &str) -> Result<XkbFile, BundleError> {
        let stmt = parse_include(root, MergeMode::Override).map_err(|source| BundleError::Include {
            unit: root.to_string(),
            source,
        })?;
        Ok(XkbFile {
            id: self.library.next_file_id(),
            name: Some(root.to_string()),
            statements: vec![Statement::Include(stmt)],
        })
    }
}

impl BundleToml {
    fn to_bundle(&self) -> Result<Bundle, BundleError> {
        let mut keycodes = if self.evdev {
            KeycodeTable::evdev()
        } else {
            KeycodeTable::new()
        };
        for (name, code) in &self.keycodes {
            keycodes.add_key(KeyName::new(name), *code);
        }
        for (alias, real) in &self.aliases {
            let real_name = KeyName::new(real);
            if keycodes.find_key(real_name, false).is_none() {
                return Err(BundleError::UnknownAlias {
                    alias: alias.clone(),
                    real: real.clone(),
                });
            }
            keycodes.add_alias(KeyName::new(alias), real_name);
        }

        let mut types = Vec::with_capacity(self.types.len());
        for entry in &self.types {
            if entry.levels == 0 {
                return Err(BundleError::InvalidType(entry.name.clone()));
            }
            types.push((entry.name.clone(), entry.levels));
        }

        let mut library = UnitLibrary::new();
        for unit in &self.units {
            let unit_name = match &unit.map {
                Some(map) => format!("{}({})", unit.file, map),
                None => unit.file.clone(),
            };
            let statements = unit
                .statements
                .iter()
                .map(|stmt| stmt.to_statements(&unit_name))
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .flatten()
                .collect();
            library.add(Unit {
                file: unit.file.clone(),
                map: unit.map.clone(),
                default: unit.default,
                statements,
            });
        }

        log::debug!(
            "Loaded bundle: {} keycodes, {} units, root \"{}\"",
            keycodes.len(),
            library.len(),
            self.root
        );

        Ok(Bundle {
            root: self.root.clone(),
            keycodes,
            types,
            library,
        })
    }
}

fn parse_merge(merge: Option<&str>) -> Result<MergeMode, BundleError> {
    match merge {
        None => Ok(MergeMode::Default),
        Some(text) => text
            .parse()
            .map_err(|_| BundleError::InvalidMerge(text.to_string())),
    }
}

fn key_name_text(name: &str) -> &str {
    name.trim().trim_start_matches('<').trim_end_matches('>')
}

impl ValueToml {
    fn to_expr(&self) -> Result<Expr, ExprParseError> {
        match self {
            ValueToml::Bool(b) => Ok(Expr::Boolean(*b)),
            ValueToml::Int(v) => Ok(Expr::Integer(*v)),
            ValueToml::Text(text) => parse_expr(text),
        }
    }
}

impl StatementToml {
    fn to_statements(&self, unit: &str) -> Result<Vec<Statement>, BundleError> {
        let expr_err = |source: ExprParseError| BundleError::Expr {
            unit: unit.to_string(),
            source,
        };

        match self {
            StatementToml::Include(inc) => {
                let merge = parse_merge(inc.merge.as_deref())?;
                let stmt = parse_include(&inc.include, merge).map_err(|source| BundleError::Include {
                    unit: unit.to_string(),
                    source,
                })?;
                Ok(vec![Statement::Include(stmt)])
            }
            StatementToml::Key(key) => {
                let mut body = Vec::new();
                if let Some(key_type) = &key.key_type {
                    body.push(VarDef::new(
                        Some(Expr::ident("type")),
                        Some(Expr::String(key_type.clone())),
                    ));
                }
                for group in &key.symbols {
                    let levels = group
                        .iter()
                        .map(|level| match level {
                            LevelToml::One(name) => vec![name.clone()],
                            LevelToml::Many(names) => names.clone(),
                        })
                        .collect();
                    body.push(VarDef::new(None, Some(Expr::KeysymList(levels))));
                }
                for group in &key.actions {
                    let actions = group
                        .iter()
                        .map(|text| parse_action(text))
                        .collect::<Result<Vec<_>, _>>()
                        .map_err(expr_err)?;
                    body.push(VarDef::new(None, Some(Expr::ActionList(actions))));
                }
                for field in &key.fields {
                    let name = parse_lhs(&field.field).map_err(expr_err)?;
                    let value = field.value.to_expr().map_err(expr_err)?;
                    body.push(VarDef::new(Some(name), Some(value)));
                }

                Ok(vec![Statement::Symbols(SymbolsDef {
                    merge: parse_merge(key.merge.as_deref())?,
                    key_name: key_name_text(&key.key).to_string(),
                    body,
                })])
            }
            StatementToml::Var(var) => {
                let name = parse_lhs(&var.var).map_err(expr_err)?;
                let value = var
                    .value
                    .as_ref()
                    .map(ValueToml::to_expr)
                    .transpose()
                    .map_err(expr_err)?;
                let mut def = VarDef::new(Some(name), value);
                def.merge = parse_merge(var.merge.as_deref())?;
                Ok(vec![Statement::Var(def)])
            }
            StatementToml::ModMap(map) => {
                let keys = map
                    .keys
                    .iter()
                    .map(|item| {
                        let item = item.trim();
                        if item.starts_with('<') {
                            Ok(Expr::KeyName(key_name_text(item).to_string()))
                        } else {
                            parse_expr(item)
                        }
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(expr_err)?;
                Ok(vec![Statement::ModMap(ModMapDef {
                    merge: parse_merge(map.merge.as_deref())?,
                    modifier: map.modifier_map.clone(),
                    keys,
                })])
            }
            StatementToml::VMod(vmod) => {
                let merge = parse_merge(vmod.merge.as_deref())?;
                let value = vmod
                    .value
                    .as_deref()
                    .map(parse_expr)
                    .transpose()
                    .map_err(expr_err)?;
                // A list of names declares each one
                Ok(vmod
                    .virtual_modifiers
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(|name| {
                        Statement::VMod(VModDef {
                            merge,
                            name: name.to_string(),
                            value: value.clone(),
                        })
                    })
                    .collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &str = r#"
root = "us"

[keycodes]
AD01 = 24
CAPS = 66

[aliases]
LatQ = "AD01"

[[units]]
file = "us"
default = true
statements = [
    { virtual_modifiers = "NumLock" },
    { var = "name[1]", value = '"English (US)"' },
    { key = "<AD01>", symbols = [["q", "Q"]], fields = [{ field = "repeat", value = false }] },
    { key = "<CAPS>", symbols = [["Caps_Lock"]], actions = [["LockMods(modifiers=Lock)"]] },
    { modifier_map = "Lock", keys = ["<CAPS>", "Caps_Lock"] },
    { include = "extra(alt)", merge = "augment" },
]
"#;

    #[test]
    fn test_bundle_from_simple_toml() {
        let bundle = Bundle::from_toml(SIMPLE).unwrap();
        assert_eq!(bundle.root, "us");
        assert_eq!(bundle.keycodes.len(), 2);
        assert_eq!(
            bundle.keycodes.resolve_alias(KeyName::new("LatQ")),
            Some(KeyName::new("AD01"))
        );
        assert_eq!(bundle.library.len(), 1);
        assert!(bundle.types.is_empty());
    }

    #[test]
    fn test_statement_conversion() {
        let toml_bundle: BundleToml = toml::from_str(SIMPLE).unwrap();
        let stmts = &toml_bundle.units[0].statements;
        assert!(matches!(stmts[0], StatementToml::VMod(_)));
        assert!(matches!(stmts[1], StatementToml::Var(_)));
        assert!(matches!(stmts[2], StatementToml::Key(_)));
        assert!(matches!(stmts[4], StatementToml::ModMap(_)));
        assert!(matches!(stmts[5], StatementToml::Include(_)));

        let converted = stmts[2].to_statements("us").unwrap();
        let Statement::Symbols(def) = &converted[0] else {
            panic!("expected a key statement");
        };
        assert_eq!(def.key_name, "AD01");
        assert_eq!(def.body.len(), 2);
        assert_eq!(def.body[0].value, Some(Expr::keysyms(&["q", "Q"])));
        assert_eq!(def.body[1].value, Some(Expr::Boolean(false)));

        let include = stmts[5].to_statements("us").unwrap();
        assert_eq!(include[0].merge(), MergeMode::Augment);
    }

    #[test]
    fn test_bundle_keymap_uses_default_types() {
        let bundle = Bundle::from_toml(SIMPLE).unwrap();
        let keymap = bundle.keymap(0);
        assert_eq!(keymap.types.len(), 8);
        assert_eq!(keymap.keys.len(), 2);
        assert_eq!(keymap.ctx.verbosity(), 0);
    }

    #[test]
    fn test_bundle_root_file() {
        let mut bundle = Bundle::from_toml(SIMPLE).unwrap();
        let file = bundle.root_file("pc+us").unwrap();
        let Statement::Include(stmt) = &file.statements[0] else {
            panic!("expected an include");
        };
        assert_eq!(stmt.links.len(), 2);
        assert_eq!(stmt.links[1].merge, MergeMode::Override);
    }

    #[test]
    fn test_bundle_errors() {
        assert!(matches!(
            Bundle::from_toml("root = 1"),
            Err(BundleError::TomlParse(_))
        ));
        assert!(matches!(
            Bundle::from_toml("root = \"us\"\n[aliases]\nLatQ = \"AD01\"\n"),
            Err(BundleError::UnknownAlias { .. })
        ));
        assert!(matches!(
            Bundle::from_toml("root = \"us\"\n[[types]]\nname = \"NONE\"\nlevels = 0\n"),
            Err(BundleError::InvalidType(_))
        ));
        let bad_merge = "root = \"us\"\n[[units]]\nfile = \"us\"\nstatements = [{ include = \"pc\", merge = \"sideways\" }]\n";
        assert!(matches!(
            Bundle::from_toml(bad_merge),
            Err(BundleError::InvalidMerge(_))
        ));
    }
}
