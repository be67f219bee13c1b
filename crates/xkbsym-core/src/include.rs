// Xkbsym Includes
// Include-string parsing and resolution of included units

use std::sync::OnceLock;

use regex::Regex;

use crate::ast::{IncludeLink, IncludeStmt, MergeMode, Statement, XkbFile};

/// Errors that can occur while resolving an include
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IncludeError {
    #[error("illegal include statement \"{0}\"")]
    Malformed(String),

    #[error("can't find file \"{0}\" for symbols include")]
    FileNotFound(String),

    #[error("no map \"{map}\" in file \"{file}\"")]
    MapNotFound { file: String, map: String },

    #[error("exceeded maximum include depth ({0})")]
    TooDeep(usize),
}

fn component_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([^()+|:]+)(?:\(([^()+|:]+)\))?(?::([^()+|:]+))?$").ok())
        .as_ref()
}

/// Parse an include string such as `pc+us(intl):2|de`.
///
/// `+` joins a link with override semantics and `|` with augment
/// semantics; the first link takes the statement's own merge mode.
pub fn parse_include(stmt: &str, merge: MergeMode) -> Result<IncludeStmt, IncludeError> {
    let trimmed = stmt.trim();
    if trimmed.is_empty() {
        return Err(IncludeError::Malformed(stmt.to_string()));
    }

    let mut links = Vec::new();
    let mut link_merge = merge;
    let mut rest = trimmed;

    loop {
        let end = rest.find(['+', '|']).unwrap_or(rest.len());
        let component = &rest[..end];
        let caps = component_regex()
            .and_then(|re| re.captures(component))
            .ok_or_else(|| IncludeError::Malformed(stmt.to_string()))?;

        links.push(IncludeLink {
            file: caps[1].to_string(),
            map: caps.get(2).map(|m| m.as_str().to_string()),
            modifier: caps.get(3).map(|m| m.as_str().to_string()),
            merge: link_merge,
        });

        if end == rest.len() {
            break;
        }
        link_merge = if rest[end..].starts_with('|') {
            MergeMode::Augment
        } else {
            MergeMode::Override
        };
        rest = &rest[end + 1..];
    }

    Ok(IncludeStmt {
        merge,
        stmt: stmt.to_string(),
        links,
    })
}

/// Resolves an include link to a parsed unit
pub trait IncludeResolver {
    fn resolve(&mut self, link: &IncludeLink) -> Result<XkbFile, IncludeError>;
}

/// One named map of a symbols file
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub file: String,
    pub map: Option<String>,
    /// Chosen when the include names the file without a map
    pub default: bool,
    pub statements: Vec<Statement>,
}

/// In-memory library of symbol units
#[derive(Debug, Clone, Default)]
pub struct UnitLibrary {
    units: Vec<Unit>,
    next_id: u32,
}

impl UnitLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, unit: Unit) {
        self.units.push(unit);
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Allocate a file id for a unit compiled outside of an include
    pub fn next_file_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn find(&self, file: &str, map: Option<&str>) -> Result<&Unit, IncludeError> {
        let mut candidates = self.units.iter().filter(|u| u.file == file).peekable();
        if candidates.peek().is_none() {
            return Err(IncludeError::FileNotFound(file.to_string()));
        }

        match map {
            Some(map) => candidates
                .find(|u| u.map.as_deref() == Some(map))
                .ok_or_else(|| IncludeError::MapNotFound {
                    file: file.to_string(),
                    map: map.to_string(),
                }),
            None => {
                let all: Vec<&Unit> = candidates.collect();
                all.iter()
                    .find(|u| u.default)
                    .or_else(|| all.first())
                    .copied()
                    .ok_or_else(|| IncludeError::FileNotFound(file.to_string()))
            }
        }
    }
}

impl IncludeResolver for UnitLibrary {
    fn resolve(&mut self, link: &IncludeLink) -> Result<XkbFile, IncludeError> {
        let unit = self.find(&link.file, link.map.as_deref())?;
        let name = unit.map.clone().unwrap_or_else(|| unit.file.clone());
        let statements = unit.statements.clone();
        log::debug!("Resolved include {} as {}", link.file, name);
        Ok(XkbFile {
            id: self.next_file_id(),
            name: Some(name),
            statements,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(file: &str, map: Option<&str>, default: bool) -> Unit {
        Unit {
            file: file.to_string(),
            map: map.map(str::to_string),
            default,
            statements: Vec::new(),
        }
    }

    #[test]
    fn test_parse_single_link() {
        let stmt = parse_include("us(intl):2", MergeMode::Augment).unwrap();
        assert_eq!(stmt.links.len(), 1);
        let link = &stmt.links[0];
        assert_eq!(link.file, "us");
        assert_eq!(link.map.as_deref(), Some("intl"));
        assert_eq!(link.modifier.as_deref(), Some("2"));
        assert_eq!(link.merge, MergeMode::Augment);
    }

    #[test]
    fn test_parse_chain_merge_modes() {
        let stmt = parse_include("pc+us|de(nodeadkeys)", MergeMode::Default).unwrap();
        let modes: Vec<MergeMode> = stmt.links.iter().map(|l| l.merge).collect();
        assert_eq!(
            modes,
            vec![MergeMode::Default, MergeMode::Override, MergeMode::Augment]
        );
        assert_eq!(stmt.links[2].map.as_deref(), Some("nodeadkeys"));
    }

    #[test]
    fn test_parse_malformed() {
        assert!(parse_include("", MergeMode::Default).is_err());
        assert!(parse_include("us(", MergeMode::Default).is_err());
        assert!(parse_include("us+", MergeMode::Default).is_err());
    }

    #[test]
    fn test_library_resolution() {
        let mut library = UnitLibrary::new();
        library.add(unit("us", Some("basic"), false));
        library.add(unit("us", Some("intl"), true));

        let link = |map: Option<&str>| IncludeLink {
            file: "us".to_string(),
            map: map.map(str::to_string),
            modifier: None,
            merge: MergeMode::Default,
        };

        let default = library.resolve(&link(None)).unwrap();
        assert_eq!(default.name.as_deref(), Some("intl"));
        let basic = library.resolve(&link(Some("basic"))).unwrap();
        assert_eq!(basic.name.as_deref(), Some("basic"));
        assert_ne!(default.id, basic.id);

        assert!(matches!(
            library.resolve(&link(Some("dvorak"))),
            Err(IncludeError::MapNotFound { .. })
        ));
    }

    #[test]
    fn test_library_first_map_without_default() {
        let mut library = UnitLibrary::new();
        library.add(unit("de", Some("basic"), false));
        library.add(unit("de", Some("neo"), false));
        let link = IncludeLink {
            file: "de".to_string(),
            map: None,
            modifier: None,
            merge: MergeMode::Default,
        };
        assert_eq!(library.resolve(&link).unwrap().name.as_deref(), Some("basic"));

        let missing = IncludeLink {
            file: "fr".to_string(),
            ..link
        };
        assert_eq!(
            library.resolve(&missing),
            Err(IncludeError::FileNotFound("fr".to_string()))
        );
    }
}
