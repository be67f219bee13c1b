// Xkbsym Expression Evaluation
// Resolves expression nodes to strings, integers, booleans, groups, keysyms and masks

use crate::ast::Expr;
use crate::keymap::NUM_GROUPS;
use crate::keysym::{lookup_keysym, Keysym};
use crate::modifier::{vmod_mask, ModIndex, VModTable, CORE_MOD_MASK};

/// Errors that can occur while evaluating an expression
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExprError {
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("identifier '{0}' of type {1} is unknown")]
    UnknownIdent(String, &'static str),

    #[error("value {value} out of range; must be in {min}..{max}")]
    OutOfRange { value: i64, min: i64, max: i64 },

    #[error("integer overflow evaluating {0}")]
    Overflow(&'static str),

    #[error("'{0}' is not a valid keysym")]
    UnknownKeysym(String),

    #[error("cannot divide or combine {0} in this context")]
    IllegalOperator(&'static str),
}

/// Left-hand side of an assignment, split into its parts
#[derive(Debug, Clone, PartialEq)]
pub struct Lhs<'a> {
    pub element: Option<&'a str>,
    pub field: &'a str,
    pub index: Option<&'a Expr>,
}

/// Split an assignment target into element, field and array index
pub fn resolve_lhs(expr: &Expr) -> Result<Lhs<'_>, ExprError> {
    match expr {
        Expr::Ident(field) => Ok(Lhs {
            element: None,
            field,
            index: None,
        }),
        Expr::FieldRef { element, field } => Ok(Lhs {
            element: Some(element),
            field,
            index: None,
        }),
        Expr::ArrayRef {
            element,
            field,
            index,
        } => Ok(Lhs {
            element: element.as_deref(),
            field,
            index: Some(index),
        }),
        other => Err(ExprError::TypeMismatch {
            expected: "identifier or field reference",
            found: other.op_name(),
        }),
    }
}

/// Resolve a string literal
pub fn resolve_string(expr: &Expr) -> Result<String, ExprError> {
    match expr {
        Expr::String(s) => Ok(s.clone()),
        other => Err(ExprError::TypeMismatch {
            expected: "string",
            found: other.op_name(),
        }),
    }
}

/// Resolve a boolean: literals, `true/yes/on`, `false/no/off` and `!expr`
pub fn resolve_boolean(expr: &Expr) -> Result<bool, ExprError> {
    match expr {
        Expr::Boolean(b) => Ok(*b),
        Expr::Ident(name) => {
            let lower = name.to_ascii_lowercase();
            match lower.as_str() {
                "true" | "yes" | "on" => Ok(true),
                "false" | "no" | "off" => Ok(false),
                _ => Err(ExprError::UnknownIdent(name.clone(), "boolean")),
            }
        }
        Expr::Not(inner) | Expr::Invert(inner) => resolve_boolean(inner).map(|b| !b),
        other => Err(ExprError::TypeMismatch {
            expected: "boolean",
            found: other.op_name(),
        }),
    }
}

/// Resolve an integer, evaluating unary and additive arithmetic
pub fn resolve_integer(expr: &Expr) -> Result<i64, ExprError> {
    resolve_integer_lookup(expr, &|_| None)
}

fn resolve_integer_lookup(
    expr: &Expr,
    lookup: &dyn Fn(&str) -> Option<i64>,
) -> Result<i64, ExprError> {
    match expr {
        Expr::Integer(value) => Ok(*value),
        Expr::Ident(name) => {
            lookup(name).ok_or_else(|| ExprError::UnknownIdent(name.clone(), "integer"))
        }
        Expr::Negate(inner) => resolve_integer_lookup(inner, lookup)?
            .checked_neg()
            .ok_or(ExprError::Overflow("negation")),
        Expr::UnaryPlus(inner) => resolve_integer_lookup(inner, lookup),
        Expr::Invert(inner) => Ok(!resolve_integer_lookup(inner, lookup)?),
        Expr::Add(lhs, rhs) => resolve_integer_lookup(lhs, lookup)?
            .checked_add(resolve_integer_lookup(rhs, lookup)?)
            .ok_or(ExprError::Overflow("addition")),
        Expr::Subtract(lhs, rhs) => resolve_integer_lookup(lhs, lookup)?
            .checked_sub(resolve_integer_lookup(rhs, lookup)?)
            .ok_or(ExprError::Overflow("subtraction")),
        other => Err(ExprError::TypeMismatch {
            expected: "integer",
            found: other.op_name(),
        }),
    }
}

/// Resolve an identifier against a fixed table (case-insensitive)
pub fn resolve_enum<T: Copy>(expr: &Expr, table: &[(&str, T)]) -> Result<T, ExprError> {
    match expr {
        Expr::Boolean(b) => resolve_enum(&Expr::ident(if *b { "true" } else { "false" }), table),
        Expr::Ident(name) => table
            .iter()
            .find(|(entry, _)| entry.eq_ignore_ascii_case(name))
            .map(|(_, value)| *value)
            .ok_or_else(|| ExprError::UnknownIdent(name.clone(), "enumerated value")),
        other => Err(ExprError::TypeMismatch {
            expected: "identifier",
            found: other.op_name(),
        }),
    }
}

/// Resolve a 1-based group number: an integer or `group1`..`group4`
pub fn resolve_group(expr: &Expr) -> Result<u32, ExprError> {
    let value = resolve_integer_lookup(expr, &|name| {
        let lower = name.to_ascii_lowercase();
        let number = lower.strip_prefix("group")?.parse::<i64>().ok()?;
        (1..=NUM_GROUPS as i64).contains(&number).then_some(number)
    })?;

    if value < 1 || value > NUM_GROUPS as i64 {
        return Err(ExprError::OutOfRange {
            value,
            min: 1,
            max: NUM_GROUPS as i64,
        });
    }
    Ok(value as u32)
}

/// Resolve a keysym: a name, or an integer 0..9 taken as the digit keysym
pub fn resolve_keysym(expr: &Expr) -> Result<Keysym, ExprError> {
    if let Expr::Ident(name) = expr {
        if let Some(sym) = lookup_keysym(name) {
            return Ok(sym);
        }
    }

    match resolve_integer(expr) {
        Ok(value) if (0..=9).contains(&value) => Ok(Keysym(0x30 + value as u32)),
        Ok(value) => Err(ExprError::OutOfRange {
            value,
            min: 0,
            max: 9,
        }),
        Err(_) => match expr {
            Expr::Ident(name) => Err(ExprError::UnknownKeysym(name.clone())),
            other => Err(ExprError::TypeMismatch {
                expected: "keysym",
                found: other.op_name(),
            }),
        },
    }
}

/// Resolve a mask of core modifiers: names, `all`, `none`, joined by `+`/`-`
pub fn resolve_mod_mask(expr: &Expr) -> Result<u32, ExprError> {
    resolve_mask(expr, &|name| {
        let lower = name.to_ascii_lowercase();
        match lower.as_str() {
            "all" => Some(CORE_MOD_MASK),
            "none" => Some(0),
            _ => ModIndex::from_name(name).map(ModIndex::mask),
        }
    })
}

/// Resolve a mask of core and declared virtual modifiers
pub fn resolve_vmod_mask(expr: &Expr, vmods: &VModTable) -> Result<u32, ExprError> {
    resolve_mask(expr, &|name| {
        let lower = name.to_ascii_lowercase();
        match lower.as_str() {
            "all" => Some(
                (0..vmods.len()).fold(CORE_MOD_MASK, |mask, i| mask | vmod_mask(i)),
            ),
            "none" => Some(0),
            _ => ModIndex::from_name(name)
                .map(ModIndex::mask)
                .or_else(|| vmods.find(name).map(vmod_mask)),
        }
    })
}

fn resolve_mask(expr: &Expr, lookup: &dyn Fn(&str) -> Option<u32>) -> Result<u32, ExprError> {
    match expr {
        Expr::Integer(value) => {
            if *value < 0 || *value > u32::MAX as i64 {
                return Err(ExprError::OutOfRange {
                    value: *value,
                    min: 0,
                    max: u32::MAX as i64,
                });
            }
            Ok(*value as u32)
        }
        Expr::Ident(name) => {
            lookup(name).ok_or_else(|| ExprError::UnknownIdent(name.clone(), "modifier mask"))
        }
        Expr::Add(lhs, rhs) => Ok(resolve_mask(lhs, lookup)? | resolve_mask(rhs, lookup)?),
        Expr::Subtract(lhs, rhs) => Ok(resolve_mask(lhs, lookup)? & !resolve_mask(rhs, lookup)?),
        Expr::Invert(inner) => Ok(!resolve_mask(inner, lookup)?),
        Expr::UnaryPlus(inner) => resolve_mask(inner, lookup),
        Expr::Negate(_) | Expr::Not(_) => Err(ExprError::IllegalOperator("a negated mask")),
        other => Err(ExprError::TypeMismatch {
            expected: "modifier mask",
            found: other.op_name(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifier::vmod_def;

    fn add(lhs: Expr, rhs: Expr) -> Expr {
        Expr::Add(Box::new(lhs), Box::new(rhs))
    }

    #[test]
    fn test_resolve_lhs() {
        let lhs = Expr::ArrayRef {
            element: Some("key".to_string()),
            field: "type".to_string(),
            index: Box::new(Expr::int(2)),
        };
        let parts = resolve_lhs(&lhs).unwrap();
        assert_eq!(parts.element, Some("key"));
        assert_eq!(parts.field, "type");
        assert_eq!(parts.index, Some(&Expr::int(2)));

        assert!(resolve_lhs(&Expr::int(1)).is_err());
    }

    #[test]
    fn test_resolve_boolean() {
        assert_eq!(resolve_boolean(&Expr::ident("Yes")), Ok(true));
        assert_eq!(resolve_boolean(&Expr::ident("off")), Ok(false));
        assert_eq!(
            resolve_boolean(&Expr::Not(Box::new(Expr::Boolean(true)))),
            Ok(false)
        );
        assert!(resolve_boolean(&Expr::ident("maybe")).is_err());
    }

    #[test]
    fn test_resolve_integer_arithmetic() {
        let expr = Expr::Subtract(
            Box::new(add(Expr::int(2), Expr::int(5))),
            Box::new(Expr::Negate(Box::new(Expr::int(1)))),
        );
        assert_eq!(resolve_integer(&expr), Ok(8));
    }

    #[test]
    fn test_resolve_enum() {
        let table = [("yes", 1), ("no", 2)];
        assert_eq!(resolve_enum(&Expr::ident("YES"), &table), Ok(1));
        assert!(resolve_enum(&Expr::ident("perhaps"), &table).is_err());
        assert!(resolve_enum(&Expr::int(1), &table).is_err());
    }

    #[test]
    fn test_resolve_group() {
        assert_eq!(resolve_group(&Expr::int(2)), Ok(2));
        assert_eq!(resolve_group(&Expr::ident("Group4")), Ok(4));
        assert!(resolve_group(&Expr::int(0)).is_err());
        assert!(resolve_group(&Expr::int(5)).is_err());
        assert!(resolve_group(&Expr::ident("group9")).is_err());
    }

    #[test]
    fn test_resolve_integer_overflow() {
        let max = add(Expr::int(i64::MAX), Expr::int(1));
        assert_eq!(resolve_integer(&max), Err(ExprError::Overflow("addition")));
        assert_eq!(resolve_group(&max), Err(ExprError::Overflow("addition")));

        let min = Expr::Subtract(Box::new(Expr::int(i64::MIN)), Box::new(Expr::int(1)));
        assert_eq!(resolve_integer(&min), Err(ExprError::Overflow("subtraction")));

        let neg = Expr::Negate(Box::new(Expr::int(i64::MIN)));
        assert_eq!(resolve_integer(&neg), Err(ExprError::Overflow("negation")));
    }

    #[test]
    fn test_resolve_keysym() {
        assert_eq!(resolve_keysym(&Expr::ident("a")), Ok(Keysym(0x61)));
        assert_eq!(resolve_keysym(&Expr::int(7)), Ok(Keysym(0x37)));
        assert!(resolve_keysym(&Expr::int(12)).is_err());
        assert!(matches!(
            resolve_keysym(&Expr::ident("NotAKeysym")),
            Err(ExprError::UnknownKeysym(_))
        ));
    }

    #[test]
    fn test_resolve_masks() {
        let mask = add(Expr::ident("Shift"), Expr::ident("Mod1"));
        assert_eq!(resolve_mod_mask(&mask), Ok(0x09));
        assert_eq!(resolve_mod_mask(&Expr::ident("all")), Ok(0xff));
        assert!(resolve_mod_mask(&Expr::ident("NumLock")).is_err());

        let mut vmods = VModTable::new();
        vmods.declare(&vmod_def("NumLock", None)).unwrap();
        let mask = add(Expr::ident("NumLock"), Expr::ident("Lock"));
        assert_eq!(resolve_vmod_mask(&mask, &vmods), Ok(0x100 | 0x02));
    }
}
