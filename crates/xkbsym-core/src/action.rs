// Xkbsym Actions
// Key actions attached to shift levels and the action-grammar compiler

use std::collections::HashMap;
use std::fmt;

use strum_macros::{Display, EnumString};

use crate::ast::Expr;
use crate::expr::{resolve_boolean, resolve_group, resolve_integer, resolve_vmod_mask, ExprError};
use crate::modifier::VModTable;

/// Action kinds understood by the action compiler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum ActionType {
    NoAction,
    SetMods,
    LatchMods,
    LockMods,
    SetGroup,
    LatchGroup,
    LockGroup,
    #[strum(to_string = "Terminate", serialize = "TerminateServer")]
    Terminate,
}

/// Modifier action parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModAction {
    pub mods: u32,
    pub use_mod_map_mods: bool,
    pub clear_locks: bool,
    pub latch_to_lock: bool,
}

/// Group action parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GroupAction {
    /// When false, `group` is a signed offset from the current group
    pub absolute: bool,
    pub group: i32,
    pub clear_locks: bool,
    pub latch_to_lock: bool,
}

/// A compiled key action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    #[default]
    NoAction,
    SetMods(ModAction),
    LatchMods(ModAction),
    LockMods(ModAction),
    SetGroup(GroupAction),
    LatchGroup(GroupAction),
    LockGroup(GroupAction),
    Terminate,
}

impl Action {
    pub fn action_type(&self) -> ActionType {
        match self {
            Action::NoAction => ActionType::NoAction,
            Action::SetMods(_) => ActionType::SetMods,
            Action::LatchMods(_) => ActionType::LatchMods,
            Action::LockMods(_) => ActionType::LockMods,
            Action::SetGroup(_) => ActionType::SetGroup,
            Action::LatchGroup(_) => ActionType::LatchGroup,
            Action::LockGroup(_) => ActionType::LockGroup,
            Action::Terminate => ActionType::Terminate,
        }
    }

    /// Returns true unless this is `NoAction`
    pub fn is_some(&self) -> bool {
        !matches!(self, Action::NoAction)
    }

    fn empty(action_type: ActionType) -> Self {
        match action_type {
            ActionType::NoAction => Action::NoAction,
            ActionType::SetMods => Action::SetMods(ModAction::default()),
            ActionType::LatchMods => Action::LatchMods(ModAction::default()),
            ActionType::LockMods => Action::LockMods(ModAction::default()),
            ActionType::SetGroup => Action::SetGroup(GroupAction::default()),
            ActionType::LatchGroup => Action::LatchGroup(GroupAction::default()),
            ActionType::LockGroup => Action::LockGroup(GroupAction::default()),
            ActionType::Terminate => Action::Terminate,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::SetMods(m) | Action::LatchMods(m) | Action::LockMods(m) => {
                if m.use_mod_map_mods {
                    write!(f, "{}(modifiers=modMapMods", self.action_type())?;
                } else {
                    write!(f, "{}(modifiers={:#x}", self.action_type(), m.mods)?;
                }
                if m.clear_locks {
                    write!(f, ",clearLocks")?;
                }
                if m.latch_to_lock {
                    write!(f, ",latchToLock")?;
                }
                write!(f, ")")
            }
            Action::SetGroup(g) | Action::LatchGroup(g) | Action::LockGroup(g) => {
                if g.absolute {
                    write!(f, "{}(group={}", self.action_type(), g.group)?;
                } else {
                    write!(f, "{}(group={:+}", self.action_type(), g.group)?;
                }
                if g.clear_locks {
                    write!(f, ",clearLocks")?;
                }
                if g.latch_to_lock {
                    write!(f, ",latchToLock")?;
                }
                write!(f, ")")
            }
            other => write!(f, "{}()", other.action_type()),
        }
    }
}

/// Errors that can occur when compiling an action
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActionError {
    #[error("expected an action declaration, found {0}")]
    NotAnAction(&'static str),

    #[error("unknown action {0}")]
    UnknownAction(String),

    #[error("field {field} is not defined for an action of type {action}")]
    UnknownField { action: ActionType, field: String },

    #[error("the {field} field in the {action} action is not an array")]
    NotArray { action: ActionType, field: String },

    #[error("value of field {field} in the {action} action is invalid: {source}")]
    Value {
        action: ActionType,
        field: String,
        source: ExprError,
    },
}

/// Per-type action defaults, changed by global assignments like
/// `setMods.clearLocks = true;`
#[derive(Debug, Clone, Default)]
pub struct ActionsInfo {
    defaults: HashMap<ActionType, Action>,
}

impl ActionsInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current default for an action type
    pub fn default_for(&self, action_type: ActionType) -> Action {
        self.defaults
            .get(&action_type)
            .copied()
            .unwrap_or_else(|| Action::empty(action_type))
    }

    /// Apply a global `element.field[index] = value` assignment
    pub fn set_action_field(
        &mut self,
        element: &str,
        field: &str,
        index: Option<&Expr>,
        value: &Expr,
        vmods: &VModTable,
    ) -> Result<(), ActionError> {
        let action_type: ActionType = element
            .parse()
            .map_err(|_| ActionError::UnknownAction(element.to_string()))?;
        if index.is_some() {
            return Err(ActionError::NotArray {
                action: action_type,
                field: field.to_string(),
            });
        }

        let mut action = self.default_for(action_type);
        set_field(&mut action, field, value, vmods)?;
        self.defaults.insert(action_type, action);
        Ok(())
    }

    /// Compile an action call such as `SetMods(modifiers=Shift,clearLocks)`
    pub fn compile_action(&self, expr: &Expr, vmods: &VModTable) -> Result<Action, ActionError> {
        let (name, args) = match expr {
            Expr::Action { name, args } => (name, args),
            other => return Err(ActionError::NotAnAction(other.op_name())),
        };

        let action_type: ActionType = name
            .parse()
            .map_err(|_| ActionError::UnknownAction(name.clone()))?;
        let mut action = self.default_for(action_type);

        for arg in args {
            match arg {
                Expr::Assign { lhs, value } => {
                    let field = arg_field(action_type, lhs)?;
                    set_field(&mut action, field, value, vmods)?;
                }
                Expr::Not(inner) | Expr::Invert(inner) => {
                    let field = arg_field(action_type, inner)?;
                    set_field(&mut action, field, &Expr::Boolean(false), vmods)?;
                }
                other => {
                    let field = arg_field(action_type, other)?;
                    set_field(&mut action, field, &Expr::Boolean(true), vmods)?;
                }
            }
        }

        Ok(action)
    }
}

fn arg_field(action: ActionType, expr: &Expr) -> Result<&str, ActionError> {
    match expr {
        Expr::Ident(field) => Ok(field),
        Expr::ArrayRef { field, .. } => Err(ActionError::NotArray {
            action,
            field: field.clone(),
        }),
        other => Err(ActionError::UnknownField {
            action,
            field: other.op_name().to_string(),
        }),
    }
}

fn set_field(
    action: &mut Action,
    field: &str,
    value: &Expr,
    vmods: &VModTable,
) -> Result<(), ActionError> {
    let action_type = action.action_type();
    let lower = field.to_ascii_lowercase();
    let value_error = |source: ExprError| ActionError::Value {
        action: action_type,
        field: field.to_string(),
        source,
    };
    let unknown = || ActionError::UnknownField {
        action: action_type,
        field: field.to_string(),
    };

    match action {
        Action::SetMods(m) | Action::LatchMods(m) | Action::LockMods(m) => match lower.as_str() {
            "modifiers" | "mods" => {
                let is_mod_map = matches!(value, Expr::Ident(name)
                    if name.eq_ignore_ascii_case("modmapmods") || name.eq_ignore_ascii_case("usemodmapmods"));
                if is_mod_map {
                    m.use_mod_map_mods = true;
                    m.mods = 0;
                } else {
                    m.use_mod_map_mods = false;
                    m.mods = resolve_vmod_mask(value, vmods).map_err(value_error)?;
                }
            }
            "clearlocks" if action_type != ActionType::LockMods => {
                m.clear_locks = resolve_boolean(value).map_err(value_error)?;
            }
            "latchtolock" if action_type == ActionType::LatchMods => {
                m.latch_to_lock = resolve_boolean(value).map_err(value_error)?;
            }
            _ => return Err(unknown()),
        },
        Action::SetGroup(g) | Action::LatchGroup(g) | Action::LockGroup(g) => {
            match lower.as_str() {
                "group" => match value {
                    Expr::Negate(_) | Expr::UnaryPlus(_) => {
                        g.absolute = false;
                        let group = resolve_integer(value).map_err(value_error)?;
                        g.group = i32::try_from(group).map_err(|_| {
                            value_error(ExprError::OutOfRange {
                                value: group,
                                min: i32::MIN as i64,
                                max: i32::MAX as i64,
                            })
                        })?;
                    }
                    _ => {
                        g.absolute = true;
                        g.group = resolve_group(value).map_err(value_error)? as i32;
                    }
                },
                "clearlocks" if action_type != ActionType::LockGroup => {
                    g.clear_locks = resolve_boolean(value).map_err(value_error)?;
                }
                "latchtolock" if action_type == ActionType::LatchGroup => {
                    g.latch_to_lock = resolve_boolean(value).map_err(value_error)?;
                }
                _ => return Err(unknown()),
            }
        }
        Action::NoAction | Action::Terminate => return Err(unknown()),
    }

    Ok(())
}
