// Xkbsym Core Library
// Symbols compiler for XKB-style keyboard descriptions

/// Warn only when the context verbosity reaches `level`
macro_rules! log_vrb {
    ($ctx:expr, $level:expr, $($arg:tt)+) => {
        if $ctx.verbosity() >= $level {
            log::warn!($($arg)+);
        }
    };
}

pub mod action;
pub mod ast;
pub mod atom;
pub mod config;
pub mod expr;
pub mod include;
pub mod keycodes;
pub mod keymap;
pub mod keysym;
pub mod modifier;
pub mod settings;
pub mod symbols;
pub mod types;

pub use action::{Action, ActionError, ActionType, ActionsInfo};
pub use ast::{Expr, MergeMode, Statement, XkbFile};
pub use atom::{Atom, AtomTable};
pub use config::{Bundle, BundleError, ExprParseError};
pub use expr::ExprError;
pub use include::{parse_include, IncludeError, IncludeResolver, Unit, UnitLibrary};
pub use keycodes::{KeyName, KeycodeTable};
pub use keymap::{Context, Key, KeySymbols, Keymap, RangeExceed};
pub use keysym::{keysym_from_name, keysym_name, lookup_keysym, Keysym, NO_SYMBOL};
pub use modifier::{ModIndex, VModError, VModTable};
pub use settings::{Settings, SettingsError};
pub use symbols::{compile_symbols, CompileError, SymbolsCompiler};
pub use types::KeyType;
