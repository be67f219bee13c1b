// Xkbsym Symbols Pass
// Compiles symbols units into per-key tables of the keymap

mod compiler;
mod fields;
mod finalize;
mod info;
mod merge;

pub use compiler::{compile_symbols, set_explicit_group, CompileError, SymbolsCompiler};
pub use fields::get_group_index;
pub use finalize::{
    copy_mod_map_def, copy_symbols_def, copy_symbols_to_keymap, find_automatic_type,
    find_key_for_symbol,
};
pub use info::{
    GroupFields, GroupInfo, KeyFields, KeyInfo, KeyRepeat, LevelInfo, ModMapEntry, ModMapRef,
    SymbolsInfo, REPEAT_ENTRIES,
};
